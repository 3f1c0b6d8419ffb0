use crate::{
    error::{ApiError, Result},
    models::{synthesize_features, Catalog, CatalogRow, NumericColumn, UNKNOWN},
};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, error, info, warn};
use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

const BOM: char = '\u{feff}';

/// Header positions, with a leading byte-order mark stripped from column names.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let mut index = HashMap::new();
        for (pos, header) in headers.iter().enumerate() {
            let name = header.trim_start_matches(BOM).trim();
            if name != header {
                info!("Renamed '{}' column to '{}'", header.escape_debug(), name);
            }
            index.entry(name.to_string()).or_insert(pos);
        }
        Self { index }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index.get(name).and_then(|&pos| record.get(pos))
    }
}

/// A parsed record before numeric imputation.
struct RawRow {
    name: String,
    category: String,
    rating: Option<f64>,
    numeric: [Option<f64>; 4],
    content_rating: String,
    app_type: String,
    genres: Option<String>,
    features: Option<String>,
}

/// Loads the catalog from the first candidate file that exists and parses.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    candidates: Vec<PathBuf>,
}

impl DatasetLoader {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    pub fn load(&self) -> Result<Catalog> {
        let mut attempts = Vec::with_capacity(self.candidates.len());

        for path in &self.candidates {
            if !path.exists() {
                debug!("Data file not present: {}", path.display());
                attempts.push(format!("{} (missing)", path.display()));
                continue;
            }

            match load_catalog_file(path) {
                Ok(catalog) => {
                    info!(
                        "Loaded data from {} with {} rows",
                        path.display(),
                        catalog.len()
                    );
                    return Ok(catalog);
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    attempts.push(format!("{} ({})", path.display(), e));
                }
            }
        }

        error!("No data file found; attempted: {:?}", attempts);
        Err(ApiError::DataUnavailable(format!(
            "attempted {}",
            if attempts.is_empty() {
                "no candidate paths".to_string()
            } else {
                attempts.join(", ")
            }
        )))
    }
}

pub fn load_catalog_file(path: &Path) -> Result<Catalog> {
    let file = File::open(path)?;
    parse_catalog(file)
}

/// Parse delimited catalog text. Malformed records are skipped, every other row is kept
/// and unparsable numeric cells are imputed so row counts stay aligned with training.
pub fn parse_catalog<R: Read>(input: R) -> Result<Catalog> {
    let mut reader = ReaderBuilder::new().from_reader(input);
    let headers = reader.headers()?.clone();
    let columns = Columns::new(&headers);

    let mut found: Vec<&String> = columns.index.keys().collect();
    found.sort();
    info!("Columns in loaded data: {:?}", found);

    for column in NumericColumn::ALL {
        if !columns.has(column.header()) {
            warn!("{} not found in data. Imputing every row.", column.header());
        }
    }
    for column in ["App", "Category", "Type", "Content Rating", "Genres"] {
        if !columns.has(column) {
            warn!("{} not found in data. Using default values.", column);
        }
    }

    let mut raw_rows = Vec::new();
    let mut skipped = 0usize;
    for (line, record) in reader.records().enumerate() {
        match record {
            Ok(record) => raw_rows.push(raw_row(&columns, &record)),
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed record {}: {}", line + 1, e);
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} malformed records", skipped);
    }

    Ok(Catalog::new(impute(raw_rows)))
}

fn raw_row(columns: &Columns, record: &StringRecord) -> RawRow {
    let text = |name: &str| columns.get(record, name).map(|v| v.trim().to_string());
    let categorical = |name: &str| {
        text(name)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    let mut numeric = [None; 4];
    for (slot, column) in numeric.iter_mut().zip(NumericColumn::ALL) {
        *slot = columns
            .get(record, column.header())
            .and_then(|raw| column.parse(raw));
    }

    RawRow {
        name: text("App").unwrap_or_else(|| UNKNOWN.to_string()),
        category: text("Category").unwrap_or_else(|| UNKNOWN.to_string()),
        rating: columns
            .get(record, "Rating")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite()),
        numeric,
        content_rating: categorical("Content Rating"),
        app_type: categorical("Type"),
        genres: text("Genres"),
        features: text("Features").filter(|f| !f.is_empty()),
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

fn impute(raw_rows: Vec<RawRow>) -> Vec<CatalogRow> {
    let mut fill = [0.0; 4];
    for (pos, column) in NumericColumn::ALL.iter().enumerate() {
        let missing = raw_rows.iter().filter(|r| r.numeric[pos].is_none()).count();
        if column.imputes_zero() {
            fill[pos] = 0.0;
        } else {
            let mut present: Vec<f64> = raw_rows.iter().filter_map(|r| r.numeric[pos]).collect();
            fill[pos] = median(&mut present).unwrap_or(0.0);
        }
        if missing > 0 {
            debug!(
                "Imputed {} missing {} values with {}",
                missing,
                column.header(),
                fill[pos]
            );
        }
    }

    raw_rows
        .into_iter()
        .map(|raw| {
            let [reviews, size, installs, price] =
                [0, 1, 2, 3].map(|pos| raw.numeric[pos].unwrap_or(fill[pos]));
            let synthesized_features = raw.features.unwrap_or_else(|| {
                synthesize_features(&raw.category, &raw.name, raw.genres.as_deref())
            });

            CatalogRow {
                name: raw.name,
                category: raw.category,
                rating: raw.rating,
                review_count: reviews.max(0.0).round() as u64,
                size_mb: size,
                install_count: installs.max(0.0).round() as u64,
                price,
                content_rating: raw.content_rating,
                app_type: raw.app_type,
                genres: raw.genres.unwrap_or_default(),
                synthesized_features,
            }
        })
        .collect()
}
