use serde::{Deserialize, Deserializer, Serialize};

/// Literal used when a categorical value or text field is absent.
pub const UNKNOWN: &str = "Unknown";

/// Text used when no synthesized feature text can be built for a row.
pub const DEFAULT_FEATURE_TEXT: &str = "default_feature";

/// The four numeric columns fed to the scaler, in scaler column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    Reviews,
    Size,
    Installs,
    Price,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 4] = [
        NumericColumn::Reviews,
        NumericColumn::Size,
        NumericColumn::Installs,
        NumericColumn::Price,
    ];

    pub fn header(self) -> &'static str {
        match self {
            NumericColumn::Reviews => "Reviews",
            NumericColumn::Size => "Size",
            NumericColumn::Installs => "Installs",
            NumericColumn::Price => "Price",
        }
    }

    /// Columns imputed with zero; the others take the column median.
    pub fn imputes_zero(self) -> bool {
        matches!(self, NumericColumn::Reviews | NumericColumn::Price)
    }

    /// Parse a raw cell, stripping the column's decoration. `None` stands for NaN.
    pub fn parse(self, raw: &str) -> Option<f64> {
        let raw = raw.trim();
        let value = match self {
            NumericColumn::Reviews => raw.parse::<f64>().ok(),
            NumericColumn::Installs => raw.replace(['+', ','], "").parse::<f64>().ok(),
            NumericColumn::Price => raw.replace('$', "").parse::<f64>().ok(),
            NumericColumn::Size => parse_size_mb(raw),
        };
        value.filter(|v| v.is_finite())
    }
}

/// Sizes are megabytes: "19M" -> 19.0, "512k" -> 0.5, "Varies with device" -> None.
fn parse_size_mb(raw: &str) -> Option<f64> {
    let upper = raw.to_uppercase();
    if let Some(mb) = upper.strip_suffix('M') {
        mb.trim().parse::<f64>().ok()
    } else if let Some(kb) = upper.strip_suffix('K') {
        kb.trim().parse::<f64>().ok().map(|kb| kb / 1024.0)
    } else {
        upper.parse::<f64>().ok()
    }
}

/// One app entry. Every numeric field is populated once loading has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub name: String,
    pub category: String,
    pub rating: Option<f64>,
    pub review_count: u64,
    pub size_mb: f64,
    pub install_count: u64,
    pub price: f64,
    pub content_rating: String,
    pub app_type: String,
    pub genres: String,
    pub synthesized_features: String,
}

impl CatalogRow {
    pub fn numeric_values(&self) -> [f64; 4] {
        [
            self.review_count as f64,
            self.size_mb,
            self.install_count as f64,
            self.price,
        ]
    }
}

/// Joins category, name and genres into the vectorizer input.
pub fn synthesize_features(category: &str, name: &str, genres: Option<&str>) -> String {
    let mut text = format!("{} {}", category, name);
    if let Some(genres) = genres {
        text.push(' ');
        text.push_str(genres);
    }
    if text.trim().is_empty() {
        DEFAULT_FEATURE_TEXT.to_string()
    } else {
        text
    }
}

/// The loaded catalog. Row indices are stable for the lifetime of the process
/// and double as similarity matrix indices.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rows: Vec<CatalogRow>,
}

impl Catalog {
    pub fn new(rows: Vec<CatalogRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&CatalogRow> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogRow> {
        self.rows.iter()
    }
}

fn deserialize_numeric<'de, D>(
    deserializer: D,
    column: NumericColumn,
) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
        Null,
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::String(s) => Ok(column.parse(&s)),
        StringOrFloat::Float(f) => Ok(Some(f).filter(|f| f.is_finite())),
        StringOrFloat::Null => Ok(None),
    }
}

fn deserialize_reviews<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    deserialize_numeric(d, NumericColumn::Reviews)
}

fn deserialize_size<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    deserialize_numeric(d, NumericColumn::Size)
}

fn deserialize_installs<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    deserialize_numeric(d, NumericColumn::Installs)
}

fn deserialize_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    deserialize_numeric(d, NumericColumn::Price)
}

/// A single input row for fusion. Every column is optional: absent columns are
/// defaulted by the fuser instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "App", alias = "app", alias = "name", default)]
    pub name: Option<String>,
    #[serde(rename = "Category", alias = "category", default)]
    pub category: Option<String>,
    #[serde(rename = "Genres", alias = "genres", default)]
    pub genres: Option<String>,
    #[serde(rename = "Features", alias = "features", alias = "description", default)]
    pub features: Option<String>,
    #[serde(
        rename = "Reviews",
        alias = "reviews",
        default,
        deserialize_with = "deserialize_reviews"
    )]
    pub reviews: Option<f64>,
    #[serde(
        rename = "Size",
        alias = "size",
        default,
        deserialize_with = "deserialize_size"
    )]
    pub size: Option<f64>,
    #[serde(
        rename = "Installs",
        alias = "installs",
        default,
        deserialize_with = "deserialize_installs"
    )]
    pub installs: Option<f64>,
    #[serde(
        rename = "Price",
        alias = "price",
        default,
        deserialize_with = "deserialize_price"
    )]
    pub price: Option<f64>,
    #[serde(rename = "Type", alias = "type", default)]
    pub app_type: Option<String>,
    #[serde(rename = "Content Rating", alias = "content_rating", default)]
    pub content_rating: Option<String>,
}

impl FeatureRow {
    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Reviews => self.reviews,
            NumericColumn::Size => self.size,
            NumericColumn::Installs => self.installs,
            NumericColumn::Price => self.price,
        }
    }
}

impl From<&CatalogRow> for FeatureRow {
    fn from(row: &CatalogRow) -> Self {
        let [reviews, size, installs, price] = row.numeric_values();
        Self {
            name: Some(row.name.clone()),
            category: Some(row.category.clone()),
            genres: Some(row.genres.clone()),
            features: Some(row.synthesized_features.clone()),
            reviews: Some(reviews),
            size: Some(size),
            installs: Some(installs),
            price: Some(price),
            app_type: Some(row.app_type.clone()),
            content_rating: Some(row.content_rating.clone()),
        }
    }
}
