//! Feature fusion shared by the similarity index and rating prediction.
//!
//! Fusion only ever calls `transform` on the loaded artifacts, so serving-time vectors
//! land in the same column space the artifacts were fitted on:
//! `[text | numeric-scaled | categorical-encoded]`.

use crate::{
    error::{ApiError, Result},
    ml::{ArtifactStore, FusedFeatureMatrix, SparseMatrix},
    models::{synthesize_features, Catalog, FeatureRow, NumericColumn, UNKNOWN},
};
use log::{debug, warn};

/// Categorical columns fed to the encoder, in encoder feature order.
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["Type", "Content Rating"];

pub struct FeatureFuser<'a> {
    artifacts: &'a ArtifactStore,
}

impl<'a> FeatureFuser<'a> {
    pub fn new(artifacts: &'a ArtifactStore) -> Self {
        Self { artifacts }
    }

    pub fn fuse_catalog(&self, catalog: &Catalog) -> Result<FusedFeatureMatrix> {
        let rows: Vec<FeatureRow> = catalog.iter().map(FeatureRow::from).collect();
        self.fuse(&rows)
    }

    /// Fuse rows and require the result to be `expected_width` columns wide.
    pub fn fuse_for(
        &self,
        rows: &[FeatureRow],
        expected_width: usize,
    ) -> Result<FusedFeatureMatrix> {
        let fused = self.fuse(rows)?;
        if fused.n_cols() != expected_width {
            return Err(ApiError::FeatureDimensionMismatch {
                expected: expected_width,
                got: fused.n_cols(),
            });
        }
        Ok(fused)
    }

    pub fn fuse(&self, rows: &[FeatureRow]) -> Result<FusedFeatureMatrix> {
        let texts: Vec<String> = rows.iter().map(feature_text).collect();

        let mut missing_numeric = [0usize; 4];
        let numeric: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| {
                NumericColumn::ALL
                    .iter()
                    .enumerate()
                    .map(|(pos, &column)| {
                        row.numeric(column).unwrap_or_else(|| {
                            missing_numeric[pos] += 1;
                            0.0
                        })
                    })
                    .collect()
            })
            .collect();

        let mut missing_categorical = [0usize; 2];
        let categorical: Vec<Vec<&str>> = rows
            .iter()
            .map(|row| {
                [&row.app_type, &row.content_rating]
                    .into_iter()
                    .enumerate()
                    .map(|(pos, value)| match value.as_deref() {
                        Some(v) => v,
                        None => {
                            missing_categorical[pos] += 1;
                            UNKNOWN
                        }
                    })
                    .collect()
            })
            .collect();

        for (column, count) in NumericColumn::ALL.iter().zip(missing_numeric) {
            if count > 0 {
                warn!(
                    "{} not found on {} rows. Creating with default value 0.",
                    column.header(),
                    count
                );
            }
        }
        for (column, count) in CATEGORICAL_COLUMNS.iter().zip(missing_categorical) {
            if count > 0 {
                warn!(
                    "{} not found on {} rows. Creating with default value '{}'.",
                    column, count, UNKNOWN
                );
            }
        }

        let text_block = self.artifacts.vectorizer.transform(&texts)?;
        let numeric_block = self.artifacts.scaler.transform(&numeric)?;
        let categorical_block = self.artifacts.encoder.transform(&categorical)?;

        let fused = SparseMatrix::hstack(&[text_block, numeric_block, categorical_block])?;
        debug!("Fused {} rows into shape {:?}", rows.len(), fused.shape());
        Ok(fused)
    }
}

fn feature_text(row: &FeatureRow) -> String {
    match row.features.as_deref() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => synthesize_features(
            row.category.as_deref().unwrap_or(UNKNOWN),
            row.name.as_deref().unwrap_or(UNKNOWN),
            row.genres.as_deref(),
        ),
    }
}
