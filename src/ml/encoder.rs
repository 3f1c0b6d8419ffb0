use crate::{
    error::{ApiError, Result},
    ml::sparse::{SparseMatrix, SparseRow},
    models::UNKNOWN,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

/// A fitted one-hot encoder: one block of indicator columns per input feature,
/// laid out in feature order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    categories: Vec<Vec<String>>,
    #[serde(default)]
    handle_unknown: HandleUnknown,
}

impl CategoricalEncoder {
    pub fn new(categories: Vec<Vec<String>>, handle_unknown: HandleUnknown) -> Result<Self> {
        let encoder = Self {
            categories,
            handle_unknown,
        };
        encoder.validate()?;
        Ok(encoder)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(ApiError::ArtifactLoadFailed(
                "encoder has no fitted features".to_string(),
            ));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.categories.len()
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// One-hot encode a single row. The `Unknown` placeholder for an absent column
    /// encodes as all zeros in either mode, unless it was itself a fitted category.
    pub fn transform_one<S: AsRef<str>>(&self, values: &[S]) -> Result<SparseRow> {
        if values.len() != self.n_features() {
            return Err(ApiError::FeatureDimensionMismatch {
                expected: self.n_features(),
                got: values.len(),
            });
        }

        let mut offset = 0;
        let mut pairs = Vec::with_capacity(values.len());
        for (feature, value) in values.iter().enumerate() {
            let known = &self.categories[feature];
            match known.iter().position(|c| c == value.as_ref()) {
                Some(pos) => pairs.push((offset + pos, 1.0)),
                None if self.handle_unknown == HandleUnknown::Ignore => {}
                None if value.as_ref() == UNKNOWN => {}
                None => {
                    return Err(ApiError::InvalidInput(format!(
                        "unknown category '{}' for categorical feature {}",
                        value.as_ref(),
                        feature
                    )))
                }
            }
            offset += known.len();
        }

        Ok(SparseRow::from_pairs(pairs))
    }

    pub fn transform<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> Result<SparseMatrix> {
        let rows = rows
            .iter()
            .map(|values| self.transform_one(values))
            .collect::<Result<Vec<_>>>()?;
        SparseMatrix::new(rows, self.width())
    }
}
