use crate::{
    error::{ApiError, Result},
    ml::sparse::{SparseMatrix, SparseRow},
};
use serde::{Deserialize, Serialize};

/// A fitted min-max scaler. Each value maps to `x * scale + min`, the
/// per-feature affine transform learned during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericScaler {
    min: Vec<f64>,
    scale: Vec<f64>,
}

impl NumericScaler {
    pub fn new(min: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self { min, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Build from the observed training range, as the training run does.
    pub fn from_range(data_min: &[f64], data_max: &[f64]) -> Result<Self> {
        if data_min.len() != data_max.len() {
            return Err(ApiError::FeatureDimensionMismatch {
                expected: data_min.len(),
                got: data_max.len(),
            });
        }
        let scale: Vec<f64> = data_min
            .iter()
            .zip(data_max)
            .map(|(lo, hi)| if hi > lo { 1.0 / (hi - lo) } else { 1.0 })
            .collect();
        let min = data_min.iter().zip(&scale).map(|(lo, s)| -lo * s).collect();
        Self::new(min, scale)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min.len() != self.scale.len() {
            return Err(ApiError::ArtifactLoadFailed(format!(
                "scaler has {} offsets but {} scales",
                self.min.len(),
                self.scale.len()
            )));
        }
        if self.min.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(ApiError::ArtifactLoadFailed(
                "scaler parameters must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.scale.len()
    }

    pub fn transform_one(&self, values: &[f64]) -> Result<SparseRow> {
        if values.len() != self.width() {
            return Err(ApiError::FeatureDimensionMismatch {
                expected: self.width(),
                got: values.len(),
            });
        }
        let scaled: Vec<f64> = values
            .iter()
            .zip(self.scale.iter().zip(&self.min))
            .map(|(x, (scale, min))| x * scale + min)
            .collect();
        Ok(SparseRow::from_dense(&scaled))
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<SparseMatrix> {
        let rows = rows
            .iter()
            .map(|values| self.transform_one(values))
            .collect::<Result<Vec<_>>>()?;
        SparseMatrix::new(rows, self.width())
    }
}
