use crate::{
    error::{ApiError, Result},
    ml::FusedFeatureMatrix,
};
use log::info;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

/// Dense all-pairs cosine similarity over the fused catalog features.
///
/// Built once at startup and never invalidated; a catalog change needs a restart.
/// Memory is O(n^2) in the catalog size.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    matrix: Array2<f64>,
    feature_width: usize,
}

impl SimilarityIndex {
    pub fn build(features: &FusedFeatureMatrix) -> Result<Self> {
        let n = features.n_rows();
        if n == 0 {
            return Err(ApiError::IndexBuildFailed(
                "catalog is empty, nothing to index".to_string(),
            ));
        }

        let rows = features.rows();
        let norms: Vec<f64> = rows.par_iter().map(|row| row.norm()).collect();

        let data: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let norms = &norms;
                (0..n).map(move |j| {
                    if i == j {
                        return 1.0;
                    }
                    let denom = norms[i] * norms[j];
                    if denom == 0.0 {
                        0.0
                    } else {
                        rows[i].dot(&rows[j]) / denom
                    }
                })
            })
            .collect();

        let matrix = Array2::from_shape_vec((n, n), data)?;
        info!(
            "Created similarity matrix with shape {:?} over {} fused columns",
            matrix.dim(),
            features.n_cols()
        );

        Ok(Self {
            matrix,
            feature_width: features.n_cols(),
        })
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.matrix.dim()
    }

    /// Fused width the index was built against.
    pub fn feature_width(&self) -> usize {
        self.feature_width
    }

    pub fn row(&self, i: usize) -> Option<ArrayView1<'_, f64>> {
        (i < self.len()).then(|| self.matrix.row(i))
    }
}
