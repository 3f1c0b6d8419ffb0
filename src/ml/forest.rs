use crate::{
    error::{ApiError, Result},
    ml::sparse::{FusedFeatureMatrix, SparseRow},
};
use serde::{Deserialize, Serialize};

/// One node of a flattened regression tree. Samples go left when
/// `x[feature] <= threshold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    // Children always sit after their parent in the node array, which rules out cycles.
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ApiError::ArtifactLoadFailed("tree has no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = *node
            {
                if feature >= n_features {
                    return Err(ApiError::ArtifactLoadFailed(format!(
                        "node {} splits on feature {} but the model has {} features",
                        idx, feature, n_features
                    )));
                }
                for child in [left, right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(ApiError::ArtifactLoadFailed(format!(
                            "node {} points to invalid child {}",
                            idx, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: &SparseRow) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row.get(feature) <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// A fitted random-forest regressor predicting an app's rating from its fused features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingModel {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RatingModel {
    pub fn new(n_features: usize, trees: Vec<DecisionTree>) -> Result<Self> {
        let model = Self { n_features, trees };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ApiError::ArtifactLoadFailed(
                "rating model has no trees".to_string(),
            ));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.n_features))
    }

    /// Width of the fused feature space the model was trained on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the per-tree predictions, one value per input row.
    ///
    /// A matrix of any other width than the training width is rejected rather
    /// than silently evaluated against the wrong columns.
    pub fn predict(&self, features: &FusedFeatureMatrix) -> Result<Vec<f64>> {
        if features.n_cols() != self.n_features {
            return Err(ApiError::FeatureDimensionMismatch {
                expected: self.n_features,
                got: features.n_cols(),
            });
        }

        let n_trees = self.trees.len() as f64;
        Ok(features
            .rows()
            .iter()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|tree| tree.predict_row(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect())
    }
}
