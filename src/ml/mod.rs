pub mod artifacts;
pub mod encoder;
pub mod forest;
pub mod scaler;
pub mod sparse;
pub mod tfidf;

// Re-export public types
pub use artifacts::{ArtifactPaths, ArtifactStore};
pub use encoder::{CategoricalEncoder, HandleUnknown};
pub use forest::{DecisionTree, RatingModel, TreeNode};
pub use scaler::NumericScaler;
pub use sparse::{FusedFeatureMatrix, SparseMatrix, SparseRow};
pub use tfidf::{Norm, TextVectorizer};
