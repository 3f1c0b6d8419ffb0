pub mod dataset;
pub mod features;
pub mod recommendation;
pub mod resolver;
pub mod similarity;

// Re-export public types
pub use dataset::DatasetLoader;
pub use features::FeatureFuser;
pub use recommendation::{DataSources, EngineStage, RecommendationEngine};
pub use resolver::{MatchTier, QueryResolver, Resolution};
pub use similarity::SimilarityIndex;
