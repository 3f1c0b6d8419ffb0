use serde::{Deserialize, Serialize};

// Re-export types from app.rs
pub use app::{
    synthesize_features, Catalog, CatalogRow, FeatureRow, NumericColumn, DEFAULT_FEATURE_TEXT,
    UNKNOWN,
};

mod app;

/// Request structure for app recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// Name of the app to find neighbours for
    #[serde(default)]
    pub app_name: String,
    /// Optional number of recommendations to return (default: 5)
    #[serde(default)]
    pub k: Option<usize>,
}

/// One recommended app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub category: String,
    pub rating: Option<f64>,
}

/// Outcome of a recommendation query. Name resolution failures are a regular
/// outcome carrying suggestions, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecommendOutcome {
    Success {
        recommendations: Vec<Recommendation>,
    },
    #[serde(rename = "error")]
    NotFound {
        message: String,
        suggestions: Vec<String>,
    },
}

/// Engine health flags, one per initialization stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub data_loaded: bool,
    pub artifacts_loaded: bool,
    pub index_built: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.data_loaded && self.artifacts_loaded && self.index_built
    }
}

/// A catalog entry ranked by review count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularApp {
    pub name: String,
    pub category: String,
    pub rating: Option<f64>,
    pub reviews: u64,
}

/// Response structure for rating prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_rating: f64,
}

/// Shapes and lifecycle details of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: String,
    pub catalog_rows: Option<usize>,
    pub feature_width: Option<usize>,
    pub similarity_shape: Option<(usize, usize)>,
    pub failure: Option<String>,
}
