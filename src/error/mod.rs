use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No readable catalog source: {0}")]
    DataUnavailable(String),

    #[error("Failed to load artifact: {0}")]
    ArtifactLoadFailed(String),

    #[error("Failed to build similarity index: {0}")]
    IndexBuildFailed(String),

    #[error("Feature dimension mismatch: expected {expected} columns, got {got}")]
    FeatureDimensionMismatch { expected: usize, got: usize },

    #[error("Recommendation engine is not ready (state: {0})")]
    EngineNotReady(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::DataUnavailable(_) => "DATA_UNAVAILABLE",
            ApiError::ArtifactLoadFailed(_) => "ARTIFACT_LOAD_FAILED",
            ApiError::IndexBuildFailed(_) => "INDEX_BUILD_FAILED",
            ApiError::FeatureDimensionMismatch { .. } => "FEATURE_DIMENSION_MISMATCH",
            ApiError::EngineNotReady(_) => "RECOMMENDER_UNAVAILABLE",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
    code: &'static str,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::FeatureDimensionMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::EngineNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            status: "error",
            message: self.to_string(),
            code: self.code(),
        })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::DataUnavailable(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ApiError {
    fn from(err: ndarray::ShapeError) -> Self {
        ApiError::IndexBuildFailed(err.to_string())
    }
}

impl From<::config::ConfigError> for ApiError {
    fn from(err: ::config::ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
