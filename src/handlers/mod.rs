pub mod health;
pub mod popular;
pub mod predict;
pub mod recommend;
pub mod status;

pub use health::health_check;
pub use popular::popular_apps;
pub use predict::predict_rating;
pub use recommend::recommend_config;
pub use status::recommender_status;
