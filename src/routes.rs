use actix_web::{web, Scope};

use crate::handlers::{
    health_check, popular_apps, predict_rating, recommend_config, recommender_status,
};

/// Configure all routes for the API
pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(health_check)
        .service(recommender_status)
        .service(popular_apps)
        .service(predict_rating)
        .configure(recommend_config)
}
