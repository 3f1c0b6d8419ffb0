use crate::{config::Config, services::RecommendationEngine};
use actix_web::{get, web, HttpResponse};

/// Lifecycle state, matrix shapes and any missing files, for diagnosing a failed start
#[get("/recommender-status")]
pub async fn recommender_status(
    engine: web::Data<RecommendationEngine>,
    config: web::Data<Config>,
) -> HttpResponse {
    let missing: Vec<String> = config
        .verify_paths()
        .iter()
        .map(|path| path.display().to_string())
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "recommender": engine.status_report(),
        "health": engine.health(),
        "missing_files": missing,
    }))
}
