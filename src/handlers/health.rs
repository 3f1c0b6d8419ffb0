use crate::{config::Config, services::RecommendationEngine};
use actix_web::{get, web, HttpResponse};

/// Engine health flags plus which data and artifact files are on disk.
/// Always answers 200; callers read `status` to tell a degraded engine apart.
#[get("/health")]
pub async fn health_check(
    engine: web::Data<RecommendationEngine>,
    config: web::Data<Config>,
) -> HttpResponse {
    let health = engine.health();
    let missing = config.verify_paths();

    HttpResponse::Ok().json(serde_json::json!({
        "status": if health.is_healthy() { "ok" } else { "degraded" },
        "recommender": health,
        "files_present": missing.is_empty(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
