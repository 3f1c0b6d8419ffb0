use crate::{
    config::Config,
    error::{ApiError, Result},
    models::{RecommendOutcome, RecommendationRequest},
    services::RecommendationEngine,
};
use actix_web::{web, HttpResponse};
use log::info;

pub fn recommend_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/recommend")
            .route(web::get().to(recommend_query))
            .route(web::post().to(recommend_json)),
    );
}

/// `GET /api/recommend?app_name=...&k=...`
pub async fn recommend_query(
    request: web::Query<RecommendationRequest>,
    engine: web::Data<RecommendationEngine>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    respond(&request, &engine, &config)
}

/// `POST /api/recommend` with a JSON body
pub async fn recommend_json(
    request: web::Json<RecommendationRequest>,
    engine: web::Data<RecommendationEngine>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    respond(&request, &engine, &config)
}

fn respond(
    request: &RecommendationRequest,
    engine: &RecommendationEngine,
    config: &Config,
) -> Result<HttpResponse> {
    if request.app_name.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "Please provide a valid app name".to_string(),
        ));
    }
    let k = request.k.unwrap_or(config.default_recommendations);
    if k == 0 {
        return Err(ApiError::InvalidInput("k must be at least 1".to_string()));
    }

    info!("Received recommendation request for: {}", request.app_name);
    let outcome = engine.recommend(&request.app_name, k)?;

    Ok(match outcome {
        RecommendOutcome::Success { .. } => HttpResponse::Ok().json(outcome),
        RecommendOutcome::NotFound { .. } => HttpResponse::NotFound().json(outcome),
    })
}
