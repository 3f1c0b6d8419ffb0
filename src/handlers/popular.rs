use crate::{error::Result, services::RecommendationEngine};
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

const DEFAULT_POPULAR_COUNT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    DEFAULT_POPULAR_COUNT
}

/// Most reviewed apps in the catalog
#[get("/popular")]
pub async fn popular_apps(
    params: web::Query<PopularQuery>,
    engine: web::Data<RecommendationEngine>,
) -> Result<HttpResponse> {
    let apps = engine.popular(params.count)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "apps": apps,
    })))
}
