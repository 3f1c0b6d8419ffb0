use crate::{
    error::Result,
    models::{FeatureRow, PredictionResponse},
    services::RecommendationEngine,
};
use actix_web::{post, web, HttpResponse};
use log::debug;

/// Predict a rating for a single app described by its raw columns
#[post("/predict")]
pub async fn predict_rating(
    row: web::Json<FeatureRow>,
    engine: web::Data<RecommendationEngine>,
) -> Result<HttpResponse> {
    let predicted_rating = engine.predict_rating(&row)?;
    debug!("Predicted rating {:.3} for {:?}", predicted_rating, row.name);

    Ok(HttpResponse::Ok().json(PredictionResponse { predicted_rating }))
}
