use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::models::NearbyResponse;
use crate::services::geo_service::DEFAULT_RADIUS_MILES;
use crate::services::GeoService;
use crate::utils::AppError;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct NearbyQuery {
    /// Raio em milhas (default: 100)
    pub miles: Option<String>,
}

/// Valor ausente, não numérico ou não positivo vira o raio padrão
fn radius(miles: Option<&str>) -> f64 {
    miles
        .and_then(|m| m.trim().parse::<f64>().ok())
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(DEFAULT_RADIUS_MILES)
}

/// GET /api/nearby/{name} - Cidades próximas de uma universidade
#[utoipa::path(
    get,
    path = "/api/nearby/{name}",
    tag = "Schools",
    params(("name" = String, Path, description = "University name"), NearbyQuery),
    responses(
        (status = 200, description = "Nearby cities", body = NearbyResponse),
        (status = 404, description = "University not found")
    )
)]
pub async fn get_nearby(
    path: web::Path<String>,
    query: web::Query<NearbyQuery>,
    geo: web::Data<GeoService>,
) -> Result<HttpResponse, AppError> {
    let university = geo
        .find_university(&path)
        .ok_or_else(|| AppError::NotFound("University not found".to_string()))?;
    let miles = radius(query.miles.as_deref());

    let nearby_cities = geo.nearby_for_school(university, miles);
    log::debug!("🗺️  {} cities within {} miles of {}", nearby_cities.len(), miles, university.name);

    Ok(HttpResponse::Ok().json(NearbyResponse {
        university: university.name.clone(),
        radius_miles: miles,
        nearby_cities,
    }))
}
