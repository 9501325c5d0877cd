use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::middleware::auth::Claims;
use crate::models::Ride;
use crate::services::geo_service::{Locations, DEFAULT_RADIUS_MILES};
use crate::services::ride_service::{CreateRideRequest, PassengerActionRequest, SearchRequest, UpdateRideRequest};
use crate::services::{GeoService, RideService};
use crate::utils::AppError;

fn ride_response(ride: Ride) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "ride": ride
    }))
}

fn rides_response(rides: Vec<Ride>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": rides.len(),
        "rides": rides
    }))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LocationsQuery {
    pub school: Option<String>,
    pub miles: Option<f64>,
    pub query: Option<String>,
}

/// GET /api/rides - Caronas da escola do usuário
#[utoipa::path(
    get,
    path = "/api/rides",
    tag = "Rides",
    responses(
        (status = 200, description = "Rides for the caller's school"),
        (status = 401, description = "Missing token")
    ),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn list_school_rides(user: web::ReqData<Claims>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    if user.school.trim().is_empty() {
        return Err(AppError::InvalidRequest("Missing school".to_string()));
    }

    let list = rides.school_rides(&user.school).await?;
    Ok(rides_response(list))
}

/// POST /api/rides - Publica uma carona
#[utoipa::path(
    post,
    path = "/api/rides",
    tag = "Rides",
    request_body = CreateRideRequest,
    responses(
        (status = 201, description = "Ride created", body = Ride),
        (status = 400, description = "Missing fields or no campus endpoint")
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_ride(
    user: web::ReqData<Claims>,
    request: web::Json<CreateRideRequest>,
    rides: web::Data<RideService>,
    geo: web::Data<GeoService>,
) -> Result<HttpResponse, AppError> {
    log::info!("🚗 POST /rides - driver: {}", user.email);

    let ride = rides
        .create(&user.email, &user.school, &request, &geo, Utc::now())
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "ride": ride
    })))
}

/// POST /api/rides/search - Com from e to o raio é ignorado
#[utoipa::path(
    post,
    path = "/api/rides/search",
    tag = "Rides",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching rides sorted by departure"),
        (status = 400, description = "School parameter required")
    ),
    security(("bearer_auth" = []))
)]
#[post("/search")]
pub async fn search_rides(request: web::Json<SearchRequest>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    let list = rides.search(&request).await?;
    Ok(rides_response(list))
}

/// GET /api/rides/locations - Campus + cidades próximas
#[utoipa::path(
    get,
    path = "/api/rides/locations",
    tag = "Rides",
    params(LocationsQuery),
    responses(
        (status = 200, description = "Campus first, then nearby cities", body = Locations),
        (status = 404, description = "University not found")
    ),
    security(("bearer_auth" = []))
)]
#[get("/locations")]
pub async fn get_locations(
    user: web::ReqData<Claims>,
    query: web::Query<LocationsQuery>,
    geo: web::Data<GeoService>,
) -> Result<HttpResponse, AppError> {
    let school = query
        .school
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| user.school.trim());

    if school.is_empty() {
        return Err(AppError::InvalidRequest("School parameter required".to_string()));
    }

    let miles = query
        .miles
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(DEFAULT_RADIUS_MILES);

    let locations = geo.locations(school, miles, query.query.as_deref())?;
    Ok(HttpResponse::Ok().json(locations))
}

#[get("/mine/created")]
pub async fn get_created_rides(user: web::ReqData<Claims>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    Ok(rides_response(rides.created_by(&user.email).await?))
}

#[get("/mine/joined")]
pub async fn get_joined_rides(user: web::ReqData<Claims>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    Ok(rides_response(rides.joined_by(&user.email).await?))
}

#[get("/mine/requested")]
pub async fn get_requested_rides(user: web::ReqData<Claims>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    Ok(rides_response(rides.requested_by(&user.email).await?))
}

#[get("/{id}")]
pub async fn get_ride(path: web::Path<String>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.get(&path).await?))
}

/// PATCH /api/rides/{id} - Motorista edita horário, vagas ou notas
#[utoipa::path(
    patch,
    path = "/api/rides/{id}",
    tag = "Rides",
    request_body = UpdateRideRequest,
    params(("id" = String, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride updated", body = Ride),
        (status = 400, description = "Capacity below approved passengers"),
        (status = 403, description = "Caller is not the driver")
    ),
    security(("bearer_auth" = []))
)]
#[patch("/{id}")]
pub async fn update_ride(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateRideRequest>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.update(&path, &user.email, &request).await?))
}

#[delete("/{id}")]
pub async fn delete_ride(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️ DELETE /rides/{} - driver: {}", path, user.email);

    rides.delete(&path, &user.email).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Ride deleted"
    })))
}

// ==================== PASSENGER ====================

/// POST /api/rides/{id}/request - Pede uma vaga (aguarda aprovação)
#[utoipa::path(
    post,
    path = "/api/rides/{id}/request",
    tag = "Rides",
    params(("id" = String, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Request recorded", body = Ride),
        (status = 400, description = "No seats, already in ride or already requested"),
        (status = 404, description = "Ride not found"),
        (status = 429, description = "Cooldown running or request cap reached")
    ),
    security(("bearer_auth" = []))
)]
#[post("/{id}/request")]
pub async fn request_to_join(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.request_to_join(&path, &user.email, Utc::now()).await?))
}

#[post("/{id}/join")]
pub async fn join_ride(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.join(&path, &user.email, Utc::now()).await?))
}

#[post("/{id}/leave")]
pub async fn leave_ride(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.leave(&path, &user.email, Utc::now()).await?))
}

// ==================== DRIVER ====================

/// POST /api/rides/{id}/approve - Motorista aprova um pedido pendente
#[utoipa::path(
    post,
    path = "/api/rides/{id}/approve",
    tag = "Rides",
    request_body = PassengerActionRequest,
    params(("id" = String, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Passenger approved", body = Ride),
        (status = 400, description = "Ride is full or no pending request"),
        (status = 403, description = "Caller is not the driver")
    ),
    security(("bearer_auth" = []))
)]
#[post("/{id}/approve")]
pub async fn approve_request(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<PassengerActionRequest>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.approve(&path, &user.email, &request.email).await?))
}

#[post("/{id}/reject")]
pub async fn reject_request(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<PassengerActionRequest>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(
        rides.reject(&path, &user.email, &request.email, Utc::now()).await?,
    ))
}

#[post("/{id}/remove-passenger")]
pub async fn remove_passenger(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<PassengerActionRequest>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(
        rides
            .remove_passenger(&path, &user.email, &request.email, Utc::now())
            .await?,
    ))
}

/// POST /api/rides/{id}/complete - Motorista marca como concluída
#[utoipa::path(
    post,
    path = "/api/rides/{id}/complete",
    tag = "Rides",
    params(("id" = String, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride marked as completed", body = Ride),
        (status = 400, description = "Already completed or marked for deletion")
    ),
    security(("bearer_auth" = []))
)]
#[post("/{id}/complete")]
pub async fn complete_ride(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.mark_completed(&path, &user.email, Utc::now()).await?))
}

#[post("/{id}/uncomplete")]
pub async fn uncomplete_ride(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    rides: web::Data<RideService>,
) -> Result<HttpResponse, AppError> {
    Ok(ride_response(rides.unmark_completed(&path, &user.email, Utc::now()).await?))
}

/// Registra as rotas de `/api/rides`; as fixas antes de `/{id}`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_school_rides)
        .service(create_ride)
        .service(search_rides)
        .service(get_locations)
        .service(get_created_rides)
        .service(get_joined_rides)
        .service(get_requested_rides)
        .service(get_ride)
        .service(update_ride)
        .service(delete_ride)
        .service(request_to_join)
        .service(join_ride)
        .service(leave_ride)
        .service(approve_request)
        .service(reject_request)
        .service(remove_passenger)
        .service(complete_ride)
        .service(uncomplete_ride);
}
