// Roteador de debug: só é montado com DEBUG_ROUTES_ENABLED=true fora de produção (ver main.rs).
// Todas as rotas, menos /debug/token, exigem um token com role de debug.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::middleware::auth::Claims;
use crate::models::Ride;
use crate::services::auth_service::{issue_token, DEBUG_ROLE};
use crate::services::RideService;
use crate::utils::AppError;

const DEBUG_TOKEN_TTL_HOURS: i64 = 24;
/// Identidade fixa dos tokens de debug
pub const DEBUG_EMAIL: &str = "debug@admin.com";

/// Estado compartilhado pelas rotas de debug
pub struct DebugState {
    pub started_at: DateTime<Utc>,
    pub environment: String,
    pub jwt_secret: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RideStats {
    pub total_rides: usize,
    pub total_passengers: usize,
    pub total_pending: usize,
    pub total_seats: u64,
    pub available_seats: u64,
    pub by_school: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
}

impl RideStats {
    pub fn from_rides(rides: &[Ride]) -> Self {
        let mut stats = RideStats {
            total_rides: rides.len(),
            ..RideStats::default()
        };

        for ride in rides {
            stats.total_passengers += ride.passengers.len();
            stats.total_pending += ride.pending_requests.len();
            stats.total_seats = stats.total_seats.saturating_add(u64::from(ride.seats_available));
            stats.available_seats = stats.available_seats.saturating_add(u64::from(ride.remaining_seats()));
            *stats.by_school.entry(ride.school.clone()).or_default() += 1;
            *stats.by_status.entry(ride.status.status.to_string()).or_default() += 1;
        }

        stats
    }
}

/// Caronas de um usuário, por papel
#[derive(Debug, Default, Serialize)]
pub struct UserRideIds {
    pub driving: Vec<String>,
    pub riding: Vec<String>,
    pub pending: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub email: String,
    pub rides_as_driver: usize,
    pub rides_as_passenger: usize,
    pub pending_requests: usize,
    pub ride_ids: UserRideIds,
}

/// Atividade por email, em ordem alfabética
pub fn user_activity(rides: &[Ride]) -> Vec<UserActivity> {
    let mut users: BTreeMap<&str, UserRideIds> = BTreeMap::new();

    for ride in rides {
        users.entry(ride.driver_email.as_str()).or_default().driving.push(ride.id.clone());
        for email in &ride.passengers {
            users.entry(email.as_str()).or_default().riding.push(ride.id.clone());
        }
        for email in &ride.pending_requests {
            users.entry(email.as_str()).or_default().pending.push(ride.id.clone());
        }
    }

    users
        .into_iter()
        .map(|(email, ride_ids)| UserActivity {
            email: email.to_string(),
            rides_as_driver: ride_ids.driving.len(),
            rides_as_passenger: ride_ids.riding.len(),
            pending_requests: ride_ids.pending.len(),
            ride_ids,
        })
        .collect()
}

/// GET /debug/token
pub async fn debug_token(state: web::Data<DebugState>) -> Result<HttpResponse, AppError> {
    let token = issue_token(
        &state.jwt_secret,
        DEBUG_EMAIL,
        "",
        Some(DEBUG_ROLE),
        Duration::hours(DEBUG_TOKEN_TTL_HOURS),
    )
    .map_err(AppError::InvalidRequest)?;

    log::warn!("🐛 Debug token issued for {}", DEBUG_EMAIL);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "token": token,
        "expires_in": DEBUG_TOKEN_TTL_HOURS * 3600
    })))
}

/// GET /debug/status
pub async fn debug_status(state: web::Data<DebugState>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let ride_count = rides.repository().all().await?.len();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "environment": state.environment,
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": (now - state.started_at).num_seconds(),
        "store": rides.repository().backend(),
        "rides": ride_count,
        "limiter": rides.limiter().stats(),
        "timestamp": now.to_rfc3339()
    })))
}

/// GET /debug/rides
pub async fn debug_rides(rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    let all = rides.repository().all().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "stats": RideStats::from_rides(&all),
        "rides": all
    })))
}

/// GET /debug/users
pub async fn debug_users(rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    let all = rides.repository().all().await?;
    let users = user_activity(&all);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "totalUsers": users.len(),
        "users": users
    })))
}

/// GET /debug/events - Configuração e estado do limitador de pedidos
pub async fn debug_events(rides: web::Data<RideService>) -> HttpResponse {
    let limiter = rides.limiter();
    let config = limiter.config();
    let window = config.cooldown.num_minutes();

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "cooldowns": {
            "rideRequest": format!("{} minutes between requests", window),
            "maxRequests": format!("{} requests per {} minutes", config.max_requests, window),
            "cooldownMinutes": window,
            "maxRequestsPerWindow": config.max_requests
        },
        "active": limiter.stats()
    }))
}

/// POST /debug/clear-limiters
pub async fn clear_limiters(user: web::ReqData<Claims>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    rides.limiter().clear();
    log::warn!("🐛 Request limiters cleared by {}", user.email);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Cooldowns and request limits cleared"
    })))
}

/// POST /debug/check-statuses
pub async fn check_statuses(user: web::ReqData<Claims>, rides: web::Data<RideService>) -> Result<HttpResponse, AppError> {
    let summary = rides.sweep_statuses(Utc::now()).await?;
    log::info!("🐛 Manual status check by {}: {:?}", user.email, summary);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "summary": summary
    })))
}
