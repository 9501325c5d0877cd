use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::RideStatusKind;
use crate::services::RideService;

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub rides_total: u64,
    pub rides_active: u64,
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus text metrics", body = MetricsResponse)
    )
)]
pub async fn get_metrics(rides: web::Data<RideService>) -> HttpResponse {
    let requests = REQUEST_COUNT.load(Ordering::Relaxed);
    let errors = ERROR_COUNT.load(Ordering::Relaxed);

    // falha no store não derruba o endpoint; os gauges ficam zerados
    let (total, active) = match rides.repository().all().await {
        Ok(all) => (
            all.len(),
            all.iter()
                .filter(|r| r.status.status == RideStatusKind::Active)
                .count(),
        ),
        Err(e) => {
            log::warn!("⚠️  Metrics could not read rides: {}", e);
            (0, 0)
        }
    };

    let metrics = format!(
        "# HELP http_requests_total Total number of HTTP requests\n\
         # TYPE http_requests_total counter\n\
         http_requests_total {}\n\
         \n\
         # HELP http_errors_total Total number of HTTP errors\n\
         # TYPE http_errors_total counter\n\
         http_errors_total {}\n\
         \n\
         # HELP rides_total Rides currently stored\n\
         # TYPE rides_total gauge\n\
         rides_total {}\n\
         \n\
         # HELP rides_active Rides in active status\n\
         # TYPE rides_active gauge\n\
         rides_active {}\n",
        requests, errors, total, active
    );

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ride_service::tests::service_with;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_metrics_exposes_counters() {
        increment_request_count();
        increment_error_count();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service_with(vec![])))
                .route("/metrics", web::get().to(get_metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("# TYPE http_requests_total counter"));
        assert!(text.contains("rides_total 0"));
        assert!(text.contains("rides_active 0"));
    }
}
