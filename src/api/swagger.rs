use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GoTogether API - Campus Carpool",
        version = "1.0.0",
        description = "Ride sharing between college campuses and nearby cities.\n\n**Authentication:** ride and auth endpoints require a JWT Bearer token.\n\n**Features:**\n- Publish, search and manage rides\n- Join requests with driver approval\n- Automatic ride status lifecycle\n- Nearby city lookup per campus",
        contact(
            name = "GoTogether Team",
            email = "support@gotogether.app"
        )
    ),
    paths(
        // Auth
        crate::api::auth::verify_token,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Rides
        crate::api::rides::list_school_rides,
        crate::api::rides::create_ride,
        crate::api::rides::search_rides,
        crate::api::rides::get_locations,
        crate::api::rides::update_ride,
        crate::api::rides::request_to_join,
        crate::api::rides::approve_request,
        crate::api::rides::complete_ride,

        // Schools
        crate::api::schools::list_schools,
        crate::api::schools::list_states,
        crate::api::schools::get_schools_by_state,
        crate::api::schools::get_school_domain,
        crate::api::nearby::get_nearby,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::VerifyTokenResponse,

            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Rides
            crate::models::Ride,
            crate::models::RideStatus,
            crate::models::RideStatusKind,
            crate::services::ride_service::CreateRideRequest,
            crate::services::ride_service::UpdateRideRequest,
            crate::services::ride_service::SearchRequest,
            crate::services::ride_service::PassengerActionRequest,
            crate::services::ride_service::SweepSummary,
            crate::services::geo_service::Locations,

            // Schools
            crate::models::SchoolSummary,
            crate::models::SchoolDomain,
            crate::models::NearbyCity,
            crate::models::NearbyResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Token verification. Tokens are issued by the login service."),
        (name = "Health", description = "Health check and metrics endpoints for monitoring service status."),
        (name = "Rides", description = "Ride publishing, search, join requests and driver actions."),
        (name = "Schools", description = "University catalog lookups."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}
