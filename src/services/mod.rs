pub mod auth_service;
pub mod geo_service;
pub mod request_limiter;
pub mod ride_service;

pub use geo_service::GeoService;
pub use ride_service::RideService;
