pub mod auth;
pub mod debug;
pub mod health;
pub mod metrics;
pub mod nearby;
pub mod rides;
pub mod schools;
pub mod swagger;
