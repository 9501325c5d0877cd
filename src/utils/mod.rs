// Utility functions
pub mod cache;
pub mod error;
pub mod geo;

pub use cache::*;
pub use error::*;
pub use geo::*;
