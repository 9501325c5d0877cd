pub mod ride;
pub mod school;

pub use ride::*;
pub use school::*;
