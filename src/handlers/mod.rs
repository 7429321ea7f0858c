//! HTTP handlers for mounted resources.

pub mod resource;
pub use resource::*;
