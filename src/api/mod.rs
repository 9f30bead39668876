//! API layer
//!
//! REST endpoints dispatching into the reconciliation service.

pub mod error;
pub mod handlers;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use rest::*;
