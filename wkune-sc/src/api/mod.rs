//! HTTP API handlers for wkune-sc

pub mod error;
pub mod health;
pub mod sessions;
pub mod sse;

pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use sessions::*;
pub use sse::event_stream;
