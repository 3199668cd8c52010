//! HTTP surface of the faction-poll service
//!
//! JSON endpoints for submitting and viewing ratings, plus the health
//! probes and Prometheus scrape endpoint.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use handlers::SubmitScoresRequest;
pub use server::{build_router, RatingServer, ServerConfig};
