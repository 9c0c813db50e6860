//! Moderator API Library
//!
//! HTTP handlers, services, middleware and application setup for the content
//! moderation service.

mod api_doc;
pub mod constants;
mod handlers;
pub mod middleware;
mod telemetry;

pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
