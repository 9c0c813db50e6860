//! Data models for the application
//!
//! Stored rows, their lifecycle enums, and the request/response shapes of the
//! HTTP surface, organized by feature area.

mod analytics;
mod moderation;
mod submission;
mod summary;

pub use analytics::*;
pub use moderation::*;
pub use submission::*;
pub use summary::*;
