//! Moderator Database Layer
//!
//! Persistence for moderation requests, their results and alert delivery logs.
//! Callers depend on the `ModerationStore` trait; PostgreSQL backs it in
//! production and an in-memory implementation is available behind `memory`.

pub mod db;

pub use db::moderation::{ModerationStore, PostgresModerationRepository};

#[cfg(feature = "memory")]
pub use db::memory::InMemoryModerationRepository;
