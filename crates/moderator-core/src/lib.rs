//! Moderator Core Library
//!
//! This crate provides the domain models, error types, configuration, content hashing
//! and analytics aggregation shared across all moderator components.

pub mod analytics;
pub mod config;
pub mod error;
pub mod hashing;
pub mod models;

// Re-export commonly used types
pub use config::{Config, ProviderKind};
pub use error::{AppError, ErrorMetadata, FieldViolation, LogLevel};
