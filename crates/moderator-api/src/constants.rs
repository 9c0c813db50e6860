//! API constants

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Versioned prefix used by the analytics endpoints
pub const API_V1_PREFIX: &str = "/api/v1";

pub const SERVICE_NAME: &str = "Smart Content Moderator";

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Headroom on top of the image limit for multipart framing and form fields.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
