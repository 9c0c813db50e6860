//! Database repositories for data access layer
//
// Moderation requests, results and notification logs
pub mod moderation;
//
// In-process store (tests, local runs)
#[cfg(feature = "memory")]
pub mod memory;
