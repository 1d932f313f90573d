//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;

pub use error::{PlatformError, Result};
