//! High-level API wrappers for auction endpoints
//!
//! This module provides convenient wrappers around the raw HTTP client,
//! adding validation and flattening transport errors into the structured
//! `{success, message}` responses callers display directly.

mod bidding;

pub use bidding::*;
