//! Core use-case services.
//!
//! # Responsibility
//! - Expose the repository contract for every record kind to UI callers.
//! - Run cross-collection rules before mutations that can break them.

pub mod complex_service;
