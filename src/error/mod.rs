//! Error handling built on `thiserror` and `anyhow`.
//!
//! This module provides both domain-specific error types for precise error
//! handling and operational error context propagation for fatal-error reporting.

pub mod domain;
pub mod operational;

pub use {
    domain::{AudioError, UiError},
    operational::{ErrorReporter, ResultExt},
};
