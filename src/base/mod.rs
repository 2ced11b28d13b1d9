//! Foundation types for the descent toolkit.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`Position`], [`Span`] - Line/column positions for tokens and diagnostics
//!
//! This module has NO dependencies on other descent modules.

mod position;

pub use position::{Position, Span};
