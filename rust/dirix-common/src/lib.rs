//! Core definitions (error types and common aliases), relied upon by all dirix-* crates.

pub mod error;
pub mod result;

pub use result::Result;
