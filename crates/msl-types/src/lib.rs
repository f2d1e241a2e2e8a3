//! Shared types for the MSL checker.
//!
//! This crate defines the AST node types consumed from the parser, source
//! spans, qualified names, and the structured diagnostics emitted to
//! external consumers.

mod diag;
mod name;
mod span;
pub mod ast;

pub use diag::{DiagCode, Diagnostic, Diagnostics, InternalError, Severity};
pub use name::Name;
pub use span::Span;

/// Result type for operations that can hit a checker defect.
pub type Result<T> = std::result::Result<T, InternalError>;
