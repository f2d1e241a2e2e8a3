//! Dialect and language-release configuration.
//!
//! The checker never reads process-wide state; an explicit [`Settings`]
//! value is threaded through every checking context.

use serde::{Deserialize, Serialize};

/// The language dialect being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// Flat functional dialect: modules, no classes.
    Sl,
    /// Object-oriented dialect: classes, access control, overloading.
    Pp,
    /// Real-time dialect: Pp plus system classes (CPU/BUS deployment).
    Rt,
}

impl Dialect {
    /// True for the dialects with classes. Function names acquire a type
    /// qualifier for overload resolution only in these dialects.
    pub fn is_object_oriented(self) -> bool {
        matches!(self, Dialect::Pp | Dialect::Rt)
    }
}

/// Language release selection, affecting a handful of checking rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Release {
    Classic,
    Vdm10,
}

/// Checking configuration carried by the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub dialect: Dialect,
    pub release: Release,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Sl,
            release: Release::Vdm10,
        }
    }
}

impl Settings {
    pub fn new(dialect: Dialect, release: Release) -> Self {
        Self { dialect, release }
    }
}
