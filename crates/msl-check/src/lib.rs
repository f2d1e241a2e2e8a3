//! MSL checker core.
//!
//! The semantic half of the MSL toolchain: the parser hands over modules
//! of definitions ([`msl_types::ast`]), and this crate resolves their
//! named types, type-checks every definition and expression, and records
//! the proof obligations that checking cannot discharge statically.
//!
//! The one-call entry point is [`check_module`]; [`Checker`] exposes the
//! same machinery for callers that want to inspect the registry or drive
//! the passes themselves.

pub mod checker;
pub mod compare;
pub mod defs;
pub mod env;
mod expr;
pub mod pattern;
pub mod po;
pub mod registry;
pub mod settings;
pub mod ty;
pub mod typeset;
pub mod union;

pub use checker::{check_module, CheckOutcome, Checker};
pub use compare::{compatible, is_sub_type};
pub use pattern::PatternBind;
pub use po::{PoKind, ProofObligation, ProofObligationList};
pub use registry::TypeRegistry;
pub use settings::{Dialect, Release, Settings};
pub use ty::{NumericKind, Type, TypeKind};
pub use typeset::{TypeList, TypeSet};
