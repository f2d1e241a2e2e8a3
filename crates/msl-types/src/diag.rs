use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity.
///
/// Warnings use the 5000 code range and never fail a checking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Numeric diagnostic code.
///
/// Codes are part of the external contract with diagnostic consumers and
/// must not be renumbered. Errors live in 3000–3999, warnings in 5000–5999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiagCode(pub u16);

impl DiagCode {
    // ── Definition checking (3000–3099) ──
    pub const UNEXPECTED_RESULT_TYPE: Self = Self(3018);
    pub const NARROWER_PARAM_VISIBILITY: Self = Self(3019);
    pub const TOO_MANY_PARAMETER_PATTERNS: Self = Self(3020);
    pub const TOO_FEW_PARAMETER_PATTERNS: Self = Self(3021);
    pub const TOO_MANY_CURRIED_PARAMETERS: Self = Self(3022);
    pub const INFINITE_TYPE: Self = Self(3050);

    // ── Expressions (3100–3199) ──
    pub const NOT_A_FUNCTION: Self = Self(3100);
    pub const WRONG_ARGUMENT_COUNT: Self = Self(3101);
    pub const INCOMPATIBLE_ARGUMENT: Self = Self(3102);
    pub const NON_BOOLEAN_CONDITION: Self = Self(3103);
    pub const NON_NUMERIC_OPERAND: Self = Self(3104);
    pub const WRONG_TYPE_ARGUMENT_COUNT: Self = Self(3105);
    pub const INACCESSIBLE_MEMBER: Self = Self(3106);
    pub const NOT_IN_SCOPE: Self = Self(3182);

    // ── Patterns and binds (3198–3269) ──
    pub const TYPE_BIND_INCOMPATIBLE: Self = Self(3198);
    pub const BIND_INCOMPATIBLE: Self = Self(3199);
    pub const PATTERN_MISMATCH: Self = Self(3200);
    pub const SEQ_BIND_NOT_IN_CLASSIC: Self = Self(3263);

    // ── Measures (3270–3330) ──
    pub const MEASURE_NOT_IN_SCOPE: Self = Self(3270);
    pub const MEASURE_NOT_EXPLICIT: Self = Self(3271);
    pub const MEASURE_RANGE_NOT_NAT: Self = Self(3272);
    pub const MEASURE_PARAMS_DIFFER: Self = Self(3303);
    pub const MEASURE_IS_SELF: Self = Self(3304);
    pub const MEASURE_NOT_POLYMORPHIC: Self = Self(3309);
    pub const MEASURE_MUST_BE_POLYMORPHIC: Self = Self(3310);
    pub const MEASURE_TYPE_PARAMS_DIFFER: Self = Self(3318);

    // ── Name resolution (3400–3499) ──
    pub const UNRESOLVED_TYPE_NAME: Self = Self(3433);

    // ── Warnings (5000–5999) ──
    pub const UNUSED_DEFINITION: Self = Self(5000);
    pub const NO_MEASURE: Self = Self(5012);

    /// True if the code lies in the warning range.
    pub fn is_warning(self) -> bool {
        (5000..6000).contains(&self.0)
    }
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A structured checker diagnostic.
///
/// Diagnostic consumers render these; they must not parse free-form text.
/// `details` holds the optional "Actual …" / "Expected …" lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file name.
    pub file: String,
    pub code: DiagCode,
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// Detail lines, e.g. `Actual: nat` / `Expected: bool`.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<String>,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, code: DiagCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            file: file.into(),
            code,
            severity: if code.is_warning() {
                Severity::Warning
            } else {
                Severity::Error
            },
            message: message.into(),
            span,
            details: Vec::new(),
        }
    }

    /// Attach a single detail line.
    pub fn with_detail(mut self, label: &str, value: impl fmt::Display) -> Self {
        self.details.push(format!("{label}: {value}"));
        self
    }

    /// Attach the conventional Actual/Expected pair.
    pub fn with_actual_expected(
        self,
        actual: impl fmt::Display,
        expected: impl fmt::Display,
    ) -> Self {
        self.with_detail("Actual", actual).with_detail("Expected", expected)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.span, self.code, self.message)?;
        for d in &self.details {
            write!(f, "\n\t{d}")?;
        }
        Ok(())
    }
}

/// Per-run diagnostic sink.
///
/// A checking run always finishes and reports everything it found; there
/// is no fail-fast cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.errors.push(diag),
            Severity::Warning => self.warnings.push(diag),
        }
    }

    /// Attach a detail line to the most recent diagnostic.
    pub fn detail(&mut self, label: &str, value: impl fmt::Display) {
        if let Some(last) = self.errors.iter_mut().chain(self.warnings.iter_mut()).last() {
            last.details.push(format!("{label}: {value}"));
        }
    }

    pub fn error_codes(&self) -> Vec<DiagCode> {
        self.errors.iter().map(|e| e.code).collect()
    }
}

/// A defect in the checker itself, as opposed to a problem in the input
/// specification. These propagate out of the run instead of joining the
/// diagnostic sink.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("cannot change type qualifier of hashed name: {0}")]
    QualifierChanged(String),
    #[error("definition '{name}' used before reaching stage {required}")]
    StageViolation { name: String, required: String },
    #[error("pattern bind queried before type checking")]
    UncheckedPatternBind,
}
