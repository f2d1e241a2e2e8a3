//! Pattern and bind checking.
//!
//! Checking a pattern against a type produces one local [`Definition`]
//! per bound identifier. Duplicate names inside one pattern are not an
//! error here; they surface later as a parameter-pattern-match proof
//! obligation, because `mk_(x, x)` only matches when both components are
//! equal.
//!
//! [`PatternBind`] wraps a pattern-or-bind as used by statements; asking
//! it for its definitions before it has been checked is a checker fault.

use msl_types::ast::{Pattern, PatternKind, PatternOrBind};
use msl_types::{DiagCode, Diagnostic, Diagnostics, InternalError, Name};

use crate::compare;
use crate::defs::{AccessSpecifier, DefId, DefKind, Definition, Definitions};
use crate::registry::TypeRegistry;
use crate::ty::{NumericKind, Type};

/// Shared context for one pattern-checking call tree.
pub(crate) struct PatternCtx<'a> {
    pub file: &'a str,
    pub registry: &'a TypeRegistry,
    pub diags: &'a mut Diagnostics,
}

/// Check `pattern` against the type of the value it will match,
/// returning the local definitions it binds, in source order.
pub(crate) fn check_pattern(
    pattern: &Pattern,
    expected: &Type,
    ctx: &mut PatternCtx<'_>,
    defs: &mut Definitions,
) -> Vec<DefId> {
    let mut out = Vec::new();
    check_into(pattern, expected, ctx, defs, &mut out);
    out
}

fn check_into(
    pattern: &Pattern,
    expected: &Type,
    ctx: &mut PatternCtx<'_>,
    defs: &mut Definitions,
    out: &mut Vec<DefId>,
) {
    match &pattern.kind {
        PatternKind::Identifier(name) => {
            out.push(defs.alloc(Definition::new(
                name.clone(),
                AccessSpecifier::DEFAULT,
                pattern.span,
                DefKind::Local {
                    ty: expected.clone(),
                },
            )));
        }
        PatternKind::Ignore => {}
        PatternKind::BoolLit(_) => {
            if !compare::compatible(&Type::boolean(pattern.span), expected, ctx.registry) {
                mismatch(pattern, expected, ctx);
            }
        }
        PatternKind::IntLit(n) => {
            let kind = if *n >= 0 {
                NumericKind::Natural
            } else {
                NumericKind::Int
            };
            if !compare::compatible(&Type::numeric(kind, pattern.span), expected, ctx.registry) {
                mismatch(pattern, expected, ctx);
            }
        }
        PatternKind::Tuple(parts) => match expected.product_view(parts.len(), ctx.registry) {
            Some(view) => {
                let members = view.as_product().cloned().unwrap_or_default();
                for (part, ty) in parts.iter().zip(members.iter()) {
                    check_into(part, ty, ctx, defs, out);
                }
            }
            None => {
                mismatch(pattern, expected, ctx);
                // Bind the components anyway so the body still checks.
                for part in parts {
                    check_into(part, &Type::unknown(pattern.span), ctx, defs, out);
                }
            }
        },
        PatternKind::Record { name, fields } => {
            check_record_pattern(pattern, name, fields, expected, ctx, defs, out)
        }
    }
}

fn check_record_pattern(
    pattern: &Pattern,
    name: &Name,
    fields: &[Pattern],
    expected: &Type,
    ctx: &mut PatternCtx<'_>,
    defs: &mut Definitions,
    out: &mut Vec<DefId>,
) {
    let Some(declared) = ctx.registry.lookup(name).cloned() else {
        ctx.diags.push(Diagnostic::new(
            ctx.file,
            DiagCode::UNRESOLVED_TYPE_NAME,
            format!("Unable to resolve type name '{}'", name.display_name()),
            pattern.span,
        ));
        for field in fields {
            check_into(field, &Type::unknown(pattern.span), ctx, defs, out);
        }
        return;
    };
    let Some(view) = declared.record_view(ctx.registry) else {
        mismatch(pattern, expected, ctx);
        return;
    };
    let Some(rec) = view.as_record().cloned() else {
        mismatch(pattern, expected, ctx);
        return;
    };
    if !compare::compatible(&declared, expected, ctx.registry) {
        mismatch(pattern, expected, ctx);
    }
    if rec.fields.len() != fields.len() {
        ctx.diags.push(
            Diagnostic::new(
                ctx.file,
                DiagCode::PATTERN_MISMATCH,
                format!(
                    "Record pattern for '{}' has wrong number of fields",
                    name.display_name()
                ),
                pattern.span,
            )
            .with_actual_expected(fields.len(), rec.fields.len()),
        );
    }
    for (field_pattern, field) in fields.iter().zip(rec.fields.iter()) {
        check_into(field_pattern, &field.ty, ctx, defs, out);
    }
}

fn mismatch(pattern: &Pattern, expected: &Type, ctx: &mut PatternCtx<'_>) {
    ctx.diags.push(
        Diagnostic::new(
            ctx.file,
            DiagCode::PATTERN_MISMATCH,
            "Pattern does not match type",
            pattern.span,
        )
        .with_detail("Expected", expected),
    );
}

/// Check a type bind `p : T`: the declared type must be compatible with
/// the type of the value being bound.
pub(crate) fn check_type_bind(
    pattern: &Pattern,
    declared: &Type,
    value: &Type,
    ctx: &mut PatternCtx<'_>,
    defs: &mut Definitions,
) -> Vec<DefId> {
    if !compare::compatible(declared, value, ctx.registry) {
        ctx.diags.push(
            Diagnostic::new(
                ctx.file,
                DiagCode::TYPE_BIND_INCOMPATIBLE,
                "Type bind not compatible with expression",
                pattern.span,
            )
            .with_actual_expected(value, declared),
        );
    }
    check_pattern(pattern, declared, ctx, defs)
}

/// Check a collection bind `p in set e` / `p in seq e`: the source must
/// actually be a set (resp. seq), and the pattern matches its elements.
pub(crate) fn check_collection_bind(
    pattern: &Pattern,
    source: &Type,
    seq: bool,
    ctx: &mut PatternCtx<'_>,
    defs: &mut Definitions,
) -> Vec<DefId> {
    let elem = if seq {
        source
            .seq_view(ctx.registry)
            .and_then(|v| v.as_seq_elem().cloned())
    } else {
        source
            .set_view(ctx.registry)
            .and_then(|v| v.as_set_elem().cloned())
    };
    match elem {
        Some(elem) => check_pattern(pattern, &elem, ctx, defs),
        None => {
            ctx.diags.push(
                Diagnostic::new(
                    ctx.file,
                    DiagCode::BIND_INCOMPATIBLE,
                    format!(
                        "Bind source is not a {}",
                        if seq { "sequence" } else { "set" }
                    ),
                    pattern.span,
                )
                .with_detail("Actual", source),
            );
            check_pattern(pattern, &Type::unknown(pattern.span), ctx, defs)
        }
    }
}

/// A pattern-or-bind plus the definitions its check produced.
#[derive(Debug)]
pub struct PatternBind {
    pub pb: PatternOrBind,
    defs: Option<Vec<DefId>>,
}

impl PatternBind {
    pub fn new(pb: PatternOrBind) -> Self {
        Self { pb, defs: None }
    }

    pub fn is_checked(&self) -> bool {
        self.defs.is_some()
    }

    pub(crate) fn set_definitions(&mut self, defs: Vec<DefId>) {
        self.defs = Some(defs);
    }

    /// The bindings produced by checking. Calling this before the bind
    /// has been checked is an internal fault.
    pub fn definitions(&self) -> Result<&[DefId], InternalError> {
        self.defs
            .as_deref()
            .ok_or(InternalError::UncheckedPatternBind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msl_types::{Diagnostics, Span};

    fn span() -> Span {
        Span::point(1, 1)
    }

    fn name(s: &str) -> Name {
        Name::new("M", s, span())
    }

    fn nat() -> Type {
        Type::numeric(NumericKind::Natural, span())
    }

    struct Fixture {
        registry: TypeRegistry,
        diags: Diagnostics,
        defs: Definitions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: TypeRegistry::new(),
                diags: Diagnostics::new(),
                defs: Definitions::new(),
            }
        }

        fn check(&mut self, pattern: &Pattern, expected: &Type) -> Vec<DefId> {
            let mut ctx = PatternCtx {
                file: "t.msl",
                registry: &self.registry,
                diags: &mut self.diags,
            };
            check_pattern(pattern, expected, &mut ctx, &mut self.defs)
        }
    }

    #[test]
    fn test_identifier_binds_expected_type() {
        let mut fx = Fixture::new();
        let ids = fx.check(&Pattern::identifier(name("x")), &nat());
        assert_eq!(ids.len(), 1);
        assert!(!fx.diags.has_errors());
        assert_eq!(fx.defs.get(ids[0]).value_type(), Some(&nat()));
    }

    #[test]
    fn test_tuple_pattern_against_product() {
        let mut fx = Fixture::new();
        let product = Type::product(
            vec![nat(), Type::boolean(span())].into_iter().collect(),
            span(),
        );
        let p = Pattern::new(
            PatternKind::Tuple(vec![
                Pattern::identifier(name("a")),
                Pattern::identifier(name("b")),
            ]),
            span(),
        );
        let ids = fx.check(&p, &product);
        assert!(!fx.diags.has_errors());
        assert_eq!(ids.len(), 2);
        assert_eq!(fx.defs.get(ids[1]).value_type(), Some(&Type::boolean(span())));
    }

    #[test]
    fn test_tuple_pattern_against_non_product_reports() {
        let mut fx = Fixture::new();
        let p = Pattern::new(
            PatternKind::Tuple(vec![Pattern::identifier(name("a"))]),
            span(),
        );
        let ids = fx.check(&p, &nat());
        assert_eq!(fx.diags.error_codes(), vec![DiagCode::PATTERN_MISMATCH]);
        // Error recovery still binds the component.
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_literal_pattern_type_mismatch() {
        let mut fx = Fixture::new();
        fx.check(&Pattern::new(PatternKind::IntLit(3), span()), &Type::boolean(span()));
        assert_eq!(fx.diags.error_codes(), vec![DiagCode::PATTERN_MISMATCH]);
    }

    #[test]
    fn test_duplicate_names_are_not_an_error() {
        let mut fx = Fixture::new();
        let product = Type::product(vec![nat(), nat()].into_iter().collect(), span());
        let p = Pattern::new(
            PatternKind::Tuple(vec![
                Pattern::identifier(name("x")),
                Pattern::identifier(name("x")),
            ]),
            span(),
        );
        let ids = fx.check(&p, &product);
        assert!(!fx.diags.has_errors());
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_type_bind_incompatible_reports_3198() {
        let mut fx = Fixture::new();
        let mut ctx = PatternCtx {
            file: "t.msl",
            registry: &fx.registry,
            diags: &mut fx.diags,
        };
        check_type_bind(
            &Pattern::identifier(name("x")),
            &Type::boolean(span()),
            &nat(),
            &mut ctx,
            &mut fx.defs,
        );
        assert_eq!(fx.diags.error_codes(), vec![DiagCode::TYPE_BIND_INCOMPATIBLE]);
    }

    #[test]
    fn test_set_bind_over_non_set_reports_3199() {
        let mut fx = Fixture::new();
        let mut ctx = PatternCtx {
            file: "t.msl",
            registry: &fx.registry,
            diags: &mut fx.diags,
        };
        check_collection_bind(
            &Pattern::identifier(name("x")),
            &nat(),
            false,
            &mut ctx,
            &mut fx.defs,
        );
        assert_eq!(fx.diags.error_codes(), vec![DiagCode::BIND_INCOMPATIBLE]);
    }

    #[test]
    fn test_set_bind_binds_element_type() {
        let mut fx = Fixture::new();
        let mut ctx = PatternCtx {
            file: "t.msl",
            registry: &fx.registry,
            diags: &mut fx.diags,
        };
        let ids = check_collection_bind(
            &Pattern::identifier(name("x")),
            &Type::set(nat(), span()),
            false,
            &mut ctx,
            &mut fx.defs,
        );
        assert!(!fx.diags.has_errors());
        assert_eq!(fx.defs.get(ids[0]).value_type(), Some(&nat()));
    }

    #[test]
    fn test_unchecked_pattern_bind_is_internal_fault() {
        let pb = PatternBind::new(PatternOrBind::Pattern(Pattern::identifier(name("x"))));
        assert!(matches!(
            pb.definitions(),
            Err(InternalError::UncheckedPatternBind)
        ));
        let mut pb = pb;
        pb.set_definitions(vec![]);
        assert!(pb.definitions().is_ok());
    }
}
