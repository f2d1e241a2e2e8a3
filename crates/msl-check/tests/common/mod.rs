//! Shared builders for the integration tests.

#![allow(dead_code)]

use msl_check::checker::{check_module, CheckOutcome};
use msl_check::{PoKind, Settings};
use msl_types::ast::{
    AccessSpecifier, Bind, CompareOp, DefAst, DefAstKind, Expr, ExprKind, ModuleAst, MultiBind,
    MultiBindSource, Pattern, PatternKind, PatternOrBind, TypeAnnotation, TypeAnnotationKind,
};
use msl_types::{DiagCode, Name, Span};

pub fn span() -> Span {
    Span::point(1, 1)
}

pub fn name(s: &str) -> Name {
    Name::new("M", s, span())
}

pub fn qname(module: &str, s: &str) -> Name {
    Name::new(module, s, span())
}

// ── Type annotations ──

pub fn ann(kind: TypeAnnotationKind) -> TypeAnnotation {
    TypeAnnotation::new(kind, span())
}

pub fn nat_ann() -> TypeAnnotation {
    ann(TypeAnnotationKind::Nat)
}

pub fn bool_ann() -> TypeAnnotation {
    ann(TypeAnnotationKind::Bool)
}

pub fn named_ann(s: &str) -> TypeAnnotation {
    ann(TypeAnnotationKind::Named(name(s)))
}

pub fn seq_ann(elem: TypeAnnotation) -> TypeAnnotation {
    ann(TypeAnnotationKind::Seq {
        elem: Box::new(elem),
        non_empty: false,
    })
}

pub fn optional_ann(inner: TypeAnnotation) -> TypeAnnotation {
    ann(TypeAnnotationKind::Optional(Box::new(inner)))
}

pub fn union_ann(members: Vec<TypeAnnotation>) -> TypeAnnotation {
    ann(TypeAnnotationKind::Union(members))
}

pub fn fn_ann(params: Vec<TypeAnnotation>, result: TypeAnnotation) -> TypeAnnotation {
    ann(TypeAnnotationKind::Function {
        params,
        result: Box::new(result),
        total: false,
    })
}

pub fn op_ann(params: Vec<TypeAnnotation>, result: TypeAnnotation) -> TypeAnnotation {
    ann(TypeAnnotationKind::Operation {
        params,
        result: Box::new(result),
    })
}

pub fn record_ann(tag: &str, fields: Vec<(&str, TypeAnnotation)>) -> TypeAnnotation {
    ann(TypeAnnotationKind::Record {
        name: name(tag),
        fields: fields
            .into_iter()
            .map(|(f, t)| (f.to_string(), t))
            .collect(),
    })
}

pub fn param_ann(p: &str) -> TypeAnnotation {
    ann(TypeAnnotationKind::Parameter(p.to_string()))
}

pub fn product_ann(members: Vec<TypeAnnotation>) -> TypeAnnotation {
    ann(TypeAnnotationKind::Product(members))
}

// ── Expressions and patterns ──

pub fn ident(s: &str) -> Pattern {
    Pattern::identifier(name(s))
}

pub fn tuple_pat(parts: Vec<Pattern>) -> Pattern {
    Pattern::new(PatternKind::Tuple(parts), span())
}

pub fn bool_pat(b: bool) -> Pattern {
    Pattern::new(PatternKind::BoolLit(b), span())
}

pub fn var(s: &str) -> Expr {
    Expr::new(ExprKind::Variable(name(s)), span())
}

/// A variable reference qualified with a class or module name.
pub fn qvar(module: &str, s: &str) -> Expr {
    Expr::new(ExprKind::Variable(qname(module, s)), span())
}

pub fn int(n: i64) -> Expr {
    Expr::new(ExprKind::IntLit(n), span())
}

pub fn tru() -> Expr {
    Expr::new(ExprKind::BoolLit(true), span())
}

pub fn apply(f: Expr, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Apply {
            func: Box::new(f),
            type_args: vec![],
            args,
        },
        span(),
    )
}

pub fn apply_poly(f: Expr, type_args: Vec<TypeAnnotation>, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Apply {
            func: Box::new(f),
            type_args,
            args,
        },
        span(),
    )
}

pub fn eq(l: Expr, r: Expr) -> Expr {
    Expr::new(ExprKind::Equals(Box::new(l), Box::new(r)), span())
}

pub fn and(l: Expr, r: Expr) -> Expr {
    Expr::new(ExprKind::And(Box::new(l), Box::new(r)), span())
}

pub fn cmp(op: CompareOp, l: Expr, r: Expr) -> Expr {
    Expr::new(ExprKind::Compare(op, Box::new(l), Box::new(r)), span())
}

pub fn sub(l: Expr, r: Expr) -> Expr {
    Expr::new(
        ExprKind::Arith(msl_types::ast::ArithOp::Sub, Box::new(l), Box::new(r)),
        span(),
    )
}

pub fn if_expr(cond: Expr, then: Expr, els: Expr) -> Expr {
    Expr::new(
        ExprKind::If {
            cond: Box::new(cond),
            then: Box::new(then),
            els: Box::new(els),
        },
        span(),
    )
}

pub fn nil() -> Expr {
    Expr::new(ExprKind::Nil, span())
}

pub fn tuple_ctor(parts: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::TupleCtor(parts), span())
}

pub fn set_enum(elems: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::SetEnum(elems), span())
}

pub fn seq_enum(elems: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::SeqEnum(elems), span())
}

pub fn record_ctor(n: &str, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::RecordCtor {
            name: name(n),
            args,
        },
        span(),
    )
}

/// `let d1, ... in body`
pub fn let_expr(bindings: Vec<(PatternOrBind, Expr)>, body: Expr) -> Expr {
    Expr::new(
        ExprKind::Let {
            bindings,
            body: Box::new(body),
        },
        span(),
    )
}

pub fn plain(pattern: Pattern) -> PatternOrBind {
    PatternOrBind::Pattern(pattern)
}

/// `p : T`
pub fn type_bind(pattern: Pattern, ty: TypeAnnotation) -> PatternOrBind {
    PatternOrBind::Bind(Bind::Type { pattern, ty })
}

/// `p in set e`
pub fn set_bind(pattern: Pattern, set: Expr) -> PatternOrBind {
    PatternOrBind::Bind(Bind::Set { pattern, set })
}

/// `p in seq e`
pub fn seq_bind(pattern: Pattern, seq: Expr) -> PatternOrBind {
    PatternOrBind::Bind(Bind::Seq { pattern, seq })
}

/// `forall p : T & body`
pub fn forall(pattern: Pattern, ty: TypeAnnotation, body: Expr) -> Expr {
    Expr::new(
        ExprKind::Forall {
            binds: vec![MultiBind {
                patterns: vec![pattern],
                source: MultiBindSource::Type(ty),
                span: span(),
            }],
            body: Box::new(body),
        },
        span(),
    )
}

// ── Definitions ──

pub fn typedef(n: &str, ty: TypeAnnotation) -> DefAst {
    DefAst {
        name: name(n),
        access: AccessSpecifier::PUBLIC,
        span: span(),
        kind: DefAstKind::TypeDef {
            ty,
            invariant: None,
        },
    }
}

pub fn private_typedef(n: &str, ty: TypeAnnotation) -> DefAst {
    DefAst {
        access: AccessSpecifier::DEFAULT,
        ..typedef(n, ty)
    }
}

pub fn typedef_inv(n: &str, ty: TypeAnnotation, pattern: Pattern, inv: Expr) -> DefAst {
    DefAst {
        name: name(n),
        access: AccessSpecifier::PUBLIC,
        span: span(),
        kind: DefAstKind::TypeDef {
            ty,
            invariant: Some((pattern, inv)),
        },
    }
}

pub fn implicit_fn(
    n: &str,
    params: Vec<(&str, TypeAnnotation)>,
    result_name: &str,
    result_ty: TypeAnnotation,
    postcondition: Expr,
) -> DefAst {
    DefAst {
        name: name(n),
        access: AccessSpecifier::PUBLIC,
        span: span(),
        kind: DefAstKind::ImplicitFunction {
            type_params: vec![],
            params: params.into_iter().map(|(p, t)| (ident(p), t)).collect(),
            result_name: name(result_name),
            result_ty,
            precondition: None,
            postcondition,
        },
    }
}

pub fn operation(n: &str, ty: TypeAnnotation, params: Vec<Pattern>, body: Option<Expr>) -> DefAst {
    DefAst {
        name: name(n),
        access: AccessSpecifier::PUBLIC,
        span: span(),
        kind: DefAstKind::Operation {
            ty,
            params,
            body,
            precondition: None,
            postcondition: None,
        },
    }
}

pub fn value(n: &str, ty: Option<TypeAnnotation>, expr: Expr) -> DefAst {
    DefAst {
        name: name(n),
        access: AccessSpecifier::PUBLIC,
        span: span(),
        kind: DefAstKind::Value {
            pattern: ident(n),
            ty,
            expr,
        },
    }
}

pub fn class_def(n: &str, definitions: Vec<DefAst>) -> DefAst {
    DefAst {
        name: name(n),
        access: AccessSpecifier::PUBLIC,
        span: span(),
        kind: DefAstKind::Class { definitions },
    }
}

/// A public value member of a class; its name is qualified with the
/// class name.
pub fn member_value(class: &str, n: &str, ty: Option<TypeAnnotation>, expr: Expr) -> DefAst {
    DefAst {
        name: qname(class, n),
        access: AccessSpecifier::PUBLIC,
        span: span(),
        kind: DefAstKind::Value {
            pattern: Pattern::identifier(qname(class, n)),
            ty,
            expr,
        },
    }
}

pub fn private_member_value(
    class: &str,
    n: &str,
    ty: Option<TypeAnnotation>,
    expr: Expr,
) -> DefAst {
    DefAst {
        access: AccessSpecifier::DEFAULT,
        ..member_value(class, n, ty, expr)
    }
}

/// Builder for explicit function definitions.
pub struct FnDef {
    name: Name,
    ty: TypeAnnotation,
    params: Vec<Vec<Pattern>>,
    body: Expr,
    precondition: Option<Expr>,
    postcondition: Option<Expr>,
    measure: Option<Name>,
    type_params: Vec<String>,
}

impl FnDef {
    pub fn new(n: &str, ty: TypeAnnotation, params: Vec<Pattern>, body: Expr) -> Self {
        Self {
            name: name(n),
            ty,
            params: vec![params],
            body,
            precondition: None,
            postcondition: None,
            measure: None,
            type_params: vec![],
        }
    }

    pub fn curried(mut self, group: Vec<Pattern>) -> Self {
        self.params.push(group);
        self
    }

    pub fn pre(mut self, e: Expr) -> Self {
        self.precondition = Some(e);
        self
    }

    pub fn post(mut self, e: Expr) -> Self {
        self.postcondition = Some(e);
        self
    }

    pub fn measure(mut self, n: &str) -> Self {
        self.measure = Some(name(n));
        self
    }

    pub fn type_params(mut self, ps: Vec<&str>) -> Self {
        self.type_params = ps.into_iter().map(String::from).collect();
        self
    }

    pub fn build(self) -> DefAst {
        DefAst {
            name: self.name,
            access: AccessSpecifier::PUBLIC,
            span: span(),
            kind: DefAstKind::ExplicitFunction {
                type_params: self.type_params,
                ty: self.ty,
                params: self.params,
                body: self.body,
                precondition: self.precondition,
                postcondition: self.postcondition,
                measure: self.measure,
            },
        }
    }
}

pub fn module(definitions: Vec<DefAst>) -> ModuleAst {
    ModuleAst {
        name: name("M"),
        span: span(),
        definitions,
    }
}

// ── Running and asserting ──

pub fn check(module: &ModuleAst) -> CheckOutcome {
    check_with(module, Settings::default())
}

pub fn check_with(module: &ModuleAst, settings: Settings) -> CheckOutcome {
    check_module(module, settings, "t.msl").expect("internal checker fault")
}

pub fn assert_ok(outcome: &CheckOutcome) {
    assert!(
        !outcome.diagnostics.has_errors(),
        "unexpected errors: {:?}",
        outcome.diagnostics.errors
    );
}

pub fn assert_error(outcome: &CheckOutcome, code: u16) {
    assert!(
        outcome
            .diagnostics
            .errors
            .iter()
            .any(|d| d.code == DiagCode(code)),
        "expected error {code}, got: {:?}",
        outcome.diagnostics.error_codes()
    );
}

pub fn assert_po(outcome: &CheckOutcome, kind: PoKind) {
    assert!(
        outcome.obligations.iter().any(|po| po.kind == kind),
        "expected a '{kind}' obligation, got: {:?}",
        outcome
            .obligations
            .iter()
            .map(|po| po.kind)
            .collect::<Vec<_>>()
    );
}

pub fn assert_warning(outcome: &CheckOutcome, code: u16) {
    assert!(
        outcome
            .diagnostics
            .warnings
            .iter()
            .any(|d| d.code == DiagCode(code)),
        "expected warning {code}, got: {:?}",
        outcome
            .diagnostics
            .warnings
            .iter()
            .map(|d| d.code)
            .collect::<Vec<_>>()
    );
}
