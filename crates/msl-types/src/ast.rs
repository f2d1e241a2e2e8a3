//! AST node types consumed from the external MSL parser.
//!
//! Every node carries a [`Span`] used verbatim in diagnostics.
//! Type annotations here are syntactic; the checker converts them into its
//! semantic type representation before resolution.

use crate::{Name, Span};

// ══════════════════════════════════════════════════════════════════════════════
// Type annotations
// ══════════════════════════════════════════════════════════════════════════════

/// A syntactic type written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub kind: TypeAnnotationKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotationKind {
    Bool,
    Nat,
    Nat1,
    Int,
    Rat,
    Real,
    Token,
    /// A quote literal type, `<tag>`.
    Quote(String),
    /// `[T]`
    Optional(Box<TypeAnnotation>),
    /// `set of T`
    Set(Box<TypeAnnotation>),
    /// `seq of T` / `seq1 of T`
    Seq {
        elem: Box<TypeAnnotation>,
        non_empty: bool,
    },
    /// `map K to V`
    Map(Box<TypeAnnotation>, Box<TypeAnnotation>),
    /// `T1 * T2 * ...`
    Product(Vec<TypeAnnotation>),
    /// `T1 | T2 | ...`
    Union(Vec<TypeAnnotation>),
    /// `T :: f1 : T1 ...` — a record (composite) type; the tag name is
    /// the defining name.
    Record {
        name: Name,
        fields: Vec<(String, TypeAnnotation)>,
    },
    /// A reference to a named type, resolved during checking.
    Named(Name),
    /// A type parameter, `@T`.
    Parameter(String),
    /// `(T1 * ... * Tn) -> R` or `... +> R` when total.
    Function {
        params: Vec<TypeAnnotation>,
        result: Box<TypeAnnotation>,
        total: bool,
    },
    /// `(T1 * ... * Tn) ==> R`
    Operation {
        params: Vec<TypeAnnotation>,
        result: Box<TypeAnnotation>,
    },
}

impl TypeAnnotation {
    pub fn new(kind: TypeAnnotationKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Binary numeric operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    /// `/` — always rational-or-wider.
    Div,
    /// `div` — integer division.
    IntDiv,
    Mod,
}

/// Numeric comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    BoolLit(bool),
    IntLit(i64),
    RealLit(f64),
    /// A quote literal, `<tag>`.
    QuoteLit(String),
    Nil,
    Variable(Name),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Equals(Box<Expr>, Box<Expr>),
    NotEquals(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    /// `f(args)` or `f[@T1, ...](args)` when instantiating a polymorphic
    /// function.
    Apply {
        func: Box<Expr>,
        type_args: Vec<TypeAnnotation>,
        args: Vec<Expr>,
    },
    /// `let d1, ... in body`. Each local is `p = e`, a type bind
    /// `p : T = e`, or a collection bind `p in set S = e` /
    /// `p in seq S = e` asserting membership of the value.
    Let {
        bindings: Vec<(PatternOrBind, Expr)>,
        body: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    Forall {
        binds: Vec<MultiBind>,
        body: Box<Expr>,
    },
    Exists {
        binds: Vec<MultiBind>,
        body: Box<Expr>,
    },
    /// `mk_(e1, ..., en)`
    TupleCtor(Vec<Expr>),
    /// `mk_R(e1, ..., en)`
    RecordCtor { name: Name, args: Vec<Expr> },
    SetEnum(Vec<Expr>),
    SeqEnum(Vec<Expr>),
    /// A body left as `is not yet specified`.
    NotYetSpecified,
    /// A body left as `is subclass responsibility`.
    SubclassResponsibility,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True when the definition carries no real body, so unused-binding
    /// checks and result-type checks are suppressed.
    pub fn is_unspecified(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::NotYetSpecified | ExprKind::SubclassResponsibility
        )
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Patterns and binds
// ══════════════════════════════════════════════════════════════════════════════

/// A destructuring pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// A name binding.
    Identifier(Name),
    /// `-`
    Ignore,
    BoolLit(bool),
    IntLit(i64),
    /// `mk_(p1, ..., pn)`
    Tuple(Vec<Pattern>),
    /// `mk_R(p1, ..., pn)`
    Record { name: Name, fields: Vec<Pattern> },
}

impl Pattern {
    pub fn new(kind: PatternKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn identifier(name: Name) -> Self {
        let span = name.span;
        Self::new(PatternKind::Identifier(name), span)
    }

    /// All names bound by this pattern, in source order with duplicates.
    pub fn variable_names(&self) -> Vec<Name> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, out: &mut Vec<Name>) {
        match &self.kind {
            PatternKind::Identifier(n) => out.push(n.clone()),
            PatternKind::Tuple(ps) | PatternKind::Record { fields: ps, .. } => {
                for p in ps {
                    p.collect_names(out);
                }
            }
            _ => {}
        }
    }

    /// True if the pattern matches every value of its type, so no
    /// pattern-match proof obligation is needed for it.
    pub fn always_matches(&self) -> bool {
        match &self.kind {
            PatternKind::Identifier(_) | PatternKind::Ignore => true,
            PatternKind::Tuple(ps) => ps.iter().all(Pattern::always_matches),
            _ => false,
        }
    }
}

/// A single bind: a pattern constrained by a type or a source collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    /// `p : T`
    Type { pattern: Pattern, ty: TypeAnnotation },
    /// `p in set e`
    Set { pattern: Pattern, set: Expr },
    /// `p in seq e`
    Seq { pattern: Pattern, seq: Expr },
}

impl Bind {
    pub fn pattern(&self) -> &Pattern {
        match self {
            Bind::Type { pattern, .. } | Bind::Set { pattern, .. } | Bind::Seq { pattern, .. } => {
                pattern
            }
        }
    }

    pub fn span(&self) -> Span {
        self.pattern().span
    }
}

/// A quantifier bind: several patterns over one type or collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiBind {
    pub patterns: Vec<Pattern>,
    pub source: MultiBindSource,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MultiBindSource {
    Type(TypeAnnotation),
    Set(Expr),
}

/// Either a pattern or a bind, as used by statements and definitions that
/// accept both.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternOrBind {
    Pattern(Pattern),
    Bind(Bind),
}

impl PatternOrBind {
    pub fn span(&self) -> Span {
        match self {
            PatternOrBind::Pattern(p) => p.span,
            PatternOrBind::Bind(b) => b.span(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Access specifiers
// ══════════════════════════════════════════════════════════════════════════════

/// Member visibility, ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    Private,
    Protected,
    Public,
}

/// The full access specifier attached to a class-member definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessSpecifier {
    pub access: Access,
    pub is_static: bool,
    pub is_pure: bool,
    pub is_async: bool,
}

impl AccessSpecifier {
    pub const DEFAULT: Self = Self {
        access: Access::Private,
        is_static: false,
        is_pure: false,
        is_async: false,
    };

    pub const PUBLIC: Self = Self {
        access: Access::Public,
        ..Self::DEFAULT
    };

    /// True when this specifier exposes strictly less than `other`, e.g. a
    /// public function whose parameter type is a private record.
    pub fn narrower_than(&self, other: AccessSpecifier) -> bool {
        self.access < other.access
    }
}

impl Default for AccessSpecifier {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Definitions and modules
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed top-level definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DefAst {
    pub name: Name,
    pub access: AccessSpecifier,
    pub span: Span,
    pub kind: DefAstKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefAstKind {
    /// `f: T1 -> T2`, `f(p) == body` with optional pre/post/measure. The
    /// pattern lists are the curried parameter groups; an uncurried
    /// function has exactly one group.
    ExplicitFunction {
        type_params: Vec<String>,
        ty: TypeAnnotation,
        params: Vec<Vec<Pattern>>,
        body: Expr,
        precondition: Option<Expr>,
        postcondition: Option<Expr>,
        measure: Option<Name>,
    },
    /// `f(p: T) res: R` with no body; specified by its postcondition.
    ImplicitFunction {
        type_params: Vec<String>,
        params: Vec<(Pattern, TypeAnnotation)>,
        result_name: Name,
        result_ty: TypeAnnotation,
        precondition: Option<Expr>,
        postcondition: Expr,
    },
    /// `op: T1 ==> T2`, `op(p) == body`.
    Operation {
        ty: TypeAnnotation,
        params: Vec<Pattern>,
        body: Option<Expr>,
        precondition: Option<Expr>,
        postcondition: Option<Expr>,
    },
    /// `v : T = e` or pattern-destructuring value definition.
    Value {
        pattern: Pattern,
        ty: Option<TypeAnnotation>,
        expr: Expr,
    },
    /// `T = <body>` with an optional `inv p == e` clause.
    TypeDef {
        ty: TypeAnnotation,
        invariant: Option<(Pattern, Expr)>,
    },
    /// A class grouping member definitions (object-oriented dialects).
    Class { definitions: Vec<DefAst> },
}

/// One module (or class-bearing compilation unit) as delivered by the
/// parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleAst {
    pub name: Name,
    pub span: Span,
    pub definitions: Vec<DefAst>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::new("M", s, Span::point(1, 1))
    }

    #[test]
    fn test_variable_names_keep_duplicates() {
        let p = Pattern::new(
            PatternKind::Tuple(vec![
                Pattern::identifier(name("x")),
                Pattern::identifier(name("x")),
                Pattern::new(PatternKind::Ignore, Span::point(1, 1)),
            ]),
            Span::point(1, 1),
        );
        let names = p.variable_names();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0], names[1]);
    }

    #[test]
    fn test_always_matches() {
        assert!(Pattern::identifier(name("x")).always_matches());
        assert!(Pattern::new(PatternKind::Ignore, Span::point(1, 1)).always_matches());
        assert!(!Pattern::new(PatternKind::IntLit(3), Span::point(1, 1)).always_matches());
        let tuple = Pattern::new(
            PatternKind::Tuple(vec![
                Pattern::identifier(name("a")),
                Pattern::new(PatternKind::IntLit(0), Span::point(1, 1)),
            ]),
            Span::point(1, 1),
        );
        assert!(!tuple.always_matches());
    }

    #[test]
    fn test_access_ordering() {
        assert!(Access::Private < Access::Protected);
        assert!(Access::Protected < Access::Public);
        let private = AccessSpecifier::DEFAULT;
        let public = AccessSpecifier::PUBLIC;
        assert!(private.narrower_than(public));
        assert!(!public.narrower_than(private));
        assert!(!public.narrower_than(public));
    }

    #[test]
    fn test_unspecified_bodies() {
        let e = Expr::new(ExprKind::NotYetSpecified, Span::point(1, 1));
        assert!(e.is_unspecified());
        let e = Expr::new(ExprKind::BoolLit(true), Span::point(1, 1));
        assert!(!e.is_unspecified());
    }
}
