//! Semantic type representation for the MSL checker.
//!
//! [`Type`] is the checker's view of a type, distinct from the syntactic
//! [`msl_types::ast::TypeAnnotation`] produced by the parser. Every node
//! carries the span it was written at; structural equality and hashing
//! deliberately ignore spans (and the attached definition names) so that
//! `nat` on line 3 and `nat` on line 7 are one type.
//!
//! Projections ("views") answer "can this type be seen as a set / seq /
//! map / …". For plain composite types the view is direct; for unions it
//! is the merge computed in [`crate::union`]; for named references it
//! follows the [`TypeRegistry`] under an explicit visited set, so a type
//! that reaches itself yields an absent view during the recursive probe.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use msl_types::ast::{TypeAnnotation, TypeAnnotationKind};
use msl_types::{Name, Span};

use crate::defs::AccessSpecifier;
use crate::registry::TypeRegistry;
use crate::typeset::{TypeList, TypeSet};
use crate::union;

/// Named-type references already entered during a projection or
/// comparison, used to break cycles in recursive type graphs.
pub type Visited = HashSet<Name>;

// ══════════════════════════════════════════════════════════════════════════════
// Numeric tower
// ══════════════════════════════════════════════════════════════════════════════

/// The numeric basic types, totally ordered by weight.
///
/// Combining two numerics (union projection, arithmetic inference) yields
/// the heavier kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Natural,
    Nat1,
    Int,
    Rational,
    Real,
}

impl NumericKind {
    pub fn weight(self) -> u8 {
        match self {
            NumericKind::Natural => 0,
            NumericKind::Nat1 => 1,
            NumericKind::Int => 2,
            NumericKind::Rational => 3,
            NumericKind::Real => 4,
        }
    }

    /// The heavier of two kinds.
    pub fn widen(self, other: NumericKind) -> NumericKind {
        if other.weight() > self.weight() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericKind::Natural => write!(f, "nat"),
            NumericKind::Nat1 => write!(f, "nat1"),
            NumericKind::Int => write!(f, "int"),
            NumericKind::Rational => write!(f, "rat"),
            NumericKind::Real => write!(f, "real"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Structured kinds
// ══════════════════════════════════════════════════════════════════════════════

/// A record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub tag: String,
    pub ty: Type,
}

/// A record (composite) type with a tag name and ordered fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordType {
    pub name: Name,
    pub fields: Vec<Field>,
}

impl RecordType {
    pub fn field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }
}

/// A function type `(p1 * ... * pn) -> r` (or `+>` when total).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: TypeList,
    pub result: Box<Type>,
    pub total: bool,
    /// Type parameter names for polymorphic functions, empty otherwise.
    pub type_params: Vec<String>,
}

/// An operation type `(p1 * ... * pn) ==> r`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationType {
    pub params: TypeList,
    pub result: Box<Type>,
    pub pure: bool,
}

/// A class member snapshot carried by a class type: enough to answer
/// member lookups and to synthesize union pseudoclasses.
#[derive(Debug, Clone)]
pub struct ClassMember {
    pub name: Name,
    pub ty: Type,
    pub access: AccessSpecifier,
}

/// A class type. Identity is nominal: two class types are equal exactly
/// when their names are.
#[derive(Debug, Clone)]
pub struct ClassType {
    pub name: Name,
    pub members: Vec<ClassMember>,
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassType {}

impl Hash for ClassType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Type
// ══════════════════════════════════════════════════════════════════════════════

/// A semantic type: a span, the definitions whose proof obligations travel
/// with the type (populated for callables and aggregated over unions), and
/// the structural kind.
#[derive(Debug, Clone)]
pub struct Type {
    pub span: Span,
    /// Names of definitions associated with this type for proof-obligation
    /// bookkeeping. Not part of the type's identity.
    pub definitions: Vec<Name>,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    // ── Primitives ──
    Boolean,
    Numeric(NumericKind),
    Token,
    /// A quote literal type, `<tag>`.
    Quote(String),
    /// The type of statements that return nothing.
    Void,
    /// Type could not be determined (error recovery). Compatible with
    /// everything.
    Unknown,
    /// A type parameter, `@T`.
    Parameter(String),

    // ── Named references ──
    /// A reference to a named type, before resolution.
    Unresolved(Name),
    /// A resolved reference to a named type; the structure lives in the
    /// [`TypeRegistry`]. Kept as an indirection so recursive types stay
    /// finite.
    Named(Name),

    // ── Composites ──
    Optional(Box<Type>),
    Set(Box<Type>),
    Seq {
        elem: Box<Type>,
        non_empty: bool,
    },
    Map {
        dom: Box<Type>,
        rng: Box<Type>,
    },
    Product(TypeList),
    Record(RecordType),
    Union(TypeSet),

    // ── Callables ──
    Function(FunctionType),
    Operation(OperationType),
    Class(ClassType),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

// ── Constructors ──

impl Type {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self {
            span,
            definitions: Vec::new(),
            kind,
        }
    }

    pub fn boolean(span: Span) -> Self {
        Self::new(TypeKind::Boolean, span)
    }

    pub fn numeric(kind: NumericKind, span: Span) -> Self {
        Self::new(TypeKind::Numeric(kind), span)
    }

    pub fn token(span: Span) -> Self {
        Self::new(TypeKind::Token, span)
    }

    pub fn quote(tag: impl Into<String>, span: Span) -> Self {
        Self::new(TypeKind::Quote(tag.into()), span)
    }

    /// The illegal quote type `<?>` injected into union record merges for
    /// fields missing from some member. Unlike [`TypeKind::Unknown`] it
    /// fails subtype checks, which is the point.
    pub fn illegal_quote(span: Span) -> Self {
        Self::quote("?", span)
    }

    pub fn void(span: Span) -> Self {
        Self::new(TypeKind::Void, span)
    }

    pub fn unknown(span: Span) -> Self {
        Self::new(TypeKind::Unknown, span)
    }

    pub fn parameter(name: impl Into<String>, span: Span) -> Self {
        Self::new(TypeKind::Parameter(name.into()), span)
    }

    pub fn unresolved(name: Name, span: Span) -> Self {
        Self::new(TypeKind::Unresolved(name), span)
    }

    pub fn named(name: Name, span: Span) -> Self {
        Self::new(TypeKind::Named(name), span)
    }

    pub fn optional(inner: Type, span: Span) -> Self {
        Self::new(TypeKind::Optional(Box::new(inner)), span)
    }

    pub fn set(elem: Type, span: Span) -> Self {
        Self::new(TypeKind::Set(Box::new(elem)), span)
    }

    pub fn seq(elem: Type, span: Span) -> Self {
        Self::new(
            TypeKind::Seq {
                elem: Box::new(elem),
                non_empty: false,
            },
            span,
        )
    }

    pub fn seq1(elem: Type, span: Span) -> Self {
        Self::new(
            TypeKind::Seq {
                elem: Box::new(elem),
                non_empty: true,
            },
            span,
        )
    }

    pub fn map(dom: Type, rng: Type, span: Span) -> Self {
        Self::new(
            TypeKind::Map {
                dom: Box::new(dom),
                rng: Box::new(rng),
            },
            span,
        )
    }

    pub fn product(members: TypeList, span: Span) -> Self {
        Self::new(TypeKind::Product(members), span)
    }

    pub fn record(name: Name, fields: Vec<Field>, span: Span) -> Self {
        Self::new(TypeKind::Record(RecordType { name, fields }), span)
    }

    pub fn function(params: TypeList, result: Type, total: bool, span: Span) -> Self {
        Self::new(
            TypeKind::Function(FunctionType {
                params,
                result: Box::new(result),
                total,
                type_params: Vec::new(),
            }),
            span,
        )
    }

    pub fn operation(params: TypeList, result: Type, span: Span) -> Self {
        Self::new(
            TypeKind::Operation(OperationType {
                params,
                result: Box::new(result),
                pure: false,
            }),
            span,
        )
    }

    pub fn class(class: ClassType, span: Span) -> Self {
        Self::new(TypeKind::Class(class), span)
    }

    /// Convert a syntactic annotation into a semantic type. Named
    /// references come out [`TypeKind::Unresolved`].
    pub fn from_annotation(ann: &TypeAnnotation) -> Self {
        let span = ann.span;
        match &ann.kind {
            TypeAnnotationKind::Bool => Self::boolean(span),
            TypeAnnotationKind::Nat => Self::numeric(NumericKind::Natural, span),
            TypeAnnotationKind::Nat1 => Self::numeric(NumericKind::Nat1, span),
            TypeAnnotationKind::Int => Self::numeric(NumericKind::Int, span),
            TypeAnnotationKind::Rat => Self::numeric(NumericKind::Rational, span),
            TypeAnnotationKind::Real => Self::numeric(NumericKind::Real, span),
            TypeAnnotationKind::Token => Self::token(span),
            TypeAnnotationKind::Quote(tag) => Self::quote(tag.clone(), span),
            TypeAnnotationKind::Optional(inner) => {
                Self::optional(Self::from_annotation(inner), span)
            }
            TypeAnnotationKind::Set(elem) => Self::set(Self::from_annotation(elem), span),
            TypeAnnotationKind::Seq { elem, non_empty } => {
                let elem = Self::from_annotation(elem);
                if *non_empty {
                    Self::seq1(elem, span)
                } else {
                    Self::seq(elem, span)
                }
            }
            TypeAnnotationKind::Map(dom, rng) => {
                Self::map(Self::from_annotation(dom), Self::from_annotation(rng), span)
            }
            TypeAnnotationKind::Product(members) => {
                Self::product(members.iter().map(Self::from_annotation).collect(), span)
            }
            TypeAnnotationKind::Union(members) => {
                let set: TypeSet = members.iter().map(Self::from_annotation).collect();
                union::make(span, set)
            }
            TypeAnnotationKind::Record { name, fields } => Self::record(
                name.clone(),
                fields
                    .iter()
                    .map(|(tag, ty)| Field {
                        tag: tag.clone(),
                        ty: Self::from_annotation(ty),
                    })
                    .collect(),
                span,
            ),
            TypeAnnotationKind::Named(name) => Self::unresolved(name.clone(), span),
            TypeAnnotationKind::Parameter(p) => Self::parameter(p.clone(), span),
            TypeAnnotationKind::Function {
                params,
                result,
                total,
            } => Self::function(
                params.iter().map(Self::from_annotation).collect(),
                Self::from_annotation(result),
                *total,
                span,
            ),
            TypeAnnotationKind::Operation { params, result } => Self::operation(
                params.iter().map(Self::from_annotation).collect(),
                Self::from_annotation(result),
                span,
            ),
        }
    }
}

// ── Kind accessors ──

impl Type {
    pub fn as_set_elem(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Set(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_seq_elem(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Seq { elem, .. } => Some(elem),
            _ => None,
        }
    }

    pub fn as_map_parts(&self) -> Option<(&Type, &Type)> {
        match &self.kind {
            TypeKind::Map { dom, rng } => Some((dom, rng)),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordType> {
        match &self.kind {
            TypeKind::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_product(&self) -> Option<&TypeList> {
        match &self.kind {
            TypeKind::Product(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match &self.kind {
            TypeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&OperationType> {
        match &self.kind {
            TypeKind::Operation(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match &self.kind {
            TypeKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_union_type(&self) -> bool {
        matches!(self.kind, TypeKind::Union(_))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Views
// ══════════════════════════════════════════════════════════════════════════════

impl Type {
    pub fn set_view(&self, reg: &TypeRegistry) -> Option<Type> {
        self.set_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn set_view_with(&self, reg: &TypeRegistry, visited: &mut Visited) -> Option<Type> {
        match &self.kind {
            TypeKind::Set(_) => Some(self.clone()),
            TypeKind::Unknown => Some(Type::set(Type::unknown(self.span), self.span)),
            TypeKind::Optional(inner) => inner.set_view_with(reg, visited),
            TypeKind::Union(members) => union::set_view(self.span, members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                self.via_name(n, reg, visited, |t, reg, v| t.set_view_with(reg, v))
            }
            _ => None,
        }
    }

    pub fn seq_view(&self, reg: &TypeRegistry) -> Option<Type> {
        self.seq_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn seq_view_with(&self, reg: &TypeRegistry, visited: &mut Visited) -> Option<Type> {
        match &self.kind {
            TypeKind::Seq { .. } => Some(self.clone()),
            TypeKind::Unknown => Some(Type::seq(Type::unknown(self.span), self.span)),
            TypeKind::Optional(inner) => inner.seq_view_with(reg, visited),
            TypeKind::Union(members) => union::seq_view(self.span, members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                self.via_name(n, reg, visited, |t, reg, v| t.seq_view_with(reg, v))
            }
            _ => None,
        }
    }

    pub fn map_view(&self, reg: &TypeRegistry) -> Option<Type> {
        self.map_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn map_view_with(&self, reg: &TypeRegistry, visited: &mut Visited) -> Option<Type> {
        match &self.kind {
            TypeKind::Map { .. } => Some(self.clone()),
            TypeKind::Unknown => Some(Type::map(
                Type::unknown(self.span),
                Type::unknown(self.span),
                self.span,
            )),
            TypeKind::Optional(inner) => inner.map_view_with(reg, visited),
            TypeKind::Union(members) => union::map_view(self.span, members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                self.via_name(n, reg, visited, |t, reg, v| t.map_view_with(reg, v))
            }
            _ => None,
        }
    }

    pub fn record_view(&self, reg: &TypeRegistry) -> Option<Type> {
        self.record_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn record_view_with(
        &self,
        reg: &TypeRegistry,
        visited: &mut Visited,
    ) -> Option<Type> {
        match &self.kind {
            TypeKind::Record(_) => Some(self.clone()),
            TypeKind::Unknown => Some(Type::record(
                Name::new("", "?", self.span),
                Vec::new(),
                self.span,
            )),
            TypeKind::Optional(inner) => inner.record_view_with(reg, visited),
            TypeKind::Union(members) => union::record_view(self.span, members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                self.via_name(n, reg, visited, |t, reg, v| t.record_view_with(reg, v))
            }
            _ => None,
        }
    }

    pub fn class_view(&self, reg: &TypeRegistry) -> Option<Type> {
        self.class_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn class_view_with(
        &self,
        reg: &TypeRegistry,
        visited: &mut Visited,
    ) -> Option<Type> {
        match &self.kind {
            TypeKind::Class(_) => Some(self.clone()),
            TypeKind::Optional(inner) => inner.class_view_with(reg, visited),
            TypeKind::Union(members) => union::class_view(self.span, members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                self.via_name(n, reg, visited, |t, reg, v| t.class_view_with(reg, v))
            }
            _ => None,
        }
    }

    pub fn numeric_view(&self, reg: &TypeRegistry) -> Option<NumericKind> {
        self.numeric_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn numeric_view_with(
        &self,
        reg: &TypeRegistry,
        visited: &mut Visited,
    ) -> Option<NumericKind> {
        match &self.kind {
            TypeKind::Numeric(k) => Some(*k),
            TypeKind::Unknown => Some(NumericKind::Real),
            TypeKind::Optional(inner) => inner.numeric_view_with(reg, visited),
            TypeKind::Union(members) => union::numeric_view(members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                if !visited.insert(n.clone()) {
                    return None;
                }
                reg.lookup(n)?.numeric_view_with(reg, visited)
            }
            _ => None,
        }
    }

    /// Product view. `n == 0` accepts any arity; otherwise only exactly
    /// n-ary products qualify.
    pub fn product_view(&self, n: usize, reg: &TypeRegistry) -> Option<Type> {
        self.product_view_with(n, reg, &mut Visited::new())
    }

    pub(crate) fn product_view_with(
        &self,
        n: usize,
        reg: &TypeRegistry,
        visited: &mut Visited,
    ) -> Option<Type> {
        match &self.kind {
            TypeKind::Product(members) => {
                if n == 0 || members.len() == n {
                    Some(self.clone())
                } else {
                    None
                }
            }
            TypeKind::Unknown => {
                let members: TypeList =
                    (0..n.max(1)).map(|_| Type::unknown(self.span)).collect();
                Some(Type::product(members, self.span))
            }
            TypeKind::Optional(inner) => inner.product_view_with(n, reg, visited),
            TypeKind::Union(members) => union::product_view(self.span, n, members, reg, visited),
            TypeKind::Named(nm) | TypeKind::Unresolved(nm) => {
                if !visited.insert(nm.clone()) {
                    return None;
                }
                reg.lookup(nm)?.product_view_with(n, reg, visited)
            }
            _ => None,
        }
    }

    pub fn function_view(&self, reg: &TypeRegistry) -> Option<Type> {
        self.function_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn function_view_with(
        &self,
        reg: &TypeRegistry,
        visited: &mut Visited,
    ) -> Option<Type> {
        match &self.kind {
            TypeKind::Function(_) => Some(self.clone()),
            TypeKind::Unknown => {
                let mut f = Type::function(TypeList::new(), Type::unknown(self.span), false, self.span);
                f.span = self.span;
                Some(f)
            }
            TypeKind::Optional(inner) => inner.function_view_with(reg, visited),
            TypeKind::Union(members) => union::function_view(self.span, members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                self.via_name(n, reg, visited, |t, reg, v| t.function_view_with(reg, v))
            }
            _ => None,
        }
    }

    pub fn operation_view(&self, reg: &TypeRegistry) -> Option<Type> {
        self.operation_view_with(reg, &mut Visited::new())
    }

    pub(crate) fn operation_view_with(
        &self,
        reg: &TypeRegistry,
        visited: &mut Visited,
    ) -> Option<Type> {
        match &self.kind {
            TypeKind::Operation(_) => Some(self.clone()),
            TypeKind::Unknown => Some(Type::operation(TypeList::new(), Type::unknown(self.span), self.span)),
            TypeKind::Optional(inner) => inner.operation_view_with(reg, visited),
            TypeKind::Union(members) => union::operation_view(self.span, members, reg, visited),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                self.via_name(n, reg, visited, |t, reg, v| t.operation_view_with(reg, v))
            }
            _ => None,
        }
    }

    fn via_name(
        &self,
        name: &Name,
        reg: &TypeRegistry,
        visited: &mut Visited,
        recurse: impl FnOnce(&Type, &TypeRegistry, &mut Visited) -> Option<Type>,
    ) -> Option<Type> {
        // A name already on the path means the probe has come back around
        // to itself: the view is absent until the outer query completes.
        if !visited.insert(name.clone()) {
            return None;
        }
        recurse(reg.lookup(name)?, reg, visited)
    }
}

// ── Predicates ──

impl Type {
    pub fn is_set(&self, reg: &TypeRegistry) -> bool {
        self.set_view(reg).is_some()
    }

    pub fn is_seq(&self, reg: &TypeRegistry) -> bool {
        self.seq_view(reg).is_some()
    }

    pub fn is_map(&self, reg: &TypeRegistry) -> bool {
        self.map_view(reg).is_some()
    }

    pub fn is_record(&self, reg: &TypeRegistry) -> bool {
        self.record_view(reg).is_some()
    }

    pub fn is_class(&self, reg: &TypeRegistry) -> bool {
        self.class_view(reg).is_some()
    }

    pub fn is_numeric(&self, reg: &TypeRegistry) -> bool {
        self.numeric_view(reg).is_some()
    }

    pub fn is_product(&self, n: usize, reg: &TypeRegistry) -> bool {
        self.product_view(n, reg).is_some()
    }

    pub fn is_function(&self, reg: &TypeRegistry) -> bool {
        self.function_view(reg).is_some()
    }

    pub fn is_operation(&self, reg: &TypeRegistry) -> bool {
        self.operation_view(reg).is_some()
    }

    pub fn is_boolean(&self, reg: &TypeRegistry) -> bool {
        match &self.kind {
            TypeKind::Boolean | TypeKind::Unknown => true,
            TypeKind::Union(members) => {
                members.iter().any(|m| m.is_boolean(reg))
            }
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                reg.lookup(n).is_some_and(|t| t.is_boolean(reg))
            }
            TypeKind::Optional(inner) => inner.is_boolean(reg),
            _ => false,
        }
    }

    /// All union members must be void; a bare void is void. Deliberately
    /// asymmetric with [`Type::has_void`].
    pub fn is_void(&self, reg: &TypeRegistry) -> bool {
        self.is_void_with(reg, &mut Visited::new())
    }

    pub(crate) fn is_void_with(&self, reg: &TypeRegistry, visited: &mut Visited) -> bool {
        match &self.kind {
            TypeKind::Void => true,
            TypeKind::Union(members) => members.iter().all(|m| m.is_void_with(reg, visited)),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                if !visited.insert(n.clone()) {
                    return false;
                }
                reg.lookup(n).is_some_and(|t| t.is_void_with(reg, visited))
            }
            _ => false,
        }
    }

    /// Any union member void counts.
    pub fn has_void(&self, reg: &TypeRegistry) -> bool {
        self.has_void_with(reg, &mut Visited::new())
    }

    pub(crate) fn has_void_with(&self, reg: &TypeRegistry, visited: &mut Visited) -> bool {
        match &self.kind {
            TypeKind::Void => true,
            TypeKind::Union(members) => members.iter().any(|m| m.has_void_with(reg, visited)),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                if !visited.insert(n.clone()) {
                    return false;
                }
                reg.lookup(n).is_some_and(|t| t.has_void_with(reg, visited))
            }
            _ => false,
        }
    }

    pub fn is_unknown(&self, reg: &TypeRegistry) -> bool {
        match &self.kind {
            TypeKind::Unknown => true,
            TypeKind::Union(members) => members.iter().any(|m| m.is_unknown(reg)),
            TypeKind::Named(n) | TypeKind::Unresolved(n) => {
                reg.lookup(n).is_some_and(|t| t.is_unknown(reg))
            }
            _ => false,
        }
    }

    /// Follow Named indirections to the structural type. Resolution
    /// guarantees name chains are acyclic, but the walk is bounded anyway.
    pub fn expand<'a>(&'a self, reg: &'a TypeRegistry) -> &'a Type {
        let mut current = self;
        for _ in 0..64 {
            match &current.kind {
                TypeKind::Named(n) | TypeKind::Unresolved(n) => match reg.lookup(n) {
                    Some(t) => current = t,
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Polymorphic instantiation
// ══════════════════════════════════════════════════════════════════════════════

impl Type {
    /// Substitute the type parameter `pname` with `actual` throughout.
    pub fn instantiate(&self, pname: &str, actual: &Type) -> Type {
        let mut out = self.clone();
        out.kind = match &self.kind {
            TypeKind::Parameter(p) if p == pname => return actual.clone(),
            TypeKind::Optional(inner) => {
                TypeKind::Optional(Box::new(inner.instantiate(pname, actual)))
            }
            TypeKind::Set(elem) => TypeKind::Set(Box::new(elem.instantiate(pname, actual))),
            TypeKind::Seq { elem, non_empty } => TypeKind::Seq {
                elem: Box::new(elem.instantiate(pname, actual)),
                non_empty: *non_empty,
            },
            TypeKind::Map { dom, rng } => TypeKind::Map {
                dom: Box::new(dom.instantiate(pname, actual)),
                rng: Box::new(rng.instantiate(pname, actual)),
            },
            TypeKind::Product(members) => TypeKind::Product(
                members.iter().map(|t| t.instantiate(pname, actual)).collect(),
            ),
            TypeKind::Record(r) => TypeKind::Record(RecordType {
                name: r.name.clone(),
                fields: r
                    .fields
                    .iter()
                    .map(|f| Field {
                        tag: f.tag.clone(),
                        ty: f.ty.instantiate(pname, actual),
                    })
                    .collect(),
            }),
            TypeKind::Union(members) => {
                let set: TypeSet = members
                    .iter()
                    .map(|t| t.instantiate(pname, actual))
                    .collect();
                return union::make(self.span, set);
            }
            TypeKind::Function(f) => TypeKind::Function(FunctionType {
                params: f.params.iter().map(|t| t.instantiate(pname, actual)).collect(),
                result: Box::new(f.result.instantiate(pname, actual)),
                total: f.total,
                type_params: f
                    .type_params
                    .iter()
                    .filter(|p| p.as_str() != pname)
                    .cloned()
                    .collect(),
            }),
            TypeKind::Operation(o) => TypeKind::Operation(OperationType {
                params: o.params.iter().map(|t| t.instantiate(pname, actual)).collect(),
                result: Box::new(o.result.instantiate(pname, actual)),
                pure: o.pure,
            }),
            other => other.clone(),
        };
        out
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Boolean => write!(f, "bool"),
            TypeKind::Numeric(k) => write!(f, "{k}"),
            TypeKind::Token => write!(f, "token"),
            TypeKind::Quote(tag) => write!(f, "<{tag}>"),
            TypeKind::Void => write!(f, "()"),
            TypeKind::Unknown => write!(f, "?"),
            TypeKind::Parameter(p) => write!(f, "@{p}"),
            TypeKind::Unresolved(n) | TypeKind::Named(n) => write!(f, "{}", n.display_name()),
            TypeKind::Optional(inner) => write!(f, "[{inner}]"),
            TypeKind::Set(elem) => write!(f, "set of ({elem})"),
            TypeKind::Seq { elem, non_empty } => {
                write!(f, "seq{} of ({elem})", if *non_empty { "1" } else { "" })
            }
            TypeKind::Map { dom, rng } => write!(f, "map ({dom}) to ({rng})"),
            TypeKind::Product(members) => {
                for (i, t) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    write!(f, "({t})")?;
                }
                Ok(())
            }
            TypeKind::Record(r) => write!(f, "{}", r.name.display_name()),
            TypeKind::Union(members) => write!(f, "{members}"),
            TypeKind::Function(ft) => {
                write!(
                    f,
                    "({}) {} {}",
                    ft.params,
                    if ft.total { "+>" } else { "->" },
                    ft.result
                )
            }
            TypeKind::Operation(ot) => write!(f, "({}) ==> {}", ot.params, ot.result),
            TypeKind::Class(c) => write!(f, "{}", c.name.display_name()),
        }
    }
}
