//! Checked definitions.
//!
//! Definitions live in a [`Definitions`] arena and are referred to by
//! [`DefId`], so scope environments and class members can share them
//! while the checking passes mutate them in place.
//!
//! Every definition moves through the same lifecycle:
//! created → implicit-expanded → type-resolved → type-checked →
//! po-generated. Reading a definition's type before it has been resolved
//! is a fault in the checker, not in the input, and surfaces as
//! [`InternalError::StageViolation`].

use std::cell::Cell;
use std::fmt;

use msl_types::ast::{Expr, Pattern};
use msl_types::{InternalError, Name, Span};

pub use msl_types::ast::{Access, AccessSpecifier};

use crate::ty::{FunctionType, Type, TypeKind};
use crate::typeset::TypeList;

// ══════════════════════════════════════════════════════════════════════════════
// Lifecycle
// ══════════════════════════════════════════════════════════════════════════════

/// Checking lifecycle stage, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Created,
    ImplicitExpanded,
    TypeResolved,
    TypeChecked,
    PoGenerated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Created => "created",
            Stage::ImplicitExpanded => "implicit-expanded",
            Stage::TypeResolved => "type-resolved",
            Stage::TypeChecked => "type-checked",
            Stage::PoGenerated => "po-generated",
        };
        write!(f, "{s}")
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Definition variants
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ExplicitFunction {
    pub type_params: Vec<String>,
    /// The declared (possibly curried) function type.
    pub ty: Type,
    /// Curried parameter pattern groups; uncurried functions have one.
    pub params: Vec<Vec<Pattern>>,
    pub body: Expr,
    pub precondition: Option<Expr>,
    pub postcondition: Option<Expr>,
    pub measure: Option<Name>,
    /// Lexicographic arity of the measure: 0 for a plain `nat` range,
    /// the tuple width for a `nat * ... * nat` range.
    pub measure_lexical: usize,
    /// Body applies the function's own name.
    pub is_recursive: bool,
}

#[derive(Debug, Clone)]
pub struct ImplicitFunction {
    pub type_params: Vec<String>,
    pub params: Vec<(Pattern, Type)>,
    pub result_name: Name,
    pub result_ty: Type,
    pub precondition: Option<Expr>,
    pub postcondition: Expr,
    /// The declared function type, derived from params and result.
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct OperationDef {
    pub ty: Type,
    pub params: Vec<Pattern>,
    pub body: Option<Expr>,
    pub precondition: Option<Expr>,
    pub postcondition: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct TypeDef {
    pub ty: Type,
    pub invariant: Option<(Pattern, Expr)>,
}

#[derive(Debug, Clone)]
pub enum DefKind {
    ExplicitFunction(ExplicitFunction),
    ImplicitFunction(ImplicitFunction),
    Operation(OperationDef),
    /// A binding produced by a pattern or bind (parameters, let, quantifiers).
    Local { ty: Type },
    /// A module-level value definition.
    Value {
        pattern: Pattern,
        expr: Expr,
        ty: Type,
    },
    Type(TypeDef),
    /// A class definition grouping member definitions.
    Class { members: Vec<DefId> },
    /// A definition imported from another module under its original name.
    Imported { original: Name, ty: Type },
}

/// One checked definition.
#[derive(Debug, Clone)]
pub struct Definition {
    pub name: Name,
    pub access: AccessSpecifier,
    pub span: Span,
    pub stage: Stage,
    used: Cell<bool>,
    pub kind: DefKind,
}

impl Definition {
    pub fn new(name: Name, access: AccessSpecifier, span: Span, kind: DefKind) -> Self {
        Self {
            name,
            access,
            span,
            stage: Stage::Created,
            used: Cell::new(false),
            kind,
        }
    }

    /// Fail unless the definition has reached `required`.
    pub fn require_stage(&self, required: Stage) -> Result<(), InternalError> {
        if self.stage < required {
            return Err(InternalError::StageViolation {
                name: self.name.display_name(),
                required: required.to_string(),
            });
        }
        Ok(())
    }

    /// Advance the lifecycle; stages never move backwards.
    pub fn advance(&mut self, to: Stage) {
        if to > self.stage {
            self.stage = to;
        }
    }

    pub fn mark_used(&self) {
        self.used.set(true);
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    /// The type this definition contributes when its name is used in an
    /// expression. Type and class definitions do not denote values.
    pub fn value_type(&self) -> Option<&Type> {
        match &self.kind {
            DefKind::ExplicitFunction(f) => Some(&f.ty),
            DefKind::ImplicitFunction(f) => Some(&f.ty),
            DefKind::Operation(o) => Some(&o.ty),
            DefKind::Local { ty } => Some(ty),
            DefKind::Value { ty, .. } => Some(ty),
            DefKind::Imported { ty, .. } => Some(ty),
            DefKind::Type(_) | DefKind::Class { .. } => None,
        }
    }

    pub fn as_explicit_function(&self) -> Option<&ExplicitFunction> {
        match &self.kind {
            DefKind::ExplicitFunction(f) => Some(f),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Arena
// ══════════════════════════════════════════════════════════════════════════════

/// Index of a definition in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(usize);

/// Arena owning every definition of a checking run.
#[derive(Debug, Default)]
pub struct Definitions {
    items: Vec<Definition>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, def: Definition) -> DefId {
        let id = DefId(self.items.len());
        self.items.push(def);
        id
    }

    pub fn get(&self, id: DefId) -> &Definition {
        &self.items[id.0]
    }

    pub fn get_mut(&mut self, id: DefId) -> &mut Definition {
        &mut self.items[id.0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DefId> {
        (0..self.items.len()).map(DefId)
    }

    /// Synthesize the `pre_f` / `post_f` siblings of a function or
    /// operation definition and advance it to the implicit-expanded
    /// stage. Returns the ids of the new definitions.
    pub fn expand_implicit(&mut self, id: DefId) -> Vec<DefId> {
        let def = self.get(id);
        let name = def.name.clone();
        let access = def.access.clone();
        let span = def.span;

        let mut synthesized = Vec::new();
        match &def.kind {
            DefKind::ExplicitFunction(f) => {
                let f = f.clone();
                if let Some(pre) = &f.precondition {
                    synthesized.push(self.alloc(condition_function(
                        name.pre_name(span),
                        access,
                        &f.ty,
                        f.params.clone(),
                        None,
                        pre.clone(),
                        span,
                    )));
                }
                if let Some(post) = &f.postcondition {
                    let result = result_binding(&name, &f.ty, span);
                    synthesized.push(self.alloc(condition_function(
                        name.post_name(span),
                        access,
                        &f.ty,
                        f.params.clone(),
                        Some(result),
                        post.clone(),
                        span,
                    )));
                }
            }
            DefKind::ImplicitFunction(f) => {
                let f = f.clone();
                let groups = vec![f.params.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>()];
                if let Some(pre) = &f.precondition {
                    synthesized.push(self.alloc(condition_function(
                        name.pre_name(span),
                        access,
                        &f.ty,
                        groups.clone(),
                        None,
                        pre.clone(),
                        span,
                    )));
                }
                let result = (f.result_name.clone(), f.result_ty.clone());
                synthesized.push(self.alloc(condition_function(
                    name.post_name(span),
                    access,
                    &f.ty,
                    groups,
                    Some(result),
                    f.postcondition.clone(),
                    span,
                )));
            }
            _ => {}
        }

        self.get_mut(id).advance(Stage::ImplicitExpanded);
        synthesized
    }

    /// Report unused bindings among `ids`, via the supplied callback.
    pub fn for_each_unused(&self, ids: &[DefId], mut report: impl FnMut(&Definition)) {
        for &id in ids {
            let def = self.get(id);
            if !def.is_used() {
                report(def);
            }
        }
    }
}

/// Build a `pre_f`/`post_f` definition: the source function's parameter
/// layers (plus the result binding for postconditions) mapped to bool.
fn condition_function(
    name: Name,
    access: AccessSpecifier,
    source_ty: &Type,
    mut params: Vec<Vec<Pattern>>,
    result: Option<(Name, Type)>,
    body: Expr,
    span: Span,
) -> Definition {
    let layers = params.len().max(1);
    let mut ty = with_bool_result(source_ty, layers, span);
    if let Some((result_name, result_ty)) = result {
        ty = append_last_layer_param(&ty, layers, result_ty, span);
        if let Some(last) = params.last_mut() {
            last.push(Pattern::identifier(result_name));
        }
    }
    Definition::new(
        name,
        access,
        span,
        DefKind::ExplicitFunction(ExplicitFunction {
            type_params: Vec::new(),
            ty,
            params,
            body,
            precondition: None,
            postcondition: None,
            measure: None,
            measure_lexical: 0,
            is_recursive: false,
        }),
    )
}

/// The conventional `RESULT` binding for a postcondition, typed with the
/// function's final result type.
fn result_binding(name: &Name, ty: &Type, span: Span) -> (Name, Type) {
    (
        Name::new(&name.module, "RESULT", span),
        final_result(ty).clone(),
    )
}

/// The result type after every curried layer.
pub fn final_result(ty: &Type) -> &Type {
    match &ty.kind {
        TypeKind::Function(f) => final_result(&f.result),
        _ => ty,
    }
}

/// Concatenation of every curried layer's parameters, used as the
/// expected parameter list of a measure function.
pub fn flattened_params(ty: &Type) -> TypeList {
    let mut out = TypeList::new();
    let mut current = ty;
    while let TypeKind::Function(f) = &current.kind {
        out.extend(f.params.iter().cloned());
        current = &f.result;
    }
    out
}

/// Rewrite the result after `layers` function layers to bool, keeping the
/// curried shape. Condition functions are total.
fn with_bool_result(ty: &Type, layers: usize, span: Span) -> Type {
    match &ty.kind {
        TypeKind::Function(f) if layers > 0 => {
            let result = with_bool_result(&f.result, layers - 1, span);
            let mut out = ty.clone();
            out.kind = TypeKind::Function(FunctionType {
                params: f.params.clone(),
                result: Box::new(result),
                total: true,
                type_params: f.type_params.clone(),
            });
            out
        }
        _ => Type::boolean(span),
    }
}

/// Append one parameter to the innermost of the first `layers` function
/// layers (the RESULT parameter of a postcondition function).
fn append_last_layer_param(ty: &Type, layers: usize, extra: Type, span: Span) -> Type {
    match &ty.kind {
        TypeKind::Function(f) if layers > 1 => {
            let result = append_last_layer_param(&f.result, layers - 1, extra, span);
            let mut out = ty.clone();
            out.kind = TypeKind::Function(FunctionType {
                params: f.params.clone(),
                result: Box::new(result),
                total: f.total,
                type_params: f.type_params.clone(),
            });
            out
        }
        TypeKind::Function(f) => {
            let mut params = f.params.clone();
            params.push(extra);
            let mut out = ty.clone();
            out.kind = TypeKind::Function(FunctionType {
                params,
                result: f.result.clone(),
                total: f.total,
                type_params: f.type_params.clone(),
            });
            out
        }
        _ => Type::function(TypeList::new(), ty.clone(), true, span),
    }
}
