//! Scope environments.
//!
//! The checker keeps one [`Environment`]: a stack of scopes pushed and
//! popped around modules, function bodies, quantifier binds and class
//! contexts. Name lookup walks from the innermost scope outward. A
//! class-public scope is the view other classes get of a class: lookups
//! through it only see public members.

use msl_types::{Diagnostics, Name};

use crate::defs::{Access, DefId, Definitions};

/// The visibility category a binding is defined in, and that a lookup
/// asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// Bindings local to a body: parameters, let, quantifier variables.
    Local,
    /// Module-level definitions, visible from any inner scope.
    Global,
    /// Type names, looked up only by type annotations.
    Names,
}

impl NameScope {
    /// Whether a binding defined in `self` answers a lookup asking for
    /// `query`. Globals answer value lookups; type names answer only
    /// type lookups.
    fn answers(self, query: NameScope) -> bool {
        match query {
            NameScope::Local => matches!(self, NameScope::Local | NameScope::Global),
            NameScope::Global => self == NameScope::Global,
            NameScope::Names => self == NameScope::Names,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScopeKind {
    /// Flat module scope.
    Module,
    /// A function or operation body.
    Function {
        /// Operation calls are not allowed from functional scopes.
        functional: bool,
    },
    /// Quantifier / let binding group.
    Names,
    /// The outside view of a class: only public members answer.
    ClassPublic(Name),
    /// The inside view of a class: every member answers.
    ClassPrivate(Name),
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: Vec<(NameScope, DefId)>,
}

/// The scope stack.
#[derive(Debug, Default)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            bindings: Vec::new(),
        });
    }

    /// Pop the innermost scope, returning its bindings for unused-binding
    /// reporting.
    pub fn pop(&mut self) -> Vec<DefId> {
        self.scopes
            .pop()
            .map(|s| s.bindings.into_iter().map(|(_, id)| id).collect())
            .unwrap_or_default()
    }

    /// Pop and report unused local bindings as warnings.
    pub fn pop_and_check_unused(
        &mut self,
        defs: &Definitions,
        file: &str,
        diags: &mut Diagnostics,
    ) {
        use msl_types::{DiagCode, Diagnostic};
        for id in self.pop() {
            let def = defs.get(id);
            if !def.is_used() {
                diags.push(Diagnostic::new(
                    file,
                    DiagCode::UNUSED_DEFINITION,
                    format!("Definition '{}' not used", def.name.display_name()),
                    def.span,
                ));
            }
        }
    }

    pub fn define(&mut self, scope: NameScope, id: DefId) {
        if let Some(top) = self.scopes.last_mut() {
            top.bindings.push((scope, id));
        }
    }

    /// Find a definition by name, innermost scope first. Uses the
    /// permissive [`Name::matches`] so an unqualified reference finds a
    /// qualified overload. Marks the definition used.
    pub fn find(&self, name: &Name, query: NameScope, defs: &Definitions) -> Option<DefId> {
        for scope in self.scopes.iter().rev() {
            for &(bound_scope, id) in scope.bindings.iter().rev() {
                if !bound_scope.answers(query) {
                    continue;
                }
                let def = defs.get(id);
                if !def.name.matches(name) {
                    continue;
                }
                if matches!(scope.kind, ScopeKind::ClassPublic(_))
                    && def.access.access != Access::Public
                {
                    continue;
                }
                def.mark_used();
                return Some(id);
            }
        }
        None
    }

    /// Whether the definition is visible but hidden by access control,
    /// for the inaccessible-member diagnostic.
    pub fn find_hidden(&self, name: &Name, query: NameScope, defs: &Definitions) -> Option<DefId> {
        for scope in self.scopes.iter().rev() {
            if !matches!(scope.kind, ScopeKind::ClassPublic(_)) {
                continue;
            }
            for &(bound_scope, id) in scope.bindings.iter().rev() {
                if bound_scope.answers(query) && defs.get(id).name.matches(name) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// The innermost function scope's functional flag; false outside any
    /// function.
    pub fn in_functional_context(&self) -> bool {
        for scope in self.scopes.iter().rev() {
            if let ScopeKind::Function { functional, .. } = scope.kind {
                return functional;
            }
        }
        false
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
