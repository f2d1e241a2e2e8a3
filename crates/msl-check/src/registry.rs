//! Named-type registry and resolution.
//!
//! Type definitions register their (unresolved) bodies here; resolution
//! then rewrites every [`TypeKind::Unresolved`] reference into a
//! [`TypeKind::Named`] indirection whose structure stays in the registry,
//! so recursive types remain finite values.
//!
//! Resolution also decides whether each definition denotes an infinite
//! type. A reference sets the infinite flag; passing through a productive
//! constructor (optional, set, seq, map) clears it, because those admit a
//! base value regardless of their element type; a union is infinite only
//! when every member is. `A = A` and `A = A | A` are infinite, while
//! `A = seq of A` and `A = [A] | nat` are fine.

use std::collections::HashMap;

use msl_types::{DiagCode, Diagnostic, Diagnostics, Name};

use crate::ty::{Field, RecordType, Type, TypeKind};
use crate::typeset::{TypeList, TypeSet};
use crate::union;

struct Entry {
    ty: Type,
    resolved: bool,
}

/// All named types of a checking run, keyed by qualified name.
#[derive(Default)]
pub struct TypeRegistry {
    index: HashMap<Name, usize>,
    /// Entries in registration order, for deterministic resolution and
    /// diagnostics.
    items: Vec<(Name, Entry)>,
}

/// Accumulated resolution failures for one definition. A union reports
/// every failing member, not just the first.
struct ResolveFailure {
    diags: Vec<Diagnostic>,
}

impl ResolveFailure {
    fn one(diag: Diagnostic) -> Self {
        Self { diags: vec![diag] }
    }

    fn merge(&mut self, other: ResolveFailure) {
        self.diags.extend(other.diags);
    }
}

/// Tracks whether the path from the definition being resolved down to the
/// current node has passed through a productive constructor.
struct ResolveCtx<'a> {
    file: &'a str,
    infinite: bool,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition body. The body normally still contains
    /// [`TypeKind::Unresolved`] references. Re-registration replaces the
    /// previous body; duplicate-name reporting belongs to the definition
    /// pass, not here.
    pub fn register(&mut self, name: Name, ty: Type) {
        match self.index.get(&name) {
            Some(&i) => {
                self.items[i].1 = Entry {
                    ty,
                    resolved: false,
                };
            }
            None => {
                self.index.insert(name.clone(), self.items.len());
                self.items.push((
                    name,
                    Entry {
                        ty,
                        resolved: false,
                    },
                ));
            }
        }
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.index.contains_key(name)
    }

    pub fn lookup(&self, name: &Name) -> Option<&Type> {
        self.index.get(name).map(|&i| &self.items[i].1.ty)
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.items.iter().map(|(n, _)| n)
    }

    /// Resolve every registered definition, in registration order.
    /// Failures become diagnostics; resolution always continues to the
    /// next definition.
    pub fn resolve_all(&mut self, file: &str, diags: &mut Diagnostics) {
        for i in 0..self.items.len() {
            let name = self.items[i].0.clone();
            self.resolve(&name, file, diags);
        }
    }

    /// Resolve one definition (and transitively everything it references).
    /// Returns false when resolution failed or found the type infinite.
    pub fn resolve(&mut self, name: &Name, file: &str, diags: &mut Diagnostics) -> bool {
        let Some(&i) = self.index.get(name) else {
            return false;
        };
        if self.items[i].1.resolved {
            return true;
        }

        // The entry is marked before its body is walked, so that a
        // reference back to it resolves as a Named indirection instead of
        // recursing forever.
        self.items[i].1.resolved = true;
        let span = self.items[i].1.ty.span;
        let body = self.items[i].1.ty.clone();

        let mut ctx = ResolveCtx {
            file,
            infinite: true,
        };
        match self.resolve_type(body, &mut ctx) {
            Ok(resolved) => {
                self.items[i].1.ty = resolved;
                if ctx.infinite {
                    diags.push(Diagnostic::new(
                        file,
                        DiagCode::INFINITE_TYPE,
                        format!("Type '{}' is infinite", name.display_name()),
                        span,
                    ));
                    false
                } else {
                    true
                }
            }
            Err(failure) => {
                self.items[i].1.resolved = false;
                for d in failure.diags {
                    diags.push(d);
                }
                false
            }
        }
    }

    fn resolve_type(&mut self, ty: Type, ctx: &mut ResolveCtx<'_>) -> Result<Type, ResolveFailure> {
        let span = ty.span;
        let definitions = ty.definitions.clone();
        let kind = match ty.kind {
            TypeKind::Unresolved(name) | TypeKind::Named(name) => {
                ctx.infinite = true;
                let Some(&i) = self.index.get(&name) else {
                    return Err(ResolveFailure::one(Diagnostic::new(
                        ctx.file,
                        DiagCode::UNRESOLVED_TYPE_NAME,
                        format!("Unable to resolve type name '{}'", name.display_name()),
                        span,
                    )));
                };
                if !self.items[i].1.resolved {
                    self.items[i].1.resolved = true;
                    let body = self.items[i].1.ty.clone();
                    match self.resolve_type(body, ctx) {
                        Ok(resolved) => self.items[i].1.ty = resolved,
                        Err(failure) => {
                            self.items[i].1.resolved = false;
                            return Err(failure);
                        }
                    }
                }
                TypeKind::Named(name)
            }

            // Leaves admit values on their own.
            k @ (TypeKind::Boolean
            | TypeKind::Numeric(_)
            | TypeKind::Token
            | TypeKind::Quote(_)
            | TypeKind::Void
            | TypeKind::Unknown
            | TypeKind::Parameter(_)
            | TypeKind::Class(_)) => {
                ctx.infinite = false;
                k
            }

            // Productive constructors: nil, {}, [] and {|->} exist
            // whatever the element type is.
            TypeKind::Optional(inner) => {
                let inner = self.resolve_type(*inner, ctx)?;
                ctx.infinite = false;
                TypeKind::Optional(Box::new(inner))
            }
            TypeKind::Set(elem) => {
                let elem = self.resolve_type(*elem, ctx)?;
                ctx.infinite = false;
                TypeKind::Set(Box::new(elem))
            }
            TypeKind::Seq { elem, non_empty } => {
                let elem = self.resolve_type(*elem, ctx)?;
                ctx.infinite = false;
                TypeKind::Seq {
                    elem: Box::new(elem),
                    non_empty,
                }
            }
            TypeKind::Map { dom, rng } => {
                let dom = self.resolve_type(*dom, ctx)?;
                let rng = self.resolve_type(*rng, ctx)?;
                ctx.infinite = false;
                TypeKind::Map {
                    dom: Box::new(dom),
                    rng: Box::new(rng),
                }
            }

            // Structural constructors need a value per component, so they
            // pass the flag through unchanged.
            TypeKind::Product(members) => {
                let mut out = TypeList::new();
                for m in members {
                    out.push(self.resolve_type(m, ctx)?);
                }
                TypeKind::Product(out)
            }
            TypeKind::Record(rec) => {
                let mut fields = Vec::with_capacity(rec.fields.len());
                for f in rec.fields {
                    fields.push(Field {
                        tag: f.tag,
                        ty: self.resolve_type(f.ty, ctx)?,
                    });
                }
                TypeKind::Record(RecordType {
                    name: rec.name,
                    fields,
                })
            }
            TypeKind::Function(f) => {
                let mut params = TypeList::new();
                for p in f.params {
                    params.push(self.resolve_type(p, ctx)?);
                }
                let result = self.resolve_type(*f.result, ctx)?;
                TypeKind::Function(crate::ty::FunctionType {
                    params,
                    result: Box::new(result),
                    total: f.total,
                    type_params: f.type_params,
                })
            }
            TypeKind::Operation(o) => {
                let mut params = TypeList::new();
                for p in o.params {
                    params.push(self.resolve_type(p, ctx)?);
                }
                let result = self.resolve_type(*o.result, ctx)?;
                TypeKind::Operation(crate::ty::OperationType {
                    params,
                    result: Box::new(result),
                    pure: o.pure,
                })
            }

            // A union is finite when any member is; every failing member
            // is reported, not just the first.
            TypeKind::Union(members) => {
                let mut acc = true;
                let mut out = TypeSet::new();
                let mut failure: Option<ResolveFailure> = None;
                for m in members {
                    ctx.infinite = false;
                    match self.resolve_type(m, ctx) {
                        Ok(resolved) => {
                            acc &= ctx.infinite;
                            out.add(resolved);
                        }
                        Err(f) => match &mut failure {
                            Some(acc_f) => acc_f.merge(f),
                            None => failure = Some(f),
                        },
                    }
                }
                if let Some(f) = failure {
                    return Err(f);
                }
                ctx.infinite = acc;
                // Re-flatten: members that resolved to unions merge in.
                let mut merged = union::make(span, out);
                merged.definitions = definitions;
                return Ok(merged);
            }
        };

        let mut out = Type::new(kind, span);
        out.definitions = definitions;
        Ok(out)
    }
}
