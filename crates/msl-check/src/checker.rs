//! The checking driver.
//!
//! [`Checker`] owns everything one run needs: the type registry, the
//! definition arena, the scope environment, the diagnostic sink, the
//! proof-obligation list and the polymorphic-instance cache. A run over a
//! module is five passes, mirroring the definition lifecycle:
//!
//! 1. create definitions (and register named types),
//! 2. expand implicit pre/post siblings,
//! 3. resolve named type references,
//! 4. type-check bodies,
//! 5. generate proof obligations (interleaved with 4).
//!
//! Problems in the input become diagnostics; a `Result::Err` out of a
//! checking entry point always means a defect in the checker itself.

use std::collections::HashMap;

use msl_types::ast::{DefAst, DefAstKind, Expr, ExprKind, ModuleAst, Pattern};
use msl_types::{
    DiagCode, Diagnostic, Diagnostics, InternalError, Name, Span,
};

use crate::compare;
use crate::defs::{
    flattened_params, DefId, DefKind, Definition, Definitions, ExplicitFunction,
    ImplicitFunction, OperationDef, Stage, TypeDef,
};
use crate::env::{Environment, NameScope, ScopeKind};
use crate::pattern::{self, PatternCtx};
use crate::po::{ContextFrame, ContextStack, FrameKind, PoKind, ProofObligationList};
use crate::registry::TypeRegistry;
use crate::settings::Settings;
use crate::ty::{ClassMember, ClassType, NumericKind, Type, TypeKind};
use crate::typeset::TypeList;

/// Everything a finished run hands back to the caller.
#[derive(Debug)]
pub struct CheckOutcome {
    pub diagnostics: Diagnostics,
    pub obligations: ProofObligationList,
}

/// Check one module with the given settings. The main entry point.
pub fn check_module(
    module: &ModuleAst,
    settings: Settings,
    file: &str,
) -> Result<CheckOutcome, InternalError> {
    let mut checker = Checker::new(settings, file);
    checker.run(module)?;
    Ok(checker.finish())
}

pub struct Checker {
    pub(crate) settings: Settings,
    pub(crate) file: String,
    pub(crate) registry: TypeRegistry,
    pub(crate) defs: Definitions,
    pub(crate) diags: Diagnostics,
    pub(crate) obligations: ProofObligationList,
    pub(crate) env: Environment,
    pub(crate) ctxt: ContextStack,
    /// One callable instance per (function, actual-type tuple).
    pub(crate) poly_cache: HashMap<(Name, TypeList), Type>,
}

impl Checker {
    pub fn new(settings: Settings, file: &str) -> Self {
        Self {
            settings,
            file: file.to_string(),
            registry: TypeRegistry::new(),
            defs: Definitions::new(),
            diags: Diagnostics::new(),
            obligations: ProofObligationList::new(),
            env: Environment::new(),
            ctxt: ContextStack::new(),
            poly_cache: HashMap::new(),
        }
    }

    pub fn finish(self) -> CheckOutcome {
        CheckOutcome {
            diagnostics: self.diags,
            obligations: self.obligations,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn run(&mut self, module: &ModuleAst) -> Result<(), InternalError> {
        self.env.push(ScopeKind::Module);

        let created = self.create_definitions(&module.definitions)?;

        let mut all = created.clone();
        for &id in &created {
            all.extend(self.defs.expand_implicit(id));
        }

        for &id in &all {
            let scope = match self.defs.get(id).kind {
                DefKind::Type(_) => NameScope::Names,
                _ => NameScope::Global,
            };
            self.env.define(scope, id);
        }

        // Other definitions see a class only through its public view; the
        // class's own bodies get the private view pushed during checking.
        let classes: Vec<(Name, Vec<DefId>)> = all
            .iter()
            .filter_map(|&id| {
                let def = self.defs.get(id);
                match &def.kind {
                    DefKind::Class { members } => Some((def.name.clone(), members.clone())),
                    _ => None,
                }
            })
            .collect();
        for (class_name, members) in &classes {
            self.env.push(ScopeKind::ClassPublic(class_name.clone()));
            for &m in members {
                self.env.define(NameScope::Global, m);
            }
        }

        let file = self.file.clone();
        self.registry.resolve_all(&file, &mut self.diags);
        for &id in &all {
            self.resolve_definition(id)?;
        }

        for &id in &all {
            self.check_definition(id)?;
        }

        for _ in &classes {
            self.env.pop();
        }
        self.env.pop();
        Ok(())
    }

    pub(crate) fn error(&mut self, code: DiagCode, message: impl Into<String>, span: Span) {
        self.diags
            .push(Diagnostic::new(&self.file, code, message, span));
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Pass 1: creation
    // ══════════════════════════════════════════════════════════════════════════

    fn create_definitions(&mut self, asts: &[DefAst]) -> Result<Vec<DefId>, InternalError> {
        let mut ids = Vec::with_capacity(asts.len());
        for ast in asts {
            ids.push(self.create_definition(ast)?);
        }
        Ok(ids)
    }

    fn create_definition(&mut self, ast: &DefAst) -> Result<DefId, InternalError> {
        let kind = match &ast.kind {
            DefAstKind::TypeDef { ty, invariant } => {
                let ty = Type::from_annotation(ty);
                self.registry.register(ast.name.clone(), ty.clone());
                DefKind::Type(TypeDef {
                    ty,
                    invariant: invariant.clone(),
                })
            }
            DefAstKind::ExplicitFunction {
                type_params,
                ty,
                params,
                body,
                precondition,
                postcondition,
                measure,
            } => {
                let mut ty = Type::from_annotation(ty);
                if let TypeKind::Function(f) = &mut ty.kind {
                    f.type_params = type_params.clone();
                }
                DefKind::ExplicitFunction(ExplicitFunction {
                    type_params: type_params.clone(),
                    ty,
                    params: params.clone(),
                    body: body.clone(),
                    precondition: precondition.clone(),
                    postcondition: postcondition.clone(),
                    measure: measure.clone(),
                    measure_lexical: 0,
                    is_recursive: mentions(body, &ast.name),
                })
            }
            DefAstKind::ImplicitFunction {
                type_params,
                params,
                result_name,
                result_ty,
                precondition,
                postcondition,
            } => {
                let param_types: TypeList = params
                    .iter()
                    .map(|(_, t)| Type::from_annotation(t))
                    .collect();
                let result = Type::from_annotation(result_ty);
                let mut ty = Type::function(param_types, result.clone(), false, ast.span);
                if let TypeKind::Function(f) = &mut ty.kind {
                    f.type_params = type_params.clone();
                }
                DefKind::ImplicitFunction(ImplicitFunction {
                    type_params: type_params.clone(),
                    params: params
                        .iter()
                        .map(|(p, t)| (p.clone(), Type::from_annotation(t)))
                        .collect(),
                    result_name: result_name.clone(),
                    result_ty: result,
                    precondition: precondition.clone(),
                    postcondition: postcondition.clone(),
                    ty,
                })
            }
            DefAstKind::Operation {
                ty,
                params,
                body,
                precondition,
                postcondition,
            } => DefKind::Operation(OperationDef {
                ty: Type::from_annotation(ty),
                params: params.clone(),
                body: body.clone(),
                precondition: precondition.clone(),
                postcondition: postcondition.clone(),
            }),
            DefAstKind::Value { pattern, ty, expr } => DefKind::Value {
                pattern: pattern.clone(),
                expr: expr.clone(),
                ty: ty
                    .as_ref()
                    .map(Type::from_annotation)
                    .unwrap_or_else(|| Type::unknown(ast.span)),
            },
            DefAstKind::Class { definitions } => {
                let members = self.create_definitions(definitions)?;
                DefKind::Class { members }
            }
        };
        Ok(self.defs.alloc(Definition::new(
            ast.name.clone(),
            ast.access,
            ast.span,
            kind,
        )))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Pass 3: reference resolution
    // ══════════════════════════════════════════════════════════════════════════

    /// Rewrite `Unresolved` references in a definition's stored types into
    /// `Named` indirections (reporting unknown names), attach overload
    /// qualifiers in the object-oriented dialects, and register class
    /// types.
    fn resolve_definition(&mut self, id: DefId) -> Result<(), InternalError> {
        let kind = self.defs.get(id).kind.clone();
        match kind {
            DefKind::ExplicitFunction(mut f) => {
                f.ty = self.resolve_refs(&f.ty);
                self.qualify_name(id, &f.ty)?;
                if let DefKind::ExplicitFunction(stored) = &mut self.defs.get_mut(id).kind {
                    *stored = f;
                }
            }
            DefKind::ImplicitFunction(mut f) => {
                f.ty = self.resolve_refs(&f.ty);
                f.result_ty = self.resolve_refs(&f.result_ty);
                f.params = f
                    .params
                    .into_iter()
                    .map(|(p, t)| {
                        let t = self.resolve_refs(&t);
                        (p, t)
                    })
                    .collect();
                self.qualify_name(id, &f.ty)?;
                if let DefKind::ImplicitFunction(stored) = &mut self.defs.get_mut(id).kind {
                    *stored = f;
                }
            }
            DefKind::Operation(mut o) => {
                o.ty = self.resolve_refs(&o.ty);
                if let DefKind::Operation(stored) = &mut self.defs.get_mut(id).kind {
                    *stored = o;
                }
            }
            DefKind::Value { ty, .. } => {
                let ty = self.resolve_refs(&ty);
                if let DefKind::Value { ty: stored, .. } = &mut self.defs.get_mut(id).kind {
                    *stored = ty;
                }
            }
            DefKind::Type(_) | DefKind::Imported { .. } | DefKind::Local { .. } => {}
            DefKind::Class { members } => {
                for &m in &members {
                    self.resolve_definition(m)?;
                }
                self.register_class_type(id, &members);
            }
        }
        self.defs.get_mut(id).advance(Stage::TypeResolved);
        Ok(())
    }

    /// In the object-oriented dialects a function name carries its
    /// parameter types as an overload qualifier.
    fn qualify_name(&mut self, id: DefId, ty: &Type) -> Result<(), InternalError> {
        if !self.settings.dialect.is_object_oriented() {
            return Ok(());
        }
        let qualifier: Vec<String> = flattened_params(ty)
            .iter()
            .map(|t| t.to_string())
            .collect();
        self.defs
            .get_mut(id)
            .name
            .set_type_qualifier(Some(qualifier))
    }

    fn register_class_type(&mut self, id: DefId, members: &[DefId]) {
        let class_name = self.defs.get(id).name.clone();
        let span = self.defs.get(id).span;
        let class_members: Vec<ClassMember> = members
            .iter()
            .filter_map(|&m| {
                let def = self.defs.get(m);
                def.value_type().map(|ty| ClassMember {
                    name: def.name.clone(),
                    ty: ty.clone(),
                    access: def.access,
                })
            })
            .collect();
        self.registry.register(
            class_name.clone(),
            Type::class(
                ClassType {
                    name: class_name,
                    members: class_members,
                },
                span,
            ),
        );
    }

    /// Replace `Unresolved(n)` by `Named(n)` when `n` is registered, by
    /// `Unknown` (with a diagnostic) when it is not.
    pub(crate) fn resolve_refs(&mut self, ty: &Type) -> Type {
        let mut out = ty.clone();
        out.kind = match &ty.kind {
            TypeKind::Unresolved(n) => {
                if self.registry.contains(n) {
                    TypeKind::Named(n.clone())
                } else {
                    self.error(
                        DiagCode::UNRESOLVED_TYPE_NAME,
                        format!("Unable to resolve type name '{}'", n.display_name()),
                        ty.span,
                    );
                    TypeKind::Unknown
                }
            }
            TypeKind::Optional(t) => TypeKind::Optional(Box::new(self.resolve_refs(t))),
            TypeKind::Set(t) => TypeKind::Set(Box::new(self.resolve_refs(t))),
            TypeKind::Seq { elem, non_empty } => TypeKind::Seq {
                elem: Box::new(self.resolve_refs(elem)),
                non_empty: *non_empty,
            },
            TypeKind::Map { dom, rng } => TypeKind::Map {
                dom: Box::new(self.resolve_refs(dom)),
                rng: Box::new(self.resolve_refs(rng)),
            },
            TypeKind::Product(members) => {
                TypeKind::Product(members.iter().map(|t| self.resolve_refs(t)).collect())
            }
            TypeKind::Union(members) => {
                let set = members.iter().map(|t| self.resolve_refs(t)).collect();
                return crate::union::make(ty.span, set);
            }
            TypeKind::Record(r) => TypeKind::Record(crate::ty::RecordType {
                name: r.name.clone(),
                fields: r
                    .fields
                    .iter()
                    .map(|f| crate::ty::Field {
                        tag: f.tag.clone(),
                        ty: self.resolve_refs(&f.ty),
                    })
                    .collect(),
            }),
            TypeKind::Function(f) => TypeKind::Function(crate::ty::FunctionType {
                params: f.params.iter().map(|t| self.resolve_refs(t)).collect(),
                result: Box::new(self.resolve_refs(&f.result)),
                total: f.total,
                type_params: f.type_params.clone(),
            }),
            TypeKind::Operation(o) => TypeKind::Operation(crate::ty::OperationType {
                params: o.params.iter().map(|t| self.resolve_refs(t)).collect(),
                result: Box::new(self.resolve_refs(&o.result)),
                pure: o.pure,
            }),
            other => other.clone(),
        };
        out
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Pass 4/5: type checking and obligations
    // ══════════════════════════════════════════════════════════════════════════

    fn check_definition(&mut self, id: DefId) -> Result<(), InternalError> {
        self.defs.get(id).require_stage(Stage::TypeResolved)?;
        let kind = self.defs.get(id).kind.clone();
        match kind {
            DefKind::ExplicitFunction(f) => self.check_explicit_function(id, &f)?,
            DefKind::ImplicitFunction(f) => self.check_implicit_function(id, &f)?,
            DefKind::Operation(o) => self.check_operation(id, &o)?,
            DefKind::Value { pattern, expr, ty } => self.check_value(&pattern, &expr, &ty)?,
            DefKind::Type(t) => self.check_type_def(id, &t)?,
            DefKind::Class { members } => {
                let class_name = self.defs.get(id).name.clone();
                self.env.push(ScopeKind::ClassPrivate(class_name));
                for &m in &members {
                    self.env.define(NameScope::Global, m);
                }
                for &m in &members {
                    self.check_definition(m)?;
                }
                self.env.pop();
            }
            DefKind::Imported { .. } | DefKind::Local { .. } => {}
        }
        let def = self.defs.get_mut(id);
        def.advance(Stage::TypeChecked);
        def.advance(Stage::PoGenerated);
        Ok(())
    }

    fn check_explicit_function(
        &mut self,
        id: DefId,
        f: &ExplicitFunction,
    ) -> Result<(), InternalError> {
        let name = self.defs.get(id).name.clone();
        let span = self.defs.get(id).span;

        self.check_param_visibility(id, &f.ty);
        self.check_measure(id, f)?;

        self.env.push(ScopeKind::Function { functional: true });
        self.ctxt.push(ContextFrame::new(
            FrameKind::FunctionDefinition,
            format!("function {}", name.display_name()),
        ));

        let result_ty = self.check_params(&name, &f.ty, &f.params, span);

        if !f.body.is_unspecified() {
            let actual = self.check_expr(&f.body)?;
            if !compare::compatible(&result_ty, &actual, &self.registry) {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::UNEXPECTED_RESULT_TYPE,
                        format!(
                            "Function '{}' returns unexpected type",
                            name.display_name()
                        ),
                        f.body.span,
                    )
                    .with_actual_expected(&actual, &result_ty),
                );
            } else if !compare::is_sub_type(&actual, &result_ty, &self.registry) {
                self.obligations.add(
                    PoKind::SubTypeOfDeclaredResult,
                    name.clone(),
                    f.body.span,
                    &self.ctxt,
                );
            }
        }

        if f.postcondition.is_some() {
            self.ctxt.push(ContextFrame::new(
                FrameKind::FunctionResult,
                "RESULT = body",
            ));
            self.obligations
                .add(PoKind::PostConditionHolds, name.clone(), span, &self.ctxt);
            self.ctxt.pop();
        }

        self.ctxt.pop();
        if f.body.is_unspecified() {
            // No body, nothing could have used the parameters.
            self.env.pop();
        } else {
            let file = self.file.clone();
            self.env
                .pop_and_check_unused(&self.defs, &file, &mut self.diags);
        }
        Ok(())
    }

    fn check_implicit_function(
        &mut self,
        id: DefId,
        f: &ImplicitFunction,
    ) -> Result<(), InternalError> {
        let name = self.defs.get(id).name.clone();
        let span = self.defs.get(id).span;
        self.check_param_visibility(id, &f.ty);

        // No body: the specification itself must be satisfiable.
        self.ctxt.push(ContextFrame::new(
            FrameKind::FunctionDefinition,
            format!("implicit function {}", name.display_name()),
        ));
        self.obligations.add(
            PoKind::SatisfiabilityOfImplicitSpec,
            name.clone(),
            span,
            &self.ctxt,
        );
        self.ctxt.pop();
        Ok(())
    }

    fn check_operation(&mut self, id: DefId, o: &OperationDef) -> Result<(), InternalError> {
        let name = self.defs.get(id).name.clone();
        let span = self.defs.get(id).span;

        let (param_types, result_ty) = match o.ty.as_operation() {
            Some(op) => (op.params.clone(), (*op.result).clone()),
            None => (TypeList::new(), Type::unknown(span)),
        };

        self.env.push(ScopeKind::Function { functional: false });

        if o.params.len() != param_types.len() {
            let code = if o.params.len() > param_types.len() {
                DiagCode::TOO_MANY_PARAMETER_PATTERNS
            } else {
                DiagCode::TOO_FEW_PARAMETER_PATTERNS
            };
            self.diags.push(
                Diagnostic::new(&self.file, code, "Parameter patterns do not match type", span)
                    .with_actual_expected(o.params.len(), param_types.len()),
            );
        }
        for (i, p) in o.params.iter().enumerate() {
            let ty = param_types
                .get(i)
                .cloned()
                .unwrap_or_else(|| Type::unknown(p.span));
            self.bind_pattern(p, &ty);
        }

        if let Some(body) = &o.body {
            if !body.is_unspecified() {
                let actual = self.check_expr(body)?;
                let void_ok = result_ty.is_void(&self.registry) && actual.is_void(&self.registry);
                if !void_ok && !compare::compatible(&result_ty, &actual, &self.registry) {
                    self.diags.push(
                        Diagnostic::new(
                            &self.file,
                            DiagCode::UNEXPECTED_RESULT_TYPE,
                            format!(
                                "Operation '{}' returns unexpected type",
                                name.display_name()
                            ),
                            body.span,
                        )
                        .with_actual_expected(&actual, &result_ty),
                    );
                }
            }
        }

        let unspecified = o.body.as_ref().map(|b| b.is_unspecified()).unwrap_or(true);
        if unspecified {
            self.env.pop();
        } else {
            let file = self.file.clone();
            self.env
                .pop_and_check_unused(&self.defs, &file, &mut self.diags);
        }
        Ok(())
    }

    fn check_value(
        &mut self,
        pat: &Pattern,
        expr: &Expr,
        declared: &Type,
    ) -> Result<(), InternalError> {
        let actual = self.check_expr(expr)?;
        let expected = if matches!(declared.kind, TypeKind::Unknown) {
            actual.clone()
        } else {
            if !compare::compatible(declared, &actual, &self.registry) {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::UNEXPECTED_RESULT_TYPE,
                        "Expression does not match declared type",
                        expr.span,
                    )
                    .with_actual_expected(&actual, declared),
                );
            }
            declared.clone()
        };
        let bound = self.bind_pattern(pat, &expected);
        for b in bound {
            self.env.define(NameScope::Global, b);
        }
        Ok(())
    }

    fn check_type_def(&mut self, id: DefId, t: &TypeDef) -> Result<(), InternalError> {
        if let Some((pattern, inv)) = &t.invariant {
            let name = self.defs.get(id).name.clone();
            let underlying = self
                .registry
                .lookup(&name)
                .cloned()
                .unwrap_or_else(|| Type::unknown(self.defs.get(id).span));
            self.env.push(ScopeKind::Function { functional: true });
            let bound = self.bind_pattern(pattern, &underlying);
            for b in bound {
                self.env.define(NameScope::Local, b);
            }
            let inv_ty = self.check_expr(inv)?;
            if !inv_ty.is_boolean(&self.registry) {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::NON_BOOLEAN_CONDITION,
                        "Type invariant is not boolean",
                        inv.span,
                    )
                    .with_detail("Actual", &inv_ty),
                );
            }
            self.env.pop();
        }
        Ok(())
    }

    /// Check curried parameter groups against the declared function type,
    /// binding every pattern, and return the result type after the
    /// consumed layers. Reports 3020/3021/3022 but always completes.
    fn check_params(&mut self, name: &Name, ty: &Type, groups: &[Vec<Pattern>], span: Span) -> Type {
        let mut current = ty.clone();
        for (gi, group) in groups.iter().enumerate() {
            let expanded = current.expand(&self.registry).clone();
            let layer = match expanded.kind {
                TypeKind::Function(f) => f,
                _ => {
                    self.error(
                        DiagCode::TOO_MANY_CURRIED_PARAMETERS,
                        format!(
                            "Too many curried parameters for '{}'",
                            name.display_name()
                        ),
                        span,
                    );
                    for p in groups[gi..].iter().flatten() {
                        let unknown = Type::unknown(p.span);
                        self.bind_pattern(p, &unknown);
                    }
                    return current;
                }
            };

            if group.len() > layer.params.len() {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::TOO_MANY_PARAMETER_PATTERNS,
                        format!("Too many parameter patterns for '{}'", name.display_name()),
                        span,
                    )
                    .with_actual_expected(group.len(), layer.params.len()),
                );
            } else if group.len() < layer.params.len() {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::TOO_FEW_PARAMETER_PATTERNS,
                        format!("Too few parameter patterns for '{}'", name.display_name()),
                        span,
                    )
                    .with_actual_expected(group.len(), layer.params.len()),
                );
            }

            let mut seen = Vec::new();
            let mut needs_po = false;
            for (i, p) in group.iter().enumerate() {
                let ty = layer
                    .params
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| Type::unknown(p.span));
                self.bind_pattern(p, &ty);
                if !p.always_matches() {
                    needs_po = true;
                }
                for n in p.variable_names() {
                    if seen.contains(&n) {
                        needs_po = true;
                    }
                    seen.push(n);
                }
            }
            if needs_po {
                self.obligations
                    .add(PoKind::ParameterPatternMatch, name.clone(), span, &self.ctxt);
            }

            current = (*layer.result).clone();
        }
        current
    }

    /// Check a pattern against a type, define its bindings locally, and
    /// return them.
    pub(crate) fn bind_pattern(&mut self, pattern: &Pattern, ty: &Type) -> Vec<DefId> {
        let mut ctx = PatternCtx {
            file: &self.file,
            registry: &self.registry,
            diags: &mut self.diags,
        };
        let bound = pattern::check_pattern(pattern, ty, &mut ctx, &mut self.defs);
        for &b in &bound {
            self.env.define(NameScope::Local, b);
        }
        bound
    }

    /// A public function whose parameters mention a less visible type
    /// leaks a name its callers cannot see.
    fn check_param_visibility(&mut self, id: DefId, ty: &Type) {
        if !self.settings.dialect.is_object_oriented() {
            return;
        }
        let access = self.defs.get(id).access;
        let span = self.defs.get(id).span;
        let fname = self.defs.get(id).name.clone();
        let mut named = Vec::new();
        collect_named(ty, &mut named);
        for n in named {
            let type_access = self
                .defs
                .ids()
                .map(|i| self.defs.get(i))
                .find(|d| matches!(d.kind, DefKind::Type(_)) && d.name == n)
                .map(|d| d.access);
            if let Some(ta) = type_access {
                if ta.narrower_than(access) {
                    self.diags.push(
                        Diagnostic::new(
                            &self.file,
                            DiagCode::NARROWER_PARAM_VISIBILITY,
                            format!(
                                "Type '{}' of parameter of '{}' is less accessible than the function",
                                n.display_name(),
                                fname.display_name()
                            ),
                            span,
                        ),
                    );
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Measures
    // ══════════════════════════════════════════════════════════════════════════

    fn check_measure(&mut self, id: DefId, f: &ExplicitFunction) -> Result<(), InternalError> {
        let name = self.defs.get(id).name.clone();
        let span = self.defs.get(id).span;

        let Some(measure_name) = &f.measure else {
            if f.is_recursive {
                self.diags.push(Diagnostic::new(
                    &self.file,
                    DiagCode::NO_MEASURE,
                    format!(
                        "Recursive function '{}' has no measure",
                        name.display_name()
                    ),
                    span,
                ));
            }
            return Ok(());
        };

        let Some(measure_id) = self.env.find(measure_name, NameScope::Local, &self.defs) else {
            self.error(
                DiagCode::MEASURE_NOT_IN_SCOPE,
                format!("Measure '{}' is not in scope", measure_name.display_name()),
                span,
            );
            return Ok(());
        };

        if measure_id == id {
            self.error(
                DiagCode::MEASURE_IS_SELF,
                "A function cannot be its own measure",
                span,
            );
            return Ok(());
        }

        let Some(measure) = self.defs.get(measure_id).as_explicit_function().map(Clone::clone)
        else {
            self.error(
                DiagCode::MEASURE_NOT_EXPLICIT,
                format!(
                    "Measure '{}' is not an explicit function",
                    measure_name.display_name()
                ),
                span,
            );
            return Ok(());
        };

        match (f.type_params.is_empty(), measure.type_params.is_empty()) {
            (true, false) => {
                self.error(
                    DiagCode::MEASURE_NOT_POLYMORPHIC,
                    "Measure must not be polymorphic",
                    span,
                );
            }
            (false, true) => {
                self.error(
                    DiagCode::MEASURE_MUST_BE_POLYMORPHIC,
                    "Measure must also be polymorphic",
                    span,
                );
            }
            (false, false) if f.type_params != measure.type_params => {
                self.error(
                    DiagCode::MEASURE_TYPE_PARAMS_DIFFER,
                    "Measure's type parameters must match the function's",
                    span,
                );
            }
            _ => {}
        }

        // The measure takes the function's parameters, with curried
        // layers flattened into one list.
        let expected = flattened_params(&f.ty);
        let actual = match measure.ty.as_function() {
            Some(mf) => mf.params.clone(),
            None => TypeList::new(),
        };
        if expected != actual {
            self.diags.push(
                Diagnostic::new(
                    &self.file,
                    DiagCode::MEASURE_PARAMS_DIFFER,
                    format!(
                        "Measure '{}' parameters different to function",
                        measure_name.display_name()
                    ),
                    span,
                )
                .with_actual_expected(&actual, &expected),
            );
        }

        // Range must be nat, or a tuple of nats (lexicographic order).
        let range = crate::defs::final_result(&measure.ty).clone();
        let nat = Type::numeric(NumericKind::Natural, span);
        let lexical = match &range.kind {
            TypeKind::Product(members) => {
                if members
                    .iter()
                    .all(|m| compare::is_sub_type(m, &nat, &self.registry))
                {
                    Some(members.len())
                } else {
                    None
                }
            }
            _ => {
                if compare::is_sub_type(&range, &nat, &self.registry) {
                    Some(0)
                } else {
                    None
                }
            }
        };
        match lexical {
            Some(n) => {
                if let DefKind::ExplicitFunction(stored) = &mut self.defs.get_mut(id).kind {
                    stored.measure_lexical = n;
                }
            }
            None => {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::MEASURE_RANGE_NOT_NAT,
                        "Measure range is not a nat, or a nat tuple",
                        span,
                    )
                    .with_detail("Actual", &range),
                );
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Polymorphic instantiation
    // ══════════════════════════════════════════════════════════════════════════

    /// Instantiate a polymorphic function type with actual type
    /// arguments, caching one instance per distinct tuple so repeated
    /// instantiations are the identical type.
    pub(crate) fn instantiate_poly(
        &mut self,
        name: &Name,
        ty: &Type,
        actuals: &TypeList,
        span: Span,
    ) -> Type {
        let key = (name.clone(), actuals.clone());
        if let Some(cached) = self.poly_cache.get(&key) {
            return cached.clone();
        }
        let type_params = match ty.as_function() {
            Some(f) => f.type_params.clone(),
            None => Vec::new(),
        };
        if type_params.len() != actuals.len() {
            self.diags.push(
                Diagnostic::new(
                    &self.file,
                    DiagCode::WRONG_TYPE_ARGUMENT_COUNT,
                    format!(
                        "Function '{}' expects {} type argument(s)",
                        name.display_name(),
                        type_params.len()
                    ),
                    span,
                )
                .with_actual_expected(actuals.len(), type_params.len()),
            );
            return Type::unknown(span);
        }
        let mut instance = ty.clone();
        for (pname, actual) in type_params.iter().zip(actuals.iter()) {
            instance = instance.instantiate(pname, actual);
        }
        self.poly_cache.insert(key, instance.clone());
        instance
    }
}

/// Collect the named references a type mentions.
fn collect_named(ty: &Type, out: &mut Vec<Name>) {
    match &ty.kind {
        TypeKind::Unresolved(n) | TypeKind::Named(n) => out.push(n.clone()),
        TypeKind::Optional(t) | TypeKind::Set(t) => collect_named(t, out),
        TypeKind::Seq { elem, .. } => collect_named(elem, out),
        TypeKind::Map { dom, rng } => {
            collect_named(dom, out);
            collect_named(rng, out);
        }
        TypeKind::Product(ts) => ts.iter().for_each(|t| collect_named(t, out)),
        TypeKind::Union(ts) => ts.iter().for_each(|t| collect_named(t, out)),
        TypeKind::Record(r) => r.fields.iter().for_each(|f| collect_named(&f.ty, out)),
        TypeKind::Function(f) => {
            f.params.iter().for_each(|t| collect_named(t, out));
            collect_named(&f.result, out);
        }
        TypeKind::Operation(o) => {
            o.params.iter().for_each(|t| collect_named(t, out));
            collect_named(&o.result, out);
        }
        _ => {}
    }
}

/// Does the expression mention `name` as a variable? Used to detect
/// direct recursion.
pub(crate) fn mentions(expr: &Expr, name: &Name) -> bool {
    match &expr.kind {
        ExprKind::Variable(n) => n == name,
        ExprKind::Not(e) => mentions(e, name),
        ExprKind::And(a, b)
        | ExprKind::Or(a, b)
        | ExprKind::Implies(a, b)
        | ExprKind::Equals(a, b)
        | ExprKind::NotEquals(a, b)
        | ExprKind::Compare(_, a, b)
        | ExprKind::Arith(_, a, b) => mentions(a, name) || mentions(b, name),
        ExprKind::Apply { func, args, .. } => {
            mentions(func, name) || args.iter().any(|a| mentions(a, name))
        }
        ExprKind::Let { bindings, body } => {
            bindings.iter().any(|(_, e)| mentions(e, name)) || mentions(body, name)
        }
        ExprKind::If { cond, then, els } => {
            mentions(cond, name) || mentions(then, name) || mentions(els, name)
        }
        ExprKind::Forall { body, .. } | ExprKind::Exists { body, .. } => mentions(body, name),
        ExprKind::TupleCtor(es) | ExprKind::SetEnum(es) | ExprKind::SeqEnum(es) => {
            es.iter().any(|e| mentions(e, name))
        }
        ExprKind::RecordCtor { args, .. } => args.iter().any(|a| mentions(a, name)),
        _ => false,
    }
}
