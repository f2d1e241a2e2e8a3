//! Expression type checking.
//!
//! Every expression yields a type; when an expression is wrong the error
//! goes to the diagnostic sink and the expression recovers as `Unknown`,
//! so one mistake never cascades into a wall of follow-on errors.
//!
//! Quantifiers and implications push frames on the proof-obligation
//! context stack around their bodies, and pop them on every exit path.

use msl_types::ast::{
    ArithOp, Bind, Expr, ExprKind, MultiBind, MultiBindSource, Pattern, PatternOrBind,
};
use msl_types::{DiagCode, Diagnostic, InternalError, Name, Span};

use crate::checker::Checker;
use crate::compare;
use crate::defs::{DefId, DefKind};
use crate::env::{NameScope, ScopeKind};
use crate::pattern::{self, PatternBind, PatternCtx};
use crate::po::{ContextFrame, FrameKind};
use crate::settings::Release;
use crate::ty::{NumericKind, Type};
use crate::typeset::{TypeList, TypeSet};

impl Checker {
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> Result<Type, InternalError> {
        let span = expr.span;
        let ty = match &expr.kind {
            ExprKind::BoolLit(_) => Type::boolean(span),
            ExprKind::IntLit(n) => {
                let kind = if *n > 0 {
                    NumericKind::Nat1
                } else if *n == 0 {
                    NumericKind::Natural
                } else {
                    NumericKind::Int
                };
                Type::numeric(kind, span)
            }
            ExprKind::RealLit(_) => Type::numeric(NumericKind::Real, span),
            ExprKind::QuoteLit(tag) => Type::quote(tag.clone(), span),
            ExprKind::Nil => Type::optional(Type::unknown(span), span),
            ExprKind::Variable(name) => self.check_variable(name, span),
            ExprKind::Not(e) => {
                let t = self.check_expr(e)?;
                self.require_boolean(&t, e.span, "Argument of 'not' is not boolean");
                Type::boolean(span)
            }
            ExprKind::And(l, r) | ExprKind::Or(l, r) => {
                let lt = self.check_expr(l)?;
                self.require_boolean(&lt, l.span, "Left hand of logical operator is not boolean");
                let rt = self.check_expr(r)?;
                self.require_boolean(&rt, r.span, "Right hand of logical operator is not boolean");
                Type::boolean(span)
            }
            ExprKind::Implies(l, r) => {
                let lt = self.check_expr(l)?;
                self.require_boolean(&lt, l.span, "Left hand of '=>' is not boolean");
                self.ctxt
                    .push(ContextFrame::new(FrameKind::Implies, "antecedent =>"));
                let result = self.check_expr(r);
                self.ctxt.pop();
                let rt = result?;
                self.require_boolean(&rt, r.span, "Right hand of '=>' is not boolean");
                Type::boolean(span)
            }
            ExprKind::Equals(l, r) | ExprKind::NotEquals(l, r) => {
                let lt = self.check_expr(l)?;
                let rt = self.check_expr(r)?;
                if !compare::compatible(&lt, &rt, &self.registry) {
                    self.diags.push(
                        Diagnostic::new(
                            &self.file,
                            DiagCode::INCOMPATIBLE_ARGUMENT,
                            "Left and right of equality are incompatible",
                            span,
                        )
                        .with_actual_expected(&rt, &lt),
                    );
                }
                Type::boolean(span)
            }
            ExprKind::Compare(_, l, r) => {
                let lt = self.check_expr(l)?;
                self.require_numeric(&lt, l.span);
                let rt = self.check_expr(r)?;
                self.require_numeric(&rt, r.span);
                Type::boolean(span)
            }
            ExprKind::Arith(op, l, r) => {
                let lt = self.check_expr(l)?;
                let lk = self.require_numeric(&lt, l.span);
                let rt = self.check_expr(r)?;
                let rk = self.require_numeric(&rt, r.span);
                Type::numeric(arith_result(*op, lk, rk), span)
            }
            ExprKind::Apply {
                func,
                type_args,
                args,
            } => self.check_apply(func, type_args, args, span)?,
            ExprKind::Let { bindings, body } => {
                self.env.push(ScopeKind::Names);
                for (pb, value) in bindings {
                    let vt = self.check_expr(value)?;
                    let mut bind = PatternBind::new(pb.clone());
                    self.check_pattern_bind(&mut bind, &vt)?;
                    for &b in bind.definitions()? {
                        self.env.define(NameScope::Local, b);
                    }
                }
                let result = self.check_expr(body);
                let file = self.file.clone();
                self.env
                    .pop_and_check_unused(&self.defs, &file, &mut self.diags);
                result?
            }
            ExprKind::If { cond, then, els } => {
                let ct = self.check_expr(cond)?;
                self.require_boolean(&ct, cond.span, "If condition is not boolean");
                let tt = self.check_expr(then)?;
                let et = self.check_expr(els)?;
                let mut set = TypeSet::new();
                set.add(tt);
                set.add(et);
                set.get_type(span)
            }
            ExprKind::Forall { binds, body } => {
                self.check_quantifier(FrameKind::Forall, "forall binds &", binds, body, span)?
            }
            ExprKind::Exists { binds, body } => {
                self.check_quantifier(FrameKind::Exists, "exists binds &", binds, body, span)?
            }
            ExprKind::TupleCtor(parts) => {
                let mut members = TypeList::new();
                for p in parts {
                    members.push(self.check_expr(p)?);
                }
                Type::product(members, span)
            }
            ExprKind::RecordCtor { name, args } => self.check_record_ctor(name, args, span)?,
            ExprKind::SetEnum(elems) => {
                let elem = self.check_enum_elements(elems, span)?;
                Type::set(elem, span)
            }
            ExprKind::SeqEnum(elems) => {
                let elem = self.check_enum_elements(elems, span)?;
                if elems.is_empty() {
                    Type::seq(elem, span)
                } else {
                    Type::seq1(elem, span)
                }
            }
            ExprKind::NotYetSpecified | ExprKind::SubclassResponsibility => Type::unknown(span),
        };
        Ok(ty)
    }

    fn check_variable(&mut self, name: &Name, span: Span) -> Type {
        if let Some(id) = self.env.find(name, NameScope::Local, &self.defs) {
            if let Some(ty) = self.defs.get(id).value_type() {
                return ty.clone();
            }
        }
        if self.env.find_hidden(name, NameScope::Local, &self.defs).is_some() {
            self.error(
                DiagCode::INACCESSIBLE_MEMBER,
                format!("Member '{}' is not accessible", name.display_name()),
                span,
            );
        } else {
            self.error(
                DiagCode::NOT_IN_SCOPE,
                format!("Name '{}' is not in scope", name.display_name()),
                span,
            );
        }
        Type::unknown(span)
    }

    fn check_apply(
        &mut self,
        func: &Expr,
        type_args: &[msl_types::ast::TypeAnnotation],
        args: &[Expr],
        span: Span,
    ) -> Result<Type, InternalError> {
        let mut fty = self.check_expr(func)?;

        // Implicit functions have no body to run.
        if let ExprKind::Variable(name) = &func.kind {
            let id = self.env.find(name, NameScope::Local, &self.defs);
            if let Some(id) = id {
                if matches!(self.defs.get(id).kind, DefKind::ImplicitFunction(_)) {
                    self.error(
                        DiagCode::NOT_A_FUNCTION,
                        format!(
                            "Implicit function '{}' has no body and cannot be applied",
                            name.display_name()
                        ),
                        span,
                    );
                    for a in args {
                        self.check_expr(a)?;
                    }
                    return Ok(Type::unknown(span));
                }
            }
        }

        if !type_args.is_empty() {
            let actuals: TypeList = type_args
                .iter()
                .map(|a| {
                    let t = Type::from_annotation(a);
                    self.resolve_refs(&t)
                })
                .collect();
            let name = match &func.kind {
                ExprKind::Variable(n) => n.clone(),
                _ => Name::new("", "?", span),
            };
            fty = self.instantiate_poly(&name, &fty, &actuals, span);
        }

        let view = fty.function_view(&self.registry);
        let Some(view) = view else {
            // Operations apply too, but never from a functional context.
            if let Some(op_view) = fty.operation_view(&self.registry) {
                if self.env.in_functional_context() {
                    self.error(
                        DiagCode::NOT_A_FUNCTION,
                        "Operation cannot be called from a function",
                        span,
                    );
                    return Ok(Type::unknown(span));
                }
                let op = op_view.as_operation().cloned();
                if let Some(op) = op {
                    self.check_arguments(&op.params, args, span)?;
                    return Ok((*op.result).clone());
                }
            }
            self.error(DiagCode::NOT_A_FUNCTION, "Expression is not a function", span);
            for a in args {
                self.check_expr(a)?;
            }
            return Ok(Type::unknown(span));
        };

        let Some(ft) = view.as_function().cloned() else {
            return Ok(Type::unknown(span));
        };
        self.check_arguments(&ft.params, args, span)?;
        Ok((*ft.result).clone())
    }

    fn check_arguments(
        &mut self,
        params: &TypeList,
        args: &[Expr],
        span: Span,
    ) -> Result<(), InternalError> {
        if params.len() != args.len() {
            self.diags.push(
                Diagnostic::new(
                    &self.file,
                    DiagCode::WRONG_ARGUMENT_COUNT,
                    "Wrong number of arguments",
                    span,
                )
                .with_actual_expected(args.len(), params.len()),
            );
        }
        for (i, arg) in args.iter().enumerate() {
            let at = self.check_expr(arg)?;
            if let Some(expected) = params.get(i) {
                if !compare::compatible(expected, &at, &self.registry) {
                    self.diags.push(
                        Diagnostic::new(
                            &self.file,
                            DiagCode::INCOMPATIBLE_ARGUMENT,
                            format!("Argument {} is incompatible", i + 1),
                            arg.span,
                        )
                        .with_actual_expected(&at, expected),
                    );
                }
            }
        }
        Ok(())
    }

    fn check_quantifier(
        &mut self,
        frame: FrameKind,
        frame_text: &str,
        binds: &[MultiBind],
        body: &Expr,
        span: Span,
    ) -> Result<Type, InternalError> {
        self.env.push(ScopeKind::Names);
        for bind in binds {
            match &bind.source {
                MultiBindSource::Type(ann) => {
                    let t = Type::from_annotation(ann);
                    let t = self.resolve_refs(&t);
                    for p in &bind.patterns {
                        self.bind_pattern(p, &t);
                    }
                }
                MultiBindSource::Set(source) => {
                    let st = self.check_expr(source)?;
                    for p in &bind.patterns {
                        self.bind_collection_pattern(p, &st);
                    }
                }
            }
        }
        self.ctxt.push(ContextFrame::new(frame, frame_text));
        let result = self.check_expr(body);
        self.ctxt.pop();
        let file = self.file.clone();
        self.env
            .pop_and_check_unused(&self.defs, &file, &mut self.diags);
        let bt = result?;
        self.require_boolean(&bt, body.span, "Quantifier body is not boolean");
        Ok(Type::boolean(span))
    }

    fn bind_collection_pattern(&mut self, pattern: &Pattern, source: &Type) {
        let mut ctx = PatternCtx {
            file: &self.file,
            registry: &self.registry,
            diags: &mut self.diags,
        };
        let bound = pattern::check_collection_bind(pattern, source, false, &mut ctx, &mut self.defs);
        for b in bound {
            self.env.define(NameScope::Local, b);
        }
    }

    /// Check a pattern-or-bind against the type of the value it will
    /// bind, recording the produced definitions on the bind. The caller
    /// chooses the scope to define them in.
    pub(crate) fn check_pattern_bind(
        &mut self,
        bind: &mut PatternBind,
        value: &Type,
    ) -> Result<(), InternalError> {
        let pb = bind.pb.clone();
        let bound = match &pb {
            PatternOrBind::Pattern(p) => {
                let mut ctx = PatternCtx {
                    file: &self.file,
                    registry: &self.registry,
                    diags: &mut self.diags,
                };
                pattern::check_pattern(p, value, &mut ctx, &mut self.defs)
            }
            PatternOrBind::Bind(Bind::Type { pattern, ty }) => {
                let declared = Type::from_annotation(ty);
                let declared = self.resolve_refs(&declared);
                let mut ctx = PatternCtx {
                    file: &self.file,
                    registry: &self.registry,
                    diags: &mut self.diags,
                };
                pattern::check_type_bind(pattern, &declared, value, &mut ctx, &mut self.defs)
            }
            PatternOrBind::Bind(Bind::Set { pattern, set }) => {
                let source = self.check_expr(set)?;
                self.check_member_bind(pattern, &source, false, value)
            }
            PatternOrBind::Bind(Bind::Seq { pattern, seq }) => {
                // Sequence binds arrived with VDM-10.
                if self.settings.release == Release::Classic {
                    self.error(
                        DiagCode::SEQ_BIND_NOT_IN_CLASSIC,
                        "Sequence binds are not available in classic",
                        pattern.span,
                    );
                }
                let source = self.check_expr(seq)?;
                self.check_member_bind(pattern, &source, true, value)
            }
        };
        bind.set_definitions(bound);
        Ok(())
    }

    /// A collection bind with a value asserts membership: the value must
    /// be compatible with the collection's element type.
    fn check_member_bind(
        &mut self,
        pattern: &Pattern,
        source: &Type,
        seq: bool,
        value: &Type,
    ) -> Vec<DefId> {
        let elem = if seq {
            source
                .seq_view(&self.registry)
                .and_then(|v| v.as_seq_elem().cloned())
        } else {
            source
                .set_view(&self.registry)
                .and_then(|v| v.as_set_elem().cloned())
        };
        if let Some(elem) = &elem {
            if !compare::compatible(elem, value, &self.registry) {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::BIND_INCOMPATIBLE,
                        format!(
                            "Expression is not compatible with {} bind",
                            if seq { "seq" } else { "set" }
                        ),
                        pattern.span,
                    )
                    .with_actual_expected(value, elem),
                );
            }
        }
        let mut ctx = PatternCtx {
            file: &self.file,
            registry: &self.registry,
            diags: &mut self.diags,
        };
        pattern::check_collection_bind(pattern, source, seq, &mut ctx, &mut self.defs)
    }

    fn check_record_ctor(
        &mut self,
        name: &Name,
        args: &[Expr],
        span: Span,
    ) -> Result<Type, InternalError> {
        let declared = self.registry.lookup(name).cloned();
        let Some(declared) = declared else {
            self.error(
                DiagCode::UNRESOLVED_TYPE_NAME,
                format!("Unable to resolve type name '{}'", name.display_name()),
                span,
            );
            for a in args {
                self.check_expr(a)?;
            }
            return Ok(Type::unknown(span));
        };
        let Some(view) = declared.record_view(&self.registry) else {
            self.error(
                DiagCode::NOT_A_FUNCTION,
                format!("'{}' is not a record type", name.display_name()),
                span,
            );
            for a in args {
                self.check_expr(a)?;
            }
            return Ok(Type::unknown(span));
        };
        let Some(rec) = view.as_record().cloned() else {
            return Ok(Type::unknown(span));
        };
        let field_types: TypeList = rec.fields.iter().map(|f| f.ty.clone()).collect();
        self.check_arguments(&field_types, args, span)?;
        Ok(Type::named(name.clone(), span))
    }

    fn check_enum_elements(&mut self, elems: &[Expr], span: Span) -> Result<Type, InternalError> {
        if elems.is_empty() {
            return Ok(Type::unknown(span));
        }
        let mut set = TypeSet::new();
        for e in elems {
            set.add(self.check_expr(e)?);
        }
        Ok(set.get_type(span))
    }

    fn require_boolean(&mut self, ty: &Type, span: Span, message: &str) {
        if !ty.is_boolean(&self.registry) {
            self.diags.push(
                Diagnostic::new(&self.file, DiagCode::NON_BOOLEAN_CONDITION, message, span)
                    .with_detail("Actual", ty),
            );
        }
    }

    /// Report a non-numeric operand and recover as `real`, so arithmetic
    /// keeps checking.
    fn require_numeric(&mut self, ty: &Type, span: Span) -> NumericKind {
        match ty.numeric_view(&self.registry) {
            Some(kind) => kind,
            None => {
                self.diags.push(
                    Diagnostic::new(
                        &self.file,
                        DiagCode::NON_NUMERIC_OPERAND,
                        "Operand is not numeric",
                        span,
                    )
                    .with_detail("Actual", ty),
                );
                NumericKind::Real
            }
        }
    }
}

/// The result kind of a binary arithmetic operator.
fn arith_result(op: ArithOp, l: NumericKind, r: NumericKind) -> NumericKind {
    match op {
        // '/' always leaves the integers.
        ArithOp::Div => NumericKind::Real,
        ArithOp::IntDiv | ArithOp::Mod => NumericKind::Int,
        // Subtraction can go below zero even for naturals.
        ArithOp::Sub => l.widen(r).widen(NumericKind::Int),
        ArithOp::Add | ArithOp::Mul => l.widen(r),
    }
}
