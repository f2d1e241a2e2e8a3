//! Proof obligations.
//!
//! Checking does not discharge obligations, it only records them: a flat,
//! ordered [`ProofObligationList`] numbered in generation order. Each
//! obligation snapshots the [`ContextStack`] active at its creation, so a
//! consumer can reconstruct the quantifiers, implications and function
//! frames the obligation sits under. The stack is strictly LIFO; every
//! code path that pushes a frame pops it on exit, error paths included.

use std::fmt;

use msl_types::{Name, Span};

/// What an obligation asks to be proved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoKind {
    /// A parameter pattern with duplicate names or literals only matches
    /// some values of its type.
    ParameterPatternMatch,
    /// The stated postcondition holds for the body's result.
    PostConditionHolds,
    /// The body's type is a subtype of the declared result type.
    SubTypeOfDeclaredResult,
    /// An implicit specification admits at least one result.
    SatisfiabilityOfImplicitSpec,
}

impl fmt::Display for PoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoKind::ParameterPatternMatch => "parameter pattern match",
            PoKind::PostConditionHolds => "post condition holds",
            PoKind::SubTypeOfDeclaredResult => "subtype of declared result",
            PoKind::SatisfiabilityOfImplicitSpec => "satisfiability of implicit specification",
        };
        write!(f, "{s}")
    }
}

/// The kind of context frame an obligation sits under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The enclosing function, with its precondition as an assumption.
    FunctionDefinition,
    /// The function's result binding.
    FunctionResult,
    Forall,
    Exists,
    Implies,
}

/// One frame of obligation context: the kind plus its rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFrame {
    pub kind: FrameKind,
    pub text: String,
}

impl ContextFrame {
    pub fn new(kind: FrameKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// The stack of frames surrounding the expression currently being
/// checked.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<ContextFrame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: ContextFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ContextFrame> {
        self.frames.pop()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ContextFrame> {
        self.frames.clone()
    }
}

/// A single generated obligation.
#[derive(Debug, Clone)]
pub struct ProofObligation {
    /// 1-based position in the generated list.
    pub number: usize,
    pub kind: PoKind,
    /// The definition the obligation originates from.
    pub definition: Name,
    pub span: Span,
    pub context: Vec<ContextFrame>,
}

impl fmt::Display for ProofObligation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Obligation {}: {} in '{}' at {}",
            self.number,
            self.kind,
            self.definition.display_name(),
            self.span
        )?;
        for frame in &self.context {
            writeln!(f, "  {}", frame.text)?;
        }
        Ok(())
    }
}

/// All obligations of a checking run, in generation order.
#[derive(Debug, Default)]
pub struct ProofObligationList {
    items: Vec<ProofObligation>,
}

impl ProofObligationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: PoKind, definition: Name, span: Span, ctxt: &ContextStack) {
        self.items.push(ProofObligation {
            number: self.items.len() + 1,
            kind,
            definition,
            span,
            context: ctxt.snapshot(),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProofObligation> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a ProofObligationList {
    type Item = &'a ProofObligation;
    type IntoIter = std::slice::Iter<'a, ProofObligation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::point(1, 1)
    }

    fn name(s: &str) -> Name {
        Name::new("M", s, span())
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut stack = ContextStack::new();
        stack.push(ContextFrame::new(FrameKind::Forall, "forall x : nat &"));
        stack.push(ContextFrame::new(FrameKind::Implies, "x > 0 =>"));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().kind, FrameKind::Implies);
        assert_eq!(stack.pop().unwrap().kind, FrameKind::Forall);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_obligation_snapshots_context() {
        let mut stack = ContextStack::new();
        let mut pos = ProofObligationList::new();
        stack.push(ContextFrame::new(FrameKind::FunctionDefinition, "f(x)"));
        pos.add(PoKind::SubTypeOfDeclaredResult, name("f"), span(), &stack);
        stack.pop();
        // Popping after generation must not disturb the recorded context.
        let po = pos.iter().next().unwrap();
        assert_eq!(po.context.len(), 1);
        assert_eq!(po.context[0].kind, FrameKind::FunctionDefinition);
    }

    #[test]
    fn test_numbering_is_sequential() {
        let stack = ContextStack::new();
        let mut pos = ProofObligationList::new();
        pos.add(PoKind::ParameterPatternMatch, name("f"), span(), &stack);
        pos.add(PoKind::PostConditionHolds, name("g"), span(), &stack);
        let numbers: Vec<usize> = pos.iter().map(|po| po.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
