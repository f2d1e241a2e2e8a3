//! Qualified names.
//!
//! A [`Name`] pairs a module/class qualifier with an identifier, an
//! old-state flag (`x~` in postconditions refers to the pre-state value),
//! and an optional type qualifier used for overload resolution in the
//! object-oriented dialects.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::diag::InternalError;
use crate::Span;

/// A possibly-qualified name.
///
/// Equality is strict: two names with different qualifier presence are
/// never equal, so a qualified overload and its bare name are distinct
/// identities wherever a `Name` keys a map. Scope lookup uses the
/// permissive [`Name::matches`] instead, which lets an unqualified
/// reference find a qualified definition. The hash never covers the
/// qualifier, and once a name has been hashed its qualifier is frozen:
/// changing it afterwards would move the name between equality classes
/// while its hash stayed put, corrupting any map it is keyed in.
#[derive(Debug, Clone)]
pub struct Name {
    pub module: String,
    pub name: String,
    pub old: bool,
    /// Name was written with an explicit module/class prefix.
    pub explicit: bool,
    pub span: Span,
    type_qualifier: Option<Vec<String>>,
    hashed: Cell<bool>,
}

impl Name {
    pub fn new(module: impl Into<String>, name: impl Into<String>, span: Span) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            old: false,
            explicit: false,
            span,
            type_qualifier: None,
            hashed: Cell::new(false),
        }
    }

    pub fn with_explicit(mut self, explicit: bool) -> Self {
        self.explicit = explicit;
        self
    }

    /// The old-state (`~`) variant of this name.
    pub fn old_name(&self) -> Name {
        let mut n = Name::new(&self.module, &self.name, self.span);
        n.old = true;
        n
    }

    /// The new-state variant of this name.
    pub fn new_name(&self) -> Name {
        Name::new(&self.module, &self.name, self.span)
    }

    /// The synthesized precondition function name, `pre_f`.
    pub fn pre_name(&self, span: Span) -> Name {
        Name::new(&self.module, format!("pre_{}", self.name), span)
    }

    /// The synthesized postcondition function name, `post_f`.
    pub fn post_name(&self, span: Span) -> Name {
        Name::new(&self.module, format!("post_{}", self.name), span)
    }

    /// The type invariant function name, `inv_T`.
    pub fn inv_name(&self, span: Span) -> Name {
        Name::new(&self.module, format!("inv_{}", self.name), span)
    }

    /// The state initializer name, `init_S`.
    pub fn init_name(&self, span: Span) -> Name {
        Name::new(&self.module, format!("init_{}", self.name), span)
    }

    /// True for names the checker synthesizes and the surface syntax reserves.
    pub fn is_reserved(&self) -> bool {
        self.name.starts_with("pre_")
            || self.name.starts_with("post_")
            || self.name.starts_with("inv_")
            || self.name.starts_with("init_")
    }

    /// The same identifier re-homed in another module/class, keeping the
    /// qualifier. Used when union pseudoclasses absorb member definitions.
    pub fn modified_name(&self, module: impl Into<String>) -> Name {
        let mut n = Name::new(module, &self.name, self.span);
        n.old = self.old;
        n.explicit = self.explicit;
        n.type_qualifier = self.type_qualifier.clone();
        n
    }

    pub fn type_qualifier(&self) -> Option<&[String]> {
        self.type_qualifier.as_deref()
    }

    /// Attach an overload-resolution qualifier (rendered parameter types).
    ///
    /// Fails with [`InternalError::QualifierChanged`] if the name has
    /// already been hashed with a different qualifier.
    pub fn set_type_qualifier(
        &mut self,
        qualifier: Option<Vec<String>>,
    ) -> Result<(), InternalError> {
        if self.hashed.get() && self.type_qualifier != qualifier {
            return Err(InternalError::QualifierChanged(self.to_string()));
        }
        self.type_qualifier = qualifier;
        Ok(())
    }

    /// Lookup matching: like equality, but the qualifier is compared only
    /// when both names carry one. An unqualified reference matches any
    /// overload of the same name.
    pub fn matches(&self, other: &Name) -> bool {
        if self.module != other.module || self.name != other.name || self.old != other.old {
            return false;
        }
        match (&self.type_qualifier, &other.type_qualifier) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Render without the qualifier. Flat specifications have blank modules.
    pub fn display_name(&self) -> String {
        let prefix = if self.explicit && !self.module.is_empty() {
            format!("{}`", self.module)
        } else {
            String::new()
        };
        format!("{}{}{}", prefix, self.name, if self.old { "~" } else { "" })
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
            && self.name == other.name
            && self.old == other.old
            && self.type_qualifier == other.type_qualifier
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The qualifier is excluded so that a name hashes the same before
        // and after overload qualification. Observing the hash freezes the
        // qualifier: equality does consider it, so changing it later would
        // desync a map keyed by this name.
        self.hashed.set(true);
        self.module.hash(state);
        self.name.hash(state);
        self.old.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.module.is_empty() {
            write!(f, "{}`", self.module)?;
        }
        write!(f, "{}{}", self.name, if self.old { "~" } else { "" })?;
        if let Some(q) = &self.type_qualifier {
            write!(f, "({})", q.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn name(s: &str) -> Name {
        Name::new("M", s, Span::point(1, 1))
    }

    fn hash_of(n: &Name) -> u64 {
        let mut h = DefaultHasher::new();
        n.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_qualifier_presence_distinguishes() {
        let plain = name("f");
        let mut qualified = name("f");
        qualified
            .set_type_qualifier(Some(vec!["nat".into()]))
            .unwrap();
        // Distinct identities, but lookup matching stays permissive.
        assert_ne!(plain, qualified);
        assert_ne!(qualified, plain);
        assert!(plain.matches(&qualified));
        assert!(qualified.matches(&plain));
    }

    #[test]
    fn test_different_qualifiers_differ() {
        let mut a = name("f");
        a.set_type_qualifier(Some(vec!["nat".into()])).unwrap();
        let mut b = name("f");
        b.set_type_qualifier(Some(vec!["bool".into()])).unwrap();
        assert_ne!(a, b);
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_old_name_is_distinct() {
        let n = name("x");
        assert_ne!(n, n.old_name());
        assert_eq!(n.old_name().display_name(), "x~");
        assert_eq!(n.old_name().new_name(), n);
    }

    #[test]
    fn test_reserved_prefixes() {
        let n = name("f");
        let at = Span::point(1, 1);
        assert!(n.pre_name(at).is_reserved());
        assert!(n.post_name(at).is_reserved());
        assert!(n.inv_name(at).is_reserved());
        assert!(n.init_name(at).is_reserved());
        assert!(!n.is_reserved());
    }

    #[test]
    fn test_hash_ignores_qualifier() {
        let plain = name("f");
        let mut qualified = name("f");
        qualified
            .set_type_qualifier(Some(vec!["nat".into()]))
            .unwrap();
        assert_eq!(hash_of(&plain), hash_of(&qualified));
    }

    #[test]
    fn test_qualifier_frozen_after_hash() {
        let mut n = name("f");
        n.set_type_qualifier(Some(vec!["nat".into()])).unwrap();
        let _ = hash_of(&n);
        // Same qualifier is fine, a different one is an internal fault.
        assert!(n.set_type_qualifier(Some(vec!["nat".into()])).is_ok());
        assert!(matches!(
            n.set_type_qualifier(Some(vec!["bool".into()])),
            Err(InternalError::QualifierChanged(_))
        ));
    }

    #[test]
    fn test_display() {
        let mut n = name("f");
        n.set_type_qualifier(Some(vec!["nat".into(), "bool".into()]))
            .unwrap();
        assert_eq!(format!("{n}"), "M`f(nat, bool)");
        assert_eq!(n.display_name(), "f");
    }
}
