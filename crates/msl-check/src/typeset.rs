//! Deduplicated and ordered type containers.
//!
//! [`TypeSet`] is the foundation of union construction: insertion-ordered,
//! collapsing structural duplicates, with order-irrelevant equality.
//! [`TypeList`] is positional (function parameters, product members).

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use msl_types::Span;

use crate::ty::Type;
use crate::union;

// ══════════════════════════════════════════════════════════════════════════════
// TypeSet
// ══════════════════════════════════════════════════════════════════════════════

/// A set of types, deduplicating by structural equality but preserving
/// first-insertion order so diagnostics render deterministically.
#[derive(Debug, Clone, Default)]
pub struct TypeSet {
    members: Vec<Type>,
}

impl TypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(ty: Type) -> Self {
        let mut set = Self::new();
        set.add(ty);
        set
    }

    /// Insert unless a structurally equal member is already present.
    /// Returns true if the type was inserted.
    pub fn add(&mut self, ty: Type) -> bool {
        if self.members.contains(&ty) {
            return false;
        }
        self.members.push(ty);
        true
    }

    pub fn add_all(&mut self, other: impl IntoIterator<Item = Type>) {
        for ty in other {
            self.add(ty);
        }
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.members.contains(ty)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Type> {
        self.members.iter()
    }

    /// Collapse to a single type: the member itself when there is exactly
    /// one, otherwise a (flattened) union of the members.
    pub fn get_type(&self, span: Span) -> Type {
        if self.members.len() == 1 {
            self.members[0].clone()
        } else {
            union::make(span, self.clone())
        }
    }
}

impl IntoIterator for TypeSet {
    type Item = Type;
    type IntoIter = std::vec::IntoIter<Type>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<'a> IntoIterator for &'a TypeSet {
    type Item = &'a Type;
    type IntoIter = std::slice::Iter<'a, Type>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl FromIterator<Type> for TypeSet {
    fn from_iter<I: IntoIterator<Item = Type>>(iter: I) -> Self {
        let mut set = TypeSet::new();
        set.add_all(iter);
        set
    }
}

impl PartialEq for TypeSet {
    /// Order-irrelevant: the member sets must mutually contain each other.
    fn eq(&self, other: &Self) -> bool {
        self.members.iter().all(|t| other.contains(t))
            && other.members.iter().all(|t| self.contains(t))
    }
}

impl Eq for TypeSet {}

impl Hash for TypeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Wrapping sum of member hashes, so hashing agrees with the
        // order-irrelevant equality.
        let mut sum = 0u64;
        for ty in &self.members {
            let mut h = DefaultHasher::new();
            ty.hash(&mut h);
            sum = sum.wrapping_add(h.finish());
        }
        state.write_u64(sum);
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ty) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{ty}")?;
        }
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TypeList
// ══════════════════════════════════════════════════════════════════════════════

/// An ordered, positional sequence of types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeList {
    items: Vec<Type>,
}

impl TypeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ty: Type) {
        self.items.push(ty);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Type> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Type> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Type>) {
        self.items.extend(other);
    }
}

impl IntoIterator for TypeList {
    type Item = Type;
    type IntoIter = std::vec::IntoIter<Type>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a TypeList {
    type Item = &'a Type;
    type IntoIter = std::slice::Iter<'a, Type>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Type> for TypeList {
    fn from_iter<I: IntoIterator<Item = Type>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for TypeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ty) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        Ok(())
    }
}
