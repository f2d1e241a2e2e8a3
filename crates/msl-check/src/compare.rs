//! Type comparison.
//!
//! Two relations, used at different moments:
//!
//! * [`compatible`] — "could a value of one type possibly be used as the
//!   other": permissive, both-ways, the test applied when an expression is
//!   handed to a context. Unions succeed when any member pair does; any
//!   two numerics are compatible.
//! * [`is_sub_type`] — "is every value of `sub` also a value of `sup`":
//!   directional. A union on the left must qualify member by member; on
//!   the right a single member suffices. Numeric subtyping follows the
//!   tower weights.
//!
//! Both are coinductive over the resolved type graph: a pair currently
//! being tested is assumed to hold when revisited, so recursive types
//! compare in finite time.

use crate::registry::TypeRegistry;
use crate::ty::{Type, TypeKind};

/// Pairs currently on the comparison stack.
type Done = Vec<(Type, Type)>;

pub fn compatible(a: &Type, b: &Type, reg: &TypeRegistry) -> bool {
    search_compatible(a, b, reg, &mut Done::new())
}

pub fn is_sub_type(sub: &Type, sup: &Type, reg: &TypeRegistry) -> bool {
    search_sub_type(sub, sup, reg, &mut Done::new())
}

fn search_compatible(to: &Type, from: &Type, reg: &TypeRegistry, done: &mut Done) -> bool {
    let pair = (to.clone(), from.clone());
    if done.contains(&pair) {
        return true;
    }
    done.push(pair);
    let result = compatible_of(to.expand(reg), from.expand(reg), reg, done);
    done.pop();
    result
}

fn compatible_of(to: &Type, from: &Type, reg: &TypeRegistry, done: &mut Done) -> bool {
    use TypeKind::*;

    if matches!(to.kind, Unknown) || matches!(from.kind, Unknown) {
        return true;
    }
    if matches!(to.kind, Parameter(_)) || matches!(from.kind, Parameter(_)) {
        return true;
    }

    // Union members are tried existentially, on either side.
    if let Union(members) = &to.kind {
        return members
            .iter()
            .any(|m| search_compatible(m, from, reg, done));
    }
    if let Union(members) = &from.kind {
        return members.iter().any(|m| search_compatible(to, m, reg, done));
    }

    // Optionality never blocks compatibility; only the inner types matter.
    match (&to.kind, &from.kind) {
        (Optional(a), Optional(b)) => return search_compatible(a, b, reg, done),
        (Optional(a), _) => return search_compatible(a, from, reg, done),
        (_, Optional(b)) => return search_compatible(to, b, reg, done),
        _ => {}
    }

    match (&to.kind, &from.kind) {
        (Numeric(_), Numeric(_)) => true,
        (Boolean, Boolean) | (Token, Token) | (Void, Void) => true,
        (Quote(a), Quote(b)) => a == b,
        (Set(a), Set(b)) => search_compatible(a, b, reg, done),
        (Seq { elem: a, .. }, Seq { elem: b, .. }) => search_compatible(a, b, reg, done),
        (Map { dom: ad, rng: ar }, Map { dom: bd, rng: br }) => {
            search_compatible(ad, bd, reg, done) && search_compatible(ar, br, reg, done)
        }
        (Product(a), Product(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| search_compatible(x, y, reg, done))
        }
        // Records and classes are nominal.
        (Record(a), Record(b)) => a.name == b.name,
        (Class(a), Class(b)) => a.name == b.name,
        (Function(a), Function(b)) => {
            a.params.len() == b.params.len()
                && a.params
                    .iter()
                    .zip(b.params.iter())
                    .all(|(x, y)| search_compatible(x, y, reg, done))
                && search_compatible(&a.result, &b.result, reg, done)
        }
        (Operation(a), Operation(b)) => {
            a.params.len() == b.params.len()
                && a.params
                    .iter()
                    .zip(b.params.iter())
                    .all(|(x, y)| search_compatible(x, y, reg, done))
                && search_compatible(&a.result, &b.result, reg, done)
        }
        _ => false,
    }
}

fn search_sub_type(sub: &Type, sup: &Type, reg: &TypeRegistry, done: &mut Done) -> bool {
    let pair = (sub.clone(), sup.clone());
    if done.contains(&pair) {
        return true;
    }
    done.push(pair);
    let result = sub_type_of(sub.expand(reg), sup.expand(reg), reg, done);
    done.pop();
    result
}

fn sub_type_of(sub: &Type, sup: &Type, reg: &TypeRegistry, done: &mut Done) -> bool {
    use TypeKind::*;

    if matches!(sub.kind, Unknown) || matches!(sup.kind, Unknown) {
        return true;
    }
    if let (Parameter(a), Parameter(b)) = (&sub.kind, &sup.kind) {
        return a == b;
    }

    // Every member of a left-hand union must fit; one member of a
    // right-hand union suffices.
    if let Union(members) = &sub.kind {
        return members.iter().all(|m| search_sub_type(m, sup, reg, done));
    }
    if let Union(members) = &sup.kind {
        return members.iter().any(|m| search_sub_type(sub, m, reg, done));
    }

    // [T] admits nil; a non-optional supertype does not.
    match (&sub.kind, &sup.kind) {
        (Optional(a), Optional(b)) => return search_sub_type(a, b, reg, done),
        (Optional(_), _) => return false,
        (_, Optional(b)) => return search_sub_type(sub, b, reg, done),
        _ => {}
    }

    match (&sub.kind, &sup.kind) {
        (Numeric(a), Numeric(b)) => a.weight() <= b.weight(),
        (Boolean, Boolean) | (Token, Token) | (Void, Void) => true,
        (Quote(a), Quote(b)) => a == b,
        (Set(a), Set(b)) => search_sub_type(a, b, reg, done),
        (
            Seq {
                elem: a,
                non_empty: a1,
            },
            Seq {
                elem: b,
                non_empty: b1,
            },
        ) => {
            // seq1 is a subtype of seq; the reverse admits [].
            (!b1 || *a1) && search_sub_type(a, b, reg, done)
        }
        (Map { dom: ad, rng: ar }, Map { dom: bd, rng: br }) => {
            search_sub_type(ad, bd, reg, done) && search_sub_type(ar, br, reg, done)
        }
        (Product(a), Product(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| search_sub_type(x, y, reg, done))
        }
        // Structural on fields, so merged union records only qualify when
        // every field (including any injected `<?>`) fits.
        (Record(a), Record(b)) => {
            a.fields.len() == b.fields.len()
                && a.fields.iter().zip(b.fields.iter()).all(|(x, y)| {
                    x.tag == y.tag && search_sub_type(&x.ty, &y.ty, reg, done)
                })
        }
        (Class(a), Class(b)) => a.name == b.name,
        (Function(a), Function(b)) => {
            a.params.len() == b.params.len()
                && a.params
                    .iter()
                    .zip(b.params.iter())
                    .all(|(x, y)| search_sub_type(x, y, reg, done))
                && search_sub_type(&a.result, &b.result, reg, done)
        }
        (Operation(a), Operation(b)) => {
            a.params.len() == b.params.len()
                && a.params
                    .iter()
                    .zip(b.params.iter())
                    .all(|(x, y)| search_sub_type(x, y, reg, done))
                && search_sub_type(&a.result, &b.result, reg, done)
        }
        _ => false,
    }
}
