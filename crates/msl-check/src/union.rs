//! Union type construction and merged projections.
//!
//! A union is represented by a [`TypeSet`] of members. Construction
//! flattens nested unions and collapses duplicates, so `(a | b) | (b | c)`
//! and `a | b | c` are the same type.
//!
//! A union "can be seen as" a set, seq, map, record, product, function,
//! operation or class when at least one member can; the view merges every
//! qualifying member's view into one shape. Members that do not qualify
//! simply drop out of the merged view, which makes the projection
//! existential; the comparator is what decides whether using the view is
//! actually safe for all members.

use msl_types::{Name, Span};

use crate::defs::{Access, AccessSpecifier};
use crate::registry::TypeRegistry;
use crate::ty::{ClassMember, ClassType, NumericKind, Type, TypeKind, Visited};
use crate::typeset::{TypeList, TypeSet};

// ══════════════════════════════════════════════════════════════════════════════
// Construction
// ══════════════════════════════════════════════════════════════════════════════

/// Build a union from a member set, flattening nested unions and
/// deduplicating. A singleton collapses to its only member; an empty set
/// degrades to [`TypeKind::Unknown`].
pub fn make(span: Span, members: TypeSet) -> Type {
    let mut flat = TypeSet::new();
    let mut definitions: Vec<Name> = Vec::new();
    flatten_into(members, &mut flat, &mut definitions);

    if flat.is_empty() {
        return Type::unknown(span);
    }
    if flat.len() == 1 {
        return flat.into_iter().next().unwrap();
    }

    let mut ty = Type::new(TypeKind::Union(flat), span);
    ty.definitions = definitions;
    ty
}

fn flatten_into(members: TypeSet, out: &mut TypeSet, definitions: &mut Vec<Name>) {
    for member in members {
        for d in &member.definitions {
            if !definitions.contains(d) {
                definitions.push(d.clone());
            }
        }
        match member.kind {
            TypeKind::Union(inner) => flatten_into(inner, out, definitions),
            _ => {
                out.add(member);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Merged views
// ══════════════════════════════════════════════════════════════════════════════

pub(crate) fn set_view(
    span: Span,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut elems = TypeSet::new();
    for member in members {
        if let Some(view) = member.set_view_with(reg, visited) {
            elems.add(view.as_set_elem().cloned()?);
        }
    }
    if elems.is_empty() {
        None
    } else {
        Some(Type::set(elems.get_type(span), span))
    }
}

pub(crate) fn seq_view(
    span: Span,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut elems = TypeSet::new();
    let mut all_non_empty = true;
    for member in members {
        if let Some(view) = member.seq_view_with(reg, visited) {
            match &view.kind {
                TypeKind::Seq { elem, non_empty } => {
                    elems.add((**elem).clone());
                    all_non_empty &= *non_empty;
                }
                _ => return None,
            }
        }
    }
    if elems.is_empty() {
        None
    } else if all_non_empty {
        Some(Type::seq1(elems.get_type(span), span))
    } else {
        Some(Type::seq(elems.get_type(span), span))
    }
}

pub(crate) fn map_view(
    span: Span,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut doms = TypeSet::new();
    let mut rngs = TypeSet::new();
    for member in members {
        if let Some(view) = member.map_view_with(reg, visited) {
            let (dom, rng) = view.as_map_parts().map(|(d, r)| (d.clone(), r.clone()))?;
            doms.add(dom);
            rngs.add(rng);
        }
    }
    if doms.is_empty() {
        None
    } else {
        Some(Type::map(doms.get_type(span), rngs.get_type(span), span))
    }
}

/// Merge the record views of the qualifying members field-by-field, in
/// first-appearance order. A field missing from some qualifying member
/// gets the illegal quote `<?>` added to its merged type, so a value of
/// the merged record can never be assumed to carry that field.
pub(crate) fn record_view(
    span: Span,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut records: Vec<crate::ty::RecordType> = Vec::new();
    for member in members {
        if let Some(view) = member.record_view_with(reg, visited) {
            records.push(view.as_record().cloned()?);
        }
    }
    if records.is_empty() {
        return None;
    }

    let mut merged: Vec<(String, TypeSet)> = Vec::new();
    for rec in &records {
        for field in &rec.fields {
            match merged.iter_mut().find(|(tag, _)| *tag == field.tag) {
                Some((_, set)) => {
                    set.add(field.ty.clone());
                }
                None => {
                    merged.push((field.tag.clone(), TypeSet::singleton(field.ty.clone())));
                }
            }
        }
    }

    let record_count = records.len();
    let fields = merged
        .into_iter()
        .map(|(tag, mut set)| {
            let present_in_all = records.iter().all(|r| r.field(&tag).is_some());
            if !present_in_all {
                set.add(Type::illegal_quote(span));
            }
            crate::ty::Field {
                tag,
                ty: set.get_type(span),
            }
        })
        .collect();
    debug_assert!(record_count >= 1);

    Some(Type::record(Name::new("", "?", span), fields, span))
}

/// Merge the class views of the qualifying members into a pseudoclass
/// named after its contributors (`*union_A_B`). Only public members
/// survive the merge; a merged member is pure only when every contributor
/// is pure.
pub(crate) fn class_view(
    span: Span,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut classes: Vec<ClassType> = Vec::new();
    for member in members {
        if let Some(view) = member.class_view_with(reg, visited) {
            classes.push(view.as_class().cloned()?);
        }
    }
    match classes.len() {
        0 => return None,
        1 => return Some(Type::class(classes.into_iter().next().unwrap(), span)),
        _ => {}
    }

    let mut classname = String::from("*union");
    for c in &classes {
        classname.push('_');
        classname.push_str(&c.name.display_name());
    }

    let mut merged: Vec<(String, TypeSet, bool)> = Vec::new();
    for c in &classes {
        for m in &c.members {
            if m.access.access != Access::Public {
                continue;
            }
            let key = m.name.display_name();
            match merged.iter_mut().find(|(tag, _, _)| *tag == key) {
                Some((_, set, pure)) => {
                    set.add(m.ty.clone());
                    *pure &= m.access.is_pure;
                }
                None => {
                    merged.push((key, TypeSet::singleton(m.ty.clone()), m.access.is_pure));
                }
            }
        }
    }

    let pseudo = Name::new("CLASS", classname.clone(), span);
    let class_members = merged
        .into_iter()
        .map(|(tag, set, pure)| ClassMember {
            name: Name::new(classname.clone(), tag, span),
            ty: set.get_type(span),
            access: AccessSpecifier {
                access: Access::Public,
                is_static: false,
                is_pure: pure,
                is_async: false,
            },
        })
        .collect();

    Some(Type::class(
        ClassType {
            name: pseudo,
            members: class_members,
        },
        span,
    ))
}

pub(crate) fn numeric_view(
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<NumericKind> {
    let mut best: Option<NumericKind> = None;
    for member in members {
        if let Some(kind) = member.numeric_view_with(reg, visited) {
            best = Some(best.map_or(kind, |b| b.widen(kind)));
        }
    }
    best
}

/// Per-position merge of the qualifying product views. With `n == 0` the
/// merged arity is the widest qualifying arity; shorter products simply
/// contribute nothing to the positions beyond their own.
pub(crate) fn product_view(
    span: Span,
    n: usize,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut positions: Vec<TypeSet> = Vec::new();
    let mut any = false;
    for member in members {
        if let Some(view) = member.product_view_with(n, reg, visited) {
            let parts = view.as_product().cloned()?;
            any = true;
            for (i, t) in parts.into_iter().enumerate() {
                if positions.len() <= i {
                    positions.push(TypeSet::new());
                }
                positions[i].add(t);
            }
        }
    }
    if !any {
        return None;
    }
    let merged: TypeList = positions.into_iter().map(|set| set.get_type(span)).collect();
    Some(Type::product(merged, span))
}

pub(crate) fn function_view(
    span: Span,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut params: Vec<TypeSet> = Vec::new();
    let mut results = TypeSet::new();
    let mut definitions: Vec<Name> = Vec::new();
    let mut any = false;

    for member in members {
        if let Some(view) = member.function_view_with(reg, visited) {
            for d in &view.definitions {
                if !definitions.contains(d) {
                    definitions.push(d.clone());
                }
            }
            let ft = view.as_function().cloned()?;
            any = true;
            results.add((*ft.result).clone());
            for (i, t) in ft.params.into_iter().enumerate() {
                if params.len() <= i {
                    params.push(TypeSet::new());
                }
                params[i].add(t);
            }
        }
    }
    if !any {
        return None;
    }

    let merged: TypeList = params.into_iter().map(|set| set.get_type(span)).collect();
    // The merged function is partial: totality of the members does not
    // survive the union, since any application could hit any member.
    let mut ty = Type::function(merged, results.get_type(span), false, span);
    ty.definitions = definitions;
    Some(ty)
}

pub(crate) fn operation_view(
    span: Span,
    members: &TypeSet,
    reg: &TypeRegistry,
    visited: &mut Visited,
) -> Option<Type> {
    let mut params: Vec<TypeSet> = Vec::new();
    let mut results = TypeSet::new();
    let mut definitions: Vec<Name> = Vec::new();
    let mut pure = true;
    let mut any = false;

    for member in members {
        if let Some(view) = member.operation_view_with(reg, visited) {
            for d in &view.definitions {
                if !definitions.contains(d) {
                    definitions.push(d.clone());
                }
            }
            let ot = view.as_operation().cloned()?;
            any = true;
            pure &= ot.pure;
            results.add((*ot.result).clone());
            for (i, t) in ot.params.into_iter().enumerate() {
                if params.len() <= i {
                    params.push(TypeSet::new());
                }
                params[i].add(t);
            }
        }
    }
    if !any {
        return None;
    }

    let merged: TypeList = params.into_iter().map(|set| set.get_type(span)).collect();
    let mut ty = Type::operation(merged, results.get_type(span), span);
    if let TypeKind::Operation(ot) = &mut ty.kind {
        ot.pure = pure;
    }
    ty.definitions = definitions;
    Some(ty)
}
