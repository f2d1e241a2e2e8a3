//! Whole-module checking: definitions, measures, obligations.

mod common;

use common::*;

use msl_check::{Dialect, PoKind, Release, Settings};
use msl_types::ast::CompareOp;

fn pp() -> Settings {
    Settings::new(Dialect::Pp, Release::Vdm10)
}

// ── Explicit functions ──

#[test]
fn test_identity_function_is_quiet() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], nat_ann()),
        vec![ident("x")],
        var("x"),
    )
    .build()]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert!(outcome.diagnostics.warnings.is_empty());
}

#[test]
fn test_result_type_mismatch_reports_3018() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], bool_ann()),
        vec![ident("x")],
        int(3),
    )
    .build()]);
    assert_error(&check(&m), 3018);
}

#[test]
fn test_too_few_parameter_patterns() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann(), nat_ann()], bool_ann()),
        vec![ident("x")],
        tru(),
    )
    .build()]);
    assert_error(&check(&m), 3021);
}

#[test]
fn test_too_many_parameter_patterns() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], bool_ann()),
        vec![ident("x"), ident("y")],
        tru(),
    )
    .build()]);
    assert_error(&check(&m), 3020);
}

#[test]
fn test_curried_groups_consume_layers() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], fn_ann(vec![nat_ann()], bool_ann())),
        vec![ident("x")],
        tru(),
    )
    .curried(vec![ident("y")])
    .build()]);
    assert_ok(&check(&m));
}

#[test]
fn test_extra_curried_group_reports_3022() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], bool_ann()),
        vec![ident("x")],
        tru(),
    )
    .curried(vec![ident("y")])
    .build()]);
    assert_error(&check(&m), 3022);
}

#[test]
fn test_unused_parameter_warns_5000() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], bool_ann()),
        vec![ident("x")],
        tru(),
    )
    .build()]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert_warning(&outcome, 5000);
}

#[test]
fn test_tuple_parameter_binds_components() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![product_ann(vec![nat_ann(), bool_ann()])], bool_ann()),
        vec![tuple_pat(vec![ident("x"), ident("y")])],
        and(cmp(CompareOp::Ge, var("x"), int(0)), var("y")),
    )
    .build()]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert!(outcome.diagnostics.warnings.is_empty());
}

#[test]
fn test_literal_parameter_pattern_mismatch() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], bool_ann()),
        vec![bool_pat(true)],
        tru(),
    )
    .build()]);
    assert_error(&check(&m), 3200);
}

#[test]
fn test_duplicate_parameter_names_need_obligation() {
    let m = module(vec![FnDef::new(
        "f",
        fn_ann(vec![nat_ann(), nat_ann()], bool_ann()),
        vec![ident("x"), ident("x")],
        tru(),
    )
    .build()]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert_po(&outcome, PoKind::ParameterPatternMatch);
}

// ── Pre/postconditions ──

#[test]
fn test_conditions_synthesize_callable_siblings() {
    let m = module(vec![
        FnDef::new(
            "f",
            fn_ann(vec![nat_ann()], nat_ann()),
            vec![ident("x")],
            var("x"),
        )
        .pre(cmp(CompareOp::Gt, var("x"), int(0)))
        .post(eq(var("RESULT"), var("x")))
        .build(),
        value("ok", Some(bool_ann()), apply(var("pre_f"), vec![int(2)])),
    ]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert_po(&outcome, PoKind::PostConditionHolds);
}

// ── Implicit functions ──

#[test]
fn test_implicit_function_needs_satisfiability() {
    let m = module(vec![implicit_fn(
        "g",
        vec![("x", nat_ann())],
        "r",
        nat_ann(),
        eq(var("r"), var("x")),
    )]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert_po(&outcome, PoKind::SatisfiabilityOfImplicitSpec);
}

#[test]
fn test_implicit_function_cannot_be_applied() {
    let m = module(vec![
        implicit_fn(
            "g",
            vec![("x", nat_ann())],
            "r",
            nat_ann(),
            eq(var("r"), var("x")),
        ),
        value("v", Some(nat_ann()), apply(var("g"), vec![int(1)])),
    ]);
    assert_error(&check(&m), 3100);
}

// ── Measures ──

fn recursive_f(measure: Option<&str>) -> FnDef {
    let f = FnDef::new(
        "f",
        fn_ann(vec![nat_ann()], nat_ann()),
        vec![ident("n")],
        if_expr(
            eq(var("n"), int(0)),
            int(0),
            apply(var("f"), vec![sub(var("n"), int(1))]),
        ),
    );
    match measure {
        Some(name) => f.measure(name),
        None => f,
    }
}

#[test]
fn test_recursive_function_without_measure_warns_5012() {
    let m = module(vec![recursive_f(None).build()]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert_warning(&outcome, 5012);
}

#[test]
fn test_recursive_function_with_measure_is_quiet() {
    let m = module(vec![
        recursive_f(Some("m")).build(),
        FnDef::new(
            "m",
            fn_ann(vec![nat_ann()], nat_ann()),
            vec![ident("n")],
            var("n"),
        )
        .build(),
    ]);
    let outcome = check(&m);
    assert_ok(&outcome);
    assert!(outcome.diagnostics.warnings.is_empty());
}

#[test]
fn test_measure_not_in_scope_reports_3270() {
    let m = module(vec![recursive_f(Some("nosuch")).build()]);
    assert_error(&check(&m), 3270);
}

#[test]
fn test_function_cannot_measure_itself() {
    let m = module(vec![recursive_f(Some("f")).build()]);
    assert_error(&check(&m), 3304);
}

#[test]
fn test_measure_must_be_explicit_function() {
    let m = module(vec![
        recursive_f(Some("m")).build(),
        value("m", Some(nat_ann()), int(1)),
    ]);
    assert_error(&check(&m), 3271);
}

#[test]
fn test_measure_parameters_must_match() {
    let m = module(vec![
        recursive_f(Some("m")).build(),
        FnDef::new(
            "m",
            fn_ann(vec![bool_ann()], nat_ann()),
            vec![ident("b")],
            int(1),
        )
        .build(),
    ]);
    assert_error(&check(&m), 3303);
}

#[test]
fn test_measure_range_must_be_nat() {
    let m = module(vec![
        recursive_f(Some("m")).build(),
        FnDef::new(
            "m",
            fn_ann(vec![nat_ann()], bool_ann()),
            vec![ident("n")],
            tru(),
        )
        .build(),
    ]);
    assert_error(&check(&m), 3272);
}

#[test]
fn test_lexicographic_measure_range_is_accepted() {
    let m = module(vec![
        recursive_f(Some("m")).build(),
        FnDef::new(
            "m",
            fn_ann(vec![nat_ann()], product_ann(vec![nat_ann(), nat_ann()])),
            vec![ident("n")],
            tuple_ctor(vec![var("n"), int(0)]),
        )
        .build(),
    ]);
    assert_ok(&check(&m));
}

#[test]
fn test_measure_of_plain_function_must_not_be_polymorphic() {
    let m = module(vec![
        recursive_f(Some("m")).build(),
        FnDef::new(
            "m",
            fn_ann(vec![param_ann("T")], nat_ann()),
            vec![ident("x")],
            int(0),
        )
        .type_params(vec!["T"])
        .build(),
    ]);
    assert_error(&check(&m), 3309);
}

#[test]
fn test_measure_of_polymorphic_function_must_be_polymorphic() {
    let m = module(vec![
        FnDef::new(
            "f",
            fn_ann(vec![param_ann("T")], nat_ann()),
            vec![ident("x")],
            int(0),
        )
        .type_params(vec!["T"])
        .measure("m")
        .build(),
        FnDef::new(
            "m",
            fn_ann(vec![nat_ann()], nat_ann()),
            vec![ident("n")],
            var("n"),
        )
        .build(),
    ]);
    assert_error(&check(&m), 3310);
}

#[test]
fn test_measure_type_parameters_must_agree() {
    let m = module(vec![
        FnDef::new(
            "f",
            fn_ann(vec![param_ann("T")], nat_ann()),
            vec![ident("x")],
            int(0),
        )
        .type_params(vec!["T"])
        .measure("m")
        .build(),
        FnDef::new(
            "m",
            fn_ann(vec![param_ann("U")], nat_ann()),
            vec![ident("y")],
            int(0),
        )
        .type_params(vec!["U"])
        .build(),
    ]);
    assert_error(&check(&m), 3318);
}

// ── Polymorphic application ──

#[test]
fn test_polymorphic_function_instantiates() {
    let m = module(vec![
        FnDef::new(
            "id",
            fn_ann(vec![param_ann("T")], param_ann("T")),
            vec![ident("x")],
            var("x"),
        )
        .type_params(vec!["T"])
        .build(),
        value(
            "c",
            Some(nat_ann()),
            apply_poly(var("id"), vec![nat_ann()], vec![int(3)]),
        ),
    ]);
    assert_ok(&check(&m));
}

#[test]
fn test_wrong_type_argument_count() {
    let m = module(vec![
        FnDef::new(
            "id",
            fn_ann(vec![param_ann("T")], param_ann("T")),
            vec![ident("x")],
            var("x"),
        )
        .type_params(vec!["T"])
        .build(),
        value(
            "c",
            Some(nat_ann()),
            apply_poly(var("id"), vec![nat_ann(), bool_ann()], vec![int(3)]),
        ),
    ]);
    assert_error(&check(&m), 3105);
}

// ── Operations ──

#[test]
fn test_operation_result_mismatch_reports_3018() {
    let m = module(vec![operation(
        "o",
        op_ann(vec![nat_ann()], bool_ann()),
        vec![ident("x")],
        Some(int(3)),
    )]);
    assert_error(&check(&m), 3018);
}

#[test]
fn test_operation_pattern_count_checked() {
    let m = module(vec![operation(
        "o",
        op_ann(vec![nat_ann(), nat_ann()], bool_ann()),
        vec![ident("x")],
        Some(tru()),
    )]);
    assert_error(&check(&m), 3021);
}

#[test]
fn test_operation_not_callable_from_function() {
    let m = module(vec![
        operation("o", op_ann(vec![], nat_ann()), vec![], Some(int(1))),
        FnDef::new(
            "f",
            fn_ann(vec![nat_ann()], nat_ann()),
            vec![ident("x")],
            apply(var("o"), vec![]),
        )
        .build(),
    ]);
    assert_error(&check(&m), 3100);
}

#[test]
fn test_operation_may_call_operation() {
    let m = module(vec![
        operation("o", op_ann(vec![], nat_ann()), vec![], Some(int(1))),
        operation(
            "o2",
            op_ann(vec![], nat_ann()),
            vec![],
            Some(apply(var("o"), vec![])),
        ),
    ]);
    assert_ok(&check(&m));
}

// ── Values, invariants, quantifiers ──

#[test]
fn test_value_type_mismatch_reports_3018() {
    let m = module(vec![value("v", Some(bool_ann()), int(1))]);
    assert_error(&check(&m), 3018);
}

#[test]
fn test_type_invariant_must_be_boolean() {
    let m = module(vec![typedef_inv("T", nat_ann(), ident("x"), var("x"))]);
    assert_error(&check(&m), 3103);
}

#[test]
fn test_boolean_type_invariant_is_quiet() {
    let m = module(vec![typedef_inv(
        "T",
        nat_ann(),
        ident("x"),
        cmp(CompareOp::Le, var("x"), int(10)),
    )]);
    assert_ok(&check(&m));
}

#[test]
fn test_quantifier_over_type_bind() {
    let m = module(vec![value(
        "q",
        Some(bool_ann()),
        forall(ident("x"), nat_ann(), cmp(CompareOp::Ge, var("x"), int(0))),
    )]);
    assert_ok(&check(&m));
}

#[test]
fn test_record_constructor_end_to_end() {
    let m = module(vec![
        typedef(
            "Node",
            record_ann(
                "Node",
                vec![
                    ("value", nat_ann()),
                    ("next", optional_ann(named_ann("Node"))),
                ],
            ),
        ),
        value(
            "n",
            Some(named_ann("Node")),
            record_ctor("Node", vec![int(1), nil()]),
        ),
    ]);
    assert_ok(&check(&m));
}

// ── Dialect-dependent checks ──

#[test]
fn test_private_parameter_type_in_public_function() {
    let m = module(vec![
        private_typedef("T", nat_ann()),
        FnDef::new(
            "f",
            fn_ann(vec![named_ann("T")], bool_ann()),
            vec![ident("x")],
            tru(),
        )
        .build(),
    ]);
    assert_error(&check_with(&m, pp()), 3019);
    // The module dialect has no visibility rules.
    assert_ok(&check(&m));
}

#[test]
fn test_overload_qualified_function_found_by_plain_name() {
    // In the object-oriented dialects 'f' resolves to a name carrying an
    // overload qualifier; an unqualified call must still find it.
    let m = module(vec![
        FnDef::new(
            "f",
            fn_ann(vec![nat_ann()], nat_ann()),
            vec![ident("x")],
            var("x"),
        )
        .build(),
        value("v", Some(nat_ann()), apply(var("f"), vec![int(2)])),
    ]);
    assert_ok(&check_with(&m, pp()));
}

// ── Let binds ──

#[test]
fn test_let_type_bind_incompatible_reports_3198() {
    // let x : bool = 1 in x
    let m = module(vec![value(
        "v",
        Some(bool_ann()),
        let_expr(vec![(type_bind(ident("x"), bool_ann()), int(1))], var("x")),
    )]);
    assert_error(&check(&m), 3198);
}

#[test]
fn test_let_type_bind_compatible_is_quiet() {
    let m = module(vec![value(
        "v",
        Some(nat_ann()),
        let_expr(vec![(type_bind(ident("x"), nat_ann()), int(1))], var("x")),
    )]);
    assert_ok(&check(&m));
}

#[test]
fn test_let_set_bind_membership_is_quiet() {
    // let x in set {1, 2} = 1 in x
    let m = module(vec![value(
        "v",
        Some(nat_ann()),
        let_expr(
            vec![(set_bind(ident("x"), set_enum(vec![int(1), int(2)])), int(1))],
            var("x"),
        ),
    )]);
    assert_ok(&check(&m));
}

#[test]
fn test_let_set_bind_value_incompatible_reports_3199() {
    // let x in set {1, 2} = true in x
    let m = module(vec![value(
        "v",
        Some(nat_ann()),
        let_expr(
            vec![(set_bind(ident("x"), set_enum(vec![int(1), int(2)])), tru())],
            var("x"),
        ),
    )]);
    assert_error(&check(&m), 3199);
}

#[test]
fn test_let_seq_bind_over_non_seq_reports_3199() {
    let m = module(vec![value(
        "v",
        Some(nat_ann()),
        let_expr(vec![(seq_bind(ident("x"), int(3)), int(1))], var("x")),
    )]);
    assert_error(&check(&m), 3199);
}

#[test]
fn test_seq_bind_requires_vdm10() {
    // let x in seq [1, 2] = 1 in x
    let m = module(vec![value(
        "v",
        Some(nat_ann()),
        let_expr(
            vec![(seq_bind(ident("x"), seq_enum(vec![int(1), int(2)])), int(1))],
            var("x"),
        ),
    )]);
    assert_ok(&check(&m));
    assert_error(&check_with(&m, Settings::new(Dialect::Sl, Release::Classic)), 3263);
}

#[test]
fn test_plain_let_still_binds() {
    let m = module(vec![value(
        "v",
        Some(nat_ann()),
        let_expr(vec![(plain(ident("x")), int(1))], var("x")),
    )]);
    assert_ok(&check(&m));
}

// ── Class member access ──

#[test]
fn test_public_class_member_is_accessible() {
    let m = module(vec![
        class_def(
            "C",
            vec![member_value("C", "api", Some(nat_ann()), int(1))],
        ),
        value("u", Some(nat_ann()), qvar("C", "api")),
    ]);
    assert_ok(&check_with(&m, pp()));
}

#[test]
fn test_private_class_member_reports_3106() {
    let m = module(vec![
        class_def(
            "C",
            vec![private_member_value("C", "secret", Some(nat_ann()), int(1))],
        ),
        value("u", Some(nat_ann()), qvar("C", "secret")),
    ]);
    assert_error(&check_with(&m, pp()), 3106);
}

#[test]
fn test_class_sees_its_own_private_members() {
    let m = module(vec![class_def(
        "C",
        vec![
            private_member_value("C", "secret", Some(nat_ann()), int(1)),
            member_value("C", "api", Some(nat_ann()), qvar("C", "secret")),
        ],
    )]);
    assert_ok(&check_with(&m, pp()));
}
