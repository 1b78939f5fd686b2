//! Parser-level tests: classification, precedence shapes, ternary
//! scoping, error taxonomy, and flatten/rebuild round trips.

use crate::expr::{ExprEnder, ExprParser, ParseError, ParsedExpr};
use crate::flatten::{flatten, tree_from_flat};
use proptest::prelude::*;
use quillc_lex::{tokenize, DataType, LangTerms, TokenKind};
use quillc_sem::{ScopeStack, Variable};

fn parse_with(
    src: &str,
    vars: &[(&str, DataType)],
    ender: ExprEnder,
) -> Result<ParsedExpr, ParseError> {
    let terms = LangTerms::new();
    let tokens = tokenize(src, "t.ql", &terms).unwrap();
    let mut scopes = ScopeStack::new();
    for (name, dtype) in vars {
        scopes
            .insert_at_top(name, Variable::declared(*dtype))
            .unwrap();
    }
    let mut pos = 0;
    ExprParser::new(&terms).parse(&tokens, &mut pos, ender, &scopes)
}

fn sexpr_of(src: &str, vars: &[(&str, DataType)]) -> String {
    parse_with(src, vars, ExprEnder::Semicolon)
        .unwrap()
        .tree
        .sexpr()
}

const ABC: &[(&str, DataType)] = &[
    ("a", DataType::Int32),
    ("b", DataType::Int32),
    ("c", DataType::Int32),
    ("x", DataType::Int32),
    ("i", DataType::Int32),
];

#[test]
fn precedence_mul_over_add() {
    assert_eq!(sexpr_of("1 + 2 * 3;", &[]), "(B+ 1 (* 2 3))");
}

#[test]
fn parens_override_precedence() {
    assert_eq!(sexpr_of("(1 + 2) * 3;", &[]), "(* (B+ 1 2) 3)");
}

#[test]
fn shift_binds_looser_than_add() {
    assert_eq!(sexpr_of("2 << 3 + 1;", &[]), "(<< 2 (B+ 3 1))");
}

#[test]
fn left_associativity_within_group() {
    assert_eq!(sexpr_of("1 - 2 + 3;", &[]), "(B+ (B- 1 2) 3)");
    assert_eq!(sexpr_of("8 / 4 / 2;", &[]), "(/ (/ 8 4) 2)");
    // mixed operators sharing one precedence level stay left-associative
    assert_eq!(
        sexpr_of("1 * 4 / 2 * 3;", &[]),
        "(* (/ (* 1 4) 2) 3)"
    );
}

#[test]
fn logical_and_over_or() {
    assert_eq!(sexpr_of("a && b || c;", ABC), "(|| (&& a b) c)");
}

#[test]
fn relational_chain_against_bitwise() {
    assert_eq!(
        sexpr_of("a & 3 == 1;", ABC),
        // == binds tighter than &
        "(& a (== 3 1))"
    );
}

#[test]
fn unary_minus_classification() {
    assert_eq!(sexpr_of("-4 + 2;", &[]), "(B+ (-u 4) 2)");
    assert_eq!(sexpr_of("2 + -4;", &[]), "(B+ 2 (-u 4))");
    assert_eq!(sexpr_of("- - 4;", &[]), "(-u (-u 4))");
}

#[test]
fn unary_plus_classification() {
    assert_eq!(sexpr_of("+4 * 2;", &[]), "(* (+u 4) 2)");
}

#[test]
fn prefix_and_postfix_classification() {
    assert_eq!(sexpr_of("++i;", ABC), "(+1 i)");
    assert_eq!(sexpr_of("--i;", ABC), "(-1 i)");
    assert_eq!(sexpr_of("i++;", ABC), "(1+ i)");
    assert_eq!(sexpr_of("i--;", ABC), "(1- i)");
    assert_eq!(sexpr_of("i++ + 2;", ABC), "(B+ (1+ i) 2)");
    assert_eq!(sexpr_of("-i++;", ABC), "(-u (1+ i))");
}

#[test]
fn logical_not_and_bitwise_not() {
    assert_eq!(sexpr_of("!a;", ABC), "(! a)");
    assert_eq!(sexpr_of("~a & b;", ABC), "(& (~ a) b)");
}

#[test]
fn simple_ternary_shape() {
    assert_eq!(sexpr_of("a ? 1 : 2;", ABC), "(? a (: 1 2))");
}

#[test]
fn chained_ternary_nests_in_false_branch() {
    assert_eq!(
        sexpr_of("c == 1 ? 10 : c == 2 ? 20 : 30;", ABC),
        "(? (== c 1) (: 10 (? (== c 2) (: 20 30))))"
    );
}

#[test]
fn ternary_swallows_assignments_in_branches() {
    // `:` deliberately folds below the assignment family inside its scope
    assert_eq!(
        sexpr_of("x ? a = 1 : a = 2;", ABC),
        "(? x (: (= a 1) (= a 2)))"
    );
}

#[test]
fn ternary_condition_binds_tighter_than_assignment() {
    assert_eq!(sexpr_of("a = x ? 1 : 2;", ABC), "(= a (? x (: 1 2)))");
}

#[test]
fn parenthesized_ternary() {
    assert_eq!(sexpr_of("(a ? 1 : 2) * 3;", ABC), "(* (? a (: 1 2)) 3)");
}

#[test]
fn assignment_and_compound_assignment() {
    assert_eq!(sexpr_of("a = 1 + 2;", ABC), "(= a (B+ 1 2))");
    assert_eq!(sexpr_of("a += 2;", ABC), "(+= a 2)");
    assert_eq!(sexpr_of("a <<= 1;", ABC), "(<<= a 1)");
}

#[test]
fn system_call_as_operand() {
    assert_eq!(sexpr_of("str(1 + 2);", &[]), "(str (B+ 1 2))");
    assert_eq!(
        sexpr_of("\"hi \" + str(1 + 2);", &[]),
        "(B+ hi  (str (B+ 1 2)))"
    );
    assert_eq!(sexpr_of("str(str(a));", ABC), "(str (str a))");
}

#[test]
fn close_paren_ender_for_conditions() {
    // the caller consumed `(`; the matching `)` ends the expression
    let parsed = parse_with("a > 5)", ABC, ExprEnder::CloseParen).unwrap();
    assert_eq!(parsed.tree.sexpr(), "(> a 5)");
    assert_eq!(parsed.closer.text, ")");
    assert!(parsed.is_closed);
}

#[test]
fn comma_ender_for_initializers() {
    let parsed = parse_with("3 + 4,", &[], ExprEnder::SemicolonOrComma).unwrap();
    assert_eq!(parsed.tree.sexpr(), "(B+ 3 4)");
    assert_eq!(parsed.closer.text, ",");
}

#[test]
fn error_orphan_colon() {
    let err = parse_with("1 : 2;", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::OrphanTernary2nd { .. }));
}

#[test]
fn error_duplicate_colon() {
    let err = parse_with("a ? 1 : 2 : 3;", ABC, ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateTernary2nd { .. }));
}

#[test]
fn error_ternary_missing_colon() {
    let err = parse_with("a ? 1;", ABC, ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::TernaryMissing2nd { .. }));
}

#[test]
fn error_unmatched_open_paren() {
    let err = parse_with("(1 + 2;", &[], ExprEnder::Semicolon).unwrap_err();
    match err {
        ParseError::UnclosedScope { opener, .. } => assert_eq!(opener, "("),
        other => panic!("wrong error: {other:?}"),
    }
}

#[test]
fn error_stray_close_paren() {
    let err = parse_with("1 + 2);", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn error_undeclared_variable() {
    let err = parse_with("zz + 1;", &[], ExprEnder::Semicolon).unwrap_err();
    match err {
        ParseError::UndeclaredVariable { name, .. } => assert_eq!(name, "zz"),
        other => panic!("wrong error: {other:?}"),
    }
}

#[test]
fn error_two_values_in_a_row() {
    let err = parse_with("a b;", ABC, ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn error_two_binary_ops_in_a_row() {
    let err = parse_with("1 + * 2;", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn error_assignment_to_literal() {
    let err = parse_with("1 = 2;", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::BadAssignmentTarget { .. }));
}

#[test]
fn error_increment_of_literal() {
    let err = parse_with("++3;", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::IncrDecrNeedsVariable { .. }));
}

#[test]
fn error_empty_expression() {
    let err = parse_with(";", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::EmptyExpression { .. }));
}

#[test]
fn error_trailing_operator() {
    let err = parse_with("1 + ;", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn error_runs_off_the_stream() {
    let err = parse_with("1 + 2", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnexpectedEndOfStream { .. } | ParseError::UnclosedScope { .. }
    ));
}

#[test]
fn expected_set_mentions_alternatives() {
    let err = parse_with("1 + * 2;", &[], ExprEnder::Semicolon).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("expected"));
    assert!(text.contains("literal") || text.contains("variable"));
}

#[test]
fn deeply_nested_parens_melt_away() {
    assert_eq!(sexpr_of("((((1))));", &[]), "1");
    assert_eq!(sexpr_of("((1 + (2)) * (((3))));", &[]), "(* (B+ 1 2) 3)");
}

#[test]
fn parenthesized_assignment_as_operand() {
    assert_eq!(sexpr_of("(a = 1) > 0;", ABC), "(> (= a 1) 0)");
}

#[test]
fn ternary_condition_may_be_parenthesized_logic() {
    assert_eq!(
        sexpr_of("(a && b) ? 1 : 2;", ABC),
        "(? (&& a b) (: 1 2))"
    );
}

#[test]
fn ternary_nested_in_true_branch_via_parens() {
    // without parens a chain nests in the false branch; parens force it
    // into the true branch
    assert_eq!(
        sexpr_of("a ? (b ? 1 : 2) : 3;", ABC),
        "(? a (: (? b (: 1 2)) 3))"
    );
}

#[test]
fn not_over_parenthesized_logic() {
    assert_eq!(sexpr_of("!(a && b);", ABC), "(! (&& a b))");
    assert_eq!(sexpr_of("!a && b;", ABC), "(&& (! a) b)");
}

#[test]
fn unary_minus_of_parenthesized_sum() {
    assert_eq!(sexpr_of("-(1 + 2) * 3;", &[]), "(* (-u (B+ 1 2)) 3)");
}

#[test]
fn system_call_inside_condition_context() {
    let parsed = parse_with("str(a) == \"1\")", ABC, ExprEnder::CloseParen).unwrap();
    assert_eq!(parsed.tree.sexpr(), "(== (str a) 1)");
}

#[test]
fn error_postfix_after_close_paren() {
    // (a)++ is not accepted; postfix binds to names only
    let err = parse_with("(a)++;", ABC, ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn error_ternary_first_at_expression_start() {
    let err = parse_with("? 1 : 2;", &[], ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn error_open_paren_after_value() {
    let err = parse_with("a (1);", ABC, ExprEnder::Semicolon).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn parse_then_flatten_then_rebuild() {
    let terms = LangTerms::new();
    for src in [
        "1 + 2 * 3;",
        "(1 + 2) * 3;",
        "a ? 1 : 2;",
        "c == 1 ? 10 : c == 2 ? 20 : 30;",
        "!a && b || ~c > 2;",
        "a = b + c * 2 - -4;",
        "str(1 + 2);",
    ] {
        let parsed = parse_with(src, ABC, ExprEnder::Semicolon).unwrap();
        let flat = flatten(&parsed.tree, &terms).unwrap();
        let rebuilt = tree_from_flat(&flat, &terms).unwrap();
        assert!(
            parsed.tree.same_shape(&rebuilt),
            "round trip changed shape for {src}: {} vs {}",
            parsed.tree.sexpr(),
            rebuilt.sexpr()
        );
    }
}

#[test]
fn every_opr8r_in_flat_output_is_exec() {
    let terms = LangTerms::new();
    let parsed = parse_with("a = -b + c++ * 2;", ABC, ExprEnder::Semicolon).unwrap();
    let flat = flatten(&parsed.tree, &terms).unwrap();
    for tkn in &flat {
        assert_ne!(tkn.kind, TokenKind::SrcOpr8r, "src operator leaked: {}", tkn.text);
    }
}

/// Generate random well-formed arithmetic source, parse it, and round-trip
/// the tree through the flat form.
fn arb_expr_src() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0u8..100).prop_map(|n| n.to_string()),
        Just("a".to_string()),
        Just("b".to_string()),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        (
            inner.clone(),
            prop_oneof![
                Just("+"),
                Just("-"),
                Just("*"),
                Just("/"),
                Just("&&"),
                Just("||"),
                Just("=="),
                Just("<"),
            ],
            inner,
        )
            .prop_map(|(l, op, r)| format!("({l} {op} {r})"))
    })
}

proptest! {
    #[test]
    fn random_expressions_round_trip(body in arb_expr_src()) {
        let terms = LangTerms::new();
        let src = format!("{body};");
        let parsed = parse_with(&src, ABC, ExprEnder::Semicolon).unwrap();
        let flat = flatten(&parsed.tree, &terms).unwrap();
        let rebuilt = tree_from_flat(&flat, &terms).unwrap();
        prop_assert!(parsed.tree.same_shape(&rebuilt));
    }
}
