//! Evaluator tests over hand-built flat expressions, plus reader
//! boundary checks. End-to-end compile+interpret coverage lives with the
//! statement compiler, which can produce real object streams.

use crate::eval::{EvalError, EvalMode, Evaluator};
use crate::reader::{ObjError, ObjReader};
use quillc_lex::opcodes::*;
use quillc_lex::{DataType, LangTerms, MathError, Token, TokenKind, Value};
use quillc_sem::{Access, ScopeStack, Variable};
use quillc_util::{MessageCollector, MessageKind, SrcPos};
use std::io::Cursor;

fn op(terms: &LangTerms, symbol: &str) -> Token {
    let op_code = terms.op_code_for(symbol).expect("symbol has opcode");
    Token::exec_opr8r(op_code, symbol, SrcPos::none())
}

fn lit(value: Value) -> Token {
    Token::from_value(value, SrcPos::none())
}

fn var(name: &str) -> Token {
    Token::new(TokenKind::UserWord, name, SrcPos::none())
}

fn sys_call(name: &str) -> Token {
    let mut tkn = Token::new(TokenKind::SystemCall, name, SrcPos::none());
    tkn.initialized = true;
    tkn
}

/// Evaluate a flat list against the given scope stack; panics on error.
fn eval_ok(
    terms: &LangTerms,
    mut tkns: Vec<Token>,
    scopes: &mut ScopeStack,
) -> (Vec<Token>, usize) {
    let mut msgs = MessageCollector::new();
    let evaluator = Evaluator::new(terms, EvalMode::RunTime);
    let cnt = evaluator
        .resolve_flat_expr(&mut tkns, scopes, &mut msgs)
        .expect("evaluation should succeed");
    (tkns, cnt)
}

fn eval_value(terms: &LangTerms, tkns: Vec<Token>) -> Value {
    let mut scopes = ScopeStack::new();
    let (out, cnt) = eval_ok(terms, tkns, &mut scopes);
    assert_eq!(cnt, 1);
    out[0].value.clone()
}

fn scopes_with(vars: &[(&str, DataType, Option<Value>)]) -> ScopeStack {
    let mut scopes = ScopeStack::new();
    for (name, dtype, init) in vars {
        scopes
            .insert_at_top(name, Variable::declared(*dtype))
            .unwrap();
        if let Some(v) = init {
            scopes
                .lookup(name, 0, Access::CommitWrite(v.clone()))
                .unwrap();
        }
    }
    scopes
}

#[test]
fn precedence_results_from_flat_form() {
    let terms = LangTerms::new();
    // 1 + 2 * 3 == 7
    let flat = vec![
        op(&terms, "B+"),
        lit(Value::Int8(1)),
        op(&terms, "*"),
        lit(Value::Int8(2)),
        lit(Value::Int8(3)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Int8(7));

    // (1 + 2) * 3 == 9 : [* B+ 1 2 3]
    let flat = vec![
        op(&terms, "*"),
        op(&terms, "B+"),
        lit(Value::Int8(1)),
        lit(Value::Int8(2)),
        lit(Value::Int8(3)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Int8(9));

    // 2 << 3 + 1 == 32 : [<< 2 B+ 3 1]
    let flat = vec![
        op(&terms, "<<"),
        lit(Value::Int8(2)),
        op(&terms, "B+"),
        lit(Value::Int8(3)),
        lit(Value::Int8(1)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Int8(32));
}

#[test]
fn widening_during_evaluation() {
    let terms = LangTerms::new();
    // int16(200) + int16(200) -> 400 stays int16
    let flat = vec![
        op(&terms, "B+"),
        lit(Value::Int16(200)),
        lit(Value::Int16(200)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Int16(400));
    // int8(100) + int8(100) widens past int8
    let flat = vec![
        op(&terms, "B+"),
        lit(Value::Int8(100)),
        lit(Value::Int8(100)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Int16(200));
}

#[test]
fn string_concatenation() {
    let terms = LangTerms::new();
    let flat = vec![
        op(&terms, "B+"),
        lit(Value::Str("hi ".into())),
        lit(Value::Str("there".into())),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Str("hi there".into()));
}

#[test]
fn divide_by_zero_is_user_error() {
    let terms = LangTerms::new();
    let mut scopes = ScopeStack::new();
    let mut msgs = MessageCollector::new();
    let mut flat = vec![
        op(&terms, "/"),
        lit(Value::Int8(7)),
        lit(Value::Int8(0)),
    ];
    let err = Evaluator::new(&terms, EvalMode::RunTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap_err();
    assert!(err.is_user_error());
    assert!(matches!(
        err,
        EvalError::Math {
            source: MathError::DivideByZero,
            ..
        }
    ));
}

#[test]
fn short_circuit_or_skips_assignment() {
    let terms = LangTerms::new();
    // a || (b = 5) with a = true : [|| a = b 5]
    let mut scopes = scopes_with(&[
        ("a", DataType::Bool, Some(Value::Bool(true))),
        ("b", DataType::Int8, Some(Value::Int8(0))),
    ]);
    let flat = vec![
        op(&terms, "||"),
        var("a"),
        op(&terms, "="),
        var("b"),
        lit(Value::Int8(5)),
    ];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Bool(true));
    // b untouched
    let b = scopes.lookup("b", 0, Access::Read).unwrap();
    assert_eq!(b.value, Value::Int8(0));
}

#[test]
fn short_circuit_and_skips_assignment() {
    let terms = LangTerms::new();
    let mut scopes = scopes_with(&[
        ("a", DataType::Bool, Some(Value::Bool(false))),
        ("b", DataType::Int8, Some(Value::Int8(0))),
    ]);
    let flat = vec![
        op(&terms, "&&"),
        var("a"),
        op(&terms, "="),
        var("b"),
        lit(Value::Int8(5)),
    ];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Bool(false));
    let b = scopes.lookup("b", 0, Access::Read).unwrap();
    assert_eq!(b.value, Value::Int8(0));
}

#[test]
fn non_deciding_side_evaluates_right() {
    let terms = LangTerms::new();
    // a && (b = 5) with a = true: right side runs, b becomes 5
    let mut scopes = scopes_with(&[
        ("a", DataType::Bool, Some(Value::Bool(true))),
        ("b", DataType::Int8, Some(Value::Int8(0))),
    ]);
    let flat = vec![
        op(&terms, "&&"),
        var("a"),
        op(&terms, "="),
        var("b"),
        lit(Value::Int8(5)),
    ];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Bool(true));
    let b = scopes.lookup("b", 0, Access::Read).unwrap();
    assert_eq!(b.value, Value::Int8(5));
}

#[test]
fn ternary_takes_exactly_one_branch() {
    let terms = LangTerms::new();
    // c ? (x = 1) : (y = 2) : [? c : = x 1 = y 2]
    for (cond, x_expect, y_expect) in [
        (true, Value::Int8(1), Value::Int8(0)),
        (false, Value::Int8(0), Value::Int8(2)),
    ] {
        let mut scopes = scopes_with(&[
            ("c", DataType::Bool, Some(Value::Bool(cond))),
            ("x", DataType::Int8, Some(Value::Int8(0))),
            ("y", DataType::Int8, Some(Value::Int8(0))),
        ]);
        let flat = vec![
            op(&terms, "?"),
            var("c"),
            op(&terms, ":"),
            op(&terms, "="),
            var("x"),
            lit(Value::Int8(1)),
            op(&terms, "="),
            var("y"),
            lit(Value::Int8(2)),
        ];
        let (_, cnt) = eval_ok(&terms, flat, &mut scopes);
        assert_eq!(cnt, 1);
        assert_eq!(scopes.lookup("x", 0, Access::Read).unwrap().value, x_expect);
        assert_eq!(scopes.lookup("y", 0, Access::Read).unwrap().value, y_expect);
    }
}

#[test]
fn nested_short_circuits_skip_cleanly() {
    let terms = LangTerms::new();
    // false && (true || (b = 1)) : whole right side skipped
    let mut scopes = scopes_with(&[("b", DataType::Int8, Some(Value::Int8(0)))]);
    let flat = vec![
        op(&terms, "&&"),
        lit(Value::Bool(false)),
        op(&terms, "||"),
        lit(Value::Bool(true)),
        op(&terms, "="),
        var("b"),
        lit(Value::Int8(1)),
    ];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Bool(false));
    assert_eq!(
        scopes.lookup("b", 0, Access::Read).unwrap().value,
        Value::Int8(0)
    );

    // ternary inside &&'s taken right side: true && (false ? (b=1) : 7)
    let mut scopes = scopes_with(&[("b", DataType::Int8, Some(Value::Int8(0)))]);
    let flat = vec![
        op(&terms, "&&"),
        lit(Value::Bool(true)),
        op(&terms, "?"),
        lit(Value::Bool(false)),
        op(&terms, ":"),
        op(&terms, "="),
        var("b"),
        lit(Value::Int8(1)),
        lit(Value::Int8(7)),
    ];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Bool(true));
    assert_eq!(
        scopes.lookup("b", 0, Access::Read).unwrap().value,
        Value::Int8(0)
    );
}

#[test]
fn assignment_family() {
    let terms = LangTerms::new();
    let mut scopes = scopes_with(&[("x", DataType::Uint8, Some(Value::Uint8(5)))]);

    // x += 3 -> 8
    let flat = vec![op(&terms, "+="), var("x"), lit(Value::Int8(3))];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Uint8(8));

    // x *= 2 -> 16
    let flat = vec![op(&terms, "*="), var("x"), lit(Value::Int8(2))];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Uint8(16));

    assert_eq!(
        scopes.lookup("x", 0, Access::Read).unwrap().value,
        Value::Uint8(16)
    );
}

#[test]
fn assignment_coercion_out_of_range_is_user_error() {
    let terms = LangTerms::new();
    let mut scopes = scopes_with(&[("narrow", DataType::Int8, None)]);
    let mut msgs = MessageCollector::new();
    let mut flat = vec![
        op(&terms, "="),
        var("narrow"),
        lit(Value::Int16(1000)),
    ];
    let err = Evaluator::new(&terms, EvalMode::RunTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap_err();
    assert!(err.is_user_error());
    assert!(matches!(err, EvalError::Assign { .. }));
}

#[test]
fn assignment_widening_succeeds() {
    let terms = LangTerms::new();
    let mut scopes = scopes_with(&[("wide", DataType::Int64, None)]);
    let flat = vec![op(&terms, "="), var("wide"), lit(Value::Int8(5))];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Int64(5));
}

#[test]
fn pre_and_postfix_semantics() {
    let terms = LangTerms::new();
    let mut scopes = scopes_with(&[("i", DataType::Int8, Some(Value::Int8(5)))]);

    // prefix yields the new value
    let flat = vec![op(&terms, "+1"), var("i")];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Int8(6));

    // postfix yields the old value but commits the new one
    let flat = vec![op(&terms, "1+"), var("i")];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Int8(6));
    assert_eq!(
        scopes.lookup("i", 0, Access::Read).unwrap().value,
        Value::Int8(7)
    );

    // prefix decrement
    let flat = vec![op(&terms, "-1"), var("i")];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Int8(6));
}

#[test]
fn increment_wraps_at_declared_width() {
    let terms = LangTerms::new();
    let mut scopes = scopes_with(&[("u", DataType::Uint8, Some(Value::Uint8(255)))]);
    let flat = vec![op(&terms, "+1"), var("u")];
    let (out, _) = eval_ok(&terms, flat, &mut scopes);
    assert_eq!(out[0].value, Value::Uint8(0));
}

#[test]
fn incr_of_literal_is_user_error() {
    let terms = LangTerms::new();
    let mut scopes = ScopeStack::new();
    let mut msgs = MessageCollector::new();
    let mut flat = vec![op(&terms, "+1"), lit(Value::Int8(3))];
    let err = Evaluator::new(&terms, EvalMode::RunTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap_err();
    assert!(matches!(err, EvalError::NeedsVariable { .. }));
}

#[test]
fn uninitialized_read_warns_then_fails() {
    let terms = LangTerms::new();

    // compile time: warning, evaluation continues with the default
    let mut scopes = scopes_with(&[("x", DataType::Uint8, None)]);
    let mut msgs = MessageCollector::new();
    let mut flat = vec![op(&terms, "B+"), var("x"), lit(Value::Int8(1))];
    let cnt = Evaluator::new(&terms, EvalMode::CompileTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap();
    assert_eq!(cnt, 1);
    assert_eq!(msgs.count_of(MessageKind::Warning), 1);

    // run time: hard error
    let mut scopes = scopes_with(&[("x", DataType::Uint8, None)]);
    let mut msgs = MessageCollector::new();
    let mut flat = vec![op(&terms, "B+"), var("x"), lit(Value::Int8(1))];
    let err = Evaluator::new(&terms, EvalMode::RunTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap_err();
    assert!(matches!(err, EvalError::UninitializedRead { .. }));
}

#[test]
fn str_call_renders_values() {
    let terms = LangTerms::new();
    let flat = vec![
        sys_call("str"),
        lit(Value::Int8(3)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Str("3".into()));

    // "hi " + str(1 + 2)
    let flat = vec![
        op(&terms, "B+"),
        lit(Value::Str("hi ".into())),
        sys_call("str"),
        op(&terms, "B+"),
        lit(Value::Int8(1)),
        lit(Value::Int8(2)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Str("hi 3".into()));
}

#[test]
fn print_line_is_void() {
    let terms = LangTerms::new();
    let mut scopes = ScopeStack::new();
    let mut msgs = MessageCollector::new();
    // compile-time mode: no stdout side effect, still reduces to nothing
    let mut flat = vec![sys_call("print_line"), lit(Value::Str("hi".into()))];
    let cnt = Evaluator::new(&terms, EvalMode::CompileTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap();
    assert_eq!(cnt, 0);
    assert!(flat.is_empty());
}

#[test]
fn print_line_rejects_non_string() {
    let terms = LangTerms::new();
    let mut scopes = ScopeStack::new();
    let mut msgs = MessageCollector::new();
    let mut flat = vec![sys_call("print_line"), lit(Value::Int8(3))];
    let err = Evaluator::new(&terms, EvalMode::CompileTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap_err();
    assert!(matches!(err, EvalError::SysCall { .. }));
}

#[test]
fn comparison_promotes_across_types() {
    let terms = LangTerms::new();
    let flat = vec![
        op(&terms, "<"),
        lit(Value::Int8(2)),
        lit(Value::Double(2.5)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Bool(true));

    let flat = vec![
        op(&terms, "=="),
        lit(Value::Uint16(7)),
        lit(Value::Int64(7)),
    ];
    assert_eq!(eval_value(&terms, flat), Value::Bool(true));
}

#[test]
fn incomparable_types_error() {
    let terms = LangTerms::new();
    let mut scopes = ScopeStack::new();
    let mut msgs = MessageCollector::new();
    let mut flat = vec![
        op(&terms, "<"),
        lit(Value::Str("a".into())),
        lit(Value::Int8(1)),
    ];
    let err = Evaluator::new(&terms, EvalMode::RunTime)
        .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
        .unwrap_err();
    assert!(matches!(
        err,
        EvalError::Math {
            source: MathError::TypeMismatch,
            ..
        }
    ));
}

// ----- reader -----

/// Build a flex object: [op][total_len][payload].
fn flex(op_code: u8, payload: &[u8]) -> Vec<u8> {
    let total = (payload.len() + 5) as u32;
    let mut out = vec![op_code];
    out.extend_from_slice(&total.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn utf16_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

#[test]
fn reader_decodes_expression_stream() {
    let terms = LangTerms::new();
    // [B+ uint8(1) string("x")]
    let mut payload = vec![BINARY_PLUS_OPCODE, UINT8_OPCODE, 1];
    payload.extend(flex(STRING_OPCODE, &utf16_bytes("x")));
    let obj = flex(EXPRESSION_OPCODE, &payload);

    let mut reader = ObjReader::new(Cursor::new(obj), &terms);
    let tokens = reader.read_expr_into_list().unwrap();
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].op_code(), BINARY_PLUS_OPCODE);
    assert_eq!(tokens[1].value, Value::Uint8(1));
    assert_eq!(tokens[2].value, Value::Str("x".into()));
}

#[test]
fn reader_decodes_var_names_and_calls() {
    let terms = LangTerms::new();
    let mut payload = flex(SYSTEM_CALL_OPCODE, &utf16_bytes("print_line"));
    payload.extend(flex(VAR_NAME_OPCODE, &utf16_bytes("greeting")));
    let obj = flex(EXPRESSION_OPCODE, &payload);

    let mut reader = ObjReader::new(Cursor::new(obj), &terms);
    let tokens = reader.read_expr_into_list().unwrap();
    assert_eq!(tokens[0].kind, TokenKind::SystemCall);
    assert_eq!(tokens[0].text, "print_line");
    assert_eq!(tokens[1].kind, TokenKind::UserWord);
    assert_eq!(tokens[1].text, "greeting");
}

#[test]
fn reader_rejects_child_overrunning_parent() {
    let terms = LangTerms::new();
    // inner string claims 100 bytes but the parent ends first
    let mut inner = vec![STRING_OPCODE];
    inner.extend_from_slice(&100u32.to_be_bytes());
    inner.extend_from_slice(&utf16_bytes("x"));
    let obj = flex(EXPRESSION_OPCODE, &inner);

    let mut reader = ObjReader::new(Cursor::new(obj), &terms);
    let err = reader.read_expr_into_list().unwrap_err();
    assert!(matches!(err, ObjError::BoundaryOverrun { .. }));
}

#[test]
fn reader_rejects_non_expression_header() {
    let terms = LangTerms::new();
    let obj = flex(WHILE_SCOPE_OPCODE, &[]);
    let mut reader = ObjReader::new(Cursor::new(obj), &terms);
    let err = reader.read_expr_into_list().unwrap_err();
    assert!(matches!(err, ObjError::ExpectedExpression { .. }));
}

#[test]
fn reader_round_trips_fixed_widths() {
    let terms = LangTerms::new();
    let mut payload = vec![UINT16_OPCODE];
    payload.extend_from_slice(&0x1234u16.to_be_bytes());
    payload.push(INT32_OPCODE);
    payload.extend_from_slice(&(-5i32).to_be_bytes());
    payload.push(BOOL_DATA_OPCODE);
    payload.push(1);
    let obj = flex(EXPRESSION_OPCODE, &payload);

    let mut reader = ObjReader::new(Cursor::new(obj), &terms);
    let tokens = reader.read_expr_into_list().unwrap();
    assert_eq!(tokens[0].value, Value::Uint16(0x1234));
    assert_eq!(tokens[1].value, Value::Int32(-5));
    assert_eq!(tokens[2].value, Value::Bool(true));
}

#[test]
fn reader_decodes_double_and_datetime() {
    let terms = LangTerms::new();
    let mut payload = flex(DOUBLE_OPCODE, &2.5f64.to_bits().to_be_bytes());
    payload.extend(flex(DATETIME_OPCODE, &86_400_000u64.to_be_bytes()));
    let obj = flex(EXPRESSION_OPCODE, &payload);

    let mut reader = ObjReader::new(Cursor::new(obj), &terms);
    let tokens = reader.read_expr_into_list().unwrap();
    assert_eq!(tokens[0].value, Value::Double(2.5));
    assert_eq!(tokens[1].value, Value::DateTime(86_400_000));
}

// ----- the interpreter over hand-built object streams -----
//
// These bypass the compiler entirely: each test lays out the statement
// objects by hand, so a compiler bug cannot mask an interpreter bug.

mod interp_streams {
    use super::{flex, utf16_bytes};
    use crate::interp::{InterpError, Interpreter};
    use quillc_lex::opcodes::*;
    use quillc_lex::{LangTerms, Value};
    use quillc_util::MessageCollector;
    use std::io::Cursor;

    fn var_obj(name: &str) -> Vec<u8> {
        flex(VAR_NAME_OPCODE, &utf16_bytes(name))
    }

    fn expr_obj(payload: &[u8]) -> Vec<u8> {
        flex(EXPRESSION_OPCODE, payload)
    }

    /// `uint8 <name> = <n>;`
    fn decl_u8(name: &str, n: u8) -> Vec<u8> {
        let mut payload = vec![DATA_TYPE_UINT8_OPCODE];
        payload.extend(var_obj(name));
        payload.extend(expr_obj(&[UINT8_OPCODE, n]));
        flex(VARIABLES_DECLARATION_OPCODE, &payload)
    }

    /// `<name> = <n>;` as an expression object.
    fn assign_u8(name: &str, n: u8) -> Vec<u8> {
        let mut payload = vec![ASSIGNMENT_OPCODE];
        payload.extend(var_obj(name));
        payload.extend([UINT8_OPCODE, n]);
        expr_obj(&payload)
    }

    fn run_program(statements: &[Vec<u8>]) -> Interpreter<'static, Cursor<Vec<u8>>> {
        // Leak one table per test; fine for test scope.
        let terms: &'static LangTerms = Box::leak(Box::new(LangTerms::new()));
        let program = flex(ANON_SCOPE_OPCODE, &statements.concat());
        let mut interp = Interpreter::new(Cursor::new(program), terms);
        let mut msgs = MessageCollector::new();
        interp.run(&mut msgs).expect("program should run");
        interp
    }

    fn read_u8(interp: &Interpreter<'_, Cursor<Vec<u8>>>, name: &str) -> Value {
        interp.scopes().read(name).expect("variable").value.clone()
    }

    #[test]
    fn declaration_then_expression_statement() {
        // uint8 x = 5; x = x + 1;  (flat: [= x B+ x 1])
        let mut add_payload = vec![ASSIGNMENT_OPCODE];
        add_payload.extend(var_obj("x"));
        add_payload.push(BINARY_PLUS_OPCODE);
        add_payload.extend(var_obj("x"));
        add_payload.extend([UINT8_OPCODE, 1]);

        let interp = run_program(&[decl_u8("x", 5), expr_obj(&add_payload)]);
        assert_eq!(read_u8(&interp, "x"), Value::Uint8(6));
    }

    #[test]
    fn if_ladder_skips_by_length_headers() {
        // uint8 x = 0; if (false) x = 1; else if (false) x = 2; else x = 3;
        let if_obj = {
            let mut payload = expr_obj(&[BOOL_DATA_OPCODE, 0]);
            payload.extend(assign_u8("x", 1));
            flex(IF_SCOPE_OPCODE, &payload)
        };
        let elif_obj = {
            let mut payload = expr_obj(&[BOOL_DATA_OPCODE, 0]);
            payload.extend(assign_u8("x", 2));
            flex(ELSE_IF_SCOPE_OPCODE, &payload)
        };
        let else_obj = flex(ELSE_SCOPE_OPCODE, &assign_u8("x", 3));

        let interp = run_program(&[decl_u8("x", 0), if_obj, elif_obj, else_obj]);
        assert_eq!(read_u8(&interp, "x"), Value::Uint8(3));
    }

    #[test]
    fn taken_branch_suppresses_the_rest() {
        // uint8 x = 0; if (true) x = 1; else x = 3;
        let if_obj = {
            let mut payload = expr_obj(&[BOOL_DATA_OPCODE, 1]);
            payload.extend(assign_u8("x", 1));
            flex(IF_SCOPE_OPCODE, &payload)
        };
        let else_obj = flex(ELSE_SCOPE_OPCODE, &assign_u8("x", 3));

        let interp = run_program(&[decl_u8("x", 0), if_obj, else_obj]);
        assert_eq!(read_u8(&interp, "x"), Value::Uint8(1));
    }

    #[test]
    fn while_reruns_cached_condition() {
        // uint8 x = 0; while (x < 3) ++x;
        let mut cond = vec![LESS_THAN_OPCODE];
        cond.extend(var_obj("x"));
        cond.extend([UINT8_OPCODE, 3]);
        let mut body = vec![PRE_INCR_OPCODE];
        body.extend(var_obj("x"));

        let mut while_payload = expr_obj(&cond);
        while_payload.extend(expr_obj(&body));
        let while_obj = flex(WHILE_SCOPE_OPCODE, &while_payload);

        let interp = run_program(&[decl_u8("x", 0), while_obj]);
        assert_eq!(read_u8(&interp, "x"), Value::Uint8(3));
    }

    #[test]
    fn break_unwinds_exactly_one_loop() {
        // uint8 x = 0; while (true) { x = 9; break; } x = x + 1 (via assign 10)
        let mut while_payload = expr_obj(&[BOOL_DATA_OPCODE, 1]);
        while_payload.extend(assign_u8("x", 9));
        while_payload.push(BREAK_OPCODE);
        let while_obj = flex(WHILE_SCOPE_OPCODE, &while_payload);

        let interp = run_program(&[decl_u8("x", 0), while_obj, assign_u8("x", 10)]);
        // the statement after the loop still ran
        assert_eq!(read_u8(&interp, "x"), Value::Uint8(10));
    }

    #[test]
    fn for_object_with_empty_clauses() {
        // for (;;) { break; } then x = 4
        let mut for_payload = expr_obj(&[]); // init
        for_payload.extend(expr_obj(&[])); // cond (empty = always true)
        for_payload.extend(expr_obj(&[])); // step
        for_payload.push(BREAK_OPCODE);
        let for_obj = flex(FOR_SCOPE_OPCODE, &for_payload);

        let interp = run_program(&[decl_u8("x", 0), for_obj, assign_u8("x", 4)]);
        assert_eq!(read_u8(&interp, "x"), Value::Uint8(4));
    }

    #[test]
    fn anon_scope_opens_and_closes_frames() {
        // uint8 x = 1; { uint8 y = 2; x = y; }
        let mut inner = decl_u8("y", 2);
        let mut assign_payload = vec![ASSIGNMENT_OPCODE];
        assign_payload.extend(var_obj("x"));
        assign_payload.extend(var_obj("y"));
        inner.extend(expr_obj(&assign_payload));
        let block = flex(ANON_SCOPE_OPCODE, &inner);

        let interp = run_program(&[decl_u8("x", 1), block]);
        assert_eq!(read_u8(&interp, "x"), Value::Uint8(2));
        assert!(interp.scopes().read("y").is_none());
    }

    #[test]
    fn stray_break_at_root_is_an_error() {
        let terms = LangTerms::new();
        let program = flex(ANON_SCOPE_OPCODE, &[BREAK_OPCODE]);
        let mut interp = Interpreter::new(Cursor::new(program), &terms);
        let mut msgs = MessageCollector::new();
        let err = interp.run(&mut msgs).unwrap_err();
        assert!(matches!(err, InterpError::BreakOutsideLoop));
    }

    #[test]
    fn unknown_statement_opcode_is_an_error() {
        let terms = LangTerms::new();
        let program = flex(ANON_SCOPE_OPCODE, &flex(USER_FXN_CALL_OPCODE, &[]));
        let mut interp = Interpreter::new(Cursor::new(program), &terms);
        let mut msgs = MessageCollector::new();
        let err = interp.run(&mut msgs).unwrap_err();
        assert!(matches!(err, InterpError::UnexpectedOpcode { .. }));
    }

    #[test]
    fn missing_root_scope_is_an_error() {
        let terms = LangTerms::new();
        let program = flex(EXPRESSION_OPCODE, &[UINT8_OPCODE, 1]);
        let mut interp = Interpreter::new(Cursor::new(program), &terms);
        let mut msgs = MessageCollector::new();
        let err = interp.run(&mut msgs).unwrap_err();
        assert!(matches!(err, InterpError::MissingRootScope));
    }
}
