//! Edge-case and property tests that cut across the lexer modules.

use crate::lexer::tokenize;
use crate::terms::LangTerms;
use crate::token::TokenKind;
use crate::value::Value;
use proptest::prelude::*;

#[test]
fn lone_semicolons_commit_individually() {
    let terms = LangTerms::new();
    let tokens = tokenize(";;;", "t.ql", &terms).unwrap();
    assert_eq!(tokens.len(), 4);
    assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::SrcOpr8r));
}

#[test]
fn boundary_decimal_widths() {
    let terms = LangTerms::new();
    let tokens = tokenize("127 128 32767 32768 2147483647 2147483648", "t.ql", &terms).unwrap();
    assert_eq!(tokens[0].value, Value::Int8(127));
    assert_eq!(tokens[1].value, Value::Int16(128));
    assert_eq!(tokens[2].value, Value::Int16(32767));
    assert_eq!(tokens[3].value, Value::Int32(32768));
    assert_eq!(tokens[4].value, Value::Int32(2147483647));
    assert_eq!(tokens[5].value, Value::Int64(2147483648));
}

#[test]
fn decimal_too_large_for_int64_is_junk() {
    let terms = LangTerms::new();
    let tokens = tokenize("99999999999999999999", "t.ql", &terms).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Junk);
}

#[test]
fn crlf_and_lf_sources_agree_on_tokens() {
    let terms = LangTerms::new();
    let unix = tokenize("a = 1;\nb = 2;\n", "t.ql", &terms).unwrap();
    let dos = tokenize("a = 1;\r\nb = 2;\r\n", "t.ql", &terms).unwrap();
    let unix_texts: Vec<&String> = unix.iter().map(|t| &t.text).collect();
    let dos_texts: Vec<&String> = dos.iter().map(|t| &t.text).collect();
    assert_eq!(unix_texts, dos_texts);
    // and the line numbers match too
    for (u, d) in unix.iter().zip(dos.iter()) {
        assert_eq!(u.pos.line, d.pos.line);
    }
}

#[test]
fn datetime_only_inside_string_literals() {
    let terms = LangTerms::new();
    // bare date text is just tokens, never a datetime literal
    let tokens = tokenize("2022-10-14", "t.ql", &terms).unwrap();
    assert!(tokens.iter().all(|t| t.kind != TokenKind::DateTimeLit));
}

// ----- the numeric promotion matrix, one pairing at a time -----
//
// Every signedness/double pairing for the arithmetic operators has an
// explicit case here; the matrix is the contract the evaluator leans on.

mod promotion_matrix {
    use crate::value::{MathError, Value};

    const U: Value = Value::Uint8(6);
    const S: Value = Value::Int8(-4);
    const SP: Value = Value::Int8(4);
    const D: Value = Value::Double(1.5);

    #[test]
    fn add_pairings() {
        // unsigned + unsigned stays unsigned
        assert_eq!(U.add(&Value::Uint8(250)).unwrap(), Value::Uint16(256));
        // unsigned + signed goes signed
        assert_eq!(U.add(&S).unwrap(), Value::Int8(2));
        // signed + unsigned goes signed
        assert_eq!(S.add(&U).unwrap(), Value::Int8(2));
        // signed + signed stays signed
        assert_eq!(S.add(&S).unwrap(), Value::Int8(-8));
        // double on either side wins
        assert_eq!(U.add(&D).unwrap(), Value::Double(7.5));
        assert_eq!(D.add(&S).unwrap(), Value::Double(-2.5));
        assert_eq!(D.add(&D).unwrap(), Value::Double(3.0));
    }

    #[test]
    fn subtract_pairings() {
        // unsigned - unsigned may go negative, and therefore signed
        assert_eq!(Value::Uint8(2).subtract(&Value::Uint8(5)).unwrap(), Value::Int8(-3));
        assert_eq!(U.subtract(&Value::Uint8(5)).unwrap(), Value::Uint8(1));
        assert_eq!(U.subtract(&S).unwrap(), Value::Int8(10));
        assert_eq!(S.subtract(&U).unwrap(), Value::Int8(-10));
        assert_eq!(S.subtract(&S).unwrap(), Value::Int8(0));
        assert_eq!(D.subtract(&U).unwrap(), Value::Double(-4.5));
        assert_eq!(U.subtract(&D).unwrap(), Value::Double(4.5));
    }

    #[test]
    fn multiply_pairings() {
        assert_eq!(U.multiply(&Value::Uint8(50)).unwrap(), Value::Uint16(300));
        assert_eq!(U.multiply(&S).unwrap(), Value::Int8(-24));
        assert_eq!(S.multiply(&U).unwrap(), Value::Int8(-24));
        assert_eq!(S.multiply(&S).unwrap(), Value::Int8(16));
        assert_eq!(S.multiply(&D).unwrap(), Value::Double(-6.0));
        assert_eq!(D.multiply(&U).unwrap(), Value::Double(9.0));
    }

    #[test]
    fn divide_pairings() {
        // even division keeps integer-ness
        assert_eq!(U.divide(&Value::Uint8(3)).unwrap(), Value::Uint8(2));
        assert_eq!(Value::Int8(-8).divide(&SP).unwrap(), Value::Int8(-2));
        // uneven division promotes to double in every integer pairing
        assert_eq!(Value::Uint8(7).divide(&Value::Uint8(2)).unwrap(), Value::Double(3.5));
        assert_eq!(Value::Uint8(7).divide(&Value::Int8(-2)).unwrap(), Value::Double(-3.5));
        assert_eq!(Value::Int8(-7).divide(&Value::Uint8(2)).unwrap(), Value::Double(-3.5));
        // double division stays double
        assert_eq!(D.divide(&Value::Double(0.5)).unwrap(), Value::Double(3.0));
        assert_eq!(Value::Double(6.0).divide(&SP).unwrap(), Value::Double(1.5));
    }

    #[test]
    fn modulo_pairings() {
        assert_eq!(Value::Uint8(7).modulo(&Value::Uint8(3)).unwrap(), Value::Uint8(1));
        assert_eq!(Value::Int8(-7).modulo(&Value::Int8(3)).unwrap(), Value::Int8(-1));
        // mixed signedness renormalizes signed
        assert_eq!(Value::Uint8(7).modulo(&Value::Int8(3)).unwrap(), Value::Int8(1));
        // any double operand is refused
        assert_eq!(D.modulo(&SP), Err(MathError::NeedsInteger));
        assert_eq!(SP.modulo(&D), Err(MathError::NeedsInteger));
    }

    #[test]
    fn string_pairings() {
        let s = Value::Str("ab".into());
        assert_eq!(s.add(&Value::Str("cd".into())).unwrap(), Value::Str("abcd".into()));
        assert_eq!(s.add(&U), Err(MathError::NotNumeric));
        assert_eq!(U.add(&s), Err(MathError::NotNumeric));
        assert_eq!(s.subtract(&s), Err(MathError::NotNumeric));
        assert_eq!(s.multiply(&Value::Int8(2)), Err(MathError::NotNumeric));
    }

    #[test]
    fn bool_and_datetime_are_not_arithmetic() {
        assert_eq!(Value::Bool(true).add(&U), Err(MathError::NotNumeric));
        assert_eq!(Value::DateTime(1000).add(&U), Err(MathError::NotNumeric));
    }

    #[test]
    fn width_is_minimal_after_every_op() {
        // results renormalize to the smallest holding width
        assert_eq!(
            Value::Uint16(300).subtract(&Value::Uint16(200)).unwrap(),
            Value::Uint8(100)
        );
        assert_eq!(
            Value::Int32(70000).subtract(&Value::Int32(69999)).unwrap(),
            Value::Int8(1)
        );
    }

    #[test]
    fn overflow_is_an_error_not_a_wrap() {
        assert_eq!(
            Value::Uint64(u64::MAX).add(&Value::Uint64(1)),
            Err(MathError::Overflow)
        );
        assert_eq!(
            Value::Uint64(u64::MAX).multiply(&Value::Uint64(u64::MAX)),
            Err(MathError::Overflow)
        );
        assert_eq!(
            Value::Int64(i64::MIN).subtract(&Value::Uint64(u64::MAX)),
            Err(MathError::Overflow)
        );
    }
}

proptest! {
    /// The lexer terminates and ends with exactly one EndOfStream on any
    /// printable-ASCII input that avoids the fatal unterminated constructs
    /// (no quotes, no `/` so no comment openers).
    #[test]
    fn lexer_always_terminates(src in "[a-zA-Z0-9 +\\-*%<>=!&|^~?:;(){}\\[\\]_,.]{0,80}") {
        let terms = LangTerms::new();
        let tokens = tokenize(&src, "t.ql", &terms).unwrap();
        prop_assert!(!tokens.is_empty());
        prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfStream);
        prop_assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::EndOfStream).count(),
            1
        );
    }

    /// Lexing is stable: the same input yields the same token texts.
    #[test]
    fn lexer_is_deterministic(src in "[a-z0-9 +\\-*;=]{0,40}") {
        let terms = LangTerms::new();
        let a = tokenize(&src, "t.ql", &terms).unwrap();
        let b = tokenize(&src, "t.ql", &terms).unwrap();
        prop_assert_eq!(a, b);
    }
}
