//! quillc-lex - Lexical analysis and the language model.
//!
//! This crate owns everything the rest of the pipeline agrees on:
//!
//! * [`Value`] — the tagged union of primitive runtime values, with
//!   comparison, promotion arithmetic and assignment coercion as methods
//! * [`Token`] / [`TokenKind`] — the unit flowing between every phase
//! * [`opcodes`] — the byte values of the compiled object format
//! * [`LangTerms`] — operator precedence table, reserved words, data-type
//!   names and the system-call registry
//! * the lexer itself: [`tokenize`] / [`tokenize_bytes`]
//!
//! The lexer is a character-level state machine with one character of
//! lookahead. It commits no whitespace or comment tokens; numeric literals
//! resolve to the smallest fitting width (signed for decimal, unsigned for
//! hex) and quoted strings that parse as date-times commit as date-time
//! literals.

pub mod cursor;
pub mod lexer;
pub mod opcodes;
pub mod terms;
pub mod token;
pub mod value;

#[cfg(test)]
mod edge_cases;

pub use lexer::{tokenize, tokenize_bytes, LexError};
pub use terms::{LangTerms, Opr8r, PrecedenceLvl, SysCall};
pub use token::{Token, TokenKind};
pub use value::{parse_date_time, CoerceError, DataType, MathError, Value};
