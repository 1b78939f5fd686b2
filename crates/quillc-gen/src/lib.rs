//! quillc-gen - Bytecode emission and the statement-level compiler.
//!
//! [`writer`] owns the binary object format's emit side (big-endian,
//! opcode-prefixed, length-back-patched flex objects); [`compiler`] is
//! the recursive-descent statement layer that drives the expression
//! parser, pre-evaluates what it emits, and lays out declarations,
//! control constructs and expression statements as objects.

pub mod compiler;
pub mod writer;

#[cfg(test)]
mod edge_cases;

pub use compiler::{CompileError, CompileOptions, StatementCompiler};
pub use writer::{ObjWriter, WriterError};
