//! quillc-int - Bytecode reading and execution.
//!
//! Three layers:
//!
//! * [`reader`] — random-access decoding of the compiled object stream
//! * [`eval`] — the in-place flat-expression reducer, run by the
//!   compiler (compile-time checking) and the interpreter (execution)
//! * [`interp`] — the statement-level interpreter driving both against
//!   a fresh scope stack

pub mod eval;
pub mod interp;
pub mod reader;

#[cfg(test)]
mod edge_cases;

pub use eval::{EvalError, EvalMode, Evaluator};
pub use interp::{InterpError, Interpreter};
pub use reader::{ObjError, ObjReader};
