//! quillc-par - Expression parsing, trees, and flattening.
//!
//! Turns an infix token stream with C-like precedence into a binary
//! expression tree ([`expr`]), flattens trees into the self-describing
//! `[op, operands...]` list the bytecode writer emits ([`flatten`]), and
//! rebuilds trees from flat lists for verification and round-trip tests.

pub mod expr;
pub mod flatten;
pub mod tree;

#[cfg(test)]
mod edge_cases;

pub use expr::{ExprEnder, ExprParser, ParseError, ParsedExpr};
pub use flatten::{flatten, tree_from_flat, FlattenError};
pub use tree::ExprNode;
