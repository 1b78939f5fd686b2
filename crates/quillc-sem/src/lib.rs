//! quillc-sem - The scoped name space.
//!
//! A stack of variable frames shared by the compiler (declaration
//! tracking, compile-time pre-evaluation) and the interpreter (runtime
//! state). Frames open when a scope-introducing construct starts and close
//! LIFO. Variables may shadow outer scopes at strictly deeper frames; a
//! name is unique within its own frame; assignment goes through
//! range-checked coercion into the declared type.

pub mod frame;
pub mod scopes;

pub use frame::{ScopeFrame, Variable};
pub use scopes::{Access, ScopeError, ScopeStack};
