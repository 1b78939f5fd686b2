//! quillc-util - Shared infrastructure for the Quill toolchain.
//!
//! This crate holds the pieces every compiler phase needs: source
//! positions, the user-facing message collector, log levels, and the
//! internal-error type. It has no knowledge of tokens, expressions or
//! bytecode; those live in the phase crates.

pub mod error;
pub mod log;
pub mod messages;
pub mod pos;

pub use self::error::{InternalError, InternalResult};
pub use self::log::LogLevel;
pub use self::messages::{MessageCollector, MessageKind, UserMessage};
pub use self::pos::SrcPos;
