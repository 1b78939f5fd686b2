//! Internal-error plumbing.
//!
//! An [`InternalError`] marks an invariant violation inside the toolchain
//! itself, as opposed to a problem with the user's program. It records the
//! Rust source location where the invariant first failed so a bug report
//! points at the right line. Phase crates wrap it in their own error enums.

use thiserror::Error;

/// An invariant violation inside the compiler or interpreter.
///
/// Construct through the [`internal_err!`](crate::internal_err) macro so the
/// origin file and line are captured automatically:
///
/// ```
/// use quillc_util::internal_err;
///
/// let err = internal_err!("operand stack underflow");
/// assert!(err.to_string().contains("operand stack underflow"));
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("INTERNAL [{origin_file}:{origin_line}] {detail}")]
pub struct InternalError {
    /// Rust source file that detected the failure.
    pub origin_file: &'static str,
    /// Rust source line that detected the failure.
    pub origin_line: u32,
    /// What went wrong.
    pub detail: String,
}

impl InternalError {
    /// Builds an error by hand; prefer [`internal_err!`](crate::internal_err),
    /// which fills in the origin automatically.
    ///
    /// # Arguments
    ///
    /// * `origin_file` - Rust source file that detected the failure
    /// * `origin_line` - Rust source line that detected the failure
    /// * `detail` - What went wrong
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::InternalError;
    ///
    /// let err = InternalError::new("eval.rs", 40, "operand stack underflow");
    /// assert_eq!(err.to_string(), "INTERNAL [eval.rs:40] operand stack underflow");
    /// ```
    pub fn new(origin_file: &'static str, origin_line: u32, detail: impl Into<String>) -> Self {
        Self {
            origin_file,
            origin_line,
            detail: detail.into(),
        }
    }
}

pub type InternalResult<T> = std::result::Result<T, InternalError>;

/// Build an [`InternalError`] carrying the current `file!()` / `line!()`.
#[macro_export]
macro_rules! internal_err {
    ($($arg:tt)*) => {
        $crate::InternalError::new(file!(), line!(), format!($($arg)*))
    };
}
