//! Source positions for tokens and diagnostics.
//!
//! Every token and every collected message points back into user source
//! through a [`SrcPos`]. Positions are 1-based in both dimensions, the
//! way editors count; generated constructs carry a sentinel position
//! that displays as `<generated>`.

use std::fmt;
use std::sync::Arc;

/// A position in a user source file: file name plus 1-based line and
/// column. The file name is shared (`Arc<str>`) because every token in a
/// compilation carries one.
///
/// # Example
///
/// ```
/// use quillc_util::SrcPos;
///
/// let pos = SrcPos::new("prog.ql", 3, 14);
/// assert_eq!(pos.to_string(), "prog.ql:3:14");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SrcPos {
    /// Source file name as given on the command line.
    pub file: Arc<str>,
    /// Line number, 1-based.
    pub line: u32,
    /// Column number, 1-based, counted in characters.
    pub col: u32,
}

impl SrcPos {
    /// Creates a position pointing at real user source.
    ///
    /// # Arguments
    ///
    /// * `file` - The source file name
    /// * `line` - 1-based line number
    /// * `col` - 1-based column number
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::SrcPos;
    ///
    /// let pos = SrcPos::new("prog.ql", 7, 2);
    /// assert_eq!(pos.line, 7);
    /// assert_eq!(pos.col, 2);
    /// ```
    pub fn new(file: impl Into<Arc<str>>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }

    /// A position for synthetic tokens that have no user-source origin
    /// (generated operators, internal markers, bytecode-decoded tokens).
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::SrcPos;
    ///
    /// let pos = SrcPos::none();
    /// assert!(!pos.is_known());
    /// assert_eq!(pos.to_string(), "<generated>");
    /// ```
    pub fn none() -> Self {
        Self {
            file: Arc::from(""),
            line: 0,
            col: 0,
        }
    }

    /// True when this position points at real user source.
    ///
    /// Diagnostics use this to decide whether a location suffix is worth
    /// printing.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::SrcPos;
    ///
    /// assert!(SrcPos::new("prog.ql", 1, 1).is_known());
    /// assert!(!SrcPos::none().is_known());
    /// ```
    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for SrcPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}:{}", self.file, self.line, self.col)
        } else {
            write!(f, "<generated>")
        }
    }
}
