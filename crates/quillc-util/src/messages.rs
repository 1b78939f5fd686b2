//! User-facing message collection and reporting.
//!
//! Every diagnostic the toolchain produces flows through one
//! [`MessageCollector`]. Messages carry a severity kind, text, the source
//! position they refer to, and an insertion-order index so reports are
//! stable. Identical (kind, text) pairs are deduplicated for the grouped
//! report while each occurrence's location is preserved.
//!
//! # Example
//!
//! ```
//! use quillc_util::{MessageCollector, MessageKind, SrcPos};
//!
//! let mut msgs = MessageCollector::new();
//! msgs.warning("uninitialized variable", SrcPos::new("a.ql", 2, 5));
//! msgs.user_error("divide by zero", SrcPos::new("a.ql", 4, 9));
//!
//! assert!(msgs.has_user_errors());
//! let report = msgs.grouped_report();
//! assert!(report.contains("error: divide by zero"));
//! ```

use crate::pos::SrcPos;
use indexmap::IndexMap;
use std::fmt;

/// Message severity, ordered by how bad the news is.
///
/// # Example
///
/// ```
/// use quillc_util::MessageKind;
///
/// assert!(MessageKind::Warning < MessageKind::UserError);
/// assert_eq!(MessageKind::UserError.to_string(), "error");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    /// Progress or recovery marker ("continuing compilation after ...").
    Info,
    /// Suspicious but not fatal (uninitialized read at compile time,
    /// static loop condition with no break).
    Warning,
    /// A problem with the user's program.
    UserError,
    /// A bug in the toolchain itself. Fatal.
    InternalError,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Info => "info",
            MessageKind::Warning => "warning",
            MessageKind::UserError => "error",
            MessageKind::InternalError => "internal error",
        };
        f.write_str(name)
    }
}

/// One collected diagnostic.
///
/// Displays as `kind: text [file:line:col]`, dropping the bracketed
/// location when the position is unknown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub text: String,
    pub pos: SrcPos,
    /// Insertion-order index, 0-based across all kinds.
    pub order: usize,
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pos.is_known() {
            write!(f, "{}: {} [{}]", self.kind, self.text, self.pos)
        } else {
            write!(f, "{}: {}", self.kind, self.text)
        }
    }
}

/// Owns every message produced during a compile or interpret phase.
///
/// # Example
///
/// ```
/// use quillc_util::{MessageCollector, MessageKind, SrcPos};
///
/// let mut msgs = MessageCollector::new();
/// msgs.user_error("divide by zero", SrcPos::new("a.ql", 4, 9));
/// assert!(msgs.has_user_errors());
/// assert_eq!(msgs.count_of(MessageKind::UserError), 1);
/// ```
#[derive(Debug, Default)]
pub struct MessageCollector {
    /// Chronological store; `order` indexes into this.
    entries: Vec<UserMessage>,
    /// (kind, text) -> indices of every occurrence, insertion-ordered.
    dedup: IndexMap<(MessageKind, String), Vec<usize>>,
}

impl MessageCollector {
    /// Creates an empty collector.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::MessageCollector;
    ///
    /// let msgs = MessageCollector::new();
    /// assert!(!msgs.has_user_errors());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: MessageKind, text: impl Into<String>, pos: SrcPos) {
        let text = text.into();
        let order = self.entries.len();
        self.dedup
            .entry((kind, text.clone()))
            .or_default()
            .push(order);
        self.entries.push(UserMessage {
            kind,
            text,
            pos,
            order,
        });
    }

    /// Records an informational message (recovery points, progress).
    ///
    /// # Arguments
    ///
    /// * `text` - The message text
    /// * `pos` - Where in user source it applies
    pub fn info(&mut self, text: impl Into<String>, pos: SrcPos) {
        self.push(MessageKind::Info, text, pos);
    }

    /// Records a warning; compilation continues unaffected.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::{MessageCollector, MessageKind, SrcPos};
    ///
    /// let mut msgs = MessageCollector::new();
    /// msgs.warning("uninitialized variable", SrcPos::none());
    /// assert_eq!(msgs.count_of(MessageKind::Warning), 1);
    /// assert!(!msgs.has_user_errors());
    /// ```
    pub fn warning(&mut self, text: impl Into<String>, pos: SrcPos) {
        self.push(MessageKind::Warning, text, pos);
    }

    /// Records an error in the user's program.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::{MessageCollector, SrcPos};
    ///
    /// let mut msgs = MessageCollector::new();
    /// msgs.user_error("unexpected token", SrcPos::new("a.ql", 1, 1));
    /// assert!(msgs.has_user_errors());
    /// ```
    pub fn user_error(&mut self, text: impl Into<String>, pos: SrcPos) {
        self.push(MessageKind::UserError, text, pos);
    }

    /// Records an invariant violation inside the toolchain itself.
    pub fn internal_error(&mut self, text: impl Into<String>, pos: SrcPos) {
        self.push(MessageKind::InternalError, text, pos);
    }

    /// Number of messages of one kind, counting every occurrence.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::{MessageCollector, MessageKind, SrcPos};
    ///
    /// let mut msgs = MessageCollector::new();
    /// msgs.user_error("bad token", SrcPos::new("a.ql", 3, 1));
    /// msgs.user_error("bad token", SrcPos::new("a.ql", 9, 1));
    /// assert_eq!(msgs.count_of(MessageKind::UserError), 2);
    /// ```
    pub fn count_of(&self, kind: MessageKind) -> usize {
        self.entries.iter().filter(|m| m.kind == kind).count()
    }

    /// True when at least one user error was collected.
    pub fn has_user_errors(&self) -> bool {
        self.entries.iter().any(|m| m.kind == MessageKind::UserError)
    }

    /// True when at least one internal error was collected.
    pub fn has_internal_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|m| m.kind == MessageKind::InternalError)
    }

    /// True when the user-error count has reached `limit`. The statement
    /// compiler stops recovering past this point.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::{MessageCollector, SrcPos};
    ///
    /// let mut msgs = MessageCollector::new();
    /// msgs.user_error("oops", SrcPos::none());
    /// assert!(msgs.is_over_limit(1));
    /// assert!(!msgs.is_over_limit(2));
    /// ```
    pub fn is_over_limit(&self, limit: usize) -> bool {
        self.count_of(MessageKind::UserError) >= limit
    }

    /// All messages in insertion order.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::{MessageCollector, SrcPos};
    ///
    /// let mut msgs = MessageCollector::new();
    /// msgs.warning("first", SrcPos::none());
    /// msgs.user_error("second", SrcPos::none());
    /// let texts: Vec<&str> = msgs.chronological().iter().map(|m| m.text.as_str()).collect();
    /// assert_eq!(texts, vec!["first", "second"]);
    /// ```
    pub fn chronological(&self) -> &[UserMessage] {
        &self.entries
    }

    /// Messages of one kind, deduplicated by text, each with the list of
    /// positions it occurred at. Order follows first occurrence.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::{MessageCollector, MessageKind, SrcPos};
    ///
    /// let mut msgs = MessageCollector::new();
    /// msgs.user_error("bad token", SrcPos::new("a.ql", 3, 1));
    /// msgs.user_error("bad token", SrcPos::new("a.ql", 9, 1));
    ///
    /// let grouped = msgs.grouped(MessageKind::UserError);
    /// assert_eq!(grouped.len(), 1);
    /// assert_eq!(grouped[0].1.len(), 2);
    /// ```
    pub fn grouped(&self, kind: MessageKind) -> Vec<(&str, Vec<&SrcPos>)> {
        self.dedup
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, text), occurrences)| {
                let positions = occurrences
                    .iter()
                    .map(|&i| &self.entries[i].pos)
                    .collect::<Vec<_>>();
                (text.as_str(), positions)
            })
            .collect()
    }

    /// Render the severity-grouped report, worst news first. Empty string
    /// when nothing was collected.
    pub fn grouped_report(&self) -> String {
        let mut out = String::new();
        for kind in [
            MessageKind::InternalError,
            MessageKind::UserError,
            MessageKind::Warning,
            MessageKind::Info,
        ] {
            let group = self.grouped(kind);
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "---- {} {}(s) ----\n",
                self.count_of(kind),
                kind
            ));
            for (text, positions) in group {
                out.push_str(&format!("{kind}: {text}\n"));
                for pos in positions {
                    if pos.is_known() {
                        out.push_str(&format!("    at {pos}\n"));
                    }
                }
            }
        }
        out
    }

    /// Render every message in the order it was produced.
    pub fn chronological_report(&self) -> String {
        let mut out = String::new();
        for msg in &self.entries {
            out.push_str(&format!("[{:>4}] {msg}\n", msg.order));
        }
        out
    }
}
