//! The scope stack: nested frames of name -> variable.

use crate::frame::{ScopeFrame, Variable};
use quillc_lex::opcodes::ANON_SCOPE_OPCODE;
use quillc_lex::{CoerceError, Token, TokenKind, Value};
use quillc_util::SrcPos;
use std::fmt::Write as _;
use thiserror::Error;

/// How a lookup touches the variable it finds.
///
/// # Example
///
/// ```
/// use quillc_lex::Value;
/// use quillc_sem::Access;
///
/// let read = Access::Read;
/// let write = Access::CommitWrite(Value::Int8(5));
/// assert_ne!(read, write);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Access {
    /// Return a copy, leaving the variable untouched.
    Read,
    /// Coerce the carried value into the variable's declared type and
    /// store it.
    CommitWrite(Value),
}

#[derive(Debug, Error, PartialEq)]
pub enum ScopeError {
    #[error("variable `{name}` is already declared in this scope")]
    DuplicateVariable { name: String },
    #[error("variable `{name}` has not been declared")]
    UnknownVariable { name: String },
    #[error("cannot assign to `{name}`: {source}")]
    AssignFailed {
        name: String,
        #[source]
        source: CoerceError,
    },
    #[error("scope close expected opener opcode {expected:#04x} but found {found:#04x}")]
    CloseMismatch { expected: u8, found: u8 },
    #[error("no scope open above the root")]
    OnlyRootScopeOpen,
}

/// A growable stack of scope frames, root at the bottom. The root frame is
/// created on construction and never pops.
///
/// # Example
///
/// ```
/// use quillc_lex::{DataType, Value};
/// use quillc_sem::{Access, ScopeStack, Variable};
///
/// let mut stack = ScopeStack::new();
/// stack.insert_at_top("count", Variable::declared(DataType::Uint8)).unwrap();
///
/// let var = stack
///     .lookup("count", 0, Access::CommitWrite(Value::Uint8(7)))
///     .unwrap();
/// assert_eq!(var.value, Value::Uint8(7));
/// assert!(var.initialized);
/// ```
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    /// Creates a stack holding just the root frame.
    pub fn new() -> Self {
        let root_opener = Token::new(TokenKind::InternalUse, "root", SrcPos::none());
        Self {
            frames: vec![ScopeFrame::new(ANON_SCOPE_OPCODE, root_opener, 0, 0)],
        }
    }

    /// Drop everything back to a fresh root.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Number of open frames, root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a frame for a newly opened scope.
    ///
    /// # Arguments
    ///
    /// * `opener_opcode` - The scope object's opcode (`IF_SCOPE`, ...)
    /// * `opener` - The token that introduced the scope, for diagnostics
    /// * `begin_pos` - Byte offset of the scope's object, 0 if unknown
    /// * `len` - Object length, 0 if unknown at open time
    pub fn open(&mut self, opener_opcode: u8, opener: Token, begin_pos: u32, len: u32) {
        self.frames
            .push(ScopeFrame::new(opener_opcode, opener, begin_pos, len));
    }

    /// Pop the top frame, checking it was opened by `expected_opcode`.
    /// The root frame never pops.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, Token, TokenKind};
    /// use quillc_sem::{ScopeError, ScopeStack};
    /// use quillc_util::SrcPos;
    ///
    /// let mut stack = ScopeStack::new();
    /// let opener = Token::new(TokenKind::ReservedWord, "if", SrcPos::none());
    /// stack.open(opcodes::IF_SCOPE_OPCODE, opener, 10, 20);
    ///
    /// let frame = stack.close_top(opcodes::IF_SCOPE_OPCODE).unwrap();
    /// assert_eq!(frame.begin_pos, 10);
    /// // only the root remains; it never pops
    /// assert_eq!(
    ///     stack.close_top(opcodes::ANON_SCOPE_OPCODE),
    ///     Err(ScopeError::OnlyRootScopeOpen)
    /// );
    /// ```
    pub fn close_top(&mut self, expected_opcode: u8) -> Result<ScopeFrame, ScopeError> {
        if self.frames.len() <= 1 {
            return Err(ScopeError::OnlyRootScopeOpen);
        }
        let top = self.frames.last().expect("depth checked above");
        if top.opener_opcode != expected_opcode {
            return Err(ScopeError::CloseMismatch {
                expected: expected_opcode,
                found: top.opener_opcode,
            });
        }
        Ok(self.frames.pop().expect("depth checked above"))
    }

    pub fn top(&self) -> &ScopeFrame {
        self.frames.last().expect("root frame always present")
    }

    pub fn top_mut(&mut self) -> &mut ScopeFrame {
        self.frames.last_mut().expect("root frame always present")
    }

    /// Declare `name` in the top frame. Shadowing an outer scope is fine;
    /// a duplicate within the top frame is not.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::DataType;
    /// use quillc_sem::{ScopeError, ScopeStack, Variable};
    ///
    /// let mut stack = ScopeStack::new();
    /// stack.insert_at_top("x", Variable::declared(DataType::Int8)).unwrap();
    /// assert_eq!(
    ///     stack.insert_at_top("x", Variable::declared(DataType::Int16)),
    ///     Err(ScopeError::DuplicateVariable { name: "x".into() })
    /// );
    /// ```
    pub fn insert_at_top(&mut self, name: &str, var: Variable) -> Result<(), ScopeError> {
        let top = self.top_mut();
        if top.vars.contains_key(name) {
            return Err(ScopeError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        top.vars.insert(name.to_string(), var);
        Ok(())
    }

    /// Find `name` searching from the top frame downward and apply
    /// `access`. `max_levels == 0` searches every frame; otherwise at most
    /// that many frames from the top. Returns the variable's state after
    /// the access.
    ///
    /// A `CommitWrite` coerces the carried value into the variable's
    /// declared type first; a range failure leaves the variable
    /// untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{DataType, Value};
    /// use quillc_sem::{Access, ScopeStack, Variable};
    ///
    /// let mut stack = ScopeStack::new();
    /// stack.insert_at_top("wide", Variable::declared(DataType::Int64)).unwrap();
    ///
    /// // narrow to wide coerces on the way in
    /// let var = stack
    ///     .lookup("wide", 0, Access::CommitWrite(Value::Int8(5)))
    ///     .unwrap();
    /// assert_eq!(var.value, Value::Int64(5));
    ///
    /// // reads hand back a copy
    /// let var = stack.lookup("wide", 0, Access::Read).unwrap();
    /// assert_eq!(var.value, Value::Int64(5));
    /// ```
    pub fn lookup(
        &mut self,
        name: &str,
        max_levels: usize,
        access: Access,
    ) -> Result<Variable, ScopeError> {
        let depth_limit = if max_levels == 0 {
            self.frames.len()
        } else {
            max_levels.min(self.frames.len())
        };
        let hit = self
            .frames
            .iter_mut()
            .rev()
            .take(depth_limit)
            .find_map(|frame| frame.vars.get_mut(name));
        let var = match hit {
            Some(var) => var,
            None => {
                return Err(ScopeError::UnknownVariable {
                    name: name.to_string(),
                })
            }
        };
        match access {
            Access::Read => Ok(var.clone()),
            Access::CommitWrite(new_value) => {
                let coerced = new_value
                    .coerced_to(var.declared_type)
                    .map_err(|source| ScopeError::AssignFailed {
                        name: name.to_string(),
                        source,
                    })?;
                var.value = coerced;
                var.initialized = true;
                Ok(var.clone())
            }
        }
    }

    /// Borrow a variable without touching it; `None` when not in scope.
    /// Post-run state inspection uses this.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::DataType;
    /// use quillc_sem::{ScopeStack, Variable};
    ///
    /// let mut stack = ScopeStack::new();
    /// stack.insert_at_top("x", Variable::declared(DataType::Int8)).unwrap();
    /// assert!(stack.read("x").is_some());
    /// assert!(stack.read("ghost").is_none());
    /// ```
    pub fn read(&self, name: &str) -> Option<&Variable> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.vars.get(name))
    }

    /// Read-only existence probe, for the expression parser's
    /// variable-name checks. `max_levels` as in [`lookup`](Self::lookup).
    pub fn exists(&self, name: &str, max_levels: usize) -> bool {
        let depth_limit = if max_levels == 0 {
            self.frames.len()
        } else {
            max_levels.min(self.frames.len())
        };
        self.frames
            .iter()
            .rev()
            .take(depth_limit)
            .any(|frame| frame.vars.contains_key(name))
    }

    /// Whether any frame from the top down is a loop body. Returns that
    /// frame's `end_pos`; optionally bumps its break count (used when a
    /// `break` statement is compiled under it).
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, Token, TokenKind};
    /// use quillc_sem::ScopeStack;
    /// use quillc_util::SrcPos;
    ///
    /// let mut stack = ScopeStack::new();
    /// assert_eq!(stack.is_inside_loop(false), None);
    ///
    /// let opener = Token::new(TokenKind::ReservedWord, "for", SrcPos::none());
    /// stack.open(opcodes::FOR_SCOPE_OPCODE, opener, 100, 50);
    /// assert_eq!(stack.is_inside_loop(true), Some(150));
    /// assert_eq!(stack.top().loop_break_cnt, 1);
    /// ```
    pub fn is_inside_loop(&mut self, inc_break_cnt: bool) -> Option<u32> {
        let frame = self.frames.iter_mut().rev().find(|f| f.is_loop())?;
        if inc_break_cnt {
            frame.loop_break_cnt += 1;
        }
        Some(frame.end_pos)
    }

    /// Render every frame's variables, innermost first. DEBUG-level aid.
    pub fn display_variables(&self) -> String {
        let mut out = String::new();
        for (idx, frame) in self.frames.iter().enumerate().rev() {
            let _ = writeln!(
                out,
                "scope[{idx}] opened by `{}`:",
                if frame.opener.text.is_empty() {
                    "?"
                } else {
                    &frame.opener.text
                }
            );
            for (name, var) in &frame.vars {
                let shown = if var.initialized {
                    var.value.to_string()
                } else {
                    "(uninitialized)".to_string()
                };
                let _ = writeln!(out, "    {} {name} = {shown}", var.declared_type);
            }
        }
        out
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
