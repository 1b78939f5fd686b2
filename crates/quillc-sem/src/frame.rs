//! A single scope frame.

use indexmap::IndexMap;
use quillc_lex::{DataType, Token, Value};

/// One declared variable: its declared type pins what assignments must
/// coerce into; `initialized` stays down until the first committed write.
///
/// # Example
///
/// ```
/// use quillc_lex::{DataType, Value};
/// use quillc_sem::Variable;
///
/// let var = Variable::declared(DataType::Int8);
/// assert_eq!(var.value, Value::Int8(0));
/// assert!(!var.initialized);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub declared_type: DataType,
    pub value: Value,
    pub initialized: bool,
}

impl Variable {
    /// A fresh declaration: typed default value, uninitialized.
    ///
    /// # Arguments
    ///
    /// * `declared_type` - The type named in the declaration statement
    pub fn declared(declared_type: DataType) -> Self {
        Self {
            declared_type,
            value: declared_type.default_value(),
            initialized: false,
        }
    }
}

/// One frame on the scope stack.
#[derive(Debug, PartialEq)]
pub struct ScopeFrame {
    /// Opcode of the construct that opened this scope (`IF_SCOPE`,
    /// `WHILE_SCOPE`, ..., `ANON_SCOPE` for the root and bare blocks).
    pub opener_opcode: u8,
    /// The token that introduced the scope, for diagnostics.
    pub opener: Token,
    /// Byte offset of the scope's object in the compiled output; 0 when
    /// unknown at open time.
    pub begin_pos: u32,
    /// One past the last byte of the scope's object; 0 when unknown.
    pub end_pos: u32,
    /// name -> variable, in declaration order.
    pub vars: IndexMap<String, Variable>,
    /// How many `break` statements target this frame (loop frames only).
    pub loop_break_cnt: u32,
    /// Whether a `for` frame carries a non-empty condition expression.
    pub has_for_condition: bool,
}

impl ScopeFrame {
    /// Opens a frame for the construct at `begin_pos` spanning `len`
    /// bytes of the emitted object; pass `len == 0` when the extent is
    /// unknown (compile time, before back-patching).
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, Token, TokenKind};
    /// use quillc_sem::ScopeFrame;
    /// use quillc_util::SrcPos;
    ///
    /// let opener = Token::new(TokenKind::ReservedWord, "while", SrcPos::none());
    /// let frame = ScopeFrame::new(opcodes::WHILE_SCOPE_OPCODE, opener, 40, 12);
    /// assert_eq!(frame.end_pos, 52);
    /// assert!(frame.is_loop());
    /// ```
    pub fn new(opener_opcode: u8, opener: Token, begin_pos: u32, len: u32) -> Self {
        let end_pos = if len == 0 { 0 } else { begin_pos + len };
        Self {
            opener_opcode,
            opener,
            begin_pos,
            end_pos,
            vars: IndexMap::new(),
            loop_break_cnt: 0,
            has_for_condition: false,
        }
    }

    /// Is this frame a `while` or `for` body?
    pub fn is_loop(&self) -> bool {
        self.opener_opcode == quillc_lex::opcodes::WHILE_SCOPE_OPCODE
            || self.opener_opcode == quillc_lex::opcodes::FOR_SCOPE_OPCODE
    }
}
