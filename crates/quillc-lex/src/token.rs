//! Tokens produced by the lexer and consumed by every later phase.
//!
//! A [`Token`] pairs a [`TokenKind`] discriminator with its source lexeme,
//! position, a [`Value`] payload (literals carry their parsed value, exec
//! operators carry their opcode) and an `initialized` flag. The evaluator
//! rewrites token slots in place while reducing a flat expression, so the
//! same type serves source tokens, bytecode-decoded tokens and computed
//! results.

use crate::opcodes::INVALID_OPCODE;
use crate::value::{DataType, Value};
use quillc_util::SrcPos;
use std::fmt;

/// What a token is. Kinds marked "transient" never survive into the
/// committed token stream; the lexer consumes and discards them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Transient: run of whitespace.
    WhiteSpace,
    /// Transient: `// ...` comment.
    LineComment,
    /// Transient: `/* ... */` comment.
    BlockComment,
    ReservedWord,
    DataType,
    UserWord,
    StringLit,
    DateTimeLit,
    BoolLit,
    U8Lit,
    U16Lit,
    U32Lit,
    U64Lit,
    I8Lit,
    I16Lit,
    I32Lit,
    I64Lit,
    DoubleLit,
    /// Operator as written in user source, pre-disambiguation.
    SrcOpr8r,
    /// Operator after classification; payload holds the opcode byte.
    ExecOpr8r,
    Separator,
    SystemCall,
    /// Generated marker with no user-source counterpart.
    InternalUse,
    EndOfStream,
    /// Malformed but committed so the parser can report it (`200Kbar`).
    Junk,
    /// Never legal in a committed stream; marks corrupted state.
    Broken,
}

impl TokenKind {
    /// Literal kinds — tokens whose payload is a resolved [`Value`].
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::TokenKind;
    ///
    /// assert!(TokenKind::I8Lit.is_literal());
    /// assert!(TokenKind::StringLit.is_literal());
    /// assert!(!TokenKind::UserWord.is_literal());
    /// ```
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::StringLit
                | TokenKind::DateTimeLit
                | TokenKind::BoolLit
                | TokenKind::U8Lit
                | TokenKind::U16Lit
                | TokenKind::U32Lit
                | TokenKind::U64Lit
                | TokenKind::I8Lit
                | TokenKind::I16Lit
                | TokenKind::I32Lit
                | TokenKind::I64Lit
                | TokenKind::DoubleLit
        )
    }

    /// Kinds the lexer eats without committing.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            TokenKind::WhiteSpace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// The literal kind that carries values of `dtype`.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{DataType, TokenKind};
    ///
    /// assert_eq!(TokenKind::for_data_type(DataType::Uint16), TokenKind::U16Lit);
    /// assert_eq!(TokenKind::for_data_type(DataType::Str), TokenKind::StringLit);
    /// ```
    pub fn for_data_type(dtype: DataType) -> TokenKind {
        match dtype {
            DataType::Bool => TokenKind::BoolLit,
            DataType::Uint8 => TokenKind::U8Lit,
            DataType::Uint16 => TokenKind::U16Lit,
            DataType::Uint32 => TokenKind::U32Lit,
            DataType::Uint64 => TokenKind::U64Lit,
            DataType::Int8 => TokenKind::I8Lit,
            DataType::Int16 => TokenKind::I16Lit,
            DataType::Int32 => TokenKind::I32Lit,
            DataType::Int64 => TokenKind::I64Lit,
            DataType::Double => TokenKind::DoubleLit,
            DataType::Str => TokenKind::StringLit,
            DataType::DateTime => TokenKind::DateTimeLit,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::WhiteSpace => "whitespace",
            TokenKind::LineComment => "line comment",
            TokenKind::BlockComment => "block comment",
            TokenKind::ReservedWord => "reserved word",
            TokenKind::DataType => "data type",
            TokenKind::UserWord => "identifier",
            TokenKind::StringLit => "string literal",
            TokenKind::DateTimeLit => "datetime literal",
            TokenKind::BoolLit => "bool literal",
            TokenKind::U8Lit => "uint8 literal",
            TokenKind::U16Lit => "uint16 literal",
            TokenKind::U32Lit => "uint32 literal",
            TokenKind::U64Lit => "uint64 literal",
            TokenKind::I8Lit => "int8 literal",
            TokenKind::I16Lit => "int16 literal",
            TokenKind::I32Lit => "int32 literal",
            TokenKind::I64Lit => "int64 literal",
            TokenKind::DoubleLit => "double literal",
            TokenKind::SrcOpr8r => "operator",
            TokenKind::ExecOpr8r => "exec operator",
            TokenKind::Separator => "separator",
            TokenKind::SystemCall => "system call",
            TokenKind::InternalUse => "internal",
            TokenKind::EndOfStream => "end of stream",
            TokenKind::Junk => "junk",
            TokenKind::Broken => "broken",
        };
        f.write_str(name)
    }
}

/// One token.
///
/// # Example
///
/// ```
/// use quillc_lex::{Token, Value};
/// use quillc_util::SrcPos;
///
/// let tkn = Token::from_value(Value::Int8(42), SrcPos::new("a.ql", 1, 10));
/// assert_eq!(tkn.text, "42");
/// assert!(tkn.is_direct_operand());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Lexeme as written in source, or the internal symbol for generated
    /// operators, or the variable name for bytecode-decoded names.
    pub text: String,
    pub pos: SrcPos,
    /// Parsed payload: the literal's value, or `Uint8(opcode)` for exec
    /// operators, or `Empty` for everything else.
    pub value: Value,
    pub initialized: bool,
}

impl Token {
    /// A token with no payload value (words, separators, raw operators).
    ///
    /// # Arguments
    ///
    /// * `kind` - What the token is
    /// * `text` - The lexeme as written in source
    /// * `pos` - Where it was found
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{Token, TokenKind, Value};
    /// use quillc_util::SrcPos;
    ///
    /// let tkn = Token::new(TokenKind::UserWord, "count", SrcPos::none());
    /// assert_eq!(tkn.value, Value::Empty);
    /// assert!(!tkn.initialized);
    /// ```
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: SrcPos) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
            value: Value::Empty,
            initialized: false,
        }
    }

    /// A literal token carrying `value`, with kind derived from the
    /// value's type.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{Token, TokenKind, Value};
    /// use quillc_util::SrcPos;
    ///
    /// let tkn = Token::from_value(Value::Uint16(600), SrcPos::none());
    /// assert_eq!(tkn.kind, TokenKind::U16Lit);
    /// assert_eq!(tkn.text, "600");
    /// assert!(tkn.initialized);
    /// ```
    pub fn from_value(value: Value, pos: SrcPos) -> Self {
        let kind = value
            .data_type()
            .map(TokenKind::for_data_type)
            .unwrap_or(TokenKind::Broken);
        Self {
            kind,
            text: value.to_string(),
            pos,
            value,
            initialized: true,
        }
    }

    /// A disambiguated operator carrying its opcode byte.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, Token};
    /// use quillc_util::SrcPos;
    ///
    /// let tkn = Token::exec_opr8r(opcodes::BINARY_PLUS_OPCODE, "B+", SrcPos::none());
    /// assert_eq!(tkn.op_code(), opcodes::BINARY_PLUS_OPCODE);
    /// assert!(tkn.is_opr8r());
    /// ```
    pub fn exec_opr8r(op_code: u8, symbol: impl Into<String>, pos: SrcPos) -> Self {
        Self {
            kind: TokenKind::ExecOpr8r,
            text: symbol.into(),
            pos,
            value: Value::Uint8(op_code),
            initialized: true,
        }
    }

    pub fn end_of_stream(pos: SrcPos) -> Self {
        Self::new(TokenKind::EndOfStream, "", pos)
    }

    /// Opcode byte of an exec operator; `INVALID_OPCODE` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, Token, Value};
    /// use quillc_util::SrcPos;
    ///
    /// let lit = Token::from_value(Value::Uint8(9), SrcPos::none());
    /// assert_eq!(lit.op_code(), opcodes::INVALID_OPCODE);
    /// ```
    pub fn op_code(&self) -> u8 {
        match (&self.kind, &self.value) {
            (TokenKind::ExecOpr8r, Value::Uint8(op)) => *op,
            _ => INVALID_OPCODE,
        }
    }

    /// A resolved value the evaluator can consume directly.
    pub fn is_direct_operand(&self) -> bool {
        self.kind.is_literal()
    }

    /// A direct operand or a variable name still needing resolution.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{Token, TokenKind};
    /// use quillc_util::SrcPos;
    ///
    /// let var = Token::new(TokenKind::UserWord, "count", SrcPos::none());
    /// assert!(var.is_operand());
    /// assert!(!var.is_direct_operand());
    /// ```
    pub fn is_operand(&self) -> bool {
        self.is_direct_operand() || self.kind == TokenKind::UserWord
    }

    pub fn is_opr8r(&self) -> bool {
        matches!(self.kind, TokenKind::SrcOpr8r | TokenKind::ExecOpr8r)
    }

    /// Overwrite this token in place with a computed result, keeping the
    /// original source position for diagnostics. This is how the
    /// evaluator turns an operator slot into its result.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{Token, TokenKind, Value};
    /// use quillc_util::SrcPos;
    ///
    /// let mut tkn = Token::new(TokenKind::UserWord, "count", SrcPos::new("a.ql", 7, 3));
    /// tkn.reset_to_value(Value::Int32(99999));
    /// assert_eq!(tkn.kind, TokenKind::I32Lit);
    /// assert_eq!(tkn.pos.line, 7);
    /// ```
    pub fn reset_to_value(&mut self, value: Value) {
        self.kind = value
            .data_type()
            .map(TokenKind::for_data_type)
            .unwrap_or(TokenKind::Broken);
        self.text = value.to_string();
        self.value = value;
        self.initialized = true;
    }

    /// Short human description without position, for diagnostics.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{Token, TokenKind};
    /// use quillc_util::SrcPos;
    ///
    /// let tkn = Token::new(TokenKind::UserWord, "count", SrcPos::none());
    /// assert_eq!(tkn.descr(), "identifier `count`");
    /// ```
    pub fn descr(&self) -> String {
        match self.kind {
            TokenKind::StringLit => format!("{} \"{}\"", self.kind, self.text),
            TokenKind::EndOfStream => self.kind.to_string(),
            _ => format!("{} `{}`", self.kind, self.text),
        }
    }

    /// Human description with position, for diagnostics.
    pub fn descr_with_pos(&self) -> String {
        if self.pos.is_known() {
            format!("{} at {}", self.descr(), self.pos)
        } else {
            self.descr()
        }
    }
}
