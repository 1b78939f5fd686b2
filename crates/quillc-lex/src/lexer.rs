//! The lexer: UTF-8 source bytes to a committed token stream.
//!
//! A character-level state machine with one character of lookahead.
//! Whitespace and comments are consumed but never committed. Every
//! committed token goes through a final-resolution step that settles the
//! ambiguous cases: numeric literals pick their smallest fitting width,
//! strings that parse as date-times become date-time literals, user words
//! are checked against the data-type / reserved-word / system-call sets,
//! and accumulated operator text is validated against the table. Malformed
//! but recoverable text commits as `Junk` so the parser can report it in
//! context; structural problems (unterminated string or comment, invalid
//! UTF-8) are fatal here.

use crate::cursor::Cursor;
use crate::terms::{LangTerms, USR_SRC};
use crate::token::{Token, TokenKind};
use crate::value::{self, Value};
use quillc_util::SrcPos;
use std::sync::Arc;
use thiserror::Error;

/// Fatal lexing failure. Unlike `Junk` tokens, these leave no sensible
/// way to keep scanning: the rest of the file's meaning is gone.
#[derive(Debug, Error)]
pub enum LexError {
    /// The byte stream is not UTF-8; `offset` is where decoding broke.
    #[error("{file} is not valid UTF-8 (byte offset {offset})")]
    InvalidUtf8 { file: String, offset: usize },
    /// A `"` was never closed before the end of the file.
    #[error("unterminated string literal starting at {pos}")]
    UnterminatedString { pos: SrcPos },
    /// A `/*` was never closed before the end of the file.
    #[error("unterminated block comment starting at {pos}")]
    UnterminatedBlockComment { pos: SrcPos },
}

/// Tokenize raw bytes, rejecting invalid UTF-8 with a fatal error.
///
/// # Arguments
///
/// * `bytes` - The source file's raw content
/// * `file_name` - Name carried into every token's position
/// * `terms` - The language vocabulary
///
/// # Example
///
/// ```
/// use quillc_lex::{tokenize_bytes, LangTerms, LexError};
///
/// let terms = LangTerms::new();
/// assert!(tokenize_bytes(b"int8 a = 1;", "a.ql", &terms).is_ok());
///
/// let err = tokenize_bytes(&[b'a', 0xFF], "a.ql", &terms).unwrap_err();
/// assert!(matches!(err, LexError::InvalidUtf8 { .. }));
/// ```
pub fn tokenize_bytes(
    bytes: &[u8],
    file_name: &str,
    terms: &LangTerms,
) -> Result<Vec<Token>, LexError> {
    let source = std::str::from_utf8(bytes).map_err(|e| LexError::InvalidUtf8 {
        file: file_name.to_string(),
        offset: e.valid_up_to(),
    })?;
    tokenize(source, file_name, terms)
}

/// Tokenize source text into a stream ending with an `EndOfStream` token.
///
/// Whitespace and comments never reach the output; malformed text
/// commits as `Junk` tokens for the parser to report in context.
///
/// # Arguments
///
/// * `source` - The source text
/// * `file_name` - Name carried into every token's position
/// * `terms` - The language vocabulary
///
/// # Example
///
/// ```
/// use quillc_lex::{tokenize, LangTerms, TokenKind};
///
/// let terms = LangTerms::new();
/// let tokens = tokenize("int8 count = 3;", "a.ql", &terms).unwrap();
///
/// let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::DataType,
///         TokenKind::UserWord,
///         TokenKind::SrcOpr8r,
///         TokenKind::I8Lit,
///         TokenKind::SrcOpr8r,
///         TokenKind::EndOfStream,
///     ]
/// );
/// ```
pub fn tokenize(source: &str, file_name: &str, terms: &LangTerms) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, file_name, terms).run()
}

/// The lexer's working state: a cursor over the source, the vocabulary
/// for classification, and the tokens committed so far.
struct Lexer<'a> {
    cursor: Cursor<'a>,
    terms: &'a LangTerms,
    file: Arc<str>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file_name: &str, terms: &'a LangTerms) -> Self {
        Self {
            cursor: Cursor::new(source),
            terms,
            file: Arc::from(file_name),
            tokens: Vec::new(),
        }
    }

    /// The position a token starting at the cursor would carry.
    fn src_pos(&self) -> SrcPos {
        SrcPos {
            file: Arc::clone(&self.file),
            line: self.cursor.line(),
            col: self.cursor.column(),
        }
    }

    /// The main state machine: one dispatch per fresh character, each
    /// handler consuming a whole token (or a whole run of whitespace or
    /// comment, which commits nothing).
    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while !self.cursor.is_at_end() {
            let c = self.cursor.current();
            if c.is_whitespace() {
                self.cursor.advance();
            } else if c.is_alphabetic() || c == '_' {
                self.lex_word();
            } else if c.is_ascii_digit() {
                self.lex_number();
            } else if c == '"' {
                self.lex_string()?;
            } else if c == '/' && self.cursor.peek() == '*' {
                self.lex_block_comment()?;
            } else if c == '/' && self.cursor.peek() == '/' {
                self.lex_line_comment();
            } else if self.terms.is_spr8r_char(c) {
                let pos = self.src_pos();
                self.cursor.advance();
                self.tokens
                    .push(Token::new(TokenKind::Separator, c.to_string(), pos));
            } else if self.terms.is_atomic_opr8r_char(c) {
                let pos = self.src_pos();
                self.cursor.advance();
                self.tokens
                    .push(Token::new(TokenKind::SrcOpr8r, c.to_string(), pos));
            } else if self.terms.is_opr8r_char(c) {
                self.lex_opr8r();
            } else {
                // Nothing in the language starts with this character.
                let pos = self.src_pos();
                self.cursor.advance();
                self.tokens
                    .push(Token::new(TokenKind::Junk, c.to_string(), pos));
            }
        }
        self.tokens.push(Token::end_of_stream(self.src_pos()));
        Ok(self.tokens)
    }

    /// Identifier-shaped text: data type, bool literal, reserved word,
    /// system call, or plain user word.
    fn lex_word(&mut self) {
        let pos = self.src_pos();
        let start = self.cursor.position();
        while self.cursor.current().is_alphanumeric() || self.cursor.current() == '_' {
            self.cursor.advance();
        }
        let word = self.cursor.slice_from(start);

        let mut tkn = if self.terms.is_data_type_name(word) {
            Token::new(TokenKind::DataType, word, pos)
        } else if word == "true" || word == "false" {
            let mut t = Token::new(TokenKind::BoolLit, word, pos);
            t.value = Value::Bool(word == "true");
            t.initialized = true;
            t
        } else if self.terms.is_reserved_word(word) {
            Token::new(TokenKind::ReservedWord, word, pos)
        } else if self.terms.system_call(word).is_some() {
            Token::new(TokenKind::SystemCall, word, pos)
        } else {
            Token::new(TokenKind::UserWord, word, pos)
        };
        if tkn.kind == TokenKind::SystemCall {
            tkn.initialized = true;
        }
        self.tokens.push(tkn);
    }

    /// Numeric literal: `0x` hex (unsigned), decimal integer (signed), or
    /// decimal with a fraction part (double). Trailing identifier
    /// characters poison the token into `Junk` (`200Kbar`).
    fn lex_number(&mut self) {
        let pos = self.src_pos();
        let start = self.cursor.position();

        let is_hex = self.cursor.current() == '0'
            && matches!(self.cursor.peek(), 'x' | 'X');
        if is_hex {
            self.cursor.advance();
            self.cursor.advance();
            while self.cursor.current().is_alphanumeric() || self.cursor.current() == '_' {
                self.cursor.advance();
            }
            let text = self.cursor.slice_from(start);
            self.tokens.push(resolve_hex_literal(text, pos));
            return;
        }

        while self.cursor.current().is_ascii_digit() {
            self.cursor.advance();
        }
        let mut is_double = false;
        if self.cursor.current() == '.' && self.cursor.peek().is_ascii_digit() {
            is_double = true;
            self.cursor.advance();
            while self.cursor.current().is_ascii_digit() {
                self.cursor.advance();
            }
        }
        // A digit run bleeding into word characters is junk, not two
        // tokens.
        let mut is_junk = false;
        while self.cursor.current().is_alphanumeric() || self.cursor.current() == '_' {
            is_junk = true;
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        let tkn = if is_junk {
            Token::new(TokenKind::Junk, text, pos)
        } else if is_double {
            resolve_double_literal(text, pos)
        } else {
            resolve_decimal_literal(text, pos)
        };
        self.tokens.push(tkn);
    }

    /// Double-quoted string; `\"` is the only recognized escape. Commits
    /// as a date-time literal when the contents parse as one.
    fn lex_string(&mut self) -> Result<(), LexError> {
        let pos = self.src_pos();
        self.cursor.advance(); // opening quote
        let mut contents = String::new();
        loop {
            let c = self.cursor.current();
            if self.cursor.is_at_end() {
                return Err(LexError::UnterminatedString { pos });
            }
            if c == '\\' && self.cursor.peek() == '"' {
                contents.push('"');
                self.cursor.advance();
                self.cursor.advance();
            } else if c == '"' {
                self.cursor.advance();
                break;
            } else {
                contents.push(c);
                self.cursor.advance();
            }
        }

        let mut tkn = match value::parse_date_time(&contents) {
            Some(epoch_ms) => {
                let mut t = Token::new(TokenKind::DateTimeLit, contents, pos);
                t.value = Value::DateTime(epoch_ms);
                t
            }
            None => {
                let mut t = Token::new(TokenKind::StringLit, contents.clone(), pos);
                t.value = Value::Str(contents);
                t
            }
        };
        tkn.initialized = true;
        self.tokens.push(tkn);
        Ok(())
    }

    /// `// ...` — consumed to the line end; the newline itself is left
    /// for the whitespace handler so line counting stays in one place.
    fn lex_line_comment(&mut self) {
        while !self.cursor.is_at_end() && !matches!(self.cursor.current(), '\n' | '\r') {
            self.cursor.advance();
        }
    }

    /// `/* ... */` — consumed through the first `*/`; block comments do
    /// not nest. Running off the end of the file is fatal.
    fn lex_block_comment(&mut self) -> Result<(), LexError> {
        let pos = self.src_pos();
        self.cursor.advance(); // '/'
        self.cursor.advance(); // '*'
        loop {
            if self.cursor.is_at_end() {
                return Err(LexError::UnterminatedBlockComment { pos });
            }
            if self.cursor.current() == '*' && self.cursor.peek() == '/' {
                self.cursor.advance();
                self.cursor.advance();
                return Ok(());
            }
            self.cursor.advance();
        }
    }

    /// Accumulate operator characters while the run is still a prefix of
    /// some operator symbol, then validate the result.
    fn lex_opr8r(&mut self) {
        let pos = self.src_pos();
        let mut symbol = String::new();
        symbol.push(self.cursor.current());
        self.cursor.advance();
        loop {
            let c = self.cursor.current();
            if c == '\0' || !self.terms.is_opr8r_char(c) {
                break;
            }
            symbol.push(c);
            if !self.terms.could_extend_opr8r(&symbol) {
                symbol.pop();
                break;
            }
            self.cursor.advance();
        }

        let kind = if self.terms.is_valid_opr8r(&symbol, USR_SRC) {
            TokenKind::SrcOpr8r
        } else {
            TokenKind::Junk
        };
        self.tokens.push(Token::new(kind, symbol, pos));
    }
}

/// A literal token keeping the original lexeme text.
fn literal_token(value: Value, text: &str, pos: SrcPos) -> Token {
    let mut tkn = Token::new(TokenKind::Junk, text, pos);
    tkn.reset_to_value(value);
    tkn.text = text.to_string();
    tkn
}

/// `0x...` — unsigned, 3 to 18 characters including the prefix, hex
/// digits only, smallest fitting unsigned width.
fn resolve_hex_literal(text: &str, pos: SrcPos) -> Token {
    let digits = &text[2..];
    let well_formed = (3..=18).contains(&text.len())
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_hexdigit());
    if !well_formed {
        return Token::new(TokenKind::Junk, text, pos);
    }
    match u64::from_str_radix(digits, 16) {
        Ok(n) => literal_token(Value::from_unsigned(n), text, pos),
        Err(_) => Token::new(TokenKind::Junk, text, pos),
    }
}

/// Decimal integer — signed, smallest fitting signed width.
fn resolve_decimal_literal(text: &str, pos: SrcPos) -> Token {
    match text.parse::<i64>() {
        Ok(n) => literal_token(Value::from_signed(n), text, pos),
        Err(_) => Token::new(TokenKind::Junk, text, pos),
    }
}

fn resolve_double_literal(text: &str, pos: SrcPos) -> Token {
    match text.parse::<f64>() {
        Ok(d) => literal_token(Value::Double(d), text, pos),
        Err(_) => Token::new(TokenKind::Junk, text, pos),
    }
}
