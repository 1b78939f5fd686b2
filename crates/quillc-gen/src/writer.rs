//! The bytecode writer.
//!
//! Mirror image of the interpreter's reader: emits opcode-prefixed
//! objects over any `Write + Seek` sink. Flex-length objects are written
//! with a zero length placeholder that [`ObjWriter::write_flex_end`]
//! back-patches once the payload size is known — the only place the
//! writer ever seeks backwards. All multi-byte numbers are big-endian;
//! strings go out as length-prefixed UTF-16 code units.

use quillc_lex::opcodes::*;
use quillc_lex::{Token, TokenKind, Value};
use std::io::{Seek, SeekFrom, Write};
use thiserror::Error;

/// Emission failure: either the sink broke, or the compiler tried to
/// emit a token kind with no object representation (a source operator
/// that was never disambiguated, a whitespace token that leaked).
#[derive(Debug, Error)]
pub enum WriterError {
    /// The underlying sink failed.
    #[error("object file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The token has no encoding in the format.
    #[error("token `{text}` cannot be emitted into the object stream")]
    UnsupportedToken { text: String },
}

/// Sequential writer with length back-patching.
///
/// # Example
///
/// ```
/// use quillc_gen::ObjWriter;
/// use quillc_lex::opcodes;
/// use std::io::Cursor;
///
/// let mut w = ObjWriter::new(Cursor::new(Vec::new()));
/// let start = w.write_flex_begin(opcodes::EXPRESSION_OPCODE).unwrap();
/// w.write_fixed(opcodes::UINT8_OPCODE, 9).unwrap();
/// let total = w.write_flex_end(start).unwrap();
/// assert_eq!(total, 7); // 5 header + 2 payload
///
/// let bytes = w.into_inner().into_inner();
/// assert_eq!(&bytes[1..5], &7u32.to_be_bytes());
/// ```
pub struct ObjWriter<W: Write + Seek> {
    out: W,
}

impl<W: Write + Seek> ObjWriter<W> {
    /// # Arguments
    ///
    /// * `out` - The object sink: a `File` in the driver, an in-memory
    ///   `Cursor` in tests
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Hand the sink back (driver flushes/closes it).
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Current byte offset in the sink.
    pub fn pos(&mut self) -> Result<u32, WriterError> {
        Ok(self.out.stream_position()? as u32)
    }

    /// One raw byte (the declaration's data-type opcode, for instance).
    pub fn write_byte(&mut self, byte: u8) -> Result<(), WriterError> {
        self.out.write_all(&[byte])?;
        Ok(())
    }

    /// One-byte operator or data-type opcode; no payload.
    pub fn write_atomic(&mut self, op_code: u8) -> Result<(), WriterError> {
        self.write_byte(op_code)
    }

    /// Fixed-payload literal: the opcode implies the width, and the
    /// payload goes out big-endian.
    ///
    /// # Arguments
    ///
    /// * `op_code` - A fixed-payload opcode (`UINT8_OPCODE`, ...)
    /// * `payload` - The value bits, low bytes used per the width
    pub fn write_fixed(&mut self, op_code: u8, payload: u64) -> Result<(), WriterError> {
        let width = fixed_payload_num_bytes(op_code).ok_or(WriterError::UnsupportedToken {
            text: format!("opcode {op_code:#04x}"),
        })?;
        self.write_byte(op_code)?;
        let bytes = payload.to_be_bytes();
        self.out.write_all(&bytes[8 - width as usize..])?;
        Ok(())
    }

    /// Open a flex-length object: opcode plus a zeroed 32-bit length to
    /// be patched later. Returns the object's start position, which the
    /// matching [`write_flex_end`](Self::write_flex_end) takes back.
    pub fn write_flex_begin(&mut self, op_code: u8) -> Result<u32, WriterError> {
        let start = self.pos()?;
        self.write_byte(op_code)?;
        self.out.write_all(&0u32.to_be_bytes())?;
        Ok(start)
    }

    /// Close a flex-length object: compute current − start and back-patch
    /// the placeholder. The total length covers header plus payload.
    pub fn write_flex_end(&mut self, start_pos: u32) -> Result<u32, WriterError> {
        let end = self.pos()?;
        let total_len = end - start_pos;
        self.out.seek(SeekFrom::Start(start_pos as u64 + 1))?;
        self.out.write_all(&total_len.to_be_bytes())?;
        self.out.seek(SeekFrom::Start(end as u64))?;
        Ok(total_len)
    }

    /// A flex object whose payload is a UTF-16 string (two big-endian
    /// bytes per code unit).
    ///
    /// # Arguments
    ///
    /// * `op_code` - `STRING_OPCODE`, `VAR_NAME_OPCODE` or
    ///   `SYSTEM_CALL_OPCODE`
    /// * `text` - The string to encode
    pub fn write_string(&mut self, op_code: u8, text: &str) -> Result<(), WriterError> {
        let start = self.write_flex_begin(op_code)?;
        for unit in text.encode_utf16() {
            self.out.write_all(&unit.to_be_bytes())?;
        }
        self.write_flex_end(start)?;
        Ok(())
    }

    /// A `USER_VAR` (variable name) object.
    pub fn write_user_var(&mut self, name: &str) -> Result<(), WriterError> {
        self.write_string(VAR_NAME_OPCODE, name)
    }

    /// A lone `break` statement.
    pub fn write_break(&mut self) -> Result<(), WriterError> {
        self.write_byte(BREAK_OPCODE)
    }

    /// A resolved literal value: integers and bools go out as
    /// fixed-payload opcodes at their exact width, strings as UTF-16
    /// flex objects, doubles as IEEE-754 bits and date-times as epoch
    /// milliseconds (8 big-endian bytes each).
    pub fn write_value(&mut self, value: &Value) -> Result<(), WriterError> {
        match value {
            Value::Bool(b) => self.write_fixed(BOOL_DATA_OPCODE, *b as u64),
            Value::Uint8(n) => self.write_fixed(UINT8_OPCODE, *n as u64),
            Value::Uint16(n) => self.write_fixed(UINT16_OPCODE, *n as u64),
            Value::Uint32(n) => self.write_fixed(UINT32_OPCODE, *n as u64),
            Value::Uint64(n) => self.write_fixed(UINT64_OPCODE, *n),
            Value::Int8(n) => self.write_fixed(INT8_OPCODE, *n as u8 as u64),
            Value::Int16(n) => self.write_fixed(INT16_OPCODE, *n as u16 as u64),
            Value::Int32(n) => self.write_fixed(INT32_OPCODE, *n as u32 as u64),
            Value::Int64(n) => self.write_fixed(INT64_OPCODE, *n as u64),
            Value::Str(s) => self.write_string(STRING_OPCODE, s),
            Value::Double(d) => {
                let start = self.write_flex_begin(DOUBLE_OPCODE)?;
                self.out.write_all(&d.to_bits().to_be_bytes())?;
                self.write_flex_end(start)?;
                Ok(())
            }
            Value::DateTime(ms) => {
                let start = self.write_flex_begin(DATETIME_OPCODE)?;
                self.out.write_all(&(*ms as u64).to_be_bytes())?;
                self.write_flex_end(start)?;
                Ok(())
            }
            Value::Empty => Err(WriterError::UnsupportedToken {
                text: "(empty value)".into(),
            }),
        }
    }

    /// One element of a flattened expression: exec operators as their
    /// atomic opcode byte, variable names as `USER_VAR` objects, system
    /// calls by name, literals via [`write_value`](Self::write_value).
    pub fn write_token(&mut self, tkn: &Token) -> Result<(), WriterError> {
        match tkn.kind {
            TokenKind::ExecOpr8r => self.write_atomic(tkn.op_code()),
            TokenKind::UserWord => self.write_user_var(&tkn.text),
            TokenKind::SystemCall => self.write_string(SYSTEM_CALL_OPCODE, &tkn.text),
            kind if kind.is_literal() => self.write_value(&tkn.value),
            _ => Err(WriterError::UnsupportedToken {
                text: tkn.text.clone(),
            }),
        }
    }

    /// A whole flattened expression as one `EXPRESSION` object. Source
    /// operators must have been converted to exec operators already.
    pub fn write_flat_expr(&mut self, tkns: &[Token]) -> Result<u32, WriterError> {
        let start = self.write_flex_begin(EXPRESSION_OPCODE)?;
        for tkn in tkns {
            self.write_token(tkn)?;
        }
        self.write_flex_end(start)?;
        Ok(start)
    }
}
