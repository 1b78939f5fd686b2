//! The bytecode reader.
//!
//! Wraps any `Read + Seek` stream (a `File` in the driver, an in-memory
//! `Cursor` in tests) behind the small random-access interface the
//! interpreter needs: byte/word/dword/qword big-endian reads, position
//! control, and decoding a flattened `EXPRESSION` object back into a
//! token list. Every sub-object is validated against its parent's
//! declared length before it is trusted.

use quillc_lex::opcodes::*;
use quillc_lex::{DataType, LangTerms, Token, TokenKind, Value};
use quillc_util::SrcPos;
use std::io::{Read, Seek, SeekFrom};
use thiserror::Error;

/// A structural problem in the object stream. Positions are byte
/// offsets into the file, since decoded objects carry no source
/// locations.
#[derive(Debug, Error)]
pub enum ObjError {
    /// The underlying stream failed.
    #[error("object file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A read ran past the end of the stream.
    #[error("object file ends unexpectedly at {pos:#x}")]
    UnexpectedEof { pos: u32 },
    /// A byte in opcode position matches no known opcode.
    #[error("unknown opcode {op_code:#04x} at {pos:#x}")]
    UnknownOpcode { op_code: u8, pos: u32 },
    /// The caller needed an `EXPRESSION` object and found something else.
    #[error("expected an expression object at {pos:#x}, found opcode {op_code:#04x}")]
    ExpectedExpression { op_code: u8, pos: u32 },
    /// A sub-object's declared extent crosses its parent's end.
    #[error("object at {pos:#x} overruns its parent's declared length")]
    BoundaryOverrun { pos: u32 },
    /// A flex header declares a length smaller than the header itself.
    #[error("flex object at {pos:#x} declares impossible length {len}")]
    BadLength { pos: u32, len: u32 },
    /// A string payload is odd-sized or not valid UTF-16.
    #[error("string payload at {pos:#x} is not valid UTF-16")]
    BadString { pos: u32 },
}

/// Random-access reader over a compiled object stream.
///
/// # Example
///
/// ```
/// use quillc_int::ObjReader;
/// use quillc_lex::{opcodes, LangTerms, Value};
/// use std::io::Cursor;
///
/// // an EXPRESSION object holding `[B+][UINT8 1]`
/// let mut obj = vec![opcodes::EXPRESSION_OPCODE];
/// obj.extend_from_slice(&8u32.to_be_bytes());
/// obj.extend_from_slice(&[opcodes::BINARY_PLUS_OPCODE, opcodes::UINT8_OPCODE, 1]);
///
/// let terms = LangTerms::new();
/// let mut reader = ObjReader::new(Cursor::new(obj), &terms);
/// let tokens = reader.read_expr_into_list().unwrap();
///
/// assert_eq!(tokens[0].op_code(), opcodes::BINARY_PLUS_OPCODE);
/// assert_eq!(tokens[1].value, Value::Uint8(1));
/// ```
pub struct ObjReader<'t, R: Read + Seek> {
    src: R,
    terms: &'t LangTerms,
}

impl<'t, R: Read + Seek> ObjReader<'t, R> {
    /// # Arguments
    ///
    /// * `src` - The object stream: a `File` in the driver, an in-memory
    ///   `Cursor` in tests
    /// * `terms` - The vocabulary for mapping opcodes back to symbols
    pub fn new(src: R, terms: &'t LangTerms) -> Self {
        Self { src, terms }
    }

    /// Current byte offset in the stream.
    pub fn pos(&mut self) -> Result<u32, ObjError> {
        Ok(self.src.stream_position()? as u32)
    }

    /// Jump to an absolute byte offset. The interpreter uses this both
    /// forward (length-skipping untaken blocks) and backward (loop
    /// iteration).
    pub fn set_pos(&mut self, pos: u32) -> Result<(), ObjError> {
        self.src.seek(SeekFrom::Start(pos as u64))?;
        Ok(())
    }

    /// True when no byte remains at the current position.
    pub fn is_eof(&mut self) -> Result<bool, ObjError> {
        Ok(self.peek_next_byte()?.is_none())
    }

    /// Read one byte, failing with the position on EOF.
    pub fn read_next_byte(&mut self) -> Result<u8, ObjError> {
        let mut buf = [0u8; 1];
        let pos = self.pos()?;
        self.src
            .read_exact(&mut buf)
            .map_err(|_| ObjError::UnexpectedEof { pos })?;
        Ok(buf[0])
    }

    /// One byte of lookahead; `None` at end of stream.
    pub fn peek_next_byte(&mut self) -> Result<Option<u8>, ObjError> {
        let mut buf = [0u8; 1];
        match self.src.read(&mut buf)? {
            0 => Ok(None),
            _ => {
                self.src.seek(SeekFrom::Current(-1))?;
                Ok(Some(buf[0]))
            }
        }
    }

    /// Read a big-endian 16-bit word.
    pub fn read_next_word(&mut self) -> Result<u16, ObjError> {
        let mut buf = [0u8; 2];
        let pos = self.pos()?;
        self.src
            .read_exact(&mut buf)
            .map_err(|_| ObjError::UnexpectedEof { pos })?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Read a big-endian 32-bit dword (the flex length field's width).
    pub fn read_next_dword(&mut self) -> Result<u32, ObjError> {
        let mut buf = [0u8; 4];
        let pos = self.pos()?;
        self.src
            .read_exact(&mut buf)
            .map_err(|_| ObjError::UnexpectedEof { pos })?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Read a big-endian 64-bit qword (wide literals, datetime,
    /// double bits).
    pub fn read_next_qword(&mut self) -> Result<u64, ObjError> {
        let mut buf = [0u8; 8];
        let pos = self.pos()?;
        self.src
            .read_exact(&mut buf)
            .map_err(|_| ObjError::UnexpectedEof { pos })?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Read the `[opcode][total_length]` header of a flex object sitting
    /// at the current position. Returns `(op_code, total_length)`.
    pub fn read_flex_header(&mut self) -> Result<(u8, u32), ObjError> {
        let pos = self.pos()?;
        let op_code = self.read_next_byte()?;
        let len = self.read_next_dword()?;
        if len < FLEX_OP_HEADER_NUM_BYTES {
            return Err(ObjError::BadLength { pos, len });
        }
        Ok((op_code, len))
    }

    /// UTF-16 payload of `payload_bytes` length at the current position.
    pub fn read_utf16_string(&mut self, payload_bytes: u32) -> Result<String, ObjError> {
        let pos = self.pos()?;
        if payload_bytes % 2 != 0 {
            return Err(ObjError::BadString { pos });
        }
        let mut units = Vec::with_capacity((payload_bytes / 2) as usize);
        for _ in 0..payload_bytes / 2 {
            units.push(self.read_next_word()?);
        }
        String::from_utf16(&units).map_err(|_| ObjError::BadString { pos })
    }

    /// Decode the `EXPRESSION` object at the current position into the
    /// flat token list the evaluator consumes. The position is left one
    /// past the expression object.
    ///
    /// Every sub-object must land entirely inside the expression's
    /// declared length; an empty payload (the `for` statement's empty
    /// clauses) decodes to an empty list.
    pub fn read_expr_into_list(&mut self) -> Result<Vec<Token>, ObjError> {
        let start = self.pos()?;
        let (op_code, total_len) = self.read_flex_header()?;
        if op_code != EXPRESSION_OPCODE {
            return Err(ObjError::ExpectedExpression {
                op_code,
                pos: start,
            });
        }
        let end = start + total_len;

        let mut tokens = Vec::new();
        while self.pos()? < end {
            tokens.push(self.read_expr_element(end)?);
        }
        if self.pos()? != end {
            return Err(ObjError::BoundaryOverrun { pos: start });
        }
        Ok(tokens)
    }

    /// One element of a flattened expression stream, dispatched by
    /// opcode range: atomic operators become exec-operator tokens,
    /// fixed-payload opcodes become typed literals, flex objects carry
    /// strings, names, date-times, doubles and system calls.
    fn read_expr_element(&mut self, parent_end: u32) -> Result<Token, ObjError> {
        let pos = self.pos()?;
        let op_code = self.read_next_byte()?;

        if is_atomic_opr8r_opcode(op_code) {
            let symbol = self
                .terms
                .symbol_for_opcode(op_code)
                .ok_or(ObjError::UnknownOpcode { op_code, pos })?;
            return Ok(Token::exec_opr8r(op_code, symbol, SrcPos::none()));
        }

        if is_fixed_payload_opcode(op_code) {
            let token = self.read_fixed_payload(op_code, pos)?;
            self.check_boundary(pos, parent_end)?;
            return Ok(token);
        }

        if is_flex_len_opcode(op_code) {
            // Re-read as a flex object from its start.
            self.set_pos(pos)?;
            let token = self.read_flex_element(parent_end)?;
            return Ok(token);
        }

        Err(ObjError::UnknownOpcode { op_code, pos })
    }

    fn read_fixed_payload(&mut self, op_code: u8, pos: u32) -> Result<Token, ObjError> {
        let value = match op_code {
            BOOL_DATA_OPCODE => Value::Bool(self.read_next_byte()? != 0),
            UINT8_OPCODE => Value::Uint8(self.read_next_byte()?),
            UINT16_OPCODE => Value::Uint16(self.read_next_word()?),
            UINT32_OPCODE => Value::Uint32(self.read_next_dword()?),
            UINT64_OPCODE => Value::Uint64(self.read_next_qword()?),
            INT8_OPCODE => Value::Int8(self.read_next_byte()? as i8),
            INT16_OPCODE => Value::Int16(self.read_next_word()? as i16),
            INT32_OPCODE => Value::Int32(self.read_next_dword()? as i32),
            INT64_OPCODE => Value::Int64(self.read_next_qword()? as i64),
            _ => return Err(ObjError::UnknownOpcode { op_code, pos }),
        };
        Ok(Token::from_value(value, SrcPos::none()))
    }

    /// Flex-length element inside an expression stream: strings, variable
    /// names, date-times, doubles, system calls.
    fn read_flex_element(&mut self, parent_end: u32) -> Result<Token, ObjError> {
        let start = self.pos()?;
        let (op_code, total_len) = self.read_flex_header()?;
        let payload_bytes = total_len - FLEX_OP_HEADER_NUM_BYTES;
        let obj_end = start + total_len;
        if obj_end > parent_end {
            return Err(ObjError::BoundaryOverrun { pos: start });
        }

        let token = match op_code {
            STRING_OPCODE => {
                let text = self.read_utf16_string(payload_bytes)?;
                Token::from_value(Value::Str(text), SrcPos::none())
            }
            VAR_NAME_OPCODE => {
                let name = self.read_utf16_string(payload_bytes)?;
                Token::new(TokenKind::UserWord, name, SrcPos::none())
            }
            DATETIME_OPCODE => {
                let epoch_ms = self.read_next_qword()? as i64;
                Token::from_value(Value::DateTime(epoch_ms), SrcPos::none())
            }
            DOUBLE_OPCODE => {
                let bits = self.read_next_qword()?;
                Token::from_value(Value::Double(f64::from_bits(bits)), SrcPos::none())
            }
            SYSTEM_CALL_OPCODE => {
                let name = self.read_utf16_string(payload_bytes)?;
                let mut tkn = Token::new(TokenKind::SystemCall, name, SrcPos::none());
                tkn.initialized = true;
                tkn
            }
            _ => {
                return Err(ObjError::UnknownOpcode {
                    op_code,
                    pos: start,
                })
            }
        };

        if self.pos()? != obj_end {
            return Err(ObjError::BoundaryOverrun { pos: start });
        }
        Ok(token)
    }

    /// Read a `VARIABLES_DECLARATION` data-type byte at the current
    /// position.
    pub fn read_data_type_opcode(&mut self) -> Result<DataType, ObjError> {
        let pos = self.pos()?;
        let op_code = self.read_next_byte()?;
        DataType::from_opcode(op_code).ok_or(ObjError::UnknownOpcode { op_code, pos })
    }

    fn check_boundary(&mut self, start: u32, parent_end: u32) -> Result<(), ObjError> {
        if self.pos()? > parent_end {
            return Err(ObjError::BoundaryOverrun { pos: start });
        }
        Ok(())
    }
}
