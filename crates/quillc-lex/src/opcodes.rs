//! Opcodes emitted by the compiler and consumed by the interpreter.
//!
//! The object format splits the byte space into four ranges:
//!
//! * `0x01..=0x2F` — atomic operator opcodes, one byte, no payload
//! * `0x30..=0x3F` — data-type opcodes, one byte
//! * `0x40..=0x5F` — fixed-payload literal opcodes (payload width is implied
//!   by the opcode)
//! * `0x60..=0x7F` — flex-length objects: `[opcode:1][total_length:4][payload]`
//!   where `total_length` is big-endian and covers header plus payload
//!
//! `BREAK` reuses the statement-ender byte; the two never appear in the same
//! context (one lives inside expressions, the other stands alone in a scope
//! body).

pub const INVALID_OPCODE: u8 = 0x00;

// Atomic operator opcodes.
pub const ATOMIC_OPCODE_RANGE_BEGIN: u8 = 0x01;
pub const ATOMIC_OPCODE_RANGE_END: u8 = 0x2F;

pub const POST_INCR_OPCODE: u8 = 0x01;
pub const POST_DECR_OPCODE: u8 = 0x02;
pub const PRE_INCR_OPCODE: u8 = 0x03;
pub const PRE_DECR_OPCODE: u8 = 0x04;
pub const UNARY_PLUS_OPCODE: u8 = 0x05;
pub const UNARY_MINUS_OPCODE: u8 = 0x06;
pub const LOGICAL_NOT_OPCODE: u8 = 0x07;
pub const BITWISE_NOT_OPCODE: u8 = 0x08;
pub const MULTIPLY_OPCODE: u8 = 0x09;
pub const DIV_OPCODE: u8 = 0x0A;
pub const MOD_OPCODE: u8 = 0x0B;
pub const BINARY_PLUS_OPCODE: u8 = 0x0C;
pub const BINARY_MINUS_OPCODE: u8 = 0x0D;
pub const LEFT_SHIFT_OPCODE: u8 = 0x0E;
pub const RIGHT_SHIFT_OPCODE: u8 = 0x0F;
pub const LESS_THAN_OPCODE: u8 = 0x10;
pub const LESS_EQUALS_OPCODE: u8 = 0x11;
pub const GREATER_THAN_OPCODE: u8 = 0x12;
pub const GREATER_EQUALS_OPCODE: u8 = 0x13;
pub const EQUALITY_OPCODE: u8 = 0x14;
pub const NOT_EQUALS_OPCODE: u8 = 0x15;
pub const BITWISE_AND_OPCODE: u8 = 0x16;
pub const BITWISE_XOR_OPCODE: u8 = 0x17;
pub const BITWISE_OR_OPCODE: u8 = 0x18;
pub const LOGICAL_AND_OPCODE: u8 = 0x19;
pub const LOGICAL_OR_OPCODE: u8 = 0x1A;
pub const TERNARY_1ST_OPCODE: u8 = 0x1B;
pub const TERNARY_2ND_OPCODE: u8 = 0x1C;
pub const ASSIGNMENT_OPCODE: u8 = 0x1D;
pub const PLUS_ASSIGN_OPCODE: u8 = 0x1E;
pub const MINUS_ASSIGN_OPCODE: u8 = 0x1F;
pub const MULTIPLY_ASSIGN_OPCODE: u8 = 0x20;
pub const DIV_ASSIGN_OPCODE: u8 = 0x21;
pub const MOD_ASSIGN_OPCODE: u8 = 0x22;
pub const LEFT_SHIFT_ASSIGN_OPCODE: u8 = 0x23;
pub const RIGHT_SHIFT_ASSIGN_OPCODE: u8 = 0x24;
pub const BITWISE_AND_ASSIGN_OPCODE: u8 = 0x25;
pub const BITWISE_XOR_ASSIGN_OPCODE: u8 = 0x26;
pub const BITWISE_OR_ASSIGN_OPCODE: u8 = 0x27;
pub const STATEMENT_ENDER_OPCODE: u8 = 0x28;
pub const LAST_VALID_OPR8R_OPCODE: u8 = 0x28;

/// Stand-alone `break` statement. Shares the statement-ender byte;
/// distinguished by position (scope body vs. expression stream).
pub const BREAK_OPCODE: u8 = 0x28;

// Data-type opcodes.
pub const FIRST_VALID_DATA_TYPE_OPCODE: u8 = 0x30;
pub const DATA_TYPE_UINT8_OPCODE: u8 = 0x30;
pub const DATA_TYPE_UINT16_OPCODE: u8 = 0x31;
pub const DATA_TYPE_UINT32_OPCODE: u8 = 0x32;
pub const DATA_TYPE_UINT64_OPCODE: u8 = 0x33;
pub const DATA_TYPE_INT8_OPCODE: u8 = 0x34;
pub const DATA_TYPE_INT16_OPCODE: u8 = 0x35;
pub const DATA_TYPE_INT32_OPCODE: u8 = 0x36;
pub const DATA_TYPE_INT64_OPCODE: u8 = 0x37;
pub const DATA_TYPE_STRING_OPCODE: u8 = 0x38;
pub const DATA_TYPE_DATETIME_OPCODE: u8 = 0x39;
pub const DATA_TYPE_DOUBLE_OPCODE: u8 = 0x3A;
pub const DATA_TYPE_BOOL_OPCODE: u8 = 0x3B;
pub const LAST_VALID_DATA_TYPE_OPCODE: u8 = 0x3B;

// Fixed-payload literal opcodes. The payload width grows with each block
// of eight: 8-bit payloads start at 0x40, 16-bit at 0x48, 32-bit at 0x50,
// 64-bit at 0x58.
pub const FIXED_OPCODE_RANGE_BEGIN: u8 = 0x40;
pub const FIXED_OPCODE_RANGE_END: u8 = 0x5F;

pub const UINT8_OPCODE: u8 = 0x40;
pub const INT8_OPCODE: u8 = 0x42;
pub const BOOL_DATA_OPCODE: u8 = 0x43;
pub const UINT16_OPCODE: u8 = 0x48;
pub const INT16_OPCODE: u8 = 0x49;
pub const UINT32_OPCODE: u8 = 0x50;
pub const INT32_OPCODE: u8 = 0x51;
pub const UINT64_OPCODE: u8 = 0x58;
pub const INT64_OPCODE: u8 = 0x59;

// Flex-length object opcodes: [opcode:1][total_length:4][payload].
pub const FLEX_OP_LEN_FLD_NUM_BYTES: u32 = 4;
pub const FLEX_OP_HEADER_NUM_BYTES: u32 = 5;
pub const FIRST_VALID_FLEX_LEN_OPCODE: u8 = 0x60;

pub const STRING_OPCODE: u8 = 0x60;
pub const VAR_NAME_OPCODE: u8 = 0x61;
pub const DATETIME_OPCODE: u8 = 0x62;
pub const DOUBLE_OPCODE: u8 = 0x63;

pub const EXPRESSION_OPCODE: u8 = 0x68;
pub const IF_SCOPE_OPCODE: u8 = 0x69;
pub const ELSE_IF_SCOPE_OPCODE: u8 = 0x6A;
pub const ELSE_SCOPE_OPCODE: u8 = 0x6B;
pub const WHILE_SCOPE_OPCODE: u8 = 0x6C;
pub const FOR_SCOPE_OPCODE: u8 = 0x6D;
pub const ANON_SCOPE_OPCODE: u8 = 0x6E;
pub const VARIABLES_DECLARATION_OPCODE: u8 = 0x6F;
pub const USER_FXN_DECLARATION_OPCODE: u8 = 0x70;
pub const USER_FXN_CALL_OPCODE: u8 = 0x71;
pub const SYSTEM_CALL_OPCODE: u8 = 0x72;
pub const LAST_VALID_FLEX_LEN_OPCODE: u8 = 0x72;

/// True for one-byte operator opcodes.
///
/// # Example
///
/// ```
/// use quillc_lex::opcodes;
///
/// assert!(opcodes::is_atomic_opr8r_opcode(opcodes::BINARY_PLUS_OPCODE));
/// assert!(!opcodes::is_atomic_opr8r_opcode(opcodes::EXPRESSION_OPCODE));
/// ```
pub fn is_atomic_opr8r_opcode(op: u8) -> bool {
    (ATOMIC_OPCODE_RANGE_BEGIN..=LAST_VALID_OPR8R_OPCODE).contains(&op)
}

/// True for one-byte data-type opcodes.
pub fn is_data_type_opcode(op: u8) -> bool {
    (FIRST_VALID_DATA_TYPE_OPCODE..=LAST_VALID_DATA_TYPE_OPCODE).contains(&op)
}

/// True for fixed-payload literal opcodes.
pub fn is_fixed_payload_opcode(op: u8) -> bool {
    (FIXED_OPCODE_RANGE_BEGIN..=FIXED_OPCODE_RANGE_END).contains(&op)
}

/// True for flex-length object opcodes.
///
/// # Example
///
/// ```
/// use quillc_lex::opcodes;
///
/// assert!(opcodes::is_flex_len_opcode(opcodes::STRING_OPCODE));
/// assert!(opcodes::is_flex_len_opcode(opcodes::FOR_SCOPE_OPCODE));
/// assert!(!opcodes::is_flex_len_opcode(opcodes::UINT8_OPCODE));
/// ```
pub fn is_flex_len_opcode(op: u8) -> bool {
    (FIRST_VALID_FLEX_LEN_OPCODE..=LAST_VALID_FLEX_LEN_OPCODE).contains(&op)
}

/// Payload byte width of a fixed-payload literal opcode.
///
/// The width is implied by the opcode's position in the range: each
/// block of eight doubles the payload.
///
/// # Example
///
/// ```
/// use quillc_lex::opcodes;
///
/// assert_eq!(opcodes::fixed_payload_num_bytes(opcodes::UINT8_OPCODE), Some(1));
/// assert_eq!(opcodes::fixed_payload_num_bytes(opcodes::INT64_OPCODE), Some(8));
/// assert_eq!(opcodes::fixed_payload_num_bytes(opcodes::EXPRESSION_OPCODE), None);
/// ```
pub fn fixed_payload_num_bytes(op: u8) -> Option<u32> {
    if !is_fixed_payload_opcode(op) {
        return None;
    }
    Some(match (op - FIXED_OPCODE_RANGE_BEGIN) / 8 {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 8,
    })
}

// The range split is load-bearing for the reader's dispatch; pin it.
use static_assertions::const_assert;
const_assert!(LAST_VALID_OPR8R_OPCODE < FIRST_VALID_DATA_TYPE_OPCODE);
const_assert!(LAST_VALID_DATA_TYPE_OPCODE < FIXED_OPCODE_RANGE_BEGIN);
const_assert!(FIXED_OPCODE_RANGE_END < FIRST_VALID_FLEX_LEN_OPCODE);
const_assert!(STATEMENT_ENDER_OPCODE == BREAK_OPCODE);
