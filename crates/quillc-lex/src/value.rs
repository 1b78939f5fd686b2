//! Runtime values and the primitive type system.
//!
//! A [`Value`] is the tagged union every literal, variable and expression
//! result reduces to. Integer variants keep the smallest width that holds
//! the number; signedness is preserved from the declaration or literal
//! form. Comparison, promotion arithmetic and assignment coercion live
//! here as methods so the evaluator stays a thin opcode dispatcher.

use crate::opcodes;
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Declarable primitive types, in data-type opcode order.
///
/// # Example
///
/// ```
/// use quillc_lex::DataType;
///
/// let dtype = DataType::from_name("uint16").unwrap();
/// assert_eq!(dtype, DataType::Uint16);
/// assert!(dtype.is_unsigned());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Str,
    DateTime,
    Double,
    Bool,
}

impl DataType {
    /// All declarable types, for table construction and tests.
    pub const ALL: [DataType; 12] = [
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Str,
        DataType::DateTime,
        DataType::Double,
        DataType::Bool,
    ];

    /// The keyword that declares this type in user source.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::DataType;
    ///
    /// assert_eq!(DataType::Str.name(), "string");
    /// assert_eq!(DataType::Int8.name(), "int8");
    /// ```
    pub fn name(self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Str => "string",
            DataType::DateTime => "datetime",
            DataType::Double => "double",
            DataType::Bool => "bool",
        }
    }

    /// Looks a type up by its declaration keyword.
    ///
    /// # Arguments
    ///
    /// * `name` - The keyword as written in source (`"uint8"`, `"bool"`, ...)
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::DataType;
    ///
    /// assert_eq!(DataType::from_name("datetime"), Some(DataType::DateTime));
    /// assert_eq!(DataType::from_name("float"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        DataType::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// The single-byte data-type opcode in the object format.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, DataType};
    ///
    /// assert_eq!(DataType::Uint8.opcode(), opcodes::DATA_TYPE_UINT8_OPCODE);
    /// assert_eq!(DataType::Bool.opcode(), opcodes::DATA_TYPE_BOOL_OPCODE);
    /// ```
    pub fn opcode(self) -> u8 {
        match self {
            DataType::Uint8 => opcodes::DATA_TYPE_UINT8_OPCODE,
            DataType::Uint16 => opcodes::DATA_TYPE_UINT16_OPCODE,
            DataType::Uint32 => opcodes::DATA_TYPE_UINT32_OPCODE,
            DataType::Uint64 => opcodes::DATA_TYPE_UINT64_OPCODE,
            DataType::Int8 => opcodes::DATA_TYPE_INT8_OPCODE,
            DataType::Int16 => opcodes::DATA_TYPE_INT16_OPCODE,
            DataType::Int32 => opcodes::DATA_TYPE_INT32_OPCODE,
            DataType::Int64 => opcodes::DATA_TYPE_INT64_OPCODE,
            DataType::Str => opcodes::DATA_TYPE_STRING_OPCODE,
            DataType::DateTime => opcodes::DATA_TYPE_DATETIME_OPCODE,
            DataType::Double => opcodes::DATA_TYPE_DOUBLE_OPCODE,
            DataType::Bool => opcodes::DATA_TYPE_BOOL_OPCODE,
        }
    }

    /// The inverse of [`opcode`](Self::opcode), for the bytecode reader.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, DataType};
    ///
    /// assert_eq!(
    ///     DataType::from_opcode(opcodes::DATA_TYPE_INT64_OPCODE),
    ///     Some(DataType::Int64)
    /// );
    /// assert_eq!(DataType::from_opcode(0xFF), None);
    /// ```
    pub fn from_opcode(op: u8) -> Option<Self> {
        DataType::ALL.iter().copied().find(|t| t.opcode() == op)
    }

    /// The zero value a fresh (uninitialized) declaration carries.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{DataType, Value};
    ///
    /// assert_eq!(DataType::Int8.default_value(), Value::Int8(0));
    /// assert_eq!(DataType::Str.default_value(), Value::Str(String::new()));
    /// ```
    pub fn default_value(self) -> Value {
        match self {
            DataType::Uint8 => Value::Uint8(0),
            DataType::Uint16 => Value::Uint16(0),
            DataType::Uint32 => Value::Uint32(0),
            DataType::Uint64 => Value::Uint64(0),
            DataType::Int8 => Value::Int8(0),
            DataType::Int16 => Value::Int16(0),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Str => Value::Str(String::new()),
            DataType::DateTime => Value::DateTime(0),
            DataType::Double => Value::Double(0.0),
            DataType::Bool => Value::Bool(false),
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            DataType::Uint8 | DataType::Uint16 | DataType::Uint32 | DataType::Uint64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_unsigned() || self.is_signed()
    }

    /// Inclusive value range for integer types, as i128 so every width fits.
    fn integer_range(self) -> Option<(i128, i128)> {
        Some(match self {
            DataType::Uint8 => (0, u8::MAX as i128),
            DataType::Uint16 => (0, u16::MAX as i128),
            DataType::Uint32 => (0, u32::MAX as i128),
            DataType::Uint64 => (0, u64::MAX as i128),
            DataType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            DataType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            DataType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            DataType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            _ => return None,
        })
    }

    /// Build an integer value of exactly this type from an in-range number.
    fn integer_value(self, n: i128) -> Option<Value> {
        let (lo, hi) = self.integer_range()?;
        if n < lo || n > hi {
            return None;
        }
        Some(match self {
            DataType::Uint8 => Value::Uint8(n as u8),
            DataType::Uint16 => Value::Uint16(n as u16),
            DataType::Uint32 => Value::Uint32(n as u32),
            DataType::Uint64 => Value::Uint64(n as u64),
            DataType::Int8 => Value::Int8(n as i8),
            DataType::Int16 => Value::Int16(n as i16),
            DataType::Int32 => Value::Int32(n as i32),
            DataType::Int64 => Value::Int64(n as i64),
            _ => unreachable!(),
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A math operation failed; becomes a user error with the operator's
/// source position attached by the evaluator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("divide by zero")]
    DivideByZero,
    #[error("modulus by zero")]
    ModulusByZero,
    #[error("operand is not numeric")]
    NotNumeric,
    #[error("operator requires integer operands")]
    NeedsInteger,
    #[error("operator requires an unsigned operand")]
    NeedsUnsigned,
    #[error("operator requires non-negative operands")]
    NegativeOperand,
    #[error("shift amount must be non-negative")]
    NegativeShift,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("operand types cannot be combined")]
    TypeMismatch,
    #[error("operand is not a boolean condition")]
    NotACondition,
}

/// An assignment could not coerce the new value into the variable's
/// declared type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoerceError {
    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: String, target: DataType },
    #[error("cannot assign {found} to a {target} variable")]
    TypeMismatch { found: String, target: DataType },
}

/// A primitive runtime value.
///
/// `Empty` is the payload of tokens that carry no value (operators,
/// separators, words); a variable never holds `Empty` — an uninitialized
/// variable holds its type's default with the `initialized` flag down.
///
/// Integer variants keep the smallest width that holds the number, and
/// every arithmetic method renormalizes its result the same way, so
/// widths stay minimal as values flow through an expression.
///
/// # Example
///
/// ```
/// use quillc_lex::Value;
///
/// let sum = Value::Int8(100).add(&Value::Int8(100)).unwrap();
/// assert_eq!(sum, Value::Int16(200));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Empty,
    Bool(bool),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Str(String),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
}

impl Value {
    /// The declarable type this value belongs to; `None` for `Empty`.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{DataType, Value};
    ///
    /// assert_eq!(Value::Uint16(9).data_type(), Some(DataType::Uint16));
    /// assert_eq!(Value::Empty.data_type(), None);
    /// ```
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Empty => return None,
            Value::Bool(_) => DataType::Bool,
            Value::Uint8(_) => DataType::Uint8,
            Value::Uint16(_) => DataType::Uint16,
            Value::Uint32(_) => DataType::Uint32,
            Value::Uint64(_) => DataType::Uint64,
            Value::Int8(_) => DataType::Int8,
            Value::Int16(_) => DataType::Int16,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Double(_) => DataType::Double,
            Value::Str(_) => DataType::Str,
            Value::DateTime(_) => DataType::DateTime,
        })
    }

    /// Smallest unsigned variant that holds `n`.
    ///
    /// This is the resolution rule for hex literals and for unsigned
    /// arithmetic results.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(Value::from_unsigned(0xFF), Value::Uint8(0xFF));
    /// assert_eq!(Value::from_unsigned(0x100), Value::Uint16(0x100));
    /// ```
    pub fn from_unsigned(n: u64) -> Self {
        if n <= u8::MAX as u64 {
            Value::Uint8(n as u8)
        } else if n <= u16::MAX as u64 {
            Value::Uint16(n as u16)
        } else if n <= u32::MAX as u64 {
            Value::Uint32(n as u32)
        } else {
            Value::Uint64(n)
        }
    }

    /// Smallest signed variant that holds `n`.
    ///
    /// This is the resolution rule for decimal literals and for signed
    /// arithmetic results.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(Value::from_signed(100), Value::Int8(100));
    /// assert_eq!(Value::from_signed(200), Value::Int16(200));
    /// assert_eq!(Value::from_signed(-40000), Value::Int32(-40000));
    /// ```
    pub fn from_signed(n: i64) -> Self {
        if let Ok(v) = i8::try_from(n) {
            Value::Int8(v)
        } else if let Ok(v) = i16::try_from(n) {
            Value::Int16(v)
        } else if let Ok(v) = i32::try_from(n) {
            Value::Int32(v)
        } else {
            Value::Int64(n)
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.data_type().map(DataType::is_unsigned).unwrap_or(false)
    }

    pub fn is_signed(&self) -> bool {
        self.data_type().map(DataType::is_signed).unwrap_or(false)
    }

    pub fn is_integer(&self) -> bool {
        self.is_unsigned() || self.is_signed()
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Value::Double(_))
    }

    /// Integer payload widened to i128; `None` for non-integers.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Value::Uint8(n) => *n as i128,
            Value::Uint16(n) => *n as i128,
            Value::Uint32(n) => *n as i128,
            Value::Uint64(n) => *n as i128,
            Value::Int8(n) => *n as i128,
            Value::Int16(n) => *n as i128,
            Value::Int32(n) => *n as i128,
            Value::Int64(n) => *n as i128,
            _ => return None,
        })
    }

    /// Numeric payload as f64 (integers convert); `None` for non-numerics.
    pub fn as_f64(&self) -> Option<f64> {
        if let Value::Double(d) = self {
            return Some(*d);
        }
        self.as_i128().map(|n| n as f64)
    }

    /// Truthiness per the conditional-context rules: integers and
    /// doubles are true when nonzero, strings when non-empty, date-times
    /// when their epoch offset is nonzero, booleans are themselves.
    /// `None` when the value has no truth interpretation (`Empty`).
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(Value::Int8(-3).truthy(), Some(true));
    /// assert_eq!(Value::Str(String::new()).truthy(), Some(false));
    /// assert_eq!(Value::Empty.truthy(), None);
    /// ```
    pub fn truthy(&self) -> Option<bool> {
        Some(match self {
            Value::Empty => return None,
            Value::Bool(b) => *b,
            Value::Double(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::DateTime(ms) => *ms != 0,
            _ => self.as_i128()? != 0,
        })
    }

    /// Three-way comparison with numeric cross-type promotion.
    ///
    /// Matching strings compare lexically, matching date-times by epoch
    /// millisecond. Mixed integer signedness widens both sides to i128; a
    /// double on either side compares as f64. `None` when the two types
    /// have no ordering (bool, string vs. number, NaN).
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    /// use std::cmp::Ordering;
    ///
    /// assert_eq!(
    ///     Value::Uint8(5).ordering(&Value::Int32(-1)),
    ///     Some(Ordering::Greater)
    /// );
    /// assert_eq!(Value::Str("1".into()).ordering(&Value::Int8(1)), None);
    /// ```
    pub fn ordering(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => {
                if !self.is_numeric() || !other.is_numeric() {
                    return None;
                }
                if let (Some(a), Some(b)) = (self.as_i128(), other.as_i128()) {
                    Some(a.cmp(&b))
                } else {
                    self.as_f64()?.partial_cmp(&other.as_f64()?)
                }
            }
        }
    }

    /// Equality with the same promotion rules as [`ordering`](Self::ordering),
    /// plus bool/bool. `None` when the types cannot be compared at all.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(Value::Int8(7).equality(&Value::Uint16(7)), Some(true));
    /// assert_eq!(Value::Bool(true).equality(&Value::Bool(false)), Some(false));
    /// assert_eq!(Value::Str("a".into()).equality(&Value::Int8(1)), None);
    /// ```
    pub fn equality(&self, other: &Value) -> Option<bool> {
        if let (Value::Bool(a), Value::Bool(b)) = (self, other) {
            return Some(a == b);
        }
        self.ordering(other).map(|ord| ord == Ordering::Equal)
    }

    /// Normalize an integer math result back to the smallest width,
    /// keeping unsignedness only when both inputs were unsigned and the
    /// result is non-negative.
    fn integer_result(n: i128, both_unsigned: bool) -> Result<Value, MathError> {
        if both_unsigned && n >= 0 {
            u64::try_from(n)
                .map(Value::from_unsigned)
                .map_err(|_| MathError::Overflow)
        } else {
            i64::try_from(n)
                .map(Value::from_signed)
                .map_err(|_| MathError::Overflow)
        }
    }

    /// Shared front half of the binary arithmetic ops: classify the pair
    /// as integer/integer or promote to double.
    fn numeric_pair(&self, other: &Value) -> Result<NumericPair, MathError> {
        if let (Some(a), Some(b)) = (self.as_i128(), other.as_i128()) {
            Ok(NumericPair::Integers {
                a,
                b,
                both_unsigned: self.is_unsigned() && other.is_unsigned(),
            })
        } else if self.is_numeric() && other.is_numeric() {
            Ok(NumericPair::Doubles {
                a: self.as_f64().ok_or(MathError::NotNumeric)?,
                b: other.as_f64().ok_or(MathError::NotNumeric)?,
            })
        } else {
            Err(MathError::NotNumeric)
        }
    }

    /// `+` — numeric addition, or concatenation when both sides are strings.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(
    ///     Value::Uint8(200).add(&Value::Uint8(200)).unwrap(),
    ///     Value::Uint16(400)
    /// );
    /// assert_eq!(
    ///     Value::Str("hi ".into()).add(&Value::Str("there".into())).unwrap(),
    ///     Value::Str("hi there".into())
    /// );
    /// ```
    pub fn add(&self, other: &Value) -> Result<Value, MathError> {
        if let (Value::Str(a), Value::Str(b)) = (self, other) {
            let mut joined = a.clone();
            joined.push_str(b);
            return Ok(Value::Str(joined));
        }
        match self.numeric_pair(other)? {
            NumericPair::Integers { a, b, both_unsigned } => {
                Self::integer_result(a + b, both_unsigned)
            }
            NumericPair::Doubles { a, b } => Ok(Value::Double(a + b)),
        }
    }

    /// `-` — numeric subtraction; an unsigned pair may go negative and
    /// therefore signed.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(
    ///     Value::Uint8(2).subtract(&Value::Uint8(5)).unwrap(),
    ///     Value::Int8(-3)
    /// );
    /// ```
    pub fn subtract(&self, other: &Value) -> Result<Value, MathError> {
        match self.numeric_pair(other)? {
            NumericPair::Integers { a, b, both_unsigned } => {
                Self::integer_result(a - b, both_unsigned)
            }
            NumericPair::Doubles { a, b } => Ok(Value::Double(a - b)),
        }
    }

    /// `*` — numeric multiplication.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(
    ///     Value::Int8(6).multiply(&Value::Int8(7)).unwrap(),
    ///     Value::Int8(42)
    /// );
    /// ```
    pub fn multiply(&self, other: &Value) -> Result<Value, MathError> {
        match self.numeric_pair(other)? {
            NumericPair::Integers { a, b, both_unsigned } => {
                let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
                Self::integer_result(product, both_unsigned)
            }
            NumericPair::Doubles { a, b } => Ok(Value::Double(a * b)),
        }
    }

    /// `/` — integer division promotes to double when the divisor does not
    /// divide evenly; dividing by zero is an error in every pairing.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{MathError, Value};
    ///
    /// assert_eq!(
    ///     Value::Int8(10).divide(&Value::Int8(2)).unwrap(),
    ///     Value::Int8(5)
    /// );
    /// assert_eq!(
    ///     Value::Int8(7).divide(&Value::Int8(2)).unwrap(),
    ///     Value::Double(3.5)
    /// );
    /// assert_eq!(
    ///     Value::Int8(7).divide(&Value::Int8(0)),
    ///     Err(MathError::DivideByZero)
    /// );
    /// ```
    pub fn divide(&self, other: &Value) -> Result<Value, MathError> {
        match self.numeric_pair(other)? {
            NumericPair::Integers { a, b, both_unsigned } => {
                if b == 0 {
                    Err(MathError::DivideByZero)
                } else if a % b == 0 {
                    Self::integer_result(a / b, both_unsigned)
                } else {
                    Ok(Value::Double(a as f64 / b as f64))
                }
            }
            NumericPair::Doubles { a, b } => {
                if b == 0.0 {
                    Err(MathError::DivideByZero)
                } else {
                    Ok(Value::Double(a / b))
                }
            }
        }
    }

    /// `%` — integer operands only.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{MathError, Value};
    ///
    /// assert_eq!(
    ///     Value::Int8(7).modulo(&Value::Int8(3)).unwrap(),
    ///     Value::Int8(1)
    /// );
    /// assert_eq!(
    ///     Value::Double(7.0).modulo(&Value::Int8(3)),
    ///     Err(MathError::NeedsInteger)
    /// );
    /// ```
    pub fn modulo(&self, other: &Value) -> Result<Value, MathError> {
        match self.numeric_pair(other)? {
            NumericPair::Integers { a, b, both_unsigned } => {
                if b == 0 {
                    Err(MathError::ModulusByZero)
                } else {
                    Self::integer_result(a % b, both_unsigned)
                }
            }
            NumericPair::Doubles { .. } => Err(MathError::NeedsInteger),
        }
    }

    fn shift_amount(other: &Value) -> Result<u32, MathError> {
        let amt = other.as_i128().ok_or(MathError::NeedsInteger)?;
        if amt < 0 {
            return Err(MathError::NegativeShift);
        }
        // Beyond any operand width; the shifts below treat it as "all
        // bits gone" rather than wrapping the amount.
        Ok(u32::try_from(amt).unwrap_or(u32::MAX).min(127))
    }

    /// `<<` — integer left shift by a non-negative amount.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(
    ///     Value::Uint8(2).shift_left(&Value::Uint8(4)).unwrap(),
    ///     Value::Uint8(32)
    /// );
    /// ```
    pub fn shift_left(&self, other: &Value) -> Result<Value, MathError> {
        let amt = Self::shift_amount(other)?;
        let n = self.as_i128().ok_or(MathError::NeedsInteger)?;
        let shifted = n.checked_shl(amt).ok_or(MathError::Overflow)?;
        Self::integer_result(shifted, self.is_unsigned() && other.is_unsigned())
    }

    /// `>>` — arithmetic shift: a negative left side keeps its sign.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(
    ///     Value::Int8(-8).shift_right(&Value::Uint8(1)).unwrap(),
    ///     Value::Int8(-4)
    /// );
    /// ```
    pub fn shift_right(&self, other: &Value) -> Result<Value, MathError> {
        let amt = Self::shift_amount(other)?;
        let n = self.as_i128().ok_or(MathError::NeedsInteger)?;
        let shifted = n >> amt.min(127);
        Self::integer_result(shifted, self.is_unsigned() && other.is_unsigned())
    }

    fn bitwise_pair(&self, other: &Value) -> Result<(u64, u64, bool), MathError> {
        let a = self.as_i128().ok_or(MathError::NeedsInteger)?;
        let b = other.as_i128().ok_or(MathError::NeedsInteger)?;
        if a < 0 || b < 0 {
            return Err(MathError::NegativeOperand);
        }
        Ok((
            a as u64,
            b as u64,
            self.is_unsigned() && other.is_unsigned(),
        ))
    }

    pub fn bit_and(&self, other: &Value) -> Result<Value, MathError> {
        let (a, b, both_unsigned) = self.bitwise_pair(other)?;
        Self::integer_result((a & b) as i128, both_unsigned)
    }

    pub fn bit_xor(&self, other: &Value) -> Result<Value, MathError> {
        let (a, b, both_unsigned) = self.bitwise_pair(other)?;
        Self::integer_result((a ^ b) as i128, both_unsigned)
    }

    pub fn bit_or(&self, other: &Value) -> Result<Value, MathError> {
        let (a, b, both_unsigned) = self.bitwise_pair(other)?;
        Self::integer_result((a | b) as i128, both_unsigned)
    }

    /// `~` — unsigned only; the complement stays masked to the operand's
    /// width so no promotion sneaks in.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{MathError, Value};
    ///
    /// assert_eq!(Value::Uint8(0x0F).bitwise_not().unwrap(), Value::Uint8(0xF0));
    /// assert_eq!(Value::Int8(1).bitwise_not(), Err(MathError::NeedsUnsigned));
    /// ```
    pub fn bitwise_not(&self) -> Result<Value, MathError> {
        Ok(match self {
            Value::Uint8(n) => Value::Uint8(!n),
            Value::Uint16(n) => Value::Uint16(!n),
            Value::Uint32(n) => Value::Uint32(!n),
            Value::Uint64(n) => Value::Uint64(!n),
            _ => return Err(MathError::NeedsUnsigned),
        })
    }

    /// `-u` — numeric negation; unsigned operands become signed.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(Value::Uint8(4).negate().unwrap(), Value::Int8(-4));
    /// assert_eq!(Value::Double(1.5).negate().unwrap(), Value::Double(-1.5));
    /// ```
    pub fn negate(&self) -> Result<Value, MathError> {
        if let Value::Double(d) = self {
            return Ok(Value::Double(-d));
        }
        let n = self.as_i128().ok_or(MathError::NotNumeric)?;
        i64::try_from(-n)
            .map(Value::from_signed)
            .map_err(|_| MathError::Overflow)
    }

    pub fn unary_plus(&self) -> Result<Value, MathError> {
        if self.is_numeric() {
            Ok(self.clone())
        } else {
            Err(MathError::NotNumeric)
        }
    }

    /// `!` — truthiness in, inverted boolean out.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(Value::Int8(3).logical_not().unwrap(), Value::Bool(false));
    /// assert_eq!(
    ///     Value::Str(String::new()).logical_not().unwrap(),
    ///     Value::Bool(true)
    /// );
    /// ```
    pub fn logical_not(&self) -> Result<Value, MathError> {
        self.truthy()
            .map(|t| Value::Bool(!t))
            .ok_or(MathError::NotACondition)
    }

    /// `++` — adds one, wrapping at the value's own width.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::Value;
    ///
    /// assert_eq!(Value::Uint8(255).incremented().unwrap(), Value::Uint8(0));
    /// assert_eq!(Value::Int8(127).incremented().unwrap(), Value::Int8(-128));
    /// ```
    pub fn incremented(&self) -> Result<Value, MathError> {
        Ok(match self {
            Value::Uint8(n) => Value::Uint8(n.wrapping_add(1)),
            Value::Uint16(n) => Value::Uint16(n.wrapping_add(1)),
            Value::Uint32(n) => Value::Uint32(n.wrapping_add(1)),
            Value::Uint64(n) => Value::Uint64(n.wrapping_add(1)),
            Value::Int8(n) => Value::Int8(n.wrapping_add(1)),
            Value::Int16(n) => Value::Int16(n.wrapping_add(1)),
            Value::Int32(n) => Value::Int32(n.wrapping_add(1)),
            Value::Int64(n) => Value::Int64(n.wrapping_add(1)),
            Value::Double(d) => Value::Double(d + 1.0),
            _ => return Err(MathError::NotNumeric),
        })
    }

    /// `--` — subtracts one, wrapping at the value's own width.
    pub fn decremented(&self) -> Result<Value, MathError> {
        Ok(match self {
            Value::Uint8(n) => Value::Uint8(n.wrapping_sub(1)),
            Value::Uint16(n) => Value::Uint16(n.wrapping_sub(1)),
            Value::Uint32(n) => Value::Uint32(n.wrapping_sub(1)),
            Value::Uint64(n) => Value::Uint64(n.wrapping_sub(1)),
            Value::Int8(n) => Value::Int8(n.wrapping_sub(1)),
            Value::Int16(n) => Value::Int16(n.wrapping_sub(1)),
            Value::Int32(n) => Value::Int32(n.wrapping_sub(1)),
            Value::Int64(n) => Value::Int64(n.wrapping_sub(1)),
            Value::Double(d) => Value::Double(d - 1.0),
            _ => return Err(MathError::NotNumeric),
        })
    }

    /// Coerce this value into `target` for an assignment. Range-checked:
    /// a value that does not fit the declared width is an error, never a
    /// silent truncation.
    ///
    /// # Arguments
    ///
    /// * `target` - The destination variable's declared type
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{DataType, Value};
    ///
    /// assert_eq!(
    ///     Value::Int8(5).coerced_to(DataType::Int64).unwrap(),
    ///     Value::Int64(5)
    /// );
    /// assert!(Value::Int16(1000).coerced_to(DataType::Int8).is_err());
    /// ```
    pub fn coerced_to(&self, target: DataType) -> Result<Value, CoerceError> {
        if self.data_type() == Some(target) {
            return Ok(self.clone());
        }
        let out_of_range = || CoerceError::OutOfRange {
            value: self.to_string(),
            target,
        };
        let mismatch = || CoerceError::TypeMismatch {
            found: self
                .data_type()
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| "nothing".to_string()),
            target,
        };

        if target.is_integer() {
            if let Some(n) = self.as_i128() {
                return target.integer_value(n).ok_or_else(out_of_range);
            }
            if let Value::Double(d) = self {
                // Only a whole number may cross into an integer type.
                if d.fract() != 0.0 || !d.is_finite() {
                    return Err(out_of_range());
                }
                if *d < i128::MIN as f64 || *d > i128::MAX as f64 {
                    return Err(out_of_range());
                }
                return target.integer_value(*d as i128).ok_or_else(out_of_range);
            }
            return Err(mismatch());
        }

        match target {
            DataType::Double => self.as_f64().map(Value::Double).ok_or_else(mismatch),
            // String, datetime and bool accept only their own kind, which
            // the identity check above already handled.
            _ => Err(mismatch()),
        }
    }
}

enum NumericPair {
    Integers { a: i128, b: i128, both_unsigned: bool },
    Doubles { a: f64, b: f64 },
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str("(empty)"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Uint8(n) => write!(f, "{n}"),
            Value::Uint16(n) => write!(f, "{n}"),
            Value::Uint32(n) => write!(f, "{n}"),
            Value::Uint64(n) => write!(f, "{n}"),
            Value::Int8(n) => write!(f, "{n}"),
            Value::Int16(n) => write!(f, "{n}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Str(s) => f.write_str(s),
            Value::DateTime(ms) => match DateTime::<Utc>::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
                None => write!(f, "datetime({ms})"),
            },
        }
    }
}

/// Parse a date-time literal of the form `YYYY-MM-DD [HH:MM[:SS[.fff]]]`
/// into epoch milliseconds. The date separator may be `-` or `/`. The year
/// must fall in 1970..=2100 and the calendar date must exist (leap-year
/// February included — chrono does the validation).
///
/// # Arguments
///
/// * `text` - The candidate string, exactly as written between quotes
///
/// # Example
///
/// ```
/// use quillc_lex::parse_date_time;
///
/// assert_eq!(parse_date_time("1970-01-01"), Some(0));
/// assert!(parse_date_time("2024-02-29").is_some());
/// assert!(parse_date_time("2023-02-29").is_none());
/// assert!(parse_date_time("hello world").is_none());
/// ```
pub fn parse_date_time(text: &str) -> Option<i64> {
    let mut parts = text.split_whitespace();
    let date_part = parts.next()?;
    let time_part = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let sep = if date_part.contains('/') { '/' } else { '-' };
    let mut fields = date_part.split(sep);
    let year: i32 = fields.next()?.parse().ok()?;
    let month: u32 = fields.next()?.parse().ok()?;
    let day: u32 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || !(1970..=2100).contains(&year) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let (hour, minute, second, milli) = match time_part {
        None => (0, 0, 0, 0),
        Some(t) => parse_time_of_day(t)?,
    };
    let dt = date.and_hms_milli_opt(hour, minute, second, milli)?;
    Some(dt.and_utc().timestamp_millis())
}

/// `HH:MM[:SS[.fff]]`; one to three fraction digits scale to milliseconds
/// (`.9` is 900 ms).
fn parse_time_of_day(text: &str) -> Option<(u32, u32, u32, u32)> {
    let mut fields = text.split(':');
    let hour: u32 = fields.next()?.parse().ok()?;
    let minute: u32 = fields.next()?.parse().ok()?;
    let (second, milli) = match fields.next() {
        None => (0, 0),
        Some(sec_field) => {
            let (sec_str, milli) = match sec_field.split_once('.') {
                None => (sec_field, 0),
                Some((s, frac)) => {
                    if frac.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit())
                    {
                        return None;
                    }
                    let scale = 10u32.pow(3 - frac.len() as u32);
                    (s, frac.parse::<u32>().ok()? * scale)
                }
            };
            (sec_str.parse().ok()?, milli)
        }
    };
    if fields.next().is_some() {
        return None;
    }
    Some((hour, minute, second, milli))
}
