//! The language's operator table and fixed vocabulary.
//!
//! One [`LangTerms`] value describes everything the pipeline needs to know
//! about Quill's surface: precedence-grouped operator descriptors with
//! their opcodes and operand counts, separator and atomic-operator
//! character sets, reserved words, data-type names, and the system-call
//! registry. Construction runs a self-check over the table invariants.
//!
//! Source operators that are ambiguous as written (`+` `-` `++` `--`) have
//! additional generated-source entries under internal symbols (`+u`, `B+`,
//! `+1`, `1+`, ...) carrying the disambiguated opcode. User-source entries
//! for those symbols deliberately have no opcode; the expression parser
//! must rewrite them before anything is emitted.

use crate::opcodes::*;
use crate::value::DataType;
use rustc_hash::FxHashMap;

// Operator roles, OR-able into a type mask.
pub const UNARY: u8 = 0x01;
pub const BINARY: u8 = 0x02;
pub const PREFIX: u8 = 0x04;
pub const POSTFIX: u8 = 0x08;
pub const TERNARY_1ST: u8 = 0x10;
pub const TERNARY_2ND: u8 = 0x20;
pub const STATEMENT_ENDER: u8 = 0x40;

// Where a symbol may appear.
pub const USR_SRC: u8 = 0x01;
pub const GNR8D_SRC: u8 = 0x02;

// Internal symbols for disambiguated operators.
pub const PRE_INCR_SYMBOL: &str = "+1";
pub const POST_INCR_SYMBOL: &str = "1+";
pub const PRE_DECR_SYMBOL: &str = "-1";
pub const POST_DECR_SYMBOL: &str = "1-";
pub const UNARY_PLUS_SYMBOL: &str = "+u";
pub const UNARY_MINUS_SYMBOL: &str = "-u";
pub const BINARY_PLUS_SYMBOL: &str = "B+";
pub const BINARY_MINUS_SYMBOL: &str = "B-";

/// One operator descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opr8r {
    pub symbol: &'static str,
    pub type_mask: u8,
    pub usage_mask: u8,
    /// Operand count as seen by the expression parser.
    pub src_operand_cnt: u8,
    /// Operand count as seen by the flat-expression evaluator.
    pub exec_operand_cnt: u8,
    pub op_code: u8,
    pub description: &'static str,
}

impl Opr8r {
    const fn new(
        symbol: &'static str,
        type_mask: u8,
        usage_mask: u8,
        src_operand_cnt: u8,
        exec_operand_cnt: u8,
        op_code: u8,
        description: &'static str,
    ) -> Self {
        Self {
            symbol,
            type_mask,
            usage_mask,
            src_operand_cnt,
            exec_operand_cnt,
            op_code,
            description,
        }
    }
}

/// Operators sharing one precedence level. Lower group index binds
/// tighter.
#[derive(Clone, Debug, Default)]
pub struct PrecedenceLvl {
    pub opr8rs: Vec<Opr8r>,
}

/// A registered system call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SysCall {
    pub name: &'static str,
    pub param_cnt: u8,
    /// `None` for void calls.
    pub return_type: Option<DataType>,
}

/// The complete language vocabulary. Build once, share by reference.
///
/// # Example
///
/// ```
/// use quillc_lex::{opcodes, LangTerms};
///
/// let terms = LangTerms::new();
/// assert_eq!(terms.op_code_for("*"), Some(opcodes::MULTIPLY_OPCODE));
/// assert!(terms.is_reserved_word("while"));
/// assert!(terms.is_data_type_name("uint8"));
/// ```
pub struct LangTerms {
    groups: Vec<PrecedenceLvl>,
    by_opcode: FxHashMap<u8, (usize, Opr8r)>,
    reserved_words: &'static [&'static str],
    sys_calls: &'static [SysCall],
    atomic_1char_opr8rs: &'static str,
    single_char_spr8rs: &'static str,
}

const RESERVED_WORDS: &[&str] = &[
    "if", "else", "while", "for", "break", "return", "void", "true", "false",
];

const SYS_CALLS: &[SysCall] = &[
    SysCall {
        name: "str",
        param_cnt: 1,
        return_type: Some(DataType::Str),
    },
    SysCall {
        name: "print_line",
        param_cnt: 1,
        return_type: None,
    },
];

impl LangTerms {
    /// Builds the table and runs the construction-time self-check
    /// (atomic operators present, no operator/separator overlap, exactly
    /// one ternary pair, exactly one statement ender).
    pub fn new() -> Self {
        let mut groups: Vec<PrecedenceLvl> = Vec::new();
        let mut grp = |opr8rs: Vec<Opr8r>| groups.push(PrecedenceLvl { opr8rs });

        // Postfix. Prefix and postfix forms of ++/-- sit at different
        // precedence, matching C.
        grp(vec![
            Opr8r::new("++", POSTFIX, USR_SRC, 1, 0, INVALID_OPCODE, "postfix increment"),
            Opr8r::new("--", POSTFIX, USR_SRC, 1, 0, INVALID_OPCODE, "postfix decrement"),
            Opr8r::new(POST_INCR_SYMBOL, POSTFIX, GNR8D_SRC, 1, 1, POST_INCR_OPCODE, "postfix increment"),
            Opr8r::new(POST_DECR_SYMBOL, POSTFIX, GNR8D_SRC, 1, 1, POST_DECR_OPCODE, "postfix decrement"),
        ]);

        // Prefix and unary.
        grp(vec![
            Opr8r::new("++", PREFIX, USR_SRC, 1, 0, INVALID_OPCODE, "prefix increment"),
            Opr8r::new("--", PREFIX, USR_SRC, 1, 0, INVALID_OPCODE, "prefix decrement"),
            Opr8r::new(PRE_INCR_SYMBOL, PREFIX, GNR8D_SRC, 1, 1, PRE_INCR_OPCODE, "prefix increment"),
            Opr8r::new(PRE_DECR_SYMBOL, PREFIX, GNR8D_SRC, 1, 1, PRE_DECR_OPCODE, "prefix decrement"),
            Opr8r::new("+", UNARY, USR_SRC, 1, 0, INVALID_OPCODE, "unary plus"),
            Opr8r::new("-", UNARY, USR_SRC, 1, 0, INVALID_OPCODE, "unary minus"),
            Opr8r::new(UNARY_PLUS_SYMBOL, UNARY, GNR8D_SRC, 1, 1, UNARY_PLUS_OPCODE, "unary plus"),
            Opr8r::new(UNARY_MINUS_SYMBOL, UNARY, GNR8D_SRC, 1, 1, UNARY_MINUS_OPCODE, "unary minus"),
            Opr8r::new("!", UNARY, USR_SRC | GNR8D_SRC, 1, 1, LOGICAL_NOT_OPCODE, "logical NOT"),
            Opr8r::new("~", UNARY, USR_SRC | GNR8D_SRC, 1, 1, BITWISE_NOT_OPCODE, "bitwise NOT"),
        ]);

        grp(vec![
            Opr8r::new("*", BINARY, USR_SRC | GNR8D_SRC, 2, 2, MULTIPLY_OPCODE, "multiply"),
            Opr8r::new("/", BINARY, USR_SRC | GNR8D_SRC, 2, 2, DIV_OPCODE, "divide"),
            Opr8r::new("%", BINARY, USR_SRC | GNR8D_SRC, 2, 2, MOD_OPCODE, "modulus"),
        ]);

        grp(vec![
            Opr8r::new("+", BINARY, USR_SRC, 2, 0, INVALID_OPCODE, "add"),
            Opr8r::new("-", BINARY, USR_SRC, 2, 0, INVALID_OPCODE, "subtract"),
            Opr8r::new(BINARY_PLUS_SYMBOL, BINARY, GNR8D_SRC, 2, 2, BINARY_PLUS_OPCODE, "add"),
            Opr8r::new(BINARY_MINUS_SYMBOL, BINARY, GNR8D_SRC, 2, 2, BINARY_MINUS_OPCODE, "subtract"),
        ]);

        grp(vec![
            Opr8r::new("<<", BINARY, USR_SRC | GNR8D_SRC, 2, 2, LEFT_SHIFT_OPCODE, "left shift"),
            Opr8r::new(">>", BINARY, USR_SRC | GNR8D_SRC, 2, 2, RIGHT_SHIFT_OPCODE, "right shift"),
        ]);

        grp(vec![
            Opr8r::new("<", BINARY, USR_SRC | GNR8D_SRC, 2, 2, LESS_THAN_OPCODE, "less than"),
            Opr8r::new("<=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, LESS_EQUALS_OPCODE, "less or equal"),
            Opr8r::new(">", BINARY, USR_SRC | GNR8D_SRC, 2, 2, GREATER_THAN_OPCODE, "greater than"),
            Opr8r::new(">=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, GREATER_EQUALS_OPCODE, "greater or equal"),
        ]);

        grp(vec![
            Opr8r::new("==", BINARY, USR_SRC | GNR8D_SRC, 2, 2, EQUALITY_OPCODE, "equals"),
            Opr8r::new("!=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, NOT_EQUALS_OPCODE, "not equals"),
        ]);

        grp(vec![Opr8r::new("&", BINARY, USR_SRC | GNR8D_SRC, 2, 2, BITWISE_AND_OPCODE, "bitwise AND")]);
        grp(vec![Opr8r::new("^", BINARY, USR_SRC | GNR8D_SRC, 2, 2, BITWISE_XOR_OPCODE, "bitwise XOR")]);
        grp(vec![Opr8r::new("|", BINARY, USR_SRC | GNR8D_SRC, 2, 2, BITWISE_OR_OPCODE, "bitwise OR")]);

        grp(vec![Opr8r::new("&&", BINARY, USR_SRC | GNR8D_SRC, 2, 2, LOGICAL_AND_OPCODE, "logical AND")]);
        grp(vec![Opr8r::new("||", BINARY, USR_SRC | GNR8D_SRC, 2, 2, LOGICAL_OR_OPCODE, "logical OR")]);

        // The ternary pair. `?` needs only its resolved conditional at
        // exec time; the branches are managed by sub-expression skips.
        grp(vec![Opr8r::new(
            "?",
            BINARY | TERNARY_1ST,
            USR_SRC | GNR8D_SRC,
            2,
            1,
            TERNARY_1ST_OPCODE,
            "ternary conditional",
        )]);
        grp(vec![Opr8r::new(
            ":",
            BINARY | TERNARY_2ND,
            USR_SRC | GNR8D_SRC,
            2,
            2,
            TERNARY_2ND_OPCODE,
            "ternary branch divider",
        )]);

        grp(vec![
            Opr8r::new("=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, ASSIGNMENT_OPCODE, "assign"),
            Opr8r::new("+=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, PLUS_ASSIGN_OPCODE, "add and assign"),
            Opr8r::new("-=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, MINUS_ASSIGN_OPCODE, "subtract and assign"),
            Opr8r::new("*=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, MULTIPLY_ASSIGN_OPCODE, "multiply and assign"),
            Opr8r::new("/=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, DIV_ASSIGN_OPCODE, "divide and assign"),
            Opr8r::new("%=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, MOD_ASSIGN_OPCODE, "modulus and assign"),
            Opr8r::new("<<=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, LEFT_SHIFT_ASSIGN_OPCODE, "left shift and assign"),
            Opr8r::new(">>=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, RIGHT_SHIFT_ASSIGN_OPCODE, "right shift and assign"),
            Opr8r::new("&=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, BITWISE_AND_ASSIGN_OPCODE, "AND and assign"),
            Opr8r::new("^=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, BITWISE_XOR_ASSIGN_OPCODE, "XOR and assign"),
            Opr8r::new("|=", BINARY, USR_SRC | GNR8D_SRC, 2, 2, BITWISE_OR_ASSIGN_OPCODE, "OR and assign"),
        ]);

        grp(vec![Opr8r::new(
            ";",
            STATEMENT_ENDER,
            USR_SRC | GNR8D_SRC,
            0,
            0,
            STATEMENT_ENDER_OPCODE,
            "statement ender",
        )]);

        let mut by_opcode = FxHashMap::default();
        for (idx, lvl) in groups.iter().enumerate() {
            for op in &lvl.opr8rs {
                if op.op_code != INVALID_OPCODE {
                    by_opcode.insert(op.op_code, (idx, op.clone()));
                }
            }
        }

        let terms = Self {
            groups,
            by_opcode,
            reserved_words: RESERVED_WORDS,
            sys_calls: SYS_CALLS,
            atomic_1char_opr8rs: ";",
            single_char_spr8rs: "()[]{},",
        };
        terms.validity_check();
        terms
    }

    /// Table invariants, checked once at construction.
    fn validity_check(&self) {
        // Every atomic single-char operator appears in some group.
        for ch in self.atomic_1char_opr8rs.chars() {
            let s = ch.to_string();
            assert!(
                self.all_opr8rs().any(|op| op.symbol == s),
                "atomic operator `{s}` missing from precedence groups"
            );
        }
        // No operator character overlaps the separator set.
        for op in self.all_opr8rs() {
            for ch in op.symbol.chars() {
                assert!(
                    !self.single_char_spr8rs.contains(ch),
                    "operator `{}` collides with separator `{ch}`",
                    op.symbol
                );
            }
        }
        // Exactly one ternary pair.
        let firsts = self
            .all_opr8rs()
            .filter(|op| op.type_mask & TERNARY_1ST != 0)
            .count();
        let seconds = self
            .all_opr8rs()
            .filter(|op| op.type_mask & TERNARY_2ND != 0)
            .count();
        assert!(
            (firsts == 0 && seconds == 0) || (firsts == 1 && seconds == 1),
            "ternary operators must come as one pair"
        );
        // Exactly one statement ender.
        let enders = self
            .all_opr8rs()
            .filter(|op| op.type_mask & STATEMENT_ENDER != 0)
            .count();
        assert!(enders == 1, "expected exactly one statement ender");
    }

    fn all_opr8rs(&self) -> impl Iterator<Item = &Opr8r> {
        self.groups.iter().flat_map(|lvl| lvl.opr8rs.iter())
    }

    /// Precedence groups, tightest binding first.
    pub fn precedence_groups(&self) -> &[PrecedenceLvl] {
        &self.groups
    }

    /// First descriptor for `symbol` whose usage intersects `usage_mask`.
    pub fn opr8r_for_symbol(&self, symbol: &str, usage_mask: u8) -> Option<&Opr8r> {
        self.all_opr8rs()
            .find(|op| op.symbol == symbol && op.usage_mask & usage_mask != 0)
    }

    /// The opcode a symbol emits as; only disambiguated/unambiguous
    /// symbols have one.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, terms, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// // the ambiguous user spelling has no opcode of its own...
    /// assert_eq!(t.op_code_for("+"), None);
    /// // ...its disambiguated form does
    /// assert_eq!(
    ///     t.op_code_for(terms::BINARY_PLUS_SYMBOL),
    ///     Some(opcodes::BINARY_PLUS_OPCODE)
    /// );
    /// ```
    pub fn op_code_for(&self, symbol: &str) -> Option<u8> {
        self.all_opr8rs()
            .find(|op| op.symbol == symbol && op.op_code != INVALID_OPCODE)
            .map(|op| op.op_code)
    }

    /// Full descriptor for an opcode, for the reader and evaluator.
    pub fn opr8r_for_opcode(&self, op_code: u8) -> Option<&Opr8r> {
        self.by_opcode.get(&op_code).map(|(_, op)| op)
    }

    /// The table spelling of an opcode's symbol.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// assert_eq!(t.symbol_for_opcode(opcodes::LOGICAL_AND_OPCODE), Some("&&"));
    /// assert_eq!(t.symbol_for_opcode(0xFF), None);
    /// ```
    pub fn symbol_for_opcode(&self, op_code: u8) -> Option<&'static str> {
        self.opr8r_for_opcode(op_code).map(|op| op.symbol)
    }

    /// Group index of the opcode's precedence level; lower binds tighter.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// let mul = t.precedence_of_opcode(opcodes::MULTIPLY_OPCODE).unwrap();
    /// let add = t.precedence_of_opcode(opcodes::BINARY_PLUS_OPCODE).unwrap();
    /// assert!(mul < add);
    /// ```
    pub fn precedence_of_opcode(&self, op_code: u8) -> Option<usize> {
        self.by_opcode.get(&op_code).map(|(idx, _)| *idx)
    }

    pub fn is_valid_opr8r(&self, symbol: &str, usage_mask: u8) -> bool {
        self.opr8r_for_symbol(symbol, usage_mask).is_some()
    }

    /// OR of the type masks of every descriptor sharing `symbol`.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{terms, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// let mask = t.type_mask_of("++");
    /// assert!(mask & terms::PREFIX != 0);
    /// assert!(mask & terms::POSTFIX != 0);
    /// ```
    pub fn type_mask_of(&self, symbol: &str) -> u8 {
        self.all_opr8rs()
            .filter(|op| op.symbol == symbol)
            .fold(0, |mask, op| mask | op.type_mask)
    }

    /// Operand count the evaluator's readiness check uses.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// assert_eq!(t.exec_operand_cnt(opcodes::BINARY_PLUS_OPCODE), Some(2));
    /// // `?` needs only its resolved condition; branches are skip-managed
    /// assert_eq!(t.exec_operand_cnt(opcodes::TERNARY_1ST_OPCODE), Some(1));
    /// ```
    pub fn exec_operand_cnt(&self, op_code: u8) -> Option<u8> {
        self.opr8r_for_opcode(op_code).map(|op| op.exec_operand_cnt)
    }

    // Disambiguation of ambiguous source symbols.

    /// Internal spelling for `++`/`--` used where a value is expected.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{terms, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// assert_eq!(t.unique_prefix_symbol("++"), terms::PRE_INCR_SYMBOL);
    /// assert_eq!(t.unique_prefix_symbol("!"), "!");
    /// ```
    pub fn unique_prefix_symbol(&self, symbol: &str) -> &'static str {
        match symbol {
            "++" => PRE_INCR_SYMBOL,
            "--" => PRE_DECR_SYMBOL,
            other => self.intern_symbol(other),
        }
    }

    /// Internal spelling for `++`/`--` used directly after a value.
    pub fn unique_postfix_symbol(&self, symbol: &str) -> &'static str {
        match symbol {
            "++" => POST_INCR_SYMBOL,
            "--" => POST_DECR_SYMBOL,
            other => self.intern_symbol(other),
        }
    }

    /// Internal spelling for `+`/`-` classified as unary.
    pub fn unique_unary_symbol(&self, symbol: &str) -> &'static str {
        match symbol {
            "+" => UNARY_PLUS_SYMBOL,
            "-" => UNARY_MINUS_SYMBOL,
            other => self.intern_symbol(other),
        }
    }

    /// Internal spelling for `+`/`-` classified as binary.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{terms, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// assert_eq!(t.unique_binary_symbol("-"), terms::BINARY_MINUS_SYMBOL);
    /// assert_eq!(t.unique_binary_symbol("*"), "*");
    /// ```
    pub fn unique_binary_symbol(&self, symbol: &str) -> &'static str {
        match symbol {
            "+" => BINARY_PLUS_SYMBOL,
            "-" => BINARY_MINUS_SYMBOL,
            other => self.intern_symbol(other),
        }
    }

    /// Map a symbol back to its static table spelling.
    fn intern_symbol(&self, symbol: &str) -> &'static str {
        self.all_opr8rs()
            .find(|op| op.symbol == symbol)
            .map(|op| op.symbol)
            .unwrap_or("")
    }

    // Character classes for the lexer.

    pub fn is_spr8r_char(&self, ch: char) -> bool {
        self.single_char_spr8rs.contains(ch)
    }

    pub fn is_atomic_opr8r_char(&self, ch: char) -> bool {
        self.atomic_1char_opr8rs.contains(ch)
    }

    /// Could `ch` begin a user-source operator?
    pub fn is_opr8r_char(&self, ch: char) -> bool {
        self.all_opr8rs()
            .filter(|op| op.usage_mask & USR_SRC != 0)
            .any(|op| op.symbol.contains(ch))
    }

    /// Is `partial` a prefix of some user-source operator symbol? The
    /// lexer accumulates operator characters while this holds.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::LangTerms;
    ///
    /// let t = LangTerms::new();
    /// assert!(t.could_extend_opr8r("<<"));
    /// assert!(t.could_extend_opr8r("<<="));
    /// assert!(!t.could_extend_opr8r("<<<"));
    /// ```
    pub fn could_extend_opr8r(&self, partial: &str) -> bool {
        self.all_opr8rs()
            .filter(|op| op.usage_mask & USR_SRC != 0)
            .any(|op| op.symbol.starts_with(partial))
    }

    // Vocabulary.

    pub fn is_reserved_word(&self, word: &str) -> bool {
        self.reserved_words.contains(&word)
    }

    pub fn is_data_type_name(&self, word: &str) -> bool {
        DataType::from_name(word).is_some()
    }

    /// The registry entry for a system call name, if one exists.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{DataType, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// let print = t.system_call("print_line").unwrap();
    /// assert_eq!(print.param_cnt, 1);
    /// assert_eq!(print.return_type, None);
    /// assert_eq!(t.system_call("str").unwrap().return_type, Some(DataType::Str));
    /// ```
    pub fn system_call(&self, name: &str) -> Option<&SysCall> {
        self.sys_calls.iter().find(|sc| sc.name == name)
    }

    pub fn ternary_1st_symbol(&self) -> &'static str {
        "?"
    }

    pub fn ternary_2nd_symbol(&self) -> &'static str {
        ":"
    }

    pub fn statement_ender_symbol(&self) -> &'static str {
        ";"
    }

    /// Compound-assignment opcode -> the binary opcode it rewrites to.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// assert_eq!(
    ///     t.binary_opcode_for_compound(opcodes::PLUS_ASSIGN_OPCODE),
    ///     Some(opcodes::BINARY_PLUS_OPCODE)
    /// );
    /// assert_eq!(t.binary_opcode_for_compound(opcodes::ASSIGNMENT_OPCODE), None);
    /// ```
    pub fn binary_opcode_for_compound(&self, op_code: u8) -> Option<u8> {
        Some(match op_code {
            PLUS_ASSIGN_OPCODE => BINARY_PLUS_OPCODE,
            MINUS_ASSIGN_OPCODE => BINARY_MINUS_OPCODE,
            MULTIPLY_ASSIGN_OPCODE => MULTIPLY_OPCODE,
            DIV_ASSIGN_OPCODE => DIV_OPCODE,
            MOD_ASSIGN_OPCODE => MOD_OPCODE,
            LEFT_SHIFT_ASSIGN_OPCODE => LEFT_SHIFT_OPCODE,
            RIGHT_SHIFT_ASSIGN_OPCODE => RIGHT_SHIFT_OPCODE,
            BITWISE_AND_ASSIGN_OPCODE => BITWISE_AND_OPCODE,
            BITWISE_XOR_ASSIGN_OPCODE => BITWISE_XOR_OPCODE,
            BITWISE_OR_ASSIGN_OPCODE => BITWISE_OR_OPCODE,
            _ => return None,
        })
    }

    /// Any member of the assignment family, `=` included.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{opcodes, LangTerms};
    ///
    /// let t = LangTerms::new();
    /// assert!(t.is_assignment_opcode(opcodes::ASSIGNMENT_OPCODE));
    /// assert!(t.is_assignment_opcode(opcodes::BITWISE_OR_ASSIGN_OPCODE));
    /// assert!(!t.is_assignment_opcode(opcodes::BINARY_PLUS_OPCODE));
    /// ```
    pub fn is_assignment_opcode(&self, op_code: u8) -> bool {
        op_code == ASSIGNMENT_OPCODE || self.binary_opcode_for_compound(op_code).is_some()
    }
}

impl Default for LangTerms {
    fn default() -> Self {
        Self::new()
    }
}
