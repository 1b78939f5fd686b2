//! The flat-expression evaluator.
//!
//! Consumes a flattened expression (`op, operands...` order) in place:
//! scan forward for the first *ready* element, execute it, write the
//! result into the operator's slot, erase the consumed operands, repeat.
//! An exec operator is ready when all of its following operand slots are
//! already non-operator tokens; `&&`, `||` and `?` are ready as soon as
//! their left-hand side is, because they may skip the rest.
//!
//! The same evaluator runs twice per program: once inside the compiler
//! (`CompileTime`) to catch type errors and compute constant
//! initializers, and again in the interpreter (`RunTime`). The modes
//! differ only where the spec says they must: an uninitialized read is a
//! warning with the placeholder value at compile time and a hard error at
//! run time, and `print_line` only touches stdout at run time.

use quillc_lex::opcodes::*;
use quillc_lex::{LangTerms, MathError, Token, TokenKind, Value};
use quillc_sem::{Access, ScopeError, ScopeStack};
use quillc_util::{internal_err, InternalError, MessageCollector, SrcPos};

use thiserror::Error;

/// Which phase is driving the evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalMode {
    /// The compiler's smoke run: uninitialized reads warn and continue
    /// with the placeholder value, `print_line` stays quiet.
    CompileTime,
    /// The interpreter's real run: uninitialized reads are hard errors,
    /// `print_line` writes to stdout.
    RunTime,
}

/// What went wrong while reducing an expression. Everything except
/// `Internal` is the user's program misbehaving; the statement compiler
/// logs those and recovers, the interpreter stops on them.
#[derive(Debug, Error)]
pub enum EvalError {
    /// An arithmetic/comparison operation failed (divide by zero, type
    /// mismatch, overflow, ...).
    #[error("{source}")]
    Math {
        #[source]
        source: MathError,
        pos: SrcPos,
    },
    /// An assignment could not coerce into the declared type.
    #[error("{source}")]
    Assign {
        #[source]
        source: ScopeError,
        pos: SrcPos,
    },
    /// Run-time read of a variable that was never written.
    #[error("variable `{name}` read before it was initialized")]
    UninitializedRead { name: String, pos: SrcPos },
    /// Name lookup failed entirely.
    #[error("variable `{name}` has not been declared")]
    UnknownVariable { name: String, pos: SrcPos },
    /// `++`, `--` or an assignment aimed at something that is not a
    /// variable name.
    #[error("`{symbol}` requires a named variable operand")]
    NeedsVariable { symbol: String, pos: SrcPos },
    /// A `&&`/`||`/`?` operand with no truthiness.
    #[error("condition does not resolve to true or false")]
    NotACondition { pos: SrcPos },
    /// A system call rejected its argument.
    #[error("system call `{name}` failed: {detail}")]
    SysCall {
        name: String,
        detail: String,
        pos: SrcPos,
    },
    /// The stream never offers a ready element; the operand-count
    /// discipline is broken.
    #[error("expression is malformed and cannot be reduced")]
    Malformed { pos: SrcPos },
    /// A bug in the toolchain, not in the user's program.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl EvalError {
    /// Everything except an internal invariant failure is the user's
    /// program misbehaving.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, EvalError::Internal(_))
    }

    pub fn pos(&self) -> Option<&SrcPos> {
        match self {
            EvalError::Math { pos, .. }
            | EvalError::Assign { pos, .. }
            | EvalError::UninitializedRead { pos, .. }
            | EvalError::UnknownVariable { pos, .. }
            | EvalError::NeedsVariable { pos, .. }
            | EvalError::NotACondition { pos }
            | EvalError::SysCall { pos, .. }
            | EvalError::Malformed { pos } => Some(pos),
            EvalError::Internal(_) => None,
        }
    }
}

/// The reduction engine. Cheap to construct; holds no expression state.
///
/// # Example
///
/// ```
/// use quillc_int::{EvalMode, Evaluator};
/// use quillc_lex::{opcodes, LangTerms, Token, Value};
/// use quillc_sem::ScopeStack;
/// use quillc_util::{MessageCollector, SrcPos};
///
/// // the flattened form of `1 + 2`
/// let terms = LangTerms::new();
/// let mut flat = vec![
///     Token::exec_opr8r(opcodes::BINARY_PLUS_OPCODE, "B+", SrcPos::none()),
///     Token::from_value(Value::Int8(1), SrcPos::none()),
///     Token::from_value(Value::Int8(2), SrcPos::none()),
/// ];
///
/// let mut scopes = ScopeStack::new();
/// let mut msgs = MessageCollector::new();
/// let produced = Evaluator::new(&terms, EvalMode::RunTime)
///     .resolve_flat_expr(&mut flat, &mut scopes, &mut msgs)
///     .unwrap();
///
/// assert_eq!(produced, 1);
/// assert_eq!(flat[0].value, Value::Int8(3));
/// ```
pub struct Evaluator<'t> {
    terms: &'t LangTerms,
    mode: EvalMode,
    /// Narrate short-circuit skips on stdout (ILLUSTRATIVE level,
    /// run time only).
    illustrative: bool,
}

impl<'t> Evaluator<'t> {
    /// # Arguments
    ///
    /// * `terms` - The shared language vocabulary
    /// * `mode` - Compile-time checking or run-time execution
    pub fn new(terms: &'t LangTerms, mode: EvalMode) -> Self {
        Self {
            terms,
            mode,
            illustrative: false,
        }
    }

    /// Turn on stdout narration of short-circuit skips (run time only).
    pub fn with_illustrative(mut self, on: bool) -> Self {
        self.illustrative = on;
        self
    }

    /// Which phase this evaluator serves.
    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    /// Reduce a whole flattened expression to at most one result token.
    /// Returns the expected result count: 1, or 0 when the expression
    /// was a lone void system call (the vector is then empty).
    ///
    /// # Arguments
    ///
    /// * `tkns` - The flat expression, consumed and rewritten in place
    /// * `scopes` - The name space variables resolve against and
    ///   assignments commit into
    /// * `msgs` - Sink for compile-time warnings
    pub fn resolve_flat_expr(
        &self,
        tkns: &mut Vec<Token>,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<usize, EvalError> {
        if tkns.is_empty() {
            return Ok(0);
        }
        self.reduce_at(tkns, 0, scopes, msgs)?;
        match tkns.len() {
            0 => Ok(0),
            1 => Ok(1),
            _ => Err(EvalError::Malformed {
                pos: tkns[1].pos.clone(),
            }),
        }
    }

    /// Reduce the sub-expression starting at `start` until that slot
    /// holds a direct operand (or the void call consumed itself).
    ///
    /// This is the recursion point for the non-deciding side of `&&` and
    /// `||`: the right-hand sub-expression reduces in place without
    /// disturbing anything left of `start`.
    fn reduce_at(
        &self,
        tkns: &mut Vec<Token>,
        start: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        loop {
            if start >= tkns.len() {
                // A void system call erased itself.
                return Ok(());
            }
            if tkns[start].is_direct_operand() {
                return Ok(());
            }
            if tkns[start].kind == TokenKind::UserWord {
                let value = self.read_variable(&tkns[start], scopes, msgs)?;
                tkns[start].reset_to_value(value);
                return Ok(());
            }
            let idx = self.find_ready(tkns, start)?;
            self.exec_at(tkns, idx, scopes, msgs)?;
        }
    }

    /// First ready element at or after `start`.
    ///
    /// An exec operator is ready when its following `arity` slots all
    /// hold operands (resolved values or variable names); a system call
    /// when its parameter count is met. The short-circuiting forms
    /// (`&&`, `||`, `?`) are ready as soon as their left-hand slot is,
    /// since they may never need the rest. `:` is never ready on its
    /// own — the `?` to its left consumes it.
    fn find_ready(&self, tkns: &[Token], start: usize) -> Result<usize, EvalError> {
        for idx in start..tkns.len() {
            let tkn = &tkns[idx];
            match tkn.kind {
                TokenKind::ExecOpr8r => {
                    let op_code = tkn.op_code();
                    if op_code == TERNARY_2ND_OPCODE {
                        // `:` belongs to the `?` on its left; never
                        // executed on its own.
                        continue;
                    }
                    let short_circuits = matches!(
                        op_code,
                        TERNARY_1ST_OPCODE | LOGICAL_AND_OPCODE | LOGICAL_OR_OPCODE
                    );
                    if short_circuits {
                        if tkns.get(idx + 1).map(Token::is_operand).unwrap_or(false) {
                            return Ok(idx);
                        }
                        continue;
                    }
                    let arity = self
                        .terms
                        .exec_operand_cnt(op_code)
                        .ok_or_else(|| internal_err!("opcode {op_code:#04x} not in table"))?
                        as usize;
                    let slots = tkns.get(idx + 1..idx + 1 + arity);
                    if slots.map(|s| s.iter().all(Token::is_operand)).unwrap_or(false) {
                        return Ok(idx);
                    }
                }
                TokenKind::SystemCall => {
                    let def = self.terms.system_call(&tkn.text).ok_or_else(|| {
                        internal_err!("unregistered system call `{}`", tkn.text)
                    })?;
                    let arity = def.param_cnt as usize;
                    let slots = tkns.get(idx + 1..idx + 1 + arity);
                    if slots.map(|s| s.iter().all(Token::is_operand)).unwrap_or(false) {
                        return Ok(idx);
                    }
                }
                _ => {}
            }
        }
        Err(EvalError::Malformed {
            pos: tkns
                .get(start)
                .map(|t| t.pos.clone())
                .unwrap_or_else(SrcPos::none),
        })
    }

    /// Execute the ready element at `idx` in place: dispatch on the
    /// opcode to one handler per operator family, never through a
    /// vtable — the match keeps the critical path flat.
    fn exec_at(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        if tkns[idx].kind == TokenKind::SystemCall {
            return self.exec_system_call(tkns, idx, scopes, msgs);
        }
        let op_code = tkns[idx].op_code();
        match op_code {
            PRE_INCR_OPCODE | PRE_DECR_OPCODE | POST_INCR_OPCODE | POST_DECR_OPCODE => {
                self.exec_pre_post_fix(tkns, idx, scopes, msgs)
            }
            UNARY_PLUS_OPCODE | UNARY_MINUS_OPCODE | LOGICAL_NOT_OPCODE | BITWISE_NOT_OPCODE => {
                self.exec_unary(tkns, idx, scopes, msgs)
            }
            TERNARY_1ST_OPCODE => self.exec_ternary(tkns, idx, scopes, msgs),
            LOGICAL_AND_OPCODE | LOGICAL_OR_OPCODE => self.exec_logical(tkns, idx, scopes, msgs),
            op if self.terms.is_assignment_opcode(op) => {
                self.exec_assignment(tkns, idx, scopes, msgs)
            }
            _ => self.exec_binary(tkns, idx, scopes, msgs),
        }
    }

    /// `++`/`--` in both positions. The operand must be a bound variable;
    /// the committed value wraps at the variable's declared width.
    fn exec_pre_post_fix(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        let op_code = tkns[idx].op_code();
        let op_pos = tkns[idx].pos.clone();
        let operand = &tkns[idx + 1];
        if operand.kind != TokenKind::UserWord {
            return Err(EvalError::NeedsVariable {
                symbol: tkns[idx].text.clone(),
                pos: op_pos,
            });
        }
        let name = operand.text.clone();
        let old = self.read_variable(operand, scopes, msgs)?;

        let new = match op_code {
            PRE_INCR_OPCODE | POST_INCR_OPCODE => old.incremented(),
            _ => old.decremented(),
        }
        .map_err(|source| EvalError::Math {
            source,
            pos: op_pos.clone(),
        })?;

        let stored = self.commit(&name, new, &op_pos, scopes)?;
        let result = match op_code {
            PRE_INCR_OPCODE | PRE_DECR_OPCODE => stored,
            _ => old,
        };
        tkns[idx].reset_to_value(result);
        tkns.remove(idx + 1);
        Ok(())
    }

    /// `+u` `-u` `!` `~` — one operand, resolved through the name space
    /// if it is a variable, result into the operator's slot.
    fn exec_unary(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        let op_code = tkns[idx].op_code();
        let pos = tkns[idx].pos.clone();
        let operand = self.resolve_operand(&tkns[idx + 1], scopes, msgs)?;
        let result = match op_code {
            UNARY_PLUS_OPCODE => operand.unary_plus(),
            UNARY_MINUS_OPCODE => operand.negate(),
            LOGICAL_NOT_OPCODE => operand.logical_not(),
            BITWISE_NOT_OPCODE => operand.bitwise_not(),
            _ => return Err(internal_err!("opcode {op_code:#04x} is not unary").into()),
        }
        .map_err(|source| EvalError::Math { source, pos })?;
        tkns[idx].reset_to_value(result);
        tkns.remove(idx + 1);
        Ok(())
    }

    /// Plain two-operand operators: arithmetic, shifts, bitwise,
    /// comparisons. Left operand first, always — prefix/postfix side
    /// effects must land in source order.
    fn exec_binary(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        let op_code = tkns[idx].op_code();
        let pos = tkns[idx].pos.clone();
        let lhs = self.resolve_operand(&tkns[idx + 1], scopes, msgs)?;
        let rhs = self.resolve_operand(&tkns[idx + 2], scopes, msgs)?;
        let result = self
            .apply_binary(op_code, &lhs, &rhs)?
            .map_err(|source| EvalError::Math { source, pos })?;
        tkns[idx].reset_to_value(result);
        tkns.drain(idx + 1..idx + 3);
        Ok(())
    }

    /// The arithmetic/shift/bitwise/comparison dispatch shared by plain
    /// binary operators and the compound-assignment rewrite. Math
    /// semantics live on [`Value`]; this only maps opcodes to methods,
    /// with comparisons collapsing the three-way ordering into the
    /// requested boolean.
    fn apply_binary(
        &self,
        op_code: u8,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<Result<Value, MathError>, EvalError> {
        use std::cmp::Ordering;
        let cmp = |wanted: &[Ordering]| -> Result<Value, MathError> {
            lhs.ordering(rhs)
                .map(|ord| Value::Bool(wanted.contains(&ord)))
                .ok_or(MathError::TypeMismatch)
        };
        Ok(match op_code {
            MULTIPLY_OPCODE => lhs.multiply(rhs),
            DIV_OPCODE => lhs.divide(rhs),
            MOD_OPCODE => lhs.modulo(rhs),
            BINARY_PLUS_OPCODE => lhs.add(rhs),
            BINARY_MINUS_OPCODE => lhs.subtract(rhs),
            LEFT_SHIFT_OPCODE => lhs.shift_left(rhs),
            RIGHT_SHIFT_OPCODE => lhs.shift_right(rhs),
            BITWISE_AND_OPCODE => lhs.bit_and(rhs),
            BITWISE_XOR_OPCODE => lhs.bit_xor(rhs),
            BITWISE_OR_OPCODE => lhs.bit_or(rhs),
            LESS_THAN_OPCODE => cmp(&[Ordering::Less]),
            LESS_EQUALS_OPCODE => cmp(&[Ordering::Less, Ordering::Equal]),
            GREATER_THAN_OPCODE => cmp(&[Ordering::Greater]),
            GREATER_EQUALS_OPCODE => cmp(&[Ordering::Greater, Ordering::Equal]),
            EQUALITY_OPCODE => lhs
                .equality(rhs)
                .map(Value::Bool)
                .ok_or(MathError::TypeMismatch),
            NOT_EQUALS_OPCODE => lhs
                .equality(rhs)
                .map(|eq| Value::Bool(!eq))
                .ok_or(MathError::TypeMismatch),
            _ => return Err(internal_err!("opcode {op_code:#04x} is not binary").into()),
        })
    }

    /// Assignment family: the left slot names the variable, the right
    /// slot is the committed value (after the compound rewrite).
    ///
    /// Compound forms (`+=`, `<<=`, ...) read the variable's current
    /// value, apply their underlying binary operator against the right
    /// side, then commit. The result token is whatever was actually
    /// stored after coercion.
    fn exec_assignment(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        let op_code = tkns[idx].op_code();
        let pos = tkns[idx].pos.clone();
        if tkns[idx + 1].kind != TokenKind::UserWord {
            return Err(EvalError::NeedsVariable {
                symbol: tkns[idx].text.clone(),
                pos,
            });
        }
        let name = tkns[idx + 1].text.clone();
        let rhs = self.resolve_operand(&tkns[idx + 2], scopes, msgs)?;

        let to_store = if op_code == ASSIGNMENT_OPCODE {
            rhs
        } else {
            let bin_op = self
                .terms
                .binary_opcode_for_compound(op_code)
                .ok_or_else(|| internal_err!("opcode {op_code:#04x} is not an assignment"))?;
            let current = self.read_variable(&tkns[idx + 1], scopes, msgs)?;
            self.apply_binary(bin_op, &current, &rhs)?
                .map_err(|source| EvalError::Math {
                    source,
                    pos: pos.clone(),
                })?
        };

        let stored = self.commit(&name, to_store, &pos, scopes)?;
        tkns[idx].reset_to_value(stored);
        tkns.drain(idx + 1..idx + 3);
        Ok(())
    }

    /// `&&` / `||` with the sub-expression skip for the untaken side.
    ///
    /// The left operand alone may decide the answer (`false` for `&&`,
    /// `true` for `||`); if it does, the whole right sub-expression is
    /// erased unevaluated — its side effects never happen. Otherwise the
    /// right side reduces recursively and the result normalizes to a
    /// boolean either way.
    fn exec_logical(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        let op_code = tkns[idx].op_code();
        let pos = tkns[idx].pos.clone();
        let lhs = self.resolve_operand(&tkns[idx + 1], scopes, msgs)?;
        let lhs_true = lhs.truthy().ok_or(EvalError::NotACondition {
            pos: tkns[idx + 1].pos.clone(),
        })?;

        let rhs_start = idx + 2;
        let rhs_end = self.find_sub_expr_end(tkns, rhs_start)?;

        let decides = (op_code == LOGICAL_AND_OPCODE && !lhs_true)
            || (op_code == LOGICAL_OR_OPCODE && lhs_true);
        let result = if decides {
            self.narrate_skip(&tkns[idx].text, &pos);
            tkns.drain(rhs_start..rhs_end);
            Value::Bool(lhs_true)
        } else {
            self.reduce_at(tkns, rhs_start, scopes, msgs)?;
            if rhs_start >= tkns.len() {
                // The right side was a void call; nothing to test.
                return Err(EvalError::NotACondition { pos });
            }
            let rhs = self.resolve_operand(&tkns[rhs_start], scopes, msgs)?;
            let rhs_true = rhs.truthy().ok_or(EvalError::NotACondition {
                pos: tkns[rhs_start].pos.clone(),
            })?;
            tkns.remove(rhs_start);
            Value::Bool(rhs_true)
        };
        // Either way the left side is consumed and the operator slot
        // takes the normalized boolean.
        tkns.remove(idx + 1);
        tkns[idx].reset_to_value(result);
        Ok(())
    }

    /// `?` with both branches laid out behind the `:`; exactly one of
    /// them survives.
    ///
    /// Layout at `idx`: `[? cond : true-branch false-branch]`. The
    /// condition's truthiness picks a branch, the other branch and the
    /// ternary plumbing are erased, and the survivor is left in place
    /// for the caller's loop to keep reducing.
    fn exec_ternary(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        let cond = self.resolve_operand(&tkns[idx + 1], scopes, msgs)?;
        let cond_true = cond.truthy().ok_or(EvalError::NotACondition {
            pos: tkns[idx + 1].pos.clone(),
        })?;

        let colon = tkns
            .get(idx + 2)
            .filter(|t| t.op_code() == TERNARY_2ND_OPCODE)
            .ok_or_else(|| internal_err!("ternary without its `:` divider"))?;
        let colon_pos = colon.pos.clone();

        let true_start = idx + 3;
        let true_end = self.find_sub_expr_end(tkns, true_start)?;
        let false_end = self.find_sub_expr_end(tkns, true_end)?;

        if cond_true {
            self.narrate_skip("?:false-branch", &colon_pos);
            tkns.drain(true_end..false_end);
            tkns.drain(idx..true_start);
        } else {
            self.narrate_skip("?:true-branch", &colon_pos);
            tkns.drain(idx..true_end);
        }
        // The surviving branch now sits at `idx`; the caller's loop keeps
        // reducing it.
        Ok(())
    }

    /// The registered system calls. `str` renders any resolved value as
    /// a string; `print_line` consumes one string and is void — the call
    /// and its argument vanish from the stream with no result slot.
    fn exec_system_call(
        &self,
        tkns: &mut Vec<Token>,
        idx: usize,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<(), EvalError> {
        let name = tkns[idx].text.clone();
        let pos = tkns[idx].pos.clone();
        let arg = self.resolve_operand(&tkns[idx + 1], scopes, msgs)?;

        match name.as_str() {
            "str" => {
                tkns[idx].reset_to_value(Value::Str(arg.to_string()));
                tkns.remove(idx + 1);
                Ok(())
            }
            "print_line" => {
                let line = match arg {
                    Value::Str(s) => s,
                    other => {
                        return Err(EvalError::SysCall {
                            name,
                            detail: format!("argument must be a string, not {other}"),
                            pos,
                        })
                    }
                };
                if self.mode == EvalMode::RunTime {
                    println!("{line}");
                }
                // Void: the call and its argument vanish from the stream.
                tkns.drain(idx..idx + 2);
                Ok(())
            }
            _ => Err(internal_err!("unregistered system call `{name}`").into()),
        }
    }

    /// End index (exclusive) of the sub-expression starting at `start`,
    /// found by walking the operand-count discipline: each operator asks
    /// for its operands, each resolved token satisfies one slot.
    fn find_sub_expr_end(&self, tkns: &[Token], start: usize) -> Result<usize, EvalError> {
        let mut remaining: i64 = 1;
        let mut idx = start;
        while remaining > 0 {
            let tkn = tkns
                .get(idx)
                .ok_or_else(|| internal_err!("sub-expression runs past the stream end"))?;
            match tkn.kind {
                TokenKind::ExecOpr8r => {
                    let op_code = tkn.op_code();
                    // `?` consumes its condition plus the whole `:`
                    // subtree; `:` consumes its two branches.
                    let arity = if op_code == TERNARY_1ST_OPCODE {
                        2
                    } else {
                        self.terms
                            .exec_operand_cnt(op_code)
                            .ok_or_else(|| internal_err!("opcode {op_code:#04x} not in table"))?
                    } as i64;
                    remaining += arity - 1;
                }
                TokenKind::SystemCall => {
                    let def = self.terms.system_call(&tkn.text).ok_or_else(|| {
                        internal_err!("unregistered system call `{}`", tkn.text)
                    })?;
                    remaining += def.param_cnt as i64 - 1;
                }
                _ => remaining -= 1,
            }
            idx += 1;
        }
        Ok(idx)
    }

    /// An operand slot's value: literals give their payload, variable
    /// names go through the mode-aware name-space read.
    fn resolve_operand(
        &self,
        tkn: &Token,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<Value, EvalError> {
        if tkn.kind == TokenKind::UserWord {
            return self.read_variable(tkn, scopes, msgs);
        }
        if tkn.is_direct_operand() {
            return Ok(tkn.value.clone());
        }
        Err(internal_err!("token `{}` is not an operand", tkn.text).into())
    }

    /// Read a variable with the mode-specific uninitialized policy.
    fn read_variable(
        &self,
        tkn: &Token,
        scopes: &mut ScopeStack,
        msgs: &mut MessageCollector,
    ) -> Result<Value, EvalError> {
        let var = scopes
            .lookup(&tkn.text, 0, Access::Read)
            .map_err(|_| EvalError::UnknownVariable {
                name: tkn.text.clone(),
                pos: tkn.pos.clone(),
            })?;
        if !var.initialized {
            match self.mode {
                EvalMode::CompileTime => {
                    msgs.warning(
                        format!("variable `{}` used before initialization", tkn.text),
                        tkn.pos.clone(),
                    );
                }
                EvalMode::RunTime => {
                    return Err(EvalError::UninitializedRead {
                        name: tkn.text.clone(),
                        pos: tkn.pos.clone(),
                    });
                }
            }
        }
        Ok(var.value)
    }

    /// Store `value` into the named variable through the coercing
    /// `CommitWrite` path; hands back what was actually stored (the
    /// value after width adjustment).
    fn commit(
        &self,
        name: &str,
        value: Value,
        pos: &SrcPos,
        scopes: &mut ScopeStack,
    ) -> Result<Value, EvalError> {
        scopes
            .lookup(name, 0, Access::CommitWrite(value))
            .map(|var| var.value)
            .map_err(|source| EvalError::Assign {
                source,
                pos: pos.clone(),
            })
    }

    /// One line of skip narration: always to the `log` facade, and to
    /// stdout when illustrative narration is on at run time.
    fn narrate_skip(&self, what: &str, pos: &SrcPos) {
        log::debug!("short-circuit: skipping untaken side of {what}");
        if self.illustrative && self.mode == EvalMode::RunTime {
            if pos.is_known() {
                println!("  [skip] {what} not evaluated ({pos})");
            } else {
                println!("  [skip] {what} not evaluated");
            }
        }
    }
}
