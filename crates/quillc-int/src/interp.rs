//! The top-level interpreter: executes a compiled object stream.
//!
//! Consumes the binary sequentially from the root anonymous scope,
//! dispatching on each statement object's opcode. Control constructs use
//! the length headers for flat skipping: an if/else-if/else ladder
//! evaluates conditions until one holds and jumps over the rest; loops
//! decode their condition/step expressions once and re-run the cached
//! token lists every iteration; `break` unwinds through the recursion by
//! returning the target loop's end position until the loop that owns it
//! consumes the signal.

use crate::eval::{EvalError, EvalMode, Evaluator};
use crate::reader::{ObjError, ObjReader};
use quillc_lex::opcodes::*;
use quillc_lex::{LangTerms, Token, TokenKind};
use quillc_sem::{Access, ScopeError, ScopeStack, Variable};
use quillc_util::{internal_err, InternalError, MessageCollector, SrcPos};
use std::io::{Read, Seek};
use thiserror::Error;

/// Why interpretation stopped. Runtime failures terminate execution;
/// the driver reports them with the source file attached.
#[derive(Debug, Error)]
pub enum InterpError {
    /// The object stream itself is unreadable or malformed.
    #[error(transparent)]
    Obj(#[from] ObjError),
    /// An expression failed to evaluate (divide by zero, uninitialized
    /// read, coercion failure, ...).
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// A scope-stack invariant broke (mismatched close, duplicate
    /// declaration the compiler should have caught).
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// The first object is not the root anonymous scope.
    #[error("object stream does not begin with a root scope")]
    MissingRootScope,
    /// A statement position holds an opcode no statement starts with.
    #[error("unexpected opcode {op_code:#04x} at {pos:#x} in a scope body")]
    UnexpectedOpcode { op_code: u8, pos: u32 },
    /// A `break` byte fired with no loop frame anywhere below.
    #[error("`break` executed outside any loop")]
    BreakOutsideLoop,
    /// A control construct's condition reduced to nothing (a void call).
    #[error("condition expression produced no value")]
    ConditionProducedNothing,
    /// A bug in the toolchain, not in the user's program.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// When a `break` fires, the body execution unwinds carrying the end
/// position of the loop that must stop.
type BreakSignal = Option<u32>;

/// Executes one compiled program against a fresh scope stack.
///
/// # Example
///
/// ```
/// use quillc_int::Interpreter;
/// use quillc_lex::{opcodes, LangTerms, Value};
/// use quillc_util::MessageCollector;
/// use std::io::Cursor;
///
/// // hand-built object stream: the compiled form of `uint8 x = 5;`
/// fn flex(op: u8, payload: &[u8]) -> Vec<u8> {
///     let mut out = vec![op];
///     out.extend_from_slice(&((payload.len() + 5) as u32).to_be_bytes());
///     out.extend_from_slice(payload);
///     out
/// }
/// let mut decl = vec![opcodes::DATA_TYPE_UINT8_OPCODE];
/// decl.extend(flex(opcodes::VAR_NAME_OPCODE, &[0x00, b'x']));
/// decl.extend(flex(opcodes::EXPRESSION_OPCODE, &[opcodes::UINT8_OPCODE, 5]));
/// let program = flex(
///     opcodes::ANON_SCOPE_OPCODE,
///     &flex(opcodes::VARIABLES_DECLARATION_OPCODE, &decl),
/// );
///
/// let terms = LangTerms::new();
/// let mut interp = Interpreter::new(Cursor::new(program), &terms);
/// let mut msgs = MessageCollector::new();
/// interp.run(&mut msgs).unwrap();
///
/// assert_eq!(interp.scopes().read("x").unwrap().value, Value::Uint8(5));
/// ```
pub struct Interpreter<'t, R: Read + Seek> {
    reader: ObjReader<'t, R>,
    terms: &'t LangTerms,
    eval: Evaluator<'t>,
    scopes: ScopeStack,
    illustrative: bool,
}

impl<'t, R: Read + Seek> Interpreter<'t, R> {
    /// # Arguments
    ///
    /// * `src` - The compiled object stream
    /// * `terms` - The shared language vocabulary
    pub fn new(src: R, terms: &'t LangTerms) -> Self {
        Self {
            reader: ObjReader::new(src, terms),
            terms,
            eval: Evaluator::new(terms, EvalMode::RunTime),
            scopes: ScopeStack::new(),
            illustrative: false,
        }
    }

    /// Narrate execution on stdout (ILLUSTRATIVE log level): taken
    /// branches, short-circuit skips, break targets.
    pub fn with_illustrative(mut self, on: bool) -> Self {
        self.illustrative = on;
        self.eval = Evaluator::new(self.terms, EvalMode::RunTime).with_illustrative(on);
        self
    }

    /// Final variable state, for inspection after [`run`](Self::run).
    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    /// Execute the whole program: read the root scope header, then walk
    /// its statement objects to completion. Run-time messages (if any)
    /// land in `msgs`; the final variable state stays readable through
    /// [`scopes`](Self::scopes) afterwards.
    pub fn run(&mut self, msgs: &mut MessageCollector) -> Result<(), InterpError> {
        self.reader.set_pos(0)?;
        let (op_code, total_len) = self.reader.read_flex_header()?;
        if op_code != ANON_SCOPE_OPCODE {
            return Err(InterpError::MissingRootScope);
        }
        let body_from = FLEX_OP_HEADER_NUM_BYTES;
        let signal = self.exec_scope_body(body_from, total_len, msgs)?;
        if signal.is_some() {
            return Err(InterpError::BreakOutsideLoop);
        }
        log::debug!("program executed to completion");
        Ok(())
    }

    /// Execute the statement objects in `[from, end)`.
    ///
    /// Each iteration peeks one opcode: a bare `BREAK` byte resolves its
    /// target loop and unwinds immediately; everything else is a
    /// flex-length object dispatched by opcode, with the length header
    /// giving the next statement's position. A break signal from a
    /// nested construct propagates straight out of this body.
    fn exec_scope_body(
        &mut self,
        from: u32,
        end: u32,
        msgs: &mut MessageCollector,
    ) -> Result<BreakSignal, InterpError> {
        let mut pos = from;
        while pos < end {
            self.reader.set_pos(pos)?;
            let op_code = self
                .reader
                .peek_next_byte()?
                .ok_or(ObjError::UnexpectedEof { pos })?;

            if op_code == BREAK_OPCODE {
                let target = self
                    .scopes
                    .is_inside_loop(false)
                    .ok_or(InterpError::BreakOutsideLoop)?;
                if self.illustrative {
                    println!("  [break] leaving loop ending at {target:#x}");
                }
                return Ok(Some(target));
            }

            let (_, total_len) = self.reader.read_flex_header()?;
            let obj_end = pos + total_len;

            match op_code {
                VARIABLES_DECLARATION_OPCODE => {
                    self.exec_var_declaration(pos, obj_end, msgs)?;
                    pos = obj_end;
                }
                EXPRESSION_OPCODE => {
                    self.reader.set_pos(pos)?;
                    let mut list = self.reader.read_expr_into_list()?;
                    self.eval.resolve_flat_expr(&mut list, &mut self.scopes, msgs)?;
                    pos = obj_end;
                }
                IF_SCOPE_OPCODE => {
                    let (next_pos, signal) = self.exec_if_ladder(pos, end, msgs)?;
                    if signal.is_some() {
                        return Ok(signal);
                    }
                    pos = next_pos;
                }
                WHILE_SCOPE_OPCODE => {
                    let signal = self.exec_while(pos, obj_end, msgs)?;
                    if signal.is_some() {
                        return Ok(signal);
                    }
                    pos = obj_end;
                }
                FOR_SCOPE_OPCODE => {
                    let signal = self.exec_for(pos, obj_end, msgs)?;
                    if signal.is_some() {
                        return Ok(signal);
                    }
                    pos = obj_end;
                }
                ANON_SCOPE_OPCODE => {
                    self.open_frame(ANON_SCOPE_OPCODE, "{", pos, total_len);
                    let signal = self.exec_scope_body(pos + FLEX_OP_HEADER_NUM_BYTES, obj_end, msgs);
                    self.scopes.close_top(ANON_SCOPE_OPCODE)?;
                    if let Some(target) = signal? {
                        return Ok(Some(target));
                    }
                    pos = obj_end;
                }
                other => {
                    return Err(InterpError::UnexpectedOpcode {
                        op_code: other,
                        pos,
                    })
                }
            }
        }
        Ok(None)
    }

    /// `[datatype][[VAR_NAME][EXPRESSION?]]+` — install each variable,
    /// then evaluate and commit its initializer if one follows.
    fn exec_var_declaration(
        &mut self,
        obj_start: u32,
        obj_end: u32,
        msgs: &mut MessageCollector,
    ) -> Result<(), InterpError> {
        self.reader.set_pos(obj_start + FLEX_OP_HEADER_NUM_BYTES)?;
        let dtype = self.reader.read_data_type_opcode()?;

        while self.reader.pos()? < obj_end {
            let name_start = self.reader.pos()?;
            let (op_code, name_len) = self.reader.read_flex_header()?;
            if op_code != VAR_NAME_OPCODE {
                return Err(InterpError::UnexpectedOpcode {
                    op_code,
                    pos: name_start,
                });
            }
            let name = self
                .reader
                .read_utf16_string(name_len - FLEX_OP_HEADER_NUM_BYTES)?;
            self.scopes.insert_at_top(&name, Variable::declared(dtype))?;
            log::trace!("declared {dtype} {name}");

            if self.reader.pos()? < obj_end
                && self.reader.peek_next_byte()? == Some(EXPRESSION_OPCODE)
            {
                let mut list = self.reader.read_expr_into_list()?;
                let after_expr = self.reader.pos()?;
                let produced =
                    self.eval.resolve_flat_expr(&mut list, &mut self.scopes, msgs)?;
                if produced != 1 {
                    return Err(internal_err!("initializer for `{name}` produced no value").into());
                }
                let value = list[0].value.clone();
                self.scopes.lookup(&name, 0, Access::CommitWrite(value))?;
                self.reader.set_pos(after_expr)?;
            }
        }
        Ok(())
    }

    /// `if (...) {...}` plus any adjacent `else if`/`else` blocks.
    /// Exactly one block body runs; the rest are skipped by their length
    /// headers. Returns the position after the whole ladder.
    fn exec_if_ladder(
        &mut self,
        if_pos: u32,
        scope_end: u32,
        msgs: &mut MessageCollector,
    ) -> Result<(u32, BreakSignal), InterpError> {
        let mut cur = if_pos;
        let mut taken = false;
        let mut signal: BreakSignal = None;

        while cur < scope_end {
            self.reader.set_pos(cur)?;
            let op_code = self
                .reader
                .peek_next_byte()?
                .ok_or(ObjError::UnexpectedEof { pos: cur })?;

            let is_first = cur == if_pos;
            let part_of_chain = (is_first && op_code == IF_SCOPE_OPCODE)
                || (!is_first
                    && matches!(op_code, ELSE_IF_SCOPE_OPCODE | ELSE_SCOPE_OPCODE));
            if !part_of_chain {
                break;
            }

            let (_, total_len) = self.reader.read_flex_header()?;
            let obj_end = cur + total_len;

            match op_code {
                IF_SCOPE_OPCODE | ELSE_IF_SCOPE_OPCODE => {
                    if !taken && signal.is_none() {
                        self.reader.set_pos(cur + FLEX_OP_HEADER_NUM_BYTES)?;
                        let cond_list = self.reader.read_expr_into_list()?;
                        let body_from = self.reader.pos()?;
                        if self.eval_condition(cond_list, msgs)? {
                            taken = true;
                            if self.illustrative {
                                println!("  [branch] condition at {cur:#x} holds; taking block");
                            }
                            self.open_frame(op_code, "if", cur, total_len);
                            let body_sig = self.exec_scope_body(body_from, obj_end, msgs);
                            self.scopes.close_top(op_code)?;
                            signal = body_sig?;
                        }
                    }
                    cur = obj_end;
                }
                ELSE_SCOPE_OPCODE => {
                    if !taken && signal.is_none() {
                        if self.illustrative {
                            println!("  [branch] no condition held; taking else block");
                        }
                        self.open_frame(ELSE_SCOPE_OPCODE, "else", cur, total_len);
                        let body_sig =
                            self.exec_scope_body(cur + FLEX_OP_HEADER_NUM_BYTES, obj_end, msgs);
                        self.scopes.close_top(ELSE_SCOPE_OPCODE)?;
                        signal = body_sig?;
                    }
                    cur = obj_end;
                    break;
                }
                _ => unreachable!("chain membership checked above"),
            }
        }
        Ok((cur, signal))
    }

    /// `while (...) {...}` — the condition is decoded once and re-run
    /// from the cached token list each iteration.
    fn exec_while(
        &mut self,
        obj_start: u32,
        obj_end: u32,
        msgs: &mut MessageCollector,
    ) -> Result<BreakSignal, InterpError> {
        self.reader.set_pos(obj_start + FLEX_OP_HEADER_NUM_BYTES)?;
        let cond_list = self.reader.read_expr_into_list()?;
        let body_from = self.reader.pos()?;
        let total_len = obj_end - obj_start;

        loop {
            if !self.eval_condition(cond_list.clone(), msgs)? {
                return Ok(None);
            }
            self.open_frame(WHILE_SCOPE_OPCODE, "while", obj_start, total_len);
            let body_sig = self.exec_scope_body(body_from, obj_end, msgs);
            self.scopes.close_top(WHILE_SCOPE_OPCODE)?;
            match body_sig? {
                Some(target) if target <= obj_end => return Ok(None),
                Some(target) => return Ok(Some(target)),
                None => {}
            }
        }
    }

    /// `for (init; cond; step) {...}` — init runs once; the cached cond
    /// and step lists re-run per iteration. An absent condition is
    /// always-true (the compiler guarantees a `break` exists).
    fn exec_for(
        &mut self,
        obj_start: u32,
        obj_end: u32,
        msgs: &mut MessageCollector,
    ) -> Result<BreakSignal, InterpError> {
        let total_len = obj_end - obj_start;
        // Init variables (e.g. the induction variable) live in the for
        // frame for the whole loop.
        self.open_frame(FOR_SCOPE_OPCODE, "for", obj_start, total_len);
        let result = self.exec_for_inner(obj_start, obj_end, msgs);
        self.scopes.close_top(FOR_SCOPE_OPCODE)?;
        let signal = result?;
        match signal {
            Some(target) if target <= obj_end => Ok(None),
            other => Ok(other),
        }
    }

    /// The body of [`exec_for`](Self::exec_for), split out so the for
    /// frame closes on every exit path: run init once, decode cond and
    /// step once, then iterate — cond, body (in a per-iteration block
    /// frame so its declarations reset), step.
    fn exec_for_inner(
        &mut self,
        obj_start: u32,
        obj_end: u32,
        msgs: &mut MessageCollector,
    ) -> Result<BreakSignal, InterpError> {
        self.reader.set_pos(obj_start + FLEX_OP_HEADER_NUM_BYTES)?;

        // Init: a declaration, an expression, or an empty expression.
        let init_pos = self.reader.pos()?;
        let init_op = self
            .reader
            .peek_next_byte()?
            .ok_or(ObjError::UnexpectedEof { pos: init_pos })?;
        if init_op == VARIABLES_DECLARATION_OPCODE {
            let (_, init_len) = self.reader.read_flex_header()?;
            self.exec_var_declaration(init_pos, init_pos + init_len, msgs)?;
            self.reader.set_pos(init_pos + init_len)?;
        } else {
            let mut init_list = self.reader.read_expr_into_list()?;
            self.eval
                .resolve_flat_expr(&mut init_list, &mut self.scopes, msgs)?;
        }

        let cond_list = self.reader.read_expr_into_list()?;
        let step_list = self.reader.read_expr_into_list()?;
        let body_from = self.reader.pos()?;

        loop {
            let cond_true = if cond_list.is_empty() {
                true
            } else {
                self.eval_condition(cond_list.clone(), msgs)?
            };
            if !cond_true {
                return Ok(None);
            }

            // Per-iteration block scope for body declarations.
            self.open_frame(ANON_SCOPE_OPCODE, "{", body_from, obj_end - body_from);
            let body_sig = self.exec_scope_body(body_from, obj_end, msgs);
            self.scopes.close_top(ANON_SCOPE_OPCODE)?;
            if let Some(target) = body_sig? {
                return Ok(Some(target));
            }

            if !step_list.is_empty() {
                let mut step = step_list.clone();
                self.eval.resolve_flat_expr(&mut step, &mut self.scopes, msgs)?;
            }
        }
    }

    /// Reduce a condition's token list (a fresh clone of the cached
    /// decode) and apply the truthiness rules to the single result.
    fn eval_condition(
        &mut self,
        mut list: Vec<Token>,
        msgs: &mut MessageCollector,
    ) -> Result<bool, InterpError> {
        let produced = self
            .eval
            .resolve_flat_expr(&mut list, &mut self.scopes, msgs)?;
        if produced != 1 {
            return Err(InterpError::ConditionProducedNothing);
        }
        list[0]
            .value
            .truthy()
            .ok_or_else(|| EvalError::NotACondition {
                pos: list[0].pos.clone(),
            }.into())
    }

    /// Open a runtime frame with a synthetic opener token; the byte
    /// range makes `break` target resolution work.
    fn open_frame(&mut self, op_code: u8, opener_text: &str, begin: u32, len: u32) {
        let opener = Token::new(TokenKind::InternalUse, opener_text, SrcPos::none());
        self.scopes.open(op_code, opener, begin, len);
    }
}
