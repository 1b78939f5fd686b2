//! The top-level statement compiler.
//!
//! Recursive descent over the committed token stream. Each statement form
//! emits one object into the output: declarations, if/else-if/else
//! ladders, while and for loops, `break`, and expression statements
//! (lone system calls included). Expressions are parsed by the
//! expression parser, flattened, emitted — and also *pre-evaluated* with
//! the shared evaluator in compile-time mode against the compiler's own
//! scope stack, which catches type errors, computes constant
//! initializers, and downgrades uninitialized reads to warnings. The
//! interpreter later replays the same bytecode against a fresh stack, so
//! nothing the pre-evaluation does here leaks into run time.
//!
//! User errors are logged and recovery skips to the next `;` (or the
//! enclosing `}`); compilation halts only past the configured error
//! limit or on an internal failure.

use crate::writer::{ObjWriter, WriterError};
use quillc_int::{EvalError, EvalMode, Evaluator};
use quillc_lex::opcodes::*;
use quillc_lex::{DataType, LangTerms, Token, TokenKind, Value};
use quillc_par::{flatten, ExprEnder, ExprParser, FlattenError, ParseError};
use quillc_sem::{Access, ScopeError, ScopeFrame, ScopeStack, Variable};
use quillc_util::{internal_err, InternalError, LogLevel, MessageCollector, SrcPos};
use std::io::{Seek, Write};
use thiserror::Error;

/// Compiler knobs; defaults match the CLI's.
///
/// # Example
///
/// ```
/// use quillc_gen::CompileOptions;
/// use quillc_util::LogLevel;
///
/// let opts = CompileOptions::default();
/// assert_eq!(opts.user_error_limit, 30);
/// assert_eq!(opts.log_level, LogLevel::Silent);
/// ```
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Stop recovering after this many user errors.
    pub user_error_limit: usize,
    pub log_level: LogLevel,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            user_error_limit: 30,
            log_level: LogLevel::Silent,
        }
    }
}

/// Fatal compiler failure. User errors in the source never show up here;
/// they go to the message collector and compilation keeps going.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The object sink failed or refused a token.
    #[error(transparent)]
    Writer(#[from] WriterError),
    /// The parser handed back a tree that cannot flatten — a compiler
    /// bug, since classification precedes folding.
    #[error(transparent)]
    Flatten(#[from] FlattenError),
    /// A compile-time scope invariant broke (mismatched frame close).
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// Pre-evaluation hit an internal invariant failure.
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Any other invariant violation.
    #[error(transparent)]
    Internal(#[from] InternalError),
    /// The configured user-error limit was reached; recovery stops.
    #[error("too many user errors ({count}); compilation halted")]
    TooManyErrors { count: usize },
}

/// What a single compiled statement means for the enclosing loop.
enum Flow {
    /// Statement done, keep going.
    Continue,
    /// A `}` is next (not consumed).
    ScopeEnd,
    /// The token stream ran out.
    StreamEnd,
}

/// Result of emitting one expression object.
struct EmittedExpr {
    /// The compile-time value, when pre-evaluation produced one.
    value: Option<Value>,
    /// Whether the expression references any variable.
    has_variables: bool,
    /// Pre-evaluation succeeded but yielded nothing (a void call).
    produced_nothing: bool,
}

/// Compiles one token stream into one object stream.
///
/// # Example
///
/// ```
/// use quillc_gen::{CompileOptions, StatementCompiler};
/// use quillc_lex::{tokenize, LangTerms};
/// use quillc_util::MessageCollector;
/// use std::io::Cursor;
///
/// let terms = LangTerms::new();
/// let tokens = tokenize("int8 a = 3 + 4 * 2;", "a.ql", &terms).unwrap();
///
/// let mut msgs = MessageCollector::new();
/// let compiler = StatementCompiler::new(
///     tokens,
///     &terms,
///     Cursor::new(Vec::new()),
///     CompileOptions::default(),
/// );
/// let sink = compiler.compile(&mut msgs).unwrap();
///
/// assert!(!msgs.has_user_errors());
/// assert!(sink.into_inner().len() > 5);
/// ```
pub struct StatementCompiler<'t, W: Write + Seek> {
    terms: &'t LangTerms,
    tokens: Vec<Token>,
    pos: usize,
    writer: ObjWriter<W>,
    parser: ExprParser<'t>,
    evaluator: Evaluator<'t>,
    scopes: ScopeStack,
    opts: CompileOptions,
}

impl<'t, W: Write + Seek> StatementCompiler<'t, W> {
    /// # Arguments
    ///
    /// * `tokens` - The committed token stream, `EndOfStream` last
    /// * `terms` - The shared language vocabulary
    /// * `sink` - Where the object stream goes
    /// * `opts` - Error limit and log level
    pub fn new(tokens: Vec<Token>, terms: &'t LangTerms, sink: W, opts: CompileOptions) -> Self {
        Self {
            terms,
            tokens,
            pos: 0,
            writer: ObjWriter::new(sink),
            parser: ExprParser::new(terms),
            evaluator: Evaluator::new(terms, EvalMode::CompileTime),
            scopes: ScopeStack::new(),
            opts,
        }
    }

    /// Compile the whole stream into the root anonymous scope object.
    /// Returns the sink; the caller judges success by the collector.
    ///
    /// `Ok` does not mean the program is good — it means compilation ran
    /// to the end. User errors live in `msgs` and the caller must check
    /// them before trusting (or running) the emitted object.
    ///
    /// # Arguments
    ///
    /// * `msgs` - Sink for every diagnostic the compile produces
    pub fn compile(mut self, msgs: &mut MessageCollector) -> Result<W, CompileError> {
        let root_start = self.writer.write_flex_begin(ANON_SCOPE_OPCODE)?;
        self.compile_scope_body(msgs, false)?;
        self.writer.write_flex_end(root_start)?;
        Ok(self.writer.into_inner())
    }

    // ----- token stream helpers -----

    /// The token under the cursor; the trailing `EndOfStream` once the
    /// stream is spent.
    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("stream ends with EndOfStream"))
    }

    /// Consume one token; saturates at the end of the stream.
    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Is the cursor on the given separator (`{`, `}`, `(`, ...)?
    fn at_separator(&self, text: &str) -> bool {
        let tkn = self.current();
        tkn.kind == TokenKind::Separator && tkn.text == text
    }

    /// Is the cursor on the given reserved word?
    fn at_reserved(&self, word: &str) -> bool {
        let tkn = self.current();
        tkn.kind == TokenKind::ReservedWord && tkn.text == word
    }

    /// Is the cursor on the statement-ending `;`?
    fn at_statement_ender(&self) -> bool {
        let tkn = self.current();
        tkn.kind == TokenKind::SrcOpr8r && tkn.text == self.terms.statement_ender_symbol()
    }

    /// Skip to just past the next `;`, stopping short of `}` and end of
    /// stream. Marks the recovery point with an info message.
    fn recover(&mut self, msgs: &mut MessageCollector) {
        loop {
            if self.current().kind == TokenKind::EndOfStream || self.at_separator("}") {
                break;
            }
            let was_ender = self.at_statement_ender();
            self.advance();
            if was_ender {
                break;
            }
        }
        msgs.info(
            "continuing compilation after error",
            self.current().pos.clone(),
        );
    }

    /// One parse failure into the collector, location attached.
    fn report_parse_error(&self, err: &ParseError, msgs: &mut MessageCollector) {
        msgs.user_error(err.to_string(), err.pos().clone());
    }

    // ----- statement dispatch -----

    /// Compile statements until the scope closes: a `}` when
    /// `inside_braces`, end of stream at the root. A stray `}` at the
    /// root and a missing `}` at end of stream are both user errors, not
    /// fatal ones.
    fn compile_scope_body(
        &mut self,
        msgs: &mut MessageCollector,
        inside_braces: bool,
    ) -> Result<(), CompileError> {
        loop {
            match self.compile_statement(msgs)? {
                Flow::Continue => {}
                Flow::ScopeEnd => {
                    if inside_braces {
                        self.advance();
                        return Ok(());
                    }
                    msgs.user_error("`}` without a matching `{`", self.current().pos.clone());
                    self.advance();
                }
                Flow::StreamEnd => {
                    if inside_braces {
                        msgs.user_error(
                            "scope is missing its closing `}`",
                            self.current().pos.clone(),
                        );
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Dispatch one statement by its leading token: declarations on a
    /// data type, control constructs on their reserved word, anonymous
    /// scopes on `{`, no-op empty statements on `;`, and everything else
    /// as an expression statement. Checks the error limit first so a
    /// hopeless stream stops burning time.
    fn compile_statement(&mut self, msgs: &mut MessageCollector) -> Result<Flow, CompileError> {
        if msgs.is_over_limit(self.opts.user_error_limit) {
            return Err(CompileError::TooManyErrors {
                count: self.opts.user_error_limit,
            });
        }

        let tkn = self.current().clone();
        match tkn.kind {
            TokenKind::EndOfStream => return Ok(Flow::StreamEnd),
            TokenKind::Separator if tkn.text == "}" => return Ok(Flow::ScopeEnd),
            TokenKind::SrcOpr8r if tkn.text == ";" => {
                // Empty statements are legal no-ops.
                self.advance();
            }
            TokenKind::DataType => self.compile_var_declaration(msgs)?,
            TokenKind::ReservedWord => match tkn.text.as_str() {
                "if" => self.compile_if_ladder(msgs)?,
                "while" => self.compile_while(msgs)?,
                "for" => self.compile_for(msgs)?,
                "break" => self.compile_break(msgs)?,
                "else" => {
                    msgs.user_error("`else` without a matching `if`", tkn.pos);
                    self.advance();
                    self.recover(msgs);
                }
                other => {
                    msgs.user_error(
                        format!("`{other}` is reserved but not supported here"),
                        tkn.pos,
                    );
                    self.advance();
                    self.recover(msgs);
                }
            },
            TokenKind::Separator if tkn.text == "{" => self.compile_anon_scope(msgs)?,
            TokenKind::Junk | TokenKind::Broken => {
                msgs.user_error(format!("unrecognized token {}", tkn.descr()), tkn.pos);
                self.advance();
                self.recover(msgs);
            }
            _ => self.compile_expression_statement(msgs)?,
        }
        Ok(Flow::Continue)
    }

    // ----- expressions -----

    /// Parse, flatten, pre-evaluate and emit one expression object.
    /// Returns `None` when parsing failed (already reported/recovered);
    /// otherwise the emission summary plus the terminator token, which
    /// declaration parsing inspects to tell `,` from `;`.
    fn parse_and_emit(
        &mut self,
        ender: ExprEnder,
        msgs: &mut MessageCollector,
    ) -> Result<Option<(EmittedExpr, Token)>, CompileError> {
        let parsed = match self
            .parser
            .parse(&self.tokens, &mut self.pos, ender, &self.scopes)
        {
            Ok(parsed) => parsed,
            Err(err) => {
                self.report_parse_error(&err, msgs);
                self.recover(msgs);
                return Ok(None);
            }
        };
        if self.opts.log_level.is_illustrative() {
            println!("[parse] {}", parsed.tree.sexpr());
        }
        let emitted = self.emit_expression_tree(&parsed.tree, msgs)?;
        Ok(Some((emitted, parsed.closer)))
    }

    /// Flatten a parsed tree, smoke-run the flat list in compile-time
    /// mode against the compiler's own scope stack, then emit the
    /// untouched original as an `EXPRESSION` object. Pre-evaluation
    /// failures that are the user's fault are logged and emission
    /// proceeds; internal ones abort.
    fn emit_expression_tree(
        &mut self,
        tree: &quillc_par::ExprNode,
        msgs: &mut MessageCollector,
    ) -> Result<EmittedExpr, CompileError> {
        let flat = flatten(tree, self.terms)?;
        let has_variables = flat.iter().any(|t| t.kind == TokenKind::UserWord);

        // Compile-time smoke run over a copy; the emitted stream is the
        // untouched original.
        let mut probe = flat.clone();
        let mut produced_nothing = false;
        let value = match self
            .evaluator
            .resolve_flat_expr(&mut probe, &mut self.scopes, msgs)
        {
            Ok(1) if probe.len() == 1 => Some(probe[0].value.clone()),
            Ok(n) => {
                produced_nothing = n == 0;
                None
            }
            Err(err) if err.is_user_error() => {
                let pos = err.pos().cloned().unwrap_or_else(SrcPos::none);
                msgs.user_error(err.to_string(), pos);
                None
            }
            Err(err) => return Err(err.into()),
        };

        self.writer.write_flat_expr(&flat)?;
        Ok(EmittedExpr {
            value,
            has_variables,
            produced_nothing,
        })
    }

    /// An `EXPRESSION` object with no payload; the empty `for` clauses.
    fn emit_empty_expression(&mut self) -> Result<(), CompileError> {
        let start = self.writer.write_flex_begin(EXPRESSION_OPCODE)?;
        self.writer.write_flex_end(start)?;
        Ok(())
    }

    fn compile_expression_statement(
        &mut self,
        msgs: &mut MessageCollector,
    ) -> Result<(), CompileError> {
        self.parse_and_emit(ExprEnder::Semicolon, msgs)?;
        Ok(())
    }

    // ----- declarations -----

    /// `DataType (UserWord (= expr)?)(, ...)* ;` — one
    /// `VARIABLES_DECLARATION` object holding the data-type opcode and
    /// each name, paired with its optional initializer expression. Each
    /// name is installed in the current compile-time frame before its
    /// initializer parses, and a pre-evaluated constant initializer is
    /// committed so later expressions see it.
    fn compile_var_declaration(&mut self, msgs: &mut MessageCollector) -> Result<(), CompileError> {
        let dtype_tkn = self.current().clone();
        let dtype = DataType::from_name(&dtype_tkn.text)
            .ok_or_else(|| internal_err!("data-type token `{}` unknown", dtype_tkn.text))?;
        self.advance();

        let start = self.writer.write_flex_begin(VARIABLES_DECLARATION_OPCODE)?;
        self.writer.write_byte(dtype.opcode())?;

        loop {
            let name_tkn = self.current().clone();
            if name_tkn.kind != TokenKind::UserWord {
                msgs.user_error(
                    format!("expected a variable name, found {}", name_tkn.descr()),
                    name_tkn.pos,
                );
                self.recover(msgs);
                break;
            }
            self.advance();

            if let Err(err) = self
                .scopes
                .insert_at_top(&name_tkn.text, Variable::declared(dtype))
            {
                msgs.user_error(err.to_string(), name_tkn.pos.clone());
            }
            self.writer.write_user_var(&name_tkn.text)?;
            log::trace!("declared {dtype} {}", name_tkn.text);

            let next = self.current().clone();
            if next.kind == TokenKind::SrcOpr8r && next.text == "=" {
                self.advance();
                match self.parse_and_emit(ExprEnder::SemicolonOrComma, msgs)? {
                    Some((emitted, closer)) => {
                        if emitted.produced_nothing {
                            msgs.user_error(
                                format!(
                                    "initializer for `{}` produces no value",
                                    name_tkn.text
                                ),
                                name_tkn.pos.clone(),
                            );
                        }
                        if let Some(value) = emitted.value {
                            // Constant-fold the initializer into the
                            // compile-time variable; a range failure here
                            // is the user's error, not the interpreter's.
                            if let Err(err) = self.scopes.lookup(
                                &name_tkn.text,
                                0,
                                Access::CommitWrite(value),
                            ) {
                                msgs.user_error(err.to_string(), name_tkn.pos.clone());
                            }
                        }
                        if closer.text == "," {
                            continue;
                        }
                        break;
                    }
                    None => break,
                }
            } else if next.kind == TokenKind::Separator && next.text == "," {
                self.advance();
                continue;
            } else if self.at_statement_ender() {
                self.advance();
                break;
            } else {
                msgs.user_error(
                    format!("expected `=`, `,` or `;`, found {}", next.descr()),
                    next.pos,
                );
                self.recover(msgs);
                break;
            }
        }

        self.writer.write_flex_end(start)?;
        Ok(())
    }

    // ----- control flow -----

    /// `if (...) body (else if (...) body)* (else body)?` — one
    /// `IF_SCOPE` object, then adjacent `ELSE_IF_SCOPE`/`ELSE_SCOPE`
    /// objects the interpreter walks by length header.
    fn compile_if_ladder(&mut self, msgs: &mut MessageCollector) -> Result<(), CompileError> {
        let if_tkn = self.current().clone();
        self.advance();
        self.compile_cond_block(IF_SCOPE_OPCODE, &if_tkn, msgs)?;

        loop {
            if !self.at_reserved("else") {
                break;
            }
            self.advance();
            if self.at_reserved("if") {
                let elif_tkn = self.current().clone();
                self.advance();
                self.compile_cond_block(ELSE_IF_SCOPE_OPCODE, &elif_tkn, msgs)?;
            } else {
                let start = self.writer.write_flex_begin(ELSE_SCOPE_OPCODE)?;
                self.compile_body(ELSE_SCOPE_OPCODE, msgs)?;
                self.writer.write_flex_end(start)?;
                break;
            }
        }
        Ok(())
    }

    /// `(cond) body` for `if` and `else if` blocks.
    fn compile_cond_block(
        &mut self,
        op_code: u8,
        opener: &Token,
        msgs: &mut MessageCollector,
    ) -> Result<(), CompileError> {
        if !self.expect_open_paren(opener, msgs) {
            return Ok(());
        }
        let start = self.writer.write_flex_begin(op_code)?;
        self.parse_and_emit(ExprEnder::CloseParen, msgs)?;
        self.compile_body(op_code, msgs)?;
        self.writer.write_flex_end(start)?;
        Ok(())
    }

    /// `while (...) body` — a `WHILE_SCOPE` object: condition
    /// expression, then body. A constant condition over a body with no
    /// `break` draws a warning (the run may never end).
    fn compile_while(&mut self, msgs: &mut MessageCollector) -> Result<(), CompileError> {
        let while_tkn = self.current().clone();
        self.advance();
        if !self.expect_open_paren(&while_tkn, msgs) {
            return Ok(());
        }
        let start = self.writer.write_flex_begin(WHILE_SCOPE_OPCODE)?;
        let cond = self.parse_and_emit(ExprEnder::CloseParen, msgs)?;
        let frame = self.compile_body(WHILE_SCOPE_OPCODE, msgs)?;
        self.writer.write_flex_end(start)?;

        if let Some((emitted, _)) = cond {
            if !emitted.has_variables && frame.loop_break_cnt == 0 {
                msgs.warning(
                    "loop condition is constant and the body has no `break`",
                    while_tkn.pos,
                );
            }
        }
        Ok(())
    }

    /// `for (init; cond; step) body` — a `FOR_SCOPE` object whose
    /// payload leads with three sub-objects (a declaration or
    /// expression for init, expressions for cond and step; empty
    /// clauses emit zero-payload expressions) followed by the body. No
    /// condition and no `break` anywhere in the body is a hard error: a
    /// statically infinite loop.
    fn compile_for(&mut self, msgs: &mut MessageCollector) -> Result<(), CompileError> {
        let for_tkn = self.current().clone();
        self.advance();
        if !self.expect_open_paren(&for_tkn, msgs) {
            return Ok(());
        }
        let start = self.writer.write_flex_begin(FOR_SCOPE_OPCODE)?;
        // The induction variable belongs to the loop's own frame.
        self.scopes
            .open(FOR_SCOPE_OPCODE, for_tkn.clone(), 0, 0);

        // init
        if self.at_statement_ender() {
            self.advance();
            self.emit_empty_expression()?;
        } else if self.current().kind == TokenKind::DataType {
            self.compile_var_declaration(msgs)?;
        } else {
            self.parse_and_emit(ExprEnder::Semicolon, msgs)?;
        }

        // cond
        let mut has_cond = false;
        if self.at_statement_ender() {
            self.advance();
            self.emit_empty_expression()?;
        } else {
            has_cond = true;
            self.parse_and_emit(ExprEnder::Semicolon, msgs)?;
        }
        self.scopes.top_mut().has_for_condition = has_cond;

        // step
        if self.at_separator(")") {
            self.advance();
            self.emit_empty_expression()?;
        } else {
            self.parse_and_emit(ExprEnder::CloseParen, msgs)?;
        }

        // body, inside the already-open for frame
        if self.at_separator("{") {
            self.advance();
            self.compile_scope_body(msgs, true)?;
        } else {
            self.compile_statement(msgs)?;
        }

        let frame = self.scopes.close_top(FOR_SCOPE_OPCODE)?;
        self.writer.write_flex_end(start)?;

        if !frame.has_for_condition && frame.loop_break_cnt == 0 {
            msgs.user_error(
                "`for` loop has no condition and no `break`; it can never terminate",
                for_tkn.pos,
            );
        }
        Ok(())
    }

    /// `break;` — a single opcode byte, legal only with a loop frame
    /// somewhere below; emitting it bumps that loop's break count.
    fn compile_break(&mut self, msgs: &mut MessageCollector) -> Result<(), CompileError> {
        let break_tkn = self.current().clone();
        self.advance();
        if !self.at_statement_ender() {
            msgs.user_error(
                format!("expected `;` after `break`, found {}", self.current().descr()),
                self.current().pos.clone(),
            );
            self.recover(msgs);
            return Ok(());
        }
        self.advance();

        if self.scopes.is_inside_loop(true).is_some() {
            self.writer.write_break()?;
        } else {
            msgs.user_error("`break` outside of any loop", break_tkn.pos);
        }
        Ok(())
    }

    /// A bare `{ ... }` block: an `ANON_SCOPE` object and a frame of its
    /// own, so declarations inside die at the `}`.
    fn compile_anon_scope(&mut self, msgs: &mut MessageCollector) -> Result<(), CompileError> {
        let brace_tkn = self.current().clone();
        self.advance();
        let start = self.writer.write_flex_begin(ANON_SCOPE_OPCODE)?;
        self.scopes
            .open(ANON_SCOPE_OPCODE, brace_tkn, 0, 0);
        self.compile_scope_body(msgs, true)?;
        self.scopes.close_top(ANON_SCOPE_OPCODE)?;
        self.writer.write_flex_end(start)?;
        Ok(())
    }

    /// Body of a control construct: `{ ... }` or a single statement,
    /// compiled inside a fresh frame for `op_code`. Returns the closed
    /// frame (for break counts).
    fn compile_body(
        &mut self,
        op_code: u8,
        msgs: &mut MessageCollector,
    ) -> Result<ScopeFrame, CompileError> {
        let opener = self.current().clone();
        self.scopes.open(op_code, opener, 0, 0);
        if self.at_separator("{") {
            self.advance();
            self.compile_scope_body(msgs, true)?;
        } else {
            self.compile_statement(msgs)?;
        }
        Ok(self.scopes.close_top(op_code)?)
    }

    /// Consume the `(` that must follow `if`/`while`/`for`; on anything
    /// else, report, recover, and tell the caller to bail out of the
    /// construct.
    fn expect_open_paren(&mut self, after: &Token, msgs: &mut MessageCollector) -> bool {
        if self.at_separator("(") {
            self.advance();
            return true;
        }
        msgs.user_error(
            format!(
                "expected `(` after `{}`, found {}",
                after.text,
                self.current().descr()
            ),
            self.current().pos.clone(),
        );
        self.recover(msgs);
        false
    }
}
