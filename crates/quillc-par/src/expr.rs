//! The expression parser: infix tokens to a binary tree.
//!
//! Shunting-yard-like, but recursive per parenthesis/ternary scope. The
//! parser keeps a stack of flat node lists; `(` and `?` push a new scope
//! whose "scopener" remembers who opened it. A legal-next-token bitmask
//! enforces well-formedness and doubles as the context that classifies
//! ambiguous operators (`+` `-` `++` `--`) into their disambiguated
//! internal forms.
//!
//! When a scope closes, its flat list folds into a tree by walking the
//! precedence groups tightest-first. Within a group each operator is
//! folded left-to-right wherever it is syntactically ready (its
//! neighbors are resolved operands). Two deliberate special cases:
//!
//! * `?` folds only once its `:` subtree was attached by the closing
//!   ternary scope, lifting its left neighbor as the condition;
//! * `:` folds dead last within a ternary scope — below the assignment
//!   family, deviating from strict C — so `x ? a = 1 : a = 2` parses.

use crate::tree::ExprNode;
use quillc_lex::terms::{
    BINARY, GNR8D_SRC, POSTFIX, PREFIX, TERNARY_1ST, TERNARY_2ND, UNARY,
};
use quillc_lex::{LangTerms, Token, TokenKind};
use quillc_sem::ScopeStack;
use quillc_util::SrcPos;
use thiserror::Error;

// Legal-next-token bits. The current mask says what the well-formedness
// FSM will accept next; it also decides how the ambiguous operators
// classify (binary where BINARY is legal, unary/prefix otherwise).
const VAR_NAME_NXT_OK: u32 = 0x001;
const LITERAL_NXT_OK: u32 = 0x002;
const PREFIX_OPR8R_NXT_OK: u32 = 0x004;
const UNARY_OPR8R_NXT_OK: u32 = 0x008;
const POSTFIX_OPR8R_NXT_OK: u32 = 0x010;
const BINARY_OPR8R_NXT_OK: u32 = 0x020;
const TERNARY_1ST_NXT_OK: u32 = 0x040;
const TERNARY_2ND_NXT_OK: u32 = 0x080;
const OPEN_PAREN_NXT_OK: u32 = 0x100;
const CLOSE_PAREN_NXT_OK: u32 = 0x200;

/// Expecting the start of an operand.
const OPERAND_START: u32 = VAR_NAME_NXT_OK
    | LITERAL_NXT_OK
    | PREFIX_OPR8R_NXT_OK
    | UNARY_OPR8R_NXT_OK
    | OPEN_PAREN_NXT_OK;

/// What terminates the expression at the root scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprEnder {
    /// `;` — expression statements.
    Semicolon,
    /// `;` or `,` — declaration initializers.
    SemicolonOrComma,
    /// The `)` matching an already-consumed `(` — control conditions.
    CloseParen,
}

/// A successfully parsed expression.
#[derive(Debug)]
pub struct ParsedExpr {
    pub tree: ExprNode,
    /// The terminator token that closed the expression (consumed).
    pub closer: Token,
    /// Whether the configured terminator was actually seen.
    pub is_closed: bool,
}

/// Everything that can go wrong between the first token of an
/// expression and its terminator. Each variant points at the offending
/// token; the statement compiler logs these and recovers to the next `;`.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// A token arrived where the legal-next set forbids it; the message
    /// spells out what would have been accepted.
    #[error("unexpected {found}; expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        pos: SrcPos,
    },
    /// The token stream ran out mid-expression.
    #[error("expression ended before its terminator")]
    UnexpectedEndOfStream { pos: SrcPos },
    /// A `(` or `?` scope was still open when the expression ended.
    #[error("unmatched `{opener}` left open")]
    UnclosedScope { opener: String, pos: SrcPos },
    /// A `:` with no ternary scope to divide.
    #[error("`:` without a matching `?`")]
    OrphanTernary2nd { pos: SrcPos },
    /// A second `:` inside one ternary scope.
    #[error("duplicate `:` within one ternary scope")]
    DuplicateTernary2nd { pos: SrcPos },
    /// A ternary scope closed without ever seeing its `:`.
    #[error("`?` without a matching `:`")]
    TernaryMissing2nd { pos: SrcPos },
    /// A name that no reachable frame declares.
    #[error("variable `{name}` has not been declared")]
    UndeclaredVariable { name: String, pos: SrcPos },
    /// The left side of an assignment is an r-value.
    #[error("assignment target must be a variable name")]
    BadAssignmentTarget { pos: SrcPos },
    /// `++`/`--` aimed at something other than a variable.
    #[error("`++`/`--` require a declared variable operand")]
    IncrDecrNeedsVariable { pos: SrcPos },
    /// A terminator arrived before any operand did.
    #[error("empty expression")]
    EmptyExpression { pos: SrcPos },
    /// The fold left more than one node; the expression is incoherent.
    #[error("expression does not reduce to a single result")]
    DoesNotReduce { pos: SrcPos },
}

impl ParseError {
    /// Source position of the offending token.
    pub fn pos(&self) -> &SrcPos {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::UnexpectedEndOfStream { pos }
            | ParseError::UnclosedScope { pos, .. }
            | ParseError::OrphanTernary2nd { pos }
            | ParseError::DuplicateTernary2nd { pos }
            | ParseError::TernaryMissing2nd { pos }
            | ParseError::UndeclaredVariable { pos, .. }
            | ParseError::BadAssignmentTarget { pos }
            | ParseError::IncrDecrNeedsVariable { pos }
            | ParseError::EmptyExpression { pos }
            | ParseError::DoesNotReduce { pos } => pos,
        }
    }
}

/// Who opened a parser scope.
enum Opener {
    Root,
    Paren { tkn: Token },
    /// The `?` node lives in the parent scope's list at `parent_idx`;
    /// the closed scope's tree becomes its second child.
    Ternary { tkn: Token, parent_idx: usize },
}

struct NestedScope {
    list: Vec<ExprNode>,
    opener: Opener,
    ternary_2nd_cnt: u32,
}

impl NestedScope {
    fn new(opener: Opener) -> Self {
        Self {
            list: Vec::new(),
            opener,
            ternary_2nd_cnt: 0,
        }
    }
}

/// The expression parser. Stateless apart from the term table; each
/// [`parse`](ExprParser::parse) call is independent.
///
/// # Example
///
/// ```
/// use quillc_lex::{tokenize, LangTerms};
/// use quillc_par::{ExprEnder, ExprParser};
/// use quillc_sem::ScopeStack;
///
/// let terms = LangTerms::new();
/// let tokens = tokenize("1 + 2 * 3;", "a.ql", &terms).unwrap();
/// let scopes = ScopeStack::new();
///
/// let mut pos = 0;
/// let parsed = ExprParser::new(&terms)
///     .parse(&tokens, &mut pos, ExprEnder::Semicolon, &scopes)
///     .unwrap();
///
/// assert_eq!(parsed.tree.sexpr(), "(B+ 1 (* 2 3))");
/// assert_eq!(parsed.closer.text, ";");
/// ```
pub struct ExprParser<'t> {
    terms: &'t LangTerms,
}

impl<'t> ExprParser<'t> {
    /// # Arguments
    ///
    /// * `terms` - The shared language vocabulary
    pub fn new(terms: &'t LangTerms) -> Self {
        Self { terms }
    }

    /// Parse one expression from `tokens` starting at `*pos`, which is
    /// left pointing one past the consumed terminator. `scopes` is
    /// consulted read-only for variable-existence checks.
    ///
    /// # Arguments
    ///
    /// * `tokens` - The committed token stream
    /// * `pos` - In/out cursor into `tokens`
    /// * `ender` - Which terminator closes this expression
    /// * `scopes` - Current declarations, for name checks
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{tokenize, LangTerms};
    /// use quillc_par::{ExprEnder, ExprParser, ParseError};
    /// use quillc_sem::ScopeStack;
    ///
    /// let terms = LangTerms::new();
    /// let scopes = ScopeStack::new();
    /// let tokens = tokenize("ghost + 1;", "a.ql", &terms).unwrap();
    ///
    /// let mut pos = 0;
    /// let err = ExprParser::new(&terms)
    ///     .parse(&tokens, &mut pos, ExprEnder::Semicolon, &scopes)
    ///     .unwrap_err();
    /// assert!(matches!(err, ParseError::UndeclaredVariable { .. }));
    /// ```
    pub fn parse(
        &self,
        tokens: &[Token],
        pos: &mut usize,
        ender: ExprEnder,
        scopes: &ScopeStack,
    ) -> Result<ParsedExpr, ParseError> {
        let mut stack = vec![NestedScope::new(Opener::Root)];
        let mut legal = OPERAND_START;

        loop {
            let tkn = match tokens.get(*pos) {
                Some(t) => t,
                None => {
                    return Err(ParseError::UnexpectedEndOfStream {
                        pos: tokens
                            .last()
                            .map(|t| t.pos.clone())
                            .unwrap_or_else(SrcPos::none),
                    })
                }
            };

            match tkn.kind {
                TokenKind::EndOfStream => {
                    return Err(self.unclosed_or_end(&stack, tkn));
                }

                TokenKind::Separator if tkn.text == "(" => {
                    self.expect(legal, OPEN_PAREN_NXT_OK, tkn)?;
                    stack.push(NestedScope::new(Opener::Paren { tkn: tkn.clone() }));
                    legal = OPERAND_START;
                }

                TokenKind::Separator if tkn.text == ")" => {
                    // A `)` may close ternary scopes, then a paren scope —
                    // or, at the root with the right ender, terminate the
                    // whole expression.
                    self.expect(legal, CLOSE_PAREN_NXT_OK, tkn)?;
                    self.close_ternary_scopes(&mut stack, tkn, scopes)?;
                    match self.close_paren_result(&mut stack, tkn, ender, scopes, pos)? {
                        Some(done) => return Ok(done),
                        None => {
                            legal = self.after_close_paren_mask(&stack);
                        }
                    }
                }

                TokenKind::Separator if tkn.text == "," => {
                    if ender != ExprEnder::SemicolonOrComma {
                        return Err(self.unexpected(legal, tkn));
                    }
                    self.expect_terminator(legal, tkn, &stack)?;
                    self.close_ternary_scopes(&mut stack, tkn, scopes)?;
                    if stack.len() > 1 {
                        return Err(self.unclosed_or_end(&stack, tkn));
                    }
                    return self.finish(&mut stack, tkn, pos, scopes);
                }

                TokenKind::Separator => {
                    return Err(self.unexpected(legal, tkn));
                }

                TokenKind::SrcOpr8r if tkn.text == ";" => {
                    if ender == ExprEnder::CloseParen {
                        return Err(self.unclosed_or_end(&stack, tkn));
                    }
                    self.expect_terminator(legal, tkn, &stack)?;
                    self.close_ternary_scopes(&mut stack, tkn, scopes)?;
                    if stack.len() > 1 {
                        return Err(self.unclosed_or_end(&stack, tkn));
                    }
                    return self.finish(&mut stack, tkn, pos, scopes);
                }

                TokenKind::SrcOpr8r if tkn.text == self.terms.ternary_1st_symbol() => {
                    self.expect(legal, TERNARY_1ST_NXT_OK, tkn)?;
                    let cur = stack.last_mut().expect("scope stack never empty");
                    cur.list.push(ExprNode::leaf(tkn.clone()));
                    let parent_idx = cur.list.len() - 1;
                    stack.push(NestedScope::new(Opener::Ternary {
                        tkn: tkn.clone(),
                        parent_idx,
                    }));
                    legal = OPERAND_START;
                }

                TokenKind::SrcOpr8r if tkn.text == self.terms.ternary_2nd_symbol() => {
                    let cur = stack.last_mut().expect("scope stack never empty");
                    match cur.opener {
                        Opener::Ternary { .. } => {}
                        _ => {
                            return Err(ParseError::OrphanTernary2nd {
                                pos: tkn.pos.clone(),
                            })
                        }
                    }
                    if cur.ternary_2nd_cnt > 0 {
                        return Err(ParseError::DuplicateTernary2nd {
                            pos: tkn.pos.clone(),
                        });
                    }
                    self.expect(legal, TERNARY_2ND_NXT_OK, tkn)?;
                    cur.ternary_2nd_cnt += 1;
                    cur.list.push(ExprNode::leaf(tkn.clone()));
                    legal = OPERAND_START;
                }

                TokenKind::SrcOpr8r => {
                    legal = self.push_classified_opr8r(&mut stack, tkn, legal)?;
                }

                TokenKind::UserWord => {
                    self.expect(legal, VAR_NAME_NXT_OK, tkn)?;
                    if !scopes.exists(&tkn.text, 0) {
                        return Err(ParseError::UndeclaredVariable {
                            name: tkn.text.clone(),
                            pos: tkn.pos.clone(),
                        });
                    }
                    stack
                        .last_mut()
                        .expect("scope stack never empty")
                        .list
                        .push(ExprNode::leaf(tkn.clone()));
                    legal = self.after_value_mask(&stack);
                }

                TokenKind::SystemCall => {
                    self.expect(legal, VAR_NAME_NXT_OK | LITERAL_NXT_OK, tkn)?;
                    stack
                        .last_mut()
                        .expect("scope stack never empty")
                        .list
                        .push(ExprNode::leaf(tkn.clone()));
                    // Only the argument list may follow a call name.
                    legal = OPEN_PAREN_NXT_OK;
                }

                kind if kind.is_literal() => {
                    self.expect(legal, LITERAL_NXT_OK, tkn)?;
                    stack
                        .last_mut()
                        .expect("scope stack never empty")
                        .list
                        .push(ExprNode::leaf(tkn.clone()));
                    legal = self.after_value_mask(&stack);
                }

                _ => {
                    return Err(self.unexpected(legal, tkn));
                }
            }
            *pos += 1;
        }
    }

    /// Close ternary scopes (attaching each tree to its `?`) until a
    /// paren or root scope is on top.
    fn close_ternary_scopes(
        &self,
        stack: &mut Vec<NestedScope>,
        close_tkn: &Token,
        scopes: &ScopeStack,
    ) -> Result<(), ParseError> {
        while matches!(
            stack.last().map(|s| &s.opener),
            Some(Opener::Ternary { .. })
        ) {
            self.close_ternary_scope(stack, close_tkn, scopes)?;
        }
        Ok(())
    }

    /// After ternary scopes are peeled: fold the paren scope on top and
    /// attach its tree to the parent (or report the stray `)`).
    ///
    /// At the root scope this `)` is either the expression's own
    /// terminator (when the caller consumed the matching `(` and asked
    /// for `CloseParen` ending) — producing the finished expression —
    /// or plain unexpected.
    fn close_paren_result(
        &self,
        stack: &mut Vec<NestedScope>,
        close_tkn: &Token,
        ender: ExprEnder,
        scopes: &ScopeStack,
        pos: &mut usize,
    ) -> Result<Option<ParsedExpr>, ParseError> {
        match stack.last().map(|s| &s.opener) {
            Some(Opener::Paren { .. }) => {
                let scope = stack.pop().expect("paren scope on top");
                let subtree = self.fold_paren_contents(scope.list, close_tkn, stack, scopes)?;
                if let Some(subtree) = subtree {
                    let parent = stack.last_mut().expect("parent scope present");
                    parent.list.push(subtree);
                }
                Ok(None)
            }
            Some(Opener::Root) => {
                if ender == ExprEnder::CloseParen {
                    let root = stack.pop().expect("root scope present");
                    let tree = self.fold_scope(root.list, false, &close_tkn.pos, scopes)?;
                    *pos += 1;
                    Ok(Some(ParsedExpr {
                        tree,
                        closer: close_tkn.clone(),
                        is_closed: true,
                    }))
                } else {
                    Err(self.unexpected(0, close_tkn))
                }
            }
            _ => Err(self.unexpected(0, close_tkn)),
        }
    }

    /// Fold a closed `(...)` scope. When the node before the `(` was a
    /// system call still missing its argument, the subtree becomes that
    /// call's argument instead of a free-standing operand.
    fn fold_paren_contents(
        &self,
        list: Vec<ExprNode>,
        close_tkn: &Token,
        stack: &mut [NestedScope],
        scopes: &ScopeStack,
    ) -> Result<Option<ExprNode>, ParseError> {
        let parent = stack.last_mut().expect("parent scope present");
        let pending_call = parent
            .list
            .last_mut()
            .filter(|n| n.token.kind == TokenKind::SystemCall && n.child1.is_none());

        if let Some(call) = pending_call {
            if list.is_empty() {
                // A void argument list; arity is judged by the evaluator.
                return Ok(None);
            }
            let subtree = self.fold_scope(list, false, &close_tkn.pos, scopes)?;
            call.child1 = Some(Box::new(subtree));
            return Ok(None);
        }

        let subtree = self.fold_scope(list, false, &close_tkn.pos, scopes)?;
        Ok(Some(subtree))
    }

    /// Close the ternary scope on top: fold it (with `:` deferred last)
    /// and hang the tree off the opening `?` in the parent scope.
    ///
    /// The scope must have seen exactly one `:`; its fold produces the
    /// `:` node with both branches attached, which becomes the `?`
    /// node's second child. The `?` keeps waiting for its condition
    /// until the parent scope folds.
    fn close_ternary_scope(
        &self,
        stack: &mut Vec<NestedScope>,
        at_tkn: &Token,
        scopes: &ScopeStack,
    ) -> Result<(), ParseError> {
        let scope = stack.pop().expect("ternary scope on top");
        let (q_tkn, parent_idx) = match scope.opener {
            Opener::Ternary { tkn, parent_idx } => (tkn, parent_idx),
            _ => unreachable!("caller checked the opener"),
        };
        if scope.ternary_2nd_cnt != 1 {
            return Err(ParseError::TernaryMissing2nd {
                pos: q_tkn.pos.clone(),
            });
        }
        let subtree = self.fold_scope(scope.list, true, &at_tkn.pos, scopes)?;
        let parent = stack.last_mut().expect("parent scope present");
        parent.list[parent_idx].child2 = Some(Box::new(subtree));
        Ok(())
    }

    /// Root-scope terminator found and consumed: fold the root list into
    /// the final tree and hand it back with its closer.
    fn finish(
        &self,
        stack: &mut Vec<NestedScope>,
        closer: &Token,
        pos: &mut usize,
        scopes: &ScopeStack,
    ) -> Result<ParsedExpr, ParseError> {
        let root = stack.pop().expect("root scope present");
        let tree = self.fold_scope(root.list, false, &closer.pos, scopes)?;
        *pos += 1;
        Ok(ParsedExpr {
            tree,
            closer: closer.clone(),
            is_closed: true,
        })
    }

    /// Classify an ambiguous or plain operator against the legal-next
    /// mask, rewrite its symbol to the internal disambiguated form, and
    /// append it. Returns the next legal mask.
    fn push_classified_opr8r(
        &self,
        stack: &mut [NestedScope],
        tkn: &Token,
        legal: u32,
    ) -> Result<u32, ParseError> {
        let type_mask = self.terms.type_mask_of(&tkn.text);
        if type_mask == 0 {
            return Err(self.unexpected(legal, tkn));
        }

        let (symbol, next_legal) = if tkn.text == "++" || tkn.text == "--" {
            if legal & POSTFIX_OPR8R_NXT_OK != 0 {
                (
                    self.terms.unique_postfix_symbol(&tkn.text),
                    self.after_postfix_mask(stack),
                )
            } else if legal & PREFIX_OPR8R_NXT_OK != 0 {
                (self.terms.unique_prefix_symbol(&tkn.text), OPERAND_START)
            } else {
                return Err(self.unexpected(legal, tkn));
            }
        } else if type_mask & BINARY != 0 && legal & BINARY_OPR8R_NXT_OK != 0 {
            (self.terms.unique_binary_symbol(&tkn.text), OPERAND_START)
        } else if type_mask & UNARY != 0 && legal & UNARY_OPR8R_NXT_OK != 0 {
            (self.terms.unique_unary_symbol(&tkn.text), OPERAND_START)
        } else {
            return Err(self.unexpected(legal, tkn));
        };

        let mut node_tkn = tkn.clone();
        node_tkn.text = symbol.to_string();
        stack
            .last_mut()
            .expect("scope stack never empty")
            .list
            .push(ExprNode::leaf(node_tkn));
        Ok(next_legal)
    }

    /// Mask after a committed value (variable or literal).
    fn after_value_mask(&self, stack: &[NestedScope]) -> u32 {
        let mut mask = BINARY_OPR8R_NXT_OK
            | POSTFIX_OPR8R_NXT_OK
            | TERNARY_1ST_NXT_OK
            | CLOSE_PAREN_NXT_OK;
        if self.in_ternary_scope(stack) {
            mask |= TERNARY_2ND_NXT_OK;
        }
        mask
    }

    /// Mask after a postfix operator: like after a value, minus another
    /// postfix.
    fn after_postfix_mask(&self, stack: &[NestedScope]) -> u32 {
        self.after_value_mask(stack) & !POSTFIX_OPR8R_NXT_OK
    }

    /// Mask after `)`: binary, ternary, another close — but no postfix.
    fn after_close_paren_mask(&self, stack: &[NestedScope]) -> u32 {
        let mut mask = BINARY_OPR8R_NXT_OK | TERNARY_1ST_NXT_OK | CLOSE_PAREN_NXT_OK;
        if self.in_ternary_scope(stack) {
            mask |= TERNARY_2ND_NXT_OK;
        }
        mask
    }

    /// Is the innermost open scope a ternary one? Decides whether `:` is
    /// in the legal-next set.
    fn in_ternary_scope(&self, stack: &[NestedScope]) -> bool {
        matches!(
            stack.last().map(|s| &s.opener),
            Some(Opener::Ternary { .. })
        )
    }

    /// A terminator is legal exactly where a binary operator would be:
    /// after a completed value.
    fn expect_terminator(
        &self,
        legal: u32,
        tkn: &Token,
        stack: &[NestedScope],
    ) -> Result<(), ParseError> {
        if stack.len() == 1 && stack[0].list.is_empty() {
            return Err(ParseError::EmptyExpression {
                pos: tkn.pos.clone(),
            });
        }
        if legal & BINARY_OPR8R_NXT_OK == 0 {
            return Err(self.unexpected(legal, tkn));
        }
        Ok(())
    }

    /// The token's role must intersect the legal-next mask.
    fn expect(&self, legal: u32, wanted: u32, tkn: &Token) -> Result<(), ParseError> {
        if legal & wanted == 0 {
            return Err(self.unexpected(legal, tkn));
        }
        Ok(())
    }

    /// Build the "unexpected X; expected Y or Z" report for `tkn`.
    fn unexpected(&self, legal: u32, tkn: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            found: tkn.descr(),
            expected: expected_set_str(legal),
            pos: tkn.pos.clone(),
        }
    }

    /// Stream ended (or hit `;`) with scopes still open: report the
    /// innermost unclosed opener.
    fn unclosed_or_end(&self, stack: &[NestedScope], at: &Token) -> ParseError {
        for scope in stack.iter().rev() {
            match &scope.opener {
                Opener::Paren { tkn } | Opener::Ternary { tkn, .. } => {
                    return ParseError::UnclosedScope {
                        opener: tkn.text.clone(),
                        pos: tkn.pos.clone(),
                    }
                }
                Opener::Root => {}
            }
        }
        ParseError::UnexpectedEndOfStream {
            pos: at.pos.clone(),
        }
    }

    // ----- scope folding -----

    /// Is this node a fully-built operand: a leaf value/name, or an
    /// operator with all required children attached?
    fn is_resolved(&self, node: &ExprNode) -> bool {
        match node.token.kind {
            TokenKind::SrcOpr8r => {
                let mask = self.terms.type_mask_of(&node.token.text);
                if mask & TERNARY_1ST != 0 || mask & TERNARY_2ND != 0 {
                    node.child1.is_some() && node.child2.is_some()
                } else if mask & (UNARY | PREFIX | POSTFIX) != 0 {
                    node.child1.is_some()
                } else if mask & BINARY != 0 {
                    node.child1.is_some() && node.child2.is_some()
                } else {
                    false
                }
            }
            TokenKind::SystemCall => node.child1.is_some(),
            TokenKind::UserWord => true,
            kind => kind.is_literal(),
        }
    }

    /// Fold one closed scope's flat list into a single tree.
    ///
    /// Precedence groups are walked tightest-first; within a group, each
    /// generated-source operator folds left-to-right wherever it is
    /// syntactically ready. In a ternary scope the `:` group is skipped
    /// and folded dead last.
    fn fold_scope(
        &self,
        mut list: Vec<ExprNode>,
        opened_by_ternary: bool,
        at: &SrcPos,
        _scopes: &ScopeStack,
    ) -> Result<ExprNode, ParseError> {
        if list.is_empty() {
            return Err(ParseError::EmptyExpression { pos: at.clone() });
        }

        for group in self.terms.precedence_groups() {
            // Only generated-source entries fold; the ambiguous user
            // spellings were rewritten during classification. `:` is
            // deferred below assignment, deliberately.
            let symbols: Vec<&str> = group
                .opr8rs
                .iter()
                .filter(|op| op.usage_mask & GNR8D_SRC != 0)
                .filter(|op| !(opened_by_ternary && op.type_mask & TERNARY_2ND != 0))
                .map(|op| op.symbol)
                .collect();
            if !symbols.is_empty() {
                self.fold_group(&mut list, &symbols)?;
            }
        }

        if opened_by_ternary {
            if let Some(idx) = list
                .iter()
                .position(|n| n.token.text == self.terms.ternary_2nd_symbol() && !self.is_resolved(n))
            {
                self.lift_both_neighbors(&mut list, idx)?;
            }
        }

        if list.len() != 1 || !self.is_resolved(&list[0]) {
            return Err(ParseError::DoesNotReduce { pos: at.clone() });
        }
        Ok(list.remove(0))
    }

    /// Fold every syntactically ready operator of one precedence group,
    /// scanning left-to-right and restarting after each splice, until the
    /// list has no foldable occurrence left. Scanning the whole group at
    /// once (rather than symbol by symbol) keeps mixed same-precedence
    /// chains left-associative.
    fn fold_group(&self, list: &mut Vec<ExprNode>, symbols: &[&str]) -> Result<(), ParseError> {
        loop {
            let mut folded_any = false;
            let mut idx = 0;
            while idx < list.len() {
                let node = &list[idx];
                let matches = node.token.kind == TokenKind::SrcOpr8r
                    && symbols.contains(&node.token.text.as_str())
                    && !self.is_resolved(node);
                if !matches {
                    idx += 1;
                    continue;
                }
                let symbol = node.token.text.clone();
                let mask = self.terms.type_mask_of(&symbol);

                let ready = if mask & TERNARY_1ST != 0 {
                    // `?` folds once its `:` subtree is in place.
                    list[idx].child2.is_some() && self.left_ready(list, idx)
                } else if mask & (PREFIX | UNARY) != 0 {
                    self.right_ready(list, idx)
                } else if mask & POSTFIX != 0 {
                    self.left_ready(list, idx)
                } else if mask & BINARY != 0 {
                    self.left_ready(list, idx) && self.right_ready(list, idx)
                } else {
                    false
                };
                if !ready {
                    idx += 1;
                    continue;
                }

                if mask & TERNARY_1ST != 0 {
                    self.lift_left_neighbor(list, idx, &symbol)?;
                } else if mask & (PREFIX | UNARY) != 0 {
                    self.lift_right_neighbor(list, idx, &symbol)?;
                } else if mask & POSTFIX != 0 {
                    self.lift_left_neighbor(list, idx, &symbol)?;
                } else {
                    self.lift_both_neighbors(list, idx)?;
                }
                folded_any = true;
                // Splicing invalidated the scan; restart.
                break;
            }
            if !folded_any {
                return Ok(());
            }
        }
    }

    fn left_ready(&self, list: &[ExprNode], idx: usize) -> bool {
        idx > 0 && self.is_resolved(&list[idx - 1])
    }

    fn right_ready(&self, list: &[ExprNode], idx: usize) -> bool {
        idx + 1 < list.len() && self.is_resolved(&list[idx + 1])
    }

    /// Lift `list[idx - 1]` under the operator at `idx` as its first
    /// child (postfix operand, or ternary condition).
    fn lift_left_neighbor(
        &self,
        list: &mut Vec<ExprNode>,
        idx: usize,
        symbol: &str,
    ) -> Result<(), ParseError> {
        let mask = self.terms.type_mask_of(symbol);
        let neighbor = list.remove(idx - 1);
        let node = &mut list[idx - 1];
        if mask & POSTFIX != 0 && neighbor.token.kind != TokenKind::UserWord {
            return Err(ParseError::IncrDecrNeedsVariable {
                pos: node.token.pos.clone(),
            });
        }
        node.child1 = Some(Box::new(neighbor));
        Ok(())
    }

    /// Lift `list[idx + 1]` under the operator at `idx` (prefix/unary
    /// operand).
    fn lift_right_neighbor(
        &self,
        list: &mut Vec<ExprNode>,
        idx: usize,
        symbol: &str,
    ) -> Result<(), ParseError> {
        let mask = self.terms.type_mask_of(symbol);
        let neighbor = list.remove(idx + 1);
        let node = &mut list[idx];
        if mask & PREFIX != 0 && neighbor.token.kind != TokenKind::UserWord {
            return Err(ParseError::IncrDecrNeedsVariable {
                pos: node.token.pos.clone(),
            });
        }
        node.child1 = Some(Box::new(neighbor));
        Ok(())
    }

    /// Lift both neighbors under the binary operator at `idx`.
    fn lift_both_neighbors(&self, list: &mut Vec<ExprNode>, idx: usize) -> Result<(), ParseError> {
        if idx == 0 || idx + 1 >= list.len() {
            return Err(ParseError::DoesNotReduce {
                pos: list[idx].token.pos.clone(),
            });
        }
        let right = list.remove(idx + 1);
        let left = list.remove(idx - 1);
        let node = &mut list[idx - 1];

        // Assignment targets must be plain variable names.
        if let Some(op_code) = self.terms.op_code_for(&node.token.text) {
            if self.terms.is_assignment_opcode(op_code)
                && left.token.kind != TokenKind::UserWord
            {
                return Err(ParseError::BadAssignmentTarget {
                    pos: node.token.pos.clone(),
                });
            }
        }
        node.child1 = Some(Box::new(left));
        node.child2 = Some(Box::new(right));
        Ok(())
    }
}

/// Render a legal-next mask as a human-readable expected set.
fn expected_set_str(legal: u32) -> String {
    if legal == 0 {
        return "end of expression".to_string();
    }
    let mut parts = Vec::new();
    if legal & VAR_NAME_NXT_OK != 0 {
        parts.push("a variable name");
    }
    if legal & LITERAL_NXT_OK != 0 {
        parts.push("a literal");
    }
    if legal & (PREFIX_OPR8R_NXT_OK | UNARY_OPR8R_NXT_OK) != 0 {
        parts.push("a prefix/unary operator");
    }
    if legal & POSTFIX_OPR8R_NXT_OK != 0 {
        parts.push("a postfix operator");
    }
    if legal & BINARY_OPR8R_NXT_OK != 0 {
        parts.push("a binary operator");
    }
    if legal & TERNARY_1ST_NXT_OK != 0 {
        parts.push("`?`");
    }
    if legal & TERNARY_2ND_NXT_OK != 0 {
        parts.push("`:`");
    }
    if legal & OPEN_PAREN_NXT_OK != 0 {
        parts.push("`(`");
    }
    if legal & CLOSE_PAREN_NXT_OK != 0 {
        parts.push("`)`");
    }
    parts.join(" or ")
}
