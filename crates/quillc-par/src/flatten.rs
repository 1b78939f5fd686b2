//! Tree flattening and its inverse.
//!
//! A flattened expression lists tokens in `[op, child1, child2]`
//! pre-order, which for the ternary works out to `? cond : true false`.
//! Because every operator's arity is known from its opcode, the list is
//! self-describing: a left-to-right scan where each operator consumes the
//! next N resolved operands collapses back to one value — that is exactly
//! what the flat-expression evaluator does, and what [`tree_from_flat`]
//! exploits to rebuild the tree.

use crate::tree::ExprNode;
use quillc_lex::opcodes::TERNARY_1ST_OPCODE;
use quillc_lex::{LangTerms, Token, TokenKind};
use thiserror::Error;

/// Flattening or rebuilding failed. These mark compiler bugs rather
/// than user mistakes: a well-formed tree from the parser always
/// flattens, and a writer-produced stream always rebuilds.
#[derive(Debug, Error, PartialEq)]
pub enum FlattenError {
    /// A user-source operator spelling survived classification.
    #[error("operator `{symbol}` carries no opcode and cannot be emitted")]
    NoOpcode { symbol: String },
    /// A token kind that has no place in an expression tree.
    #[error("node `{text}` is not valid inside an expression tree")]
    MalformedNode { text: String },
    /// The flat list ended while an operator still wanted operands.
    #[error("flat expression ends prematurely")]
    Truncated,
    /// An exec operator token carries an opcode outside the table.
    #[error("unknown opcode {op_code:#04x} in flat expression")]
    UnknownOpcode { op_code: u8 },
    /// Tokens remained after the root subtree was rebuilt.
    #[error("flat expression has trailing tokens past the root")]
    TrailingTokens,
}

/// Flatten `tree` into the `[op, operands...]` token list, converting
/// source operators into exec operators along the way.
///
/// # Arguments
///
/// * `tree` - A fully-folded expression tree from the parser
/// * `terms` - The vocabulary supplying opcodes for each symbol
///
/// # Example
///
/// ```
/// use quillc_lex::{tokenize, LangTerms};
/// use quillc_par::{flatten, ExprEnder, ExprParser};
/// use quillc_sem::ScopeStack;
///
/// let terms = LangTerms::new();
/// let tokens = tokenize("1 + 2 * 3;", "a.ql", &terms).unwrap();
/// let mut pos = 0;
/// let parsed = ExprParser::new(&terms)
///     .parse(&tokens, &mut pos, ExprEnder::Semicolon, &ScopeStack::new())
///     .unwrap();
///
/// let flat = flatten(&parsed.tree, &terms).unwrap();
/// let texts: Vec<&str> = flat.iter().map(|t| t.text.as_str()).collect();
/// assert_eq!(texts, vec!["B+", "1", "*", "2", "3"]);
/// ```
pub fn flatten(tree: &ExprNode, terms: &LangTerms) -> Result<Vec<Token>, FlattenError> {
    let mut out = Vec::new();
    flatten_into(tree, terms, &mut out)?;
    Ok(out)
}

fn flatten_into(
    node: &ExprNode,
    terms: &LangTerms,
    out: &mut Vec<Token>,
) -> Result<(), FlattenError> {
    match node.token.kind {
        TokenKind::SrcOpr8r => {
            let op_code =
                terms
                    .op_code_for(&node.token.text)
                    .ok_or_else(|| FlattenError::NoOpcode {
                        symbol: node.token.text.clone(),
                    })?;
            out.push(Token::exec_opr8r(
                op_code,
                node.token.text.clone(),
                node.token.pos.clone(),
            ));
        }
        TokenKind::ExecOpr8r | TokenKind::SystemCall | TokenKind::UserWord => {
            out.push(node.token.clone());
        }
        kind if kind.is_literal() => {
            out.push(node.token.clone());
        }
        _ => {
            return Err(FlattenError::MalformedNode {
                text: node.token.text.clone(),
            })
        }
    }
    if let Some(c1) = &node.child1 {
        flatten_into(c1, terms, out)?;
    }
    if let Some(c2) = &node.child2 {
        flatten_into(c2, terms, out)?;
    }
    Ok(())
}

/// Rebuild the expression tree a flat token list describes. Exact inverse
/// of [`flatten`] for well-formed input.
///
/// # Example
///
/// ```
/// use quillc_lex::{tokenize, LangTerms};
/// use quillc_par::{flatten, tree_from_flat, ExprEnder, ExprParser};
/// use quillc_sem::ScopeStack;
///
/// let terms = LangTerms::new();
/// let tokens = tokenize("(1 + 2) * 3;", "a.ql", &terms).unwrap();
/// let mut pos = 0;
/// let parsed = ExprParser::new(&terms)
///     .parse(&tokens, &mut pos, ExprEnder::Semicolon, &ScopeStack::new())
///     .unwrap();
///
/// let flat = flatten(&parsed.tree, &terms).unwrap();
/// let rebuilt = tree_from_flat(&flat, &terms).unwrap();
/// assert!(parsed.tree.same_shape(&rebuilt));
/// ```
pub fn tree_from_flat(tokens: &[Token], terms: &LangTerms) -> Result<ExprNode, FlattenError> {
    let mut idx = 0;
    let tree = build(tokens, &mut idx, terms)?;
    if idx != tokens.len() {
        return Err(FlattenError::TrailingTokens);
    }
    Ok(tree)
}

/// Consume one subtree from `tokens[*idx..]`: an operator takes as many
/// child subtrees as its arity says, a system call takes its single
/// argument, leaves take nothing.
fn build(tokens: &[Token], idx: &mut usize, terms: &LangTerms) -> Result<ExprNode, FlattenError> {
    let tkn = tokens.get(*idx).ok_or(FlattenError::Truncated)?.clone();
    *idx += 1;

    match tkn.kind {
        TokenKind::ExecOpr8r => {
            let op_code = tkn.op_code();
            // In the flat layout `?` is followed by its condition and the
            // whole `:` subtree, even though it needs only the condition
            // resolved at exec time.
            let child_cnt = if op_code == TERNARY_1ST_OPCODE {
                2
            } else {
                terms
                    .exec_operand_cnt(op_code)
                    .ok_or(FlattenError::UnknownOpcode { op_code })?
            };
            let mut node = ExprNode::leaf(tkn);
            if child_cnt >= 1 {
                node.child1 = Some(Box::new(build(tokens, idx, terms)?));
            }
            if child_cnt >= 2 {
                node.child2 = Some(Box::new(build(tokens, idx, terms)?));
            }
            Ok(node)
        }
        TokenKind::SystemCall => {
            let mut node = ExprNode::leaf(tkn);
            node.child1 = Some(Box::new(build(tokens, idx, terms)?));
            Ok(node)
        }
        TokenKind::UserWord => Ok(ExprNode::leaf(tkn)),
        kind if kind.is_literal() => Ok(ExprNode::leaf(tkn)),
        _ => Err(FlattenError::MalformedNode { text: tkn.text }),
    }
}
