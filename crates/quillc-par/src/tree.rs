//! Binary expression trees.
//!
//! Ownership runs one way: a node owns its children through `Box`. The
//! folding algorithm in `expr` works on flat per-scope lists, so nodes
//! never need a link back to their parent.

use quillc_lex::{Token, TokenKind};

/// One expression tree node: a token plus up to two children.
///
/// For a binary operator, `child1` is the left operand. A ternary `?`
/// holds its condition in `child1` and the `:` node in `child2`; the `:`
/// node holds the true branch in `child1` and the false branch in
/// `child2`. Unary, prefix and postfix operators keep their single
/// operand in `child1`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprNode {
    pub token: Token,
    pub child1: Option<Box<ExprNode>>,
    pub child2: Option<Box<ExprNode>>,
}

impl ExprNode {
    /// A childless node: a literal, a variable name, or an operator
    /// waiting for the fold to attach its operands.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{Token, Value};
    /// use quillc_par::ExprNode;
    /// use quillc_util::SrcPos;
    ///
    /// let node = ExprNode::leaf(Token::from_value(Value::Int8(3), SrcPos::none()));
    /// assert_eq!(node.attached_children(), 0);
    /// assert_eq!(node.sexpr(), "3");
    /// ```
    pub fn leaf(token: Token) -> Self {
        Self {
            token,
            child1: None,
            child2: None,
        }
    }

    /// How many children are attached so far.
    pub fn attached_children(&self) -> u8 {
        self.child1.is_some() as u8 + self.child2.is_some() as u8
    }

    /// Render as an s-expression over token texts; test and trace aid.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_lex::{Token, TokenKind, Value};
    /// use quillc_par::ExprNode;
    /// use quillc_util::SrcPos;
    ///
    /// let mut add = ExprNode::leaf(Token::new(TokenKind::SrcOpr8r, "B+", SrcPos::none()));
    /// add.child1 = Some(Box::new(ExprNode::leaf(
    ///     Token::from_value(Value::Int8(1), SrcPos::none()),
    /// )));
    /// add.child2 = Some(Box::new(ExprNode::leaf(
    ///     Token::from_value(Value::Int8(2), SrcPos::none()),
    /// )));
    /// assert_eq!(add.sexpr(), "(B+ 1 2)");
    /// ```
    pub fn sexpr(&self) -> String {
        match (&self.child1, &self.child2) {
            (None, None) => self.token.text.clone(),
            (Some(c1), None) => format!("({} {})", self.token.text, c1.sexpr()),
            (Some(c1), Some(c2)) => {
                format!("({} {} {})", self.token.text, c1.sexpr(), c2.sexpr())
            }
            (None, Some(c2)) => format!("({} _ {})", self.token.text, c2.sexpr()),
        }
    }

    /// Structural equality on kind, text and shape, ignoring source
    /// positions. Source and exec operator kinds count as equal so a tree
    /// survives flattening (which converts to exec form) and rebuilding.
    pub fn same_shape(&self, other: &ExprNode) -> bool {
        let opr8r_kinds = |k: TokenKind| {
            matches!(k, TokenKind::SrcOpr8r | TokenKind::ExecOpr8r)
        };
        let kinds_match = self.token.kind == other.token.kind
            || (opr8r_kinds(self.token.kind) && opr8r_kinds(other.token.kind));
        if !kinds_match || self.token.text != other.token.text {
            return false;
        }
        let kids_match = |a: &Option<Box<ExprNode>>, b: &Option<Box<ExprNode>>| match (a, b) {
            (None, None) => true,
            (Some(x), Some(y)) => x.same_shape(y),
            _ => false,
        };
        kids_match(&self.child1, &other.child1) && kids_match(&self.child2, &other.child2)
    }
}
