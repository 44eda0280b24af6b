//! Formula syntax tree.
//!
//! Every node carries the whitespace that preceded it in the source text (and, for bracketed
//! forms, the whitespace before the closing token) so that the unparser can reproduce the
//! formula byte for byte. Whitespace never changes evaluation.

use formula_address::{CellAddress, CellRange, ColumnRange, RowRange};
use serde::{Deserialize, Serialize};

use crate::ErrorKind;

/// A syntax tree node: an expression plus the whitespace written before it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ast {
    pub leading_whitespace: Option<String>,
    pub expr: Expr,
}

impl Ast {
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self {
            leading_whitespace: None,
            expr,
        }
    }

    #[must_use]
    pub fn with_whitespace(expr: Expr, leading_whitespace: Option<String>) -> Self {
        Self {
            leading_whitespace,
            expr,
        }
    }

    /// Replace the expression, keeping the leading whitespace.
    #[must_use]
    pub fn replaced(&self, expr: Expr) -> Self {
        Self {
            leading_whitespace: self.leading_whitespace.clone(),
            expr,
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self.expr, Expr::ErrorWithRawInput { .. })
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Ast> {
        match &self.expr {
            Expr::Unary(u) => vec![&*u.expr],
            Expr::Postfix(p) => vec![&*p.expr],
            Expr::Binary(b) => vec![&*b.left, &*b.right],
            Expr::FunctionCall(call) => call.args.iter().collect(),
            Expr::Parenthesis(p) => vec![&*p.expr],
            Expr::Array(arr) => arr.rows.iter().flatten().collect(),
            Expr::Empty
            | Expr::Number(_)
            | Expr::String(_)
            | Expr::NamedExpression(_)
            | Expr::CellReference(_)
            | Expr::CellRange(_)
            | Expr::ColumnRange(_)
            | Expr::RowRange(_)
            | Expr::Error(_)
            | Expr::ErrorWithRawInput { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// An omitted argument, e.g. the middle of `IF(A1,,2)`.
    Empty,
    /// Number literal in canonical text form (`.` as the decimal separator).
    Number(String),
    /// Unescaped string literal contents.
    String(String),
    Unary(UnaryExpr),
    Postfix(PostfixExpr),
    Binary(BinaryExpr),
    FunctionCall(FunctionCall),
    /// Reference to a named expression, as written.
    NamedExpression(String),
    Parenthesis(Parenthesis),
    Array(ArrayLiteral),
    CellReference(CellAddress),
    CellRange(CellRange),
    ColumnRange(ColumnRange),
    RowRange(RowRange),
    /// An error literal, or a reference destroyed by a structural edit.
    Error(ErrorKind),
    /// A fragment that could not be turned into a valid node; `raw` is reproduced verbatim.
    ErrorWithRawInput { raw: String, error: ErrorKind },
}

impl Expr {
    /// Numeric value of a number literal.
    pub fn number_value(&self) -> Option<f64> {
        match self {
            Expr::Number(raw) => raw.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Ast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostfixOp {
    Percent,
}

impl PostfixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PostfixOp::Percent => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostfixExpr {
    pub op: PostfixOp,
    pub expr: Box<Ast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    Add,
    Sub,
    Concat,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Pow => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Binary operation. The node's own leading whitespace is the whitespace before the operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Ast>,
    pub right: Box<Ast>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Canonical upper-case name (never localized).
    pub name: String,
    pub args: Vec<Ast>,
    pub internal_whitespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parenthesis {
    pub expr: Box<Ast>,
    pub internal_whitespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayLiteral {
    /// Row-major grid.
    pub rows: Vec<Vec<Ast>>,
    pub internal_whitespace: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_are_listed_left_to_right() {
        let one = Ast::new(Expr::Number("1".into()));
        let two = Ast::new(Expr::Number("2".into()));
        let sum = Ast::new(Expr::Binary(BinaryExpr {
            op: BinaryOp::Add,
            left: Box::new(one.clone()),
            right: Box::new(two.clone()),
        }));
        assert_eq!(sum.children(), vec![&one, &two]);
        assert_eq!(Expr::Number("1.5".into()).number_value(), Some(1.5));
    }
}
