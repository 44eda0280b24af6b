//! References a formula reads from, as stored in its tree.

use formula_address::{
    CellAddress, CellRange, ColumnRange, RowRange, SheetId, SimpleCellAddress, SimpleCellRange,
};
use serde::{Deserialize, Serialize};

use crate::ast::{Ast, Expr};

/// A reference taken from a formula tree, still relative to the formula's cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativeDependency {
    Cell(CellAddress),
    CellRange(CellRange),
    ColumnRange(ColumnRange),
    RowRange(RowRange),
    NamedExpression(String),
}

/// A dependency resolved against the formula's position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbsoluteDependency {
    Cell(SimpleCellAddress),
    CellRange(SimpleCellRange),
    /// Inclusive column span.
    Columns { sheet: SheetId, start: i32, end: i32 },
    /// Inclusive row span.
    Rows { sheet: SheetId, start: i32, end: i32 },
    NamedExpression(String),
}

impl RelativeDependency {
    /// Resolve against `base`. `None` when the reference points outside the sheet.
    pub fn to_absolute(&self, base: SimpleCellAddress) -> Option<AbsoluteDependency> {
        Some(match self {
            RelativeDependency::Cell(address) => {
                let target = address.to_simple(base);
                if target.is_invalid() {
                    return None;
                }
                AbsoluteDependency::Cell(target)
            }
            RelativeDependency::CellRange(range) => {
                let start = range.start.to_simple(base);
                let end = range.end.to_simple(base);
                if start.is_invalid() || end.is_invalid() {
                    return None;
                }
                AbsoluteDependency::CellRange(SimpleCellRange::new(start, end))
            }
            RelativeDependency::ColumnRange(range) => {
                let start = range.start.to_simple(base);
                let end = range.end.to_simple(base);
                if start.is_invalid() || end.is_invalid() {
                    return None;
                }
                AbsoluteDependency::Columns {
                    sheet: start.sheet,
                    start: start.col,
                    end: end.col,
                }
            }
            RelativeDependency::RowRange(range) => {
                let start = range.start.to_simple(base);
                let end = range.end.to_simple(base);
                if start.is_invalid() || end.is_invalid() {
                    return None;
                }
                AbsoluteDependency::Rows {
                    sheet: start.sheet,
                    start: start.row,
                    end: end.row,
                }
            }
            RelativeDependency::NamedExpression(name) => {
                AbsoluteDependency::NamedExpression(name.clone())
            }
        })
    }
}

/// Every reference in `ast`, in source order. Repeated references are listed each time.
pub fn collect_dependencies(ast: &Ast) -> Vec<RelativeDependency> {
    let mut out = Vec::new();
    collect_into(ast, &mut out);
    out
}

fn collect_into(ast: &Ast, out: &mut Vec<RelativeDependency>) {
    match &ast.expr {
        Expr::CellReference(address) => out.push(RelativeDependency::Cell(*address)),
        Expr::CellRange(range) => out.push(RelativeDependency::CellRange(*range)),
        Expr::ColumnRange(range) => out.push(RelativeDependency::ColumnRange(*range)),
        Expr::RowRange(range) => out.push(RelativeDependency::RowRange(*range)),
        Expr::NamedExpression(name) => {
            out.push(RelativeDependency::NamedExpression(name.clone()))
        }
        _ => {
            for child in ast.children() {
                collect_into(child, out);
            }
        }
    }
}

/// Whether any function call in `ast` satisfies `pred` (given the canonical name).
pub(crate) fn calls_function(ast: &Ast, pred: &dyn Fn(&str) -> bool) -> bool {
    if let Expr::FunctionCall(call) = &ast.expr {
        if pred(&call.name) {
            return true;
        }
    }
    ast.children()
        .into_iter()
        .any(|child| calls_function(child, pred))
}
