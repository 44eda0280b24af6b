//! Structural transformers: rewrite the addresses stored in formula trees when rows or columns
//! are inserted or removed, cells are moved, or a sheet is removed.
//!
//! Every edit kind implements [`FormulaTransformer`]'s four address hooks; the tree walk
//! ([`transform_ast`]) is shared.

mod history;
mod move_cells;
mod remove_sheet;
mod span;

use formula_address::{CellAddress, CellRange, ColumnRange, RowRange, SimpleCellAddress};
use log::debug;

use crate::ast::{
    ArrayLiteral, Ast, BinaryExpr, Expr, FunctionCall, Parenthesis, PostfixExpr, UnaryExpr,
};
use crate::cache::ParserWithCaching;
use crate::graph::ArrayFormulaGraph;
use crate::{ErrorKind, TransformError};

pub use history::{Transformation, TransformationHistory, TransformationLog};
pub use move_cells::{DependentFormulaTransformer, MoveCellsTransformer};
pub use remove_sheet::RemoveSheetTransformer;
pub use span::{Axis, InsertSpanTransformer, RemoveSpanTransformer};

/// Outcome of transforming one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressTransform<T> {
    /// The address is not affected by the edit.
    Unchanged,
    /// The address now has to be stored as the given value.
    Shifted(T),
    /// The edit destroyed what the address pointed at.
    Ref,
}

impl<T> AddressTransform<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, AddressTransform::Unchanged)
    }
}

/// A structural edit, seen from the formulas that reference the edited cells.
///
/// `formula` is the address of the cell holding the formula *before* the edit.
pub trait FormulaTransformer {
    /// Insertions can be undone by the matching removal; removals and moves cannot.
    fn is_irreversible(&self) -> bool;

    fn transform_cell_address(
        &self,
        dependency: CellAddress,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellAddress>, TransformError>;

    fn transform_cell_range(
        &self,
        dependency: CellRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellRange>, TransformError>;

    fn transform_column_range(
        &self,
        dependency: ColumnRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<ColumnRange>, TransformError>;

    fn transform_row_range(
        &self,
        dependency: RowRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<RowRange>, TransformError>;

    /// Where the formula's own cell ends up after the edit.
    fn fix_node_address(&self, address: SimpleCellAddress) -> SimpleCellAddress;

    /// Rewrite `ast` (stored in the cell `address`) and move the cell itself.
    fn transform(
        &self,
        ast: &Ast,
        address: SimpleCellAddress,
    ) -> Result<(Ast, SimpleCellAddress), TransformError> {
        let (ast, _) = transform_ast(self, ast, address)?;
        Ok((ast, self.fix_node_address(address)))
    }
}

/// Rewrite every address in `ast` through `transformer`'s hooks.
///
/// Returns the new tree and whether anything changed; an unchanged tree is a plain clone.
pub fn transform_ast<T>(
    transformer: &T,
    ast: &Ast,
    formula: SimpleCellAddress,
) -> Result<(Ast, bool), TransformError>
where
    T: FormulaTransformer + ?Sized,
{
    let expr = match &ast.expr {
        Expr::CellReference(address) => {
            apply(transformer.transform_cell_address(*address, formula)?, Expr::CellReference)
        }
        Expr::CellRange(range) => {
            apply(transformer.transform_cell_range(*range, formula)?, Expr::CellRange)
        }
        Expr::ColumnRange(range) => {
            apply(transformer.transform_column_range(*range, formula)?, Expr::ColumnRange)
        }
        Expr::RowRange(range) => {
            apply(transformer.transform_row_range(*range, formula)?, Expr::RowRange)
        }
        _ => return rewrite_children(ast, |child| transform_ast(transformer, child, formula)),
    };
    Ok(match expr {
        Some(expr) => (ast.replaced(expr), true),
        None => (ast.clone(), false),
    })
}

fn apply<T>(outcome: AddressTransform<T>, wrap: fn(T) -> Expr) -> Option<Expr> {
    match outcome {
        AddressTransform::Unchanged => None,
        AddressTransform::Shifted(address) => Some(wrap(address)),
        AddressTransform::Ref => Some(Expr::Error(ErrorKind::Ref)),
    }
}

/// Rebuild `ast` with every direct child replaced by `f(child)`.
fn rewrite_children<F>(ast: &Ast, mut f: F) -> Result<(Ast, bool), TransformError>
where
    F: FnMut(&Ast) -> Result<(Ast, bool), TransformError>,
{
    let mut changed = false;
    let mut child = |ast: &Ast| -> Result<Box<Ast>, TransformError> {
        let (ast, c) = f(ast)?;
        changed |= c;
        Ok(Box::new(ast))
    };

    let expr = match &ast.expr {
        Expr::Unary(unary) => Expr::Unary(UnaryExpr {
            op: unary.op,
            expr: child(&unary.expr)?,
        }),
        Expr::Postfix(postfix) => Expr::Postfix(PostfixExpr {
            op: postfix.op,
            expr: child(&postfix.expr)?,
        }),
        Expr::Binary(binary) => {
            let left = child(&binary.left)?;
            let right = child(&binary.right)?;
            Expr::Binary(BinaryExpr {
                op: binary.op,
                left,
                right,
            })
        }
        Expr::Parenthesis(paren) => Expr::Parenthesis(Parenthesis {
            expr: child(&paren.expr)?,
            internal_whitespace: paren.internal_whitespace.clone(),
        }),
        Expr::FunctionCall(call) => {
            let args = call
                .args
                .iter()
                .map(|arg| child(arg).map(|arg| *arg))
                .collect::<Result<Vec<_>, _>>()?;
            Expr::FunctionCall(FunctionCall {
                name: call.name.clone(),
                args,
                internal_whitespace: call.internal_whitespace.clone(),
            })
        }
        Expr::Array(array) => {
            let rows = array
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|element| child(element).map(|element| *element))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            Expr::Array(ArrayLiteral {
                rows,
                internal_whitespace: array.internal_whitespace.clone(),
            })
        }
        _ => return Ok((ast.clone(), false)),
    };

    if !changed {
        return Ok((ast.clone(), false));
    }
    Ok((ast.replaced(expr), true))
}

/// Rewrite every array formula in `graph` eagerly, re-caching each new tree.
///
/// Returns the number of formulas whose tree changed.
pub fn perform_eager_transformations(
    graph: &mut dyn ArrayFormulaGraph,
    transformer: &dyn FormulaTransformer,
    parser: &mut ParserWithCaching,
) -> Result<usize, TransformError> {
    let mut rewritten = 0;
    for node in graph.array_formula_nodes() {
        let (ast, address) = transformer.transform(node.formula(), node.address())?;
        if ast != **node.formula() {
            let entry = parser.remember_new_ast(ast);
            node.set_formula(entry.ast.clone());
            rewritten += 1;
        }
        node.set_address(address);
    }
    debug!("eagerly transformed {rewritten} array formula(s)");
    Ok(rewritten)
}
