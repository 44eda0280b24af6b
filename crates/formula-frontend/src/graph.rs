//! What the front-end needs from the dependency graph that owns the formulas.

use std::sync::Arc;

use formula_address::SimpleCellAddress;

use crate::ast::Ast;

/// A graph node holding a formula.
pub trait FormulaNode {
    fn formula(&self) -> &Arc<Ast>;

    fn address(&self) -> SimpleCellAddress;

    fn set_formula(&mut self, ast: Arc<Ast>);

    fn set_address(&mut self, address: SimpleCellAddress);
}

/// Graph access for formulas that are transformed eagerly on every structural edit.
pub trait ArrayFormulaGraph {
    fn array_formula_nodes(&mut self) -> Box<dyn Iterator<Item = &mut dyn FormulaNode> + '_>;
}

/// A plain list of formula cells, for hosts that keep array formulas in a vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    pub ast: Arc<Ast>,
    pub address: SimpleCellAddress,
}

impl FormulaNode for FormulaCell {
    fn formula(&self) -> &Arc<Ast> {
        &self.ast
    }

    fn address(&self) -> SimpleCellAddress {
        self.address
    }

    fn set_formula(&mut self, ast: Arc<Ast>) {
        self.ast = ast;
    }

    fn set_address(&mut self, address: SimpleCellAddress) {
        self.address = address;
    }
}

impl ArrayFormulaGraph for Vec<FormulaCell> {
    fn array_formula_nodes(&mut self) -> Box<dyn Iterator<Item = &mut dyn FormulaNode> + '_> {
        Box::new(self.iter_mut().map(|cell| cell as &mut dyn FormulaNode))
    }
}
