use formula_address::{CellAddress, CellRange, ColumnRange, RowRange, SheetId, SimpleCellAddress};
use serde::{Deserialize, Serialize};

use super::{AddressTransform, FormulaTransformer};
use crate::TransformError;

/// Removing a sheet: every reference into it becomes `#REF!`. Formulas on the removed sheet are
/// dropped by the graph, so nothing moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoveSheetTransformer {
    sheet: SheetId,
}

impl RemoveSheetTransformer {
    pub fn new(sheet: SheetId) -> Self {
        Self { sheet }
    }

    pub fn sheet(&self) -> SheetId {
        self.sheet
    }

    fn outcome<T>(&self, resolved: SheetId) -> AddressTransform<T> {
        if resolved == self.sheet {
            AddressTransform::Ref
        } else {
            AddressTransform::Unchanged
        }
    }
}

impl FormulaTransformer for RemoveSheetTransformer {
    fn is_irreversible(&self) -> bool {
        true
    }

    fn transform_cell_address(
        &self,
        dependency: CellAddress,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellAddress>, TransformError> {
        Ok(self.outcome(dependency.resolved_sheet(formula)))
    }

    fn transform_cell_range(
        &self,
        dependency: CellRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellRange>, TransformError> {
        Ok(self.outcome(dependency.resolved_sheet(formula)))
    }

    fn transform_column_range(
        &self,
        dependency: ColumnRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<ColumnRange>, TransformError> {
        Ok(self.outcome(dependency.resolved_sheet(formula)))
    }

    fn transform_row_range(
        &self,
        dependency: RowRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<RowRange>, TransformError> {
        Ok(self.outcome(dependency.resolved_sheet(formula)))
    }

    fn fix_node_address(&self, address: SimpleCellAddress) -> SimpleCellAddress {
        address
    }
}

#[cfg(test)]
mod tests {
    use formula_address::{ReferenceType, RowAddress, SheetReferenceType};

    use super::*;

    #[test]
    fn only_references_into_the_removed_sheet_break() {
        let t = RemoveSheetTransformer::new(2);
        let on_sheet_two = SimpleCellAddress::new(2, 0, 0);
        let elsewhere = SimpleCellAddress::new(0, 0, 0);

        // implicit sheet resolves to the formula's own sheet
        let implicit = CellAddress::relative(1, 1);
        assert_eq!(
            t.transform_cell_address(implicit, on_sheet_two).unwrap(),
            AddressTransform::Ref
        );
        assert!(t.transform_cell_address(implicit, elsewhere).unwrap().is_unchanged());

        let explicit = CellAddress::absolute(0, 0).with_sheet(Some(2));
        assert_eq!(
            t.transform_cell_address(explicit, elsewhere).unwrap(),
            AddressTransform::Ref
        );

        let rows = RowRange::new(
            RowAddress::new(0, ReferenceType::Absolute).with_sheet(Some(1)),
            RowAddress::new(3, ReferenceType::Absolute).with_sheet(Some(1)),
            SheetReferenceType::StartAbsolute,
        )
        .unwrap();
        assert!(t.transform_row_range(rows, elsewhere).unwrap().is_unchanged());
        assert!(t.is_irreversible());
        assert_eq!(t.fix_node_address(on_sheet_two), on_sheet_two);
    }
}
