//! Moving a rectangle of cells.
//!
//! Two kinds of formulas are affected: those inside the moved rectangle (which travel with it)
//! and those elsewhere that point into it (which follow the moved cells).

use formula_address::{
    CellAddress, CellRange, ColumnRange, Range, RangeEnd, RowRange, SheetId, SimpleCellAddress,
    SimpleCellRange,
};
use serde::{Deserialize, Serialize};

use super::{AddressTransform, FormulaTransformer};
use crate::{ParserConfig, TransformError};

fn outcome<T: PartialEq>(original: T, new: T) -> AddressTransform<T> {
    if original == new {
        AddressTransform::Unchanged
    } else {
        AddressTransform::Shifted(new)
    }
}

/// Rewrites formulas *outside* the moved rectangle that reference cells inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependentFormulaTransformer {
    source: SimpleCellRange,
    to_right: i32,
    to_bottom: i32,
    to_sheet: SheetId,
}

impl DependentFormulaTransformer {
    pub fn new(source: SimpleCellRange, to_right: i32, to_bottom: i32, to_sheet: SheetId) -> Self {
        Self {
            source,
            to_right,
            to_bottom,
            to_sheet,
        }
    }

    fn is_moved(&self, dependency: &CellAddress, formula: SimpleCellAddress) -> bool {
        self.source.contains(dependency.to_simple(formula))
    }

    /// Follow a moved cell. An unqualified reference gains the destination sheet when the cells
    /// leave the formula's sheet.
    fn follow(&self, dependency: CellAddress, formula: SimpleCellAddress) -> CellAddress {
        let moved = dependency.moved(self.to_sheet, self.to_right, self.to_bottom);
        if moved.sheet.is_none() && self.to_sheet != formula.sheet {
            moved.with_sheet(Some(self.to_sheet))
        } else {
            moved
        }
    }
}

impl FormulaTransformer for DependentFormulaTransformer {
    fn is_irreversible(&self) -> bool {
        true
    }

    fn transform_cell_address(
        &self,
        dependency: CellAddress,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellAddress>, TransformError> {
        if !self.is_moved(&dependency, formula) {
            return Ok(AddressTransform::Unchanged);
        }
        Ok(outcome(dependency, self.follow(dependency, formula)))
    }

    fn transform_cell_range(
        &self,
        dependency: CellRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellRange>, TransformError> {
        // A range only partly inside the rectangle keeps pointing at the old cells.
        if !self.is_moved(&dependency.start, formula) || !self.is_moved(&dependency.end, formula) {
            return Ok(AddressTransform::Unchanged);
        }
        let moved = dependency.moved(self.to_sheet, self.to_right, self.to_bottom);
        let moved = if moved.sheet().is_none() && self.to_sheet != formula.sheet {
            moved.with_sheet(Some(self.to_sheet))
        } else {
            moved
        };
        Ok(outcome(dependency, moved))
    }

    fn transform_column_range(
        &self,
        _dependency: ColumnRange,
        _formula: SimpleCellAddress,
    ) -> Result<AddressTransform<ColumnRange>, TransformError> {
        Ok(AddressTransform::Unchanged)
    }

    fn transform_row_range(
        &self,
        _dependency: RowRange,
        _formula: SimpleCellAddress,
    ) -> Result<AddressTransform<RowRange>, TransformError> {
        Ok(AddressTransform::Unchanged)
    }

    fn fix_node_address(&self, address: SimpleCellAddress) -> SimpleCellAddress {
        address
    }
}

/// Moving `source` by `(to_right, to_bottom)` onto `to_sheet`.
///
/// Formulas inside the rectangle move with it: references to cells that move along keep their
/// relative offsets, references to anything else keep their absolute targets. Formulas outside
/// the rectangle are handled by [`DependentFormulaTransformer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveCellsTransformer {
    source: SimpleCellRange,
    to_right: i32,
    to_bottom: i32,
    to_sheet: SheetId,
    dependent: DependentFormulaTransformer,
}

impl MoveCellsTransformer {
    /// Fails when the destination rectangle does not fit in a sheet of `config`'s size.
    pub fn new(
        source: SimpleCellRange,
        to_right: i32,
        to_bottom: i32,
        to_sheet: SheetId,
        config: &ParserConfig,
    ) -> Result<Self, TransformError> {
        let first_col = i64::from(source.start.col) + i64::from(to_right);
        let first_row = i64::from(source.start.row) + i64::from(to_bottom);
        let last_col = i64::from(source.end.col) + i64::from(to_right);
        let last_row = i64::from(source.end.row) + i64::from(to_bottom);
        if first_col < 0
            || first_row < 0
            || last_col >= i64::from(config.max_columns)
            || last_row >= i64::from(config.max_rows)
        {
            return Err(TransformError::InvalidMoveTarget {
                source_width: source.width(),
                source_height: source.height(),
                to_right,
                to_bottom,
            });
        }
        Ok(Self {
            source,
            to_right,
            to_bottom,
            to_sheet,
            dependent: DependentFormulaTransformer::new(source, to_right, to_bottom, to_sheet),
        })
    }

    pub fn source(&self) -> SimpleCellRange {
        self.source
    }

    pub fn dependent(&self) -> &DependentFormulaTransformer {
        &self.dependent
    }

    fn is_moving(&self, formula: SimpleCellAddress) -> bool {
        self.source.contains(formula)
    }

    fn travels_along(&self, dependency: &CellAddress, formula: SimpleCellAddress) -> bool {
        self.source.contains(dependency.to_simple(formula))
    }

    /// A reference that stays behind needs an explicit sheet once the formula leaves its sheet.
    fn pin_sheet<A: RangeEnd>(&self, end: A) -> A {
        if end.sheet().is_none() && self.to_sheet != self.source.sheet() {
            end.with_sheet(Some(self.source.sheet()))
        } else {
            end
        }
    }

    fn pin_range_sheet<A: RangeEnd>(&self, range: Range<A>) -> Range<A> {
        if range.sheet().is_none() && self.to_sheet != self.source.sheet() {
            range.with_sheet(Some(self.source.sheet()))
        } else {
            range
        }
    }

    fn retarget_sheet(&self, sheet: Option<SheetId>) -> Option<SheetId> {
        sheet.map(|_| self.to_sheet)
    }

    fn carry(&self, dependency: CellAddress) -> CellAddress {
        let shifted = dependency.shift_absolute_dimensions(self.to_right, self.to_bottom);
        shifted.with_sheet(self.retarget_sheet(dependency.sheet))
    }

    fn leave(&self, dependency: CellAddress) -> CellAddress {
        self.pin_sheet(dependency.shift_relative_dimensions(-self.to_right, -self.to_bottom))
    }
}

impl FormulaTransformer for MoveCellsTransformer {
    fn is_irreversible(&self) -> bool {
        true
    }

    fn transform_cell_address(
        &self,
        dependency: CellAddress,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellAddress>, TransformError> {
        if !self.is_moving(formula) {
            return self.dependent.transform_cell_address(dependency, formula);
        }
        let new = if self.travels_along(&dependency, formula) {
            self.carry(dependency)
        } else {
            self.leave(dependency)
        };
        Ok(outcome(dependency, new))
    }

    fn transform_cell_range(
        &self,
        dependency: CellRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellRange>, TransformError> {
        if !self.is_moving(formula) {
            return self.dependent.transform_cell_range(dependency, formula);
        }
        let new = if self.travels_along(&dependency.start, formula)
            && self.travels_along(&dependency.end, formula)
        {
            let shifted = dependency.shift_absolute_dimensions(self.to_right, self.to_bottom);
            match dependency.sheet() {
                Some(_) => shifted.with_sheet(Some(self.to_sheet)),
                None => shifted,
            }
        } else {
            self.pin_range_sheet(dependency.shift_relative_dimensions(-self.to_right, -self.to_bottom))
        };
        Ok(outcome(dependency, new))
    }

    fn transform_column_range(
        &self,
        dependency: ColumnRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<ColumnRange>, TransformError> {
        if !self.is_moving(formula) {
            return self.dependent.transform_column_range(dependency, formula);
        }
        let new = dependency.map_ends(|end| end.shift_relative_dimension(-self.to_right));
        Ok(outcome(dependency, self.pin_range_sheet(new)))
    }

    fn transform_row_range(
        &self,
        dependency: RowRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<RowRange>, TransformError> {
        if !self.is_moving(formula) {
            return self.dependent.transform_row_range(dependency, formula);
        }
        let new = dependency.map_ends(|end| end.shift_relative_dimension(-self.to_bottom));
        Ok(outcome(dependency, self.pin_range_sheet(new)))
    }

    fn fix_node_address(&self, address: SimpleCellAddress) -> SimpleCellAddress {
        if self.is_moving(address) {
            address.moved(self.to_sheet, self.to_right, self.to_bottom)
        } else {
            address
        }
    }
}

#[cfg(test)]
mod tests {
    use formula_address::{
        CellReferenceType, ColumnAddress, ReferenceType, RowAddress, SheetReferenceType,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn at(sheet: SheetId, col: i32, row: i32) -> SimpleCellAddress {
        SimpleCellAddress::new(sheet, col, row)
    }

    fn resolve(outcome: AddressTransform<CellAddress>, original: CellAddress, base: SimpleCellAddress) -> SimpleCellAddress {
        match outcome {
            AddressTransform::Shifted(address) => address.to_simple(base),
            _ => original.to_simple(base),
        }
    }

    // A1:B2 on sheet 0 moved two columns right and three rows down.
    fn mover(to_sheet: SheetId) -> MoveCellsTransformer {
        let source = SimpleCellRange::new(at(0, 0, 0), at(0, 1, 1));
        MoveCellsTransformer::new(source, 2, 3, to_sheet, &ParserConfig::default()).unwrap()
    }

    #[test]
    fn destination_must_fit_in_the_sheet() {
        let source = SimpleCellRange::new(at(0, 1, 1), at(0, 2, 2));
        let config = ParserConfig::default();
        assert!(matches!(
            MoveCellsTransformer::new(source, -2, 0, 0, &config),
            Err(TransformError::InvalidMoveTarget { to_right: -2, .. })
        ));
        let max_row = config.max_rows as i32;
        assert!(MoveCellsTransformer::new(source, 0, max_row, 0, &config).is_err());
        assert!(MoveCellsTransformer::new(source, 0, 5, 1, &config).is_ok());
    }

    #[test]
    fn moved_formula_keeps_pointing_at_cells_left_behind() {
        let t = mover(0);
        let base = at(0, 0, 0);
        let new_base = t.fix_node_address(base);
        assert_eq!(new_base, at(0, 2, 3));

        let outside = CellAddress::from_simple(at(0, 4, 4), base, CellReferenceType::Relative, None);
        let out = t.transform_cell_address(outside, base).unwrap();
        assert_eq!(resolve(out, outside, new_base), at(0, 4, 4));

        let pinned = CellAddress::from_simple(at(0, 4, 4), base, CellReferenceType::Absolute, None);
        assert!(t.transform_cell_address(pinned, base).unwrap().is_unchanged());
    }

    #[test]
    fn moved_formula_follows_cells_that_move_with_it() {
        let t = mover(0);
        let base = at(0, 0, 0);
        let new_base = t.fix_node_address(base);

        let relative = CellAddress::from_simple(at(0, 1, 1), base, CellReferenceType::Relative, None);
        assert!(t.transform_cell_address(relative, base).unwrap().is_unchanged());

        let mixed = CellAddress::from_simple(at(0, 1, 1), base, CellReferenceType::AbsoluteCol, None);
        let out = t.transform_cell_address(mixed, base).unwrap();
        assert_eq!(resolve(out, mixed, new_base), at(0, 3, 4));
    }

    #[test]
    fn moving_to_another_sheet_qualifies_references_left_behind() {
        let t = mover(1);
        let base = at(0, 1, 0);
        let new_base = t.fix_node_address(base);
        assert_eq!(new_base, at(1, 3, 3));

        let outside = CellAddress::from_simple(at(0, 5, 0), base, CellReferenceType::Relative, None);
        let AddressTransform::Shifted(out) = t.transform_cell_address(outside, base).unwrap() else {
            panic!("expected shift");
        };
        assert_eq!(out.sheet, Some(0));
        assert_eq!(out.to_simple(new_base), at(0, 5, 0));

        let inside = CellAddress::from_simple(at(0, 0, 1), base, CellReferenceType::Relative, None);
        assert!(t.transform_cell_address(inside, base).unwrap().is_unchanged());
        assert_eq!(inside.to_simple(new_base), at(1, 2, 4));
    }

    #[test]
    fn dependents_follow_moved_cells() {
        let t = mover(1);
        let base = at(0, 6, 6);
        assert_eq!(t.fix_node_address(base), base);

        let into = CellAddress::from_simple(at(0, 1, 0), base, CellReferenceType::Relative, None);
        let AddressTransform::Shifted(out) = t.transform_cell_address(into, base).unwrap() else {
            panic!("expected shift");
        };
        assert_eq!(out.to_simple(base), at(1, 3, 3));

        let beside = CellAddress::from_simple(at(0, 2, 0), base, CellReferenceType::Relative, None);
        assert!(t.transform_cell_address(beside, base).unwrap().is_unchanged());

        let whole = CellRange::ordered(
            CellAddress::absolute(0, 0),
            CellAddress::absolute(1, 1),
            SheetReferenceType::Relative,
            base,
        )
        .unwrap();
        let AddressTransform::Shifted(moved) = t.transform_cell_range(whole, base).unwrap() else {
            panic!("expected shift");
        };
        assert_eq!(moved.sheet_ref, SheetReferenceType::StartAbsolute);
        assert_eq!(
            moved.to_simple(base),
            SimpleCellRange::new(at(1, 2, 3), at(1, 3, 4))
        );

        let partial = CellRange::ordered(
            CellAddress::absolute(0, 0),
            CellAddress::absolute(4, 4),
            SheetReferenceType::Relative,
            base,
        )
        .unwrap();
        assert!(t.transform_cell_range(partial, base).unwrap().is_unchanged());
    }

    fn columns(from: i32, to: i32, kind: ReferenceType, base: SimpleCellAddress) -> ColumnRange {
        ColumnRange::ordered(
            ColumnAddress::from_simple(from, base, kind, None),
            ColumnAddress::from_simple(to, base, kind, None),
            SheetReferenceType::Relative,
            base,
        )
        .unwrap()
    }

    #[test]
    fn moved_formula_keeps_whole_column_ranges_on_their_columns() {
        let t = mover(0);
        let base = at(0, 0, 0);
        let new_base = t.fix_node_address(base);

        // =SUM(A:B) written in A1
        let relative = columns(0, 1, ReferenceType::Relative, base);
        let AddressTransform::Shifted(out) = t.transform_column_range(relative, base).unwrap() else {
            panic!("expected shift");
        };
        assert_eq!((out.start.col, out.end.col), (-2, -1));
        assert_eq!(out.sheet(), None);
        assert_eq!(out.start.to_simple(new_base).col, 0);
        assert_eq!(out.end.to_simple(new_base).col, 1);

        // =SUM($A:$B)
        let pinned = columns(0, 1, ReferenceType::Absolute, base);
        assert!(t.transform_column_range(pinned, base).unwrap().is_unchanged());
    }

    #[test]
    fn moving_to_another_sheet_qualifies_whole_row_ranges() {
        let t = mover(1);
        let base = at(0, 1, 0);
        let new_base = t.fix_node_address(base);

        // =SUM(1:2) written in B1
        let rows = RowRange::ordered(
            RowAddress::from_simple(0, base, ReferenceType::Relative, None),
            RowAddress::from_simple(1, base, ReferenceType::Relative, None),
            SheetReferenceType::Relative,
            base,
        )
        .unwrap();
        let AddressTransform::Shifted(out) = t.transform_row_range(rows, base).unwrap() else {
            panic!("expected shift");
        };
        assert_eq!(out.sheet(), Some(0));
        assert_eq!(out.sheet_ref, SheetReferenceType::StartAbsolute);
        assert_eq!(out.start.to_simple(new_base).row, 0);
        assert_eq!(out.end.to_simple(new_base).row, 1);
        assert_eq!(out.start.to_simple(new_base).sheet, 0);
    }

    #[test]
    fn dependents_leave_whole_column_and_row_ranges_alone() {
        let t = mover(1);
        let base = at(0, 6, 6);

        let column_a = columns(0, 0, ReferenceType::Relative, base);
        assert!(t.transform_column_range(column_a, base).unwrap().is_unchanged());

        let row_1 = RowRange::ordered(
            RowAddress::new(0, ReferenceType::Absolute),
            RowAddress::new(0, ReferenceType::Absolute),
            SheetReferenceType::Relative,
            base,
        )
        .unwrap();
        assert!(t.transform_row_range(row_1, base).unwrap().is_unchanged());
    }
}
