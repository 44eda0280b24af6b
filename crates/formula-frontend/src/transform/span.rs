//! Row/column insertion and removal.

use formula_address::{
    CellAddress, CellRange, ColumnAddress, ColumnRange, Range, RangeEnd, RowAddress, RowRange,
    SheetId, SimpleCellAddress, Span,
};
use serde::{Deserialize, Serialize};

use super::{AddressTransform, FormulaTransformer};
use crate::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Rows,
    Columns,
}

impl Axis {
    /// Coordinate of `address` along this axis.
    pub fn index_of(self, address: SimpleCellAddress) -> i32 {
        match self {
            Axis::Rows => address.row,
            Axis::Columns => address.col,
        }
    }

    fn shifted(self, address: SimpleCellAddress, delta: i32) -> SimpleCellAddress {
        match self {
            Axis::Rows => SimpleCellAddress::new(address.sheet, address.col, address.row + delta),
            Axis::Columns => SimpleCellAddress::new(address.sheet, address.col + delta, address.row),
        }
    }
}

/// An address with (possibly) a coordinate along an edited axis.
trait AxisAddress: RangeEnd {
    /// Stored value and absoluteness along `axis`, or `None` if the address spans that axis.
    fn component(&self, axis: Axis) -> Option<(i32, bool)>;

    #[must_use]
    fn with_component(self, axis: Axis, stored: i32) -> Self;

    fn dependency_sheet(&self, formula: SimpleCellAddress) -> SheetId {
        self.sheet().unwrap_or(formula.sheet)
    }
}

impl AxisAddress for CellAddress {
    fn component(&self, axis: Axis) -> Option<(i32, bool)> {
        Some(match axis {
            Axis::Rows => (self.row, self.is_row_absolute()),
            Axis::Columns => (self.col, self.is_col_absolute()),
        })
    }

    fn with_component(self, axis: Axis, stored: i32) -> Self {
        match axis {
            Axis::Rows => CellAddress { row: stored, ..self },
            Axis::Columns => CellAddress { col: stored, ..self },
        }
    }
}

impl AxisAddress for ColumnAddress {
    fn component(&self, axis: Axis) -> Option<(i32, bool)> {
        (axis == Axis::Columns).then_some((self.col, self.is_absolute()))
    }

    fn with_component(self, _axis: Axis, stored: i32) -> Self {
        ColumnAddress { col: stored, ..self }
    }
}

impl AxisAddress for RowAddress {
    fn component(&self, axis: Axis) -> Option<(i32, bool)> {
        (axis == Axis::Rows).then_some((self.row, self.is_absolute()))
    }

    fn with_component(self, _axis: Axis, stored: i32) -> Self {
        RowAddress { row: stored, ..self }
    }
}

fn resolve(stored: i32, absolute: bool, formula_index: i32) -> i32 {
    if absolute {
        stored
    } else {
        stored + formula_index
    }
}

/// New stored value for a coordinate whose target moves by `target_delta` while the formula
/// holding it moves by `formula_delta`. A relative coordinate is an offset from the formula,
/// so it absorbs both moves.
fn restored(stored: i32, absolute: bool, target_delta: i32, formula_delta: i32) -> Option<i32> {
    let delta = if absolute {
        target_delta
    } else {
        target_delta - formula_delta
    };
    (delta != 0).then_some(stored + delta)
}

fn map_address<A: AxisAddress>(address: A, axis: Axis, stored: Option<i32>) -> AddressTransform<A> {
    match stored {
        Some(stored) => AddressTransform::Shifted(address.with_component(axis, stored)),
        None => AddressTransform::Unchanged,
    }
}

fn shifted_or<A>(outcome: AddressTransform<A>, original: A) -> A {
    match outcome {
        AddressTransform::Shifted(address) => address,
        AddressTransform::Unchanged | AddressTransform::Ref => original,
    }
}

/// Inserting `span.count` rows or columns before `span.start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsertSpanTransformer {
    axis: Axis,
    span: Span,
}

impl InsertSpanTransformer {
    pub fn new(axis: Axis, span: Span) -> Self {
        Self { axis, span }
    }

    pub fn rows(span: Span) -> Self {
        Self::new(Axis::Rows, span)
    }

    pub fn columns(span: Span) -> Self {
        Self::new(Axis::Columns, span)
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn span(&self) -> Span {
        self.span
    }

    fn formula_delta(&self, formula: SimpleCellAddress) -> i32 {
        if formula.sheet == self.span.sheet && self.axis.index_of(formula) >= self.span.start {
            self.span.count
        } else {
            0
        }
    }

    fn transform_address<A: AxisAddress>(&self, dependency: A, formula: SimpleCellAddress) -> AddressTransform<A> {
        let Some((stored, absolute)) = dependency.component(self.axis) else {
            return AddressTransform::Unchanged;
        };
        let formula_index = self.axis.index_of(formula);
        let resolved = resolve(stored, absolute, formula_index);
        let target_delta = if dependency.dependency_sheet(formula) == self.span.sheet
            && resolved >= self.span.start
        {
            self.span.count
        } else {
            0
        };
        let stored = restored(stored, absolute, target_delta, self.formula_delta(formula));
        map_address(dependency, self.axis, stored)
    }

    // Insertion only ever widens or shifts a range, so neither end can come back as `Ref`.
    fn transform_range<A: AxisAddress>(&self, range: Range<A>, formula: SimpleCellAddress) -> AddressTransform<Range<A>> {
        match (self.transform_address(range.start, formula), self.transform_address(range.end, formula)) {
            (AddressTransform::Unchanged, AddressTransform::Unchanged) => AddressTransform::Unchanged,
            (start, end) => AddressTransform::Shifted(
                range.with_ends(shifted_or(start, range.start), shifted_or(end, range.end)),
            ),
        }
    }
}

impl FormulaTransformer for InsertSpanTransformer {
    fn is_irreversible(&self) -> bool {
        false
    }

    fn transform_cell_address(
        &self,
        dependency: CellAddress,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellAddress>, TransformError> {
        Ok(self.transform_address(dependency, formula))
    }

    fn transform_cell_range(
        &self,
        dependency: CellRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellRange>, TransformError> {
        Ok(self.transform_range(dependency, formula))
    }

    fn transform_column_range(
        &self,
        dependency: ColumnRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<ColumnRange>, TransformError> {
        Ok(self.transform_range(dependency, formula))
    }

    fn transform_row_range(
        &self,
        dependency: RowRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<RowRange>, TransformError> {
        Ok(self.transform_range(dependency, formula))
    }

    fn fix_node_address(&self, address: SimpleCellAddress) -> SimpleCellAddress {
        self.axis.shifted(address, self.formula_delta(address))
    }
}

/// Removing the rows or columns `span.start..=span.end()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoveSpanTransformer {
    axis: Axis,
    span: Span,
}

impl RemoveSpanTransformer {
    pub fn new(axis: Axis, span: Span) -> Self {
        Self { axis, span }
    }

    pub fn rows(span: Span) -> Self {
        Self::new(Axis::Rows, span)
    }

    pub fn columns(span: Span) -> Self {
        Self::new(Axis::Columns, span)
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn span(&self) -> Span {
        self.span
    }

    // Formulas inside the removed span are deleted by the graph; treating them like formulas
    // after it keeps the arithmetic total. `fix_node_address` moves them the same way.
    fn formula_delta(&self, formula: SimpleCellAddress) -> i32 {
        if formula.sheet == self.span.sheet && self.axis.index_of(formula) >= self.span.start {
            -self.span.count
        } else {
            0
        }
    }

    fn transform_address<A: AxisAddress>(&self, dependency: A, formula: SimpleCellAddress) -> AddressTransform<A> {
        let Some((stored, absolute)) = dependency.component(self.axis) else {
            return AddressTransform::Unchanged;
        };
        let formula_index = self.axis.index_of(formula);
        let resolved = resolve(stored, absolute, formula_index);
        let target_delta = if dependency.dependency_sheet(formula) != self.span.sheet
            || resolved < self.span.start
        {
            0
        } else if resolved > self.span.end() {
            -self.span.count
        } else {
            return AddressTransform::Ref;
        };
        let stored = restored(stored, absolute, target_delta, self.formula_delta(formula));
        map_address(dependency, self.axis, stored)
    }

    /// Clip the ends that fall inside the removed span to the surviving part of the range,
    /// then shift both ends. A range entirely inside the span is destroyed.
    fn transform_range<A: AxisAddress>(&self, range: Range<A>, formula: SimpleCellAddress) -> AddressTransform<Range<A>> {
        let (Some((start_stored, start_abs)), Some((end_stored, end_abs))) =
            (range.start.component(self.axis), range.end.component(self.axis))
        else {
            return AddressTransform::Unchanged;
        };

        let mut start = range.start;
        let mut end = range.end;
        let mut clipped = false;
        if range.resolved_sheet(formula) == self.span.sheet {
            let formula_index = self.axis.index_of(formula);
            let resolved_start = resolve(start_stored, start_abs, formula_index);
            let resolved_end = resolve(end_stored, end_abs, formula_index);
            if resolved_start >= self.span.start && resolved_end <= self.span.end() {
                return AddressTransform::Ref;
            }
            if self.span.contains(resolved_start) {
                let first_surviving = self.span.end() + 1;
                start = start.with_component(self.axis, start_stored + first_surviving - resolved_start);
                clipped = true;
            }
            if self.span.contains(resolved_end) {
                let last_surviving = self.span.start - 1;
                end = end.with_component(self.axis, end_stored - (resolved_end - last_surviving));
                clipped = true;
            }
        }

        match (self.transform_address(start, formula), self.transform_address(end, formula)) {
            (AddressTransform::Ref, _) | (_, AddressTransform::Ref) => AddressTransform::Ref,
            (AddressTransform::Unchanged, AddressTransform::Unchanged) if !clipped => {
                AddressTransform::Unchanged
            }
            (new_start, new_end) => {
                AddressTransform::Shifted(range.with_ends(shifted_or(new_start, start), shifted_or(new_end, end)))
            }
        }
    }
}

impl FormulaTransformer for RemoveSpanTransformer {
    fn is_irreversible(&self) -> bool {
        true
    }

    fn transform_cell_address(
        &self,
        dependency: CellAddress,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellAddress>, TransformError> {
        Ok(self.transform_address(dependency, formula))
    }

    fn transform_cell_range(
        &self,
        dependency: CellRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<CellRange>, TransformError> {
        Ok(self.transform_range(dependency, formula))
    }

    fn transform_column_range(
        &self,
        dependency: ColumnRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<ColumnRange>, TransformError> {
        Ok(self.transform_range(dependency, formula))
    }

    fn transform_row_range(
        &self,
        dependency: RowRange,
        formula: SimpleCellAddress,
    ) -> Result<AddressTransform<RowRange>, TransformError> {
        Ok(self.transform_range(dependency, formula))
    }

    fn fix_node_address(&self, address: SimpleCellAddress) -> SimpleCellAddress {
        self.axis.shifted(address, self.formula_delta(address))
    }
}
