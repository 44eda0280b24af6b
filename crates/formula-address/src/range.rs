use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    AddressError, CellAddress, ColumnAddress, RowAddress, SheetId, SimpleCellAddress,
    SimpleCellRange,
};

/// Which ends of a range were written with a sheet prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetReferenceType {
    /// `A1:B2`
    Relative,
    /// `Sheet1!A1:B2` (the end inherits the start's sheet)
    StartAbsolute,
    /// `Sheet1!A1:Sheet1!B2`
    BothAbsolute,
}

/// An address kind that can be used as a range end.
pub trait RangeEnd: Copy {
    fn sheet(&self) -> Option<SheetId>;

    #[must_use]
    fn with_sheet(self, sheet: Option<SheetId>) -> Self;
}

impl RangeEnd for CellAddress {
    fn sheet(&self) -> Option<SheetId> {
        self.sheet
    }

    fn with_sheet(self, sheet: Option<SheetId>) -> Self {
        CellAddress::with_sheet(self, sheet)
    }
}

impl RangeEnd for ColumnAddress {
    fn sheet(&self) -> Option<SheetId> {
        self.sheet
    }

    fn with_sheet(self, sheet: Option<SheetId>) -> Self {
        ColumnAddress::with_sheet(self, sheet)
    }
}

impl RangeEnd for RowAddress {
    fn sheet(&self) -> Option<SheetId> {
        self.sheet
    }

    fn with_sheet(self, sheet: Option<SheetId>) -> Self {
        RowAddress::with_sheet(self, sheet)
    }
}

/// A `start:end` reference. Both ends either carry a sheet or neither does.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range<A> {
    pub start: A,
    pub end: A,
    pub sheet_ref: SheetReferenceType,
}

pub type CellRange = Range<CellAddress>;
pub type ColumnRange = Range<ColumnAddress>;
pub type RowRange = Range<RowAddress>;

impl<A: RangeEnd> Range<A> {
    pub fn new(start: A, end: A, sheet_ref: SheetReferenceType) -> Result<Self, AddressError> {
        if start.sheet().is_some() != end.sheet().is_some() {
            return Err(AddressError::MixedSheetQualification);
        }
        Ok(Self {
            start,
            end,
            sheet_ref,
        })
    }

    /// Sheet of the start end (`None` when the range is unqualified).
    #[inline]
    pub fn sheet(&self) -> Option<SheetId> {
        self.start.sheet()
    }

    #[inline]
    pub fn resolved_sheet(&self, base: SimpleCellAddress) -> SheetId {
        self.start.sheet().unwrap_or(base.sheet)
    }

    /// Replace both ends, keeping the sheet reference type.
    #[must_use]
    pub fn with_ends(self, start: A, end: A) -> Self {
        Self {
            start,
            end,
            sheet_ref: self.sheet_ref,
        }
    }

    #[must_use]
    pub fn map_ends(self, mut f: impl FnMut(A) -> A) -> Self {
        let start = f(self.start);
        let end = f(self.end);
        self.with_ends(start, end)
    }

    /// Put both ends on `sheet`. An unqualified range that gains a sheet becomes
    /// [`SheetReferenceType::StartAbsolute`]; one that loses it becomes relative.
    #[must_use]
    pub fn with_sheet(self, sheet: Option<SheetId>) -> Self {
        let sheet_ref = match (sheet, self.sheet_ref) {
            (None, _) => SheetReferenceType::Relative,
            (Some(_), SheetReferenceType::Relative) => SheetReferenceType::StartAbsolute,
            (Some(_), other) => other,
        };
        Self {
            start: self.start.with_sheet(sheet),
            end: self.end.with_sheet(sheet),
            sheet_ref,
        }
    }
}

// An unqualified end sorts after any explicit sheet.
fn compare_sheets(a: Option<SheetId>, b: Option<SheetId>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn order_by<T: Copy>(a: T, b: T, cmp: impl Fn(&T, &T) -> Ordering) -> (T, T) {
    if cmp(&a, &b) == Ordering::Greater {
        (b, a)
    } else {
        (a, b)
    }
}

impl CellRange {
    /// Build a range from two raw ends, ordering each axis (and the sheets) independently by the
    /// position it resolves to from `base`.
    pub fn ordered(
        a: CellAddress,
        b: CellAddress,
        sheet_ref: SheetReferenceType,
        base: SimpleCellAddress,
    ) -> Result<Self, AddressError> {
        let (start_col, end_col) = order_by(a.to_column_address(), b.to_column_address(), |x, y| {
            x.to_simple(base).col.cmp(&y.to_simple(base).col)
        });
        let (start_row, end_row) = order_by(a.to_row_address(), b.to_row_address(), |x, y| {
            x.to_simple(base).row.cmp(&y.to_simple(base).row)
        });
        let (start_sheet, end_sheet) = order_by(a.sheet, b.sheet, |x, y| compare_sheets(*x, *y));
        Self::new(
            CellAddress::from_column_and_row(start_col, start_row).with_sheet(start_sheet),
            CellAddress::from_column_and_row(end_col, end_row).with_sheet(end_sheet),
            sheet_ref,
        )
    }

    pub fn to_simple(&self, base: SimpleCellAddress) -> SimpleCellRange {
        SimpleCellRange::new(self.start.to_simple(base), self.end.to_simple(base))
    }

    #[must_use]
    pub fn moved(self, to_sheet: SheetId, to_right: i32, to_bottom: i32) -> Self {
        self.map_ends(|end| end.moved(to_sheet, to_right, to_bottom))
    }

    #[must_use]
    pub fn shift_relative_dimensions(self, to_right: i32, to_bottom: i32) -> Self {
        self.map_ends(|end| end.shift_relative_dimensions(to_right, to_bottom))
    }

    #[must_use]
    pub fn shift_absolute_dimensions(self, to_right: i32, to_bottom: i32) -> Self {
        self.map_ends(|end| end.shift_absolute_dimensions(to_right, to_bottom))
    }
}

impl ColumnRange {
    pub fn ordered(
        a: ColumnAddress,
        b: ColumnAddress,
        sheet_ref: SheetReferenceType,
        base: SimpleCellAddress,
    ) -> Result<Self, AddressError> {
        let (start, end) = order_by(a, b, |x, y| x.to_simple(base).col.cmp(&y.to_simple(base).col));
        let (start_sheet, end_sheet) = order_by(a.sheet, b.sheet, |x, y| compare_sheets(*x, *y));
        Self::new(
            start.with_sheet(start_sheet),
            end.with_sheet(end_sheet),
            sheet_ref,
        )
    }

    /// Number of columns spanned when resolved from `base`.
    pub fn width(&self, base: SimpleCellAddress) -> i32 {
        self.end.to_simple(base).col - self.start.to_simple(base).col + 1
    }
}

impl RowRange {
    pub fn ordered(
        a: RowAddress,
        b: RowAddress,
        sheet_ref: SheetReferenceType,
        base: SimpleCellAddress,
    ) -> Result<Self, AddressError> {
        let (start, end) = order_by(a, b, |x, y| x.to_simple(base).row.cmp(&y.to_simple(base).row));
        let (start_sheet, end_sheet) = order_by(a.sheet, b.sheet, |x, y| compare_sheets(*x, *y));
        Self::new(
            start.with_sheet(start_sheet),
            end.with_sheet(end_sheet),
            sheet_ref,
        )
    }

    /// Number of rows spanned when resolved from `base`.
    pub fn height(&self, base: SimpleCellAddress) -> i32 {
        self.end.to_simple(base).row - self.start.to_simple(base).row + 1
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{CellReferenceType, ReferenceType};

    const BASE: SimpleCellAddress = SimpleCellAddress::new(0, 0, 0);

    #[test]
    fn mixed_sheet_qualification_is_rejected() {
        let err = CellRange::new(
            CellAddress::relative(0, 0).with_sheet(Some(1)),
            CellAddress::relative(1, 1),
            SheetReferenceType::StartAbsolute,
        )
        .unwrap_err();
        assert_eq!(err, AddressError::MixedSheetQualification);
    }

    #[test]
    fn cell_range_orders_each_axis_independently() {
        // B1:$A2 -> $A1:B2 with the `$` travelling with the column.
        let a = CellAddress::relative(1, 0);
        let b = CellAddress::new(0, 1, CellReferenceType::AbsoluteCol);
        let range = CellRange::ordered(a, b, SheetReferenceType::Relative, BASE).unwrap();
        assert_eq!(range.start, CellAddress::new(0, 0, CellReferenceType::AbsoluteCol));
        assert_eq!(range.end, CellAddress::relative(1, 1));
    }

    #[test]
    fn ordering_uses_resolved_positions() {
        // From C3, a relative offset of -2 (A) sorts before absolute column B.
        let base = SimpleCellAddress::new(0, 2, 2);
        let a = ColumnAddress::new(1, ReferenceType::Absolute);
        let b = ColumnAddress::new(-2, ReferenceType::Relative);
        let range = ColumnRange::ordered(a, b, SheetReferenceType::Relative, base).unwrap();
        assert_eq!(range.start, b);
        assert_eq!(range.end, a);
        assert_eq!(range.width(base), 2);
    }

    #[test]
    fn rows_are_swapped_when_written_backwards() {
        let range = RowRange::ordered(
            RowAddress::new(9, ReferenceType::Absolute).with_sheet(Some(2)),
            RowAddress::new(3, ReferenceType::Absolute).with_sheet(Some(2)),
            SheetReferenceType::BothAbsolute,
            BASE,
        )
        .unwrap();
        assert_eq!(range.start.row, 3);
        assert_eq!(range.end.row, 9);
        assert_eq!(range.height(BASE), 7);
    }

    #[test]
    fn gaining_a_sheet_upgrades_the_reference_type() {
        let range = CellRange::new(
            CellAddress::relative(0, 0),
            CellAddress::relative(1, 1),
            SheetReferenceType::Relative,
        )
        .unwrap()
        .with_sheet(Some(3));
        assert_eq!(range.sheet_ref, SheetReferenceType::StartAbsolute);
        assert_eq!(range.end.sheet, Some(3));
        assert_eq!(range.to_simple(BASE).sheet(), 3);
    }
}
