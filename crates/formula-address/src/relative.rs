use serde::{Deserialize, Serialize};

use crate::{SheetId, SimpleCellAddress, SimpleColumnAddress, SimpleRowAddress};

/// Whether a single-axis component is pinned (`$A`) or stored as an offset from the formula.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    Relative,
    Absolute,
}

impl ReferenceType {
    #[inline]
    pub const fn is_absolute(self) -> bool {
        matches!(self, ReferenceType::Absolute)
    }
}

/// The four `$` combinations of an A1 cell reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellReferenceType {
    /// `A1`
    Relative,
    /// `$A$1`
    Absolute,
    /// `$A1`
    AbsoluteCol,
    /// `A$1`
    AbsoluteRow,
}

impl CellReferenceType {
    pub const fn from_parts(col: ReferenceType, row: ReferenceType) -> Self {
        match (col, row) {
            (ReferenceType::Relative, ReferenceType::Relative) => CellReferenceType::Relative,
            (ReferenceType::Absolute, ReferenceType::Absolute) => CellReferenceType::Absolute,
            (ReferenceType::Absolute, ReferenceType::Relative) => CellReferenceType::AbsoluteCol,
            (ReferenceType::Relative, ReferenceType::Absolute) => CellReferenceType::AbsoluteRow,
        }
    }

    #[inline]
    pub const fn col(self) -> ReferenceType {
        match self {
            CellReferenceType::Absolute | CellReferenceType::AbsoluteCol => ReferenceType::Absolute,
            CellReferenceType::Relative | CellReferenceType::AbsoluteRow => ReferenceType::Relative,
        }
    }

    #[inline]
    pub const fn row(self) -> ReferenceType {
        match self {
            CellReferenceType::Absolute | CellReferenceType::AbsoluteRow => ReferenceType::Absolute,
            CellReferenceType::Relative | CellReferenceType::AbsoluteCol => ReferenceType::Relative,
        }
    }
}

/// A cell reference as stored in a formula.
///
/// Absolute components hold the 0-indexed coordinate itself; relative components hold the
/// offset from the formula's own cell. `sheet = None` means "the formula's sheet".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub col: i32,
    pub row: i32,
    pub sheet: Option<SheetId>,
    pub kind: CellReferenceType,
}

impl CellAddress {
    #[inline]
    pub const fn new(col: i32, row: i32, kind: CellReferenceType) -> Self {
        Self {
            col,
            row,
            sheet: None,
            kind,
        }
    }

    #[inline]
    pub const fn relative(col: i32, row: i32) -> Self {
        Self::new(col, row, CellReferenceType::Relative)
    }

    #[inline]
    pub const fn absolute(col: i32, row: i32) -> Self {
        Self::new(col, row, CellReferenceType::Absolute)
    }

    /// Store the absolute position `target` as seen from a formula at `base`.
    pub fn from_simple(
        target: SimpleCellAddress,
        base: SimpleCellAddress,
        kind: CellReferenceType,
        sheet: Option<SheetId>,
    ) -> Self {
        let col = match kind.col() {
            ReferenceType::Absolute => target.col,
            ReferenceType::Relative => target.col - base.col,
        };
        let row = match kind.row() {
            ReferenceType::Absolute => target.row,
            ReferenceType::Relative => target.row - base.row,
        };
        Self {
            col,
            row,
            sheet,
            kind,
        }
    }

    /// Rebuild a cell address from its two single-axis halves.
    ///
    /// The sheet is taken from the column half.
    pub fn from_column_and_row(col: ColumnAddress, row: RowAddress) -> Self {
        Self {
            col: col.col,
            row: row.row,
            sheet: col.sheet,
            kind: CellReferenceType::from_parts(col.kind, row.kind),
        }
    }

    #[must_use]
    pub const fn with_sheet(self, sheet: Option<SheetId>) -> Self {
        Self { sheet, ..self }
    }

    #[inline]
    pub fn resolved_sheet(&self, base: SimpleCellAddress) -> SheetId {
        self.sheet.unwrap_or(base.sheet)
    }

    #[inline]
    pub const fn is_col_absolute(&self) -> bool {
        self.kind.col().is_absolute()
    }

    #[inline]
    pub const fn is_row_absolute(&self) -> bool {
        self.kind.row().is_absolute()
    }

    /// Resolve against the formula's own cell.
    pub fn to_simple(&self, base: SimpleCellAddress) -> SimpleCellAddress {
        let col = self.to_column_address().to_simple(base);
        let row = self.to_row_address().to_simple(base);
        SimpleCellAddress::new(col.sheet, col.col, row.row)
    }

    #[inline]
    pub fn is_invalid(&self, base: SimpleCellAddress) -> bool {
        self.to_simple(base).is_invalid()
    }

    pub const fn to_column_address(&self) -> ColumnAddress {
        ColumnAddress {
            col: self.col,
            sheet: self.sheet,
            kind: self.kind.col(),
        }
    }

    pub const fn to_row_address(&self) -> RowAddress {
        RowAddress {
            row: self.row,
            sheet: self.sheet,
            kind: self.kind.row(),
        }
    }

    #[must_use]
    pub const fn shifted_by_columns(self, n: i32) -> Self {
        Self {
            col: self.col + n,
            ..self
        }
    }

    #[must_use]
    pub const fn shifted_by_rows(self, n: i32) -> Self {
        Self {
            row: self.row + n,
            ..self
        }
    }

    /// Shift only the components stored as offsets.
    #[must_use]
    pub const fn shift_relative_dimensions(self, to_right: i32, to_bottom: i32) -> Self {
        let col = if self.is_col_absolute() { self.col } else { self.col + to_right };
        let row = if self.is_row_absolute() { self.row } else { self.row + to_bottom };
        Self { col, row, ..self }
    }

    /// Shift only the pinned components.
    #[must_use]
    pub const fn shift_absolute_dimensions(self, to_right: i32, to_bottom: i32) -> Self {
        let col = if self.is_col_absolute() { self.col + to_right } else { self.col };
        let row = if self.is_row_absolute() { self.row + to_bottom } else { self.row };
        Self { col, row, ..self }
    }

    /// Shift both components; an explicit sheet is replaced by `to_sheet`.
    #[must_use]
    pub fn moved(self, to_sheet: SheetId, to_right: i32, to_bottom: i32) -> Self {
        Self {
            col: self.col + to_right,
            row: self.row + to_bottom,
            sheet: self.sheet.map(|_| to_sheet),
            kind: self.kind,
        }
    }
}

/// A whole-column reference end (`A`, `$C`, `Sheet2!D`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnAddress {
    pub col: i32,
    pub sheet: Option<SheetId>,
    pub kind: ReferenceType,
}

impl ColumnAddress {
    #[inline]
    pub const fn new(col: i32, kind: ReferenceType) -> Self {
        Self {
            col,
            sheet: None,
            kind,
        }
    }

    pub fn from_simple(
        target: i32,
        base: SimpleCellAddress,
        kind: ReferenceType,
        sheet: Option<SheetId>,
    ) -> Self {
        let col = match kind {
            ReferenceType::Absolute => target,
            ReferenceType::Relative => target - base.col,
        };
        Self { col, sheet, kind }
    }

    #[must_use]
    pub const fn with_sheet(self, sheet: Option<SheetId>) -> Self {
        Self { sheet, ..self }
    }

    #[inline]
    pub fn resolved_sheet(&self, base: SimpleCellAddress) -> SheetId {
        self.sheet.unwrap_or(base.sheet)
    }

    #[inline]
    pub const fn is_absolute(&self) -> bool {
        self.kind.is_absolute()
    }

    pub fn to_simple(&self, base: SimpleCellAddress) -> SimpleColumnAddress {
        let col = if self.is_absolute() {
            self.col
        } else {
            base.col + self.col
        };
        SimpleColumnAddress::new(self.resolved_sheet(base), col)
    }

    #[inline]
    pub fn is_invalid(&self, base: SimpleCellAddress) -> bool {
        self.to_simple(base).is_invalid()
    }

    #[must_use]
    pub const fn shifted(self, n: i32) -> Self {
        Self {
            col: self.col + n,
            ..self
        }
    }

    #[must_use]
    pub const fn shift_relative_dimension(self, n: i32) -> Self {
        if self.is_absolute() {
            self
        } else {
            self.shifted(n)
        }
    }

    #[must_use]
    pub const fn shift_absolute_dimension(self, n: i32) -> Self {
        if self.is_absolute() {
            self.shifted(n)
        } else {
            self
        }
    }
}

/// A whole-row reference end (`1`, `$3`, `Sheet2!4`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowAddress {
    pub row: i32,
    pub sheet: Option<SheetId>,
    pub kind: ReferenceType,
}

impl RowAddress {
    #[inline]
    pub const fn new(row: i32, kind: ReferenceType) -> Self {
        Self {
            row,
            sheet: None,
            kind,
        }
    }

    pub fn from_simple(
        target: i32,
        base: SimpleCellAddress,
        kind: ReferenceType,
        sheet: Option<SheetId>,
    ) -> Self {
        let row = match kind {
            ReferenceType::Absolute => target,
            ReferenceType::Relative => target - base.row,
        };
        Self { row, sheet, kind }
    }

    #[must_use]
    pub const fn with_sheet(self, sheet: Option<SheetId>) -> Self {
        Self { sheet, ..self }
    }

    #[inline]
    pub fn resolved_sheet(&self, base: SimpleCellAddress) -> SheetId {
        self.sheet.unwrap_or(base.sheet)
    }

    #[inline]
    pub const fn is_absolute(&self) -> bool {
        self.kind.is_absolute()
    }

    pub fn to_simple(&self, base: SimpleCellAddress) -> SimpleRowAddress {
        let row = if self.is_absolute() {
            self.row
        } else {
            base.row + self.row
        };
        SimpleRowAddress::new(self.resolved_sheet(base), row)
    }

    #[inline]
    pub fn is_invalid(&self, base: SimpleCellAddress) -> bool {
        self.to_simple(base).is_invalid()
    }

    #[must_use]
    pub const fn shifted(self, n: i32) -> Self {
        Self {
            row: self.row + n,
            ..self
        }
    }

    #[must_use]
    pub const fn shift_relative_dimension(self, n: i32) -> Self {
        if self.is_absolute() {
            self
        } else {
            self.shifted(n)
        }
    }

    #[must_use]
    pub const fn shift_absolute_dimension(self, n: i32) -> Self {
        if self.is_absolute() {
            self.shifted(n)
        } else {
            self
        }
    }
}
