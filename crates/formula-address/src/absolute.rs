use core::cmp::{max, min};

use serde::{Deserialize, Serialize};

use crate::{column_label, AddressError, SheetId};

/// An absolute cell position inside a workbook.
///
/// Coordinates are signed so that the result of shifting an address past the first row or column
/// is representable; such an address is [invalid](Self::is_invalid).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleCellAddress {
    pub sheet: SheetId,
    pub col: i32,
    pub row: i32,
}

impl SimpleCellAddress {
    #[inline]
    pub const fn new(sheet: SheetId, col: i32, row: i32) -> Self {
        Self { sheet, col, row }
    }

    #[inline]
    pub const fn is_invalid(&self) -> bool {
        self.col < 0 || self.row < 0
    }

    /// Same position shifted by `(to_right, to_bottom)` and placed on `to_sheet`.
    #[inline]
    #[must_use]
    pub const fn moved(self, to_sheet: SheetId, to_right: i32, to_bottom: i32) -> Self {
        Self {
            sheet: to_sheet,
            col: self.col + to_right,
            row: self.row + to_bottom,
        }
    }

    /// A1 notation without the sheet (e.g. `BC32`), or `None` for an invalid address.
    pub fn to_a1(self) -> Option<String> {
        if self.is_invalid() {
            return None;
        }
        Some(format!("{}{}", column_label(self.col), i64::from(self.row) + 1))
    }
}

/// An absolute column inside a workbook.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleColumnAddress {
    pub sheet: SheetId,
    pub col: i32,
}

impl SimpleColumnAddress {
    #[inline]
    pub const fn new(sheet: SheetId, col: i32) -> Self {
        Self { sheet, col }
    }

    #[inline]
    pub const fn is_invalid(&self) -> bool {
        self.col < 0
    }
}

/// An absolute row inside a workbook.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleRowAddress {
    pub sheet: SheetId,
    pub row: i32,
}

impl SimpleRowAddress {
    #[inline]
    pub const fn new(sheet: SheetId, row: i32) -> Self {
        Self { sheet, row }
    }

    #[inline]
    pub const fn is_invalid(&self) -> bool {
        self.row < 0
    }
}

/// A finite rectangular region on a single sheet.
///
/// The range is inclusive and always normalized such that:
/// - `start.row <= end.row`
/// - `start.col <= end.col`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleCellRange {
    pub start: SimpleCellAddress,
    pub end: SimpleCellAddress,
}

impl SimpleCellRange {
    /// Construct a new range on `a.sheet`, normalizing coordinates if needed.
    pub fn new(a: SimpleCellAddress, b: SimpleCellAddress) -> Self {
        Self {
            start: SimpleCellAddress::new(a.sheet, min(a.col, b.col), min(a.row, b.row)),
            end: SimpleCellAddress::new(a.sheet, max(a.col, b.col), max(a.row, b.row)),
        }
    }

    #[inline]
    pub const fn sheet(&self) -> SheetId {
        self.start.sheet
    }

    /// Returns true if `address` lies within this range (sheet included).
    #[inline]
    pub const fn contains(&self, address: SimpleCellAddress) -> bool {
        address.sheet == self.start.sheet
            && address.row >= self.start.row
            && address.row <= self.end.row
            && address.col >= self.start.col
            && address.col <= self.end.col
    }

    #[inline]
    pub const fn width(&self) -> i32 {
        self.end.col - self.start.col + 1
    }

    #[inline]
    pub const fn height(&self) -> i32 {
        self.end.row - self.start.row + 1
    }

    /// All addresses of the range, row by row.
    pub fn addresses(&self) -> impl Iterator<Item = SimpleCellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col)
                .map(move |col| SimpleCellAddress::new(self.start.sheet, col, row))
        })
    }
}

/// A contiguous run of rows or columns on one sheet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub sheet: SheetId,
    pub start: i32,
    pub count: i32,
}

impl Span {
    pub fn new(sheet: SheetId, start: i32, count: i32) -> Result<Self, AddressError> {
        if count <= 0 {
            return Err(AddressError::EmptySpan { count });
        }
        if start < 0 {
            return Err(AddressError::NegativeSpanStart { start });
        }
        Ok(Self {
            sheet,
            start,
            count,
        })
    }

    /// Last row/column covered by the span (inclusive).
    #[inline]
    pub const fn end(&self) -> i32 {
        self.start + self.count - 1
    }

    #[inline]
    pub const fn contains(&self, index: i32) -> bool {
        index >= self.start && index <= self.end()
    }
}
