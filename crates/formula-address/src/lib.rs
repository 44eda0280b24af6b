//! `formula-address` defines the address value types used by the formula front-end.
//!
//! Two families live here:
//! - *absolute* addresses ([`SimpleCellAddress`], [`SimpleCellRange`], [`Span`]) that name a
//!   concrete position in a workbook, and
//! - *formula-relative* addresses ([`CellAddress`], [`ColumnAddress`], [`RowAddress`] and the
//!   ranges built from them) whose relative components are stored as offsets from the cell
//!   that holds the formula.
//!
//! All coordinates are **0-indexed** and signed so that a shift past the first row/column can
//! be represented (and detected) instead of wrapping.

mod absolute;
mod label;
mod range;
mod relative;

pub use absolute::{SimpleCellAddress, SimpleCellRange, SimpleColumnAddress, SimpleRowAddress, Span};
pub use label::{column_index, column_label, quote_sheet_name, sheet_name_needs_quotes};
pub use range::{CellRange, ColumnRange, Range, RangeEnd, RowRange, SheetReferenceType};
pub use relative::{CellAddress, CellReferenceType, ColumnAddress, ReferenceType, RowAddress};

/// Identifier of a sheet within a workbook.
pub type SheetId = u32;

/// Excel-compatible maximum rows per worksheet (1,048,576).
pub const MAX_ROWS: u32 = 1_048_576;

/// Excel-compatible maximum columns per worksheet (16,384).
pub const MAX_COLUMNS: u32 = 16_384;

/// Contract violations when constructing address values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("range ends must both be sheet-qualified or both be unqualified")]
    MixedSheetQualification,
    #[error("span must cover at least one row or column (got {count})")]
    EmptySpan { count: i32 },
    #[error("span cannot start before the first row or column (got {start})")]
    NegativeSpanStart { start: i32 },
}
