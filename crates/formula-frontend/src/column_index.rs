//! Exact-match lookup index over column values.
//!
//! Every (sheet, column) keeps a map from normalized value to the sorted rows holding it.
//! Row insertions and removals are not applied eagerly: each bucket remembers the transformation
//! version it last saw and replays the outstanding row edits the next time it is touched.

use ahash::AHashMap;
use formula_address::{SheetId, SimpleCellAddress, SimpleCellRange, Span};
use log::trace;
use ordered_float::OrderedFloat;
use smallvec::SmallVec;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization as _;

use crate::transform::{Axis, Transformation, TransformationLog};
use crate::{Collation, Value};

/// A cell value normalized for exact matching. Empty cells and errors have no key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKey {
    Number(OrderedFloat<f64>),
    Text(String),
    Bool(bool),
}

impl LookupKey {
    pub fn from_value(value: &Value, collation: Collation) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_nan() => None,
            // -0 and 0 are the same lookup value
            Value::Number(n) if *n == 0.0 => Some(LookupKey::Number(OrderedFloat(0.0))),
            Value::Number(n) => Some(LookupKey::Number(OrderedFloat(*n))),
            Value::Text(text) => Some(LookupKey::Text(normalize_text(text, collation))),
            Value::Bool(b) => Some(LookupKey::Bool(*b)),
            Value::Empty | Value::Error(_) => None,
        }
    }
}

/// Case folding and accent stripping as configured by `collation`.
pub fn normalize_text(text: &str, collation: Collation) -> String {
    let folded = if collation.case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    };
    if collation.accent_sensitive {
        folded
    } else {
        folded.nfd().filter(|c| !is_combining_mark(*c)).collect()
    }
}

/// Index of the largest row `<= key`, if any.
pub fn lower_bound(rows: &[i32], key: i32) -> Option<usize> {
    rows.partition_point(|row| *row <= key).checked_sub(1)
}

/// Index of the smallest row `>= key`, or `rows.len()` when every row is smaller.
pub fn upper_bound(rows: &[i32], key: i32) -> usize {
    rows.partition_point(|row| *row < key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occurrence {
    #[default]
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    /// The caller's data is sorted and an approximate search is wanted; the index only answers
    /// exact lookups, so these always go to the fallback.
    pub prefer_sorted: bool,
    pub occurrence: Occurrence,
}

/// The range being searched: its physical location, if it has one, and its values.
#[derive(Debug, Clone, Copy)]
pub struct LookupRange<'a> {
    pub range: Option<SimpleCellRange>,
    pub values: &'a [Value],
}

/// Search strategy used when the index cannot answer.
pub trait FallbackSearch {
    /// Zero-based offset of the match within `values`.
    fn find(&self, key: &Value, values: &[Value], options: SearchOptions) -> Option<usize>;
}

/// Searches the raw values: a linear scan for unsorted data, a binary search when the caller
/// says the data is sorted ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSearch {
    pub collation: Collation,
}

impl FallbackSearch for ScanSearch {
    fn find(&self, key: &Value, values: &[Value], options: SearchOptions) -> Option<usize> {
        let key = LookupKey::from_value(key, self.collation)?;
        let key_of = |value: &Value| LookupKey::from_value(value, self.collation);

        if options.prefer_sorted {
            // Unindexable cells sort last.
            let first = values.partition_point(|v| key_of(v).is_some_and(|k| k < key));
            let end = values.partition_point(|v| key_of(v).is_some_and(|k| k <= key));
            return match options.occurrence {
                _ if first == end => None,
                Occurrence::First => Some(first),
                Occurrence::Last => Some(end - 1),
            };
        }

        let matches = |value: &Value| key_of(value).as_ref() == Some(&key);
        match options.occurrence {
            Occurrence::First => values.iter().position(matches),
            Occurrence::Last => values.iter().rposition(matches),
        }
    }
}

/// One cell's value changing from `old_value` to `new_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellValueChange {
    pub address: SimpleCellAddress,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Clone, Default)]
struct ValueBucket {
    /// Transformation version the rows are valid at.
    version: u64,
    rows: SmallVec<[i32; 4]>,
}

type ColumnMap = AHashMap<LookupKey, ValueBucket>;

/// Replay the row insertions and removals recorded since the bucket was last touched.
fn catch_up(bucket: &mut ValueBucket, sheet: SheetId, log: &dyn TransformationLog) {
    let version = log.version();
    if bucket.version >= version {
        return;
    }
    for transformation in log.transformations_since(bucket.version) {
        match transformation {
            Transformation::InsertSpan(t) if t.axis() == Axis::Rows && t.span().sheet == sheet => {
                shift_rows_for_insert(&mut bucket.rows, t.span());
            }
            Transformation::RemoveSpan(t) if t.axis() == Axis::Rows && t.span().sheet == sheet => {
                shift_rows_for_removal(&mut bucket.rows, t.span());
            }
            _ => {}
        }
    }
    trace!(
        "column index bucket on sheet {sheet} caught up from version {} to {version}",
        bucket.version
    );
    bucket.version = version;
}

fn shift_rows_for_insert(rows: &mut SmallVec<[i32; 4]>, span: Span) {
    let from = upper_bound(rows, span.start);
    for row in &mut rows[from..] {
        *row += span.count;
    }
}

fn shift_rows_for_removal(rows: &mut SmallVec<[i32; 4]>, span: Span) {
    let from = upper_bound(rows, span.start);
    let to = upper_bound(rows, span.end() + 1);
    rows.drain(from..to);
    for row in &mut rows[from..] {
        *row -= span.count;
    }
}

/// Exact-match index over the values of every sheet column.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    collation: Collation,
    sheets: AHashMap<SheetId, Vec<ColumnMap>>,
}

impl ColumnIndex {
    pub fn new(collation: Collation) -> Self {
        Self {
            collation,
            sheets: AHashMap::new(),
        }
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }

    fn key(&self, value: &Value) -> Option<LookupKey> {
        LookupKey::from_value(value, self.collation)
    }

    fn column_mut(&mut self, sheet: SheetId, col: i32) -> Option<&mut ColumnMap> {
        let col = usize::try_from(col).ok()?;
        self.sheets.get_mut(&sheet)?.get_mut(col)
    }

    /// Drop a column map that no longer holds any value. Trailing empty columns are cut off the
    /// sheet; an interior one is replaced so that later columns keep their positions.
    fn release_column(&mut self, sheet: SheetId, col: i32) {
        let (Some(columns), Ok(col)) = (self.sheets.get_mut(&sheet), usize::try_from(col)) else {
            return;
        };
        if columns.get(col).is_some_and(|column| column.is_empty()) {
            columns[col] = ColumnMap::default();
        }
        while columns.last().is_some_and(|column| column.is_empty()) {
            columns.pop();
        }
    }

    fn column_or_insert(&mut self, sheet: SheetId, col: i32) -> Option<&mut ColumnMap> {
        let col = usize::try_from(col).ok()?;
        let columns = self.sheets.entry(sheet).or_default();
        if columns.len() <= col {
            columns.resize_with(col + 1, ColumnMap::default);
        }
        columns.get_mut(col)
    }

    pub fn add(&mut self, value: &Value, address: SimpleCellAddress, log: &dyn TransformationLog) {
        let Some(key) = self.key(value) else {
            return;
        };
        let Some(column) = self.column_or_insert(address.sheet, address.col) else {
            return;
        };
        let bucket = column.entry(key).or_insert_with(|| ValueBucket {
            version: log.version(),
            rows: SmallVec::new(),
        });
        catch_up(bucket, address.sheet, log);
        if let Err(at) = bucket.rows.binary_search(&address.row) {
            bucket.rows.insert(at, address.row);
        }
    }

    pub fn remove(&mut self, value: &Value, address: SimpleCellAddress, log: &dyn TransformationLog) {
        let Some(key) = self.key(value) else {
            return;
        };
        let Some(column) = self.column_mut(address.sheet, address.col) else {
            return;
        };
        let Some(bucket) = column.get_mut(&key) else {
            return;
        };
        catch_up(bucket, address.sheet, log);
        if let Ok(at) = bucket.rows.binary_search(&address.row) {
            bucket.rows.remove(at);
        }
        if bucket.rows.is_empty() {
            column.remove(&key);
            if column.is_empty() {
                self.release_column(address.sheet, address.col);
            }
        }
    }

    pub fn change(
        &mut self,
        old_value: &Value,
        new_value: &Value,
        address: SimpleCellAddress,
        log: &dyn TransformationLog,
    ) {
        if self.key(old_value) == self.key(new_value) {
            return;
        }
        self.remove(old_value, address, log);
        self.add(new_value, address, log);
    }

    pub fn apply_changes(&mut self, changes: &[CellValueChange], log: &dyn TransformationLog) {
        for change in changes {
            self.change(&change.old_value, &change.new_value, change.address, log);
        }
    }

    /// Re-index `values` after their cells moved by `(to_right, to_bottom)` onto `to_sheet`.
    ///
    /// Every source entry is removed before any destination entry is added, so overlapping
    /// source and destination rectangles are handled.
    pub fn move_values(
        &mut self,
        values: &[(Value, SimpleCellAddress)],
        to_right: i32,
        to_bottom: i32,
        to_sheet: SheetId,
        log: &dyn TransformationLog,
    ) {
        self.remove_values(values, log);
        for (value, address) in values {
            self.add(value, address.moved(to_sheet, to_right, to_bottom), log);
        }
    }

    pub fn remove_values(&mut self, values: &[(Value, SimpleCellAddress)], log: &dyn TransformationLog) {
        for (value, address) in values {
            self.remove(value, *address, log);
        }
    }

    /// Open `span.count` empty columns at `span.start`.
    pub fn add_columns(&mut self, span: Span) {
        let Some(columns) = self.sheets.get_mut(&span.sheet) else {
            return;
        };
        let Ok(start) = usize::try_from(span.start) else {
            return;
        };
        if start >= columns.len() {
            return;
        }
        let count = usize::try_from(span.count).unwrap_or(0);
        columns.splice(start..start, std::iter::repeat_with(ColumnMap::default).take(count));
    }

    pub fn remove_columns(&mut self, span: Span) {
        let Some(columns) = self.sheets.get_mut(&span.sheet) else {
            return;
        };
        let (Ok(start), Ok(end)) = (usize::try_from(span.start), usize::try_from(span.end())) else {
            return;
        };
        if start >= columns.len() {
            return;
        }
        columns.drain(start..(end + 1).min(columns.len()));
    }

    pub fn add_sheet(&mut self, sheet: SheetId) {
        self.sheets.entry(sheet).or_default();
    }

    pub fn remove_sheet(&mut self, sheet: SheetId) {
        self.sheets.remove(&sheet);
    }

    /// Rows of `sheet`/`col` holding `value`, brought up to date with `log`.
    pub fn rows(&mut self, value: &Value, sheet: SheetId, col: i32, log: &dyn TransformationLog) -> Vec<i32> {
        let Some(key) = self.key(value) else {
            return Vec::new();
        };
        let Some(column) = self.column_mut(sheet, col) else {
            return Vec::new();
        };
        let Some(bucket) = column.get_mut(&key) else {
            return Vec::new();
        };
        catch_up(bucket, sheet, log);
        let rows = bucket.rows.to_vec();
        if rows.is_empty() {
            column.remove(&key);
            if column.is_empty() {
                self.release_column(sheet, col);
            }
        }
        rows
    }

    /// Zero-based offset of `key` within `range`.
    ///
    /// Only single-column ranges with a physical location are answered from the index; every
    /// other case, and every index miss, is delegated to `fallback`. A search with
    /// `prefer_sorted` set always goes to `fallback`, since the index has no approximate match.
    pub fn find(
        &mut self,
        key: &Value,
        range: &LookupRange<'_>,
        options: SearchOptions,
        log: &dyn TransformationLog,
        fallback: &dyn FallbackSearch,
    ) -> Option<usize> {
        let scan = || fallback.find(key, range.values, options);
        if options.prefer_sorted {
            return scan();
        }
        let Some(bounds) = range.range.filter(|bounds| bounds.width() == 1) else {
            return scan();
        };
        let Some(lookup) = self.key(key) else {
            return scan();
        };
        let Some(column) = self.column_mut(bounds.sheet(), bounds.start.col) else {
            return scan();
        };
        let Some(bucket) = column.get_mut(&lookup) else {
            return scan();
        };
        catch_up(bucket, bounds.sheet(), log);

        let rows = &bucket.rows;
        let found = match options.occurrence {
            Occurrence::First => rows
                .get(upper_bound(rows, bounds.start.row))
                .copied()
                .filter(|row| *row <= bounds.end.row),
            Occurrence::Last => lower_bound(rows, bounds.end.row)
                .map(|at| rows[at])
                .filter(|row| *row >= bounds.start.row),
        };
        if rows.is_empty() {
            column.remove(&lookup);
            if column.is_empty() {
                self.release_column(bounds.sheet(), bounds.start.col);
            }
        }

        match found {
            Some(row) => usize::try_from(row - bounds.start.row).ok(),
            None => scan(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::TransformationHistory;

    fn at(col: i32, row: i32) -> SimpleCellAddress {
        SimpleCellAddress::new(0, col, row)
    }

    fn column(col: i32, start: i32, end: i32) -> Option<SimpleCellRange> {
        Some(SimpleCellRange::new(at(col, start), at(col, end)))
    }

    struct NeverFound;

    impl FallbackSearch for NeverFound {
        fn find(&self, _key: &Value, _values: &[Value], _options: SearchOptions) -> Option<usize> {
            None
        }
    }

    #[test]
    fn bounds_on_sorted_rows() {
        let rows = [2, 4, 7, 9];
        assert_eq!(lower_bound(&rows, 5), Some(1));
        assert_eq!(upper_bound(&rows, 5), 2);
        assert_eq!(lower_bound(&rows, 7), Some(2));
        assert_eq!(upper_bound(&rows, 7), 2);
        assert_eq!(lower_bound(&rows, 1), None);
        assert_eq!(upper_bound(&rows, 10), 4);
        assert_eq!(lower_bound(&[], 3), None);
        assert_eq!(upper_bound(&[], 3), 0);
        assert_eq!(lower_bound(&[3], 3), Some(0));
        assert_eq!(upper_bound(&[3], 3), 0);
    }

    #[test]
    fn keys_are_normalized() {
        let insensitive = Collation::default();
        assert_eq!(
            LookupKey::from_value(&Value::from("Café"), insensitive),
            LookupKey::from_value(&Value::from("CAFE"), insensitive)
        );
        let strict = Collation {
            case_sensitive: true,
            accent_sensitive: true,
        };
        assert_ne!(
            LookupKey::from_value(&Value::from("Café"), strict),
            LookupKey::from_value(&Value::from("cafe"), strict)
        );
        assert_eq!(
            LookupKey::from_value(&Value::Number(-0.0), insensitive),
            LookupKey::from_value(&Value::Number(0.0), insensitive)
        );
        assert_eq!(LookupKey::from_value(&Value::Empty, insensitive), None);
        assert_eq!(LookupKey::from_value(&Value::from(crate::ErrorKind::NA), insensitive), None);
        assert_ne!(
            LookupKey::from_value(&Value::from(1.0), insensitive),
            LookupKey::from_value(&Value::from(true), insensitive)
        );
    }

    #[test]
    fn find_returns_offset_within_range() {
        let log = TransformationHistory::new();
        let mut index = ColumnIndex::default();
        index.add(&Value::from("x"), at(1, 5), &log);
        index.add(&Value::from("x"), at(1, 9), &log);
        index.add(&Value::from("x"), at(1, 9), &log);
        assert_eq!(index.rows(&Value::from("X"), 0, 1, &log), vec![5, 9]);

        let range = LookupRange {
            range: column(1, 3, 12),
            values: &[],
        };
        let first = SearchOptions::default();
        let last = SearchOptions {
            occurrence: Occurrence::Last,
            ..first
        };
        assert_eq!(index.find(&Value::from("x"), &range, first, &log, &NeverFound), Some(2));
        assert_eq!(index.find(&Value::from("x"), &range, last, &log, &NeverFound), Some(6));

        let narrow = LookupRange {
            range: column(1, 6, 8),
            values: &[],
        };
        assert_eq!(index.find(&Value::from("x"), &narrow, first, &log, &NeverFound), None);
    }

    #[test]
    fn misses_fall_back() {
        let log = TransformationHistory::new();
        let mut index = ColumnIndex::default();
        let values = [Value::from(1.0), Value::from(2.0), Value::from(2.0)];
        let range = LookupRange {
            range: column(0, 0, 2),
            values: &values,
        };
        let scan = ScanSearch::default();
        let options = SearchOptions::default();

        index.add(&Value::from(2.0), at(0, 1), &log);
        assert_eq!(index.find(&Value::from(2.0), &range, options, &log, &NeverFound), Some(1));
        index.remove(&Value::from(2.0), at(0, 1), &log);
        assert_eq!(index.find(&Value::from(2.0), &range, options, &log, &NeverFound), None);
        assert_eq!(index.find(&Value::from(2.0), &range, options, &log, &scan), Some(1));

        let last = SearchOptions {
            occurrence: Occurrence::Last,
            ..options
        };
        let unlocated = LookupRange {
            range: None,
            values: &values,
        };
        assert_eq!(index.find(&Value::from(2.0), &unlocated, last, &log, &scan), Some(2));
        let sorted = SearchOptions {
            prefer_sorted: true,
            ..options
        };
        assert_eq!(index.find(&Value::from(2.0), &range, sorted, &log, &scan), Some(1));
        assert_eq!(index.find(&Value::from(5.0), &range, sorted, &log, &scan), None);
    }

    #[test]
    fn row_edits_are_replayed_lazily() {
        let mut log = TransformationHistory::new();
        let mut index = ColumnIndex::default();
        index.add(&Value::from(7.0), at(0, 2), &log);
        index.add(&Value::from(7.0), at(0, 6), &log);
        index.add(&Value::from(7.0), at(0, 10), &log);

        log.record(Transformation::insert_rows(Span::new(0, 3, 2).unwrap()));
        log.record(Transformation::remove_rows(Span::new(0, 8, 2).unwrap()));
        log.record(Transformation::insert_rows(Span::new(1, 0, 100).unwrap()));
        log.record(Transformation::insert_columns(Span::new(0, 0, 1).unwrap()));

        // 2 stays, 6 -> 8 is removed, 10 -> 12 -> 10
        assert_eq!(index.rows(&Value::from(7.0), 0, 0, &log), vec![2, 10]);
    }

    #[test]
    fn changes_and_moves_reindex_values() {
        let log = TransformationHistory::new();
        let mut index = ColumnIndex::default();
        index.apply_changes(
            &[
                CellValueChange {
                    address: at(0, 0),
                    old_value: Value::Empty,
                    new_value: Value::from("a"),
                },
                CellValueChange {
                    address: at(0, 1),
                    old_value: Value::Empty,
                    new_value: Value::from("b"),
                },
            ],
            &log,
        );
        index.change(&Value::from("b"), &Value::from("a"), at(0, 1), &log);
        assert_eq!(index.rows(&Value::from("a"), 0, 0, &log), vec![0, 1]);
        assert!(index.rows(&Value::from("b"), 0, 0, &log).is_empty());

        let moved = [(Value::from("a"), at(0, 0)), (Value::from("a"), at(0, 1))];
        index.move_values(&moved, 0, 1, 0, &log);
        assert_eq!(index.rows(&Value::from("a"), 0, 0, &log), vec![1, 2]);
    }

    #[test]
    fn columns_and_sheets_are_spliced() {
        let log = TransformationHistory::new();
        let mut index = ColumnIndex::default();
        index.add(&Value::from(true), at(0, 0), &log);
        index.add(&Value::from(true), at(2, 0), &log);

        index.add_columns(Span::new(0, 1, 2).unwrap());
        assert_eq!(index.rows(&Value::from(true), 0, 4, &log), vec![0]);
        assert!(index.rows(&Value::from(true), 0, 2, &log).is_empty());

        index.remove_columns(Span::new(0, 0, 1).unwrap());
        assert_eq!(index.rows(&Value::from(true), 0, 3, &log), vec![0]);
        assert!(index.rows(&Value::from(true), 0, 0, &log).is_empty());

        index.remove_sheet(0);
        assert!(index.rows(&Value::from(true), 0, 3, &log).is_empty());
    }

    #[test]
    fn emptied_columns_are_released() {
        let log = TransformationHistory::new();
        let mut index = ColumnIndex::default();
        index.add(&Value::from(1.0), at(1, 0), &log);
        index.add(&Value::from(2.0), at(3, 4), &log);
        assert_eq!(index.sheets[&0].len(), 4);

        index.remove(&Value::from(1.0), at(1, 0), &log);
        assert_eq!(index.sheets[&0].len(), 4);
        assert!(index.sheets[&0][1].is_empty());

        index.remove_values(&[(Value::from(2.0), at(3, 4))], &log);
        assert!(index.sheets[&0].is_empty());
        assert!(index.rows(&Value::from(2.0), 0, 3, &log).is_empty());
    }

    #[test]
    fn sorted_searches_skip_the_index() {
        let log = TransformationHistory::new();
        let mut index = ColumnIndex::default();
        index.add(&Value::from(5.0), at(0, 2), &log);
        let range = LookupRange {
            range: column(0, 0, 3),
            values: &[],
        };
        let sorted = SearchOptions {
            prefer_sorted: true,
            ..SearchOptions::default()
        };
        assert_eq!(index.find(&Value::from(5.0), &range, sorted, &log, &NeverFound), None);
        assert_eq!(
            index.find(&Value::from(5.0), &range, SearchOptions::default(), &log, &NeverFound),
            Some(2)
        );
    }
}
