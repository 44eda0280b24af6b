//! The log of structural edits applied to a workbook.
//!
//! Formulas that are not transformed eagerly remember the version they were last brought up to
//! date with and replay the edits recorded since then.

use formula_address::{SheetId, SimpleCellAddress, SimpleCellRange, Span};
use serde::{Deserialize, Serialize};

use super::{
    Axis, FormulaTransformer, InsertSpanTransformer, MoveCellsTransformer, RemoveSheetTransformer,
    RemoveSpanTransformer,
};
use crate::ast::Ast;
use crate::{ParserConfig, TransformError};

/// One recorded structural edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    InsertSpan(InsertSpanTransformer),
    RemoveSpan(RemoveSpanTransformer),
    MoveCells(MoveCellsTransformer),
    RemoveSheet(RemoveSheetTransformer),
}

impl Transformation {
    pub fn insert_rows(span: Span) -> Self {
        Transformation::InsertSpan(InsertSpanTransformer::new(Axis::Rows, span))
    }

    pub fn remove_rows(span: Span) -> Self {
        Transformation::RemoveSpan(RemoveSpanTransformer::new(Axis::Rows, span))
    }

    pub fn insert_columns(span: Span) -> Self {
        Transformation::InsertSpan(InsertSpanTransformer::new(Axis::Columns, span))
    }

    pub fn remove_columns(span: Span) -> Self {
        Transformation::RemoveSpan(RemoveSpanTransformer::new(Axis::Columns, span))
    }

    pub fn move_cells(
        source: SimpleCellRange,
        to_right: i32,
        to_bottom: i32,
        to_sheet: SheetId,
        config: &ParserConfig,
    ) -> Result<Self, TransformError> {
        MoveCellsTransformer::new(source, to_right, to_bottom, to_sheet, config)
            .map(Transformation::MoveCells)
    }

    pub fn remove_sheet(sheet: SheetId) -> Self {
        Transformation::RemoveSheet(RemoveSheetTransformer::new(sheet))
    }

    pub fn transformer(&self) -> &dyn FormulaTransformer {
        match self {
            Transformation::InsertSpan(t) => t,
            Transformation::RemoveSpan(t) => t,
            Transformation::MoveCells(t) => t,
            Transformation::RemoveSheet(t) => t,
        }
    }
}

/// Read access to a list of recorded edits.
///
/// The version is the number of edits recorded so far; a consumer at version `v` is up to date
/// after replaying `transformations_since(v)`.
pub trait TransformationLog {
    fn version(&self) -> u64;

    fn transformations_since(&self, version: u64) -> &[Transformation];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationHistory {
    transformations: Vec<Transformation>,
}

impl TransformationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edit and return the new version.
    pub fn record(&mut self, transformation: Transformation) -> u64 {
        self.transformations.push(transformation);
        self.version()
    }

    /// Bring a formula last seen at `since` up to date.
    ///
    /// Returns the rewritten tree, the formula's new address and the version it is now at.
    pub fn apply_transformations(
        &self,
        ast: &Ast,
        address: SimpleCellAddress,
        since: u64,
    ) -> Result<(Ast, SimpleCellAddress, u64), TransformError> {
        let mut ast = ast.clone();
        let mut address = address;
        for transformation in self.transformations_since(since) {
            let (next, moved) = transformation.transformer().transform(&ast, address)?;
            ast = next;
            address = moved;
        }
        Ok((ast, address, self.version()))
    }
}

impl TransformationLog for TransformationHistory {
    fn version(&self) -> u64 {
        self.transformations.len() as u64
    }

    fn transformations_since(&self, version: u64) -> &[Transformation] {
        let start = usize::try_from(version)
            .unwrap_or(usize::MAX)
            .min(self.transformations.len());
        &self.transformations[start..]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::unparser::Unparser;
    use crate::{FormulaParser, NoNamedExpressions, SheetMapping};

    fn span(start: i32, count: i32) -> Span {
        Span::new(0, start, count).unwrap()
    }

    #[test]
    fn versions_count_recorded_edits() {
        let mut history = TransformationHistory::new();
        assert_eq!(history.version(), 0);
        assert_eq!(history.record(Transformation::insert_rows(span(0, 1))), 1);
        assert_eq!(history.record(Transformation::remove_sheet(3)), 2);
        assert_eq!(history.transformations_since(1), &[Transformation::remove_sheet(3)]);
        assert!(history.transformations_since(7).is_empty());
    }

    #[test]
    fn stale_formula_catches_up() {
        let config = ParserConfig::default();
        let sheets = SheetMapping::with_sheets(["Sheet1"]);
        let base = SimpleCellAddress::new(0, 3, 3);
        let ast = FormulaParser::new(&config, &sheets)
            .parse("=A1+B5+$C$2", base)
            .ast;

        let mut history = TransformationHistory::new();
        history.record(Transformation::insert_rows(span(1, 2)));
        history.record(Transformation::remove_columns(span(1, 1)));

        let (ast, address, version) = history.apply_transformations(&ast, base, 0).unwrap();
        assert_eq!(version, 2);
        assert_eq!(address, SimpleCellAddress::new(0, 2, 5));
        let text = Unparser::new(&config, &sheets, &NoNamedExpressions)
            .unparse(&ast, address)
            .unwrap();
        assert_eq!(text, "=A1+#REF!+$B$4");

        let (_, same, _) = history.apply_transformations(&ast, address, 2).unwrap();
        assert_eq!(same, address);
    }

    #[test]
    fn history_serializes_as_tagged_edits() {
        let mut history = TransformationHistory::new();
        history.record(Transformation::insert_columns(span(2, 1)));
        history.record(Transformation::remove_sheet(1));
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains(r#""kind":"insert_span""#));
        let back: TransformationHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
