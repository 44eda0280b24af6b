//! Rendering syntax trees back to formula text.

use formula_address::{
    column_label, quote_sheet_name, CellAddress, ColumnAddress, Range, RangeEnd, RowAddress,
    SheetId, SheetReferenceType, SimpleCellAddress,
};
use log::warn;

use crate::ast::{Ast, Expr};
use crate::{ErrorKind, NamedExpressions, ParserConfig, SheetResolver, UnparseError};

/// Turns an [`Ast`] into the text a user would type in the cell `base`, using the locale of
/// `config` and the names known to the workbook.
pub struct Unparser<'a> {
    config: &'a ParserConfig,
    sheets: &'a dyn SheetResolver,
    named: &'a dyn NamedExpressions,
}

impl<'a> Unparser<'a> {
    pub fn new(
        config: &'a ParserConfig,
        sheets: &'a dyn SheetResolver,
        named: &'a dyn NamedExpressions,
    ) -> Self {
        Self {
            config,
            sheets,
            named,
        }
    }

    /// Render `ast` as stored in the cell `base`, with the leading `=`.
    ///
    /// References that no longer resolve to a cell inside the sheet are rendered as the
    /// localized `#REF!`. Referring to a sheet id that the workbook does not know is an error.
    pub fn unparse(&self, ast: &Ast, base: SimpleCellAddress) -> Result<String, UnparseError> {
        let mut out = String::from("=");
        self.write(&mut out, ast, base)?;
        Ok(out)
    }

    fn write(&self, out: &mut String, ast: &Ast, base: SimpleCellAddress) -> Result<(), UnparseError> {
        let ws = ast.leading_whitespace.as_deref().unwrap_or("");
        match &ast.expr {
            Expr::Binary(binary) => {
                self.write(out, &binary.left, base)?;
                out.push_str(ws);
                out.push_str(binary.op.as_str());
                self.write(out, &binary.right, base)?;
            }
            Expr::Postfix(postfix) => {
                self.write(out, &postfix.expr, base)?;
                out.push_str(ws);
                out.push_str(postfix.op.as_str());
            }
            Expr::Unary(unary) => {
                out.push_str(ws);
                out.push_str(unary.op.as_str());
                self.write(out, &unary.expr, base)?;
            }
            Expr::FunctionCall(call) => {
                out.push_str(ws);
                out.push_str(self.config.localized_function_name(&call.name));
                out.push('(');
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        out.push(self.config.function_arg_separator);
                    }
                    self.write(out, arg, base)?;
                }
                out.push_str(call.internal_whitespace.as_deref().unwrap_or(""));
                out.push(')');
            }
            Expr::Parenthesis(paren) => {
                out.push_str(ws);
                out.push('(');
                self.write(out, &paren.expr, base)?;
                out.push_str(paren.internal_whitespace.as_deref().unwrap_or(""));
                out.push(')');
            }
            Expr::Array(array) => {
                out.push_str(ws);
                out.push('{');
                for (r, row) in array.rows.iter().enumerate() {
                    if r > 0 {
                        out.push(self.config.array_row_separator);
                    }
                    for (c, element) in row.iter().enumerate() {
                        if c > 0 {
                            out.push(self.config.array_column_separator);
                        }
                        self.write(out, element, base)?;
                    }
                }
                out.push_str(array.internal_whitespace.as_deref().unwrap_or(""));
                out.push('}');
            }
            Expr::Empty => out.push_str(ws),
            Expr::Number(raw) => {
                out.push_str(ws);
                if self.config.decimal_separator == '.' {
                    out.push_str(raw);
                } else {
                    out.extend(raw.chars().map(|c| if c == '.' { self.config.decimal_separator } else { c }));
                }
            }
            Expr::String(value) => {
                out.push_str(ws);
                out.push('"');
                out.push_str(&value.replace('"', "\"\""));
                out.push('"');
            }
            Expr::NamedExpression(name) => {
                out.push_str(ws);
                match self.named.nearest_display_name(name, base.sheet) {
                    Some(display) => out.push_str(&display),
                    None => out.push_str(name),
                }
            }
            Expr::Error(kind) => {
                out.push_str(ws);
                out.push_str(self.config.error_literal(*kind));
            }
            Expr::ErrorWithRawInput { raw, .. } => {
                out.push_str(ws);
                out.push_str(raw);
            }
            Expr::CellReference(address) => {
                out.push_str(ws);
                if self.cell_is_invalid(address, base) {
                    self.write_destroyed(out, base);
                } else {
                    self.write_cell(out, address, base, true)?;
                }
            }
            Expr::CellRange(range) => {
                out.push_str(ws);
                if self.cell_is_invalid(&range.start, base) || self.cell_is_invalid(&range.end, base) {
                    self.write_destroyed(out, base);
                } else {
                    self.write_range(out, range, |out, end, sheet| self.write_cell(out, end, base, sheet))?;
                }
            }
            Expr::ColumnRange(range) => {
                out.push_str(ws);
                if self.column_is_invalid(&range.start, base) || self.column_is_invalid(&range.end, base) {
                    self.write_destroyed(out, base);
                } else {
                    self.write_range(out, range, |out, end, sheet| self.write_column(out, end, base, sheet))?;
                }
            }
            Expr::RowRange(range) => {
                out.push_str(ws);
                if self.row_is_invalid(&range.start, base) || self.row_is_invalid(&range.end, base) {
                    self.write_destroyed(out, base);
                } else {
                    self.write_range(out, range, |out, end, sheet| self.write_row(out, end, base, sheet))?;
                }
            }
        }
        Ok(())
    }

    fn write_destroyed(&self, out: &mut String, base: SimpleCellAddress) {
        warn!("reference in formula at {base:?} does not resolve to a cell; rendering #REF!");
        out.push_str(self.config.error_literal(ErrorKind::Ref));
    }

    fn cell_is_invalid(&self, address: &CellAddress, base: SimpleCellAddress) -> bool {
        let target = address.to_simple(base);
        target.is_invalid()
            || i64::from(target.col) >= i64::from(self.config.max_columns)
            || i64::from(target.row) >= i64::from(self.config.max_rows)
    }

    fn column_is_invalid(&self, address: &ColumnAddress, base: SimpleCellAddress) -> bool {
        let target = address.to_simple(base);
        target.is_invalid() || i64::from(target.col) >= i64::from(self.config.max_columns)
    }

    fn row_is_invalid(&self, address: &RowAddress, base: SimpleCellAddress) -> bool {
        let target = address.to_simple(base);
        target.is_invalid() || i64::from(target.row) >= i64::from(self.config.max_rows)
    }

    fn write_sheet(&self, out: &mut String, sheet: Option<SheetId>) -> Result<(), UnparseError> {
        let Some(id) = sheet else {
            return Ok(());
        };
        let name = self
            .sheets
            .sheet_name(id)
            .ok_or(UnparseError::NoSheetWithId(id))?;
        out.push_str(&quote_sheet_name(name));
        out.push('!');
        Ok(())
    }

    /// `start:end`, printing the start's sheet unless the range is unqualified and the end's
    /// sheet only when both ends were written with one.
    fn write_range<A, F>(&self, out: &mut String, range: &Range<A>, mut write_end: F) -> Result<(), UnparseError>
    where
        A: RangeEnd,
        F: FnMut(&mut String, &A, bool) -> Result<(), UnparseError>,
    {
        write_end(out, &range.start, range.sheet_ref != SheetReferenceType::Relative)?;
        out.push(':');
        write_end(out, &range.end, range.sheet_ref == SheetReferenceType::BothAbsolute)
    }

    fn write_cell(
        &self,
        out: &mut String,
        address: &CellAddress,
        base: SimpleCellAddress,
        with_sheet: bool,
    ) -> Result<(), UnparseError> {
        if with_sheet {
            self.write_sheet(out, address.sheet)?;
        }
        self.write_column(out, &address.to_column_address(), base, false)?;
        self.write_row(out, &address.to_row_address(), base, false)
    }

    fn write_column(
        &self,
        out: &mut String,
        address: &ColumnAddress,
        base: SimpleCellAddress,
        with_sheet: bool,
    ) -> Result<(), UnparseError> {
        if with_sheet {
            self.write_sheet(out, address.sheet)?;
        }
        if address.is_absolute() {
            out.push('$');
        }
        out.push_str(&column_label(address.to_simple(base).col));
        Ok(())
    }

    fn write_row(
        &self,
        out: &mut String,
        address: &RowAddress,
        base: SimpleCellAddress,
        with_sheet: bool,
    ) -> Result<(), UnparseError> {
        if with_sheet {
            self.write_sheet(out, address.sheet)?;
        }
        if address.is_absolute() {
            out.push('$');
        }
        out.push_str(&(i64::from(address.to_simple(base).row) + 1).to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use formula_address::SheetId;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{FormulaParser, NoNamedExpressions, SheetMapping};

    fn at(sheet: SheetId, col: i32, row: i32) -> SimpleCellAddress {
        SimpleCellAddress::new(sheet, col, row)
    }

    fn round_trip(config: &ParserConfig, sheets: &SheetMapping, text: &str, base: SimpleCellAddress) -> String {
        let parsed = FormulaParser::new(config, sheets).parse(text, base);
        assert!(parsed.errors.is_empty(), "{text}: {:?}", parsed.errors);
        Unparser::new(config, sheets, &NoNamedExpressions)
            .unparse(&parsed.ast, base)
            .unwrap()
    }

    #[test]
    fn reproduces_what_was_parsed() {
        let config = ParserConfig::default();
        let sheets = SheetMapping::with_sheets(["Sheet1", "My Sheet"]);
        let base = at(0, 2, 4);
        for text in [
            "=1+2*3",
            "=-A1^2%",
            "=SUM($A$1:B$7, 'My Sheet'!C3)",
            "='My Sheet'!A1:'My Sheet'!B2",
            "=IF(A1>=1, \"a\"\"b\", {1,2;3,4})",
            "=$A:C+2:$4",
            "=( 1 + 2 )",
            "=AVERAGE( )",
            "=IF(A1,,2)",
            "=#N/A&#DIV/0!",
            "=myName*2",
        ] {
            assert_eq!(round_trip(&config, &sheets, text, base), text);
        }
    }

    #[test]
    fn relative_references_follow_the_target_cell() {
        let config = ParserConfig::default();
        let sheets = SheetMapping::with_sheets(["Sheet1"]);
        let parsed = FormulaParser::new(&config, &sheets).parse("=B2+$B$2+B$2", at(0, 2, 2));
        let unparser = Unparser::new(&config, &sheets, &NoNamedExpressions);
        assert_eq!(unparser.unparse(&parsed.ast, at(0, 3, 5)).unwrap(), "=C5+$B$2+C$2");
        // one column to the left of A is no longer a cell
        assert_eq!(unparser.unparse(&parsed.ast, at(0, 0, 0)).unwrap(), "=#REF!+$B$2+#REF!");
    }

    #[test]
    fn renders_in_the_configured_locale() {
        let en = ParserConfig::en_us();
        let de = ParserConfig::de_de();
        let sheets = SheetMapping::with_sheets(["Sheet1"]);
        let base = at(0, 0, 0);
        let parsed = FormulaParser::new(&de, &sheets).parse("=SUMME(1,5;{1\\2;3\\4};#BEZUG!)", base);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);

        assert_eq!(
            Unparser::new(&en, &sheets, &NoNamedExpressions).unparse(&parsed.ast, base).unwrap(),
            "=SUM(1.5,{1,2;3,4},#REF!)"
        );
        assert_eq!(
            Unparser::new(&de, &sheets, &NoNamedExpressions).unparse(&parsed.ast, base).unwrap(),
            "=SUMME(1,5;{1\\2;3\\4};#BEZUG!)"
        );
    }

    struct Scoped;

    impl NamedExpressions for Scoped {
        fn nearest_display_name(&self, name: &str, sheet: SheetId) -> Option<String> {
            (name.eq_ignore_ascii_case("rate") && sheet == 1).then(|| "Rate".to_string())
        }
    }

    #[test]
    fn named_expressions_use_their_display_name() {
        let config = ParserConfig::default();
        let sheets = SheetMapping::with_sheets(["Sheet1", "Sheet2"]);
        let parsed = FormulaParser::new(&config, &sheets).parse("=RATE*2", at(1, 0, 0));
        let unparser = Unparser::new(&config, &sheets, &Scoped);
        assert_eq!(unparser.unparse(&parsed.ast, at(1, 0, 0)).unwrap(), "=Rate*2");
        assert_eq!(unparser.unparse(&parsed.ast, at(0, 0, 0)).unwrap(), "=RATE*2");
    }

    #[test]
    fn unknown_sheet_ids_are_an_error() {
        let config = ParserConfig::default();
        let mut sheets = SheetMapping::with_sheets(["Sheet1", "Sheet2"]);
        let parsed = FormulaParser::new(&config, &sheets).parse("=Sheet2!A1", at(0, 0, 0));
        sheets.remove_sheet(1);
        assert_eq!(
            Unparser::new(&config, &sheets, &NoNamedExpressions).unparse(&parsed.ast, at(0, 0, 0)),
            Err(UnparseError::NoSheetWithId(1))
        );
    }
}
