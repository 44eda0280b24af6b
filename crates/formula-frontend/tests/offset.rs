use formula_frontend::address::SimpleCellAddress;
use formula_frontend::{
    ErrorKind, Expr, FormulaParser, NoNamedExpressions, ParserConfig, ParserWithCaching,
    ParsingErrorKind, SheetMapping, Unparser,
};
use pretty_assertions::assert_eq;

fn render(text: &str, base: SimpleCellAddress) -> (String, Vec<ParsingErrorKind>) {
    let config = ParserConfig::default();
    let sheets = SheetMapping::with_sheets(["Sheet1", "Sheet2"]);
    let parsed = FormulaParser::new(&config, &sheets).parse(text, base);
    let text = Unparser::new(&config, &sheets, &NoNamedExpressions)
        .unparse(&parsed.ast, base)
        .unwrap();
    (text, parsed.errors.iter().map(|e| e.kind).collect())
}

fn a1() -> SimpleCellAddress {
    SimpleCellAddress::new(0, 0, 0)
}

#[test]
fn static_offsets_become_references() {
    assert_eq!(render("=OFFSET(A1, 1, 1, 2, 2)", a1()), ("=B2:C3".to_string(), vec![]));
    assert_eq!(render("=OFFSET(A1,1,1)", a1()), ("=B2".to_string(), vec![]));
    assert_eq!(render("=OFFSET($B$2,-1,+2)", a1()), ("=$D$1".to_string(), vec![]));
    assert_eq!(render("=SUM(OFFSET(Sheet2!A1,0,0,1,3))", a1()), ("=SUM(Sheet2!A1:C1)".to_string(), vec![]));
}

#[test]
fn offsets_leaving_the_sheet_are_ref_errors() {
    let config = ParserConfig::default();
    let sheets = SheetMapping::with_sheets(["Sheet1"]);
    let parsed = FormulaParser::new(&config, &sheets).parse("=OFFSET(A1, -5, 0)", a1());
    assert!(parsed.errors.is_empty());
    assert_eq!(parsed.ast.expr, Expr::Error(ErrorKind::Ref));
}

#[test]
fn dynamic_offsets_are_diagnosed() {
    let (_, errors) = render("=OFFSET(A1, B1, 0)", a1());
    assert_eq!(errors, vec![ParsingErrorKind::StaticOffsetError]);
    let (_, errors) = render("=OFFSET(A1:B2, 1, 0)", a1());
    assert_eq!(errors, vec![ParsingErrorKind::StaticOffsetError]);
    let (_, errors) = render("=OFFSET(A1, 1)", a1());
    assert_eq!(errors, vec![ParsingErrorKind::StaticOffsetError]);
    let (_, errors) = render("=OFFSET(A1, 1, 1, 0, 1)", a1());
    assert_eq!(errors, vec![ParsingErrorKind::StaticOffsetOutOfRangeError]);
    let (_, errors) = render("=A1:OFFSET(B2, 0, 0, 2, 2)", a1());
    assert_eq!(errors, vec![ParsingErrorKind::RangeOffsetNotAllowed]);
}

#[test]
fn offset_in_a_range_end_resolves_first() {
    assert_eq!(render("=A1:OFFSET(B2, 1, 1)", a1()), ("=A1:C3".to_string(), vec![]));
    assert_eq!(render("=OFFSET(A1, 2, 0):B1", a1()), ("=A1:B3".to_string(), vec![]));
}

#[test]
fn relative_offsets_are_not_shared_between_cells() {
    let sheets = SheetMapping::with_sheets(["Sheet1"]);
    let mut parser = ParserWithCaching::new(ParserConfig::default());
    let parsed = parser.parse("=OFFSET(A1, 1, 0)", SimpleCellAddress::new(0, 2, 2), &sheets);
    assert!(parsed.errors.is_empty());
    assert_eq!(parsed.hash, None);
    assert!(parser.cache().is_empty());

    let pinned = parser.parse("=OFFSET($A$1, 1, 0)", SimpleCellAddress::new(0, 2, 2), &sheets);
    assert!(pinned.hash.is_some());
    assert_eq!(parser.cache().len(), 1);
}
