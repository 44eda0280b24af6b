use formula_frontend::address::SimpleCellAddress;
use formula_frontend::cache::hash_from_ast;
use formula_frontend::{
    FormulaParser, NoNamedExpressions, ParserConfig, ParserWithCaching, SheetMapping, Unparser,
};
use pretty_assertions::assert_eq;

const CORPUS: &[&str] = &[
    "=1",
    "=-1.25E+3",
    "=\"text with \"\"quotes\"\"\"",
    "=TRUE()",
    "=A1",
    "=$A1+A$1+$A$1",
    "=SUM(A1:B10)",
    "=SUM(Sheet2!A1:B10, 'Other Data'!$C$3)",
    "='Other Data'!A1:'Other Data'!B2",
    "=Sheet2!A:C",
    "=$1:$3",
    "=IF(AND(A1>0, B1<>\"\"), A1&B1, NA())",
    "=IF(A1,,)",
    "={1,2,3;4,5,6}",
    "={\"a\",TRUE;#N/A,-2}",
    "=2^-1%",
    "=(A1+B1)*(C1-D1)/2",
    "=A1>=B1",
    "=COUNT( A1:A3 )",
    "=NOW( )",
    "=#REF!+1",
    "=total_sales*rate.2024",
];

fn unparse_at(text: &str, base: SimpleCellAddress) -> String {
    let config = ParserConfig::default();
    let sheets = SheetMapping::with_sheets(["Sheet1", "Sheet2", "Other Data"]);
    let parsed = FormulaParser::new(&config, &sheets).parse(text, base);
    assert!(parsed.errors.is_empty(), "{text}: {:?}", parsed.errors);
    Unparser::new(&config, &sheets, &NoNamedExpressions)
        .unparse(&parsed.ast, base)
        .unwrap()
}

#[test]
fn corpus_round_trips() {
    for base in [
        SimpleCellAddress::new(0, 0, 0),
        SimpleCellAddress::new(0, 5, 9),
        SimpleCellAddress::new(1, 2, 2),
    ] {
        for text in CORPUS {
            assert_eq!(unparse_at(text, base), *text, "at {base:?}");
        }
    }
}

#[test]
fn exponents_are_written_upper_case() {
    let base = SimpleCellAddress::new(0, 0, 0);
    assert_eq!(unparse_at("=1e5", base), "=1E5");
    assert_eq!(unparse_at("=2.5e-3*A1", base), "=2.5E-3*A1");

    let sheets = SheetMapping::with_sheets(["Sheet1"]);
    let mut parser = ParserWithCaching::new(ParserConfig::default());
    let lower = parser.parse("=1e5", base, &sheets);
    let upper = parser.parse("=1E5", base, &sheets);
    assert_eq!(lower.hash, upper.hash);
}

#[test]
fn insignificant_whitespace_shares_one_entry() {
    let sheets = SheetMapping::with_sheets(["Sheet1"]);
    let base = SimpleCellAddress::new(0, 3, 3);
    let mut parser = ParserWithCaching::new(ParserConfig::default());

    let compact = parser.parse("=SUM(A1:B2,C3)", base, &sheets);
    let spaced = parser.parse("=SUM(A1 : B2 ,C3)  ", base, &sheets);
    assert_eq!(compact.hash, spaced.hash);
    assert!(std::sync::Arc::ptr_eq(&compact.ast, &spaced.ast));
    assert_eq!(parser.cache().len(), 1);

    // whitespace that is kept is part of the shape
    let kept = parser.parse("=SUM( A1:B2,C3)", base, &sheets);
    assert_ne!(kept.hash, compact.hash);
    assert_eq!(parser.cache().len(), 2);
}

#[test]
fn same_relative_shape_in_different_cells_is_shared() {
    let sheets = SheetMapping::with_sheets(["Sheet1"]);
    let mut parser = ParserWithCaching::new(ParserConfig::default());

    let b2 = parser.parse("=A1+1", SimpleCellAddress::new(0, 1, 1), &sheets);
    let b3 = parser.parse("=A2+1", SimpleCellAddress::new(0, 1, 2), &sheets);
    let pinned = parser.parse("=$A$1+1", SimpleCellAddress::new(0, 1, 1), &sheets);

    assert!(std::sync::Arc::ptr_eq(&b2.ast, &b3.ast));
    assert_ne!(b2.hash, pinned.hash);
    assert_eq!(parser.cache().stats().hits, 1);

    // a tree built without tokens hashes to the same key as the text it came from
    assert_eq!(hash_from_ast(&b2.ast).as_str(), b2.hash.as_deref().unwrap());
}

#[test]
fn localized_text_shares_entries_with_canonical_text() {
    let sheets = SheetMapping::with_sheets(["Sheet1"]);
    let base = SimpleCellAddress::new(0, 0, 0);
    let mut en = ParserWithCaching::new(ParserConfig::en_us());
    let mut de = ParserWithCaching::new(ParserConfig::de_de());

    let english = en.parse("=SUM(1.5,A2)", base, &sheets);
    let german = de.parse("=SUMME(1,5;A2)", base, &sheets);
    assert_eq!(english.hash, german.hash);
    assert_eq!(english.ast, german.ast);
}
