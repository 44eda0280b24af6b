//! Content-addressed cache of parsed formulas.
//!
//! Formulas are keyed by a canonical text hash in which every reference is replaced by a
//! position-independent fingerprint, so `=A1+1` in `B2` and `=A2+1` in `B3` share one tree.
//! The hash is computed from tokens on the parse path (no tree is built on a hit) and from the
//! tree after a structural transform; both routines produce the same key for the same formula.

use std::fmt::Write as _;
use std::sync::Arc;

use ahash::AHashMap;
use formula_address::{
    CellAddress, ColumnAddress, Range, RowAddress, SheetId, SheetReferenceType, SimpleCellAddress,
};
use log::debug;

use crate::ast::{Ast, Expr};
use crate::dependencies::{calls_function, collect_dependencies, RelativeDependency};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::parser::{bind_whitespace, AddressBuilder, BoundToken, FormulaParser, ParseOutput};
use crate::{ParserConfig, ParsingError, SheetResolver};

/// What evaluation needs to know about one formula shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub ast: Arc<Ast>,
    pub dependencies: Arc<[RelativeDependency]>,
    pub has_volatile_function: bool,
    pub has_structural_change_function: bool,
}

impl CacheEntry {
    fn new(ast: Ast, config: &ParserConfig) -> Self {
        let dependencies: Arc<[RelativeDependency]> = collect_dependencies(&ast).into();
        let has_volatile_function = calls_function(&ast, &|name| config.is_volatile(name));
        let has_structural_change_function =
            calls_function(&ast, &|name| config.is_structural_change(name));
        Self {
            ast: Arc::new(ast),
            dependencies,
            has_volatile_function,
            has_structural_change_function,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Map from canonical hash to the shared entry. Entries live as long as the cache.
#[derive(Debug, Default)]
pub struct FormulaCache {
    entries: AHashMap<Arc<str>, Arc<CacheEntry>>,
    stats: CacheStats,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `hash`, counting the hit or miss.
    pub fn lookup(&mut self, hash: &str) -> Option<Arc<CacheEntry>> {
        match self.entries.get(hash) {
            Some(entry) => {
                self.stats.hits += 1;
                Some(Arc::clone(entry))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up `hash` without touching the statistics.
    pub fn get(&self, hash: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(hash).cloned()
    }

    /// Store `ast` under `hash` unless an entry already exists; returns the stored entry.
    pub fn insert(&mut self, hash: &str, ast: Ast, config: &ParserConfig) -> Arc<CacheEntry> {
        if let Some(existing) = self.entries.get(hash) {
            return Arc::clone(existing);
        }
        let entry = Arc::new(CacheEntry::new(ast, config));
        self.entries.insert(Arc::from(hash), Arc::clone(&entry));
        entry
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`ParserWithCaching::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormula {
    pub ast: Arc<Ast>,
    pub errors: Vec<ParsingError>,
    pub dependencies: Arc<[RelativeDependency]>,
    pub has_volatile_function: bool,
    pub has_structural_change_function: bool,
    /// Cache key, when the formula was stored (or found) in the cache.
    pub hash: Option<Arc<str>>,
}

impl ParsedFormula {
    fn from_entry(entry: &CacheEntry, hash: Option<Arc<str>>) -> Self {
        Self {
            ast: Arc::clone(&entry.ast),
            errors: Vec::new(),
            dependencies: Arc::clone(&entry.dependencies),
            has_volatile_function: entry.has_volatile_function,
            has_structural_change_function: entry.has_structural_change_function,
            hash,
        }
    }

    fn uncached(ast: Ast, errors: Vec<ParsingError>, config: &ParserConfig) -> Self {
        let mut out = Self::from_entry(&CacheEntry::new(ast, config), None);
        out.errors = errors;
        out
    }
}

/// Parser front-end that shares trees between formulas with the same shape.
#[derive(Debug, Default)]
pub struct ParserWithCaching {
    config: ParserConfig,
    cache: FormulaCache,
}

impl ParserWithCaching {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            cache: FormulaCache::new(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn cache(&self) -> &FormulaCache {
        &self.cache
    }

    /// Parse `text` written in `base`, reusing the cached tree for its shape when there is one.
    ///
    /// Formulas with diagnostics are returned but never cached.
    pub fn parse(
        &mut self,
        text: &str,
        base: SimpleCellAddress,
        sheets: &dyn SheetResolver,
    ) -> ParsedFormula {
        let tokens = match tokenize(text, &self.config) {
            Ok(tokens) => tokens,
            Err(errors) => {
                let failed = ParseOutput::failed(text, errors);
                return ParsedFormula::uncached(failed.ast, failed.errors, &self.config);
            }
        };

        let hash = hash_from_tokens(&tokens, &self.config, sheets, base);
        if let Some(hash) = &hash {
            if let Some(entry) = self.cache.lookup(hash) {
                return ParsedFormula::from_entry(&entry, Some(Arc::from(hash.as_str())));
            }
        }

        let output = FormulaParser::new(&self.config, sheets).parse_tokens(text, &tokens, base);
        if !output.is_ok() {
            return ParsedFormula::uncached(output.ast, output.errors, &self.config);
        }
        match hash {
            Some(hash) if !output.position_dependent => {
                debug!("caching new formula shape `{hash}` (from `{text}`)");
                let entry = self.cache.insert(&hash, output.ast, &self.config);
                ParsedFormula::from_entry(&entry, Some(Arc::from(hash)))
            }
            _ => ParsedFormula::uncached(output.ast, Vec::new(), &self.config),
        }
    }

    pub fn fetch_cached(&self, hash: &str) -> Option<Arc<CacheEntry>> {
        self.cache.get(hash)
    }

    /// Store a tree produced outside the parser (e.g. by a structural transform) and return
    /// the shared entry for its shape.
    pub fn remember_new_ast(&mut self, ast: Ast) -> Arc<CacheEntry> {
        let hash = hash_from_ast(&ast);
        self.cache.insert(&hash, ast, &self.config)
    }
}

/// Canonical hash of a token stream, or `None` when the tokens cannot form a valid formula.
pub fn hash_from_tokens(
    tokens: &[Token],
    config: &ParserConfig,
    sheets: &dyn SheetResolver,
    base: SimpleCellAddress,
) -> Option<String> {
    let refs = AddressBuilder::new(config, sheets, base);
    let tokens = bind_whitespace(tokens);
    let mut hash = String::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if let Some(ws) = &token.leading_ws {
            hash.push_str(ws);
        }
        match &token.kind {
            TokenKind::CellReference(start) => {
                match (tokens.get(i + 1), tokens.get(i + 2)) {
                    (
                        Some(BoundToken {
                            kind: TokenKind::RangeSeparator,
                            ..
                        }),
                        Some(BoundToken {
                            kind: TokenKind::CellReference(end),
                            image: end_image,
                            ..
                        }),
                    ) => {
                        let raw = format!("{}:{}", token.image, end_image);
                        let range = refs.cell_range(start, end, &raw).ok()?;
                        write_reference(&mut hash, &range);
                        i += 3;
                        continue;
                    }
                    _ => write_reference(&mut hash, &refs.cell(start, &token.image)),
                }
            }
            TokenKind::ColumnRange(range) => {
                write_reference(&mut hash, &refs.column_range(range, &token.image).ok()?)
            }
            TokenKind::RowRange(range) => {
                write_reference(&mut hash, &refs.row_range(range, &token.image).ok()?)
            }
            TokenKind::Number(raw) => hash.push_str(raw),
            TokenKind::Error(kind) => hash.push_str(kind.as_code()),
            TokenKind::Procedure(name) => {
                hash.push_str(name);
                hash.push('(');
            }
            TokenKind::Offset => hash.push_str("OFFSET("),
            TokenKind::ArgSeparator | TokenKind::ArrayColSeparator => hash.push(','),
            TokenKind::ArrayRowSeparator => hash.push(';'),
            _ => hash.push_str(&token.image),
        }
        i += 1;
    }
    Some(hash)
}

/// Canonical hash of a tree; equal to [`hash_from_tokens`] of the tree's unparsed text.
pub fn hash_from_ast(ast: &Ast) -> String {
    let mut hash = String::from("=");
    write_ast(&mut hash, ast);
    hash
}

fn write_ast(out: &mut String, ast: &Ast) {
    let ws = ast.leading_whitespace.as_deref().unwrap_or("");
    match &ast.expr {
        Expr::Binary(binary) => {
            write_ast(out, &binary.left);
            out.push_str(ws);
            out.push_str(binary.op.as_str());
            write_ast(out, &binary.right);
        }
        Expr::Postfix(postfix) => {
            write_ast(out, &postfix.expr);
            out.push_str(ws);
            out.push_str(postfix.op.as_str());
        }
        Expr::Unary(unary) => {
            out.push_str(ws);
            out.push_str(unary.op.as_str());
            write_ast(out, &unary.expr);
        }
        Expr::FunctionCall(call) => {
            out.push_str(ws);
            out.push_str(&call.name);
            out.push('(');
            for (i, arg) in call.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_ast(out, arg);
            }
            out.push_str(call.internal_whitespace.as_deref().unwrap_or(""));
            out.push(')');
        }
        Expr::Parenthesis(paren) => {
            out.push_str(ws);
            out.push('(');
            write_ast(out, &paren.expr);
            out.push_str(paren.internal_whitespace.as_deref().unwrap_or(""));
            out.push(')');
        }
        Expr::Array(array) => {
            out.push_str(ws);
            out.push('{');
            for (r, row) in array.rows.iter().enumerate() {
                if r > 0 {
                    out.push(';');
                }
                for (c, element) in row.iter().enumerate() {
                    if c > 0 {
                        out.push(',');
                    }
                    write_ast(out, element);
                }
            }
            out.push_str(array.internal_whitespace.as_deref().unwrap_or(""));
            out.push('}');
        }
        Expr::Empty => out.push_str(ws),
        Expr::Number(raw) => {
            out.push_str(ws);
            out.push_str(raw);
        }
        Expr::String(value) => {
            out.push_str(ws);
            out.push('"');
            out.push_str(&value.replace('"', "\"\""));
            out.push('"');
        }
        Expr::NamedExpression(name) => {
            out.push_str(ws);
            out.push_str(name);
        }
        Expr::Error(kind) => {
            out.push_str(ws);
            out.push_str(kind.as_code());
        }
        Expr::CellReference(_)
        | Expr::CellRange(_)
        | Expr::ColumnRange(_)
        | Expr::RowRange(_)
        | Expr::ErrorWithRawInput { .. } => {
            out.push_str(ws);
            write_reference(out, &ast.expr);
        }
    }
}

/// Fingerprint of a reference node. Unresolvable references keep their source text.
fn write_reference(out: &mut String, expr: &Expr) {
    match expr {
        Expr::CellReference(address) => write_cell(out, address, true),
        Expr::CellRange(range) => write_range(out, range, write_cell),
        Expr::ColumnRange(range) => write_range(out, range, write_column),
        Expr::RowRange(range) => write_range(out, range, write_row),
        Expr::ErrorWithRawInput { raw, .. } => out.push_str(raw),
        Expr::Error(kind) => out.push_str(kind.as_code()),
        _ => {}
    }
}

fn write_range<A: Copy>(out: &mut String, range: &Range<A>, write: fn(&mut String, &A, bool)) {
    write(out, &range.start, range.sheet_ref != SheetReferenceType::Relative);
    out.push(':');
    write(out, &range.end, range.sheet_ref == SheetReferenceType::BothAbsolute);
}

fn axis_tag(absolute: bool) -> char {
    if absolute {
        'A'
    } else {
        'R'
    }
}

fn write_sheet(out: &mut String, sheet: Option<SheetId>, print_sheet: bool) {
    out.push('#');
    if let (true, Some(sheet)) = (print_sheet, sheet) {
        let _ = write!(out, "{sheet}");
    }
}

fn write_cell(out: &mut String, address: &CellAddress, print_sheet: bool) {
    write_sheet(out, address.sheet, print_sheet);
    let _ = write!(
        out,
        "{}{}{}{}",
        axis_tag(address.is_col_absolute()),
        address.col,
        axis_tag(address.is_row_absolute()),
        address.row
    );
}

fn write_column(out: &mut String, address: &ColumnAddress, print_sheet: bool) {
    write_sheet(out, address.sheet, print_sheet);
    let _ = write!(out, "COL{}{}", axis_tag(address.is_absolute()), address.col);
}

fn write_row(out: &mut String, address: &RowAddress, print_sheet: bool) {
    write_sheet(out, address.sheet, print_sheet);
    let _ = write!(out, "ROW{}{}", axis_tag(address.is_absolute()), address.row);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::SheetMapping;

    fn token_hash(text: &str, base: SimpleCellAddress) -> Option<String> {
        let config = ParserConfig::default();
        let sheets = SheetMapping::with_sheets(["Sheet1", "Sheet2"]);
        let tokens = tokenize(text, &config).unwrap();
        hash_from_tokens(&tokens, &config, &sheets, base)
    }

    #[test]
    fn equivalent_relative_shapes_hash_equally() {
        let b2 = SimpleCellAddress::new(0, 1, 1);
        let b3 = SimpleCellAddress::new(0, 1, 2);
        assert_eq!(token_hash("=A1+1", b2), token_hash("=A2+1", b3));
        assert_ne!(token_hash("=$A$1+1", b2), token_hash("=$A$2+1", b3));
        assert_ne!(token_hash("=A1", b2), token_hash("=Sheet1!A1", b2));
    }

    #[test]
    fn locale_and_spelling_do_not_change_the_hash() {
        let base = SimpleCellAddress::new(0, 0, 0);
        let de = ParserConfig::de_de();
        let sheets = SheetMapping::with_sheets(["Sheet1"]);
        let de_tokens = tokenize("=SUMME(1,5;#BEZUG!)", &de).unwrap();
        assert_eq!(
            hash_from_tokens(&de_tokens, &de, &sheets, base),
            token_hash("=sum(1.5,#ref!)", base)
        );
    }

    #[test]
    fn tree_hash_matches_token_hash() {
        let config = ParserConfig::default();
        let sheets = SheetMapping::with_sheets(["Sheet1", "Sheet2"]);
        let base = SimpleCellAddress::new(0, 3, 4);
        for text in [
            "=1 + SUM(A1:B$2, ,Sheet2!$C3) % ",
            "=IF( A1 ,\"a\"\"b\",{1,2;3,4} )",
            "=-(Sheet2!A:C) & 2:$5 & Missing!A1",
            "=RAND( )*Rate",
        ] {
            let tokens = tokenize(text, &config).unwrap();
            let ast = FormulaParser::new(&config, &sheets).parse(text, base).ast;
            assert_eq!(
                hash_from_tokens(&tokens, &config, &sheets, base),
                Some(hash_from_ast(&ast)),
                "{text}"
            );
        }
    }

    #[test]
    fn cache_shares_trees_and_counts() {
        let sheets = SheetMapping::with_sheets(["Sheet1"]);
        let mut parser = ParserWithCaching::new(ParserConfig::default());
        let first = parser.parse("=A1+1", SimpleCellAddress::new(0, 1, 1), &sheets);
        let second = parser.parse("=A2+1", SimpleCellAddress::new(0, 1, 2), &sheets);
        assert!(Arc::ptr_eq(&first.ast, &second.ast));
        assert_eq!(parser.cache().len(), 1);
        assert_eq!(parser.cache().stats(), CacheStats { hits: 1, misses: 1 });

        let volatile = parser.parse("=NOW()+A1", SimpleCellAddress::new(0, 0, 0), &sheets);
        assert!(volatile.has_volatile_function);
        assert!(!volatile.has_structural_change_function);
    }

    #[test]
    fn failed_and_position_dependent_parses_are_not_cached() {
        let sheets = SheetMapping::with_sheets(["Sheet1"]);
        let mut parser = ParserWithCaching::new(ParserConfig::default());
        let failed = parser.parse("=1+", SimpleCellAddress::new(0, 0, 0), &sheets);
        assert!(!failed.errors.is_empty());
        assert_eq!(failed.hash, None);

        let offset = parser.parse("=OFFSET(A1,-1,0)", SimpleCellAddress::new(0, 0, 0), &sheets);
        assert!(offset.errors.is_empty());
        assert_eq!(offset.hash, None);
        assert!(parser.cache().is_empty());
    }
}
