//! Formula lexer.
//!
//! Produces a flat token list in which every reference (including its sheet prefix) is a
//! single token, followed by three whitespace-normalization passes that keep insignificant
//! whitespace out of the grammar.

use crate::{ErrorKind, ParserConfig, ParsingError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    /// Canonical text of the literal (`.` decimal separator, upper-case exponent).
    Number(String),
    /// Unescaped contents.
    String(String),
    Error(ErrorKind),
    CellReference(CellToken),
    ColumnRange(RangeToken),
    RowRange(RangeToken),
    /// `NAME(`; carries the canonical function name.
    Procedure(String),
    /// The `OFFSET(` procedure, which the parser resolves statically.
    Offset,
    NamedExpression(String),
    RangeSeparator,
    ArgSeparator,
    ArrayLBrace,
    ArrayRBrace,
    ArrayColSeparator,
    ArrayRowSeparator,
    LParen,
    RParen,
    Plus,
    Minus,
    Times,
    Div,
    Pow,
    Concat,
    Percent,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token, exactly as written.
    pub image: String,
}

/// An A1 cell reference with its optional sheet prefix. Coordinates are 0-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellToken {
    pub sheet: Option<String>,
    pub col: u32,
    pub row: u32,
    pub col_abs: bool,
    pub row_abs: bool,
}

/// One end of a whole-column or whole-row range. `index` is 0-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisToken {
    pub sheet: Option<String>,
    pub index: u32,
    pub absolute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeToken {
    pub start: AxisToken,
    pub end: AxisToken,
}

/// Tokenize `formula` and normalize insignificant whitespace.
///
/// Either the token list or the (non-empty) list of lexing errors is returned.
pub fn tokenize(formula: &str, config: &ParserConfig) -> Result<Vec<Token>, Vec<ParsingError>> {
    let mut tokens = Lexer::new(formula, config).lex()?;
    trim_trailing_whitespace(&mut tokens);
    let tokens = skip_whitespace_inside_ranges(tokens);
    Ok(skip_whitespace_before_arg_separators(tokens))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParenContext {
    /// Parentheses opened by a procedure token, along with the brace depth at the `(`.
    ///
    /// Separators shared between function arguments and array literals (e.g. `,` in en-US)
    /// are argument separators directly inside a call, and array separators otherwise.
    FunctionCall {
        brace_depth: usize,
    },
    Group,
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    idx: usize,
    config: &'a ParserConfig,
    tokens: Vec<Token>,
    errors: Vec<ParsingError>,
    paren_stack: Vec<ParenContext>,
    brace_depth: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, config: &'a ParserConfig) -> Self {
        Self {
            src,
            chars: src.chars(),
            idx: 0,
            config,
            tokens: Vec::new(),
            errors: Vec::new(),
            paren_stack: Vec::new(),
            brace_depth: 0,
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, Vec<ParsingError>> {
        let config = self.config;
        while let Some(ch) = self.peek_char() {
            let start = self.idx;
            match ch {
                c if config.whitespace.matches(c) => {
                    self.take_while(|c| config.whitespace.matches(c));
                    self.push(TokenKind::Whitespace, start);
                }
                '"' => self.lex_string(start),
                '#' => match self.match_error_literal() {
                    Some((len, kind)) => {
                        self.rollback_to(start + len);
                        self.push(TokenKind::Error(kind), start);
                    }
                    None => {
                        self.bump();
                        self.error(format!("Unknown error literal at position {start}"));
                    }
                },
                '(' => {
                    self.bump();
                    self.paren_stack.push(ParenContext::Group);
                    self.push(TokenKind::LParen, start);
                }
                ')' => {
                    self.bump();
                    self.paren_stack.pop();
                    self.push(TokenKind::RParen, start);
                }
                '{' => {
                    self.bump();
                    self.brace_depth += 1;
                    self.push(TokenKind::ArrayLBrace, start);
                }
                '}' => {
                    self.bump();
                    self.brace_depth = self.brace_depth.saturating_sub(1);
                    self.push(TokenKind::ArrayRBrace, start);
                }
                c if c == config.function_arg_separator => {
                    self.bump();
                    let is_func_arg_sep = matches!(
                        self.paren_stack.last(),
                        Some(ParenContext::FunctionCall { brace_depth }) if *brace_depth == self.brace_depth
                    );
                    if self.brace_depth > 0 && !is_func_arg_sep {
                        if c == config.array_row_separator {
                            self.push(TokenKind::ArrayRowSeparator, start);
                        } else {
                            self.push(TokenKind::ArrayColSeparator, start);
                        }
                    } else {
                        self.push(TokenKind::ArgSeparator, start);
                    }
                }
                c if self.brace_depth > 0
                    && (c == config.array_row_separator || c == config.array_column_separator) =>
                {
                    self.bump();
                    if c == config.array_row_separator {
                        self.push(TokenKind::ArrayRowSeparator, start);
                    } else {
                        self.push(TokenKind::ArrayColSeparator, start);
                    }
                }
                c if is_digit(c) => {
                    if let Some(kind) = self.try_lex_row_range(None) {
                        self.push(kind, start);
                    } else {
                        let raw = self.lex_number();
                        self.push(TokenKind::Number(raw), start);
                    }
                }
                c if c == config.decimal_separator && self.peek_next_is_digit() => {
                    let raw = self.lex_number();
                    self.push(TokenKind::Number(raw), start);
                }
                ':' => self.single(TokenKind::RangeSeparator, start),
                '+' => self.single(TokenKind::Plus, start),
                '-' => self.single(TokenKind::Minus, start),
                '*' => self.single(TokenKind::Times, start),
                '/' => self.single(TokenKind::Div, start),
                '^' => self.single(TokenKind::Pow, start),
                '&' => self.single(TokenKind::Concat, start),
                '%' => self.single(TokenKind::Percent, start),
                '=' => self.single(TokenKind::Eq, start),
                '<' => {
                    self.bump();
                    match self.peek_char() {
                        Some('=') => self.single(TokenKind::Le, start),
                        Some('>') => self.single(TokenKind::Ne, start),
                        _ => self.push(TokenKind::Lt, start),
                    }
                }
                '>' => {
                    self.bump();
                    if self.peek_char() == Some('=') {
                        self.single(TokenKind::Ge, start);
                    } else {
                        self.push(TokenKind::Gt, start);
                    }
                }
                c if c == '$' || c == '\'' || is_ident_start_char(c) => match self.lex_reference() {
                    Ok(Some(kind)) => self.push(kind, start),
                    Ok(None) if is_ident_start_char(c) => self.lex_ident(start),
                    Ok(None) => {
                        self.bump();
                        self.error(format!("Unexpected character `{c}` at position {start}"));
                    }
                    Err(err) => self.errors.push(err),
                },
                _ => {
                    self.bump();
                    self.error(format!("Unexpected character `{ch}` at position {start}"));
                }
            }
        }

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn lex_string(&mut self, start: usize) {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    self.bump();
                    if self.peek_char() == Some('"') {
                        self.bump();
                        value.push('"');
                        continue;
                    }
                    break;
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
                None => {
                    self.error(format!("Unterminated string literal at position {start}"));
                    return;
                }
            }
        }
        self.push(TokenKind::String(value), start);
    }

    fn lex_ident(&mut self, start: usize) {
        self.take_while(is_ident_cont_char);
        let name = &self.src[start..self.idx];
        if self.peek_char() == Some('(') {
            let canonical = self.config.canonical_function_name(name);
            self.bump();
            self.paren_stack.push(ParenContext::FunctionCall {
                brace_depth: self.brace_depth,
            });
            if canonical == "OFFSET" {
                self.push(TokenKind::Offset, start);
            } else {
                self.push(TokenKind::Procedure(canonical), start);
            }
        } else {
            let name = name.to_string();
            self.push(TokenKind::NamedExpression(name), start);
        }
    }

    /// Try every reference form at the current position, with an optional sheet prefix.
    ///
    /// `Ok(None)` means "not a reference" and leaves the position unchanged.
    fn lex_reference(&mut self) -> Result<Option<TokenKind>, ParsingError> {
        let start = self.idx;
        let sheet = self.try_sheet_prefix()?;
        if let Some(kind) = self.try_lex_column_range(sheet.clone()) {
            return Ok(Some(kind));
        }
        if let Some(kind) = self.try_lex_row_range(sheet.clone()) {
            return Ok(Some(kind));
        }
        if let Some(cell) = self.try_lex_cell_ref(sheet.clone()) {
            return Ok(Some(TokenKind::CellReference(cell)));
        }
        if sheet.is_some() {
            return Err(ParsingError::lexing(format!(
                "Expected a reference after the sheet name at position {start}"
            )));
        }
        self.rollback_to(start);
        Ok(None)
    }

    /// `Sheet1!` or `'My Sheet'!`. Consumes nothing when there is no prefix.
    fn try_sheet_prefix(&mut self) -> Result<Option<String>, ParsingError> {
        let start = self.idx;
        match self.peek_char() {
            Some('\'') => {
                self.bump();
                let mut name = String::new();
                loop {
                    match self.bump() {
                        Some('\'') => {
                            if self.peek_char() == Some('\'') {
                                self.bump();
                                name.push('\'');
                                continue;
                            }
                            break;
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(ParsingError::lexing(format!(
                                "Unterminated quoted sheet name at position {start}"
                            )));
                        }
                    }
                }
                if self.peek_char() != Some('!') {
                    return Err(ParsingError::lexing(format!(
                        "Quoted sheet name at position {start} must be followed by `!`"
                    )));
                }
                self.bump();
                Ok(Some(name))
            }
            Some(c) if is_ident_start_char(c) => {
                let mut lookahead = self.chars.clone();
                let mut len = 0;
                while let Some(c) = lookahead.next() {
                    if c == '!' && len > 0 {
                        let name = self.src[start..start + len].to_string();
                        self.rollback_to(start + len + 1);
                        return Ok(Some(name));
                    }
                    if !is_ident_cont_char(c) {
                        break;
                    }
                    len += c.len_utf8();
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn try_lex_column_range(&mut self, sheet: Option<String>) -> Option<TokenKind> {
        let save_idx = self.idx;
        let result = (|| {
            let (start_col, start_abs) = self.take_column_part()?;
            if self.peek_char() != Some(':') {
                return None;
            }
            self.bump();
            let end_sheet = self.try_sheet_prefix().ok()?;
            let (end_col, end_abs) = self.take_column_part()?;
            if self.continues_identifier() {
                return None;
            }
            Some(TokenKind::ColumnRange(RangeToken {
                start: AxisToken {
                    sheet: sheet.clone(),
                    index: start_col,
                    absolute: start_abs,
                },
                end: AxisToken {
                    sheet: end_sheet,
                    index: end_col,
                    absolute: end_abs,
                },
            }))
        })();
        if result.is_none() {
            self.rollback_to(save_idx);
        }
        result
    }

    fn try_lex_row_range(&mut self, sheet: Option<String>) -> Option<TokenKind> {
        let save_idx = self.idx;
        let result = (|| {
            let (start_row, start_abs) = self.take_row_part()?;
            if self.peek_char() != Some(':') {
                return None;
            }
            self.bump();
            let end_sheet = self.try_sheet_prefix().ok()?;
            let (end_row, end_abs) = self.take_row_part()?;
            if self.continues_identifier() {
                return None;
            }
            Some(TokenKind::RowRange(RangeToken {
                start: AxisToken {
                    sheet: sheet.clone(),
                    index: start_row,
                    absolute: start_abs,
                },
                end: AxisToken {
                    sheet: end_sheet,
                    index: end_row,
                    absolute: end_abs,
                },
            }))
        })();
        if result.is_none() {
            self.rollback_to(save_idx);
        }
        result
    }

    fn try_lex_cell_ref(&mut self, sheet: Option<String>) -> Option<CellToken> {
        let save_idx = self.idx;
        let result = (|| {
            let (col, col_abs) = self.take_column_part()?;
            let (row, row_abs) = self.take_row_part()?;
            // `A1FOO` and `LOG10(` are names, not references.
            if self.continues_identifier() {
                return None;
            }
            Some(CellToken {
                sheet,
                col,
                row,
                col_abs,
                row_abs,
            })
        })();
        if result.is_none() {
            self.rollback_to(save_idx);
        }
        result
    }

    /// `$`? followed by one to three column letters.
    fn take_column_part(&mut self) -> Option<(u32, bool)> {
        let absolute = self.peek_char() == Some('$');
        if absolute {
            self.bump();
        }
        let label = self.take_while(|c| c.is_ascii_alphabetic());
        if label.is_empty() || label.len() > 3 {
            return None;
        }
        let col = formula_address::column_index(&label)?;
        Some((col as u32, absolute))
    }

    /// `$`? followed by a 1-based row number. Returns the 0-indexed row.
    fn take_row_part(&mut self) -> Option<(u32, bool)> {
        let absolute = self.peek_char() == Some('$');
        if absolute {
            self.bump();
        }
        let digits = self.take_while(is_digit);
        if digits.is_empty() {
            return None;
        }
        // Rows beyond `u32` are clamped; the parser rejects them against the sheet limits.
        let row = digits.parse::<u32>().unwrap_or(u32::MAX);
        if row == 0 {
            return None;
        }
        Some((row - 1, absolute))
    }

    fn continues_identifier(&self) -> bool {
        matches!(self.peek_char(), Some(c) if is_ident_cont_char(c) || c == '(' || c == '$')
    }

    /// Number text in canonical form: `.` as the decimal separator and an upper-case `E`
    /// exponent, so `1e5` and `1E5` lex (and unparse) identically.
    fn lex_number(&mut self) -> String {
        let decimal = self.config.decimal_separator;
        let mut out = String::new();
        self.take_while_into(is_digit, &mut out);
        if self.peek_char() == Some(decimal) && self.peek_next_is_digit() {
            self.bump();
            out.push('.');
            self.take_while_into(is_digit, &mut out);
        }
        if matches!(self.peek_char(), Some('E' | 'e')) {
            let save_idx = self.idx;
            let save_out_len = out.len();
            self.bump();
            out.push('E');
            if let Some(sign @ ('+' | '-')) = self.peek_char() {
                self.bump();
                out.push(sign);
            }
            let digits_start_len = out.len();
            self.take_while_into(is_digit, &mut out);
            if out.len() == digits_start_len {
                // roll back: the 'E' belongs to whatever follows.
                self.rollback_to(save_idx);
                out.truncate(save_out_len);
            }
        }
        out
    }

    /// Longest configured error literal at the current position (case-insensitive).
    fn match_error_literal(&self) -> Option<(usize, ErrorKind)> {
        let rest = &self.src[self.idx..];
        self.config
            .error_translations
            .iter()
            .filter_map(|(literal, kind)| {
                let candidate = rest.get(..literal.len())?;
                (candidate.to_uppercase() == *literal).then_some((literal.len(), *kind))
            })
            .max_by_key(|(len, _)| *len)
    }

    fn single(&mut self, kind: TokenKind, start: usize) {
        self.bump();
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            image: self.src[start..self.idx].to_string(),
        });
    }

    fn error(&mut self, message: String) {
        self.errors.push(ParsingError::lexing(message));
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.idx += ch.len_utf8();
        Some(ch)
    }

    fn rollback_to(&mut self, idx: usize) {
        self.idx = idx;
        self.chars = self.src[idx..].chars();
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_next_is_digit(&self) -> bool {
        let mut iter = self.chars.clone();
        iter.next();
        matches!(iter.next(), Some(c) if is_digit(c))
    }

    fn take_while<F>(&mut self, pred: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut out = String::new();
        self.take_while_into(pred, &mut out);
        out
    }

    fn take_while_into<F>(&mut self, mut pred: F, out: &mut String)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.bump();
            out.push(ch);
        }
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_ident_start_char(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_cont_char(c: char) -> bool {
    c == '_' || c == '.' || c.is_alphanumeric()
}

fn is_range_part(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::CellReference(_) | TokenKind::RangeSeparator)
}

fn trim_trailing_whitespace(tokens: &mut Vec<Token>) {
    if tokens
        .last()
        .is_some_and(|t| matches!(t.kind, TokenKind::Whitespace))
    {
        tokens.pop();
    }
}

/// `A1 : B2` lexes like `A1:B2`.
fn skip_whitespace_inside_ranges(tokens: Vec<Token>) -> Vec<Token> {
    let drop: Vec<bool> = (0..tokens.len())
        .map(|i| {
            matches!(tokens[i].kind, TokenKind::Whitespace)
                && i > 0
                && i + 1 < tokens.len()
                && is_range_part(&tokens[i - 1].kind)
                && is_range_part(&tokens[i + 1].kind)
        })
        .collect();
    tokens
        .into_iter()
        .zip(drop)
        .filter_map(|(token, drop)| (!drop).then_some(token))
        .collect()
}

/// `SUM(A1 ,B1)` lexes like `SUM(A1,B1)`; whitespace after another separator is kept since it
/// belongs to an empty argument.
fn skip_whitespace_before_arg_separators(tokens: Vec<Token>) -> Vec<Token> {
    let drop: Vec<bool> = (0..tokens.len())
        .map(|i| {
            matches!(tokens[i].kind, TokenKind::Whitespace)
                && tokens
                    .get(i + 1)
                    .is_some_and(|t| matches!(t.kind, TokenKind::ArgSeparator))
                && !(i > 0 && matches!(tokens[i - 1].kind, TokenKind::ArgSeparator))
        })
        .collect();
    tokens
        .into_iter()
        .zip(drop)
        .filter_map(|(token, drop)| (!drop).then_some(token))
        .collect()
}
