//! Operator-precedence parser over the normalized token stream.
//!
//! References are stored relative to the formula's own cell (`base`), so the same tree can be
//! shared by every formula with the same shape.

use formula_address::{
    CellAddress, CellRange, CellReferenceType, ColumnAddress, ColumnRange, ReferenceType,
    RowAddress, RowRange, SheetId, SheetReferenceType, SimpleCellAddress,
};

use crate::ast::{
    ArrayLiteral, Ast, BinaryExpr, BinaryOp, Expr, FunctionCall, Parenthesis, PostfixExpr,
    PostfixOp, UnaryExpr, UnaryOp,
};
use crate::lexer::{tokenize, AxisToken, CellToken, RangeToken, Token, TokenKind};
use crate::{ErrorKind, ParserConfig, ParsingError, ParsingErrorKind, SheetResolver};

/// Binding power of prefix `+`/`-` and of postfix `%`. Higher than every binary operator, so
/// `-2^2` parses as `(-2)^2`.
const UNARY_BP: u8 = 60;

/// Result of parsing one formula.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    /// The syntax tree, or a single parse-error node when `errors` is non-empty.
    pub ast: Ast,
    pub errors: Vec<ParsingError>,
    /// The tree encodes a decision that depends on the formula's position and not only on its
    /// shape (a statically resolved `OFFSET` with a relative reference), so it must not be
    /// shared with other cells.
    pub position_dependent: bool,
}

impl ParseOutput {
    pub(crate) fn failed(text: &str, errors: Vec<ParsingError>) -> Self {
        let raw = text.strip_prefix('=').unwrap_or(text).to_string();
        Self {
            ast: Ast::new(Expr::ErrorWithRawInput {
                raw,
                error: ErrorKind::Error,
            }),
            errors,
            position_dependent: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses formula text into an [`Ast`].
pub struct FormulaParser<'a> {
    config: &'a ParserConfig,
    sheets: &'a dyn SheetResolver,
}

impl<'a> FormulaParser<'a> {
    pub fn new(config: &'a ParserConfig, sheets: &'a dyn SheetResolver) -> Self {
        Self { config, sheets }
    }

    /// Parse `text` as written in the cell `base`.
    pub fn parse(&self, text: &str, base: SimpleCellAddress) -> ParseOutput {
        match tokenize(text, self.config) {
            Ok(tokens) => self.parse_tokens(text, &tokens, base),
            Err(errors) => ParseOutput::failed(text, errors),
        }
    }

    /// Parse an already tokenized formula. `text` is only used for the parse-error node.
    pub fn parse_tokens(&self, text: &str, tokens: &[Token], base: SimpleCellAddress) -> ParseOutput {
        let mut parser = Parser {
            refs: AddressBuilder::new(self.config, self.sheets, base),
            tokens: bind_whitespace(tokens),
            pos: 0,
            position_dependent: false,
        };
        match parser.parse_formula() {
            Ok(ast) => ParseOutput {
                ast,
                errors: Vec::new(),
                position_dependent: parser.position_dependent,
            },
            Err(err) => ParseOutput::failed(text, vec![err]),
        }
    }
}

/// A significant token together with the whitespace written before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoundToken {
    pub(crate) kind: TokenKind,
    pub(crate) image: String,
    pub(crate) leading_ws: Option<String>,
}

/// Attach each whitespace token to the significant token that follows it.
///
/// Whitespace around `:` and before array separators has no node to live on and is dropped.
pub(crate) fn bind_whitespace(tokens: &[Token]) -> Vec<BoundToken> {
    let mut out: Vec<BoundToken> = Vec::with_capacity(tokens.len());
    let mut pending: Option<String> = None;
    for token in tokens {
        if matches!(token.kind, TokenKind::Whitespace) {
            pending.get_or_insert_with(String::new).push_str(&token.image);
            continue;
        }
        let mut leading_ws = pending.take();
        let after_colon = out
            .last()
            .is_some_and(|prev| matches!(prev.kind, TokenKind::RangeSeparator));
        if after_colon
            || matches!(
                token.kind,
                TokenKind::RangeSeparator
                    | TokenKind::ArrayColSeparator
                    | TokenKind::ArrayRowSeparator
            )
        {
            leading_ws = None;
        }
        out.push(BoundToken {
            kind: token.kind.clone(),
            image: token.image.clone(),
            leading_ws,
        });
    }
    out
}

enum RangeSheet {
    Resolved(Option<SheetId>, SheetReferenceType),
    Invalid,
}

/// Turns reference tokens into formula-relative addresses.
pub(crate) struct AddressBuilder<'a> {
    config: &'a ParserConfig,
    sheets: &'a dyn SheetResolver,
    base: SimpleCellAddress,
}

impl<'a> AddressBuilder<'a> {
    pub(crate) fn new(
        config: &'a ParserConfig,
        sheets: &'a dyn SheetResolver,
        base: SimpleCellAddress,
    ) -> Self {
        Self {
            config,
            sheets,
            base,
        }
    }

    /// `None` when no sheet was written, `Some(None)` when the written sheet does not exist.
    fn written_sheet(&self, name: Option<&str>) -> Option<Option<SheetId>> {
        name.map(|name| self.sheets.sheet_id(name))
    }

    fn range_sheet(
        start: Option<Option<SheetId>>,
        end: Option<Option<SheetId>>,
    ) -> Result<RangeSheet, ParsingError> {
        Ok(match (start, end) {
            (None, Some(_)) => {
                return Err(ParsingError::parser(
                    "Only the start of a range may be qualified with a sheet on its own",
                ))
            }
            (None, None) => RangeSheet::Resolved(None, SheetReferenceType::Relative),
            (Some(Some(sheet)), None) => {
                RangeSheet::Resolved(Some(sheet), SheetReferenceType::StartAbsolute)
            }
            (Some(Some(start)), Some(Some(end))) if start == end => {
                RangeSheet::Resolved(Some(start), SheetReferenceType::BothAbsolute)
            }
            _ => RangeSheet::Invalid,
        })
    }

    fn checked_col(&self, col: u32) -> Option<i32> {
        if col >= self.config.max_columns {
            return None;
        }
        i32::try_from(col).ok()
    }

    fn checked_row(&self, row: u32) -> Option<i32> {
        if row >= self.config.max_rows {
            return None;
        }
        i32::try_from(row).ok()
    }

    pub(crate) fn cell(&self, token: &CellToken, image: &str) -> Expr {
        let sheet = match self.written_sheet(token.sheet.as_deref()) {
            Some(None) => return raw_error(image, ErrorKind::Ref),
            Some(sheet) => sheet,
            None => None,
        };
        match self.cell_address(token, sheet) {
            Some(address) => Expr::CellReference(address),
            None => raw_error(image, ErrorKind::Name),
        }
    }

    fn cell_address(&self, token: &CellToken, sheet: Option<SheetId>) -> Option<CellAddress> {
        let col = self.checked_col(token.col)?;
        let row = self.checked_row(token.row)?;
        let kind = CellReferenceType::from_parts(
            reference_type(token.col_abs),
            reference_type(token.row_abs),
        );
        let target = SimpleCellAddress::new(sheet.unwrap_or(self.base.sheet), col, row);
        Some(CellAddress::from_simple(target, self.base, kind, sheet))
    }

    pub(crate) fn cell_range(
        &self,
        start: &CellToken,
        end: &CellToken,
        raw: &str,
    ) -> Result<Expr, ParsingError> {
        let range_sheet = Self::range_sheet(
            self.written_sheet(start.sheet.as_deref()),
            self.written_sheet(end.sheet.as_deref()),
        )?;
        let RangeSheet::Resolved(sheet, sheet_ref) = range_sheet else {
            return Ok(raw_error(raw, ErrorKind::Ref));
        };
        match (self.cell_address(start, sheet), self.cell_address(end, sheet)) {
            (Some(a), Some(b)) => self.ordered_cell_range(a, b, sheet_ref),
            _ => Ok(raw_error(raw, ErrorKind::Name)),
        }
    }

    fn ordered_cell_range(
        &self,
        a: CellAddress,
        b: CellAddress,
        sheet_ref: SheetReferenceType,
    ) -> Result<Expr, ParsingError> {
        CellRange::ordered(a, b, sheet_ref, self.base)
            .map(Expr::CellRange)
            .map_err(|err| ParsingError::parser(err.to_string()))
    }

    pub(crate) fn column_range(&self, token: &RangeToken, image: &str) -> Result<Expr, ParsingError> {
        let RangeSheet::Resolved(sheet, sheet_ref) = self.axis_range_sheet(token)? else {
            return Ok(raw_error(image, ErrorKind::Ref));
        };
        let column = |axis: &AxisToken| {
            self.checked_col(axis.index)
                .map(|col| ColumnAddress::from_simple(col, self.base, reference_type(axis.absolute), sheet))
        };
        match (column(&token.start), column(&token.end)) {
            (Some(a), Some(b)) => ColumnRange::ordered(a, b, sheet_ref, self.base)
                .map(Expr::ColumnRange)
                .map_err(|err| ParsingError::parser(err.to_string())),
            _ => Ok(raw_error(image, ErrorKind::Name)),
        }
    }

    pub(crate) fn row_range(&self, token: &RangeToken, image: &str) -> Result<Expr, ParsingError> {
        let RangeSheet::Resolved(sheet, sheet_ref) = self.axis_range_sheet(token)? else {
            return Ok(raw_error(image, ErrorKind::Ref));
        };
        let row = |axis: &AxisToken| {
            self.checked_row(axis.index)
                .map(|row| RowAddress::from_simple(row, self.base, reference_type(axis.absolute), sheet))
        };
        match (row(&token.start), row(&token.end)) {
            (Some(a), Some(b)) => RowRange::ordered(a, b, sheet_ref, self.base)
                .map(Expr::RowRange)
                .map_err(|err| ParsingError::parser(err.to_string())),
            _ => Ok(raw_error(image, ErrorKind::Name)),
        }
    }

    fn axis_range_sheet(&self, token: &RangeToken) -> Result<RangeSheet, ParsingError> {
        Self::range_sheet(
            self.written_sheet(token.start.sheet.as_deref()),
            self.written_sheet(token.end.sheet.as_deref()),
        )
    }
}

fn reference_type(absolute: bool) -> ReferenceType {
    if absolute {
        ReferenceType::Absolute
    } else {
        ReferenceType::Relative
    }
}

fn raw_error(raw: &str, error: ErrorKind) -> Expr {
    Expr::ErrorWithRawInput {
        raw: raw.to_string(),
        error,
    }
}

/// One end of a `start:end` cell range.
enum RangeOperand {
    Token(CellToken),
    Offset(Expr),
}

struct Parser<'a> {
    refs: AddressBuilder<'a>,
    tokens: Vec<BoundToken>,
    pos: usize,
    position_dependent: bool,
}

impl<'a> Parser<'a> {
    fn parse_formula(&mut self) -> Result<Ast, ParsingError> {
        match self.next() {
            Some(tok) if matches!(tok.kind, TokenKind::Eq) && tok.leading_ws.is_none() => {}
            _ => return Err(ParsingError::parser("Formula must start with `=`")),
        }
        let ast = self.parse_expression(0)?;
        if let Some(tok) = self.peek() {
            return Err(unexpected(&tok.image));
        }
        Ok(ast)
    }

    fn parse_expression(&mut self, min_bp: u8) -> Result<Ast, ParsingError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(kind) = self.peek_kind() else {
                break;
            };

            if matches!(kind, TokenKind::Percent) {
                if UNARY_BP < min_bp {
                    break;
                }
                let tok = self.next_or_eof()?;
                lhs = Ast::with_whitespace(
                    Expr::Postfix(PostfixExpr {
                        op: PostfixOp::Percent,
                        expr: Box::new(lhs),
                    }),
                    tok.leading_ws,
                );
                continue;
            }

            let Some(op) = binary_op(kind) else {
                break;
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            let tok = self.next_or_eof()?;
            let rhs = self.parse_expression(r_bp)?;
            lhs = Ast::with_whitespace(
                Expr::Binary(BinaryExpr {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                }),
                tok.leading_ws,
            );
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Ast, ParsingError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Plus) => UnaryOp::Plus,
            Some(TokenKind::Minus) => UnaryOp::Minus,
            _ => return self.parse_primary(),
        };
        let tok = self.next_or_eof()?;
        let operand = self.parse_expression(UNARY_BP)?;
        Ok(Ast::with_whitespace(
            Expr::Unary(UnaryExpr {
                op,
                expr: Box::new(operand),
            }),
            tok.leading_ws,
        ))
    }

    fn parse_primary(&mut self) -> Result<Ast, ParsingError> {
        let start = self.pos;
        let tok = self.next_or_eof()?;
        let leading_ws = tok.leading_ws;
        let image = tok.image;
        let expr = match tok.kind {
            TokenKind::Number(raw) => Expr::Number(raw),
            TokenKind::String(value) => Expr::String(value),
            TokenKind::Error(kind) => Expr::Error(kind),
            TokenKind::NamedExpression(name) => Expr::NamedExpression(name),
            TokenKind::LParen => {
                let inner = self.parse_expression(0)?;
                let close = self.expect_rparen()?;
                Expr::Parenthesis(Parenthesis {
                    expr: Box::new(inner),
                    internal_whitespace: close.leading_ws,
                })
            }
            TokenKind::ArrayLBrace => self.parse_array()?,
            TokenKind::Procedure(name) => {
                let (args, internal_whitespace) = self.parse_arguments()?;
                Expr::FunctionCall(FunctionCall {
                    name,
                    args,
                    internal_whitespace,
                })
            }
            TokenKind::Offset => {
                let offset = self.parse_offset()?;
                self.parse_range_tail(start, RangeOperand::Offset(offset))?
            }
            TokenKind::CellReference(cell) => {
                self.parse_range_tail(start, RangeOperand::Token(cell))?
            }
            TokenKind::ColumnRange(range) => self.refs.column_range(&range, &image)?,
            TokenKind::RowRange(range) => self.refs.row_range(&range, &image)?,
            _ => return Err(unexpected(&image)),
        };
        Ok(Ast::with_whitespace(expr, leading_ws))
    }

    /// Arguments up to and including the closing `)`, plus the whitespace before it.
    ///
    /// An omitted argument takes over the whitespace written before the separator or `)` that
    /// ends it. A call whose only argument is omitted (`F()`) has no arguments.
    fn parse_arguments(&mut self) -> Result<(Vec<Ast>, Option<String>), ParsingError> {
        let mut args = Vec::new();
        loop {
            let omitted = matches!(
                self.peek_kind(),
                Some(TokenKind::ArgSeparator | TokenKind::RParen)
            );
            if omitted {
                let ws = self.tokens[self.pos].leading_ws.take();
                args.push(Ast::with_whitespace(Expr::Empty, ws));
            } else {
                args.push(self.parse_expression(0)?);
            }

            let Some(tok) = self.next() else {
                return Err(ParsingError::parser("Unterminated function call"));
            };
            match tok.kind {
                TokenKind::ArgSeparator => continue,
                TokenKind::RParen => {
                    let mut internal_whitespace = tok.leading_ws;
                    if args.len() == 1 && matches!(args[0].expr, Expr::Empty) {
                        internal_whitespace = args.pop().and_then(|arg| arg.leading_whitespace);
                    }
                    return Ok((args, internal_whitespace));
                }
                _ => return Err(unexpected(&tok.image)),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Expr, ParsingError> {
        let mut rows: Vec<Vec<Ast>> = Vec::new();
        let mut current_row = Vec::new();
        loop {
            current_row.push(self.parse_expression(0)?);
            let Some(tok) = self.next() else {
                return Err(ParsingError::parser("Unterminated array literal"));
            };
            match tok.kind {
                TokenKind::ArrayColSeparator => {}
                TokenKind::ArrayRowSeparator => rows.push(std::mem::take(&mut current_row)),
                TokenKind::ArrayRBrace => {
                    rows.push(current_row);
                    let width = rows[0].len();
                    if rows.iter().any(|row| row.len() != width) {
                        return Err(ParsingError::parser(
                            "Array literal rows must all have the same length",
                        ));
                    }
                    return Ok(Expr::Array(ArrayLiteral {
                        rows,
                        internal_whitespace: tok.leading_ws,
                    }));
                }
                _ => return Err(unexpected(&tok.image)),
            }
        }
    }

    /// `OFFSET(ref, rows, cols[, height[, width]])` with literal arguments, resolved to the
    /// reference it denotes. A target outside the sheet is a `#REF!` node.
    fn parse_offset(&mut self) -> Result<Expr, ParsingError> {
        let (args, _) = self.parse_arguments()?;
        if !(3..=5).contains(&args.len()) {
            return Err(static_offset_error(format!(
                "OFFSET expects 3 to 5 arguments, got {}",
                args.len()
            )));
        }
        let Expr::CellReference(reference) = &args[0].expr else {
            return Err(static_offset_error(
                "First argument to OFFSET must be a cell reference",
            ));
        };
        let rows = static_integer(&args[1])
            .ok_or_else(|| static_offset_error("Second argument to OFFSET is not a static number"))?;
        let cols = static_integer(&args[2])
            .ok_or_else(|| static_offset_error("Third argument to OFFSET is not a static number"))?;
        let height = match args.get(3) {
            Some(arg) => static_integer(arg).ok_or_else(|| {
                static_offset_error("Fourth argument to OFFSET is not a static number")
            })?,
            None => 1,
        };
        let width = match args.get(4) {
            Some(arg) => static_integer(arg).ok_or_else(|| {
                static_offset_error("Fifth argument to OFFSET is not a static number")
            })?,
            None => 1,
        };
        if height < 1 {
            return Err(ParsingError::new(
                ParsingErrorKind::StaticOffsetOutOfRangeError,
                "Fourth argument to OFFSET is too small a number",
            ));
        }
        if width < 1 {
            return Err(ParsingError::new(
                ParsingErrorKind::StaticOffsetOutOfRangeError,
                "Fifth argument to OFFSET is too small a number",
            ));
        }

        if !(reference.is_col_absolute() && reference.is_row_absolute()) {
            self.position_dependent = true;
        }

        let origin = reference.to_simple(self.refs.base);
        let top = i64::from(origin.row) + rows;
        let left = i64::from(origin.col) + cols;
        let bottom = top + height - 1;
        let right = left + width - 1;
        if top < 0
            || left < 0
            || bottom >= i64::from(self.refs.config.max_rows)
            || right >= i64::from(self.refs.config.max_columns)
        {
            return Ok(Expr::Error(ErrorKind::Ref));
        }

        // All four corners are inside the sheet, so the deltas fit in `i32`.
        let top_left = reference
            .shifted_by_rows((top - i64::from(origin.row)) as i32)
            .shifted_by_columns((left - i64::from(origin.col)) as i32);
        if height == 1 && width == 1 {
            return Ok(Expr::CellReference(top_left));
        }
        let bottom_right = top_left
            .shifted_by_rows((height - 1) as i32)
            .shifted_by_columns((width - 1) as i32);
        let sheet_ref = if top_left.sheet.is_some() {
            SheetReferenceType::StartAbsolute
        } else {
            SheetReferenceType::Relative
        };
        CellRange::new(top_left, bottom_right, sheet_ref)
            .map(Expr::CellRange)
            .map_err(|err| ParsingError::parser(err.to_string()))
    }

    fn parse_range_tail(&mut self, start: usize, first: RangeOperand) -> Result<Expr, ParsingError> {
        if !matches!(self.peek_kind(), Some(TokenKind::RangeSeparator)) {
            return Ok(match first {
                RangeOperand::Token(cell) => {
                    let raw = self.raw_since(start);
                    self.refs.cell(&cell, &raw)
                }
                RangeOperand::Offset(expr) => expr,
            });
        }
        self.next_or_eof()?;

        let second = match self.next() {
            Some(BoundToken {
                kind: TokenKind::CellReference(cell),
                ..
            }) => RangeOperand::Token(cell),
            Some(BoundToken {
                kind: TokenKind::Offset,
                ..
            }) => RangeOperand::Offset(self.parse_offset()?),
            _ => return Err(ParsingError::parser("Expected a cell reference after `:`")),
        };
        let raw = self.raw_since(start);

        match (first, second) {
            (RangeOperand::Token(a), RangeOperand::Token(b)) => self.refs.cell_range(&a, &b, &raw),
            (a, b) => {
                let a = self.range_operand(a);
                let b = self.range_operand(b);
                self.offset_range(a, b, &raw)
            }
        }
    }

    fn range_operand(&self, operand: RangeOperand) -> Expr {
        match operand {
            RangeOperand::Token(cell) => {
                let image = cell_image(&cell);
                self.refs.cell(&cell, &image)
            }
            RangeOperand::Offset(expr) => expr,
        }
    }

    /// A range where at least one end is a statically resolved `OFFSET`.
    fn offset_range(&self, a: Expr, b: Expr, raw: &str) -> Result<Expr, ParsingError> {
        let (a, b) = match (a, b) {
            (Expr::CellReference(a), Expr::CellReference(b)) => (a, b),
            (Expr::CellRange(_), _) | (_, Expr::CellRange(_)) => {
                return Err(ParsingError::new(
                    ParsingErrorKind::RangeOffsetNotAllowed,
                    "An OFFSET that denotes a range cannot be the end of another range",
                ));
            }
            (Expr::ErrorWithRawInput { error, .. }, _) | (_, Expr::ErrorWithRawInput { error, .. }) => {
                return Ok(raw_error(raw, error));
            }
            _ => return Ok(Expr::Error(ErrorKind::Ref)),
        };
        let (b, sheet_ref) = match (a.sheet, b.sheet) {
            (None, Some(_)) => {
                return Err(ParsingError::parser(
                    "Only the start of a range may be qualified with a sheet on its own",
                ))
            }
            (None, None) => (b, SheetReferenceType::Relative),
            (Some(sheet), None) => (b.with_sheet(Some(sheet)), SheetReferenceType::StartAbsolute),
            (Some(x), Some(y)) if x == y => (b, SheetReferenceType::BothAbsolute),
            (Some(_), Some(_)) => return Ok(raw_error(raw, ErrorKind::Ref)),
        };
        self.refs.ordered_cell_range(a, b, sheet_ref)
    }

    /// Source text of the tokens consumed since `start`, without the first token's whitespace.
    fn raw_since(&self, start: usize) -> String {
        let mut raw = String::new();
        for (i, tok) in self.tokens[start..self.pos].iter().enumerate() {
            if i > 0 {
                if let Some(ws) = &tok.leading_ws {
                    raw.push_str(ws);
                }
            }
            raw.push_str(&tok.image);
        }
        raw
    }

    fn expect_rparen(&mut self) -> Result<BoundToken, ParsingError> {
        match self.next() {
            Some(tok) if matches!(tok.kind, TokenKind::RParen) => Ok(tok),
            Some(tok) => Err(unexpected(&tok.image)),
            None => Err(ParsingError::parser("Expected `)`")),
        }
    }

    fn peek(&self) -> Option<&BoundToken> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|tok| &tok.kind)
    }

    fn next(&mut self) -> Option<BoundToken> {
        let tok = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(tok)
    }

    fn next_or_eof(&mut self) -> Result<BoundToken, ParsingError> {
        self.next()
            .ok_or_else(|| ParsingError::parser("Unexpected end of formula"))
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Times => BinaryOp::Mul,
        TokenKind::Div => BinaryOp::Div,
        TokenKind::Pow => BinaryOp::Pow,
        TokenKind::Concat => BinaryOp::Concat,
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::Ne => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Ge => BinaryOp::Ge,
        _ => return None,
    })
}

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            (10, 11)
        }
        BinaryOp::Concat => (20, 21),
        BinaryOp::Add | BinaryOp::Sub => (30, 31),
        BinaryOp::Mul | BinaryOp::Div => (40, 41),
        BinaryOp::Pow => (50, 51),
    }
}

/// An integer literal, optionally preceded by unary signs.
fn static_integer(ast: &Ast) -> Option<i64> {
    match &ast.expr {
        Expr::Number(_) => {
            let value = ast.expr.number_value()?;
            (value.fract() == 0.0 && value.abs() < 1e15).then_some(value as i64)
        }
        Expr::Unary(unary) => {
            let value = static_integer(&unary.expr)?;
            Some(match unary.op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            })
        }
        _ => None,
    }
}

fn cell_image(cell: &CellToken) -> String {
    let mut out = String::new();
    if let Some(sheet) = &cell.sheet {
        out.push_str(&formula_address::quote_sheet_name(sheet));
        out.push('!');
    }
    if cell.col_abs {
        out.push('$');
    }
    out.push_str(&formula_address::column_label(cell.col as i32));
    if cell.row_abs {
        out.push('$');
    }
    out.push_str(&(u64::from(cell.row) + 1).to_string());
    out
}

fn static_offset_error(message: impl Into<String>) -> ParsingError {
    ParsingError::new(ParsingErrorKind::StaticOffsetError, message)
}

fn unexpected(image: &str) -> ParsingError {
    ParsingError::parser(format!("Unexpected token `{image}`"))
}
