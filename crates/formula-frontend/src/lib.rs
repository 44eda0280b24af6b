//! `formula-frontend` turns spreadsheet formula text into reusable syntax trees and keeps those
//! trees valid while the workbook's structure changes.
//!
//! The pipeline is:
//! - [`lexer::tokenize`] and [`parser::FormulaParser`] build an [`Ast`] whose references are
//!   stored relative to the formula's own cell,
//! - [`cache::ParserWithCaching`] shares one tree between every formula with the same shape,
//! - [`transform`] rewrites addresses for row/column insertion and removal, moves and sheet
//!   removal without re-parsing,
//! - [`unparser::Unparser`] renders a tree back to text for any target cell.
//!
//! [`column_index::ColumnIndex`] is an exact-match lookup index that replays the same
//! structural edits lazily.

pub mod ast;
pub mod cache;
pub mod column_index;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod graph;
pub mod lexer;
pub mod naming;
pub mod parser;
pub mod transform;
pub mod unparser;
pub mod value;

pub use ast::{Ast, BinaryOp, Expr, PostfixOp, UnaryOp};
pub use cache::{CacheEntry, FormulaCache, ParsedFormula, ParserWithCaching};
pub use column_index::{ColumnIndex, LookupKey, SearchOptions};
pub use config::{Collation, ParserConfig, WhitespaceMode};
pub use dependencies::{collect_dependencies, RelativeDependency};
pub use error::{ConfigError, ParsingError, ParsingErrorKind, TransformError, UnparseError};
pub use naming::{NamedExpressions, NoNamedExpressions, SheetMapping, SheetResolver};
pub use parser::{FormulaParser, ParseOutput};
pub use transform::{FormulaTransformer, Transformation, TransformationHistory, TransformationLog};
pub use unparser::Unparser;
pub use value::{CellError, ErrorKind, Value};

pub use formula_address as address;
