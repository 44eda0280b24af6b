use formula_address::SheetId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParsingErrorKind {
    LexingError,
    ParserError,
    StaticOffsetError,
    StaticOffsetOutOfRangeError,
    RangeOffsetNotAllowed,
}

/// A diagnostic produced while lexing or parsing a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ParsingError {
    pub kind: ParsingErrorKind,
    pub message: String,
}

impl ParsingError {
    #[must_use]
    pub fn new(kind: ParsingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn lexing(message: impl Into<String>) -> Self {
        Self::new(ParsingErrorKind::LexingError, message)
    }

    pub(crate) fn parser(message: impl Into<String>) -> Self {
        Self::new(ParsingErrorKind::ParserError, message)
    }
}

/// Contract violations raised by structural transformers.
///
/// Expected consequences of an edit (a reference that no longer exists) are never reported
/// here; they become `#REF!` nodes in the rewritten AST.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("moving {source_width}x{source_height} cells by ({to_right}, {to_bottom}) leaves the sheet")]
    InvalidMoveTarget {
        source_width: i32,
        source_height: i32,
        to_right: i32,
        to_bottom: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnparseError {
    #[error("there is no sheet with id {0}")]
    NoSheetWithId(SheetId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{first}` cannot be used as both the {first_role} and the {second_role}")]
    SeparatorCollision {
        first: char,
        first_role: &'static str,
        second_role: &'static str,
    },
    #[error("sheet limits must be positive (rows: {max_rows}, columns: {max_columns})")]
    EmptySheetLimits { max_rows: u32, max_columns: u32 },
    #[error("error literal `{0}` must start with `#`")]
    InvalidErrorLiteral(String),
}
