use std::fmt;

use formula_address::SimpleCellAddress;
use serde::{Deserialize, Serialize};

/// The closed set of value-level errors a formula can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Div0,
    Name,
    Value,
    Num,
    NA,
    Cycle,
    Ref,
    Spill,
    Lic,
    Error,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 10] = [
        ErrorKind::Div0,
        ErrorKind::Name,
        ErrorKind::Value,
        ErrorKind::Num,
        ErrorKind::NA,
        ErrorKind::Cycle,
        ErrorKind::Ref,
        ErrorKind::Spill,
        ErrorKind::Lic,
        ErrorKind::Error,
    ];

    pub fn as_code(self) -> &'static str {
        match self {
            ErrorKind::Div0 => "#DIV/0!",
            ErrorKind::Name => "#NAME?",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Num => "#NUM!",
            ErrorKind::NA => "#N/A",
            ErrorKind::Cycle => "#CYCLE!",
            ErrorKind::Ref => "#REF!",
            ErrorKind::Spill => "#SPILL!",
            ErrorKind::Lic => "#LIC!",
            ErrorKind::Error => "#ERROR!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// An error value, optionally remembering the cell that first produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellError {
    pub kind: ErrorKind,
    pub message: Option<String>,
    root: Option<SimpleCellAddress>,
}

impl CellError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            root: None,
        }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            root: None,
        }
    }

    pub fn root(&self) -> Option<SimpleCellAddress> {
        self.root
    }

    /// Record the originating cell. Only the first call has an effect.
    pub fn attach_root(&mut self, address: SimpleCellAddress) {
        if self.root.is_none() {
            self.root = Some(address);
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} ({message})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A scalar cell value as seen by the column index.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Empty,
    Error(CellError),
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<ErrorKind> for Value {
    fn from(value: ErrorKind) -> Self {
        Value::Error(CellError::new(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Empty => f.write_str(""),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}
