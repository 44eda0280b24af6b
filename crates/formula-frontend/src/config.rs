//! Parser and index configuration.
//!
//! Loading these structs from files is the host's business; they are plain serde types.

use std::collections::{BTreeMap, BTreeSet};

use formula_address::{MAX_COLUMNS, MAX_ROWS};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ErrorKind};

/// Which characters the lexer treats as insignificant whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhitespaceMode {
    /// Space, tab, carriage return and line feed.
    #[default]
    Standard,
    /// Every Unicode whitespace character (including NBSP).
    Any,
}

impl WhitespaceMode {
    #[inline]
    pub fn matches(self, c: char) -> bool {
        match self {
            WhitespaceMode::Standard => matches!(c, ' ' | '\t' | '\r' | '\n'),
            WhitespaceMode::Any => c.is_whitespace(),
        }
    }
}

/// Locale-specific configuration for tokenization, parsing and unparsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub decimal_separator: char,
    pub function_arg_separator: char,
    pub array_column_separator: char,
    pub array_row_separator: char,
    pub max_rows: u32,
    pub max_columns: u32,
    pub whitespace: WhitespaceMode,
    /// Localized upper-case function name -> canonical name (e.g. `SUMME` -> `SUM`).
    ///
    /// Names missing from the table are their own canonical form.
    pub function_translations: BTreeMap<String, String>,
    /// Localized error literal (upper-case) -> error kind.
    pub error_translations: BTreeMap<String, ErrorKind>,
    /// Canonical names of functions that must be recomputed on every pass.
    pub volatile_functions: BTreeSet<String>,
    /// Canonical names of functions whose result depends on the sheet's shape.
    pub structural_change_functions: BTreeSet<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::en_us()
    }
}

impl ParserConfig {
    #[must_use]
    pub fn en_us() -> Self {
        Self {
            decimal_separator: '.',
            function_arg_separator: ',',
            array_column_separator: ',',
            array_row_separator: ';',
            max_rows: MAX_ROWS,
            max_columns: MAX_COLUMNS,
            whitespace: WhitespaceMode::Standard,
            function_translations: BTreeMap::new(),
            error_translations: ErrorKind::ALL
                .iter()
                .map(|kind| (kind.as_code().to_string(), *kind))
                .collect(),
            volatile_functions: names(&["RAND", "RANDBETWEEN", "RANDARRAY", "NOW", "TODAY", "INDIRECT"]),
            structural_change_functions: names(&[
                "ROW",
                "ROWS",
                "COLUMN",
                "COLUMNS",
                "FORMULATEXT",
                "SHEET",
                "SHEETS",
                "CELL",
            ]),
        }
    }

    #[must_use]
    pub fn de_de() -> Self {
        let function_translations = [
            ("SUMME", "SUM"),
            ("MITTELWERT", "AVERAGE"),
            ("WENN", "IF"),
            ("ANZAHL", "COUNT"),
            ("ZEILE", "ROW"),
            ("ZEILEN", "ROWS"),
            ("SPALTE", "COLUMN"),
            ("SPALTEN", "COLUMNS"),
            ("BEREICH.VERSCHIEBEN", "OFFSET"),
            ("INDIREKT", "INDIRECT"),
            ("JETZT", "NOW"),
            ("HEUTE", "TODAY"),
            ("ZUFALLSZAHL", "RAND"),
            ("ZUFALLSBEREICH", "RANDBETWEEN"),
            ("SVERWEIS", "VLOOKUP"),
            ("VERGLEICH", "MATCH"),
        ]
        .into_iter()
        .map(|(local, canonical)| (local.to_string(), canonical.to_string()))
        .collect();
        let error_translations = [
            ("#DIV/0!", ErrorKind::Div0),
            ("#NAME?", ErrorKind::Name),
            ("#WERT!", ErrorKind::Value),
            ("#ZAHL!", ErrorKind::Num),
            ("#NV", ErrorKind::NA),
            ("#ZYKLUS!", ErrorKind::Cycle),
            ("#BEZUG!", ErrorKind::Ref),
            ("#ÜBERLAUF!", ErrorKind::Spill),
            ("#LIC!", ErrorKind::Lic),
            ("#FEHLER!", ErrorKind::Error),
        ]
        .into_iter()
        .map(|(local, kind)| (local.to_string(), kind))
        .collect();
        Self {
            decimal_separator: ',',
            function_arg_separator: ';',
            array_column_separator: '\\',
            array_row_separator: ';',
            function_translations,
            error_translations,
            ..Self::en_us()
        }
    }

    /// Check separator collisions and limits. Lexer and parser assume a validated config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pairs = [
            (self.decimal_separator, "decimal separator", self.function_arg_separator, "argument separator"),
            (self.decimal_separator, "decimal separator", self.array_column_separator, "array column separator"),
            (self.decimal_separator, "decimal separator", self.array_row_separator, "array row separator"),
            (self.array_column_separator, "array column separator", self.array_row_separator, "array row separator"),
        ];
        for (first, first_role, second, second_role) in pairs {
            if first == second {
                return Err(ConfigError::SeparatorCollision {
                    first,
                    first_role,
                    second_role,
                });
            }
        }
        if self.max_rows == 0 || self.max_columns == 0 {
            return Err(ConfigError::EmptySheetLimits {
                max_rows: self.max_rows,
                max_columns: self.max_columns,
            });
        }
        if let Some(bad) = self.error_translations.keys().find(|k| !k.starts_with('#')) {
            return Err(ConfigError::InvalidErrorLiteral(bad.clone()));
        }
        Ok(())
    }

    /// Canonical (non-localized) upper-case name for a function as written.
    pub fn canonical_function_name(&self, name: &str) -> String {
        let upper = name.to_uppercase();
        match self.function_translations.get(&upper) {
            Some(canonical) => canonical.clone(),
            None => upper,
        }
    }

    /// Localized display name for a canonical function name.
    pub fn localized_function_name<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.function_translations
            .iter()
            .find_map(|(local, c)| (c == canonical).then_some(local.as_str()))
            .unwrap_or(canonical)
    }

    pub fn error_kind(&self, literal: &str) -> Option<ErrorKind> {
        self.error_translations.get(&literal.to_uppercase()).copied()
    }

    /// Localized display text of an error kind.
    pub fn error_literal(&self, kind: ErrorKind) -> &str {
        self.error_translations
            .iter()
            .find_map(|(literal, k)| (*k == kind).then_some(literal.as_str()))
            .unwrap_or(kind.as_code())
    }

    pub fn is_volatile(&self, canonical: &str) -> bool {
        self.volatile_functions.contains(canonical)
    }

    pub fn is_structural_change(&self, canonical: &str) -> bool {
        self.structural_change_functions.contains(canonical)
    }
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// String comparison rules for the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Collation {
    pub case_sensitive: bool,
    pub accent_sensitive: bool,
}
