//! Naming collaborators: sheet name <-> id resolution and named-expression display names.

use ahash::AHashMap;
use formula_address::SheetId;
use unicode_normalization::UnicodeNormalization;

/// Resolves sheet names written in formulas to ids and back.
pub trait SheetResolver {
    /// Case-insensitive lookup of a sheet by name.
    fn sheet_id(&self, name: &str) -> Option<SheetId>;

    /// Display name of a sheet, or `None` if no sheet has this id.
    fn sheet_name(&self, id: SheetId) -> Option<&str>;
}

/// Resolves a named expression to the display name visible from a sheet.
pub trait NamedExpressions {
    /// Display name of `name` as seen from `sheet`: a sheet-scoped expression shadows a
    /// workbook-scoped one. `None` when no such expression exists.
    fn nearest_display_name(&self, name: &str, sheet: SheetId) -> Option<String>;
}

/// A workbook without named expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNamedExpressions;

impl NamedExpressions for NoNamedExpressions {
    fn nearest_display_name(&self, _name: &str, _sheet: SheetId) -> Option<String> {
        None
    }
}

/// A simple in-memory sheet registry. Ids are assigned in insertion order and never reused.
#[derive(Debug, Clone, Default)]
pub struct SheetMapping {
    names: Vec<Option<String>>,
    by_key: AHashMap<String, SheetId>,
}

impl SheetMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheets<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut mapping = Self::new();
        for name in names {
            mapping.add_sheet(name);
        }
        mapping
    }

    /// Register a sheet, returning its id. Re-adding an existing name returns the existing id.
    pub fn add_sheet(&mut self, name: &str) -> SheetId {
        let key = sheet_key(name);
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }
        let id = self.names.len() as SheetId;
        self.names.push(Some(name.to_string()));
        self.by_key.insert(key, id);
        id
    }

    pub fn remove_sheet(&mut self, id: SheetId) -> Option<String> {
        let name = self.names.get_mut(id as usize)?.take()?;
        self.by_key.remove(&sheet_key(&name));
        Some(name)
    }

    pub fn rename_sheet(&mut self, id: SheetId, new_name: &str) -> bool {
        let Some(Some(old)) = self.names.get(id as usize) else {
            return false;
        };
        let new_key = sheet_key(new_name);
        if self.by_key.get(&new_key).is_some_and(|other| *other != id) {
            return false;
        }
        self.by_key.remove(&sheet_key(old));
        self.by_key.insert(new_key, id);
        self.names[id as usize] = Some(new_name.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl SheetResolver for SheetMapping {
    fn sheet_id(&self, name: &str) -> Option<SheetId> {
        self.by_key.get(&sheet_key(name)).copied()
    }

    fn sheet_name(&self, id: SheetId) -> Option<&str> {
        self.names.get(id as usize)?.as_deref()
    }
}

/// Sheet names compare equal under NFKC normalization and Unicode upper-casing.
fn sheet_key(name: &str) -> String {
    name.nfkc().flat_map(char::to_uppercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_lookup_is_case_insensitive() {
        let sheets = SheetMapping::with_sheets(["Sheet1", "Über"]);
        assert_eq!(sheets.sheet_id("SHEET1"), Some(0));
        assert_eq!(sheets.sheet_id("über"), Some(1));
        assert_eq!(sheets.sheet_name(1), Some("Über"));
        assert_eq!(sheets.sheet_id("Sheet3"), None);
    }

    #[test]
    fn sheet_lookup_folds_compatibility_forms() {
        let sheets = SheetMapping::with_sheets(["Ｄａｔａ"]);
        assert_eq!(sheets.sheet_id("data"), Some(0));
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut sheets = SheetMapping::with_sheets(["A", "B"]);
        assert_eq!(sheets.remove_sheet(0).as_deref(), Some("A"));
        assert_eq!(sheets.sheet_name(0), None);
        assert_eq!(sheets.add_sheet("C"), 2);
        assert_eq!(sheets.len(), 2);
    }

    #[test]
    fn rename_refuses_collisions() {
        let mut sheets = SheetMapping::with_sheets(["A", "B"]);
        assert!(!sheets.rename_sheet(0, "b"));
        assert!(sheets.rename_sheet(0, "Alpha"));
        assert_eq!(sheets.sheet_id("alpha"), Some(0));
        assert_eq!(sheets.sheet_id("A"), None);
    }
}
