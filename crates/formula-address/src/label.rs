/// Render a 0-indexed column as its A1 label (`0 -> "A"`, `27 -> "AB"`).
///
/// Negative columns have no label and render as an empty string.
pub fn column_label(col: i32) -> String {
    if col < 0 {
        return String::new();
    }
    // A1 labels are bijective base-26 over 1-based column numbers.
    let mut n = col as u32 + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Parse an A1 column label (case-insensitive) into a 0-indexed column.
///
/// Returns `None` for empty input, non-letters, or labels that overflow `i32`.
pub fn column_index(label: &str) -> Option<i32> {
    if label.is_empty() {
        return None;
    }
    let mut col: i32 = 0;
    for b in label.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let v = i32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(v)?;
    }
    Some(col - 1)
}

/// Returns true if `name` must be wrapped in single quotes to be read back as a sheet prefix.
pub fn sheet_name_needs_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if !(first == '_' || first.is_alphabetic()) {
        return true;
    }
    if !chars.all(|c| c == '_' || c == '.' || c.is_alphanumeric()) {
        return true;
    }
    starts_like_a1_cell_ref(name)
}

/// Render `name` as a sheet prefix body, quoting (and doubling embedded quotes) when needed.
pub fn quote_sheet_name(name: &str) -> String {
    if !sheet_name_needs_quotes(name) {
        return name.to_string();
    }
    let escaped = name.replace('\'', "''");
    format!("'{escaped}'")
}

// `AB12Sheet` would be read as the cell `AB12` followed by garbage.
fn starts_like_a1_cell_ref(s: &str) -> bool {
    let bytes = s.as_bytes();
    let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    if letters == 0 || letters > 3 {
        return false;
    }
    let digits = bytes[letters..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return false;
    }
    column_index(&s[..letters]).is_some_and(|col| (col as u32) < crate::MAX_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_labels_roundtrip() {
        for (col, label) in [(0, "A"), (25, "Z"), (26, "AA"), (27, "AB"), (54, "BC"), (16_383, "XFD")] {
            assert_eq!(column_label(col), label);
            assert_eq!(column_index(label), Some(col));
        }
        assert_eq!(column_index("bc"), Some(54));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_label(-1), "");
    }

    #[test]
    fn sheet_names_are_quoted_only_when_ambiguous() {
        assert_eq!(quote_sheet_name("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet_name("_data.v2"), "_data.v2");
        assert_eq!(quote_sheet_name("My Sheet"), "'My Sheet'");
        assert_eq!(quote_sheet_name("O'Brien"), "'O''Brien'");
        assert_eq!(quote_sheet_name("1st"), "'1st'");
        assert_eq!(quote_sheet_name("A1"), "'A1'");
        assert_eq!(quote_sheet_name("AB12x"), "'AB12x'");
        assert_eq!(quote_sheet_name(""), "''");
        assert!(!sheet_name_needs_quotes("ABCD1"));
    }
}
