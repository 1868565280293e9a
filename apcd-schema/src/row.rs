use indexmap::IndexMap;

/// A single record: column name → nullable text value, in column order.
///
/// Every relation arrives as TEXT-typed columns; dates and codes are parsed
/// on demand by the engine. Insertion order is preserved so output tables
/// keep a stable column layout.
pub type Row = IndexMap<String, Option<String>>;

/// Non-null value of a column, or `None` when the column is absent, null,
/// or blank after trimming.
pub fn field<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    match row.get(column) {
        Some(Some(v)) if !v.trim().is_empty() => Some(v.as_str()),
        _ => None,
    }
}

/// True when the row carries the column, even if its value is null.
pub fn has_column(row: &Row, column: &str) -> bool {
    row.contains_key(column)
}

/// Overwrite a column in place. No-op when the column is absent, so
/// transforms tolerate partial schemas.
pub fn overwrite(row: &mut Row, column: &str, value: Option<String>) {
    if let Some(slot) = row.get_mut(column) {
        *slot = value;
    }
}

/// Remove a set of columns, preserving the order of the survivors.
pub fn drop_columns(row: &mut Row, columns: &[&str]) {
    for col in columns {
        row.shift_remove(*col);
    }
}
