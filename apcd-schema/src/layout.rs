//! Geographic column discovery, resolved once per relation.
//!
//! Input tables are `SELECT *` shaped: columns beyond the declared schema
//! pass through untouched unless their name marks them as geography. The
//! name rules run once against the table's column list, never per chunk.

/// ZIP and FIPS columns found in a concrete table.
#[derive(Debug, Clone, Default)]
pub struct GeoColumns {
    pub zip: Vec<String>,
    pub fips: Vec<String>,
}

impl GeoColumns {
    /// Classify a table's columns by name. A column is a ZIP when its
    /// lowercased name contains both `zip` and `code`, a FIPS when it
    /// contains `fips`.
    pub fn resolve(columns: &[String]) -> Self {
        let mut geo = GeoColumns::default();
        for col in columns {
            let lower = col.to_lowercase();
            if lower.contains("zip") && lower.contains("code") {
                geo.zip.push(col.clone());
            } else if lower.contains("fips") {
                geo.fips.push(col.clone());
            }
        }
        geo
    }
}
