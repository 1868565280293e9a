use std::collections::HashMap;

use crate::population::PopulationTables;

/// Masked value for any geography that fails the population floor.
pub const MASKED: &str = "000";

/// Generalizes raw geography into population-safe values: ZIPs to 3-digit
/// prefixes whose summed population clears the threshold, county FIPS to
/// 5-digit codes of sufficiently large counties.
pub struct GeoGeneralizer {
    prefix_population: HashMap<String, u64>,
    county_population: HashMap<String, u64>,
    threshold: u64,
}

impl GeoGeneralizer {
    /// Precompute 3-digit-prefix population sums so per-row lookups are O(1).
    pub fn new(tables: &PopulationTables, threshold: u64) -> Self {
        let mut prefix_population: HashMap<String, u64> = HashMap::new();
        for (zip, pop) in &tables.zip {
            if zip.len() >= 3 {
                *prefix_population.entry(zip[..3].to_string()).or_default() += pop;
            }
        }
        GeoGeneralizer {
            prefix_population,
            county_population: tables.county.clone(),
            threshold,
        }
    }

    /// First 3 characters of the ZIP, or `"000"` when the input is null,
    /// shorter than 3 characters, or the prefix's total population is below
    /// the threshold (unknown prefixes count as zero population).
    pub fn generalize_zip(&self, zip: Option<&str>) -> String {
        let Some(zip) = zip else {
            return MASKED.to_string();
        };
        let prefix: String = zip.trim().chars().take(3).collect();
        if prefix.chars().count() < 3 {
            return MASKED.to_string();
        }
        match self.prefix_population.get(&prefix) {
            Some(&pop) if pop >= self.threshold => prefix,
            _ => MASKED.to_string(),
        }
    }

    /// Normalize to a 5-character Texas FIPS, then mask only counties known
    /// to fall below the threshold. Codes absent from the county table pass
    /// through unchanged.
    pub fn generalize_fips(&self, fips: Option<&str>) -> String {
        let Some(fips) = fips else {
            return MASKED.to_string();
        };
        let normalized = normalize_fips(fips);
        match self.county_population.get(&normalized) {
            Some(&pop) if pop < self.threshold => MASKED.to_string(),
            _ => normalized,
        }
    }
}

/// County FIPS arrive as 5-digit codes, bare 1–3 digit county numbers, or
/// 4-digit codes with the state's leading digit lost. Rebuild the Texas
/// (state 48) form.
fn normalize_fips(raw: &str) -> String {
    let s = raw.trim();
    if s.len() <= 3 {
        format!("48{s:0>3}")
    } else if s.len() == 4 {
        format!("4{s}")
    } else {
        s.to_string()
    }
}
