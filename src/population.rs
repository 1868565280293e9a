use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Census population lookups backing the geographic generalizer.
///
/// `zip` maps 5-digit ZIP codes to population, `county` maps 5-digit county
/// FIPS codes to population.
pub struct PopulationTables {
    pub zip: HashMap<String, u64>,
    pub county: HashMap<String, u64>,
}

#[derive(Deserialize)]
struct ZipRecord {
    zip_code: String,
    population: u64,
}

#[derive(Deserialize)]
struct CountyRecord {
    county_fips: String,
    population: u64,
}

impl PopulationTables {
    /// Load both tables from CSV files (`zip_code,population` and
    /// `county_fips,population`). Missing or malformed files are fatal:
    /// generalizing against an empty table would mask every geography.
    pub fn load(zip_csv: &Path, county_csv: &Path) -> Result<Self> {
        Ok(PopulationTables {
            zip: load_zip_csv(zip_csv)?,
            county: load_county_csv(county_csv)?,
        })
    }

    /// Built-in tables for tests and dry runs only; production runs load
    /// real census data. Covers the Dallas/Houston metro prefixes with
    /// populous ZIPs, the 790..793 panhandle prefixes with sparse ones, and
    /// a handful of real county codes on both sides of the threshold.
    pub fn synthetic() -> Self {
        let mut zip = HashMap::new();
        for prefix in 750..=778 {
            for suffix in 0..20 {
                zip.insert(format!("{prefix}{suffix:02}"), 30_000);
            }
        }
        for prefix in 790..=793 {
            for suffix in 0..10 {
                zip.insert(format!("{prefix}{suffix:02}"), 1_200);
            }
        }

        let county = HashMap::from([
            ("48201".to_string(), 1_716_239), // Harris
            ("48029".to_string(), 2_688_247), // Bexar
            ("48113".to_string(), 1_395_269), // Dallas
            ("48439".to_string(), 944_279),   // Tarrant
            ("48453".to_string(), 1_290_446), // Travis
            ("48085".to_string(), 394_453),   // Collin
            ("48121".to_string(), 485_445),   // Denton
            ("48157".to_string(), 620_961),   // Fort Bend
            ("48215".to_string(), 354_452),   // Hidalgo
            ("48339".to_string(), 432_022),   // Montgomery
            ("48011".to_string(), 1_904),     // Armstrong
            ("48033".to_string(), 8_466),     // Borden
            ("48045".to_string(), 3_353),     // Briscoe
        ]);

        PopulationTables { zip, county }
    }
}

fn load_zip_csv(path: &Path) -> Result<HashMap<String, u64>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open ZIP population file {:?}", path))?;
    let mut table = HashMap::new();
    for record in reader.deserialize() {
        let record: ZipRecord = record
            .with_context(|| format!("Malformed row in ZIP population file {:?}", path))?;
        // Left-pad: New England ZIPs lose their leading zero in numeric CSVs.
        table.insert(format!("{:0>5}", record.zip_code.trim()), record.population);
    }
    Ok(table)
}

fn load_county_csv(path: &Path) -> Result<HashMap<String, u64>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open county population file {:?}", path))?;
    let mut table = HashMap::new();
    for record in reader.deserialize() {
        let record: CountyRecord = record
            .with_context(|| format!("Malformed row in county population file {:?}", path))?;
        table.insert(format!("{:0>5}", record.county_fips.trim()), record.population);
    }
    Ok(table)
}
