use chrono::{Local, NaiveDate};

use crate::geo::GeoGeneralizer;
use crate::keys::SecretKeys;
use crate::population::PopulationTables;

/// Tuning knobs for a de-identification run.
#[derive(Debug, Clone)]
pub struct DeidConfig {
    /// K-anonymity threshold: codes seen fewer than K times are rare.
    pub rarity_k: u64,
    /// Minimum population for a ZIP prefix or county to survive.
    pub population_threshold: u64,
    /// Rows fetched, transformed, and inserted per chunk.
    pub chunk_size: usize,
    /// Age reference date; `None` means today.
    pub reference_date: Option<NaiveDate>,
    /// Use the coarse 5-bucket age table (codes 23..=27) instead of the
    /// general 22-bucket table. Off unless the operator opts in.
    pub hiv_drug_age_buckets: bool,
}

impl Default for DeidConfig {
    fn default() -> Self {
        DeidConfig {
            rarity_k: 10,
            population_threshold: 20_000,
            chunk_size: 10_000,
            reference_date: None,
            hiv_drug_age_buckets: false,
        }
    }
}

/// Everything the transformers share, built once and threaded by reference:
/// the secret keys, the geographic generalizer, the resolved reference
/// date, and the run configuration. Immutable for the pipeline's lifetime.
pub struct DeidContext {
    pub keys: SecretKeys,
    pub geo: GeoGeneralizer,
    pub config: DeidConfig,
    reference_date: NaiveDate,
}

impl DeidContext {
    pub fn new(keys: SecretKeys, populations: &PopulationTables, config: DeidConfig) -> Self {
        let reference_date = config
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        let geo = GeoGeneralizer::new(populations, config.population_threshold);
        DeidContext {
            keys,
            geo,
            config,
            reference_date,
        }
    }

    /// The date ages are computed against.
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }
}
