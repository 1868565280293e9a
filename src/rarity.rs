use std::collections::{HashMap, HashSet};

use apcd_schema::relations::medical;
use apcd_schema::row::{field, Row};

/// Streaming frequency counter for the rarity pre-pass. Feed it every
/// medical row, then `finish()` into the frozen index. Counts are over raw
/// code values: rarity must be judged before any rewrite can hide a code.
pub struct RarityCounter {
    k: u64,
    diagnosis_columns: Vec<String>,
    procedure_columns: Vec<String>,
    diagnosis: HashMap<String, u64>,
    procedure: HashMap<String, u64>,
    drug: HashMap<String, u64>,
}

impl RarityCounter {
    pub fn new(k: u64) -> Self {
        RarityCounter {
            k,
            diagnosis_columns: medical::diagnosis_columns(),
            procedure_columns: medical::procedure_columns(),
            diagnosis: HashMap::new(),
            procedure: HashMap::new(),
            drug: HashMap::new(),
        }
    }

    pub fn observe(&mut self, row: &Row) {
        for col in &self.diagnosis_columns {
            if let Some(code) = field(row, col) {
                *self.diagnosis.entry(code.to_string()).or_default() += 1;
            }
        }
        for col in &self.procedure_columns {
            if let Some(code) = field(row, col) {
                *self.procedure.entry(code.to_string()).or_default() += 1;
            }
        }
        if let Some(code) = field(row, medical::DRUG_CODE) {
            *self.drug.entry(code.to_string()).or_default() += 1;
        }
    }

    /// Freeze into the read-only rare sets: codes seen fewer than K times.
    pub fn finish(self) -> RarityIndex {
        fn rare(counts: HashMap<String, u64>, k: u64) -> HashSet<String> {
            counts
                .into_iter()
                .filter(|(_, n)| *n < k)
                .map(|(code, _)| code)
                .collect()
        }
        RarityIndex {
            rare_diagnosis: rare(self.diagnosis, self.k),
            rare_procedure: rare(self.procedure, self.k),
            rare_drug: rare(self.drug, self.k),
        }
    }
}

/// K-anonymity over coded vocabularies: the sets of diagnosis, procedure,
/// and drug codes occurring fewer than K times across the entire medical
/// relation. Built once, then consulted read-only.
pub struct RarityIndex {
    rare_diagnosis: HashSet<String>,
    rare_procedure: HashSet<String>,
    rare_drug: HashSet<String>,
}

impl RarityIndex {
    pub fn is_rare_dx(&self, code: &str) -> bool {
        self.rare_diagnosis.contains(code)
    }

    pub fn is_rare_cpt(&self, code: &str) -> bool {
        self.rare_procedure.contains(code)
    }

    pub fn is_rare_ndc(&self, code: &str) -> bool {
        self.rare_drug.contains(code)
    }

    /// (rare diagnoses, rare procedures, rare drugs), for the run summary.
    pub fn rare_counts(&self) -> (usize, usize, usize) {
        (
            self.rare_diagnosis.len(),
            self.rare_procedure.len(),
            self.rare_drug.len(),
        )
    }

    #[cfg(test)]
    pub fn from_sets(
        rare_diagnosis: &[&str],
        rare_procedure: &[&str],
        rare_drug: &[&str],
    ) -> Self {
        let to_set = |codes: &[&str]| codes.iter().map(|c| c.to_string()).collect();
        RarityIndex {
            rare_diagnosis: to_set(rare_diagnosis),
            rare_procedure: to_set(rare_procedure),
            rare_drug: to_set(rare_drug),
        }
    }
}
