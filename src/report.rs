//! Post-run validation: confirm the output relations carry no direct
//! identifiers, that the pseudonym columns exist and are populated, and
//! summarize cross-relation linkage and age-group coverage.

use std::fmt;

use anyhow::Result;

use apcd_schema::deid;
use apcd_schema::relations::{eligibility, medical, provider};

use crate::store::ClaimsDb;
use crate::transform::pipeline::TableNames;

#[derive(Debug, Default)]
pub struct LinkageStats {
    pub eligibility_members: u64,
    pub medical_members: u64,
    pub shared_members: u64,
    pub eligibility_subscribers: u64,
    pub medical_subscribers: u64,
    pub shared_subscribers: u64,
    pub directory_providers: u64,
    pub claim_providers: u64,
    pub shared_providers: u64,
}

#[derive(Debug, Default)]
pub struct AgeGroupQuality {
    pub relation: String,
    pub rows: u64,
    pub null_age_groups: u64,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<String>,
    pub linkage: LinkageStats,
    pub age_quality: Vec<AgeGroupQuality>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Inspect the de-identified output tables.
    pub fn collect(db: &ClaimsDb, tables: &TableNames) -> Result<Self> {
        let mut report = ValidationReport::default();

        let relations: [(&str, &[&str], &[&str]); 3] = [
            (
                tables.eligibility_out.as_str(),
                eligibility::DROPPED,
                &[deid::DEID_MEMBER_ID, deid::DEID_SUBSCRIBER_ID],
            ),
            (
                tables.provider_out.as_str(),
                provider::DROPPED,
                &[deid::DEID_PROVIDER_ID],
            ),
            (
                tables.medical_out.as_str(),
                medical::DROPPED,
                &[deid::DEID_CLAIM_ID, deid::DEID_MEMBER_ID],
            ),
        ];

        for (table, dropped, required_ids) in relations {
            let columns = db.columns(table)?;
            let rows = db.row_count(table)?;

            for pii in dropped {
                if columns.iter().any(|c| c == pii) {
                    report
                        .issues
                        .push(format!("Identifier column '{pii}' still present in {table}"));
                }
            }

            for id_col in required_ids {
                if !columns.iter().any(|c| c == id_col) {
                    report
                        .issues
                        .push(format!("Pseudonym column '{id_col}' missing from {table}"));
                } else if rows > 0 && db.count_nonnull(table, id_col)? == 0 {
                    report
                        .issues
                        .push(format!("Pseudonym column '{id_col}' is all null in {table}"));
                }
            }

            if columns.iter().any(|c| c == deid::AGE_GROUP) {
                let nulls = rows - db.count_nonnull(table, deid::AGE_GROUP)?;
                if rows > 0 && nulls == rows {
                    report
                        .issues
                        .push(format!("All AGE_GROUP values are null in {table}"));
                }
                report.age_quality.push(AgeGroupQuality {
                    relation: table.to_string(),
                    rows,
                    null_age_groups: nulls,
                });
            }
        }

        report.linkage = collect_linkage(db, tables)?;
        Ok(report)
    }
}

fn collect_linkage(db: &ClaimsDb, tables: &TableNames) -> Result<LinkageStats> {
    let mut stats = LinkageStats::default();
    let elig = tables.eligibility_out.as_str();
    let med = tables.medical_out.as_str();
    let prov = tables.provider_out.as_str();

    let has = |table: &str, col: &str| -> Result<bool> {
        Ok(db.columns(table)?.iter().any(|c| c == col))
    };

    if has(elig, deid::DEID_MEMBER_ID)? && has(med, deid::DEID_MEMBER_ID)? {
        stats.eligibility_members = db.count_distinct(elig, deid::DEID_MEMBER_ID)?;
        stats.medical_members = db.count_distinct(med, deid::DEID_MEMBER_ID)?;
        stats.shared_members =
            db.count_shared(elig, deid::DEID_MEMBER_ID, med, deid::DEID_MEMBER_ID)?;
    }

    if has(elig, deid::DEID_SUBSCRIBER_ID)? && has(med, deid::DEID_SUBSCRIBER_ID)? {
        stats.eligibility_subscribers = db.count_distinct(elig, deid::DEID_SUBSCRIBER_ID)?;
        stats.medical_subscribers = db.count_distinct(med, deid::DEID_SUBSCRIBER_ID)?;
        stats.shared_subscribers =
            db.count_shared(elig, deid::DEID_SUBSCRIBER_ID, med, deid::DEID_SUBSCRIBER_ID)?;
    }

    if has(prov, deid::DEID_PROVIDER_ID)? {
        stats.directory_providers = db.count_distinct(prov, deid::DEID_PROVIDER_ID)?;
        let medical_columns = db.columns(med)?;
        let role_columns: Vec<String> = medical::PROVIDER_ROLES
            .iter()
            .map(|&(_, deid_col)| deid_col.to_string())
            .filter(|c| medical_columns.contains(c))
            .collect();
        stats.claim_providers = db.count_distinct_union(med, &role_columns)?;
        stats.shared_providers =
            db.count_shared_with_union(prov, deid::DEID_PROVIDER_ID, med, &role_columns)?;
    }

    Ok(stats)
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VALIDATION REPORT")?;
        writeln!(f, "{}", "-".repeat(40))?;

        writeln!(f, "Cross-relation linkage:")?;
        writeln!(
            f,
            "  members: {} eligibility / {} medical / {} shared",
            self.linkage.eligibility_members,
            self.linkage.medical_members,
            self.linkage.shared_members
        )?;
        writeln!(
            f,
            "  subscribers: {} eligibility / {} medical / {} shared",
            self.linkage.eligibility_subscribers,
            self.linkage.medical_subscribers,
            self.linkage.shared_subscribers
        )?;
        writeln!(
            f,
            "  providers: {} directory / {} referenced in claims / {} shared",
            self.linkage.directory_providers,
            self.linkage.claim_providers,
            self.linkage.shared_providers
        )?;

        for quality in &self.age_quality {
            let pct = if quality.rows > 0 {
                quality.null_age_groups as f64 / quality.rows as f64 * 100.0
            } else {
                0.0
            };
            writeln!(
                f,
                "  {}: null AGE_GROUP {} of {} ({pct:.1}%)",
                quality.relation, quality.null_age_groups, quality.rows
            )?;
        }

        if self.issues.is_empty() {
            writeln!(f, "All validation checks passed")?;
        } else {
            writeln!(f, "Validation issues:")?;
            for issue in &self.issues {
                writeln!(f, "  - {issue}")?;
            }
        }
        Ok(())
    }
}
