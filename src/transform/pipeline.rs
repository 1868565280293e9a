use anyhow::{bail, Result};

use apcd_schema::deid;
use apcd_schema::layout::GeoColumns;
use apcd_schema::relations::{eligibility, medical, provider};

use super::{eligibility as elig_transform, medical as medical_transform, provider as provider_transform};
use super::{AgeLookup, Crosswalks};
use crate::context::DeidContext;
use crate::rarity::RarityCounter;
use crate::store::ClaimsDb;
use crate::transform::medical::CodeColumns;

/// Input and output table names for the three relations.
#[derive(Debug, Clone)]
pub struct TableNames {
    pub eligibility_in: String,
    pub provider_in: String,
    pub medical_in: String,
    pub eligibility_out: String,
    pub provider_out: String,
    pub medical_out: String,
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            eligibility_in: "eligibility".to_string(),
            provider_in: "provider".to_string(),
            medical_in: "medical".to_string(),
            eligibility_out: "eligibility_deid".to_string(),
            provider_out: "provider_deid".to_string(),
            medical_out: "medical_deid".to_string(),
        }
    }
}

/// Counts reported after a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub eligibility_rows: u64,
    pub provider_rows: u64,
    pub medical_rows: u64,
    pub masked_medical_rows: u64,
    pub rare_diagnoses: usize,
    pub rare_procedures: usize,
    pub rare_drugs: usize,
    pub age_lookup_members: usize,
}

/// Runs the three streaming passes in their required order: eligibility
/// first (it seeds the age lookup), then provider, then the medical
/// rarity pre-pass, then medical row emission.
pub struct Pipeline<'a> {
    ctx: &'a DeidContext,
    input: &'a ClaimsDb,
    output: &'a mut ClaimsDb,
    tables: TableNames,
    crosswalks: Option<Crosswalks>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        ctx: &'a DeidContext,
        input: &'a ClaimsDb,
        output: &'a mut ClaimsDb,
        tables: TableNames,
    ) -> Self {
        Pipeline {
            ctx,
            input,
            output,
            tables,
            crosswalks: None,
        }
    }

    /// Collect operator-only original-ID → pseudonym crosswalks during the
    /// run. They are returned alongside the summary, never stored.
    pub fn with_crosswalks(mut self) -> Self {
        self.crosswalks = Some(Crosswalks::default());
        self
    }

    pub fn run(self) -> Result<(RunSummary, Option<Crosswalks>)> {
        let Pipeline {
            ctx,
            input,
            output,
            tables,
            mut crosswalks,
        } = self;
        let chunk_size = ctx.config.chunk_size;
        let mut summary = RunSummary::default();

        for table in [&tables.eligibility_in, &tables.provider_in, &tables.medical_in] {
            if !input.table_exists(table)? {
                bail!("Input table '{table}' not found");
            }
        }

        // Eligibility: builds the age lookup the medical pass joins against.
        let mut ages = AgeLookup::new();
        {
            let input_columns = input.columns(&tables.eligibility_in)?;
            let geo = GeoColumns::resolve(&input_columns);
            let output_columns = eligibility_output_columns(&input_columns);
            output.create_output_table(&tables.eligibility_out, &output_columns)?;
            summary.eligibility_rows =
                input.for_each_chunk(&tables.eligibility_in, chunk_size, |mut chunk| {
                    for row in &mut chunk {
                        elig_transform::transform_row(
                            ctx,
                            &geo,
                            row,
                            &mut ages,
                            crosswalks.as_mut(),
                        );
                    }
                    output.insert_rows(&tables.eligibility_out, &output_columns, &chunk)
                })?;
        }
        summary.age_lookup_members = ages.len();

        // Provider directory.
        {
            let input_columns = input.columns(&tables.provider_in)?;
            let geo = GeoColumns::resolve(&input_columns);
            let output_columns = provider_output_columns(&input_columns);
            output.create_output_table(&tables.provider_out, &output_columns)?;
            summary.provider_rows =
                input.for_each_chunk(&tables.provider_in, chunk_size, |mut chunk| {
                    for row in &mut chunk {
                        provider_transform::transform_row(ctx, &geo, row, crosswalks.as_mut());
                    }
                    output.insert_rows(&tables.provider_out, &output_columns, &chunk)
                })?;
        }

        // Rarity pre-pass: the index must reflect the entire medical
        // relation before any row is emitted.
        let rarity = {
            let mut counter = RarityCounter::new(ctx.config.rarity_k);
            input.for_each_chunk(&tables.medical_in, chunk_size, |chunk| {
                for row in &chunk {
                    counter.observe(row);
                }
                Ok(())
            })?;
            counter.finish()
        };
        (
            summary.rare_diagnoses,
            summary.rare_procedures,
            summary.rare_drugs,
        ) = rarity.rare_counts();

        // Medical row emission.
        {
            let input_columns = input.columns(&tables.medical_in)?;
            let geo = GeoColumns::resolve(&input_columns);
            let code_columns = CodeColumns::new();
            let output_columns = medical_output_columns(&input_columns);
            output.create_output_table(&tables.medical_out, &output_columns)?;
            let mut masked = 0u64;
            summary.medical_rows =
                input.for_each_chunk(&tables.medical_in, chunk_size, |mut chunk| {
                    for row in &mut chunk {
                        if medical_transform::transform_row(
                            ctx,
                            &geo,
                            &code_columns,
                            &rarity,
                            &ages,
                            row,
                        ) {
                            masked += 1;
                        }
                    }
                    output.insert_rows(&tables.medical_out, &output_columns, &chunk)
                })?;
            summary.masked_medical_rows = masked;
        }

        Ok((summary, crosswalks))
    }
}

/// Output layout of the eligibility relation: surviving input columns in
/// order, then the derived columns. Must agree with what
/// `eligibility::transform_row` appends.
pub fn eligibility_output_columns(input_columns: &[String]) -> Vec<String> {
    let has = |name: &str| input_columns.iter().any(|c| c == name);
    let mut columns = survivors(input_columns, eligibility::DROPPED);
    if has(eligibility::MEMBER_ID) && has(eligibility::SUBMITTER_CODE) {
        columns.push(deid::DEID_MEMBER_ID.to_string());
    }
    if has(eligibility::SUBSCRIBER_ID) && has(eligibility::SUBMITTER_CODE) {
        columns.push(deid::DEID_SUBSCRIBER_ID.to_string());
    }
    if has(eligibility::DATE_OF_BIRTH) {
        columns.push(deid::AGE_GROUP.to_string());
    }
    if has(eligibility::START_YEAR_OF_SUBMISSION) {
        columns.push(deid::ELIGIBILITY_YEAR.to_string());
    }
    if has(eligibility::DEATH_DATE) {
        columns.push(deid::DECEASED_INDICATOR.to_string());
    }
    columns
}

pub fn provider_output_columns(input_columns: &[String]) -> Vec<String> {
    let has = |name: &str| input_columns.iter().any(|c| c == name);
    let mut columns = survivors(input_columns, provider::DROPPED);
    if has(provider::NPI) || has(provider::PAYOR_ASSIGNED_ID) {
        columns.push(deid::DEID_PROVIDER_ID.to_string());
    }
    columns
}

pub fn medical_output_columns(input_columns: &[String]) -> Vec<String> {
    let has = |name: &str| input_columns.iter().any(|c| c == name);
    let mut columns = survivors(input_columns, medical::DROPPED);
    if has(medical::CLAIM_CONTROL_NUMBER) {
        columns.push(deid::DEID_CLAIM_ID.to_string());
    }
    if has(medical::MEMBER_ID) {
        columns.push(deid::DEID_MEMBER_ID.to_string());
    }
    if has(medical::SUBSCRIBER_ID) {
        columns.push(deid::DEID_SUBSCRIBER_ID.to_string());
    }
    for &(npi_col, deid_col) in medical::PROVIDER_ROLES {
        if has(npi_col) {
            columns.push(deid_col.to_string());
        }
    }
    columns.push(deid::AGE_GROUP.to_string());
    columns
}

fn survivors(input_columns: &[String], dropped: &[&str]) -> Vec<String> {
    input_columns
        .iter()
        .filter(|c| !dropped.contains(&c.as_str()))
        .cloned()
        .collect()
}
