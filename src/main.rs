use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use apcd_schema::layout::GeoColumns;
use chrono::NaiveDate;
use clap::Parser;

use texas_apcd_deid::context::{DeidConfig, DeidContext};
use texas_apcd_deid::export;
use texas_apcd_deid::keys::SecretKeys;
use texas_apcd_deid::population::PopulationTables;
use texas_apcd_deid::report::ValidationReport;
use texas_apcd_deid::store::ClaimsDb;
use texas_apcd_deid::transform::pipeline::{Pipeline, TableNames};

#[derive(Parser, Debug)]
#[command(name = "texas-apcd-deid")]
#[command(about = "De-identify TX-APCD eligibility, provider, and medical claims relations")]
struct Cli {
    /// Input SQLite database holding the three claims relations
    #[arg(long)]
    input: PathBuf,

    /// Output SQLite database for the de-identified relations
    #[arg(long)]
    output: PathBuf,

    /// Secret-key file (JSON with hex-encoded 256-bit keys)
    #[arg(long, default_value = "secure_keys/apcd_keys.json")]
    keys: PathBuf,

    /// Generate fresh keys and save them to the key file instead of loading.
    /// Pseudonyms will not link to output produced under other keys.
    #[arg(long)]
    generate_keys: bool,

    /// ZIP population CSV (`zip_code,population`)
    #[arg(long)]
    zip_population: Option<PathBuf>,

    /// County population CSV (`county_fips,population`)
    #[arg(long)]
    county_population: Option<PathBuf>,

    /// Use the built-in synthetic population tables. Testing only.
    #[arg(long)]
    synthetic_population: bool,

    /// K-anonymity threshold: codes seen fewer than K times are rare
    #[arg(long, default_value_t = 10)]
    rarity_k: u64,

    /// Minimum population for a ZIP prefix or county to survive
    #[arg(long, default_value_t = 20_000)]
    population_threshold: u64,

    /// Rows per streamed chunk
    #[arg(long, default_value_t = 10_000)]
    chunk_size: usize,

    /// Reference date for age calculation (YYYY-MM-DD); defaults to today
    #[arg(long)]
    reference_date: Option<NaiveDate>,

    /// Use the coarse HIV/substance-use age buckets (codes 23-27)
    #[arg(long)]
    hiv_drug_age_buckets: bool,

    /// Also write each de-identified relation as CSV into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Write operator-only original-ID crosswalk CSVs into this directory.
    /// Keep these with the secret keys, never with the de-identified data.
    #[arg(long)]
    crosswalk_dir: Option<PathBuf>,

    /// Input table name for the eligibility relation
    #[arg(long, default_value = "eligibility")]
    eligibility_table: String,

    /// Input table name for the provider relation
    #[arg(long, default_value = "provider")]
    provider_table: String,

    /// Input table name for the medical claims relation
    #[arg(long, default_value = "medical")]
    medical_table: String,
}

fn load_keys(cli: &Cli) -> Result<SecretKeys> {
    if cli.generate_keys {
        let keys = SecretKeys::generate();
        keys.save(&cli.keys)?;
        println!("Generated new secret keys: {:?}", cli.keys);
        Ok(keys)
    } else {
        let keys = SecretKeys::load(&cli.keys)
            .context("Failed to load secret keys (use --generate-keys for a first run)")?;
        println!("Loaded secret keys: {:?}", cli.keys);
        Ok(keys)
    }
}

fn load_populations(cli: &Cli) -> Result<PopulationTables> {
    if cli.synthetic_population {
        println!("Using built-in synthetic population tables (testing only)");
        return Ok(PopulationTables::synthetic());
    }
    match (&cli.zip_population, &cli.county_population) {
        (Some(zip), Some(county)) => PopulationTables::load(zip, county),
        _ => bail!(
            "Population tables required: pass --zip-population and --county-population, \
             or --synthetic-population for testing"
        ),
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }

    let keys = load_keys(&cli)?;
    let populations = load_populations(&cli)?;

    let config = DeidConfig {
        rarity_k: cli.rarity_k,
        population_threshold: cli.population_threshold,
        chunk_size: cli.chunk_size,
        reference_date: cli.reference_date,
        hiv_drug_age_buckets: cli.hiv_drug_age_buckets,
    };
    let ctx = DeidContext::new(keys, &populations, config);

    let input = ClaimsDb::open(&cli.input)?;
    let mut output = ClaimsDb::open(&cli.output)?;

    let tables = TableNames {
        eligibility_in: cli.eligibility_table.clone(),
        provider_in: cli.provider_table.clone(),
        medical_in: cli.medical_table.clone(),
        ..TableNames::default()
    };

    let mut pipeline = Pipeline::new(&ctx, &input, &mut output, tables.clone());
    if cli.crosswalk_dir.is_some() {
        pipeline = pipeline.with_crosswalks();
    }
    let (summary, crosswalks) = pipeline.run()?;

    println!();
    println!(
        "Eligibility: {} records ({} unique members in age lookup)",
        summary.eligibility_rows, summary.age_lookup_members
    );
    println!("Provider: {} records", summary.provider_rows);
    println!(
        "Medical: {} records, {} with masked demographics",
        summary.medical_rows, summary.masked_medical_rows
    );
    println!(
        "Rare codes (K={}): {} diagnoses, {} procedures, {} drugs",
        ctx.config.rarity_k,
        summary.rare_diagnoses,
        summary.rare_procedures,
        summary.rare_drugs
    );

    for table in [&tables.eligibility_out, &tables.medical_out] {
        let geo = GeoColumns::resolve(&output.columns(table)?);
        for col in &geo.zip {
            let masked = output.count_equal(table, col, "000")?;
            println!("  {table}.{col} masked: {masked}");
        }
    }

    if let Some(dir) = &cli.export_dir {
        for table in [
            &tables.eligibility_out,
            &tables.provider_out,
            &tables.medical_out,
        ] {
            let rows = export::export_table(&output, table, dir, ctx.config.chunk_size)?;
            println!(
                "Exported {rows} rows to {:?}",
                dir.join(format!("{table}.csv"))
            );
        }
    }

    if let (Some(dir), Some(crosswalks)) = (&cli.crosswalk_dir, &crosswalks) {
        let files = export::export_crosswalks(crosswalks, dir)?;
        println!("Wrote {} crosswalk files to {:?}", files.len(), dir);
    }

    println!();
    let report = ValidationReport::collect(&output, &tables)?;
    print!("{report}");

    if !report.is_valid() {
        bail!("De-identification completed with validation issues; output is not releasable");
    }
    Ok(())
}

fn main() -> Result<()> {
    run(Cli::parse())
}
