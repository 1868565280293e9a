//! CSV materialization of the de-identified relations, plus the
//! operator-only crosswalk files. Crosswalks map original identifiers to
//! pseudonyms and must never travel with the de-identified payload.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::store::ClaimsDb;
use crate::transform::Crosswalks;

/// Write one output table as `<dir>/<table>.csv`, streaming chunk by
/// chunk. Nulls become empty cells. Returns the row count written.
pub fn export_table(
    db: &ClaimsDb,
    table: &str,
    dir: &Path,
    chunk_size: usize,
) -> Result<u64> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {:?}", dir))?;
    let path = dir.join(format!("{table}.csv"));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    let columns = db.columns(table)?;
    writer.write_record(&columns)?;

    let rows = db.for_each_chunk(table, chunk_size, |chunk| {
        for row in &chunk {
            let record: Vec<&str> = columns
                .iter()
                .map(|c| row.get(c).and_then(|v| v.as_deref()).unwrap_or(""))
                .collect();
            writer.write_record(&record)?;
        }
        Ok(())
    })?;

    writer
        .flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;
    Ok(rows)
}

/// Write the member, subscriber, and provider crosswalks into `dir`.
/// Rows are sorted by original identifier so reruns diff cleanly.
pub fn export_crosswalks(crosswalks: &Crosswalks, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create crosswalk directory {:?}", dir))?;

    let sets: [(&str, &str, &std::collections::HashMap<String, String>); 3] = [
        ("member_crosswalk.csv", "DEID_MEMBER_ID", &crosswalks.members),
        (
            "subscriber_crosswalk.csv",
            "DEID_SUBSCRIBER_ID",
            &crosswalks.subscribers,
        ),
        (
            "provider_crosswalk.csv",
            "DEID_PROVIDER_ID",
            &crosswalks.providers,
        ),
    ];

    let mut written = Vec::new();
    for (file_name, deid_header, map) in sets {
        let path = dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        writer.write_record(["original_id", deid_header])?;

        let mut pairs: Vec<(&String, &String)> = map.iter().collect();
        pairs.sort();
        for (original, pseudo) in pairs {
            writer.write_record([original.as_str(), pseudo.as_str()])?;
        }
        writer.flush()?;
        written.push(path);
    }
    Ok(written)
}
