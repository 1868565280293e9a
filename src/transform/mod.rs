//! Per-relation transforms and the pipeline that orchestrates them.

pub mod eligibility;
pub mod medical;
pub mod pipeline;
pub mod provider;

use std::collections::HashMap;

use apcd_schema::layout::GeoColumns;
use apcd_schema::row::Row;

use crate::context::DeidContext;

/// `DEID_MEMBER_ID` → `AGE_GROUP` side table, appended while eligibility
/// streams and read-only once medical begins. One compact entry per unique
/// member; first sighting wins.
#[derive(Default)]
pub struct AgeLookup {
    map: HashMap<String, Option<u8>>,
}

impl AgeLookup {
    pub fn new() -> Self {
        AgeLookup::default()
    }

    pub fn record(&mut self, member: String, group: Option<u8>) {
        self.map.entry(member).or_insert(group);
    }

    /// Outer `None` means the member was never seen in eligibility; inner
    /// `None` means they were seen but carried no usable date of birth.
    pub fn get(&self, member: &str) -> Option<Option<u8>> {
        self.map.get(member).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Operator-only original-ID → pseudonym maps, collected on request.
/// Never written into the de-identified output tables.
#[derive(Default)]
pub struct Crosswalks {
    pub members: HashMap<String, String>,
    pub subscribers: HashMap<String, String>,
    pub providers: HashMap<String, String>,
}

/// Generalize every ZIP and FIPS column in place. Null geography comes out
/// as `"000"`, same as geography that fails the population floor.
pub(crate) fn generalize_geography(ctx: &DeidContext, geo: &GeoColumns, row: &mut Row) {
    for col in &geo.zip {
        if let Some(slot) = row.get_mut(col.as_str()) {
            *slot = Some(ctx.geo.generalize_zip(nonblank(slot.as_deref())));
        }
    }
    for col in &geo.fips {
        if let Some(slot) = row.get_mut(col.as_str()) {
            *slot = Some(ctx.geo.generalize_fips(nonblank(slot.as_deref())));
        }
    }
}

/// Rewrite each date column through the given generalization; unparseable
/// values become null rather than aborting the row.
pub(crate) fn rewrite_dates(
    row: &mut Row,
    columns: &[&str],
    generalize: fn(Option<&str>) -> Option<String>,
) {
    for col in columns {
        if let Some(slot) = row.get_mut(*col) {
            *slot = generalize(nonblank(slot.as_deref()));
        }
    }
}

fn nonblank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
