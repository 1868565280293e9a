use apcd_schema::deid;
use apcd_schema::layout::GeoColumns;
use apcd_schema::relations::medical as schema;
use apcd_schema::row::{drop_columns, field, has_column, Row};

use super::{generalize_geography, rewrite_dates, AgeLookup};
use crate::context::DeidContext;
use crate::rarity::RarityIndex;
use crate::{age, dates, mask, pseudonym};

/// Code columns of the medical relation, resolved once per run so the
/// per-row loop never rebuilds the column-name lists.
pub struct CodeColumns {
    pub diagnosis: Vec<String>,
    pub procedure: Vec<String>,
}

impl CodeColumns {
    pub fn new() -> Self {
        CodeColumns {
            diagnosis: schema::diagnosis_columns(),
            procedure: schema::procedure_columns(),
        }
    }
}

impl Default for CodeColumns {
    fn default() -> Self {
        CodeColumns::new()
    }
}

/// De-identify one medical claim row in place. Returns true when the row's
/// demographics were suppressed.
///
/// The mask decision and the diagnosis rewrites read raw codes first; only
/// then is geography generalized and, for flagged rows, forced to `"000"`
/// with `member_sex` nulled. The age group joins from the eligibility
/// lookup through `DEID_MEMBER_ID`, falling back to the row's own date of
/// birth when the member never appeared in eligibility.
pub fn transform_row(
    ctx: &DeidContext,
    geo: &GeoColumns,
    code_columns: &CodeColumns,
    rarity: &RarityIndex,
    ages: &AgeLookup,
    row: &mut Row,
) -> bool {
    let masked = mask::apply_code_policy(row, &code_columns.diagnosis, &code_columns.procedure, rarity);

    generalize_geography(ctx, geo, row);
    if masked {
        mask::suppress_demographics(row, geo);
    }

    let submitter = field(row, schema::SUBMITTER_CODE).map(str::to_string);

    let add_claim = has_column(row, schema::CLAIM_CONTROL_NUMBER);
    let add_member = has_column(row, schema::MEMBER_ID);
    let add_subscriber = has_column(row, schema::SUBSCRIBER_ID);

    let deid_claim = pseudonym::pseudonymize_joined(
        &ctx.keys.claim,
        field(row, schema::CLAIM_CONTROL_NUMBER),
        &[
            field(row, schema::CROSS_REFERENCE_CLAIMS_ID),
            submitter.as_deref(),
        ],
    );
    let deid_member = pseudonym::pseudonymize_joined(
        &ctx.keys.member,
        field(row, schema::MEMBER_ID),
        &[submitter.as_deref()],
    );
    let deid_subscriber = pseudonym::pseudonymize_joined(
        &ctx.keys.member,
        field(row, schema::SUBSCRIBER_ID),
        &[submitter.as_deref()],
    );

    let role_pseudonyms: Vec<(&'static str, bool, Option<String>)> = schema::PROVIDER_ROLES
        .iter()
        .map(|&(npi_col, deid_col)| {
            let present = has_column(row, npi_col);
            let pseudo = field(row, npi_col)
                .and_then(|npi| pseudonym::pseudonymize(&ctx.keys.provider, npi));
            (deid_col, present, pseudo)
        })
        .collect();

    // Lookup hit wins even when it holds a null group; the fallback is for
    // members with claims but no eligibility record.
    let age_group = match deid_member.as_deref().and_then(|m| ages.get(m)) {
        Some(stored) => stored,
        None => field(row, schema::DATE_OF_BIRTH)
            .and_then(|dob| age::age_at(dob, ctx.reference_date()))
            .map(|a| age::age_group(a, ctx.config.hiv_drug_age_buckets)),
    };

    drop_columns(row, schema::DROPPED);
    rewrite_dates(row, schema::YEAR_QUARTER_DATES, dates::to_year_quarter);

    if add_claim {
        row.insert(deid::DEID_CLAIM_ID.to_string(), deid_claim);
    }
    if add_member {
        row.insert(deid::DEID_MEMBER_ID.to_string(), deid_member);
    }
    if add_subscriber {
        row.insert(deid::DEID_SUBSCRIBER_ID.to_string(), deid_subscriber);
    }
    for (deid_col, present, pseudo) in role_pseudonyms {
        if present {
            row.insert(deid_col.to_string(), pseudo);
        }
    }
    row.insert(
        deid::AGE_GROUP.to_string(),
        age_group.map(|g| g.to_string()),
    );

    masked
}
