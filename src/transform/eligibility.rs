use apcd_schema::deid;
use apcd_schema::layout::GeoColumns;
use apcd_schema::relations::eligibility as schema;
use apcd_schema::row::{drop_columns, field, has_column, Row};

use super::{generalize_geography, rewrite_dates, AgeLookup, Crosswalks};
use crate::context::DeidContext;
use crate::{age, dates, pseudonym};

/// De-identify one eligibility row in place and feed the age lookup.
///
/// Pseudonyms and the age group are computed from the raw identifiers, the
/// direct-identifier columns are dropped, geography and dates are
/// generalized, and the derived columns are appended. `start_year_of_submission`
/// and `death_date` leave as `eligibility_year` and `deceased_indicator`.
pub fn transform_row(
    ctx: &DeidContext,
    geo: &GeoColumns,
    row: &mut Row,
    ages: &mut AgeLookup,
    mut crosswalks: Option<&mut Crosswalks>,
) {
    let member_raw = field(row, schema::MEMBER_ID).map(str::to_string);
    let subscriber_raw = field(row, schema::SUBSCRIBER_ID).map(str::to_string);
    let submitter = field(row, schema::SUBMITTER_CODE).map(str::to_string);
    let dob = field(row, schema::DATE_OF_BIRTH).map(str::to_string);
    let submission_year = field(row, schema::START_YEAR_OF_SUBMISSION).map(str::to_string);
    let died = field(row, schema::DEATH_DATE).is_some();

    let add_member = has_column(row, schema::MEMBER_ID) && has_column(row, schema::SUBMITTER_CODE);
    let add_subscriber =
        has_column(row, schema::SUBSCRIBER_ID) && has_column(row, schema::SUBMITTER_CODE);
    let add_age_group = has_column(row, schema::DATE_OF_BIRTH);
    let add_eligibility_year = has_column(row, schema::START_YEAR_OF_SUBMISSION);
    let add_deceased = has_column(row, schema::DEATH_DATE);

    let deid_member = pseudonym::pseudonymize_joined(
        &ctx.keys.member,
        member_raw.as_deref(),
        &[submitter.as_deref()],
    );
    let deid_subscriber = pseudonym::pseudonymize_joined(
        &ctx.keys.member,
        subscriber_raw.as_deref(),
        &[submitter.as_deref()],
    );
    let age_group = dob
        .as_deref()
        .and_then(|d| age::age_at(d, ctx.reference_date()))
        .map(|a| age::age_group(a, ctx.config.hiv_drug_age_buckets));

    drop_columns(row, schema::DROPPED);
    generalize_geography(ctx, geo, row);
    rewrite_dates(row, schema::YEAR_ONLY_DATES, dates::to_year);
    rewrite_dates(row, schema::YEAR_QUARTER_DATES, dates::to_year_quarter);

    if add_member {
        row.insert(deid::DEID_MEMBER_ID.to_string(), deid_member.clone());
    }
    if add_subscriber {
        row.insert(deid::DEID_SUBSCRIBER_ID.to_string(), deid_subscriber.clone());
    }
    if add_age_group {
        row.insert(
            deid::AGE_GROUP.to_string(),
            age_group.map(|g| g.to_string()),
        );
    }
    if add_eligibility_year {
        row.insert(
            deid::ELIGIBILITY_YEAR.to_string(),
            dates::to_year(submission_year.as_deref()),
        );
    }
    if add_deceased {
        let indicator = if died { "Y" } else { "N" };
        row.insert(
            deid::DECEASED_INDICATOR.to_string(),
            Some(indicator.to_string()),
        );
    }

    if let Some(member) = &deid_member {
        ages.record(member.clone(), age_group);
    }

    if let Some(cw) = crosswalks.as_deref_mut() {
        if let (Some(original), Some(pseudo)) = (member_raw, deid_member) {
            cw.members.insert(original, pseudo);
        }
        if let (Some(original), Some(pseudo)) = (subscriber_raw, deid_subscriber) {
            cw.subscribers.insert(original, pseudo);
        }
    }
}
