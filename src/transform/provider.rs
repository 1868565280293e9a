use apcd_schema::deid;
use apcd_schema::layout::GeoColumns;
use apcd_schema::relations::provider as schema;
use apcd_schema::row::{drop_columns, field, has_column, Row};

use super::{generalize_geography, Crosswalks};
use crate::context::DeidContext;
use crate::pseudonym;

/// De-identify one provider-directory row in place.
///
/// The pseudonym prefers the NPI and falls back to the payor-assigned id;
/// a row with neither emits a null `DEID_PROVIDER_ID`.
pub fn transform_row(
    ctx: &DeidContext,
    geo: &GeoColumns,
    row: &mut Row,
    mut crosswalks: Option<&mut Crosswalks>,
) {
    let source = field(row, schema::NPI)
        .or_else(|| field(row, schema::PAYOR_ASSIGNED_ID))
        .map(str::to_string);
    let add_provider = has_column(row, schema::NPI) || has_column(row, schema::PAYOR_ASSIGNED_ID);

    let deid_provider = source
        .as_deref()
        .and_then(|s| pseudonym::pseudonymize(&ctx.keys.provider, s));

    drop_columns(row, schema::DROPPED);
    generalize_geography(ctx, geo, row);

    if add_provider {
        row.insert(deid::DEID_PROVIDER_ID.to_string(), deid_provider.clone());
    }

    if let Some(cw) = crosswalks.as_deref_mut() {
        if let (Some(original), Some(pseudo)) = (source, deid_provider) {
            cw.providers.insert(original, pseudo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DeidConfig;
    use crate::keys::SecretKeys;
    use crate::population::PopulationTables;
    use pretty_assertions::assert_eq;

    fn ctx() -> DeidContext {
        DeidContext::new(
            SecretKeys::generate(),
            &PopulationTables::synthetic(),
            DeidConfig::default(),
        )
    }

    fn sample_row() -> Row {
        let mut row = Row::new();
        for (col, val) in [
            ("provider_npi", Some("1234567893")),
            ("payor_assigned_provider_id", Some("P-001")),
            ("provider_last_name_or_organization_name", Some("Clinic")),
            ("provider_tax_id", Some("74-1234567")),
            ("provider_office_zip_code", Some("75201")),
            ("provider_office_county_fips", Some("48011")),
            ("provider_specialty", Some("207Q00000X")),
        ] {
            row.insert(col.to_string(), val.map(str::to_string));
        }
        row
    }

    fn transform(row: &mut Row) -> DeidContext {
        let ctx = ctx();
        let cols: Vec<String> = row.keys().cloned().collect();
        let geo = GeoColumns::resolve(&cols);
        transform_row(&ctx, &geo, row, None);
        ctx
    }

    #[test]
    fn npi_is_preferred_pseudonym_source() {
        let mut row = sample_row();
        let ctx = transform(&mut row);
        let expected = pseudonym::pseudonymize(&ctx.keys.provider, "1234567893").unwrap();
        assert_eq!(field(&row, "DEID_PROVIDER_ID"), Some(expected.as_str()));
    }

    #[test]
    fn payor_id_fallback_when_npi_null() {
        let mut row = sample_row();
        row.insert("provider_npi".to_string(), None);
        let ctx = transform(&mut row);
        let expected = pseudonym::pseudonymize(&ctx.keys.provider, "P-001").unwrap();
        assert_eq!(field(&row, "DEID_PROVIDER_ID"), Some(expected.as_str()));
    }

    #[test]
    fn drop_set_and_geography() {
        let mut row = sample_row();
        transform(&mut row);
        for dropped in schema::DROPPED {
            assert!(!row.contains_key(*dropped), "{dropped} survived");
        }
        assert_eq!(field(&row, "provider_office_zip_code"), Some("752"));
        // Armstrong County is under the population floor
        assert_eq!(field(&row, "provider_office_county_fips"), Some("000"));
        assert_eq!(field(&row, "provider_specialty"), Some("207Q00000X"));
    }
}
