//! Medical claims relation: one row per claim line.

pub const CLAIM_CONTROL_NUMBER: &str = "payor_claim_control_number";
pub const CROSS_REFERENCE_CLAIMS_ID: &str = "cross_reference_claims_id";
pub const MEMBER_ID: &str = "carrier_specific_unique_member_id";
pub const SUBSCRIBER_ID: &str = "carrier_specific_unique_subscriber_id";
pub const SUBMITTER_CODE: &str = "data_submitter_code";
pub const DATE_OF_BIRTH: &str = "member_date_of_birth";
pub const MEMBER_SEX: &str = "member_sex";
pub const DRUG_CODE: &str = "drug_code";
pub const PRINCIPAL_DIAGNOSIS: &str = "principal_diagnosis";
pub const PROCEDURE_CODE: &str = "procedure_code";

/// Principal diagnosis plus the 24 secondary diagnosis columns.
pub fn diagnosis_columns() -> Vec<String> {
    let mut cols = vec![PRINCIPAL_DIAGNOSIS.to_string()];
    cols.extend((1..=24).map(|i| format!("other_diagnosis_{i}")));
    cols
}

/// Principal procedure plus the 25 secondary ICD-CM/PCS procedure columns.
pub fn procedure_columns() -> Vec<String> {
    let mut cols = vec![PROCEDURE_CODE.to_string()];
    cols.extend((1..=25).map(|i| format!("icd_cm_pcs_other_procedure_code_{i}")));
    cols
}

/// Provider NPI column per claim role, paired with the pseudonym column it
/// produces.
pub const PROVIDER_ROLES: &[(&str, &str)] = &[
    ("rendering_provider_npi", "DEID_RENDERING_PROVIDER_ID"),
    ("billing_provider_npi", "DEID_BILLING_PROVIDER_ID"),
    ("attending_provider_npi", "DEID_ATTENDING_PROVIDER_ID"),
    ("operating_provider_npi", "DEID_OPERATING_PROVIDER_ID"),
];

pub const DROPPED: &[&str] = &[
    "subscriber_social_security_number",
    "subscriber_last_name",
    "subscriber_first_name",
    "sequence_number",
    "member_social_security_number",
    "member_last_name",
    "member_first_name",
    "patient_control_number",
    "rendering_provider_first_name",
    "rendering_provider_middle_name",
    "rendering_provider_last_name_or_organization_name",
    "rendering_provider_suffix",
    "billing_provider_last_name_or_organization_name",
    "billing_providertax_id",
    "rendering_provider_street_address",
    "medical_record_number",
    "member_date_of_birth",
    "rendering_provider_city_name",
    "payor_claim_control_number",
    "cross_reference_claims_id",
    "rendering_provider_id",
    "rendering_provider_npi",
    "billing_provider_id",
    "billing_provider_npi",
    "referring_provider_id",
    "referring_provider_npi",
    "attending_provider_id",
    "attending_provider_npi",
    "carrier_specific_unique_member_id",
    "carrier_specific_unique_subscriber_id",
];

/// Service and payment dates, all coarsened to year + quarter.
pub const YEAR_QUARTER_DATES: &[&str] = &[
    "paid_date",
    "admission_date",
    "discharge_date",
    "date_of_service_from",
    "date_of_service_thru",
    "data_period_start",
    "data_period_end",
];
