//! Provider directory relation.

pub const NPI: &str = "provider_npi";
pub const PAYOR_ASSIGNED_ID: &str = "payor_assigned_provider_id";

pub const DROPPED: &[&str] = &[
    "provider_tax_id",
    "provider_dea_number",
    "provider_state_license_number",
    "provider_first_name",
    "provider_middle_name_or_initial",
    "provider_last_name_or_organization_name",
    "provider_suffix",
    "provider_office_street_address",
    "provider_phone",
    "payor_assigned_provider_id",
    "provider_npi",
    "provider_medicare_provider_id",
    "provider_medicaid_provider_id",
    "provider_office_city",
];
