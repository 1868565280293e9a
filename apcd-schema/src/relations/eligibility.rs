//! Eligibility relation: one row per member coverage period.

pub const MEMBER_ID: &str = "carrier_specific_unique_member_id";
pub const SUBSCRIBER_ID: &str = "carrier_specific_unique_subscriber_id";
pub const SUBMITTER_CODE: &str = "data_submitter_code";
pub const DATE_OF_BIRTH: &str = "member_date_of_birth";
pub const START_YEAR_OF_SUBMISSION: &str = "start_year_of_submission";
pub const DEATH_DATE: &str = "death_date";

/// Direct identifiers removed from the output. `member_date_of_birth`,
/// `start_year_of_submission`, and `death_date` are listed here because each
/// is replaced by a derived column before removal.
pub const DROPPED: &[&str] = &[
    "subscriber_social_security_number",
    "plan_specific_contract_number",
    "subscriber_last_name",
    "subscriber_first_name",
    "subscriber_middle_initial",
    "sequence_number",
    "member_social_security_number",
    "member_last_name",
    "member_first_name",
    "member_middle_initial",
    "member_street_address",
    "hios_plan_id",
    "payor_assigned_id_for_medical_home",
    "employer_tax_id",
    "carrier_specific_unique_member_id",
    "carrier_specific_unique_subscriber_id",
    "subscriber_medicare_beneficiary_identifier",
    "member_medicare_beneficiary_identifier",
    "member_street_address_2",
    "case_number",
    "member_date_of_birth",
    "member_city_name",
    "member_country_code",
    "start_year_of_submission",
    "death_date",
];

/// Coverage dates coarsened to the calendar year.
pub const YEAR_ONLY_DATES: &[&str] = &[
    "member_pcp_effective_date",
    "plan_effective_date",
    "plan_term_date",
];

/// Coverage dates coarsened to year + quarter.
pub const YEAR_QUARTER_DATES: &[&str] = &[
    "smib_from_date",
    "smib_to_date",
    "data_period_start",
    "data_period_end",
];
