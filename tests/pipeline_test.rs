use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use tempfile::TempDir;

// ── Fixture: small three-relation input database ──────────────────────────────
//
// Diagnosis frequencies are arranged around the default K = 10:
//   J06.9  ×12  common, unremarkable
//   B20.1  ×10  common but HIV-sensitive → demographics masked, code intact
//   A53.1  ×10  common STI code → generalized to "A50-A64", no mask
//   Q87.40 ×1   rare → truncated to "Q87", demographics masked
// The 99213 procedure appears 22 times so it never trips the rarity mask.

fn seed_input_db(path: &std::path::Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE eligibility (
            carrier_specific_unique_member_id TEXT,
            carrier_specific_unique_subscriber_id TEXT,
            data_submitter_code TEXT,
            member_first_name TEXT,
            member_last_name TEXT,
            member_social_security_number TEXT,
            member_date_of_birth TEXT,
            member_sex TEXT,
            member_zip_code TEXT,
            member_county_fips TEXT,
            plan_effective_date TEXT,
            smib_from_date TEXT,
            start_year_of_submission TEXT,
            death_date TEXT
         );
         CREATE TABLE provider (
            provider_npi TEXT,
            payor_assigned_provider_id TEXT,
            provider_first_name TEXT,
            provider_tax_id TEXT,
            provider_office_zip_code TEXT,
            provider_office_county_fips TEXT,
            provider_specialty TEXT
         );
         CREATE TABLE medical (
            payor_claim_control_number TEXT,
            cross_reference_claims_id TEXT,
            carrier_specific_unique_member_id TEXT,
            carrier_specific_unique_subscriber_id TEXT,
            data_submitter_code TEXT,
            member_last_name TEXT,
            medical_record_number TEXT,
            member_date_of_birth TEXT,
            member_sex TEXT,
            member_zip_code TEXT,
            member_county_fips TEXT,
            principal_diagnosis TEXT,
            other_diagnosis_1 TEXT,
            procedure_code TEXT,
            drug_code TEXT,
            rendering_provider_npi TEXT,
            billing_provider_npi TEXT,
            date_of_service_from TEXT,
            paid_date TEXT
         );",
    )
    .unwrap();

    conn.execute(
        "INSERT INTO eligibility VALUES
            ('ABC', 'S1', 'TX01', 'Jane', 'Doe', '123-45-6789', '19800615', 'F',
             '75201', '48113', '20200101', '20200315', '2020', NULL)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO eligibility VALUES
            ('XYZ', 'S2', 'TX01', 'John', 'Roe', '987-65-4321', '19951201', 'M',
             '79001', '48011', '20210401', '20210701', '2021', '20250110')",
        [],
    )
    .unwrap();

    conn.execute(
        "INSERT INTO provider VALUES
            ('1234567893', 'P-001', 'Alice', '74-1234567', '75201', '48113', '207Q00000X')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO provider VALUES
            (NULL, 'P-002', 'Bob', '74-7654321', '79001', '48011', '208D00000X')",
        [],
    )
    .unwrap();

    let mut insert_claim = |claim: &str, dx: &str, procedure: Option<&str>| {
        conn.execute(
            "INSERT INTO medical VALUES
                (?1, NULL, 'ABC', 'S1', 'TX01', 'Doe', 'MRN-1', '19700101', 'F',
                 '75201', '48113', ?2, NULL, ?3, NULL, '1234567893', NULL,
                 '20200315', '20200501')",
            rusqlite::params![claim, dx, procedure],
        )
        .unwrap();
    };

    for i in 0..12 {
        insert_claim(&format!("CLM-J{i}"), "J06.9", Some("99213"));
    }
    for i in 0..10 {
        insert_claim(&format!("CLM-B{i}"), "B20.1", Some("99213"));
    }
    for i in 0..10 {
        insert_claim(&format!("CLM-A{i}"), "A53.1", None);
    }
    insert_claim("CLM-Q0", "Q87.40", None);
}

struct PipelineRun {
    _dir: TempDir,
    output: Connection,
}

fn run_pipeline() -> PipelineRun {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.db");
    let output = dir.path().join("output.db");
    seed_input_db(&input);

    let mut cmd = Command::cargo_bin("texas-apcd-deid").unwrap();
    cmd.args([
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--keys",
        dir.path().join("keys.json").to_str().unwrap(),
        "--generate-keys",
        "--synthetic-population",
        "--reference-date",
        "2026-06-01",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("All validation checks passed"));

    let output = Connection::open(&output).unwrap();
    PipelineRun { _dir: dir, output }
}

fn query_one(conn: &Connection, sql: &str) -> Option<String> {
    conn.query_row(sql, [], |r| r.get::<_, Option<String>>(0))
        .unwrap()
}

// ── End-to-end behavior ───────────────────────────────────────────────────────

#[test]
fn eligibility_rows_are_generalized_and_linked() {
    let run = run_pipeline();
    let conn = &run.output;

    let deid = query_one(
        conn,
        "SELECT DEID_MEMBER_ID FROM eligibility_deid WHERE member_zip_code = '752'",
    )
    .unwrap();
    assert!(deid.len() <= 16 && deid.chars().all(|c| c.is_ascii_alphanumeric()));

    assert_eq!(
        query_one(
            conn,
            "SELECT plan_effective_date FROM eligibility_deid WHERE member_zip_code = '752'"
        )
        .as_deref(),
        Some("2020")
    );
    assert_eq!(
        query_one(
            conn,
            "SELECT smib_from_date FROM eligibility_deid WHERE member_zip_code = '752'"
        )
        .as_deref(),
        Some("2020Q1")
    );
    assert_eq!(
        query_one(
            conn,
            "SELECT AGE_GROUP FROM eligibility_deid WHERE member_zip_code = '752'"
        )
        .as_deref(),
        Some("11")
    );
    assert_eq!(
        query_one(
            conn,
            "SELECT deceased_indicator FROM eligibility_deid WHERE member_zip_code = '752'"
        )
        .as_deref(),
        Some("N")
    );
}

#[test]
fn sparse_zip_and_small_county_are_masked() {
    let run = run_pipeline();
    let conn = &run.output;

    // member XYZ: 790xx prefix sums to 12,000; Armstrong County pop 1,904
    assert_eq!(
        query_one(
            conn,
            "SELECT member_zip_code FROM eligibility_deid WHERE deceased_indicator = 'Y'"
        )
        .as_deref(),
        Some("000")
    );
    assert_eq!(
        query_one(
            conn,
            "SELECT member_county_fips FROM eligibility_deid WHERE deceased_indicator = 'Y'"
        )
        .as_deref(),
        Some("000")
    );
}

#[test]
fn no_direct_identifier_columns_survive() {
    let run = run_pipeline();
    let conn = &run.output;

    for (table, column) in [
        ("eligibility_deid", "member_first_name"),
        ("eligibility_deid", "member_social_security_number"),
        ("eligibility_deid", "member_date_of_birth"),
        ("eligibility_deid", "death_date"),
        ("provider_deid", "provider_npi"),
        ("provider_deid", "provider_tax_id"),
        ("medical_deid", "member_last_name"),
        ("medical_deid", "medical_record_number"),
        ("medical_deid", "payor_claim_control_number"),
        ("medical_deid", "rendering_provider_npi"),
    ] {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
                rusqlite::params![table, column],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 0, "{table}.{column} should have been dropped");
    }
}

#[test]
fn sensitive_diagnosis_masks_demographics_but_keeps_code() {
    let run = run_pipeline();
    let conn = &run.output;

    let rows: i64 = run
        .output
        .query_row(
            "SELECT COUNT(*) FROM medical_deid
             WHERE principal_diagnosis = 'B20.1'
               AND member_zip_code = '000'
               AND member_county_fips = '000'
               AND member_sex IS NULL",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(rows, 10);

    // no B20.1 row kept its geography
    let unmasked: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM medical_deid
             WHERE principal_diagnosis = 'B20.1' AND member_zip_code != '000'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(unmasked, 0);
}

#[test]
fn rare_diagnosis_is_truncated_and_masked() {
    let run = run_pipeline();
    let conn = &run.output;

    assert_eq!(
        query_one(
            conn,
            "SELECT member_sex FROM medical_deid WHERE principal_diagnosis = 'Q87'"
        ),
        None
    );
    assert_eq!(
        query_one(
            conn,
            "SELECT member_zip_code FROM medical_deid WHERE principal_diagnosis = 'Q87'"
        )
        .as_deref(),
        Some("000")
    );
    // the raw code is gone
    let raw: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM medical_deid WHERE principal_diagnosis = 'Q87.40'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(raw, 0);
}

#[test]
fn common_sti_code_generalizes_without_mask() {
    let run = run_pipeline();
    let conn = &run.output;

    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM medical_deid
             WHERE principal_diagnosis = 'A50-A64'
               AND member_sex = 'F'
               AND member_zip_code = '752'
               AND member_county_fips = '48113'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(rows, 10);
}

#[test]
fn unmasked_rows_keep_generalized_demographics_and_quarter_dates() {
    let run = run_pipeline();
    let conn = &run.output;

    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM medical_deid
             WHERE principal_diagnosis = 'J06.9'
               AND member_sex = 'F'
               AND member_zip_code = '752'
               AND date_of_service_from = '2020Q1'
               AND paid_date = '2020Q2'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(rows, 12);
}

#[test]
fn medical_member_links_to_eligibility_and_inherits_age_group() {
    let run = run_pipeline();
    let conn = &run.output;

    let elig_member = query_one(
        conn,
        "SELECT DEID_MEMBER_ID FROM eligibility_deid WHERE member_zip_code = '752'",
    )
    .unwrap();
    let shared: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM medical_deid WHERE DEID_MEMBER_ID = ?1",
            rusqlite::params![elig_member],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(shared, 33);

    // The medical rows carry a 1970 date of birth, which would bucket to 13.
    // The eligibility lookup (1980 birth → group 11) must win.
    let distinct_groups: i64 = conn
        .query_row(
            "SELECT COUNT(DISTINCT AGE_GROUP) FROM medical_deid",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(distinct_groups, 1);
    assert_eq!(
        query_one(conn, "SELECT DISTINCT AGE_GROUP FROM medical_deid").as_deref(),
        Some("11")
    );
}

#[test]
fn provider_pseudonym_links_directory_to_claims() {
    let run = run_pipeline();
    let conn = &run.output;

    let directory_id = query_one(
        conn,
        "SELECT DEID_PROVIDER_ID FROM provider_deid WHERE provider_specialty = '207Q00000X'",
    )
    .unwrap();
    let claims: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM medical_deid WHERE DEID_RENDERING_PROVIDER_ID = ?1",
            rusqlite::params![directory_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(claims, 33);

    // payor-id fallback provider still gets a pseudonym
    let fallback = query_one(
        conn,
        "SELECT DEID_PROVIDER_ID FROM provider_deid WHERE provider_specialty = '208D00000X'",
    );
    assert!(fallback.is_some());
}

#[test]
fn missing_key_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.db");
    seed_input_db(&input);

    let mut cmd = Command::cargo_bin("texas-apcd-deid").unwrap();
    cmd.args([
        "--input",
        input.to_str().unwrap(),
        "--output",
        dir.path().join("out.db").to_str().unwrap(),
        "--keys",
        dir.path().join("absent.json").to_str().unwrap(),
        "--synthetic-population",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("secret keys"));
}

#[test]
fn missing_population_tables_are_fatal() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.db");
    seed_input_db(&input);

    let mut cmd = Command::cargo_bin("texas-apcd-deid").unwrap();
    cmd.args([
        "--input",
        input.to_str().unwrap(),
        "--output",
        dir.path().join("out.db").to_str().unwrap(),
        "--keys",
        dir.path().join("keys.json").to_str().unwrap(),
        "--generate-keys",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Population tables required"));
}

#[test]
fn stable_pseudonyms_across_runs_with_same_keys() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.db");
    seed_input_db(&input);
    let keys = dir.path().join("keys.json");

    let run_once = |out_name: &str, generate: bool| {
        let out = dir.path().join(out_name);
        let mut cmd = Command::cargo_bin("texas-apcd-deid").unwrap();
        cmd.args([
            "--input",
            input.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--keys",
            keys.to_str().unwrap(),
            "--synthetic-population",
            "--reference-date",
            "2026-06-01",
        ]);
        if generate {
            cmd.arg("--generate-keys");
        }
        cmd.assert().success();
        let conn = Connection::open(&out).unwrap();
        query_one(
            &conn,
            "SELECT DEID_MEMBER_ID FROM eligibility_deid WHERE member_zip_code = '752'",
        )
        .unwrap()
    };

    let first = run_once("out1.db", true);
    let second = run_once("out2.db", false);
    assert_eq!(first, second);
}

#[test]
fn export_and_crosswalk_directories_are_written() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.db");
    seed_input_db(&input);
    let export_dir = dir.path().join("csv");
    let crosswalk_dir = dir.path().join("crosswalks");

    let mut cmd = Command::cargo_bin("texas-apcd-deid").unwrap();
    cmd.args([
        "--input",
        input.to_str().unwrap(),
        "--output",
        dir.path().join("out.db").to_str().unwrap(),
        "--keys",
        dir.path().join("keys.json").to_str().unwrap(),
        "--generate-keys",
        "--synthetic-population",
        "--export-dir",
        export_dir.to_str().unwrap(),
        "--crosswalk-dir",
        crosswalk_dir.to_str().unwrap(),
    ]);
    cmd.assert().success();

    for file in [
        "eligibility_deid.csv",
        "provider_deid.csv",
        "medical_deid.csv",
    ] {
        assert!(export_dir.join(file).exists(), "{file} missing");
    }

    let members =
        std::fs::read_to_string(crosswalk_dir.join("member_crosswalk.csv")).unwrap();
    assert!(members.contains("ABC,"));
    // crosswalks stay out of the de-identified exports
    let medical_csv =
        std::fs::read_to_string(export_dir.join("medical_deid.csv")).unwrap();
    assert!(!medical_csv.contains("ABC,"));
    assert!(!medical_csv.contains("CLM-"));
}
