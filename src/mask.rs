//! Record-level suppression for medical rows: decide from raw codes whether
//! the row's demographics must be masked, and apply the per-column
//! diagnosis rewrites.

use apcd_schema::layout::GeoColumns;
use apcd_schema::relations::medical;
use apcd_schema::row::{field, overwrite, Row};

use crate::codes;
use crate::geo;
use crate::rarity::RarityIndex;

/// Walk every code column of a medical row. Returns true when the row's
/// demographic quasi-identifiers must be suppressed: any sensitive
/// diagnosis, rare diagnosis, rare procedure, or rare drug code.
///
/// Also applies the in-column diagnosis rewrites: a rare code truncates to
/// its 3-character category, and a code in the generalization table is
/// replaced by its coarse label (which wins when both apply). Both
/// decisions read the raw code, so the truncation cannot hide a code from
/// the rare-set lookup or the category from the generalization table.
pub fn apply_code_policy(
    row: &mut Row,
    diagnosis_columns: &[String],
    procedure_columns: &[String],
    rarity: &RarityIndex,
) -> bool {
    let mut mask_demographics = false;

    for col in diagnosis_columns {
        let Some(raw) = field(row, col).map(str::to_string) else {
            continue;
        };

        if codes::classify(&raw).is_some_and(|c| c.masks_demographics()) {
            mask_demographics = true;
        }

        let rare = rarity.is_rare_dx(&raw);
        if rare {
            mask_demographics = true;
        }

        let mut rewrite = if rare { Some(codes::category(&raw)) } else { None };
        if let Some(label) = codes::generalize(&raw) {
            rewrite = Some(label.to_string());
        }
        if let Some(value) = rewrite {
            overwrite(row, col, Some(value));
        }
    }

    for col in procedure_columns {
        if field(row, col).is_some_and(|code| rarity.is_rare_cpt(code)) {
            mask_demographics = true;
        }
    }

    if field(row, medical::DRUG_CODE).is_some_and(|code| rarity.is_rare_ndc(code)) {
        mask_demographics = true;
    }

    mask_demographics
}

/// Force the row's generalized geography to `"000"` and null its sex.
/// Runs after geographic generalization so the mask is the final word.
pub fn suppress_demographics(row: &mut Row, geo_columns: &GeoColumns) {
    for col in &geo_columns.zip {
        overwrite(row, col, Some(geo::MASKED.to_string()));
    }
    for col in &geo_columns.fips {
        overwrite(row, col, Some(geo::MASKED.to_string()));
    }
    overwrite(row, medical::MEMBER_SEX, None);
}
