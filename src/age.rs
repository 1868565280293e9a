use chrono::{Datelike, NaiveDate};

use crate::dates;

/// Ages above this clamp to it; exact ages of the very old re-identify.
pub const AGE_CAP: i32 = 90;

/// Completed years between `dob` (any shape `dates::parse_flexible`
/// accepts) and the reference date, capped at 90. `None` when the date of
/// birth is unparseable.
pub fn age_at(dob: &str, reference: NaiveDate) -> Option<i32> {
    let dob = dates::parse_flexible(dob)?;
    let mut age = reference.year() - dob.year();
    if (reference.month(), reference.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    Some(age.min(AGE_CAP))
}

/// Map an age to its group code: the 22 general buckets (codes 1..=22), or
/// the 5 coarse HIV/substance-use buckets (codes 23..=27) when
/// `hiv_drug_buckets` is set. The coarse table is never selected
/// automatically; callers opt in through configuration.
pub fn age_group(age: i32, hiv_drug_buckets: bool) -> u8 {
    if hiv_drug_buckets {
        match age {
            ..=17 => 23,
            18..=34 => 24,
            35..=49 => 25,
            50..=64 => 26,
            _ => 27,
        }
    } else {
        match age {
            ..=1 => 1,
            2..=4 => 2,
            5..=9 => 3,
            10..=14 => 4,
            15..=19 => 5,
            20..=24 => 6,
            25..=29 => 7,
            30..=34 => 8,
            35..=39 => 9,
            40..=44 => 10,
            45..=49 => 11,
            50..=54 => 12,
            55..=59 => 13,
            60..=64 => 14,
            65..=69 => 15,
            70..=74 => 16,
            75..=79 => 17,
            80..=84 => 18,
            85..=89 => 19,
            90..=94 => 20,
            95..=99 => 21,
            _ => 22,
        }
    }
}
