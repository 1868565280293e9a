//! Relation schemas for TX-APCD de-identification.
//!
//! Declares, per input relation, the columns the engine treats specially:
//! direct identifiers to drop, ZIP/FIPS columns to generalize, date columns
//! and their bucketing, clinical code columns, and the names of the
//! de-identified output columns. Pure data, no I/O.

pub mod deid;
pub mod layout;
pub mod relations;
pub mod row;
