//! ICD-10 diagnosis sensitivity policy: which codes force demographic
//! suppression, and which rewrite to a coarser label.

/// Diagnosis classes with re-identification or stigma risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivityClass {
    HivAids,
    SubstanceUse,
    Abuse,
    /// Enumerated by the policy (Z38*, Z33.2) but not currently consumed by
    /// the masking cascade. See DESIGN.md.
    Newborn,
}

impl SensitivityClass {
    /// Classes that suppress the row's demographic quasi-identifiers.
    /// Newborn codes are classified but carry no masking effect.
    pub fn masks_demographics(self) -> bool {
        !matches!(self, SensitivityClass::Newborn)
    }
}

/// Canonical form for policy matching: uppercased, dots stripped.
fn canonicalize(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .to_uppercase()
}

/// The 3-character category a diagnosis code belongs to, uppercased and
/// dot-stripped: `"b20.1"` becomes `"B20"`.
pub fn category(code: &str) -> String {
    canonicalize(code).chars().take(3).collect()
}

/// Classify a diagnosis code, or `None` when it is not policy-relevant.
pub fn classify(code: &str) -> Option<SensitivityClass> {
    let canonical = canonicalize(code);
    let cat: String = canonical.chars().take(3).collect();

    if let Some(n) = numeric_suffix(&cat, 'B') {
        if (20..=24).contains(&n) {
            return Some(SensitivityClass::HivAids);
        }
    }
    if let Some(n) = numeric_suffix(&cat, 'F') {
        if (10..=19).contains(&n) {
            return Some(SensitivityClass::SubstanceUse);
        }
    }
    if cat == "T74" || cat == "T76" {
        return Some(SensitivityClass::Abuse);
    }
    if cat == "Z38" || canonical == "Z332" {
        return Some(SensitivityClass::Newborn);
    }
    None
}

/// Coarse label replacing a code whose 3-character category sits in the
/// generalization table, e.g. any STI code in A50..A64 → `"A50-A64"`.
pub fn generalize(code: &str) -> Option<&'static str> {
    let cat = category(code);
    if let Some(n) = numeric_suffix(&cat, 'A') {
        if (50..=64).contains(&n) {
            return Some("A50-A64");
        }
    }
    match cat.as_str() {
        "F20" => Some("F20"),
        "F31" => Some("F31"),
        "T74" => Some("T74"),
        "T76" => Some("T76"),
        "G10" => Some("G10"),
        "E84" => Some("E84"),
        _ => None,
    }
}

/// Two-digit number following a single-letter prefix, e.g. `("B20", 'B')`
/// → `Some(20)`.
fn numeric_suffix(category: &str, letter: char) -> Option<u32> {
    let rest = category.strip_prefix(letter)?;
    if rest.len() == 2 && rest.bytes().all(|b| b.is_ascii_digit()) {
        rest.parse().ok()
    } else {
        None
    }
}
