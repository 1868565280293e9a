use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::keys::KEY_LEN;

type HmacSha256 = Hmac<Sha256>;

/// Length of an emitted pseudonym.
pub const PSEUDONYM_LEN: usize = 16;

/// Keyed pseudonym: HMAC-SHA256 of the input under the secret key,
/// base64url-encoded, stripped to alphanumerics, truncated to 16 chars.
///
/// Deterministic for a fixed key, irreversible without it. Returns `None`
/// for empty input so absent identifiers stay absent.
pub fn pseudonymize(key: &[u8; KEY_LEN], input: &str) -> Option<String> {
    if input.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts 32-byte keys");
    mac.update(input.as_bytes());
    let digest = mac.finalize().into_bytes();
    let encoded = BASE64_URL_SAFE.encode(digest);
    Some(
        encoded
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(PSEUDONYM_LEN)
            .collect(),
    )
}

/// Pseudonym over a composite identifier: components joined with `|`.
///
/// A null primary component yields a null pseudonym; null trailing
/// components render as empty strings between the separators, so
/// `("ABC", [None])` hashes `"ABC|"`.
pub fn pseudonymize_joined(
    key: &[u8; KEY_LEN],
    primary: Option<&str>,
    rest: &[Option<&str>],
) -> Option<String> {
    let primary = primary?;
    let mut joined = primary.to_string();
    for part in rest {
        joined.push('|');
        joined.push_str(part.unwrap_or(""));
    }
    pseudonymize(key, &joined)
}
