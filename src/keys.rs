use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub const KEY_LEN: usize = 32;

/// The three secret keys behind the keyed pseudonyms, one per namespace.
/// Members and subscribers share the member key so their pseudonyms link
/// across relations. Keys stay constant for the pipeline's lifetime.
pub struct SecretKeys {
    pub member: [u8; KEY_LEN],
    pub provider: [u8; KEY_LEN],
    pub claim: [u8; KEY_LEN],
}

/// On-disk format: hex-encoded key material plus provenance metadata.
#[derive(Serialize, Deserialize)]
struct KeyFile {
    member_secret_key: String,
    provider_secret_key: String,
    claim_secret_key: String,
    generated_at: String,
    key_length_bits: usize,
}

impl SecretKeys {
    /// Draw three fresh 256-bit keys from the OS entropy source.
    pub fn generate() -> Self {
        let mut keys = SecretKeys {
            member: [0u8; KEY_LEN],
            provider: [0u8; KEY_LEN],
            claim: [0u8; KEY_LEN],
        };
        OsRng.fill_bytes(&mut keys.member);
        OsRng.fill_bytes(&mut keys.provider);
        OsRng.fill_bytes(&mut keys.claim);
        keys
    }

    /// Persist to a JSON key file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create key directory {:?}", dir))?;
            }
        }
        let file = KeyFile {
            member_secret_key: hex::encode(self.member),
            provider_secret_key: hex::encode(self.provider),
            claim_secret_key: hex::encode(self.claim),
            generated_at: Utc::now().to_rfc3339(),
            key_length_bits: KEY_LEN * 8,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json).with_context(|| format!("Failed to write key file {:?}", path))?;
        Ok(())
    }

    /// Load keys saved by a previous run. Any defect in the file is fatal:
    /// running with wrong keys would silently break cross-run linkage.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {:?}", path))?;
        let file: KeyFile = serde_json::from_str(&json)
            .with_context(|| format!("Key file {:?} is not valid JSON", path))?;
        Ok(SecretKeys {
            member: decode_key(&file.member_secret_key, "member")?,
            provider: decode_key(&file.provider_secret_key, "provider")?,
            claim: decode_key(&file.claim_secret_key, "claim")?,
        })
    }
}

fn decode_key(encoded: &str, name: &str) -> Result<[u8; KEY_LEN]> {
    let bytes = hex::decode(encoded.trim())
        .with_context(|| format!("{name} key is not valid hex"))?;
    let Ok(key) = <[u8; KEY_LEN]>::try_from(bytes) else {
        bail!("{name} key must be {} bits", KEY_LEN * 8);
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");
        let keys = SecretKeys::generate();
        keys.save(&path).unwrap();

        let loaded = SecretKeys::load(&path).unwrap();
        assert_eq!(keys.member, loaded.member);
        assert_eq!(keys.provider, loaded.provider);
        assert_eq!(keys.claim, loaded.claim);
    }

    #[test]
    fn generated_keys_are_distinct() {
        let keys = SecretKeys::generate();
        assert_ne!(keys.member, keys.provider);
        assert_ne!(keys.provider, keys.claim);
    }

    #[test]
    fn load_rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(SecretKeys::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn load_rejects_short_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");
        let json = serde_json::json!({
            "member_secret_key": "abcd",
            "provider_secret_key": hex::encode([0u8; KEY_LEN]),
            "claim_secret_key": hex::encode([0u8; KEY_LEN]),
            "generated_at": "2026-01-01T00:00:00Z",
            "key_length_bits": 256,
        });
        std::fs::write(&path, json.to_string()).unwrap();
        assert!(SecretKeys::load(&path).is_err());
    }
}
