//! SHA-256 identity hashes, rendered `sha256:<hex>`.

use sha2::{Digest, Sha256};

use crate::error::{Result, SmxError};

const PREFIX: &str = "sha256:";
const HEX_LEN: usize = 64;

#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Check a unit's content hash before it feeds a composed hash.
pub fn check_content_hash(unit_id: &str, hash: &str) -> Result<()> {
    if hash.is_empty() {
        return Err(SmxError::HashComputationFailure(format!(
            "unit {unit_id} has no content hash"
        )));
    }
    let well_formed = hash.strip_prefix(PREFIX).is_some_and(|digits| {
        digits.len() == HEX_LEN && digits.bytes().all(|b| b.is_ascii_hexdigit())
    });
    if !well_formed {
        return Err(SmxError::HashComputationFailure(format!(
            "unit {unit_id} has a malformed content hash: {hash}"
        )));
    }
    Ok(())
}

/// Inputs that together identify one composed artifact.
#[derive(Debug, Clone, Copy)]
pub struct HashInputs<'a> {
    pub template_id: &'a str,
    pub template_fingerprint: &'a str,
    pub separator: &'a str,
}

/// Hash of a template identity plus `(id, content_hash)` for each unit.
///
/// Units are hashed in id order whatever order the caller passes them in.
/// Every field is NUL-terminated so adjacent values cannot run together.
pub fn composed_hash<'u>(
    inputs: HashInputs<'_>,
    units: impl IntoIterator<Item = (&'u str, &'u str)>,
) -> Result<String> {
    let mut units: Vec<(&str, &str)> = units.into_iter().collect();
    units.sort_unstable();
    units.dedup();

    let mut hasher = Sha256::new();
    for field in [inputs.template_id, inputs.template_fingerprint, inputs.separator] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(units.len().to_le_bytes());
    for (id, content_hash) in units {
        check_content_hash(id, content_hash)?;
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
        hasher.update(content_hash.as_bytes());
        hasher.update([0u8]);
    }
    Ok(format!("{PREFIX}{}", hex::encode(hasher.finalize())))
}
