//! Seed digest canonicalization

use crate::errors::{serialization_error, Result};
use crate::seed::format_v0::SeedV0;
use sha2::{Digest, Sha256};

/// Stable SHA256 digest of a parsed seed
///
/// Row attributes are kept sorted by name, so YAML key order and formatting
/// do not affect the digest; table and row order do.
pub fn compute_seed_digest(seed: &SeedV0) -> Result<String> {
    let canonical =
        serde_json::to_string(seed).map_err(|e| serialization_error("seed_digest", e))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
