// File: spinwheel-core/src/codes.rs
//
// Voucher code generation: a deterministic tenant prefix plus a random
// suffix drawn from an alphabet with no visually ambiguous symbols, then
// uniqueness enforced against the store with a bounded retry budget.

use rand::rngs::OsRng;
use rand_core::TryRngCore;
use tracing::warn;

use spinwheel_common::traits::repository_traits::VoucherRepository;

use crate::Error;

/// Suffix symbols: uppercase letters and digits minus 0/O and 1/I/L.
pub const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const PREFIX_LEN: usize = 4;
pub const SUFFIX_LEN: usize = 12;

/// Default attempt budget for [`generate_unique_code`]. Call sites needing
/// higher assurance under heavy load can pass a larger budget.
pub const DEFAULT_CODE_ATTEMPTS: u32 = 3;

/// Derive the tenant-attributable prefix from a slug: strip everything
/// non-alphanumeric, uppercase, take the first four characters, right-pad
/// with `X`. Deterministic given the same slug.
pub fn derive_prefix(tenant_slug: &str) -> String {
    let mut prefix: String = tenant_slug
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(PREFIX_LEN)
        .collect::<String>()
        .to_ascii_uppercase();
    while prefix.len() < PREFIX_LEN {
        prefix.push('X');
    }
    prefix
}

/// Twelve symbols from [`SUFFIX_ALPHABET`], each drawn from OS randomness.
/// The modulo mapping over a byte carries a small bias (256 is not a
/// multiple of the alphabet size), acceptable for promotional codes.
pub fn random_suffix() -> Result<String, Error> {
    let mut bytes = [0u8; SUFFIX_LEN];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| Error::RandomSource(e.to_string()))?;

    Ok(bytes
        .iter()
        .map(|b| SUFFIX_ALPHABET[(*b as usize) % SUFFIX_ALPHABET.len()] as char)
        .collect())
}

/// `{prefix}-{suffix}`, e.g. `ACME-K7WQ2M9PRHT4`.
pub fn generate_code(tenant_slug: &str) -> Result<String, Error> {
    Ok(format!("{}-{}", derive_prefix(tenant_slug), random_suffix()?))
}

/// Generate codes until one has no existing match in the store, up to
/// `max_attempts`. Exhausting the budget is fatal to the calling creation
/// operation. Each collision is logged: repeated collisions mean either bad
/// luck or an alphabet/length too small for the tenant's volume.
pub async fn generate_unique_code(
    repo: &dyn VoucherRepository,
    tenant_slug: &str,
    max_attempts: u32,
) -> Result<String, Error> {
    for attempt in 1..=max_attempts {
        let code = generate_code(tenant_slug)?;
        if !repo.code_exists(&code).await? {
            return Ok(code);
        }
        warn!(
            "voucher code collision on attempt {}/{}: {}",
            attempt, max_attempts, code
        );
    }
    Err(Error::GenerationExhausted {
        attempts: max_attempts,
    })
}
