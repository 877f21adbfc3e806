//! Seedable random streams for the synthesizers.
//!
//! The synthesizers take any `rand::Rng`; this module supplies the PCG32 streams
//! the engine feeds them. A fixed base seed makes every buffer reproducible, with
//! an independent stream per buffer key derived through BLAKE3.

use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Creates a PCG32 RNG from a 64-bit seed.
pub fn create_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Creates a PCG32 RNG seeded from the operating system.
pub fn entropy_rng() -> Pcg32 {
    Pcg32::from_entropy()
}

/// Derives an independent seed for the component named `key`.
///
/// Hashes the little-endian base seed followed by the UTF-8 key and keeps the
/// first eight bytes of the digest.
pub fn derive_seed(base_seed: u64, key: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&base_seed.to_le_bytes());
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// RNG for `key`: derived from `base_seed` when given, otherwise from entropy.
pub fn rng_for(base_seed: Option<u64>, key: &str) -> Pcg32 {
    match base_seed {
        Some(seed) => create_rng(derive_seed(seed, key)),
        None => entropy_rng(),
    }
}
