//! Stable bucketing of identity strings.

use sha2::{Digest, Sha256};

/// Number of buckets an identity can fall into.
pub const BUCKETS: u16 = 100;

/// Map an identity string to a bucket in `0..100`.
///
/// Uses the first two bytes of the SHA-256 digest as a big-endian `u16`,
/// reduced modulo 100. The result depends only on the input, so it is stable
/// across processes and restarts.
pub fn bucket(identity: &str) -> u8 {
    let digest = Sha256::digest(identity.as_bytes());
    let value = u16::from_be_bytes([digest[0], digest[1]]);
    (value % BUCKETS) as u8
}
