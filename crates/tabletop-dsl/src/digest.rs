//! Problem digests (versioned).
//!
//! Batch runs record which canonical text they wrote. The digest is a simple,
//! deterministic, non-cryptographic hash:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: the UTF-8 bytes of the canonical problem text
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! This is an identity tool for outputs, not a security primitive.

/// Prefix used in serialized digests.
pub const PROBLEM_DIGEST_V1_PREFIX: &str = "fnv1a64:";

/// Digest of canonical problem text.
pub fn problem_digest_v1(text: &str) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for b in text.as_bytes() {
        hash ^= (*b) as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{PROBLEM_DIGEST_V1_PREFIX}{hash:016x}")
}
