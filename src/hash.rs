//! The hash-function contract consumed by every filter layer.
//!
//! Scalar hash-function selection is, per the scope notes, an external
//! collaborator: L1–L5 only depend on the `HashFn` trait below. This crate
//! ships one concrete implementation, `SipHashFn`, built on the same
//! `siphasher` primitive used elsewhere in the workspace for deterministic
//! routing, so the crate is useful out of the box without forcing a
//! particular hash function on every caller.

use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

/// `hash(key, seed) -> u32`, deterministic, independent across seeds.
///
/// Implementations must behave as if each `seed` selects an unrelated hash
/// function: the blocked Bloom filter relies on bit-slicing a *single* call
/// (seed 0) into non-overlapping ranges, while the standard Bloom filter and
/// the SIMD pipeline call this once per probe with `seed = current_k`,
/// expecting the results not to correlate.
pub trait HashFn<K: ?Sized> {
    /// Scalar hash of one key under the given seed.
    fn hash(key: &K, seed: u32) -> u32;

    /// Lane-wise hash of `LANES` keys, all under the same seed.
    ///
    /// The default implementation simply loops and packs — general-purpose
    /// hash functions rarely vectorize across independent keys in a way that
    /// beats a scalar loop, so this is a correct fallback, not a
    /// placeholder. Implementations backed by a data-parallel hash family
    /// may override it for real throughput gains; the SIMD probe pipeline
    /// (L4) only depends on the result being correct, not on how it was
    /// computed (see the error-handling note on SIMD degrading to scalar).
    #[inline]
    fn hash_vec<const LANES: usize>(keys: &[K; LANES], seed: u32) -> [u32; LANES]
    where
        K: Sized,
    {
        let mut out = [0u32; LANES];
        for (slot, key) in out.iter_mut().zip(keys.iter()) {
            *slot = Self::hash(key, seed);
        }
        out
    }
}

/// The default `HashFn`: `SipHash-1-3` keyed with `(0, seed)`.
///
/// Using the seed as the second SipHash key word (rather than mixing it
/// into the message) keeps per-seed hashes statistically independent while
/// avoiding a second pass over the key's bytes.
pub struct SipHashFn;

impl<K: Hash + ?Sized> HashFn<K> for SipHashFn {
    #[inline]
    fn hash(key: &K, seed: u32) -> u32 {
        let mut hasher = SipHasher13::new_with_keys(0, seed as u64);
        key.hash(&mut hasher);
        let full = hasher.finish();
        // Fold the 64-bit digest down to 32 bits rather than truncating, so
        // both halves of the digest contribute to the result.
        (full ^ (full >> 32)) as u32
    }
}
