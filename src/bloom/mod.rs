//! L3 — the Bloom filter engine, in its two concrete shapes.
//!
//! `blocked` is the "one hash, bit-slice into k sectors" variant
//! (single hash call per key, generalized to optionally span multiple
//! words per block). `standard` is the "k independent re-hashes"
//! variant, which is also the one that exposes the L4 SIMD probe
//! pipeline.

pub mod blocked;
pub mod standard;

pub use blocked::BlockedBloomFilter;
pub use standard::StandardBloomFilter;
