// src/errors.rs
// =================================================================
// APARATO: FILTER ERRORS
// RESPONSABILIDAD: CATALOGO DE FALLOS DE CONFIGURACION
// =================================================================

use thiserror::Error;

/// Construction-time configuration failures.
///
/// `insert`/`contains` never fail at runtime (see `DESIGN.md`); every
/// failure mode this crate exposes is caught once, at construction, and
/// is fatal to the instance being built.
#[derive(Error, Debug)]
pub enum FilterError {
    /// The requested bit length was zero.
    #[error("filter length must be non-zero")]
    ZeroLength,

    /// The requested bit length exceeds `max_m` for the chosen (k, sectorization).
    #[error("requested length {requested} exceeds max_m ({max_m}) for k={k}, sectorized={sectorized}")]
    LengthExceedsMax {
        requested: u64,
        max_m: u64,
        k: u32,
        sectorized: bool,
    },

    /// `k` fell outside the supported range `[1, 16]`.
    #[error("k={k} is out of the supported range [1, 16]")]
    KOutOfBounds { k: u32 },

    /// The hash function's output width cannot carry enough entropy for the
    /// requested `(block_count, k, sectorization)` combination.
    #[error(
        "insufficient hash bits: addressing requires {addressing_bits} bits, k={k} probes need \
         {bits_per_probe} bits each ({total_required} total), but the hash only supplies \
         {hash_value_bitlength} bits"
    )]
    InsufficientHashBits {
        addressing_bits: u32,
        k: u32,
        bits_per_probe: u32,
        total_required: u32,
        hash_value_bitlength: u32,
    },
}
