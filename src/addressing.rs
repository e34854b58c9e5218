//! L1 — addressing logic: maps a hash value to a block index.
//!
//! The source project picks the regime via template specialization
//! (`block_addressing_logic<POWER_OF_TWO|MAGIC|DYNAMIC>`); we replace that
//! with a tagged variant (design note: "Variants over templates") so a
//! single `BlockAddressing` value can be chosen at runtime while still
//! dispatching through a `match` the branch predictor locks onto per
//! instance.

use crate::magic::{next_cheap_magic, MagicDivisor};
use crate::math::{is_power_of_two, log2_u32, next_power_of_two};
use crate::simd::LaneVector;

/// The requested addressing regime. `Dynamic` resolves to one of the other
/// two at construction time (see `BlockAddressing::resolve`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    PowerOfTwo,
    Magic,
    Dynamic,
}

/// The regime actually in effect for a constructed filter. Unlike
/// `AddressingMode`, this never holds `Dynamic` — `Dynamic` always resolves
/// to one of these two before a `BlockAddressing` value exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMode {
    PowerOfTwo,
    Magic,
}

#[derive(Debug, Clone, Copy)]
struct PowerOfTwoState {
    block_cnt: u32,
    block_cnt_log2: u32,
}

impl PowerOfTwoState {
    fn new(desired_block_cnt: u32) -> Self {
        let block_cnt = next_power_of_two(desired_block_cnt);
        Self {
            block_cnt,
            block_cnt_log2: log2_u32(block_cnt),
        }
    }

    #[inline(always)]
    fn block_idx(&self, hash: u32) -> u32 {
        hash >> (32 - self.block_cnt_log2)
    }
}

#[derive(Debug, Clone, Copy)]
struct MagicState {
    block_cnt: u32,
    /// Addressing bits required *before* folding, i.e. `log2(next_pow2(block_cnt))`
    /// — a slight over-allocation later folded down by `fast_mod`.
    addressing_bits: u32,
    divisor: MagicDivisor,
}

impl MagicState {
    fn new(desired_block_cnt: u32) -> Self {
        let divisor = next_cheap_magic(desired_block_cnt);
        let block_cnt = divisor.divisor;
        Self {
            block_cnt,
            addressing_bits: log2_u32(next_power_of_two(block_cnt)),
            divisor,
        }
    }

    #[inline(always)]
    fn block_idx(&self, hash: u32) -> u32 {
        let h = hash >> (32 - self.addressing_bits);
        self.divisor.fast_mod(h)
    }
}

/// Resolves which regime `Dynamic` should use for a given desired block
/// count: `PowerOfTwo` when the request is already a power of two, or when
/// the next cheap-magic divisor would (rarely, near a power-of-two boundary)
/// overshoot the next power of two; `Magic` otherwise.
fn determine_dynamic_mode(desired_block_cnt: u32) -> ResolvedMode {
    if is_power_of_two(desired_block_cnt) {
        return ResolvedMode::PowerOfTwo;
    }
    let pow2 = next_power_of_two(desired_block_cnt);
    let magic = next_cheap_magic(desired_block_cnt).divisor;
    if magic > pow2 {
        ResolvedMode::PowerOfTwo
    } else {
        ResolvedMode::Magic
    }
}

/// Block-to-hash addressing, resolved once at construction and reused for
/// every probe. Holds both sub-regime states unconditionally (construction
/// cost is negligible and this keeps the type uniform regardless of which
/// mode was requested), dispatching on `resolved` for every hot-path call.
#[derive(Debug, Clone, Copy)]
pub struct BlockAddressing {
    resolved: ResolvedMode,
    pow2: PowerOfTwoState,
    magic: MagicState,
}

impl BlockAddressing {
    /// Builds the addressing state for a desired block count under `mode`.
    ///
    /// Per the tie-break policy, `desired_block_cnt < 2` is promoted to `2`
    /// (a single-block filter would make the later `hash >> word_bitlength`
    /// shift undefined).
    #[must_use]
    pub fn new(desired_block_cnt: u32, mode: AddressingMode) -> Self {
        let desired_block_cnt = desired_block_cnt.max(2);
        let pow2 = PowerOfTwoState::new(desired_block_cnt);
        let magic = MagicState::new(desired_block_cnt);
        let resolved = match mode {
            AddressingMode::PowerOfTwo => ResolvedMode::PowerOfTwo,
            AddressingMode::Magic => ResolvedMode::Magic,
            AddressingMode::Dynamic => determine_dynamic_mode(desired_block_cnt),
        };
        Self {
            resolved,
            pow2,
            magic,
        }
    }

    /// The regime actually selected (always concrete, never `Dynamic`).
    #[inline(always)]
    #[must_use]
    pub fn resolved_mode(&self) -> ResolvedMode {
        self.resolved
    }

    /// Actual block count, `>=` the originally requested count.
    #[inline(always)]
    #[must_use]
    pub fn block_count(&self) -> u32 {
        match self.resolved {
            ResolvedMode::PowerOfTwo => self.pow2.block_cnt,
            ResolvedMode::Magic => self.magic.block_cnt,
        }
    }

    /// Number of high hash bits consumed to select a block.
    #[inline(always)]
    #[must_use]
    pub fn required_addressing_bits(&self) -> u32 {
        match self.resolved {
            ResolvedMode::PowerOfTwo => self.pow2.block_cnt_log2,
            ResolvedMode::Magic => self.magic.addressing_bits,
        }
    }

    /// Maps `hash` to a block index in `[0, block_count())`.
    #[inline(always)]
    #[must_use]
    pub fn block_index(&self, hash: u32) -> u32 {
        match self.resolved {
            ResolvedMode::PowerOfTwo => self.pow2.block_idx(hash),
            ResolvedMode::Magic => self.magic.block_idx(hash),
        }
    }

    /// Lane-wise `block_index`, over a fixed-width (8-lane) hash vector.
    #[inline(always)]
    #[must_use]
    pub fn block_index_vec(&self, hash_vec: LaneVector) -> LaneVector {
        match self.resolved {
            ResolvedMode::PowerOfTwo => hash_vec.shr(32 - self.pow2.block_cnt_log2),
            ResolvedMode::Magic => {
                let shifted = hash_vec.shr(32 - self.magic.addressing_bits);
                let d = &self.magic.divisor;
                shifted.fast_mod(d.multiplier, d.shift, d.divisor)
            }
        }
    }
}
