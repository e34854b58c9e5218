//! L2 — in-block bit selection.
//!
//! Given the hash bits left over after L1's block-addressing slice, choose
//! `k` bit positions inside a block. When `sectorized`, the block (or, for
//! multi-word blocks, each word within it) is split into
//! `s = next_power_of_two(k)` equal sectors and probe `i` is confined to
//! sector `i`, bounding collision density per probe. The slices consumed by
//! successive probes are adjacent and non-overlapping, immediately following
//! the addressing-bit slice.

use crate::errors::FilterError;
use crate::math::{is_power_of_two, log2_u32, next_power_of_two};

/// The machine-word type backing a filter's bit array.
pub trait Word:
    Copy
    + Default
    + PartialEq
    + std::ops::BitOr<Output = Self>
    + std::ops::BitOrAssign
    + std::ops::BitAnd<Output = Self>
    + std::ops::Shl<u32, Output = Self>
    + 'static
{
    /// Width of the word, in bits (32 or 64).
    const BITLENGTH: u32;
    const ZERO: Self;
    const ONE: Self;

    fn count_ones(self) -> u32;
}

impl Word for u32 {
    const BITLENGTH: u32 = 32;
    const ZERO: Self = 0;
    const ONE: Self = 1;

    #[inline(always)]
    fn count_ones(self) -> u32 {
        u32::count_ones(self)
    }
}

impl Word for u64 {
    const BITLENGTH: u32 = 64;
    const ZERO: Self = 0;
    const ONE: Self = 1;

    #[inline(always)]
    fn count_ones(self) -> u32 {
        u64::count_ones(self)
    }
}

/// Precomputed sectorization geometry for one block, plus the (optional)
/// within-block word-selection width for multi-word ("zoned") blocks.
///
/// `word_cnt_per_block == 1` recovers the source project's original
/// single-word-block formula exactly; larger values are this crate's
/// generalization to multi-word blocks (see `SPEC_FULL.md` §3).
#[derive(Debug, Clone, Copy)]
pub struct BlockLayout {
    k: u32,
    word_bitlength: u32,
    word_cnt_per_block: u32,
    word_sel_bits: u32,
    sector_cnt: u32,
    sector_bitlength: u32,
    sector_bitlength_log2: u32,
    sector_mask: u32,
}

impl BlockLayout {
    /// Builds the layout for `k` probes per block, each block spanning
    /// `word_cnt_per_block` words of `word_bitlength` bits, optionally
    /// sectorized.
    pub fn new(
        k: u32,
        sectorized: bool,
        word_bitlength: u32,
        word_cnt_per_block: u32,
    ) -> Result<Self, FilterError> {
        if k == 0 || k > 16 {
            return Err(FilterError::KOutOfBounds { k });
        }
        debug_assert!(word_bitlength == 32 || word_bitlength == 64);
        debug_assert!(is_power_of_two(word_cnt_per_block));

        let sector_cnt = if sectorized {
            let divisor = word_bitlength / next_power_of_two(k);
            if divisor == 0 {
                return Err(FilterError::KOutOfBounds { k });
            }
            word_bitlength / divisor
        } else {
            1
        };
        let sector_bitlength = word_bitlength / sector_cnt;
        let sector_bitlength_log2 = log2_u32(sector_bitlength);
        let word_sel_bits = log2_u32(word_cnt_per_block);

        Ok(Self {
            k,
            word_bitlength,
            word_cnt_per_block,
            word_sel_bits,
            sector_cnt,
            sector_bitlength,
            sector_bitlength_log2,
            sector_mask: sector_bitlength - 1,
        })
    }

    #[inline(always)]
    #[must_use]
    pub fn k(&self) -> u32 {
        self.k
    }

    #[inline(always)]
    #[must_use]
    pub fn sector_cnt(&self) -> u32 {
        self.sector_cnt
    }

    #[inline(always)]
    #[must_use]
    pub fn word_sel_bits(&self) -> u32 {
        self.word_sel_bits
    }

    #[inline(always)]
    #[must_use]
    pub fn sector_bitlength_log2(&self) -> u32 {
        self.sector_bitlength_log2
    }

    /// Total hash bits this layout consumes, beyond the addressing-bit
    /// slice: one word-selection slice (if zoned) plus `k` sector slices.
    #[inline(always)]
    #[must_use]
    pub fn hash_bits_consumed(&self) -> u32 {
        self.word_sel_bits + self.k * self.sector_bitlength_log2
    }

    /// Selects the within-block word index from the hash bits immediately
    /// following `addressing_bits`. Zero when `word_cnt_per_block == 1`.
    #[inline(always)]
    #[must_use]
    pub fn word_select(&self, hash: u32, addressing_bits: u32) -> u32 {
        if self.word_sel_bits == 0 {
            return 0;
        }
        let shift = 32 - addressing_bits - self.word_sel_bits;
        (hash >> shift) & (self.word_cnt_per_block - 1)
    }

    /// Builds the `k`-bit-set word for one block/word, given the hash and
    /// the number of bits already consumed before the first sector slice
    /// (`addressing_bits + word_sel_bits`).
    #[inline(always)]
    #[must_use]
    pub fn select_bits<W: Word>(&self, hash: u32, bits_before_sectors: u32) -> W {
        let mut word = W::ZERO;
        for i in 0..self.k {
            let shift = 32 - bits_before_sectors - (i + 1) * self.sector_bitlength_log2;
            let bit_idx = (hash >> shift) & self.sector_mask;
            let sector_offset = (i * self.sector_bitlength) & (self.word_bitlength - 1);
            word |= W::ONE << (bit_idx + sector_offset);
        }
        word
    }
}
