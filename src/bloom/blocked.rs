//! The blocked Bloom filter: one hash call per key, bit-sliced into `k`
//! (optionally sectorized) positions within a single addressed block.
//!
//! Grounded on the source project's `bloomfilter` template
//! (`word_cnt_per_block == 1`, "one word = one block"), generalized to
//! `word_cnt_per_block > 1` ("zoned" blocks) per `SPEC_FULL.md` §3.

use std::marker::PhantomData;

use tracing::debug;

use crate::addressing::{AddressingMode, BlockAddressing};
use crate::block::{BlockLayout, Word};
use crate::errors::FilterError;
use crate::hash::HashFn;

/// A blocked Bloom filter over keys of type `K`, hashed by `H`, backed by an
/// array of words of type `W` (default `u64`).
pub struct BlockedBloomFilter<K, H, W = u64> {
    addressing: BlockAddressing,
    layout: BlockLayout,
    word_cnt_per_block: u32,
    words: Vec<W>,
    _marker: PhantomData<fn(&K, &H)>,
}

impl<K, H, W: Word> BlockedBloomFilter<K, H, W> {
    /// Builds a filter with `block_bitlength == word_bitlength` (no zoning),
    /// matching the source project's `bloomfilter` template directly.
    pub fn new(
        desired_bit_length: u64,
        k: u32,
        sectorized: bool,
        mode: AddressingMode,
    ) -> Result<Self, FilterError> {
        Self::with_zoning(desired_bit_length, k, sectorized, mode, 1)
    }

    /// Builds a filter whose blocks span `word_cnt_per_block` words (a power
    /// of two); `word_cnt_per_block == 1` is the non-zoned case above.
    pub fn with_zoning(
        desired_bit_length: u64,
        k: u32,
        sectorized: bool,
        mode: AddressingMode,
        word_cnt_per_block: u32,
    ) -> Result<Self, FilterError> {
        if desired_bit_length == 0 {
            return Err(FilterError::ZeroLength);
        }

        let word_bitlength = W::BITLENGTH;
        let block_bitlength = word_bitlength * word_cnt_per_block;
        let layout = BlockLayout::new(k, sectorized, word_bitlength, word_cnt_per_block)?;
        let hash_bits_consumed = layout.hash_bits_consumed();
        if hash_bits_consumed >= 32 {
            return Err(FilterError::InsufficientHashBits {
                addressing_bits: 0,
                k,
                bits_per_probe: layout.sector_bitlength_log2(),
                total_required: hash_bits_consumed,
                hash_value_bitlength: 32,
            });
        }

        let remaining = 32 - hash_bits_consumed;
        let max_m = (1u64 << remaining) * block_bitlength as u64;
        let desired_block_cnt =
            ((desired_bit_length + block_bitlength as u64 - 1) / block_bitlength as u64) as u32;
        let addressing = BlockAddressing::new(desired_block_cnt, mode);
        let addressing_bits = addressing.required_addressing_bits();
        let total_required = addressing_bits + hash_bits_consumed;
        if total_required > 32 {
            return Err(FilterError::InsufficientHashBits {
                addressing_bits,
                k,
                bits_per_probe: layout.sector_bitlength_log2(),
                total_required,
                hash_value_bitlength: 32,
            });
        }

        let block_cnt = u64::from(addressing.block_count());
        let total_bits = block_cnt * u64::from(block_bitlength);
        if total_bits > max_m {
            return Err(FilterError::LengthExceedsMax {
                requested: desired_bit_length,
                max_m,
                k,
                sectorized,
            });
        }

        let word_cnt = (block_cnt * u64::from(word_cnt_per_block)) as usize;
        debug!(
            block_cnt,
            word_cnt_per_block,
            k,
            sectorized,
            resolved_mode = ?addressing.resolved_mode(),
            "constructed blocked bloom filter"
        );

        Ok(Self {
            addressing,
            layout,
            word_cnt_per_block,
            words: vec![W::ZERO; word_cnt],
            _marker: PhantomData,
        })
    }

    #[inline(always)]
    fn locate(&self, hash: u32) -> (usize, u32) {
        let addressing_bits = self.addressing.required_addressing_bits();
        let block_idx = self.addressing.block_index(hash);
        let word_sel = self.layout.word_select(hash, addressing_bits);
        let word_idx = block_idx * self.word_cnt_per_block + word_sel;
        (word_idx as usize, addressing_bits + self.layout.word_sel_bits())
    }

    /// Inserts `key`, setting `k` bits across the addressed block.
    pub fn insert(&mut self, key: &K)
    where
        H: HashFn<K>,
    {
        let hash = H::hash(key, 0);
        let (word_idx, bits_before_sectors) = self.locate(hash);
        let mask: W = self.layout.select_bits(hash, bits_before_sectors);
        self.words[word_idx] |= mask;
    }

    /// `true` iff every bit `insert(key)` would set is already set.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool
    where
        H: HashFn<K>,
    {
        let hash = H::hash(key, 0);
        let (word_idx, bits_before_sectors) = self.locate(hash);
        let mask: W = self.layout.select_bits(hash, bits_before_sectors);
        (self.words[word_idx] & mask) == mask
    }

    /// Inserts every key in `keys`.
    pub fn batch_insert(&mut self, keys: &[K])
    where
        H: HashFn<K>,
    {
        for key in keys {
            self.insert(key);
        }
    }

    /// Writes the indices of matching keys into `match_positions`, offset by
    /// `match_offset`, using a branchless increment so the written prefix is
    /// exactly the matches, in input order. Returns the number written.
    pub fn batch_contains(
        &self,
        keys: &[K],
        match_positions: &mut [u32],
        match_offset: u32,
    ) -> u64
    where
        H: HashFn<K>,
    {
        assert!(match_positions.len() >= keys.len());
        let mut write_pos: usize = 0;
        for (j, key) in keys.iter().enumerate() {
            let is_contained = self.contains(key) as usize;
            match_positions[write_pos] = j as u32 + match_offset;
            write_pos += is_contained;
        }
        write_pos as u64
    }

    #[inline(always)]
    #[must_use]
    pub fn length_bits(&self) -> u64 {
        self.words.len() as u64 * u64::from(W::BITLENGTH)
    }

    #[inline(always)]
    #[must_use]
    pub fn block_count(&self) -> u32 {
        self.addressing.block_count()
    }

    #[inline(always)]
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn popcount(&self) -> u64 {
        self.words.iter().map(|w| u64::from(w.count_ones())).sum()
    }

    #[must_use]
    pub fn load_factor(&self) -> f64 {
        self.popcount() as f64 / self.length_bits() as f64
    }
}
