//! The "standard" (unblocked) Bloom filter: `k` independent re-hashes, one
//! word-wide probe each, instead of the blocked variant's single hash call
//! bit-sliced into a block.
//!
//! Grounded on the source project's `bloom_filter_std` template. Unlike
//! `BlockedBloomFilter`, the word width is fixed at 32 bits (the source
//! hard-codes `word_t = uint32_t` here) and a "block" is exactly one word —
//! there is no zoning. This is also the only variant the source exposes a
//! `simd_contains` for, so the L4 batch-probe pipeline lives here.

use tracing::debug;

use crate::addressing::{AddressingMode, BlockAddressing};
use crate::errors::FilterError;
use crate::hash::HashFn;
use crate::simd::{LaneMask, LaneVector, LANES};

/// Bits needed to index a bit within one 32-bit word.
const WORD_BITLENGTH: u32 = 32;
const WORD_BITLENGTH_LOG2: u32 = 5;
const WORD_MASK: u32 = (1 << WORD_BITLENGTH_LOG2) - 1;

/// A standard (unblocked) Bloom filter over keys of type `K`, hashed by `H`.
pub struct StandardBloomFilter<K, H> {
    addressing: BlockAddressing,
    k: u32,
    words: Vec<u32>,
    _marker: std::marker::PhantomData<fn(&K, &H)>,
}

impl<K, H> StandardBloomFilter<K, H> {
    /// Builds a filter of at least `desired_bit_length` bits with `k`
    /// independent probes per key.
    pub fn new(
        desired_bit_length: u64,
        k: u32,
        mode: AddressingMode,
    ) -> Result<Self, FilterError> {
        if desired_bit_length == 0 {
            return Err(FilterError::ZeroLength);
        }
        if k == 0 || k > 16 {
            return Err(FilterError::KOutOfBounds { k });
        }

        let desired_block_cnt =
            ((desired_bit_length + u64::from(WORD_BITLENGTH) - 1) / u64::from(WORD_BITLENGTH)) as u32;
        let addressing = BlockAddressing::new(desired_block_cnt, mode);
        let addressing_bits = addressing.required_addressing_bits();
        if addressing_bits > 32 {
            return Err(FilterError::InsufficientHashBits {
                addressing_bits,
                k,
                bits_per_probe: 0,
                total_required: addressing_bits,
                hash_value_bitlength: 32,
            });
        }

        let word_cnt = addressing.block_count() as usize;
        debug!(
            word_cnt,
            k,
            resolved_mode = ?addressing.resolved_mode(),
            "constructed standard bloom filter"
        );

        Ok(Self {
            addressing,
            k,
            words: vec![0u32; word_cnt],
            _marker: std::marker::PhantomData,
        })
    }

    /// Per the source's `get_word_idx`/bit-index derivation: `bit_idx` is
    /// carved from the *same* top `addressing_bits` slice of the hash used
    /// for block selection, masked down to 5 bits (`log2(32)`), rather than
    /// a disjoint slice. This is Open Question (a) in `SPEC_FULL.md` §9,
    /// resolved in favor of faithfully reproducing the source's
    /// entropy-sharing behavior.
    #[inline(always)]
    fn locate(&self, hash: u32) -> (usize, u32) {
        let addressing_bits = self.addressing.required_addressing_bits();
        let word_idx = self.addressing.block_index(hash) as usize;
        let bit_idx = (hash >> (WORD_BITLENGTH - addressing_bits)) & WORD_MASK;
        (word_idx, bit_idx)
    }

    /// Inserts `key`, setting one bit per probe across `k` independent
    /// re-hashes (`seed = 0..k`).
    pub fn insert(&mut self, key: &K)
    where
        H: HashFn<K>,
    {
        for current_k in 0..self.k {
            let hash = H::hash(key, current_k);
            let (word_idx, bit_idx) = self.locate(hash);
            self.words[word_idx] |= 1u32 << bit_idx;
        }
    }

    /// `true` iff every one of the `k` probe bits is set.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool
    where
        H: HashFn<K>,
    {
        for current_k in 0..self.k {
            let hash = H::hash(key, current_k);
            let (word_idx, bit_idx) = self.locate(hash);
            if self.words[word_idx] & (1u32 << bit_idx) == 0 {
                return false;
            }
        }
        true
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
    /// `match_offset`, via the same branchless increment as the blocked
    /// variant. Returns the number written.
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

    /// Lane-parallel `contains` over exactly `LANES` (8) keys at once, with
    /// lane-wise early exit once every lane has a definitive miss (L4).
    ///
    /// Ordering guarantee: lanes are independent and processed in lockstep
    /// within this call; the returned mask's lane `i` corresponds to
    /// `keys[i]`.
    #[must_use]
    pub fn simd_contains(&self, keys: &[K; LANES]) -> LaneMask
    where
        H: HashFn<K>,
    {
        let addressing_bits = self.addressing.required_addressing_bits();
        let bit_shift = WORD_BITLENGTH - addressing_bits;

        let hash_vec = LaneVector::from_array(H::hash_vec(keys, 0));
        let word_idx_vec = self.addressing.block_index_vec(hash_vec);
        let bit_idx_vec = hash_vec.shr(bit_shift).bitand(WORD_MASK);
        let loaded = word_idx_vec.gather(&self.words);

        let mut exec_mask = LaneMask::all_false();
        for lane in 0..LANES {
            let bit = 1u32 << bit_idx_vec.lane(lane);
            exec_mask.set_lane(lane, loaded[lane] & bit != 0);
        }
        if exec_mask.none() {
            return exec_mask;
        }

        for current_k in 1..self.k {
            let hash_vec = LaneVector::from_array(H::hash_vec(keys, current_k));
            let word_idx_vec = self.addressing.block_index_vec(hash_vec);
            let loaded = word_idx_vec.masked_gather(&self.words, exec_mask);
            let bit_idx_vec = hash_vec.shr(bit_shift).bitand(WORD_MASK);

            for lane in 0..LANES {
                if exec_mask.lane(lane) {
                    let bit = 1u32 << bit_idx_vec.lane(lane);
                    exec_mask.set_lane(lane, loaded[lane] & bit != 0);
                }
            }
            if exec_mask.none() {
                return exec_mask;
            }
        }
        exec_mask
    }

    #[inline(always)]
    #[must_use]
    pub fn length_bits(&self) -> u64 {
        self.words.len() as u64 * u64::from(WORD_BITLENGTH)
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
