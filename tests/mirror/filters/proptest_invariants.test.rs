/**
 * =================================================================
 * APARATO: UNIVERSAL PROPERTY SUITE (PROPTEST)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar, via generacion aleatoria de casos, las
 *           propiedades universales que deben sostenerse para
 *           cualquier secuencia de claves y configuracion valida.
 * =================================================================
 */

use proptest::array::uniform8;
use proptest::collection::{hash_set, vec as prop_vec};
use proptest::prelude::*;

use zenith_core_filters::addressing::BlockAddressing;
use zenith_core_filters::bloom::{BlockedBloomFilter, StandardBloomFilter};
use zenith_core_filters::{AddressingMode, SipHashFn};

type Blocked = BlockedBloomFilter<u64, SipHashFn, u64>;
type Standard = StandardBloomFilter<u64, SipHashFn>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn addressing_mode_strategy() -> impl Strategy<Value = AddressingMode> {
    prop_oneof![
        Just(AddressingMode::PowerOfTwo),
        Just(AddressingMode::Magic),
        Just(AddressingMode::Dynamic),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property 1 (spec.md §8): for any key sequence, every inserted key is
    /// found afterward — a Bloom filter must never false-negative.
    #[test]
    fn no_false_negatives_blocked(
        keys in hash_set(0u64..1_000_000, 1..2_000),
        mode in addressing_mode_strategy(),
    ) {
        init_tracing();
        let keys: Vec<u64> = keys.into_iter().collect();
        let mut filter = Blocked::new(1 << 16, 5, true, mode).unwrap();
        filter.batch_insert(&keys);
        for key in &keys {
            prop_assert!(filter.contains(key), "blocked filter lost key {key}");
        }
    }

    #[test]
    fn no_false_negatives_standard(
        keys in hash_set(0u64..1_000_000, 1..2_000),
        mode in addressing_mode_strategy(),
    ) {
        init_tracing();
        let keys: Vec<u64> = keys.into_iter().collect();
        let mut filter = Standard::new(1 << 16, 5, mode).unwrap();
        filter.batch_insert(&keys);
        for key in &keys {
            prop_assert!(filter.contains(key), "standard filter lost key {key}");
        }
    }

    /// Property 2: inserting the same key twice must be bit-for-bit
    /// identical to inserting it once.
    #[test]
    fn idempotent_insert_blocked(key in any::<u64>(), mode in addressing_mode_strategy()) {
        let mut once = Blocked::new(4096, 4, true, mode).unwrap();
        let mut twice = Blocked::new(4096, 4, true, mode).unwrap();
        once.insert(&key);
        twice.insert(&key);
        twice.insert(&key);
        prop_assert_eq!(once.popcount(), twice.popcount());
    }

    /// Property 3: block_index(hash) is always within [0, block_count).
    #[test]
    fn block_index_always_in_range(
        hash in any::<u32>(),
        desired in 2u32..100_000,
        mode in addressing_mode_strategy(),
    ) {
        let addressing = BlockAddressing::new(desired, mode);
        prop_assert!(addressing.block_index(hash) < addressing.block_count());
    }

    /// Property 5: the SIMD batch-probe pipeline must agree with the scalar
    /// `contains` lane-by-lane, for every lane, regardless of which keys
    /// happen to be present.
    #[test]
    fn simd_contains_agrees_with_scalar_per_lane(
        present in hash_set(0u64..100_000, 0..500),
        probe in uniform8(0u64..100_000),
        mode in addressing_mode_strategy(),
    ) {
        let present: Vec<u64> = present.into_iter().collect();
        let mut filter = Standard::new(1 << 13, 4, mode).unwrap();
        filter.batch_insert(&present);

        let mask = filter.simd_contains(&probe);
        for (lane, key) in probe.iter().enumerate() {
            prop_assert_eq!(mask.lane(lane), filter.contains(key));
        }
    }

    /// Property 6: batch_contains' returned count and written prefix must
    /// exactly equal the scalar-derived matching positions, offset-shifted,
    /// in input order.
    #[test]
    fn batch_contains_output_matches_scalar_reference(
        present in hash_set(0u64..10_000, 0..200),
        probe in prop_vec(0u64..10_000, 1..64),
        offset in 0u32..1_000,
    ) {
        let present: Vec<u64> = present.into_iter().collect();
        let mut filter = Blocked::new(1 << 14, 4, true, AddressingMode::Dynamic).unwrap();
        filter.batch_insert(&present);

        let mut out = vec![0u32; probe.len()];
        let count = filter.batch_contains(&probe, &mut out, offset);

        let expected: Vec<u32> = probe
            .iter()
            .enumerate()
            .filter(|(_, k)| filter.contains(k))
            .map(|(i, _)| i as u32 + offset)
            .collect();

        prop_assert_eq!(count as usize, expected.len());
        prop_assert_eq!(&out[..expected.len()], expected.as_slice());
    }
}
