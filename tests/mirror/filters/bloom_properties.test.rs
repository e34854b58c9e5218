/**
 * =================================================================
 * APARATO: BLOOM FILTER PROPERTY SUITE (V1.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar las propiedades universales de los filtros
 *           Bloom bloqueado y estandar a traves de la API publica.
 * =================================================================
 */

use zenith_core_filters::bloom::{BlockedBloomFilter, StandardBloomFilter};
use zenith_core_filters::{AddressingMode, FilterError, SipHashFn};

type Blocked = BlockedBloomFilter<u64, SipHashFn, u64>;
type Standard = StandardBloomFilter<u64, SipHashFn>;

#[test]
fn certify_no_false_negatives_across_both_variants() {
    let keys: Vec<u64> = (0..5_000).collect();

    let mut blocked = Blocked::new(1 << 18, 6, true, AddressingMode::Dynamic).unwrap();
    blocked.batch_insert(&keys);
    for key in &keys {
        assert!(blocked.contains(key), "blocked filter lost key {key}");
    }

    let mut standard = Standard::new(1 << 18, 6, AddressingMode::Dynamic).unwrap();
    standard.batch_insert(&keys);
    for key in &keys {
        assert!(standard.contains(key), "standard filter lost key {key}");
    }

    println!("✅ BLOOM_PROPERTIES: No false negatives across 5000 keys, both variants.");
}

#[test]
fn certify_construction_rejects_zero_length_and_bad_k() {
    assert!(matches!(
        Blocked::new(0, 4, false, AddressingMode::PowerOfTwo),
        Err(FilterError::ZeroLength)
    ));
    assert!(matches!(
        Standard::new(0, 4, AddressingMode::PowerOfTwo),
        Err(FilterError::ZeroLength)
    ));
    assert!(Blocked::new(4096, 0, false, AddressingMode::PowerOfTwo).is_err());
    assert!(Standard::new(4096, 17, AddressingMode::PowerOfTwo).is_err());

    println!("✅ BLOOM_PROPERTIES: Construction-time validation rejects malformed requests.");
}

#[test]
fn certify_batch_contains_positions_align_with_scalar_contains() {
    let mut blocked = Blocked::new(1 << 12, 5, true, AddressingMode::Magic).unwrap();
    let present = [10u64, 20, 30, 40, 50];
    blocked.batch_insert(&present);

    let probe = [1u64, 10, 2, 20, 3, 30, 4, 40, 5, 50];
    let mut positions = [0u32; 10];
    let count = blocked.batch_contains(&probe, &mut positions, 0);

    let mut expected = Vec::new();
    for (i, key) in probe.iter().enumerate() {
        if blocked.contains(key) {
            expected.push(i as u32);
        }
    }
    assert_eq!(count as usize, expected.len());
    assert_eq!(&positions[..expected.len()], expected.as_slice());

    println!("✅ BLOOM_PROPERTIES: batch_contains matches the scalar reference, in order.");
}

#[test]
fn certify_false_positive_rate_stays_reasonable_under_load() {
    let mut standard = Standard::new(1 << 16, 7, AddressingMode::PowerOfTwo).unwrap();
    let inserted: Vec<u64> = (0..4_000).map(|i| i * 2_654_435_761u64).collect();
    standard.batch_insert(&inserted);

    let mut false_positives = 0u32;
    let probes = 50_000u64;
    for i in 0..probes {
        let candidate = (i + 1) * 40_503u64 + 11;
        if !inserted.contains(&candidate) && standard.contains(&candidate) {
            false_positives += 1;
        }
    }
    let observed_fpr = f64::from(false_positives) / probes as f64;
    assert!(observed_fpr < 0.05, "observed FPR {observed_fpr} exceeded the expected bound");

    println!("✅ BLOOM_PROPERTIES: Observed FPR {observed_fpr:.4} within bound.");
}
