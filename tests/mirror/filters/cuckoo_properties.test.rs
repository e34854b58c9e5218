/**
 * =================================================================
 * APARATO: CUCKOO FILTER PROPERTY SUITE (V1.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar insercion con kick-out, ausencia de falsos
 *           negativos, y el manejo de duplicados/desbordamiento del
 *           filtro Cuckoo residente en linea de cache.
 * =================================================================
 */

use zenith_core_filters::{CuckooFilter, CuckooInsertOutcome, SipHashFn};

type Filter = CuckooFilter<u64, SipHashFn>;

#[test]
fn certify_inserted_keys_are_always_found() {
    let mut filter = Filter::new(2_000).unwrap();
    let keys: Vec<u64> = (0..1_500).collect();

    let mut overflowed = 0u32;
    for key in &keys {
        if matches!(filter.insert(key), CuckooInsertOutcome::Overflowed) {
            overflowed += 1;
        }
    }
    assert!(
        overflowed < keys.len() as u32 / 20,
        "too many overflows: {overflowed}/{}",
        keys.len()
    );

    for key in &keys {
        assert!(filter.contains(key), "missing key {key} after insertion");
    }

    println!("✅ CUCKOO_PROPERTIES: {}/{} keys inserted without overflow.", keys.len() as u32 - overflowed, keys.len());
}

#[test]
fn certify_repeated_insert_reports_duplicate_not_a_second_slot() {
    let mut filter = Filter::new(256).unwrap();
    assert_eq!(filter.insert(&7_777u64), CuckooInsertOutcome::Inserted);
    for _ in 0..5 {
        assert_eq!(filter.insert(&7_777u64), CuckooInsertOutcome::Duplicate);
    }
    assert!(filter.contains(&7_777u64));

    println!("✅ CUCKOO_PROPERTIES: Duplicate re-insertion is a no-op, not a fresh slot.");
}

#[test]
fn certify_absent_keys_rarely_produce_false_positives() {
    let mut filter = Filter::new(2_000).unwrap();
    let inserted: Vec<u64> = (0..1_000).map(|i| i * 2 + 1).collect();
    for key in &inserted {
        filter.insert(key);
    }

    let mut false_positives = 0u32;
    let probes = 20_000u64;
    for i in 0..probes {
        let candidate = i * 2; // disjoint from the inserted odd keys
        if filter.contains(&candidate) {
            false_positives += 1;
        }
    }
    let observed_fpr = f64::from(false_positives) / probes as f64;
    assert!(observed_fpr < 0.05, "observed FPR {observed_fpr} exceeded the expected bound");

    println!("✅ CUCKOO_PROPERTIES: Observed FPR {observed_fpr:.4} on disjoint probes.");
}

#[test]
fn certify_batch_contains_matches_scalar_reference() {
    let mut filter = Filter::new(512).unwrap();
    let present = [100u64, 200, 300];
    for key in &present {
        filter.insert(key);
    }

    let probe = [1u64, 100, 2, 200, 3, 300, 4];
    let mut positions = [0u32; 7];
    let count = filter.batch_contains(&probe, &mut positions, 0);

    let expected: Vec<u32> = probe
        .iter()
        .enumerate()
        .filter(|(_, k)| filter.contains(k))
        .map(|(i, _)| i as u32)
        .collect();

    assert_eq!(count as usize, expected.len());
    assert_eq!(&positions[..expected.len()], expected.as_slice());

    println!("✅ CUCKOO_PROPERTIES: batch_contains matches the scalar reference, in order.");
}

#[test]
fn certify_capacity_hint_grows_segment_count_not_just_one_cacheline() {
    let small = Filter::new(16).unwrap();
    let large = Filter::new(10_000).unwrap();
    assert!(large.segment_count() > small.segment_count());
    assert!(large.capacity() >= 10_000);

    println!(
        "✅ CUCKOO_PROPERTIES: segment_count scales with capacity_hint ({} -> {}).",
        small.segment_count(),
        large.segment_count()
    );
}
