use collatz_orbit::*;
use num_bigint::BigInt;
use rstest::rstest;

fn collatz() -> Params {
    Params::default()
}

fn quiet() -> ScanSettings {
    ScanSettings::default()
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(8)]
fn test_leg_census_sum_equals_range(#[case] exponent: i32) {
    let census = leg_census::<i64>(exponent, &collatz(), &quiet(), |_| {}).unwrap();
    assert_eq!(census.total(), census.range as u64);
    assert!(census.tree.node_count() as u64 <= census.total());
    assert_eq!(census.skipped, 0);
}

#[test]
fn test_distinct_keys_give_node_count_equal_insertions() {
    let mut tree = FrequencyTree::new();
    for n in 0..100u64 {
        tree.insert(n * 7 % 101).unwrap();
    }
    assert_eq!(tree.node_count(), 100);
    assert_eq!(tree.traverse(Order::Ascending), 100);
}

#[test]
fn test_factor_census() {
    let census = factor_census::<i64>(6, &collatz(), &quiet(), |_| {}).unwrap();
    assert_eq!(census.range, 192);
    // 偶数は全て経路因子数 1、1 (mod 4) は 2
    assert_eq!(census.tree.search(&1), 96);
    assert_eq!(census.tree.search(&2), 48);
    assert_eq!(census.total(), 192);
}

#[test]
fn test_orbit_census_matches_leg_census() {
    let params = collatz();
    let orbits = orbit_census::<i64>(6, &params, &quiet(), |_| {}).unwrap();
    let legs = leg_census::<i64>(6, &params, &quiet(), |_| {}).unwrap();

    let mut by_len = FrequencyTree::new();
    for (orbit, count) in orbits.tree.iter() {
        for _ in 0..count {
            by_len.insert(orbit.len()).unwrap();
        }
    }
    let a: Vec<(usize, u64)> = by_len.iter().map(|(k, c)| (*k, c)).collect();
    let b: Vec<(usize, u64)> = legs.tree.iter().map(|(k, c)| (*k, c)).collect();
    assert_eq!(a, b);
}

#[test]
fn test_visit_suppressed_for_large_exponent() {
    let scan = ScanSettings {
        suppress_exponent: 3,
        ..ScanSettings::default()
    };
    let mut visited = 0;
    leg_census::<i64>(4, &collatz(), &scan, |_| visited += 1).unwrap();
    assert_eq!(visited, 0);

    let mut visited = 0;
    leg_census::<i64>(3, &collatz(), &scan, |_| visited += 1).unwrap();
    assert_eq!(visited, 24);
}

#[test]
fn test_convergent_classes_found() {
    let census = convergent_classes::<i64>(5, &collatz(), &quiet(), |_| {}).unwrap();
    let counted: u64 = census
        .by_length
        .iter()
        .map(|t| t.traverse(Order::Ascending))
        .sum();
    assert_eq!(counted, census.found);
    assert!(census.found <= census.range as u64);
    // 長さ n の同値類文字列は符号と n 個の記号からなる
    for (len, tree) in census.by_length.iter().enumerate() {
        for (class, _) in tree.iter() {
            assert_eq!(class.len(), len + 1, "class {} in bucket {}", class, len);
        }
    }
}

#[test]
fn test_convergent_paths_speed_matches_full() {
    let params = collatz();
    let full = convergent_paths::<i64>(15, &params, &quiet(), |_| {}).unwrap();
    let fast_scan = ScanSettings {
        speed: true,
        ..ScanSettings::default()
    };
    let fast = convergent_paths::<i64>(15, &params, &fast_scan, |_| {}).unwrap();

    assert!(!full.speed);
    assert!(fast.speed);
    assert_eq!(fast.extrapolated_even, full.range as u64 / 2);
    assert_eq!(fast.extrapolated_single, full.range as u64 / 4);
    assert_eq!(fast.total(), full.total());

    // 3 (mod 4) の部分は両方で同じ
    for len in 3..full.by_length.len() {
        assert_eq!(
            full.by_length[len].traverse(Order::Ascending),
            fast.by_length[len].traverse(Order::Ascending),
            "length {}",
            len
        );
    }
}

#[test]
fn test_speed_not_applied_for_short_paths() {
    let scan = ScanSettings {
        speed: true,
        ..ScanSettings::default()
    };
    let census = convergent_paths::<i64>(6, &collatz(), &scan, |_| {}).unwrap();
    assert!(!census.speed);
    assert_eq!(census.extrapolated_even, 0);
}

#[test]
fn test_convergent_paths_bigint_agrees() {
    let params = collatz();
    let small = convergent_paths::<i64>(8, &params, &quiet(), |_| {}).unwrap();
    let big = convergent_paths::<BigInt>(8, &params, &quiet(), |_| {}).unwrap();
    assert_eq!(small.total(), big.total());
    assert_eq!(BigInt::from(small.max), big.max);
}

#[test]
fn test_negative_range() {
    let census = leg_census::<i64>(-5, &collatz(), &quiet(), |_| {}).unwrap();
    assert_eq!(census.range, 96);
    assert_eq!(census.total(), 96);
}

#[test]
fn test_range_too_large() {
    let err = leg_census::<i64>(62, &collatz(), &quiet(), |_| {}).unwrap_err();
    assert!(matches!(err, ScanError::RangeTooLarge { .. }));
}
