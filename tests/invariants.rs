use std::collections::HashSet;

use clonepairs::capacity::choose2;
use clonepairs::data::PairMeta;
use clonepairs::verify::group_prefix;
use clonepairs::{
    CloneGroup, FunctionRecord, GroupStore, IdCounter, PairLabel, PairSampler, PairsError,
    SamplerConfig, assign_func_ids, pair_key,
};

fn record(name: &str) -> FunctionRecord {
    serde_json::from_value(serde_json::json!({
        "file": format!("src/main/java/{name}.java"),
        "range": "1-10",
        "nlines": 10,
        "qualified_name": name,
        "code": format!("int {name}() {{ return 1; }}"),
    }))
    .unwrap()
}

fn corpus(sizes: &[usize]) -> GroupStore {
    let groups = sizes.iter().enumerate().map(|(group_idx, &size)| {
        let sources = (0..size)
            .map(|member| record(&format!("g{group_idx}m{member}")))
            .collect();
        CloneGroup::new((group_idx + 1).to_string(), sources)
    });
    let mut store = GroupStore::from_groups(groups);
    assign_func_ids(&mut store, &mut IdCounter::new());
    store
}

fn ids(pair: &clonepairs::Pair) -> (String, String) {
    (
        pair.func1.func_id().unwrap().to_string(),
        pair.func2.func_id().unwrap().to_string(),
    )
}

const SIZES: &[usize] = &[4, 1, 3, 6, 2, 1, 5];

#[test]
fn positive_pairs_stay_within_groups_without_duplicates() {
    let store = corpus(SIZES);
    let capacity: u128 = SIZES.iter().map(|&n| choose2(n as u128)).sum();
    for seed in 0..12u64 {
        for max_pairs in [0usize, 1, 7, 20, 1000] {
            let config = SamplerConfig {
                seed,
                max_pairs,
                ..SamplerConfig::default()
            };
            let outcome = PairSampler::new(&store, config).positive_pairs().unwrap();
            assert_eq!(outcome.capacity, capacity);
            let expected = if max_pairs == 0 {
                capacity as usize
            } else {
                max_pairs.min(capacity as usize)
            };
            assert_eq!(outcome.pairs.len(), expected);
            assert_eq!(outcome.clamp.is_some(), max_pairs as u128 > capacity);

            let mut keys = HashSet::new();
            for pair in &outcome.pairs {
                assert_eq!(pair.label, PairLabel::Positive);
                let (a, b) = ids(pair);
                assert_ne!(a, b);
                assert_eq!(group_prefix(&a), group_prefix(&b));
                match &pair.meta {
                    PairMeta::Same { classid } => {
                        assert_eq!(group_prefix(&a), Some(classid.as_str()))
                    }
                    other => panic!("unexpected meta {other:?}"),
                }
                assert!(keys.insert(pair_key(&pair.func1, &pair.func2)));
            }
        }
    }
}

#[test]
fn negative_pairs_cross_groups_and_account_for_shortfall() {
    let store = corpus(SIZES);
    let capacity = store.capacity();
    for seed in 0..12u64 {
        for target in [None, Some(1), Some(25), Some(10_000)] {
            let config = SamplerConfig {
                seed,
                negative_target: target,
                ..SamplerConfig::default()
            };
            let outcome = PairSampler::new(&store, config).negative_pairs().unwrap();
            assert!(outcome.pairs.len() as u128 <= capacity.negative);
            assert_eq!(outcome.pairs.len() + outcome.shortfall, outcome.target);
            assert!(outcome.attempts <= outcome.max_attempts);
            if let Some(requested) = target {
                assert_eq!(outcome.clamp.is_some(), requested as u128 > capacity.negative);
            }

            let mut keys = HashSet::new();
            for pair in &outcome.pairs {
                assert_eq!(pair.label, PairLabel::Negative);
                let (a, b) = ids(pair);
                assert_ne!(group_prefix(&a), group_prefix(&b));
                assert!(keys.insert(pair_key(&pair.func1, &pair.func2)));
            }
        }
    }
}

#[test]
fn func_ids_are_unique_and_increase_in_traversal_order() {
    let store = corpus(SIZES);
    let mut seen = HashSet::new();
    let mut previous: Option<u64> = None;
    for group in store.groups() {
        for source in &group.sources {
            let id = source.func_id().unwrap();
            assert!(seen.insert(id.to_string()));
            let (prefix, suffix) = id.split_once('_').unwrap();
            assert_eq!(prefix, group.classid);
            let index: u64 = suffix.parse().unwrap();
            if let Some(prev) = previous {
                assert!(index > prev);
            }
            previous = Some(index);
        }
    }
    assert_eq!(seen.len(), store.total_functions());
}

#[test]
fn two_group_scenario_matches_expected_capacities() {
    let store = corpus(&[3, 2]);
    assert_eq!(store.total_functions(), 5);
    assert_eq!(store.total_positive_capacity(), 4);
    let capacity = store.capacity();
    assert_eq!(capacity.total_possible_pairs, 10);
    assert_eq!(capacity.negative, 6);

    let sampler = PairSampler::new(&store, SamplerConfig::default());
    let positives = sampler.positive_pairs().unwrap();
    let produced: HashSet<(String, String)> = positives.pairs.iter().map(ids).collect();
    let expected: HashSet<(String, String)> = [
        ("1_0", "1_1"),
        ("1_0", "1_2"),
        ("1_1", "1_2"),
        ("2_3", "2_4"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect();
    assert_eq!(produced, expected);

    let negatives = sampler.negative_pairs().unwrap();
    assert_eq!(negatives.target, 4);
    assert!(negatives.clamp.is_none());
    assert_eq!(negatives.pairs.len(), 4);
    let allowed: HashSet<(&str, &str)> = ["1_0", "1_1", "1_2"]
        .into_iter()
        .flat_map(|a| ["2_3", "2_4"].into_iter().map(move |b| (a, b)))
        .collect();
    for pair in &negatives.pairs {
        let key = pair_key(&pair.func1, &pair.func2);
        assert!(allowed.contains(&(key.first(), key.second())));
    }

    let again = PairSampler::new(&store, SamplerConfig::default())
        .negative_pairs()
        .unwrap();
    assert_eq!(negatives.pairs, again.pairs);
}

#[test]
fn pairing_requires_two_groups_and_two_functions() {
    for sizes in [&[5usize][..], &[1][..]] {
        let store = corpus(sizes);
        let sampler = PairSampler::new(&store, SamplerConfig::default());
        assert!(matches!(
            sampler.positive_pairs(),
            Err(PairsError::InsufficientData { .. })
        ));
        assert!(matches!(
            sampler.negative_pairs(),
            Err(PairsError::InsufficientData { .. })
        ));
    }
}

#[test]
fn different_seeds_draw_different_samples() {
    let store = corpus(SIZES);
    let draw = |seed| {
        let config = SamplerConfig {
            seed,
            max_pairs: 10,
            negative_target: Some(10),
        };
        let sampler = PairSampler::new(&store, config);
        (
            sampler.positive_pairs().unwrap().pairs,
            sampler.negative_pairs().unwrap().pairs,
        )
    };
    assert_eq!(draw(7), draw(7));
    assert_ne!(draw(7), draw(8));
}
