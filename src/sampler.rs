//! Positive (same-group) and negative (cross-group) pair generation.
//!
//! Both generators are pure functions of the store and the configured seed:
//! each call builds its own RNG and its own dedup set, so repeated calls with
//! identical input return identical pairs.

use rand::Rng;
use rand::seq::index;
use tracing::{debug, info, warn};

use crate::capacity::{PairCapacity, format_u128_with_commas};
use crate::config::SamplerConfig;
use crate::constants::sampler::{
    ATTEMPTS_PER_NEGATIVE, FALLBACK_NEGATIVE_TARGET, MIN_NEGATIVE_ATTEMPTS,
};
use crate::data::{CloneGroup, FunctionRecord, Pair};
use crate::dedup::{SeenPairs, pair_key};
use crate::errors::PairsError;
use crate::rng::DeterministicRng;
use crate::store::{GroupStore, GroupedFunction};

/// A requested pair count that exceeded what the corpus can supply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityClamp {
    /// Count asked for.
    pub requested: usize,
    /// Count actually available.
    pub capacity: u128,
}

/// Result of positive generation.
#[derive(Clone, Debug)]
pub struct PositiveOutcome {
    /// Unique pairs in emission order.
    pub pairs: Vec<Pair>,
    /// Sum of `C(n, 2)` over groups.
    pub capacity: u128,
    /// Set when `max_pairs` exceeded capacity.
    pub clamp: Option<CapacityClamp>,
    /// Candidates dropped because their pair key was already emitted or named one function twice.
    pub duplicates: usize,
}

/// Result of negative generation, including any shortfall against the target.
#[derive(Clone, Debug)]
pub struct NegativeOutcome {
    /// Unique cross-group pairs.
    pub pairs: Vec<Pair>,
    /// Corpus totals the target was checked against.
    pub capacity: PairCapacity,
    /// Target after clamping to negative capacity.
    pub target: usize,
    /// Set when the requested target exceeded negative capacity.
    pub clamp: Option<CapacityClamp>,
    /// Draws made.
    pub attempts: usize,
    /// Draw budget for `target`.
    pub max_attempts: usize,
    /// Draws rejected as repeats or self-pairs.
    pub duplicates: usize,
    /// `target - pairs.len()`; non-zero only when the attempt budget ran out.
    pub shortfall: usize,
}

impl NegativeOutcome {
    /// Whether the full target was reached.
    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }
}

/// Negative target used when none is configured: balance against positive capacity.
pub fn default_negative_target(positive_capacity: u128) -> usize {
    if positive_capacity == 0 {
        return FALLBACK_NEGATIVE_TARGET;
    }
    usize::try_from(positive_capacity).unwrap_or(usize::MAX)
}

/// Attempt budget for reaching `target` negatives by rejection sampling.
pub fn negative_attempt_budget(target: usize) -> usize {
    MIN_NEGATIVE_ATTEMPTS.max(target.saturating_mul(ATTEMPTS_PER_NEGATIVE))
}

/// Pair generator over one loaded, id-assigned corpus.
pub struct PairSampler<'a> {
    store: &'a GroupStore,
    config: SamplerConfig,
}

impl<'a> PairSampler<'a> {
    /// Sampler over `store`; the store should already carry func ids.
    pub fn new(store: &'a GroupStore, config: SamplerConfig) -> Self {
        Self { store, config }
    }

    /// Same-group pairs: every combination, or `max_pairs` drawn uniformly without replacement.
    pub fn positive_pairs(&self) -> Result<PositiveOutcome, PairsError> {
        self.store.ensure_pairable()?;
        let candidates = PositiveCandidates::new(self.store);
        let capacity = self.store.total_positive_capacity();
        let total = candidates.len();
        if capacity != total as u128 {
            return Err(PairsError::Configuration(format!(
                "positive capacity {capacity} exceeds the addressable candidate range"
            )));
        }
        info!(
            "[clonepairs:sampler] positive capacity (sum of nC2): {}",
            format_u128_with_commas(capacity)
        );

        let max_pairs = self.config.max_pairs;
        let mut clamp = None;
        let selection: Vec<usize> = if max_pairs == 0 || max_pairs == total {
            (0..total).collect()
        } else if max_pairs > total {
            warn!(
                "[clonepairs:sampler] max_pairs={} exceeds positive capacity={}; using capacity",
                max_pairs, total
            );
            clamp = Some(CapacityClamp {
                requested: max_pairs,
                capacity,
            });
            (0..total).collect()
        } else {
            let mut rng = DeterministicRng::new(self.config.seed);
            index::sample(&mut rng, total, max_pairs).into_vec()
        };

        let mut seen = SeenPairs::new();
        let mut self_pairs = 0usize;
        let mut pairs = Vec::with_capacity(selection.len());
        for candidate in selection {
            let Some((group, a, b)) = candidates.locate(candidate) else {
                continue;
            };
            let key = pair_key(a, b);
            if key.is_self_pair() {
                self_pairs += 1;
                continue;
            }
            if seen.insert_key(key) {
                pairs.push(Pair::positive(&group.classid, a, b));
            }
        }
        let duplicates = seen.rejected() + self_pairs;
        if duplicates > 0 {
            debug!(
                "[clonepairs:sampler] dropped {} duplicate positive candidates",
                duplicates
            );
        }
        info!(
            "[clonepairs:sampler] generated {} unique positive pairs",
            pairs.len()
        );
        Ok(PositiveOutcome {
            pairs,
            capacity,
            clamp,
            duplicates,
        })
    }

    /// Cross-group pairs drawn by bounded rejection sampling over the flattened pool.
    pub fn negative_pairs(&self) -> Result<NegativeOutcome, PairsError> {
        self.store.ensure_pairable()?;
        let pool = self.store.flattened();
        let capacity = self.store.capacity();
        log_capacity(&capacity);

        let requested = self
            .config
            .negative_target
            .unwrap_or_else(|| default_negative_target(capacity.positive));
        let mut clamp = None;
        let mut target = requested;
        if requested as u128 > capacity.negative {
            target = usize::try_from(capacity.negative).unwrap_or(usize::MAX);
            warn!(
                "[clonepairs:sampler] target {} exceeds max possible negatives; adjusting to {}",
                requested, target
            );
            clamp = Some(CapacityClamp {
                requested,
                capacity: capacity.negative,
            });
        }

        let max_attempts = negative_attempt_budget(target);
        let mut rng = DeterministicRng::new(self.config.seed);
        let draw = draw_negatives(&pool, target, max_attempts, &mut rng);
        let shortfall = target.saturating_sub(draw.pairs.len());
        if draw.duplicates > 0 {
            debug!(
                "[clonepairs:sampler] dropped {} duplicate negative draws",
                draw.duplicates
            );
        }
        if shortfall > 0 {
            warn!(
                "[clonepairs:sampler] attempt budget exhausted after {} attempts: {} of {} negatives ({} short)",
                draw.attempts,
                draw.pairs.len(),
                target,
                shortfall
            );
        }
        info!(
            "[clonepairs:sampler] generated {} unique negative pairs",
            draw.pairs.len()
        );
        Ok(NegativeOutcome {
            pairs: draw.pairs,
            capacity,
            target,
            clamp,
            attempts: draw.attempts,
            max_attempts,
            duplicates: draw.duplicates,
            shortfall,
        })
    }
}

fn log_capacity(capacity: &PairCapacity) {
    info!(
        "[clonepairs:sampler] functions N={} | all pairs C(N,2)={} | positive={} | negative={}",
        format_u128_with_commas(capacity.total_functions),
        format_u128_with_commas(capacity.total_possible_pairs),
        format_u128_with_commas(capacity.positive),
        format_u128_with_commas(capacity.negative)
    );
}

struct NegativeDraw {
    pairs: Vec<Pair>,
    attempts: usize,
    duplicates: usize,
}

fn draw_negatives(
    pool: &[GroupedFunction<'_>],
    target: usize,
    max_attempts: usize,
    rng: &mut DeterministicRng,
) -> NegativeDraw {
    let mut seen = SeenPairs::new();
    let mut pairs = Vec::with_capacity(target.min(max_attempts));
    let mut attempts = 0;
    if pool.len() < 2 {
        return NegativeDraw {
            pairs,
            attempts,
            duplicates: 0,
        };
    }
    while pairs.len() < target && attempts < max_attempts {
        attempts += 1;
        let left_idx = rng.random_range(0..pool.len());
        let right_idx = rng.random_range(0..pool.len());
        if left_idx == right_idx {
            continue;
        }
        let (left, right) = (pool[left_idx], pool[right_idx]);
        if left.classid == right.classid {
            continue;
        }
        let key = pair_key(left.record, right.record);
        if key.is_self_pair() || !seen.insert_key(key) {
            continue;
        }
        pairs.push(Pair::negative(
            left.classid,
            left.record,
            right.classid,
            right.record,
        ));
    }
    NegativeDraw {
        pairs,
        attempts,
        duplicates: seen.rejected(),
    }
}

/// Index space over every same-group combination, in group order then
/// lexicographic `(i, j)` order within a group.
struct PositiveCandidates<'a> {
    groups: Vec<&'a CloneGroup>,
    starts: Vec<usize>,
    total: usize,
}

impl<'a> PositiveCandidates<'a> {
    fn new(store: &'a GroupStore) -> Self {
        let mut groups = Vec::new();
        let mut starts = Vec::new();
        let mut total = 0usize;
        for group in store.groups().filter(|group| group.len() >= 2) {
            groups.push(group);
            starts.push(total);
            total = total.saturating_add(pairs_among(group.len()));
        }
        Self {
            groups,
            starts,
            total,
        }
    }

    fn len(&self) -> usize {
        self.total
    }

    fn locate(
        &self,
        candidate: usize,
    ) -> Option<(&'a CloneGroup, &'a FunctionRecord, &'a FunctionRecord)> {
        if candidate >= self.total {
            return None;
        }
        let slot = self
            .starts
            .partition_point(|start| *start <= candidate)
            .checked_sub(1)?;
        let group = self.groups[slot];
        let (i, j) = unrank_pair(group.len(), candidate - self.starts[slot])?;
        Some((group, &group.sources[i], &group.sources[j]))
    }
}

fn pairs_among(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    n.saturating_mul(n - 1) / 2
}

/// `rank`-th `(i, j)` with `i < j < n`, enumerated row by row.
fn unrank_pair(n: usize, mut rank: usize) -> Option<(usize, usize)> {
    for i in 0..n.saturating_sub(1) {
        let row = n - 1 - i;
        if rank < row {
            return Some((i, i + 1 + rank));
        }
        rank -= row;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CloneGroup, PairLabel, PairMeta};
    use crate::dedup::PairKey;
    use crate::ids::{IdCounter, assign_func_ids};
    use std::collections::HashSet;

    fn record(name: &str) -> FunctionRecord {
        serde_json::from_value(serde_json::json!({
            "qualified_name": name,
            "range": "1-5",
            "code": format!("int {name}() {{ return 1; }}"),
        }))
        .unwrap()
    }

    fn store_with_sizes(sizes: &[usize]) -> GroupStore {
        let groups = sizes.iter().enumerate().map(|(g, size)| {
            let sources = (0..*size).map(|i| record(&format!("g{g}f{i}"))).collect();
            CloneGroup::new((g + 1).to_string(), sources)
        });
        let mut store = GroupStore::from_groups(groups);
        assign_func_ids(&mut store, &mut IdCounter::new());
        store
    }

    fn ids(pair: &Pair) -> (String, String) {
        (
            pair.func1.func_id().unwrap().to_string(),
            pair.func2.func_id().unwrap().to_string(),
        )
    }

    #[test]
    fn unrank_pair_enumerates_combinations_in_order() {
        let produced: Vec<(usize, usize)> =
            (0..6).filter_map(|rank| unrank_pair(4, rank)).collect();
        assert_eq!(
            produced,
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
        assert_eq!(unrank_pair(4, 6), None);
        assert_eq!(unrank_pair(1, 0), None);
    }

    #[test]
    fn exhaustive_positives_match_two_group_example() {
        let store = store_with_sizes(&[3, 2]);
        let outcome = PairSampler::new(&store, SamplerConfig::default())
            .positive_pairs()
            .unwrap();
        let produced: Vec<(String, String)> = outcome.pairs.iter().map(ids).collect();
        let expected: Vec<(String, String)> = [
            ("1_0", "1_1"),
            ("1_0", "1_2"),
            ("1_1", "1_2"),
            ("2_3", "2_4"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        assert_eq!(produced, expected);
        assert_eq!(outcome.capacity, 4);
        assert!(outcome.clamp.is_none());
        assert!(
            outcome
                .pairs
                .iter()
                .all(|pair| pair.label == PairLabel::Positive)
        );
        assert_eq!(
            outcome.pairs[3].meta,
            PairMeta::Same {
                classid: "2".into()
            }
        );
    }

    #[test]
    fn capped_positives_are_unique_and_seeded() {
        let store = store_with_sizes(&[5, 4, 3]);
        let config = SamplerConfig {
            max_pairs: 7,
            seed: 11,
            ..SamplerConfig::default()
        };
        let first = PairSampler::new(&store, config.clone())
            .positive_pairs()
            .unwrap();
        let second = PairSampler::new(&store, config).positive_pairs().unwrap();
        assert_eq!(first.pairs.len(), 7);
        assert_eq!(first.pairs, second.pairs);
        let keys: HashSet<PairKey> = first
            .pairs
            .iter()
            .map(|pair| pair_key(&pair.func1, &pair.func2))
            .collect();
        assert_eq!(keys.len(), 7);
        for pair in &first.pairs {
            let (a, b) = ids(pair);
            assert_eq!(a.split('_').next(), b.split('_').next());
        }
    }

    #[test]
    fn oversized_positive_cap_is_clamped() {
        let store = store_with_sizes(&[3, 2]);
        let config = SamplerConfig {
            max_pairs: 50,
            ..SamplerConfig::default()
        };
        let outcome = PairSampler::new(&store, config).positive_pairs().unwrap();
        assert_eq!(outcome.pairs.len(), 4);
        assert_eq!(
            outcome.clamp,
            Some(CapacityClamp {
                requested: 50,
                capacity: 4
            })
        );
    }

    #[test]
    fn duplicated_source_records_are_deduplicated() {
        let mut store = store_with_sizes(&[2, 2]);
        let copy = store.groups().next().unwrap().sources[0].clone();
        store.retain_groups(|group| {
            if group.classid == "1" {
                group.sources.push(copy.clone());
                group.nclones = group.sources.len();
            }
            true
        });
        let outcome = PairSampler::new(&store, SamplerConfig::default())
            .positive_pairs()
            .unwrap();
        // group 1 now holds [1_0, 1_1, 1_0]: (1_0,1_1) appears twice and (1_0,1_0) is a self pair.
        assert_eq!(outcome.capacity, 4);
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(outcome.pairs.len(), 2);
    }

    #[test]
    fn default_negative_target_balances_positive_capacity() {
        let store = store_with_sizes(&[3, 2]);
        let outcome = PairSampler::new(&store, SamplerConfig::default())
            .negative_pairs()
            .unwrap();
        assert_eq!(outcome.capacity.negative, 6);
        assert_eq!(outcome.target, 4);
        assert!(outcome.clamp.is_none());
        assert!(outcome.is_complete());
        assert_eq!(outcome.pairs.len(), 4);
        let mut keys = HashSet::new();
        for pair in &outcome.pairs {
            assert_eq!(pair.label, PairLabel::Negative);
            let (a, b) = ids(pair);
            assert_ne!(a.split('_').next(), b.split('_').next());
            assert!(keys.insert(pair_key(&pair.func1, &pair.func2)));
        }
    }

    #[test]
    fn negative_target_is_clamped_to_capacity() {
        let store = store_with_sizes(&[3, 2]);
        let config = SamplerConfig {
            negative_target: Some(100),
            ..SamplerConfig::default()
        };
        let outcome = PairSampler::new(&store, config).negative_pairs().unwrap();
        assert_eq!(outcome.target, 6);
        assert_eq!(
            outcome.clamp,
            Some(CapacityClamp {
                requested: 100,
                capacity: 6
            })
        );
        assert_eq!(outcome.pairs.len() + outcome.shortfall, 6);
    }

    #[test]
    fn singleton_groups_fall_back_to_fixed_target() {
        assert_eq!(default_negative_target(0), FALLBACK_NEGATIVE_TARGET);
        let store = store_with_sizes(&[1, 1, 1, 1, 1, 1]);
        let outcome = PairSampler::new(&store, SamplerConfig::default())
            .negative_pairs()
            .unwrap();
        assert_eq!(outcome.capacity.positive, 0);
        assert_eq!(outcome.target, 10);
        assert_eq!(outcome.pairs.len() + outcome.shortfall, 10);
    }

    #[test]
    fn exhausted_budget_reports_shortfall() {
        let store = store_with_sizes(&[3, 3]);
        let pool = store.flattened();
        let mut rng = DeterministicRng::new(5);
        let draw = draw_negatives(&pool, 9, 3, &mut rng);
        assert_eq!(draw.attempts, 3);
        assert!(draw.pairs.len() <= 3);
    }

    #[test]
    fn sparse_cross_pool_reports_shortfall_through_sampler() {
        // One singleton beside a large group: about 1% of draws cross groups.
        let store = store_with_sizes(&[1, 200]);
        let config = SamplerConfig {
            seed: 11,
            negative_target: Some(200),
            ..SamplerConfig::default()
        };
        let outcome = PairSampler::new(&store, config).negative_pairs().unwrap();
        assert_eq!(outcome.capacity.negative, 200);
        assert!(outcome.clamp.is_none());
        assert_eq!(outcome.target, 200);
        assert_eq!(outcome.max_attempts, 10_000);
        assert_eq!(outcome.attempts, outcome.max_attempts);
        assert!(outcome.shortfall > 0);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.pairs.len() + outcome.shortfall, outcome.target);
        for pair in &outcome.pairs {
            let (a, b) = ids(pair);
            assert!(a.starts_with("1_") != b.starts_with("1_"));
        }
    }

    #[test]
    fn attempt_budget_has_floor() {
        assert_eq!(negative_attempt_budget(0), 1000);
        assert_eq!(negative_attempt_budget(4), 1000);
        assert_eq!(negative_attempt_budget(100), 5000);
    }

    #[test]
    fn insufficient_data_aborts_before_sampling() {
        let store = store_with_sizes(&[4]);
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

    #[test]
    fn negatives_are_reproducible_for_a_seed() {
        let store = store_with_sizes(&[4, 3, 2, 2]);
        let config = SamplerConfig {
            seed: 99,
            ..SamplerConfig::default()
        };
        let first = PairSampler::new(&store, config.clone())
            .negative_pairs()
            .unwrap();
        let second = PairSampler::new(&store, config).negative_pairs().unwrap();
        assert_eq!(first.pairs, second.pairs);
        assert_eq!(first.attempts, second.attempts);
    }
}
