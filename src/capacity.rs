use crate::store::GroupStore;

/// Exact pair counts obtainable from a corpus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PairCapacity {
    /// Flattened function count `N`.
    pub total_functions: u128,
    /// `C(N, 2)`: every unordered pair in the corpus.
    pub total_possible_pairs: u128,
    /// Sum of `C(n, 2)` over groups: every same-group pair.
    pub positive: u128,
    /// `total_possible_pairs - positive`: every cross-group pair.
    pub negative: u128,
}

impl PairCapacity {
    /// Compute capacity from group sizes in any order.
    pub fn from_group_sizes<I>(sizes: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut total_functions = 0u128;
        let mut positive = 0u128;
        for size in sizes {
            let size = size as u128;
            total_functions = total_functions.saturating_add(size);
            positive = positive.saturating_add(choose2(size));
        }
        let total_possible_pairs = choose2(total_functions);
        Self {
            total_functions,
            total_possible_pairs,
            positive,
            negative: total_possible_pairs.saturating_sub(positive),
        }
    }

    /// Totals for the groups currently in `store`.
    pub fn from_store(store: &GroupStore) -> Self {
        Self::from_group_sizes(store.groups().map(|group| group.len()))
    }
}

/// Number of unordered pairs among `n` items; `0` when `n < 2`.
pub fn choose2(n: u128) -> u128 {
    if n < 2 {
        return 0;
    }
    n.saturating_mul(n - 1) / 2
}

/// Render `value` with `,` thousands separators.
pub fn format_u128_with_commas(value: u128) -> String {
    let raw = value.to_string();
    let mut grouped_reversed = String::with_capacity(raw.len() + (raw.len() / 3));
    for (idx, ch) in raw.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            grouped_reversed.push(',');
        }
        grouped_reversed.push(ch);
    }
    grouped_reversed.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose2_handles_small_inputs() {
        assert_eq!(choose2(0), 0);
        assert_eq!(choose2(1), 0);
        assert_eq!(choose2(2), 1);
        assert_eq!(choose2(5), 10);
    }

    #[test]
    fn capacity_matches_two_group_example() {
        let capacity = PairCapacity::from_group_sizes([3, 2]);
        assert_eq!(capacity.total_functions, 5);
        assert_eq!(capacity.positive, 4);
        assert_eq!(capacity.total_possible_pairs, 10);
        assert_eq!(capacity.negative, 6);
    }

    #[test]
    fn singleton_groups_contribute_no_positive_capacity() {
        let capacity = PairCapacity::from_group_sizes([1, 1, 1]);
        assert_eq!(capacity.positive, 0);
        assert_eq!(capacity.negative, 3);
    }

    #[test]
    fn formatting_is_stable() {
        assert_eq!(format_u128_with_commas(0), "0");
        assert_eq!(format_u128_with_commas(999), "999");
        assert_eq!(format_u128_with_commas(1_234_567), "1,234,567");
    }
}
