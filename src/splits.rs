use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::constants::splits::{
    ALL_SPLITS, TEST_FILENAME, TEST_SEED_OFFSET, TRAIN_FILENAME, TRAIN_SEED_OFFSET,
    VALID_FILENAME, VALID_SEED_OFFSET,
};
use crate::rng::{DeterministicRng, derive_seed};

/// Logical dataset partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitLabel {
    /// Training split.
    Train,
    /// Validation split.
    Valid,
    /// Test split.
    Test,
}

impl SplitLabel {
    /// Lowercase name used in logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            SplitLabel::Train => "train",
            SplitLabel::Valid => "valid",
            SplitLabel::Test => "test",
        }
    }

    /// Output file for this split.
    pub fn file_name(self) -> &'static str {
        match self {
            SplitLabel::Train => TRAIN_FILENAME,
            SplitLabel::Valid => VALID_FILENAME,
            SplitLabel::Test => TEST_FILENAME,
        }
    }

    /// Offset added to the base seed for this split's recombination shuffle.
    pub fn seed_offset(self) -> u64 {
        match self {
            SplitLabel::Train => TRAIN_SEED_OFFSET,
            SplitLabel::Valid => VALID_SEED_OFFSET,
            SplitLabel::Test => TEST_SEED_OFFSET,
        }
    }
}

/// Slice sizes for a list of `n` items: `n/2`, half the remainder, then the rest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitSizes {
    /// Train count.
    pub train: usize,
    /// Valid count.
    pub valid: usize,
    /// Test count.
    pub test: usize,
}

impl SplitSizes {
    /// Cut sizes for a list of `n` items.
    pub fn for_len(n: usize) -> Self {
        let train = n / 2;
        let valid = (n - train) / 2;
        Self {
            train,
            valid,
            test: n - train - valid,
        }
    }

    /// Size of one split.
    pub fn get(&self, label: SplitLabel) -> usize {
        match label {
            SplitLabel::Train => self.train,
            SplitLabel::Valid => self.valid,
            SplitLabel::Test => self.test,
        }
    }

    /// Sum of all three.
    pub fn total(&self) -> usize {
        self.train + self.valid + self.test
    }
}

/// Items partitioned into train/valid/test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitParts<T> {
    /// Training items.
    pub train: Vec<T>,
    /// Validation items.
    pub valid: Vec<T>,
    /// Test items.
    pub test: Vec<T>,
}

impl<T> SplitParts<T> {
    /// Items of one split.
    pub fn get(&self, label: SplitLabel) -> &[T] {
        match label {
            SplitLabel::Train => &self.train,
            SplitLabel::Valid => &self.valid,
            SplitLabel::Test => &self.test,
        }
    }

    /// Current length of each split.
    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.train.len(),
            valid: self.valid.len(),
            test: self.test.len(),
        }
    }

    /// Splits in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (SplitLabel, &[T])> {
        ALL_SPLITS.into_iter().map(move |label| (label, self.get(label)))
    }
}

/// Cut `items` into contiguous slices per `SplitSizes::for_len`, keeping order.
pub fn cut_splits<T>(mut items: Vec<T>) -> SplitParts<T> {
    let sizes = SplitSizes::for_len(items.len());
    let test = items.split_off(sizes.train + sizes.valid);
    let valid = items.split_off(sizes.train);
    SplitParts {
        train: items,
        valid,
        test,
    }
}

/// Shuffle `items` with a fresh RNG seeded by `seed`, then cut.
pub fn shuffle_and_cut<T>(mut items: Vec<T>, seed: u64) -> SplitParts<T> {
    let mut rng = DeterministicRng::new(seed);
    items.shuffle(&mut rng);
    cut_splits(items)
}

/// Split positives and negatives independently, then merge each split and reshuffle it
/// with `seed + split offset`.
///
/// No deduplication happens here; inputs must already be free of duplicates.
pub fn combine_splits<T>(positive: Vec<T>, negative: Vec<T>, seed: u64) -> SplitParts<T> {
    let positive = shuffle_and_cut(positive, seed);
    let negative = shuffle_and_cut(negative, seed);
    SplitParts {
        train: merge_split(SplitLabel::Train, positive.train, negative.train, seed),
        valid: merge_split(SplitLabel::Valid, positive.valid, negative.valid, seed),
        test: merge_split(SplitLabel::Test, positive.test, negative.test, seed),
    }
}

fn merge_split<T>(label: SplitLabel, mut positive: Vec<T>, negative: Vec<T>, seed: u64) -> Vec<T> {
    positive.extend(negative);
    let mut rng = DeterministicRng::new(derive_seed(seed, label.seed_offset()));
    positive.shuffle(&mut rng);
    positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn split_size_law_holds() {
        for n in 0..40 {
            let sizes = SplitSizes::for_len(n);
            assert_eq!(sizes.train, n / 2);
            assert_eq!(sizes.valid, (n - sizes.train) / 2);
            assert_eq!(sizes.total(), n);
        }
        assert_eq!(
            SplitSizes::for_len(7),
            SplitSizes {
                train: 3,
                valid: 2,
                test: 2
            }
        );
    }

    #[test]
    fn cut_keeps_contiguous_order() {
        let parts = cut_splits((0..9).collect::<Vec<_>>());
        assert_eq!(parts.train, vec![0, 1, 2, 3]);
        assert_eq!(parts.valid, vec![4, 5]);
        assert_eq!(parts.test, vec![6, 7, 8]);
    }

    #[test]
    fn combine_preserves_union_and_per_list_sizes() {
        let positive: Vec<String> = (0..11).map(|i| format!("p{i}")).collect();
        let negative: Vec<String> = (0..6).map(|i| format!("n{i}")).collect();
        let parts = combine_splits(positive.clone(), negative.clone(), 42);

        let pos_sizes = SplitSizes::for_len(positive.len());
        let neg_sizes = SplitSizes::for_len(negative.len());
        for (label, items) in parts.iter() {
            let pos_count = items.iter().filter(|item| item.starts_with('p')).count();
            let neg_count = items.iter().filter(|item| item.starts_with('n')).count();
            assert_eq!(pos_count, pos_sizes.get(label));
            assert_eq!(neg_count, neg_sizes.get(label));
        }

        let merged: HashSet<&String> = parts
            .train
            .iter()
            .chain(&parts.valid)
            .chain(&parts.test)
            .collect();
        let expected: HashSet<&String> = positive.iter().chain(&negative).collect();
        assert_eq!(merged, expected);
        assert_eq!(parts.sizes().total(), 17);
    }

    #[test]
    fn combine_is_deterministic_per_seed() {
        let positive: Vec<u32> = (0..50).collect();
        let negative: Vec<u32> = (100..150).collect();
        let first = combine_splits(positive.clone(), negative.clone(), 7);
        let second = combine_splits(positive.clone(), negative.clone(), 7);
        assert_eq!(first, second);
        let other = combine_splits(positive, negative, 8);
        assert_ne!(first, other);
    }

    #[test]
    fn labels_map_to_files_and_offsets() {
        assert_eq!(SplitLabel::Train.file_name(), "train.txt");
        assert_eq!(SplitLabel::Valid.file_name(), "valid.txt");
        assert_eq!(SplitLabel::Test.file_name(), "test.txt");
        let offsets: Vec<u64> = ALL_SPLITS.iter().map(|l| l.seed_offset()).collect();
        assert_eq!(offsets, vec![1, 2, 3]);
    }
}
