use std::path::PathBuf;

use crate::constants::filter::DEFAULT_MIN_REMAINING;
use crate::constants::sampler::DEFAULT_SEED;

/// Pair sampling configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerConfig {
    /// RNG seed that controls every random draw and shuffle.
    pub seed: u64,
    /// Positive pair cap; `0` means every same-group pair.
    pub max_pairs: usize,
    /// Negative pair target; `None` balances against positive capacity.
    pub negative_target: Option<usize>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_pairs: 0,
            negative_target: None,
        }
    }
}

/// How test code is removed from groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// Remove a whole group when any of its sources is test code.
    DropGroupIfAnyTest,
    /// Remove only test sources; keep the group if at least `min_remaining` (and at least one) remain.
    DropOnlyTestSources,
}

/// Test-source filter configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterConfig {
    /// What to remove when test sources are found.
    pub mode: FilterMode,
    /// Minimum sources a group must keep under `DropOnlyTestSources`.
    pub min_remaining: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::DropGroupIfAnyTest,
            min_remaining: DEFAULT_MIN_REMAINING,
        }
    }
}

/// End-to-end dataset build configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Line-delimited clone group corpus.
    pub input: PathBuf,
    /// Directory receiving every output file.
    pub out_dir: PathBuf,
    /// Seed and pair targets.
    pub sampler: SamplerConfig,
    /// Optional test-source filter applied before ids are assigned.
    pub filter: Option<FilterConfig>,
    /// Also write the id-assigned corpus.
    pub write_corpus: bool,
    /// Verify flat positive/negative files after writing.
    pub verify: bool,
}

impl PipelineConfig {
    /// Defaults: no filter, corpus written, no verification.
    pub fn new(input: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            out_dir: out_dir.into(),
            sampler: SamplerConfig::default(),
            filter: None,
            write_corpus: true,
            verify: false,
        }
    }
}
