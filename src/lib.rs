#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners behind the `clonepairs` binary.
pub mod apps;
/// Pair capacity arithmetic.
pub mod capacity;
/// Sampler, filter, and pipeline configuration types.
pub mod config;
/// Centralized constants grouped by component.
pub mod constants;
/// Clone group, function record, and pair types.
pub mod data;
/// Canonical unordered pair keys and the per-run seen set.
pub mod dedup;
/// Function export for downstream training code.
pub mod export;
/// Test-source filtering.
pub mod filter;
/// Global func id assignment.
pub mod ids;
/// End-to-end dataset build.
pub mod pipeline;
/// Seeded RNG used by every random draw.
pub mod rng;
/// Positive and negative pair sampling.
pub mod sampler;
/// Tokenization and pairwise similarity.
pub mod similarity;
/// Train/valid/test split and recombination.
pub mod splits;
/// Ordered, validated clone group storage.
pub mod store;
/// Filesystem readers and writers.
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Flat pair file and id mapping verification.
pub mod verify;

mod errors;

pub use config::{FilterConfig, FilterMode, PipelineConfig, SamplerConfig};
pub use data::{CloneGroup, FunctionEntry, FunctionRecord, Pair, PairLabel, PairMeta};
pub use dedup::{PairKey, pair_key};
pub use errors::PairsError;
pub use ids::{IdCounter, assign_func_ids};
pub use pipeline::{PipelineReport, run_pipeline};
pub use sampler::{NegativeOutcome, PairSampler, PositiveOutcome};
pub use similarity::{SimilarityEngine, SimilarityMatrix};
pub use splits::{SplitLabel, SplitParts, combine_splits};
pub use store::{GroupStore, LoadReport};
pub use types::{ClassId, Code, FlatLine, FuncId, LineRange, PairKeyPart, TokenText};
