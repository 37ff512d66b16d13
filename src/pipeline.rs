//! End-to-end dataset build over one corpus file.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::constants::pipeline::{
    CORPUS_FILENAME, NEGATIVE_FLAT_FILENAME, NEGATIVE_JSONL_FILENAME, POSITIVE_FLAT_FILENAME,
    POSITIVE_JSONL_FILENAME,
};
use crate::data::PairLabel;
use crate::errors::PairsError;
use crate::filter::{FilterReport, filter_test_sources};
use crate::ids::{IdCounter, assign_func_ids};
use crate::sampler::PairSampler;
use crate::splits::{SplitLabel, SplitSizes, combine_splits};
use crate::store::{GroupStore, LoadReport};
use crate::transport::fs::{flat_lines, write_lines, write_pairs_jsonl};
use crate::verify::{FlatVerification, verify_flat_file};

/// Paths of every file the build writes under one output directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOutputs {
    /// Id-assigned corpus.
    pub corpus: PathBuf,
    /// Positive pairs as JSON lines.
    pub positive_jsonl: PathBuf,
    /// Positive pairs as `id1<TAB>id2<TAB>1`.
    pub positive_flat: PathBuf,
    /// Negative pairs as JSON lines.
    pub negative_jsonl: PathBuf,
    /// Negative pairs as `id1<TAB>id2<TAB>0`.
    pub negative_flat: PathBuf,
    /// Training split.
    pub train: PathBuf,
    /// Validation split.
    pub valid: PathBuf,
    /// Test split.
    pub test: PathBuf,
}

impl PipelineOutputs {
    /// Standard file names joined onto `out_dir`.
    pub fn in_dir(out_dir: &Path) -> Self {
        Self {
            corpus: out_dir.join(CORPUS_FILENAME),
            positive_jsonl: out_dir.join(POSITIVE_JSONL_FILENAME),
            positive_flat: out_dir.join(POSITIVE_FLAT_FILENAME),
            negative_jsonl: out_dir.join(NEGATIVE_JSONL_FILENAME),
            negative_flat: out_dir.join(NEGATIVE_FLAT_FILENAME),
            train: out_dir.join(SplitLabel::Train.file_name()),
            valid: out_dir.join(SplitLabel::Valid.file_name()),
            test: out_dir.join(SplitLabel::Test.file_name()),
        }
    }
}

/// Verification results for the flat positive/negative files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineVerification {
    /// Result for the positive flat file.
    pub positive: FlatVerification,
    /// Result for the negative flat file.
    pub negative: FlatVerification,
}

impl PipelineVerification {
    /// Both files verified clean.
    pub fn passed(&self) -> bool {
        self.positive.passed() && self.negative.passed()
    }
}

/// Counts and locations produced by one build.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// Corpus load counts.
    pub load: LoadReport,
    /// Present when a filter was configured.
    pub filter: Option<FilterReport>,
    /// Functions that received a func id.
    pub functions: usize,
    /// Positive pairs written.
    pub positives: usize,
    /// Negative pairs written.
    pub negatives: usize,
    /// Negatives missing from the target when the attempt budget ran out.
    pub negative_shortfall: usize,
    /// Lines per split file.
    pub splits: SplitSizes,
    /// Present only when verification was requested.
    pub verification: Option<PipelineVerification>,
    /// Where everything was written.
    pub outputs: PipelineOutputs,
}

/// load, filter, validate, assign ids, sample, split, write, verify.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport, PairsError> {
    let outputs = PipelineOutputs::in_dir(&config.out_dir);

    let mut store = GroupStore::open(&config.input)?;
    let filter = config
        .filter
        .map(|filter_config| filter_test_sources(&mut store, filter_config));
    store.ensure_pairable()?;

    let functions = assign_func_ids(&mut store, &mut IdCounter::new());
    if config.write_corpus {
        store.save(&outputs.corpus)?;
    }

    let sampler = PairSampler::new(&store, config.sampler.clone());
    let positive = sampler.positive_pairs()?;
    let negative = sampler.negative_pairs()?;

    write_pairs_jsonl(&outputs.positive_jsonl, &positive.pairs)?;
    write_pairs_jsonl(&outputs.negative_jsonl, &negative.pairs)?;
    let positive_lines = flat_lines(&positive.pairs);
    let negative_lines = flat_lines(&negative.pairs);
    write_lines(&outputs.positive_flat, &positive_lines)?;
    write_lines(&outputs.negative_flat, &negative_lines)?;

    let parts = combine_splits(positive_lines, negative_lines, config.sampler.seed);
    write_lines(&outputs.train, &parts.train)?;
    write_lines(&outputs.valid, &parts.valid)?;
    write_lines(&outputs.test, &parts.test)?;
    let splits = parts.sizes();
    info!(
        "[clonepairs:pipeline] splits train={} valid={} test={} -> {}",
        splits.train,
        splits.valid,
        splits.test,
        config.out_dir.display()
    );

    let verification = if config.verify {
        let checked = PipelineVerification {
            positive: verify_flat_file(&outputs.positive_flat, PairLabel::Positive)?,
            negative: verify_flat_file(&outputs.negative_flat, PairLabel::Negative)?,
        };
        if !checked.passed() {
            warn!("[clonepairs:pipeline] verification failed");
        }
        Some(checked)
    } else {
        None
    };

    Ok(PipelineReport {
        load: store.report().clone(),
        filter,
        functions,
        positives: positive.pairs.len(),
        negatives: negative.pairs.len(),
        negative_shortfall: negative.shortfall,
        splits,
        verification,
        outputs,
    })
}
