//! Command-line runners behind the `clonepairs` binary.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind};

use crate::config::{FilterConfig, FilterMode, PipelineConfig, SamplerConfig};
use crate::constants::filter::DEFAULT_MIN_REMAINING;
use crate::constants::sampler::DEFAULT_SEED;
use crate::constants::splits::ALL_SPLITS;
use crate::constants::verify::{DEFAULT_KEY_FIELD, DEFAULT_MAX_EXAMPLES};
use crate::data::{CloneGroup, PairLabel};
use crate::errors::PairsError;
use crate::export::{ExportOptions, export_functions};
use crate::filter::filter_test_sources;
use crate::ids::{IdCounter, assign_func_ids};
use crate::pipeline::run_pipeline;
use crate::sampler::PairSampler;
use crate::similarity::{GroupSelection, MatrixCell, SimilarityEngine, select_groups};
use crate::splits::combine_splits;
use crate::store::GroupStore;
use crate::transport::fs::{
    create_writer, open_reader, read_nonblank_lines, write_lines, write_pairs_flat,
    write_pairs_jsonl,
};
use crate::verify::{
    FlatVerification, load_mapping_keys, verify_flat_file, verify_pairs_resolvable,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    /// Drop a group when any source is test code.
    DropGroup,
    /// Drop test sources only.
    DropSources,
}

impl From<FilterArg> for FilterMode {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::DropGroup => FilterMode::DropGroupIfAnyTest,
            FilterArg::DropSources => FilterMode::DropOnlyTestSources,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LabelArg {
    Positive,
    Negative,
}

impl From<LabelArg> for PairLabel {
    fn from(value: LabelArg) -> Self {
        match value {
            LabelArg::Positive => PairLabel::Positive,
            LabelArg::Negative => PairLabel::Negative,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "clonepairs",
    version,
    disable_help_subcommand = true,
    about = "Build labeled clone-pair datasets from clone group corpora",
    long_about = "Turn line-delimited clone group records into deterministic positive/negative pair datasets, train/valid/test splits, and similarity diagnostics."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assign func ids and write the corpus back out.
    AssignIds(AssignIdsArgs),
    /// Generate same-group pairs.
    Positives(PositivesArgs),
    /// Generate cross-group pairs.
    Negatives(NegativesArgs),
    /// Combine flat positive/negative files into train/valid/test.
    Split(SplitArgs),
    /// Check a flat pair file against an expected label.
    Verify(VerifyArgs),
    /// Export `{"func", "idx"}` rows for every id-assigned function.
    ExportFuncs(ExportArgs),
    /// Check that every id in flat pair files resolves in a function export.
    CheckMapping(CheckMappingArgs),
    /// Print groups with their pairwise similarity matrix.
    Inspect(InspectArgs),
    /// Run the whole dataset build.
    Build(BuildArgs),
}

#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long, value_enum, help = "Remove test code before assigning ids")]
    filter: Option<FilterArg>,
    #[arg(
        long = "min-remaining",
        default_value_t = DEFAULT_MIN_REMAINING,
        help = "Sources a group must keep under --filter drop-sources"
    )]
    min_remaining: usize,
}

impl FilterArgs {
    fn config(&self) -> Option<FilterConfig> {
        self.filter.map(|mode| FilterConfig {
            mode: mode.into(),
            min_remaining: self.min_remaining,
        })
    }
}

#[derive(Debug, Args)]
struct AssignIdsArgs {
    #[arg(long, value_name = "PATH", help = "Clone group corpus (JSONL)")]
    input: PathBuf,
    #[arg(long, value_name = "PATH", help = "Destination for the id-assigned corpus")]
    out: PathBuf,
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Debug, Args)]
struct PositivesArgs {
    #[arg(long, value_name = "PATH", help = "Clone group corpus (JSONL)")]
    input: PathBuf,
    #[arg(long = "out-jsonl", value_name = "PATH")]
    out_jsonl: PathBuf,
    #[arg(long = "out-flat", value_name = "PATH")]
    out_flat: PathBuf,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Deterministic seed")]
    seed: u64,
    #[arg(
        long = "max-pairs",
        default_value_t = 0,
        help = "Cap on positive pairs; 0 keeps every same-group pair"
    )]
    max_pairs: usize,
    #[arg(long = "assign-ids", help = "Assign func ids before sampling")]
    assign_ids: bool,
    #[arg(long, help = "Verify the flat output after writing")]
    verify: bool,
}

#[derive(Debug, Args)]
struct NegativesArgs {
    #[arg(long, value_name = "PATH", help = "Clone group corpus (JSONL)")]
    input: PathBuf,
    #[arg(long = "out-jsonl", value_name = "PATH")]
    out_jsonl: PathBuf,
    #[arg(long = "out-flat", value_name = "PATH")]
    out_flat: PathBuf,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Deterministic seed")]
    seed: u64,
    #[arg(
        long,
        help = "Negative pair target; defaults to the positive capacity"
    )]
    target: Option<usize>,
    #[arg(long = "assign-ids", help = "Assign func ids before sampling")]
    assign_ids: bool,
    #[arg(long, help = "Verify the flat output after writing")]
    verify: bool,
}

#[derive(Debug, Args)]
struct SplitArgs {
    #[arg(long, value_name = "PATH", help = "Flat positive pair file")]
    positive: PathBuf,
    #[arg(long, value_name = "PATH", help = "Flat negative pair file")]
    negative: PathBuf,
    #[arg(long = "out-dir", value_name = "DIR")]
    out_dir: PathBuf,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Deterministic seed")]
    seed: u64,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    #[arg(long, value_name = "PATH", help = "Flat pair file")]
    file: PathBuf,
    #[arg(long, value_enum, help = "Label every line should carry")]
    label: LabelArg,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[arg(long, value_name = "PATH", help = "Id-assigned clone group corpus (JSONL)")]
    input: PathBuf,
    #[arg(long, value_name = "PATH")]
    out: PathBuf,
    #[arg(long = "keep-empty", help = "Keep functions with empty code")]
    keep_empty: bool,
    #[arg(long = "no-dedup", help = "Write repeated func ids more than once")]
    no_dedup: bool,
}

#[derive(Debug, Args)]
struct CheckMappingArgs {
    #[arg(long, value_name = "PATH", help = "Function export file (JSONL)")]
    mapping: PathBuf,
    #[arg(
        long = "pairs",
        value_name = "PATH",
        required = true,
        help = "Flat pair file, repeat as needed"
    )]
    pairs: Vec<PathBuf>,
    #[arg(long = "key-field", default_value = DEFAULT_KEY_FIELD)]
    key_field: String,
    #[arg(long = "max-examples", default_value_t = DEFAULT_MAX_EXAMPLES)]
    max_examples: usize,
    #[arg(long, help = "Exit with an error when any pair fails to resolve")]
    strict: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    #[arg(long, value_name = "PATH", help = "Clone group corpus (JSONL)")]
    input: PathBuf,
    #[arg(long, help = "Inspect one classid")]
    classid: Option<String>,
    #[arg(
        long,
        conflicts_with = "classid",
        help = "Inspect N randomly chosen groups"
    )]
    random: Option<usize>,
    #[arg(long, default_value_t = 1, help = "Groups to print without --random")]
    limit: usize,
    #[arg(
        long = "min-similarity",
        help = "Only groups whose dataset similarity is at least this value"
    )]
    min_similarity: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Seed for --random")]
    seed: u64,
    #[arg(long = "no-matrix", help = "Skip the similarity matrix")]
    no_matrix: bool,
    #[arg(long = "no-norm", help = "Compare raw identifiers and numbers")]
    no_norm: bool,
}

#[derive(Debug, Args)]
struct BuildArgs {
    #[arg(long, value_name = "PATH", help = "Clone group corpus (JSONL)")]
    input: PathBuf,
    #[arg(long = "out-dir", value_name = "DIR")]
    out_dir: PathBuf,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Deterministic seed")]
    seed: u64,
    #[arg(long = "max-pairs", default_value_t = 0)]
    max_pairs: usize,
    #[arg(long)]
    target: Option<usize>,
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long = "no-corpus", help = "Skip writing the id-assigned corpus")]
    no_corpus: bool,
    #[arg(long, help = "Verify flat positive/negative files after writing")]
    verify: bool,
}

/// Parse `args` (without the program name) and run the chosen subcommand.
pub fn run<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<Cli, _>(std::iter::once("clonepairs".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    match cli.command {
        Command::AssignIds(args) => run_assign_ids(args),
        Command::Positives(args) => run_positives(args),
        Command::Negatives(args) => run_negatives(args),
        Command::Split(args) => run_split(args),
        Command::Verify(args) => run_verify(args),
        Command::ExportFuncs(args) => run_export(args),
        Command::CheckMapping(args) => run_check_mapping(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Build(args) => run_build(args),
    }
}

fn run_assign_ids(args: AssignIdsArgs) -> Result<(), Box<dyn Error>> {
    let mut store = GroupStore::open(&args.input)?;
    if let Some(config) = args.filter.config() {
        filter_test_sources(&mut store, config);
    }
    let assigned = assign_func_ids(&mut store, &mut IdCounter::new());
    let groups = store.save(&args.out)?;
    println!(
        "Assigned {assigned} func ids across {groups} groups -> {}",
        args.out.display()
    );
    Ok(())
}

fn load_for_sampling(input: &Path, assign_ids: bool) -> Result<GroupStore, PairsError> {
    let mut store = GroupStore::open(input)?;
    if assign_ids {
        assign_func_ids(&mut store, &mut IdCounter::new());
    }
    Ok(store)
}

fn run_positives(args: PositivesArgs) -> Result<(), Box<dyn Error>> {
    let store = load_for_sampling(&args.input, args.assign_ids)?;
    let config = SamplerConfig {
        seed: args.seed,
        max_pairs: args.max_pairs,
        ..SamplerConfig::default()
    };
    let outcome = PairSampler::new(&store, config).positive_pairs()?;
    write_pairs_jsonl(&args.out_jsonl, &outcome.pairs)?;
    let flat = write_pairs_flat(&args.out_flat, &outcome.pairs)?;
    println!(
        "Wrote {} positive pairs ({flat} flat lines) -> {}, {}",
        outcome.pairs.len(),
        args.out_jsonl.display(),
        args.out_flat.display()
    );
    if args.verify {
        require_passed(&args.out_flat, &verify_flat_file(&args.out_flat, PairLabel::Positive)?)?;
    }
    Ok(())
}

fn run_negatives(args: NegativesArgs) -> Result<(), Box<dyn Error>> {
    let store = load_for_sampling(&args.input, args.assign_ids)?;
    let config = SamplerConfig {
        seed: args.seed,
        negative_target: args.target,
        ..SamplerConfig::default()
    };
    let outcome = PairSampler::new(&store, config).negative_pairs()?;
    write_pairs_jsonl(&args.out_jsonl, &outcome.pairs)?;
    let flat = write_pairs_flat(&args.out_flat, &outcome.pairs)?;
    println!(
        "Wrote {} of {} negative pairs ({flat} flat lines, {} attempts) -> {}, {}",
        outcome.pairs.len(),
        outcome.target,
        outcome.attempts,
        args.out_jsonl.display(),
        args.out_flat.display()
    );
    if !outcome.is_complete() {
        println!("Shortfall: {} pairs", outcome.shortfall);
    }
    if args.verify {
        require_passed(&args.out_flat, &verify_flat_file(&args.out_flat, PairLabel::Negative)?)?;
    }
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<(), Box<dyn Error>> {
    let positive = read_nonblank_lines(&args.positive)?;
    let negative = read_nonblank_lines(&args.negative)?;
    let parts = combine_splits(positive, negative, args.seed);
    for (label, lines) in parts.iter() {
        let path = args.out_dir.join(label.file_name());
        write_lines(&path, lines)?;
        println!("{:<5} {:>8} lines -> {}", label.name(), lines.len(), path.display());
    }
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<(), Box<dyn Error>> {
    let report = verify_flat_file(&args.file, args.label.into())?;
    for issue in &report.issues {
        println!("line {}: {}", issue.line, issue.failure);
    }
    println!(
        "{}: {} of {} lines valid",
        args.file.display(),
        report.valid,
        report.total
    );
    require_passed(&args.file, &report)
}

fn require_passed(path: &Path, report: &FlatVerification) -> Result<(), Box<dyn Error>> {
    if report.passed() {
        return Ok(());
    }
    Err(format!(
        "verification failed for {}: {} of {} lines invalid",
        path.display(),
        report.issues.len(),
        report.total
    )
    .into())
}

fn run_export(args: ExportArgs) -> Result<(), Box<dyn Error>> {
    let store = GroupStore::open(&args.input)?;
    let options = ExportOptions {
        skip_empty_code: !args.keep_empty,
        dedup: !args.no_dedup,
    };
    let report = export_functions(&store, options, create_writer(&args.out)?)?;
    println!(
        "Exported {} of {} functions from {} groups -> {}",
        report.functions_written,
        report.functions_scanned,
        report.groups_read,
        args.out.display()
    );
    Ok(())
}

fn run_check_mapping(args: CheckMappingArgs) -> Result<(), Box<dyn Error>> {
    let keys = load_mapping_keys(open_reader(&args.mapping)?, &args.key_field)?;
    println!(
        "Mapping {}: {} keys from {} lines ({} unusable)",
        args.mapping.display(),
        keys.len(),
        keys.lines,
        keys.bad
    );

    let mut failed = 0usize;
    for path in &args.pairs {
        let report = verify_pairs_resolvable(open_reader(path)?, &keys, args.max_examples)?;
        println!(
            "{}: lines={} parsed={} bad_format={} missing_pairs={} missing_ids={}",
            path.display(),
            report.total_lines,
            report.parsed_pairs,
            report.bad_format,
            report.missing_pairs,
            report.missing_id_occurrences
        );
        for example in &report.examples {
            println!(
                "  line {}: {} {} {} (missing: {}{})",
                example.line,
                example.id1,
                example.id2,
                example.label,
                if example.missing_first { "id1 " } else { "" },
                if example.missing_second { "id2" } else { "" }
            );
        }
        if !report.passed() {
            failed += 1;
        }
    }

    if failed == 0 {
        println!("All pair ids resolve.");
        return Ok(());
    }
    println!("{failed} of {} pair files have unresolved ids.", args.pairs.len());
    if args.strict {
        return Err(format!("{failed} pair files have unresolved ids").into());
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), Box<dyn Error>> {
    let store = GroupStore::open(&args.input)?;
    let selection = match (args.classid, args.random) {
        (Some(classid), _) => GroupSelection::ClassId(classid),
        (None, Some(count)) if count > 0 => GroupSelection::Random {
            count,
            seed: args.seed,
        },
        _ => GroupSelection::First(args.limit),
    };
    let engine = SimilarityEngine::new(!args.no_norm);
    for group in select_groups(&store, &selection, args.min_similarity)? {
        print_group(group, &engine, !args.no_matrix);
    }
    Ok(())
}

fn print_group(group: &CloneGroup, engine: &SimilarityEngine, show_matrix: bool) {
    let similarity = group
        .similarity
        .map(|value| value.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    println!("{}", "=".repeat(90));
    println!(
        "CLASSID: {}  |  nclones: {}  |  dataset_similarity: {similarity}",
        group.classid, group.nclones
    );
    println!("{}", "-".repeat(90));
    for (idx, record) in group.sources.iter().enumerate() {
        println!("[{}] {}", idx + 1, record.qualified_name);
        let nlines = record
            .nlines
            .map(|count| count.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "    file: {}:{}  |  nlines: {nlines}",
            record.file, record.range
        );
        println!("    code:");
        for line in record.code.lines() {
            println!("      {line}");
        }
        println!();
    }

    if !show_matrix || group.len() < 2 {
        return;
    }
    let matrix = engine.group_matrix(group);
    println!("Pairwise similarity (token Jaccard / trigram Jaccard):");
    let header: Vec<String> = (1..=matrix.size()).map(|col| format!("{col:>13}")).collect();
    println!("      {}", header.join(" "));
    for (row_idx, row) in matrix.rows().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                MatrixCell::SelfComparison => format!("{:>13}", "(self)"),
                MatrixCell::Pair(sim) => format!(
                    "{}/{}",
                    format_pct(sim.token_jaccard),
                    format_pct(sim.trigram_jaccard)
                ),
            })
            .collect();
        println!("{:>4}  {}", row_idx + 1, cells.join(" "));
    }
    if let Some(summary) = matrix.summary() {
        println!(
            "mean {}/{}  min {}/{}",
            format_pct(summary.mean_token_jaccard),
            format_pct(summary.mean_trigram_jaccard),
            format_pct(summary.min_token_jaccard),
            format_pct(summary.min_trigram_jaccard)
        );
    }
    println!();
}

fn format_pct(value: f64) -> String {
    format!("{:5.1}%", value * 100.0)
}

fn run_build(args: BuildArgs) -> Result<(), Box<dyn Error>> {
    let mut config = PipelineConfig::new(&args.input, &args.out_dir);
    config.sampler = SamplerConfig {
        seed: args.seed,
        max_pairs: args.max_pairs,
        negative_target: args.target,
    };
    config.filter = args.filter.config();
    config.write_corpus = !args.no_corpus;
    config.verify = args.verify;

    let report = run_pipeline(&config)?;
    println!(
        "Loaded {} records ({} malformed), {} functions",
        report.load.records_read, report.load.malformed, report.functions
    );
    if let Some(filter) = &report.filter {
        println!(
            "Filter kept {} of {} groups ({} test sources removed)",
            filter.kept_groups, filter.input_groups, filter.dropped_sources
        );
    }
    println!(
        "Pairs: {} positive, {} negative (shortfall {})",
        report.positives, report.negatives, report.negative_shortfall
    );
    for label in ALL_SPLITS {
        println!("{:<5} {:>8} lines", label.name(), report.splits.get(label));
    }
    if let Some(verification) = &report.verification {
        require_passed(&report.outputs.positive_flat, &verification.positive)?;
        require_passed(&report.outputs.negative_flat, &verification.negative)?;
        println!("Verification passed.");
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
