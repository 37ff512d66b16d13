use crate::splits::SplitLabel;

/// Constants used by the group store and its validation.
pub mod store {
    /// Minimum number of clone groups required before any pairing work.
    pub const MIN_GROUPS: usize = 2;
    /// Minimum number of functions required before any pairing work.
    pub const MIN_FUNCTIONS: usize = 2;
    /// Log message used when malformed records are skipped.
    pub const SKIP_MALFORMED_MSG: &str = "skipping malformed clone group record";
}

/// Constants used by positive/negative pair sampling.
pub mod sampler {
    /// Seed used when no explicit seed is configured.
    pub const DEFAULT_SEED: u64 = 42;
    /// Negative target used when the corpus has no positive capacity to balance against.
    pub const FALLBACK_NEGATIVE_TARGET: usize = 10;
    /// Lower bound on the negative sampling attempt budget.
    pub const MIN_NEGATIVE_ATTEMPTS: usize = 1000;
    /// Attempts granted per requested negative pair.
    pub const ATTEMPTS_PER_NEGATIVE: usize = 50;
    /// Flat-form label for positive pairs.
    pub const POSITIVE_LABEL: &str = "1";
    /// Flat-form label for negative pairs.
    pub const NEGATIVE_LABEL: &str = "0";
}

/// Constants used by split/combine and split file naming.
pub mod splits {
    use super::SplitLabel;

    /// Canonical split order used when cutting and writing splits.
    pub const ALL_SPLITS: [SplitLabel; 3] = [SplitLabel::Train, SplitLabel::Valid, SplitLabel::Test];
    /// Seed offset mixed into the train recombination shuffle.
    pub const TRAIN_SEED_OFFSET: u64 = 1;
    /// Seed offset mixed into the valid recombination shuffle.
    pub const VALID_SEED_OFFSET: u64 = 2;
    /// Seed offset mixed into the test recombination shuffle.
    pub const TEST_SEED_OFFSET: u64 = 3;
    /// Output file name for the train split.
    pub const TRAIN_FILENAME: &str = "train.txt";
    /// Output file name for the valid split.
    pub const VALID_FILENAME: &str = "valid.txt";
    /// Output file name for the test split.
    pub const TEST_FILENAME: &str = "test.txt";
}

/// Constants used by tokenization and similarity scoring.
pub mod similarity {
    /// Placeholder emitted for numeric literals under normalization.
    pub const NUM_PLACEHOLDER: &str = "NUM";
    /// Placeholder emitted for non-keyword identifiers under normalization.
    pub const ID_PLACEHOLDER: &str = "ID";
    /// Token window size used for order-aware similarity.
    pub const TRIGRAM_WIDTH: usize = 3;
    /// Closed keyword vocabulary (Java) left untouched by normalization.
    pub const KEYWORDS: &[&str] = &[
        "abstract",
        "assert",
        "boolean",
        "break",
        "byte",
        "case",
        "catch",
        "char",
        "class",
        "const",
        "continue",
        "default",
        "do",
        "double",
        "else",
        "enum",
        "extends",
        "final",
        "finally",
        "float",
        "for",
        "goto",
        "if",
        "implements",
        "import",
        "instanceof",
        "int",
        "interface",
        "long",
        "native",
        "new",
        "package",
        "private",
        "protected",
        "public",
        "return",
        "short",
        "static",
        "strictfp",
        "super",
        "switch",
        "synchronized",
        "this",
        "throw",
        "throws",
        "transient",
        "try",
        "void",
        "volatile",
        "while",
        "var",
        "record",
        "sealed",
        "permits",
        "yield",
    ];
}

/// Constants used by the test-source filter.
pub mod filter {
    /// Default minimum number of sources a group must keep after test removal.
    pub const DEFAULT_MIN_REMAINING: usize = 2;
    /// Directory patterns marking a path as test code.
    pub const TEST_DIR_PATTERNS: &[&str] = &[
        r"(^|/)src/test(/|/java/|/resources/|$)",
        r"(^|/)src/it(/|$)",
        r"(^|/)src/integration-test(/|$)",
        r"(^|/)test(/|$)",
        r"(^|/)tests(/|$)",
    ];
    /// File-name patterns marking a path as test code.
    pub const TEST_FILENAME_PATTERNS: &[&str] = &[
        r"Test\.java$",
        r"Tests\.java$",
        r"TestCase\.java$",
        r"IT\.java$",
        r"ITCase\.java$",
        r"IntegrationTest\.java$",
    ];
}

/// Constants used by pair-file verification.
pub mod verify {
    /// Number of tab-separated fields in a flat pair line.
    pub const FLAT_FIELD_COUNT: usize = 3;
    /// Separator between group prefix and global index inside a func id.
    pub const FUNC_ID_SEPARATOR: char = '_';
    /// Default key field read from function-export files.
    pub const DEFAULT_KEY_FIELD: &str = "idx";
    /// Default number of unresolved examples kept per pair file.
    pub const DEFAULT_MAX_EXAMPLES: usize = 10;
}

/// Output file names written by the end-to-end build.
pub mod pipeline {
    /// Corpus with func ids assigned.
    pub const CORPUS_FILENAME: &str = "corpus_with_func_id.jsonl";
    /// Positive pairs, JSON form.
    pub const POSITIVE_JSONL_FILENAME: &str = "pos_pairs.jsonl";
    /// Positive pairs, flat form.
    pub const POSITIVE_FLAT_FILENAME: &str = "pos_pairs.txt";
    /// Negative pairs, JSON form.
    pub const NEGATIVE_JSONL_FILENAME: &str = "neg_pairs.jsonl";
    /// Negative pairs, flat form.
    pub const NEGATIVE_FLAT_FILENAME: &str = "neg_pairs.txt";
}
