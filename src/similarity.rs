//! Token-level similarity used to sanity-check clone group cohesion.
//!
//! Snippets are tokenized with a fixed lexical grammar, optionally normalized
//! (`NUM` for numbers, `ID` for non-keyword identifiers), and compared pairwise
//! with set Jaccard and trigram Jaccard.

use std::collections::HashSet;
use std::hash::Hash;

use once_cell::sync::Lazy;
use rand::seq::index;
use regex::Regex;

use crate::constants::similarity::{ID_PLACEHOLDER, KEYWORDS, NUM_PLACEHOLDER, TRIGRAM_WIDTH};
use crate::data::CloneGroup;
use crate::errors::PairsError;
use crate::rng::DeterministicRng;
use crate::store::GroupStore;
use crate::types::{ClassId, TokenText};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<ident>[A-Za-z_]\w*)|(?P<num>\d+)|(?P<op>==|!=|<=|>=|&&|\|\||[{}()\[\].,;:+\-*/%<>=!&|^~?])",
    )
    .expect("token pattern is a valid regex")
});

static KEYWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| KEYWORDS.iter().copied().collect());

/// Lexical class of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Name that is not a keyword.
    Identifier,
    /// Reserved word.
    Keyword,
    /// Integer literal.
    Number,
    /// Operator or delimiter.
    Punct,
}

/// One scanned token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    /// Lexical class.
    pub kind: TokenKind,
    /// Source text as matched.
    pub text: TokenText,
}

/// Whether `word` is in the keyword vocabulary.
pub fn is_keyword(word: &str) -> bool {
    KEYWORD_SET.contains(word)
}

/// Scan `code` into tokens. Characters outside the grammar (whitespace, quotes, `@`, ...) are skipped.
pub fn tokenize(code: &str) -> Vec<Token> {
    TOKEN_RE
        .captures_iter(code)
        .filter_map(|caps| {
            if let Some(m) = caps.name("ident") {
                let kind = if is_keyword(m.as_str()) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                Some(Token {
                    kind,
                    text: m.as_str().to_string(),
                })
            } else if let Some(m) = caps.name("num") {
                Some(Token {
                    kind: TokenKind::Number,
                    text: m.as_str().to_string(),
                })
            } else {
                caps.name("op").map(|m| Token {
                    kind: TokenKind::Punct,
                    text: m.as_str().to_string(),
                })
            }
        })
        .collect()
}

/// Collapse numbers to `NUM` and non-keyword identifiers to `ID`.
pub fn normalize_tokens(tokens: &[Token]) -> Vec<TokenText> {
    tokens
        .iter()
        .map(|token| match token.kind {
            TokenKind::Number => NUM_PLACEHOLDER.to_string(),
            TokenKind::Identifier => ID_PLACEHOLDER.to_string(),
            TokenKind::Keyword | TokenKind::Punct => token.text.clone(),
        })
        .collect()
}

/// Token texts for `code`, normalized when requested.
pub fn token_stream(code: &str, normalize: bool) -> Vec<TokenText> {
    let tokens = tokenize(code);
    if normalize {
        normalize_tokens(&tokens)
    } else {
        tokens.into_iter().map(|token| token.text).collect()
    }
}

/// `|A ∩ B| / |A ∪ B|`, with two empty sets scoring 1.0.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Set Jaccard over token texts.
pub fn token_jaccard(a: &[TokenText], b: &[TokenText]) -> f64 {
    let left: HashSet<&TokenText> = a.iter().collect();
    let right: HashSet<&TokenText> = b.iter().collect();
    jaccard(&left, &right)
}

/// Contiguous 3-token windows. Shorter non-empty sequences form one gram.
pub fn trigram_set(tokens: &[TokenText]) -> HashSet<&[TokenText]> {
    if tokens.is_empty() {
        return HashSet::new();
    }
    if tokens.len() < TRIGRAM_WIDTH {
        return HashSet::from([tokens]);
    }
    tokens.windows(TRIGRAM_WIDTH).collect()
}

/// Jaccard over [`trigram_set`]s.
pub fn trigram_jaccard(a: &[TokenText], b: &[TokenText]) -> f64 {
    jaccard(&trigram_set(a), &trigram_set(b))
}

/// Both similarity metrics for one ordered pair of snippets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairSimilarity {
    /// Jaccard over distinct tokens.
    pub token_jaccard: f64,
    /// Jaccard over token trigrams.
    pub trigram_jaccard: f64,
}

impl PairSimilarity {
    /// Score two token streams.
    pub fn between(a: &[TokenText], b: &[TokenText]) -> Self {
        Self {
            token_jaccard: token_jaccard(a, b),
            trigram_jaccard: trigram_jaccard(a, b),
        }
    }
}

/// One matrix entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatrixCell {
    /// Diagonal; not scored.
    SelfComparison,
    /// Scores for two distinct members.
    Pair(PairSimilarity),
}

/// Mean and minimum over the off-diagonal cells of a matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixSummary {
    /// Unordered off-diagonal pairs counted.
    pub pairs: usize,
    /// Mean token Jaccard.
    pub mean_token_jaccard: f64,
    /// Mean trigram Jaccard.
    pub mean_trigram_jaccard: f64,
    /// Lowest token Jaccard.
    pub min_token_jaccard: f64,
    /// Lowest trigram Jaccard.
    pub min_trigram_jaccard: f64,
}

/// Row-major `n x n` similarity matrix for one group.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    cells: Vec<MatrixCell>,
}

impl SimilarityMatrix {
    /// Members per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell at `(row, col)`, or `None` out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&MatrixCell> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(row * self.size + col)
    }

    /// Rows in order, each as a slice of cells.
    pub fn rows(&self) -> impl Iterator<Item = &[MatrixCell]> {
        self.cells.chunks(self.size.max(1))
    }

    /// `None` for groups with fewer than 2 members.
    pub fn summary(&self) -> Option<MatrixSummary> {
        let mut pairs = 0usize;
        let mut token_sum = 0.0;
        let mut trigram_sum = 0.0;
        let mut token_min = f64::INFINITY;
        let mut trigram_min = f64::INFINITY;
        for row in 0..self.size {
            for col in (row + 1)..self.size {
                if let Some(MatrixCell::Pair(sim)) = self.get(row, col) {
                    pairs += 1;
                    token_sum += sim.token_jaccard;
                    trigram_sum += sim.trigram_jaccard;
                    token_min = token_min.min(sim.token_jaccard);
                    trigram_min = trigram_min.min(sim.trigram_jaccard);
                }
            }
        }
        if pairs == 0 {
            return None;
        }
        Some(MatrixSummary {
            pairs,
            mean_token_jaccard: token_sum / pairs as f64,
            mean_trigram_jaccard: trigram_sum / pairs as f64,
            min_token_jaccard: token_min,
            min_trigram_jaccard: trigram_min,
        })
    }
}

/// Computes per-group similarity matrices. Holds no state beyond the normalization toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimilarityEngine {
    /// Compare normalized streams instead of raw token text.
    pub normalize: bool,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self { normalize: true }
    }
}

impl SimilarityEngine {
    /// Engine with the given normalization setting.
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }

    /// Compare every pair of sources in `group`.
    pub fn group_matrix(&self, group: &CloneGroup) -> SimilarityMatrix {
        let streams: Vec<Vec<TokenText>> = group
            .sources
            .iter()
            .map(|record| token_stream(&record.code, self.normalize))
            .collect();
        let size = streams.len();
        let mut cells = Vec::with_capacity(size * size);
        for (row, left) in streams.iter().enumerate() {
            for (col, right) in streams.iter().enumerate() {
                if row == col {
                    cells.push(MatrixCell::SelfComparison);
                } else {
                    cells.push(MatrixCell::Pair(PairSimilarity::between(left, right)));
                }
            }
        }
        SimilarityMatrix { size, cells }
    }
}

/// Which groups to inspect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupSelection {
    /// One group by id; the similarity filter is not applied.
    ClassId(ClassId),
    /// Seeded sample of up to `count` groups from the filtered set.
    Random {
        /// Groups to draw.
        count: usize,
        /// Sampling seed.
        seed: u64,
    },
    /// First `limit` groups of the filtered set (at least one).
    First(usize),
}

/// Resolve `selection` against `store`, keeping only groups whose `similarity` is at least
/// `min_similarity` when given.
pub fn select_groups<'a>(
    store: &'a GroupStore,
    selection: &GroupSelection,
    min_similarity: Option<f64>,
) -> Result<Vec<&'a CloneGroup>, PairsError> {
    match *selection {
        GroupSelection::ClassId(ref classid) => store
            .group(classid)
            .map(|group| vec![group])
            .ok_or_else(|| PairsError::Configuration(format!("classid {classid} not found"))),
        GroupSelection::Random { count, seed } => {
            let filtered = filter_by_similarity(store, min_similarity);
            if filtered.is_empty() {
                return Err(PairsError::Configuration(
                    "no groups match the similarity filter".to_string(),
                ));
            }
            let amount = count.min(filtered.len());
            let mut rng = DeterministicRng::new(seed);
            Ok(index::sample(&mut rng, filtered.len(), amount)
                .into_iter()
                .map(|idx| filtered[idx])
                .collect())
        }
        GroupSelection::First(limit) => Ok(filter_by_similarity(store, min_similarity)
            .into_iter()
            .take(limit.max(1))
            .collect()),
    }
}

fn filter_by_similarity(store: &GroupStore, min_similarity: Option<f64>) -> Vec<&CloneGroup> {
    store
        .groups()
        .filter(|group| match min_similarity {
            Some(min) => group.similarity.is_some_and(|sim| sim >= min),
            None => true,
        })
        .collect()
}
