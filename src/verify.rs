//! Checks over flat pair files: label/group agreement and id resolvability.

use std::collections::HashSet;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::constants::verify::{FLAT_FIELD_COUNT, FUNC_ID_SEPARATOR};
use crate::data::PairLabel;
use crate::errors::PairsError;
use crate::transport::fs::open_reader;

/// Group prefix of a func id: the text before the first `_`.
pub fn group_prefix(func_id: &str) -> Option<&str> {
    func_id
        .split_once(FUNC_ID_SEPARATOR)
        .map(|(prefix, _)| prefix)
}

/// Why a flat pair line failed verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineFailure {
    /// Wrong number of tab-separated fields.
    FieldCount {
        /// Fields present.
        found: usize,
    },
    /// Label column does not match the file.
    Label {
        /// Label the file should carry.
        expected: PairLabel,
        /// Label text on the line.
        found: String,
    },
    /// An id lacks a group prefix.
    IdFormat {
        /// First id as written.
        id1: String,
        /// Second id as written.
        id2: String,
    },
    /// Group prefixes disagree with the label.
    GroupMismatch {
        /// Label on the line.
        label: PairLabel,
        /// Prefix of the first id.
        group1: String,
        /// Prefix of the second id.
        group2: String,
    },
}

impl fmt::Display for LineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineFailure::FieldCount { found } => {
                write!(f, "expected {FLAT_FIELD_COUNT} columns, found {found}")
            }
            LineFailure::Label { expected, found } => {
                write!(f, "expected label '{}', found '{found}'", expected.as_flat())
            }
            LineFailure::IdFormat { id1, id2 } => {
                write!(f, "func ids must contain '{FUNC_ID_SEPARATOR}' ({id1}, {id2})")
            }
            LineFailure::GroupMismatch {
                label: PairLabel::Positive,
                group1,
                group2,
            } => write!(f, "different groups ({group1} vs {group2}) labeled as 1"),
            LineFailure::GroupMismatch {
                label: PairLabel::Negative,
                group1,
                ..
            } => write!(f, "same group ({group1}) labeled as 0"),
        }
    }
}

/// One failing line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIssue {
    /// 1-based line number.
    pub line: usize,
    /// What went wrong.
    pub failure: LineFailure,
}

/// Outcome of verifying one flat pair file against an expected label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatVerification {
    /// Non-blank lines checked.
    pub total: usize,
    /// Lines that passed every check.
    pub valid: usize,
    /// Failures in line order.
    pub issues: Vec<LineIssue>,
}

impl FlatVerification {
    /// No line failed.
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check one flat line: 3 fields, expected label, and group prefixes agreeing with the label.
pub fn check_flat_line(line: &str, expected: PairLabel) -> Result<(), LineFailure> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() != FLAT_FIELD_COUNT {
        return Err(LineFailure::FieldCount { found: parts.len() });
    }
    let (id1, id2, label) = (parts[0], parts[1], parts[2]);
    if PairLabel::from_flat(label) != Some(expected) {
        return Err(LineFailure::Label {
            expected,
            found: label.to_string(),
        });
    }
    let (Some(group1), Some(group2)) = (group_prefix(id1), group_prefix(id2)) else {
        return Err(LineFailure::IdFormat {
            id1: id1.to_string(),
            id2: id2.to_string(),
        });
    };
    let same_group = group1 == group2;
    let consistent = match expected {
        PairLabel::Positive => same_group,
        PairLabel::Negative => !same_group,
    };
    if !consistent {
        return Err(LineFailure::GroupMismatch {
            label: expected,
            group1: group1.to_string(),
            group2: group2.to_string(),
        });
    }
    Ok(())
}

/// Check every non-blank line read from `reader`; blank lines are not counted.
pub fn verify_flat_reader<R: BufRead>(
    reader: R,
    expected: PairLabel,
) -> Result<FlatVerification, PairsError> {
    let mut report = FlatVerification::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        report.total += 1;
        match check_flat_line(trimmed, expected) {
            Ok(()) => report.valid += 1,
            Err(failure) => {
                warn!(line = idx + 1, "[clonepairs:verify] {failure}");
                report.issues.push(LineIssue {
                    line: idx + 1,
                    failure,
                });
            }
        }
    }
    Ok(report)
}

/// Verify a flat pair file where every line should carry `expected`.
pub fn verify_flat_file(path: &Path, expected: PairLabel) -> Result<FlatVerification, PairsError> {
    let report = verify_flat_reader(open_reader(path)?, expected)?;
    if report.passed() {
        info!(
            "[clonepairs:verify] {}: all {} lines valid (label {})",
            path.display(),
            report.total,
            expected.as_flat()
        );
    } else {
        warn!(
            "[clonepairs:verify] {}: {} of {} lines failed (label {})",
            path.display(),
            report.issues.len(),
            report.total,
            expected.as_flat()
        );
    }
    Ok(report)
}

/// Keys read from a function-export file.
#[derive(Clone, Debug, Default)]
pub struct MappingKeys {
    keys: HashSet<String>,
    /// Non-blank lines read.
    pub lines: usize,
    /// Lines that failed to parse or lacked the key field.
    pub bad: usize,
}

impl MappingKeys {
    /// Whether `key` was read.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Distinct keys read.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// No keys read.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Collect `key_field` values (strings, or numbers as text) from line-delimited JSON.
pub fn load_mapping_keys<R: BufRead>(reader: R, key_field: &str) -> Result<MappingKeys, PairsError> {
    let mut mapping = MappingKeys::default();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        mapping.lines += 1;
        let key = serde_json::from_str::<Value>(trimmed)
            .ok()
            .and_then(|value| match value.get(key_field) {
                Some(Value::String(text)) => Some(text.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            });
        match key {
            Some(key) => {
                mapping.keys.insert(key);
            }
            None => mapping.bad += 1,
        }
    }
    Ok(mapping)
}

/// A pair line with at least one id missing from the mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedPair {
    /// 1-based line number.
    pub line: usize,
    /// First id.
    pub id1: String,
    /// Second id.
    pub id2: String,
    /// Label text.
    pub label: String,
    /// `id1` is absent from the mapping.
    pub missing_first: bool,
    /// `id2` is absent from the mapping.
    pub missing_second: bool,
}

/// Resolvability report for one pair file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappingReport {
    /// Lines read, blank ones included.
    pub total_lines: usize,
    /// Lines with exactly three fields.
    pub parsed_pairs: usize,
    /// Non-blank lines with the wrong field count.
    pub bad_format: usize,
    /// Pairs with at least one unknown id.
    pub missing_pairs: usize,
    /// Unknown ids counted individually.
    pub missing_id_occurrences: usize,
    /// First few unresolved pairs.
    pub examples: Vec<UnresolvedPair>,
}

impl MappingReport {
    /// Every parsed pair resolved.
    pub fn passed(&self) -> bool {
        self.missing_pairs == 0
    }
}

/// Check every whitespace-separated `id1 id2 label` line resolves against `keys`.
pub fn verify_pairs_resolvable<R: BufRead>(
    reader: R,
    keys: &MappingKeys,
    max_examples: usize,
) -> Result<MappingReport, PairsError> {
    let mut report = MappingReport::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        report.total_lines += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() != FLAT_FIELD_COUNT {
            report.bad_format += 1;
            continue;
        }
        report.parsed_pairs += 1;
        let missing_first = !keys.contains(parts[0]);
        let missing_second = !keys.contains(parts[1]);
        if !(missing_first || missing_second) {
            continue;
        }
        report.missing_pairs += 1;
        report.missing_id_occurrences += usize::from(missing_first) + usize::from(missing_second);
        if report.examples.len() < max_examples {
            report.examples.push(UnresolvedPair {
                line: idx + 1,
                id1: parts[0].to_string(),
                id2: parts[1].to_string(),
                label: parts[2].to_string(),
                missing_first,
                missing_second,
            });
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn group_prefix_uses_first_separator() {
        assert_eq!(group_prefix("12_345"), Some("12"));
        assert_eq!(group_prefix("a_b_c"), Some("a"));
        assert_eq!(group_prefix("nounderscore"), None);
    }

    #[test]
    fn positive_file_passes_and_reports_mismatches() {
        let text = "1_0\t1_1\t1\n\n2_3\t2_4\t1\n1_0\t2_3\t1\n1_0\t1_2\t0\n1_0\t1_2\n";
        let report = verify_flat_reader(Cursor::new(text), PairLabel::Positive).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.valid, 2);
        assert!(!report.passed());
        let failures: Vec<&LineFailure> = report.issues.iter().map(|i| &i.failure).collect();
        assert!(matches!(failures[0], LineFailure::GroupMismatch { .. }));
        assert!(matches!(failures[1], LineFailure::Label { .. }));
        assert_eq!(failures[2], &LineFailure::FieldCount { found: 2 });
        assert_eq!(report.issues[0].line, 4);
    }

    #[test]
    fn negative_file_rejects_same_group() {
        let text = "1_0\t2_3\t0\n1_0\t1_1\t0\nabc\t2_3\t0\n";
        let report = verify_flat_reader(Cursor::new(text), PairLabel::Negative).unwrap();
        assert_eq!(report.valid, 1);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(
            report.issues[0].failure.to_string(),
            "same group (1) labeled as 0"
        );
        assert!(matches!(
            report.issues[1].failure,
            LineFailure::IdFormat { .. }
        ));
    }

    #[test]
    fn mapping_keys_accept_strings_and_numbers() {
        let text = "{\"func\": \"a\", \"idx\": \"1_0\"}\n{\"idx\": 7}\nnot json\n{\"func\": \"b\"}\n";
        let keys = load_mapping_keys(Cursor::new(text), "idx").unwrap();
        assert_eq!(keys.lines, 4);
        assert_eq!(keys.bad, 2);
        assert!(keys.contains("1_0"));
        assert!(keys.contains("7"));
    }

    #[test]
    fn unresolved_pairs_are_counted_with_examples() {
        let keys = load_mapping_keys(
            Cursor::new("{\"idx\": \"1_0\"}\n{\"idx\": \"1_1\"}\n"),
            "idx",
        )
        .unwrap();
        let pairs = "1_0\t1_1\t1\n1_0 9_9 0\n8_8\t9_9\t0\nbroken line\n";
        let report = verify_pairs_resolvable(Cursor::new(pairs), &keys, 1).unwrap();
        assert_eq!(report.total_lines, 4);
        assert_eq!(report.parsed_pairs, 3);
        assert_eq!(report.bad_format, 1);
        assert_eq!(report.missing_pairs, 2);
        assert_eq!(report.missing_id_occurrences, 3);
        assert_eq!(report.examples.len(), 1);
        assert!(report.examples[0].missing_second);
        assert!(!report.passed());
    }
}
