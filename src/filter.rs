//! Removes test code from clone groups before ids are assigned.

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use tracing::info;

use crate::config::{FilterConfig, FilterMode};
use crate::constants::filter::{TEST_DIR_PATTERNS, TEST_FILENAME_PATTERNS};
use crate::store::GroupStore;

static TEST_PATHS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(TEST_DIR_PATTERNS.iter().chain(TEST_FILENAME_PATTERNS))
        .expect("test path patterns are valid regexes")
});

static BACKSLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\+").expect("backslash pattern is a valid regex"));

/// True when `path` looks like test code, by directory or file name.
pub fn is_test_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let normalized = BACKSLASH.replace_all(path, "/");
    TEST_PATHS.is_match(&normalized)
}

/// Group and source counts from one filter pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Groups before filtering.
    pub input_groups: usize,
    /// Groups still in the store.
    pub kept_groups: usize,
    /// Groups removed.
    pub dropped_groups: usize,
    /// Test sources removed from groups that were kept.
    pub dropped_sources: usize,
}

/// Apply the test filter in place; `nclones` is reset on every edited group.
pub fn filter_test_sources(store: &mut GroupStore, config: FilterConfig) -> FilterReport {
    let mut report = FilterReport {
        input_groups: store.len(),
        ..FilterReport::default()
    };

    store.retain_groups(|group| {
        let keep = match config.mode {
            FilterMode::DropGroupIfAnyTest => {
                !group.sources.iter().any(|record| is_test_path(&record.file))
            }
            FilterMode::DropOnlyTestSources => {
                let before = group.sources.len();
                group.sources.retain(|record| !is_test_path(&record.file));
                let remaining = group.sources.len();
                let removed = before - remaining;
                group.nclones = remaining;
                let keep = remaining > 0 && remaining >= config.min_remaining;
                if keep {
                    report.dropped_sources += removed;
                }
                keep
            }
        };
        if keep {
            report.kept_groups += 1;
        } else {
            report.dropped_groups += 1;
        }
        keep
    });

    info!(
        "[clonepairs:filter] mode={:?} input={} kept={} dropped={} dropped_sources={}",
        config.mode,
        report.input_groups,
        report.kept_groups,
        report.dropped_groups,
        report.dropped_sources
    );
    report
}
