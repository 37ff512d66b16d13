//! Ordered, validated clone-group corpus loaded from line-delimited JSON.

use std::io::{BufRead, Write};
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::capacity::PairCapacity;
use crate::constants::store::{MIN_FUNCTIONS, MIN_GROUPS, SKIP_MALFORMED_MSG};
use crate::data::{CloneGroup, FunctionRecord};
use crate::errors::PairsError;
use crate::transport::fs::{create_writer, open_reader};
use crate::types::ClassId;

/// Counters collected while loading a corpus.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Non-blank lines seen.
    pub records_read: usize,
    /// Lines that failed to parse or lacked `classid` / non-empty `sources`.
    pub malformed: usize,
    /// Records whose classid was already present (last one wins).
    pub duplicate_classids: usize,
    /// Groups whose `nclones` disagreed with `sources.len()` and was corrected.
    pub nclones_corrected: usize,
}

/// A flattened view of one function and the group it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct GroupedFunction<'a> {
    /// Owning group.
    pub classid: &'a ClassId,
    /// The function.
    pub record: &'a FunctionRecord,
}

/// Insertion-ordered clone groups keyed by classid.
#[derive(Clone, Debug, Default)]
pub struct GroupStore {
    groups: IndexMap<ClassId, CloneGroup>,
    report: LoadReport,
}

impl GroupStore {
    /// Build a store from already-parsed groups, applying the same validation as file loads.
    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = CloneGroup>,
    {
        let mut store = Self::default();
        for group in groups {
            store.report.records_read += 1;
            store.admit(group, None);
        }
        store
    }

    /// Parse one group per line. Bad lines are skipped and counted; read failures are fatal.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, PairsError> {
        let mut store = Self::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            store.report.records_read += 1;
            match serde_json::from_str::<CloneGroup>(trimmed) {
                Ok(group) => store.admit(group, Some(line_no)),
                Err(err) => {
                    store.report.malformed += 1;
                    warn!(
                        line = line_no,
                        error = %err,
                        "[clonepairs:store] {SKIP_MALFORMED_MSG}"
                    );
                }
            }
        }
        info!(
            "[clonepairs:store] loaded {} groups with {} functions ({} malformed records skipped)",
            store.len(),
            store.total_functions(),
            store.report.malformed
        );
        Ok(store)
    }

    /// Open and parse a corpus file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PairsError> {
        let reader = open_reader(path.as_ref())?;
        Self::from_reader(reader)
    }

    fn admit(&mut self, mut group: CloneGroup, line_no: Option<usize>) {
        if group.sources.is_empty() {
            self.report.malformed += 1;
            warn!(
                line = line_no,
                classid = %group.classid,
                "[clonepairs:store] {SKIP_MALFORMED_MSG}: no sources"
            );
            return;
        }
        if group.nclones != group.sources.len() {
            debug!(
                classid = %group.classid,
                nclones = group.nclones,
                sources = group.sources.len(),
                "[clonepairs:store] correcting nclones"
            );
            group.nclones = group.sources.len();
            self.report.nclones_corrected += 1;
        }
        let classid = group.classid.clone();
        if self.groups.insert(classid.clone(), group).is_some() {
            self.report.duplicate_classids += 1;
            warn!(
                line = line_no,
                classid = %classid,
                "[clonepairs:store] duplicate classid, keeping the later record"
            );
        }
    }

    /// Counts from the load that built this store.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// No groups loaded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in stored order.
    pub fn groups(&self) -> impl Iterator<Item = &CloneGroup> {
        self.groups.values()
    }

    pub(crate) fn groups_mut(&mut self) -> impl Iterator<Item = &mut CloneGroup> {
        self.groups.values_mut()
    }

    /// Keep only groups for which `keep` returns true; `keep` may edit the group.
    pub(crate) fn retain_groups<F>(&mut self, mut keep: F)
    where
        F: FnMut(&mut CloneGroup) -> bool,
    {
        self.groups.retain(|_, group| keep(group));
    }

    /// Look up one group by classid.
    pub fn group(&self, classid: &str) -> Option<&CloneGroup> {
        self.groups.get(classid)
    }

    /// Source records across all groups.
    pub fn total_functions(&self) -> usize {
        self.groups.values().map(CloneGroup::len).sum()
    }

    /// Sum of `C(n, 2)` over all groups.
    pub fn total_positive_capacity(&self) -> u128 {
        self.capacity().positive
    }

    /// Pair capacity totals for the current groups.
    pub fn capacity(&self) -> PairCapacity {
        PairCapacity::from_store(self)
    }

    /// Every function across all groups, in group order then source order.
    pub fn flattened(&self) -> Vec<GroupedFunction<'_>> {
        self.groups
            .values()
            .flat_map(|group| {
                group.sources.iter().map(move |record| GroupedFunction {
                    classid: &group.classid,
                    record,
                })
            })
            .collect()
    }

    /// Structural precondition for any pairing work.
    pub fn ensure_pairable(&self) -> Result<(), PairsError> {
        let groups = self.len();
        let functions = self.total_functions();
        if groups < MIN_GROUPS || functions < MIN_FUNCTIONS {
            return Err(PairsError::InsufficientData { groups, functions });
        }
        Ok(())
    }

    /// Write groups back as line-delimited JSON, preserving order and unknown fields.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<usize, PairsError> {
        let mut written = 0;
        for group in self.groups.values() {
            serde_json::to_writer(&mut writer, group)?;
            writer.write_all(b"\n")?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    /// Write groups to `path`, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<usize, PairsError> {
        let writer = create_writer(path.as_ref())?;
        self.write_jsonl(writer)
    }
}
