use crate::store::GroupStore;
use crate::types::FuncId;

/// Explicit global counter threaded through id assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    /// Counter starting at `0`.
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&mut self) -> u64 {
        let current = self.next;
        self.next += 1;
        current
    }
}

/// `{classid}_{globalIndex}`.
pub fn format_func_id(classid: &str, index: u64) -> FuncId {
    format!("{classid}_{index}")
}

/// Assign a func id to every source, groups in stored order then sources in order.
///
/// Existing ids are overwritten. Returns the number of functions tagged.
pub fn assign_func_ids(store: &mut GroupStore, counter: &mut IdCounter) -> usize {
    let mut tagged = 0;
    for group in store.groups_mut() {
        for source in &mut group.sources {
            source.func_id = Some(format_func_id(&group.classid, counter.advance()));
            tagged += 1;
        }
    }
    tagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CloneGroup, FunctionRecord};
    use std::collections::HashSet;

    fn record(name: &str) -> FunctionRecord {
        serde_json::from_value(serde_json::json!({ "qualified_name": name })).unwrap()
    }

    fn two_group_store() -> GroupStore {
        GroupStore::from_groups([
            CloneGroup::new("1", vec![record("a"), record("b"), record("c")]),
            CloneGroup::new("2", vec![record("d"), record("e")]),
        ])
    }

    #[test]
    fn ids_follow_flattened_input_order() {
        let mut store = two_group_store();
        let mut counter = IdCounter::new();
        assert_eq!(assign_func_ids(&mut store, &mut counter), 5);
        assert_eq!(counter, IdCounter { next: 5 });
        let ids: Vec<&str> = store
            .flattened()
            .iter()
            .filter_map(|f| f.record.func_id())
            .collect();
        assert_eq!(ids, vec!["1_0", "1_1", "1_2", "2_3", "2_4"]);
    }

    #[test]
    fn rerun_with_fresh_counter_is_idempotent() {
        let mut store = two_group_store();
        assign_func_ids(&mut store, &mut IdCounter::new());
        let first: Vec<CloneGroup> = store.groups().cloned().collect();
        assign_func_ids(&mut store, &mut IdCounter::new());
        let second: Vec<CloneGroup> = store.groups().cloned().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn threaded_counter_continues_across_corpora() {
        let mut first = two_group_store();
        let mut second = two_group_store();
        let mut counter = IdCounter::new();
        assign_func_ids(&mut first, &mut counter);
        assign_func_ids(&mut second, &mut counter);
        let ids: HashSet<String> = first
            .flattened()
            .iter()
            .chain(second.flattened().iter())
            .filter_map(|f| f.record.func_id().map(str::to_string))
            .collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(
            second.groups().next().unwrap().sources[0].func_id(),
            Some("1_5")
        );
    }
}
