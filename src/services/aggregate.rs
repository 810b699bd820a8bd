// Aggregation helpers shared by the dashboard views.

use std::collections::HashMap;

use serde::Serialize;

/// One bar/slice of a chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    /// Value to put in the matching facet when this entry is clicked.
    pub key: String,
    /// Display label.
    pub name: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Group `items` by `key`, count, and sort by count descending.
///
/// `key` returns (facet key, display label). Equal counts keep the order in
/// which their group was first seen.
pub fn distribution<T, F>(items: &[T], key: F) -> Vec<CountEntry>
where
    F: Fn(&T) -> (String, String),
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<CountEntry> = Vec::new();

    for item in items {
        let (key, name) = key(item);
        match index.get(&key) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(key.clone(), entries.len());
                entries.push(CountEntry {
                    key,
                    name,
                    count: 1,
                    color: None,
                });
            }
        }
    }

    // `sort_by` is stable, which is what keeps first-seen order for ties.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

/// The exact subset of `items` matching `predicate`, in original order.
pub fn drill_down<T, P>(items: &[T], predicate: P) -> Vec<T>
where
    T: Clone,
    P: Fn(&T) -> bool,
{
    items.iter().filter(|item| predicate(item)).cloned().collect()
}

/// Selecting the active filter again clears it; anything else replaces it.
pub fn toggle<F: PartialEq>(current: Option<F>, selected: F) -> Option<F> {
    match current {
        Some(active) if active == selected => None,
        _ => Some(selected),
    }
}
