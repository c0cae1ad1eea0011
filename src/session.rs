//! Per-view selection state owned by the front-end.
//!
//! The query functions take every filter as an argument; this store only
//! remembers what each view last asked for between interactions.

use crate::filter::Predicates;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    Departments,
    TimeSeries,
    TopDepartments,
    TopDistricts,
    CleanestDistricts,
    Map,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewSelection {
    pub predicates: Predicates,
    pub measure: Option<String>,
    pub top_n: Option<usize>,
    pub exclude: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    views: HashMap<ViewId, ViewSelection>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last selection for `view`, or the empty selection.
    pub fn get(&self, view: ViewId) -> ViewSelection {
        self.views.get(&view).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, view: ViewId, selection: ViewSelection) {
        self.views.insert(view, selection);
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selections_are_kept_per_view() {
        let mut store = SessionStore::new();
        let sel = ViewSelection {
            predicates: Predicates::new().period(2021),
            measure: Some("QRESIDUOS_DOM".to_string()),
            top_n: Some(5),
            ..ViewSelection::default()
        };
        store.set(ViewId::TopDistricts, sel.clone());
        assert_eq!(store.get(ViewId::TopDistricts), sel);
        assert_eq!(store.get(ViewId::Map), ViewSelection::default());
        store.clear();
        assert_eq!(store.get(ViewId::TopDistricts), ViewSelection::default());
    }
}
