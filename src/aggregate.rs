use crate::error::ColumnNotFoundError;
use crate::filter::{filter, Predicates};
use crate::types::{
    Bucket, GroupValue, Record, Table, DEPARTMENT_COLUMN, DISTRICT_COLUMN, PERIOD_COLUMN,
    PROVINCE_COLUMN,
};
use crate::util::normalize_key;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Department,
    Province,
    Period,
    District,
}

impl GroupKey {
    pub fn column(self) -> &'static str {
        match self {
            GroupKey::Department => DEPARTMENT_COLUMN,
            GroupKey::Province => PROVINCE_COLUMN,
            GroupKey::Period => PERIOD_COLUMN,
            GroupKey::District => DISTRICT_COLUMN,
        }
    }

    // Missing period or empty location means the row has no key here.
    fn of(self, record: &Record) -> Option<GroupValue> {
        let text = |s: &str| (!s.is_empty()).then(|| GroupValue::Text(s.to_string()));
        match self {
            GroupKey::Department => text(&record.department),
            GroupKey::Province => text(&record.province),
            GroupKey::District => text(&record.district),
            GroupKey::Period => record.period.map(GroupValue::Period),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Ascending by key.
    #[default]
    Key,
    /// Descending by summed value; ties keep encounter order.
    ValueDesc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub group_key: GroupKey,
    pub measure: String,
    pub sort: SortBy,
    pub top_n: Option<usize>,
    pub exclude: BTreeSet<String>,
}

impl AggregateQuery {
    pub fn new(group_key: GroupKey, measure: &str) -> Self {
        Self {
            group_key,
            measure: measure.to_string(),
            sort: SortBy::Key,
            top_n: None,
            exclude: BTreeSet::new(),
        }
    }

    pub fn sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Drop a group from the result after summing (e.g. hide LIMA).
    pub fn exclude(mut self, key: &str) -> Self {
        self.exclude.insert(normalize_key(key));
        self
    }
}

/// Grouped sums of one measure.
///
/// Groups only exist for keys that occur in the input, so an empty table
/// gives an empty result. Missing measure cells count as zero. Rows without a
/// key for `group_key` (no period, blank location) are left out of the
/// grouping; see [`GroupKey`].
pub fn aggregate_sum(
    table: &Table,
    query: &AggregateQuery,
) -> Result<Vec<Bucket>, ColumnNotFoundError> {
    let measure_idx = table.column_index(&query.measure)?;
    table.column_index(query.group_key.column())?;

    let mut groups: IndexMap<GroupValue, f64> = IndexMap::new();
    for record in table.records() {
        if let Some(key) = query.group_key.of(record) {
            *groups.entry(key).or_insert(0.0) += record.value(measure_idx).unwrap_or(0.0);
        }
    }

    let mut buckets: Vec<Bucket> = groups
        .into_iter()
        .filter(|(key, _)| !query.exclude.contains(&normalize_key(&key.to_string())))
        .map(|(key, value)| Bucket::new(key, value))
        .collect();

    // `sort_by` is stable, so equal sums stay in encounter order.
    match query.sort {
        SortBy::Key => buckets.sort_by(|a, b| a.key.cmp(&b.key)),
        SortBy::ValueDesc => {
            buckets.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal))
        }
    }
    if let Some(n) = query.top_n {
        buckets.truncate(n);
    }
    Ok(buckets)
}

/// Yearly totals of one measure for a location selection, oldest first.
pub fn time_series(
    table: &Table,
    location: &Predicates,
    measure: &str,
) -> Result<Vec<Bucket>, ColumnNotFoundError> {
    let location = Predicates {
        period: None,
        ..location.clone()
    };
    aggregate_sum(
        &filter(table, &location),
        &AggregateQuery::new(GroupKey::Period, measure),
    )
}
