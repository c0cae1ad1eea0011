//! Row filtering and selector option lists.

use crate::types::{Record, Table};
use crate::util::normalize_key;
use std::collections::BTreeSet;

/// Optional equality predicates, combined with AND. Absent fields match
/// everything. Text values are normalized on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicates {
    pub period: Option<i32>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(mut self, period: i32) -> Self {
        self.period = Some(period);
        self
    }

    pub fn department(mut self, department: &str) -> Self {
        self.department = Some(normalize_key(department));
        self
    }

    pub fn province(mut self, province: &str) -> Self {
        self.province = Some(normalize_key(province));
        self
    }

    pub fn district(mut self, district: &str) -> Self {
        self.district = Some(normalize_key(district));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.period.is_none()
            && self.department.is_none()
            && self.province.is_none()
            && self.district.is_none()
    }

    /// Union of two predicate sets; `None` if they pin a field to different values.
    pub fn merge(&self, other: &Predicates) -> Option<Predicates> {
        fn pick<T: Clone + PartialEq>(a: &Option<T>, b: &Option<T>) -> Option<Option<T>> {
            match (a, b) {
                (Some(x), Some(y)) if x != y => None,
                (Some(x), _) | (None, Some(x)) => Some(Some(x.clone())),
                (None, None) => Some(None),
            }
        }
        Some(Predicates {
            period: pick(&self.period, &other.period)?,
            department: pick(&self.department, &other.department)?,
            province: pick(&self.province, &other.province)?,
            district: pick(&self.district, &other.district)?,
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        fn text_ok(wanted: &Option<String>, actual: &str) -> bool {
            wanted
                .as_deref()
                .map_or(true, |w| normalize_key(w) == actual)
        }
        // A period predicate never matches a row with no period.
        self.period.map_or(true, |p| record.period == Some(p))
            && text_ok(&self.department, &record.department)
            && text_ok(&self.province, &record.province)
            && text_ok(&self.district, &record.district)
    }
}

/// Rows matching every present predicate, in source order. No match is an
/// empty table, not an error.
pub fn filter(table: &Table, predicates: &Predicates) -> Table {
    if predicates.is_empty() {
        return table.clone();
    }
    let records = table
        .records()
        .iter()
        .filter(|r| predicates.matches(r))
        .cloned()
        .collect();
    table.with_records(records)
}

pub fn periods(table: &Table) -> Vec<i32> {
    table
        .records()
        .iter()
        .filter_map(|r| r.period)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn distinct<'a>(records: impl Iterator<Item = &'a str>) -> Vec<String> {
    records
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn departments(table: &Table) -> Vec<String> {
    distinct(table.records().iter().map(|r| r.department.as_str()))
}

/// Provinces of one department.
pub fn provinces(table: &Table, department: &str) -> Vec<String> {
    let department = normalize_key(department);
    distinct(
        table
            .records()
            .iter()
            .filter(|r| r.department == department)
            .map(|r| r.province.as_str()),
    )
}

/// Districts of one province within one department.
pub fn districts(table: &Table, department: &str, province: &str) -> Vec<String> {
    let department = normalize_key(department);
    let province = normalize_key(province);
    distinct(
        table
            .records()
            .iter()
            .filter(|r| r.department == department && r.province == province)
            .map(|r| r.district.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::loader::parse_bytes;

    fn sample() -> Table {
        let csv = "PERIODO;DEPARTAMENTO;PROVINCIA;DISTRITO;QRESIDUOS_DOM\n\
                   2020;LIMA;LIMA;MIRAFLORES;10\n\
                   2021;LIMA;LIMA;MIRAFLORES;11\n\
                   2020;LIMA;HUAURA;HUACHO;3\n\
                   2020;CUSCO;CUSCO;WANCHAQ;4\n\
                   x;CUSCO;URUBAMBA;OLLANTAYTAMBO;1\n";
        parse_bytes(csv.as_bytes(), &LoaderConfig::default()).unwrap()
    }

    #[test]
    fn predicates_are_conjunctive_and_order_preserving() {
        let t = sample();
        let out = filter(&t, &Predicates::new().period(2020).department("lima"));
        let districts: Vec<_> = out.records().iter().map(|r| r.district.as_str()).collect();
        assert_eq!(districts, ["MIRAFLORES", "HUACHO"]);
        assert_eq!(out.columns(), t.columns());
    }

    #[test]
    fn no_match_yields_empty_table() {
        let out = filter(&sample(), &Predicates::new().department("TACNA"));
        assert!(out.is_empty());
    }

    #[test]
    fn period_predicate_skips_missing_periods() {
        let out = filter(&sample(), &Predicates::new().department("Cusco").period(2020));
        assert_eq!(out.len(), 1);
        let all_cusco = filter(&sample(), &Predicates::new().department("Cusco"));
        assert_eq!(all_cusco.len(), 2);
    }

    #[test]
    fn merge_detects_conflicts() {
        let a = Predicates::new().period(2020);
        let b = Predicates::new().department("lima");
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged, Predicates::new().period(2020).department("LIMA"));
        assert!(a.merge(&Predicates::new().period(2021)).is_none());
    }

    #[test]
    fn cascading_options() {
        let t = sample();
        assert_eq!(periods(&t), [2020, 2021]);
        assert_eq!(departments(&t), ["CUSCO", "LIMA"]);
        assert_eq!(provinces(&t, "lima"), ["HUAURA", "LIMA"]);
        assert_eq!(districts(&t, "LIMA", "LIMA"), ["MIRAFLORES"]);
        assert!(provinces(&t, "TACNA").is_empty());
    }
}
