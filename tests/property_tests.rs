//! Property-based tests for the query layer.
//!
//! Tables are generated as semicolon-delimited text and go through the real
//! loader. Measure cells are whole numbers so grouped sums are exact.
//!
//! ```bash
//! PROPTEST_CASES=2000 cargo test --test property_tests
//! ```

use proptest::prelude::*;

use residuos_dashboard::aggregate::{aggregate_sum, AggregateQuery, GroupKey, SortBy};
use residuos_dashboard::filter::{filter, Predicates};
use residuos_dashboard::loader::parse_bytes;
use residuos_dashboard::percapita::{percapita, Order};
use residuos_dashboard::types::{Table, POPULATION_COLUMN};
use residuos_dashboard::LoaderConfig;

// =============================================================================
// Test Strategies
// =============================================================================

const DEPARTMENTS: &[&str] = &["LIMA", "CUSCO", "PUNO", "TACNA"];
const DISTRICTS: &[&str] = &["NORTE", "SUR", "CENTRO"];

#[derive(Debug, Clone)]
struct Row {
    period: Option<i32>,
    department: usize,
    district: usize,
    waste: Option<u32>,
    population: i32,
}

fn row() -> impl Strategy<Value = Row> {
    (
        prop::option::weighted(0.9, 2019i32..2023),
        0..DEPARTMENTS.len(),
        0..DISTRICTS.len(),
        prop::option::weighted(0.9, 0u32..5000),
        -5i32..20000,
    )
        .prop_map(|(period, department, district, waste, population)| Row {
            period,
            department,
            district,
            waste,
            population,
        })
}

fn table() -> impl Strategy<Value = Table> {
    prop::collection::vec(row(), 0..40).prop_map(|rows| {
        let mut csv = String::from("PERIODO;DEPARTAMENTO;DISTRITO;QRESIDUOS_DOM;POB_TOTAL\n");
        for r in rows {
            csv.push_str(&format!(
                "{};{};{};{};{}\n",
                r.period.map(|p| p.to_string()).unwrap_or_default(),
                DEPARTMENTS[r.department].to_lowercase(),
                DISTRICTS[r.district],
                r.waste.map(|w| w.to_string()).unwrap_or_default(),
                r.population
            ));
        }
        parse_bytes(csv.as_bytes(), &LoaderConfig::default()).expect("generated table parses")
    })
}

fn predicates() -> impl Strategy<Value = Predicates> {
    (
        prop::option::of(2019i32..2023),
        prop::option::of(0..DEPARTMENTS.len()),
        prop::option::of(0..DISTRICTS.len()),
    )
        .prop_map(|(period, department, district)| {
            let mut p = Predicates::new();
            if let Some(y) = period {
                p = p.period(y);
            }
            if let Some(d) = department {
                p = p.department(DEPARTMENTS[d]);
            }
            if let Some(d) = district {
                p = p.district(DISTRICTS[d]);
            }
            p
        })
}

fn group_key() -> impl Strategy<Value = GroupKey> {
    prop_oneof![
        Just(GroupKey::Department),
        Just(GroupKey::Period),
        Just(GroupKey::District),
    ]
}

fn measure_sum(table: &Table, key: GroupKey) -> f64 {
    let idx = table.column_index("QRESIDUOS_DOM").unwrap();
    table
        .records()
        .iter()
        .filter(|r| key != GroupKey::Period || r.period.is_some())
        .filter_map(|r| r.value(idx))
        .sum()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn filter_composes_as_conjunction(t in table(), p1 in predicates(), p2 in predicates()) {
        if let Some(both) = p1.merge(&p2) {
            prop_assert_eq!(filter(&filter(&t, &p1), &p2), filter(&t, &both));
        }
    }

    #[test]
    fn filter_preserves_source_order(t in table(), p in predicates()) {
        let out = filter(&t, &p);
        let mut source = t.records().iter();
        for r in out.records() {
            prop_assert!(source.any(|s| s == r));
        }
    }

    #[test]
    fn aggregation_conserves_the_total(t in table(), key in group_key()) {
        let buckets = aggregate_sum(&t, &AggregateQuery::new(key, "QRESIDUOS_DOM")).unwrap();
        let grouped: f64 = buckets.iter().map(|b| b.value).sum();
        prop_assert_eq!(grouped, measure_sum(&t, key));
    }

    #[test]
    fn top_n_is_a_non_increasing_prefix(t in table(), key in group_key(), n in 0usize..6) {
        let full = aggregate_sum(
            &t,
            &AggregateQuery::new(key, "QRESIDUOS_DOM").sort(SortBy::ValueDesc),
        ).unwrap();
        let top = aggregate_sum(
            &t,
            &AggregateQuery::new(key, "QRESIDUOS_DOM").sort(SortBy::ValueDesc).top_n(n),
        ).unwrap();
        prop_assert!(top.len() <= n);
        prop_assert!(top.windows(2).all(|w| w[0].value >= w[1].value));
        prop_assert_eq!(&top[..], &full[..top.len()]);
    }

    #[test]
    fn key_sort_is_ascending(t in table(), key in group_key()) {
        let buckets = aggregate_sum(&t, &AggregateQuery::new(key, "QRESIDUOS_DOM")).unwrap();
        prop_assert!(buckets.windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn percapita_only_keeps_positive_population(t in table(), p in predicates()) {
        let subset = filter(&t, &p);
        let rows =
            percapita(&subset, "QRESIDUOS_DOM", POPULATION_COLUMN, None, Order::Ascending).unwrap();
        let pop_idx = subset.column_index(POPULATION_COLUMN).unwrap();
        let waste_idx = subset.column_index("QRESIDUOS_DOM").unwrap();
        let eligible = subset
            .records()
            .iter()
            .filter(|r| r.value(pop_idx).is_some_and(|v| v > 0.0) && r.value(waste_idx).is_some())
            .count();
        prop_assert_eq!(rows.len(), eligible);
        prop_assert!(rows.iter().all(|r| r.population > 0.0));
        prop_assert!(rows.windows(2).all(|w| w[0].ratio <= w[1].ratio));
    }

    #[test]
    fn empty_selection_is_not_an_error(t in table(), key in group_key()) {
        let none = filter(&t, &Predicates::new().department("NOWHERE"));
        prop_assert!(none.is_empty());
        let query = AggregateQuery::new(key, "QRESIDUOS_DOM");
        prop_assert!(aggregate_sum(&none, &query).unwrap().is_empty());
        let ranked = percapita(&none, "QRESIDUOS_DOM", POPULATION_COLUMN, Some(5), Order::Ascending)
            .unwrap();
        prop_assert!(ranked.is_empty());
    }
}
