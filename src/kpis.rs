//! Headline indicators and dataset statistics for the landing view.
//!
//! Unlike the keyed aggregations, these totals include rows with a missing
//! period.

use crate::filter::{departments, periods};
use crate::schema::{measure_label, Schema};
use crate::types::{DatasetStats, Kpis, Table, POPULATION_COLUMN};
use std::collections::BTreeMap;

fn column_sum(table: &Table, column: &str) -> Option<f64> {
    let idx = table.column_index(column).ok()?;
    Some(table.records().iter().filter_map(|r| r.value(idx)).sum())
}

// Largest entry; the first one wins a tie.
fn argmax<K>(entries: impl IntoIterator<Item = (K, f64)>) -> Option<(K, f64)> {
    entries.into_iter().fold(None, |best, (k, v)| match best {
        Some((bk, b)) if b >= v => Some((bk, b)),
        _ => Some((k, v)),
    })
}

pub fn compute_kpis(table: &Table, schema: &Schema) -> Kpis {
    let total_waste = schema
        .baseline()
        .and_then(|b| column_sum(table, b))
        .unwrap_or(0.0);

    let top_department = schema.baseline().and_then(|b| {
        let idx = table.column_index(b).ok()?;
        // Key order, so a tie goes to the alphabetically first department.
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for r in table.records().iter().filter(|r| !r.department.is_empty()) {
            *sums.entry(r.department.as_str()).or_insert(0.0) += r.value(idx).unwrap_or(0.0);
        }
        argmax(sums).map(|(d, v)| (d.to_string(), v))
    });

    let dominant_measure = argmax(
        schema
            .other_measures()
            .filter_map(|c| column_sum(table, c).map(|s| (c, s))),
    )
    .map(|(c, v)| (measure_label(c), v));

    Kpis {
        total_waste,
        top_department,
        dominant_measure,
        population_total: column_sum(table, POPULATION_COLUMN).unwrap_or(0.0),
    }
}

pub fn dataset_stats(table: &Table) -> DatasetStats {
    let years = periods(table);
    let period_range = match (years.first(), years.last()) {
        (Some(lo), Some(hi)) => Some((*lo, *hi)),
        _ => None,
    };
    DatasetStats {
        records: table.len(),
        departments: departments(table).len(),
        periods: years.len(),
        period_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::loader::parse_bytes;
    use crate::schema::classify;

    fn sample() -> Table {
        let csv = "PERIODO;DEPARTAMENTO;QRESIDUOS_DOM;QRESIDUOS_PLASTICO;\
                   QRESIDUOS_PAPEL;POB_TOTAL\n\
                   2019;LIMA;100;4;9;1000\n\
                   2020;CUSCO;30;8;2;300\n\
                   ;CUSCO;90;1;0;\n";
        parse_bytes(csv.as_bytes(), &LoaderConfig::default()).unwrap()
    }

    #[test]
    fn kpis_cover_all_rows() {
        let t = sample();
        let k = compute_kpis(&t, &classify(&t));
        assert_eq!(k.total_waste, 220.0);
        assert_eq!(k.top_department, Some(("CUSCO".to_string(), 120.0)));
        assert_eq!(k.dominant_measure, Some(("Plastico".to_string(), 13.0)));
        assert_eq!(k.population_total, 1300.0);
    }

    #[test]
    fn top_department_tie_goes_to_first_name() {
        let csv = "PERIODO;DEPARTAMENTO;QRESIDUOS_DOM\n\
                   2020;PUNO;50\n\
                   2020;CUSCO;30\n\
                   2021;CUSCO;20\n";
        let t = parse_bytes(csv.as_bytes(), &LoaderConfig::default()).unwrap();
        let k = compute_kpis(&t, &classify(&t));
        assert_eq!(k.top_department, Some(("CUSCO".to_string(), 50.0)));
    }

    #[test]
    fn kpis_without_measures_are_empty() {
        let t = parse_bytes(b"DEPARTAMENTO\nLIMA\n", &LoaderConfig::default()).unwrap();
        let k = compute_kpis(&t, &classify(&t));
        assert_eq!(k.total_waste, 0.0);
        assert_eq!(k.top_department, None);
        assert_eq!(k.dominant_measure, None);
    }

    #[test]
    fn stats_count_distinct_values() {
        let s = dataset_stats(&sample());
        assert_eq!(s.records, 3);
        assert_eq!(s.departments, 2);
        assert_eq!(s.periods, 2);
        assert_eq!(s.period_range, Some((2019, 2020)));
    }
}
