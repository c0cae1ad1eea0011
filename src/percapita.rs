use crate::error::ColumnNotFoundError;
use crate::types::{PerCapitaRow, Table};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Smallest footprint first.
    #[default]
    Ascending,
    Descending,
}

/// Row-level `measure / population`, ranked.
///
/// Only rows with a positive population and a present measure cell take part;
/// the rest are dropped before ranking. Ratios are not rounded.
pub fn percapita(
    table: &Table,
    measure: &str,
    population: &str,
    top_n: Option<usize>,
    order: Order,
) -> Result<Vec<PerCapitaRow>, ColumnNotFoundError> {
    let measure_idx = table.column_index(measure)?;
    let population_idx = table.column_index(population)?;

    let mut rows: Vec<PerCapitaRow> = table
        .records()
        .iter()
        .filter_map(|r| {
            let pop = r.value(population_idx).filter(|p| *p > 0.0)?;
            let raw = r.value(measure_idx)?;
            Some(PerCapitaRow {
                location: r.location().to_string(),
                department: r.department.clone(),
                ratio: raw / pop,
                raw_value: raw,
                population: pop,
            })
        })
        .collect();

    let by_ratio = |a: &PerCapitaRow, b: &PerCapitaRow| {
        a.ratio.partial_cmp(&b.ratio).unwrap_or(Ordering::Equal)
    };
    match order {
        Order::Ascending => rows.sort_by(by_ratio),
        Order::Descending => rows.sort_by(|a, b| by_ratio(b, a)),
    }
    if let Some(n) = top_n {
        rows.truncate(n);
    }
    Ok(rows)
}
