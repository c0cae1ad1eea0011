//! Measure/dimension classification of the table schema.
//!
//! Classification runs once per loaded table ([`Dataset::new`]); queries take
//! the resulting [`Schema`] instead of re-scanning column names.

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::loader;
use crate::types::{Table, BASELINE_MEASURE, MEASURE_PREFIX};
use crate::util::normalize_key;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name fragments that mark a waste-quantity column.
const MEASURE_MARKERS: &[&str] = &["RESIDUO", "ENVOLT"];

/// Columns that match a marker or are keys, but are never summed.
const NON_MEASURE_COLUMNS: &[&str] = &[
    "RESIDUO_PERCAPITA",
    "PERIODO",
    "DEPARTAMENTO",
    "PROVINCIA",
    "DISTRITO",
    "POB_TOTAL",
    "POB_URBANA",
    "POB_RURAL",
    "UBIGEO",
    "REG_NAT",
    "FECHA_CORTE",
    "N_SEC",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Baseline domestic measure first (when present), others in table order.
    pub measure_columns: Vec<String>,
    pub dimension_columns: BTreeSet<String>,
    pub baseline: Option<String>,
}

impl Schema {
    /// Every measure except the baseline domestic one.
    pub fn other_measures(&self) -> impl Iterator<Item = &str> {
        self.measure_columns
            .iter()
            .map(String::as_str)
            .filter(move |c| Some(*c) != self.baseline.as_deref())
    }

    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Whether `column` (any case) is one of this dataset's measures.
    pub fn is_measure(&self, column: &str) -> bool {
        let wanted = normalize_key(column);
        self.measure_columns.iter().any(|c| *c == wanted)
    }

    /// Reverse of [`measure_label`], for selectors that show readable names.
    pub fn column_for_label(&self, label: &str) -> Option<&str> {
        self.measure_columns
            .iter()
            .find(|c| measure_label(c).eq_ignore_ascii_case(label.trim()))
            .map(String::as_str)
    }
}

fn is_measure_name(name: &str) -> bool {
    if NON_MEASURE_COLUMNS.contains(&name) {
        return false;
    }
    name.starts_with(MEASURE_PREFIX) || MEASURE_MARKERS.iter().any(|m| name.contains(m))
}

pub fn classify(table: &Table) -> Schema {
    let mut baseline = None;
    let mut others = Vec::new();
    let mut dimension_columns = BTreeSet::new();

    for column in table.columns() {
        if !is_measure_name(column) {
            dimension_columns.insert(column.clone());
        } else if column == BASELINE_MEASURE {
            baseline = Some(column.clone());
        } else if !others.contains(column) {
            others.push(column.clone());
        }
    }

    let measure_columns: Vec<String> = baseline.iter().cloned().chain(others).collect();
    if measure_columns.is_empty() {
        warn!("schema has no waste measure columns; charts cannot render");
    }

    // Negative tonnage is kept as-is; flag it so it is not silently summed.
    for column in &measure_columns {
        if let Ok(idx) = table.column_index(column) {
            let negatives = table
                .records()
                .iter()
                .filter(|r| r.value(idx).is_some_and(|v| v < 0.0))
                .count();
            if negatives > 0 {
                warn!(
                    column = %column,
                    cells = negatives,
                    "negative measure values passed through"
                );
            }
        }
    }

    debug!(
        measures = measure_columns.len(),
        dimensions = dimension_columns.len(),
        "schema classified"
    );
    Schema {
        measure_columns,
        dimension_columns,
        baseline,
    }
}

/// Readable category name: prefix stripped, underscores to spaces, title case.
pub fn measure_label(column: &str) -> String {
    column
        .strip_prefix(MEASURE_PREFIX)
        .unwrap_or(column)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let lower = w.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// A loaded table together with its one-time classification.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub table: Arc<Table>,
    pub schema: Schema,
}

impl Dataset {
    pub fn new(table: Arc<Table>) -> Self {
        let schema = classify(&table);
        Self { table, schema }
    }

    /// Memoized load followed by classification.
    pub fn open(path: impl AsRef<Path>, config: &LoaderConfig) -> Result<Self, LoadError> {
        Ok(Self::new(loader::load_with(path, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_bytes;

    fn table(header: &str) -> Table {
        parse_bytes(format!("{}\n", header).as_bytes(), &LoaderConfig::default()).unwrap()
    }

    #[test]
    fn baseline_first_then_table_order() {
        let t = table("PERIODO;QRESIDUOS_PAPEL;DEPARTAMENTO;QRESIDUOS_DOM;ENVOLTURAS;POB_TOTAL");
        let schema = classify(&t);
        assert_eq!(
            schema.measure_columns,
            ["QRESIDUOS_DOM", "QRESIDUOS_PAPEL", "ENVOLTURAS"]
        );
        assert_eq!(schema.baseline(), Some("QRESIDUOS_DOM"));
        assert_eq!(
            schema.other_measures().collect::<Vec<_>>(),
            ["QRESIDUOS_PAPEL", "ENVOLTURAS"]
        );
        assert!(schema.dimension_columns.contains("POB_TOTAL"));
        assert!(schema.dimension_columns.contains("PERIODO"));
        assert!(schema.is_measure("qresiduos_papel"));
        assert!(!schema.is_measure("POB_TOTAL"));
        assert!(!schema.is_measure("QRESIDUOS_VIDRIO"));
    }

    #[test]
    fn excludes_known_non_measures() {
        let schema = classify(&table("RESIDUO_PERCAPITA;QRESIDUOS_VIDRIO"));
        assert_eq!(schema.measure_columns, ["QRESIDUOS_VIDRIO"]);
        assert_eq!(schema.baseline(), None);
    }

    #[test]
    fn empty_measure_set_is_not_fatal() {
        let schema = classify(&table("PERIODO;DEPARTAMENTO"));
        assert!(schema.measure_columns.is_empty());
        assert_eq!(schema.dimension_columns.len(), 2);
    }

    #[test]
    fn labels_are_humanized() {
        assert_eq!(measure_label("QRESIDUOS_ENVOLTURAS_PLASTICAS"), "Envolturas Plasticas");
        assert_eq!(measure_label("QRESIDUOS_DOM"), "Dom");
        let schema = classify(&table("QRESIDUOS_DOM;QRESIDUOS_MATERIA_ORGANICA"));
        assert_eq!(
            schema.column_for_label("materia organica"),
            Some("QRESIDUOS_MATERIA_ORGANICA")
        );
        assert_eq!(schema.column_for_label("Metales"), None);
    }
}
