use crate::error::ColumnNotFoundError;
use crate::util::normalize_key;
use serde::Serialize;
use std::fmt;
use tabled::Tabled;

pub const PERIOD_COLUMN: &str = "PERIODO";
pub const DEPARTMENT_COLUMN: &str = "DEPARTAMENTO";
pub const PROVINCE_COLUMN: &str = "PROVINCIA";
pub const DISTRICT_COLUMN: &str = "DISTRITO";
pub const POPULATION_COLUMN: &str = "POB_TOTAL";
pub const BASELINE_MEASURE: &str = "QRESIDUOS_DOM";
pub const MEASURE_PREFIX: &str = "QRESIDUOS_";

/// One normalized row of the dataset.
///
/// Location fields are already trimmed and uppercased; an empty string means
/// the source had no value (or no such column). `values` is aligned with
/// [`Table::columns`] and holds every cell that parsed as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub period: Option<i32>,
    pub department: String,
    pub province: String,
    pub district: String,
    pub values: Vec<Option<f64>>,
}

impl Record {
    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }

    /// District name, or the closest enclosing division when the row has none.
    pub fn location(&self) -> &str {
        [&self.district, &self.province, &self.department]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// The canonical in-memory table. Immutable once loaded; queries produce new
/// tables or result rows and never touch the source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Result<usize, ColumnNotFoundError> {
        let wanted = normalize_key(name);
        self.columns
            .iter()
            .position(|c| *c == wanted)
            .ok_or(ColumnNotFoundError { column: wanted })
    }

    /// A table with the same schema holding a different set of rows.
    pub fn with_records(&self, records: Vec<Record>) -> Table {
        Table {
            columns: self.columns.clone(),
            records,
        }
    }
}

/// Grouping key value produced by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    Period(i32),
    Text(String),
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Period(p) => write!(f, "{}", p),
            GroupValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct Bucket {
    #[serde(rename = "Key")]
    #[tabled(rename = "Key")]
    pub key: GroupValue,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: f64,
}

impl Bucket {
    pub fn new(key: GroupValue, value: f64) -> Self {
        Self { key, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct PerCapitaRow {
    #[serde(rename = "Distrito")]
    #[tabled(rename = "Distrito")]
    pub location: String,
    #[serde(rename = "Departamento")]
    #[tabled(rename = "Departamento")]
    pub department: String,
    #[serde(rename = "ResiduoPerCapita")]
    #[tabled(rename = "ResiduoPerCapita")]
    pub ratio: f64,
    #[serde(rename = "Residuo")]
    #[tabled(rename = "Residuo")]
    pub raw_value: f64,
    #[serde(rename = "Poblacion")]
    #[tabled(rename = "Poblacion")]
    pub population: f64,
}

/// Largest "other" waste category of a region, or the no-data sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dominant {
    Measure { label: String, value: f64 },
    NoData,
}

impl Dominant {
    pub const NO_DATA_LABEL: &'static str = "no data";

    pub fn label(&self) -> &str {
        match self {
            Dominant::Measure { label, .. } => label,
            Dominant::NoData => Self::NO_DATA_LABEL,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Dominant::Measure { value, .. } => *value,
            Dominant::NoData => 0.0,
        }
    }
}

impl fmt::Display for Dominant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2} t)", self.label(), self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub total: f64,
    pub dominant: Dominant,
}

impl RegionSummary {
    pub fn empty() -> Self {
        Self {
            total: 0.0,
            dominant: Dominant::NoData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_waste: f64,
    pub top_department: Option<(String, f64)>,
    pub dominant_measure: Option<(String, f64)>,
    pub population_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub records: usize,
    pub departments: usize,
    pub periods: usize,
    pub period_range: Option<(i32, i32)>,
}
