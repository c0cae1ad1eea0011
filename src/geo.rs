//! Joins department aggregates onto region geometries for choropleth use.

use crate::error::{ColumnNotFoundError, GeometrySourceError};
use crate::filter::{filter, Predicates};
use crate::schema::{measure_label, Schema};
use crate::types::{Dominant, RegionSummary, Table, BASELINE_MEASURE, DEPARTMENT_COLUMN};
use crate::util::{format_number, normalize_key};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Feature property keys that may carry the department name, in lookup order.
pub const NAME_KEYS: &[&str] = &["NOMBDEP", "NAME", "dpto"];

/// A parsed region-boundary feature collection.
#[derive(Debug, Clone)]
pub struct RegionSet {
    document: Value,
    ids: Vec<String>,
}

impl RegionSet {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GeometrySourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| GeometrySourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, GeometrySourceError> {
        let document: Value = serde_json::from_str(text)?;
        let kind = document.get("type").and_then(Value::as_str);
        if kind.is_some_and(|k| k != "FeatureCollection") {
            return Err(GeometrySourceError::NotFeatureCollection);
        }
        let features = document
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeometrySourceError::NotFeatureCollection)?;

        let ids: Vec<String> = features.iter().map(region_name).collect();
        let unnamed = ids.iter().filter(|id| id.is_empty()).count();
        if unnamed > 0 {
            warn!(features = unnamed, "features without a department name property");
        }
        debug!(regions = ids.len(), "geometry source parsed");
        Ok(Self { document, ids })
    }

    /// Normalized region names, one per feature, in document order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The feature collection with `total_residuos` and `residuo_top`
    /// tooltip properties filled in from `summaries`.
    pub fn annotate(&self, summaries: &IndexMap<String, RegionSummary>) -> Value {
        let mut document = self.document.clone();
        let empty = RegionSummary::empty();
        if let Some(features) = document.get_mut("features").and_then(Value::as_array_mut) {
            for (feature, id) in features.iter_mut().zip(&self.ids) {
                let summary = summaries.get(id).unwrap_or(&empty);
                let Some(obj) = feature.as_object_mut() else {
                    continue;
                };
                let props = obj
                    .entry("properties")
                    .or_insert_with(|| Value::Object(Map::new()));
                if !props.is_object() {
                    *props = Value::Object(Map::new());
                }
                if let Some(props) = props.as_object_mut() {
                    props.insert(
                        "total_residuos".to_string(),
                        Value::String(format_number(summary.total, 2)),
                    );
                    props.insert(
                        "residuo_top".to_string(),
                        Value::String(format!(
                            "{} ({} t)",
                            summary.dominant.label(),
                            format_number(summary.dominant.value(), 2)
                        )),
                    );
                }
            }
        }
        document
    }
}

// First name key with a non-empty value wins.
fn region_name(feature: &Value) -> String {
    let Some(props) = feature.get("properties").and_then(Value::as_object) else {
        return String::new();
    };
    NAME_KEYS
        .iter()
        .filter_map(|key| props.get(*key))
        .map(|v| match v {
            Value::String(s) => normalize_key(s),
            Value::Null => String::new(),
            other => normalize_key(&other.to_string()),
        })
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

struct DepartmentAcc {
    total: f64,
    // `None` until a non-missing cell is seen for that measure.
    others: Vec<Option<f64>>,
}

/// Per-region payload for one period.
///
/// Every region in `regions` gets an entry; regions without rows get a zero
/// total and [`Dominant::NoData`]. Rows with a missing period never match.
pub fn build_region_summary(
    table: &Table,
    schema: &Schema,
    period: i32,
    regions: &RegionSet,
) -> Result<IndexMap<String, RegionSummary>, ColumnNotFoundError> {
    let baseline = schema
        .baseline()
        .ok_or_else(|| ColumnNotFoundError::new(BASELINE_MEASURE))?;
    let baseline_idx = table.column_index(baseline)?;
    table.column_index(DEPARTMENT_COLUMN)?;
    let others: Vec<(String, usize)> = schema
        .other_measures()
        .map(|c| table.column_index(c).map(|idx| (c.to_string(), idx)))
        .collect::<Result<_, _>>()?;

    let rows = filter(table, &Predicates::new().period(period));
    let mut by_department: IndexMap<String, DepartmentAcc> = IndexMap::new();
    for record in rows.records() {
        if record.department.is_empty() {
            continue;
        }
        let acc = by_department
            .entry(record.department.clone())
            .or_insert_with(|| DepartmentAcc {
                total: 0.0,
                others: vec![None; others.len()],
            });
        acc.total += record.value(baseline_idx).unwrap_or(0.0);
        for (slot, (_, idx)) in acc.others.iter_mut().zip(&others) {
            if let Some(v) = record.value(*idx) {
                *slot = Some(slot.unwrap_or(0.0) + v);
            }
        }
    }

    let unmatched = by_department
        .keys()
        .filter(|d| !regions.ids().contains(*d))
        .count();
    if unmatched > 0 {
        debug!(departments = unmatched, period, "departments without a matching geometry");
    }

    let mut summaries = IndexMap::new();
    for id in regions.ids() {
        let summary = match by_department.get(id) {
            Some(acc) => RegionSummary {
                total: acc.total,
                dominant: dominant(&others, &acc.others),
            },
            None => RegionSummary::empty(),
        };
        summaries.entry(id.clone()).or_insert(summary);
    }
    Ok(summaries)
}

// Argmax over the other measures; the first column wins a tie.
fn dominant(columns: &[(String, usize)], sums: &[Option<f64>]) -> Dominant {
    if sums.iter().all(|s| s.map_or(true, |v| v == 0.0)) {
        return Dominant::NoData;
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in sums.iter().enumerate() {
        if let Some(v) = *v {
            if best.map_or(true, |(_, b)| v > b) {
                best = Some((i, v));
            }
        }
    }
    match best {
        Some((i, value)) => Dominant::Measure {
            label: measure_label(&columns[i].0),
            value,
        },
        None => Dominant::NoData,
    }
}
