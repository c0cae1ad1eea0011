use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::types::{
    Record, Table, DEPARTMENT_COLUMN, DISTRICT_COLUMN, PERIOD_COLUMN, PROVINCE_COLUMN,
};
use crate::util::{normalize_key, parse_f64_safe, parse_period};
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

// Loaded tables, keyed by canonical path. Lives for the whole process; a
// changed source file is only picked up after a restart.
static TABLE_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<Table>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load the dataset at `path` with the default loader settings, reusing the
/// cached table if this path was loaded before.
pub fn load(path: impl AsRef<Path>) -> Result<Arc<Table>, LoadError> {
    load_with(path, &LoaderConfig::default())
}

/// Memoized load. The cache key is the path only; the first successful
/// configuration wins for that path.
pub fn load_with(path: impl AsRef<Path>, config: &LoaderConfig) -> Result<Arc<Table>, LoadError> {
    let path = path.as_ref();
    let key = fs::canonicalize(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(table) = TABLE_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        debug!(path = %key.display(), "dataset served from cache");
        return Ok(Arc::clone(table));
    }

    let table = Arc::new(load_uncached(&key, config)?);
    let mut cache = TABLE_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(cache.entry(key).or_insert(table)))
}

/// Read and normalize the file every time, bypassing the cache.
pub fn load_uncached(path: impl AsRef<Path>, config: &LoaderConfig) -> Result<Table, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_bytes(&bytes, config)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "dataset loaded"
    );
    Ok(table)
}

/// Decode, parse and normalize an in-memory copy of the dataset.
pub fn parse_bytes(bytes: &[u8], config: &LoaderConfig) -> Result<Table, LoadError> {
    let encoding = Encoding::for_label(config.encoding.trim().as_bytes())
        .ok_or_else(|| LoadError::UnknownEncoding(config.encoding.clone()))?;
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        warn!(encoding = encoding.name(), "malformed byte sequences replaced while decoding");
    }

    let mut rdr = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = rdr.headers()?.iter().map(normalize_key).collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(LoadError::MissingHeader);
    }

    let position = |name: &str| columns.iter().position(|c| c == name);
    let period_idx = position(PERIOD_COLUMN);
    let department_idx = position(DEPARTMENT_COLUMN);
    let province_idx = position(PROVINCE_COLUMN);
    let district_idx = position(DISTRICT_COLUMN);

    let mut records = Vec::new();
    let mut malformed = 0usize;
    for result in rdr.records() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed row: {}", e);
                malformed += 1;
                continue;
            }
        };
        // Short rows read as missing cells; extra trailing cells are dropped.
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i));
        let text_cell = |idx: Option<usize>| cell(idx).map(normalize_key).unwrap_or_default();

        let values = (0..columns.len())
            .map(|i| parse_f64_safe(row.get(i), config.decimal))
            .collect();

        records.push(Record {
            period: parse_period(cell(period_idx)),
            department: text_cell(department_idx),
            province: text_cell(province_idx),
            district: text_cell(district_idx),
            values,
        });
    }

    let missing_periods = records.iter().filter(|r| r.period.is_none()).count();
    if period_idx.is_some() && missing_periods > 0 {
        warn!(rows = missing_periods, "rows with unparsable period");
    }
    if malformed > 0 {
        warn!(rows = malformed, "malformed rows skipped");
    }

    Ok(Table::new(columns, records))
}
