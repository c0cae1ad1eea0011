//! Runtime configuration for the dashboard.

use std::env;
use std::path::PathBuf;

/// How the delimited source file is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Text encoding label understood by `encoding_rs` (e.g. `utf-8`, `latin1`).
    pub encoding: String,
    /// Decimal mark of numeric cells, `b'.'` or `b','`. The other character
    /// is only accepted as a thousands separator.
    pub decimal: u8,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b';',
            encoding: "utf-8".to_string(),
            decimal: b'.',
        }
    }
}

/// Asset locations plus loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub csv_path: PathBuf,
    pub geojson_path: PathBuf,
    pub loader: LoaderConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("Data").join("dataset.csv"),
            geojson_path: PathBuf::from("Data").join("departamentos_peru.geojson"),
            loader: LoaderConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Defaults, overridden by `RESIDUOS_CSV`, `RESIDUOS_GEOJSON`,
    /// `RESIDUOS_ENCODING` and `RESIDUOS_DECIMAL` (`.` or `,`) when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(p) = lookup("RESIDUOS_CSV").filter(|s| !s.trim().is_empty()) {
            config.csv_path = PathBuf::from(p);
        }
        if let Some(p) = lookup("RESIDUOS_GEOJSON").filter(|s| !s.trim().is_empty()) {
            config.geojson_path = PathBuf::from(p);
        }
        if let Some(e) = lookup("RESIDUOS_ENCODING").filter(|s| !s.trim().is_empty()) {
            config.loader.encoding = e.trim().to_string();
        }
        match lookup("RESIDUOS_DECIMAL").as_deref().map(str::trim) {
            Some(",") => config.loader.decimal = b',',
            Some(".") => config.loader.decimal = b'.',
            _ => {}
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_data_dir() {
        let config = DashboardConfig::default();
        assert_eq!(config.csv_path, PathBuf::from("Data/dataset.csv"));
        assert_eq!(config.loader.delimiter, b';');
        assert_eq!(config.loader.encoding, "utf-8");
        assert_eq!(config.loader.decimal, b'.');
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = DashboardConfig::from_lookup(|key| match key {
            "RESIDUOS_CSV" => Some("/tmp/residuos.csv".to_string()),
            "RESIDUOS_ENCODING" => Some(" latin1 ".to_string()),
            "RESIDUOS_GEOJSON" => Some("".to_string()),
            "RESIDUOS_DECIMAL" => Some(",".to_string()),
            _ => None,
        });
        assert_eq!(config.csv_path, PathBuf::from("/tmp/residuos.csv"));
        assert_eq!(config.loader.encoding, "latin1");
        assert_eq!(config.loader.decimal, b',');
        assert_eq!(config.geojson_path, DashboardConfig::default().geojson_path);
    }
}
