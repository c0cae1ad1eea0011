//! Query layer for the solid-waste dashboard.
//!
//! The dataset is loaded once ([`loader::load`]), classified once
//! ([`schema::Dataset`]) and then queried with plain functions that take the
//! whole selection as arguments:
//!
//! - [`filter::filter`] narrows rows by period and location.
//! - [`aggregate::aggregate_sum`] produces grouped sums, rankings and time series.
//! - [`percapita::percapita`] ranks rows by waste per inhabitant.
//! - [`geo::build_region_summary`] prepares the per-department choropleth payload.
//!
//! Row-level state is never mutated after load. Derived results belong to the
//! caller.
pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod geo;
pub mod kpis;
pub mod loader;
pub mod output;
pub mod percapita;
pub mod schema;
pub mod session;
pub mod types;
pub mod util;

pub use aggregate::{aggregate_sum, time_series, AggregateQuery, GroupKey, SortBy};
pub use config::{DashboardConfig, LoaderConfig};
pub use error::{ColumnNotFoundError, Error, GeometrySourceError, LoadError, Result};
pub use filter::{filter, Predicates};
pub use geo::{build_region_summary, RegionSet};
pub use kpis::{compute_kpis, dataset_stats};
pub use loader::load;
pub use percapita::{percapita, Order};
pub use schema::{classify, measure_label, Dataset, Schema};
pub use types::{Bucket, Dominant, GroupValue, PerCapitaRow, Record, RegionSummary, Table};
