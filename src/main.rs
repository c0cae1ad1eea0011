// Console front-end for the waste dashboard.
//
// Mirrors the dashboard pages as a numbered menu:
// - Option [1] loads the dataset (once) and prints dataset statistics.
// - Options [2]-[8] render one view each as a markdown table and export
//   the full result next to the binary.
// Every view remembers its last selection in the session store, so pressing
// Enter at a prompt reuses the previous answer.
use once_cell::sync::Lazy;
use residuos_dashboard::aggregate::{aggregate_sum, time_series, AggregateQuery, GroupKey, SortBy};
use residuos_dashboard::filter::{self, Predicates};
use residuos_dashboard::geo::{build_region_summary, RegionSet};
use residuos_dashboard::kpis::{compute_kpis, dataset_stats};
use residuos_dashboard::output;
use residuos_dashboard::percapita::{percapita, Order};
use residuos_dashboard::schema::{measure_label, Dataset};
use residuos_dashboard::session::{SessionStore, ViewId, ViewSelection};
use residuos_dashboard::types::{Bucket, POPULATION_COLUMN};
use residuos_dashboard::util::{format_int, format_number};
use residuos_dashboard::DashboardConfig;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use tabled::Tabled;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_TOP_N: usize = 10;

// The loaded dataset plus per-view selections for this run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        config: DashboardConfig::from_env(),
        data: None,
        session: SessionStore::new(),
    })
});

struct AppState {
    config: DashboardConfig,
    data: Option<Dataset>,
    session: SessionStore,
}

fn state() -> std::sync::MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Print `label` and read one trimmed line.
fn prompt(label: &str) -> String {
    print!("{}: ", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Prompt showing the previous answer; an empty reply keeps it.
fn prompt_or(label: &str, previous: Option<String>) -> Option<String> {
    let shown = match &previous {
        Some(p) => format!("{} [{}]", label, p),
        None => label.to_string(),
    };
    let answer = prompt(&shown);
    if answer.is_empty() {
        previous
    } else if answer == "-" {
        None
    } else {
        Some(answer)
    }
}

fn prompt_number<T: std::str::FromStr + ToString>(label: &str, previous: Option<T>) -> Option<T> {
    prompt_or(label, previous.map(|p| p.to_string())).and_then(|s| s.parse().ok())
}

/// Numbered pick of a waste measure by its readable label.
fn prompt_measure(data: &Dataset, previous: Option<String>) -> Option<String> {
    let measures = &data.schema.measure_columns;
    if measures.is_empty() {
        println!("No waste measure columns in this dataset.\n");
        return None;
    }
    for (i, m) in measures.iter().enumerate() {
        println!("  [{}] {}", i + 1, measure_label(m));
    }
    // A selection kept from an earlier load may name a column this file lacks.
    let default = match previous.as_deref() {
        Some(p) if data.schema.is_measure(p) => measures.iter().position(|m| m == p).unwrap_or(0),
        Some(p) => {
            info!(measure = %p, "previous waste type not in this dataset");
            0
        }
        None => 0,
    };
    let pick = prompt_number("Waste type", Some(default + 1))?;
    measures.get(pick.checked_sub(1)?).cloned()
}

fn export<T: serde::Serialize>(file: &str, rows: &[T]) {
    match output::write_csv(file, rows) {
        Ok(()) => println!("(Full table exported to {})\n", file),
        Err(e) => error!("write error for {}: {}", file, e),
    }
}

fn show<T: Tabled + Clone + serde::Serialize>(title: &str, rows: &[T], file: &str) {
    println!("\n{}\n", title);
    output::preview_table_rows(rows, 20);
    if !rows.is_empty() {
        export(file, rows);
    }
}

/// Handle option [1]: load and classify the dataset.
fn handle_load() {
    let config = state().config.clone();
    match Dataset::open(&config.csv_path, &config.loader) {
        Ok(data) => {
            let stats = dataset_stats(&data.table);
            println!(
                "Dataset loaded: {} records, {} departments, {} periods",
                format_int(stats.records),
                stats.departments,
                stats.periods
            );
            if let Some((lo, hi)) = stats.period_range {
                println!("Years {}–{}", lo, hi);
            }
            println!(
                "Waste types: {}\n",
                data.schema
                    .measure_columns
                    .iter()
                    .map(|m| measure_label(m))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            state().data = Some(data);
        }
        Err(e) => eprintln!("Failed to load {}: {}\n", config.csv_path.display(), e),
    }
}

fn handle_kpis(data: &Dataset) {
    let k = compute_kpis(&data.table, &data.schema);
    println!("\nGeneral indicators\n");
    println!("Total waste: {} t", format_number(k.total_waste, 2));
    match &k.top_department {
        Some((d, v)) => println!("Top department: {} ({} t)", d, format_number(*v, 2)),
        None => println!("Top department: no data"),
    }
    match &k.dominant_measure {
        Some((m, v)) => println!("Most abundant waste: {} ({} t)", m, format_number(*v, 2)),
        None => println!("Most abundant waste: no data"),
    }
    println!("Population covered: {}\n", format_number(k.population_total, 0));
}

fn handle_departments(data: &Dataset) {
    let mut sel = state().session.get(ViewId::Departments);
    sel.predicates.period = prompt_number("Year (- for all)", sel.predicates.period);
    let Some(measure) = prompt_measure(data, sel.measure.clone()) else {
        return;
    };
    let previous = if sel.exclude.is_empty() { "N" } else { "Y" };
    let hide_lima = prompt_or("Hide LIMA (Y/N)", Some(previous.to_string()))
        .is_some_and(|a| a.eq_ignore_ascii_case("Y"));
    sel.exclude.clear();
    if hide_lima {
        sel.exclude.insert("LIMA".to_string());
    }
    sel.measure = Some(measure.clone());

    let table = filter::filter(&data.table, &sel.predicates);
    let mut query = AggregateQuery::new(GroupKey::Department, &measure).sort(SortBy::ValueDesc);
    for key in &sel.exclude {
        query = query.exclude(key);
    }
    match aggregate_sum(&table, &query) {
        Ok(rows) => show(
            &format!("{} by department", measure_label(&measure)),
            &rows,
            "view_departments.csv",
        ),
        Err(e) => println!("Data unavailable for this selection ({})\n", e),
    }
    state().session.set(ViewId::Departments, sel);
}

fn handle_time_series(data: &Dataset) {
    let mut sel = state().session.get(ViewId::TimeSeries);
    let mut location = Predicates::new();
    println!("Departments: {}", filter::departments(&data.table).join(", "));
    if let Some(d) = prompt_or("Department (- for all)", sel.predicates.department.clone()) {
        location = location.department(&d);
        println!("Provinces: {}", filter::provinces(&data.table, &d).join(", "));
        if let Some(p) = prompt_or("Province (- for all)", sel.predicates.province.clone()) {
            location = location.province(&p);
            println!("Districts: {}", filter::districts(&data.table, &d, &p).join(", "));
            if let Some(x) = prompt_or("District (- for all)", sel.predicates.district.clone()) {
                location = location.district(&x);
            }
        }
    }
    let Some(measure) = prompt_measure(data, sel.measure.clone()) else {
        return;
    };
    match time_series(&data.table, &location, &measure) {
        Ok(rows) => {
            let scope = location
                .district
                .as_deref()
                .or(location.province.as_deref())
                .or(location.department.as_deref())
                .unwrap_or("NACIONAL");
            show(
                &format!("{} over time - {}", measure_label(&measure), scope),
                &rows,
                "view_time_series.csv",
            );
        }
        Err(e) => println!("Data unavailable for this selection ({})\n", e),
    }
    sel.predicates = location;
    sel.measure = Some(measure);
    state().session.set(ViewId::TimeSeries, sel);
}

fn handle_top_departments(data: &Dataset) {
    let mut sel = state().session.get(ViewId::TopDepartments);
    let top_n = prompt_number("How many departments", sel.top_n.or(Some(DEFAULT_TOP_N)))
        .unwrap_or(DEFAULT_TOP_N);
    let Some(measure) = data.schema.baseline().map(str::to_string) else {
        println!("Domestic waste column missing; view unavailable.\n");
        return;
    };
    let query = AggregateQuery::new(GroupKey::Department, &measure)
        .sort(SortBy::ValueDesc)
        .top_n(top_n);
    match aggregate_sum(&data.table, &query) {
        Ok(rows) => show(
            &format!("Top {} departments by waste", top_n),
            &rows,
            "view_top_departments.csv",
        ),
        Err(e) => println!("Data unavailable for this selection ({})\n", e),
    }
    sel.top_n = Some(top_n);
    state().session.set(ViewId::TopDepartments, sel);
}

/// Shared prompts for the district rankings: department, year, waste type.
fn prompt_district_selection(data: &Dataset, view: ViewId) -> Option<ViewSelection> {
    let mut sel = state().session.get(view);
    println!("Departments: {}", filter::departments(&data.table).join(", "));
    let department = prompt_or("Department", sel.predicates.department.clone())?;
    let years = filter::periods(&data.table);
    let period = prompt_number("Year", sel.predicates.period.or(years.last().copied()))?;
    let measure = prompt_measure(data, sel.measure.clone())?;
    sel.predicates = Predicates::new().department(&department).period(period);
    sel.measure = Some(measure);
    Some(sel)
}

fn handle_top_districts(data: &Dataset) {
    let Some(mut sel) = prompt_district_selection(data, ViewId::TopDistricts) else {
        return;
    };
    let measure = sel.measure.clone().unwrap_or_default();
    let top_n = sel.top_n.unwrap_or(5);
    let table = filter::filter(&data.table, &sel.predicates);
    let query = AggregateQuery::new(GroupKey::District, &measure)
        .sort(SortBy::ValueDesc)
        .top_n(top_n);
    match aggregate_sum(&table, &query) {
        Ok(rows) => show(
            &format!("Top {} districts - {}", top_n, measure_label(&measure)),
            &share_rows(&rows),
            "view_top_districts.csv",
        ),
        Err(e) => println!("Data unavailable for this selection ({})\n", e),
    }
    sel.top_n = Some(top_n);
    state().session.set(ViewId::TopDistricts, sel);
}

#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct ShareRow {
    #[tabled(rename = "Distrito")]
    district: String,
    #[tabled(rename = "Toneladas")]
    tonnes: String,
    #[tabled(rename = "Porcentaje")]
    share: String,
}

// Pie-chart view: each district's share of the listed total.
fn share_rows(rows: &[Bucket]) -> Vec<ShareRow> {
    let total: f64 = rows.iter().map(|b| b.value).sum();
    rows.iter()
        .map(|b| ShareRow {
            district: b.key.to_string(),
            tonnes: format_number(b.value, 2),
            share: if total > 0.0 {
                format!("{:.1}%", b.value / total * 100.0)
            } else {
                "-".to_string()
            },
        })
        .collect()
}

fn handle_cleanest(data: &Dataset) {
    let Some(mut sel) = prompt_district_selection(data, ViewId::CleanestDistricts) else {
        return;
    };
    let top_n = prompt_number("How many districts", sel.top_n.or(Some(DEFAULT_TOP_N)))
        .unwrap_or(DEFAULT_TOP_N);
    let measure = sel.measure.clone().unwrap_or_default();
    let table = filter::filter(&data.table, &sel.predicates);
    match percapita(&table, &measure, POPULATION_COLUMN, Some(top_n), Order::Ascending) {
        Ok(rows) => show(
            &format!("Top {} cleanest districts - {}", top_n, measure_label(&measure)),
            &rows,
            "view_cleanest_districts.csv",
        ),
        Err(e) => println!("Data unavailable for this selection ({})\n", e),
    }
    sel.top_n = Some(top_n);
    state().session.set(ViewId::CleanestDistricts, sel);
}

#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct RegionRow {
    #[tabled(rename = "Departamento")]
    region: String,
    #[tabled(rename = "Total residuos (t)")]
    total: String,
    #[tabled(rename = "Residuo más abundante")]
    dominant: String,
}

fn handle_map(data: &Dataset) {
    let mut sel = state().session.get(ViewId::Map);
    let years = filter::periods(&data.table);
    let Some(period) = prompt_number("Year", sel.predicates.period.or(years.last().copied())) else {
        return;
    };
    let geojson_path = state().config.geojson_path.clone();
    let regions = match RegionSet::from_path(&geojson_path) {
        Ok(r) => r,
        Err(e) => {
            println!("Map unavailable, showing no regions ({})\n", e);
            return;
        }
    };
    match build_region_summary(&data.table, &data.schema, period, &regions) {
        Ok(summaries) => {
            let rows: Vec<RegionRow> = summaries
                .iter()
                .map(|(id, s)| RegionRow {
                    region: id.clone(),
                    total: format_number(s.total, 2),
                    dominant: s.dominant.to_string(),
                })
                .collect();
            show(&format!("Waste by department - {}", period), &rows, "view_map.csv");
            let file = "map_regions.geojson";
            match output::write_json(file, &regions.annotate(&summaries)) {
                Ok(()) => println!("(Annotated regions written to {})\n", file),
                Err(e) => error!("write error for {}: {}", file, e),
            }
        }
        Err(e) => println!("Data unavailable for this selection ({})\n", e),
    }
    sel.predicates = Predicates::new().period(period);
    state().session.set(ViewId::Map, sel);
}

fn main() {
    init_tracing();
    info!("dashboard console started");
    loop {
        println!("Select a view:");
        println!("[1] Load the dataset");
        println!("[2] General indicators");
        println!("[3] Waste by department");
        println!("[4] Evolution over time");
        println!("[5] Top departments");
        println!("[6] Top districts by waste type");
        println!("[7] Cleanest districts (per capita)");
        println!("[8] Map summary");
        println!("[0] Exit\n");
        let choice = prompt("Enter choice");
        if choice == "0" {
            println!("Exiting the program.");
            break;
        }
        if choice == "1" {
            handle_load();
            continue;
        }
        let data = state().data.clone();
        let Some(data) = data else {
            println!("Error: No data loaded. Please load the dataset first (option 1).\n");
            continue;
        };
        match choice.as_str() {
            "2" => handle_kpis(&data),
            "3" => handle_departments(&data),
            "4" => handle_time_series(&data),
            "5" => handle_top_departments(&data),
            "6" => handle_top_districts(&data),
            "7" => handle_cleanest(&data),
            "8" => handle_map(&data),
            _ => println!("Invalid choice. Please enter a number from 0 to 8.\n"),
        }
    }
}
