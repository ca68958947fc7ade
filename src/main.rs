use anyhow::Result;
use covidscraper::{
    config,
    extract::{dashboard, fluview, sheets, tracking},
    fetch, reference,
    table::Table,
};
use std::{env, fs, fs::File, path::Path};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();
    info!("startup");

    // ─── 2) reference lookups ────────────────────────────────────────
    let population = reference::load_state_population(config::POPULATION_CSV)?;
    let abbreviations = reference::load_state_abbreviations(config::STATE_ABBREVIATIONS_JSON)?;
    info!(
        states = population.len(),
        abbreviations = abbreviations.len(),
        "reference data loaded"
    );

    // ─── 3) run the extractors ───────────────────────────────────────
    let client = fetch::build_client(fetch::DEFAULT_TIMEOUT)?;
    let out_dir = Path::new("out");
    fs::create_dir_all(out_dir)?;

    write_result(out_dir, "covidtracking_current", tracking::extract_current_states(&client));
    write_result(out_dir, "covidtracking_daily", tracking::extract_historical_states(&client));
    write_result(out_dir, "cdc_inpatient_beds", dashboard::extract_inpatient_beds(&client));
    write_result(out_dir, "cdc_icu_beds", dashboard::extract_icu_beds(&client));
    write_result(
        out_dir,
        "cdc_facilities_reporting",
        dashboard::extract_facilities_reporting(&client),
    );
    write_result(out_dir, "fluview_ilinet", fluview::extract_ilinet(&client));

    // The spreadsheet source needs credentials; skip it when none are given.
    match env::var("GSHEETS_CREDENTIALS") {
        Ok(path) => write_result(
            out_dir,
            "cdc_bed_occupancy",
            sheets::extract_cdc_bed_occupancy(&client, Path::new(&path)),
        ),
        Err(_) => warn!("GSHEETS_CREDENTIALS not set; skipping bed-occupancy spreadsheet"),
    }

    info!("all done");
    Ok(())
}

/// Log the outcome of one extraction and dump the table for inspection.
/// A failed source is reported and skipped; the rest still run.
fn write_result(out_dir: &Path, name: &str, result: Result<Table>) {
    let table = match result {
        Ok(table) => table,
        Err(e) => {
            error!("{} failed: {:#}", name, e);
            return;
        }
    };

    let path = out_dir.join(format!("{}.csv", name));
    let written = File::create(&path)
        .map_err(anyhow::Error::from)
        .and_then(|f| table.write_csv(f));
    match written {
        Ok(()) => info!(name = %name, rows = table.len(), "wrote {}", path.display()),
        Err(e) => error!("writing {} failed: {:#}", path.display(), e),
    }
}
