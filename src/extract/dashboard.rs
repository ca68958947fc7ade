// src/extract/dashboard.rs
//
// Extractors for the CDC patient-impact dashboard's internal query API. Every
// query POSTs a static query-definition body with a merged header set and gets
// back one deeply nested result tree. Row data sits at
// `results[0].result.data.dsr.DS[0].PH[1].DM1[*].C`; the dashboard's "data
// as of" scalar sits at `...DS[0].PH[0].DM0[0].M0` and is fetched with its
// own query. The descent is written as named steps so a structural mismatch
// reports the exact level that was missing.

use crate::{config, fetch, table::Table};
use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::fs;
use tracing::info;

/// One dashboard query: which definition file to POST, which headers to merge
/// over the base set, and the columns of the resulting table.
pub struct DashboardQuery {
    pub name: &'static str,
    pub query_file: &'static str,
    pub headers: &'static Lazy<HeaderMap>,
    pub columns: &'static [&'static str],
}

pub static INPATIENT_BEDS: DashboardQuery = DashboardQuery {
    name: "inpatient beds",
    query_file: config::INPATIENT_BED_QUERY,
    headers: &config::INPATIENT_BED_HEADERS,
    columns: &[
        "State",
        "inpatient_bed_percent_occupied",
        "inpatient_beds_occupied",
        "timestamp",
    ],
};

pub static ICU_BEDS: DashboardQuery = DashboardQuery {
    name: "icu beds",
    query_file: config::ICU_BED_QUERY,
    headers: &config::ICU_BED_HEADERS,
    columns: &["State", "icu_percent_occupied", "icu_beds_occupied", "timestamp"],
};

pub static FACILITIES_REPORTING: DashboardQuery = DashboardQuery {
    name: "facilities reporting",
    query_file: config::FACILITIES_REPORTING_QUERY,
    headers: &config::FACILITIES_REPORTING_HEADERS,
    columns: &[
        "State",
        "facilities_percent_reporting",
        "facilities_reporting",
        "timestamp",
    ],
};

/// State Representative Estimates for Percentage of Inpatient Beds Occupied
/// (All Patients).
pub fn extract_inpatient_beds(client: &Client) -> Result<Table> {
    run_query(client, &INPATIENT_BEDS)
}

/// State Representative Estimates for Percentage of ICU Beds Occupied
/// (All Patients).
pub fn extract_icu_beds(client: &Client) -> Result<Table> {
    run_query(client, &ICU_BEDS)
}

pub fn extract_facilities_reporting(client: &Client) -> Result<Table> {
    run_query(client, &FACILITIES_REPORTING)
}

/// The date the dashboard states its displayed data was last refreshed,
/// distinct from any per-row date.
pub fn extract_data_date(client: &Client) -> Result<String> {
    let response = post_query(client, config::DATA_DATE_QUERY, &config::DATA_DATE_HEADERS)?;
    as_of_scalar(&response)
}

/// Shared skeleton: POST the query, fetch the as-of timestamp (a fresh
/// request on every call), unwrap the row records, and build the
/// state-indexed table.
pub fn run_query(client: &Client, query: &DashboardQuery) -> Result<Table> {
    let response = post_query(client, query.query_file, query.headers)
        .with_context(|| format!("dashboard query `{}`", query.name))?;
    let timestamp = extract_data_date(client)?;

    let rows = rows_with_timestamp(&response, &timestamp, query.columns.len())
        .with_context(|| format!("dashboard query `{}`", query.name))?;
    let mut table = Table::from_rows(
        query.columns.iter().map(|c| c.to_string()).collect(),
        rows,
    )?;
    table.set_index("State")?;
    info!(query = query.name, rows = table.len(), "extracted dashboard data");
    Ok(table)
}

fn post_query(client: &Client, query_file: &str, overrides: &HeaderMap) -> Result<Value> {
    let body = fs::read_to_string(query_file)
        .with_context(|| format!("reading query definition {}", query_file))?;

    let mut headers = config::BASE_HEADERS.clone();
    for (name, value) in overrides {
        headers.insert(name.clone(), value.clone());
    }
    fetch::post_json(client, config::DASHBOARD_QUERY_URL, headers, body)
}

/// Append the as-of timestamp to every row record's `C` value list. Row width
/// must land on `width`; anything else means the response shape moved.
pub fn rows_with_timestamp(
    response: &Value,
    timestamp: &str,
    width: usize,
) -> Result<Vec<Vec<Value>>> {
    let records = row_records(response)?;
    let mut rows = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let values = child(record, "C", &format!("row record {}", idx))?
            .as_array()
            .with_context(|| format!("`C` of row record {} is not an array", idx))?;

        let mut row = values.clone();
        row.push(Value::String(timestamp.to_string()));
        if row.len() != width {
            bail!(
                "row record {} has {} values (with timestamp); expected {}",
                idx,
                row.len(),
                width
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Descend to the row records: `results[0].result.data.dsr.DS[0].PH[1].DM1`.
pub fn row_records(response: &Value) -> Result<&Vec<Value>> {
    let ds = dataset(response)?;
    let ph = child(ds, "PH", "`dsr.DS[0]`")?;
    let dm1 = child(item(ph, 1, "`DS[0].PH`")?, "DM1", "`DS[0].PH[1]`")?;
    dm1.as_array().context("`PH[1].DM1` is not an array")
}

/// Descend to the as-of scalar: `results[0].result.data.dsr.DS[0].PH[0].DM0[0].M0`.
pub fn as_of_scalar(response: &Value) -> Result<String> {
    let ds = dataset(response)?;
    let ph = child(ds, "PH", "`dsr.DS[0]`")?;
    let dm0 = child(item(ph, 0, "`DS[0].PH`")?, "DM0", "`DS[0].PH[0]`")?;
    let m0 = child(item(dm0, 0, "`PH[0].DM0`")?, "M0", "`DM0[0]`")?;
    render_as_of(m0)
}

/// The dashboard renders its as-of date either as a preformatted string or as
/// epoch milliseconds; numbers are normalized to `YYYY-MM-DD`.
fn render_as_of(m0: &Value) -> Result<String> {
    match m0 {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .with_context(|| format!("`M0` {} is not an integer timestamp", n))?;
            let date = Utc
                .timestamp_millis_opt(millis)
                .single()
                .with_context(|| format!("`M0` {} is not a valid epoch timestamp", millis))?;
            Ok(date.format("%Y-%m-%d").to_string())
        }
        other => bail!("`M0` is neither a string nor a number: {}", other),
    }
}

/// Common prefix of both descents: `results[0].result.data.dsr.DS[0]`.
fn dataset(response: &Value) -> Result<&Value> {
    let results = child(response, "results", "response root")?;
    let result = child(item(results, 0, "`results`")?, "result", "`results[0]`")?;
    let data = child(result, "data", "`results[0].result`")?;
    let dsr = child(data, "dsr", "`result.data`")?;
    let ds = child(dsr, "DS", "`data.dsr`")?;
    item(ds, 0, "`dsr.DS`")
}

fn child<'a>(value: &'a Value, key: &str, level: &str) -> Result<&'a Value> {
    value
        .get(key)
        .with_context(|| format!("dashboard response: {} has no `{}`", level, key))
}

fn item<'a>(value: &'a Value, idx: usize, level: &str) -> Result<&'a Value> {
    value
        .get(idx)
        .with_context(|| format!("dashboard response: {} has no element {}", level, idx))
}
