// src/extract/tracking.rs
//
// Direct JSON API extractors for the tracking site's per-state series. Each
// endpoint returns a flat JSON array of state records; one row per record,
// columns matching the source keys.

use crate::{config, fetch, table::Table};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::info;

/// Latest per-state snapshot.
pub fn extract_current_states(client: &Client) -> Result<Table> {
    let body = fetch::get_json(client, config::COVIDTRACKING_CURRENT_URL)?;
    let table = table_from_array(&body)
        .with_context(|| format!("parsing {}", config::COVIDTRACKING_CURRENT_URL))?;
    info!(rows = table.len(), "extracted current state data");
    Ok(table)
}

/// Full per-state daily history. The `date` field arrives as an integer like
/// `20200615`; it is pinned to a string so nothing downstream re-infers it as
/// a number or a date.
pub fn extract_historical_states(client: &Client) -> Result<Table> {
    let body = fetch::get_json(client, config::COVIDTRACKING_DAILY_URL)?;
    let mut table = table_from_array(&body)
        .with_context(|| format!("parsing {}", config::COVIDTRACKING_DAILY_URL))?;
    table.coerce_column_to_string(config::DATE_SOURCE_FIELD)?;
    info!(rows = table.len(), "extracted historical state data");
    Ok(table)
}

/// Materialize a JSON array of records as a table.
pub fn table_from_array(body: &Value) -> Result<Table> {
    let records = body
        .as_array()
        .context("response is not a JSON array of records")?;
    Table::from_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_row_per_record_all_keys_kept() -> Result<()> {
        let body = json!([
            {"state": "NY", "positive": 100, "negativeIncrease": 3},
            {"state": "CA", "positive": 80, "negativeIncrease": 1},
        ]);
        let table = table_from_array(&body)?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["state", "positive", "negativeIncrease"]);
        Ok(())
    }

    #[test]
    fn historical_date_column_becomes_string() -> Result<()> {
        let body = json!([
            {"date": 20200615, "state": "NY", "positive": 100},
            {"date": 20200614, "state": "NY", "positive": 90},
        ]);
        let mut table = table_from_array(&body)?;
        table.coerce_column_to_string(config::DATE_SOURCE_FIELD)?;

        assert_eq!(table.rows()[0][0], json!("20200615"));
        assert_eq!(table.rows()[1][0], json!("20200614"));
        Ok(())
    }

    #[test]
    fn non_array_body_is_a_parse_error() {
        let err = table_from_array(&json!({"error": true})).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }
}
