// src/extract/sheets.rs
//
// Bed-occupancy data maintained in a shared spreadsheet: one worksheet per
// bed class, each keyed by state, percentages entered as strings like "42%".
// The spreadsheet service itself sits behind the `Worksheets` trait so the
// extraction logic runs against any record source; `GoogleSheet` is the
// REST-backed implementation.

use crate::{config, table::Table};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;
use url::Url;

/// One worksheet row: header-row keys mapped to cell values.
pub type Record = BTreeMap<String, Value>;

/// Capability the extractor needs from a spreadsheet service: read one named
/// worksheet as a sequence of records.
pub trait Worksheets {
    fn records(&self, title: &str) -> Result<Vec<Record>>;
}

/// A spreadsheet opened over the Sheets REST API. Credentials are passed
/// through untouched: the credential file holds a bearer token and nothing
/// here refreshes or mints one.
pub struct GoogleSheet {
    client: Client,
    token: String,
    spreadsheet_id: String,
}

impl GoogleSheet {
    pub fn open(client: &Client, credential_path: &Path, spreadsheet_id: &str) -> Result<Self> {
        let raw = fs::read_to_string(credential_path).with_context(|| {
            format!("reading spreadsheet credentials {}", credential_path.display())
        })?;
        let creds: Value = serde_json::from_str(&raw).with_context(|| {
            format!("parsing spreadsheet credentials {}", credential_path.display())
        })?;
        let token = creds
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .with_context(|| {
                format!("credentials {} have no `token`", credential_path.display())
            })?;

        Ok(GoogleSheet {
            client: client.clone(),
            token: token.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    fn values_url(&self, title: &str) -> Result<Url> {
        let mut url = Url::parse(config::SHEETS_API_BASE).context("parsing sheets API base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("sheets API base URL cannot be a base"))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(title);
        Ok(url)
    }
}

impl Worksheets for GoogleSheet {
    fn records(&self, title: &str) -> Result<Vec<Record>> {
        let url = self.values_url(title)?;
        let body: Value = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("non-success status from {}", url))?
            .json()
            .with_context(|| format!("reading JSON from {}", url))?;

        let rows = body
            .get("values")
            .and_then(Value::as_array)
            .with_context(|| format!("worksheet `{}` response has no `values`", title))?;
        records_from_rows(rows)
    }
}

/// First row is the header; later rows shorter than the header are padded
/// with empty cells, the worksheet-record convention.
pub fn records_from_rows(rows: &[Value]) -> Result<Vec<Record>> {
    let Some((header_row, data_rows)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .as_array()
        .context("worksheet header row is not an array")?
        .iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(anyhow!("worksheet header cell {} is not a string", other)),
        })
        .collect::<Result<_>>()?;

    let mut records = Vec::with_capacity(data_rows.len());
    for (idx, row) in data_rows.iter().enumerate() {
        let cells = row
            .as_array()
            .with_context(|| format!("worksheet row {} is not an array", idx + 1))?;
        let mut record = Record::new();
        for (pos, header) in headers.iter().enumerate() {
            let cell = cells.get(pos).cloned().unwrap_or(Value::String(String::new()));
            record.insert(header.clone(), cell);
        }
        records.push(record);
    }
    Ok(records)
}

/// Open the fixed bed-occupancy spreadsheet and extract both worksheets.
pub fn extract_cdc_bed_occupancy(client: &Client, credential_path: &Path) -> Result<Table> {
    let sheet = GoogleSheet::open(client, credential_path, config::BED_OCCUPANCY_SHEET_ID)?;
    extract_bed_occupancy(&sheet)
}

/// Read the inpatient and ICU worksheets, subset each to its percentage
/// column, normalize the percent strings to fractions, and concatenate
/// column-wise by state. A state present in only one worksheet keeps its row
/// with the other worksheet's column left empty.
pub fn extract_bed_occupancy(source: &dyn Worksheets) -> Result<Table> {
    let inpatient = worksheet_table(
        source,
        config::INPATIENT_WORKSHEET,
        config::INPATIENT_PERCENT_FIELD,
    )?;
    let icu = worksheet_table(source, config::ICU_WORKSHEET, config::ICU_PERCENT_FIELD)?;

    let merged = inpatient.concat_columns(&icu)?;
    info!(states = merged.len(), "extracted bed occupancy data");
    Ok(merged)
}

fn worksheet_table(
    source: &dyn Worksheets,
    title: &str,
    percent_field: &str,
) -> Result<Table> {
    let records = source
        .records(title)
        .with_context(|| format!("reading worksheet `{}`", title))?;
    let as_objects: Vec<Value> = records
        .into_iter()
        .map(|r| Value::Object(r.into_iter().collect()))
        .collect();

    let mut table = Table::from_records(&as_objects)
        .with_context(|| format!("building table from worksheet `{}`", title))?;
    table.set_index(config::SHEET_STATE_FIELD)?;

    let mut subset = table.select(&[config::SHEET_STATE_FIELD, percent_field])?;
    normalize_percent_column(&mut subset, percent_field)
        .with_context(|| format!("normalizing `{}` in worksheet `{}`", percent_field, title))?;
    Ok(subset)
}

/// Rewrite a column of percent strings as decimal fractions. Empty cells stay
/// empty; anything that is neither is a parse error.
fn normalize_percent_column(table: &mut Table, column: &str) -> Result<()> {
    let pos = table
        .column_position(column)
        .with_context(|| format!("no column `{}` to normalize", column))?;

    let mut normalized = Table::new(table.columns().to_vec());
    for row in table.rows() {
        let mut row = row.clone();
        row[pos] = match &row[pos] {
            Value::Null => Value::Null,
            Value::String(s) if s.trim().is_empty() => Value::Null,
            Value::String(s) => {
                let fraction = percent_to_fraction(s)?;
                serde_json::Number::from_f64(fraction)
                    .map(Value::Number)
                    .with_context(|| format!("`{}` is not a representable fraction", s))?
            }
            other => bail!("cell `{}` is not a percent string", other),
        };
        normalized.push_row(row)?;
    }
    if let Some(index) = table.index_column() {
        normalized.set_index(index)?;
    }
    *table = normalized;
    Ok(())
}

/// `"42%"` → `0.42`. Rounded to two decimal places, half away from zero,
/// so `"7.5%"` lands on `0.08`.
pub fn percent_to_fraction(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let percent: f64 = number
        .parse()
        .with_context(|| format!("`{}` is not a percentage", raw))?;
    let fraction = percent / 100.0;
    Ok((fraction * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeSheet {
        worksheets: BTreeMap<String, Vec<Value>>,
    }

    impl Worksheets for FakeSheet {
        fn records(&self, title: &str) -> Result<Vec<Record>> {
            let rows = self
                .worksheets
                .get(title)
                .with_context(|| format!("worksheet `{}` not found", title))?;
            records_from_rows(rows)
        }
    }

    fn fake_sheet(inpatient: Vec<Value>, icu: Vec<Value>) -> FakeSheet {
        let mut worksheets = BTreeMap::new();
        worksheets.insert(config::INPATIENT_WORKSHEET.to_string(), inpatient);
        worksheets.insert(config::ICU_WORKSHEET.to_string(), icu);
        FakeSheet { worksheets }
    }

    #[test]
    fn percent_conversion_matches_the_reference_values() -> Result<()> {
        assert_eq!(percent_to_fraction("42%")?, 0.42);
        assert_eq!(percent_to_fraction("100%")?, 1.0);
        assert_eq!(percent_to_fraction("7.5%")?, 0.08);
        assert_eq!(percent_to_fraction(" 66% ")?, 0.66);
        assert!(percent_to_fraction("n/a").is_err());
        Ok(())
    }

    #[test]
    fn records_pad_short_rows() -> Result<()> {
        let rows = vec![
            json!(["State", "Percentage of Inpatient Beds Occupied", "Notes"]),
            json!(["New York", "64%"]),
        ];
        let records = records_from_rows(&rows)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Notes"], json!(""));
        assert_eq!(records[0]["Percentage of Inpatient Beds Occupied"], json!("64%"));
        Ok(())
    }

    #[test]
    fn occupancy_subsets_and_normalizes_both_sheets() -> Result<()> {
        let sheet = fake_sheet(
            vec![
                json!(["State", "Percentage of Inpatient Beds Occupied", "Notes"]),
                json!(["New York", "64%", "x"]),
                json!(["California", "42%", ""]),
            ],
            vec![
                json!(["State", "Percentage of ICU Beds Occupied"]),
                json!(["New York", "7.5%"]),
                json!(["California", "30%"]),
            ],
        );

        let table = extract_bed_occupancy(&sheet)?;
        assert_eq!(
            table.columns(),
            &[
                "State",
                "Percentage of Inpatient Beds Occupied",
                "Percentage of ICU Beds Occupied",
            ]
        );
        assert_eq!(
            table.row_by_key("New York").unwrap(),
            &[json!("New York"), json!(0.64), json!(0.08)]
        );
        assert_eq!(
            table.row_by_key("California").unwrap(),
            &[json!("California"), json!(0.42), json!(0.3)]
        );
        Ok(())
    }

    #[test]
    fn state_missing_from_one_sheet_keeps_its_row() -> Result<()> {
        let sheet = fake_sheet(
            vec![
                json!(["State", "Percentage of Inpatient Beds Occupied"]),
                json!(["New York", "64%"]),
                json!(["California", "42%"]),
            ],
            vec![
                json!(["State", "Percentage of ICU Beds Occupied"]),
                json!(["New York", "70%"]),
                json!(["Texas", "55%"]),
            ],
        );

        let table = extract_bed_occupancy(&sheet)?;
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.row_by_key("California").unwrap(),
            &[json!("California"), json!(0.42), Value::Null]
        );
        assert_eq!(
            table.row_by_key("Texas").unwrap(),
            &[json!("Texas"), Value::Null, json!(0.55)]
        );
        Ok(())
    }
}
