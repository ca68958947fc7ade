// src/extract/fluview.rs
//
// CDC FluView ILINet download. The download endpoint takes one JSON payload
// naming every region and season wanted and answers with a ZIP archive of
// CSV files; only `ILINet.csv` is extracted.

use crate::{config, fetch, table::Table};
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::io::{Cursor, Read};
use tracing::info;
use zip::ZipArchive;

pub const ILINET_FILE: &str = "ILINet.csv";

/// All 59 state/territory/city region IDs FluView publishes, one season.
const REGION_COUNT: u64 = 59;
const SEASON_ID: u64 = 60;

#[derive(Serialize)]
struct DownloadRequest {
    #[serde(rename = "AppVersion")]
    app_version: &'static str,
    #[serde(rename = "DatasourceDT")]
    datasources: Vec<IdName>,
    #[serde(rename = "RegionTypeId")]
    region_type_id: u32,
    #[serde(rename = "SubRegionsDT")]
    sub_regions: Vec<IdName>,
    #[serde(rename = "SeasonsDT")]
    seasons: Vec<IdName>,
}

#[derive(Serialize)]
struct IdName {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(rename = "Name")]
    name: String,
}

impl IdName {
    fn new(id: u64, name: impl Into<String>) -> Self {
        IdName { id, name: name.into() }
    }
}

fn download_payload() -> DownloadRequest {
    DownloadRequest {
        app_version: "Public",
        datasources: vec![IdName::new(1, "ILINet")],
        region_type_id: 5,
        sub_regions: (1..=REGION_COUNT)
            .map(|id| IdName::new(id, id.to_string()))
            .collect(),
        seasons: vec![IdName::new(SEASON_ID, SEASON_ID.to_string())],
    }
}

/// Influenza-like-illness surveillance rows for every published region.
pub fn extract_ilinet(client: &Client) -> Result<Table> {
    let bytes = fetch::post_bytes(client, config::FLUVIEW_DOWNLOAD_URL, &download_payload())?;
    let csv_bytes = member_from_zip(&bytes, ILINET_FILE)?;
    let table = table_from_csv(&csv_bytes)
        .with_context(|| format!("parsing {} from the FluView archive", ILINET_FILE))?;
    info!(rows = table.len(), "extracted ILINet data");
    Ok(table)
}

/// Decompress the archive in memory and return the named member's bytes.
pub fn member_from_zip(bytes: &[u8], name: &str) -> Result<Vec<u8>> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("reading response as a ZIP archive")?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    if !names.iter().any(|n| n == name) {
        bail!("`{}` not found in archive (members: {})", name, names.join(", "));
    }

    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("opening `{}` in archive", name))?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .with_context(|| format!("reading `{}` into memory", name))?;
    Ok(buf)
}

/// Parse a headered CSV into a table of string cells.
pub fn table_from_csv(bytes: &[u8]) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(bytes));

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut table = Table::new(headers);
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        table.push_row(record.iter().map(|s| Value::String(s.to_string())).collect())?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    fn archive_with(members: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            for (name, content) in members {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn extracts_only_the_named_member() -> Result<()> {
        let buf = archive_with(&[
            ("WHO_NREVSS.csv", "REGION,SPECIMENS\nAlabama,10\n"),
            ("ILINet.csv", "REGION,YEAR,WEEK,ILITOTAL\nAlabama,2020,24,437\nAlaska,2020,24,29\n"),
            ("ReadMe.txt", "notes"),
        ]);

        let bytes = member_from_zip(&buf, ILINET_FILE)?;
        let table = table_from_csv(&bytes)?;

        assert_eq!(table.columns(), &["REGION", "YEAR", "WEEK", "ILITOTAL"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][0], Value::String("Alabama".into()));
        Ok(())
    }

    #[test]
    fn missing_member_is_not_found() {
        let buf = archive_with(&[("WHO_NREVSS.csv", "REGION\nAlabama\n")]);
        let err = member_from_zip(&buf, ILINET_FILE).unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {}", err);
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let err = member_from_zip(b"definitely not a zip", ILINET_FILE).unwrap_err();
        assert!(err.to_string().contains("ZIP"), "got: {}", err);
    }

    #[test]
    fn payload_names_every_region_and_one_season() -> Result<()> {
        let payload = serde_json::to_value(download_payload())?;
        assert_eq!(payload["SubRegionsDT"].as_array().unwrap().len(), 59);
        assert_eq!(payload["SeasonsDT"].as_array().unwrap().len(), 1);
        assert_eq!(payload["DatasourceDT"][0]["Name"], "ILINet");
        Ok(())
    }
}
