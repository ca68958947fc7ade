// src/reference/mod.rs
//
// Static reference lookups loaded from local files; no network involved.

use crate::{config, table::Table};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// State population table, indexed by state name. Numeric-looking cells are
/// parsed so the population column comes back as numbers.
pub fn load_state_population(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("opening population CSV {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header row of {}", path.display()))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut table = Table::new(headers);
    for (idx, result) in rdr.records().enumerate() {
        let record = result
            .with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        table.push_row(record.iter().map(parse_cell).collect())?;
    }
    table.set_index(config::STATE_SOURCE_FIELD)?;
    Ok(table)
}

fn parse_cell(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    Value::String(raw.to_string())
}

/// Two-letter abbreviation → full state name.
pub fn load_state_abbreviations(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("opening abbreviation map {}", path.display()))?;
    let raw: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing abbreviation map {}", path.display()))?;

    let obj = match raw.as_object() {
        Some(o) => o,
        None => bail!("{} is not a JSON object", path.display()),
    };
    let mut map = BTreeMap::new();
    for (abbr, name) in obj {
        let name = name
            .as_str()
            .with_context(|| format!("abbreviation `{}` maps to a non-string", abbr))?;
        map.insert(abbr.clone(), name.to_string());
    }
    Ok(map)
}
