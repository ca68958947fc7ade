// src/table/mod.rs
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Write;

/// An ordered tabular dataset: column names plus rows of JSON cells,
/// optionally indexed by one designated key column (state name or
/// abbreviation) for downstream joins.
///
/// Invariant: every row holds exactly one cell per column. `push_row` and the
/// constructors enforce this; a width mismatch is an error, never a panic.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// Position of the index column, if one has been designated.
    index: Option<usize>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
            index: None,
        }
    }

    /// Build from explicit columns and rows, validating every row's width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build from a JSON array of objects, one row per record. Column order is
    /// first-seen order: the first record's keys, then any key a later record
    /// introduces, appended. Keys absent from a record become null cells.
    pub fn from_records(records: &[Value]) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            let obj = record
                .as_object()
                .with_context(|| format!("record {} is not a JSON object", idx))?;
            for key in obj.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut table = Table::new(columns);
        for record in records {
            let obj = record.as_object().expect("checked above");
            let row = table
                .columns
                .iter()
                .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "row has {} cells but the table has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Designate `column` as the index key for joins.
    pub fn set_index(&mut self, column: &str) -> Result<()> {
        let pos = self
            .column_position(column)
            .with_context(|| format!("no column `{}` to index by", column))?;
        self.index = Some(pos);
        Ok(())
    }

    pub fn index_column(&self) -> Option<&str> {
        self.index.map(|i| self.columns[i].as_str())
    }

    /// The index key of `row`, rendered as a string.
    fn row_key(&self, row: &[Value]) -> Option<String> {
        self.index.map(|i| cell_to_string(&row[i]))
    }

    /// Look up a row by its index key.
    pub fn row_by_key(&self, key: &str) -> Option<&[Value]> {
        self.index?;
        self.rows
            .iter()
            .find(|r| self.row_key(r).as_deref() == Some(key))
            .map(|r| r.as_slice())
    }

    /// Rewrite one column so every non-null cell becomes a string. Used to pin
    /// down columns (dates) that would otherwise carry numeric cells.
    pub fn coerce_column_to_string(&mut self, column: &str) -> Result<()> {
        let pos = self
            .column_position(column)
            .with_context(|| format!("no column `{}` to coerce", column))?;
        for row in &mut self.rows {
            let cell = &mut row[pos];
            if !cell.is_null() && !cell.is_string() {
                *cell = Value::String(cell_to_string(cell));
            }
        }
        Ok(())
    }

    /// A new table containing only `keep`, in the given order. The index
    /// designation survives when the index column is kept.
    pub fn select(&self, keep: &[&str]) -> Result<Table> {
        let positions: Vec<usize> = keep
            .iter()
            .map(|name| {
                self.column_position(name)
                    .with_context(|| format!("no column `{}` to select", name))
            })
            .collect::<Result<_>>()?;

        let mut table = Table::new(keep.iter().map(|s| s.to_string()).collect());
        for row in &self.rows {
            let selected = positions.iter().map(|&p| row[p].clone()).collect();
            table.push_row(selected)?;
        }
        if let Some(name) = self.index_column() {
            if keep.contains(&name) {
                table.set_index(name)?;
            }
        }
        Ok(table)
    }

    /// Column-wise concatenation of two indexed tables, outer-joined on the
    /// index. The result keeps this table's index column and row order, then
    /// appends keys only `other` has. A key missing from either side gets null
    /// cells for that side's columns.
    pub fn concat_columns(&self, other: &Table) -> Result<Table> {
        let own_idx = self
            .index
            .context("left table has no index column for concatenation")?;
        let other_idx = other
            .index
            .context("right table has no index column for concatenation")?;

        let mut columns = vec![self.columns[own_idx].clone()];
        let own_cols: Vec<usize> = (0..self.columns.len()).filter(|&i| i != own_idx).collect();
        let other_cols: Vec<usize> = (0..other.columns.len()).filter(|&i| i != other_idx).collect();
        columns.extend(own_cols.iter().map(|&i| self.columns[i].clone()));
        columns.extend(other_cols.iter().map(|&i| other.columns[i].clone()));

        let mut keys: Vec<String> = self
            .rows
            .iter()
            .filter_map(|r| self.row_key(r))
            .collect();
        for row in &other.rows {
            if let Some(key) = other.row_key(row) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        let mut table = Table::new(columns);
        for key in keys {
            let mut row = vec![Value::String(key.clone())];
            match self.row_by_key(&key) {
                Some(r) => row.extend(own_cols.iter().map(|&i| r[i].clone())),
                None => row.extend(own_cols.iter().map(|_| Value::Null)),
            }
            match other.row_by_key(&key) {
                Some(r) => row.extend(other_cols.iter().map(|&i| r[i].clone())),
                None => row.extend(other_cols.iter().map(|_| Value::Null)),
            }
            table.push_row(row)?;
        }
        table.set_index(&self.columns[own_idx].clone())?;
        Ok(table)
    }

    /// Write the table as headered CSV. Null cells render empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)
            .context("writing CSV header")?;
        for (idx, row) in self.rows.iter().enumerate() {
            let record: Vec<String> = row.iter().map(cell_to_string).collect();
            wtr.write_record(&record)
                .with_context(|| format!("writing CSV row {}", idx))?;
        }
        wtr.flush().context("flushing CSV output")?;
        Ok(())
    }
}

/// Render a JSON cell for keying and CSV output. Nulls are empty, strings are
/// themselves, everything else is its JSON rendering.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_records_preserves_keys_and_order() -> Result<()> {
        let records = vec![
            json!({"state": "NY", "positive": 100}),
            json!({"state": "CA", "positive": 80, "negative": 5}),
        ];
        let table = Table::from_records(&records)?;

        assert_eq!(table.columns(), &["state", "positive", "negative"]);
        assert_eq!(table.len(), 2);
        // first record never saw "negative"
        assert_eq!(table.rows()[0][2], Value::Null);
        assert_eq!(table.rows()[1][2], json!(5));
        Ok(())
    }

    #[test]
    fn push_row_rejects_width_mismatch() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        let err = table.push_row(vec![json!(1)]).unwrap_err();
        assert!(err.to_string().contains("2 columns"));
    }

    #[test]
    fn coerce_turns_numeric_dates_into_strings() -> Result<()> {
        let records = vec![
            json!({"state": "NY", "date": 20200615}),
            json!({"state": "CA", "date": 20200614}),
        ];
        let mut table = Table::from_records(&records)?;
        table.coerce_column_to_string("date")?;

        assert_eq!(table.rows()[0][1], json!("20200615"));
        assert_eq!(table.rows()[1][1], json!("20200614"));
        Ok(())
    }

    #[test]
    fn select_keeps_index_when_retained() -> Result<()> {
        let mut table = Table::from_records(&[json!({"State": "NY", "pct": "42%", "extra": 1})])?;
        table.set_index("State")?;

        let subset = table.select(&["State", "pct"])?;
        assert_eq!(subset.columns(), &["State", "pct"]);
        assert_eq!(subset.index_column(), Some("State"));

        let no_index = table.select(&["pct"])?;
        assert_eq!(no_index.index_column(), None);
        Ok(())
    }

    #[test]
    fn concat_outer_joins_on_missing_states() -> Result<()> {
        let mut a = Table::from_rows(
            vec!["State".into(), "inpatient".into()],
            vec![
                vec![json!("NY"), json!(0.5)],
                vec![json!("CA"), json!(0.3)],
            ],
        )?;
        a.set_index("State")?;

        let mut b = Table::from_rows(
            vec!["State".into(), "icu".into()],
            vec![
                vec![json!("NY"), json!(0.7)],
                vec![json!("TX"), json!(0.6)],
            ],
        )?;
        b.set_index("State")?;

        let merged = a.concat_columns(&b)?;
        assert_eq!(merged.columns(), &["State", "inpatient", "icu"]);
        assert_eq!(merged.len(), 3);

        // CA only exists on the left, TX only on the right
        assert_eq!(merged.row_by_key("CA").unwrap(), &[json!("CA"), json!(0.3), Value::Null]);
        assert_eq!(merged.row_by_key("TX").unwrap(), &[json!("TX"), Value::Null, json!(0.6)]);
        assert_eq!(merged.row_by_key("NY").unwrap(), &[json!("NY"), json!(0.5), json!(0.7)]);
        Ok(())
    }

    #[test]
    fn csv_output_renders_nulls_empty() -> Result<()> {
        let table = Table::from_rows(
            vec!["state".into(), "positive".into()],
            vec![vec![json!("NY"), Value::Null]],
        )?;
        let mut buf = Vec::new();
        table.write_csv(&mut buf)?;
        assert_eq!(String::from_utf8(buf).unwrap(), "state,positive\nNY,\n");
        Ok(())
    }
}
