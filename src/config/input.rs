use serde_json::{Map, Value};
use std::path::Path;

use crate::domain::model::LeadRecord;
use crate::utils::error::{RelayError, Result};

/// 讀取名單：`.csv` 以標題列為欄位名稱，其餘視為 JSON 物件或物件陣列
pub fn read_leads<P: AsRef<Path>>(path: P) -> Result<Vec<LeadRecord>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let reader = csv::Reader::from_path(path)?;
        read_csv(reader)
    } else {
        parse_json(&std::fs::read_to_string(path)?)
    }
}

pub fn parse_json(text: &str) -> Result<Vec<LeadRecord>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(fields) => Ok(vec![LeadRecord::from_map(fields)]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(fields) => Ok(LeadRecord::from_map(fields)),
                other => Err(not_an_object(&format!("[{}]", index), &other)),
            })
            .collect(),
        other => Err(not_an_object("input", &other)),
    }
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<LeadRecord>> {
    let headers = reader.headers()?.clone();
    let mut leads = Vec::new();
    for row in reader.records() {
        let row = row?;
        let fields: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        leads.push(LeadRecord::from_map(fields));
    }
    tracing::debug!("📊 Read {} leads from CSV", leads.len());
    Ok(leads)
}

fn not_an_object(field: &str, value: &Value) -> RelayError {
    RelayError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: "Each lead must be a JSON object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_object_or_array() -> anyhow::Result<()> {
        assert_eq!(parse_json(r#"{"first_name": "Jane"}"#)?.len(), 1);
        let leads = parse_json(r#"[{"first_name": "Jane"}, {"first_name": "John"}]"#)?;
        assert_eq!(leads[1].text("first_name"), "John");
        assert!(parse_json("[1, 2]").is_err());
        assert!(parse_json("\"Jane\"").is_err());
        Ok(())
    }

    #[test]
    fn test_csv_rows_become_records() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
        writeln!(file, "first_name,last_name,phone")?;
        writeln!(file, "Jane,Doe,555-123-4567")?;
        writeln!(file, "John,,")?;

        let leads = read_leads(file.path())?;
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].text("phone"), "555-123-4567");
        assert_eq!(leads[1].text("last_name"), "");
        Ok(())
    }
}
