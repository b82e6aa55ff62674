use serde_json::Value;

use crate::error::{Error, Result};
use crate::loaders::DocumentLoader;
use crate::types::LoadedDocument;

/// One document per CSV row, rendered as `header: value` lines.
pub struct CsvLoader;

impl DocumentLoader for CsvLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
        let mut reader = csv::ReaderBuilder::new().from_reader(bytes);
        let headers = reader.headers().map_err(|e| Error::loader("csv", e))?.clone();
        let mut docs = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| Error::loader("csv", e))?;
            let text = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| format!("{}: {}", h.trim(), v.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            docs.push(LoadedDocument::new(text).with_meta("row", row as u64));
        }
        Ok(docs)
    }
}

/// A top-level JSON array becomes one document per element; anything else is one document.
pub struct JsonLoader;

impl DocumentLoader for JsonLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::loader("json", e))?;
        let docs = match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| LoadedDocument::new(render(item)).with_meta("seq_num", (i + 1) as u64))
                .collect(),
            other => vec![LoadedDocument::new(render(&other))],
        };
        Ok(docs)
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
