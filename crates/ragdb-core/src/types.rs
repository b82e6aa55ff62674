//! Domain types shared by the chunker, the loaders and the vector index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub type ChunkId = String;

/// Open key/value context attached by a loader (page, row, event fields...).
pub type Metadata = serde_json::Map<String, Value>;

/// Keys that are first-class `Chunk` fields and never live inside `metadata`.
pub const RESERVED_KEYS: [&str; 4] = ["chunk_id", "source", "type", "index"];

/// Output of a format loader: one logical document before chunking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub text: String,
    pub metadata: Metadata,
}

impl LoadedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: Metadata::new() }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// The atomic retrievable unit.
///
/// - `chunk_id`: random 128-bit identifier (hex), no content dedup
/// - `source`: originating document (filename or URI)
/// - `doc_type`: loader/format tag such as `pdf`, `csv`, `ics`; serialized as `type`
/// - `index`: zero-based position within the chunk sequence of one split call
/// - `metadata`: loader context, never containing any of [`RESERVED_KEYS`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub text: String,
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub index: usize,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    /// Merge the first-class fields and the metadata into one flat record.
    ///
    /// The text is not part of the record; storage keeps it alongside.
    pub fn flatten(&self) -> Metadata {
        let mut record = Metadata::new();
        record.insert("chunk_id".into(), Value::from(self.chunk_id.clone()));
        record.insert("source".into(), Value::from(self.source.clone()));
        record.insert("type".into(), Value::from(self.doc_type.clone()));
        record.insert("index".into(), Value::from(self.index as u64));
        for (k, v) in &self.metadata {
            if !is_reserved(k) {
                record.insert(k.clone(), v.clone());
            }
        }
        record
    }

    /// Rebuild a chunk from a flattened record, splitting the reserved
    /// fields back out of the metadata mapping.
    pub fn from_record(text: String, mut record: Metadata) -> Result<Self> {
        let chunk_id = take_string(&mut record, "chunk_id")?;
        let source = take_string(&mut record, "source")?;
        let doc_type = take_string(&mut record, "type")?;
        let index = record
            .remove("index")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::CorruptRecord("missing or non-integer 'index'".into()))?;
        let index = usize::try_from(index)
            .map_err(|_| Error::CorruptRecord(format!("index {index} out of range")))?;
        Ok(Self { chunk_id, text, source, doc_type, index, metadata: record })
    }
}

fn take_string(record: &mut Metadata, key: &str) -> Result<String> {
    match record.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(Error::CorruptRecord(format!("'{key}' is not a string: {other}"))),
        None => Err(Error::CorruptRecord(format!("missing '{key}'"))),
    }
}

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// A ranked hit. `score` is a squared L2 distance: lower is closer and the
/// range is unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert("page".into(), json!(3));
        metadata.insert("summary".into(), json!("standup"));
        Chunk {
            chunk_id: "abc".into(),
            text: "hello".into(),
            source: "notes.ics".into(),
            doc_type: "ics".into(),
            index: 7,
            metadata,
        }
    }

    #[test]
    fn flatten_then_unmerge_restores_chunk() {
        let chunk = sample();
        let record = chunk.flatten();
        assert_eq!(record["type"], json!("ics"));
        assert_eq!(record["index"], json!(7));
        assert_eq!(record["page"], json!(3));
        let back = Chunk::from_record(chunk.text.clone(), record).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn flatten_never_lets_metadata_shadow_fields() {
        let mut chunk = sample();
        chunk.metadata.insert("source".into(), json!("spoofed"));
        let record = chunk.flatten();
        assert_eq!(record["source"], json!("notes.ics"));
    }

    #[test]
    fn record_without_reserved_field_is_corrupt() {
        let mut record = sample().flatten();
        record.remove("chunk_id");
        let err = Chunk::from_record("x".into(), record).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord(_)));
    }

    #[test]
    fn chunk_serializes_type_key() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["type"], json!("ics"));
        assert!(v.get("doc_type").is_none());
    }
}
