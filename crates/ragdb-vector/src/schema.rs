//! Arrow layout of the chunk table and row conversion in both directions.
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray, TimestampMillisecondArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::Utc;
use uuid::Uuid;

use ragdb_core::error::Error as CoreError;
use ragdb_core::types::{Chunk, Metadata, SearchHit};

use crate::IndexError;

pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

pub fn build_chunk_schema(dim: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("docstore_id", DataType::Utf8, false),
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("record", DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32),
            true,
        ),
        Field::new("indexed_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}

/// Dimensionality of the `vector` column of a persisted table.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

/// One row per chunk. `vectors` must already be checked against `dim`.
pub fn chunks_to_batch(chunks: &[Chunk], vectors: &[Vec<f32>], dim: usize) -> Result<RecordBatch, IndexError> {
    let now = Utc::now().timestamp_millis();
    let mut records = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let json = serde_json::to_string(&chunk.flatten())
            .map_err(|e| CoreError::CorruptRecord(format!("cannot encode record: {e}")))?;
        records.push(json);
    }
    let vectors = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));

    Ok(RecordBatch::try_new(
        build_chunk_schema(dim),
        vec![
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|_| Uuid::new_v4().to_string()))),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.chunk_id.as_str()))),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.source.as_str()))),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
            Arc::new(StringArray::from(records)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
            Arc::new(TimestampMillisecondArray::from(vec![now; chunks.len()])),
        ],
    )?)
}

/// Decode a vector-search result batch into hits carrying the L2 distance.
pub fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SearchHit>, IndexError> {
    let text = string_column(batch, "text")?;
    let record = string_column(batch, "record")?;
    let distance = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| corrupt(format!("missing {DISTANCE_COLUMN} column")))?;

    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let map: Metadata = serde_json::from_str(record.value(i))
            .map_err(|e| corrupt(format!("record is not a JSON object: {e}")))?;
        let chunk = Chunk::from_record(text.value(i).to_string(), map)?;
        hits.push(SearchHit { chunk, score: distance.value(i) });
    }
    Ok(hits)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, IndexError> {
    let col = batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| corrupt(format!("missing or non-string column '{name}'")))?;
    if col.null_count() > 0 {
        return Err(corrupt(format!("null values in column '{name}'")));
    }
    Ok(col)
}

fn corrupt(msg: String) -> IndexError {
    IndexError::Record(CoreError::CorruptRecord(msg))
}
