//! LanceDB connection and table bootstrap helpers.
use arrow_array::RecordBatchIterator;
use arrow_schema::SchemaRef;
use lancedb::{connect, Connection, Table};

use crate::IndexError;

pub async fn open_db(uri: &str) -> Result<Connection, IndexError> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool, IndexError> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// Create an empty table with `schema`.
pub async fn create_table(conn: &Connection, name: &str, schema: SchemaRef) -> Result<Table, IndexError> {
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    Ok(conn.create_table(name, Box::new(iter)).execute().await?)
}

pub async fn open_table(conn: &Connection, name: &str) -> Result<Table, IndexError> {
    Ok(conn.open_table(name).execute().await?)
}
