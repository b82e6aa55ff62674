//! Excel workbooks (`.xlsx`): one document per data row of every sheet.
//!
//! The first row of a sheet is its header; rows render as `header: value`
//! lines like CSV rows do.
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Reader, Xlsx};

use crate::error::{Error, Result};
use crate::loaders::DocumentLoader;
use crate::types::LoadedDocument;

pub struct XlsxLoader;

impl DocumentLoader for XlsxLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(bytes)).map_err(|e| Error::loader("xlsx", e))?;
        let mut docs = Vec::new();
        for sheet in workbook.sheet_names() {
            let range = workbook.worksheet_range(&sheet).map_err(|e| Error::loader("xlsx", e))?;
            let rows: Vec<Vec<String>> = range
                .rows()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            docs.extend(sheet_documents(&sheet, &rows));
        }
        Ok(docs)
    }
}

fn sheet_documents(sheet: &str, rows: &[Vec<String>]) -> Vec<LoadedDocument> {
    let Some((headers, data)) = rows.split_first() else { return Vec::new() };
    data.iter()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|(row, cells)| {
            let text = headers
                .iter()
                .zip(cells)
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(h, v)| format!("{}: {}", h.trim(), v.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            LoadedDocument::new(text).with_meta("sheet", sheet).with_meta("row", row as u64)
        })
        .collect()
}
