use lopdf::Document;
use tracing::debug;

use crate::error::{Error, Result};
use crate::loaders::DocumentLoader;
use crate::types::LoadedDocument;

/// One document per page with extractable text. `page` metadata is 0-based.
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
        let pdf = Document::load_mem(bytes).map_err(|e| Error::loader("pdf", e))?;
        let mut docs = Vec::new();
        for (number, _) in pdf.get_pages() {
            let text = pdf.extract_text(&[number]).map_err(|e| Error::loader("pdf", e))?;
            let text = text.trim();
            if text.is_empty() {
                debug!(page = number, "page has no text layer");
                continue;
            }
            docs.push(LoadedDocument::new(text.to_string()).with_meta("page", u64::from(number - 1)));
        }
        Ok(docs)
    }
}
