use crate::error::{Error, Result};
use crate::loaders::DocumentLoader;
use crate::types::LoadedDocument;

/// Plain UTF-8 text as a single document. Invalid UTF-8 is a load failure.
pub struct TextLoader {
    format: &'static str,
}

impl TextLoader {
    pub fn new(format: &'static str) -> Self {
        Self { format }
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::loader(self.format, e))?;
        Ok(vec![LoadedDocument::new(text)])
    }
}
