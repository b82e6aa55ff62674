//! Format loaders keyed by file extension.
//!
//! Each loader turns raw bytes into `(text, metadata)` documents. New formats
//! are added by registering another `DocumentLoader`; dispatch never changes.
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::LoadedDocument;

mod calendar;
mod email;
mod pdf;
mod spreadsheet;
mod structured;
mod text;

pub use calendar::IcsLoader;
pub use email::EmlLoader;
pub use pdf::PdfLoader;
pub use spreadsheet::XlsxLoader;
pub use structured::{CsvLoader, JsonLoader};
pub use text::TextLoader;

pub trait DocumentLoader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>>;

    /// Path-based entry point for loaders that need a real file on disk.
    fn load_path(&self, path: &Path) -> Result<Vec<LoadedDocument>> {
        let bytes = std::fs::read(path)?;
        self.load(&bytes)
    }
}

#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("txt", TextLoader::new("txt"));
        registry.register("md", TextLoader::new("md"));
        registry.register("csv", CsvLoader);
        registry.register("json", JsonLoader);
        registry.register("ics", IcsLoader);
        registry.register("eml", EmlLoader);
        registry.register("pdf", PdfLoader);
        registry.register("xlsx", XlsxLoader);
        registry
    }

    /// Register (or replace) the loader for an extension, with or without the dot.
    pub fn register(&mut self, extension: &str, loader: impl DocumentLoader + 'static) {
        self.loaders.insert(normalize(extension), Arc::new(loader));
    }

    pub fn get(&self, extension: &str) -> Result<Arc<dyn DocumentLoader>> {
        let key = normalize(extension);
        self.loaders
            .get(&key)
            .cloned()
            .ok_or(Error::UnsupportedFormat { extension: key })
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.loaders.contains_key(&normalize(extension))
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        self.loaders.keys().map(String::as_str).collect()
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shout;
    impl DocumentLoader for Shout {
        fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
            Ok(vec![LoadedDocument::new(String::from_utf8_lossy(bytes).to_uppercase())])
        }
    }

    #[test]
    fn defaults_cover_text_structured_and_office_formats() {
        let reg = LoaderRegistry::with_defaults();
        assert_eq!(
            reg.supported_extensions(),
            vec!["csv", "eml", "ics", "json", "md", "pdf", "txt", "xlsx"]
        );
        assert!(reg.supports(".TXT"));
        assert!(reg.supports("PDF"));
        assert!(!reg.supports("docx"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = LoaderRegistry::with_defaults().get(".xyz").err().unwrap();
        match err {
            Error::UnsupportedFormat { extension } => assert_eq!(extension, "xyz"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn registering_a_format_needs_no_dispatch_change() {
        let mut reg = LoaderRegistry::new();
        reg.register(".shout", Shout);
        let docs = reg.get("shout").unwrap().load(b"hey").unwrap();
        assert_eq!(docs[0].text, "HEY");
    }
}
