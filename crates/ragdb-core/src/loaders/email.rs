use anyhow::anyhow;
use mail_parser::MessageParser;

use crate::error::{Error, Result};
use crate::loaders::DocumentLoader;
use crate::types::LoadedDocument;

/// RFC 822 message (`.eml`): headers plus the plain-text body as one document.
pub struct EmlLoader;

impl DocumentLoader for EmlLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
        let parsed = MessageParser::default()
            .parse(bytes)
            .ok_or_else(|| Error::loader("eml", anyhow!("not a parseable RFC 822 message")))?;

        let subject = parsed.subject().unwrap_or_default().to_string();
        let from = parsed
            .from()
            .and_then(|a| a.first())
            .map(|a| a.address().unwrap_or_default().to_string())
            .unwrap_or_default();
        let date = parsed.date().map(|d| d.to_rfc3339()).unwrap_or_default();
        // `body_text` falls back to a text rendering of HTML-only messages.
        let body = parsed.body_text(0).map(|s| s.to_string()).unwrap_or_default();

        if subject.is_empty() && from.is_empty() && body.trim().is_empty() {
            return Err(Error::loader("eml", anyhow!("message has no headers or body")));
        }

        let text = format!("Subject: {subject}\nFrom: {from}\nDate: {date}\n\n{}", body.trim());
        Ok(vec![LoadedDocument::new(text)
            .with_meta("subject", subject)
            .with_meta("from", from)
            .with_meta("date", date)])
    }
}
