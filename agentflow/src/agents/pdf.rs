//! Attached document reading.

use crate::collaborators::DocumentReader;
use crate::context::{keys, ContextDelta, StageContext};
use crate::core::StageResult;
use crate::stages::{owned, Stage};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Default cap on extracted characters.
pub const DEFAULT_PDF_CHAR_LIMIT: usize = 10_000;

/// Reads the document at `pdf_path` into `pdf_text`, keeping at most
/// `char_limit` characters. Without a `pdf_path` it passes.
pub struct PdfReaderAgent {
    reader: Arc<dyn DocumentReader>,
    char_limit: usize,
    owned_keys: BTreeSet<String>,
}

impl PdfReaderAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(reader: Arc<dyn DocumentReader>, char_limit: usize) -> Self {
        Self {
            reader,
            char_limit,
            owned_keys: owned([keys::PDF_TEXT]),
        }
    }

    async fn read(&self, path: &str) -> anyhow::Result<ContextDelta> {
        let text = self.reader.read_text(Path::new(path)).await?;
        let truncated: String = text.chars().take(self.char_limit).collect();
        Ok(ContextDelta::new().with(keys::PDF_TEXT, json!(truncated)))
    }
}

#[async_trait]
impl Stage for PdfReaderAgent {
    fn name(&self) -> &str {
        super::PDF_READER
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        match ctx.get_str(keys::PDF_PATH) {
            Some(path) if !path.trim().is_empty() => StageResult::from_collaborator(self.read(path).await),
            _ => StageResult::pass(),
        }
    }
}

impl std::fmt::Debug for PdfReaderAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReaderAgent")
            .field("char_limit", &self.char_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{MockDocumentReader, TextFileReader};
    use crate::testing::StageHarness;
    use std::io::Write;

    #[tokio::test]
    async fn test_absent_path_passes() {
        let mut reader = MockDocumentReader::new();
        reader.expect_read_text().never();
        let agent = PdfReaderAgent::new(Arc::new(reader), DEFAULT_PDF_CHAR_LIMIT);
        let harness = StageHarness::with_input("no attachment");

        let result = agent.run(&harness.ctx(agent.name())).await;

        assert_eq!(result, StageResult::pass());
    }

    #[tokio::test]
    async fn test_text_is_truncated_by_chars() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "héllo wörld").unwrap();
        let agent = PdfReaderAgent::new(Arc::new(TextFileReader), 5);
        let harness = StageHarness::with_input("summarize")
            .with_pdf_path(file.path().to_string_lossy().into_owned());

        let result = agent.run(&harness.ctx(agent.name())).await;

        assert_eq!(result.delta().and_then(|d| d.get(keys::PDF_TEXT)), Some(&json!("héllo")));
    }

    #[tokio::test]
    async fn test_unreadable_document_fails() {
        let agent = PdfReaderAgent::new(Arc::new(TextFileReader), DEFAULT_PDF_CHAR_LIMIT);
        let harness = StageHarness::with_input("summarize").with_pdf_path("/nonexistent/report.pdf");

        let result = agent.run(&harness.ctx(agent.name())).await;

        assert!(result.is_failure());
    }
}
