//! Document text extraction.

use anyhow::Context as _;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Extracts the text of an attached document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Returns the full text of the document at `path`.
    async fn read_text(&self, path: &Path) -> anyhow::Result<String>;
}

/// Reads UTF-8 text files.
///
/// Paths pasted from a shell often arrive wrapped in quotes; those are
/// stripped before the file is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFileReader;

impl TextFileReader {
    fn clean(path: &Path) -> PathBuf {
        let raw = path.to_string_lossy();
        let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
        PathBuf::from(trimmed)
    }
}

#[async_trait]
impl DocumentReader for TextFileReader {
    async fn read_text(&self, path: &Path) -> anyhow::Result<String> {
        let path = Self::clean(path);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read document {}", path.display()))
    }
}
