//! PDF text extraction backed by lopdf

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use pdfqa_core::{IngestionError, PageText, PdfTextExtractor};

/// Page-by-page text extractor
///
/// Parsing is CPU bound, so it runs on the blocking thread pool.
#[derive(Debug, Clone, Default)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_blocking(path: &Path) -> Result<Vec<PageText>, IngestionError> {
        let file = path.display().to_string();
        let document = lopdf::Document::load(path).map_err(|e| IngestionError::Unreadable {
            path: file.clone(),
            reason: e.to_string(),
        })?;

        let pages = document.get_pages();
        debug!(file = %file, pages = pages.len(), "loaded PDF");

        let texts = pages
            .keys()
            .map(|&page| {
                let text = match document.extract_text(&[page]) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(file = %file, page, error = %e, "page text extraction failed");
                        String::new()
                    }
                };
                PageText::new(page, text)
            })
            .collect();

        Ok(texts)
    }
}

#[async_trait]
impl PdfTextExtractor for LopdfExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<PageText>, IngestionError> {
        let owned: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::extract_blocking(&owned))
            .await
            .map_err(|e| IngestionError::Unreadable {
                path: path.display().to_string(),
                reason: format!("extraction task failed: {}", e),
            })?
    }
}
