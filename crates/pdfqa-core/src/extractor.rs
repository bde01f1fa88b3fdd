//! PDF text extractor trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::IngestionError;

/// Text of one page, numbered from 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// Trait for PDF text extractors
///
/// A page whose text cannot be extracted yields an empty string rather than an
/// error. Only an unreadable file is an error.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    /// Extract ordered page texts from the file at `path`
    async fn extract(&self, path: &Path) -> std::result::Result<Vec<PageText>, IngestionError>;
}
