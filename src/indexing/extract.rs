use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::types::{FileDescriptor, FileType};

#[derive(Debug, Serialize)]
struct PdfPage {
    page: u32,
    text: String,
}

#[derive(Debug, Serialize)]
struct PdfText {
    pages: Vec<PdfPage>,
}

/// Text payload to index for a file, or `None` when the kind is tracked by
/// path and checksum only.
pub async fn extract_content(file: &FileDescriptor) -> Result<Option<String>> {
    match file.file_type {
        FileType::Markdown => extract_markdown(&file.path).await.map(Some),
        FileType::Pdf => extract_pdf(file.path.clone()).await.map(Some),
        FileType::Xfdf | FileType::Image | FileType::Other => Ok(None),
    }
}

async fn extract_markdown(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IndexError::io(path, e))?;
    Ok(normalize_line_endings(&String::from_utf8_lossy(&bytes)))
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

async fn extract_pdf(path: PathBuf) -> Result<String> {
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || extract_pdf_blocking(&task_path))
        .await
        .map_err(|e| IndexError::extraction(&path, format!("extraction task failed: {e}")))?
}

fn extract_pdf_blocking(path: &Path) -> Result<String> {
    let document = lopdf::Document::load(path)
        .map_err(|e| IndexError::extraction(path, e.to_string()))?;

    let mut pages = Vec::new();
    for page in document.get_pages().into_keys() {
        let text = document
            .extract_text(&[page])
            .map_err(|e| IndexError::extraction(path, format!("page {page}: {e}")))?;
        pages.push(PdfPage { page, text });
    }
    debug!("Extracted {} pages from {}", pages.len(), path.display());

    Ok(serde_json::to_string(&PdfText { pages })?)
}
