mod pdf;
mod pptx;

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::error::{GuideError, Result};
use crate::guide::SlideText;

/// Document formats slide text can be extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Paginated document, one slide per page
    Pdf,
    /// Office Open XML slide deck
    Pptx,
}

impl DocumentKind {
    /// Detect the kind from a file extension, case-insensitively.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    /// Detect the kind from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Self::Pptx)
        } else {
            None
        }
    }
}

/// Extract one text block per page/slide, in source order.
pub fn extract_slides(bytes: &[u8], kind: DocumentKind) -> Result<Vec<SlideText>> {
    let pages = match kind {
        DocumentKind::Pdf => pdf::extract_pages(bytes)?,
        DocumentKind::Pptx => pptx::extract_slides(bytes)?,
    };

    if pages.is_empty() {
        return Err(GuideError::EmptyDocument);
    }

    debug!("Extracted {} slides from {:?} document", pages.len(), kind);

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, raw_text)| SlideText {
            index: i + 1,
            raw_text,
        })
        .collect())
}

/// Read a document from disk and extract its slides.
pub fn extract_file(path: &Path) -> anyhow::Result<Vec<SlideText>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;

    let kind = detect_kind(path, &bytes)?;
    let slides = extract_slides(&bytes, kind)
        .with_context(|| format!("Failed to extract slides from {}", path.display()))?;

    Ok(slides)
}

fn detect_kind(path: &Path, bytes: &[u8]) -> Result<DocumentKind> {
    if let Some(kind) = DocumentKind::from_extension(path) {
        return Ok(kind);
    }
    let is_legacy_ppt = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ppt"));
    if is_legacy_ppt {
        return Err(GuideError::Extraction(
            "legacy .ppt files are unsupported, save the deck as .pptx or .pdf".to_string(),
        ));
    }
    DocumentKind::sniff(bytes).ok_or_else(|| {
        GuideError::Extraction(format!("unsupported document type: {}", path.display()))
    })
}

/// Default deck title for an uploaded file: its name without a `.pdf` or
/// `.pptx` extension.
pub fn deck_title_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    for extension in [".pdf", ".pptx"] {
        let Some(stem_len) = name.len().checked_sub(extension.len()) else {
            continue;
        };
        if stem_len > 0
            && name.is_char_boundary(stem_len)
            && name[stem_len..].eq_ignore_ascii_case(extension)
        {
            return name[..stem_len].to_string();
        }
    }
    name
}
