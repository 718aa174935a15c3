use crate::error::{GuideError, Result};

/// Extract the text of each page of a PDF, in page order.
///
/// A page with no visible text yields an empty string so page numbers stay
/// aligned with slide numbers.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| GuideError::Extraction(format!("unreadable PDF: {e}")))?;

    Ok(pages.iter().map(|page| clean_page_text(page)).collect())
}

/// Collapse whitespace runs, drop blank lines and common PDF artifacts.
fn clean_page_text(text: &str) -> String {
    text.replace(['\u{0}', '\u{FEFF}', '\u{C}'], "")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
