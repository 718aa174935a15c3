//! Text extraction from PPTX (Office Open XML) slide decks.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;
use zip::ZipArchive;

use crate::error::{GuideError, Result};

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_REL_TYPE_SUFFIX: &str = "/relationships/slide";

/// Extract the text of every slide, in presentation order.
pub fn extract_slides(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| GuideError::Extraction(format!("not a PPTX archive: {e}")))?;

    let slide_paths = slide_order(&mut archive)?;

    let mut slides = Vec::with_capacity(slide_paths.len());
    for path in &slide_paths {
        match read_part(&mut archive, path) {
            Ok(xml) => slides.push(slide_text(&xml)?),
            Err(e) => {
                // keep the slot so later slides keep their numbers
                warn!("Slide part {} unreadable, leaving it blank: {}", path, e);
                slides.push(String::new());
            }
        }
    }

    Ok(slides)
}

/// Slide part paths in the order the deck presents them.
///
/// The order is `p:sldIdLst` in `presentation.xml`; decks without one fall
/// back to the numeric order of their slide relationships.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let presentation = read_part(archive, PRESENTATION_PATH)?;
    let rels = read_part(archive, PRESENTATION_RELS_PATH)?;

    let targets = slide_relationships(&rels)?;
    let ids = slide_id_list(&presentation)?;

    if ids.is_empty() {
        let mut fallback: Vec<&String> = targets.values().collect();
        fallback.sort_by_key(|path| (extract_slide_number(path), (*path).clone()));
        return Ok(fallback.into_iter().cloned().collect());
    }

    Ok(ids
        .iter()
        .map(|id| match targets.get(id) {
            Some(path) => path.clone(),
            None => {
                warn!("Slide relationship {} has no target", id);
                String::new()
            }
        })
        .collect())
}

/// Relationship ids of the slides listed in `p:sldIdLst`.
fn slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"sldId" =>
            {
                let rel_id = e.attributes().flatten().find_map(|attr| {
                    let is_rel_id =
                        attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id";
                    is_rel_id.then(|| String::from_utf8_lossy(&attr.value).to_string())
                });
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(GuideError::Extraction(format!(
                    "invalid presentation.xml: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Map of relationship id to slide part path, for slide relationships only.
fn slide_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut id = String::new();

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        b"Id" => id = value,
                        _ => {}
                    }
                }

                if rel_type.ends_with(SLIDE_REL_TYPE_SUFFIX) {
                    targets.insert(id, resolve_target(&target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(GuideError::Extraction(format!(
                    "invalid presentation relationships: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(targets)
}

/// Resolve a relationship target relative to the `ppt/` directory.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = vec!["ppt"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Visible text of one slide: one line per non-empty paragraph.
fn slide_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut lines: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"br" => paragraph.push('\n'),
            Ok(Event::Text(ref e)) if in_text_run => {
                let text = e
                    .unescape()
                    .map_err(|err| GuideError::Extraction(format!("invalid slide text: {err}")))?;
                paragraph.push_str(&text);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    lines.extend(
                        paragraph
                            .lines()
                            .map(str::trim)
                            .filter(|line| !line.is_empty())
                            .map(String::from),
                    );
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(GuideError::Extraction(format!("invalid slide XML: {e}")));
            }
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| GuideError::Extraction(format!("missing part '{path}': {e}")))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| GuideError::Extraction(format!("failed to read '{path}': {e}")))?;

    Ok(content)
}

/// Trailing number of a part name such as `slides/slide12.xml`.
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml");
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.chars().rev().collect::<String>().parse().ok()
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    const REL_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

    fn slide_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{p}</a:t></a:r></a:p>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree><p:sp><p:txBody>{body}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    }

    /// Zip `(part name, content)` pairs into an archive.
    fn build_archive(parts: &[(String, String)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(name.as_str(), FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Build a PPTX with one slide per entry, each entry listing paragraphs.
    pub fn build_pptx(slides: &[&[&str]]) -> Vec<u8> {
        let mut parts = Vec::new();
        let mut ids = String::new();
        let mut rels = String::new();

        for (i, paragraphs) in slides.iter().enumerate() {
            let n = i + 1;
            ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{REL_SLIDE}" Target="slides/slide{n}.xml"/>"#,
                n + 1
            ));
            parts.push((format!("ppt/slides/slide{n}.xml"), slide_xml(paragraphs)));
        }

        parts.push((
            PRESENTATION_PATH.to_string(),
            format!(
                r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
            ),
        ));
        parts.push((
            PRESENTATION_RELS_PATH.to_string(),
            format!(
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>{rels}</Relationships>"#
            ),
        ));

        build_archive(&parts)
    }

    #[test]
    fn test_extracts_paragraphs_in_order() {
        let bytes = build_pptx(&[&["Title", "Subtitle"], &["Only line"]]);
        let slides = extract_slides(&bytes).unwrap();
        assert_eq!(slides, vec!["Title\nSubtitle", "Only line"]);
    }

    #[test]
    fn test_presentation_order_wins_over_part_numbers() {
        let presentation = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst></p:presentation>"#;
        let rels = format!(
            r#"<Relationships><Relationship Id="rId2" Type="{REL_SLIDE}" Target="slides/slide1.xml"/><Relationship Id="rId3" Type="{REL_SLIDE}" Target="slides/slide2.xml"/></Relationships>"#
        );
        let bytes = build_archive(&[
            (PRESENTATION_PATH.to_string(), presentation.to_string()),
            (PRESENTATION_RELS_PATH.to_string(), rels),
            ("ppt/slides/slide1.xml".to_string(), slide_xml(&["First part"])),
            ("ppt/slides/slide2.xml".to_string(), slide_xml(&["Second part"])),
        ]);

        let slides = extract_slides(&bytes).unwrap();
        assert_eq!(slides, vec!["Second part", "First part"]);
    }

    #[test]
    fn test_missing_slide_part_keeps_slot() {
        let presentation = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst></p:presentation>"#;
        let rels = format!(
            r#"<Relationships><Relationship Id="rId2" Type="{REL_SLIDE}" Target="slides/slide1.xml"/><Relationship Id="rId3" Type="{REL_SLIDE}" Target="slides/slide2.xml"/></Relationships>"#
        );
        let bytes = build_archive(&[
            (PRESENTATION_PATH.to_string(), presentation.to_string()),
            (PRESENTATION_RELS_PATH.to_string(), rels),
            ("ppt/slides/slide2.xml".to_string(), slide_xml(&["Survivor"])),
        ]);

        let slides = extract_slides(&bytes).unwrap();
        assert_eq!(slides, vec!["", "Survivor"]);
    }

    #[test]
    fn test_missing_presentation_is_extraction_error() {
        let bytes = build_archive(&[("hello.txt".to_string(), "hi".to_string())]);
        assert!(matches!(extract_slides(&bytes), Err(GuideError::Extraction(_))));
    }

    #[test]
    fn test_slide_text_unescapes_and_splits_runs() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>Profit &amp; </a:t></a:r><a:r><a:t>Loss</a:t></a:r></a:p><a:p><a:r><a:t>   </a:t></a:r></a:p><a:p><a:r><a:t>Line</a:t></a:r><a:br/><a:r><a:t>Break</a:t></a:r></a:p></p:sld>"#;
        assert_eq!(slide_text(xml).unwrap(), "Profit & Loss\nLine\nBreak");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("/ppt/slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("../ppt/slides/slide3.xml"), "ppt/slides/slide3.xml");
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("ppt/slides/slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("ppt/slides/slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_fallback_to_relationship_order() {
        let presentation = r#"<p:presentation xmlns:p="p"></p:presentation>"#;
        let rels = format!(
            r#"<Relationships><Relationship Id="rId9" Type="{REL_SLIDE}" Target="slides/slide10.xml"/><Relationship Id="rId4" Type="{REL_SLIDE}" Target="slides/slide2.xml"/></Relationships>"#
        );
        let bytes = build_archive(&[
            (PRESENTATION_PATH.to_string(), presentation.to_string()),
            (PRESENTATION_RELS_PATH.to_string(), rels),
            ("ppt/slides/slide2.xml".to_string(), slide_xml(&["Two"])),
            ("ppt/slides/slide10.xml".to_string(), slide_xml(&["Ten"])),
        ]);

        assert_eq!(extract_slides(&bytes).unwrap(), vec!["Two", "Ten"]);
    }
}
