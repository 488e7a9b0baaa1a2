//! Document Extractor — turns an uploaded PDF or DOCX into raw text.
//!
//! Empty output is not an error: for PDFs it is the signal that the pages carry
//! no text layer and OCR has to take over (see `pipeline`).

use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::screening::document::{Document, DocumentFormat};
use crate::screening::error::ScreeningError;

const DOCX_BODY_PART: &str = "word/document.xml";
const MC_FALLBACK: &[u8] = b"mc:Fallback";

/// Extracts the embedded text of a document.
///
/// PDF parsing is CPU-bound and runs on the blocking pool.
pub async fn extract(document: &Document) -> Result<String, ScreeningError> {
    let bytes = document.bytes().clone();
    let format = document.format();

    tokio::task::spawn_blocking(move || extract_sync(format, &bytes))
        .await
        .map_err(|e| ScreeningError::MalformedDocument(format!("extraction task failed: {e}")))?
}

fn extract_sync(format: DocumentFormat, bytes: &Bytes) -> Result<String, ScreeningError> {
    match format {
        DocumentFormat::Pdf => {
            let pages = extract_pdf_pages(bytes)?;
            let text = pages.join(" ");
            debug!(
                pages = pages.len(),
                chars = text.chars().count(),
                "extracted embedded PDF text"
            );
            Ok(text)
        }
        DocumentFormat::Docx => {
            let paragraphs = extract_docx_paragraphs(bytes)?;
            let text = paragraphs.join(" ");
            debug!(
                paragraphs = paragraphs.len(),
                chars = text.chars().count(),
                "extracted DOCX text"
            );
            Ok(text)
        }
    }
}

/// Per-page embedded text, in page order. Pages without a text layer yield "".
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ScreeningError> {
    // pdf-extract panics on some malformed font tables; contain it to this request.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ScreeningError::MalformedDocument(format!(
            "PDF could not be read: {e}"
        ))),
        Err(_) => Err(ScreeningError::MalformedDocument(
            "PDF parser aborted on this file".to_string(),
        )),
    }
}

fn extract_docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ScreeningError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        ScreeningError::MalformedDocument(format!("DOCX is not a valid ZIP archive: {e}"))
    })?;

    let mut xml = Vec::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| {
            ScreeningError::MalformedDocument(format!("DOCX has no {DOCX_BODY_PART}: {e}"))
        })?
        .read_to_end(&mut xml)
        .map_err(|e| {
            ScreeningError::MalformedDocument(format!("failed to read {DOCX_BODY_PART}: {e}"))
        })?;

    docx_paragraphs(&xml)
}

/// Collects the text of every `w:p` element in document order.
///
/// A paragraph's text is its `w:t` runs concatenated; `w:tab` contributes a tab and
/// `w:br`/`w:cr` a newline. Paragraphs nested in text boxes are emitted when they close.
/// Everything under `mc:Fallback` is skipped: it repeats the `mc:Choice` content
/// (Word writes each text box both as DrawingML and as VML).
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, ScreeningError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text_run = false;
    let mut fallback_depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf);

        if fallback_depth > 0 {
            match event {
                Ok(Event::Start(ref e)) if e.name().as_ref() == MC_FALLBACK => {
                    fallback_depth += 1;
                }
                Ok(Event::End(ref e)) if e.name().as_ref() == MC_FALLBACK => {
                    fallback_depth -= 1;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(&reader, e)),
                _ => {}
            }
            buf.clear();
            continue;
        }

        match event {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                MC_FALLBACK => fallback_depth = 1,
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => {
                    if let Some(p) = open.last_mut() {
                        p.push('\t');
                    }
                }
                b"w:br" | b"w:cr" => {
                    if let Some(p) = open.last_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_text_run => {
                let text = t.unescape().map_err(|e| {
                    ScreeningError::MalformedDocument(format!("bad text in {DOCX_BODY_PART}: {e}"))
                })?;
                if let Some(p) = open.last_mut() {
                    p.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if let Some(p) = open.pop() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn xml_error(reader: &Reader<&[u8]>, e: quick_xml::Error) -> ScreeningError {
    ScreeningError::MalformedDocument(format!(
        "invalid XML in {DOCX_BODY_PART} at byte {}: {e}",
        reader.buffer_position()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::fixtures::{docx_bytes, docx_from_body, pdf_bytes};

    #[tokio::test]
    async fn test_docx_paragraphs_joined_with_single_space() {
        let doc = Document::new(
            docx_bytes(&["Senior Python Engineer,", "5 years AWS and Docker"]),
            DocumentFormat::Docx,
        );
        let text = extract(&doc).await.unwrap();
        assert_eq!(text, "Senior Python Engineer, 5 years AWS and Docker");
    }

    #[test]
    fn test_docx_runs_tabs_breaks_and_entities() {
        let body = concat!(
            r#"<w:p><w:r><w:t>Rust</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> &amp; Go</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>"#,
        );
        let bytes = docx_from_body(body);
        let paragraphs = extract_docx_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs, vec!["Rust\t & Go", "", "line one\nline two"]);
    }

    #[test]
    fn test_docx_table_cells_are_read_in_order() {
        let body = concat!(
            r#"<w:p><w:r><w:t>Skills</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Kubernetes</w:t></w:r></w:p></w:tc>"#,
            r#"<w:tc><w:p><w:r><w:t>Terraform</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        let paragraphs = extract_docx_paragraphs(&docx_from_body(body)).unwrap();
        assert_eq!(paragraphs, vec!["Skills", "Kubernetes", "Terraform"]);
    }

    #[test]
    fn test_docx_text_box_is_read_once() {
        let body = concat!(
            r#"<w:p><w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:drawing><wp:anchor>"#,
            r#"<a:graphic><a:graphicData><wps:wsp><wps:txbx><w:txbxContent>"#,
            r#"<w:p><w:r><w:t>Kubernetes</w:t></w:r></w:p>"#,
            r#"</w:txbxContent></wps:txbx></wps:wsp></a:graphicData></a:graphic>"#,
            r#"</wp:anchor></w:drawing></mc:Choice><mc:Fallback><w:pict><v:shape><v:textbox><w:txbxContent>"#,
            r#"<w:p><w:r><w:t>Kubernetes</w:t></w:r></w:p>"#,
            r#"</w:txbxContent></v:textbox></v:shape></w:pict></mc:Fallback></mc:AlternateContent></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Terraform</w:t></w:r></w:p>"#,
        );
        let paragraphs = extract_docx_paragraphs(&docx_from_body(body)).unwrap();
        let occurrences = paragraphs.iter().filter(|p| p.contains("Kubernetes")).count();
        assert_eq!(occurrences, 1, "paragraphs: {paragraphs:?}");
        assert_eq!(paragraphs, vec!["Kubernetes", "", "Terraform"]);
    }

    #[test]
    fn test_docx_ignores_non_text_elements() {
        let body = r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Experience</w:t></w:r></w:p>"#;
        let paragraphs = extract_docx_paragraphs(&docx_from_body(body)).unwrap();
        assert_eq!(paragraphs, vec!["Experience"]);
    }

    #[tokio::test]
    async fn test_docx_that_is_not_a_zip_is_malformed() {
        let doc = Document::new(b"plain text, not a zip".to_vec(), DocumentFormat::Docx);
        let err = extract(&doc).await.unwrap_err();
        assert!(
            matches!(err, ScreeningError::MalformedDocument(_)),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_docx_without_body_part_is_malformed() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx_paragraphs(&bytes).unwrap_err();
        assert!(err.to_string().contains(DOCX_BODY_PART), "got: {err}");
    }

    #[tokio::test]
    async fn test_pdf_text_pages_are_extracted_in_order() {
        let doc = Document::new(
            pdf_bytes(&[Some("Kubernetes operator"), Some("Terraform modules")]),
            DocumentFormat::Pdf,
        );
        let text = extract(&doc).await.unwrap();
        let first = text.find("Kubernetes").expect("page 1 text missing");
        let second = text.find("Terraform").expect("page 2 text missing");
        assert!(first < second, "pages out of order: {text:?}");
    }

    #[tokio::test]
    async fn test_pdf_without_text_layer_yields_blank_text() {
        let doc = Document::new(pdf_bytes(&[None, None]), DocumentFormat::Pdf);
        let text = extract(&doc).await.unwrap();
        assert!(text.trim().is_empty(), "expected blank text, got {text:?}");
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_malformed() {
        let doc = Document::new(b"%PDF-1.7 this is not a pdf".to_vec(), DocumentFormat::Pdf);
        let err = extract(&doc).await.unwrap_err();
        assert!(
            matches!(err, ScreeningError::MalformedDocument(_)),
            "unexpected error: {err:?}"
        );
    }
}
