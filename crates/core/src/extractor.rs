//! Bytes to text, with upload validation.

use crate::error::ExtractionError;
use std::path::Path;

pub const TEXT_PLAIN: &str = "text/plain";
pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Accepted content types and the extensions each may arrive with.
pub const SUPPORTED: &[(&str, &[&str])] = &[
    (TEXT_PLAIN, &["txt", "text", "md", "log"]),
    (PDF, &["pdf"]),
    (DOCX, &["docx"]),
];

pub fn guess_content_type(filename: &str) -> Option<&'static str> {
    let ext = extension(filename)?;
    SUPPORTED
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(ct, _)| *ct)
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Parameters such as `; charset=utf-8` are dropped.
fn base_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Checks size, content type and extension before any parsing.
pub fn validate(
    bytes: &[u8],
    content_type: &str,
    filename: &str,
    max_bytes: usize,
) -> Result<(), ExtractionError> {
    if bytes.len() > max_bytes {
        return Err(ExtractionError::TooLarge {
            actual: bytes.len(),
            limit: max_bytes,
        });
    }
    let ct = base_type(content_type);
    let Some((_, exts)) = SUPPORTED.iter().find(|(t, _)| *t == ct) else {
        return Err(ExtractionError::UnsupportedType(ct));
    };
    let ext = extension(filename).unwrap_or_default();
    if !exts.contains(&ext.as_str()) {
        return Err(ExtractionError::ExtensionMismatch {
            extension: ext,
            content_type: ct,
        });
    }
    Ok(())
}

/// Validates, then extracts. Plain text may be empty; PDF and DOCX files
/// without any text are rejected with [`ExtractionError::NoText`].
pub fn extract(
    bytes: &[u8],
    content_type: &str,
    filename: &str,
    max_bytes: usize,
) -> Result<String, ExtractionError> {
    validate(bytes, content_type, filename, max_bytes)?;
    match base_type(content_type).as_str() {
        TEXT_PLAIN => plain_text(bytes),
        PDF => non_empty(pdf_text(bytes)?),
        DOCX => non_empty(docx_text(bytes)?),
        other => Err(ExtractionError::UnsupportedType(other.to_string())),
    }
}

fn non_empty(text: String) -> Result<String, ExtractionError> {
    if text.trim().is_empty() {
        Err(ExtractionError::NoText)
    } else {
        Ok(text)
    }
}

fn plain_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|_| ExtractionError::Encoding)
}

#[cfg(feature = "pdf")]
fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    if !infer::archive::is_pdf(bytes) {
        return Err(ExtractionError::Corrupt("missing PDF header".into()));
    }
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ExtractionError::Corrupt(e.to_string()))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ExtractionError::Encrypted);
    }
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Corrupt(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_bytes: &[u8]) -> Result<String, ExtractionError> {
    Err(ExtractionError::FeatureDisabled("pdf"))
}

#[cfg(feature = "office")]
const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[cfg(feature = "office")]
fn docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    use std::io::Read;

    if !infer::archive::is_zip(bytes) {
        // Password-protected Office files are OLE containers, not zip.
        if bytes.starts_with(&OLE2_MAGIC) {
            return Err(ExtractionError::Encrypted);
        }
        return Err(ExtractionError::Corrupt("not a zip container".into()));
    }
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractionError::Corrupt(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Corrupt(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Corrupt(e.to_string()))?;
    document_xml_text(&xml)
}

#[cfg(not(feature = "office"))]
fn docx_text(_bytes: &[u8]) -> Result<String, ExtractionError> {
    Err(ExtractionError::FeatureDisabled("office"))
}

/// Text runs of a WordprocessingML body, one line per paragraph.
pub fn document_xml_text(xml: &str) -> Result<String, ExtractionError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::Corrupt(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Corrupt(e.to_string())),
            _ => {}
        }
    }
    Ok(out)
}
