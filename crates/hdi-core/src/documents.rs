//! Uploaded document to plain text, chosen by file extension

use regex::Regex;
use std::io::{Cursor, Read};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF: {0}")]
    Pdf(String),
    #[error("DOCX: {0}")]
    Docx(String),
    #[error("spreadsheet: {0}")]
    Spreadsheet(String),
}

/// Extensions decoded as text, tolerating invalid UTF-8
const TEXT_EXTENSIONS: &[&str] = &[".csv", ".txt", ".md", ".py", ".js", ".json"];

static DOCX_TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid run pattern"));

/// Extract text from `bytes`. Never fails: parse errors come back as text.
pub fn parse_document(bytes: &[u8], filename: &str) -> String {
    let lower = filename.to_lowercase();
    debug!("Parsing document {} ({} bytes)", filename, bytes.len());

    let parsed = if lower.ends_with(".pdf") {
        parse_pdf(bytes)
    } else if lower.ends_with(".docx") {
        parse_docx(bytes)
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        parse_spreadsheet(bytes)
    } else if TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    } else {
        return match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => format!("[Unsupported binary file: {}]", filename),
        };
    };

    parsed.unwrap_or_else(|e| {
        error!("Error parsing {}: {}", filename, e);
        format!("Error parsing file {}: {}", filename, e)
    })
}

fn parse_pdf(bytes: &[u8]) -> Result<String, DocumentError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::Pdf(e.to_string()))
}

fn parse_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| DocumentError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| DocumentError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| DocumentError::Docx(e.to_string()))?;
    Ok(docx_paragraphs(&xml).join("\n"))
}

/// Text of each `<w:p>` paragraph, runs concatenated
fn docx_paragraphs(xml: &str) -> Vec<String> {
    let body = match xml.find("<w:body") {
        Some(idx) => &xml[idx..],
        None => xml,
    };
    let mut paragraphs: Vec<String> = body
        .split("</w:p>")
        .map(|chunk| {
            DOCX_TEXT_RUN
                .captures_iter(chunk)
                .filter_map(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
                .collect::<String>()
        })
        .collect();
    // Trailing chunk after the last paragraph (sectPr, closing tags)
    if !body.trim_end().ends_with("</w:p>") {
        if let Some(last) = paragraphs.last() {
            if last.is_empty() {
                paragraphs.pop();
            }
        }
    }
    paragraphs
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn parse_spreadsheet(bytes: &[u8]) -> Result<String, DocumentError> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DocumentError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DocumentError::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| DocumentError::Spreadsheet(e.to_string()))?;

    let rows: Vec<String> = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect();
    Ok(rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_text_types() {
        assert_eq!(parse_document(b"a,b\n1,2", "data.CSV"), "a,b\n1,2");
        assert_eq!(parse_document(b"# Judul", "notes.md"), "# Judul");
        // Lossy for text extensions
        assert_eq!(parse_document(b"ok\xff", "x.txt"), "ok\u{fffd}");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(parse_document(b"plain", "file.log"), "plain");
        assert_eq!(
            parse_document(&[0xff, 0xfe, 0x00], "blob.bin"),
            "[Unsupported binary file: blob.bin]"
        );
    }

    #[test]
    fn test_docx_paragraphs() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body>
            <w:p><w:r><w:t>Hidrogen </w:t></w:r><w:r><w:t xml:space="preserve">hijau</w:t></w:r></w:p>
            <w:p><w:r><w:t>H&amp;M &lt;2&gt;</w:t></w:r></w:p>
            <w:sectPr/></w:body></w:document>"#;
        let text = parse_document(&docx_bytes(xml), "laporan.docx");
        assert_eq!(text, "Hidrogen hijau\nH&M <2>");
    }

    #[test]
    fn test_broken_docx_reports_error_text() {
        let text = parse_document(b"not a zip", "rusak.docx");
        assert!(text.starts_with("Error parsing file rusak.docx: DOCX:"));
    }

    #[test]
    fn test_broken_pdf_reports_error_text() {
        let text = parse_document(b"not a pdf", "paper.pdf");
        assert!(text.starts_with("Error parsing file paper.pdf:"));
    }

    #[test]
    fn test_broken_spreadsheet_reports_error_text() {
        let text = parse_document(b"nope", "sheet.xlsx");
        assert!(text.starts_with("Error parsing file sheet.xlsx: spreadsheet:"));
    }
}
