//! Resume file ingestion — turns an uploaded file into content the service can read.
//!
//! pdf → base64 document payload; docx → extracted plain text; txt/md → raw text.
//! Anything else is rejected before any network call.

use std::io::{Cursor, Read};
use std::path::Path;

use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::AppError;
use crate::llm_client::ContentPart;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Docx,
    PlainText,
}

impl ResumeFormat {
    /// Detects the format from the file extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Result<Self, AppError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => Ok(ResumeFormat::Pdf),
            Some("docx") => Ok(ResumeFormat::Docx),
            Some("txt") | Some("md") => Ok(ResumeFormat::PlainText),
            _ => Err(AppError::UnsupportedInput(
                "Unsupported file format. Please use PDF, DOCX, TXT, or MD.".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeContent {
    Text(String),
    Document {
        media_type: String,
        data_base64: String,
    },
}

/// An uploaded resume, ready to be sent for profile extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeDocument {
    pub file_name: String,
    pub content: ResumeContent,
}

impl ResumeDocument {
    pub fn from_upload(file_name: &str, bytes: &[u8]) -> Result<Self, AppError> {
        let format = ResumeFormat::from_file_name(file_name)?;
        if bytes.is_empty() {
            return Err(AppError::UnsupportedInput(format!("'{file_name}' is empty")));
        }

        let content = match format {
            ResumeFormat::Pdf => ResumeContent::Document {
                media_type: PDF_MEDIA_TYPE.to_string(),
                data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
            ResumeFormat::Docx => ResumeContent::Text(non_blank(extract_docx_text(bytes)?, file_name)?),
            ResumeFormat::PlainText => ResumeContent::Text(non_blank(
                String::from_utf8_lossy(bytes).into_owned(),
                file_name,
            )?),
        };

        Ok(Self {
            file_name: file_name.to_string(),
            content,
        })
    }

    pub fn to_part(&self) -> ContentPart {
        match &self.content {
            ResumeContent::Text(text) => ContentPart::Text(format!("RESUME CONTENT:\n{text}")),
            ResumeContent::Document {
                media_type,
                data_base64,
            } => ContentPart::Document {
                media_type: media_type.clone(),
                data_base64: data_base64.clone(),
            },
        }
    }
}

fn non_blank(text: String, file_name: &str) -> Result<String, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::UnsupportedInput(format!(
            "'{file_name}' contains no readable text"
        )));
    }
    Ok(text)
}

/// Pulls the body text out of a DOCX archive: `w:t` runs, tabs and line
/// breaks, one line per paragraph.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, AppError> {
    let unreadable = |detail: String| AppError::UnsupportedInput(format!("Unreadable DOCX file: {detail}"));

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| unreadable(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| unreadable(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| unreadable(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let run = t.unescape().map_err(|e| unreadable(e.to_string()))?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(unreadable(e.to_string())),
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}
