//! Word-processor and slide-deck export.
//!
//! Both formats are Office Open XML packages: a zip archive of XML parts.
//! The writers only transcribe project and section fields; no layout logic
//! lives here.

mod docx;
mod pptx;

use std::io::{Cursor, Write};

use anyhow::Result;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::{DocumentType, ProjectWithSections};

/// A rendered file ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn export_project(project: &ProjectWithSections, format: DocumentType) -> Result<ExportedFile> {
    let parts = match format {
        DocumentType::Docx => docx::parts(project),
        DocumentType::Pptx => pptx::parts(project),
    };

    Ok(ExportedFile {
        file_name: format!("project_{}.{}", project.project.id, format.as_str()),
        content_type: content_type(format),
        bytes: package(&parts)?,
    })
}

pub fn content_type(format: DocumentType) -> &'static str {
    match format {
        DocumentType::Docx => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        DocumentType::Pptx => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
    }
}

/// A named XML part inside the package.
struct Part {
    name: String,
    xml: String,
}

impl Part {
    fn new(name: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xml: xml.into(),
        }
    }
}

fn package(parts: &[Part]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for part in parts {
        writer.start_file(part.name.as_str(), options)?;
        writer.write_all(part.xml.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab/newline are not allowed in XML 1.0
            c if c.is_control() && c != '\t' && c != '\n' => {}
            c => out.push(c),
        }
    }
    out
}

/// Split text into paragraphs on blank lines. Each paragraph keeps its inner
/// line breaks as separate lines.
fn blocks(text: &str) -> Vec<Vec<String>> {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| block.lines().map(|line| line.trim_end().to_string()).collect())
        .collect()
}
