use std::io::BufWriter;
use std::sync::LazyLock;

use printpdf::*;
use regex::Regex;
use serde_json::Value;

use super::ExportError;
use crate::models::StageId;
use crate::reconcile::ReconciledOutputSet;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const TOP: f32 = 277.0;
const BOTTOM: f32 = 20.0;

const DEFAULT_PATIENT_NAME: &str = "Patient";

static SUMMARY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Patient ([A-Za-z\. ]+?) has been").unwrap());

/// What goes into the discharge summary PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfContent {
    pub patient_name: String,
    pub generated_at: String,
    pub summary: Option<String>,
    /// Packager stage output, dumped as pretty JSON.
    pub packager_output: Option<Value>,
}

impl PdfContent {
    /// Build from reconciled outputs. The patient name comes from the
    /// summary text, then `fallback_name`, then "Patient".
    pub fn from_outputs(outputs: &ReconciledOutputSet, fallback_name: &str) -> Self {
        let summary = outputs
            .get(StageId::Summary)
            .as_matched()
            .and_then(|s| s.get("summary_english"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let patient_name = summary
            .as_deref()
            .and_then(patient_name_from_summary)
            .or_else(|| {
                let name = fallback_name.trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .unwrap_or_else(|| DEFAULT_PATIENT_NAME.to_string());

        Self {
            patient_name,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            summary,
            packager_output: Some(outputs.get(StageId::Packager).to_value()),
        }
    }

    pub fn file_name(&self) -> String {
        pdf_file_name(&self.patient_name)
    }
}

/// Name in "Patient <name> has been ...", trimmed.
pub fn patient_name_from_summary(summary: &str) -> Option<String> {
    SUMMARY_NAME
        .captures(summary)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// "Rita Mehra" -> "Rita_Mehra_discharge_summary.pdf"
///
/// Only `[A-Za-z0-9._-]` survive; anything else (path separators included)
/// becomes `_`, so the name always stays inside the export directory.
pub fn pdf_file_name(patient_name: &str) -> String {
    let name: String = patient_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = if name.is_empty() { DEFAULT_PATIENT_NAME } else { &name };
    format!("{name}_discharge_summary.pdf")
}

/// Lays out lines top to bottom, starting a new A4 page when full.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference, page: PdfPageIndex, layer: PdfLayerIndex) -> Self {
        Self {
            doc,
            layer: doc.get_page(page).get_layer(layer),
            y: TOP,
            pages: 1,
        }
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef, advance: f32) {
        if self.y - advance < BOTTOM {
            self.new_page();
        }
        self.layer
            .use_text(text, size, Mm(MARGIN_LEFT), Mm(self.y), font);
        self.y -= advance;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
        self.pages += 1;
    }
}

/// Generates the discharge summary PDF. Returns PDF bytes.
pub fn generate_discharge_pdf(content: &PdfContent) -> Result<Vec<u8>, ExportError> {
    let (doc, page1, layer1) =
        PdfDocument::new("Discharge Summary", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(format!("font error: {e}")))?;
    let mono = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| ExportError::Pdf(format!("font error: {e}")))?;

    let mut out = PageWriter::new(&doc, page1, layer1);

    out.line("Discharge Summary", 16.0, &bold, 15.0);
    out.line(&format!("Patient: {}", content.patient_name), 12.0, &font, 10.0);
    out.line(&format!("Generated: {}", content.generated_at), 12.0, &font, 15.0);

    if let Some(summary) = content.summary.as_deref() {
        out.line("Summary:", 14.0, &bold, 10.0);
        for paragraph in summary.lines() {
            for line in wrap_text(paragraph, 90) {
                out.line(&line, 11.0, &font, 6.0);
            }
        }
        out.gap(6.0);
    }

    if let Some(packager) = &content.packager_output {
        out.line("Discharge Packager Output JSON:", 14.0, &bold, 10.0);
        let json = serde_json::to_string_pretty(packager)?;
        for raw in json.lines() {
            for line in split_long_line(raw, 95) {
                out.line(&line, 8.0, &mono, 4.0);
            }
        }
    }

    tracing::debug!(pages = out.pages, "Discharge PDF laid out");

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ExportError::Pdf(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ExportError::Pdf(format!("buffer error: {e}")))
}

/// Simple word-wrap helper for PDF text rendering.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Hard split that keeps indentation (for the JSON dump).
fn split_long_line(line: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
