use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::pdf::{generate_discharge_pdf, PdfContent};
use super::ExportError;
use crate::models::StageId;
use crate::reconcile::ReconciledOutputSet;

/// "discharge_outputs_2026-02-22.json"
pub fn all_outputs_file_name(date: NaiveDate) -> String {
    format!("discharge_outputs_{}.json", date.format("%Y-%m-%d"))
}

/// "quiz_output_2026-02-22.json"
pub fn stage_file_name(stage: StageId, date: NaiveDate) -> String {
    format!("{}_output_{}.json", stage.as_str(), date.format("%Y-%m-%d"))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Write all six slots as a pretty JSON array into `dir`.
pub fn export_all_json(
    outputs: &ReconciledOutputSet,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let json = serde_json::to_string_pretty(&outputs.to_json())?;
    write_export(dir, &all_outputs_file_name(date), json.as_bytes())
}

/// Write one stage's slot as pretty JSON into `dir`.
pub fn export_stage_json(
    outputs: &ReconciledOutputSet,
    stage: StageId,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let json = serde_json::to_string_pretty(&outputs.get(stage).to_value())?;
    write_export(dir, &stage_file_name(stage, date), json.as_bytes())
}

/// Render the discharge summary PDF into `dir`.
pub fn export_pdf(content: &PdfContent, dir: &Path) -> Result<PathBuf, ExportError> {
    let bytes = generate_discharge_pdf(content)?;
    write_export(dir, &content.file_name(), &bytes)
}

fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), size = bytes.len(), "Export written");
    Ok(path)
}
