//! Result rendering: human-readable views of each stage's output plus
//! JSON and PDF exports.

pub mod export;
pub mod pdf;
pub mod text;
pub mod transcript;

pub use export::*;
pub use pdf::*;
pub use text::*;
pub use transcript::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot serialize export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),
}
