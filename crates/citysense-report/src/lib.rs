//! Daily location reports built from the latest derived metric records
//!
//! A report is assembled once from the metric store and can then be rendered
//! as plain text or as a single-page PDF.

pub mod assemble;
pub mod pdf;
pub mod text;

pub use assemble::*;
pub use pdf::{pdf_filename, render_pdf};
pub use text::render_text;

use citysense_core::MetricCategory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No data for {location}: missing {}", list_categories(.missing))]
    Incomplete {
        location: String,
        missing: Vec<MetricCategory>,
    },

    #[error("Storage error: {0:#}")]
    Storage(#[source] anyhow::Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

pub type ReportResult<T> = Result<T, ReportError>;

fn list_categories(categories: &[MetricCategory]) -> String {
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
