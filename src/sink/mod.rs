//! Output sinks for finalized records.
//!
//! Sinks consume the sorted record list verbatim; all decision logic lives
//! in the engine. Two are provided: a CSV artifact for inspection and a
//! Google Sheets worksheet for the actual consumers.

pub mod csv;
pub mod sheets;

use thiserror::Error;

/// Failures writing records to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sheets request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API rejected the request: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("GOOGLE_SHEETS_TOKEN is not set")]
    MissingToken,
}
