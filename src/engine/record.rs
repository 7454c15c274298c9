//! The finalized output record.

use serde::Serialize;

/// One structured price-list entry.
///
/// Serializes with the downstream column names so the CSV artifact and the
/// spreadsheet header stay in sync with what the consumers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Product code: 2-6 decimal digits, as printed (leading zeros kept).
    #[serde(rename = "codigo")]
    pub code: String,
    /// Normalized description, never empty.
    #[serde(rename = "descripcion")]
    pub description: String,
    /// `"<quantity> <unit>"` presentation string, or empty when absent.
    #[serde(rename = "presentacion")]
    pub unit: String,
    /// Final price, rounded to a whole integer.
    #[serde(rename = "precio_final")]
    pub price: u32,
}
