//! CSV artifact writer.

use std::io::Write;
use std::path::Path;

use tracing::info;

use super::SinkError;
use crate::engine::Record;

/// Write records to a CSV file with the
/// `codigo,descripcion,presentacion,precio_final` header.
pub fn write_file(path: &Path, records: &[Record]) -> Result<(), SinkError> {
    let mut writer = csv::Writer::from_path(path)?;
    write_records(&mut writer, records)?;
    info!(rows = records.len(), path = %path.display(), "CSV artifact written");
    Ok(())
}

/// Write records as CSV to any writer (e.g. stdout).
pub fn write_to<W: Write>(out: W, records: &[Record]) -> Result<(), SinkError> {
    let mut writer = csv::Writer::from_writer(out);
    write_records(&mut writer, records)
}

fn write_records<W: Write>(writer: &mut csv::Writer<W>, records: &[Record]) -> Result<(), SinkError> {
    for record in records {
        writer.serialize(record)?;
    }
    // Check for errors rather than implicitly flushing and ignoring.
    writer.flush()?;
    Ok(())
}
