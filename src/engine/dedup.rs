//! Final deduplication and ordering of raw records.

use std::collections::HashMap;

use super::record::Record;

/// Collapse repeated `(code, description)` keys — the last occurrence in
/// document order wins — then sort by numeric code ascending with
/// description as the tie-break. Codes that don't parse as numbers sort
/// after every numeric code. The raw code string is the final tie-break:
/// distinct codes with equal numeric value ("045" vs "45") would otherwise
/// leak map iteration order into the output.
pub fn dedup_and_sort(records: Vec<Record>) -> Vec<Record> {
    let mut by_key: HashMap<(String, String), Record> = HashMap::new();
    for record in records {
        by_key.insert((record.code.clone(), record.description.clone()), record);
    }

    let mut out: Vec<Record> = by_key.into_values().collect();
    out.sort_by(|a, b| {
        numeric_code(&a.code)
            .cmp(&numeric_code(&b.code))
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.code.cmp(&b.code))
    });
    out
}

/// Sort key for a code. Unparsable codes get a sentinel that places them
/// after all numeric ones.
fn numeric_code(code: &str) -> u64 {
    code.parse().unwrap_or(u64::MAX)
}
