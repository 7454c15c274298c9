//! Row classification and merge engine.
//!
//! Consumes ordered lines — clustered from positioned words or taken
//! directly from extractor table rows — and reconciles them into
//! deduplicated `(code, description, unit, price)` records. The heuristics
//! live in [`classify`]; this module owns the configuration surface and
//! drives whole pages/tables through a fresh state machine each, so pending
//! state never crosses a page or table boundary.
//!
//! # Example
//!
//! ```rust
//! use listado::engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default());
//! let table = vec![
//!     vec!["0123".to_string(), "DETERGENTE LIQUIDO 1 lt".to_string(), "$1.250,00".to_string()],
//! ];
//! let extraction = engine.process_tables(&[table]);
//! assert_eq!(extraction.records[0].price, 1250);
//! ```

mod classify;
mod dedup;
pub mod line;
mod record;
pub mod token;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use classify::Machine;
pub use dedup::dedup_and_sort;
pub use line::{build_lines, Line, Token, Word};
pub use record::Record;

/// The engine's configuration surface. Every divergence point observed
/// across the heuristic variants is a named option here rather than a
/// separate code path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum numeric value accepted as a genuine price. Rejects stray
    /// single digits and spurious ".00" fragments.
    pub price_floor: f64,
    /// Vertical-position tolerance when clustering words into lines.
    pub line_tolerance: f32,
    /// Lower-cased boilerplate markers; a line containing any of them is
    /// discarded.
    pub skip_markers: Vec<String>,
    /// Whether a skipped boilerplate line clears the pending description.
    /// Off by default: preserving pending is more resilient to interleaved
    /// boilerplate.
    pub clear_pending_on_skip: bool,
    /// Attribute a code-only line's code to a nearby description lacking
    /// its own code token.
    pub carryover: bool,
    /// How many subsequent lines a carried code stays attributable.
    pub carryover_window: usize,
    /// Recognized unit-of-measure symbols for pack-size extraction.
    pub unit_symbols: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            price_floor: 100.0,
            line_tolerance: 3.0,
            skip_markers: [
                "fecha",
                "hora",
                "página",
                "pag",
                "cliente",
                "subtotal",
                "total",
                "cuit",
                "c.u.i.t",
                "condición",
                "condicion",
                "responsable",
                "inscripto",
                "domicilio",
                "original",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            clear_pending_on_skip: false,
            carryover: true,
            carryover_window: 2,
            unit_symbols: ["ml", "cc", "l", "lt", "lts", "litro", "litros", "kg", "g"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Aggregate diagnostics for one engine run. Observability only — none of
/// these are error conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    /// Lines examined across all pages/tables.
    pub lines: u64,
    /// Lines discarded by the boilerplate filter.
    pub skipped: u64,
    /// Records before deduplication.
    pub raw_records: u64,
    /// Records completed by merging a pending description with a
    /// following price line.
    pub pending_merges: u64,
    /// Records (or pendings) that borrowed their code from a code-only line.
    pub carryover_hits: u64,
}

/// Result of an engine run: the final deduplicated, sorted records plus
/// run diagnostics.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub stats: EngineStats,
}

/// The classification and merge engine. Construct once per configuration;
/// processing holds no state between calls.
pub struct Engine {
    cfg: EngineConfig,
    unit_re: Regex,
    skip_markers: Vec<String>,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        let unit_re = token::unit_regex(&cfg.unit_symbols);
        let skip_markers = cfg.skip_markers.iter().map(|m| m.to_lowercase()).collect();
        Self {
            cfg,
            unit_re,
            skip_markers,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Word-position path: cluster each page's words into lines, then
    /// classify. Pending state resets at every page boundary.
    pub fn process_pages(&self, pages: &[Vec<Word>]) -> Extraction {
        let mut stats = EngineStats::default();
        let mut raw = Vec::new();

        for words in pages {
            let lines = build_lines(words, self.cfg.line_tolerance);
            self.run_unit(&lines, &mut stats, &mut raw);
        }

        self.finish(raw, stats)
    }

    /// Table-grid path: each extractor row is one line, cell order is token
    /// order. Pending state resets at every table boundary.
    pub fn process_tables(&self, tables: &[Vec<Vec<String>>]) -> Extraction {
        let mut stats = EngineStats::default();
        let mut raw = Vec::new();

        for table in tables {
            let lines: Vec<Line> = table.iter().map(|row| Line::from_cells(row)).collect();
            self.run_unit(&lines, &mut stats, &mut raw);
        }

        self.finish(raw, stats)
    }

    /// Classify one page/table worth of lines with a fresh state machine.
    fn run_unit(&self, lines: &[Line], stats: &mut EngineStats, raw: &mut Vec<Record>) {
        let mut machine = Machine::new(&self.cfg, &self.unit_re, &self.skip_markers);
        for line in lines {
            stats.lines += 1;
            if let Some(record) = machine.feed(line) {
                raw.push(record);
            }
        }
        stats.skipped += machine.skipped;
        stats.pending_merges += machine.pending_merges;
        stats.carryover_hits += machine.carryover_hits;
    }

    fn finish(&self, raw: Vec<Record>, mut stats: EngineStats) -> Extraction {
        stats.raw_records = raw.len() as u64;
        let records = dedup_and_sort(raw);
        info!(
            lines = stats.lines,
            skipped = stats.skipped,
            merged = stats.pending_merges,
            carried = stats.carryover_hits,
            records = records.len(),
            "extraction complete"
        );
        Extraction { records, stats }
    }
}
