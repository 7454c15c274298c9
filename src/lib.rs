//! `listado` - supplier price-list extraction pipeline
//!
//! Turns an unstructured price-list PDF into a deduplicated, sorted set of
//! `(code, description, unit, price)` records and pushes them to a CSV
//! artifact and a Google Sheets worksheet.
//!
//! The interesting part is the [`engine`]: line-by-line heuristics that
//! decide whether a line is a product code marker, a description, a price,
//! or a description whose price arrives on the next line, and that merge
//! those into final records. Everything around it (fetch, PDF word
//! extraction, sinks) is a thin boundary wrapper.
//!
//! # Example
//!
//! ```rust
//! use listado::engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default());
//! let rows = vec![vec![
//!     "0123".to_string(),
//!     "DETERGENTE LIQUIDO 1 lt".to_string(),
//!     "$1.250,00".to_string(),
//! ]];
//! let extraction = engine.process_tables(&[rows]);
//! assert_eq!(extraction.records[0].code, "0123");
//! assert_eq!(extraction.records[0].description, "DETERGENTE LIQUIDO");
//! assert_eq!(extraction.records[0].unit, "1 lt");
//! ```

pub mod config;
pub mod engine;
pub mod fetch;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod sink;

pub use engine::{Engine, EngineConfig, EngineStats, Extraction, Record};

/// Version of listado
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
