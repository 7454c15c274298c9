//! Row classification and merge — the core state machine.
//!
//! Each [`Line`] is classified exactly once, in order, against one slot of
//! carried state: a description seen without a price, waiting for a price on
//! the next line. A fresh [`Machine`] is created per page or table so pending
//! state never leaks across those boundaries.
//!
//! Price selection is deliberately asymmetric. When description and price
//! share a line, the rightmost price column is the final/net price. When a
//! bare description is completed by a numbers-only line, the leftmost column
//! is the unit price and later columns are derived totals.

use regex::Regex;
use tracing::debug;

use super::line::Line;
use super::record::Record;
use super::token::{
    extract_unit, has_letters, is_code, is_price_token, is_unit_symbol, parse_price,
    strip_trailing_zeros, strip_unit,
};
use super::EngineConfig;

/// A description seen on one line with no associated price, valid for at
/// most the next line examined within the same page/table.
#[derive(Debug, Clone)]
struct Pending {
    code: String,
    description: String,
    unit: String,
}

/// A code-only line's code, attributable to a nearby description. Ages by
/// one per line classified; expires past the configured window.
#[derive(Debug, Clone)]
struct CarriedCode {
    code: String,
    age: usize,
}

/// Per-page/table classification state. Create one per page or table and
/// feed it lines in reading order.
pub(super) struct Machine<'a> {
    cfg: &'a EngineConfig,
    unit_re: &'a Regex,
    skip_markers: &'a [String],
    pending: Option<Pending>,
    carried: Option<CarriedCode>,
    pub skipped: u64,
    pub pending_merges: u64,
    pub carryover_hits: u64,
}

impl<'a> Machine<'a> {
    pub fn new(cfg: &'a EngineConfig, unit_re: &'a Regex, skip_markers: &'a [String]) -> Self {
        Self {
            cfg,
            unit_re,
            skip_markers,
            pending: None,
            carried: None,
            skipped: 0,
            pending_merges: 0,
            carryover_hits: 0,
        }
    }

    /// Classify one line, emitting at most one completed record.
    pub fn feed(&mut self, line: &Line) -> Option<Record> {
        let joined = line.joined_lower();
        if self.skip_markers.iter().any(|m| joined.contains(m.as_str())) {
            self.skipped += 1;
            if self.cfg.clear_pending_on_skip {
                self.pending = None;
            }
            return None;
        }

        // Age the carried code before this line can consume it: a code-only
        // line reaches descriptions on the following `carryover_window` lines.
        if let Some(carried) = &mut self.carried {
            carried.age += 1;
            if carried.age > self.cfg.carryover_window {
                self.carried = None;
            }
        }

        let code_idx = find_code(line);
        let code = code_idx.map(|i| line.tokens[i].text.clone());

        let mut description = self.assemble_description(line, code_idx);
        let unit = extract_unit(&description, self.unit_re);
        description = strip_trailing_zeros(&description);

        let prices: Vec<f64> = line
            .tokens
            .iter()
            .filter(|t| is_price_token(&t.text))
            .filter_map(|t| parse_price(&t.text, self.cfg.price_floor))
            .collect();

        // A lone number after a bare description is a price column, not a
        // new code marker, even when it happens to be code-shaped.
        let every_token_is_price = !line.tokens.is_empty() && prices.len() == line.tokens.len();
        let completes_pending = self.pending.is_some() && every_token_is_price;

        // Code-only line: nothing but the code (and tokens that are neither
        // letter-bearing nor valid prices). Remember the code for carry-over.
        if let Some(idx) = code_idx {
            let bare = line.tokens.iter().enumerate().all(|(i, t)| {
                i == idx
                    || (!has_letters(&t.text)
                        && parse_price(&t.text, self.cfg.price_floor).is_none())
            });
            if bare && !completes_pending {
                if self.cfg.carryover {
                    self.carried = Some(CarriedCode {
                        code: line.tokens[idx].text.clone(),
                        age: 0,
                    });
                }
                self.pending = None;
                return None;
            }
        }

        match (!description.is_empty(), !prices.is_empty()) {
            // Description and price(s) on the same line: rightmost price
            // wins. The pack-size phrase moves to the unit field, so it is
            // stripped from the finalized description here. A stored pending
            // keeps it: its description is final text, never re-examined.
            (true, true) => {
                self.pending = None;
                let (code, via_carry) = self.available_code(code)?;
                if via_carry {
                    self.carryover_hits += 1;
                }
                let price = prices.last().copied()?;
                let description = if unit.is_empty() {
                    description
                } else {
                    strip_unit(&description, self.unit_re)
                };
                Some(Record {
                    code,
                    description,
                    unit,
                    price: price.round() as u32,
                })
            }
            // Description only: store it, overwriting any previous pending.
            (true, false) => {
                match self.available_code(code) {
                    Some((code, via_carry)) => {
                        if via_carry {
                            self.carryover_hits += 1;
                        }
                        self.pending = Some(Pending {
                            code,
                            description,
                            unit,
                        });
                    }
                    None => self.pending = None,
                }
                None
            }
            // Price(s) only, completing a pending description: leftmost
            // price wins.
            (false, true) => {
                let pending = self.pending.take()?;
                let price = prices.first().copied()?;
                self.pending_merges += 1;
                debug!(code = %pending.code, price, "merged pending description with price line");
                Some(Record {
                    code: pending.code,
                    description: pending.description,
                    unit: pending.unit,
                    price: price.round() as u32,
                })
            }
            // Nothing usable.
            (false, false) => {
                self.pending = None;
                None
            }
        }
    }

    /// Resolve the code for the current line: its own code token, or the
    /// carried one when carry-over is enabled and still within its window.
    /// Returns whether the carried code was consumed.
    fn available_code(&mut self, own: Option<String>) -> Option<(String, bool)> {
        if let Some(code) = own {
            return Some((code, false));
        }
        if self.cfg.carryover {
            if let Some(carried) = self.carried.take() {
                return Some((carried.code, true));
            }
        }
        None
    }

    /// Join every token that carries letters (or is a pack-size quantity
    /// immediately preceding a unit symbol) into the candidate description,
    /// excluding the token chosen as the code.
    fn assemble_description(&self, line: &Line, code_idx: Option<usize>) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for (i, token) in line.tokens.iter().enumerate() {
            if Some(i) == code_idx {
                continue;
            }
            let text = token.text.as_str();
            let quantity_before_unit = text.len() <= 4
                && !text.is_empty()
                && text.bytes().all(|b| b.is_ascii_digit())
                && line
                    .tokens
                    .get(i + 1)
                    .is_some_and(|next| is_unit_symbol(&next.text, &self.cfg.unit_symbols));
            if has_letters(text) || quantity_before_unit {
                parts.push(text);
            }
        }
        parts.join(" ")
    }
}

/// Find the token to treat as the product code: the leftmost one that
/// satisfies the code shape.
fn find_code(line: &Line) -> Option<usize> {
    line.tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| is_code(&t.text))
        .min_by(|(_, a), (_, b)| {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::token::unit_regex;

    struct Fixture {
        cfg: EngineConfig,
        unit_re: Regex,
        markers: Vec<String>,
    }

    impl Fixture {
        fn new(cfg: EngineConfig) -> Self {
            let unit_re = unit_regex(&cfg.unit_symbols);
            let markers = cfg.skip_markers.clone();
            Self { cfg, unit_re, markers }
        }

        fn machine(&self) -> Machine<'_> {
            Machine::new(&self.cfg, &self.unit_re, &self.markers)
        }
    }

    fn row(cells: &[&str]) -> Line {
        Line::from_cells(cells)
    }

    #[test]
    fn same_line_record_uses_last_price() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        let rec = m
            .feed(&row(&["0123", "DETERGENTE", "LIQUIDO", "1", "lt", "$1.250,00"]))
            .unwrap();
        assert_eq!(rec.code, "0123");
        assert_eq!(rec.description, "DETERGENTE LIQUIDO");
        assert_eq!(rec.unit, "1 lt");
        assert_eq!(rec.price, 1250);
    }

    #[test]
    fn same_line_pack_size_lands_in_unit_not_description() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        let rec = m
            .feed(&row(&["0200", "SHAMPOO", "500ml", "SUAVE", "$ 900"]))
            .unwrap();
        assert_eq!(rec.description, "SHAMPOO SUAVE");
        assert_eq!(rec.unit, "500 ml");
    }

    #[test]
    fn unit_only_description_survives_stripping() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        // Nothing but the pack size names this product; keep it rather than
        // emit an empty description.
        let rec = m.feed(&row(&["0123", "5", "lt", "$ 900"])).unwrap();
        assert_eq!(rec.description, "5 lt");
        assert_eq!(rec.unit, "5 lt");
    }

    #[test]
    fn pending_then_price_line_uses_first_price() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["045", "LAVANDINA", "5", "lt"])).is_none());
        let rec = m.feed(&row(&["480", "500"])).unwrap();
        assert_eq!(rec.code, "045");
        assert_eq!(rec.description, "LAVANDINA 5 lt");
        assert_eq!(rec.unit, "5 lt");
        assert_eq!(rec.price, 480);
        assert_eq!(m.pending_merges, 1);
    }

    #[test]
    fn boilerplate_lines_are_skipped() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["fecha:", "12/05/2024"])).is_none());
        assert_eq!(m.skipped, 1);
    }

    #[test]
    fn skip_preserves_pending_by_default() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["045", "LAVANDINA", "5", "lt"])).is_none());
        assert!(m.feed(&row(&["Página", "2"])).is_none());
        let rec = m.feed(&row(&["480"])).unwrap();
        assert_eq!(rec.code, "045");
        assert_eq!(rec.price, 480);
    }

    #[test]
    fn skip_clears_pending_when_configured() {
        let cfg = EngineConfig {
            clear_pending_on_skip: true,
            ..EngineConfig::default()
        };
        let fx = Fixture::new(cfg);
        let mut m = fx.machine();
        assert!(m.feed(&row(&["045", "LAVANDINA", "5", "lt"])).is_none());
        assert!(m.feed(&row(&["Página", "2"])).is_none());
        assert!(m.feed(&row(&["480"])).is_none());
    }

    #[test]
    fn code_only_line_feeds_carryover() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["0123"])).is_none());
        let rec = m.feed(&row(&["ESPONJA", "VERDE", "350"])).unwrap();
        assert_eq!(rec.code, "0123");
        assert_eq!(rec.description, "ESPONJA VERDE");
        assert_eq!(rec.price, 350);
        assert_eq!(m.carryover_hits, 1);
    }

    #[test]
    fn carried_code_expires_past_window() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["0123"])).is_none());
        // Two lines of nothing usable exhaust the default window of 2.
        assert!(m.feed(&row(&["-"])).is_none());
        assert!(m.feed(&row(&["-"])).is_none());
        assert!(m.feed(&row(&["ESPONJA", "VERDE", "350"])).is_none());
        assert_eq!(m.carryover_hits, 0);
    }

    #[test]
    fn carryover_disabled_ignores_code_only_lines() {
        let cfg = EngineConfig {
            carryover: false,
            ..EngineConfig::default()
        };
        let fx = Fixture::new(cfg);
        let mut m = fx.machine();
        assert!(m.feed(&row(&["0123"])).is_none());
        assert!(m.feed(&row(&["ESPONJA", "VERDE", "350"])).is_none());
    }

    #[test]
    fn code_only_line_clears_pending() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["045", "LAVANDINA", "5", "lt"])).is_none());
        // "067" is below the price floor, so it reads as a code marker and
        // clears the pending description.
        assert!(m.feed(&row(&["067"])).is_none());
        assert!(m.feed(&row(&["ESPONJA", "ROSA"])).is_none());
        assert_eq!(m.pending_merges, 0);
    }

    #[test]
    fn lone_price_after_pending_merges_even_when_code_shaped() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["045", "LAVANDINA", "5", "lt"])).is_none());
        // "0999" is code-shaped but parses as a valid price; with a
        // description waiting, the price reading wins.
        let rec = m.feed(&row(&["0999"])).unwrap();
        assert_eq!(rec.code, "045");
        assert_eq!(rec.price, 999);
    }

    #[test]
    fn description_without_code_is_discarded() {
        let cfg = EngineConfig {
            carryover: false,
            ..EngineConfig::default()
        };
        let fx = Fixture::new(cfg);
        let mut m = fx.machine();
        assert!(m.feed(&row(&["ESPONJA", "VERDE"])).is_none());
        assert!(m.feed(&row(&["480"])).is_none());
    }

    #[test]
    fn newer_pending_overwrites_older() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["045", "LAVANDINA", "5", "lt"])).is_none());
        assert!(m.feed(&row(&["046", "ALCOHOL", "ETILICO"])).is_none());
        let rec = m.feed(&row(&["600"])).unwrap();
        assert_eq!(rec.code, "046");
        assert_eq!(rec.description, "ALCOHOL ETILICO");
    }

    #[test]
    fn price_only_line_without_pending_is_discarded() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["480", "500"])).is_none());
        assert_eq!(m.pending_merges, 0);
    }

    #[test]
    fn unparsable_price_tokens_are_silently_excluded() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        // ".00" is not a price; the line still classifies normally.
        let rec = m.feed(&row(&["0123", "ALCOHOL", ".00", "300"])).unwrap();
        assert_eq!(rec.price, 300);
    }

    #[test]
    fn leftmost_code_preferred_when_multiple_qualify() {
        use crate::engine::line::Token;

        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        // Three code-shaped tokens; the leftmost is the product code, the
        // rightmost valid price is the final price.
        let line = Line {
            tokens: vec![
                Token { text: "0123".into(), x: 10.0 },
                Token { text: "JABON".into(), x: 50.0 },
                Token { text: "777".into(), x: 120.0 },
                Token { text: "480".into(), x: 200.0 },
            ],
        };
        let rec = m.feed(&line).unwrap();
        assert_eq!(rec.code, "0123");
        assert_eq!(rec.price, 480);
    }

    #[test]
    fn lone_code_shaped_number_completes_pending() {
        let fx = Fixture::new(EngineConfig::default());
        let mut m = fx.machine();
        assert!(m.feed(&row(&["045", "LAVANDINA", "5", "lt"])).is_none());
        // "480" is both code-shaped and price-shaped; with a description
        // waiting it is the price column.
        let rec = m.feed(&row(&["480"])).unwrap();
        assert_eq!(rec.code, "045");
        assert_eq!(rec.price, 480);
    }
}
