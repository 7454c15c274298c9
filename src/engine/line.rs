//! Line construction from positioned words or extractor table rows.
//!
//! Both extraction backends funnel into the same [`Line`] shape so the
//! classification engine never knows which one produced its input. The
//! word-position path clusters words into visual lines with a vertical
//! tolerance; the table path uses each extractor row's cells directly.

use super::token::tidy_text;

/// A positioned word from the word-extraction backend.
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    /// Left edge, in page position units.
    pub x: f32,
    /// Vertical position, increasing top-to-bottom.
    pub y: f32,
}

/// A normalized token within a line. `x` is the horizontal position for the
/// word path, or the cell index for the table path; it only drives
/// left-to-right ordering and leftmost-code preference.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub x: f32,
}

/// One unit of classification: an ordered run of tokens sharing a vertical
/// position (word path) or the cells of one extractor row (table path).
#[derive(Debug, Clone, Default)]
pub struct Line {
    pub tokens: Vec<Token>,
}

impl Line {
    /// Build a line from one extractor-provided table row. Cell order is
    /// token order; empty cells are dropped after normalization.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let tokens = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| Token {
                text: tidy_text(cell.as_ref()),
                x: i as f32,
            })
            .filter(|t| !t.text.is_empty())
            .collect();
        Self { tokens }
    }

    /// The line's full text, lower-cased, for boilerplate matching.
    pub fn joined_lower(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Cluster a page's words into visual lines.
///
/// Words are sorted by (vertical, horizontal) position, then accumulated
/// into the current line while their vertical delta from the line's first
/// word stays within `tolerance`. Tokens within each line are ordered
/// left-to-right.
pub fn build_lines(words: &[Word], tolerance: f32) -> Vec<Line> {
    if words.is_empty() {
        return Vec::new();
    }

    let mut sorted = words.to_vec();
    sorted.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<Word> = vec![sorted[0].clone()];
    let mut line_y = sorted[0].y;

    for word in sorted.into_iter().skip(1) {
        if (word.y - line_y).abs() <= tolerance {
            current.push(word);
        } else {
            line_y = word.y;
            lines.push(finish_line(std::mem::replace(&mut current, vec![word])));
        }
    }
    lines.push(finish_line(current));

    lines
}

fn finish_line(mut words: Vec<Word>) -> Line {
    words.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    let tokens = words
        .into_iter()
        .map(|w| Token {
            text: tidy_text(&w.text),
            x: w.x,
        })
        .filter(|t| !t.text.is_empty())
        .collect();
    Line { tokens }
}
