//! Positioned word extraction from PDF bytes.
//!
//! Uses `pdfium-render` (Chromium's PDF library) to pull character bounding
//! boxes, then groups characters into positioned words per page. Line
//! clustering is *not* done here — the engine's line builder owns that, with
//! its configurable tolerance — so this stays a dumb word extractor.

use anyhow::{Context, Result};
use pdfium_render::prelude::*;
use tracing::warn;

use crate::engine::Word;

/// A positioned character, in top-down page coordinates.
struct PdfChar {
    ch: char,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// Extract each page's words with their positions.
///
/// Coordinates are converted from pdfium's bottom-up system to top-down so
/// ascending `y` is reading order. Scanned pages without a text layer
/// produce empty word lists.
#[allow(deprecated)] // PdfRect field access deprecated in 0.8.28, removed in 0.9.0
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<Vec<Word>>> {
    let pdfium = Pdfium::default();
    let doc = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .context("failed to parse PDF")?;

    let mut pages = Vec::new();
    for page in doc.pages().iter() {
        let height = page.height().value;
        let text = page.text().context("failed to extract text from page")?;

        let mut chars = Vec::new();
        for ch in text.chars().iter() {
            if let (Some(unicode_ch), Ok(rect)) = (ch.unicode_char(), ch.tight_bounds()) {
                chars.push(PdfChar {
                    ch: unicode_ch,
                    x: rect.left.value,
                    y: height - rect.top.value,
                    width: (rect.right.value - rect.left.value).abs(),
                    height: (rect.top.value - rect.bottom.value).abs(),
                });
            }
        }

        pages.push(group_words(chars));
    }

    if pages.iter().all(Vec::is_empty) && !pages.is_empty() {
        warn!(
            pages = pages.len(),
            "no text layer found; the PDF appears to be scanned"
        );
    }

    Ok(pages)
}

/// Group a page's characters into words.
///
/// Characters are sorted by (y, x), run together while their vertical delta
/// stays under 0.4x the character height, and split into words at horizontal
/// gaps wider than 0.3x the average character width of the run.
fn group_words(mut chars: Vec<PdfChar>) -> Vec<Word> {
    if chars.is_empty() {
        return Vec::new();
    }

    chars.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut words = Vec::new();
    let mut run: Vec<PdfChar> = Vec::new();

    for ch in chars {
        let new_run = run
            .first()
            .is_some_and(|first| (ch.y - first.y).abs() >= first.height.max(1.0) * 0.4);
        if new_run {
            split_run(&mut words, std::mem::take(&mut run));
        }
        run.push(ch);
    }
    split_run(&mut words, run);

    words
}

/// Split one same-height character run into words at large gaps.
fn split_run(words: &mut Vec<Word>, run: Vec<PdfChar>) {
    if run.is_empty() {
        return;
    }

    let avg_width = run.iter().map(|c| c.width).sum::<f32>() / run.len() as f32;
    let gap_threshold = avg_width * 0.3;

    let mut text = String::new();
    let mut word_x = run[0].x;
    let word_y = run[0].y;

    for (i, ch) in run.iter().enumerate() {
        if i > 0 {
            let gap = ch.x - (run[i - 1].x + run[i - 1].width);
            if gap > gap_threshold && !text.is_empty() {
                words.push(Word {
                    text: std::mem::take(&mut text),
                    x: word_x,
                    y: word_y,
                });
                word_x = ch.x;
            }
        }
        text.push(ch.ch);
    }

    if !text.is_empty() {
        words.push(Word {
            text,
            x: word_x,
            y: word_y,
        });
    }
}
