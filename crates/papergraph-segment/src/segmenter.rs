//! Sentence Segmenter (stage 2)
//!
//! Rule-based sentence boundary detection over each retained section.
//! Every emitted sentence carries section-local and document-global offset
//! frames; the triple round-trip invariant
//! `document_text[global] == section_text[section] == sentence.text`
//! is verified here and a violating sentence is dropped (logged), never
//! kept with broken anchors.

use papergraph_core::config::SegmenterConfig;
use papergraph_core::{OffsetSpan, RetainedSection, Sentence};
use tracing::{debug, warn};

/// Tokens before a period that do not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "fig", "figs", "al", "e.g", "i.e", "vs", "etc", "no", "ref", "refs", "eq", "eqs", "cf",
    "ca", "approx", "resp", "dr", "st", "sp", "spp", "min", "max",
];

/// Splits section text into sentences with offset bookkeeping.
pub struct SentenceSegmenter {
    config: SegmenterConfig,
}

impl SentenceSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Segment all retained sections, assigning global monotonic sentence
    /// ids. `document_text` must be the reconstruction the sections'
    /// baselines refer to.
    pub fn segment(&self, sections: &[RetainedSection], document_text: &str) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut next_id: u32 = 0;

        for section in sections {
            for raw in split_spans(&section.text) {
                let span = match trim_span(&section.text, raw) {
                    Some(s) => s,
                    None => continue,
                };
                let text = &section.text[span.start..span.end];
                if text.len() < self.config.min_sentence_chars {
                    continue;
                }
                if text.len() > self.config.max_sentence_chars {
                    debug!(section = %section.heading, len = text.len(), "skipping oversized sentence");
                    continue;
                }

                let global = OffsetSpan::new(
                    section.global_start + span.start,
                    section.global_start + span.end,
                );
                // Integrity check: a broken anchor corrupts jump-to-source,
                // so the sentence is dropped rather than kept wrong.
                match document_text.get(global.start..global.end) {
                    Some(slice) if slice == text => {}
                    _ => {
                        warn!(
                            sentence_id = next_id,
                            section = %section.heading,
                            "offset integrity violation, dropping sentence"
                        );
                        continue;
                    }
                }

                sentences.push(Sentence {
                    id: next_id,
                    section_index: section.index,
                    section_heading: section.heading.clone(),
                    text: text.to_string(),
                    section_offsets: span,
                    global_offsets: global,
                });
                next_id += 1;
            }
        }
        sentences
    }
}

/// Raw sentence spans over `text`, ends inclusive of the terminator.
fn split_spans(text: &str) -> Vec<OffsetSpan> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut start = 0usize;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if c == '\n' {
            if pos > start {
                spans.push(OffsetSpan::new(start, pos));
            }
            start = pos + c.len_utf8();
            continue;
        }
        if matches!(c, '.' | '!' | '?') && is_boundary(&chars, i) {
            let end = pos + c.len_utf8();
            spans.push(OffsetSpan::new(start, end));
            start = end;
        }
    }
    if start < text.len() {
        spans.push(OffsetSpan::new(start, text.len()));
    }
    spans
}

/// Decide whether the terminator at `chars[i]` ends a sentence.
fn is_boundary(chars: &[(usize, char)], i: usize) -> bool {
    let c = chars[i].1;

    if c == '.' {
        // Decimal numbers: 3.5, 0.05
        let prev_digit = i > 0 && chars[i - 1].1.is_ascii_digit();
        let next_digit = chars.get(i + 1).map_or(false, |&(_, n)| n.is_ascii_digit());
        if prev_digit && next_digit {
            return false;
        }
        if is_abbreviation(chars, i) {
            return false;
        }
    }

    // Look ahead: require whitespace then an uppercase letter, digit, or
    // opening bracket/quote. End of text is always a boundary.
    let mut j = i + 1;
    if j >= chars.len() {
        return true;
    }
    if !chars[j].1.is_whitespace() {
        return false;
    }
    while j < chars.len() && chars[j].1.is_whitespace() {
        j += 1;
    }
    match chars.get(j) {
        None => true,
        Some(&(_, n)) => n.is_uppercase() || n.is_ascii_digit() || matches!(n, '(' | '[' | '"' | '\u{201C}'),
    }
}

/// Check whether the token immediately before the period at `chars[i]`
/// is a known abbreviation (e.g. "Fig.", "et al.", "e.g.").
fn is_abbreviation(chars: &[(usize, char)], i: usize) -> bool {
    let mut token: Vec<char> = Vec::new();
    let mut j = i;
    while j > 0 {
        let prev = chars[j - 1].1;
        if prev.is_alphanumeric() || prev == '.' {
            token.push(prev);
            j -= 1;
        } else {
            break;
        }
    }
    if token.is_empty() {
        return false;
    }
    let token: String = token.iter().rev().collect::<String>().to_lowercase();
    ABBREVIATIONS.contains(&token.as_str())
}

fn trim_span(text: &str, span: OffsetSpan) -> Option<OffsetSpan> {
    let raw = &text[span.start..span.end];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start + leading;
    Some(OffsetSpan::new(start, start + trimmed.len()))
}
