//! Section Filter (stage 1)
//!
//! Drops boilerplate and near-empty sections, normalizes headings, and
//! assigns each retained section its baseline into the reconstructed
//! document text. The reconstructed text is the retained section texts
//! joined by [`SECTION_SEPARATOR`]; global offsets of every downstream
//! record are relative to it.

use papergraph_core::config::SectionFilterConfig;
use papergraph_core::{RetainedSection, SectionInput};
use tracing::debug;

/// Separator between retained sections in the reconstructed document text.
pub const SECTION_SEPARATOR: &str = "\n\n";

/// Canonical forms for common scientific-paper headings.
const HEADING_ALIASES: &[(&str, &str)] = &[
    ("introduction", "INTRODUCTION"),
    ("background", "INTRODUCTION"),
    ("methods", "METHODS"),
    ("materials and methods", "METHODS"),
    ("material and methods", "METHODS"),
    ("results", "RESULTS"),
    ("results and discussion", "RESULTS"),
    ("discussion", "DISCUSSION"),
    ("conclusion", "CONCLUSION"),
    ("conclusions", "CONCLUSION"),
    ("abstract", "ABSTRACT"),
];

/// Normalize a section heading: canonical form for known headings,
/// trimmed original otherwise, `UNLABELED` when empty.
pub fn normalize_heading(heading: &str) -> String {
    let trimmed = heading.trim();
    if trimmed.is_empty() {
        return "UNLABELED".to_string();
    }
    let key = trimmed.to_lowercase();
    for (alias, canonical) in HEADING_ALIASES {
        if key == *alias {
            return canonical.to_string();
        }
    }
    trimmed.to_string()
}

/// Section Filter: selects and orders the sections worth processing.
pub struct SectionFilter {
    config: SectionFilterConfig,
}

impl SectionFilter {
    pub fn new(config: SectionFilterConfig) -> Self {
        Self { config }
    }

    /// Apply the filter policy and compute global offset baselines.
    ///
    /// Sections below the minimum word count or matching the non-content
    /// heading list are dropped, unless that would leave zero sections; in
    /// that degenerate case all non-empty sections are kept.
    pub fn filter(&self, sections: &[SectionInput]) -> Vec<RetainedSection> {
        let mut kept: Vec<(String, &str)> = Vec::new();
        for sec in sections {
            let text = sec.text.trim();
            if text.is_empty() {
                continue;
            }
            let heading = normalize_heading(&sec.heading);
            if self.is_skipped_heading(&heading) {
                debug!(heading = %heading, "dropping non-content section");
                continue;
            }
            if text.split_whitespace().count() < self.config.min_words {
                debug!(heading = %heading, "dropping short section");
                continue;
            }
            kept.push((heading, text));
        }

        // Degenerate case: the policy would leave nothing to process.
        if kept.is_empty() {
            kept = sections
                .iter()
                .filter(|s| !s.text.trim().is_empty())
                .map(|s| (normalize_heading(&s.heading), s.text.trim()))
                .collect();
        }

        let mut retained = Vec::with_capacity(kept.len());
        let mut cursor = 0usize;
        for (index, (heading, text)) in kept.into_iter().enumerate() {
            if index > 0 {
                cursor += SECTION_SEPARATOR.len();
            }
            let global_start = cursor;
            let global_end = cursor + text.len();
            retained.push(RetainedSection {
                index,
                heading,
                text: text.to_string(),
                global_start,
                global_end,
            });
            cursor = global_end;
        }
        retained
    }

    fn is_skipped_heading(&self, heading: &str) -> bool {
        let upper = heading.to_uppercase();
        self.config
            .skip_headings
            .iter()
            .any(|h| h.to_uppercase() == upper)
    }
}

/// Reconstruct the full document text the global offsets refer to.
pub fn reconstruct_text(sections: &[RetainedSection]) -> String {
    let texts: Vec<&str> = sections.iter().map(|s| s.text.as_str()).collect();
    texts.join(SECTION_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sec(heading: &str, text: &str) -> SectionInput {
        SectionInput {
            heading: heading.to_string(),
            text: text.to_string(),
        }
    }

    fn long_text(words: usize) -> String {
        vec!["word"; words].join(" ")
    }

    #[test]
    fn test_heading_normalization() {
        assert_eq!(normalize_heading("Materials and Methods"), "METHODS");
        assert_eq!(normalize_heading("  background "), "INTRODUCTION");
        assert_eq!(normalize_heading("Microgravity Effects"), "Microgravity Effects");
        assert_eq!(normalize_heading(""), "UNLABELED");
    }

    #[test]
    fn test_drops_short_and_boilerplate_sections() {
        let filter = SectionFilter::new(Default::default());
        let sections = vec![
            sec("Introduction", &long_text(30)),
            sec("References", &long_text(200)),
            sec("Results", "too short"),
            sec("Discussion", &long_text(40)),
        ];
        let retained = filter.filter(&sections);
        let headings: Vec<&str> = retained.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["INTRODUCTION", "DISCUSSION"]);
        assert_eq!(retained[0].index, 0);
        assert_eq!(retained[1].index, 1);
    }

    #[test]
    fn test_degenerate_keeps_all() {
        let filter = SectionFilter::new(Default::default());
        let sections = vec![sec("References", "a b c"), sec("", "x y")];
        let retained = filter.filter(&sections);
        assert_eq!(retained.len(), 2);
        assert_eq!(retained[1].heading, "UNLABELED");
    }

    #[test]
    fn test_global_baselines_include_separators() {
        let filter = SectionFilter::new(Default::default());
        let a = long_text(20);
        let b = long_text(25);
        let sections = vec![sec("Intro", &a), sec("Results", &b)];
        let retained = filter.filter(&sections);
        assert_eq!(retained[0].global_start, 0);
        assert_eq!(retained[0].global_end, a.len());
        assert_eq!(retained[1].global_start, a.len() + SECTION_SEPARATOR.len());

        let doc = reconstruct_text(&retained);
        for r in &retained {
            assert_eq!(&doc[r.global_start..r.global_end], r.text);
        }
    }
}
