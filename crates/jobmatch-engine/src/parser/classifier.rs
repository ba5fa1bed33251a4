//! Line-level classification for requirement extraction
//!
//! The rule order is load-bearing: the `nice_to_have` section wins before any
//! line marker, a nice-marker inside `requirements` still downgrades that one
//! line, and a "только офис"-style statement overrides must-markers.

use super::markers::{
    only_format_patterns, MUST_MARKERS, NICE_MARKERS, SECTION_HEADERS, STARTS_LIKE_REQUIREMENT,
};
use super::Section;

/// Classification outcome for a single description line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Must,
    Nice,
    Other,
}

/// Collapse whitespace and lowercase for marker matching.
pub fn normalize_line(line: &str) -> String {
    line.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_any(line: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| line.contains(marker))
}

/// Return the section for a header-like line, if the whole line is an alias.
pub fn is_section_header(line: &str) -> Option<Section> {
    let normalized = normalize_line(line);
    let normalized = normalized.trim_end_matches(':');
    if normalized.is_empty() {
        return None;
    }

    for (section, aliases) in SECTION_HEADERS {
        for alias in *aliases {
            let alias_norm = normalize_line(alias);
            if normalized == alias_norm.trim_end_matches(':') {
                return Some(*section);
            }
        }
    }
    None
}

/// Classify a vacancy line as must/nice/other according to priority rules.
pub fn classify_line(line: &str, current_section: Option<Section>) -> LineClass {
    let normalized = normalize_line(line);
    if normalized.is_empty() {
        return LineClass::Other;
    }

    if current_section == Some(Section::NiceToHave) {
        return LineClass::Nice;
    }

    if current_section == Some(Section::Requirements) {
        if contains_any(&normalized, NICE_MARKERS) {
            return LineClass::Nice;
        }
        return LineClass::Must;
    }

    if contains_any(&normalized, NICE_MARKERS) {
        return LineClass::Nice;
    }

    if contains_any(&normalized, MUST_MARKERS) {
        if normalized.contains("только")
            && only_format_patterns().iter().any(|p| p.is_match(&normalized))
        {
            return LineClass::Other;
        }
        return LineClass::Must;
    }

    if STARTS_LIKE_REQUIREMENT
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
    {
        return LineClass::Must;
    }

    LineClass::Other
}
