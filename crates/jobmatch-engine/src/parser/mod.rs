//! Vacancy description parser
//!
//! Turns raw HTML into plain text plus labeled sections
//! (responsibilities / requirements / nice_to_have / conditions / other)
//! with a quality score. The output is versioned: a stored parse whose
//! version differs from [`PARSER_VERSION`] is re-parsed on the next ingest.

mod classifier;
pub mod markers;

pub use classifier::{classify_line, is_section_header, normalize_line, LineClass};

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::strip_html;

/// Current parser version tag, persisted with every parse.
pub const PARSER_VERSION: &str = "hh_sections_v2";

/// Labeled description section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Responsibilities,
    Requirements,
    NiceToHave,
    Conditions,
    Other,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Responsibilities => "responsibilities",
            Self::Requirements => "requirements",
            Self::NiceToHave => "nice_to_have",
            Self::Conditions => "conditions",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered lines of one section plus their joined text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPayload {
    pub lines: Vec<String>,
    pub text: String,
}

impl SectionPayload {
    fn from_lines(lines: Vec<String>) -> Self {
        let text = lines.join("\n");
        Self { lines, text }
    }
}

/// All five sections of a parsed description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSections {
    pub responsibilities: SectionPayload,
    pub requirements: SectionPayload,
    pub nice_to_have: SectionPayload,
    pub conditions: SectionPayload,
    pub other: SectionPayload,
}

impl ParsedSections {
    pub fn section(&self, section: Section) -> &SectionPayload {
        match section {
            Section::Responsibilities => &self.responsibilities,
            Section::Requirements => &self.requirements,
            Section::NiceToHave => &self.nice_to_have,
            Section::Conditions => &self.conditions,
            Section::Other => &self.other,
        }
    }

    fn total_lines(&self) -> usize {
        self.responsibilities.lines.len()
            + self.requirements.lines.len()
            + self.nice_to_have.lines.len()
            + self.conditions.lines.len()
            + self.other.lines.len()
    }
}

/// Full parse result for one vacancy description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDescription {
    pub plain_text: String,
    pub sections: ParsedSections,
    pub quality_score: f64,
    pub version: String,
}

fn bullet_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:[-*•●◦▪▫‣∙]+|\d+[.)]|[a-zа-яё]\)|[ivxlcdm]+\))\s+").unwrap()
    })
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*[:\-–—]\s*").unwrap())
}

fn strip_bullet_prefix(value: &str) -> String {
    let mut cleaned = value.trim().to_string();
    loop {
        let updated = bullet_prefix_re().replace(&cleaned, "").into_owned();
        if updated == cleaned {
            break;
        }
        cleaned = updated.trim().to_string();
    }
    cleaned
}

fn collapse_ws(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn header_section_from_prefix(prefix: &str) -> Option<Section> {
    if let Some(section) = is_section_header(prefix) {
        return Some(section);
    }

    const HEADER_TAILS: &[char] = &[':', '-', '–', '—'];

    let normalized = normalize_line(prefix);
    let normalized = normalized.trim_end_matches(HEADER_TAILS).trim_end();
    if normalized.is_empty() {
        return None;
    }

    for (section, aliases) in markers::SECTION_HEADERS {
        for alias in *aliases {
            let alias_norm = normalize_line(alias);
            if alias_norm.trim_end_matches(HEADER_TAILS).trim_end() == normalized {
                return Some(*section);
            }
        }
    }
    None
}

/// Detect a section header in a line: either the full line is a header alias,
/// or the line begins with an alias followed by `:` or a dash and content.
/// Returns the section and the remainder after the separator.
fn detect_header(line: &str) -> Option<(Section, String)> {
    let cleaned = collapse_ws(line);
    if cleaned.is_empty() {
        return None;
    }

    if let Some(section) = is_section_header(&cleaned) {
        return Some((section, String::new()));
    }

    let separator = separator_re().find(&cleaned)?;
    let prefix = &cleaned[..separator.start()];
    let section = header_section_from_prefix(prefix)?;
    let remainder = cleaned[separator.end()..].to_string();
    Some((section, remainder))
}

/// Parse an HTML description into plain text, sections and a quality score.
pub fn parse_description(html: &str) -> ParsedDescription {
    let plain_text = strip_html(html);

    let mut responsibilities = Vec::new();
    let mut requirements = Vec::new();
    let mut nice_to_have = Vec::new();
    let mut conditions = Vec::new();
    let mut other = Vec::new();

    let mut current = Section::Other;

    for raw_line in plain_text.split('\n') {
        let line = collapse_ws(&strip_bullet_prefix(raw_line));
        if line.is_empty() {
            continue;
        }

        if let Some((section, remainder)) = detect_header(&line) {
            current = section;
            let remainder = collapse_ws(&strip_bullet_prefix(&remainder));
            if !remainder.is_empty() {
                push_line(
                    section,
                    remainder,
                    &mut responsibilities,
                    &mut requirements,
                    &mut nice_to_have,
                    &mut conditions,
                    &mut other,
                );
            }
            continue;
        }

        push_line(
            current,
            line,
            &mut responsibilities,
            &mut requirements,
            &mut nice_to_have,
            &mut conditions,
            &mut other,
        );
    }

    let sections = ParsedSections {
        responsibilities: SectionPayload::from_lines(responsibilities),
        requirements: SectionPayload::from_lines(requirements),
        nice_to_have: SectionPayload::from_lines(nice_to_have),
        conditions: SectionPayload::from_lines(conditions),
        other: SectionPayload::from_lines(other),
    };

    let mut quality_score: f64 = 0.0;
    if sections.requirements.lines.len() >= 3 {
        quality_score += 0.45;
    }
    if !sections.responsibilities.lines.is_empty() {
        quality_score += 0.15;
    }
    if !sections.conditions.lines.is_empty() {
        quality_score += 0.10;
    }
    if plain_text.chars().count() >= 600 {
        quality_score += 0.20;
    }

    let total_lines = sections.total_lines();
    if total_lines >= 8 {
        quality_score += 0.20;
    }

    // All lines falling to `other` is the parser-failure signal.
    if total_lines > 0 && sections.other.lines.len() == total_lines {
        quality_score -= 0.25;
    }

    let quality_score = (quality_score.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0;

    ParsedDescription {
        plain_text,
        sections,
        quality_score,
        version: PARSER_VERSION.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn push_line(
    section: Section,
    line: String,
    responsibilities: &mut Vec<String>,
    requirements: &mut Vec<String>,
    nice_to_have: &mut Vec<String>,
    conditions: &mut Vec<String>,
    other: &mut Vec<String>,
) {
    match section {
        Section::Responsibilities => responsibilities.push(line),
        Section::Requirements => requirements.push(line),
        Section::NiceToHave => nice_to_have.push(line),
        Section::Conditions => conditions.push(line),
        Section::Other => other.push(line),
    }
}
