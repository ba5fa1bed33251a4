//! Marker tables for section headers and line classification
//!
//! Vacancy descriptions on the board are free-form Russian (with occasional
//! English) text, so the tables mix both. Matching is always done on
//! lowercased, whitespace-collapsed lines.

use std::sync::OnceLock;

use regex::Regex;

use super::Section;

/// Header aliases per section. A line equal to an alias (ignoring case and a
/// trailing `:`/dash) or starting with one followed by a separator opens that
/// section.
pub const SECTION_HEADERS: &[(Section, &[&str])] = &[
    (
        Section::Responsibilities,
        &[
            "обязанности",
            "ваши обязанности",
            "задачи",
            "ваши задачи",
            "чем предстоит заниматься",
            "что предстоит делать",
            "чем предстоит",
            "responsibilities",
            "what you will do",
        ],
    ),
    (
        Section::Requirements,
        &[
            "требования",
            "наши ожидания",
            "мы ожидаем",
            "ожидания от кандидата",
            "что мы ждем",
            "что мы ждём",
            "необходимые навыки",
            "requirements",
            "what we expect",
            "qualifications",
        ],
    ),
    (
        Section::NiceToHave,
        &[
            "будет плюсом",
            "плюсом будет",
            "дополнительным плюсом будет",
            "желательно",
            "nice to have",
            "will be a plus",
        ],
    ),
    (
        Section::Conditions,
        &[
            "условия",
            "условия работы",
            "мы предлагаем",
            "что мы предлагаем",
            "what we offer",
            "benefits",
        ],
    ),
];

/// Substrings that mark a line as a nice-to-have requirement.
pub const NICE_MARKERS: &[&str] = &[
    "будет плюсом",
    "плюсом будет",
    "желательно",
    "как плюс",
    "будет преимуществом",
    "nice to have",
    "is a plus",
    "will be a plus",
];

/// Substrings that mark a line as a hard requirement.
pub const MUST_MARKERS: &[&str] = &[
    "обязательно",
    "обязателен",
    "обязательна",
    "необходимо",
    "необходим",
    "требуется",
    "required",
    "must have",
];

/// Prefixes of lines that read like a requirement even without markers.
pub const STARTS_LIKE_REQUIREMENT: &[&str] = &[
    "опыт",
    "знание",
    "знания",
    "умение",
    "навык",
    "владение",
    "понимание",
    "уверенное",
    "уверенный",
    "experience",
    "knowledge",
    "proficiency",
];

/// Work-format statements ("только офис") that read as must-marked lines but
/// carry no skill requirement; the classifier demotes them to `other`.
pub fn only_format_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"только\s+офис",
            r"только\s+в\s+офисе",
            r"офис\s+только",
            r"только\s+очно",
            r"только\s+гибрид",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Phrases that neutralize a relocation marker found in a description.
pub fn not_relocation_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"без\s+релокации",
            r"релокация\s+не\s+требуется",
            r"релокация\s+не\s+нужна",
            r"переезд\s+не\s+требуется",
            r"не\s+требуется\s+переезд",
            r"no\s+relocation",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Substrings that signal the vacancy demands relocation.
pub const RELOCATION_MARKERS: &[&str] = &[
    "релокац",
    "переезд в",
    "готовность к переезду",
    "обязателен переезд",
    "relocation",
];

/// Substrings that mark a vacancy as remote-friendly.
pub const REMOTE_MARKERS: &[&str] = &["удален", "remote", "дистанцион"];
