//! Requirement extraction from parsed vacancy descriptions
//!
//! Turns labeled sections into a deduplicated set of skill and constraint
//! requirements. Skills come from token-aware alias matching on classified
//! lines; constraints come from the structured fields of a job-board item.

mod aliases;

pub use aliases::SKILL_ALIASES;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::parser::{classify_line, markers::STARTS_LIKE_REQUIREMENT, LineClass, ParsedSections, Section};
use crate::text::{normalize_skill, tokenize};

/// Requirement kind stored alongside every extracted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    Skill,
    Constraint,
}

impl RequirementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Constraint => "constraint",
        }
    }
}

impl std::fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequirementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skill" => Ok(Self::Skill),
            "constraint" => Ok(Self::Constraint),
            other => Err(format!("unknown requirement kind: {other}")),
        }
    }
}

/// One extracted requirement, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRequirement {
    pub kind: RequirementKind,
    pub raw_text: String,
    pub normalized_key: String,
    pub is_hard: bool,
    pub weight: i64,
    pub source: String,
}

/// Markers that make a constraint hard when present in the description.
const HARD_MARKERS: &[&str] = &["обязательно", "необходимо", "требуется"];

/// Minimum distinct requirements before the `other` fallback kicks in.
const MIN_SECTION_REQUIREMENTS: usize = 3;

fn contains_token_sequence(tokens: &[String], sequence: &[String]) -> bool {
    if tokens.is_empty() || sequence.is_empty() || sequence.len() > tokens.len() {
        return false;
    }
    tokens.windows(sequence.len()).any(|window| window == sequence)
}

fn extract_skills_from_text(text: &str, is_hard: bool) -> Vec<ExtractedRequirement> {
    let line_tokens = tokenize(text);
    if line_tokens.is_empty() {
        return Vec::new();
    }

    let mut requirements = Vec::new();
    for (raw_text, alias_list) in SKILL_ALIASES {
        let matched = alias_list.iter().any(|alias| {
            let alias_tokens = tokenize(alias);
            contains_token_sequence(&line_tokens, &alias_tokens)
        });

        if matched {
            requirements.push(ExtractedRequirement {
                kind: RequirementKind::Skill,
                raw_text: (*raw_text).to_string(),
                normalized_key: normalize_skill(raw_text),
                is_hard,
                weight: if is_hard { 3 } else { 1 },
                source: String::new(),
            });
        }
    }
    requirements
}

fn starts_like_requirement(line: &str) -> bool {
    let normalized = line.to_lowercase();
    let normalized = normalized.trim();
    STARTS_LIKE_REQUIREMENT
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
}

fn section_source(section: Section, class: LineClass) -> &'static str {
    if section == Section::Requirements && class == LineClass::Must {
        return "text_requirements";
    }
    if class == LineClass::Nice {
        return "text_plus";
    }
    "text_other_fallback"
}

/// Deduplicating accumulator: on a key collision, `must` beats `nice`.
#[derive(Default)]
struct Dedup {
    entries: HashMap<String, ExtractedRequirement>,
    order: Vec<String>,
}

impl Dedup {
    fn upsert(&mut self, requirement: ExtractedRequirement) {
        let key = if requirement.normalized_key.is_empty() {
            requirement.raw_text.clone()
        } else {
            requirement.normalized_key.clone()
        };

        match self.entries.get(&key) {
            None => {
                self.order.push(key.clone());
                self.entries.insert(key, requirement);
            }
            Some(existing) => {
                if requirement.is_hard && !existing.is_hard {
                    self.entries.insert(key, requirement);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn into_vec(mut self) -> Vec<ExtractedRequirement> {
        self.order
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }
}

/// Extract skill requirements from parsed sections.
///
/// Processes `requirements` and `nice_to_have` lines through the line
/// classifier; if fewer than three distinct requirements emerge, `other`
/// lines that classify as must/nice or start like a requirement are scanned
/// as non-hard, weight-1 fallback entries.
pub fn extract_from_sections(sections: &ParsedSections) -> Vec<ExtractedRequirement> {
    let mut deduped = Dedup::default();

    for section in [Section::Requirements, Section::NiceToHave] {
        for line in &sections.section(section).lines {
            let class = classify_line(line, Some(section));
            if class == LineClass::Other {
                continue;
            }

            let is_hard = class == LineClass::Must;
            let source = section_source(section, class);
            for mut requirement in extract_skills_from_text(line, is_hard) {
                requirement.weight = match class {
                    LineClass::Must => 3,
                    LineClass::Nice => 1,
                    LineClass::Other => 0,
                };
                requirement.source = source.to_string();
                deduped.upsert(requirement);
            }
        }
    }

    if deduped.len() < MIN_SECTION_REQUIREMENTS {
        for line in &sections.other.lines {
            let class = classify_line(line, Some(Section::Other));
            let should_add =
                matches!(class, LineClass::Must | LineClass::Nice) || starts_like_requirement(line);
            if !should_add {
                continue;
            }

            for mut requirement in extract_skills_from_text(line, false) {
                requirement.is_hard = false;
                requirement.weight = 1;
                requirement.source = "text_other_fallback".to_string();
                deduped.upsert(requirement);
            }
        }
    }

    deduped.into_vec()
}

/// Fallback extraction straight from plain text, when no parse exists.
///
/// Lines carrying a hard marker produce hard entries; everything else is
/// nice. Dedup keeps the hard variant.
pub fn extract_from_text(plain_text: &str) -> Vec<ExtractedRequirement> {
    let mut deduped = Dedup::default();

    for line in plain_text.split('\n') {
        let normalized = line.to_lowercase();
        if normalized.trim().is_empty() {
            continue;
        }

        let is_hard = HARD_MARKERS.iter().any(|marker| normalized.contains(marker));
        for mut requirement in extract_skills_from_text(line, is_hard) {
            requirement.source = "text_fallback".to_string();
            deduped.upsert(requirement);
        }
    }

    deduped.into_vec()
}

/// Extract constraint requirements from an item's structured fields.
///
/// Each present field becomes a `constraint` entry `"{field}: {value}"` with
/// normalized key `"{field}:{tokens}"`. Constraints are hard when the
/// description carries any of the hard markers.
pub fn extract_constraints(
    fields: &[(&str, Option<&str>)],
    description_text: &str,
) -> Vec<ExtractedRequirement> {
    let description = description_text.to_lowercase();
    let is_hard = HARD_MARKERS.iter().any(|marker| description.contains(marker));

    fields
        .iter()
        .filter_map(|(field, value)| {
            let raw = (*value)?.trim();
            if raw.is_empty() {
                return None;
            }
            Some(ExtractedRequirement {
                kind: RequirementKind::Constraint,
                raw_text: format!("{field}: {raw}"),
                normalized_key: format!("{field}:{}", normalize_skill(raw)),
                is_hard,
                weight: if is_hard { 3 } else { 1 },
                source: "structured_fields".to_string(),
            })
        })
        .collect()
}

/// Merge skill and constraint sets, deduplicating by (kind, normalized_key)
/// with `must` beating `nice` on collision.
pub fn merge_requirements(
    groups: Vec<Vec<ExtractedRequirement>>,
) -> Vec<ExtractedRequirement> {
    let mut entries: HashMap<(RequirementKind, String), ExtractedRequirement> = HashMap::new();
    let mut order: Vec<(RequirementKind, String)> = Vec::new();

    for requirement in groups.into_iter().flatten() {
        let key = (requirement.kind, requirement.normalized_key.clone());
        match entries.get(&key) {
            None => {
                order.push(key.clone());
                entries.insert(key, requirement);
            }
            Some(existing) => {
                if requirement.is_hard && !existing.is_hard {
                    entries.insert(key, requirement);
                }
            }
        }
    }

    order.iter().filter_map(|key| entries.remove(key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_description;

    fn parsed(html: &str) -> ParsedSections {
        parse_description(html).sections
    }

    #[test]
    fn test_requirements_section_yields_hard_skills() {
        let sections =
            parsed("<p>Требования:</p><ul><li>Опыт работы с PostgreSQL от 3 лет</li></ul>");
        let requirements = extract_from_sections(&sections);

        let postgres = requirements
            .iter()
            .find(|r| r.raw_text == "PostgreSQL")
            .expect("PostgreSQL extracted");
        assert!(postgres.is_hard);
        assert_eq!(postgres.weight, 3);
        assert_eq!(postgres.source, "text_requirements");
    }

    #[test]
    fn test_nice_marker_yields_nice_skill() {
        let sections = parsed("<p>Требования:</p><ul><li>Будет плюсом Kafka</li></ul>");
        let requirements = extract_from_sections(&sections);

        let kafka = requirements
            .iter()
            .find(|r| r.raw_text == "Kafka")
            .expect("Kafka extracted");
        assert!(!kafka.is_hard);
        assert_eq!(kafka.weight, 1);
        assert_eq!(kafka.source, "text_plus");
    }

    #[test]
    fn test_alias_token_matching() {
        let sections = parsed("<p>Требования:</p><ul><li>Работа с k8s и docker-compose</li></ul>");
        let requirements = extract_from_sections(&sections);
        let names: Vec<&str> = requirements.iter().map(|r| r.raw_text.as_str()).collect();
        assert!(names.contains(&"Kubernetes"));
        assert!(names.contains(&"Docker Compose"));
    }

    #[test]
    fn test_must_beats_nice_on_dedup() {
        let sections = parsed(
            "<p>Требования:</p><ul><li>Глубокое знание Python</li></ul>\
             <p>Будет плюсом:</p><ul><li>Python для скриптов</li></ul>",
        );
        let requirements = extract_from_sections(&sections);
        let python: Vec<_> = requirements.iter().filter(|r| r.raw_text == "Python").collect();
        assert_eq!(python.len(), 1);
        assert!(python[0].is_hard);
    }

    #[test]
    fn test_other_fallback_below_three_requirements() {
        // No requirements section at all; lines land in `other`.
        let sections = parsed(
            "<p>Опыт работы с Python обязателен</p><p>Знание Docker приветствуется</p>",
        );
        let requirements = extract_from_sections(&sections);

        assert!(!requirements.is_empty());
        for requirement in &requirements {
            assert!(!requirement.is_hard);
            assert_eq!(requirement.weight, 1);
            assert_eq!(requirement.source, "text_other_fallback");
        }
    }

    #[test]
    fn test_no_fallback_when_sections_are_rich() {
        let sections = parsed(
            "<p>Требования:</p><ul><li>Python</li><li>PostgreSQL</li><li>Docker</li></ul>\
             <p>Kafka упоминается вне разделов</p>",
        );
        let requirements = extract_from_sections(&sections);
        assert!(requirements.iter().all(|r| r.raw_text != "Kafka"));
    }

    #[test]
    fn test_extract_from_text_hardness() {
        let requirements =
            extract_from_text("Обязательно знание Python\nKafka будет кстати");
        let python = requirements.iter().find(|r| r.raw_text == "Python").unwrap();
        let kafka = requirements.iter().find(|r| r.raw_text == "Kafka").unwrap();
        assert!(python.is_hard);
        assert!(!kafka.is_hard);
    }

    #[test]
    fn test_constraints_from_structured_fields() {
        let constraints = extract_constraints(
            &[
                ("experience", Some("От 3 до 6 лет")),
                ("schedule", Some("Удаленная работа")),
                ("employment", None),
            ],
            "для этой роли обязательно знание предметной области",
        );

        assert_eq!(constraints.len(), 2);
        let experience = &constraints[0];
        assert_eq!(experience.kind, RequirementKind::Constraint);
        assert_eq!(experience.raw_text, "experience: От 3 до 6 лет");
        assert_eq!(experience.normalized_key, "experience:от 3 до 6 лет");
        assert!(experience.is_hard);
        assert_eq!(experience.weight, 3);
    }

    #[test]
    fn test_constraints_soft_without_markers() {
        let constraints =
            extract_constraints(&[("schedule", Some("Гибкий график"))], "обычное описание");
        assert!(!constraints[0].is_hard);
        assert_eq!(constraints[0].weight, 1);
    }

    #[test]
    fn test_merge_dedup_across_kinds() {
        let skills = vec![ExtractedRequirement {
            kind: RequirementKind::Skill,
            raw_text: "Python".to_string(),
            normalized_key: "python".to_string(),
            is_hard: false,
            weight: 1,
            source: "text_plus".to_string(),
        }];
        let more_skills = vec![ExtractedRequirement {
            kind: RequirementKind::Skill,
            raw_text: "Python".to_string(),
            normalized_key: "python".to_string(),
            is_hard: true,
            weight: 3,
            source: "text_requirements".to_string(),
        }];

        let merged = merge_requirements(vec![skills, more_skills]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_hard);
    }
}
