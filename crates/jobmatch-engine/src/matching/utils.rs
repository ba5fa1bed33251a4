//! Token and evidence helpers for the matcher

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::text::{normalize_skill, tokenize};

/// Alias graph; every group is expanded bidirectionally.
const ALIAS_GROUPS: &[&[&str]] = &[
    &["react", "reactjs"],
    &["postgres", "postgresql"],
    &["node", "node.js", "nodejs"],
    &["javascript", "js"],
    &["typescript", "ts"],
    &["drf", "django rest framework", "django-rest-framework"],
    &["oop", "ооп"],
    &["docker compose", "docker-compose"],
    &["grpc"],
];

fn alias_map() -> &'static HashMap<String, HashSet<String>> {
    static MAP: OnceLock<HashMap<String, HashSet<String>>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for group in ALIAS_GROUPS {
            let normalized: HashSet<String> = group
                .iter()
                .map(|alias| normalize_skill(alias))
                .filter(|alias| !alias.is_empty())
                .collect();
            for alias in &normalized {
                map.insert(alias.clone(), normalized.clone());
            }
        }
        map
    })
}

/// True when every requirement token is present as a full token.
pub fn contains_token(tokens: &HashSet<String>, term_tokens: &[String]) -> bool {
    if tokens.is_empty() || term_tokens.is_empty() {
        return false;
    }
    term_tokens.iter().all(|token| tokens.contains(token))
}

/// Normalized token set of a profile text.
pub fn extract_profile_tokens(profile_text: &str) -> HashSet<String> {
    tokenize(profile_text).into_iter().collect()
}

/// Known aliases for a term (normalized), including the term itself.
pub fn aliases_for_term(term: &str) -> HashSet<String> {
    let normalized = normalize_skill(term);
    if normalized.is_empty() {
        return HashSet::new();
    }
    alias_map()
        .get(&normalized)
        .cloned()
        .unwrap_or_else(|| HashSet::from([normalized]))
}

/// Partial or alias-only hits that fall short of a full-term match.
pub fn has_uncertain_match(tokens: &HashSet<String>, normalized_term: &str) -> bool {
    if normalized_term.is_empty() {
        return false;
    }

    let term_tokens = tokenize(normalized_term);
    if contains_token(tokens, &term_tokens) {
        return false;
    }

    for alias in aliases_for_term(normalized_term) {
        let alias_tokens = tokenize(&alias);
        if contains_token(tokens, &alias_tokens) {
            return true;
        }
        if alias_tokens.iter().any(|token| tokens.contains(token)) {
            return true;
        }
    }

    term_tokens.iter().any(|token| tokens.contains(token))
}

/// Term pattern with explicit boundaries. `\b` misfires on terms ending in
/// `+` or `#`, so boundaries are modeled as non-word-or-edge around a
/// capture group.
fn term_pattern(normalized_term: &str) -> Option<Regex> {
    let escaped = regex::escape(normalized_term).replace(' ', r"\s+");
    Regex::new(&format!(r"(?i)(?:^|[^\w])({escaped})(?:[^\w]|$)")).ok()
}

fn find_term_span(text: &str, normalized_term: &str) -> Option<(usize, usize)> {
    let pattern = term_pattern(normalized_term)?;
    let captures = pattern.captures(text)?;
    let group = captures.get(1)?;
    Some((group.start(), group.end()))
}

fn build_snippet(text: &str, start_byte: usize, end_byte: usize, window: usize) -> String {
    if window == 0 {
        return text[start_byte..end_byte].to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let start = text[..start_byte].chars().count();
    let end = start + text[start_byte..end_byte].chars().count();

    let center = (start + end) / 2;
    let half = window / 2;
    let left = center.saturating_sub(half);
    let right = (center + half).min(chars.len());

    let mut snippet: String = chars[left..right].iter().collect();
    snippet = snippet.trim().to_string();
    if left > 0 {
        snippet = format!("...{snippet}");
    }
    if right < chars.len() {
        snippet = format!("{snippet}...");
    }
    snippet
}

/// Default evidence window, in characters.
pub const SNIPPET_WINDOW: usize = 180;

/// Find an evidence snippet for a term: exact whole-term match first
/// (confidence 1.0), then alias fallback (confidence 0.8).
pub fn find_evidence_snippet(
    haystack: &str,
    needle: &str,
    window: usize,
) -> Option<(String, f64)> {
    if haystack.is_empty() || needle.is_empty() {
        return None;
    }

    let normalized_needle = normalize_skill(needle);
    if normalized_needle.is_empty() {
        return None;
    }

    // Whole-term match first prevents Git -> GitHub false positives.
    if let Some((start, end)) = find_term_span(haystack, &normalized_needle) {
        return Some((build_snippet(haystack, start, end, window), 1.0));
    }

    for alias in aliases_for_term(&normalized_needle) {
        if alias == normalized_needle {
            continue;
        }
        if let Some((start, end)) = find_term_span(haystack, &alias) {
            return Some((build_snippet(haystack, start, end, window), 0.8));
        }
    }

    None
}

/// Deduplicate preserving first-seen order.
pub fn unique(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_token() {
        let tokens = extract_profile_tokens("Опыт с Python и node.js");
        assert!(contains_token(&tokens, &tokenize("python")));
        assert!(contains_token(&tokens, &tokenize("node.js")));
        assert!(!contains_token(&tokens, &tokenize("kafka")));
        assert!(!contains_token(&tokens, &[]));
    }

    #[test]
    fn test_aliases_bidirectional() {
        let aliases = aliases_for_term("ReactJS");
        assert!(aliases.contains("react"));
        assert!(aliases.contains("reactjs"));

        let aliases = aliases_for_term("Node");
        assert!(aliases.contains("node.js"));
        assert!(aliases.contains("nodejs"));
    }

    #[test]
    fn test_unknown_term_aliases_to_itself() {
        let aliases = aliases_for_term("Erlang");
        assert_eq!(aliases, HashSet::from(["erlang".to_string()]));
    }

    #[test]
    fn test_uncertain_match_on_alias() {
        let tokens = extract_profile_tokens("пишу на React");
        // "reactjs" is not a full-token hit, but its alias "react" is.
        assert!(has_uncertain_match(&tokens, "reactjs"));
        // A full match is not uncertain.
        assert!(!has_uncertain_match(&tokens, "react"));
        // Nothing related at all.
        assert!(!has_uncertain_match(&tokens, "kafka"));
    }

    #[test]
    fn test_exact_snippet_confidence() {
        let haystack = "Пять лет пишу на Node.js и люблю это";
        let (snippet, confidence) = find_evidence_snippet(haystack, "node.js", SNIPPET_WINDOW).unwrap();
        assert_eq!(confidence, 1.0);
        assert!(snippet.contains("Node.js"));
    }

    #[test]
    fn test_alias_snippet_confidence() {
        let haystack = "Три года опыта с React в продакшене";
        let (snippet, confidence) = find_evidence_snippet(haystack, "reactjs", SNIPPET_WINDOW).unwrap();
        assert_eq!(confidence, 0.8);
        assert!(snippet.contains("React"));
    }

    #[test]
    fn test_git_does_not_match_github() {
        assert!(find_evidence_snippet("профиль на GitHub", "git", SNIPPET_WINDOW).is_none());
        assert!(find_evidence_snippet("использую git каждый день", "git", SNIPPET_WINDOW).is_some());
    }

    #[test]
    fn test_snippet_window_and_ellipsis() {
        let padding = "а ".repeat(300);
        let haystack = format!("{padding}ключевое слово Python здесь{padding}");
        let (snippet, _) = find_evidence_snippet(&haystack, "python", SNIPPET_WINDOW).unwrap();
        assert!(snippet.chars().count() <= SNIPPET_WINDOW + 6);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("Python"));
    }

    #[test]
    fn test_snippet_handles_multibyte_text() {
        let haystack = "Разработчик со знанием Django и пятилетним опытом";
        let (snippet, confidence) = find_evidence_snippet(haystack, "django", 20).unwrap();
        assert_eq!(confidence, 1.0);
        assert!(snippet.contains("Django"));
    }

    #[test]
    fn test_unique_preserves_order() {
        let values = vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ];
        assert_eq!(unique(values), vec!["b", "a", "c"]);
    }
}
