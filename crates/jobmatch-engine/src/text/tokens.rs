//! Tokenizer that keeps technical skill names intact
//!
//! A plain word tokenizer destroys `c++`, `c#`, `node.js` and
//! `django-rest-framework`. The pattern below keeps `+ # . -` glued to their
//! surrounding word characters, so alias matching can compare full token
//! sequences.

use std::sync::OnceLock;

use regex::Regex;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\W_]+(?:[.+#-][^\W_]+|[+#]+)*").unwrap())
}

/// Tokenize text for technical skill matching, lowercasing every token.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    token_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Normalize a skill to its lowercased tokens joined by single spaces.
pub fn normalize_skill(text: &str) -> String {
    tokenize(text).join(" ")
}
