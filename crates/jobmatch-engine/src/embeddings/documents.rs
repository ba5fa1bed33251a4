//! Embedding document composition
//!
//! The text fed to the provider, not the raw entity, defines the vector
//! space. Both builders are deterministic; the profile document is the terse
//! variant (title + resume + skills) and must stay stable per `model_name`.

use crate::text::strip_html;

/// Upper bound on document length fed to a provider.
pub const MAX_DOCUMENT_CHARS: usize = 10_000;

fn looks_like_html(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    text.chars().take(max_chars).collect()
}

/// Compose the embedding document for a vacancy.
///
/// Prefers the stored parsed plain text; falls back to cleaning the raw
/// description. Key skills are appended as a labeled line.
pub fn build_vacancy_document(
    title: &str,
    description: Option<&str>,
    plain_text: Option<&str>,
    key_skills: &[String],
) -> String {
    let body = match plain_text {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            let description = description.unwrap_or_default();
            if looks_like_html(description) {
                strip_html(description)
            } else {
                description.to_string()
            }
        }
    };

    let mut parts: Vec<String> = Vec::new();
    if !title.is_empty() {
        parts.push(title.to_string());
    }
    if !body.is_empty() {
        parts.push(body);
    }
    if !key_skills.is_empty() {
        parts.push(format!("Ключевые навыки: {}", key_skills.join(", ")));
    }

    truncate_chars(parts.join("\n\n"), MAX_DOCUMENT_CHARS)
}

/// Compose the embedding document for a profile (terse variant).
pub fn build_profile_document(
    title: Option<&str>,
    resume_text: &str,
    skills_text: Option<&str>,
) -> String {
    let parts: Vec<&str> = [title.unwrap_or_default(), resume_text, skills_text.unwrap_or_default()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();

    truncate_chars(parts.join("\n\n"), MAX_DOCUMENT_CHARS)
}
