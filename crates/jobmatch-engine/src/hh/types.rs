//! Wire types for the job-board API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    // The API serves ids as strings, but older payloads carry numbers.
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// `{id, name}` pair used for areas, employers, schedules etc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HhNamed {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Salary fork of a vacancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HhSalary {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub currency: Option<String>,
}

/// Search snippet shown in list results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HhSnippet {
    pub requirement: Option<String>,
    pub responsibility: Option<String>,
}

/// Key skill attached to vacancy details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HhKeySkill {
    pub name: String,
}

/// One vacancy item, from either the search list or the details endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HhVacancy {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub employer: Option<HhNamed>,
    #[serde(default)]
    pub area: Option<HhNamed>,
    #[serde(default)]
    pub salary: Option<HhSalary>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub alternate_url: Option<String>,
    #[serde(default)]
    pub snippet: Option<HhSnippet>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub key_skills: Option<Vec<HhKeySkill>>,
    #[serde(default)]
    pub schedule: Option<HhNamed>,
    #[serde(default)]
    pub experience: Option<HhNamed>,
    #[serde(default)]
    pub employment: Option<HhNamed>,
}

impl HhVacancy {
    /// Merge details-endpoint fields into a search-list item. Fields already
    /// present on the list item are only replaced when details carry a value.
    pub fn merge_details(&mut self, details: HhVacancy) {
        if details.description.is_some() {
            self.description = details.description;
        }
        if details.key_skills.is_some() {
            self.key_skills = details.key_skills;
        }
        if details.schedule.is_some() {
            self.schedule = details.schedule;
        }
        if details.experience.is_some() {
            self.experience = details.experience;
        }
        if details.employment.is_some() {
            self.employment = details.employment;
        }
        if details.salary.is_some() {
            self.salary = details.salary;
        }
        if details.published_at.is_some() {
            self.published_at = details.published_at;
        }
    }

    /// Description to ingest: details description, or the joined snippet.
    pub fn effective_description(&self) -> Option<String> {
        if let Some(description) = &self.description {
            if !description.is_empty() {
                return Some(description.clone());
            }
        }
        let snippet = self.snippet.as_ref()?;
        let parts: Vec<&str> = [snippet.requirement.as_deref(), snippet.responsibility.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Key skill names, if details were fetched.
    pub fn key_skill_names(&self) -> Vec<String> {
        self.key_skills
            .as_ref()
            .map(|skills| skills.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchPage {
    pub items: Vec<HhVacancy>,
    pub found: Option<i64>,
    pub pages: Option<u32>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Search parameters, including passthrough filter options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub area: Option<String>,
    pub schedule: Option<String>,
    pub experience: Option<String>,
    pub salary: Option<i64>,
    pub currency: Option<String>,
    pub page: u32,
    pub per_page: u32,
    pub clusters: bool,
    /// Recognized passthrough options (str | int | bool | list | null);
    /// lists are encoded as repeated query keys.
    pub extra: serde_json::Map<String, Value>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            area: None,
            schedule: None,
            experience: None,
            salary: None,
            currency: None,
            page: 0,
            per_page: 20,
            clusters: false,
            extra: serde_json::Map::new(),
        }
    }
}

impl SearchQuery {
    /// Encode into query pairs; list values repeat the key.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("text".to_string(), self.text.clone()),
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
        ];

        if let Some(area) = &self.area {
            params.push(("area".to_string(), area.clone()));
        }
        if let Some(schedule) = &self.schedule {
            params.push(("schedule".to_string(), schedule.clone()));
        }
        if let Some(experience) = &self.experience {
            params.push(("experience".to_string(), experience.clone()));
        }
        if let Some(salary) = self.salary {
            params.push(("salary".to_string(), salary.to_string()));
        }
        if let Some(currency) = &self.currency {
            params.push(("currency".to_string(), currency.clone()));
        }
        if self.clusters {
            params.push(("clusters".to_string(), "true".to_string()));
        }

        for (key, value) in &self.extra {
            push_extra_param(&mut params, key, value);
        }

        params
    }
}

fn push_extra_param(params: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => params.push((key.to_string(), s.clone())),
        Value::Number(n) => params.push((key.to_string(), n.to_string())),
        Value::Bool(b) => params.push((key.to_string(), b.to_string())),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => params.push((key.to_string(), s.clone())),
                    Value::Number(n) => params.push((key.to_string(), n.to_string())),
                    _ => {}
                }
            }
        }
        Value::Object(_) => {}
    }
}

/// Parse a job-board timestamp: RFC 3339 or the board's `+0300`-style offset.
pub fn parse_published_at(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
