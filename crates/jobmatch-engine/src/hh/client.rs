//! Polite HTTP client for the job-board API
//!
//! Retry policy: up to 5 attempts; `2^attempt` seconds on 5xx; 429 honors
//! `Retry-After` (integer seconds or an HTTP date) with the same exponential
//! fallback; any other 4xx surfaces immediately as [`HhApiError::Status`].
//! A uniform 200-500 ms polite delay separates successive page fetches
//! inside one task.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{HhVacancy, SearchPage, SearchQuery};
use crate::config::HhSettings;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_RETRIES: u32 = 5;
const MIN_POLITE_DELAY_MS: u64 = 200;
const MAX_POLITE_DELAY_MS: u64 = 500;
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Error, Debug)]
pub enum HhApiError {
    #[error("HH API returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("HH API request failed after {attempts} attempts: {url}")]
    RetriesExhausted { attempts: u32, url: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid HH API configuration: {0}")]
    Config(String),
}

/// Client for the job-board API. One instance per ingestion task.
#[derive(Debug)]
pub struct HhClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HhClient {
    /// Build a client from settings. Fails fast when no user agent is set:
    /// the board rejects anonymous crawlers and so do we.
    pub fn new(settings: &HhSettings) -> Result<Self, HhApiError> {
        let user_agent = settings.user_agent.as_deref().ok_or_else(|| {
            HhApiError::Config("HH_USER_AGENT environment variable is required".to_string())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|_| HhApiError::Config("HH_USER_AGENT contains invalid characters".to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    /// Search one page of vacancies.
    pub async fn search_vacancies(&self, query: &SearchQuery) -> Result<SearchPage, HhApiError> {
        self.get_json("/vacancies", &query.to_params()).await
    }

    /// Fetch full details for one vacancy.
    pub async fn vacancy_details(&self, external_id: &str) -> Result<HhVacancy, HhApiError> {
        self.get_json(&format!("/vacancies/{external_id}"), &[]).await
    }

    /// Uniform random sleep between successive API requests.
    pub async fn polite_delay(&self) {
        let millis = rand::thread_rng().gen_range(MIN_POLITE_DELAY_MS..=MAX_POLITE_DELAY_MS);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, HhApiError> {
        let url = format!("{}{}", self.base_url, path);

        for attempt in 0..self.max_retries {
            let response = self.http.get(&url).query(params).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json::<T>().await?);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after_seconds(response.headers())
                    .unwrap_or_else(|| 2u64.pow(attempt) as f64);
                if attempt == self.max_retries - 1 {
                    break;
                }
                warn!(url = %url, attempt, wait_s = wait, "HH API rate limited, backing off");
                tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                continue;
            }

            if status.is_server_error() {
                if attempt == self.max_retries - 1 {
                    break;
                }
                let wait = 2u64.pow(attempt);
                debug!(url = %url, attempt, status = status.as_u16(), wait_s = wait, "HH API server error, retrying");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_LIMIT)
                .collect();
            return Err(HhApiError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        Err(HhApiError::RetriesExhausted {
            attempts: self.max_retries,
            url,
        })
    }
}

/// Parse `Retry-After`: integer seconds or an HTTP date.
fn retry_after_seconds(headers: &HeaderMap) -> Option<f64> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;

    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(seconds as f64);
    }

    let when: DateTime<Utc> = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let wait = (when - Utc::now()).num_milliseconds() as f64 / 1000.0;
    Some(wait.max(0.0))
}
