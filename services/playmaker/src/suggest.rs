//!
//! src/suggest.rs  Oct 2nd, 2026
//!
//! Chat completion backed suggestion source. Builds the prompts, strips
//! markdown the model wraps around its JSON and normalizes descriptors
//!

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{RetryConfig, FALLBACK_TITLE};
use crate::errors::ProviderError;
use crate::fetch::{http_with_retry, OpenAiClient};
use crate::provider::SuggestionSource;
use crate::types::{CandidateDescriptor, RawDescriptor};

const SUGGEST_SYSTEM: &str = "You are a music expert who creates curated playlists. \
Always respond with valid JSON only - no markdown formatting, no backticks, no code blocks. \
Return raw JSON that can be parsed directly.";

const TITLE_SYSTEM: &str = "You are a creative playlist curator. \
Generate catchy, short playlist titles.";

/// Excluded pairs are capped so the prompt stays small
const MAX_EXCLUSIONS_IN_PROMPT: usize = 60;

pub fn suggestion_prompt(query: &str, count: usize, exclude: &[(String, String)]) -> String {
    let mut prompt = format!(
        "Based on the user query: \"{query}\"\n\n\
         Generate a list of {count} song suggestions that match this request.\n\
         Return the response as a JSON array with each song having \"track_name\", \
         \"artist\", \"album\" and \"release_year\" fields.\n\
         Focus on well-known tracks that are likely to be available on Spotify.\n\n\
         Example format:\n\
         [\n  {{\"track_name\": \"Song Name\", \"artist\": \"Artist Name\", \
         \"album\": \"Album Name\", \"release_year\": \"1984\"}}\n]\n"
    );
    if !exclude.is_empty() {
        prompt.push_str("\nDo not include any of these songs:\n");
        for (title, artist) in exclude.iter().take(MAX_EXCLUSIONS_IN_PROMPT) {
            prompt.push_str(&format!("- {title} by {artist}\n"));
        }
    }
    prompt.push_str(&format!("\nQuery: {query}\n"));
    prompt
}

pub fn title_prompt(query: &str) -> String {
    format!(
        "Based on the user query: \"{query}\"\n\n\
         Generate a creative, catchy playlist title that captures the essence of this request.\n\
         The title should be 2-6 words long and engaging.\n\
         Return only the title, no additional text or quotes.\n\n\
         Examples:\n\
         - For \"upbeat songs for morning workout\" -> \"Morning Energy Boost\"\n\
         - For \"chill songs for studying\" -> \"Study Zone Vibes\"\n\
         - For \"romantic dinner music\" -> \"Candlelit Romance\"\n\n\
         Query: {query}\n"
    )
}

/// Removes ```json / ``` fences around model output
pub fn strip_code_fences(content: &str) -> &str {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parses the model's content into descriptors, dropping malformed entries
pub fn parse_suggestions(content: &str) -> Result<Vec<CandidateDescriptor>, ProviderError> {
    let body = strip_code_fences(content);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("{e}|RAW_RESPONSE:{body}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match ["tracks", "songs", "suggestions"]
            .iter()
            .find_map(|k| map.remove(*k)) {
            Some(Value::Array(items)) => items,
            _ => return Err(ProviderError::Parse(format!("response is not a list|RAW_RESPONSE:{body}")))
        },
        _ => return Err(ProviderError::Parse(format!("response is not a list|RAW_RESPONSE:{body}")))
    };

    let total = items.len();
    let descriptors: Vec<CandidateDescriptor> = items.into_iter()
        .filter_map(|item| serde_json::from_value::<RawDescriptor>(item).ok())
        .filter_map(RawDescriptor::normalize)
        .collect();

    if total > 0 && descriptors.is_empty() {
        return Err(ProviderError::Parse(format!("no usable entries|RAW_RESPONSE:{body}")));
    }
    if descriptors.len() < total {
        warn!(dropped = total - descriptors.len(), total, "suggest.malformed_entries");
    }
    Ok(descriptors)
}

pub fn clean_title(raw: &str) -> String {
    let title = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title.to_string()
    }
}

fn message_content(response: &Value) -> Result<&str, ProviderError> {
    response.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::Parse("completion has no message content".into()))
}

pub struct OpenAiSuggestions {
    client: OpenAiClient,
    retry: RetryConfig
}

impl OpenAiSuggestions {
    pub fn new(client: OpenAiClient, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    async fn try_title(&self, query: &str) -> Result<String, ProviderError> {
        let request = self.client.chat(
            TITLE_SYSTEM,
            &title_prompt(query),
            self.client.cfg.title_temperature,
            self.client.cfg.title_max_tokens
        )?;
        let response = http_with_retry(request, &self.retry).await?;
        Ok(clean_title(message_content(&response)?))
    }
}

#[async_trait]
impl SuggestionSource for OpenAiSuggestions {
    async fn suggest(
        &self,
        query: &str,
        count: usize,
        exclude: &[(String, String)]
    ) -> Result<Vec<CandidateDescriptor>, ProviderError> {
        let request = self.client.chat(
            SUGGEST_SYSTEM,
            &suggestion_prompt(query, count, exclude),
            self.client.cfg.suggest_temperature,
            self.client.cfg.suggest_max_tokens
        )?;
        let response = http_with_retry(request, &self.retry).await?;
        let mut descriptors = parse_suggestions(message_content(&response)?)?;
        descriptors.truncate(count);
        debug!(query, count, got = descriptors.len(), "suggest.done");
        Ok(descriptors)
    }

    async fn title(&self, query: &str) -> String {
        match self.try_title(query).await {
            Ok(title) => title,
            Err(e) => {
                warn!(error = %e, "suggest.title.fallback");
                FALLBACK_TITLE.to_string()
            }
        }
    }
}
