//!
//! src/fetch.rs  Oct 2nd, 2026
//!
//! Defines methods for hitting specified endpoints and
//! returning unparsed data, handling retries, etc.
//!

use std::time::Duration;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use reqwest::{Client, header, redirect, RequestBuilder};
use serde_json::json;
use tokio::time::sleep;
use tracing::warn;
use url::Url;

use crate::config::{HttpConfig, OpenAiConfig, RetryConfig, SpotifyConfig};
use crate::errors::{PlaymakerError, ProviderError};

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, PlaymakerError> {
    client_helper(http)
        .default_headers(headers)
        .build()
        .map_err(|e| PlaymakerError::Config(format!("build client: {e}")))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, PlaymakerError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_with_headers(http, h)
}

fn join(base: &Url, path: &str) -> Result<Url, ProviderError> {
    base.join(path).map_err(|e| ProviderError::Http(format!("bad url {path}: {e}")))
}

/// Simple function to generate random wait for http_with_retry
fn generate_backoff(base: Duration, attempt: u8, jitter: bool, rng: &mut SmallRng) -> Duration {
    let exp = base.saturating_mul(1_u32 << attempt.min(6));
    let jitter = if jitter { rng.gen_range(50..=200) } else { 0 };
    exp + Duration::from_millis(jitter)
}

/// Sends request, retrying retryable statuses and transport errors with
/// exponential backoff. Non-success terminal statuses map to ProviderError
pub async fn http_with_retry(
    request: RequestBuilder,
    retry: &RetryConfig
) -> Result<serde_json::Value, ProviderError> {
    let mut rng = SmallRng::from_entropy();
    let mut attempt = 0_u8;
    loop {
        let response = request.try_clone()
            .ok_or_else(|| ProviderError::Http("non-cloneable request".to_string()))?
            .send()
            .await;
        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    // some write endpoints answer 201 with a small body, or none
                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        return Ok(serde_json::Value::Null);
                    }
                    return Ok(serde_json::from_slice(&bytes)?);
                }
                let body = resp.text().await.unwrap_or_default();
                let retryable = retry.retryable_statuses.contains(&status.as_u16());
                if !retryable || attempt >= retry.max_attempts {
                    return Err(ProviderError::from_status(status.as_u16(), body));
                }
                let backoff = generate_backoff(retry.base_backoff, attempt, retry.jitter, &mut rng);
                warn!(status = %status, backoff = ?backoff.as_millis(), "http.retry");
                sleep(backoff).await;
                attempt += 1;
            },
            Err(e) => {
                if attempt >= retry.max_attempts {
                    return Err(e.into());
                }
                let backoff = generate_backoff(retry.base_backoff, attempt, retry.jitter, &mut rng);
                warn!(error = %e, backoff = ?backoff.as_millis(), "http.retry.error");
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub cfg: SpotifyConfig
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, PlaymakerError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone()
        })
    }

    /// POST accounts token endpoint, client credentials grant
    pub fn token_request(&self) -> Result<RequestBuilder, ProviderError> {
        let (Some(id), Some(secret)) = (&self.cfg.client_id, &self.cfg.client_secret) else {
            return Err(ProviderError::Auth("no client credentials configured".into()));
        };
        Ok(self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(id, Some(secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials"))
    }

    /// GET /v1/search?type=track&q=...&limit=
    pub fn search(&self, query: &str, limit: u32, bearer: &str) ->
        Result<RequestBuilder, ProviderError> {
        let url = join(&self.cfg.api_base, "search")?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[
            ("type", "track"),
            ("q", query),
            ("limit", &limit.to_string())
        ]))
    }

    /// GET /v1/tracks?ids=...
    pub fn batch_track(&self, ids_csv: &str, bearer: &str) ->
        Result<RequestBuilder, ProviderError> {
        let url = join(&self.cfg.api_base, "tracks")?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[("ids", ids_csv)]))
    }

    /// GET /v1/me
    pub fn me(&self, bearer: &str) -> Result<RequestBuilder, ProviderError> {
        let url = join(&self.cfg.api_base, "me")?;
        Ok(self.http.get(url).bearer_auth(bearer))
    }

    /// POST /v1/me/playlists
    pub fn create_playlist(&self, name: &str, description: &str, bearer: &str) ->
        Result<RequestBuilder, ProviderError> {
        let url = join(&self.cfg.api_base, "me/playlists")?;
        Ok(self.http.post(url).bearer_auth(bearer).json(&json!({
            "name": name,
            "description": description,
            "public": false
        })))
    }

    /// POST /v1/playlists/{id}/tracks
    pub fn add_tracks(&self, playlist_id: &str, uris: &[String], bearer: &str) ->
        Result<RequestBuilder, ProviderError> {
        let url = join(&self.cfg.api_base, &format!("playlists/{playlist_id}/tracks"))?;
        Ok(self.http.post(url).bearer_auth(bearer).json(&json!({ "uris": uris })))
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    pub http: Client,
    pub cfg: OpenAiConfig
}

impl OpenAiClient {
    pub fn new(http_config: &HttpConfig, cfg: &OpenAiConfig) ->
        Result<Self, PlaymakerError> {
        let http = base_client(http_config)?;
        Ok( Self { http, cfg: cfg.clone() })
    }

    /// POST /v1/chat/completions
    pub fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32
    ) -> Result<RequestBuilder, ProviderError> {
        let url = join(&self.cfg.base_url, "chat/completions")?;
        Ok(self.http.post(url).bearer_auth(&self.cfg.api_key).json(&json!({
            "model": self.cfg.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": temperature,
            "max_tokens": max_tokens
        })))
    }
}
