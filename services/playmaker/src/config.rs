//!
//! src/config.rs  Oct 2nd, 2026
//!
//! Loads environment configuration for the providers, pipeline tuning,
//! persistence and logging
//!

use url::Url;
use std::time;
use crate::errors::PlaymakerError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 10000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const RETRY_MAX_ATTEMPTS: u8 = 3;
pub const RETRY_BASE_BACKOFF: u64 = 250;
pub const RETRY_JITTER: bool = true;
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Constants for pipeline tuning
pub const SUGGESTION_COUNT: usize = 40;
pub const TARGET_POOL_SIZE: usize = 50;
pub const MIN_REQUIRED: usize = 10;
pub const BATCH_SIZE: usize = 12;
pub const BATCH_DELAY: u64 = 100;
pub const SHORTFALL_MARGIN: usize = 5;
pub const SHORTFALL_ROUNDS: usize = 2;
pub const FALLBACK_SEARCH_LIMIT: u32 = 20;

pub const FALLBACK_TITLE: &str = "Custom Playlist";

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, PlaymakerError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PlaymakerError::Config(format!("{s} was not set"))),
    }
}

fn env_optional(s: &str) -> Option<String> {
    std::env::var(s).ok().filter(|v| !v.trim().is_empty())
}

/// Parses env var into T, falling back to default when unset or invalid
fn env_or<T: std::str::FromStr>(s: &str, default: T) -> T {
    std::env::var(s)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

fn parse_url(var: &str, default: &str) -> Result<Url, PlaymakerError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| PlaymakerError::Config(format!("{var} invalid {e}")))
}

/// Configuration that Spotify expects when hitting endpoints
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>, // user token, needed for publishing
    pub token_url: Url,
    pub api_base: Url,
}

fn build_spotify() -> Result<SpotifyConfig, PlaymakerError> {
    let client_id     = env_optional("SPOTIFY_CLIENT_ID");
    let client_secret = env_optional("SPOTIFY_CLIENT_SECRET");
    let access_token  = env_optional("SPOTIFY_ACCESS_TOKEN");

    let has_credentials = client_id.is_some() && client_secret.is_some();
    if access_token.is_none() && !has_credentials {
        return Err(PlaymakerError::Config(
            "SPOTIFY_ACCESS_TOKEN or SPOTIFY_CLIENT_ID/SPOTIFY_CLIENT_SECRET must be set"
                .to_string()
        ));
    }

    let token_url = parse_url(
        "SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token"
    )?;
    let mut api_base = parse_url("SPOTIFY_API_BASE", "https://api.spotify.com/v1/")?;

    // ensure valid https and hostname for both urls
    ensure_https(&token_url).map_err(PlaymakerError::Config)?;
    ensure_https(&api_base).map_err(PlaymakerError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com").map_err(PlaymakerError::Config)?;
    ensure_host(&api_base, "api.spotify.com").map_err(PlaymakerError::Config)?;
    ensure_trailing_slash(&mut api_base);

    Ok( SpotifyConfig { client_id, client_secret, access_token, token_url, api_base })
}

/// Spotify alone, for commands that only touch the catalog
pub fn load_spotify_config() -> Result<SpotifyConfig, PlaymakerError> {
    dotenvy::dotenv().ok();
    build_spotify()
}

///
/// Configuration for the chat completion provider
///
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub suggest_temperature: f32,
    pub suggest_max_tokens: u32,
    pub title_temperature: f32,
    pub title_max_tokens: u32
}

fn build_openai() -> Result<OpenAiConfig, PlaymakerError> {
    let api_key = env_check("OPENAI_API_KEY")?;
    let mut base_url = parse_url("OPENAI_BASE_URL", "https://api.openai.com/v1/")?;
    ensure_https(&base_url).map_err(PlaymakerError::Config)?;
    ensure_trailing_slash(&mut base_url);

    let model = std::env::var("OPENAI_MODEL")
        .unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

    Ok( OpenAiConfig {
        api_key,
        base_url,
        model,
        suggest_temperature: env_or("OPENAI_SUGGEST_TEMPERATURE", 0.7),
        suggest_max_tokens: env_or("OPENAI_SUGGEST_MAX_TOKENS", 2000),
        title_temperature: env_or("OPENAI_TITLE_TEMPERATURE", 0.8),
        title_max_tokens: 50
    })
}

///
/// Configuration for Http timeouts, retries, etc.
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_backoff: time::Duration,
    pub jitter: bool,
    pub retryable_statuses: Vec<u16>
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF),
            jitter: RETRY_JITTER,
            retryable_statuses: RETRYABLE_STATUSES.to_vec()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
    pub retry: RetryConfig
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
            retry: RetryConfig::default()
        }
    }
}

///
/// TTLs for memoized catalog calls
///
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub search_ttl: time::Duration,
    pub lookup_ttl: time::Duration,
    pub max_entries: usize
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_ttl: time::Duration::from_secs(600),
            lookup_ttl: time::Duration::from_secs(3600),
            max_entries: 4096
        }
    }
}

fn build_cache() -> CacheConfig {
    let d = CacheConfig::default();
    CacheConfig {
        enabled: env_or("PLAYMAKER_CACHE", d.enabled),
        search_ttl: time::Duration::from_secs(
            env_or("PLAYMAKER_SEARCH_TTL_SECS", d.search_ttl.as_secs())
        ),
        lookup_ttl: time::Duration::from_secs(
            env_or("PLAYMAKER_LOOKUP_TTL_SECS", d.lookup_ttl.as_secs())
        ),
        max_entries: d.max_entries
    }
}

///
/// Tuning for suggestion, resolution and shortfall handling
///
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub suggestion_count: usize,      // asked of the suggestion provider
    pub target_pool_size: usize,      // resolution stops once reached
    pub min_required: usize,          // below this the shortfall filler runs
    pub batch_size: usize,            // concurrent matcher calls per batch
    pub batch_delay: time::Duration,  // pacing between batches
    pub shortfall_margin: usize,      // extra suggestions asked on top of the gap
    pub shortfall_rounds: usize,      // supplemental suggestion rounds
    pub fallback_search_limit: u32    // per generic fallback query
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            suggestion_count: SUGGESTION_COUNT,
            target_pool_size: TARGET_POOL_SIZE,
            min_required: MIN_REQUIRED,
            batch_size: BATCH_SIZE,
            batch_delay: time::Duration::from_millis(BATCH_DELAY),
            shortfall_margin: SHORTFALL_MARGIN,
            shortfall_rounds: SHORTFALL_ROUNDS,
            fallback_search_limit: FALLBACK_SEARCH_LIMIT
        }
    }
}

fn build_pipeline() -> PipelineConfig {
    let d = PipelineConfig::default();
    PipelineConfig {
        suggestion_count: env_or("PLAYMAKER_SUGGESTIONS", d.suggestion_count).clamp(1, 50),
        target_pool_size: env_or("PLAYMAKER_TARGET_POOL", d.target_pool_size),
        min_required: env_or("PLAYMAKER_MIN_REQUIRED", d.min_required),
        batch_size: env_or("PLAYMAKER_BATCH_SIZE", d.batch_size).max(1),
        batch_delay: time::Duration::from_millis(
            env_or("PLAYMAKER_BATCH_DELAY_MS", BATCH_DELAY)
        ),
        shortfall_margin: env_or("PLAYMAKER_SHORTFALL_MARGIN", d.shortfall_margin),
        shortfall_rounds: env_or("PLAYMAKER_SHORTFALL_ROUNDS", d.shortfall_rounds),
        fallback_search_limit: d.fallback_search_limit
    }
}

///
/// Configuration for the playlist history store
///
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub db_url: String
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { db_url: "sqlite:./data/playmaker.db".to_string() }
    }
}

/// History store alone, the history command needs no provider credentials
pub fn load_persistence_config() -> PersistenceConfig {
    dotenvy::dotenv().ok();
    PersistenceConfig {
        db_url: env_optional("PLAYMAKER_DB_URL")
            .unwrap_or_else(|| PersistenceConfig::default().db_url)
    }
}

///
/// Configuration for Logger
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,playmaker=debug,reqwest=warn,sqlx=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true
        }
    }
}

/// Logging alone, usable before the provider config is known
pub fn load_logging_config() -> LoggingConfig {
    dotenvy::dotenv().ok();
    let mut logging = LoggingConfig::default();
    if let Ok(format) = std::env::var("PLAYMAKER_LOG_FORMAT") {
        if format.eq_ignore_ascii_case("pretty") {
            logging.format = LogFormat::Pretty;
        }
    }
    logging
}

///
/// AppConfig which holds everything the clients and pipeline need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub openai: OpenAiConfig,
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, PlaymakerError> {
    dotenvy::dotenv().ok();

    let spotify     = build_spotify()?;
    let openai      = build_openai()?;
    let http        = HttpConfig::default();
    let cache       = build_cache();
    let pipeline    = build_pipeline();
    let persistence = load_persistence_config();
    let logging     = load_logging_config();

    Ok( AppConfig { spotify, openai, http, cache, pipeline, persistence, logging } )
}
