//! Runtime configuration, sourced from `MINDLOOM_*` environment variables.

use std::time::Duration;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_var(name)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: String,
    /// Port to listen on (default: 3000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: env_var("MINDLOOM_HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env_parse("MINDLOOM_HTTP_PORT", 3000),
        }
    }
}

/// Graph collaborator endpoint configuration
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Base URL of the graph database HTTP API
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: env_var("MINDLOOM_GRAPH_URL").unwrap_or_else(|| "http://localhost:7474".to_string()),
            database: env_var("MINDLOOM_GRAPH_DATABASE").unwrap_or_else(|| "mindmap".to_string()),
            username: env_var("MINDLOOM_GRAPH_USER").unwrap_or_else(|| "neo4j".to_string()),
            password: env_var("MINDLOOM_GRAPH_PASSWORD").unwrap_or_default(),
        }
    }
}

/// Top-level runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub http: HttpConfig,
    pub graph: GraphConfig,
    /// Number of background job workers.
    pub num_workers: usize,
    /// Delay between relayed stream fragments; a subscriber throttle, not a
    /// correctness requirement.
    pub stream_pacing: Duration,
    /// Message count a session may reach before compaction kicks in.
    pub compaction_threshold: usize,
    /// Chance of enqueueing a compaction job after each exchange.
    pub compaction_probability: f64,
    /// Age after which a processing job counts as stalled and is requeued.
    pub stall_timeout: Duration,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: env_var("MINDLOOM_DB_PATH").unwrap_or_else(|| "mindloom.redb".to_string()),
            http: HttpConfig::default(),
            graph: GraphConfig::default(),
            num_workers: env_parse("MINDLOOM_NUM_WORKERS", 2),
            stream_pacing: Duration::from_millis(env_parse("MINDLOOM_STREAM_PACING_MS", 50)),
            compaction_threshold: env_parse("MINDLOOM_COMPACTION_THRESHOLD", 50),
            compaction_probability: env_parse("MINDLOOM_COMPACTION_PROBABILITY", 0.2),
            stall_timeout: Duration::from_secs(env_parse("MINDLOOM_STALL_TIMEOUT_SECS", 300)),
            anthropic_api_key: env_var("ANTHROPIC_API_KEY"),
            openai_api_key: env_var("OPENAI_API_KEY"),
            google_api_key: env_var("GOOGLE_API_KEY"),
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        Self::default()
    }
}
