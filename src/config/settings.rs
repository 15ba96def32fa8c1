use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vapid: VapidConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub otel: OtelConfig,
    /// Deployment environment name, reported at startup
    #[serde(default = "default_environment")]
    pub environment: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// VAPID sender identity (RFC 8292)
#[derive(Debug, Clone, Deserialize)]
pub struct VapidConfig {
    /// Base64url uncompressed P-256 public key, handed to browsers as `applicationServerKey`
    pub public_key: Option<String>,
    /// Base64url raw 32-byte P-256 private scalar
    pub private_key: Option<String>,
    /// Contact URI placed in the `sub` claim (`mailto:` or `https:`)
    #[serde(default = "default_vapid_subject")]
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Treat the subscription endpoint as a unique key (re-subscribe replaces keys)
    #[serde(default = "default_dedupe_subscriptions")]
    pub dedupe_subscriptions: bool,
    /// Upper bound for a single delivery attempt in milliseconds (0 = unbounded)
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Maximum delivery attempts in flight within one round
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    /// TTL header handed to the push service, in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_vapid_subject() -> String {
    "mailto:test@example.com".to_string()
}

fn default_dedupe_subscriptions() -> bool {
    true
}

fn default_send_timeout_ms() -> u64 {
    10_000 // 10 seconds
}

fn default_max_concurrent_sends() -> usize {
    100
}

fn default_ttl_seconds() -> u32 {
    86_400 // 24 hours
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "push-dispatch-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("environment", "development")?
            .set_default("log_format", "pretty")?
            .set_default("vapid.subject", "mailto:test@example.com")?
            .set_default("push.dedupe_subscriptions", true)?
            .set_default("push.send_timeout_ms", 10_000)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Structured environment variables
            // PUSH__SERVER__PORT, PUSH__PUSH__SEND_TIMEOUT_MS, PUSH__OTEL__ENABLED, etc.
            .add_source(
                Environment::with_prefix("PUSH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            // Flat variables understood by existing deployments
            .set_override_option("server.port", non_empty_var("PORT"))?
            .set_override_option("vapid.public_key", non_empty_var("VAPID_PUBLIC_KEY"))?
            .set_override_option("vapid.private_key", non_empty_var("VAPID_PRIVATE_KEY"))?
            .set_override_option("vapid.subject", non_empty_var("VAPID_EMAIL"))?
            .set_override_option("environment", non_empty_var("NODE_ENV"))?;

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            vapid: VapidConfig::default(),
            push: PushConfig::default(),
            otel: OtelConfig::default(),
            environment: default_environment(),
            log_format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for VapidConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            private_key: None,
            subject: default_vapid_subject(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            dedupe_subscriptions: default_dedupe_subscriptions(),
            send_timeout_ms: default_send_timeout_ms(),
            max_concurrent_sends: default_max_concurrent_sends(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
