use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

use crate::prompt::DEFAULT_NATIVE_LANGUAGE;

/// Fully resolved configuration. Every secret is present and non-empty.
#[derive(Debug, Clone)]
pub struct Config {
    pub line: LineConfig,
    pub gemini: GeminiConfig,
    pub tutor: TutorConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_access_token: SecretString,
    pub channel_secret: SecretString,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TutorConfig {
    /// Language the tutor translates English messages into
    #[serde(default = "default_native_language")]
    pub native_language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Raw TOML file (everything optional so env vars can fill the gaps) ──

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    line: RawLine,
    #[serde(default)]
    gemini: RawGemini,
    tutor: Option<TutorConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct RawLine {
    channel_access_token: Option<String>,
    channel_secret: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawGemini {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

fn default_native_language() -> String {
    DEFAULT_NATIVE_LANGUAGE.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    ///
    /// `required_file` controls whether a missing file is an error; the
    /// default `config.toml` is optional, an explicit path is not.
    pub fn load(path: &Path, required_file: bool) -> Result<Self> {
        let raw = if path.exists() || required_file {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            RawConfig::default()
        };

        Self::resolve(raw, |key| std::env::var(key).ok())
    }

    /// Merge file values with variables from `env`, env taking precedence.
    fn resolve(raw: RawConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let channel_access_token = env("LINE_CHANNEL_ACCESS_TOKEN")
            .or(raw.line.channel_access_token);
        let channel_secret = env("LINE_CHANNEL_SECRET").or(raw.line.channel_secret);
        let api_key = env("GEMINI_API_KEY").or(raw.gemini.api_key);

        let mut server = raw.server.unwrap_or(ServerConfig {
            host: default_host(),
            port: default_port(),
        });
        if let Some(port) = env("PORT") {
            server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }

        let model = env("GEMINI_MODEL")
            .or(raw.gemini.model)
            .unwrap_or_else(default_gemini_model);

        Ok(Config {
            line: LineConfig {
                channel_access_token: require_secret(
                    channel_access_token,
                    "LINE_CHANNEL_ACCESS_TOKEN",
                )?,
                channel_secret: require_secret(channel_secret, "LINE_CHANNEL_SECRET")?,
                api_base: raw.line.api_base.unwrap_or_else(default_line_api_base),
            },
            gemini: GeminiConfig {
                api_key: require_secret(api_key, "GEMINI_API_KEY")?,
                model,
                base_url: raw.gemini.base_url.unwrap_or_else(default_gemini_base_url),
                timeout_secs: raw.gemini.timeout_secs.unwrap_or_else(default_timeout_secs),
            },
            tutor: raw.tutor.unwrap_or_else(|| TutorConfig {
                native_language: default_native_language(),
            }),
            server,
        })
    }
}

fn require_secret(value: Option<String>, name: &str) -> Result<SecretString> {
    let secret = value
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::new)
        .with_context(|| format!("Missing required secret: set {name}"))?;
    Ok(secret)
}
