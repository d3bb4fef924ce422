use std::env;
use std::path::{Path, PathBuf};

use crate::models::Secret;

pub const DEFAULT_NEON_API_URL: &str = "https://console.neon.tech/api/v2";
pub const DEFAULT_FLY_API_URL: &str = "https://api.fly.io/graphql";
pub const DEFAULT_CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// CI event the action was invoked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Pull request opened or updated
    Open,
    /// Pull request closed
    Close,
}

impl Event {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "open" => Some(Self::Open),
            "close" => Some(Self::Close),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Action
    pub event: Event,
    pub ref_name: String,
    pub pull_request_number: u64,
    pub suffix: Option<String>,

    // Backends
    pub neon: NeonConfig,
    pub fly: FlyConfig,
    pub pages: PagesConfig,
}

/// Database branch settings
#[derive(Debug, Clone)]
pub struct NeonConfig {
    pub api_url: String,
    pub api_token: String,
    pub project_id: String,
    pub user: String,
    pub password: String,
    pub db_name: String,
    /// Extra connection options, starting with `?`
    pub connection_options: Option<String>,
}

/// App deployment settings
#[derive(Debug, Clone)]
pub struct FlyConfig {
    pub api_url: String,
    pub api_token: String,
    pub org_name: String,
    pub region: String,
    pub image: String,
    /// Public domain apps are served under
    pub app_domain: String,
    /// Parsed config template, merged with the app name on every deploy
    pub template: serde_json::Value,
    pub secrets: Vec<Secret>,
}

/// Static site settings
#[derive(Debug, Clone)]
pub struct PagesConfig {
    pub api_url: String,
    pub api_token: String,
    pub account_id: String,
    pub project_name: String,
    pub site_dir: PathBuf,
    pub build_command: String,
    pub output_dir: String,
    /// Variable the build reads the app URL from
    pub api_url_var: String,
    pub wrangler_bin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if exists

        let event = required("PREVIEW_EVENT")?;
        let event = Event::parse(&event).ok_or(ConfigError::Invalid("PREVIEW_EVENT"))?;

        let ref_name = match optional("REF_NAME") {
            Some(name) => name,
            None => required("GITHUB_HEAD_REF").map_err(|_| ConfigError::Missing("REF_NAME"))?,
        };

        Ok(Self {
            event,
            ref_name,
            pull_request_number: pull_request_number()?,
            suffix: optional("PREVIEW_SUFFIX"),
            neon: NeonConfig::from_env()?,
            fly: FlyConfig::from_env()?,
            pages: PagesConfig::from_env()?,
        })
    }
}

impl NeonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let connection_options = optional("NEON_DB_CONNECTION_OPTIONS");
        if let Some(options) = &connection_options {
            if !options.starts_with('?') {
                return Err(ConfigError::Invalid("NEON_DB_CONNECTION_OPTIONS"));
            }
        }

        Ok(Self {
            api_url: optional("NEON_API_URL").unwrap_or_else(|| DEFAULT_NEON_API_URL.to_string()),
            api_token: required("NEON_API_TOKEN")?,
            project_id: required("NEON_PROJECT_ID")?,
            user: required("NEON_USER")?,
            password: required("NEON_PASSWORD")?,
            db_name: required("NEON_DB_NAME")?,
            connection_options,
        })
    }
}

impl FlyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let image = required("CONTAINER_IMAGE_URL")?;
        if image.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid("CONTAINER_IMAGE_URL"));
        }

        let template_path = required("FLY_TEMPLATE_CONFIG")?;
        let template = load_template(Path::new(&template_path))?;

        let secrets = match optional("FLY_SECRETS") {
            Some(raw) => parse_secrets(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            api_url: optional("FLY_API_URL").unwrap_or_else(|| DEFAULT_FLY_API_URL.to_string()),
            api_token: required("FLY_API_TOKEN")?,
            org_name: required("FLY_ORG_NAME")?,
            region: required("FLY_REGION")?,
            image,
            app_domain: optional("FLY_APP_DOMAIN").unwrap_or_else(|| "fly.dev".to_string()),
            template,
            secrets,
        })
    }
}

impl PagesConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: optional("CLOUDFLARE_API_URL")
                .unwrap_or_else(|| DEFAULT_CLOUDFLARE_API_URL.to_string()),
            api_token: required("CLOUDFLARE_API_TOKEN")?,
            account_id: required("CLOUDFLARE_ACCOUNT_ID")?,
            project_name: required("CLOUDFLARE_PROJECT_NAME")?,
            site_dir: optional("CLOUDFLARE_SITE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            build_command: optional("CLOUDFLARE_BUILD_COMMAND")
                .unwrap_or_else(|| "npm run build".to_string()),
            output_dir: optional("CLOUDFLARE_OUTPUT_DIR").unwrap_or_else(|| "dist".to_string()),
            api_url_var: optional("CLOUDFLARE_API_URL_VAR")
                .unwrap_or_else(|| "PUBLIC_API_URL".to_string()),
            wrangler_bin: optional("WRANGLER_BIN").unwrap_or_else(|| "wrangler".to_string()),
        })
    }
}

/// Parse a dotenv formatted document into ordered secrets
pub fn parse_secrets(raw: &str) -> Result<Vec<Secret>, ConfigError> {
    dotenvy::from_read_iter(raw.as_bytes())
        .map(|item| {
            item.map(|(key, value)| Secret::new(key, value))
                .map_err(|_| ConfigError::Invalid("FLY_SECRETS"))
        })
        .collect()
}

/// Read a TOML app template and convert it to a JSON document
pub fn load_template(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Template(format!("{}: {}", path.display(), e)))?;
    parse_template(&content)
}

pub fn parse_template(content: &str) -> Result<serde_json::Value, ConfigError> {
    let table: toml::Table =
        toml::from_str(content).map_err(|e| ConfigError::Template(e.to_string()))?;
    serde_json::to_value(table).map_err(|e| ConfigError::Template(e.to_string()))
}

/// Pull request number from `PR_NUMBER` or the GitHub event payload
fn pull_request_number() -> Result<u64, ConfigError> {
    if let Some(raw) = optional("PR_NUMBER") {
        return raw.parse().map_err(|_| ConfigError::Invalid("PR_NUMBER"));
    }

    let path = required("GITHUB_EVENT_PATH").map_err(|_| ConfigError::Missing("PR_NUMBER"))?;
    let payload = std::fs::read_to_string(&path)
        .map_err(|_| ConfigError::Invalid("GITHUB_EVENT_PATH"))?;
    pull_request_number_from_event(&payload).ok_or(ConfigError::Invalid("GITHUB_EVENT_PATH"))
}

pub fn pull_request_number_from_event(payload: &str) -> Option<u64> {
    let event: serde_json::Value = serde_json::from_str(payload).ok()?;
    event["pull_request"]["number"]
        .as_u64()
        .or_else(|| event["number"].as_u64())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid app template: {0}")]
    Template(String),
}
