//! Endpoint resolution from host configuration and environment.
//!
//! The host configuration is JSONC:
//! - Line comments: `// comment`
//! - Block comments: `/* comment */`
//! - `{env:VAR_NAME}` substitutes an environment variable
//!
//! ```jsonc
//! {
//!   "mcp": {
//!     "hub": {
//!       "url": "https://hub.example.com/mcp",
//!       "headers": { "Authorization": "Bearer {env:HUB_TOKEN}" }
//!     }
//!   }
//! }
//! ```
//!
//! Environment variables take precedence over the file.

use crate::error::ConfigError;
use hubbridge_mcp::{Endpoint, DEFAULT_REQUEST_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Selects which `mcp` entry to read.
pub const CONNECTOR_ENV: &str = "HUBBRIDGE_CONNECTOR";
/// Overrides the connector URL.
pub const URL_ENV: &str = "HUBBRIDGE_URL";
/// Authorization overrides, highest priority first.
pub const AUTHORIZATION_ENV: &str = "HUBBRIDGE_AUTHORIZATION";
pub const AUTH_HEADER_ENV: &str = "HUBBRIDGE_AUTH_HEADER";
pub const TOKEN_ENV: &str = "HUBBRIDGE_TOKEN";
/// Transport hint: `sse`, `http`, `streamablehttp` or `streamable`.
pub const TRANSPORT_ENV: &str = "HUBBRIDGE_TRANSPORT";
/// Per-request timeout in seconds.
pub const TIMEOUT_ENV: &str = "HUBBRIDGE_TIMEOUT_SECS";

/// Connector used when `HUBBRIDGE_CONNECTOR` is unset.
pub const DEFAULT_CONNECTOR: &str = "hub";

const AUTHORIZATION: &str = "Authorization";

static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{env:([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Source of environment variables.
pub trait EnvSource: Send + Sync {
    /// Value of `name`, if set.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Host configuration. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// MCP connectors by name.
    #[serde(default)]
    pub mcp: BTreeMap<String, ConnectorConfig>,
}

/// One remote MCP connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Server URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// HTTP headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl HostConfig {
    /// Default configuration file: `<config_dir>/hubbridge/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hubbridge").join("config.json"))
    }

    /// Load the host configuration.
    ///
    /// With an explicit path the file must exist. Without one the default
    /// location is read if present and an empty configuration is used
    /// otherwise.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !tokio::fs::try_exists(path).await? {
                    return Err(ConfigError::NotFound {
                        path: path.display().to_string(),
                    });
                }
                Self::load_file(path, &ProcessEnv).await
            }
            None => {
                if let Some(path) = Self::default_path() {
                    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                        return Self::load_file(&path, &ProcessEnv).await;
                    }
                }
                debug!("No host configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content, &path.display().to_string(), env)?;
        debug!(path = %path.display(), connectors = config.mcp.len(), "Loaded host configuration");
        Ok(config)
    }

    /// Parse JSONC content, substituting `{env:VAR}` references.
    pub fn parse(content: &str, source: &str, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let content = substitute_variables(content, env)?;
        let stripped = strip_comments(&content);

        serde_json::from_str(&stripped).map_err(|e| ConfigError::InvalidJson {
            path: source.to_string(),
            message: e.to_string(),
        })
    }
}

/// Position of the comment stripper in the input.
#[derive(Clone, Copy)]
enum Scan {
    Code,
    Str,
    StrEscape,
    LineComment,
    BlockComment,
    BlockCommentStar,
}

/// Remove `//` and `/* */` comments outside string literals.
///
/// Newlines inside comments are kept so parse errors point at the right line.
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut state = Scan::Code;

    while let Some(c) = chars.next() {
        state = match (state, c) {
            (Scan::Code, '/') if chars.peek() == Some(&'/') => {
                chars.next();
                Scan::LineComment
            }
            (Scan::Code, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                Scan::BlockComment
            }
            (Scan::Code, '"') => {
                out.push(c);
                Scan::Str
            }
            (Scan::Code, _) => {
                out.push(c);
                Scan::Code
            }
            (Scan::Str, '\\') => {
                out.push(c);
                Scan::StrEscape
            }
            (Scan::Str, '"') => {
                out.push(c);
                Scan::Code
            }
            (Scan::Str | Scan::StrEscape, _) => {
                out.push(c);
                Scan::Str
            }
            (Scan::LineComment, '\n') => {
                out.push(c);
                Scan::Code
            }
            (Scan::LineComment, _) => Scan::LineComment,
            (Scan::BlockComment | Scan::BlockCommentStar, '*') => Scan::BlockCommentStar,
            (Scan::BlockCommentStar, '/') => Scan::Code,
            (Scan::BlockComment | Scan::BlockCommentStar, _) => {
                if c == '\n' {
                    out.push(c);
                }
                Scan::BlockComment
            }
        };
    }

    out
}

/// Replace every `{env:VAR}` with the variable's value.
fn substitute_variables(content: &str, env: &dyn EnvSource) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = var_regex().replace_all(content, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match env.var(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::EnvVarNotFound { name }),
        None => Ok(result.into_owned()),
    }
}

/// Connector name: `HUBBRIDGE_CONNECTOR` or [`DEFAULT_CONNECTOR`].
pub fn connector_name(env: &dyn EnvSource) -> String {
    non_empty(env, CONNECTOR_ENV).unwrap_or_else(|| DEFAULT_CONNECTOR.to_string())
}

/// Transport hint from `HUBBRIDGE_TRANSPORT`.
pub fn transport_hint(env: &dyn EnvSource) -> Option<String> {
    non_empty(env, TRANSPORT_ENV)
}

/// Per-request timeout from `HUBBRIDGE_TIMEOUT_SECS`.
///
/// Unparseable or zero values fall back to the default.
pub fn request_timeout(env: &dyn EnvSource) -> Duration {
    match non_empty(env, TIMEOUT_ENV) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(value = %raw, "Ignoring invalid {}", TIMEOUT_ENV);
                DEFAULT_REQUEST_TIMEOUT
            }
        },
        None => DEFAULT_REQUEST_TIMEOUT,
    }
}

/// Build and validate the endpoint for the selected connector.
///
/// Resolution reads nothing but `config` and `env`, so equal inputs always
/// give equal endpoints.
pub fn resolve_endpoint(config: &HostConfig, env: &dyn EnvSource) -> Result<Endpoint, ConfigError> {
    let connector = connector_name(env);
    let entry = config.mcp.get(&connector);

    let url = non_empty(env, URL_ENV)
        .or_else(|| entry.and_then(|c| c.url.clone()))
        .unwrap_or_default();
    if url.trim().is_empty() {
        return Err(ConfigError::MissingUrl { connector });
    }

    let mut headers = entry.map(|c| c.headers.clone()).unwrap_or_default();

    let auth_override = [AUTHORIZATION_ENV, AUTH_HEADER_ENV, TOKEN_ENV]
        .into_iter()
        .find_map(|name| non_empty(env, name));
    if let Some(value) = auth_override {
        headers.retain(|key, _| !key.eq_ignore_ascii_case(AUTHORIZATION));
        headers.insert(AUTHORIZATION.to_string(), value);
    }

    match headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(AUTHORIZATION))
    {
        None => return Err(ConfigError::MissingAuthorization { connector }),
        Some((_, value)) if value.trim().is_empty() => {
            return Err(ConfigError::EmptyAuthorization { connector })
        }
        Some(_) => {}
    }

    Ok(Endpoint { url, headers })
}

fn non_empty(env: &dyn EnvSource, name: &str) -> Option<String> {
    env.var(name).filter(|value| !value.is_empty())
}
