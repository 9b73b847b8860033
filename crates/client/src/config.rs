use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// Per-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Inactivity before the session is logged out (default: `1800`).
    pub idle_timeout_secs: u64,
    /// JSON file holding the persisted session.
    pub session_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".into(),
            request_timeout_secs: 30,
            idle_timeout_secs: 30 * 60,
            session_file: PathBuf::from(".carehub-session.json"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                     |
    /// |--------------------------------|-----------------------------|
    /// | `CAREHUB_API_URL`              | `http://localhost:5000/api` |
    /// | `CAREHUB_REQUEST_TIMEOUT_SECS` | `30`                        |
    /// | `CAREHUB_IDLE_TIMEOUT_SECS`    | `1800`                      |
    /// | `CAREHUB_SESSION_FILE`         | `.carehub-session.json`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_url = match lookup("CAREHUB_API_URL") {
            Some(url) if url.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    var: "CAREHUB_API_URL",
                })
            }
            Some(url) => url.trim().trim_end_matches('/').to_string(),
            None => defaults.api_url,
        };

        let request_timeout_secs = parse_secs(
            "CAREHUB_REQUEST_TIMEOUT_SECS",
            lookup("CAREHUB_REQUEST_TIMEOUT_SECS"),
            defaults.request_timeout_secs,
        )?;

        let idle_timeout_secs = parse_secs(
            "CAREHUB_IDLE_TIMEOUT_SECS",
            lookup("CAREHUB_IDLE_TIMEOUT_SECS"),
            defaults.idle_timeout_secs,
        )?;

        let session_file = lookup("CAREHUB_SESSION_FILE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        Ok(Self {
            api_url,
            request_timeout_secs,
            idle_timeout_secs,
            session_file,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn parse_secs(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}
