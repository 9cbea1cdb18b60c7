use std::net::SocketAddr;
use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

// ── Defaults ─────────────────────────────────────────────────────────────────

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

static DEFAULT_ANALYZE_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("http://localhost:8000/analyze").unwrap());

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidBind { var: &'static str, value: String },
    #[error("{var} is not a valid http(s) URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be a positive integer: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

// ── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub analyze_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub insecure_ssl: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            analyze_url: DEFAULT_ANALYZE_URL.clone(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            insecure_ssl: false,
        }
    }
}

impl Config {
    /// Reads `MMQA_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup("MMQA_BIND") {
            config.bind = value.parse().map_err(|_| ConfigError::InvalidBind {
                var: "MMQA_BIND",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("MMQA_ANALYZE_URL") {
            config.analyze_url = parse_http_url("MMQA_ANALYZE_URL", &value)?;
        }

        if let Some(value) = lookup("MMQA_TIMEOUT_SECS") {
            let secs = parse_positive("MMQA_TIMEOUT_SECS", &value)?;
            config.request_timeout = Duration::from_secs(secs as u64);
        }

        if let Some(value) = lookup("MMQA_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_positive("MMQA_MAX_UPLOAD_BYTES", &value)?;
        }

        config.insecure_ssl = lookup("MMQA_INSECURE_SSL").as_deref() == Some("1");

        Ok(config)
    }
}

fn parse_http_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        var,
        value: value.to_string(),
    };
    let url = Url::parse(value).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind.to_string(), "0.0.0.0:3000");
        assert_eq!(config.analyze_url.as_str(), "http://localhost:8000/analyze");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert!(!config.insecure_ssl);
    }

    #[test]
    fn overrides_from_environment() {
        let config = load(&[
            ("MMQA_BIND", "127.0.0.1:8080"),
            ("MMQA_ANALYZE_URL", "https://qa.internal/analyze"),
            ("MMQA_TIMEOUT_SECS", "15"),
            ("MMQA_MAX_UPLOAD_BYTES", "1024"),
            ("MMQA_INSECURE_SSL", "1"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.analyze_url.host_str(), Some("qa.internal"));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.max_upload_bytes, 1024);
        assert!(config.insecure_ssl);
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = load(&[("MMQA_ANALYZE_URL", "ftp://example.com/analyze")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { var: "MMQA_ANALYZE_URL", .. }));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = load(&[("MMQA_TIMEOUT_SECS", "0")]).unwrap_err();
        assert_eq!(err.to_string(), "MMQA_TIMEOUT_SECS must be a positive integer: 0");
    }

    #[test]
    fn rejects_bad_bind() {
        assert!(load(&[("MMQA_BIND", "localhost")]).is_err());
    }
}
