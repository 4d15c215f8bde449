use std::{collections::BTreeMap, env, fmt, sync::Arc, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

/// Ingestion endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://ingest.signalfx.com/v2/datapoint";
/// Header carrying the API token.
pub const TOKEN_HEADER: &str = "X-SF-Token";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Labels attached to every exported datapoint.
pub type Dimensions = BTreeMap<String, String>;

/// Where and how to send datapoints. Built once and read only afterwards.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Datapoint ingestion URL, an empty one means [`DEFAULT_ENDPOINT`].
    #[serde(deserialize_with = "endpoint_or_default")]
    pub endpoint: String,
    /// API token, sent verbatim in the [`TOKEN_HEADER`] header.
    pub token: String,
    /// Prefix added to all metric names, joined with a `.`.
    pub prefix: Option<String>,
    /// Attributes added to each metric, usually hostname, app name and
    /// environment. Shared by every datapoint of a flush.
    pub dimensions: Option<Arc<Dimensions>>,
    #[serde(with = "secs")]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: String::new(),
            prefix: None,
            dimensions: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("prefix", &self.prefix)
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// An empty endpoint resets to [`DEFAULT_ENDPOINT`].
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        if self.endpoint.is_empty() {
            self.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        self
    }

    /// An empty prefix is the same as no prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let dimensions = self.dimensions.get_or_insert_with(Default::default);
        Arc::make_mut(dimensions).insert(key.into(), value.into());
        self
    }

    /// Tag every datapoint with `host=<hostname of this machine>`.
    pub fn with_host_dimension(self) -> Self {
        let host = gethostname::gethostname().to_string_lossy().into_owned();
        self.with_dimension("host", host)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a config from `SFX_*` environment variables:
    ///
    /// - `SFX_TOKEN` (required)
    /// - `SFX_ENDPOINT`, defaults to [`DEFAULT_ENDPOINT`]
    /// - `SFX_PREFIX`
    /// - `SFX_DIMENSIONS`, as `key=value,key2=value2`
    /// - `SFX_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("SFX_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("SFX_TOKEN"))?;
        let mut config = Config::new(token);
        if let Some(endpoint) = lookup("SFX_ENDPOINT") {
            config = config.with_endpoint(endpoint);
        }
        if let Some(prefix) = lookup("SFX_PREFIX") {
            config = config.with_prefix(prefix);
        }
        if let Some(dimensions) = lookup("SFX_DIMENSIONS") {
            for pair in dimensions.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| ConfigError::Invalid {
                    var: "SFX_DIMENSIONS",
                    reason: format!("expected key=value, got {pair:?}"),
                })?;
                config = config.with_dimension(key.trim(), value.trim());
            }
        }
        if let Some(timeout) = lookup("SFX_TIMEOUT_SECS") {
            let secs = timeout.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "SFX_TIMEOUT_SECS",
                reason: e.to_string(),
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn endpoint_or_default<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let endpoint = String::deserialize(d)?;
    if endpoint.is_empty() {
        return Ok(DEFAULT_ENDPOINT.to_string());
    }
    Ok(endpoint)
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::new("secret");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.token, "secret");
        assert!(config.prefix.is_none());
        assert!(config.dimensions.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn empty_prefix_is_none() {
        assert!(Config::new("t").with_prefix("").prefix.is_none());
        assert_eq!(
            Config::new("t").with_prefix("svc").prefix.as_deref(),
            Some("svc")
        );
    }

    #[test]
    fn empty_endpoint_is_default() {
        let config = Config::new("t").with_endpoint("");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);

        let config: Config =
            serde_json::from_value(serde_json::json!({"token": "t", "endpoint": ""})).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);

        let config = Config::from_lookup(lookup(&[("SFX_TOKEN", "t"), ("SFX_ENDPOINT", "")])).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn debug_hides_token() {
        let config = Config::new("super-secret").with_prefix("svc");
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("svc"));
    }

    #[test]
    fn host_dimension() {
        let config = Config::new("t").with_host_dimension();
        let dims = config.dimensions.unwrap();
        assert!(dims.contains_key("host"));
    }

    #[test]
    fn from_env_vars() {
        let config = Config::from_lookup(lookup(&[
            ("SFX_TOKEN", "abc"),
            ("SFX_ENDPOINT", "http://127.0.0.1:9999/v2/datapoint"),
            ("SFX_PREFIX", "svc"),
            ("SFX_DIMENSIONS", "env=prod, app = api"),
            ("SFX_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.endpoint, "http://127.0.0.1:9999/v2/datapoint");
        assert_eq!(config.prefix.as_deref(), Some("svc"));
        let dims = config.dimensions.unwrap();
        assert_eq!(dims.get("env").map(String::as_str), Some("prod"));
        assert_eq!(dims.get("app").map(String::as_str), Some("api"));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn from_env_requires_token() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SFX_TOKEN")));
    }

    #[test]
    fn from_env_rejects_bad_dimensions() {
        let err = Config::from_lookup(lookup(&[("SFX_TOKEN", "t"), ("SFX_DIMENSIONS", "nope")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "SFX_DIMENSIONS",
                ..
            }
        ));
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "token": "abc",
            "dimensions": {"env": "staging"},
            "timeout": 2,
        }))
        .unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(
            config.dimensions.unwrap().get("env").map(String::as_str),
            Some("staging")
        );
    }
}
