use reqwest::StatusCode;

/// Everything that can go wrong during a single flush. None of these ever
/// escape the flush loop, they are logged and the next tick tries again.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("failed to encode datapoints: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to post datapoints: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response code when posting metrics was {0:?}")]
    Status(String),
}

impl FlushError {
    pub(crate) fn status(code: StatusCode) -> Self {
        FlushError::Status(code.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("metric {name:?} is already registered")]
    Duplicate { name: String },
    #[error("metric {name:?} is registered as a {registered}, not a {requested}")]
    KindMismatch {
        name: String,
        registered: &'static str,
        requested: &'static str,
    },
}
