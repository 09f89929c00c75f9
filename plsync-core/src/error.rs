use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading state from the homeserver failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Writing state or messages to the homeserver failed.
    #[error("Send error: {0}")]
    Send(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Deserialization error: {context}")]
    Deserialization { context: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure came from talking to the homeserver.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Send(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization {
            context: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors() {
        assert!(Error::Fetch("timeout".to_string()).is_remote());
        assert!(Error::Send("forbidden".to_string()).is_remote());
        assert!(!Error::Config("missing server_name".to_string()).is_remote());
    }

    #[test]
    fn test_serde_error_maps_to_deserialization() {
        let err: Error = serde_json::from_str::<u32>("\"nope\"")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Deserialization { .. }));
    }
}
