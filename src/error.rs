use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an indexing or search run.
///
/// Problems with individual files never surface here; they are recorded as
/// [`SkipReason`](crate::crawler::SkipReason) values in the run report.
#[derive(Debug, Error)]
pub enum LightgrokError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index store error at {}: {message}", location.display())]
    Store { location: PathBuf, message: String },

    #[error("no index for {} (expected at {}); run `lightgrok index` first", root.display(), location.display())]
    IndexNotFound { root: PathBuf, location: PathBuf },

    #[error("invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl LightgrokError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn store(location: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Store {
            location: location.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LightgrokError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = LightgrokError::io(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let message = err.to_string();
        assert!(message.contains("/nope"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_store_error_message() {
        let err = LightgrokError::store("/idx/abc", "lock busy");
        match &err {
            LightgrokError::Store { location, message } => {
                assert_eq!(location, &PathBuf::from("/idx/abc"));
                assert_eq!(message, "lock busy");
            }
            _ => panic!("Unexpected error type"),
        }
    }
}
