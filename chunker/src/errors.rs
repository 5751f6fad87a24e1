//! Definition of errors.

use thiserror::Error;

pub type Result<T, E = ChunkerError> = std::result::Result<T, E>;

/// Errors raised by the chunker library.
///
/// Every failure is terminal for the current operation; nothing in the library retries or exits
/// the process. Binaries turn these into a nonzero exit status.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// The model artifact is unusable.
    #[error("InvalidModelError: {msg}")]
    InvalidModel { msg: String },

    /// An argument passed to a library function is invalid.
    #[error("InvalidArgumentError: {arg}: {msg}")]
    InvalidArgument { arg: &'static str, msg: String },

    /// Required configuration is missing or malformed.
    #[error("ConfigError: {0}")]
    Config(String),

    /// The language declared by a document conflicts with the configured one.
    #[error("language mismatch: the document declares {document:?} but {configured:?} was requested")]
    LanguageMismatch { document: String, configured: String },

    /// The annotation server host could not be resolved.
    #[error("unknown hostname or IP address: {0}")]
    UnknownHost(String),

    /// The external learner failed.
    #[error("LearnerError: {0}")]
    Learner(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] bincode::error::DecodeError),

    #[error(transparent)]
    Encode(#[from] bincode::error::EncodeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cast(#[from] std::num::TryFromIntError),
}

impl ChunkerError {
    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel { msg: msg.into() }
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument {
            arg,
            msg: msg.into(),
        }
    }

    pub(crate) fn config<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_argument() {
        let e = ChunkerError::invalid_argument("tokens", "is empty");
        assert_eq!("InvalidArgumentError: tokens: is empty", e.to_string());
    }

    #[test]
    fn test_display_language_mismatch() {
        let e = ChunkerError::LanguageMismatch {
            document: "eu".into(),
            configured: "en".into(),
        };
        assert!(e.to_string().contains("\"eu\""));
        assert!(e.to_string().contains("\"en\""));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChunkerError>();
    }
}
