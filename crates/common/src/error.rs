//! Errors for shared types and configuration loading (thiserror-based).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Unknown presentation style: {0}")]
    UnknownStyle(String),

    #[error("Unknown narration voice: {0}")]
    UnknownVoice(String),

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type CommonResult<T> = Result<T, CommonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = CommonError::UnknownStyle("informative".into());
        assert_eq!(err.to_string(), "Unknown presentation style: informative");

        let err = CommonError::ConfigRead {
            path: PathBuf::from("/tmp/narrator.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/narrator.toml"));
    }
}
