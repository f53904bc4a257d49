use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
