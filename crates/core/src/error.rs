use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} is not a valid base URL ({value}): {reason}")]
    InvalidUrl {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
