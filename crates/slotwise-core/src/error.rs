use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlotwiseError {
    /// The config file or an environment override could not be parsed, or
    /// failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SlotwiseError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            SlotwiseError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SlotwiseError>;
