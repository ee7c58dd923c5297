use std::io;
use thiserror::Error;

/// Unified error type for chat dispatch and the interactive front-end
#[derive(Error, Debug)]
pub enum ChatError {
    /// Caller supplied empty or missing input; raised before any side effect
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or unwritable credential, unreadable config file
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider rejected the credential (HTTP 401)
    #[error("Invalid API key. Please check your OpenAI API key.")]
    InvalidCredential,

    /// Any other non-success provider response
    #[error("API error ({status}): {body}")]
    Provider { status: u16, body: String },

    /// Transport-level failures (connection refused, DNS, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Request deadline exceeded
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Success status but unusable body
    #[error("Failed to parse API response: {0}")]
    ResponseParse(String),

    /// User input errors in the line editor
    #[error("Input error: {0}")]
    Input(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChatError::Timeout(err.to_string())
        } else if err.is_decode() {
            ChatError::ResponseParse(err.to_string())
        } else if err.is_connect() {
            ChatError::Network(format!("Connection failed: {}", err))
        } else {
            ChatError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::ResponseParse(err.to_string())
    }
}

impl From<serde_yml::Error> for ChatError {
    fn from(err: serde_yml::Error) -> Self {
        ChatError::Configuration(format!("YAML error: {}", err))
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidArgument(msg) => ChatError::InvalidArgument(msg),
            other => ChatError::Configuration(other.to_string()),
        }
    }
}

/// Errors raised by the encrypted configuration store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store IO error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed store file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("keyring: {0}")]
    Keyring(String),
}
