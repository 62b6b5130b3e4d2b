//! Defines the custom error types for the bulk-verify application.

use std::io;
use thiserror::Error;
use url::ParseError as UrlParseError;

/// The primary error type for the verification client.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error initializing necessary components (e.g., the HTTP client).
    #[error("Initialization Error: {0}")]
    Initialization(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization or deserialization.
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error parsing the TOML configuration file.
    #[error("TOML Error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error parsing a URL.
    #[error("URL Parsing Error: {0}")]
    UrlParse(#[from] UrlParseError),

    /// Error making HTTP requests via reqwest.
    #[error("HTTP Request Error: {0}")]
    Request(#[from] reqwest::Error),

    /// The verification service answered with an unexpected HTTP status.
    #[error("Service Error: HTTP {status}: {message}")]
    Service {
        /// The HTTP status code returned.
        status: u16,
        /// The error message extracted from the body, if any.
        message: String,
    },

    /// The service answered, but the body could not be understood.
    #[error("Malformed Response: {0}")]
    MalformedResponse(String),

    /// The server refused a verification because the account has no credits left (HTTP 402).
    #[error("Insufficient Credits: {message}")]
    InsufficientCredits {
        /// Message reported by the server.
        message: String,
        /// Credit count reported alongside the refusal, if any.
        current_credits: Option<u64>,
    },

    /// The credit balance was zero before the batch started.
    #[error("No verification credits remaining")]
    NoCredits,

    /// The credit balance could not be fetched, so the batch was not started.
    #[error("Unable to check credits: {0}")]
    CreditCheckUnavailable(String),

    /// Indicates insufficient input data to proceed (e.g., no usable addresses).
    #[error("Insufficient Input Data: {0}")]
    InsufficientInput(String),

    /// Saving a finished batch to the history store failed.
    #[error("Persistence Error: {0}")]
    Persistence(String),

    /// Writing an export file failed.
    #[error("Export Error: {0}")]
    Export(String),

    /// An underlying error that doesn't fit other categories, using anyhow.
    #[error("Generic Error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl AppError {
    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Credit refusals are never retryable; neither are client-side (4xx) rejections.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Request(_) | AppError::MalformedResponse(_) => true,
            AppError::Service { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// True for the distinct "out of credits" class of failures.
    pub fn is_credit_exhaustion(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientCredits { .. } | AppError::NoCredits
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
