//! Error types for the OmniSense poller.
//!
//! The variants follow how far a failure is allowed to spread: a
//! [`FormatError`] stays inside one field, a [`ParseError`] stays inside one
//! site, an [`OmnisenseError`] of the authentication or transport class aborts
//! a whole poll cycle, and a [`SetupError`] keeps the poller from starting.

use thiserror::Error;

/// Result type alias using our custom error types.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type that encompasses all application errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Portal communication and parsing errors
    #[error("OmniSense portal error")]
    Omnisense(#[from] OmnisenseError),

    /// A poll cycle failed
    #[error("poll cycle error")]
    Cycle(#[from] CycleError),

    /// The coordinator could not come up
    #[error("setup error")]
    Setup(#[from] SetupError),

    /// Generic errors that don't fit other categories
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable parsing failed
    #[error("failed to parse environment variables: {0}")]
    EnvParse(String),

    /// Required configuration value is missing
    #[error("missing required configuration: {0}")]
    Missing(String),

    /// Configuration value is invalid
    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Portal communication errors.
#[derive(Error, Debug)]
pub enum OmnisenseError {
    /// Credentials were refused or the session is no longer accepted
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// HTTP request failed at the network level
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Network timeout
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Server returned an error status
    #[error("server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Page structure did not match what the parser expects
    #[error("HTML parsing error")]
    Parse(#[from] ParseError),
}

/// HTML structure errors, scoped to one page.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Element not found in HTML
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Invalid CSS selector
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Unexpected HTML structure
    #[error("unexpected HTML structure: {0}")]
    UnexpectedStructure(String),
}

/// Single-field conversion errors. Never escape a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// Activity timestamp did not match `YY-MM-DD HH:MM:SS`
    #[error("failed to parse timestamp from '{text}'")]
    Timestamp { text: String },

    /// Failed to parse numeric value
    #[error("failed to parse number from '{text}': {message}")]
    Number { text: String, message: String },
}

/// Errors that abort a single poll cycle. The last published snapshot stays.
#[derive(Error, Debug)]
pub enum CycleError {
    /// Login, session rejection or transport failure
    #[error("session failure: {0}")]
    Session(#[from] OmnisenseError),

    /// None of the configured sites could be matched on the portal
    #[error("none of the configured sites could be resolved")]
    NoSitesResolved,

    /// Every configured site failed; publishing would empty the snapshot
    #[error("all {0} configured sites failed to fetch")]
    AllSitesFailed(usize),

    /// The cycle as a whole exceeded its deadline
    #[error("poll cycle timed out after {0} seconds")]
    TimedOut(u64),
}

/// Errors surfaced by [`crate::coordinator::Coordinator::initialize`].
#[derive(Error, Debug)]
pub enum SetupError {
    /// The poll configuration is out of bounds
    #[error("invalid poll configuration")]
    Config(#[from] ConfigError),

    /// The first poll cycle failed, so the poller never became ready
    #[error("first poll cycle failed: {0}")]
    FirstCycle(#[source] CycleError),
}

impl ConfigError {
    /// Creates a new environment parse error.
    pub fn env_parse(err: impl std::fmt::Display) -> Self {
        Self::EnvParse(err.to_string())
    }

    /// Creates a new missing configuration error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Creates a new invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl OmnisenseError {
    /// Creates an authentication error.
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication(reason.into())
    }

    /// Creates a server error from HTTP status and response body.
    pub fn server_error(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            Self::Authentication(format!("portal answered {}", status))
        } else {
            Self::ServerError {
                status: status.as_u16(),
                message: body,
            }
        }
    }

    /// Maps a reqwest error, keeping timeouts distinguishable.
    pub fn from_request(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else {
            Self::Transport(err)
        }
    }

    /// True when the failure means the session can no longer be used.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// True for network, timeout and non-2xx failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::ServerError { .. }
        )
    }
}

impl ParseError {
    /// Creates an element not found error.
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Creates an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: err.to_string(),
        }
    }

    /// Creates an unexpected structure error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedStructure(message.into())
    }
}

impl FormatError {
    /// Creates a timestamp format error.
    pub fn timestamp(text: impl Into<String>) -> Self {
        Self::Timestamp { text: text.into() }
    }

    /// Creates a number parse error.
    pub fn number(text: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Number {
            text: text.into(),
            message: err.to_string(),
        }
    }
}

impl CycleError {
    /// True when the cycle died on authentication rather than on transport.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Session(err) if err.is_authentication())
    }
}
