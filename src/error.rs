// Error handling module
// Defines the error types surfaced by token management and credential resolution

use thiserror::Error;

/// Errors that can occur while resolving credentials or obtaining tokens
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network-level failure talking to the token endpoint
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token endpoint answered outside [200,300)
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    /// 2xx response whose body did not carry the required token fields
    #[error("malformed token response: {0}")]
    MalformedResponse(#[source] reqwest::Error),

    /// No usable credential path for the requested service
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Credential values carry stray delimiters (usually a pasted JSON blob)
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// A credential source existed but could not be read or parsed
    #[error("credential source error: {0}")]
    CredentialSource(#[from] anyhow::Error),
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;
