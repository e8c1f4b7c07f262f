use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrzError {
    /// The registry answered 401. The caller's token (or the credentials
    /// behind it) is no longer accepted; retrying does not help.
    #[error("IRZ+ token expired")]
    TokenExpired,
    /// The SSO rejected the credential grant.
    #[error("IRZ+ sign-in failed: {0}")]
    Auth(String),
    #[error("IRZ+ API error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("retry limit reached contacting IRZ+")]
    RetriesExhausted,
    #[error("IRZ+ transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
