//! Error kinds shared by the Juju session layer and the selection flow.
//!
//! Command entry points wrap these in `anyhow` with extra context; nothing
//! below the command layer recovers from an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration (endpoint, credentials, model).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure: dial, send, receive or close.
    #[error("connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// The server rejected the credentials or the login reply was unusable.
    #[error("login to {url} failed: {reason}")]
    Login { url: String, reason: String },

    /// A facade was called that this session did not negotiate.
    #[error("facade {0} is not available on this session")]
    FacadeUnavailable(&'static str),

    /// The server answered a request with an error envelope.
    #[error("{facade}.{request} failed: {message}")]
    Rpc {
        facade: &'static str,
        request: String,
        message: String,
        code: Option<String>,
    },

    /// A response body did not have the expected shape.
    #[error("unexpected {facade}.{request} response: {source}")]
    Decode {
        facade: &'static str,
        request: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("could not fetch model status")]
    StatusFetch(#[source] Box<Error>),

    #[error("could not fetch charm {url}")]
    CharmFetch {
        url: String,
        #[source]
        source: Box<Error>,
    },

    #[error("no applications match '{0}'")]
    NoMatchingApplications(String),

    /// Applications matched but none of them carries a charm URL.
    #[error("no charm found for applications matching '{0}'")]
    NoCharms(String),

    /// Terminal I/O with the operator failed (including end of input).
    #[error("prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
