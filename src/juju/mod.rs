//! Juju API access: endpoint parsing, credentials, facades and the session
//! traits the rest of the crate is written against.
//!
//! parse_endpoint -> Endpoint { controller_url | model_url(uuid) }
//! Connector::login -> ApiSession (call / close)
//!
//! `rpc` holds the WebSocket implementation, `facade` the typed calls,
//! `session` the controller-then-model orchestration.

pub mod facade;
#[cfg(test)]
pub mod fake;
pub mod model;
pub mod rpc;
pub mod session;

use crate::error::{Error, Result};
use std::fmt;
use url::Url;

/* ---- Endpoint ---- */

/// A parsed controller address. Model endpoints live under the same host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    original: String,
    base: Url,
}

impl Endpoint {
    pub fn original(&self) -> &str {
        &self.original
    }

    /// `<base>/api`
    pub fn controller_url(&self) -> Result<Url> {
        self.join("api")
    }

    /// `<base>/model/<uuid>/api`
    pub fn model_url(&self, uuid: &str) -> Result<Url> {
        self.join(&format!("model/{uuid}/api"))
    }

    fn join(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| Error::Config(format!("invalid endpoint path '{raw}': {e}")))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str().trim_end_matches('/'))
    }
}

/// Parse a user-supplied controller address.
///
/// - "wss://10.0.0.1:17070" and "ws://localhost:46261" are taken as-is
/// - a bare "host:port" gets the `wss` scheme Juju controllers listen on
/// - any other scheme, or a URL with query/fragment, is rejected
pub fn parse_endpoint(raw: &str) -> Result<Endpoint> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("endpoint is empty".into()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("wss://{trimmed}")
    };

    let base = Url::parse(&candidate)
        .map_err(|e| Error::Config(format!("invalid endpoint '{trimmed}': {e}")))?;
    match base.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::Config(format!(
                "unsupported endpoint scheme '{other}' (expected ws or wss)"
            )));
        }
    }
    if base.host_str().is_none() {
        return Err(Error::Config(format!("endpoint '{trimmed}' has no host")));
    }
    if base.query().is_some() || base.fragment().is_some() {
        return Err(Error::Config(format!(
            "endpoint '{trimmed}' must not carry a query or fragment"
        )));
    }

    Ok(Endpoint {
        original: raw.to_string(),
        base,
    })
}

/* ---- Credentials ---- */

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Login tag: "admin" -> "user-admin".
    pub fn auth_tag(&self) -> String {
        if self.username.starts_with("user-") {
            self.username.clone()
        } else {
            format!("user-{}", self.username)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/* ---- Facades ---- */

/// Capability groups a session can be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Facade {
    ModelManager,
    Client,
    Action,
    Charms,
}

impl Facade {
    pub const fn name(&self) -> &'static str {
        match self {
            Facade::ModelManager => "ModelManager",
            Facade::Client => "Client",
            Facade::Action => "Action",
            Facade::Charms => "Charms",
        }
    }

    /// Versions this client speaks, oldest first.
    pub const fn supported_versions(&self) -> &'static [u32] {
        match self {
            Facade::ModelManager => &[9, 10],
            Facade::Client => &[6, 7, 8],
            Facade::Action => &[7],
            Facade::Charms => &[5, 6, 7],
        }
    }

    /// Facades needed to enumerate models on a controller.
    pub const CONTROLLER: &'static [Facade] = &[Facade::ModelManager];

    /// Facades needed for status, actions and charm lookups on a model.
    pub const MODEL: &'static [Facade] = &[Facade::Client, Facade::Action, Facade::Charms];
}

impl fmt::Display for Facade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/* ---- Session seams ---- */

/// An authenticated connection bound to one endpoint.
///
/// `close` consumes the session, so nothing can be called on it afterwards.
pub trait ApiSession {
    /// Identity tag reported by the server at login (e.g. "user-admin").
    fn identity(&self) -> &str;

    async fn call(
        &self,
        facade: Facade,
        request: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value>;

    async fn close(self) -> Result<()>;
}

/// Opens and authenticates sessions.
pub trait Connector {
    type Session: ApiSession;

    async fn login(
        &self,
        url: &Url,
        credentials: &Credentials,
        facades: &[Facade],
    ) -> Result<Self::Session>;
}
