//! JSON-over-WebSocket session speaking the Juju API envelope.
//!
//! Request:  {"request-id": N, "type": FACADE, "version": V, "request": NAME, "params": {...}}
//! Response: {"request-id": N, "response": {...}} or {"request-id": N, "error": "...", "error-code": "..."}
//!
//! Calls on one session serialize on the stream mutex: a request is written
//! and its response read before the next caller gets the socket. No pings,
//! redirects or macaroon discharge are handled.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message, error::ProtocolError};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use url::Url;

use super::{ApiSession, Connector, Credentials, Facade};
use crate::error::{Error, Result};

/// Admin facade version used for `Login`.
pub const ADMIN_VERSION: u32 = 3;

/// Client version announced at login; controllers refuse unknown majors.
pub const CLIENT_VERSION: &str = "3.4.0";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/* ---- Envelopes ---- */

#[derive(Debug, Serialize)]
struct RequestEnvelope<'a> {
    #[serde(rename = "request-id")]
    request_id: u64,
    #[serde(rename = "type")]
    facade: &'a str,
    version: u32,
    request: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(rename = "request-id", default)]
    request_id: u64,
    #[serde(default)]
    response: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "error-code", default)]
    error_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UserInfo {
    #[serde(default)]
    identity: String,
}

#[derive(Debug, Deserialize)]
struct FacadeVersions {
    name: String,
    #[serde(default)]
    versions: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct LoginResult {
    #[serde(rename = "user-info", default)]
    user_info: Option<UserInfo>,
    #[serde(default)]
    facades: Option<Vec<FacadeVersions>>,
    #[serde(rename = "server-version", default)]
    server_version: String,
}

/// Pick, for each requested facade, the newest version both sides speak.
fn negotiate(requested: &[Facade], advertised: &[FacadeVersions]) -> Result<BTreeMap<Facade, u32>> {
    let mut chosen = BTreeMap::new();
    for facade in requested {
        let offered = advertised
            .iter()
            .find(|f| f.name == facade.name())
            .map(|f| f.versions.as_slice())
            .unwrap_or_default();
        let best = facade
            .supported_versions()
            .iter()
            .rev()
            .find(|v| offered.contains(v))
            .ok_or(Error::FacadeUnavailable(facade.name()))?;
        chosen.insert(*facade, *best);
    }
    Ok(chosen)
}

/* ---- Connector ---- */

/// Dials controllers and models over `ws`/`wss`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    /// Accept self-signed controller certificates.
    pub insecure: bool,
}

impl WsConnector {
    pub fn new(insecure: bool) -> Self {
        Self { insecure }
    }

    async fn dial(&self, url: &Url) -> Result<WsStream> {
        let tls = if self.insecure {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| connection_error(url, e))?;
            Some(tokio_tungstenite::Connector::NativeTls(connector))
        } else {
            None
        };

        let (ws, _response) = connect_async_tls_with_config(url.as_str(), None, false, tls)
            .await
            .map_err(|e| connection_error(url, e))?;
        Ok(ws)
    }
}

impl Connector for WsConnector {
    type Session = WsSession;

    async fn login(
        &self,
        url: &Url,
        credentials: &Credentials,
        facades: &[Facade],
    ) -> Result<WsSession> {
        crate::log_debug!(target: "rpc", "dialing {}", url);
        let stream = self.dial(url).await?;
        let mut session = WsSession {
            url: url.to_string(),
            stream: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            identity: String::new(),
            server_version: String::new(),
            versions: BTreeMap::new(),
        };

        if let Err(e) = session.authenticate(credentials, facades).await {
            let _ = session.close().await;
            return Err(e);
        }

        crate::log_debug!(
            target: "rpc",
            "logged in to {} as {} (server {})",
            session.url,
            session.identity,
            session.server_version
        );
        Ok(session)
    }
}

/* ---- Session ---- */

pub struct WsSession {
    url: String,
    stream: Mutex<WsStream>,
    next_id: AtomicU64,
    identity: String,
    server_version: String,
    versions: BTreeMap<Facade, u32>,
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("url", &self.url)
            .field("identity", &self.identity)
            .field("server_version", &self.server_version)
            .field("versions", &self.versions)
            .finish_non_exhaustive()
    }
}

impl WsSession {
    async fn authenticate(&mut self, credentials: &Credentials, facades: &[Facade]) -> Result<()> {
        let params = serde_json::json!({
            "auth-tag": credentials.auth_tag(),
            "credentials": credentials.password,
            "client-version": CLIENT_VERSION,
        });
        let reply = self
            .round_trip("Admin", ADMIN_VERSION, "Login", params)
            .await
            .map_err(|e| match e {
                Error::Rpc { message, .. } => Error::Login {
                    url: self.url.clone(),
                    reason: message,
                },
                other => other,
            })?;

        let result: LoginResult =
            serde_json::from_value(reply).map_err(|source| Error::Decode {
                facade: "Admin",
                request: "Login".into(),
                source,
            })?;

        self.versions = negotiate(facades, result.facades.as_deref().unwrap_or_default())?;
        self.identity = result
            .user_info
            .map(|u| u.identity)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| credentials.auth_tag());
        self.server_version = result.server_version;
        Ok(())
    }

    async fn round_trip(
        &self,
        facade: &'static str,
        version: u32,
        request: &str,
        params: Value,
    ) -> Result<Value> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(&RequestEnvelope {
            request_id,
            facade,
            version,
            request,
            params,
        })
        .map_err(|source| Error::Decode {
            facade,
            request: request.to_string(),
            source,
        })?;

        crate::log_trace!(target: "rpc", "-> {} {}.{} v{}", request_id, facade, request, version);

        let mut ws = self.stream.lock().await;
        ws.send(Message::Text(body))
            .await
            .map_err(|e| self.transport_error(e))?;

        loop {
            let msg = ws
                .next()
                .await
                .ok_or_else(|| self.transport_error("connection closed"))?
                .map_err(|e| self.transport_error(e))?;

            let text = match msg {
                Message::Text(text) => text,
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return Err(self.transport_error("connection closed by server")),
                _ => return Err(self.transport_error("unexpected non-text frame")),
            };

            let envelope: ResponseEnvelope =
                serde_json::from_str(&text).map_err(|source| Error::Decode {
                    facade,
                    request: request.to_string(),
                    source,
                })?;
            if envelope.request_id != request_id {
                crate::log_debug!(
                    target: "rpc",
                    "skipping reply {} while waiting for {}",
                    envelope.request_id,
                    request_id
                );
                continue;
            }

            crate::log_trace!(target: "rpc", "<- {} {}.{}", request_id, facade, request);

            if let Some(message) = envelope.error.filter(|e| !e.is_empty()) {
                return Err(Error::Rpc {
                    facade,
                    request: request.to_string(),
                    message,
                    code: envelope.error_code.filter(|c| !c.is_empty()),
                });
            }
            return Ok(envelope.response);
        }
    }

    fn transport_error(&self, reason: impl std::fmt::Display) -> Error {
        Error::Connection {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ApiSession for WsSession {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn call(&self, facade: Facade, request: &str, params: Value) -> Result<Value> {
        let version = *self
            .versions
            .get(&facade)
            .ok_or(Error::FacadeUnavailable(facade.name()))?;
        self.round_trip(facade.name(), version, request, params)
            .await
    }

    async fn close(self) -> Result<()> {
        let url = self.url;
        let mut ws = self.stream.into_inner();
        match ws.close(None).await {
            Ok(()) => {}
            // the peer may already have sent its own Close frame
            Err(
                tungstenite::Error::ConnectionClosed
                | tungstenite::Error::AlreadyClosed
                | tungstenite::Error::Protocol(ProtocolError::SendAfterClosing),
            ) => {}
            Err(e) => {
                return Err(Error::Connection {
                    url,
                    reason: e.to_string(),
                });
            }
        }
        crate::log_debug!(target: "rpc", "closed {}", url);
        Ok(())
    }
}

fn connection_error(url: &Url, reason: impl std::fmt::Display) -> Error {
    Error::Connection {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;

    type ServerWs = WebSocketStream<TcpStream>;

    fn advertised(raw: Value) -> Vec<FacadeVersions> {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn negotiate_picks_newest_common_version() {
        let offered = advertised(json!([
            {"name": "Client", "versions": [6, 7]},
            {"name": "Charms", "versions": [5, 6, 7, 8]},
            {"name": "Action", "versions": [7]}
        ]));
        let chosen = negotiate(Facade::MODEL, &offered).unwrap();
        assert_eq!(chosen[&Facade::Client], 7);
        assert_eq!(chosen[&Facade::Charms], 7);
        assert_eq!(chosen[&Facade::Action], 7);
    }

    #[test]
    fn negotiate_fails_on_missing_facade() {
        let offered = advertised(json!([{"name": "Client", "versions": [6]}]));
        let err = negotiate(Facade::CONTROLLER, &offered).unwrap_err();
        assert!(matches!(err, Error::FacadeUnavailable("ModelManager")));
    }

    #[test]
    fn negotiate_fails_without_common_version() {
        let offered = advertised(json!([{"name": "ModelManager", "versions": [2, 3]}]));
        assert!(negotiate(Facade::CONTROLLER, &offered).is_err());
    }

    #[test]
    fn request_envelope_uses_wire_names() {
        let body = serde_json::to_value(RequestEnvelope {
            request_id: 4,
            facade: "Client",
            version: 6,
            request: "FullStatus",
            params: json!({"patterns": []}),
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "request-id": 4,
                "type": "Client",
                "version": 6,
                "request": "FullStatus",
                "params": {"patterns": []}
            })
        );
    }

    #[test]
    fn response_envelope_error_fields() {
        let env: ResponseEnvelope = serde_json::from_value(json!({
            "request-id": 2,
            "error": "invalid entity name or password",
            "error-code": "unauthorized access",
            "response": {}
        }))
        .unwrap();
        assert_eq!(env.request_id, 2);
        assert_eq!(env.error.as_deref(), Some("invalid entity name or password"));
        assert_eq!(env.error_code.as_deref(), Some("unauthorized access"));
    }

    #[test]
    fn login_result_reads_identity_and_facades() {
        let result: LoginResult = serde_json::from_value(json!({
            "user-info": {"identity": "user-admin", "display-name": ""},
            "facades": [{"name": "ModelManager", "versions": [9, 10]}],
            "server-version": "3.4.2"
        }))
        .unwrap();
        assert_eq!(result.user_info.unwrap().identity, "user-admin");
        assert_eq!(result.facades.unwrap().len(), 1);
        assert_eq!(result.server_version, "3.4.2");
    }

    /* ---- In-process controller ---- */

    /// Accepts one WebSocket client on a loopback port and hands it to `script`.
    async fn mock_controller<F, Fut, T>(script: F) -> (Url, JoinHandle<T>)
    where
        F: FnOnce(ServerWs) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            script(ws).await
        });
        (Url::parse(&format!("ws://{addr}/api")).unwrap(), handle)
    }

    async fn next_request(ws: &mut ServerWs) -> Value {
        loop {
            if let Message::Text(text) = ws.next().await.unwrap().unwrap() {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn reply(ws: &mut ServerWs, body: Value) {
        ws.send(Message::Text(body.to_string())).await.unwrap();
    }

    /// Reads until the client's Close frame arrives or the socket ends.
    async fn saw_close(ws: &mut ServerWs) -> bool {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Close(_)) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        false
    }

    fn request_id(request: &Value) -> u64 {
        request["request-id"].as_u64().unwrap()
    }

    fn login_ok(id: u64, facades: Value) -> Value {
        json!({"request-id": id, "response": {
            "user-info": {"identity": "user-admin", "display-name": ""},
            "facades": facades,
            "server-version": "3.4.2"
        }})
    }

    fn model_manager() -> Value {
        json!([{"name": "ModelManager", "versions": [9, 10]}])
    }

    async fn login(url: &Url, password: &str) -> Result<WsSession> {
        WsConnector::new(false)
            .login(url, &Credentials::new("admin", password), Facade::CONTROLLER)
            .await
    }

    #[tokio::test]
    async fn login_then_call_skips_stale_replies() {
        let (url, server) = mock_controller(|mut ws| async move {
            let login = next_request(&mut ws).await;
            assert_eq!(login["type"], "Admin");
            assert_eq!(login["version"], ADMIN_VERSION);
            assert_eq!(login["request"], "Login");
            assert_eq!(
                login["params"],
                json!({"auth-tag": "user-admin", "credentials": "test", "client-version": CLIENT_VERSION})
            );
            reply(&mut ws, login_ok(request_id(&login), model_manager())).await;

            let call = next_request(&mut ws).await;
            assert_eq!(call["type"], "ModelManager");
            assert_eq!(call["version"], 10);
            let id = request_id(&call);
            assert_ne!(id, request_id(&login));
            reply(&mut ws, json!({"request-id": id + 40, "response": {"stale": true}})).await;
            reply(&mut ws, json!({"request-id": id, "response": {"user-models": []}})).await;
            saw_close(&mut ws).await
        })
        .await;

        let session = login(&url, "test").await.unwrap();
        assert_eq!(session.identity(), "user-admin");
        let got = session
            .call(Facade::ModelManager, "ListModels", json!({"tag": "user-admin"}))
            .await
            .unwrap();
        assert_eq!(got, json!({"user-models": []}));
        session.close().await.unwrap();
        assert!(server.await.unwrap(), "server never saw a Close frame");
    }

    #[tokio::test]
    async fn error_envelope_becomes_rpc_error() {
        let (url, server) = mock_controller(|mut ws| async move {
            let login = next_request(&mut ws).await;
            reply(&mut ws, login_ok(request_id(&login), model_manager())).await;
            let call = next_request(&mut ws).await;
            reply(
                &mut ws,
                json!({"request-id": request_id(&call), "error": "permission denied", "error-code": "unauthorized access", "response": {}}),
            )
            .await;
            saw_close(&mut ws).await
        })
        .await;

        let session = login(&url, "test").await.unwrap();
        let err = session
            .call(Facade::ModelManager, "ListModels", json!({}))
            .await
            .unwrap_err();
        match err {
            Error::Rpc { facade, request, message, code } => {
                assert_eq!(facade, "ModelManager");
                assert_eq!(request, "ListModels");
                assert_eq!(message, "permission denied");
                assert_eq!(code.as_deref(), Some("unauthorized access"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        session.close().await.unwrap();
        assert!(server.await.unwrap());
    }

    #[tokio::test]
    async fn rejected_login_closes_the_socket() {
        let (url, server) = mock_controller(|mut ws| async move {
            let login = next_request(&mut ws).await;
            reply(
                &mut ws,
                json!({"request-id": request_id(&login), "error": "invalid entity name or password", "error-code": "unauthorized access"}),
            )
            .await;
            saw_close(&mut ws).await
        })
        .await;

        let err = login(&url, "wrong").await.unwrap_err();
        assert!(
            matches!(&err, Error::Login { reason, .. } if reason == "invalid entity name or password"),
            "{err:?}"
        );
        assert!(server.await.unwrap(), "failed login left the socket open");
    }

    #[tokio::test]
    async fn missing_facade_fails_login_and_closes() {
        let (url, server) = mock_controller(|mut ws| async move {
            let login = next_request(&mut ws).await;
            reply(
                &mut ws,
                login_ok(request_id(&login), json!([{"name": "Client", "versions": [6]}])),
            )
            .await;
            saw_close(&mut ws).await
        })
        .await;

        let err = login(&url, "test").await.unwrap_err();
        assert!(matches!(err, Error::FacadeUnavailable("ModelManager")), "{err:?}");
        assert!(server.await.unwrap());
    }

    #[tokio::test]
    async fn server_close_mid_call_is_a_connection_error() {
        let (url, server) = mock_controller(|mut ws| async move {
            let login = next_request(&mut ws).await;
            reply(&mut ws, login_ok(request_id(&login), model_manager())).await;
            let _call = next_request(&mut ws).await;
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let session = login(&url, "test").await.unwrap();
        let err = session
            .call(Facade::ModelManager, "ListModels", json!({}))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, Error::Connection { reason, .. } if reason.contains("closed by server")),
            "{err:?}"
        );
        session.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn dial_failure_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("ws://{addr}/api")).unwrap();
        let err = login(&url, "test").await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }), "{err:?}");
    }
}
