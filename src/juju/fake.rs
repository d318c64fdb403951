//! In-memory controller used by unit tests.
//!
//! Records every login, call and close in order so tests can assert session
//! lifetimes, and counts `CharmInfo` calls per URL.

use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use url::Url;

use super::model::ModelSummary;
use super::{ApiSession, Connector, Credentials, Facade};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct FakeState {
    pub password: String,
    pub models: Vec<ModelSummary>,
    pub status: Value,
    pub charms: BTreeMap<String, Value>,
    pub events: Mutex<Vec<String>>,
    pub charm_calls: Mutex<BTreeMap<String, usize>>,
}

impl FakeState {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn total_charm_calls(&self) -> usize {
        self.charm_calls.lock().unwrap().values().sum()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone)]
pub struct FakeConnector {
    pub state: Arc<FakeState>,
}

impl FakeConnector {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

pub fn model(name: &str, uuid: &str) -> ModelSummary {
    ModelSummary {
        name: name.into(),
        uuid: uuid.into(),
        model_type: "iaas".into(),
        owner_tag: "user-admin".into(),
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn login(
        &self,
        url: &Url,
        credentials: &Credentials,
        facades: &[Facade],
    ) -> Result<FakeSession> {
        self.state.record(format!("login {}", url.path()));
        if credentials.password != self.state.password {
            return Err(Error::Login {
                url: url.to_string(),
                reason: "invalid entity name or password".into(),
            });
        }
        Ok(FakeSession {
            path: url.path().to_string(),
            identity: credentials.auth_tag(),
            facades: facades.to_vec(),
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct FakeSession {
    path: String,
    identity: String,
    facades: Vec<Facade>,
    state: Arc<FakeState>,
}

impl ApiSession for FakeSession {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn call(&self, facade: Facade, request: &str, params: Value) -> Result<Value> {
        if !self.facades.contains(&facade) {
            return Err(Error::FacadeUnavailable(facade.name()));
        }
        self.state
            .record(format!("call {} {}.{}", self.path, facade.name(), request));

        match (facade, request) {
            (Facade::ModelManager, "ListModels") => {
                let user_models: Vec<Value> = self
                    .state
                    .models
                    .iter()
                    .map(|m| json!({ "model": m }))
                    .collect();
                Ok(json!({ "user-models": user_models }))
            }
            (Facade::Client, "FullStatus") => Ok(self.state.status.clone()),
            (Facade::Charms, "CharmInfo") => {
                let url = params.get("url").and_then(Value::as_str).unwrap_or_default();
                *self
                    .state
                    .charm_calls
                    .lock()
                    .unwrap()
                    .entry(url.to_string())
                    .or_default() += 1;
                self.state.charms.get(url).cloned().ok_or_else(|| Error::Rpc {
                    facade: "Charms",
                    request: request.to_string(),
                    message: format!("charm {url} not found"),
                    code: Some("not found".into()),
                })
            }
            _ => Err(Error::Rpc {
                facade: facade.name(),
                request: request.to_string(),
                message: "no such request".into(),
                code: Some("not implemented".into()),
            }),
        }
    }

    async fn close(self) -> Result<()> {
        self.state.record(format!("close {}", self.path));
        Ok(())
    }
}
