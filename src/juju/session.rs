//! Controller-then-model session orchestration.
//!
//! Each session is opened, used and closed in one block; the close runs on
//! every exit path and its error only surfaces when the body succeeded. The
//! controller session is always gone before a model session is dialed.

use std::io::Write;

use super::model::ModelSummary;
use super::{ApiSession, Connector, Credentials, Endpoint, Facade, facade};
use crate::error::{Error, Result};
use crate::select::flow::{Outcome, SelectionFlow};
use crate::select::inventory;
use crate::select::prompt::Prompter;

pub struct SessionOrchestrator<C: Connector> {
    connector: C,
    endpoint: Endpoint,
    credentials: Credentials,
}

impl<C: Connector> SessionOrchestrator<C> {
    pub fn new(connector: C, endpoint: Endpoint, credentials: Credentials) -> Self {
        Self {
            connector,
            endpoint,
            credentials,
        }
    }

    /// Run `body` against a controller session with only `ModelManager`.
    pub async fn with_controller<T, F>(&self, body: F) -> Result<T>
    where
        F: AsyncFnOnce(&C::Session) -> Result<T>,
    {
        let url = self.endpoint.controller_url()?;
        let session = self
            .connector
            .login(&url, &self.credentials, Facade::CONTROLLER)
            .await?;
        crate::log_debug!(target: "session", "controller session open: {}", url);

        let result = body(&session).await;
        let closed = session.close().await;
        crate::log_debug!(target: "session", "controller session closed: {}", url);
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Run `body` against a session scoped to `model`.
    pub async fn with_model<T, F>(&self, model: &ModelSummary, body: F) -> Result<T>
    where
        F: AsyncFnOnce(&C::Session) -> Result<T>,
    {
        let url = self.endpoint.model_url(&model.uuid)?;
        let session = self
            .connector
            .login(&url, &self.credentials, Facade::MODEL)
            .await?;
        crate::log_debug!(target: "session", "model session open: {} ({})", model.name, url);

        let result = body(&session).await;
        let closed = session.close().await;
        crate::log_debug!(target: "session", "model session closed: {}", model.name);
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Models owned by the logged-in identity.
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        self.with_controller(async |controller: &C::Session| facade::list_models(controller).await)
            .await
    }

    /// Look a model up by name on the controller, then release the controller.
    pub async fn resolve_model(&self, name: &str) -> Result<ModelSummary> {
        self.with_controller(async |controller: &C::Session| {
            let models = facade::list_models(controller).await?;
            pick_model(models, name)
        })
        .await
    }

    /// The full interactive round: resolve, fetch inventory, run the flow.
    /// Returns the model as the controller names it, with the outcome.
    pub async fn run<P: Prompter, W: Write>(
        &self,
        model_name: &str,
        flow: &mut SelectionFlow<P, W>,
    ) -> Result<(ModelSummary, Outcome)> {
        let model = self.resolve_model(model_name).await?;
        crate::log_info!(target: "session", "using model {} ({})", model.name, model.uuid);

        let outcome = self
            .with_model(&model, async |session: &C::Session| {
                let applications = inventory::fetch(session).await?;
                flow.run(session, applications).await
            })
            .await?;
        Ok((model, outcome))
    }
}

/// Case-insensitive exact name match; no fallback.
pub fn pick_model(models: Vec<ModelSummary>, name: &str) -> Result<ModelSummary> {
    let wanted = name.trim().to_lowercase();
    models
        .into_iter()
        .find(|m| m.name.to_lowercase() == wanted)
        .ok_or_else(|| Error::ModelNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juju::fake::{FakeConnector, FakeState, model};
    use crate::juju::parse_endpoint;
    use crate::select::prompt::ScriptedPrompter;
    use serde_json::json;

    fn orchestrator(state: FakeState) -> SessionOrchestrator<FakeConnector> {
        SessionOrchestrator::new(
            FakeConnector::new(state),
            parse_endpoint("ws://localhost:46261").unwrap(),
            Credentials::new("admin", "test"),
        )
    }

    fn state_with_models() -> FakeState {
        FakeState {
            password: "test".into(),
            models: vec![model("controller", "uuid-ctl"), model("Tests", "uuid-tests")],
            ..Default::default()
        }
    }

    #[test]
    fn pick_model_is_case_insensitive() {
        let models = vec![model("Tests", "u1")];
        assert_eq!(pick_model(models, "tests").unwrap().uuid, "u1");
    }

    #[test]
    fn pick_model_is_exact() {
        let models = vec![model("tests-old", "u1")];
        let err = pick_model(models, "tests").unwrap_err();
        assert!(matches!(err, Error::ModelNotFound(n) if n == "tests"));
    }

    #[tokio::test]
    async fn resolve_closes_controller() {
        let orch = orchestrator(state_with_models());
        let found = orch.resolve_model("tests").await.unwrap();
        assert_eq!(found.uuid, "uuid-tests");
        assert_eq!(
            orch.connector.state.events(),
            vec![
                "login /api",
                "call /api ModelManager.ListModels",
                "close /api",
            ]
        );
    }

    #[tokio::test]
    async fn missing_model_still_closes_controller() {
        let orch = orchestrator(state_with_models());
        let err = orch.resolve_model("staging").await.unwrap_err();
        assert!(matches!(err, Error::ModelNotFound(_)));
        assert_eq!(orch.connector.state.events().last().unwrap(), "close /api");
    }

    #[tokio::test]
    async fn bad_password_fails_login() {
        let orch = SessionOrchestrator::new(
            FakeConnector::new(state_with_models()),
            parse_endpoint("ws://localhost:46261").unwrap(),
            Credentials::new("admin", "wrong"),
        );
        let err = orch.list_models().await.unwrap_err();
        assert!(matches!(err, Error::Login { .. }));
    }

    #[tokio::test]
    async fn controller_session_cannot_reach_model_facades() {
        let orch = orchestrator(state_with_models());
        let err = orch
            .with_controller(async |s: &crate::juju::fake::FakeSession| {
                s.call(Facade::Client, "FullStatus", json!({})).await
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FacadeUnavailable("Client")));
    }

    #[tokio::test]
    async fn run_closes_controller_before_model_login_and_model_on_early_exit() {
        let mut state = state_with_models();
        state.status = json!({"applications": {
            "ntp": {"charm": "ch:amd64/ntp-5", "base": {"name": "ubuntu", "channel": "22.04"},
                    "units": {"ntp/0": {}}}
        }});
        state
            .charms
            .insert("ch:amd64/ntp-5".into(), json!({"url": "ch:amd64/ntp-5", "revision": 5, "meta": {"name": "ntp"}}));
        let orch = orchestrator(state);

        let mut flow = SelectionFlow::new(ScriptedPrompter::new(["ntp"], [0]), std::io::sink());
        let (model, outcome) = orch.run("TESTS", &mut flow).await.unwrap();
        assert!(matches!(outcome, Outcome::NoActions { .. }));
        assert_eq!(model.name, "Tests");
        assert_eq!(model.uuid, "uuid-tests");

        let events = orch.connector.state.events();
        let ctl_close = events.iter().position(|e| e == "close /api").unwrap();
        let model_login = events
            .iter()
            .position(|e| e == "login /model/uuid-tests/api")
            .unwrap();
        assert!(ctl_close < model_login);
        assert_eq!(events.last().unwrap(), "close /model/uuid-tests/api");
    }

    #[tokio::test]
    async fn run_closes_model_session_on_error() {
        let mut state = state_with_models();
        state.status = json!({"applications": {
            "ntp": {"charm": "ch:amd64/ntp-5", "units": {}}
        }});
        let orch = orchestrator(state);

        let mut flow = SelectionFlow::new(ScriptedPrompter::new(["ntp"], [0]), std::io::sink());
        let err = orch.run("tests", &mut flow).await.unwrap_err();
        assert!(matches!(err, Error::CharmFetch { .. }));
        assert_eq!(
            orch.connector.state.events().last().unwrap(),
            "close /model/uuid-tests/api"
        );
    }
}
