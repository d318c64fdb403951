/*!
shared.rs - helpers used by more than one subcommand.

  - runtime(): the Tokio runtime every command blocks on
  - orchestrator(): a WebSocket-backed `SessionOrchestrator` from `Config`
  - matched_applications(): resolve model, fetch status, apply the matcher
  - application_rows / model_rows: table rows for human output
*/

use anyhow::{Context, Result};

use crate::config::Config;
use crate::juju::model::{Application, ModelSummary};
use crate::juju::rpc::WsConnector;
use crate::juju::session::SessionOrchestrator;
use crate::juju::Connector;
use crate::select::{inventory, matcher};

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")
}

pub fn orchestrator(config: &Config) -> SessionOrchestrator<WsConnector> {
    crate::log_debug!(
        "controller endpoint {} (configured as '{}'), user {}",
        config.endpoint,
        config.endpoint.original(),
        config.credentials.username
    );
    if config.insecure {
        crate::log_info!("TLS certificate verification disabled");
    }
    SessionOrchestrator::new(
        WsConnector::new(config.insecure),
        config.endpoint.clone(),
        config.credentials.clone(),
    )
}

/// Status of `model`, filtered by `query`. The result may be empty.
pub async fn matched_applications<C: Connector>(
    orchestrator: &SessionOrchestrator<C>,
    model: &ModelSummary,
    query: &str,
) -> crate::error::Result<Vec<Application>> {
    orchestrator
        .with_model(model, async |session: &C::Session| {
            let applications = inventory::fetch(session).await?;
            Ok(matcher::search(&applications, query))
        })
        .await
}

pub fn model_rows(models: &[ModelSummary]) -> Vec<Vec<String>> {
    models
        .iter()
        .map(|m| {
            vec![
                m.name.clone(),
                m.model_type.clone(),
                m.owner_tag.trim_start_matches("user-").to_string(),
                m.uuid.clone(),
            ]
        })
        .collect()
}

pub fn application_rows(applications: &[Application]) -> Vec<Vec<String>> {
    applications
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.charm.clone(),
                a.base_label(),
                a.unit_count().to_string(),
            ]
        })
        .collect()
}
