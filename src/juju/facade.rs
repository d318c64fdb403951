//! Typed facade calls over any `ApiSession`.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::model::{Application, CharmDescriptor, ModelSummary, UserModelList};
use super::{ApiSession, Facade};
use crate::error::{Error, Result};

async fn call_typed<S, T>(session: &S, facade: Facade, request: &str, params: Value) -> Result<T>
where
    S: ApiSession,
    T: DeserializeOwned,
{
    let reply = session.call(facade, request, params).await?;
    serde_json::from_value(reply).map_err(|source| Error::Decode {
        facade: facade.name(),
        request: request.to_string(),
        source,
    })
}

/// `ModelManager.ListModels` for the session's own identity.
pub async fn list_models<S: ApiSession>(session: &S) -> Result<Vec<ModelSummary>> {
    let params = json!({ "tag": session.identity() });
    let list: UserModelList =
        call_typed(session, Facade::ModelManager, "ListModels", params).await?;
    Ok(list.user_models.into_iter().map(|um| um.model).collect())
}

/// `Client.FullStatus`, reduced to the `applications` map in wire order.
pub async fn full_status<S: ApiSession>(session: &S) -> Result<Vec<Application>> {
    let reply = session
        .call(Facade::Client, "FullStatus", json!({ "patterns": [] }))
        .await?;
    applications_from_status(reply)
}

/// Flatten `{applications: {name: {...}}}` into records carrying `name`.
pub fn applications_from_status(status: Value) -> Result<Vec<Application>> {
    let decode = |source| Error::Decode {
        facade: Facade::Client.name(),
        request: "FullStatus".into(),
        source,
    };

    let Some(entries) = status.get("applications").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    let mut applications = Vec::with_capacity(entries.len());
    for (name, entry) in entries {
        let mut app: Application = serde_json::from_value(entry.clone()).map_err(decode)?;
        app.name = name.clone();
        applications.push(app);
    }
    Ok(applications)
}

/// `Charms.CharmInfo` for one charm URL.
pub async fn charm_info<S: ApiSession>(session: &S, url: &str) -> Result<CharmDescriptor> {
    call_typed(session, Facade::Charms, "CharmInfo", json!({ "url": url })).await
}
