//! Status retrieval for a model session.

use crate::error::{Error, Result};
use crate::juju::model::Application;
use crate::juju::{ApiSession, facade};

/// One `FullStatus` round trip, flattened to applications in wire order.
pub async fn fetch<S: ApiSession>(session: &S) -> Result<Vec<Application>> {
    let applications = facade::full_status(session)
        .await
        .map_err(|e| Error::StatusFetch(Box::new(e)))?;
    crate::log_debug!(target: "select", "status lists {} application(s)", applications.len());
    Ok(applications)
}
