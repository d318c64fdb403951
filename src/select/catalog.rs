//! Charm catalog for a set of applications.
//!
//! Charm URLs are deduplicated before anything goes on the wire, then every
//! distinct descriptor is fetched concurrently. One failed fetch fails the
//! whole catalog.

use futures::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::juju::model::{Application, CharmDescriptor};
use crate::juju::{ApiSession, facade};

/// Distinct, non-empty charm URLs in sorted order.
pub fn distinct_charms(applications: &[Application]) -> BTreeSet<&str> {
    applications
        .iter()
        .map(|a| a.charm.as_str())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Fetch one descriptor per distinct charm URL. Output follows URL order.
pub async fn build<S: ApiSession>(
    session: &S,
    applications: &[Application],
) -> Result<Vec<CharmDescriptor>> {
    let urls = distinct_charms(applications);
    crate::log_debug!(
        target: "select",
        "fetching {} charm descriptor(s) for {} application(s)",
        urls.len(),
        applications.len()
    );

    let fetches = urls.into_iter().map(|url| async move {
        facade::charm_info(session, url)
            .await
            .map_err(|e| Error::CharmFetch {
                url: url.to_string(),
                source: Box::new(e),
            })
    });
    try_join_all(fetches).await
}

/// How many of `applications` run `charm_url`, and their total units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub applications: usize,
    pub units: usize,
}

impl fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applications ({} units) selected",
            self.applications, self.units
        )
    }
}

pub fn selection_summary(applications: &[Application], charm_url: &str) -> SelectionSummary {
    applications
        .iter()
        .filter(|a| a.charm == charm_url)
        .fold(
            SelectionSummary {
                applications: 0,
                units: 0,
            },
            |acc, a| SelectionSummary {
                applications: acc.applications + 1,
                units: acc.units + a.unit_count(),
            },
        )
}

/// Unit names of the applications running `charm_url`.
pub fn receivers(applications: &[Application], charm_url: &str) -> Vec<String> {
    applications
        .iter()
        .filter(|a| a.charm == charm_url)
        .flat_map(|a| a.unit_names().map(str::to_string))
        .collect()
}
