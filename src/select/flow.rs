//! The interactive selection round.
//!
//! ListAll -> AwaitQuery -> ListFiltered -> AwaitCharmChoice
//!   -> CheckActionsAvailable -> AwaitActionChoice -> Done
//!
//! CheckActionsAvailable goes straight to Done when the chosen charm defines
//! no actions. An empty filtered set aborts before the charm menu, and so does
//! a filtered set whose applications carry no charm URL.
//!
//! Lists and notices go to the flow's own writer so a caller can keep stdout
//! for machine-readable output.

use serde::Serialize;
use std::io::Write;

use super::catalog::{self, SelectionSummary};
use super::matcher;
use super::prompt::Prompter;
use crate::cmd::format::{Role, StyleOptions, TableOpts, box_header, color, emoji, table};
use crate::error::{Error, Result};
use crate::juju::ApiSession;
use crate::juju::model::{ActionSpec, Application, CharmDescriptor};

pub const NO_ACTIONS_MESSAGE: &str = "There are no available actions for this charm";

/// The action picked at the end of a round, ready for an executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedAction {
    pub name: String,
    #[serde(flatten)]
    pub spec: ActionSpec,
    pub charm: String,
    pub selection: SelectionSummary,
    pub receivers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Selected(SelectedAction),
    /// The chosen charm defines no actions; not a failure.
    NoActions { charm: String },
}

pub struct SelectionFlow<P: Prompter, W: Write> {
    prompter: P,
    out: W,
    query: Option<String>,
    detailed: bool,
    style: StyleOptions,
}

impl<P: Prompter, W: Write> SelectionFlow<P, W> {
    /// `out` receives the application lists and notices.
    pub fn new(prompter: P, out: W) -> Self {
        Self {
            prompter,
            out,
            query: None,
            detailed: false,
            style: StyleOptions::detect(),
        }
    }

    /// Use `query` instead of asking for one.
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }

    /// Render application lists as a table with charm, base and units.
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    #[cfg(test)]
    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub async fn run<S: ApiSession>(
        &mut self,
        session: &S,
        applications: Vec<Application>,
    ) -> Result<Outcome> {
        // ListAll
        let listing = self.render("Applications", &applications);
        writeln!(self.out, "{listing}")?;

        // AwaitQuery
        let query = match self.query.take() {
            Some(q) => q,
            None => self.prompter.input("Search:")?,
        };

        // ListFiltered
        let filtered = matcher::search(&applications, &query);
        let listing = self.render(&format!("Matching '{}'", query.trim()), &filtered);
        writeln!(self.out, "{listing}")?;
        if filtered.is_empty() {
            return Err(Error::NoMatchingApplications(query.trim().to_string()));
        }

        // AwaitCharmChoice
        crate::log_info!("Running an action...");
        let charms = catalog::build(session, &filtered).await?;
        if charms.is_empty() {
            return Err(Error::NoCharms(query.trim().to_string()));
        }
        let labels: Vec<String> = charms.iter().map(CharmDescriptor::label).collect();
        let choice = self
            .prompter
            .select("Choose applications of charm:", &labels)?;
        let charm = pick(&charms, choice)?;

        // CheckActionsAvailable
        let Some(specs) = charm.action_specs() else {
            writeln!(
                self.out,
                "{} {}",
                emoji("info", &self.style),
                color(Role::Warning, NO_ACTIONS_MESSAGE, &self.style)
            )?;
            return Ok(Outcome::NoActions {
                charm: charm.url.clone(),
            });
        };

        // AwaitActionChoice
        let selection = catalog::selection_summary(&filtered, &charm.url);
        let names: Vec<String> = specs.keys().cloned().collect();
        let choice = self.prompter.select(&selection.to_string(), &names)?;
        let name = pick(&names, choice)?.clone();
        let spec = specs.get(&name).cloned().unwrap_or_default();

        // Done
        Ok(Outcome::Selected(SelectedAction {
            name,
            spec,
            charm: charm.url.clone(),
            selection,
            receivers: catalog::receivers(&filtered, &charm.url),
        }))
    }

    fn render(&self, title: &str, applications: &[Application]) -> String {
        let header = box_header(
            format!("{} {title} ({})", emoji("list", &self.style), applications.len()),
            None::<&str>,
            &self.style,
        );
        if applications.is_empty() {
            let none = color(
                Role::Dim,
                format!("{} (none)", emoji("info", &self.style)),
                &self.style,
            );
            return format!("{header}\n{none}");
        }

        if !self.detailed {
            let lines: Vec<String> = applications
                .iter()
                .map(|a| format!("\t- {}", a.name))
                .collect();
            return format!("{header}\n{}", lines.join("\n"));
        }

        let rows: Vec<Vec<String>> = applications
            .iter()
            .map(|a| {
                vec![
                    a.name.clone(),
                    a.charm.clone(),
                    a.base_label(),
                    a.unit_count().to_string(),
                ]
            })
            .collect();
        let tbl = table(
            &["NAME", "CHARM", "BASE", "UNITS"],
            &rows,
            TableOpts {
                max_width: self.style.term_width,
                ..TableOpts::default()
            },
            &self.style,
        );
        format!("{header}\n{tbl}")
    }
}

fn pick<T>(items: &[T], index: usize) -> Result<&T> {
    items.get(index).ok_or_else(|| {
        Error::Prompt(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("selection {index} out of range"),
        ))
    })
}
