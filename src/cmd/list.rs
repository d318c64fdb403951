/*!
`list.rs`

Implements the non-interactive `list` subcommand.

  models        ModelManager.ListModels on a controller session
  applications  FullStatus of the selected model, filtered by --query
  charms        catalog (one CharmInfo per distinct URL) of the matched apps
  actions       (charm, action, description) rows from that catalog

An empty --query matches everything. Unlike `run`, an empty match is not an
error here; the listing just shows zero rows.

JSON Output Shape (charms):
{
  "status": "ok",
  "subject": "charms",
  "model": "tests",
  "query": "word",
  "elapsed_ms": 42,
  "count": 1,
  "charms": [
    { "url": "cs:wordpress-3", "name": "wordpress", "revision": 3,
      "applications": 1, "units": 2, "actions": ["restart"] }
  ]
}
*/

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};
use std::time::Instant;

use crate::cmd::format::{Role, StyleOptions, TableOpts, box_header, color, emoji, table};
use crate::cmd::shared::{
    application_rows, matched_applications, model_rows, orchestrator, runtime,
};
use crate::cmd::subject::Subject;
use crate::config::Config;
use crate::juju::Connector;
use crate::juju::model::{Application, CharmDescriptor, ModelSummary};
use crate::juju::session::SessionOrchestrator;
use crate::select::{catalog, inventory, matcher};

/// CLI arguments for `juju-act list <subject>`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Subject to list (models|applications|charms|actions)
    pub subject: Subject,

    /// Fuzzy filter applied to applications (empty = all)
    #[arg(long, value_name = "QUERY", default_value = "")]
    pub query: String,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Entry point for the list subcommand.
pub fn execute_list(args: ListArgs, config: &Config) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(list(args, config))
}

/// Rows and JSON payload for one subject.
struct Listing {
    /// The resolved model; `None` for controller-wide subjects.
    model: Option<ModelSummary>,
    headers: &'static [&'static str],
    rows: Vec<Vec<String>>,
    payload: Value,
}

async fn list(args: ListArgs, config: &Config) -> Result<()> {
    let orch = orchestrator(config);
    let started = Instant::now();
    let listing = collect(&orch, args.subject, &args.query, config).await?;
    let elapsed_ms = started.elapsed().as_millis();

    if args.json {
        println!("{}", listing_json(&listing, args.subject, &args.query, elapsed_ms));
        return Ok(());
    }

    let style = StyleOptions::detect();
    let subtitle = match &listing.model {
        None => format!("{} • {elapsed_ms} ms", config.endpoint),
        Some(model) => {
            let mut subtitle = format!("model={}", model.name);
            if !args.query.trim().is_empty() {
                subtitle.push_str(&format!(" • query='{}'", args.query.trim()));
            }
            subtitle.push_str(&format!(" • {elapsed_ms} ms"));
            subtitle
        }
    };
    let tag = if args.subject.needs_model() { "list" } else { "model" };
    let title = format!("{} {}", emoji(tag, &style), capitalize(&args.subject.to_string()));
    println!(
        "{}",
        render(&title, &subtitle, listing.headers, listing.rows, &style)
    );
    Ok(())
}

async fn collect<C: Connector>(
    orch: &SessionOrchestrator<C>,
    subject: Subject,
    query: &str,
    config: &Config,
) -> Result<Listing> {
    let listing = match subject {
        Subject::Models => {
            let models = orch.list_models().await.context("Failed to list models")?;
            Listing {
                model: None,
                headers: &["NAME", "TYPE", "OWNER", "UUID"],
                rows: model_rows(&models),
                payload: json!({ "count": models.len(), "models": models }),
            }
        }
        Subject::Applications => {
            let model = resolve(orch, config).await?;
            let apps = matched_applications(orch, &model, query)
                .await
                .context("Failed to list applications")?;
            Listing {
                model: Some(model),
                headers: &["NAME", "CHARM", "BASE", "UNITS"],
                rows: application_rows(&apps),
                payload: json!({ "count": apps.len(), "applications": apps }),
            }
        }
        Subject::Charms => {
            let model = resolve(orch, config).await?;
            let (apps, charms) = charm_catalog(orch, &model, query)
                .await
                .context("Failed to list charms")?;
            Listing {
                model: Some(model),
                headers: &["CHARM", "URL", "APPS", "UNITS", "ACTIONS"],
                rows: charm_rows(&apps, &charms),
                payload: json!({ "count": charms.len(), "charms": charms_json(&apps, &charms) }),
            }
        }
        Subject::Actions => {
            let model = resolve(orch, config).await?;
            let (_, charms) = charm_catalog(orch, &model, query)
                .await
                .context("Failed to list actions")?;
            let rows = action_rows(&charms);
            let actions: Vec<Value> = rows
                .iter()
                .map(|r| json!({ "charm": r[0], "action": r[1], "description": r[2] }))
                .collect();
            Listing {
                model: Some(model),
                headers: &["CHARM", "ACTION", "DESCRIPTION"],
                rows,
                payload: json!({ "count": actions.len(), "actions": actions }),
            }
        }
    };
    Ok(listing)
}

async fn resolve<C: Connector>(
    orch: &SessionOrchestrator<C>,
    config: &Config,
) -> Result<ModelSummary> {
    let name = config.require_model()?;
    orch.resolve_model(name)
        .await
        .with_context(|| format!("Failed to resolve model '{name}'"))
}

fn listing_json(listing: &Listing, subject: Subject, query: &str, elapsed_ms: u128) -> Value {
    let mut out = json!({
        "status": "ok",
        "subject": subject.to_string(),
    });
    if let Some(model) = &listing.model {
        out["model"] = json!(model.name);
        out["query"] = json!(query);
    }
    out["elapsed_ms"] = json!(elapsed_ms);
    if let (Some(obj), Some(extra)) = (out.as_object_mut(), listing.payload.as_object()) {
        obj.extend(extra.clone());
    }
    out
}

/// Matched applications plus one descriptor per distinct charm they run.
async fn charm_catalog<C: Connector>(
    orch: &SessionOrchestrator<C>,
    model: &ModelSummary,
    query: &str,
) -> crate::error::Result<(Vec<Application>, Vec<CharmDescriptor>)> {
    orch.with_model(model, async |session: &C::Session| {
        let applications = inventory::fetch(session).await?;
        let matched = matcher::search(&applications, query);
        let charms = catalog::build(session, &matched).await?;
        Ok((matched, charms))
    })
    .await
}

fn render(
    title: &str,
    subtitle: &str,
    headers: &[&str],
    rows: Vec<Vec<String>>,
    style: &StyleOptions,
) -> String {
    let header = box_header(format!("{title} ({})", rows.len()), Some(subtitle), style);
    if rows.is_empty() {
        let none = color(Role::Dim, format!("{} (none)", emoji("info", style)), style);
        return format!("{header}\n{none}");
    }
    let opts = TableOpts {
        max_width: style.term_width,
        ..TableOpts::default()
    };
    format!("{header}\n{}", table(headers, &rows, opts, style))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn charm_rows(applications: &[Application], charms: &[CharmDescriptor]) -> Vec<Vec<String>> {
    charms
        .iter()
        .map(|c| {
            let summary = catalog::selection_summary(applications, &c.url);
            let actions = c.action_specs().map(|s| s.len()).unwrap_or(0);
            vec![
                c.label(),
                c.url.clone(),
                summary.applications.to_string(),
                summary.units.to_string(),
                actions.to_string(),
            ]
        })
        .collect()
}

fn charms_json(applications: &[Application], charms: &[CharmDescriptor]) -> Vec<Value> {
    charms
        .iter()
        .map(|c| {
            let summary = catalog::selection_summary(applications, &c.url);
            let actions: Vec<&String> = c.action_specs().into_iter().flat_map(|s| s.keys()).collect();
            json!({
                "url": c.url,
                "name": c.meta.name,
                "revision": c.revision,
                "applications": summary.applications,
                "units": summary.units,
                "actions": actions,
            })
        })
        .collect()
}

/// One row per (charm, action), charms in catalog order, actions by name.
fn action_rows(charms: &[CharmDescriptor]) -> Vec<Vec<String>> {
    charms
        .iter()
        .flat_map(|c| {
            c.action_specs()
                .into_iter()
                .flatten()
                .map(move |(name, spec)| vec![c.label(), name.clone(), spec.description.clone()])
        })
        .collect()
}
