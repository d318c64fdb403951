/*!
`run.rs`

Implements the interactive `run` subcommand: resolve the model, show its
applications, ask for a search query, then walk the operator through a charm
and an action choice. The chosen action is printed; nothing is executed.

Only the outcome goes to stdout. With `--json` the lists and menus move to
stderr, so stdout holds exactly one JSON document.

JSON Output Shape (selected):
{
  "status": "selected",
  "model": { "name": "Tests", "uuid": "..." },
  "action": {
    "name": "restart",
    "description": "Restart apache",
    "params": {...},
    "charm": "cs:wordpress-3",
    "selection": { "applications": 1, "units": 2 },
    "receivers": ["wordpress/0", "wordpress/1"]
  }
}

A charm without actions yields `{"status": "no_actions", "model": ..., "charm": ...}`
and a zero exit code.
*/

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};
use std::io::{self, Write};

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::cmd::shared::{orchestrator, runtime};
use crate::config::Config;
use crate::juju::model::ModelSummary;
use crate::juju::Connector;
use crate::juju::session::SessionOrchestrator;
use crate::select::flow::{Outcome, SelectedAction, SelectionFlow};
use crate::select::prompt::{LinePrompter, Prompter};

/// CLI arguments for `juju-act run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Use this search query instead of prompting for one
    #[arg(long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Show charm, base and unit columns in application lists
    #[arg(long)]
    pub wide: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_run(args: RunArgs, config: &Config) -> Result<()> {
    let model_name = config.require_model()?.to_string();
    let orch = orchestrator(config);
    let prompter = LinePrompter::new(io::stdin().lock(), ui_stream(args.json));
    let mut flow = SelectionFlow::new(prompter, ui_stream(args.json))
        .with_query(args.query)
        .detailed(args.wide);

    let rt = runtime()?;
    rt.block_on(run_round(
        &orch,
        &model_name,
        &mut flow,
        args.json,
        &mut io::stdout(),
    ))
}

/// Where menus and lists are drawn.
fn ui_stream(json: bool) -> Box<dyn Write> {
    if json {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    }
}

async fn run_round<C: Connector, P: Prompter, W: Write>(
    orch: &SessionOrchestrator<C>,
    model_name: &str,
    flow: &mut SelectionFlow<P, W>,
    json: bool,
    stdout: &mut impl Write,
) -> Result<()> {
    let (model, outcome) = orch
        .run(model_name, flow)
        .await
        .with_context(|| format!("Action selection in model '{model_name}' failed"))?;

    if json {
        writeln!(stdout, "{}", outcome_json(&model, &outcome))?;
    } else {
        writeln!(stdout, "{}", describe(&outcome, &StyleOptions::detect()))?;
    }
    Ok(())
}

fn outcome_json(model: &ModelSummary, outcome: &Outcome) -> Value {
    let model = json!({"name": model.name, "uuid": model.uuid});
    match outcome {
        Outcome::Selected(action) => json!({
            "status": "selected",
            "model": model,
            "action": action,
        }),
        Outcome::NoActions { charm } => json!({
            "status": "no_actions",
            "model": model,
            "charm": charm,
        }),
    }
}

fn describe(outcome: &Outcome, style: &StyleOptions) -> String {
    match outcome {
        Outcome::NoActions { charm } => color(
            Role::Dim,
            format!("{} nothing selected ({charm})", emoji("info", style)),
            style,
        ),
        Outcome::Selected(action) => describe_action(action, style),
    }
}

fn describe_action(action: &SelectedAction, style: &StyleOptions) -> String {
    let title = format!(
        "{} {} {}",
        emoji("success", style),
        color(Role::Bold, &action.name, style),
        color(Role::Success, "selected", style)
    );
    let mut lines = vec![box_header(title, Some(&action.charm), style)];
    if !action.spec.description.is_empty() {
        lines.push(action.spec.description.clone());
    }
    lines.push(color(Role::Accent, action.selection.to_string(), style));
    for unit in &action.receivers {
        lines.push(format!("  {} {unit}", emoji("action", style)));
    }
    if let Some(props) = action.spec.params.get("properties").and_then(Value::as_object)
        && !props.is_empty()
    {
        let names: Vec<&str> = props.keys().map(String::as_str).collect();
        lines.push(color(
            Role::Secondary,
            format!("params: {}", names.join(", ")),
            style,
        ));
    }
    lines.join("\n")
}
