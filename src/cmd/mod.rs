/*!
Command dispatcher module.

  src/cmd/
    mod.rs      (this file)
    subject.rs  (Subject enum for `list`)
    run.rs      (RunArgs  + execute_run)
    list.rs     (ListArgs + execute_list)
    shared.rs   (runtime, orchestrator construction, table rows)
    format.rs   (human output primitives)

Conventions:
  - Each subcommand module exposes one public `execute_*` function taking its
    args and the resolved `Config`, returning `anyhow::Result<()>`.
  - Argument structs derive `clap::Args`.
*/

pub mod format;
pub mod list;
pub mod run;
pub mod shared;
pub mod subject;

pub use list::{ListArgs, execute_list};
pub use run::{RunArgs, execute_run};
