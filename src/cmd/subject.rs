/*!
Subject enum for the `list` subcommand.

  models        controller-level listing
  applications  status of the selected model, filtered by --query
  charms        distinct charms of the matched applications
  actions       actions defined by those charms
*/

use std::fmt;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subject {
    /// Models visible to the logged-in user
    Models,
    /// Applications deployed in the model
    Applications,
    /// Charms used by the matched applications
    Charms,
    /// Actions offered by those charms
    Actions,
}

impl Subject {
    /// Whether the subject needs a model session (and so a `--model`).
    pub fn needs_model(&self) -> bool {
        !matches!(self, Subject::Models)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Subject::Models => "models",
            Subject::Applications => "applications",
            Subject::Charms => "charms",
            Subject::Actions => "actions",
        };
        f.write_str(s)
    }
}
