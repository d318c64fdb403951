//! Wire records consumed from the Juju API.
//!
//! Only the fields the selection flow reads are modelled; everything else in
//! a response is ignored. Go servers send `null` for empty maps, so map
//! fields go through `null_as_default`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/* ---- Models ---- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub uuid: String,
    #[serde(rename = "type", default)]
    pub model_type: String,
    #[serde(rename = "owner-tag", default)]
    pub owner_tag: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserModel {
    pub model: ModelSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserModelList {
    #[serde(rename = "user-models", default, deserialize_with = "null_as_default")]
    pub user_models: Vec<UserModel>,
}

/* ---- Status ---- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channel: String,
}

/// One deployed application, flattened out of the status `applications` map
/// with its key injected as `name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub charm: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub base: Base,
    #[serde(default, deserialize_with = "null_as_default")]
    pub units: serde_json::Map<String, serde_json::Value>,
}

impl Application {
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// "ubuntu@22.04" style label; empty when the status carries no base.
    pub fn base_label(&self) -> String {
        match (self.base.name.is_empty(), self.base.channel.is_empty()) {
            (true, _) => String::new(),
            (false, true) => self.base.name.clone(),
            (false, false) => format!("{}@{}", self.base.name, self.base.channel),
        }
    }
}

/* ---- Charms ---- */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharmMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharmActions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub specs: BTreeMap<String, ActionSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharmDescriptor {
    pub url: String,
    #[serde(default)]
    pub revision: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: CharmMeta,
    #[serde(default)]
    pub actions: Option<CharmActions>,
}

impl CharmDescriptor {
    /// Menu label: "<name> (<revision>)".
    pub fn label(&self) -> String {
        format!("{} ({})", self.meta.name, self.revision)
    }

    /// Defined actions, `None` when the charm has none (absent or empty).
    pub fn action_specs(&self) -> Option<&BTreeMap<String, ActionSpec>> {
        self.actions
            .as_ref()
            .map(|a| &a.specs)
            .filter(|specs| !specs.is_empty())
    }
}
