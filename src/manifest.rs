//! Declarative configuration graphs.
//!
//! ```json
//! {
//!   "settings": { "root": "." },
//!   "configurations": {
//!     "compile": { "dependencies": ["org.example:lib:1.0"] },
//!     "runtime": {
//!       "extendsFrom": ["compile"],
//!       "dependencies": [{ "files": ["lib/*.jar"] }],
//!       "exclude": [{ "group": "commons-logging" }]
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use camino::Utf8Path;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::dependency::ExcludeRule;
use crate::error::{Error, Result};
use crate::graph::ConfigurationGraph;
use crate::notation::Notation;
use crate::settings::Settings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigurationManifest {
    pub visible: Option<bool>,
    pub transitive: Option<bool>,
    pub description: Option<String>,
    pub extends_from: Vec<String>,
    /// Raw notations, see [`Notation::from_value`].
    pub dependencies: Vec<Value>,
    pub exclude: Vec<ExcludeRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub settings: Option<Settings>,
    pub configurations: BTreeMap<String, ConfigurationManifest>,
}

impl FromStr for Manifest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl Manifest {
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    /// Declares everything in the manifest on an existing graph.
    ///
    /// Every notation is checked before the graph is touched. Configurations
    /// are created first, then linked, then filled, so the order inside the
    /// file does not matter.
    pub fn apply(&self, graph: &ConfigurationGraph) -> Result<()> {
        let mut notations = BTreeMap::new();
        for (name, manifest) in &self.configurations {
            let parsed = manifest
                .dependencies
                .iter()
                .map(Notation::from_value)
                .collect::<Result<Vec<_>>>()?;
            notations.insert(name.as_str(), parsed);
        }

        for (name, manifest) in &self.configurations {
            let configuration = graph.maybe_create(name)?;
            if let Some(visible) = manifest.visible {
                configuration.set_visible(visible)?;
            }
            if let Some(transitive) = manifest.transitive {
                configuration.set_transitive(transitive)?;
            }
            if let Some(description) = &manifest.description {
                configuration.set_description(description.clone())?;
            }
            for rule in &manifest.exclude {
                configuration.exclude(rule.clone())?;
            }
        }

        for (name, manifest) in &self.configurations {
            for parent in &manifest.extends_from {
                graph.extends_from(name, parent)?;
            }
        }

        for (name, notations) in notations {
            if !notations.is_empty() {
                graph.get(name)?.dependencies().bundle(notations)?;
            }
        }

        debug!(configurations = self.configurations.len(), "applied manifest");
        Ok(())
    }

    /// Builds a fresh graph from the manifest and its own settings.
    pub fn into_graph(self) -> Result<ConfigurationGraph> {
        let graph = ConfigurationGraph::new(self.settings.clone().unwrap_or_default());
        self.apply(&graph)?;
        Ok(graph)
    }
}
