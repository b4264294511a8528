use std::sync::atomic::{AtomicBool, Ordering};

use crate::artifact::{ArtifactBinding, ProducerId};
use crate::dependency::ExcludeRule;
use crate::error::{Error, Result};
use crate::notation::Declared;

/// A named bag of declared dependencies and published artifacts.
///
/// Configurations live inside a [`ConfigurationGraph`](crate::ConfigurationGraph),
/// which owns the inheritance edges between them. Everything here is local
/// to one configuration; inherited views are computed by the graph.
#[derive(Debug)]
pub struct Configuration {
    name: String,
    visible: bool,
    transitive: bool,
    description: Option<String>,
    dependencies: Vec<Declared>,
    artifacts: Vec<ArtifactBinding>,
    excludes: Vec<ExcludeRule>,
    observed: AtomicBool,
}

impl Clone for Configuration {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            visible: self.visible,
            transitive: self.transitive,
            description: self.description.clone(),
            dependencies: self.dependencies.clone(),
            artifacts: self.artifacts.clone(),
            excludes: self.excludes.clone(),
            observed: AtomicBool::new(self.is_observed()),
        }
    }
}

impl Configuration {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            transitive: true,
            description: None,
            dependencies: Vec::new(),
            artifacts: Vec::new(),
            excludes: Vec::new(),
            observed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Own declarations only, in declaration order.
    pub fn dependencies(&self) -> &[Declared] {
        &self.dependencies
    }

    /// Own artifacts only, in declaration order.
    pub fn artifacts(&self) -> &[ArtifactBinding] {
        &self.artifacts
    }

    pub fn excludes(&self) -> &[ExcludeRule] {
        &self.excludes
    }

    /// Whether an effective view including this configuration was read.
    pub fn is_observed(&self) -> bool {
        self.observed.load(Ordering::Acquire)
    }

    pub(crate) fn observe(&self) {
        self.observed.store(true, Ordering::Release);
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn set_transitive(&mut self, transitive: bool) {
        self.transitive = transitive;
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = Some(description);
    }

    /// Already parsed dependencies equal to an existing one are skipped.
    pub(crate) fn insert_all(&mut self, declared: Vec<Declared>) -> usize {
        let mut inserted = 0;
        for declared in declared {
            if let Declared::Resolved(dependency) = &declared {
                let duplicate = self.dependencies.iter().any(|existing| {
                    matches!(existing, Declared::Resolved(existing) if existing == dependency)
                });
                if duplicate {
                    continue;
                }
            }
            self.dependencies.push(declared);
            inserted += 1;
        }
        inserted
    }

    pub(crate) fn add_artifact(&mut self, binding: ArtifactBinding) -> bool {
        if self.artifacts.contains(&binding) {
            return false;
        }
        self.artifacts.push(binding);
        true
    }

    pub(crate) fn remove_artifacts_produced_by(&mut self, producer: &ProducerId) -> usize {
        let before = self.artifacts.len();
        self.artifacts
            .retain(|binding| !binding.is_produced_by(producer));
        before - self.artifacts.len()
    }

    pub(crate) fn exclude(&mut self, rule: ExcludeRule) {
        if !self.excludes.contains(&rule) {
            self.excludes.push(rule);
        }
    }

    pub(crate) fn ensure_mutable(&self, graph_frozen: bool) -> Result<()> {
        if graph_frozen || self.is_observed() {
            return Err(Error::ConfigurationFrozen(self.name.clone()));
        }
        Ok(())
    }
}
