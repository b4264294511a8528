use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::Direction;
use petgraph::Graph;
use petgraph::algo::has_path_connecting;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::{debug, debug_span, warn};

use crate::artifact::{ArtifactBinding, ProducerId, PublishArtifact};
use crate::collector::DependencyCollector;
use crate::configuration::Configuration;
use crate::dependency::{Dependency, ExcludeRule};
use crate::error::{Error, Result};
use crate::notation::{Declared, DependencyContext, NotationParser};
use crate::plugin::Plugin;
use crate::settings::Settings;

#[derive(Debug, Default)]
struct GraphState {
    /// Edges point from a child to the parent it extends from.
    graph: Graph<Configuration, ()>,
    names: HashMap<String, NodeIndex>,
    plugins: HashSet<&'static str>,
    frozen: bool,
}

impl GraphState {
    fn index(&self, name: &str) -> Result<NodeIndex> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownConfiguration(name.to_string()))
    }

    /// Direct parents in the order the edges were added.
    fn parents(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// The configuration itself followed by every transitive parent, each
    /// visited once.
    fn closure(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }
            order.push(index);
            for parent in self.parents(index).into_iter().rev() {
                if !visited.contains(&parent) {
                    stack.push(parent);
                }
            }
        }

        order
    }
}

/// The registry of every configuration of a project, together with the
/// inheritance edges between them.
///
/// The graph is a cheap, cloneable handle. Lazy values built from it, such
/// as composed classpaths, read the registry when they are evaluated rather
/// than when they are declared, so mutations made in between are visible.
///
/// # Freezing
///
/// Reading an effective view marks the configuration and all of its
/// ancestors as observed. Observed configurations reject further mutation
/// with [`Error::ConfigurationFrozen`], so a consumer can never see a view
/// that silently changes afterwards. [`ConfigurationGraph::freeze`] freezes
/// everything at once. Both can be disabled with
/// [`Settings::freeze_on_read`].
///
/// ```rust
/// use kasane::{ConfigurationGraph, Settings};
///
/// let graph = ConfigurationGraph::new(Settings::default());
/// let compile = graph.create("compile").unwrap();
/// let runtime = graph.create("runtime").unwrap();
/// runtime.extends_from("compile").unwrap();
///
/// compile.dependencies().add("org.example:lib:1.0").unwrap();
/// assert_eq!(runtime.effective_dependencies().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationGraph {
    state: Arc<RwLock<GraphState>>,
    settings: Arc<Settings>,
    parser: NotationParser,
}

impl ConfigurationGraph {
    /// A graph for the root project.
    pub fn new(settings: Settings) -> Self {
        Self::with_context(settings, DependencyContext::default())
    }

    /// A graph for the project described by `context`. Relative project
    /// references are interpreted against it.
    pub fn with_context(settings: Settings, context: DependencyContext) -> Self {
        Self {
            state: Arc::new(RwLock::new(GraphState::default())),
            settings: Arc::new(settings),
            parser: NotationParser::new(context),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn parser(&self) -> &NotationParser {
        &self.parser
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, name: &str) -> ConfigurationHandle {
        ConfigurationHandle {
            graph: self.clone(),
            name: name.into(),
        }
    }

    /// Registers a new configuration.
    pub fn create(&self, name: &str) -> Result<ConfigurationHandle> {
        let mut state = self.write();
        if state.names.contains_key(name) {
            return Err(Error::DuplicateConfigurationName(name.to_string()));
        }
        if state.frozen {
            return Err(Error::ConfigurationFrozen(name.to_string()));
        }

        let index = state.graph.add_node(Configuration::new(name));
        state.names.insert(name.to_string(), index);
        debug!(configuration = name, "created configuration");

        Ok(self.handle(name))
    }

    /// Returns the configuration called `name`, registering it first if it
    /// does not exist yet.
    pub fn maybe_create(&self, name: &str) -> Result<ConfigurationHandle> {
        if self.contains(name) {
            return Ok(self.handle(name));
        }
        self.create(name)
    }

    pub fn get(&self, name: &str) -> Result<ConfigurationHandle> {
        self.read().index(name)?;
        Ok(self.handle(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().names.contains_key(name)
    }

    /// Names of all configurations in creation order.
    pub fn names(&self) -> Vec<String> {
        let state = self.read();
        state
            .graph
            .node_indices()
            .map(|index| state.graph[index].name().to_string())
            .collect()
    }

    /// Makes `child` inherit everything declared in `parent`.
    ///
    /// Fails with [`Error::CyclicInheritance`] if `parent` already extends
    /// from `child`, directly or transitively, in which case the graph is
    /// left untouched. Adding an existing edge again does nothing.
    pub fn extends_from(&self, child: &str, parent: &str) -> Result<()> {
        let mut state = self.write();
        let c = state.index(child)?;
        let p = state.index(parent)?;

        if state.graph.find_edge(c, p).is_some() {
            return Ok(());
        }
        if c == p || has_path_connecting(&state.graph, p, c, None) {
            return Err(Error::CyclicInheritance {
                child: child.to_string(),
                parent: parent.to_string(),
            });
        }
        state.graph[c].ensure_mutable(state.frozen)?;

        state.graph.add_edge(c, p, ());
        debug!(child, parent, "configuration extends from");
        Ok(())
    }

    /// Direct parents of a configuration, in the order they were added.
    pub fn parents(&self, name: &str) -> Result<Vec<String>> {
        let state = self.read();
        let index = state.index(name)?;
        Ok(state
            .parents(index)
            .into_iter()
            .map(|parent| state.graph[parent].name().to_string())
            .collect())
    }

    /// The configuration and all of its transitive parents, each once.
    /// Reading the hierarchy does not freeze anything.
    pub fn hierarchy(&self, name: &str) -> Result<Vec<String>> {
        let state = self.read();
        let index = state.index(name)?;
        Ok(state
            .closure(index)
            .into_iter()
            .map(|index| state.graph[index].name().to_string())
            .collect())
    }

    /// Collects something from the configuration and its ancestors.
    fn collect_effective<T, F>(&self, name: &str, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Configuration) -> Vec<T>,
    {
        let state = self.read();
        let index = state.index(name)?;
        Ok(state
            .closure(index)
            .into_iter()
            .flat_map(|index| f(&state.graph[index]))
            .collect())
    }

    /// Marks the configuration and its ancestors as observed once a view of
    /// them was successfully computed.
    fn observe(&self, name: &str) -> Result<()> {
        if !self.settings.freeze_on_read {
            return Ok(());
        }
        let state = self.read();
        let index = state.index(name)?;
        for index in state.closure(index) {
            state.graph[index].observe();
        }
        Ok(())
    }

    /// The union of the dependencies declared by the configuration and by
    /// every transitive parent.
    ///
    /// Lazy declarations are evaluated here, outside of the registry lock, so
    /// they are free to consult the graph themselves.
    pub fn effective_dependencies(&self, name: &str) -> Result<Vec<Dependency>> {
        let _span = debug_span!("effective_dependencies", configuration = name).entered();

        let declared = self.collect_effective(name, |c| c.dependencies().to_vec())?;

        let mut seen = HashSet::new();
        let mut acc = Vec::new();
        for declared in declared {
            for dependency in declared.evaluate()? {
                if seen.insert(dependency.clone()) {
                    acc.push(dependency);
                }
            }
        }

        self.observe(name)?;
        debug!(count = acc.len(), "computed effective dependencies");
        Ok(acc)
    }

    /// The union of the artifacts published by the configuration and by
    /// every transitive parent.
    pub fn effective_artifacts(&self, name: &str) -> Result<Vec<ArtifactBinding>> {
        let bindings = self.collect_effective(name, |c| c.artifacts().to_vec())?;
        self.observe(name)?;
        Ok(dedup(bindings))
    }

    /// Exclude rules declared by the configuration and inherited from its
    /// parents.
    pub fn effective_excludes(&self, name: &str) -> Result<Vec<ExcludeRule>> {
        let rules = self.collect_effective(name, |c| c.excludes().to_vec())?;
        self.observe(name)?;
        Ok(dedup(rules))
    }

    /// Rejects every further mutation of the graph.
    pub fn freeze(&self) {
        self.write().frozen = true;
        debug!("configuration graph frozen");
    }

    pub fn is_frozen(&self) -> bool {
        self.read().frozen
    }

    /// Inspects a snapshot of a configuration without marking it as
    /// observed. The registry lock is released before `f` runs, so `f` may
    /// call back into the graph.
    pub fn with_configuration<R>(
        &self,
        name: &str,
        f: impl FnOnce(&Configuration) -> R,
    ) -> Result<R> {
        let snapshot = {
            let state = self.read();
            let index = state.index(name)?;
            state.graph[index].clone()
        };
        Ok(f(&snapshot))
    }

    pub(crate) fn mutate<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Configuration) -> R,
    ) -> Result<R> {
        let mut state = self.write();
        let index = state.index(name)?;
        let frozen = state.frozen;
        let configuration = &mut state.graph[index];
        configuration.ensure_mutable(frozen)?;
        Ok(f(configuration))
    }

    /// Applies a plugin once. Applying the same plugin again does nothing.
    pub fn apply(&self, plugin: &Plugin) -> Result<()> {
        if !self.write().plugins.insert(plugin.name()) {
            return Ok(());
        }

        debug!(plugin = plugin.name(), "applying plugin");
        let result = plugin.run(self);
        if result.is_err() {
            self.write().plugins.remove(plugin.name());
        }
        result
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.read().plugins.contains(name)
    }
}

fn dedup<T>(items: Vec<T>) -> Vec<T>
where
    T: Clone + Eq + std::hash::Hash,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

impl Display for ConfigurationGraph {
    /// Renders the inheritance graph as a Mermaid diagram.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        writeln!(f, "graph BT")?;

        for index in state.graph.node_indices() {
            let name = state.graph[index].name().replace('"', "\\\"");
            writeln!(f, "    {}[\"{}\"]", index.index(), name)?;
        }

        for edge in state.graph.edge_references() {
            writeln!(
                f,
                "    {} --> {}",
                edge.source().index(),
                edge.target().index()
            )?;
        }

        Ok(())
    }
}

/// A named configuration inside a [`ConfigurationGraph`].
///
/// Handles are cheap to clone and stay valid for the lifetime of the graph.
#[derive(Debug, Clone)]
pub struct ConfigurationHandle {
    graph: ConfigurationGraph,
    name: Arc<str>,
}

impl ConfigurationHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &ConfigurationGraph {
        &self.graph
    }

    /// Reads the configuration's own state.
    pub fn inspect<R>(&self, f: impl FnOnce(&Configuration) -> R) -> Result<R> {
        self.graph.with_configuration(&self.name, f)
    }

    pub fn set_visible(&self, visible: bool) -> Result<&Self> {
        self.graph.mutate(&self.name, |c| c.set_visible(visible))?;
        Ok(self)
    }

    pub fn set_transitive(&self, transitive: bool) -> Result<&Self> {
        self.graph.mutate(&self.name, |c| c.set_transitive(transitive))?;
        Ok(self)
    }

    pub fn set_description(&self, description: impl Into<String>) -> Result<&Self> {
        let description = description.into();
        self.graph
            .mutate(&self.name, |c| c.set_description(description))?;
        Ok(self)
    }

    pub fn extends_from(&self, parent: &str) -> Result<&Self> {
        self.graph.extends_from(&self.name, parent)?;
        Ok(self)
    }

    pub fn exclude(&self, rule: ExcludeRule) -> Result<&Self> {
        self.graph.mutate(&self.name, |c| c.exclude(rule))?;
        Ok(self)
    }

    /// Entry point for declaring dependencies in this configuration.
    pub fn dependencies(&self) -> DependencyCollector {
        DependencyCollector::new(self.graph.clone(), self.name.clone())
    }

    /// Own declarations, without anything inherited and without evaluating
    /// lazy ones.
    pub fn declared(&self) -> Result<Vec<Declared>> {
        self.inspect(|c| c.dependencies().to_vec())
    }

    pub fn add_artifact(
        &self,
        artifact: PublishArtifact,
        producer: Option<ProducerId>,
    ) -> Result<&Self> {
        let binding = ArtifactBinding::new(artifact, producer);
        let added = self.graph.mutate(&self.name, |c| c.add_artifact(binding))?;
        if added {
            debug!(configuration = %self.name, "added artifact");
        }
        Ok(self)
    }

    /// Removes every artifact built by `producer` and returns how many were
    /// removed. Artifacts from other producers are kept even when they are
    /// otherwise identical.
    pub fn remove_artifacts_produced_by(&self, producer: &ProducerId) -> Result<usize> {
        let removed = self
            .graph
            .mutate(&self.name, |c| c.remove_artifacts_produced_by(producer))?;
        if removed == 0 {
            warn!(configuration = %self.name, %producer, "no artifact produced by this task");
        } else {
            debug!(configuration = %self.name, %producer, removed, "removed artifacts");
        }
        Ok(removed)
    }

    pub fn parents(&self) -> Result<Vec<String>> {
        self.graph.parents(&self.name)
    }

    pub fn effective_dependencies(&self) -> Result<Vec<Dependency>> {
        self.graph.effective_dependencies(&self.name)
    }

    pub fn effective_artifacts(&self) -> Result<Vec<ArtifactBinding>> {
        self.graph.effective_artifacts(&self.name)
    }

    pub fn effective_excludes(&self) -> Result<Vec<ExcludeRule>> {
        self.graph.effective_excludes(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::*;
    use crate::lazy::LazyValue;

    fn graph() -> ConfigurationGraph {
        ConfigurationGraph::new(Settings::default())
    }

    fn names(dependencies: &[Dependency]) -> Vec<String> {
        dependencies.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn names_are_unique() {
        let graph = graph();
        graph.create("compile").unwrap();
        assert!(matches!(
            graph.create("compile"),
            Err(Error::DuplicateConfigurationName(name)) if name == "compile"
        ));
        assert!(graph.maybe_create("compile").is_ok());
        assert_eq!(graph.names(), vec!["compile"]);
    }

    #[test]
    fn unknown_configuration() {
        let graph = graph();
        assert!(matches!(graph.get("nope"), Err(Error::UnknownConfiguration(_))));
        graph.create("a").unwrap();
        assert!(matches!(
            graph.extends_from("a", "nope"),
            Err(Error::UnknownConfiguration(name)) if name == "nope"
        ));
    }

    #[test]
    fn cycles_are_rejected() {
        let graph = graph();
        for name in ["a", "b", "c"] {
            graph.create(name).unwrap();
        }
        graph.extends_from("b", "a").unwrap();
        graph.extends_from("c", "b").unwrap();

        assert!(matches!(
            graph.extends_from("a", "c"),
            Err(Error::CyclicInheritance { .. })
        ));
        assert!(matches!(
            graph.extends_from("a", "a"),
            Err(Error::CyclicInheritance { .. })
        ));
        assert!(graph.parents("a").unwrap().is_empty());
        assert_eq!(graph.hierarchy("c").unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn cycles_are_rejected_after_reading() {
        let graph = graph();
        for name in ["a", "b", "c"] {
            graph.create(name).unwrap();
        }
        graph.extends_from("b", "a").unwrap();
        graph.extends_from("c", "b").unwrap();
        graph.effective_dependencies("c").unwrap();

        assert!(matches!(
            graph.extends_from("a", "c"),
            Err(Error::CyclicInheritance { ref child, ref parent }) if child == "a" && parent == "c"
        ));
        assert!(matches!(
            graph.extends_from("b", "b"),
            Err(Error::CyclicInheritance { .. })
        ));
        assert!(graph.parents("a").unwrap().is_empty());
    }

    #[test]
    fn failed_read_does_not_freeze() {
        let graph = graph();
        let compile = graph.create("compile").unwrap();
        let runtime = graph.create("runtime").unwrap();
        runtime.extends_from("compile").unwrap();
        compile
            .dependencies()
            .add(LazyValue::of(crate::Notation::from("bad")))
            .unwrap();

        assert!(matches!(
            runtime.effective_dependencies(),
            Err(Error::MalformedNotation { .. })
        ));
        assert!(!compile.inspect(|c| c.is_observed()).unwrap());
        runtime.dependencies().add("g:n:1").unwrap();
        compile.set_description("fixed").unwrap();
    }

    #[test]
    fn inspect_may_call_back_into_graph() {
        let graph = graph();
        let compile = graph.create("compile").unwrap();
        let count = compile
            .inspect(|c| {
                compile.dependencies().add("g:a:1").unwrap();
                c.dependencies().len()
            })
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(compile.declared().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_edge_is_noop() {
        let graph = graph();
        graph.create("a").unwrap();
        graph.create("b").unwrap();
        graph.extends_from("b", "a").unwrap();
        graph.extends_from("b", "a").unwrap();
        assert_eq!(graph.parents("b").unwrap(), vec!["a"]);
    }

    #[test]
    fn diamond_visits_ancestor_once() {
        let graph = graph();
        for name in ["base", "left", "right", "leaf"] {
            graph.create(name).unwrap();
        }
        graph.extends_from("left", "base").unwrap();
        graph.extends_from("right", "base").unwrap();
        graph.extends_from("leaf", "left").unwrap();
        graph.extends_from("leaf", "right").unwrap();

        graph.get("base").unwrap().dependencies().add("g:base:1").unwrap();
        graph.get("left").unwrap().dependencies().add("g:left:1").unwrap();
        graph.get("right").unwrap().dependencies().add("g:right:1").unwrap();

        assert_eq!(
            graph.hierarchy("leaf").unwrap(),
            vec!["leaf", "left", "base", "right"]
        );
        assert_eq!(
            names(&graph.effective_dependencies("leaf").unwrap()),
            vec!["g:left:1", "g:base:1", "g:right:1"]
        );
    }

    #[test]
    fn reading_freezes_ancestors() {
        let graph = graph();
        let compile = graph.create("compile").unwrap();
        let runtime = graph.create("runtime").unwrap();
        let other = graph.create("other").unwrap();
        runtime.extends_from("compile").unwrap();

        runtime.effective_dependencies().unwrap();

        assert!(matches!(
            compile.dependencies().add("g:a:1"),
            Err(Error::ConfigurationFrozen(name)) if name == "compile"
        ));
        assert!(runtime.set_visible(false).is_err());
        assert!(other.dependencies().add("g:a:1").is_ok());
    }

    #[test]
    fn views_are_live_without_freeze() {
        let graph = ConfigurationGraph::new(Settings::default().freeze_on_read(false));
        let compile = graph.create("compile").unwrap();
        let runtime = graph.create("runtime").unwrap();
        runtime.extends_from("compile").unwrap();

        assert!(runtime.effective_dependencies().unwrap().is_empty());
        compile.dependencies().add("g:a:1").unwrap();
        assert_eq!(runtime.effective_dependencies().unwrap().len(), 1);
    }

    #[test]
    fn explicit_freeze() {
        let graph = graph();
        let compile = graph.create("compile").unwrap();
        graph.freeze();
        assert!(graph.is_frozen());
        assert!(compile.set_description("x").is_err());
        assert!(matches!(graph.create("late"), Err(Error::ConfigurationFrozen(_))));
    }

    #[test]
    fn lazy_declarations_see_latest_state() {
        let graph = ConfigurationGraph::new(Settings::default().freeze_on_read(false));
        let compile = graph.create("compile").unwrap();
        let version = Arc::new(RwLock::new("1.0".to_string()));

        let source = version.clone();
        compile
            .dependencies()
            .add(LazyValue::from_fn(move || {
                let version = source.read().unwrap().clone();
                Ok(vec![crate::Notation::from(format!("g:lib:{version}"))])
            }))
            .unwrap();

        assert_eq!(names(&compile.effective_dependencies().unwrap()), vec!["g:lib:1.0"]);
        *version.write().unwrap() = "2.0".into();
        assert_eq!(names(&compile.effective_dependencies().unwrap()), vec!["g:lib:2.0"]);
    }

    #[test]
    fn artifacts_by_producer() {
        let graph = graph();
        let archives = graph.create("archives").unwrap();
        let artifact = PublishArtifact::archive("app", "jar", Utf8Path::new("build/libs"));
        archives
            .add_artifact(artifact.clone(), Some("jar".into()))
            .unwrap()
            .add_artifact(artifact, Some("shadow".into()))
            .unwrap();

        assert_eq!(archives.remove_artifacts_produced_by(&"jar".into()).unwrap(), 1);
        assert_eq!(archives.remove_artifacts_produced_by(&"jar".into()).unwrap(), 0);

        let effective = archives.effective_artifacts().unwrap();
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].producer(), Some(&ProducerId::new("shadow")));
    }

    #[test]
    fn excludes_are_inherited() {
        let graph = graph();
        let compile = graph.create("compile").unwrap();
        let runtime = graph.create("runtime").unwrap();
        runtime.extends_from("compile").unwrap();
        compile.exclude(ExcludeRule::group("commons-logging")).unwrap();
        runtime.exclude(ExcludeRule::group("commons-logging")).unwrap();

        assert_eq!(
            runtime.effective_excludes().unwrap(),
            vec![ExcludeRule::group("commons-logging")]
        );
    }

    #[test]
    fn display_mermaid() {
        let graph = graph();
        graph.create("compile").unwrap();
        graph.create("runtime").unwrap().extends_from("compile").unwrap();
        assert_eq!(
            graph.to_string(),
            "graph BT\n    0[\"compile\"]\n    1[\"runtime\"]\n    1 --> 0\n"
        );
    }
}
