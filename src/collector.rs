use std::sync::Arc;

use tracing::debug;

use crate::dependency::ConfiguringAction;
use crate::error::Result;
use crate::graph::ConfigurationGraph;
use crate::lazy::LazyValue;
use crate::notation::{Declared, Notation};

/// Adds dependencies to a single configuration.
///
/// Every entry point accepts anything convertible into a [`Notation`]: a
/// coordinate string, a tuple, a project reference, a file set, an already
/// built dependency, a lazy value producing any of those, or a bundle.
///
/// Direct notations are parsed immediately and errors surface from the call
/// itself. Lazy notations are only parsed when an effective view of the
/// configuration is read, and so are their errors. Either way a single call
/// inserts all of its dependencies or none of them.
#[derive(Debug, Clone)]
pub struct DependencyCollector {
    graph: ConfigurationGraph,
    configuration: Arc<str>,
}

impl DependencyCollector {
    pub(crate) fn new(graph: ConfigurationGraph, configuration: Arc<str>) -> Self {
        Self {
            graph,
            configuration,
        }
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    /// Declares a dependency.
    pub fn add(&self, notation: impl Into<Notation>) -> Result<()> {
        self.insert(notation.into(), None)
    }

    /// Declares a dependency and configures it before it is inserted.
    pub fn add_with(&self, notation: impl Into<Notation>, action: ConfiguringAction) -> Result<()> {
        self.insert(notation.into(), Some(action))
    }

    /// Declares every dependency of a bundle.
    pub fn bundle<N>(&self, notations: impl IntoIterator<Item = N>) -> Result<()>
    where
        N: Into<Notation>,
    {
        self.insert(bundle(notations), None)
    }

    /// Declares every dependency of a bundle, running `action` on each.
    pub fn bundle_with<N>(
        &self,
        notations: impl IntoIterator<Item = N>,
        action: ConfiguringAction,
    ) -> Result<()>
    where
        N: Into<Notation>,
    {
        self.insert(bundle(notations), Some(action))
    }

    /// Declares a bundle whose elements are only known at evaluation time.
    pub fn bundle_lazy<N>(&self, notations: LazyValue<Vec<N>>) -> Result<()>
    where
        N: Into<Notation> + Send + Sync + 'static,
    {
        self.insert(lazy_bundle(notations), None)
    }

    /// Like [`DependencyCollector::bundle_lazy`], running `action` on each
    /// element once the bundle is evaluated.
    pub fn bundle_lazy_with<N>(
        &self,
        notations: LazyValue<Vec<N>>,
        action: ConfiguringAction,
    ) -> Result<()>
    where
        N: Into<Notation> + Send + Sync + 'static,
    {
        self.insert(lazy_bundle(notations), Some(action))
    }

    fn insert(&self, notation: Notation, action: Option<ConfiguringAction>) -> Result<()> {
        let mut declared = self.graph.parser().declare(notation)?;

        if let Some(action) = action {
            declared = declared
                .into_iter()
                .map(|declared| configure(declared, &action))
                .collect::<Result<_>>()?;
        }

        let count = declared.len();
        let inserted = self
            .graph
            .mutate(&self.configuration, |c| c.insert_all(declared))?;

        debug!(
            configuration = %self.configuration,
            declared = count,
            inserted,
            "added dependencies"
        );
        Ok(())
    }
}

fn bundle<N: Into<Notation>>(notations: impl IntoIterator<Item = N>) -> Notation {
    Notation::Bundle(notations.into_iter().map(Into::into).collect())
}

fn lazy_bundle<N>(notations: LazyValue<Vec<N>>) -> Notation
where
    N: Into<Notation> + Send + Sync + 'static,
{
    Notation::Lazy(notations.map(|items| bundle(items)))
}

/// Runs the action on a parsed dependency right away, or on every
/// dependency a lazy declaration yields once it is evaluated.
fn configure(declared: Declared, action: &ConfiguringAction) -> Result<Declared> {
    match declared {
        Declared::Resolved(mut dependency) => {
            action.apply(&mut dependency)?;
            Ok(Declared::Resolved(dependency))
        }
        Declared::Deferred(lazy) => {
            let action = action.clone();
            Ok(Declared::Deferred(lazy.try_map(move |mut dependency| {
                action.apply(&mut dependency)?;
                Ok(dependency)
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{
        Dependency, ExcludeRule, ExternalModuleDependency, ProjectDependency,
    };
    use crate::error::Error;
    use crate::files::FileSet;
    use crate::notation::ProjectRef;
    use crate::settings::Settings;

    fn collector() -> (ConfigurationGraph, DependencyCollector) {
        let graph = ConfigurationGraph::new(Settings::default().freeze_on_read(false));
        let collector = graph.create("compile").unwrap().dependencies();
        (graph, collector)
    }

    fn declared(graph: &ConfigurationGraph) -> usize {
        graph
            .with_configuration("compile", |c| c.dependencies().len())
            .unwrap()
    }

    #[test]
    fn add_parses_eagerly() {
        let (graph, collector) = collector();
        let err = collector.add("org.example::1.0").unwrap_err();
        assert!(matches!(err, Error::MalformedNotation { .. }));
        assert_eq!(declared(&graph), 0);

        collector.add("org.example:lib:1.0").unwrap();
        assert_eq!(declared(&graph), 1);
    }

    #[test]
    fn action_is_applied_before_insertion() {
        let (graph, collector) = collector();
        let action = ConfiguringAction::new(|module: &mut ExternalModuleDependency| {
            module.exclude(ExcludeRule::group("commons-logging"));
        });
        collector.add_with("org.example:lib:1.0", action).unwrap();

        let effective = graph.effective_dependencies("compile").unwrap();
        let module = effective[0].as_external_module().unwrap();
        assert_eq!(module.excludes(), &[ExcludeRule::group("commons-logging")]);
    }

    #[test]
    fn action_type_mismatch() {
        let (graph, collector) = collector();
        let action = ConfiguringAction::new(|project: &mut ProjectDependency| {
            project.set_transitive(false);
        });
        let err = collector.add_with("org.example:lib:1.0", action).unwrap_err();
        assert!(matches!(err, Error::ActionTypeMismatch { .. }));
        assert_eq!(declared(&graph), 0);
    }

    #[test]
    fn supertype_action_accepts_everything() {
        let (graph, collector) = collector();
        let action = ConfiguringAction::new(|dependency: &mut Dependency| {
            if let Dependency::Project(project) = dependency {
                project.because("shared code");
            }
        });
        collector
            .bundle_with(
                vec![
                    Notation::from(ProjectRef::new(":core")),
                    Notation::from("g:a:1"),
                ],
                action,
            )
            .unwrap();

        let effective = graph.effective_dependencies("compile").unwrap();
        assert_eq!(effective.len(), 2);
        assert_eq!(effective[0].reason(), Some("shared code"));
        assert_eq!(effective[1].reason(), None);
    }

    #[test]
    fn bundle_is_all_or_nothing() {
        let (graph, collector) = collector();
        let err = collector.bundle(["g:valid:1", ":"]).unwrap_err();
        assert!(matches!(err, Error::MalformedNotation { notation, .. } if notation.contains(":")));
        assert_eq!(declared(&graph), 0);
    }

    #[test]
    fn bundle_action_mismatch_is_all_or_nothing() {
        let (graph, collector) = collector();
        let action = ConfiguringAction::new(|module: &mut ExternalModuleDependency| {
            module.set_transitive(false);
        });
        let err = collector
            .bundle_with(
                vec![
                    Notation::from("g:a:1"),
                    Notation::from(FileSet::from_paths(["lib/x.jar"])),
                ],
                action,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ActionTypeMismatch { .. }));
        assert_eq!(declared(&graph), 0);
    }

    #[test]
    fn lazy_errors_surface_on_evaluation() {
        let (graph, collector) = collector();
        collector
            .add(LazyValue::of(Notation::from("not a coordinate")))
            .unwrap();
        assert_eq!(declared(&graph), 1);
        assert!(matches!(
            graph.effective_dependencies("compile"),
            Err(Error::MalformedNotation { .. })
        ));
    }

    #[test]
    fn lazy_action_runs_on_evaluation() {
        let (graph, collector) = collector();
        let action = ConfiguringAction::new(|module: &mut ExternalModuleDependency| {
            module.because("lazy");
        });
        collector
            .bundle_lazy_with(LazyValue::of(vec!["g:a:1", "g:b:1"]), action)
            .unwrap();

        let effective = graph.effective_dependencies("compile").unwrap();
        assert_eq!(effective.len(), 2);
        assert!(effective.iter().all(|d| d.reason() == Some("lazy")));
    }

    #[test]
    fn lazy_bundle_fails_as_a_whole() {
        let (graph, collector) = collector();
        collector
            .bundle_lazy(LazyValue::of(vec!["g:a:1", "g::1"]))
            .unwrap();
        assert!(graph.effective_dependencies("compile").is_err());
    }

    #[test]
    fn missing_lazy_value() {
        let (graph, collector) = collector();
        collector
            .add(LazyValue::<Notation>::provider(|| None).describe("version catalog entry"))
            .unwrap();
        assert!(matches!(
            graph.effective_dependencies("compile"),
            Err(Error::MissingValue { description }) if description == "version catalog entry"
        ));
    }
}
