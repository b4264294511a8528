//! Conventional configurations of Java projects and web applications.

use camino::{Utf8Path, Utf8PathBuf};

use crate::artifact::{ProducerId, PublishArtifact};
use crate::composer::{Classpath, ClasspathComposer, ConfigurationView};
use crate::error::Result;
use crate::graph::ConfigurationGraph;
use crate::lazy::LazyValue;

pub const COMPILE: &str = "compile";
pub const RUNTIME: &str = "runtime";
pub const ARCHIVES: &str = "archives";
pub const DEFAULT: &str = "default";
pub const PROVIDED_COMPILE: &str = "providedCompile";
pub const PROVIDED_RUNTIME: &str = "providedRuntime";

pub const JAR_TASK: &str = "jar";
pub const WAR_TASK: &str = "war";

/// A named set of conventions applied to a [`ConfigurationGraph`] with
/// [`ConfigurationGraph::apply`].
pub struct Plugin {
    name: &'static str,
    func: fn(&ConfigurationGraph) -> Result<()>,
}

impl Plugin {
    pub const fn new(name: &'static str, func: fn(&ConfigurationGraph) -> Result<()>) -> Self {
        Self { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn run(&self, graph: &ConfigurationGraph) -> Result<()> {
        (self.func)(graph)
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Plugin({})", self.name)
    }
}

/// `compile`, `runtime` extending it, `archives` publishing the jar, and
/// `default` extending `runtime`.
pub const JAVA: Plugin = Plugin::new("java", java);

/// Java conventions plus the `providedCompile` / `providedRuntime` pair. The
/// jar is replaced by a war in `archives`.
pub const WAR: Plugin = Plugin::new("war", war);

fn project_name(graph: &ConfigurationGraph) -> String {
    let project = graph.parser().context().project();
    if let Some(name) = project.rsplit(':').find(|segment| !segment.is_empty()) {
        return name.to_string();
    }
    graph
        .settings()
        .resolve(Utf8Path::new(""))
        .file_name()
        .unwrap_or("project")
        .to_string()
}

fn libs_dir(graph: &ConfigurationGraph) -> Utf8PathBuf {
    graph.settings().resolve(Utf8Path::new("build/libs"))
}

fn archive(graph: &ConfigurationGraph, extension: &str) -> PublishArtifact {
    PublishArtifact::archive(&project_name(graph), extension, &libs_dir(graph))
}

fn java(graph: &ConfigurationGraph) -> Result<()> {
    graph
        .maybe_create(COMPILE)?
        .set_description("Compile classpath for source set 'main'.")?;
    graph
        .maybe_create(RUNTIME)?
        .extends_from(COMPILE)?
        .set_description("Runtime classpath for source set 'main'.")?;
    graph
        .maybe_create(ARCHIVES)?
        .set_description("Configuration for the default artifacts.")?
        .add_artifact(archive(graph, "jar"), Some(ProducerId::new(JAR_TASK)))?;
    graph
        .maybe_create(DEFAULT)?
        .extends_from(RUNTIME)?
        .set_description("Configuration for the default artifacts and their dependencies.")?;
    Ok(())
}

fn war(graph: &ConfigurationGraph) -> Result<()> {
    graph.apply(&JAVA)?;

    graph
        .create(PROVIDED_COMPILE)?
        .set_visible(false)?
        .set_description(
            "Additional compile classpath for libraries that should not be part of the WAR archive.",
        )?;
    graph
        .create(PROVIDED_RUNTIME)?
        .set_visible(false)?
        .extends_from(PROVIDED_COMPILE)?
        .set_description(
            "Additional runtime classpath for libraries that should not be part of the WAR archive.",
        )?;
    graph.extends_from(COMPILE, PROVIDED_COMPILE)?;
    graph.extends_from(RUNTIME, PROVIDED_RUNTIME)?;

    let archives = graph.get(ARCHIVES)?;
    archives.remove_artifacts_produced_by(&ProducerId::new(JAR_TASK))?;
    archives.add_artifact(archive(graph, "war"), Some(ProducerId::new(WAR_TASK)))?;
    Ok(())
}

/// Everything a packaging task needs to assemble the web archive.
#[derive(Debug, Clone)]
pub struct WarArchive {
    /// `runtime` minus `providedRuntime`, evaluated when packaging.
    pub classpath: LazyValue<Classpath>,
    pub web_app_dir: LazyValue<Utf8PathBuf>,
    pub artifact: PublishArtifact,
}

/// Describes the war of a graph the [`WAR`] plugin was applied to.
pub fn war_archive(composer: &ClasspathComposer) -> Result<WarArchive> {
    let graph = composer.graph();
    graph.get(PROVIDED_RUNTIME)?;

    let classpath =
        composer.compose(ConfigurationView::configuration(RUNTIME).minus(PROVIDED_RUNTIME));

    let source = graph.clone();
    let web_app_dir = LazyValue::provider(move || {
        let settings = source.settings();
        Some(settings.resolve(&settings.web_app_dir))
    })
    .describe("web application directory");

    Ok(WarArchive {
        classpath,
        web_app_dir,
        artifact: archive(graph, "war"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::notation::DependencyContext;
    use crate::settings::Settings;

    fn graph() -> ConfigurationGraph {
        ConfigurationGraph::with_context(
            Settings::default().root("/work/shop"),
            DependencyContext::new(":shop"),
        )
    }

    #[test]
    fn java_conventions() {
        let graph = graph();
        graph.apply(&JAVA).unwrap();

        assert_eq!(graph.names(), vec![COMPILE, RUNTIME, ARCHIVES, DEFAULT]);
        assert_eq!(graph.hierarchy(DEFAULT).unwrap(), vec![DEFAULT, RUNTIME, COMPILE]);

        let artifacts = graph.effective_artifacts(ARCHIVES).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(
            artifacts[0].artifact().file(),
            Utf8Path::new("/work/shop/build/libs/shop.jar")
        );
        assert!(artifacts[0].is_produced_by(&ProducerId::new(JAR_TASK)));
    }

    #[test]
    fn war_conventions() {
        let graph = graph();
        graph.apply(&WAR).unwrap();
        graph.apply(&WAR).unwrap();
        assert!(graph.has_plugin("java"));

        graph
            .with_configuration(PROVIDED_RUNTIME, |c| {
                assert!(!c.is_visible());
                assert_eq!(
                    c.description(),
                    Some("Additional runtime classpath for libraries that should not be part of the WAR archive.")
                );
            })
            .unwrap();
        assert_eq!(graph.parents(PROVIDED_RUNTIME).unwrap(), vec![PROVIDED_COMPILE]);
        assert_eq!(graph.parents(COMPILE).unwrap(), vec![PROVIDED_COMPILE]);
        assert_eq!(graph.parents(RUNTIME).unwrap(), vec![COMPILE, PROVIDED_RUNTIME]);

        let artifacts = graph.effective_artifacts(ARCHIVES).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].artifact().extension(), "war");
        assert!(artifacts[0].is_produced_by(&ProducerId::new(WAR_TASK)));
    }

    #[test]
    fn war_archive_requires_plugin() {
        let graph = graph();
        let composer = ClasspathComposer::new(graph.clone());
        assert!(matches!(
            war_archive(&composer),
            Err(Error::UnknownConfiguration(name)) if name == PROVIDED_RUNTIME
        ));

        graph.apply(&WAR).unwrap();
        let war = war_archive(&composer).unwrap();
        assert_eq!(
            war.web_app_dir.evaluate_one().unwrap(),
            Utf8PathBuf::from("/work/shop/src/main/webapp")
        );
        assert_eq!(war.artifact.file(), Utf8Path::new("/work/shop/build/libs/shop.war"));
    }
}
