use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, debug_span, info_span};

use crate::error::{FileSetError, Result};
use crate::files::FileSet;
use crate::graph::{ConfigurationGraph, ConfigurationHandle};
use crate::hash::Fingerprint;
use crate::lazy::LazyValue;
use crate::resolver::{LayoutResolver, Resolver};
use crate::utils::normalize_path;

type Predicate = Arc<dyn Fn(&Utf8Path) -> bool + Send + Sync>;

/// An expression describing which files end up on a classpath.
///
/// Views are plain data. Nothing is read from the graph until the view is
/// evaluated through [`ClasspathComposer::compose`].
#[derive(Clone)]
pub enum ConfigurationView {
    /// The effective dependencies of a configuration, resolved to files.
    Configuration(String),
    Files(FileSet),
    Union(Vec<ConfigurationView>),
    /// Files of the first view which are not in the second one.
    Minus(Box<ConfigurationView>, Box<ConfigurationView>),
    Filter(Box<ConfigurationView>, Predicate),
}

impl ConfigurationView {
    pub fn configuration(name: impl Into<String>) -> Self {
        Self::Configuration(name.into())
    }

    pub fn files(files: FileSet) -> Self {
        Self::Files(files)
    }

    pub fn union(views: impl IntoIterator<Item = ConfigurationView>) -> Self {
        Self::Union(views.into_iter().collect())
    }

    pub fn plus(self, other: impl Into<ConfigurationView>) -> Self {
        match self {
            Self::Union(mut views) => {
                views.push(other.into());
                Self::Union(views)
            }
            view => Self::Union(vec![view, other.into()]),
        }
    }

    /// Set difference keyed by the normalized path of each resolved file.
    pub fn minus(self, other: impl Into<ConfigurationView>) -> Self {
        Self::Minus(Box::new(self), Box::new(other.into()))
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Utf8Path) -> bool + Send + Sync + 'static,
    {
        Self::Filter(Box::new(self), Arc::new(predicate))
    }

    /// Keeps only files matching a glob pattern.
    pub fn matching(self, pattern: &str) -> Result<Self> {
        let pattern = glob::Pattern::new(pattern).map_err(FileSetError::from)?;
        Ok(self.filter(move |path| pattern.matches(path.as_str())))
    }
}

impl From<&str> for ConfigurationView {
    fn from(name: &str) -> Self {
        Self::configuration(name)
    }
}

impl From<&ConfigurationHandle> for ConfigurationView {
    fn from(handle: &ConfigurationHandle) -> Self {
        Self::configuration(handle.name())
    }
}

impl From<FileSet> for ConfigurationView {
    fn from(files: FileSet) -> Self {
        Self::Files(files)
    }
}

impl Display for ConfigurationView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(name) => write!(f, "{name}"),
            Self::Files(files) => write!(f, "{files}"),
            Self::Union(views) => {
                write!(f, "(")?;
                for (i, view) in views.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{view}")?;
                }
                write!(f, ")")
            }
            Self::Minus(base, subtrahend) => write!(f, "({base} - {subtrahend})"),
            Self::Filter(view, _) => write!(f, "filter({view})"),
        }
    }
}

impl Debug for ConfigurationView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigurationView({self})")
    }
}

/// Resolved classpath entries, in order and without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    files: Vec<Utf8PathBuf>,
}

impl Classpath {
    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    pub fn into_files(self) -> Vec<Utf8PathBuf> {
        self.files
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        let path = normalize_path(path);
        self.files.contains(&path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Utf8PathBuf> {
        self.files.iter()
    }

    /// Digest of the ordered entries.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_paths(&self.files)
    }
}

impl<'a> IntoIterator for &'a Classpath {
    type Item = &'a Utf8PathBuf;
    type IntoIter = std::slice::Iter<'a, Utf8PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Turns [`ConfigurationView`]s into lazily evaluated classpaths.
#[derive(Clone)]
pub struct ClasspathComposer {
    graph: ConfigurationGraph,
    resolver: Arc<dyn Resolver>,
}

impl ClasspathComposer {
    /// A composer resolving through [`LayoutResolver`].
    pub fn new(graph: ConfigurationGraph) -> Self {
        let resolver = LayoutResolver::new(graph.settings());
        Self::with_resolver(graph, resolver)
    }

    pub fn with_resolver(graph: ConfigurationGraph, resolver: impl Resolver + 'static) -> Self {
        Self {
            graph,
            resolver: Arc::new(resolver),
        }
    }

    pub fn graph(&self) -> &ConfigurationGraph {
        &self.graph
    }

    /// Builds the classpath described by `view`.
    ///
    /// Nothing happens until the returned value is evaluated, at which point
    /// the graph is read as it is at that moment.
    pub fn compose(&self, view: impl Into<ConfigurationView>) -> LazyValue<Classpath> {
        let view = view.into();
        let label = format!("classpath {view}");
        let composer = self.clone();

        LazyValue::from_fn(move || {
            let _span = info_span!("compose", %view).entered();
            let files = composer.evaluate(&view)?;
            debug!(count = files.len(), "composed classpath");
            Ok(vec![Classpath { files }])
        })
        .describe(label)
    }

    fn evaluate(&self, view: &ConfigurationView) -> Result<Vec<Utf8PathBuf>> {
        match view {
            ConfigurationView::Configuration(name) => self.resolve_configuration(name),
            ConfigurationView::Files(files) => {
                let root = self.graph.settings().resolve(Utf8Path::new(""));
                Ok(files.resolve(&root)?)
            }
            ConfigurationView::Union(views) => {
                let mut acc = Vec::new();
                for view in views {
                    acc.extend(self.evaluate(view)?);
                }
                Ok(dedup(acc))
            }
            ConfigurationView::Minus(base, subtrahend) => {
                let base = self.evaluate(base)?;
                let subtrahend: HashSet<_> = self.evaluate(subtrahend)?.into_iter().collect();
                Ok(base
                    .into_iter()
                    .filter(|path| !subtrahend.contains(path))
                    .collect())
            }
            ConfigurationView::Filter(view, predicate) => Ok(self
                .evaluate(view)?
                .into_iter()
                .filter(|path| predicate(path))
                .collect()),
        }
    }

    fn resolve_configuration(&self, name: &str) -> Result<Vec<Utf8PathBuf>> {
        let _span = debug_span!("resolve", configuration = name).entered();

        let dependencies = self.graph.effective_dependencies(name)?;
        let excludes = self.graph.effective_excludes(name)?;

        let resolved = dependencies
            .par_iter()
            .map(|dependency| self.resolver.resolve(dependency, &excludes))
            .collect::<Result<Vec<_>>>()?;

        Ok(dedup(
            resolved
                .into_iter()
                .flatten()
                .map(|path| normalize_path(&path))
                .collect(),
        ))
    }
}

impl Debug for ClasspathComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClasspathComposer")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

fn dedup(paths: Vec<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}
