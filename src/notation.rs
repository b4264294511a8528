//! Dependency notations and the parser turning them into [`Dependency`]
//! values.
//!
//! A [`Notation`] is whatever a build author wrote down to describe a
//! dependency. All the shapes are variants of one closed enum, so there is a
//! single dispatch point, [`NotationParser::declare`], instead of one entry
//! point per shape. `From` impls provide the ergonomic surface.
//!
//! Shapes are classified structurally by their variant; an input is never
//! tried against several shapes. Lazily produced notations are only
//! classified when the surrounding [`LazyValue`] is evaluated.

use std::sync::Arc;

use serde_json::Value;

use crate::dependency::{
    Dependency, ExternalModuleDependency, FileCollectionDependency, ProjectDependency,
};
use crate::error::{Error, Result};
use crate::files::FileSet;
use crate::lazy::LazyValue;

/// Explicit module coordinates, the tuple form of a module notation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleCoordinates {
    pub group: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub extension: Option<String>,
}

impl ModuleCoordinates {
    pub fn new(group: Option<&str>, name: &str, version: Option<&str>) -> Self {
        Self {
            group: group.map(Into::into),
            name: name.into(),
            version: version.map(Into::into),
            classifier: None,
            extension: None,
        }
    }

    pub fn classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// A reference to another project of the build, by path.
///
/// Paths starting with `:` are absolute, anything else is relative to the
/// project doing the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub path: String,
    pub configuration: Option<String>,
}

impl ProjectRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            configuration: None,
        }
    }

    pub fn configuration(mut self, name: impl Into<String>) -> Self {
        self.configuration = Some(name.into());
        self
    }
}

/// A module taken from a version catalog. Its coordinates were already
/// validated by the catalog, so it is passed through as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogModule {
    pub group: String,
    pub name: String,
    pub version: Option<String>,
}

impl CatalogModule {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.map(Into::into),
        }
    }
}

/// Every supported way to write a dependency down.
#[derive(Debug, Clone)]
pub enum Notation {
    /// `group:name:version[:classifier][@extension]`
    Coordinates(String),
    Module(ModuleCoordinates),
    Project(ProjectRef),
    Files(FileSet),
    Catalog(CatalogModule),
    /// An already constructed dependency, passed through unchanged.
    Dependency(Dependency),
    /// Classified only when evaluated.
    Lazy(LazyValue<Notation>),
    /// Expanded per element, all or nothing.
    Bundle(Vec<Notation>),
}

impl Notation {
    /// Converts a loosely typed value, e.g. from a manifest, into a notation.
    ///
    /// Strings are coordinates, arrays are bundles, and objects are told
    /// apart by their keys: `project`, `files`, or `name`. Anything else is
    /// rejected with [`Error::UnsupportedNotation`].
    pub fn from_value(value: &Value) -> Result<Notation> {
        match value {
            Value::String(text) => Ok(Notation::Coordinates(text.clone())),
            Value::Array(items) => Ok(Notation::Bundle(
                items
                    .iter()
                    .map(Notation::from_value)
                    .collect::<Result<_>>()?,
            )),
            Value::Object(map) => {
                let text = |key: &str| -> Result<Option<String>> {
                    match map.get(key) {
                        None | Some(Value::Null) => Ok(None),
                        Some(Value::String(text)) => Ok(Some(text.clone())),
                        Some(_) => Err(Error::unsupported(value)),
                    }
                };

                if let Some(path) = text("project")? {
                    return Ok(Notation::Project(ProjectRef {
                        path,
                        configuration: text("configuration")?,
                    }));
                }

                if let Some(files) = map.get("files") {
                    let Value::Array(entries) = files else {
                        return Err(Error::unsupported(value));
                    };
                    let mut set = FileSet::new();
                    if let Some(base) = text("base")? {
                        set = set.with_base(base);
                    }
                    for entry in entries {
                        let Value::String(entry) = entry else {
                            return Err(Error::unsupported(value));
                        };
                        set = if is_glob(entry) {
                            set.glob(entry.as_str())
                        } else {
                            set.path(entry.as_str())
                        };
                    }
                    return Ok(Notation::Files(set));
                }

                if let Some(name) = text("name")? {
                    return Ok(Notation::Module(ModuleCoordinates {
                        group: text("group")?,
                        name,
                        version: text("version")?,
                        classifier: text("classifier")?,
                        extension: text("extension")?,
                    }));
                }

                Err(Error::unsupported(value))
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => Err(Error::unsupported(value)),
        }
    }
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

impl From<&str> for Notation {
    fn from(value: &str) -> Self {
        Notation::Coordinates(value.into())
    }
}

impl From<String> for Notation {
    fn from(value: String) -> Self {
        Notation::Coordinates(value)
    }
}

impl From<ModuleCoordinates> for Notation {
    fn from(value: ModuleCoordinates) -> Self {
        Notation::Module(value)
    }
}

impl From<(Option<&str>, &str, Option<&str>)> for Notation {
    fn from((group, name, version): (Option<&str>, &str, Option<&str>)) -> Self {
        Notation::Module(ModuleCoordinates::new(group, name, version))
    }
}

impl From<ProjectRef> for Notation {
    fn from(value: ProjectRef) -> Self {
        Notation::Project(value)
    }
}

impl From<FileSet> for Notation {
    fn from(value: FileSet) -> Self {
        Notation::Files(value)
    }
}

impl From<CatalogModule> for Notation {
    fn from(value: CatalogModule) -> Self {
        Notation::Catalog(value)
    }
}

impl From<Dependency> for Notation {
    fn from(value: Dependency) -> Self {
        Notation::Dependency(value)
    }
}

impl From<ExternalModuleDependency> for Notation {
    fn from(value: ExternalModuleDependency) -> Self {
        Notation::Dependency(value.into())
    }
}

impl From<ProjectDependency> for Notation {
    fn from(value: ProjectDependency) -> Self {
        Notation::Dependency(value.into())
    }
}

impl From<FileCollectionDependency> for Notation {
    fn from(value: FileCollectionDependency) -> Self {
        Notation::Dependency(value.into())
    }
}

impl From<LazyValue<Notation>> for Notation {
    fn from(value: LazyValue<Notation>) -> Self {
        Notation::Lazy(value)
    }
}

impl From<LazyValue<Dependency>> for Notation {
    fn from(value: LazyValue<Dependency>) -> Self {
        Notation::Lazy(value.map(Notation::Dependency))
    }
}

impl<N> From<Vec<N>> for Notation
where
    N: Into<Notation>,
{
    fn from(value: Vec<N>) -> Self {
        Notation::Bundle(value.into_iter().map(Into::into).collect())
    }
}

/// A dependency as stored by a configuration: either parsed already, or
/// still waiting for its lazy notation to be evaluated.
#[derive(Debug, Clone)]
pub enum Declared {
    Resolved(Dependency),
    Deferred(LazyValue<Dependency>),
}

impl Declared {
    /// Evaluates the declaration into its dependencies.
    pub fn evaluate(&self) -> Result<Vec<Dependency>> {
        match self {
            Declared::Resolved(dependency) => Ok(vec![dependency.clone()]),
            Declared::Deferred(lazy) => lazy.evaluate(),
        }
    }
}

/// Information about the declaring project needed to interpret notations.
#[derive(Debug, Clone)]
pub struct DependencyContext {
    project: Arc<str>,
}

impl DependencyContext {
    /// `project` is the path of the declaring project, `:` for the root.
    pub fn new(project: impl AsRef<str>) -> Self {
        let project = project.as_ref();
        let project = if project.starts_with(':') {
            project.to_string()
        } else {
            format!(":{project}")
        };
        Self {
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn absolute(&self, path: &str) -> String {
        if path.starts_with(':') {
            path.to_string()
        } else if self.project.as_ref() == ":" {
            format!(":{path}")
        } else {
            format!("{}:{path}", self.project)
        }
    }
}

impl Default for DependencyContext {
    fn default() -> Self {
        Self::new(":")
    }
}

/// Classifies notations and produces canonical dependencies.
#[derive(Debug, Clone, Default)]
pub struct NotationParser {
    context: DependencyContext,
}

impl NotationParser {
    pub fn new(context: DependencyContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &DependencyContext {
        &self.context
    }

    /// Parses a notation describing exactly one dependency. Lazy notations
    /// are evaluated on the spot.
    pub fn parse(&self, notation: impl Into<Notation>) -> Result<Dependency> {
        let notation = notation.into();
        let raw = format!("{notation:?}");
        let mut parsed = self.parse_all(notation)?;
        match parsed.len() {
            1 => Ok(parsed.remove(0)),
            0 => Err(Error::missing(raw)),
            count => Err(Error::TooManyValues {
                description: raw,
                count,
            }),
        }
    }

    /// Parses a notation into all the dependencies it stands for, evaluating
    /// lazy notations and expanding bundles. Fails on the first invalid
    /// element.
    pub fn parse_all(&self, notation: impl Into<Notation>) -> Result<Vec<Dependency>> {
        let mut acc = Vec::new();
        for declared in self.declare(notation)? {
            acc.extend(declared.evaluate()?);
        }
        Ok(acc)
    }

    /// Classifies a notation without evaluating anything lazy.
    ///
    /// Direct shapes are parsed immediately, so malformed input fails here.
    /// Lazy shapes become [`Declared::Deferred`] and fail only when
    /// evaluated. A bundle fails as a whole if any element fails.
    pub fn declare(&self, notation: impl Into<Notation>) -> Result<Vec<Declared>> {
        match notation.into() {
            Notation::Lazy(lazy) => {
                let parser = self.clone();
                Ok(vec![Declared::Deferred(
                    lazy.flat_map(move |notation| parser.parse_all(notation)),
                )])
            }
            Notation::Bundle(items) => {
                let mut acc = Vec::with_capacity(items.len());
                for item in items {
                    acc.extend(self.declare(item)?);
                }
                Ok(acc)
            }
            notation => Ok(vec![Declared::Resolved(self.classify(notation)?)]),
        }
    }

    fn classify(&self, notation: Notation) -> Result<Dependency> {
        tracing::trace!(?notation, "classifying notation");

        match notation {
            Notation::Coordinates(text) => parse_coordinates(&text).map(Dependency::from),
            Notation::Module(coordinates) => {
                if coordinates.name.trim().is_empty() {
                    return Err(Error::malformed(&coordinates, "module name is required"));
                }
                Ok(ExternalModuleDependency::new(
                    non_empty(coordinates.group),
                    coordinates.name,
                    non_empty(coordinates.version),
                )
                .with_artifact(
                    non_empty(coordinates.classifier),
                    non_empty(coordinates.extension),
                )
                .into())
            }
            Notation::Project(reference) => {
                if reference.path.trim_matches(':').is_empty() && reference.path != ":" {
                    return Err(Error::malformed(&reference, "project path is required"));
                }
                let mut dependency = ProjectDependency::new(self.context.absolute(&reference.path));
                if let Some(configuration) = reference.configuration {
                    dependency.set_target_configuration(configuration);
                }
                Ok(dependency.into())
            }
            Notation::Files(files) => Ok(FileCollectionDependency::new(files).into()),
            Notation::Catalog(module) => {
                Ok(ExternalModuleDependency::new(Some(module.group), module.name, module.version)
                    .into())
            }
            Notation::Dependency(dependency) => Ok(dependency),
            Notation::Lazy(lazy) => Err(Error::unsupported(lazy)),
            Notation::Bundle(items) => Err(Error::unsupported(items)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Parses `group:name:version[:classifier][@extension]`.
///
/// Three or four `:` separated segments are accepted. Only the name is
/// mandatory, every other segment may be left empty.
fn parse_coordinates(text: &str) -> Result<ExternalModuleDependency> {
    let notation = text.trim();

    let (coordinates, extension) = match notation.rsplit_once('@') {
        Some((coordinates, extension)) => (coordinates, Some(extension)),
        None => (notation, None),
    };

    let segments: Vec<&str> = coordinates.split(':').collect();
    if segments.len() < 3 {
        return Err(Error::malformed(text, "expected at least 'group:name:version'"));
    }
    if segments.len() > 4 {
        return Err(Error::malformed(
            text,
            "expected at most 'group:name:version:classifier'",
        ));
    }
    if segments.iter().any(|segment| segment.contains(char::is_whitespace)) {
        return Err(Error::malformed(text, "segments cannot contain whitespace"));
    }
    if let Some(extension) = extension {
        if extension.contains(|c: char| c == ':' || c.is_whitespace()) {
            return Err(Error::malformed(
                text,
                "extension cannot contain ':' or whitespace",
            ));
        }
    }

    let segment = |i: usize| {
        segments
            .get(i)
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_string())
    };

    let name = segment(1).ok_or_else(|| Error::malformed(text, "module name is required"))?;

    Ok(ExternalModuleDependency::new(segment(0), name, segment(2)).with_artifact(
        segment(3),
        extension
            .filter(|extension| !extension.is_empty())
            .map(Into::into),
    ))
}
