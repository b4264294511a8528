//! The canonical dependency representation.
//!
//! Every notation accepted by the [`NotationParser`](crate::NotationParser)
//! ends up as one of the [`Dependency`] variants. A dependency is only
//! mutable until it is inserted into a configuration: configuring actions get
//! a `&mut` view of the freshly parsed value, after that it is frozen.
//!
//! ## Configuring actions
//!
//! A [`ConfiguringAction`] is declared against a capability type: either a
//! concrete variant like [`ExternalModuleDependency`], or [`Dependency`]
//! itself, which accepts anything. The closure is type-erased on
//! construction and narrowed back at application time, failing with
//! [`Error::ActionTypeMismatch`] when the parsed dependency is of another
//! variant.

use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::files::FileSet;

/// Name of the configuration a project dependency points at by default.
pub const DEFAULT_TARGET_CONFIGURATION: &str = "default";

/// The variant of a dependency, used to check configuring actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Any dependency at all; only ever used as an action capability.
    Any,
    ExternalModule,
    Project,
    Files,
}

impl DependencyKind {
    /// Whether an action declared for `self` may be applied to `other`.
    pub fn accepts(self, other: DependencyKind) -> bool {
        self == DependencyKind::Any || self == other
    }
}

impl Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DependencyKind::Any => "any",
            DependencyKind::ExternalModule => "external module",
            DependencyKind::Project => "project",
            DependencyKind::Files => "file collection",
        })
    }
}

/// Excludes transitive contributions by group, module name, or both.
///
/// Exclusions are declared here and handed to the resolution engine, which is
/// the one computing transitive closures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExcludeRule {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
}

impl ExcludeRule {
    pub fn new(group: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            module: Some(module.into()),
        }
    }

    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            module: None,
        }
    }

    pub fn module(module: impl Into<String>) -> Self {
        Self {
            group: None,
            module: Some(module.into()),
        }
    }

    /// A rule with neither group nor module matches nothing.
    pub fn matches(&self, group: Option<&str>, name: &str) -> bool {
        if self.group.is_none() && self.module.is_none() {
            return false;
        }

        let group_ok = match &self.group {
            Some(expected) => group == Some(expected.as_str()),
            None => true,
        };
        let module_ok = match &self.module {
            Some(expected) => name == expected,
            None => true,
        };

        group_ok && module_ok
    }
}

/// A module published outside of the current build, identified by
/// coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalModuleDependency {
    group: Option<String>,
    name: String,
    version: Option<String>,
    classifier: Option<String>,
    extension: Option<String>,
    transitive: bool,
    excludes: Vec<ExcludeRule>,
    reason: Option<String>,
}

impl ExternalModuleDependency {
    pub fn new(group: Option<String>, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            group,
            name: name.into(),
            version,
            classifier: None,
            extension: None,
            transitive: true,
            excludes: Vec::new(),
            reason: None,
        }
    }

    /// Selects a specific artifact of the module.
    pub fn with_artifact(mut self, classifier: Option<String>, extension: Option<String>) -> Self {
        self.classifier = classifier;
        self.extension = extension;
        self
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn excludes(&self) -> &[ExcludeRule] {
        &self.excludes
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = Some(version.into());
        self
    }

    pub fn set_transitive(&mut self, transitive: bool) -> &mut Self {
        self.transitive = transitive;
        self
    }

    pub fn exclude(&mut self, rule: ExcludeRule) -> &mut Self {
        if !self.excludes.contains(&rule) {
            self.excludes.push(rule);
        }
        self
    }

    pub fn because(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Display for ExternalModuleDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group.as_deref().unwrap_or_default(),
            self.name,
            self.version.as_deref().unwrap_or_default()
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        if let Some(extension) = &self.extension {
            write!(f, "@{extension}")?;
        }
        Ok(())
    }
}

/// A dependency on the published artifacts of another project in the build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectDependency {
    path: String,
    configuration: Option<String>,
    transitive: bool,
    excludes: Vec<ExcludeRule>,
    reason: Option<String>,
}

impl ProjectDependency {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            configuration: None,
            transitive: true,
            excludes: Vec::new(),
            reason: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The configuration of the target project whose artifacts are used.
    pub fn target_configuration(&self) -> &str {
        self.configuration
            .as_deref()
            .unwrap_or(DEFAULT_TARGET_CONFIGURATION)
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn excludes(&self) -> &[ExcludeRule] {
        &self.excludes
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_target_configuration(&mut self, name: impl Into<String>) -> &mut Self {
        self.configuration = Some(name.into());
        self
    }

    pub fn set_transitive(&mut self, transitive: bool) -> &mut Self {
        self.transitive = transitive;
        self
    }

    pub fn exclude(&mut self, rule: ExcludeRule) -> &mut Self {
        if !self.excludes.contains(&rule) {
            self.excludes.push(rule);
        }
        self
    }

    pub fn because(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }

    /// The last segment of the project path, e.g. `core` for `:libs:core`.
    pub fn project_name(&self) -> &str {
        self.path
            .rsplit(':')
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.path)
    }
}

impl Display for ProjectDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "project('{}'", self.path)?;
        if let Some(configuration) = &self.configuration {
            write!(f, ", '{configuration}'")?;
        }
        write!(f, ")")
    }
}

/// Local files used as a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileCollectionDependency {
    files: FileSet,
    reason: Option<String>,
}

impl FileCollectionDependency {
    pub fn new(files: FileSet) -> Self {
        Self {
            files,
            reason: None,
        }
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn because(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    ExternalModule(ExternalModuleDependency),
    Project(ProjectDependency),
    Files(FileCollectionDependency),
}

impl Dependency {
    pub fn kind(&self) -> DependencyKind {
        match self {
            Dependency::ExternalModule(_) => DependencyKind::ExternalModule,
            Dependency::Project(_) => DependencyKind::Project,
            Dependency::Files(_) => DependencyKind::Files,
        }
    }

    pub fn as_external_module(&self) -> Option<&ExternalModuleDependency> {
        match self {
            Dependency::ExternalModule(module) => Some(module),
            _ => None,
        }
    }

    pub fn as_project(&self) -> Option<&ProjectDependency> {
        match self {
            Dependency::Project(project) => Some(project),
            _ => None,
        }
    }

    pub fn as_files(&self) -> Option<&FileCollectionDependency> {
        match self {
            Dependency::Files(files) => Some(files),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Dependency::ExternalModule(module) => module.reason(),
            Dependency::Project(project) => project.reason(),
            Dependency::Files(files) => files.reason(),
        }
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::ExternalModule(module) => Display::fmt(module, f),
            Dependency::Project(project) => Display::fmt(project, f),
            Dependency::Files(files) => Display::fmt(&files.files, f),
        }
    }
}

impl From<ExternalModuleDependency> for Dependency {
    fn from(value: ExternalModuleDependency) -> Self {
        Dependency::ExternalModule(value)
    }
}

impl From<ProjectDependency> for Dependency {
    fn from(value: ProjectDependency) -> Self {
        Dependency::Project(value)
    }
}

impl From<FileCollectionDependency> for Dependency {
    fn from(value: FileCollectionDependency) -> Self {
        Dependency::Files(value)
    }
}

/// A type a configuring action can be declared against.
pub trait Capability: 'static {
    const KIND: DependencyKind;

    /// Borrows the dependency as `Self`, if it is of a compatible variant.
    fn narrow(dependency: &mut Dependency) -> Option<&mut Self>;
}

impl Capability for Dependency {
    const KIND: DependencyKind = DependencyKind::Any;

    fn narrow(dependency: &mut Dependency) -> Option<&mut Self> {
        Some(dependency)
    }
}

impl Capability for ExternalModuleDependency {
    const KIND: DependencyKind = DependencyKind::ExternalModule;

    fn narrow(dependency: &mut Dependency) -> Option<&mut Self> {
        match dependency {
            Dependency::ExternalModule(module) => Some(module),
            _ => None,
        }
    }
}

impl Capability for ProjectDependency {
    const KIND: DependencyKind = DependencyKind::Project;

    fn narrow(dependency: &mut Dependency) -> Option<&mut Self> {
        match dependency {
            Dependency::Project(project) => Some(project),
            _ => None,
        }
    }
}

impl Capability for FileCollectionDependency {
    const KIND: DependencyKind = DependencyKind::Files;

    fn narrow(dependency: &mut Dependency) -> Option<&mut Self> {
        match dependency {
            Dependency::Files(files) => Some(files),
            _ => None,
        }
    }
}

type Apply = Arc<dyn Fn(&mut Dependency) -> bool + Send + Sync>;

/// A closure run once on every freshly parsed dependency before it is
/// inserted into a configuration.
///
/// The capability is inferred from the closure argument:
///
/// ```rust
/// use kasane::{ConfiguringAction, ExcludeRule, ExternalModuleDependency};
///
/// let action = ConfiguringAction::new(|module: &mut ExternalModuleDependency| {
///     module.exclude(ExcludeRule::group("commons-logging"));
/// });
/// ```
#[derive(Clone)]
pub struct ConfiguringAction {
    expects: DependencyKind,
    apply: Apply,
}

impl ConfiguringAction {
    pub fn new<D, F>(action: F) -> Self
    where
        D: Capability,
        F: Fn(&mut D) + Send + Sync + 'static,
    {
        Self {
            expects: D::KIND,
            apply: Arc::new(move |dependency| match D::narrow(dependency) {
                Some(dependency) => {
                    action(dependency);
                    true
                }
                None => false,
            }),
        }
    }

    /// The capability this action was declared against.
    pub fn expects(&self) -> DependencyKind {
        self.expects
    }

    pub(crate) fn apply(&self, dependency: &mut Dependency) -> Result<()> {
        if !self.expects.accepts(dependency.kind()) || !(self.apply)(dependency) {
            return Err(Error::ActionTypeMismatch {
                expected: self.expects,
                found: dependency.kind(),
                notation: dependency.to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConfiguringAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguringAction")
            .field("expects", &self.expects)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> Dependency {
        ExternalModuleDependency::new(Some("org.example".into()), "lib", Some("1.0".into())).into()
    }

    #[test]
    fn display_is_canonical_notation() {
        assert_eq!(module().to_string(), "org.example:lib:1.0");

        let classified = ExternalModuleDependency::new(None, "lib", None)
            .with_artifact(Some("sources".into()), Some("zip".into()));
        assert_eq!(classified.to_string(), ":lib::sources@zip");

        let mut project = ProjectDependency::new(":core");
        assert_eq!(project.to_string(), "project(':core')");
        project.set_target_configuration("tests");
        assert_eq!(project.to_string(), "project(':core', 'tests')");
    }

    #[test]
    fn action_applies_to_matching_variant() {
        let action = ConfiguringAction::new(|module: &mut ExternalModuleDependency| {
            module
                .exclude(ExcludeRule::group("commons-logging"))
                .because("logging is provided");
        });

        let mut dependency = module();
        action.apply(&mut dependency).unwrap();

        let module = dependency.as_external_module().unwrap();
        assert_eq!(module.excludes(), &[ExcludeRule::group("commons-logging")]);
        assert_eq!(dependency.reason(), Some("logging is provided"));
    }

    #[test]
    fn supertype_action_accepts_everything() {
        let action = ConfiguringAction::new(|_: &mut Dependency| {});
        assert_eq!(action.expects(), DependencyKind::Any);

        let mut project = Dependency::from(ProjectDependency::new(":web"));
        let mut files = Dependency::from(FileCollectionDependency::new(FileSet::new()));
        assert!(action.apply(&mut project).is_ok());
        assert!(action.apply(&mut files).is_ok());
    }

    #[test]
    fn action_rejects_other_variant() {
        let action = ConfiguringAction::new(|project: &mut ProjectDependency| {
            project.set_transitive(false);
        });

        let mut dependency = module();
        let err = action.apply(&mut dependency).unwrap_err();
        assert!(matches!(
            err,
            Error::ActionTypeMismatch {
                expected: DependencyKind::Project,
                found: DependencyKind::ExternalModule,
                ..
            }
        ));
        assert_eq!(dependency, module());
    }

    #[test]
    fn exclude_rule_matching() {
        assert!(ExcludeRule::group("g").matches(Some("g"), "any"));
        assert!(!ExcludeRule::group("g").matches(None, "any"));
        assert!(ExcludeRule::module("m").matches(None, "m"));
        assert!(ExcludeRule::new("g", "m").matches(Some("g"), "m"));
        assert!(!ExcludeRule::new("g", "m").matches(Some("g"), "n"));
        assert!(
            !ExcludeRule {
                group: None,
                module: None
            }
            .matches(Some("g"), "m")
        );
    }

    #[test]
    fn project_name_is_last_segment() {
        assert_eq!(ProjectDependency::new(":libs:core").project_name(), "core");
        assert_eq!(ProjectDependency::new("web").project_name(), "web");
    }
}
