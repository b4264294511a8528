//! The seam between declared dependencies and the files they stand for.
//!
//! Real resolution (repositories, version conflicts, transitive closure)
//! happens elsewhere. The composer only needs something that can turn one
//! dependency into files, which is what [`Resolver`] describes.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::trace;

use crate::dependency::{Dependency, ExcludeRule, ExternalModuleDependency, ProjectDependency};
use crate::error::Result;
use crate::settings::Settings;

/// Turns a single dependency into the files it contributes to a classpath.
pub trait Resolver: Send + Sync {
    /// `excludes` are the rules in effect for the configuration being
    /// resolved, including inherited ones.
    fn resolve(&self, dependency: &Dependency, excludes: &[ExcludeRule])
    -> Result<Vec<Utf8PathBuf>>;
}

impl<F> Resolver for F
where
    F: Fn(&Dependency, &[ExcludeRule]) -> Result<Vec<Utf8PathBuf>> + Send + Sync,
{
    fn resolve(
        &self,
        dependency: &Dependency,
        excludes: &[ExcludeRule],
    ) -> Result<Vec<Utf8PathBuf>> {
        self(dependency, excludes)
    }
}

/// Resolves dependencies to their conventional location on disk, without
/// looking anything up.
///
/// * modules live in a Maven style repository:
///   `<repository>/<group as dirs>/<name>/<version>/<name>-<version>[-<classifier>].<ext>`
/// * projects publish `<root>/<path>/build/libs/<name>.jar`
/// * file sets are expanded against the root
#[derive(Debug, Clone)]
pub struct LayoutResolver {
    root: Utf8PathBuf,
    repository: Utf8PathBuf,
}

impl LayoutResolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            root: settings.resolve(Utf8Path::new("")),
            repository: settings.resolve(&settings.repository),
        }
    }

    fn module_path(&self, module: &ExternalModuleDependency) -> Utf8PathBuf {
        let mut path = self.repository.clone();
        if let Some(group) = module.group() {
            path.extend(group.split('.'));
        }
        path.push(module.name());

        let mut file = module.name().to_string();
        if let Some(version) = module.version() {
            path.push(version);
            file.push('-');
            file.push_str(version);
        }
        if let Some(classifier) = module.classifier() {
            file.push('-');
            file.push_str(classifier);
        }
        file.push('.');
        file.push_str(module.extension().unwrap_or("jar"));

        path.push(file);
        path
    }

    fn project_path(&self, project: &ProjectDependency) -> Utf8PathBuf {
        let mut path = self.root.clone();
        path.extend(project.path().split(':').filter(|part| !part.is_empty()));
        path.push("build/libs");
        path.push(format!("{}.jar", project.project_name()));
        crate::utils::normalize_path(&path)
    }
}

impl Resolver for LayoutResolver {
    fn resolve(
        &self,
        dependency: &Dependency,
        excludes: &[ExcludeRule],
    ) -> Result<Vec<Utf8PathBuf>> {
        let files = match dependency {
            Dependency::ExternalModule(module) => {
                if excludes
                    .iter()
                    .any(|rule| rule.matches(module.group(), module.name()))
                {
                    trace!(%dependency, "excluded");
                    return Ok(Vec::new());
                }
                vec![self.module_path(module)]
            }
            Dependency::Project(project) => vec![self.project_path(project)],
            Dependency::Files(files) => files.files().resolve(&self.root)?,
        };

        trace!(%dependency, ?files, "resolved");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileSet;
    use crate::notation::NotationParser;

    fn resolver() -> LayoutResolver {
        LayoutResolver::new(&Settings::default().root("/work"))
    }

    fn resolve(notation: &str, excludes: &[ExcludeRule]) -> Vec<Utf8PathBuf> {
        let dependency = NotationParser::default().parse(notation).unwrap();
        resolver().resolve(&dependency, excludes).unwrap()
    }

    #[test]
    fn module_layout() {
        assert_eq!(
            resolve("org.example:lib:1.0", &[]),
            vec![Utf8PathBuf::from(
                "/work/.repository/org/example/lib/1.0/lib-1.0.jar"
            )]
        );
        assert_eq!(
            resolve("org.example:lib:1.0:sources@zip", &[]),
            vec![Utf8PathBuf::from(
                "/work/.repository/org/example/lib/1.0/lib-1.0-sources.zip"
            )]
        );
    }

    #[test]
    fn excluded_module_resolves_to_nothing() {
        let excludes = [ExcludeRule::group("commons-logging")];
        assert!(resolve("commons-logging:commons-logging:1.2", &excludes).is_empty());
        assert_eq!(resolve("org.example:lib:1.0", &excludes).len(), 1);
    }

    #[test]
    fn project_layout() {
        let dependency = ProjectDependency::new(":libs:core").into();
        assert_eq!(
            resolver().resolve(&dependency, &[]).unwrap(),
            vec![Utf8PathBuf::from("/work/libs/core/build/libs/core.jar")]
        );
    }

    #[test]
    fn file_sets_resolve_against_root() {
        let dependency = crate::dependency::FileCollectionDependency::new(
            FileSet::from_paths(["lib/a.jar"]),
        )
        .into();
        assert_eq!(
            resolver().resolve(&dependency, &[]).unwrap(),
            vec![Utf8PathBuf::from("/work/lib/a.jar")]
        );
    }

    #[test]
    fn closures_are_resolvers() {
        let resolver = |_: &Dependency, _: &[ExcludeRule]| -> Result<Vec<Utf8PathBuf>> {
            Ok(vec![Utf8PathBuf::from("x.jar")])
        };
        let dependency = NotationParser::default().parse("g:n:1").unwrap();
        assert_eq!(resolver.resolve(&dependency, &[]).unwrap().len(), 1);
    }
}
