//! Published artifacts and the tasks producing them.

use std::fmt::Display;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

/// Identity of the task producing an artifact, e.g. `jar` or `war`.
///
/// Artifacts are removed by producer identity rather than by content: before
/// the producer has run, two artifacts can be indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProducerId(Arc<str>);

impl ProducerId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProducerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProducerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A file published by a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishArtifact {
    name: String,
    extension: String,
    kind: String,
    classifier: Option<String>,
    file: Utf8PathBuf,
}

impl PublishArtifact {
    /// The artifact type defaults to the extension.
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        file: impl Into<Utf8PathBuf>,
    ) -> Self {
        let extension = extension.into();
        Self {
            name: name.into(),
            kind: extension.clone(),
            extension,
            classifier: None,
            file: file.into(),
        }
    }

    /// An archive named `<name>.<extension>` inside `dir`.
    pub fn archive(name: &str, extension: &str, dir: &Utf8Path) -> Self {
        Self::new(name, extension, dir.join(format!("{name}.{extension}")))
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn file(&self) -> &Utf8Path {
        &self.file
    }
}

/// An artifact together with the task that builds it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactBinding {
    artifact: PublishArtifact,
    producer: Option<ProducerId>,
}

impl ArtifactBinding {
    pub fn new(artifact: PublishArtifact, producer: Option<ProducerId>) -> Self {
        Self { artifact, producer }
    }

    pub fn artifact(&self) -> &PublishArtifact {
        &self.artifact
    }

    pub fn producer(&self) -> Option<&ProducerId> {
        self.producer.as_ref()
    }

    pub fn is_produced_by(&self, producer: &ProducerId) -> bool {
        self.producer.as_ref() == Some(producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_file_name() {
        let artifact = PublishArtifact::archive("app", "war", Utf8Path::new("build/libs"));
        assert_eq!(artifact.file(), Utf8Path::new("build/libs/app.war"));
        assert_eq!(artifact.kind(), "war");
    }

    #[test]
    fn producer_identity_not_content() {
        let artifact = PublishArtifact::archive("app", "jar", Utf8Path::new("build/libs"));
        let jar = ArtifactBinding::new(artifact.clone(), Some("jar".into()));
        let other = ArtifactBinding::new(artifact, Some("shadowJar".into()));

        assert_eq!(jar.artifact(), other.artifact());
        assert!(jar.is_produced_by(&ProducerId::new("jar")));
        assert!(!other.is_produced_by(&ProducerId::new("jar")));
    }
}
