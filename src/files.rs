//! File sets: collections of files declared by path or glob pattern.

use std::collections::HashSet;
use std::fmt::Display;

use camino::{Utf8Path, Utf8PathBuf};
use glob::glob;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::error::FileSetError;
use crate::utils::normalize_path;

/// A single entry of a [`FileSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEntry {
    /// A path which is always part of the set, whether it exists or not.
    Path(Utf8PathBuf),
    /// A glob pattern, expanded against the file system on resolution.
    Glob(String),
}

/// An ordered collection of files with no coordinate identity.
///
/// Declaring a file set does not touch the file system. Glob patterns are
/// only expanded by [`FileSet::resolve`], which is what classpath
/// composition calls at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base: Option<Utf8PathBuf>,
    entries: Vec<FileEntry>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<P>(paths: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<Utf8PathBuf>,
    {
        Self {
            base: None,
            entries: paths
                .into_iter()
                .map(|path| FileEntry::Path(path.into()))
                .collect(),
        }
    }

    /// Resolves every entry relative to `base` instead of the project root.
    pub fn with_base(mut self, base: impl Into<Utf8PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.entries.push(FileEntry::Path(path.into()));
        self
    }

    pub fn glob(mut self, pattern: impl Into<String>) -> Self {
        self.entries.push(FileEntry::Glob(pattern.into()));
        self
    }

    pub fn base(&self) -> Option<&Utf8Path> {
        self.base.as_deref()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expands the set into concrete, normalized file paths.
    ///
    /// Entries keep their declaration order, glob matches are sorted, and a
    /// file matched by several entries is listed once.
    pub fn resolve(&self, root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, FileSetError> {
        let base = match &self.base {
            Some(base) => root.join(base),
            None => root.to_path_buf(),
        };

        let expanded = self
            .entries
            .par_iter()
            .map(|entry| expand(&base, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        Ok(expanded
            .into_iter()
            .flatten()
            .filter(|path| seen.insert(path.clone()))
            .collect())
    }
}

fn expand(base: &Utf8Path, entry: &FileEntry) -> Result<Vec<Utf8PathBuf>, FileSetError> {
    match entry {
        FileEntry::Path(path) => Ok(vec![normalize_path(&base.join(path))]),
        FileEntry::Glob(pattern) => {
            let pattern = base.join(pattern);
            let mut paths = Vec::new();
            for path in glob(pattern.as_str())? {
                paths.push(normalize_path(&Utf8PathBuf::try_from(path?)?));
            }
            paths.sort();
            Ok(paths)
        }
    }
}

impl Display for FileSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "files(")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match entry {
                FileEntry::Path(path) => write!(f, "{path}")?,
                FileEntry::Glob(pattern) => write!(f, "{pattern}")?,
            }
        }
        write!(f, ")")
    }
}
