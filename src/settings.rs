use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Settings shared by a [`ConfigurationGraph`](crate::ConfigurationGraph)
/// and everything evaluated against it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Project directory. Relative file sets and project outputs are
    /// resolved against it.
    pub root: Utf8PathBuf,
    /// Local artifact repository used by the
    /// [`LayoutResolver`](crate::LayoutResolver), relative to `root`.
    pub repository: Utf8PathBuf,
    /// Source directory of the web application, relative to `root`.
    pub web_app_dir: Utf8PathBuf,
    /// Reject mutation of configurations whose effective view was read.
    pub freeze_on_read: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            repository: Utf8PathBuf::from(".repository"),
            web_app_dir: Utf8PathBuf::from("src/main/webapp"),
            freeze_on_read: true,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn repository(mut self, repository: impl Into<Utf8PathBuf>) -> Self {
        self.repository = repository.into();
        self
    }

    pub fn web_app_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.web_app_dir = dir.into();
        self
    }

    pub fn freeze_on_read(mut self, freeze: bool) -> Self {
        self.freeze_on_read = freeze;
        self
    }

    pub(crate) fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        crate::utils::normalize_path(&self.root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_partial() {
        let settings: Settings =
            serde_json::from_str(r#"{ "root": "/work", "freezeOnRead": false }"#).unwrap();
        assert_eq!(settings.root, Utf8PathBuf::from("/work"));
        assert_eq!(settings.repository, Utf8PathBuf::from(".repository"));
        assert!(!settings.freeze_on_read);
    }

    #[test]
    fn resolve_against_root() {
        let settings = Settings::new().root("/work");
        assert_eq!(
            settings.resolve(Utf8Path::new("./src/../lib")),
            Utf8PathBuf::from("/work/lib")
        );
    }
}
