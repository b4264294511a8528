use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Normalize a path lexically, removing things like `.` and `..`.
///
/// This does not touch the file system, so symlinks are not resolved and the
/// path does not need to exist. Two files are considered the same classpath
/// entry when their normalized paths are equal.
pub(crate) fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components = path.components().peekable();
    let mut ret = if let Some(c @ Utf8Component::Prefix(..)) = components.peek().cloned() {
        components.next();
        Utf8PathBuf::from(c.as_str())
    } else {
        Utf8PathBuf::new()
    };

    for component in components {
        match component {
            Utf8Component::Prefix(..) => {}
            Utf8Component::RootDir => ret.push(Utf8Component::RootDir),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if ret.ends_with(Utf8Component::ParentDir) || ret.as_str().is_empty() {
                    ret.push(Utf8Component::ParentDir);
                } else if !ret.pop() && !ret.has_root() {
                    ret.push(Utf8Component::ParentDir);
                }
            }
            Utf8Component::Normal(c) => ret.push(c),
        }
    }

    if ret.as_str().is_empty() {
        ret.push(".");
    }

    ret
}

/// Installs a `tracing` subscriber printing to stderr.
///
/// Honours `RUST_LOG`, falling back to `kasane=info`. Calling this twice is
/// harmless, the second call fails silently.
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("kasane=info"))?;

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    Ok(())
}
