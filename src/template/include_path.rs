use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::trace;

/// The ordered directories searched for template files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludePath(Vec<PathBuf>);

impl IncludePath {
    pub fn new<P: Into<PathBuf>>(dirs: impl IntoIterator<Item = P>) -> Self {
        IncludePath(dirs.into_iter().map(Into::into).collect())
    }

    /// Parse `PATH` syntax (`dir1:dir2` on Unix).
    pub fn from_os_str(s: impl Into<OsString>) -> Self {
        let s = s.into();
        IncludePath(std::env::split_paths(&s)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect())
    }

    /// Chaining.
    pub fn push(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.0.push(dir.into());
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.0
    }

    /// First `dir/file` that is a file. Absolute names are only
    /// checked as they are.
    pub fn search(&self, file: &str) -> Option<PathBuf> {
        let path = Path::new(file);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf())
        }
        for dir in &self.0 {
            let candidate = dir.join(path);
            trace!("include_path: trying {candidate:?}");
            if candidate.is_file() {
                return Some(candidate)
            }
        }
        None
    }
}

impl Display for IncludePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sep = if cfg!(windows) { ";" } else { ":" };
        write!(f, "{}", self.0.iter().map(|p| p.to_string_lossy()).join(sep))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_search() -> anyhow::Result<()> {
        let a = tempfile::tempdir()?;
        let b = tempfile::tempdir()?;
        std::fs::write(b.path().join("page.tpl"), "b")?;
        std::fs::create_dir(a.path().join("page.tpl"))?; // not a file
        std::fs::write(a.path().join("only_a.tpl"), "a")?;
        let ip = IncludePath::new([a.path(), b.path()]);
        assert_eq!(ip.search("page.tpl"), Some(b.path().join("page.tpl")));
        assert_eq!(ip.search("only_a.tpl"), Some(a.path().join("only_a.tpl")));
        assert_eq!(ip.search("missing.tpl"), None);
        let abs = b.path().join("page.tpl");
        assert_eq!(IncludePath::default().search(abs.to_str().unwrap()), Some(abs.clone()));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn t_display() {
        let ip = IncludePath::from_os_str("/srv/templates::lib/templates");
        assert_eq!(ip.dirs().len(), 2);
        assert_eq!(ip.to_string(), "/srv/templates:lib/templates");
    }
}
