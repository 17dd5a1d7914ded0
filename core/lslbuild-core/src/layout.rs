//! Repository root and liblsl source tree resolution

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{BuildError, BuildResult};

/// Subdirectory of the repository root that holds the liblsl CMake project.
pub const SOURCE_SUBDIR: &str = "liblsl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoLayout {
    root: PathBuf,
    source_subdir: String,
}

impl RepoLayout {
    /// Use `root` as the repository root. It must contain `subdir`.
    pub fn at(root: impl AsRef<Path>, subdir: &str) -> BuildResult<Self> {
        let root = root.as_ref();
        if !root.join(subdir).is_dir() {
            return Err(BuildError::RootNotFound {
                start: root.to_path_buf(),
                subdir: subdir.to_string(),
            });
        }

        Ok(Self {
            root: root.canonicalize()?,
            source_subdir: subdir.to_string(),
        })
    }

    /// Walk from `start` up through its ancestors to the first directory
    /// that has a `subdir` child.
    pub fn discover(start: impl AsRef<Path>, subdir: &str) -> BuildResult<Self> {
        let start = start.as_ref();
        let absolute = start.canonicalize()?;

        for candidate in absolute.ancestors() {
            debug!(candidate = %candidate.display(), "probing for repository root");
            if candidate.join(subdir).is_dir() {
                return Self::at(candidate, subdir);
            }
        }

        Err(BuildError::RootNotFound {
            start: start.to_path_buf(),
            subdir: subdir.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory every build step runs in.
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.source_subdir)
    }

    /// CMake binary directory, relative paths taken against the source dir.
    pub fn build_dir(&self, build_dir: &Path) -> PathBuf {
        self.source_dir().join(build_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovers_root_from_nested_directory() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("liblsl")).expect("mkdir liblsl");
        let nested = tmp.path().join("tools/ci");
        fs::create_dir_all(&nested).expect("mkdir nested");

        let layout = RepoLayout::discover(&nested, SOURCE_SUBDIR).expect("discover");
        let expected = tmp.path().canonicalize().expect("canon");

        assert_eq!(layout.root(), expected.as_path());
        assert_eq!(layout.source_dir(), expected.join("liblsl"));
        assert!(layout.root().is_absolute());
    }

    #[test]
    fn explicit_root_without_source_is_rejected() {
        let tmp = tempdir().expect("tempdir");
        let err = RepoLayout::at(tmp.path(), SOURCE_SUBDIR).unwrap_err();
        assert!(matches!(err, BuildError::RootNotFound { .. }));
    }

    #[test]
    fn build_dir_is_under_source() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("liblsl")).expect("mkdir");
        let layout = RepoLayout::at(tmp.path(), SOURCE_SUBDIR).expect("layout");

        assert_eq!(
            layout.build_dir(Path::new("build")),
            layout.source_dir().join("build")
        );
    }
}
