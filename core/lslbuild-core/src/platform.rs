//! Platform selection from the CI runner variable or the host

use std::env;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BuildError, BuildResult};

/// Environment variable a CI runner sets to name the host operating system.
pub const RUNNER_OS_VAR: &str = "RUNNER_OS";

/// `PATH`-style override for [`Platform::system_library_roots`].
pub const SYSTEM_LIB_DIRS_VAR: &str = "LSLBUILD_SYSTEM_LIB_DIRS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    #[serde(rename = "macOS")]
    MacOs,
    Windows,
}

/// Where the selected platform came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformSource {
    Flag,
    RunnerOs,
    Host,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::MacOs, Platform::Windows];

    /// Parse a runner OS name. Matching is exact: `linux` or `MacOS` are rejected.
    pub fn from_runner_os(raw: &str) -> BuildResult<Self> {
        match raw {
            "Linux" => Ok(Self::Linux),
            "macOS" => Ok(Self::MacOs),
            "Windows" => Ok(Self::Windows),
            other => Err(BuildError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn runner_os_name(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
            Self::Windows => "Windows",
        }
    }

    /// Platform of the running binary, if it is one we know how to build on.
    pub fn host() -> Option<Self> {
        Self::from_rust_os(env::consts::OS)
    }

    fn from_rust_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::MacOs),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Extension of a shared library on this platform.
    pub fn library_suffix(self) -> &'static str {
        match self {
            Self::Linux => ".so",
            Self::MacOs => ".dylib",
            Self::Windows => ".dll",
        }
    }

    /// File-name glob of the liblsl shared library produced by the build.
    pub fn library_pattern(self) -> &'static str {
        match self {
            Self::Linux => "liblsl*.so*",
            Self::MacOs => "liblsl*.dylib",
            Self::Windows => "lsl*.dll",
        }
    }

    /// Visual Studio generators nest outputs under `<build>/<config>`.
    pub fn is_multi_config(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Conventional directories holding system-wide shared libraries.
    ///
    /// `LSLBUILD_SYSTEM_LIB_DIRS` replaces the built-in list; it is an error
    /// for it to be set while naming no existing directory.
    pub fn system_library_roots(self) -> BuildResult<Vec<PathBuf>> {
        if let Ok(raw) = env::var(SYSTEM_LIB_DIRS_VAR) {
            return roots_from_override(&raw);
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        match self {
            Self::Linux => {
                candidates.push(PathBuf::from("/usr/lib"));
                candidates.push(PathBuf::from("/usr/local/lib"));
                candidates.push(PathBuf::from("/usr/lib/x86_64-linux-gnu"));
                candidates.push(PathBuf::from("/usr/lib/aarch64-linux-gnu"));
                if let Some(home) = env::var_os("HOME") {
                    candidates.push(PathBuf::from(home).join(".local/lib"));
                }
            }
            Self::MacOs => {
                candidates.push(PathBuf::from("/usr/local/lib"));
                candidates.push(PathBuf::from("/opt/homebrew/lib"));
                candidates.push(PathBuf::from("/opt/local/lib"));
            }
            Self::Windows => {
                if let Some(program_files) = env::var_os("ProgramFiles") {
                    let lsl = PathBuf::from(program_files).join("LSL");
                    candidates.push(lsl.join("bin"));
                    candidates.push(lsl.join("lib"));
                }
                if let Some(system_root) = env::var_os("SYSTEMROOT") {
                    candidates.push(PathBuf::from(system_root).join("System32"));
                }
            }
        }

        candidates.retain(|p| p.exists());
        candidates.sort();
        candidates.dedup();
        debug!(platform = %self, roots = candidates.len(), "system library roots");

        Ok(candidates)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.runner_os_name())
    }
}

impl fmt::Display for PlatformSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Flag => "--platform",
            Self::RunnerOs => RUNNER_OS_VAR,
            Self::Host => "host",
        };
        f.write_str(label)
    }
}

/// Pick the platform: explicit flag first, then the runner variable, then the host.
///
/// A value that is present but unrecognized is an error even if the host
/// would be usable.
pub fn resolve_platform(
    flag: Option<&str>,
    runner_os: Option<&str>,
) -> BuildResult<(Platform, PlatformSource)> {
    if let Some(raw) = flag {
        return Ok((Platform::from_runner_os(raw)?, PlatformSource::Flag));
    }
    if let Some(raw) = runner_os {
        return Ok((Platform::from_runner_os(raw)?, PlatformSource::RunnerOs));
    }
    Platform::host()
        .map(|p| (p, PlatformSource::Host))
        .ok_or_else(|| BuildError::UnknownHost(env::consts::OS.to_string()))
}

fn roots_from_override(raw: &str) -> BuildResult<Vec<PathBuf>> {
    let mut overrides: Vec<PathBuf> = env::split_paths(raw)
        .filter(|p| !p.as_os_str().is_empty() && p.exists())
        .collect();

    overrides.sort();
    overrides.dedup();

    if overrides.is_empty() {
        Err(BuildError::config(format!(
            "{SYSTEM_LIB_DIRS_VAR} is set but no paths exist"
        )))
    } else {
        Ok(overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn runner_names_round_trip() {
        for platform in Platform::ALL {
            let parsed = Platform::from_runner_os(platform.runner_os_name()).expect("parse");
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn runner_names_are_case_sensitive() {
        for raw in ["linux", "MACOS", "macos", "windows", "", "FreeBSD"] {
            let err = Platform::from_runner_os(raw).unwrap_err();
            assert!(matches!(err, BuildError::UnsupportedPlatform(ref v) if v == raw));
        }
    }

    #[test]
    fn flag_wins_over_runner_variable() {
        let (platform, source) = resolve_platform(Some("Windows"), Some("Linux")).expect("resolve");
        assert_eq!(platform, Platform::Windows);
        assert_eq!(source, PlatformSource::Flag);
    }

    #[test]
    fn bad_runner_value_is_not_masked_by_host() {
        assert!(resolve_platform(None, Some("Plan9")).is_err());
    }

    #[test]
    fn rust_os_names_map_to_platforms() {
        assert_eq!(Platform::from_rust_os("macos"), Some(Platform::MacOs));
        assert_eq!(Platform::from_rust_os("freebsd"), None);
    }

    #[test]
    fn serializes_with_runner_spelling() {
        let json = serde_json::to_string(&Platform::MacOs).expect("json");
        assert_eq!(json, "\"macOS\"");
    }

    #[test]
    fn override_keeps_only_existing_dirs() {
        let tmp = tempdir().expect("tempdir");
        let lib_dir = tmp.path().join("lib");
        std::fs::create_dir_all(&lib_dir).expect("mkdir");

        let raw = env::join_paths([lib_dir.as_path(), Path::new("/nonexistent/lslbuild-lib")])
            .expect("join");
        let roots = roots_from_override(raw.to_str().expect("utf8")).expect("roots");
        assert_eq!(roots, vec![lib_dir]);

        assert!(roots_from_override("/nonexistent/lslbuild-lib").is_err());
    }
}
