//! Layered build configuration (defaults < `lslbuild.toml` < CLI flags)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BuildError, BuildResult};
use crate::layout::SOURCE_SUBDIR;
use crate::platform::Platform;

/// Environment variable CMake reads as the default installation prefix.
pub const PREFIX_VAR: &str = "CMAKE_INSTALL_PREFIX";

/// Setting this to anything but empty, `0` or `false` skips the build.
pub const SKIP_VAR: &str = "LSLBUILD_SKIP_BUILD";

/// Name of the optional per-repository config file.
pub const CONFIG_FILE_NAME: &str = "lslbuild.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub source_dir: String,
    pub build_dir: PathBuf,
    pub build_type: String,
    pub targets: Vec<String>,
    pub osx_deployment_target: Option<String>,
    pub configure_args: Vec<String>,
    pub parallel: Option<u32>,
    pub prefix: PrefixConfig,
}

/// Installation prefix per platform; `None` leaves the variable unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefixConfig {
    pub linux: Option<PathBuf>,
    pub macos: Option<PathBuf>,
    pub windows: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: SOURCE_SUBDIR.to_string(),
            build_dir: PathBuf::from("build"),
            build_type: "Release".to_string(),
            targets: vec!["install".to_string(), "package".to_string()],
            osx_deployment_target: Some("11".to_string()),
            configure_args: Vec::new(),
            parallel: None,
            prefix: PrefixConfig::default(),
        }
    }
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            linux: None,
            macos: None,
            windows: Some(PathBuf::from("C:/Program Files/LSL")),
        }
    }
}

impl BuildConfig {
    /// Read a config file.
    ///
    /// With `required == false` a missing file means defaults; a file that
    /// exists but does not parse is always an error.
    pub fn load(path: &Path, required: bool) -> BuildResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(BuildError::config(format!(
                    "cannot read {}: {err}",
                    path.display()
                )))
            }
        };

        let config = Self::from_toml(&contents)
            .map_err(|e| BuildError::config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn prefix_for(&self, platform: Platform) -> Option<&Path> {
        let prefix = match platform {
            Platform::Linux => &self.prefix.linux,
            Platform::MacOs => &self.prefix.macos,
            Platform::Windows => &self.prefix.windows,
        };
        prefix.as_deref()
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.build_type.trim().is_empty() {
            return Err(BuildError::config("build_type must not be empty"));
        }
        if self.targets.is_empty() {
            return Err(BuildError::config("targets must name at least one target"));
        }
        if self.parallel == Some(0) {
            return Err(BuildError::config("parallel must be at least 1"));
        }
        if let Some(bad) = self.configure_args.iter().find(|a| !a.starts_with("-D")) {
            return Err(BuildError::config(format!(
                "configure_args entries must be -D definitions, got {bad:?}"
            )));
        }
        Ok(())
    }
}

/// Whether the skip switch is set in the current environment.
pub fn skip_requested() -> bool {
    env::var(SKIP_VAR).map(|v| is_truthy(&v)).unwrap_or(false)
}

fn is_truthy(raw: &str) -> bool {
    let value = raw.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_ci_layout() {
        let config = BuildConfig::default();
        assert_eq!(config.source_dir, "liblsl");
        assert_eq!(config.build_type, "Release");
        assert_eq!(config.targets, vec!["install", "package"]);
        assert!(config.prefix_for(Platform::Linux).is_none());
        assert!(config.prefix_for(Platform::MacOs).is_none());
        assert_eq!(
            config.prefix_for(Platform::Windows),
            Some(Path::new("C:/Program Files/LSL"))
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = BuildConfig::from_toml(
            r#"
build_type = "Debug"

[prefix]
linux = "/opt/lsl"
"#,
        )
        .expect("parse");

        assert_eq!(config.build_type, "Debug");
        assert_eq!(config.build_dir, PathBuf::from("build"));
        assert_eq!(config.prefix_for(Platform::Linux), Some(Path::new("/opt/lsl")));
        assert!(config.prefix_for(Platform::Windows).is_some());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(BuildConfig::from_toml("buildtype = \"Debug\"").is_err());
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join(CONFIG_FILE_NAME);

        assert_eq!(BuildConfig::load(&path, false).expect("load"), BuildConfig::default());
        assert!(BuildConfig::load(&path, true).is_err());
    }

    #[test]
    fn invalid_file_is_an_error_even_when_optional() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "targets = 3").expect("write");

        let err = BuildConfig::load(&path, false).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = BuildConfig::default();
        config.targets.clear();
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.configure_args = vec!["--fresh".into()];
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.parallel = Some(0);
        assert!(config.validate().is_err());

        assert!(BuildConfig::default().validate().is_ok());
    }

    #[test]
    fn truthiness_of_skip_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("FALSE"));
    }
}
