//! Two-step CMake pipeline: configure, then build/install/package

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{BuildConfig, PREFIX_VAR};
use crate::layout::RepoLayout;
use crate::platform::Platform;

/// Change applied to a child process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EnvChange {
    Set { key: String, value: String },
    Unset { key: String },
}

impl EnvChange {
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Unset { key } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<EnvChange>,
}

impl Step {
    /// Value this step gives `key`: `Some(Some(v))` set, `Some(None)` unset,
    /// `None` inherited.
    pub fn env_value(&self, key: &str) -> Option<Option<&str>> {
        self.env.iter().rev().find(|c| c.key() == key).map(|c| match c {
            EnvChange::Set { value, .. } => Some(value.as_str()),
            EnvChange::Unset { .. } => None,
        })
    }

    /// Shell-like rendering for logs and plain output.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.name, self.command_line())
    }
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"', '\'']) {
        arg.to_string()
    } else {
        format!("\"{}\"", arg.replace('"', "\\\""))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub platform: Platform,
    pub root: PathBuf,
    pub build_dir: PathBuf,
    pub steps: Vec<Step>,
}

impl BuildPlan {
    /// Lay out the configure and build steps for `platform`.
    ///
    /// Both steps run inside the liblsl source directory and carry the same
    /// prefix change, so CMake sees the prefix at configure time and at
    /// install time.
    pub fn new(layout: &RepoLayout, platform: Platform, config: &BuildConfig, cmake: &str) -> Self {
        let cwd = layout.source_dir();
        let build_dir = config.build_dir.clone();
        let build_dir_arg = path_arg(&build_dir);

        let prefix_change = match config.prefix_for(platform) {
            Some(prefix) => EnvChange::Set {
                key: PREFIX_VAR.to_string(),
                value: prefix.display().to_string(),
            },
            None => EnvChange::Unset {
                key: PREFIX_VAR.to_string(),
            },
        };

        let mut configure_args = vec![
            "-S".to_string(),
            ".".to_string(),
            "-B".to_string(),
            build_dir_arg.clone(),
            format!("-DCMAKE_BUILD_TYPE={}", config.build_type),
        ];
        if platform == Platform::MacOs {
            if let Some(target) = config
                .osx_deployment_target
                .as_deref()
                .filter(|t| !t.is_empty())
            {
                configure_args.push(format!("-DCMAKE_OSX_DEPLOYMENT_TARGET={target}"));
            }
        }
        configure_args.extend(config.configure_args.iter().cloned());

        let mut build_args = vec![
            "--build".to_string(),
            build_dir_arg,
            "--config".to_string(),
            config.build_type.clone(),
        ];
        if let Some(jobs) = config.parallel {
            build_args.push("--parallel".to_string());
            build_args.push(jobs.to_string());
        }
        build_args.push("--target".to_string());
        build_args.extend(config.targets.iter().cloned());

        let steps = vec![
            Step {
                name: "configure".to_string(),
                program: cmake.to_string(),
                args: configure_args,
                cwd: cwd.clone(),
                env: vec![prefix_change.clone()],
            },
            Step {
                name: "build".to_string(),
                program: cmake.to_string(),
                args: build_args,
                cwd,
                env: vec![prefix_change],
            },
        ];

        Self {
            platform,
            root: layout.root().to_path_buf(),
            build_dir: layout.build_dir(&build_dir),
            steps,
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}
