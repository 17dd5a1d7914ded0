//! Error taxonomy for lslbuild-core

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a build, collect or locate run.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("unsupported platform: {0:?} (expected one of Linux, macOS, Windows)")]
    UnsupportedPlatform(String),
    #[error("could not determine the host platform ({0})")]
    UnknownHost(String),
    #[error("no directory containing '{subdir}/' found from {start}")]
    RootNotFound { start: PathBuf, subdir: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to launch '{program}' for step '{step}': {source}")]
    Spawn {
        step: String,
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },
    #[error("artifact error: {0}")]
    Artifact(String),
    #[error("no usable liblsl found ({0})")]
    LibraryNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// A failing build step hands its own status through; everything else,
    /// including an unrecognized platform, exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { code, .. } => *code,
            _ => 1,
        }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_propagates_its_code() {
        let err = BuildError::StepFailed {
            step: "build".into(),
            code: 2,
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unsupported_platform_exits_with_one() {
        let err = BuildError::UnsupportedPlatform("Solaris".into());
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Solaris"));
    }
}
