//! lslbuild-core: drive the liblsl CMake build from CI or a workstation
//!
//! The pipeline is small and strictly sequential:
//!
//! - **Platform**: read the runner OS name (`Linux`, `macOS`, `Windows`) and
//!   refuse anything else before a single command runs
//! - **Layout**: find the repository root that holds the `liblsl/` project
//! - **Plan**: a configure step and a build/install/package step, both run
//!   inside `liblsl/`, with `CMAKE_INSTALL_PREFIX` set or cleared per platform
//! - **Run**: fail fast; the first non-zero exit code ends the run and is
//!   handed back to the caller
//! - **Artifacts**: pick the one real shared library out of the build tree,
//!   list package archives, and find an installed liblsl new enough to use
//!
//! ```rust,no_run
//! use lslbuild_core::pipeline::{run_build, BuildOptions};
//! use lslbuild_core::runner::SystemRunner;
//!
//! let opts = BuildOptions {
//!     runner_os: std::env::var("RUNNER_OS").ok(),
//!     ..BuildOptions::default()
//! };
//! let summary = run_build(&opts, &mut SystemRunner)?;
//! println!("{}", serde_json::to_string_pretty(&summary)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod layout;
pub mod locate;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod platform;
pub mod runner;
pub mod version;

pub use error::{BuildError, BuildResult};
