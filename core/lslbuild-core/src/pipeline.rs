//! End-to-end build: resolve root, pick platform, plan, run, collect

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::artifacts::{collect_library, find_packages};
use crate::config::{BuildConfig, CONFIG_FILE_NAME, SKIP_VAR};
use crate::error::BuildResult;
use crate::layout::{RepoLayout, SOURCE_SUBDIR};
use crate::plan::BuildPlan;
use crate::platform::{resolve_platform, PlatformSource};
use crate::runner::{execute, CommandRunner, RunReport};

/// Everything a build invocation can override.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Explicit repository root; discovered from `start_dir` when `None`.
    pub root: Option<PathBuf>,
    pub start_dir: PathBuf,
    /// Explicit config file; must exist when given.
    pub config_path: Option<PathBuf>,
    pub platform_flag: Option<String>,
    pub runner_os: Option<String>,
    pub cmake: String,
    pub build_type: Option<String>,
    pub parallel: Option<u32>,
    pub collect_to: Option<PathBuf>,
    pub dry_run: bool,
    pub skip: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root: None,
            start_dir: PathBuf::from("."),
            config_path: None,
            platform_flag: None,
            runner_os: None,
            cmake: "cmake".to_string(),
            build_type: None,
            parallel: None,
            collect_to: None,
            dry_run: false,
            skip: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BuildSummary {
    Skipped,
    Planned {
        source: PlatformSource,
        plan: BuildPlan,
    },
    Built {
        source: PlatformSource,
        plan: BuildPlan,
        report: RunReport,
        library: Option<PathBuf>,
        packages: Vec<PathBuf>,
    },
}

/// Layout and layered config for a run.
pub fn resolve_layout(opts: &BuildOptions) -> BuildResult<(RepoLayout, BuildConfig)> {
    let explicit = match &opts.config_path {
        Some(path) => Some(BuildConfig::load(path, true)?),
        None => None,
    };
    let subdir = explicit
        .as_ref()
        .map(|c| c.source_dir.clone())
        .unwrap_or_else(|| SOURCE_SUBDIR.to_string());

    let mut layout = match &opts.root {
        Some(root) => RepoLayout::at(root, &subdir)?,
        None => RepoLayout::discover(&opts.start_dir, &subdir)?,
    };

    let mut config = match explicit {
        Some(config) => config,
        None => {
            let config = BuildConfig::load(&layout.root().join(CONFIG_FILE_NAME), false)?;
            if config.source_dir != subdir {
                layout = RepoLayout::at(layout.root(), &config.source_dir)?;
            }
            config
        }
    };

    if let Some(build_type) = &opts.build_type {
        config.build_type = build_type.clone();
    }
    if opts.parallel.is_some() {
        config.parallel = opts.parallel;
    }
    config.validate()?;

    Ok((layout, config))
}

/// Resolve everything and produce the plan without running it.
pub fn plan_build(opts: &BuildOptions) -> BuildResult<(BuildPlan, BuildConfig, PlatformSource)> {
    let (layout, config) = resolve_layout(opts)?;
    let (platform, source) =
        resolve_platform(opts.platform_flag.as_deref(), opts.runner_os.as_deref())?;
    info!(root = %layout.root().display(), %platform, %source, "selected platform");

    let plan = BuildPlan::new(&layout, platform, &config, &opts.cmake);
    Ok((plan, config, source))
}

/// Run the whole pipeline with `runner`. Nothing is executed unless the
/// platform resolves.
pub fn run_build(opts: &BuildOptions, runner: &mut dyn CommandRunner) -> BuildResult<BuildSummary> {
    if opts.skip {
        info!("Skipping build of liblsl ({SKIP_VAR} is set).");
        return Ok(BuildSummary::Skipped);
    }

    let (plan, config, source) = plan_build(opts)?;
    if opts.dry_run {
        return Ok(BuildSummary::Planned { source, plan });
    }

    let report = execute(&plan, runner)?;

    let library = match &opts.collect_to {
        Some(dest) => Some(collect_library(
            &plan.build_dir,
            plan.platform,
            &config.build_type,
            dest,
        )?),
        None => None,
    };

    let packages = if plan.build_dir.is_dir() {
        find_packages(&plan.build_dir)?
    } else {
        Vec::new()
    };
    info!(packages = packages.len(), "liblsl build finished");

    Ok(BuildSummary::Built {
        source,
        plan,
        report,
        library,
        packages,
    })
}
