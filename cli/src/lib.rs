//! lslbuild CLI

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lslbuild_core::artifacts::collect_library;
use lslbuild_core::config::skip_requested;
use lslbuild_core::locate::{locate_library, LocateOptions, LocatedLibrary};
use lslbuild_core::output::{write_json_pretty, write_ndjson};
use lslbuild_core::pipeline::{plan_build, run_build, BuildOptions, BuildSummary};
use lslbuild_core::plan::{BuildPlan, EnvChange};
use lslbuild_core::platform::{resolve_platform, RUNNER_OS_VAR};
use lslbuild_core::runner::SystemRunner;
use lslbuild_core::BuildError;

/// CLI entrypoint for lslbuild.
#[derive(Debug, Parser)]
#[command(
    name = "lslbuild",
    about = "Configure, build, install and package liblsl with CMake"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the configure and build/install/package steps
    Build(BuildArgs),
    /// Print the steps a build would run
    Plan(PlanArgs),
    /// Move the built shared library out of a build tree
    Collect(CollectArgs),
    /// Find an installed liblsl that is new enough to use
    Locate(LocateArgs),
}

#[derive(Debug, Args)]
struct SelectArgs {
    /// Repository root containing liblsl/ (discovered from the working directory if omitted)
    #[arg(long = "root", env = "LSLBUILD_ROOT", value_hint = ValueHint::DirPath)]
    root: Option<PathBuf>,

    /// Config file (defaults to <root>/lslbuild.toml when present)
    #[arg(long = "config", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Platform name (Linux, macOS, Windows); overrides $RUNNER_OS
    #[arg(long = "platform")]
    platform: Option<String>,

    /// CMake executable
    #[arg(long = "cmake", env = "CMAKE", default_value = "cmake", value_hint = ValueHint::CommandName)]
    cmake: String,

    /// CMake build type (overrides the config file)
    #[arg(long = "build-type")]
    build_type: Option<String>,

    /// Parallel build jobs passed to `cmake --build`
    #[arg(short = 'j', long = "parallel")]
    parallel: Option<u32>,
}

#[derive(Debug, Args)]
struct BuildArgs {
    #[command(flatten)]
    select: SelectArgs,

    /// Move the built shared library into this directory afterwards
    #[arg(long = "collect-to", value_hint = ValueHint::DirPath)]
    collect_to: Option<PathBuf>,

    /// Resolve and print the plan without running anything
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Emit the run summary as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    select: SelectArgs,

    /// Emit the whole plan as a JSON document
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit one JSON step per line
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,
}

#[derive(Debug, Args)]
struct CollectArgs {
    /// CMake binary directory
    #[arg(long = "build-dir", value_hint = ValueHint::DirPath)]
    build_dir: PathBuf,

    /// Destination folder for the library
    #[arg(long = "dest", value_hint = ValueHint::DirPath)]
    dest: PathBuf,

    /// Platform name (Linux, macOS, Windows); overrides $RUNNER_OS
    #[arg(long = "platform")]
    platform: Option<String>,

    /// Build type subfolder used by multi-config generators
    #[arg(long = "build-type", default_value = "Release")]
    build_type: String,
}

#[derive(Debug, Args)]
struct LocateArgs {
    /// Bundled library folder searched after the system folders
    #[arg(long = "lib-dir", value_hint = ValueHint::DirPath)]
    lib_dir: Option<PathBuf>,

    /// Platform name (Linux, macOS, Windows); defaults to the host
    #[arg(long = "platform")]
    platform: Option<String>,

    /// Emit the result as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Build(args) => run_build_cmd(args),
        Command::Plan(args) => run_plan(args),
        Command::Collect(args) => run_collect(args),
        Command::Locate(args) => run_locate(args),
    }
}

/// Exit status for an error returned by [`run`].
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BuildError>()
        .map(BuildError::exit_code)
        .unwrap_or(1)
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = log_level(verbose, quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// The `RUNNER_OS` value exactly as set, empty strings included.
///
/// Read here rather than through clap's `env` support, which treats an empty
/// value as absent and would let host detection take over. A value that is not
/// valid UTF-8 is kept in lossy form so it still fails to match a platform.
fn runner_os() -> Option<String> {
    env::var_os(RUNNER_OS_VAR).map(|raw| raw.to_string_lossy().into_owned())
}

fn build_options(select: &SelectArgs) -> Result<BuildOptions> {
    Ok(BuildOptions {
        root: select.root.clone(),
        start_dir: env::current_dir().context("cannot read the working directory")?,
        config_path: select.config.clone(),
        platform_flag: select.platform.clone(),
        runner_os: runner_os(),
        cmake: select.cmake.clone(),
        build_type: select.build_type.clone(),
        parallel: select.parallel,
        ..BuildOptions::default()
    })
}

fn run_build_cmd(args: BuildArgs) -> Result<()> {
    let opts = BuildOptions {
        collect_to: args.collect_to.clone(),
        dry_run: args.dry_run,
        skip: skip_requested(),
        ..build_options(&args.select)?
    };

    let summary = run_build(&opts, &mut SystemRunner)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&summary, &mut handle)?;
    } else {
        write_summary_plain(&summary, &mut handle)?;
    }
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let opts = build_options(&args.select)?;
    let (plan, _, _) = plan_build(&opts)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.ndjson {
        write_ndjson(&plan.steps, &mut handle)?;
    } else if args.json {
        write_json_pretty(&plan, &mut handle)?;
    } else {
        write_plan_plain(&plan, &mut handle)?;
    }
    Ok(())
}

fn run_collect(args: CollectArgs) -> Result<()> {
    let runner_os = runner_os();
    let (platform, source) = resolve_platform(args.platform.as_deref(), runner_os.as_deref())?;
    debug!(%platform, %source, build_dir = %args.build_dir.display(), "collecting library");
    let moved = collect_library(&args.build_dir, platform, &args.build_type, &args.dest)?;
    println!("{}", moved.display());
    Ok(())
}

fn run_locate(args: LocateArgs) -> Result<()> {
    let (platform, _) = resolve_platform(args.platform.as_deref(), None)?;
    let opts = LocateOptions::from_env(platform, args.lib_dir.clone())?;
    debug!(
        overrides = opts.env_paths.len(),
        roots = opts.system_roots.len(),
        "searching for liblsl"
    );
    let found = locate_library(&opts)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&found, &mut handle)?;
    } else {
        write_located_plain(&found, &mut handle)?;
    }
    Ok(())
}

fn write_plan_plain(plan: &BuildPlan, mut w: impl Write) -> Result<()> {
    writeln!(w, "platform: {}", plan.platform)?;
    writeln!(w, "root:     {}", plan.root.display())?;
    for step in &plan.steps {
        for change in &step.env {
            match change {
                EnvChange::Set { key, value } => writeln!(w, "  export {key}={value}")?,
                EnvChange::Unset { key } => writeln!(w, "  unset {key}")?,
            }
        }
        writeln!(w, "  (cd {} && {})", step.cwd.display(), step.command_line())?;
    }
    Ok(())
}

fn write_summary_plain(summary: &BuildSummary, mut w: impl Write) -> Result<()> {
    match summary {
        BuildSummary::Skipped => writeln!(w, "skipped")?,
        BuildSummary::Planned { plan, .. } => write_plan_plain(plan, &mut w)?,
        BuildSummary::Built {
            plan,
            report,
            library,
            packages,
            ..
        } => {
            writeln!(w, "built liblsl for {}", plan.platform)?;
            for step in &report.steps {
                writeln!(w, "  {:<10} ok  {} ms", step.name, step.elapsed_ms)?;
            }
            if let Some(lib) = library {
                writeln!(w, "library: {}", lib.display())?;
            }
            for package in packages {
                writeln!(w, "package: {}", package.display())?;
            }
        }
    }
    Ok(())
}

fn write_located_plain(found: &LocatedLibrary, mut w: impl Write) -> Result<()> {
    match found.version {
        Some(v) => writeln!(w, "{} ({v})", found.path.display())?,
        None => writeln!(w, "{}", found.path.display())?,
    }
    Ok(())
}
