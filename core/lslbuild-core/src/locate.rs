//! Finding a usable liblsl: environment overrides, system folders, bundled folder

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::artifacts::glob_to_regex;
use crate::error::{BuildError, BuildResult};
use crate::platform::Platform;
use crate::version::{LibVersion, MIN_VERSION};

/// Environment variables consulted first, in order.
pub const LIB_ENV_VARS: [&str; 2] = ["LSLBUILD_LIB", "PYLSL_LIB"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LibraryOrigin {
    Env { var: String },
    System { root: PathBuf },
    Bundled { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedLibrary {
    pub path: PathBuf,
    pub version: Option<LibVersion>,
    pub origin: LibraryOrigin,
}

/// Inputs to [`locate_library`]; built from the environment or by hand in tests.
#[derive(Debug, Clone)]
pub struct LocateOptions {
    pub platform: Platform,
    pub env_paths: Vec<(String, PathBuf)>,
    pub system_roots: Vec<PathBuf>,
    pub lib_dir: Option<PathBuf>,
}

impl LocateOptions {
    pub fn from_env(platform: Platform, lib_dir: Option<PathBuf>) -> BuildResult<Self> {
        let env_paths = LIB_ENV_VARS
            .iter()
            .filter_map(|var| match env::var_os(var) {
                Some(raw) if !raw.is_empty() => Some((var.to_string(), PathBuf::from(raw))),
                _ => {
                    debug!("The environment variable {var} is not set.");
                    None
                }
            })
            .collect();

        Ok(Self {
            platform,
            env_paths,
            system_roots: platform.system_library_roots()?,
            lib_dir,
        })
    }
}

/// Return the first acceptable library, trying environment overrides, then
/// system roots, then the bundled folder.
pub fn locate_library(opts: &LocateOptions) -> BuildResult<LocatedLibrary> {
    for (var, path) in &opts.env_paths {
        debug!(var = %var, path = %path.display(), "trying library from environment");
        let origin = LibraryOrigin::Env { var: var.clone() };
        if let Some(found) = accept(opts.platform, path, origin) {
            return Ok(found);
        }
    }

    for root in &opts.system_roots {
        for path in library_files_in(opts.platform, root) {
            let origin = LibraryOrigin::System { root: root.clone() };
            if let Some(found) = accept(opts.platform, &path, origin) {
                return Ok(found);
            }
        }
    }
    debug!("no suitable liblsl in the system library folders");

    if let Some(dir) = &opts.lib_dir {
        for path in library_files_in(opts.platform, dir) {
            let origin = LibraryOrigin::Bundled { dir: dir.clone() };
            if let Some(found) = accept(opts.platform, &path, origin) {
                return Ok(found);
            }
        }
    }

    Err(BuildError::LibraryNotFound(format!(
        "searched {} environment override(s), {} system folder(s){}",
        opts.env_paths.len(),
        opts.system_roots.len(),
        if opts.lib_dir.is_some() { " and the bundled folder" } else { "" }
    )))
}

/// Library files in `dir`, newest version first. Symlinks are followed.
fn library_files_in(platform: Platform, dir: &Path) -> Vec<PathBuf> {
    let matcher = glob_to_regex(platform.library_pattern());
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "cannot list library folder");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| matcher.is_match(n))
        })
        .collect();

    files.sort_by(|a, b| {
        let va = resolved_file_version(a);
        let vb = resolved_file_version(b);
        vb.cmp(&va).then_with(|| a.cmp(b))
    });
    files
}

fn file_version(path: &Path) -> Option<LibVersion> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(LibVersion::from_file_name)
}

/// Version from the name of the file a symlink chain ends at, else from the
/// link's own name. `liblsl.so -> liblsl.so.1.14.0` is 1.14.0.
fn resolved_file_version(path: &Path) -> Option<LibVersion> {
    fs::canonicalize(path)
        .ok()
        .and_then(|target| file_version(&target))
        .or_else(|| file_version(path))
}

/// Validate a candidate and report it if usable.
fn accept(platform: Platform, path: &Path, origin: LibraryOrigin) -> Option<LocatedLibrary> {
    if !has_library_suffix(platform, path) {
        warn!(
            "The liblsl '{}' does not have the expected extension '{}' for {platform}.",
            path.display(),
            platform.library_suffix()
        );
        return None;
    }
    if !path.is_file() {
        warn!("The liblsl '{}' does not exist.", path.display());
        return None;
    }

    let version = library_version(path);
    match version {
        Some(v) if !v.is_supported() => {
            warn!(
                "The liblsl '{}' is outdated. The version is {} while the minimum version required is {}.",
                path.display(),
                v.short(),
                MIN_VERSION.short()
            );
            None
        }
        Some(_) => Some(LocatedLibrary {
            path: path.to_path_buf(),
            version,
            origin,
        }),
        None => {
            warn!(
                "Could not determine the version of '{}'; accepting it unchecked.",
                path.display()
            );
            Some(LocatedLibrary {
                path: path.to_path_buf(),
                version,
                origin,
            })
        }
    }
}

fn has_library_suffix(platform: Platform, path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let suffix = platform.library_suffix();
    name.ends_with(suffix) || (platform == Platform::Linux && name.contains(".so."))
}

/// Version from the file name (after resolving symlinks), else from the
/// CMake package files installed next to the library.
pub fn library_version(path: &Path) -> Option<LibVersion> {
    if let Some(v) = resolved_file_version(path) {
        return Some(v);
    }

    let dir = path.parent()?;
    let candidates = [
        dir.join("cmake/LSL/LSLConfigVersion.cmake"),
        dir.join("../lib/cmake/LSL/LSLConfigVersion.cmake"),
        dir.join("../share/LSL/LSLConfigVersion.cmake"),
    ];
    candidates
        .iter()
        .filter_map(|c| fs::read_to_string(c).ok())
        .find_map(|text| LibVersion::from_cmake_config(&text))
}
