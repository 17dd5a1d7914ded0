//! Locating and collecting build outputs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BuildError, BuildResult};
use crate::platform::Platform;

/// Archive extensions produced by CPack generators.
const PACKAGE_EXTENSIONS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".zip", ".deb", ".dmg", ".7z"];

/// Compile a file-name glob (`*` and `?` only) into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Regex {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    // Every input char is escaped or mapped to a valid construct.
    Regex::new(&re).expect("escaped glob is a valid regex")
}

/// Regular files (never symlinks) directly inside `dir` whose name satisfies `keep`.
fn scan_files(dir: &Path, keep: impl Fn(&str) -> bool) -> BuildResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BuildError::artifact(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| BuildError::artifact(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if keep(name) {
                found.push(entry.path().to_path_buf());
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Directory the compiled library lands in for this platform.
pub fn library_output_dir(build_dir: &Path, platform: Platform, build_type: &str) -> PathBuf {
    if platform.is_multi_config() {
        build_dir.join(build_type)
    } else {
        build_dir.to_path_buf()
    }
}

/// The single non-symlink liblsl shared library in the build output.
pub fn find_built_library(
    build_dir: &Path,
    platform: Platform,
    build_type: &str,
) -> BuildResult<PathBuf> {
    let dir = library_output_dir(build_dir, platform, build_type);
    let matcher = glob_to_regex(platform.library_pattern());
    let mut found = scan_files(&dir, |name| matcher.is_match(name))?;
    debug!(dir = %dir.display(), matches = found.len(), "scanned for built library");

    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(BuildError::artifact(format!(
            "no file matching {} in {}",
            platform.library_pattern(),
            dir.display()
        ))),
        n => Err(BuildError::artifact(format!(
            "expected one file matching {} in {}, found {n}",
            platform.library_pattern(),
            dir.display()
        ))),
    }
}

/// Move the built library into `dest`, creating it if needed.
pub fn collect_library(
    build_dir: &Path,
    platform: Platform,
    build_type: &str,
    dest: &Path,
) -> BuildResult<PathBuf> {
    let library = find_built_library(build_dir, platform, build_type)?;
    let file_name = library
        .file_name()
        .ok_or_else(|| BuildError::artifact(format!("no file name: {}", library.display())))?;

    fs::create_dir_all(dest)?;
    let target = dest.join(file_name);
    info!("Moving {} to {}", library.display(), target.display());

    match fs::rename(&library, &target) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            debug!(error = %err, "rename crosses filesystems; copying instead");
            fs::copy(&library, &target)?;
            fs::remove_file(&library)?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(target)
}

/// Package archives written by the `package` target.
pub fn find_packages(build_dir: &Path) -> BuildResult<Vec<PathBuf>> {
    scan_files(build_dir, is_package)
}

fn is_package(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    PACKAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
