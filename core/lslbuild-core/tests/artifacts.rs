//! Picking the real liblsl out of a build tree.
use std::fs;

use lslbuild_core::artifacts::{collect_library, find_built_library, find_packages};
use lslbuild_core::platform::Platform;
use lslbuild_core::BuildError;

#[cfg(unix)]
#[test]
fn ignores_symlinked_sonames() {
    use std::os::unix::fs::symlink;

    let tmp = tempfile::tempdir().expect("tempdir");
    let real = tmp.path().join("liblsl.so.1.16.2");
    fs::write(&real, b"elf").expect("write lib");
    symlink(&real, tmp.path().join("liblsl.so.2")).expect("soname link");
    symlink(&real, tmp.path().join("liblsl.so")).expect("dev link");

    let found = find_built_library(tmp.path(), Platform::Linux, "Release").expect("find");
    assert_eq!(found, real);
}

#[test]
fn zero_or_several_candidates_is_an_error() {
    let tmp = tempfile::tempdir().expect("tempdir");

    let none = find_built_library(tmp.path(), Platform::MacOs, "Release").unwrap_err();
    assert!(matches!(none, BuildError::Artifact(_)));

    fs::write(tmp.path().join("liblsl.1.16.0.dylib"), b"a").expect("write");
    fs::write(tmp.path().join("liblsl.1.16.2.dylib"), b"b").expect("write");
    let many = find_built_library(tmp.path(), Platform::MacOs, "Release").unwrap_err();
    assert!(many.to_string().contains("found 2"));
}

#[test]
fn windows_library_is_read_from_config_subdir() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let release = tmp.path().join("Release");
    fs::create_dir_all(&release).expect("mkdir");
    fs::write(release.join("lsl.dll"), b"pe").expect("write dll");
    fs::write(release.join("lsl.lib"), b"implib").expect("write lib");
    let dest = tmp.path().join("dest");

    let moved = collect_library(tmp.path(), Platform::Windows, "Release", &dest).expect("collect");

    assert_eq!(moved, dest.join("lsl.dll"));
    assert!(moved.is_file());
    assert!(!release.join("lsl.dll").exists());
    assert!(release.join("lsl.lib").exists());
}

#[test]
fn packages_are_listed_sorted() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(tmp.path().join("liblsl-1.16.2-Linux64.tar.bz2"), b"").expect("write");
    fs::write(tmp.path().join("liblsl-1.16.2-Linux64.deb"), b"").expect("write");
    fs::write(tmp.path().join("CMakeCache.txt"), b"").expect("write");
    fs::create_dir_all(tmp.path().join("CMakeFiles")).expect("mkdir");

    let packages = find_packages(tmp.path()).expect("packages");
    let names: Vec<String> = packages
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["liblsl-1.16.2-Linux64.deb", "liblsl-1.16.2-Linux64.tar.bz2"]
    );
}

#[cfg(unix)]
#[test]
fn failed_move_keeps_library_in_build_tree() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let build = tmp.path().join("build");
    fs::create_dir_all(&build).expect("mkdir build");
    let real = build.join("liblsl.so.1.16.2");
    fs::write(&real, b"elf").expect("write lib");

    // A non-empty directory already sits where the library would land.
    let dest = tmp.path().join("lib");
    let blocker = dest.join("liblsl.so.1.16.2");
    fs::create_dir_all(&blocker).expect("mkdir blocker");
    fs::write(blocker.join("keep"), b"").expect("write keep");

    let err = collect_library(&build, Platform::Linux, "Release", &dest).unwrap_err();
    assert!(matches!(err, BuildError::Io(_)), "{err:?}");
    assert!(real.is_file());
    assert!(blocker.join("keep").is_file());
}
