//! End-to-end tests against the host filesystem

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use treecopy::config::{CopyConfig, DirCreation, SymlinkPolicy, WriteMode};
use treecopy::error::ErrorKind;
use walkdir::WalkDir;

/// Relative path -> contents for every regular file below `root`
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

/// Every path below `root`, files and directories alike
fn all_paths(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap().path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

fn write(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn create_test_structure(dir: &Path) {
    write(&dir.join("tiny.txt"), b"tiny");
    write(&dir.join("small.bin"), &vec![0xABu8; 10 * 1024]);
    write(&dir.join("subdir1/medium.bin"), &vec![0xCDu8; 100 * 1024]);
    write(&dir.join("subdir2/nested/deep.txt"), b"deep file content");
    write(&dir.join("subdir2/empty.txt"), b"");
}

#[test]
fn test_hello_world_scenario() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let target = dst.path().join("out");

    write(&src.path().join("a.txt"), b"hello");
    write(&src.path().join("sub/b.txt"), b"world");

    treecopy::copy(src.path(), &target).unwrap();

    assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(target.join("sub/b.txt")).unwrap(), b"world");
    assert_eq!(
        all_paths(&target),
        vec![
            PathBuf::from("a.txt"),
            PathBuf::from("sub"),
            PathBuf::from("sub").join("b.txt"),
        ]
    );
}

#[test]
fn test_byte_identical_tree() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    create_test_structure(src.path());

    let result = treecopy::copy(src.path(), dst.path()).unwrap();

    assert_eq!(snapshot(src.path()), snapshot(dst.path()));
    assert_eq!(result.files_copied, 5);
    assert_eq!(result.bytes_copied, 4 + 10 * 1024 + 100 * 1024 + 17);
}

#[test]
fn test_overwrite_replaces_content() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("a.txt"), b"new");
    write(&dst.path().join("a.txt"), b"old content that is longer");

    let result = treecopy::copy(src.path(), dst.path()).unwrap();

    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"new");
    assert_eq!(result.files_replaced, 1);
}

#[test]
fn test_copy_twice_is_idempotent() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    create_test_structure(src.path());

    treecopy::copy(src.path(), dst.path()).unwrap();
    let first = (all_paths(dst.path()), snapshot(dst.path()));
    treecopy::copy(src.path(), dst.path()).unwrap();
    let second = (all_paths(dst.path()), snapshot(dst.path()));

    assert_eq!(first, second);
}

#[test]
fn test_unrelated_target_files_survive() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("a.txt"), b"a");
    write(&dst.path().join("extra.txt"), b"extra");

    treecopy::copy(src.path(), dst.path()).unwrap();

    assert_eq!(fs::read(dst.path().join("extra.txt")).unwrap(), b"extra");
}

#[test]
fn test_empty_subdirectories_are_lazy() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let target = dst.path().join("out");
    fs::create_dir_all(src.path().join("empty/deeper")).unwrap();

    treecopy::copy(src.path(), &target).unwrap();
    assert!(!target.exists());

    let mut config = CopyConfig::new(src.path(), &target);
    config.dir_creation = DirCreation::Eager;
    treecopy::copy_with_config(&config).unwrap();
    assert!(target.join("empty/deeper").is_dir());
}

#[test]
fn test_missing_source_leaves_target_alone() {
    let dst = TempDir::new().unwrap();
    write(&dst.path().join("keep.txt"), b"keep");

    let err = treecopy::copy(Path::new("/does/not/exist"), dst.path()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(all_paths(dst.path()), vec![PathBuf::from("keep.txt")]);
}

#[test]
fn test_copy_into_itself_is_refused() {
    let src = TempDir::new().unwrap();
    write(&src.path().join("a.txt"), b"a");

    let err = treecopy::copy(src.path(), src.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overlap);
    assert_eq!(fs::read(src.path().join("a.txt")).unwrap(), b"a");

    let err = treecopy::copy(src.path(), &src.path().join("nested")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overlap);
    assert!(!src.path().join("nested").exists());
}

#[test]
fn test_copy_into_parent_is_refused_when_it_would_hit_the_source() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("t");
    write(&src.join("x"), b"outer");
    write(&src.join("t/x"), b"inner");

    let err = treecopy::copy(&src, root.path()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Overlap);
    assert_eq!(fs::read(src.join("x")).unwrap(), b"outer");
    assert_eq!(fs::read(src.join("t/x")).unwrap(), b"inner");
}

#[test]
fn test_atomic_mode() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    create_test_structure(src.path());
    write(&dst.path().join("tiny.txt"), b"stale");

    let mut config = CopyConfig::new(src.path(), dst.path());
    config.write_mode = WriteMode::Atomic;
    treecopy::copy_with_config(&config).unwrap();

    assert_eq!(snapshot(src.path()), snapshot(dst.path()));
    assert!(all_paths(dst.path())
        .iter()
        .all(|p| !p.to_string_lossy().contains("treecopy-tmp")));
}

#[cfg(unix)]
#[test]
fn test_symlink_policies() {
    use std::os::unix::fs::symlink;

    let src = TempDir::new().unwrap();
    write(&src.path().join("real/a.txt"), b"a");
    symlink("real/a.txt", src.path().join("file_link")).unwrap();
    symlink("real", src.path().join("dir_link")).unwrap();
    symlink("..", src.path().join("real/up")).unwrap();

    let skipped = TempDir::new().unwrap();
    treecopy::copy(src.path(), skipped.path()).unwrap();
    assert_eq!(
        all_paths(skipped.path()),
        vec![PathBuf::from("real"), PathBuf::from("real/a.txt")]
    );

    let followed = TempDir::new().unwrap();
    let mut config = CopyConfig::new(src.path(), followed.path());
    config.symlinks = SymlinkPolicy::Follow;
    let result = treecopy::copy_with_config(&config).unwrap();
    assert_eq!(fs::read(followed.path().join("file_link")).unwrap(), b"a");
    assert_eq!(fs::read(followed.path().join("dir_link/a.txt")).unwrap(), b"a");
    assert!(!followed.path().join("real/up").exists());
    assert!(result.skipped >= 1);

    let preserved = TempDir::new().unwrap();
    let mut config = CopyConfig::new(src.path(), preserved.path());
    config.symlinks = SymlinkPolicy::Preserve;
    treecopy::copy_with_config(&config).unwrap();
    let link = preserved.path().join("dir_link");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("real"));
}

#[cfg(unix)]
#[test]
fn test_sockets_are_not_copied() {
    use std::os::unix::net::UnixListener;

    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("a.txt"), b"a");
    let _listener = UnixListener::bind(src.path().join("sock")).unwrap();

    let result = treecopy::copy(src.path(), dst.path()).unwrap();

    assert_eq!(all_paths(dst.path()), vec![PathBuf::from("a.txt")]);
    assert_eq!(result.files_copied, 1);
    assert_eq!(result.skipped, 1);
}

#[test]
fn test_cli_success_and_failure() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("a.txt"), b"hello");

    let status = Command::new(env!("CARGO_BIN_EXE_treecopy"))
        .arg(src.path())
        .arg(dst.path())
        .arg("--quiet")
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"hello");

    let output = Command::new(env!("CARGO_BIN_EXE_treecopy"))
        .arg(src.path().join("missing"))
        .arg(dst.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Path not found"));
}

#[test]
fn test_cli_json_summary() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("a.txt"), b"hello");

    let output = Command::new(env!("CARGO_BIN_EXE_treecopy"))
        .arg(src.path())
        .arg(dst.path())
        .args(["--output-format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["files_copied"], 1);
    assert_eq!(summary["bytes_copied"], 5);
}
