//! Directory copier
//!
//! Mirrors every file below a source directory into a target directory.
//! Traversal is depth-first over an explicit stack of pending directory
//! pairs, so nesting depth never grows the call stack.

use crate::config::{CopyConfig, DirCreation, SymlinkPolicy, WriteMode};
use crate::error::{IoResultExt, Result, TreeCopyError};
use crate::fs::{EntryKind, FileSystem, LocalFs};
use serde::Serialize;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MAX_TEMP_ATTEMPTS: u32 = 64;

/// Copy operation result
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyResult {
    /// Regular files written to the target
    pub files_copied: u64,
    /// Bytes written to the target
    pub bytes_copied: u64,
    /// Files that already existed at the target and were replaced
    pub files_replaced: u64,
    /// Target directories created
    pub dirs_created: u64,
    /// Symbolic links recreated at the target
    pub links_created: u64,
    /// Source entries that were not copied (links, sockets, devices, cycles)
    pub skipped: u64,
    /// Total duration
    pub duration: Duration,
}

impl CopyResult {
    /// Print summary to console
    pub fn print_summary(&self) {
        println!("=== Copy Summary ===");
        println!("Files copied:    {}", self.files_copied);
        println!("Bytes copied:    {}", humansize::format_size(self.bytes_copied, humansize::BINARY));
        println!("Files replaced:  {}", self.files_replaced);
        println!("Directories:     {}", self.dirs_created);
        if self.links_created > 0 {
            println!("Links created:   {}", self.links_created);
        }
        println!("Skipped:         {}", self.skipped);
        println!("Duration:        {:.2?}", self.duration);
    }

    /// Summary as a JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A source directory waiting to be mirrored
struct PendingDir {
    source: PathBuf,
    target: PathBuf,
    /// Canonical paths from the root down to this directory; only tracked
    /// when links are followed
    chain: Vec<PathBuf>,
}

/// Per-directory state while its entries are processed
struct DirState<'a> {
    pending: &'a PendingDir,
    target_ready: bool,
}

/// Recursive directory copier over a [`FileSystem`]
#[derive(Debug, Clone)]
pub struct DirectoryCopier<F: FileSystem = LocalFs> {
    fs: F,
    symlinks: SymlinkPolicy,
    dir_creation: DirCreation,
    write_mode: WriteMode,
}

impl Default for DirectoryCopier<LocalFs> {
    fn default() -> Self {
        Self::new(LocalFs)
    }
}

impl<F: FileSystem> DirectoryCopier<F> {
    /// Create a copier with default options
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            symlinks: SymlinkPolicy::default(),
            dir_creation: DirCreation::default(),
            write_mode: WriteMode::default(),
        }
    }

    /// Create a copier using the options in `config`
    pub fn from_config(fs: F, config: &CopyConfig) -> Self {
        Self::new(fs)
            .with_symlinks(config.symlinks)
            .with_dir_creation(config.dir_creation)
            .with_write_mode(config.write_mode)
    }

    /// Set symbolic link handling
    pub fn with_symlinks(mut self, policy: SymlinkPolicy) -> Self {
        self.symlinks = policy;
        self
    }

    /// Set target directory creation policy
    pub fn with_dir_creation(mut self, dir_creation: DirCreation) -> Self {
        self.dir_creation = dir_creation;
        self
    }

    /// Set the file write strategy
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Underlying filesystem
    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Mirror `source` into `target`
    ///
    /// Every regular file below `source` ends up byte-identical at the same
    /// relative path below `target`. The first error aborts the copy; files
    /// written before it stay in place.
    pub fn copy(&self, source: &Path, target: &Path) -> Result<CopyResult> {
        let start = Instant::now();

        let source_root = self.fs.canonicalize(source).with_path(source)?;
        if self.fs.target_kind(&source_root).with_path(source)? != Some(EntryKind::Directory) {
            return Err(TreeCopyError::conflict(source, "source is not a directory"));
        }
        self.check_overlap(source, &source_root, target)?;

        debug!("Copying {} -> {}", source.display(), target.display());

        let mut result = CopyResult::default();
        let chain = match self.symlinks {
            SymlinkPolicy::Follow => vec![source_root],
            _ => Vec::new(),
        };
        let mut pending = vec![PendingDir {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            chain,
        }];

        while let Some(dir) = pending.pop() {
            self.copy_dir(&dir, &mut pending, &mut result)?;
        }

        result.duration = start.elapsed();
        info!(
            "Copied {} files ({} bytes) from {} to {}",
            result.files_copied,
            result.bytes_copied,
            source.display(),
            target.display()
        );
        Ok(result)
    }

    /// Mirror the entries of one directory, queueing its subdirectories
    fn copy_dir(
        &self,
        dir: &PendingDir,
        pending: &mut Vec<PendingDir>,
        result: &mut CopyResult,
    ) -> Result<()> {
        let names = self.fs.list(&dir.source).with_path(&dir.source)?;
        let mut state = DirState {
            pending: dir,
            target_ready: false,
        };

        if self.dir_creation == DirCreation::Eager {
            self.ensure_target_dir(&mut state, result)?;
        }

        for name in names {
            self.copy_entry(&mut state, name, pending, result)?;
        }
        Ok(())
    }

    fn copy_entry(
        &self,
        state: &mut DirState<'_>,
        name: OsString,
        pending: &mut Vec<PendingDir>,
        result: &mut CopyResult,
    ) -> Result<()> {
        let source = state.pending.source.join(&name);
        let target = state.pending.target.join(&name);

        match self.fs.entry_kind(&source).with_path(&source)? {
            Some(EntryKind::File) => {
                self.ensure_target_dir(state, result)?;
                self.copy_file(&source, &target, result)
            }
            Some(EntryKind::Directory) => {
                let chain = self.extend_chain(state.pending, &source)?;
                pending.push(PendingDir {
                    source,
                    target,
                    chain,
                });
                Ok(())
            }
            Some(EntryKind::Symlink) => self.copy_symlink(state, source, target, pending, result),
            Some(EntryKind::Other) => {
                debug!("Skipping special file {}", source.display());
                result.skipped += 1;
                Ok(())
            }
            None => {
                // Removed between listing and inspection.
                debug!("Skipping vanished entry {}", source.display());
                result.skipped += 1;
                Ok(())
            }
        }
    }

    fn copy_symlink(
        &self,
        state: &mut DirState<'_>,
        source: PathBuf,
        target: PathBuf,
        pending: &mut Vec<PendingDir>,
        result: &mut CopyResult,
    ) -> Result<()> {
        match self.symlinks {
            SymlinkPolicy::Skip => {
                debug!("Skipping symlink {}", source.display());
                result.skipped += 1;
                Ok(())
            }
            SymlinkPolicy::Preserve => {
                let link = self.fs.read_link(&source).with_path(&source)?;
                self.ensure_target_dir(state, result)?;
                self.clear_target(&target)?;
                self.fs.symlink(&link, &target).with_path(&target)?;
                debug!("Linked {} -> {}", target.display(), link.display());
                result.links_created += 1;
                Ok(())
            }
            SymlinkPolicy::Follow => match self.fs.target_kind(&source).with_path(&source)? {
                Some(EntryKind::File) => {
                    self.ensure_target_dir(state, result)?;
                    self.copy_file(&source, &target, result)
                }
                Some(EntryKind::Directory) => {
                    let real = self.fs.canonicalize(&source).with_path(&source)?;
                    if state.pending.chain.contains(&real) {
                        warn!(
                            "Symlink cycle: {} points back to {}",
                            source.display(),
                            real.display()
                        );
                        result.skipped += 1;
                        return Ok(());
                    }
                    let mut chain = state.pending.chain.clone();
                    chain.push(real);
                    pending.push(PendingDir {
                        source,
                        target,
                        chain,
                    });
                    Ok(())
                }
                Some(_) | None => {
                    debug!("Skipping symlink {} with no usable target", source.display());
                    result.skipped += 1;
                    Ok(())
                }
            },
        }
    }

    fn extend_chain(&self, parent: &PendingDir, source: &Path) -> Result<Vec<PathBuf>> {
        if self.symlinks != SymlinkPolicy::Follow {
            return Ok(Vec::new());
        }
        let mut chain = parent.chain.clone();
        chain.push(self.fs.canonicalize(source).with_path(source)?);
        Ok(chain)
    }

    /// Create the directory's target on first use
    fn ensure_target_dir(&self, state: &mut DirState<'_>, result: &mut CopyResult) -> Result<()> {
        if state.target_ready {
            return Ok(());
        }
        let target = &state.pending.target;
        match self.fs.target_kind(target).with_path(target)? {
            Some(EntryKind::Directory) => {}
            Some(_) => {
                return Err(TreeCopyError::conflict(
                    target,
                    "exists and is not a directory",
                ))
            }
            None => {
                self.fs.create_dir_all(target).with_path(target)?;
                debug!("Created directory {}", target.display());
                result.dirs_created += 1;
            }
        }
        state.target_ready = true;
        Ok(())
    }

    /// Remove whatever non-directory occupies `target`; returns whether
    /// something was there
    fn clear_target(&self, target: &Path) -> Result<bool> {
        match self.fs.entry_kind(target).with_path(target)? {
            None => Ok(false),
            Some(EntryKind::Directory) => Err(TreeCopyError::conflict(
                target,
                "a directory is in the way of a file",
            )),
            Some(_) => {
                self.fs.remove_file(target).with_path(target)?;
                Ok(true)
            }
        }
    }

    fn copy_file(&self, source: &Path, target: &Path, result: &mut CopyResult) -> Result<()> {
        let data = self.fs.read_all(source).with_path(source)?;

        let replaced = match self.write_mode {
            WriteMode::Direct => {
                let replaced = self.clear_target(target)?;
                self.fs.write_all(target, &data).with_path(target)?;
                replaced
            }
            WriteMode::Atomic => {
                let replaced = match self.fs.entry_kind(target).with_path(target)? {
                    Some(EntryKind::Directory) => {
                        return Err(TreeCopyError::conflict(
                            target,
                            "a directory is in the way of a file",
                        ))
                    }
                    Some(_) => true,
                    None => false,
                };
                self.write_atomic(target, &data)?;
                replaced
            }
        };

        debug!(
            "Copied {} -> {} ({} bytes)",
            source.display(),
            target.display(),
            data.len()
        );
        result.files_copied += 1;
        result.bytes_copied += data.len() as u64;
        if replaced {
            result.files_replaced += 1;
        }
        Ok(())
    }

    fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<()> {
        let temp = self.create_temp(target, data)?;
        if let Err(e) = self.fs.rename(&temp, target) {
            self.discard_temp(&temp);
            return Err(TreeCopyError::from_io(target, e));
        }
        Ok(())
    }

    /// Write `data` to a fresh hidden sibling of `target`
    ///
    /// Names already taken, whether copied entries or leftovers, are never
    /// opened; the next candidate is tried instead.
    fn create_temp(&self, target: &Path, data: &[u8]) -> Result<PathBuf> {
        for attempt in 0..MAX_TEMP_ATTEMPTS {
            let temp = temp_path(target, attempt);
            match self.fs.write_new(&temp, data) {
                Ok(()) => return Ok(temp),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("Temporary name {} is taken", temp.display());
                }
                Err(e) => {
                    self.discard_temp(&temp);
                    return Err(TreeCopyError::from_io(target, e));
                }
            }
        }
        Err(TreeCopyError::conflict(target, "no free temporary file name"))
    }

    fn discard_temp(&self, temp: &Path) {
        if self.fs.remove_file(temp).is_err() {
            debug!("No temporary file left at {}", temp.display());
        }
    }

    /// Refuse copies that would write into the source tree
    ///
    /// That is a target equal to or nested inside the source, or a source
    /// nested inside the target at a relative path the source itself also
    /// contains (copying `/d/t` to `/d` when `/d/t/t` exists).
    fn check_overlap(&self, source: &Path, source_root: &Path, target: &Path) -> Result<()> {
        let resolved = self.resolve_target(target)?;
        let overlaps = if resolved.starts_with(source_root) {
            true
        } else if let Ok(nested) = source_root.strip_prefix(&resolved) {
            let inner = source_root.join(nested);
            self.fs.entry_kind(&inner).with_path(&inner)?.is_some()
        } else {
            false
        };

        if overlaps {
            return Err(TreeCopyError::Overlap {
                source_dir: source.to_path_buf(),
                target: target.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Canonical form of `target`, which may not exist yet: the nearest
    /// existing ancestor is canonicalized and the missing tail re-appended.
    fn resolve_target(&self, target: &Path) -> Result<PathBuf> {
        let mut missing: Vec<OsString> = Vec::new();
        let mut cursor = target.to_path_buf();

        loop {
            let probe = if cursor.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                cursor.clone()
            };
            match self.fs.canonicalize(&probe) {
                Ok(mut resolved) => {
                    resolved.extend(missing.iter().rev());
                    return Ok(resolved);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    let name = cursor.file_name().map(|n| n.to_os_string());
                    match (cursor.parent(), name) {
                        (Some(parent), Some(name)) => {
                            missing.push(name);
                            cursor = parent.to_path_buf();
                        }
                        _ => return Err(TreeCopyError::from_io(target, e)),
                    }
                }
                Err(e) => return Err(TreeCopyError::from_io(target, e)),
            }
        }
    }
}

/// Hidden sibling used while a file is written atomically
fn temp_path(target: &Path, attempt: u32) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if attempt == 0 {
        target.with_file_name(format!(".{name}.treecopy-tmp"))
    } else {
        target.with_file_name(format!(".{name}.treecopy-tmp.{attempt}"))
    }
}

/// Copy `source` into `target` on the host filesystem with default options
pub fn copy(source: &Path, target: &Path) -> Result<CopyResult> {
    DirectoryCopier::new(LocalFs).copy(source, target)
}

/// Copy on the host filesystem using the paths and options in `config`
pub fn copy_with_config(config: &CopyConfig) -> Result<CopyResult> {
    DirectoryCopier::from_config(LocalFs, config).copy(&config.source, &config.target)
}
