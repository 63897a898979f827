//! In-memory filesystem
//!
//! A small tree of files, directories, symlinks and special nodes keyed by
//! absolute path. Error kinds mirror what the host filesystem reports, so the
//! copier behaves the same way against either backend.

use super::{EntryKind, FileSystem};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const MAX_LINK_HOPS: u32 = 40;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
    Special,
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self {
            Node::File(_) => EntryKind::File,
            Node::Dir => EntryKind::Directory,
            Node::Symlink(_) => EntryKind::Symlink,
            Node::Special => EntryKind::Other,
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: BTreeMap<PathBuf, Node>,
    denied: BTreeSet<PathBuf>,
}

/// Filesystem held entirely in memory
///
/// Paths must be rooted (`/a/b`). Paths registered with [`MemoryFs::deny`]
/// answer `PermissionDenied` when listed, read, or written into.
#[derive(Debug)]
pub struct MemoryFs {
    tree: Mutex<Tree>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

fn error(kind: io::ErrorKind, path: &Path) -> io::Error {
    io::Error::new(kind, format!("{}", path.display()))
}

fn root() -> PathBuf {
    PathBuf::from("/")
}

/// Lexically normalize a rooted path: drop `.`, apply `..`.
fn normalize(path: &Path) -> io::Result<PathBuf> {
    if !path.has_root() {
        return Err(error(io::ErrorKind::InvalidInput, path));
    }
    let mut normalized = root();
    for component in path.components() {
        match component {
            Component::Normal(name) => normalized.push(name),
            Component::ParentDir => {
                normalized.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    Ok(normalized)
}

impl Tree {
    /// Resolve symlinks along `path`. The last component is followed only
    /// when `follow_last` is set; it does not have to exist.
    fn resolve(&self, path: &Path, follow_last: bool, hops: &mut u32) -> io::Result<PathBuf> {
        let path = normalize(path)?;
        let names: Vec<OsString> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_os_string()),
                _ => None,
            })
            .collect();

        let mut current = root();
        for (index, name) in names.iter().enumerate() {
            match self.nodes.get(&current) {
                Some(Node::Dir) => {}
                Some(_) => return Err(error(io::ErrorKind::NotADirectory, &current)),
                None => return Err(error(io::ErrorKind::NotFound, &current)),
            }

            let next = current.join(name);
            let is_last = index + 1 == names.len();
            match self.nodes.get(&next) {
                Some(Node::Symlink(target)) if follow_last || !is_last => {
                    *hops += 1;
                    if *hops > MAX_LINK_HOPS {
                        return Err(io::Error::new(
                            io::ErrorKind::Other,
                            format!("too many levels of symbolic links: {}", next.display()),
                        ));
                    }
                    let joined = current.join(target);
                    current = self.resolve(&joined, true, hops)?;
                }
                _ => current = next,
            }
        }
        Ok(current)
    }

    fn lookup(&self, path: &Path, follow_last: bool) -> io::Result<(PathBuf, Option<&Node>)> {
        let resolved = self.resolve(path, follow_last, &mut 0)?;
        let node = self.nodes.get(&resolved);
        Ok((resolved, node))
    }

    fn check_allowed(&self, path: &Path) -> io::Result<()> {
        if self.denied.contains(path) {
            return Err(error(io::ErrorKind::PermissionDenied, path));
        }
        Ok(())
    }

    fn check_parent_allowed(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) => self.check_allowed(parent),
            None => Ok(()),
        }
    }

    fn insert_dirs(&mut self, path: &Path) {
        let mut current = root();
        for component in path.components() {
            if let Component::Normal(name) = component {
                current.push(name);
                self.nodes.entry(current.clone()).or_insert(Node::Dir);
            }
        }
    }
}

impl MemoryFs {
    /// Create an empty filesystem containing only `/`
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(root(), Node::Dir);
        Self {
            tree: Mutex::new(Tree {
                nodes,
                denied: BTreeSet::new(),
            }),
        }
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(self, path: impl AsRef<Path>, node: Node) -> Self {
        {
            let mut tree = self.tree();
            let path = normalize(path.as_ref()).unwrap_or_else(|_| root().join(path.as_ref()));
            if let Some(parent) = path.parent() {
                tree.insert_dirs(parent);
            }
            tree.nodes.insert(path, node);
        }
        self
    }

    /// Add a file, creating missing parent directories
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, Node::File(contents.into()))
    }

    /// Add a directory and its missing parents
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.insert(path, Node::Dir)
    }

    /// Add a symbolic link holding `target`
    pub fn with_symlink(self, path: impl AsRef<Path>, target: impl Into<PathBuf>) -> Self {
        self.insert(path, Node::Symlink(target.into()))
    }

    /// Add a node that is neither file, directory nor link (a socket, say)
    pub fn with_special(self, path: impl AsRef<Path>) -> Self {
        self.insert(path, Node::Special)
    }

    /// Refuse every access to `path` with `PermissionDenied`
    pub fn deny(self, path: impl AsRef<Path>) -> Self {
        if let Ok(path) = normalize(path.as_ref()) {
            self.tree().denied.insert(path);
        }
        self
    }

    /// Contents of the file at `path`, if it is a regular file
    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = normalize(path.as_ref()).ok()?;
        match self.tree().nodes.get(&path) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Kind of the node stored at `path`, without following links
    pub fn kind_of(&self, path: impl AsRef<Path>) -> Option<EntryKind> {
        let path = normalize(path.as_ref()).ok()?;
        self.tree().nodes.get(&path).map(Node::kind)
    }

    /// Every path strictly below `dir`, sorted
    pub fn paths_under(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let Ok(dir) = normalize(dir.as_ref()) else {
            return Vec::new();
        };
        self.tree()
            .nodes
            .keys()
            .filter(|p| p.starts_with(&dir) && **p != dir)
            .cloned()
            .collect()
    }
}

impl FileSystem for MemoryFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        let tree = self.tree();
        let (resolved, node) = tree.lookup(dir, true)?;
        match node {
            Some(Node::Dir) => {}
            Some(_) => return Err(error(io::ErrorKind::NotADirectory, dir)),
            None => return Err(error(io::ErrorKind::NotFound, dir)),
        }
        tree.check_allowed(&resolved)?;

        Ok(tree
            .nodes
            .keys()
            .filter(|p| p.parent() == Some(resolved.as_path()))
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect())
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        let tree = self.tree();
        match tree.lookup(path, false) {
            Ok((_, node)) => Ok(node.map(Node::kind)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn target_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        let tree = self.tree();
        match tree.lookup(path, true) {
            Ok((_, node)) => Ok(node.map(Node::kind)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let tree = self.tree();
        match tree.lookup(path, true)? {
            (resolved, Some(_)) => Ok(resolved),
            (_, None) => Err(error(io::ErrorKind::NotFound, path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.tree();
        let normalized = normalize(path)?;
        let mut current = root();
        let names: Vec<OsString> = normalized
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_os_string()),
                _ => None,
            })
            .collect();

        for (index, name) in names.iter().enumerate() {
            let next = current.join(name);
            let is_last = index + 1 == names.len();
            match tree.nodes.get(&next) {
                Some(Node::Dir) => current = next,
                Some(Node::Symlink(_)) => {
                    let (resolved, node) = tree.lookup(&next, true)?;
                    match node {
                        Some(Node::Dir) => current = resolved,
                        Some(_) if is_last => return Err(error(io::ErrorKind::AlreadyExists, &next)),
                        Some(_) => return Err(error(io::ErrorKind::NotADirectory, &next)),
                        None => return Err(error(io::ErrorKind::NotFound, &next)),
                    }
                }
                Some(_) if is_last => return Err(error(io::ErrorKind::AlreadyExists, &next)),
                Some(_) => return Err(error(io::ErrorKind::NotADirectory, &next)),
                None => {
                    tree.check_allowed(&current)?;
                    tree.nodes.insert(next.clone(), Node::Dir);
                    current = next;
                }
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.tree();
        let (resolved, node) = tree.lookup(path, false)?;
        match node {
            Some(Node::Dir) => return Err(error(io::ErrorKind::IsADirectory, path)),
            Some(_) => {}
            None => return Err(error(io::ErrorKind::NotFound, path)),
        }
        tree.check_parent_allowed(&resolved)?;
        tree.nodes.remove(&resolved);
        Ok(())
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        let tree = self.tree();
        let (resolved, node) = tree.lookup(path, true)?;
        tree.check_allowed(&resolved)?;
        match node {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(error(io::ErrorKind::IsADirectory, path)),
            Some(_) => Err(error(io::ErrorKind::InvalidInput, path)),
            None => Err(error(io::ErrorKind::NotFound, path)),
        }
    }

    fn write_all(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut tree = self.tree();
        let (resolved, node) = tree.lookup(path, true)?;
        match node {
            Some(Node::Dir) => return Err(error(io::ErrorKind::IsADirectory, path)),
            Some(Node::Special) => return Err(error(io::ErrorKind::InvalidInput, path)),
            Some(_) | None => {}
        }
        match resolved.parent().and_then(|p| tree.nodes.get(p)) {
            Some(Node::Dir) => {}
            Some(_) => return Err(error(io::ErrorKind::NotADirectory, path)),
            None => return Err(error(io::ErrorKind::NotFound, path)),
        }
        tree.check_allowed(&resolved)?;
        tree.check_parent_allowed(&resolved)?;
        tree.nodes.insert(resolved, Node::File(data.to_vec()));
        Ok(())
    }

    fn write_new(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut tree = self.tree();
        let (resolved, node) = tree.lookup(path, false)?;
        if node.is_some() {
            return Err(error(io::ErrorKind::AlreadyExists, path));
        }
        match resolved.parent().and_then(|p| tree.nodes.get(p)) {
            Some(Node::Dir) => {}
            Some(_) => return Err(error(io::ErrorKind::NotADirectory, path)),
            None => return Err(error(io::ErrorKind::NotFound, path)),
        }
        tree.check_parent_allowed(&resolved)?;
        tree.nodes.insert(resolved, Node::File(data.to_vec()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut tree = self.tree();
        let (from_resolved, from_node) = tree.lookup(from, false)?;
        let from_node = from_node
            .cloned()
            .ok_or_else(|| error(io::ErrorKind::NotFound, from))?;
        let (to_resolved, to_node) = tree.lookup(to, false)?;
        match (&from_node, to_node) {
            (Node::Dir, Some(Node::Dir)) | (_, None) => {}
            (Node::Dir, Some(_)) => return Err(error(io::ErrorKind::NotADirectory, to)),
            (_, Some(Node::Dir)) => return Err(error(io::ErrorKind::IsADirectory, to)),
            (_, Some(_)) => {}
        }
        match to_resolved.parent().and_then(|p| tree.nodes.get(p)) {
            Some(Node::Dir) => {}
            _ => return Err(error(io::ErrorKind::NotFound, to)),
        }
        tree.check_parent_allowed(&from_resolved)?;
        tree.check_parent_allowed(&to_resolved)?;

        let moved: Vec<(PathBuf, Node)> = tree
            .nodes
            .iter()
            .filter(|(p, _)| p.starts_with(&from_resolved))
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        for (path, _) in &moved {
            tree.nodes.remove(path);
        }
        for (path, node) in moved {
            let suffix = path.strip_prefix(&from_resolved).unwrap_or(Path::new(""));
            let new_path = if suffix.as_os_str().is_empty() {
                to_resolved.clone()
            } else {
                to_resolved.join(suffix)
            };
            tree.nodes.insert(new_path, node);
        }
        Ok(())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let tree = self.tree();
        match tree.lookup(path, false)? {
            (_, Some(Node::Symlink(target))) => Ok(target.clone()),
            (_, Some(_)) => Err(error(io::ErrorKind::InvalidInput, path)),
            (_, None) => Err(error(io::ErrorKind::NotFound, path)),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let mut tree = self.tree();
        let (resolved, node) = tree.lookup(link, false)?;
        if node.is_some() {
            return Err(error(io::ErrorKind::AlreadyExists, link));
        }
        match resolved.parent().and_then(|p| tree.nodes.get(p)) {
            Some(Node::Dir) => {}
            _ => return Err(error(io::ErrorKind::NotFound, link)),
        }
        tree.check_parent_allowed(&resolved)?;
        tree.nodes.insert(resolved, Node::Symlink(target.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryFs {
        MemoryFs::new()
            .with_file("/src/a.txt", "hello")
            .with_file("/src/sub/b.txt", "world")
            .with_symlink("/src/link", "sub")
            .with_symlink("/src/abs", "/src/a.txt")
    }

    #[test]
    fn test_list_is_one_level() {
        let fs = sample();
        let mut names = fs.list(Path::new("/src")).unwrap();
        names.sort();
        let expected: Vec<OsString> = ["a.txt", "abs", "link", "sub"]
            .iter()
            .map(|s| OsString::from(*s))
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_kinds_and_links() {
        let fs = sample();
        assert_eq!(fs.entry_kind(Path::new("/src/link")).unwrap(), Some(EntryKind::Symlink));
        assert_eq!(fs.target_kind(Path::new("/src/link")).unwrap(), Some(EntryKind::Directory));
        assert_eq!(fs.target_kind(Path::new("/src/abs")).unwrap(), Some(EntryKind::File));
        assert_eq!(fs.read_all(Path::new("/src/link/b.txt")).unwrap(), b"world");
        assert_eq!(
            fs.canonicalize(Path::new("/src/link/../a.txt")).unwrap(),
            PathBuf::from("/src/a.txt")
        );
        assert_eq!(fs.entry_kind(Path::new("/nope/x")).unwrap(), None);
    }

    #[test]
    fn test_link_loop_is_an_error() {
        let fs = MemoryFs::new()
            .with_symlink("/a", "/b")
            .with_symlink("/b", "/a");
        assert!(fs.target_kind(Path::new("/a")).is_err());
    }

    #[test]
    fn test_create_dir_all_over_file() {
        let fs = sample();
        let err = fs.create_dir_all(Path::new("/src/a.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        let err = fs.create_dir_all(Path::new("/src/a.txt/deeper")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);

        fs.create_dir_all(Path::new("/x/y/z")).unwrap();
        assert_eq!(fs.kind_of("/x/y"), Some(EntryKind::Directory));
    }

    #[test]
    fn test_write_needs_parent() {
        let fs = MemoryFs::new();
        let err = fs.write_all(Path::new("/missing/a"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_write_new_refuses_existing() {
        let fs = sample().with_symlink("/src/dangling", "nowhere");
        for taken in ["/src/a.txt", "/src/sub", "/src/dangling"] {
            let err = fs.write_new(Path::new(taken), b"x").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        }
        assert!(fs.kind_of("/src/nowhere").is_none());

        fs.write_new(Path::new("/src/c.txt"), b"c").unwrap();
        assert_eq!(fs.file_contents("/src/c.txt").unwrap(), b"c");
    }

    #[test]
    fn test_denied_paths() {
        let fs = sample().deny("/src/sub");
        let err = fs.list(Path::new("/src/sub")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = fs.write_all(Path::new("/src/sub/c.txt"), b"c").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_rename_replaces_file() {
        let fs = MemoryFs::new()
            .with_file("/d/.tmp", "new")
            .with_file("/d/file", "old");
        fs.rename(Path::new("/d/.tmp"), Path::new("/d/file")).unwrap();
        assert_eq!(fs.file_contents("/d/file").unwrap(), b"new");
        assert!(fs.kind_of("/d/.tmp").is_none());
    }
}
