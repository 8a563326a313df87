//! Directory listing and depth-first traversal.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dicomtree_core::{DirEntry, FileEntry, ScanError, ScanWarning, file_name};

/// Folders and files found by one [`DirectoryWalker::list`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub folders: Vec<DirEntry>,
    pub files: Vec<FileEntry>,
}

/// Check whether a path exists, following symlinks.
///
/// Permission errors and dangling links count as "does not exist".
pub fn path_exists(path: impl AsRef<Path>) -> bool {
    fs::metadata(path).is_ok()
}

/// Hidden files and Windows shortcuts are never reported.
pub fn is_skipped_name(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".lnk")
}

enum Classified {
    Folder(DirEntry),
    File(FileEntry),
    Skipped,
}

fn classify(path: &Path) -> Classified {
    if !path_exists(path) {
        return Classified::Skipped;
    }
    if is_skipped_name(&file_name(path)) {
        return Classified::Skipped;
    }

    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(_) => return Classified::Skipped,
    };
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        Classified::Skipped
    } else if file_type.is_dir() {
        Classified::Folder(DirEntry::from_path(path))
    } else if file_type.is_file() {
        Classified::File(FileEntry::new(
            path,
            metadata.len(),
            metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
        ))
    } else {
        Classified::Skipped
    }
}

/// Lists paths into folders and files.
///
/// Entries of one call are classified in parallel; the output keeps the
/// input order.
#[derive(Debug, Default)]
pub struct DirectoryWalker {
    pool: Option<rayon::ThreadPool>,
}

impl DirectoryWalker {
    /// Create a walker on the global rayon pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Create a walker with a dedicated pool of `threads` workers (0 = global pool).
    pub fn with_threads(threads: usize) -> Result<Self, ScanError> {
        if threads == 0 {
            return Ok(Self::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dicomtree-walk-{i}"))
            .build()
            .map_err(|e| ScanError::InvalidConfig {
                message: e.to_string(),
            })?;
        Ok(Self { pool: Some(pool) })
    }

    /// Classify `paths` without descending into directories.
    pub fn list<P>(&self, paths: &[P]) -> Listing
    where
        P: AsRef<Path> + Sync,
    {
        let classify_all = || {
            paths
                .par_iter()
                .map(|p| classify(p.as_ref()))
                .collect::<Vec<_>>()
        };
        let classified = match &self.pool {
            Some(pool) => pool.install(classify_all),
            None => classify_all(),
        };

        let mut listing = Listing::default();
        for entry in classified {
            match entry {
                Classified::Folder(dir) => listing.folders.push(dir),
                Classified::File(file) => listing.files.push(file),
                Classified::Skipped => {}
            }
        }
        listing
    }

    /// Recursively enumerate every file below `roots`, lazily.
    ///
    /// Roots are taken in input order, each one fully before the next.
    pub fn walk<P: AsRef<Path>>(&self, roots: &[P]) -> Walk<'_> {
        Walk {
            walker: self,
            roots: roots.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            files: VecDeque::new(),
            folders: Vec::new(),
            warnings: Vec::new(),
            dirs_visited: 0,
            cancel: None,
            interrupted: false,
        }
    }
}

/// Children of `dir`, sorted by path.
pub fn read_children(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    children.sort();
    Ok(children)
}

/// Depth-first iterator over the files below a set of roots.
///
/// A folder's own files come before the contents of its subfolders, and
/// subfolders are visited in name order. Folders are only read when the
/// iterator is advanced past everything found before them, so dropping
/// the iterator or triggering its cancellation token stops the traversal.
pub struct Walk<'a> {
    walker: &'a DirectoryWalker,
    roots: VecDeque<PathBuf>,
    files: VecDeque<FileEntry>,
    folders: Vec<DirEntry>,
    warnings: Vec<ScanWarning>,
    dirs_visited: u64,
    cancel: Option<CancellationToken>,
    interrupted: bool,
}

impl Walk<'_> {
    /// Stop yielding once `token` is cancelled, even in the middle of a
    /// run of folders without files.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of folders whose children have been listed so far.
    pub fn dirs_visited(&self) -> u64 {
        self.dirs_visited
    }

    /// Whether cancellation cut the walk short.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Drain the warnings collected so far.
    pub fn take_warnings(&mut self) -> Vec<ScanWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn has_pending(&self) -> bool {
        !(self.roots.is_empty() && self.files.is_empty() && self.folders.is_empty())
    }

    fn interrupt(&mut self) {
        if self.has_pending() {
            debug!(
                files = self.files.len(),
                folders = self.folders.len(),
                roots = self.roots.len(),
                "walk cancelled"
            );
            self.interrupted = true;
        }
        self.roots.clear();
        self.files.clear();
        self.folders.clear();
    }

    fn enter_root(&mut self, root: &Path) {
        let listing = self.walker.list(std::slice::from_ref(&root));
        self.files.extend(listing.files);
        self.folders.extend(listing.folders);
    }

    fn descend(&mut self, dir: DirEntry) {
        self.dirs_visited += 1;
        match read_children(Path::new(&dir.path)) {
            Ok(children) => {
                debug!(path = %dir.path, entries = children.len(), "listing folder");
                let listing = self.walker.list(&children);
                self.files.extend(listing.files);
                self.folders.extend(listing.folders.into_iter().rev());
            }
            Err(err) => {
                debug!(path = %dir.path, error = %err, "skipping unreadable folder");
                self.warnings.push(ScanWarning::read_error(&dir.path, &err));
            }
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            if self.is_cancelled() {
                self.interrupt();
                return None;
            }
            if let Some(file) = self.files.pop_front() {
                return Some(file);
            }
            if let Some(dir) = self.folders.pop() {
                self.descend(dir);
                continue;
            }
            let root = self.roots.pop_front()?;
            self.enter_root(&root);
        }
    }
}
