//! Directory listing and copying.
//!
//! Listings return paths relative to the root, sorted by file name, and
//! include hidden and ignored files.

use std::collections::HashSet;
use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;
use thiserror::Error;

/// Defines errors that may occur while listing or copying files
#[derive(Error, Debug)]
pub enum FsError {
    /// The root does not exist or is not a directory
    #[error("{}: Not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// The directory walk failed
    #[error("Failed to walk {}: {source}", root.display())]
    Walk {
        /// Directory being walked.
        root: PathBuf,
        /// Underlying error.
        #[source]
        source: ignore::Error,
    },
    /// A file could not be copied
    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        /// Source file.
        from: PathBuf,
        /// Destination file.
        to: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Other I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Files below `root` at any depth.
///
/// # Errors
/// Returns [`FsError`] if `root` is not a directory or cannot be walked.
pub fn files_in_dir_recursive(root: &Path) -> Result<Vec<PathBuf>, FsError> {
    list_files(root, None)
}

/// Files directly inside `root`.
///
/// # Errors
/// Returns [`FsError`] if `root` is not a directory or cannot be walked.
pub fn files_in_dir_shallow(root: &Path) -> Result<Vec<PathBuf>, FsError> {
    list_files(root, Some(1))
}

/// Walks `root` without any ignore filtering.
fn list_files(root: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>, FsError> {
    if !root.is_dir() {
        return Err(FsError::NotADirectory(root.to_path_buf()));
    }

    let mut found = Vec::new();
    for result in WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .max_depth(max_depth)
        .sort_by_file_name(std::ffi::OsStr::cmp)
        .build()
    {
        let entry =
            result.map_err(|source| FsError::Walk { root: root.to_path_buf(), source })?;

        // ファイルのみを対象
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(relative_path) = entry.path().strip_prefix(root) else {
            continue;
        };
        found.push(relative_path.to_path_buf());
    }
    Ok(found)
}

/// Copies files from `source` into `dest`, creating directories as needed.
///
/// Editor backups (names ending in `~`) are skipped. With `recursive` unset
/// only the top level of `source` is copied.
///
/// # Errors
/// Returns [`FsError`] on the first listing or copy failure.
pub fn copy_tree(source: &Path, dest: &Path, recursive: bool) -> Result<usize, FsError> {
    tracing::info!(from = %source.display(), to = %dest.display(), "Copying files");
    let files = if recursive { files_in_dir_recursive(source)? } else { files_in_dir_shallow(source)? };

    let mut created: HashSet<PathBuf> = HashSet::new();
    let mut copied = 0;
    for file in files {
        if file.to_string_lossy().ends_with('~') {
            continue;
        }
        let from = source.join(&file);
        let to = dest.join(&file);
        if let Some(parent) = to.parent() {
            if created.insert(parent.to_path_buf()) {
                std::fs::create_dir_all(parent)
                    .map_err(|source| FsError::Io { path: parent.to_path_buf(), source })?;
            }
        }
        std::fs::copy(&from, &to).map_err(|source| FsError::Copy { from, to, source })?;
        copied += 1;
    }
    Ok(copied)
}
