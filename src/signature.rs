//! Content signature of a template directory.

use std::fmt::Write as _;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::LazyLock;

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};
use sha2::{
    Digest,
    Sha256,
};
use thiserror::Error;

use crate::fsutil::{
    FsError,
    files_in_dir_recursive,
};
use crate::store::{
    ContentError,
    ContentStore,
};

/// Files that contribute to a signature.
const SIGNED_PATTERNS: [&str; 6] = ["*.html", "*.js", "*.htaccess", "*.inc", "*.example", "*.php"];

/// Files that contribute to a directory signature.
#[allow(clippy::unwrap_used)]
static SIGNED_FILES: LazyLock<GlobSet> = LazyLock::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in SIGNED_PATTERNS {
        builder.add(Glob::new(pattern).unwrap());
    }
    builder.build().unwrap()
});

/// Defines errors that may occur while signing a directory
#[derive(Error, Debug)]
pub enum SignatureError {
    /// The directory could not be listed.
    #[error("Failed to list {}: {source}", dir.display())]
    List {
        /// Directory being signed.
        dir: PathBuf,
        /// Underlying error.
        #[source]
        source: FsError,
    },
    /// A file could not be read.
    #[error(transparent)]
    Content(#[from] ContentError),
}

/// SHA-256 over every signed file below `dir` (sorted by path), followed by
/// each of `extra`, as lowercase hex.
///
/// Files are read through `store`, so jobs reading them later hit the cache.
///
/// # Errors
/// Returns [`SignatureError`] if the directory cannot be listed or a signed
/// file cannot be read.
pub async fn scan_dir(
    store: &ContentStore,
    dir: &Path,
    extra: &[&str],
) -> Result<String, SignatureError> {
    tracing::debug!(dir = %dir.display(), "Scanning directory for signature");
    let files = files_in_dir_recursive(dir)
        .map_err(|source| SignatureError::List { dir: dir.to_path_buf(), source })?;

    let mut hasher = Sha256::new();
    for file in files.iter().filter(|file| is_signed(file)) {
        let content = store.get(&dir.join(file)).await?;
        hasher.update(content.as_bytes());
    }
    for input in extra {
        hasher.update(input.as_bytes());
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// Whether `file` contributes to the signature.
fn is_signed(file: &Path) -> bool {
    file.file_name().is_some_and(|name| SIGNED_FILES.is_match(Path::new(name)))
}

/// Lowercase hex digits of `bytes`.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
