//! Target resolution: where the structure document gets written.
//!
//! A target is either a full file path ending in `.xml`, or a directory
//! that receives `structure.xml`. Directories are created on demand.

use std::{
    fs, io,
    path::{MAIN_SEPARATOR_STR, Path, PathBuf},
    process,
};

/// Suffix that marks a target as a full document path.
pub const DOCUMENT_EXTENSION: &str = ".xml";

/// File name used when the target names a directory.
pub const DOCUMENT_FILENAME: &str = "structure.xml";

/// Errors that make a target unusable.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("either an empty path or root was given: '{0}'")]
    EmptyOrRoot(String),

    #[error("could not create the target folder \"{}\": {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("the given location \"{}\" is not a folder", .0.display())]
    NotADirectory(PathBuf),

    #[error("the given path \"{}\" either does not exist or is not writable", .0.display())]
    NotWritable(PathBuf),
}

/// A validated destination for the structure document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Absolute path of the document file.
    pub path: PathBuf,
    /// Canonical directory holding the document. Exists and was writable at resolution time.
    pub dir: PathBuf,
}

/// Resolve a requested target location into an absolute document path.
///
/// Inputs ending in `.xml` are taken as file paths; their parent must already exist.
/// Anything else is a directory, created with mode `0755` if missing.
pub fn resolve(requested: &str) -> Result<ResolvedTarget, TargetError> {
    resolve_in(Path::new(""), requested)
}

/// [`resolve`], with relative inputs taken from `base` instead of the
/// working directory.
fn resolve_in(base: &Path, requested: &str) -> Result<ResolvedTarget, TargetError> {
    let trimmed = requested.trim();
    if trimmed.is_empty() || trimmed == MAIN_SEPARATOR_STR {
        return Err(TargetError::EmptyOrRoot(trimmed.to_string()));
    }

    let requested_path = &base.join(trimmed);

    let (dir, path) = if trimmed.ends_with(DOCUMENT_EXTENSION) {
        let parent = match requested_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let dir = parent
            .canonicalize()
            .map_err(|_| TargetError::NotWritable(requested_path.to_path_buf()))?;
        // `ends_with(".xml")` guarantees a final component.
        let name = requested_path
            .file_name()
            .ok_or_else(|| TargetError::NotWritable(requested_path.to_path_buf()))?;
        let path = dir.join(name);
        (dir, path)
    } else {
        if !requested_path.exists() {
            create_dir(requested_path)?;
        }
        if !requested_path.is_dir() {
            return Err(TargetError::NotADirectory(requested_path.to_path_buf()));
        }
        let dir = requested_path
            .canonicalize()
            .map_err(|_| TargetError::NotWritable(requested_path.to_path_buf()))?;
        let path = dir.join(DOCUMENT_FILENAME);
        (dir, path)
    };

    if !is_writable(&dir) {
        return Err(TargetError::NotWritable(path));
    }

    tracing::debug!(path = %path.display(), "resolved target");
    Ok(ResolvedTarget { path, dir })
}

/// Create `path` and any missing ancestors (owner rwx, group/other rx).
fn create_dir(path: &Path) -> Result<(), TargetError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(path).map_err(|source| TargetError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Probe writability by creating and removing a scratch file.
fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".structdoc-probe-{}", process::id()));
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
    {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(e) => e.kind() == io::ErrorKind::AlreadyExists,
    }
}
