//! File discovery: turn file and directory options into a source set.
//!
//! Directories are walked recursively with `ignore::WalkBuilder`, filtered by
//! extension, hidden-entry policy and ignore globs. Explicit files are taken
//! as given, except that `*` and `?` in a file name expand against its
//! parent directory.
//!
//! VCS ignore files are not consulted.

use std::{
    collections::BTreeSet,
    env, fs, io,
    path::{Path, PathBuf},
};

use ignore::{
    WalkBuilder,
    overrides::{Override, OverrideBuilder},
};

/// Extensions collected when none are configured.
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["php", "php3", "phtml"];

/// Errors that can occur while collecting files.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: ignore::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// What to collect and how.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// File extensions (without dot) picked up while walking directories.
    pub extensions: Vec<String>,
    /// Globs for files and directories to leave out.
    pub ignore_patterns: Vec<String>,
    /// Descend into entries whose name starts with `.`.
    pub include_hidden: bool,
    /// Follow symlinks to files and directories.
    pub follow_symlinks: bool,
    /// Explicit files; the file name may contain `*` and `?`.
    pub files: Vec<String>,
    /// Directories to walk recursively.
    pub directories: Vec<PathBuf>,
}

/// The collected files: canonical, sorted, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    files: Vec<PathBuf>,
}

impl SourceSet {
    pub fn from_files(files: impl IntoIterator<Item = PathBuf>) -> Self {
        let files: BTreeSet<PathBuf> = files.into_iter().collect();
        Self {
            files: files.into_iter().collect(),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The deepest directory containing every file. `None` for an empty set.
    pub fn project_root(&self) -> Option<PathBuf> {
        let mut parents = self.files.iter().filter_map(|f| f.parent());
        let first = parents.next()?.to_path_buf();
        Some(parents.fold(first, |root, parent| common_ancestor(&root, parent)))
    }
}

/// Collect every file selected by `options`.
pub fn discover(options: &DiscoveryOptions) -> Result<SourceSet, DiscoveryError> {
    let extensions: Vec<String> = options
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut found = BTreeSet::new();

    let cwd = env::current_dir()?;
    let explicit_ignores = ignore_overrides(&cwd, &options.ignore_patterns)?;
    for file in &options.files {
        for path in expand_file(file, options)? {
            let absolute = cwd.join(&path);
            if explicit_ignores.matched(&absolute, false).is_ignore() {
                tracing::debug!(path = %path.display(), "ignored by pattern");
                continue;
            }
            found.insert(absolute.canonicalize()?);
        }
    }

    for dir in &options.directories {
        if !dir.is_dir() {
            return Err(DiscoveryError::MissingDirectory(dir.clone()));
        }
        walk_directory(dir, &extensions, options, &mut found)?;
    }

    tracing::debug!(count = found.len(), "collected source files");
    Ok(SourceSet::from_files(found))
}

/// Walk one directory recursively, adding matching files to `found`.
fn walk_directory(
    dir: &Path,
    extensions: &[String],
    options: &DiscoveryOptions,
    found: &mut BTreeSet<PathBuf>,
) -> Result<(), DiscoveryError> {
    let overrides = ignore_overrides(dir, &options.ignore_patterns)?;

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(!options.include_hidden)
        .follow_links(options.follow_symlinks)
        .overrides(overrides)
        .sort_by_file_name(Ord::cmp)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable entry");
                continue;
            }
        };

        // Unfollowed symlinks report a symlink file type and drop out here.
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if !has_extension(entry.path(), extensions) {
            continue;
        }
        found.insert(entry.path().canonicalize()?);
    }

    Ok(())
}

/// Expand one explicit file option into concrete paths.
fn expand_file(file: &str, options: &DiscoveryOptions) -> Result<Vec<PathBuf>, DiscoveryError> {
    let path = PathBuf::from(file.trim());

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !name.contains(['*', '?']) {
        if !path.is_file() {
            return Err(DiscoveryError::MissingFile(path));
        }
        return Ok(vec![path]);
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(DiscoveryError::MissingDirectory(parent));
    }

    let mut builder = OverrideBuilder::new(&parent);
    builder.add(&name).map_err(|source| DiscoveryError::Pattern {
        pattern: file.to_string(),
        source,
    })?;
    let matcher = builder.build().map_err(|source| DiscoveryError::Pattern {
        pattern: file.to_string(),
        source,
    })?;

    let mut matches = Vec::new();
    for entry in fs::read_dir(&parent)? {
        let entry = entry?;
        let entry_name = entry.file_name();
        if !options.include_hidden && entry_name.to_string_lossy().starts_with('.') {
            continue;
        }
        let file_type = entry.file_type()?;
        let is_file = if file_type.is_symlink() {
            options.follow_symlinks && entry.path().is_file()
        } else {
            file_type.is_file()
        };
        if is_file && matcher.matched(entry.path(), false).is_whitelist() {
            matches.push(entry.path());
        }
    }
    matches.sort();

    if matches.is_empty() {
        tracing::warn!(pattern = %file, "file pattern matched nothing");
    }
    Ok(matches)
}

/// Build an override set where every pattern excludes.
fn ignore_overrides(root: &Path, patterns: &[String]) -> Result<Override, DiscoveryError> {
    let mut builder = OverrideBuilder::new(root);
    for pattern in patterns {
        builder
            .add(&format!("!{pattern}"))
            .map_err(|source| DiscoveryError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
    }
    builder.build().map_err(|source| DiscoveryError::Pattern {
        pattern: patterns.join(","),
        source,
    })
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| extensions.iter().any(|allowed| *allowed == e))
}

fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}
