//! The build: resolve the target, collect files, parse, store the document.
//!
//! A run moves through a fixed sequence and stops at the first failure:
//!
//! ```text
//! resolve target -> collect files -> configure parser -> parse -> store
//! ```
//!
//! Nothing is retried and nothing is written to the target unless parsing succeeds.
//! All user-facing output goes through the run's [`Bridge`] and is best-effort:
//! a lost terminal write is logged, never a build failure.

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use crate::{
    diagnostics::{Bridge, ReportingMode, Verbosity},
    discover::{self, DEFAULT_EXTENSIONS, DiscoveryOptions},
    parser::{ParseError, ParserSettings, SourceParser},
    target::{self, ResolvedTarget, TargetError},
};

/// Target used when none is configured.
pub const DEFAULT_TARGET: &str = "output";

/// Markers collected when none are configured.
pub const DEFAULT_MARKERS: [&str; 2] = ["TODO", "FIXME"];

/// Package for files without a `@package` tag, unless configured.
pub const DEFAULT_PACKAGE_NAME: &str = "Default";

/// Errors that abort a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    #[error(
        "No parsable files were found, did you specify any using the \
         --filename (-f) or --directory (-d) option?"
    )]
    NoFilesFound,

    /// A file-discovery or parser failure, message passed through.
    #[error("{0}")]
    Collaborator(String),

    #[error("failed to write {}: {source}", .path.display())]
    Persist { path: PathBuf, source: io::Error },
}

impl From<ParseError> for BuildError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NoFilesFound => Self::NoFilesFound,
            other => Self::Collaborator(other.to_string()),
        }
    }
}

/// Everything a run needs, already merged from command line and configuration.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Requested target: a directory, or a file path ending in `.xml`.
    pub target: String,
    /// Show a progress bar instead of log lines.
    pub progress: bool,
    pub verbosity: Verbosity,
    /// Style error and warning lines with ANSI colors.
    pub color: bool,
    pub discovery: DiscoveryOptions,
    pub title: String,
    pub force: bool,
    pub markers: Vec<String>,
    pub ignored_tags: Vec<String>,
    pub validate: bool,
    pub visibility: Vec<String>,
    pub default_package_name: String,
    /// Embed file contents in the document.
    pub include_source: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            progress: false,
            verbosity: Verbosity::Normal,
            color: false,
            discovery: DiscoveryOptions {
                extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
                ..DiscoveryOptions::default()
            },
            title: String::new(),
            force: false,
            markers: DEFAULT_MARKERS.iter().map(ToString::to_string).collect(),
            ignored_tags: Vec::new(),
            validate: false,
            visibility: Vec::new(),
            default_package_name: DEFAULT_PACKAGE_NAME.to_string(),
            include_source: false,
        }
    }
}

/// Run one build, reporting to `sink`. Returns where the document was stored.
pub fn run<W: Write>(
    options: &BuildOptions,
    parser: &dyn SourceParser,
    sink: W,
) -> Result<ResolvedTarget, BuildError> {
    let mode = if options.progress {
        ReportingMode::Progress
    } else {
        ReportingMode::Verbose
    };
    let mut bridge = Bridge::new(sink, mode, options.verbosity).with_color(options.color);
    tracing::debug!(mode = ?bridge.mode(), "starting build");

    bridge.status("Initializing parser and collecting files .. ");
    let target = target::resolve(&options.target)?;

    let files = discover::discover(&options.discovery)
        .map_err(|e| BuildError::Collaborator(e.to_string()))?;

    let settings = ParserSettings {
        title: options.title.clone(),
        existing_document: Some(target.path.clone()),
        force: options.force,
        markers: options.markers.clone(),
        ignored_tags: options.ignored_tags.clone(),
        validate: options.validate,
        visibility: options.visibility.clone(),
        default_package_name: options.default_package_name.clone(),
        project_root: files.project_root(),
    };

    bridge.start(u64::try_from(files.len()).unwrap_or(u64::MAX));
    bridge.status_line("OK");
    bridge.status_line("Parsing files");
    let parsed = parser.parse_files(&settings, &files, options.include_source, &mut bridge);
    bridge.finish();
    let document = parsed?;

    bridge.status(&format!(
        "Storing structure.xml in \"{}\" .. ",
        target.path.display()
    ));
    fs::write(&target.path, document).map_err(|source| BuildError::Persist {
        path: target.path.clone(),
        source,
    })?;
    bridge.status_line("OK");

    if let Some(err) = bridge.take_error() {
        tracing::warn!(error = %err, "terminal output was lost");
    }
    tracing::debug!(path = %target.path.display(), "build finished");
    Ok(target)
}
