//! Parsing collaborator: turns a source set into a structure document.
//!
//! The build only depends on the [`SourceParser`] trait. The bundled
//! [`InventoryParser`] records files, docblock tags and markers; it does not
//! analyze language structure.

mod document;
mod inventory;

use std::{io, path::PathBuf};

pub use inventory::InventoryParser;

use crate::{diagnostics::Diagnostics, discover::SourceSet};

/// Tags that stay in the document even when listed as ignored.
pub const PROTECTED_TAGS: [&str; 3] = ["package", "subpackage", "ignore"];

/// Errors a parser can report.
///
/// `NoFilesFound` is kept apart so the build can tell the user how to select files.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no parsable files were found")]
    NoFilesFound,

    #[error("failed to read existing document {}: {source}", .path.display())]
    ExistingDocument { path: PathBuf, source: io::Error },

    #[error("{0}")]
    Failed(String),
}

/// Parser configuration for one run.
#[derive(Debug, Clone, Default)]
pub struct ParserSettings {
    /// Project title recorded on the document root.
    pub title: String,
    /// Previous document to reuse unchanged entries from.
    pub existing_document: Option<PathBuf>,
    /// Rebuild every entry, ignoring the previous document.
    pub force: bool,
    /// Marker words collected from source lines, e.g. `TODO`.
    pub markers: Vec<String>,
    /// Docblock tags left out of the document.
    pub ignored_tags: Vec<String>,
    /// Reject files that are not valid UTF-8 instead of decoding lossily.
    pub validate: bool,
    /// Visibility levels to document, e.g. `public`, `protected`.
    pub visibility: Vec<String>,
    /// Package assigned to files without a `@package` tag.
    pub default_package_name: String,
    /// Paths in the document are relative to this directory.
    pub project_root: Option<PathBuf>,
}

/// Something that can produce a structure document from source files.
pub trait SourceParser {
    /// Parse `files` into the serialized document.
    ///
    /// Reports through `diagnostics` while working: `on_progress` once per
    /// file, log and debug events as they occur.
    fn parse_files(
        &self,
        settings: &ParserSettings,
        files: &SourceSet,
        include_source: bool,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<String, ParseError>;
}
