//! The built-in parser: a per-file inventory of docblock tags and markers.

use std::{collections::HashMap, fs, path::Path};

use sha2::{Digest, Sha256};

use super::{
    ParseError, ParserSettings, PROTECTED_TAGS, SourceParser,
    document::{self, DocumentWriter, FileEntry, Marker, PreviousEntry, Tag},
};
use crate::{
    diagnostics::{DiagnosticEvent, Diagnostics, priority},
    discover::SourceSet,
};

/// Records each file's hash, package, docblock tags and markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryParser;

impl SourceParser for InventoryParser {
    fn parse_files(
        &self,
        settings: &ParserSettings,
        files: &SourceSet,
        include_source: bool,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<String, ParseError> {
        if files.is_empty() {
            return Err(ParseError::NoFilesFound);
        }

        let fingerprint = settings_fingerprint(settings, include_source);
        let previous = load_previous(settings, &fingerprint, diagnostics)?;
        let mut writer = DocumentWriter::new(
            &settings.title,
            &settings.visibility,
            &settings.default_package_name,
            &fingerprint,
        );
        let mut reused = 0usize;
        let mut parsed = 0usize;

        diagnostics.on_log(DiagnosticEvent::new(
            priority::INFO,
            format!("Starting to parse {} files", files.len()),
        ));

        for path in files.files() {
            diagnostics.on_progress();

            let relative = relative_path(path, settings.project_root.as_deref());
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    diagnostics.on_log(DiagnosticEvent::new(
                        priority::ERR,
                        format!("Unable to read {relative}: {e}"),
                    ));
                    continue;
                }
            };
            let hash = hex::encode(Sha256::digest(&bytes));

            if let Some(entry) = previous.get(&relative)
                && entry.hash == hash
            {
                diagnostics.on_debug(DiagnosticEvent::new(
                    priority::DEBUG,
                    format!("Reusing cached structure for {relative}"),
                ));
                writer.reuse(entry);
                reused += 1;
                continue;
            }

            let text = if settings.validate {
                match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        diagnostics.on_log(DiagnosticEvent::new(
                            priority::ERR,
                            format!("{relative} is not valid UTF-8 ({}); skipped", e.utf8_error()),
                        ));
                        continue;
                    }
                }
            } else {
                String::from_utf8_lossy(&bytes).into_owned()
            };

            if text.trim().is_empty() {
                diagnostics.on_log(DiagnosticEvent::new(
                    priority::WARNING,
                    format!("{relative} is empty"),
                ));
            }

            diagnostics.on_debug(DiagnosticEvent::new(
                priority::DEBUG,
                format!("Parsing {relative}"),
            ));
            writer.file(&inventory(relative, hash, &text, settings, include_source));
            parsed += 1;
        }

        if parsed + reused == 0 {
            return Err(ParseError::Failed(format!(
                "none of the {} files could be parsed",
                files.len()
            )));
        }

        if reused > 0 {
            diagnostics.on_log(DiagnosticEvent::new(
                priority::NOTICE,
                format!("{reused} unchanged files reused from the existing document"),
            ));
        }
        diagnostics.on_log(DiagnosticEvent::new(
            priority::INFO,
            format!("Finished parsing {} files", files.len()),
        ));

        Ok(writer.finish())
    }
}

/// Entries of the previous document, unless forced, absent, or written
/// under different settings.
fn load_previous(
    settings: &ParserSettings,
    fingerprint: &str,
    diagnostics: &mut dyn Diagnostics,
) -> Result<HashMap<String, PreviousEntry>, ParseError> {
    let Some(path) = &settings.existing_document else {
        return Ok(HashMap::new());
    };
    if settings.force || !path.is_file() {
        return Ok(HashMap::new());
    }
    let contents = fs::read_to_string(path).map_err(|source| ParseError::ExistingDocument {
        path: path.clone(),
        source,
    })?;

    if document::read_settings(&contents).as_deref() != Some(fingerprint) {
        diagnostics.on_log(DiagnosticEvent::new(
            priority::NOTICE,
            format!(
                "Parser settings differ from {}; rebuilding every entry",
                path.display()
            ),
        ));
        return Ok(HashMap::new());
    }
    Ok(document::read_entries(&contents))
}

/// Hash of every setting that shapes a file block.
fn settings_fingerprint(settings: &ParserSettings, include_source: bool) -> String {
    let mut hasher = Sha256::new();
    for field in [
        settings.markers.join(","),
        settings.ignored_tags.join(","),
        settings.default_package_name.clone(),
        settings.validate.to_string(),
        include_source.to_string(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Record the tags and markers of one file.
fn inventory(
    path: String,
    hash: String,
    text: &str,
    settings: &ParserSettings,
    include_source: bool,
) -> FileEntry {
    let mut tags = Vec::new();
    let mut markers = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;

        if let Some((name, value)) = docblock_tag(line)
            && !is_ignored(name, &settings.ignored_tags)
        {
            tags.push(Tag {
                name: name.to_string(),
                line: line_number,
                value: value.to_string(),
            });
        }

        if let Some((kind, marker_text)) = find_marker(line, &settings.markers) {
            markers.push(Marker {
                kind: kind.to_string(),
                line: line_number,
                text: marker_text.to_string(),
            });
        }
    }

    let package = tags
        .iter()
        .find(|t| t.name == "package" && !t.value.is_empty())
        .map_or_else(|| settings.default_package_name.clone(), |t| t.value.clone());

    FileEntry {
        path,
        hash,
        package,
        tags,
        markers,
        source: include_source.then(|| text.to_string()),
    }
}

/// A `@name value` tag on a docblock line such as ` * @author Jane`.
fn docblock_tag(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start();
    let rest = rest
        .strip_prefix("/**")
        .or_else(|| rest.strip_prefix('*'))?
        .trim_start()
        .strip_prefix('@')?;

    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '\\')))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let value = rest[end..].trim().trim_end_matches("*/").trim_end();
    Some((&rest[..end], value))
}

fn is_ignored(tag: &str, ignored: &[String]) -> bool {
    !PROTECTED_TAGS.contains(&tag) && ignored.iter().any(|i| i == tag)
}

/// The first configured marker that appears as a word followed by `:`,
/// whitespace, or the end of the line.
fn find_marker<'a>(line: &'a str, markers: &'a [String]) -> Option<(&'a str, &'a str)> {
    for marker in markers.iter().filter(|m| !m.is_empty()) {
        for (start, _) in line.match_indices(marker.as_str()) {
            let before = line[..start].chars().next_back();
            let after_index = start + marker.len();
            let after = line[after_index..].chars().next();

            let starts_word = before.is_none_or(|c| !c.is_alphanumeric());
            let ends_word = after.is_none_or(|c| c == ':' || c.is_whitespace());
            if starts_word && ends_word {
                let text = line[after_index..]
                    .trim_start_matches(':')
                    .trim()
                    .trim_end_matches("*/")
                    .trim_end();
                return Some((marker.as_str(), text));
            }
        }
    }
    None
}

/// `path` relative to `root`, with `/` separators. Paths outside `root` stay as they are.
fn relative_path(path: &Path, root: Option<&Path>) -> String {
    match root.and_then(|r| path.strip_prefix(r).ok()) {
        Some(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        None => path.to_string_lossy().into_owned(),
    }
}
