//! The structure document: writing it, and reading entries back for reuse.
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <project title="..." visibility="public,protected" default-package="Default" settings="...">
//!   <file path="src/Widget.php" hash="..." package="Widgets">
//!     <tag name="author" line="3">Jane</tag>
//!     <marker type="TODO" line="12">handle resize</marker>
//!     <source>...</source>
//!   </file>
//! </project>
//! ```
//!
//! Every file block starts on a `  <file ` line and ends on a `  </file>`
//! line. Escaping guarantees neither appears inside a block, which is what
//! lets [`read_entries`] split a previous document without an XML parser.
//!
//! `settings` fingerprints the parser settings that shaped the file blocks.
//! Blocks are only worth reusing under the same fingerprint.

use std::{collections::HashMap, fmt::Write};

const PROJECT_OPEN: &str = "<project ";
const FILE_OPEN: &str = "  <file ";
const FILE_CLOSE: &str = "  </file>";

/// A docblock tag found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub line: usize,
    pub value: String,
}

/// A marker such as `TODO` found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: String,
    pub line: usize,
    pub text: String,
}

/// Everything recorded for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub hash: String,
    pub package: String,
    pub tags: Vec<Tag>,
    pub markers: Vec<Marker>,
    pub source: Option<String>,
}

/// A file block from a previous document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousEntry {
    pub hash: String,
    /// The block verbatim, including its trailing newline.
    pub block: String,
}

/// Builds a document incrementally.
pub struct DocumentWriter {
    out: String,
}

impl DocumentWriter {
    pub fn new(title: &str, visibility: &[String], default_package: &str, settings: &str) -> Self {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        let _ = writeln!(
            out,
            "{PROJECT_OPEN}title=\"{}\" visibility=\"{}\" default-package=\"{}\" settings=\"{}\">",
            escape(title),
            escape(&visibility.join(",")),
            escape(default_package),
            escape(settings),
        );
        Self { out }
    }

    pub fn file(&mut self, entry: &FileEntry) {
        let _ = writeln!(
            self.out,
            "{FILE_OPEN}path=\"{}\" hash=\"{}\" package=\"{}\">",
            escape(&entry.path),
            escape(&entry.hash),
            escape(&entry.package),
        );
        for tag in &entry.tags {
            let _ = writeln!(
                self.out,
                "    <tag name=\"{}\" line=\"{}\">{}</tag>",
                escape(&tag.name),
                tag.line,
                escape(&tag.value),
            );
        }
        for marker in &entry.markers {
            let _ = writeln!(
                self.out,
                "    <marker type=\"{}\" line=\"{}\">{}</marker>",
                escape(&marker.kind),
                marker.line,
                escape(&marker.text),
            );
        }
        if let Some(source) = &entry.source {
            let _ = writeln!(self.out, "    <source>{}</source>", escape(source));
        }
        self.out.push_str(FILE_CLOSE);
        self.out.push('\n');
    }

    /// Copy a block from a previous document unchanged.
    pub fn reuse(&mut self, previous: &PreviousEntry) {
        self.out.push_str(&previous.block);
    }

    pub fn finish(mut self) -> String {
        self.out.push_str("</project>\n");
        self.out
    }
}

/// Split a previous document into its file blocks, keyed by path.
///
/// Blocks without a `path` and `hash` are skipped, as is an unterminated
/// trailing block.
pub fn read_entries(document: &str) -> HashMap<String, PreviousEntry> {
    let mut entries = HashMap::new();
    let mut current: Option<(String, String, String)> = None;

    for line in document.lines() {
        if let Some((path, hash, mut block)) = current.take() {
            block.push_str(line);
            block.push('\n');
            if line == FILE_CLOSE {
                entries.insert(path, PreviousEntry { hash, block });
            } else {
                current = Some((path, hash, block));
            }
            continue;
        }

        if line.starts_with(FILE_OPEN)
            && let (Some(path), Some(hash)) = (attribute(line, "path"), attribute(line, "hash"))
        {
            current = Some((path, hash, format!("{line}\n")));
        }
    }

    entries
}

/// The `settings` fingerprint of a previous document, if it has one.
pub fn read_settings(document: &str) -> Option<String> {
    document
        .lines()
        .find(|line| line.starts_with(PROJECT_OPEN))
        .and_then(|line| attribute(line, "settings"))
}

/// Escape text for use in XML content and attribute values.
///
/// Carriage returns become a character reference so block lines survive
/// [`str::lines`]. Other control characters XML can't carry become U+FFFD.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => out.push_str("&#13;"),
            '\t' | '\n' => out.push(c),
            c if c.is_control() => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// The unescaped value of `name="..."` on a start-tag line.
fn attribute(line: &str, name: &str) -> Option<String> {
    let needle = format!(" {name}=\"");
    let start = line.find(&needle)? + needle.len();
    let len = line[start..].find('"')?;
    Some(unescape(&line[start..start + len]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, hash: &str) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            hash: hash.to_string(),
            package: "Default".to_string(),
            tags: vec![Tag {
                name: "author".to_string(),
                line: 2,
                value: "Jane <jane@example.com>".to_string(),
            }],
            markers: vec![Marker {
                kind: "TODO".to_string(),
                line: 5,
                text: "handle \"quotes\"".to_string(),
            }],
            source: Some("<?php\n  </file>\necho 1;".to_string()),
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape(r#"a < b && "c" > 'd'"#),
            "a &lt; b &amp;&amp; &quot;c&quot; &gt; &apos;d&apos;"
        );
    }

    #[test]
    fn replaces_control_characters() {
        assert_eq!(escape("a\u{0}b\tc\r\n"), "a\u{FFFD}b\tc&#13;\n");
    }

    #[test]
    fn writes_project_and_file_elements() {
        let mut writer = DocumentWriter::new(
            "Widgets & Co",
            &["public".to_string(), "protected".to_string()],
            "Default",
            "f00d",
        );
        writer.file(&entry("src/a.php", "abc"));
        let doc = writer.finish();

        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(doc.contains(
            "<project title=\"Widgets &amp; Co\" visibility=\"public,protected\" default-package=\"Default\" settings=\"f00d\">"
        ));
        assert!(doc.contains("  <file path=\"src/a.php\" hash=\"abc\" package=\"Default\">\n"));
        assert!(doc.contains(
            "    <tag name=\"author\" line=\"2\">Jane &lt;jane@example.com&gt;</tag>\n"
        ));
        assert!(doc.contains("    <marker type=\"TODO\" line=\"5\">handle &quot;quotes&quot;</marker>\n"));
        assert!(doc.ends_with("  </file>\n</project>\n"));
    }

    #[test]
    fn reads_back_written_blocks() {
        let mut writer = DocumentWriter::new("", &[], "Default", "f00d");
        writer.file(&entry("src/a.php", "aaa"));
        writer.file(&entry("src/b&c.php", "bbb"));
        let doc = writer.finish();

        let entries = read_entries(&doc);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries["src/a.php"].hash, "aaa");
        assert_eq!(entries["src/b&c.php"].hash, "bbb");
        // Escaped source content never closes a block early.
        assert!(entries["src/a.php"].block.contains("echo 1;"));
        assert!(entries["src/a.php"].block.ends_with("  </file>\n"));
    }

    #[test]
    fn reused_block_is_copied_verbatim() {
        let mut first = DocumentWriter::new("", &[], "Default", "f00d");
        first.file(&entry("src/a.php", "aaa"));
        let first = first.finish();

        let previous = read_entries(&first);
        let mut second = DocumentWriter::new("", &[], "Default", "f00d");
        second.reuse(&previous["src/a.php"]);

        assert_eq!(second.finish(), first);
    }

    #[test]
    fn reads_back_settings_fingerprint() {
        let doc = DocumentWriter::new("t", &[], "Default", "f00d").finish();

        assert_eq!(read_settings(&doc).as_deref(), Some("f00d"));
        assert_eq!(read_settings("<project title=\"t\">\n</project>\n"), None);
    }

    #[test]
    fn unterminated_block_is_dropped() {
        let doc = "<project>\n  <file path=\"a.php\" hash=\"x\" package=\"D\">\n    <tag name=\"t\" line=\"1\"></tag>\n";
        assert!(read_entries(doc).is_empty());
    }

    #[test]
    fn garbage_reads_as_empty() {
        assert!(read_entries("not a document").is_empty());
    }
}
