//! Structdoc configuration.
//!
//! Optional. Looked up in order:
//!
//! 1. `--config <path>` (must exist)
//! 2. `./structdoc.toml`
//! 3. `~/.structdoc/config.toml`
//!
//! Values here fill in whatever the command line leaves unset.
//!
//! ```toml
//! title = "Widgets"
//!
//! [parser]
//! target = "build/api"
//! extensions = ["php"]
//! markers = ["TODO", "FIXME", "XXX"]
//! visibility = "public,protected"
//! default-package-name = "Widgets"
//!
//! [files]
//! directory = ["src"]
//! ignore = ["vendor", "*Test.php"]
//! hidden = false
//! follow-symlinks = false
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

/// Project-local config file name.
pub const FILE_NAME: &str = "structdoc.toml";

/// Structdoc configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub title: Option<String>,
    pub parser: ParserConfig,
    pub files: FilesConfig,
}

/// `[parser]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParserConfig {
    pub target: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub markers: Option<Vec<String>>,
    /// Comma-separated, e.g. `"public,protected"`.
    pub visibility: Option<String>,
    pub default_package_name: Option<String>,
}

/// `[files]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilesConfig {
    pub ignore: Vec<String>,
    pub hidden: Option<bool>,
    pub follow_symlinks: Option<bool>,
    pub file: Vec<String>,
    pub directory: Vec<PathBuf>,
}

impl Config {
    /// Load the configuration, falling back to defaults when no file exists.
    ///
    /// An explicit path that doesn't exist is an error; so is any file that
    /// exists but doesn't parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = explicit {
            return Self::read(path)?
                .ok_or_else(|| format!("no config file found at {}", path.display()));
        }

        let candidates = [Some(PathBuf::from(FILE_NAME)), Self::user_path()];
        for path in candidates.into_iter().flatten() {
            if let Some(config) = Self::read(&path)? {
                tracing::debug!(path = %path.display(), "loaded config");
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    /// The per-user config file path: `~/.structdoc/config.toml`.
    pub fn user_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".structdoc").join("config.toml"))
    }

    /// Parse the file at `path`. `Ok(None)` if it doesn't exist.
    fn read(path: &Path) -> Result<Option<Self>, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents)
            .map(Some)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            title = "Widgets"

            [parser]
            target = "build/api"
            extensions = ["php", "inc"]
            markers = ["XXX"]
            visibility = "public"
            default-package-name = "Core"

            [files]
            ignore = ["vendor"]
            hidden = true
            follow-symlinks = true
            file = ["bootstrap.php"]
            directory = ["src", "lib"]
            "#,
        )
        .unwrap();

        assert_eq!(config.title.as_deref(), Some("Widgets"));
        assert_eq!(config.parser.target.as_deref(), Some("build/api"));
        assert_eq!(config.parser.extensions, Some(vec!["php".into(), "inc".into()]));
        assert_eq!(config.parser.default_package_name.as_deref(), Some("Core"));
        assert_eq!(config.files.hidden, Some(true));
        assert_eq!(config.files.follow_symlinks, Some(true));
        assert_eq!(
            config.files.directory,
            [PathBuf::from("src"), PathBuf::from("lib")]
        );
    }

    #[test]
    fn empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[parser]\ntargte = \"x\"").is_err());
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "title = \"Custom\"").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.title.as_deref(), Some("Custom"));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.starts_with("no config file found at"));
    }

    #[test]
    fn invalid_file_reports_its_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "title = ").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.starts_with(&format!("invalid config at {}", path.display())));
    }
}
