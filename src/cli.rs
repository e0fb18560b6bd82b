//! CLI interface for structdoc.
//!
//! `structdoc parse` collects source files and writes `structure.xml`.
//! Every option falls back to the configuration file, then to a built-in default.

use std::{
    io::{self, IsTerminal},
    path::PathBuf,
};

use clap::{Args, Parser, Subcommand};

use crate::{
    build::{self, BuildOptions},
    config::Config,
    diagnostics::Verbosity,
    parser::InventoryParser,
};

/// Structdoc: structure files from source code.
#[derive(Debug, Parser)]
#[command(name = "structdoc", version)]
pub struct Cli {
    /// Read configuration from this file instead of `structdoc.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const PARSE_HELP: &str = "\
The parse command uses the source files selected with --filename or --directory and
generates a structure file (structure.xml) at the target location, the folder `output`
unless --target says otherwise.

A target ending in .xml is used as the file path itself; its folder must exist.
Any other target is a folder, created when missing.";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a structure file from your source code.
    #[command(visible_alias = "project:parse", long_about = PARSE_HELP)]
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Path where to store the generated output.
    #[arg(short, long)]
    target: Option<String>,

    /// Files to parse. The wildcards `?` and `*` are supported.
    #[arg(short = 'f', long = "filename", value_delimiter = ',')]
    files: Vec<String>,

    /// Directories to parse recursively.
    #[arg(short = 'd', long = "directory", value_delimiter = ',')]
    directories: Vec<PathBuf>,

    /// File extensions to collect from directories.
    #[arg(short, long, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Files and directories to ignore. The wildcards `?` and `*` are supported.
    #[arg(short, long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Docblock tags to leave out. `package`, `subpackage` and `ignore` are always kept.
    #[arg(long, value_delimiter = ',')]
    ignore_tags: Vec<String>,

    /// Descend into hidden directories (names starting with `.`).
    #[arg(long)]
    hidden: bool,

    /// Follow symlinks to other files and directories.
    #[arg(long)]
    follow_symlinks: bool,

    /// Markers to collect from source lines [default: TODO,FIXME].
    #[arg(short, long, value_delimiter = ',')]
    markers: Vec<String>,

    /// Title for this project.
    #[arg(long)]
    title: Option<String>,

    /// Rebuild every entry instead of reusing unchanged ones from an existing structure file.
    #[arg(long)]
    force: bool,

    /// Skip files that are not valid UTF-8 instead of decoding them lossily.
    #[arg(long)]
    validate: bool,

    /// Visibility levels to document, comma separated (e.g. `public,protected`).
    #[arg(long)]
    visibility: Option<String>,

    /// Name to use for the default package [default: Default].
    #[arg(long = "defaultpackagename")]
    default_package_name: Option<String>,

    /// Include the source code of every file.
    #[arg(long = "sourcecode")]
    source_code: bool,

    /// Show a progress bar instead of log output.
    #[arg(short, long = "progressbar")]
    progress: bool,

    /// Show info and debug log lines too.
    #[arg(short, long)]
    verbose: bool,
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Parse(args) => cmd_parse(&args, config),
    }
}

fn cmd_parse(args: &ParseArgs, config: Config) -> Result<(), String> {
    let stdout = io::stdout();
    let mut options = build_options(args, config);
    options.color = stdout.is_terminal();

    build::run(&options, &InventoryParser, stdout.lock())
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Merge command-line arguments over configuration over defaults.
fn build_options(args: &ParseArgs, config: Config) -> BuildOptions {
    let Config {
        title,
        parser,
        files,
    } = config;
    let mut options = BuildOptions::default();

    if let Some(target) = args.target.clone().or(parser.target) {
        options.target = target;
    }
    if let Some(title) = args.title.clone().or(title) {
        options.title = title;
    }
    if let Some(extensions) = non_empty(&args.extensions).or(parser.extensions) {
        options.discovery.extensions = extensions;
    }
    if let Some(markers) = non_empty(&args.markers).or(parser.markers) {
        options.markers = markers;
    }
    if let Some(visibility) = args.visibility.as_deref().or(parser.visibility.as_deref()) {
        options.visibility = split_list(visibility);
    }
    if let Some(name) = args
        .default_package_name
        .clone()
        .or(parser.default_package_name)
    {
        options.default_package_name = name;
    }

    options.discovery.ignore_patterns = non_empty(&args.ignore).unwrap_or(files.ignore);
    options.discovery.include_hidden = args.hidden || files.hidden.unwrap_or(false);
    options.discovery.follow_symlinks =
        args.follow_symlinks || files.follow_symlinks.unwrap_or(false);
    options.discovery.files = non_empty(&args.files).unwrap_or(files.file);
    options.discovery.directories = non_empty(&args.directories).unwrap_or(files.directory);

    options.ignored_tags.clone_from(&args.ignore_tags);
    options.force = args.force;
    options.validate = args.validate;
    options.include_source = args.source_code;
    options.progress = args.progress;
    options.verbosity = if args.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    options
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::{FilesConfig, ParserConfig};

    fn parse_args(argv: &[&str]) -> ParseArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Parse(args) = cli.command;
        args
    }

    #[test]
    fn defaults_without_config() {
        let options = build_options(&parse_args(&["structdoc", "parse"]), Config::default());

        assert_eq!(options.target, "output");
        assert_eq!(options.markers, ["TODO", "FIXME"]);
        assert_eq!(options.default_package_name, "Default");
        assert_eq!(options.discovery.extensions, ["php", "php3", "phtml"]);
        assert!(!options.progress);
        assert_eq!(options.verbosity, Verbosity::Normal);
    }

    #[test]
    fn alias_and_short_flags() {
        let args = parse_args(&[
            "structdoc",
            "project:parse",
            "-t",
            "build",
            "-d",
            "src,lib",
            "-f",
            "a.php",
            "-f",
            "b.php",
            "-p",
            "-v",
        ]);
        let options = build_options(&args, Config::default());

        assert_eq!(options.target, "build");
        assert_eq!(
            options.discovery.directories,
            [PathBuf::from("src"), PathBuf::from("lib")]
        );
        assert_eq!(options.discovery.files, ["a.php", "b.php"]);
        assert!(options.progress);
        assert_eq!(options.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn config_fills_unset_options() {
        let config = Config {
            title: Some("Widgets".into()),
            parser: ParserConfig {
                target: Some("docs".into()),
                markers: Some(vec!["XXX".into()]),
                visibility: Some("public, protected".into()),
                ..ParserConfig::default()
            },
            files: FilesConfig {
                directory: vec![PathBuf::from("src")],
                hidden: Some(true),
                ..FilesConfig::default()
            },
        };

        let options = build_options(&parse_args(&["structdoc", "parse"]), config);

        assert_eq!(options.title, "Widgets");
        assert_eq!(options.target, "docs");
        assert_eq!(options.markers, ["XXX"]);
        assert_eq!(options.visibility, ["public", "protected"]);
        assert_eq!(options.discovery.directories, [PathBuf::from("src")]);
        assert!(options.discovery.include_hidden);
    }

    #[test]
    fn command_line_wins_over_config() {
        let config = Config {
            parser: ParserConfig {
                target: Some("docs".into()),
                default_package_name: Some("FromConfig".into()),
                ..ParserConfig::default()
            },
            files: FilesConfig {
                directory: vec![PathBuf::from("src")],
                ..FilesConfig::default()
            },
            ..Config::default()
        };
        let args = parse_args(&[
            "structdoc",
            "parse",
            "--target",
            "out.xml",
            "--directory",
            "app",
            "--defaultpackagename",
            "FromFlag",
        ]);

        let options = build_options(&args, config);

        assert_eq!(options.target, "out.xml");
        assert_eq!(options.default_package_name, "FromFlag");
        assert_eq!(options.discovery.directories, [PathBuf::from("app")]);
    }

    #[test]
    fn parser_flags_pass_through() {
        let args = parse_args(&[
            "structdoc",
            "parse",
            "--force",
            "--validate",
            "--sourcecode",
            "--ignore-tags",
            "author,since",
            "--follow-symlinks",
        ]);

        let options = build_options(&args, Config::default());

        assert!(options.force);
        assert!(options.validate);
        assert!(options.include_source);
        assert!(options.discovery.follow_symlinks);
        assert_eq!(options.ignored_tags, ["author", "since"]);
    }

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(split_list(" public, ,private "), ["public", "private"]);
    }
}
