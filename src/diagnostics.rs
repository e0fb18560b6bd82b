//! Diagnostics bridge: renders parser events on the terminal.
//!
//! The parser never writes to the terminal itself. It reports through the
//! [`Diagnostics`] capability handed to it by the build, and a [`Bridge`]
//! decides what reaches the output sink.
//!
//! A bridge runs in exactly one [`ReportingMode`] for its whole life:
//!
//! - `Verbose` renders log events at or below the verbosity threshold.
//! - `Progress` renders a single advancing counter and drops log events.

mod progress;

use std::io::{self, Write};

use crossterm::style::Stylize;

pub use progress::ProgressIndicator;

/// Priority assumed for events that don't carry one.
pub const DEFAULT_PRIORITY: u8 = 8;

/// Syslog-style priority levels used by the built-in parser.
pub mod priority {
    pub const ERR: u8 = 3;
    pub const WARNING: u8 = 4;
    pub const NOTICE: u8 = 5;
    pub const INFO: u8 = 6;
    pub const DEBUG: u8 = 7;
}

/// A severity-tagged message. Lower priority is more severe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub priority: Option<u8>,
    pub message: String,
}

impl DiagnosticEvent {
    pub fn new(priority: u8, message: impl Into<String>) -> Self {
        Self {
            priority: Some(priority),
            message: message.into(),
        }
    }

    /// An event without a priority; treated as [`DEFAULT_PRIORITY`].
    #[cfg(test)]
    pub fn unprioritized(message: impl Into<String>) -> Self {
        Self {
            priority: None,
            message: message.into(),
        }
    }

    pub fn priority(&self) -> u8 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// How a rendered log line is decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Error,
    Warning,
    Plain,
}

/// Map an event priority to its line style.
pub fn style_for(priority: u8) -> Style {
    match priority {
        0..=3 => Style::Error,
        4 => Style::Warning,
        _ => Style::Plain,
    }
}

/// How much of the log stream is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// Highest priority that still gets rendered.
    pub fn threshold(self) -> u8 {
        match self {
            Self::Normal => 5,
            Self::Verbose => 8,
        }
    }
}

/// What the user sees while files are parsed. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingMode {
    Verbose,
    Progress,
}

/// Callbacks a parser uses to report while it works.
///
/// Handlers run inline on the parser's call stack, so implementations must
/// return quickly and never block.
pub trait Diagnostics {
    /// A regular log event.
    fn on_log(&mut self, event: DiagnosticEvent);

    /// A debug event. Shares the log stream unless overridden.
    fn on_debug(&mut self, event: DiagnosticEvent) {
        self.on_log(event);
    }

    /// One source file is about to be processed.
    fn on_progress(&mut self);
}

/// A log event that passed the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub style: Style,
    pub text: String,
}

impl RenderedLine {
    /// The indented output line, styled with ANSI colors when `color` is set.
    fn paint(&self, color: bool) -> String {
        if !color {
            return format!("  {}", self.text);
        }
        match self.style {
            Style::Error => format!("  {}", self.text.as_str().white().on_red()),
            Style::Warning => format!("  {}", self.text.as_str().yellow()),
            Style::Plain => format!("  {}", self.text),
        }
    }
}

/// Internal state for the selected mode.
enum Reporter {
    Log,
    Progress(ProgressIndicator),
}

/// Owns the output sink for a run and renders diagnostics onto it.
pub struct Bridge<W: Write> {
    sink: W,
    verbosity: Verbosity,
    color: bool,
    reporter: Reporter,
    error: Option<io::Error>,
}

impl<W: Write> Bridge<W> {
    /// Create a bridge writing to `sink`. Color is off until [`Bridge::with_color`].
    pub fn new(sink: W, mode: ReportingMode, verbosity: Verbosity) -> Self {
        let reporter = match mode {
            ReportingMode::Verbose => Reporter::Log,
            ReportingMode::Progress => Reporter::Progress(ProgressIndicator::default()),
        };
        Self {
            sink,
            verbosity,
            color: false,
            reporter,
            error: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn mode(&self) -> ReportingMode {
        match self.reporter {
            Reporter::Log => ReportingMode::Verbose,
            Reporter::Progress(_) => ReportingMode::Progress,
        }
    }

    /// Apply the verbosity threshold and style mapping to an event.
    ///
    /// Returns `None` when the event is filtered out.
    pub fn render(&self, event: &DiagnosticEvent) -> Option<RenderedLine> {
        let priority = event.priority();
        if priority > self.verbosity.threshold() {
            return None;
        }
        Some(RenderedLine {
            style: style_for(priority),
            text: event.message.clone(),
        })
    }

    /// Begin a progress run of `total` units. No-op in verbose mode.
    pub fn start(&mut self, total: u64) {
        let Reporter::Progress(progress) = &mut self.reporter else {
            return;
        };
        progress.start(total);
        let line = progress.render();
        self.emit(line.as_bytes());
    }

    /// End a progress run, leaving the final state on screen. No-op in verbose mode.
    pub fn finish(&mut self) {
        let Reporter::Progress(progress) = &self.reporter else {
            return;
        };
        tracing::debug!(processed = progress.current(), "progress finished");
        let line = format!("{}\n", progress.render());
        self.emit(line.as_bytes());
    }

    /// Write status text without a line break, e.g. `Storing .. `.
    pub fn status(&mut self, text: &str) {
        self.emit(text.as_bytes());
    }

    /// Write a full status line.
    pub fn status_line(&mut self, text: &str) {
        let line = format!("{text}\n");
        self.emit(line.as_bytes());
    }

    /// The first write failure seen on the sink, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Best-effort write. Output failures never abort a run; the first one
    /// is kept for [`Bridge::take_error`].
    fn emit(&mut self, bytes: &[u8]) {
        let result = self
            .sink
            .write_all(bytes)
            .and_then(|()| self.sink.flush());
        if let Err(e) = result
            && self.error.is_none()
        {
            self.error = Some(e);
        }
    }
}

impl<W: Write> Diagnostics for Bridge<W> {
    fn on_log(&mut self, event: DiagnosticEvent) {
        if !matches!(self.reporter, Reporter::Log) {
            return;
        }
        if let Some(line) = self.render(&event) {
            let text = format!("{}\n", line.paint(self.color));
            self.emit(text.as_bytes());
        }
    }

    fn on_progress(&mut self) {
        let Reporter::Progress(progress) = &mut self.reporter else {
            return;
        };
        progress.advance();
        let line = progress.render();
        self.emit(line.as_bytes());
    }
}
