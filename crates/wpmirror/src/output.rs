//! Colored terminal output utilities.

use console::{Style, Term};
use wpmirror_site::Progress;

/// Terminal output formatter.
///
/// Messages go to stderr, command results and progress lines to stdout.
pub(crate) struct Output {
    term: Term,
    stdout: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            stdout: Term::stdout(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a line of command output.
    pub(crate) fn line(&self, msg: &str) {
        let _ = self.stdout.write_line(msg);
    }

    /// Print a warm/invalidate progress event; section headers in cyan bold.
    pub(crate) fn progress(&self, event: Progress<'_>) {
        let line = event.to_string();
        match event {
            Progress::Pages | Progress::Assets => {
                let _ = self
                    .stdout
                    .write_line(&self.cyan_bold.apply_to(line).to_string());
            }
            Progress::Page { .. } | Progress::Asset(_) => self.line(&line),
        }
    }
}
