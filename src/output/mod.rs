//! Output formatting utilities

use console::{Emoji, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Output formatter that strips colors and emojis for non-TTY output
pub struct OutputFormatter {
    /// Whether output is going to a TTY
    is_tty: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    /// Create a formatter with an explicit TTY setting
    #[must_use]
    pub const fn with_tty(is_tty: bool) -> Self {
        Self { is_tty }
    }

    /// Format a status symbol (check mark, X, etc.)
    #[must_use]
    pub fn status(&self, success: bool) -> String {
        if self.is_tty {
            if success {
                format!("{}", style("✓").green().bold())
            } else {
                format!("{}", style("✗").red().bold())
            }
        } else if success {
            "[OK]".to_string()
        } else {
            "[FAIL]".to_string()
        }
    }

    /// Create a spinner shown while network probes are in flight
    ///
    /// Returns `None` when stdout is not a terminal so piped output stays
    /// clean.
    ///
    /// # Panics
    ///
    /// Panics if the spinner template is invalid
    #[must_use]
    pub fn create_spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.is_tty {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap(),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            None
        }
    }

    /// Format the start of a credential probe
    #[must_use]
    pub fn probe_start(&self, method: &str) -> String {
        if self.is_tty {
            format!("{} trying {}", Emoji("🔎", "-"), style(method).cyan())
        } else {
            format!("Trying: {method}")
        }
    }

    /// Format a granted-access line
    #[must_use]
    pub fn granted(&self, via: &str) -> String {
        if self.is_tty {
            format!(
                "{} {}",
                Emoji("🔓", "[GRANTED]"),
                style(format!("Access granted via {via}")).green().bold()
            )
        } else {
            format!("GRANTED: access via {via}")
        }
    }

    /// Format a denied-access line
    ///
    /// Denied is a warning for the calling setup script, not a failure of
    /// this tool.
    #[must_use]
    pub fn denied(&self) -> String {
        if self.is_tty {
            format!(
                "{} {}",
                Emoji("🔒", "[DENIED]"),
                style("No access method succeeded").yellow().bold()
            )
        } else {
            "DENIED: no access method succeeded".to_string()
        }
    }

    /// Format section header
    #[must_use]
    pub fn section_header(&self, title: &str) -> String {
        if self.is_tty {
            format!(
                "\n{} {}",
                Emoji("🔑", "==="),
                style(title).bold().underlined()
            )
        } else {
            format!("=== {title} ===")
        }
    }

    /// Format a created-file symbol
    #[must_use]
    pub const fn created(&self) -> &'static str {
        if self.is_tty { "✅" } else { "[CREATED]" }
    }

    /// Format an already-present symbol
    #[must_use]
    pub const fn already_present(&self) -> &'static str {
        if self.is_tty { "⏭️" } else { "[EXISTS]" }
    }

    /// Format section divider
    #[must_use]
    pub fn divider(&self, title: &str) -> String {
        if self.is_tty {
            format!("{}\n{}", title, "=".repeat(title.len()))
        } else {
            format!("=== {title} ===")
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Global output formatter instance
static OUTPUT_FORMATTER: once_cell::sync::Lazy<OutputFormatter> =
    once_cell::sync::Lazy::new(OutputFormatter::new);

/// Get the global output formatter
#[must_use]
pub fn formatter() -> &'static OutputFormatter {
    &OUTPUT_FORMATTER
}
