//! Human confirmation on the controlling terminal
//!
//! This tool is usually run from a `curl | sh` pipe, so stdin carries the
//! caller's script and must never be consumed. All interaction goes
//! through the controlling terminal device directly; when none exists the
//! prompt reports itself non-interactive and recovery is skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

/// Answer to the key-registration confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    /// The human reports the key as registered; retry the probe
    Registered,
    /// The human opted out of deploy-key setup
    Skip,
}

/// Human interaction capability used by the resolver
pub trait Prompt {
    /// Whether a human can actually be asked anything
    fn is_interactive(&self) -> bool;

    /// Display a message to the human
    fn show(&mut self, message: &str);

    /// Ask whether the key has been registered, blocking until answered
    ///
    /// There is deliberately no timeout: setup is attended, and the human
    /// may need a while to reach the repository settings page.
    fn confirm_registered(&mut self, attempt: u32, max_attempts: u32) -> PromptAnswer;

    /// Offer text to the system clipboard, returning the tool that took it
    fn copy_to_clipboard(&mut self, text: &str) -> Option<&'static str>;
}

/// Prompt backed by the controlling terminal device
pub struct TtyPrompt {
    /// Terminal read side, when one could be opened
    reader: Option<BufReader<File>>,
    /// Terminal write side, when one could be opened
    writer: Option<File>,
}

impl TtyPrompt {
    /// Open the controlling terminal, if the process has one
    #[must_use]
    pub fn open() -> Self {
        let (reader, writer) = open_terminal();
        Self {
            reader: reader.map(BufReader::new),
            writer,
        }
    }
}

impl Prompt for TtyPrompt {
    fn is_interactive(&self) -> bool {
        self.reader.is_some() && self.writer.is_some()
    }

    fn show(&mut self, message: &str) {
        if let Some(writer) = self.writer.as_mut() {
            // Display is best-effort; a vanished terminal must not abort
            let _ = writeln!(writer, "{message}");
            let _ = writer.flush();
        }
    }

    fn confirm_registered(&mut self, attempt: u32, max_attempts: u32) -> PromptAnswer {
        loop {
            let question = format!(
                "Press Enter once the key is registered to retry ({attempt}/{max_attempts}), or type 'skip' to continue without access: "
            );
            if let Some(writer) = self.writer.as_mut() {
                let _ = write!(writer, "{question}");
                let _ = writer.flush();
            }

            let Some(reader) = self.reader.as_mut() else {
                return PromptAnswer::Skip;
            };

            let mut line = String::new();
            match reader.read_line(&mut line) {
                // EOF or read failure: treat as opting out
                Ok(0) | Err(_) => return PromptAnswer::Skip,
                Ok(_) => {}
            }

            match parse_answer(&line) {
                Some(answer) => return answer,
                None => self.show("Please answer 'yes' (or press Enter) to retry, or 'skip'."),
            }
        }
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Option<&'static str> {
        copy_to_clipboard(text)
    }
}

/// Interpret one line of human input
///
/// An empty line counts as confirmation so that pressing Enter after
/// registering the key does the obvious thing.
#[must_use]
pub fn parse_answer(input: &str) -> Option<PromptAnswer> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" | "done" => Some(PromptAnswer::Registered),
        "s" | "skip" | "n" | "no" => Some(PromptAnswer::Skip),
        _ => None,
    }
}

/// Copy text to the system clipboard via the first tool that works
///
/// Returns the tool name on success. Absence of every tool is not an
/// error; the key is always printed as well.
#[must_use]
pub fn copy_to_clipboard(text: &str) -> Option<&'static str> {
    const CANDIDATES: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
        ("clip.exe", &[]),
    ];

    for &(program, args) in CANDIDATES {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let Ok(mut child) = child else { continue };

        if let Some(mut stdin) = child.stdin.take() {
            if stdin.write_all(text.as_bytes()).is_err() {
                let _ = child.kill();
                let _ = child.wait();
                continue;
            }
        }

        match child.wait() {
            Ok(status) if status.success() => return Some(program),
            _ => {}
        }
    }

    None
}

#[cfg(unix)]
fn open_terminal() -> (Option<File>, Option<File>) {
    let reader = File::open("/dev/tty").ok();
    let writer = File::options().write(true).open("/dev/tty").ok();
    (reader, writer)
}

#[cfg(windows)]
fn open_terminal() -> (Option<File>, Option<File>) {
    let reader = File::open("CONIN$").ok();
    let writer = File::options().write(true).open("CONOUT$").ok();
    (reader, writer)
}
