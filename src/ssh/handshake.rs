//! SSH handshake probes against the git host
//!
//! Git hosts reject ordinary shell sessions by design, so exit codes from
//! `ssh -T` say nothing about authentication. The only trustworthy signal
//! is the "successfully authenticated" banner, classified by
//! [`classify_output`] so the text scraping lives behind one seam.

use crate::debug;
use std::path::Path;
use std::process::{Command, Stdio};

/// Result of one handshake probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The host accepted the offered identity
    Authenticated,
    /// The host answered and refused every offered identity
    Rejected(String),
    /// The host could not be reached (timeout, DNS, missing `ssh` binary)
    Unreachable(String),
}

/// Runs `ssh -T` probes with batch-safe options
#[derive(Debug, Clone)]
pub struct HandshakeProber {
    /// Git host to probe (e.g. `github.com`)
    host: String,
    /// Connect timeout passed to the SSH client, in seconds
    connect_timeout_secs: u64,
}

impl HandshakeProber {
    /// Create a prober for the given host
    #[must_use]
    pub const fn new(host: String, connect_timeout_secs: u64) -> Self {
        Self {
            host,
            connect_timeout_secs,
        }
    }

    /// Probe using the SSH client's default identity selection
    #[must_use]
    pub fn probe_default(&self) -> HandshakeOutcome {
        self.run_probe(None)
    }

    /// Probe offering exactly one identity file
    #[must_use]
    pub fn probe_with_identity(&self, identity: &Path) -> HandshakeOutcome {
        self.run_probe(Some(identity))
    }

    fn run_probe(&self, identity: Option<&Path>) -> HandshakeOutcome {
        let destination = format!("git@{}", self.host);

        let mut command = Command::new("ssh");
        command
            .arg("-T")
            .args(["-o", "BatchMode=yes"])
            .args(["-o", &format!("ConnectTimeout={}", self.connect_timeout_secs)])
            .args(["-o", "StrictHostKeyChecking=accept-new"]);

        if let Some(identity) = identity {
            // Pin the probe to this key; otherwise the agent's keys leak in
            command.arg("-i").arg(identity);
            command.args(["-o", "IdentitiesOnly=yes"]);
        }

        // stdin stays closed so the probe cannot eat the script pipe that
        // may be feeding this process
        let output = command
            .arg(&destination)
            .stdin(Stdio::null())
            .output();

        let outcome = match output {
            Ok(output) => {
                let combined = format!(
                    "{}\n{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
                classify_output(&combined)
            }
            Err(e) => HandshakeOutcome::Unreachable(format!("failed to run ssh: {e}")),
        };

        debug::log(&format!("ssh probe {destination}: {outcome:?}"));
        outcome
    }
}

/// Classify combined `ssh -T` output into a handshake outcome
///
/// The authentication banner is the sole success signal; exit status is
/// deliberately ignored because git hosts return nonzero for successful
/// no-shell sessions.
#[must_use]
pub fn classify_output(output: &str) -> HandshakeOutcome {
    let lowered = output.to_lowercase();

    if lowered.contains("successfully authenticated") {
        return HandshakeOutcome::Authenticated;
    }

    if lowered.contains("permission denied") {
        let detail = first_matching_line(output, "permission denied")
            .unwrap_or_else(|| "permission denied".to_string());
        return HandshakeOutcome::Rejected(detail);
    }

    let detail = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no response from host")
        .to_string();
    HandshakeOutcome::Unreachable(detail)
}

/// First line of `output` containing `needle`, compared case-insensitively
fn first_matching_line(output: &str, needle: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.to_lowercase().contains(needle))
        .map(|line| line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authenticated_banner() {
        let output =
            "Hi scowalt! You've successfully authenticated, but GitHub does not provide shell access.";
        assert_eq!(classify_output(output), HandshakeOutcome::Authenticated);
    }

    #[test]
    fn test_classify_banner_wins_over_noise() {
        let output = "Warning: Permanently added 'github.com' (ED25519) to the list of known hosts.\n\
                      Hi scowalt! You've successfully authenticated, but GitHub does not provide shell access.";
        assert_eq!(classify_output(output), HandshakeOutcome::Authenticated);
    }

    #[test]
    fn test_classify_permission_denied() {
        let output = "git@github.com: Permission denied (publickey).";
        match classify_output(output) {
            HandshakeOutcome::Rejected(detail) => {
                assert!(detail.contains("Permission denied"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_connect_timeout() {
        let output = "ssh: connect to host github.com port 22: Connection timed out";
        match classify_output(output) {
            HandshakeOutcome::Unreachable(detail) => {
                assert!(detail.contains("Connection timed out"));
            }
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_empty_output() {
        match classify_output("") {
            HandshakeOutcome::Unreachable(detail) => {
                assert_eq!(detail, "no response from host");
            }
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let output = "GIT@EXAMPLE.COM: PERMISSION DENIED (PUBLICKEY,PASSWORD).";
        assert!(matches!(
            classify_output(output),
            HandshakeOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_prober_construction() {
        let prober = HandshakeProber::new("github.com".to_string(), 5);
        assert_eq!(prober.host, "github.com");
        assert_eq!(prober.connect_timeout_secs, 5);
    }
}
