//! Access resolution data model
//!
//! Probe failures are ordinary values here, not errors: every failure
//! means "try the next method", and only the full [`Resolution`] tells
//! the caller what happened. Nothing in this module performs I/O.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A credential the resolver can gain access through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CredentialSource {
    /// The user's own SSH key, selected by the SSH client
    PersonalSshKey,
    /// A bearer token read from the named environment variable
    EnvironmentToken(String),
    /// The machine-scoped deploy key at the given path
    DeployKey(PathBuf),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersonalSshKey => write!(f, "personal SSH key"),
            Self::EnvironmentToken(name) => write!(f, "token from {name}"),
            Self::DeployKey(path) => write!(f, "deploy key ({})", path.display()),
        }
    }
}

/// Why one probe did not grant access
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeFailure {
    /// The endpoint or host could not be reached
    NetworkUnreachable(String),
    /// A credential was presented and refused
    AuthenticationRejected(String),
    /// No credential of this kind is available
    CredentialAbsent(String),
    /// The human opted out of interactive setup
    HumanDeclined,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkUnreachable(detail) => write!(f, "network unreachable ({detail})"),
            Self::AuthenticationRejected(detail) => write!(f, "authentication rejected ({detail})"),
            Self::CredentialAbsent(detail) => write!(f, "{detail}"),
            Self::HumanDeclined => write!(f, "setup skipped by user"),
        }
    }
}

/// The probe methods, in resolution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMethod {
    /// Personal SSH key matched against the owner's published keys
    PersonalKey,
    /// Bearer token from the environment
    Token,
    /// Machine-scoped deploy key
    DeployKey,
}

impl ProbeMethod {
    /// All methods in the order the resolver tries them
    pub const ORDER: [Self; 3] = [Self::PersonalKey, Self::Token, Self::DeployKey];
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersonalKey => write!(f, "personal SSH key"),
            Self::Token => write!(f, "environment token"),
            Self::DeployKey => write!(f, "deploy key"),
        }
    }
}

/// Result of running one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The probe authenticated; resolution stops here
    Granted(CredentialSource),
    /// The probe failed; the resolver moves on
    Failed(ProbeFailure),
}

/// Final verdict of a resolution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "via", rename_all = "snake_case")]
pub enum AccessResult {
    /// Access works through the given credential
    Granted(CredentialSource),
    /// Every method failed, or the human opted out
    Denied,
}

impl AccessResult {
    /// Whether access was granted
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// One failed probe, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeAttempt {
    /// Which method was probed
    pub method: ProbeMethod,
    /// Why it did not grant access
    pub failure: ProbeFailure,
}

/// Full record of one resolver run
///
/// The successful credential lives in `result`; `attempts` holds every
/// failed probe, including deploy-key retries during recovery.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// Final verdict
    pub result: AccessResult,
    /// Failed probes in the order they ran
    pub attempts: Vec<ProbeAttempt>,
    /// Deploy-key probes run after the human confirmed registration
    pub recovery_attempts: u32,
}

impl Resolution {
    /// Whether access was granted
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        self.result.is_granted()
    }

    /// Process exit code for this verdict
    ///
    /// Denied is 2, not 1: callers are expected to skip dependent setup
    /// and continue their run, and need to tell "no access" apart from
    /// "the tool broke".
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.is_granted() { 0 } else { 2 }
    }

    /// Print a summary of the run
    pub fn print_summary(&self) {
        println!("Access Resolution Summary:");
        println!("==========================");

        for attempt in &self.attempts {
            println!("❌ {}: {}", attempt.method, attempt.failure);
        }

        if self.recovery_attempts > 0 {
            println!(
                "🔄 Deploy-key retries after registration: {}",
                self.recovery_attempts
            );
        }

        match &self.result {
            AccessResult::Granted(source) => println!("✅ Access granted via {source}"),
            AccessResult::Denied => {
                println!("⚠️  No access method succeeded.");
                println!("Skip configuration that needs this repository; the rest of setup can continue.");
            }
        }
    }
}

/// Per-method outcomes from running every probe once, without recovery
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// `owner/name` the probes ran against
    pub target: String,
    /// One outcome per method, in probe order
    pub outcomes: Vec<MethodCheck>,
}

/// Outcome of a single probe during a check run
#[derive(Debug, Clone, Serialize)]
pub struct MethodCheck {
    /// Which method was probed
    pub method: ProbeMethod,
    /// What the probe found
    pub outcome: ProbeOutcome,
}

impl CheckReport {
    /// First credential that granted access, in probe order
    #[must_use]
    pub fn granted_via(&self) -> Option<&CredentialSource> {
        self.outcomes.iter().find_map(|check| match &check.outcome {
            ProbeOutcome::Granted(source) => Some(source),
            ProbeOutcome::Failed(_) => None,
        })
    }

    /// Whether any method granted access
    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.granted_via().is_some()
    }

    /// Process exit code for this report, mirroring [`Resolution::exit_code`]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_granted() { 0 } else { 2 }
    }

    /// Print a per-method summary
    pub fn print_summary(&self) {
        println!("Access Check Summary:");
        println!("=====================");

        for check in &self.outcomes {
            match &check.outcome {
                ProbeOutcome::Granted(_) => println!("✅ {}: grants access", check.method),
                ProbeOutcome::Failed(failure) => println!("❌ {}: {}", check.method, failure),
            }
        }

        match self.granted_via() {
            Some(source) => println!("✅ {} is reachable via {source}", self.target),
            None => println!("⚠️  No access method currently works for {}.", self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_texts() {
        assert_eq!(CredentialSource::PersonalSshKey.to_string(), "personal SSH key");
        assert_eq!(
            CredentialSource::EnvironmentToken("GH_TOKEN_SCOWALT".to_string()).to_string(),
            "token from GH_TOKEN_SCOWALT"
        );
        assert_eq!(
            CredentialSource::DeployKey(PathBuf::from("/home/u/.ssh/github-dotfiles")).to_string(),
            "deploy key (/home/u/.ssh/github-dotfiles)"
        );
        assert_eq!(ProbeFailure::HumanDeclined.to_string(), "setup skipped by user");
    }

    #[test]
    fn test_probe_order() {
        assert_eq!(
            ProbeMethod::ORDER,
            [
                ProbeMethod::PersonalKey,
                ProbeMethod::Token,
                ProbeMethod::DeployKey
            ]
        );
    }

    #[test]
    fn test_exit_codes() {
        let granted = Resolution {
            result: AccessResult::Granted(CredentialSource::PersonalSshKey),
            attempts: Vec::new(),
            recovery_attempts: 0,
        };
        assert!(granted.is_granted());
        assert_eq!(granted.exit_code(), 0);

        let denied = Resolution {
            result: AccessResult::Denied,
            attempts: Vec::new(),
            recovery_attempts: 0,
        };
        assert!(!denied.is_granted());
        assert_eq!(denied.exit_code(), 2);
    }

    #[test]
    fn test_resolution_serializes_for_json_output() {
        let resolution = Resolution {
            result: AccessResult::Granted(CredentialSource::EnvironmentToken(
                "GH_TOKEN_SCOWALT".to_string(),
            )),
            attempts: vec![ProbeAttempt {
                method: ProbeMethod::PersonalKey,
                failure: ProbeFailure::CredentialAbsent(
                    "no local key matches the owner's published keys".to_string(),
                ),
            }],
            recovery_attempts: 0,
        };

        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["result"]["result"], "granted");
        assert_eq!(json["result"]["via"]["kind"], "environment_token");
        assert_eq!(json["result"]["via"]["detail"], "GH_TOKEN_SCOWALT");
        assert_eq!(json["attempts"][0]["method"], "personal_key");
        assert_eq!(json["attempts"][0]["failure"]["kind"], "credential_absent");
    }

    #[test]
    fn test_check_report_picks_first_granting_method() {
        let report = CheckReport {
            target: "scowalt/dotfiles".to_string(),
            outcomes: vec![
                MethodCheck {
                    method: ProbeMethod::PersonalKey,
                    outcome: ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(
                        "no local keys".to_string(),
                    )),
                },
                MethodCheck {
                    method: ProbeMethod::Token,
                    outcome: ProbeOutcome::Granted(CredentialSource::EnvironmentToken(
                        "GITHUB_TOKEN".to_string(),
                    )),
                },
                MethodCheck {
                    method: ProbeMethod::DeployKey,
                    outcome: ProbeOutcome::Granted(CredentialSource::DeployKey(PathBuf::from(
                        "/home/u/.ssh/github-dotfiles",
                    ))),
                },
            ],
        };

        assert!(report.is_granted());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            report.granted_via(),
            Some(&CredentialSource::EnvironmentToken("GITHUB_TOKEN".to_string()))
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["outcome"]["status"], "failed");
        assert_eq!(json["outcomes"][1]["outcome"]["status"], "granted");
        assert_eq!(json["outcomes"][1]["method"], "token");
    }

    #[test]
    fn test_check_report_denied_exit_code() {
        let report = CheckReport {
            target: "scowalt/dotfiles".to_string(),
            outcomes: vec![MethodCheck {
                method: ProbeMethod::DeployKey,
                outcome: ProbeOutcome::Failed(ProbeFailure::NetworkUnreachable(
                    "no response from host".to_string(),
                )),
            }],
        };

        assert!(!report.is_granted());
        assert_eq!(report.exit_code(), 2);
    }
}
