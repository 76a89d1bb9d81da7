//! Multi-method repository access resolution
//!
//! The resolver answers one question: can this machine read the private
//! dotfiles repository right now? It tries the cheapest method first
//! (personal key, then token, then deploy key) and stops at the first
//! grant. When everything fails it walks the human through registering a
//! deploy key, retrying a bounded number of times.
//!
//! The resolver is generic over its two capabilities, credential probing
//! and human interaction, so platform differences and test doubles are
//! injected values, not copies of the control flow.

pub mod probes;
pub mod types;

pub use probes::*;
pub use types::*;

use crate::prompt::{Prompt, PromptAnswer};

/// Default bound on deploy-key retries during recovery
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Resolves access to one repository by probing credentials in order
pub struct AccessResolver<P: CredentialProbes, H: Prompt> {
    /// Credential probing capability
    probes: P,
    /// Human interaction capability
    prompt: H,
    /// `owner/name` slug, for messages only
    target: String,
    /// Where the human registers the key, when known
    registration_url: Option<String>,
    /// Bound on deploy-key retries during recovery
    max_retries: u32,
    /// Whether interactive recovery may run at all
    interactive: bool,
}

impl<P: CredentialProbes, H: Prompt> AccessResolver<P, H> {
    /// Create a resolver for the given target repository
    #[must_use]
    pub fn new(probes: P, prompt: H, target: String) -> Self {
        Self {
            probes,
            prompt,
            target,
            registration_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
            interactive: true,
        }
    }

    /// Change the bound on deploy-key retries
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Tell the human where to register the key
    #[must_use]
    pub fn with_registration_url(mut self, url: String) -> Self {
        self.registration_url = Some(url);
        self
    }

    /// Never enter interactive recovery; exhaustion is simply `Denied`
    #[must_use]
    pub const fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Probe every method in order, with interactive recovery at the end
    ///
    /// This never fails: network trouble, missing credentials, and
    /// declined setup all fold into the returned [`Resolution`].
    #[must_use]
    pub fn resolve(mut self) -> Resolution {
        let mut attempts = Vec::new();

        for method in ProbeMethod::ORDER {
            match self.probes.run(method) {
                ProbeOutcome::Granted(source) => {
                    return Resolution {
                        result: AccessResult::Granted(source),
                        attempts,
                        recovery_attempts: 0,
                    };
                }
                ProbeOutcome::Failed(failure) => attempts.push(ProbeAttempt { method, failure }),
            }
        }

        self.recover(attempts)
    }

    /// Guided deploy-key setup after every probe failed
    fn recover(mut self, mut attempts: Vec<ProbeAttempt>) -> Resolution {
        if !self.interactive || !self.prompt.is_interactive() {
            return Resolution {
                result: AccessResult::Denied,
                attempts,
                recovery_attempts: 0,
            };
        }

        let prepared = match self.probes.prepare_deploy_key() {
            Ok(prepared) => prepared,
            Err(e) => {
                self.prompt
                    .show(&format!("Could not prepare a deploy key: {e:#}"));
                attempts.push(ProbeAttempt {
                    method: ProbeMethod::DeployKey,
                    failure: ProbeFailure::CredentialAbsent(format!(
                        "deploy key could not be prepared: {e:#}"
                    )),
                });
                return Resolution {
                    result: AccessResult::Denied,
                    attempts,
                    recovery_attempts: 0,
                };
            }
        };

        self.show_guidance(&prepared);

        let mut recovery_attempts = 0;
        while recovery_attempts < self.max_retries {
            match self
                .prompt
                .confirm_registered(recovery_attempts + 1, self.max_retries)
            {
                PromptAnswer::Skip => {
                    attempts.push(ProbeAttempt {
                        method: ProbeMethod::DeployKey,
                        failure: ProbeFailure::HumanDeclined,
                    });
                    return Resolution {
                        result: AccessResult::Denied,
                        attempts,
                        recovery_attempts,
                    };
                }
                PromptAnswer::Registered => {}
            }

            recovery_attempts += 1;
            match self.probes.deploy_key() {
                ProbeOutcome::Granted(source) => {
                    return Resolution {
                        result: AccessResult::Granted(source),
                        attempts,
                        recovery_attempts,
                    };
                }
                ProbeOutcome::Failed(failure) => {
                    self.prompt.show(&format!("Still no access: {failure}"));
                    if recovery_attempts < self.max_retries {
                        self.prompt
                            .show("If you just saved the key, give the host a moment and confirm again.");
                    }
                    attempts.push(ProbeAttempt {
                        method: ProbeMethod::DeployKey,
                        failure,
                    });
                }
            }
        }

        self.prompt
            .show("Retry limit reached; continuing without repository access.");
        Resolution {
            result: AccessResult::Denied,
            attempts,
            recovery_attempts,
        }
    }

    fn show_guidance(&mut self, prepared: &PreparedDeployKey) {
        self.prompt
            .show(&format!("\nNo access method worked for {}.", self.target));

        let verb = if prepared.created {
            "Generated a new deploy key"
        } else {
            "Found an existing deploy key"
        };
        self.prompt.show(&format!(
            "{verb} at {}.",
            prepared.record.private_path.display()
        ));

        self.prompt
            .show("Register this public key as a read-only deploy key for the repository:");
        self.prompt.show(&format!("\n  {}\n", prepared.public_line));

        if let Some(tool) = self.prompt.copy_to_clipboard(&prepared.public_line) {
            self.prompt.show(&format!("(copied to clipboard via {tool})"));
        }

        if let Some(url) = &self.registration_url {
            self.prompt.show(&format!("Settings page: {url}"));
        }
    }
}

/// Run every probe once, without recovery, and report each outcome
///
/// Unlike [`AccessResolver::resolve`] this does not stop at the first
/// grant; the point is a complete per-method picture.
pub fn run_check<P: CredentialProbes>(probes: &mut P, target: String) -> CheckReport {
    let outcomes = ProbeMethod::ORDER
        .into_iter()
        .map(|method| MethodCheck {
            method,
            outcome: probes.run(method),
        })
        .collect();

    CheckReport { target, outcomes }
}
