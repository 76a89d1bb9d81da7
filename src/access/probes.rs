//! Credential probes backed by the real system
//!
//! The resolver only sees the [`CredentialProbes`] trait; this module
//! provides the implementation that talks to GitHub, spawns SSH, and
//! touches the filesystem. Tests drive the resolver with scripted
//! implementations instead.

use crate::access::types::{CredentialSource, ProbeFailure, ProbeMethod, ProbeOutcome};
use crate::config::Settings;
use crate::debug;
use crate::github::{GithubClient, TokenValidation};
use crate::ssh::{
    DeployKeyRecord, DeployKeyStore, HandshakeOutcome, HandshakeProber, KnownHostsFile,
    SshConfigFile, local_public_keys,
};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Deploy key material staged for out-of-band registration
#[derive(Debug, Clone)]
pub struct PreparedDeployKey {
    /// The persisted keypair
    pub record: DeployKeyRecord,
    /// Whether this call generated the keypair
    pub created: bool,
    /// Public key line to register, verbatim
    pub public_line: String,
}

/// Credential probing capability driven by the resolver
pub trait CredentialProbes {
    /// Probe the user's personal SSH key
    fn personal_key(&mut self) -> ProbeOutcome;

    /// Probe environment-supplied tokens
    fn environment_token(&mut self) -> ProbeOutcome;

    /// Probe the deploy key at its fixed path
    fn deploy_key(&mut self) -> ProbeOutcome;

    /// Make sure a deploy key exists and is wired into the SSH config
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be generated or the SSH client
    /// configuration cannot be written
    fn prepare_deploy_key(&mut self) -> Result<PreparedDeployKey>;

    /// Run the probe for the given method
    fn run(&mut self, method: ProbeMethod) -> ProbeOutcome {
        match method {
            ProbeMethod::PersonalKey => self.personal_key(),
            ProbeMethod::Token => self.environment_token(),
            ProbeMethod::DeployKey => self.deploy_key(),
        }
    }
}

/// Probes against the real environment: GitHub, SSH, and `~/.ssh`
pub struct SystemProbes {
    /// Effective settings for this run
    settings: Settings,
    /// HTTPS client for the two GitHub endpoints
    github: GithubClient,
    /// SSH handshake runner for the configured git host
    prober: HandshakeProber,
    /// Deploy key storage at its fixed path
    store: DeployKeyStore,
    /// Directory holding SSH client files, normally `~/.ssh`
    ssh_dir: PathBuf,
    /// How token variables are read; swappable for embedding and tests
    env_lookup: fn(&str) -> Option<String>,
}

impl SystemProbes {
    /// Create probes for the user's real environment
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// HTTP client cannot be built
    pub fn new(settings: &Settings) -> Result<Self> {
        let github = GithubClient::from_settings(settings)?;
        let home = dirs::home_dir().context("Unable to determine home directory")?;
        Ok(Self::assemble(settings, github, home.join(".ssh")))
    }

    /// Use a different SSH directory instead of `~/.ssh`
    #[must_use]
    pub fn with_ssh_dir(mut self, ssh_dir: PathBuf) -> Self {
        self.ssh_dir = ssh_dir;
        self
    }

    /// Override how token environment variables are read
    #[must_use]
    pub fn with_env_lookup(mut self, env_lookup: fn(&str) -> Option<String>) -> Self {
        self.env_lookup = env_lookup;
        self
    }

    fn assemble(settings: &Settings, github: GithubClient, ssh_dir: PathBuf) -> Self {
        Self {
            prober: HandshakeProber::new(
                settings.ssh.git_host.clone(),
                settings.ssh.connect_timeout_secs,
            ),
            store: DeployKeyStore::new(settings.deploy_key_path()),
            settings: settings.clone(),
            github,
            ssh_dir,
            env_lookup: read_env,
        }
    }
}

impl CredentialProbes for SystemProbes {
    fn personal_key(&mut self) -> ProbeOutcome {
        let owner = &self.settings.repository.owner;

        let published = match self.github.published_keys(owner) {
            Ok(keys) => keys,
            Err(e) => {
                return ProbeOutcome::Failed(ProbeFailure::NetworkUnreachable(format!("{e:#}")));
            }
        };
        if published.is_empty() {
            return ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(format!(
                "{owner} has no published keys"
            )));
        }

        let local = match local_public_keys(&self.ssh_dir) {
            Ok(keys) => keys,
            Err(e) => {
                return ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(format!("{e:#}")));
            }
        };
        let matched = local
            .iter()
            .find(|candidate| published.iter().any(|key| key.same_key(&candidate.key)));
        let Some(matched) = matched else {
            return ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(
                "no local key matches the owner's published keys".to_string(),
            ));
        };
        debug::log(&format!(
            "local key {} ({}) is published by {owner}",
            matched.path.display(),
            matched.key.digest()
        ));

        handshake_to_outcome(
            self.prober.probe_default(),
            CredentialSource::PersonalSshKey,
        )
    }

    fn environment_token(&mut self) -> ProbeOutcome {
        let mut last_failure: Option<ProbeFailure> = None;

        for name in &self.settings.auth.token_env_vars {
            let Some(token) = (self.env_lookup)(name) else {
                continue;
            };
            debug::log(&format!("validating token from {name}"));

            match self.github.validate_token(
                &token,
                &self.settings.repository.owner,
                &self.settings.repository.name,
            ) {
                Ok(TokenValidation::Valid) => {
                    return ProbeOutcome::Granted(CredentialSource::EnvironmentToken(name.clone()));
                }
                Ok(TokenValidation::Rejected(status)) if matches!(status, 401 | 403 | 404) => {
                    last_failure = Some(ProbeFailure::AuthenticationRejected(format!(
                        "{name} rejected with HTTP {status}"
                    )));
                }
                Ok(TokenValidation::Rejected(status)) => {
                    last_failure = Some(ProbeFailure::NetworkUnreachable(format!(
                        "token validation returned HTTP {status}"
                    )));
                }
                Err(e) => {
                    last_failure = Some(ProbeFailure::NetworkUnreachable(format!("{e:#}")));
                }
            }
        }

        ProbeOutcome::Failed(last_failure.unwrap_or_else(|| {
            ProbeFailure::CredentialAbsent("no configured token variable is set".to_string())
        }))
    }

    fn deploy_key(&mut self) -> ProbeOutcome {
        if !self.store.exists() {
            return ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(format!(
                "no deploy key at {}",
                self.store.private_path().display()
            )));
        }

        handshake_to_outcome(
            self.prober.probe_with_identity(self.store.private_path()),
            CredentialSource::DeployKey(self.store.private_path().to_path_buf()),
        )
    }

    fn prepare_deploy_key(&mut self) -> Result<PreparedDeployKey> {
        let comment = format!("dotgate:{}", self.settings.repo_slug());
        let (record, created) = self.store.ensure(&comment)?;

        let ssh_config = SshConfigFile::new(self.ssh_dir.join("config"));
        ssh_config.ensure_host_alias(
            &self.settings.ssh.host_alias,
            &self.settings.ssh.git_host,
            &self.settings.auth.deploy_key,
        )?;

        let known_hosts = KnownHostsFile::new(self.ssh_dir.join("known_hosts"));
        if let Err(e) = known_hosts.ensure_host(
            &self.settings.ssh.git_host,
            self.settings.ssh.connect_timeout_secs,
        ) {
            // Probes run with accept-new, so a failed scan only costs the
            // explicit known-hosts entry
            debug::log(&format!("known-hosts entry not written: {e:#}"));
        }

        let public_line = self.store.public_key_line()?;
        Ok(PreparedDeployKey {
            record,
            created,
            public_line,
        })
    }
}

/// Map a handshake result onto the probe taxonomy
fn handshake_to_outcome(outcome: HandshakeOutcome, source: CredentialSource) -> ProbeOutcome {
    match outcome {
        HandshakeOutcome::Authenticated => ProbeOutcome::Granted(source),
        HandshakeOutcome::Rejected(detail) => {
            ProbeOutcome::Failed(ProbeFailure::AuthenticationRejected(detail))
        }
        HandshakeOutcome::Unreachable(detail) => {
            ProbeOutcome::Failed(ProbeFailure::NetworkUnreachable(detail))
        }
    }
}

/// Default token lookup: the process environment, empty meaning unset
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PUBLISHED_KEY: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIKqT1YQYRryzNgxW4RdGhpYuPw9NLvmDq86rbnykghxA";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn scowalt_token_env(name: &str) -> Option<String> {
        (name == "GH_TOKEN_SCOWALT").then(|| "validtoken123".to_string())
    }

    fn both_tokens_env(name: &str) -> Option<String> {
        match name {
            "GH_TOKEN_SCOWALT" => Some("staletoken".to_string()),
            "GITHUB_TOKEN" => Some("goodtoken".to_string()),
            _ => None,
        }
    }

    fn test_settings(temp_dir: &TempDir, base_url: &str) -> Settings {
        let mut settings = Settings::default();
        settings.auth.deploy_key = temp_dir
            .path()
            .join("deploy-key")
            .to_string_lossy()
            .into_owned();
        settings.github.web_base = base_url.to_string();
        settings.github.api_base = base_url.to_string();
        // Reserved TLD: any accidental network use fails fast
        settings.ssh.git_host = "invalid.invalid".to_string();
        settings.ssh.connect_timeout_secs = 1;
        settings
    }

    fn test_probes(temp_dir: &TempDir, base_url: &str) -> SystemProbes {
        let settings = test_settings(temp_dir, base_url);
        let github = GithubClient::from_settings(&settings).unwrap();
        SystemProbes::assemble(&settings, github, temp_dir.path().join("ssh"))
            .with_env_lookup(no_env)
    }

    #[test]
    fn test_personal_key_unreachable_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, "http://127.0.0.1:1");

        match probes.personal_key() {
            ProbeOutcome::Failed(ProbeFailure::NetworkUnreachable(_)) => {}
            other => panic!("expected NetworkUnreachable, got {other:?}"),
        }
    }

    #[test]
    fn test_personal_key_owner_has_no_keys() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/scowalt.keys")
            .with_status(200)
            .with_body("")
            .create();

        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, &server.url());

        match probes.personal_key() {
            ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(detail)) => {
                assert!(detail.contains("no published keys"));
            }
            other => panic!("expected CredentialAbsent, got {other:?}"),
        }
    }

    #[test]
    fn test_personal_key_no_local_match() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/scowalt.keys")
            .with_status(200)
            .with_body(format!("{PUBLISHED_KEY}\n"))
            .create();

        let temp_dir = TempDir::new().unwrap();
        let ssh_dir = temp_dir.path().join("ssh");
        fs::create_dir_all(&ssh_dir).unwrap();
        fs::write(
            ssh_dir.join("id_rsa.pub"),
            "ssh-rsa AAAAB3NzaC1yc2EAAAADAQAB other@host\n",
        )
        .unwrap();

        let mut probes = test_probes(&temp_dir, &server.url());

        match probes.personal_key() {
            ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(detail)) => {
                assert!(detail.contains("no local key matches"));
            }
            other => panic!("expected CredentialAbsent, got {other:?}"),
        }
    }

    #[test]
    fn test_token_absent() {
        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, "http://127.0.0.1:1");

        match probes.environment_token() {
            ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(detail)) => {
                assert!(detail.contains("no configured token variable"));
            }
            other => panic!("expected CredentialAbsent, got {other:?}"),
        }
    }

    #[test]
    fn test_token_valid_grants_without_touching_deploy_key() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/repos/scowalt/dotfiles")
            .match_header("authorization", "Bearer validtoken123")
            .with_status(200)
            .with_body("{}")
            .create();

        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, &server.url()).with_env_lookup(scowalt_token_env);

        match probes.environment_token() {
            ProbeOutcome::Granted(CredentialSource::EnvironmentToken(name)) => {
                assert_eq!(name, "GH_TOKEN_SCOWALT");
            }
            other => panic!("expected Granted(EnvironmentToken), got {other:?}"),
        }

        // No deploy key operation may happen on this path
        assert!(!temp_dir.path().join("deploy-key").exists());
    }

    #[test]
    fn test_token_rejected() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/repos/scowalt/dotfiles")
            .with_status(401)
            .create();

        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, &server.url()).with_env_lookup(scowalt_token_env);

        match probes.environment_token() {
            ProbeOutcome::Failed(ProbeFailure::AuthenticationRejected(detail)) => {
                assert!(detail.contains("GH_TOKEN_SCOWALT"));
                assert!(detail.contains("401"));
            }
            other => panic!("expected AuthenticationRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_token_later_variable_can_grant() {
        let mut server = mockito::Server::new();
        let _stale = server
            .mock("GET", "/repos/scowalt/dotfiles")
            .match_header("authorization", "Bearer staletoken")
            .with_status(401)
            .create();
        let _good = server
            .mock("GET", "/repos/scowalt/dotfiles")
            .match_header("authorization", "Bearer goodtoken")
            .with_status(200)
            .with_body("{}")
            .create();

        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, &server.url()).with_env_lookup(both_tokens_env);

        match probes.environment_token() {
            ProbeOutcome::Granted(CredentialSource::EnvironmentToken(name)) => {
                assert_eq!(name, "GITHUB_TOKEN");
            }
            other => panic!("expected Granted(EnvironmentToken), got {other:?}"),
        }
    }

    #[test]
    fn test_deploy_key_absent() {
        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, "http://127.0.0.1:1");

        match probes.deploy_key() {
            ProbeOutcome::Failed(ProbeFailure::CredentialAbsent(detail)) => {
                assert!(detail.contains("no deploy key at"));
            }
            other => panic!("expected CredentialAbsent, got {other:?}"),
        }
    }

    #[test]
    fn test_run_dispatches_by_method() {
        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, "http://127.0.0.1:1");

        assert_eq!(probes.run(ProbeMethod::Token), probes.environment_token());
        assert_eq!(probes.run(ProbeMethod::DeployKey), probes.deploy_key());
    }

    #[test]
    fn test_prepare_deploy_key_generates_and_wires_config() {
        if std::process::Command::new("ssh-keygen")
            .arg("-Q")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_err()
        {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let mut probes = test_probes(&temp_dir, "http://127.0.0.1:1");

        let prepared = probes.prepare_deploy_key().unwrap();
        assert!(prepared.created);
        assert!(prepared.public_line.starts_with("ssh-ed25519 "));
        assert!(prepared.public_line.contains("dotgate:scowalt/dotfiles"));
        assert!(temp_dir.path().join("deploy-key").exists());

        let ssh_config = fs::read_to_string(temp_dir.path().join("ssh").join("config")).unwrap();
        assert!(ssh_config.contains("Host github-dotfiles"));
        assert!(ssh_config.contains("HostName invalid.invalid"));

        // The key scan cannot reach the reserved host; that must not fail
        // the preparation, and a second run must reuse everything
        let again = probes.prepare_deploy_key().unwrap();
        assert!(!again.created);
        assert_eq!(again.public_line, prepared.public_line);

        let ssh_config_again =
            fs::read_to_string(temp_dir.path().join("ssh").join("config")).unwrap();
        assert_eq!(ssh_config_again.matches("Host github-dotfiles").count(), 1);
    }
}
