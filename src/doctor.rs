//! Health check and diagnostics module.

use crate::config::Settings;
use crate::github::GithubClient;
use crate::ssh::{DeployKeyStore, KnownHostsFile, SshConfigFile, local_public_keys};
use std::path::Path;
use std::process::{Command, Stdio};

/// Run doctor command to check access-resolution health.
///
/// Returns exit code: 0 if healthy, 1 if issues found.
#[must_use]
pub fn run_doctor(settings: &Settings) -> i32 {
    println!("🏥 dotgate health check");
    println!("=======================");
    println!();

    let mut has_errors = false;
    let mut has_warnings = false;

    check_openssh_tools(&mut has_errors, &mut has_warnings);
    println!();

    let ssh_dir = dirs::home_dir().map(|home| home.join(".ssh"));

    check_personal_keys(ssh_dir.as_deref(), &mut has_warnings);
    println!();

    check_token_variables(settings, &mut has_warnings);
    println!();

    check_deploy_key(settings, ssh_dir.as_deref(), &mut has_errors, &mut has_warnings);
    println!();

    check_published_keys(settings, &mut has_warnings);
    println!();

    if has_errors {
        println!("❌ Issues found - see above for details");
        1
    } else if has_warnings {
        println!("⚠️  Warnings found - some access methods are unavailable");
        0
    } else {
        println!("✨ Everything looks healthy!");
        0
    }
}

/// Check that the OpenSSH client tools are on PATH
fn check_openssh_tools(has_errors: &mut bool, has_warnings: &mut bool) {
    println!("🔧 OpenSSH tooling:");

    if binary_runs("ssh") {
        println!("  ✅ ssh is available");
    } else {
        println!("  ❌ ssh not found on PATH - handshake probes cannot run");
        *has_errors = true;
    }

    if binary_runs("ssh-keygen") {
        println!("  ✅ ssh-keygen is available");
    } else {
        println!("  ⚠️  ssh-keygen not found on PATH - deploy keys cannot be generated");
        *has_warnings = true;
    }

    if binary_runs("ssh-keyscan") {
        println!("  ✅ ssh-keyscan is available");
    } else {
        println!("  ⚠️  ssh-keyscan not found on PATH - known_hosts entries cannot be collected");
        *has_warnings = true;
    }
}

/// Check for personal public keys under ~/.ssh
fn check_personal_keys(ssh_dir: Option<&Path>, has_warnings: &mut bool) {
    println!("🔑 Personal SSH keys:");

    let Some(ssh_dir) = ssh_dir else {
        println!("  ⚠️  Could not determine the home directory");
        *has_warnings = true;
        return;
    };

    if !ssh_dir.exists() {
        println!(
            "  ⚠️  {} does not exist - no personal keys to probe with",
            ssh_dir.display()
        );
        *has_warnings = true;
        return;
    }

    match local_public_keys(ssh_dir) {
        Ok(keys) if keys.is_empty() => {
            println!(
                "  ⚠️  No id_*.pub files in {} - the personal-key probe will be skipped",
                ssh_dir.display()
            );
            *has_warnings = true;
        }
        Ok(keys) => {
            println!("  ✅ Found {} local public key(s)", keys.len());
            for key in &keys {
                println!("  ℹ️  {} ({})", key.path.display(), key.key.key_type);
            }
        }
        Err(e) => {
            println!("  ⚠️  Could not read keys from {}: {e:#}", ssh_dir.display());
            *has_warnings = true;
        }
    }
}

/// Check which configured token variables carry a value
fn check_token_variables(settings: &Settings, has_warnings: &mut bool) {
    println!("🎫 Token environment variables:");

    if settings.auth.token_env_vars.is_empty() {
        println!("  ⚠️  No token variables configured");
        *has_warnings = true;
        return;
    }

    let mut any_set = false;
    for name in &settings.auth.token_env_vars {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => {
                println!("  ✅ {name} is set");
                any_set = true;
            }
            _ => println!("  ℹ️  {name} is not set"),
        }
    }

    if !any_set {
        println!("  ⚠️  No configured token variable is set - the token probe will be skipped");
        *has_warnings = true;
    }
}

/// Check the deploy key file and the SSH client configuration around it
fn check_deploy_key(
    settings: &Settings,
    ssh_dir: Option<&Path>,
    has_errors: &mut bool,
    has_warnings: &mut bool,
) {
    println!("🔐 Deploy key setup:");

    let store = DeployKeyStore::new(settings.deploy_key_path());
    if store.exists() {
        match store.public_key() {
            Ok(key) => println!(
                "  ✅ Deploy key at {} ({})",
                store.private_path().display(),
                key.key_type
            ),
            Err(e) => {
                println!(
                    "  ❌ Deploy key at {} has no readable public half: {e:#}",
                    store.private_path().display()
                );
                *has_errors = true;
            }
        }
    } else {
        println!("  ℹ️  No deploy key at {}", store.private_path().display());
        println!("  💡 Run 'dotgate resolve' to create and register one interactively");
    }

    let Some(ssh_dir) = ssh_dir else {
        return;
    };

    let config = SshConfigFile::new(ssh_dir.join("config"));
    match config.has_host_alias(&settings.ssh.host_alias) {
        Ok(true) => println!("  ✅ Host alias '{}' is configured", settings.ssh.host_alias),
        Ok(false) => {
            println!(
                "  ⚠️  No '{}' block in {}",
                settings.ssh.host_alias,
                config.path().display()
            );
            println!("  💡 Run 'dotgate bootstrap' to add it");
            *has_warnings = true;
        }
        Err(e) => {
            println!("  ❌ Could not read {}: {e:#}", config.path().display());
            *has_errors = true;
        }
    }

    let known_hosts = KnownHostsFile::new(ssh_dir.join("known_hosts"));
    match known_hosts.has_host(&settings.ssh.git_host) {
        Ok(true) => println!("  ✅ {} is in known_hosts", settings.ssh.git_host),
        Ok(false) => println!(
            "  ℹ️  {} is not in known_hosts; probes pin it on first contact",
            settings.ssh.git_host
        ),
        Err(e) => {
            println!("  ❌ Could not read {}: {e:#}", known_hosts.path().display());
            *has_errors = true;
        }
    }
}

/// Check that the owner's published-keys endpoint answers
fn check_published_keys(settings: &Settings, has_warnings: &mut bool) {
    println!("🌐 GitHub reachability:");

    let owner = &settings.repository.owner;
    match GithubClient::from_settings(settings).and_then(|client| client.published_keys(owner)) {
        Ok(keys) if keys.is_empty() => {
            println!("  ⚠️  {owner} has no published keys - the personal-key probe cannot match");
            *has_warnings = true;
        }
        Ok(keys) => println!("  ✅ {owner} publishes {} key(s)", keys.len()),
        Err(e) => {
            println!("  ⚠️  Could not fetch published keys: {e:#}");
            *has_warnings = true;
        }
    }
}

/// True when the named binary can be spawned at all
fn binary_runs(name: &str) -> bool {
    Command::new(name)
        .arg("-V")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
