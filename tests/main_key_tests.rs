#![allow(clippy::all, clippy::pedantic, clippy::nursery)]
//! Tests for the key show and key generate commands

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const FAKE_PUBLIC_LINE: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIKqT1YQYRryzNgxW4RdGhpYuPw9NLvmDq86rbnykghxA dotgate:scowalt/dotfiles";

fn bin_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin("dotgate")
}

fn ssh_keygen_available() -> bool {
    Command::new("ssh-keygen").arg("-Q").output().is_ok()
}

/// Write a settings file whose deploy key lives inside the test directory
fn write_config(dir: &Path) -> PathBuf {
    let config = format!(
        r#"[repository]
owner = "scowalt"
name = "dotfiles"

[auth]
token_env_vars = []
deploy_key = "{key}"

[github]
web_base = "http://127.0.0.1:1"
api_base = "http://127.0.0.1:1"

[ssh]
git_host = "invalid.invalid"
connect_timeout_secs = 1
"#,
        key = dir.join("deploy-key").display(),
    );
    let path = dir.join("config.toml");
    fs::write(&path, config).unwrap();
    path
}

/// Seed a fake keypair at the configured deploy-key path
fn seed_keypair(dir: &Path) {
    fs::write(dir.join("deploy-key"), "FAKE PRIVATE KEY\n").unwrap();
    fs::write(dir.join("deploy-key.pub"), format!("{FAKE_PUBLIC_LINE}\n")).unwrap();
}

#[test]
fn test_key_show_prints_the_public_line() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path());
    seed_keypair(home.path());

    let output = Command::new(bin_path())
        .env("HOME", home.path())
        .arg("--config")
        .arg(&config)
        .arg("key")
        .arg("show")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), FAKE_PUBLIC_LINE);
}

#[test]
fn test_key_show_copy_never_fails_without_clipboard() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path());
    seed_keypair(home.path());

    let output = Command::new(bin_path())
        .env("HOME", home.path())
        .arg("--config")
        .arg(&config)
        .arg("key")
        .arg("show")
        .arg("--copy")
        .output()
        .expect("Failed to execute command");

    // Whether a clipboard tool exists or not, the key is printed and the
    // command succeeds; the clipboard status goes to stderr
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), FAKE_PUBLIC_LINE);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("clipboard"));
}

#[test]
fn test_key_show_with_missing_public_half() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path());
    // Private half only; the .pub file is gone
    fs::write(home.path().join("deploy-key"), "FAKE PRIVATE KEY\n").unwrap();

    let output = Command::new(bin_path())
        .env("HOME", home.path())
        .arg("--config")
        .arg(&config)
        .arg("key")
        .arg("show")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("Failed to read the deploy key"));
}

#[test]
fn test_key_show_missing_key_suggests_generate() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path());

    let output = Command::new(bin_path())
        .env("HOME", home.path())
        .arg("--config")
        .arg(&config)
        .arg("key")
        .arg("show")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No deploy key at"));
    assert!(stderr.contains("dotgate key generate"));
}

#[test]
fn test_key_generate_embeds_repository_comment() {
    if !ssh_keygen_available() {
        return;
    }

    let home = TempDir::new().unwrap();
    let config = write_config(home.path());

    let output = Command::new(bin_path())
        .env("HOME", home.path())
        .arg("--config")
        .arg(&config)
        .arg("key")
        .arg("generate")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let public = fs::read_to_string(home.path().join("deploy-key.pub")).unwrap();
    assert!(public.contains("dotgate:scowalt/dotfiles"));

    // The generated line is also echoed for registration
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ssh-ed25519 "));
}

#[cfg(unix)]
#[test]
fn test_key_generate_sets_private_permissions() {
    use std::os::unix::fs::PermissionsExt;

    if !ssh_keygen_available() {
        return;
    }

    let home = TempDir::new().unwrap();
    let config = write_config(home.path());

    let output = Command::new(bin_path())
        .env("HOME", home.path())
        .arg("--config")
        .arg(&config)
        .arg("key")
        .arg("generate")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let mode = fs::metadata(home.path().join("deploy-key"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_key_generate_preserves_seeded_key() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path());
    seed_keypair(home.path());

    let private_before = fs::read(home.path().join("deploy-key")).unwrap();

    let output = Command::new(bin_path())
        .env("HOME", home.path())
        .arg("--config")
        .arg(&config)
        .arg("key")
        .arg("generate")
        .output()
        .expect("Failed to execute command");

    // No keygen needed: the existing pair short-circuits generation
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("already exists"));
    assert_eq!(
        fs::read(home.path().join("deploy-key")).unwrap(),
        private_before
    );
}
