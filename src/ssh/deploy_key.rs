//! Deploy key generation and inspection
//!
//! The deploy key is a scoped keypair living at one fixed path. It is
//! generated at most once per machine and never rotated or overwritten;
//! every write path here checks for an existing key first.

use crate::ssh::PublicKey;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Metadata for the persisted deploy keypair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployKeyRecord {
    /// Path of the private key file
    pub private_path: PathBuf,
    /// Path of the public key file
    pub public_path: PathBuf,
    /// Comment embedded in the public key, if any
    pub comment: Option<String>,
}

/// Manages the deploy keypair at its fixed path
#[derive(Debug, Clone)]
pub struct DeployKeyStore {
    /// Private key path; the public half lives beside it with `.pub` appended
    private_path: PathBuf,
}

impl DeployKeyStore {
    /// Create a store for the given private key path
    #[must_use]
    pub const fn new(private_path: PathBuf) -> Self {
        Self { private_path }
    }

    /// Path of the private key file
    #[must_use]
    pub fn private_path(&self) -> &Path {
        &self.private_path
    }

    /// Path of the public key file
    #[must_use]
    pub fn public_path(&self) -> PathBuf {
        let mut path = self.private_path.clone().into_os_string();
        path.push(".pub");
        PathBuf::from(path)
    }

    /// Whether the private key file exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.private_path.exists()
    }

    /// Load the record for an existing keypair
    ///
    /// # Errors
    ///
    /// Returns an error if the private key is absent or the public half
    /// cannot be read or parsed
    pub fn load(&self) -> Result<DeployKeyRecord> {
        if !self.exists() {
            return Err(anyhow::anyhow!(
                "No deploy key at {}",
                self.private_path.display()
            ));
        }

        let public_path = self.public_path();
        let key = self.public_key().with_context(|| {
            format!("Failed to read deploy public key: {}", public_path.display())
        })?;

        Ok(DeployKeyRecord {
            private_path: self.private_path.clone(),
            public_path,
            comment: key.comment,
        })
    }

    /// Load an existing keypair, or generate one if none exists
    ///
    /// Returns the record and whether a new keypair was generated. An
    /// existing key is returned untouched, whatever its type or comment.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails or an existing keypair
    /// cannot be read
    pub fn ensure(&self, comment: &str) -> Result<(DeployKeyRecord, bool)> {
        if self.exists() {
            return Ok((self.load()?, false));
        }

        self.create_parent_dir()?;
        self.generate(comment)?;

        Ok((self.load()?, true))
    }

    /// The parsed public half of the keypair
    ///
    /// # Errors
    ///
    /// Returns an error if the public key file is missing or malformed
    pub fn public_key(&self) -> Result<PublicKey> {
        let line = self.public_key_line()?;
        PublicKey::parse(&line).ok_or_else(|| {
            anyhow::anyhow!(
                "Malformed public key file: {}",
                self.public_path().display()
            )
        })
    }

    /// The raw public key line, trimmed, for display and registration
    ///
    /// # Errors
    ///
    /// Returns an error if the public key file cannot be read
    pub fn public_key_line(&self) -> Result<String> {
        let public_path = self.public_path();
        let content = std::fs::read_to_string(&public_path).with_context(|| {
            format!("Failed to read public key file: {}", public_path.display())
        })?;
        Ok(content.trim().to_string())
    }

    /// Create the key directory when absent, private on Unix
    fn create_parent_dir(&self) -> Result<()> {
        let Some(parent) = self.private_path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }

        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create key directory: {}", parent.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = std::fs::metadata(parent)?.permissions();
            permissions.set_mode(0o700);
            std::fs::set_permissions(parent, permissions).with_context(|| {
                format!("Failed to set key directory mode: {}", parent.display())
            })?;
        }

        Ok(())
    }

    /// Run `ssh-keygen` to create a fresh ed25519 keypair
    fn generate(&self, comment: &str) -> Result<()> {
        if self.exists() {
            // ssh-keygen would prompt to overwrite; refuse instead
            return Err(anyhow::anyhow!(
                "Deploy key already exists: {}",
                self.private_path.display()
            ));
        }

        let output = Command::new("ssh-keygen")
            .args(["-q", "-t", "ed25519", "-N", "", "-C", comment, "-f"])
            .arg(&self.private_path)
            .stdin(Stdio::null())
            .output()
            .context("Failed to run ssh-keygen (is OpenSSH installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "ssh-keygen failed: {}",
                stderr.trim()
            ));
        }

        Ok(())
    }
}
