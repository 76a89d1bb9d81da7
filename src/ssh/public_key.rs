//! OpenSSH public key parsing and comparison
//!
//! Key lists come from two text sources: the owner's published-keys
//! endpoint and local `~/.ssh/id_*.pub` files. Both use the OpenSSH
//! one-line format (`type base64 [comment]`), parsed here and nowhere
//! else so format drift breaks a single seam.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A parsed OpenSSH public key line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Key algorithm identifier (e.g. `ssh-ed25519`)
    pub key_type: String,
    /// Base64 key material with trailing padding stripped
    pub key_data: String,
    /// Optional trailing comment
    pub comment: Option<String>,
}

/// A public key found on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalKey {
    /// Path of the `.pub` file the key was read from
    pub path: PathBuf,
    /// The parsed key
    pub key: PublicKey,
}

impl PublicKey {
    /// Parse a single `type base64 [comment]` line
    ///
    /// Returns `None` for blank lines, comment lines, and anything that
    /// does not look like an OpenSSH public key.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut fields = line.split_whitespace();
        let key_type = fields.next()?;
        let key_data = fields.next()?;

        if !is_key_type(key_type) {
            return None;
        }

        let comment = {
            let rest = fields.collect::<Vec<_>>().join(" ");
            if rest.is_empty() { None } else { Some(rest) }
        };

        Some(Self {
            key_type: key_type.to_string(),
            key_data: key_data.trim_end_matches('=').to_string(),
            comment,
        })
    }

    /// Parse every key in a newline-separated list, skipping non-key lines
    #[must_use]
    pub fn parse_list(text: &str) -> Vec<Self> {
        text.lines().filter_map(Self::parse).collect()
    }

    /// Whether two lines describe the same key (comments ignored)
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        self.key_type == other.key_type && self.key_data == other.key_data
    }

    /// Short hex digest of the normalized key, for display only
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.key_type.as_bytes());
        hasher.update(b" ");
        hasher.update(self.key_data.as_bytes());
        let mut hex_digest = hex::encode(hasher.finalize());
        hex_digest.truncate(16);
        hex_digest
    }
}

/// Whether a field looks like an OpenSSH key algorithm identifier
fn is_key_type(field: &str) -> bool {
    field.starts_with("ssh-") || field.starts_with("ecdsa-") || field.starts_with("sk-")
}

/// Enumerate parseable public keys at `<ssh_dir>/id_*.pub`
///
/// Files that exist but fail to parse are skipped, matching how the SSH
/// client treats malformed identity files.
///
/// # Errors
///
/// Returns an error if the glob pattern cannot be built from the
/// directory path
pub fn local_public_keys(ssh_dir: &Path) -> Result<Vec<LocalKey>> {
    let pattern = format!(
        "{}/id_*.pub",
        glob::Pattern::escape(&ssh_dir.display().to_string())
    );
    let entries = glob::glob(&pattern)
        .with_context(|| format!("Invalid public key search pattern: {pattern}"))?;

    let mut keys = Vec::new();
    for entry in entries {
        let Ok(path) = entry else { continue };
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if let Some(key) = content.lines().find_map(PublicKey::parse) {
            keys.push(LocalKey { path, key });
        }
    }

    Ok(keys)
}
