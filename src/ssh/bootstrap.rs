//! Idempotent SSH client configuration for the deploy key
//!
//! Two files get one managed addition each: a `Host` alias block in
//! `~/.ssh/config` binding the deploy key to the git host, and the git
//! host's keys in `~/.ssh/known_hosts`. Every write checks for an
//! existing entry first, so repeated runs converge instead of stacking
//! duplicates. Rewrites go through a same-directory temp file.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Outcome of one idempotent file addition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapAction {
    /// The entry was written
    Created,
    /// An entry already existed; the file was left untouched
    AlreadyPresent,
}

/// Managed `~/.ssh/config` access
#[derive(Debug, Clone)]
pub struct SshConfigFile {
    /// Path of the SSH client config file
    path: PathBuf,
}

/// Managed `~/.ssh/known_hosts` access
#[derive(Debug, Clone)]
pub struct KnownHostsFile {
    /// Path of the known-hosts file
    path: PathBuf,
}

impl SshConfigFile {
    /// Create an accessor for the given config file path
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the config file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a `Host <alias>` block unless one already exists
    ///
    /// The block binds `alias` to `host` with `identity_file` as the only
    /// offered identity. `identity_file` is written verbatim, so a `~`
    /// form stays portable in the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or rewritten
    pub fn ensure_host_alias(
        &self,
        alias: &str,
        host: &str,
        identity_file: &str,
    ) -> Result<BootstrapAction> {
        let content = read_or_empty(&self.path)?;

        if alias_present(&content, alias) {
            return Ok(BootstrapAction::AlreadyPresent);
        }

        let block = format!(
            "# Added by dotgate\n\
             Host {alias}\n    \
             HostName {host}\n    \
             User git\n    \
             IdentityFile {identity_file}\n    \
             IdentitiesOnly yes\n"
        );

        let mut new_content = content;
        if !new_content.is_empty() {
            if !new_content.ends_with('\n') {
                new_content.push('\n');
            }
            new_content.push('\n');
        }
        new_content.push_str(&block);

        write_private(&self.path, &new_content)?;
        Ok(BootstrapAction::Created)
    }

    /// Whether a `Host` line for `alias` exists in the file
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read
    pub fn has_host_alias(&self, alias: &str) -> Result<bool> {
        Ok(alias_present(&read_or_empty(&self.path)?, alias))
    }
}

impl KnownHostsFile {
    /// Create an accessor for the given known-hosts file path
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the known-hosts file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the given key lines unless the host already has an entry
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten
    pub fn append_missing(&self, host: &str, key_lines: &[String]) -> Result<BootstrapAction> {
        let content = read_or_empty(&self.path)?;

        if host_present(&content, host) {
            return Ok(BootstrapAction::AlreadyPresent);
        }

        let mut new_content = content;
        if !new_content.is_empty() && !new_content.ends_with('\n') {
            new_content.push('\n');
        }
        for line in key_lines {
            new_content.push_str(line);
            new_content.push('\n');
        }

        write_private(&self.path, &new_content)?;
        Ok(BootstrapAction::Created)
    }

    /// Scan the host and append its keys unless an entry already exists
    ///
    /// The presence check runs first, so the no-op path needs no network.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails or the file cannot be rewritten
    pub fn ensure_host(&self, host: &str, scan_timeout_secs: u64) -> Result<BootstrapAction> {
        if host_present(&read_or_empty(&self.path)?, host) {
            return Ok(BootstrapAction::AlreadyPresent);
        }

        let key_lines = scan_host_keys(host, scan_timeout_secs)?;
        self.append_missing(host, &key_lines)
    }

    /// Whether the host has a plain entry in the file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read
    pub fn has_host(&self, host: &str) -> Result<bool> {
        Ok(host_present(&read_or_empty(&self.path)?, host))
    }
}

/// Whether a `Host` stanza line listing `alias` as a pattern exists
#[must_use]
pub fn alias_present(content: &str, alias: &str) -> bool {
    content.lines().any(|line| {
        let mut tokens = line.trim().split_whitespace();
        tokens
            .next()
            .is_some_and(|keyword| keyword.eq_ignore_ascii_case("host"))
            && tokens.any(|pattern| pattern == alias)
    })
}

/// Whether `host` appears in a plain (non-hashed) known-hosts entry
///
/// Hashed `|1|` entries cannot be matched textually and count as absent;
/// this tool only ever writes plain entries, so its own writes stay
/// idempotent.
#[must_use]
pub fn host_present(content: &str, host: &str) -> bool {
    content.lines().any(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('|') {
            return false;
        }

        let mut fields = line.split_whitespace();
        let mut host_list = match fields.next() {
            Some(first) => first,
            None => return false,
        };
        // Skip marker fields like @revoked or @cert-authority
        if host_list.starts_with('@') {
            match fields.next() {
                Some(second) => host_list = second,
                None => return false,
            }
        }

        host_list
            .split(',')
            .any(|entry| entry.eq_ignore_ascii_case(host))
    })
}

/// Fetch the host's public keys via `ssh-keyscan`
///
/// # Errors
///
/// Returns an error if `ssh-keyscan` cannot run or returns no keys
pub fn scan_host_keys(host: &str, timeout_secs: u64) -> Result<Vec<String>> {
    let output = Command::new("ssh-keyscan")
        .args(["-T", &timeout_secs.to_string()])
        .arg(host)
        .stdin(Stdio::null())
        .output()
        .context("Failed to run ssh-keyscan (is OpenSSH installed?)")?;

    let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect();

    if lines.is_empty() {
        return Err(anyhow::anyhow!("ssh-keyscan returned no keys for {host}"));
    }

    Ok(lines)
}

/// Applies both SSH client file additions and collects the outcomes
#[derive(Debug)]
pub struct SshBootstrap {
    /// SSH client config accessor
    ssh_config: SshConfigFile,
    /// Known-hosts accessor
    known_hosts: KnownHostsFile,
    /// Alias the deploy key is bound to
    host_alias: String,
    /// Real git host behind the alias
    git_host: String,
    /// IdentityFile value written to the config block
    identity_file: String,
    /// Timeout for the host key scan, in seconds
    scan_timeout_secs: u64,
}

impl SshBootstrap {
    /// Create a bootstrap for the standard file names under `ssh_dir`
    #[must_use]
    pub fn new(
        ssh_dir: &Path,
        host_alias: String,
        git_host: String,
        identity_file: String,
        scan_timeout_secs: u64,
    ) -> Self {
        Self {
            ssh_config: SshConfigFile::new(ssh_dir.join("config")),
            known_hosts: KnownHostsFile::new(ssh_dir.join("known_hosts")),
            host_alias,
            git_host,
            identity_file,
            scan_timeout_secs,
        }
    }

    /// Apply both additions, collecting outcomes instead of aborting
    #[must_use]
    pub fn apply(&self) -> BootstrapReport {
        let mut report = BootstrapReport {
            applied: Vec::new(),
            errors: Vec::new(),
        };

        let config_entry = format!(
            "Host {} block in {}",
            self.host_alias,
            self.ssh_config.path().display()
        );
        match self
            .ssh_config
            .ensure_host_alias(&self.host_alias, &self.git_host, &self.identity_file)
        {
            Ok(action) => report.applied.push((config_entry, action)),
            Err(e) => report.errors.push((config_entry, format!("{e:#}"))),
        }

        let hosts_entry = format!(
            "{} entry in {}",
            self.git_host,
            self.known_hosts.path().display()
        );
        match self
            .known_hosts
            .ensure_host(&self.git_host, self.scan_timeout_secs)
        {
            Ok(action) => report.applied.push((hosts_entry, action)),
            Err(e) => report.errors.push((hosts_entry, format!("{e:#}"))),
        }

        report
    }
}

/// Report of bootstrap operations
#[derive(Debug)]
pub struct BootstrapReport {
    /// Applied entries with their outcomes
    pub applied: Vec<(String, BootstrapAction)>,
    /// Entries that could not be applied
    pub errors: Vec<(String, String)>,
}

impl BootstrapReport {
    /// Print a summary of the bootstrap
    pub fn print_summary(&self) {
        println!("SSH Bootstrap Summary:");
        println!("======================");

        for (entry, action) in &self.applied {
            match action {
                BootstrapAction::Created => println!("✅ Created: {entry}"),
                BootstrapAction::AlreadyPresent => println!("⏭️  Already present: {entry}"),
            }
        }

        if !self.errors.is_empty() {
            println!("❌ Errors:");
            for (entry, error) in &self.errors {
                println!("  {entry}: {error}");
            }
        }
    }

    /// Check if every entry was applied
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read a file's contents, treating a missing file as empty
fn read_or_empty(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Rewrite a file atomically with owner-only permissions
fn write_private(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if !parent.exists() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = std::fs::metadata(parent)?.permissions();
            permissions.set_mode(0o700);
            std::fs::set_permissions(parent, permissions)
                .with_context(|| format!("Failed to set directory mode: {}", parent.display()))?;
        }
    }

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file mode: {}", path.display()))?;
    }

    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
