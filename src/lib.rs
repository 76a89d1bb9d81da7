//! dotgate: multi-method access resolution for a private dotfiles repository
//!
//! Figures out whether this machine can reach one private GitHub repository,
//! trying the owner's personal SSH key, a token from the environment, and a
//! dedicated deploy key in that order. When every method fails it can walk a
//! human through registering a fresh deploy key, retrying until access works
//! or the human bows out. Denial is an answer, not an error: callers keep
//! provisioning and simply skip the steps that need the repository.

/// Access resolution state machine and credential probes
pub mod access;
/// Command-line interface definitions
pub mod cli;
/// Shell completion generation
pub mod completions;
/// Settings file parsing and defaults
pub mod config;
/// Debug logging utilities
pub mod debug;
/// Environment health checks
pub mod doctor;
/// GitHub HTTPS endpoints for key listings and token validation
pub mod github;
/// Terminal output formatting
pub mod output;
/// Controlling-terminal prompting for interactive recovery
pub mod prompt;
/// SSH probing, key material, and client configuration
pub mod ssh;

pub use access::*;
pub use config::*;
