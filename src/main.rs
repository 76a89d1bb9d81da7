//! dotgate - multi-method access resolution for a private dotfiles repository

use anyhow::{Context, Result};
use clap::Parser;
use dotgate::{
    access::{AccessResolver, SystemProbes, run_check},
    cli::{Cli, Commands, KeyCommands},
    completions,
    config::Settings,
    debug, doctor,
    output::formatter,
    prompt::{self, TtyPrompt},
    ssh::{DeployKeyStore, SshBootstrap},
};
use std::path::Path;
use std::process;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Enable debug mode if requested
    if cli.debug {
        debug::enable();
    }

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve {
            owner,
            repo,
            non_interactive,
            max_retries,
        } => resolve_access(settings, owner, repo, non_interactive, max_retries),
        Commands::Check { owner, repo, json } => check_access(settings, owner, repo, json),
        Commands::Key { command } => match command {
            KeyCommands::Show { copy } => show_key(&settings, copy),
            KeyCommands::Generate => generate_key(&settings),
        },
        Commands::Bootstrap => bootstrap_ssh(&settings),
        Commands::Doctor => process::exit(doctor::run_doctor(&settings)),
        Commands::Completions { shell } => {
            completions::generate_completions(shell);
            Ok(())
        }
        Commands::Version => show_version(),
    }
}

/// Load settings from an explicit path or the default location
fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load().context("Failed to load settings"),
    }
}

/// Apply command-line owner/repo overrides on top of the settings file
fn apply_target_overrides(settings: &mut Settings, owner: Option<String>, repo: Option<String>) {
    if let Some(owner) = owner {
        settings.repository.owner = owner;
    }
    if let Some(repo) = repo {
        settings.repository.name = repo;
    }
}

/// Resolve repository access, recovering interactively when every probe fails
fn resolve_access(
    mut settings: Settings,
    owner: Option<String>,
    repo: Option<String>,
    non_interactive: bool,
    max_retries: Option<u32>,
) -> Result<()> {
    apply_target_overrides(&mut settings, owner, repo);

    let target = settings.repo_slug();
    println!(
        "{}",
        formatter().section_header(&format!("Resolving access to {target}"))
    );

    let probes = SystemProbes::new(&settings).context("Failed to initialize credential probes")?;
    let registration_url = format!("{}/{target}/settings/keys", settings.github.web_base);

    let mut resolver = AccessResolver::new(probes, TtyPrompt::open(), target)
        .with_max_retries(max_retries.unwrap_or(settings.recovery.max_attempts))
        .with_registration_url(registration_url);
    if non_interactive {
        resolver = resolver.non_interactive();
    }

    let resolution = resolver.resolve();
    resolution.print_summary();

    if !resolution.is_granted() {
        // Denial is an answer the calling script acts on, not a failure
        process::exit(resolution.exit_code());
    }

    Ok(())
}

/// Run each probe once and report the per-method outcomes
fn check_access(
    mut settings: Settings,
    owner: Option<String>,
    repo: Option<String>,
    json: bool,
) -> Result<()> {
    apply_target_overrides(&mut settings, owner, repo);

    let mut probes =
        SystemProbes::new(&settings).context("Failed to initialize credential probes")?;

    let spinner = formatter().create_spinner("Probing access methods");
    let report = run_check(&mut probes, settings.repo_slug());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize check report")?
        );
    } else {
        report.print_summary();
    }

    if !report.is_granted() {
        process::exit(report.exit_code());
    }

    Ok(())
}

/// Print the public half of the deploy key
fn show_key(settings: &Settings, copy: bool) -> Result<()> {
    let store = DeployKeyStore::new(settings.deploy_key_path());

    if !store.exists() {
        eprintln!("No deploy key at {}", store.private_path().display());
        eprintln!("Run 'dotgate key generate' or 'dotgate resolve' to create one.");
        process::exit(1);
    }

    let line = store
        .public_key_line()
        .context("Failed to read the deploy key")?;
    println!("{line}");

    if copy {
        // Status goes to stderr so stdout stays pipeable
        match prompt::copy_to_clipboard(&line) {
            Some(tool) => eprintln!("(copied to clipboard via {tool})"),
            None => eprintln!("No clipboard tool found; copy the line above by hand."),
        }
    }

    Ok(())
}

/// Create the deploy key if it does not already exist
fn generate_key(settings: &Settings) -> Result<()> {
    let store = DeployKeyStore::new(settings.deploy_key_path());
    let comment = format!("dotgate:{}", settings.repo_slug());
    let (record, created) = store
        .ensure(&comment)
        .context("Failed to generate the deploy key")?;

    let out = formatter();
    if created {
        println!("{} Generated {}", out.created(), record.private_path.display());
    } else {
        println!(
            "{} Deploy key already exists at {}",
            out.already_present(),
            record.private_path.display()
        );
    }

    let line = store
        .public_key_line()
        .context("Failed to read the generated public key")?;
    println!("{line}");

    Ok(())
}

/// Apply the idempotent SSH host alias and known-hosts entries
fn bootstrap_ssh(settings: &Settings) -> Result<()> {
    let home = dirs::home_dir().context("Could not determine the home directory")?;

    let bootstrap = SshBootstrap::new(
        &home.join(".ssh"),
        settings.ssh.host_alias.clone(),
        settings.ssh.git_host.clone(),
        settings.auth.deploy_key.clone(),
        settings.ssh.connect_timeout_secs,
    );

    let report = bootstrap.apply();
    report.print_summary();

    if !report.is_success() {
        process::exit(1);
    }

    Ok(())
}

/// Show version information
fn show_version() -> Result<()> {
    println!("{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
