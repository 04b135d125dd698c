//! netdeploy CLI - build and ship web bundles to IIS network shares
//!
//! Usage: netdeploy [deploy] [SITE\APP | SITE APP] [options]
//!        netdeploy config <show|set|reset>
//!
//! The bare form deploys: `netdeploy akbl\mobile --no-build`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use netdeploy::config::{self, ConfigOverrides, DeploymentConfig};
use netdeploy::models::DeploymentTarget;
use netdeploy::pipeline::{DeployOptions, DeployPipeline, Outcome, PipelineEvent};
use netdeploy::process::SystemRunner;
use netdeploy::share::{NetworkConnector, SystemShareFs};
use netdeploy::ui::{self, Prompt, TerminalPrompt};

/// netdeploy - build and deploy utility for IIS network shares
#[derive(Parser, Debug)]
#[command(name = "netdeploy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Bare invocation deploys, mirroring `netdeploy deploy ...`
    #[command(flatten)]
    deploy: DeployArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy an application (default when no subcommand is given)
    Deploy(DeployArgs),

    /// Manage persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
struct DeployArgs {
    /// Deployment path as SITE_NAME\APP_NAME or SITE_NAME/APP_NAME
    deployment_path: Option<String>,

    /// Application name (if the site name was given separately)
    app_name: Option<String>,

    /// Remote server IP/hostname (default from config)
    #[arg(short, long)]
    server: Option<String>,

    /// Network share name (default from config)
    #[arg(short = 'r', long)]
    share: Option<String>,

    /// Target directory pattern (default from config)
    #[arg(short = 't', long)]
    target_dir: Option<String>,

    /// Username for network authentication (default from config)
    #[arg(short, long)]
    username: Option<String>,

    /// Password for network authentication (default from config)
    #[arg(short, long)]
    password: Option<String>,

    /// Skip backup creation
    #[arg(long)]
    no_backup: bool,

    /// Skip ng build (use existing build output)
    #[arg(long)]
    no_build: bool,

    /// Build folder (default: auto-detect www/dist)
    #[arg(long)]
    build_folder: Option<PathBuf>,

    /// Show what would be deployed without deploying
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show the current configuration
    Show,

    /// Set a configuration value
    Set { key: String, value: String },

    /// Reset configuration to defaults
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { action }) => cmd_config(action),
        Some(Commands::Deploy(args)) => cmd_deploy(args),
        None => cmd_deploy(cli.deploy),
    }
}

fn cmd_deploy(args: DeployArgs) -> Result<()> {
    let (file_config, warnings) = config::load_or_default(None);
    for warning in &warnings {
        eprintln!(
            "\u{26a0} Unknown config key '{}' in {}",
            warning.key,
            warning.file.display()
        );
    }

    let resolved = config::with_env_overrides(file_config).apply_overrides(ConfigOverrides {
        server: args.server.clone(),
        share: args.share.clone(),
        target_dir: args.target_dir.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
    });

    print!("{}", ui::render_header());

    let prompt = TerminalPrompt;
    let target = resolve_target(&args, &prompt)?;

    let options = DeployOptions {
        target: target.clone(),
        no_backup: args.no_backup,
        no_build: args.no_build,
        build_folder: args.build_folder.clone(),
        dry_run: args.dry_run,
        assume_yes: args.yes,
        verbose: args.verbose,
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = interrupted.clone();
        // A second handler registration fails if one exists; nothing to
        // do about it mid-run, so ignore.
        let _ = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst));
    }

    let runner = SystemRunner;
    let share_fs = SystemShareFs;
    let connector = NetworkConnector::new(&resolved, &runner, &share_fs, &prompt, args.verbose);
    let pipeline = DeployPipeline::new(
        &resolved,
        options,
        std::env::current_dir()?,
        &connector,
        &runner,
        &prompt,
    )
    .with_interrupt_flag(interrupted);

    let verbose = args.verbose;
    let outcome = pipeline.run_with_callback(|event| {
        render_event(&event, &target, &resolved, verbose);
    });

    match outcome {
        Outcome::DryRun(steps) => {
            print!("{}", ui::render_dry_run_plan(&steps));
            Ok(())
        }
        Outcome::Succeeded(report) => {
            for warning in &report.warnings {
                println!("\u{26a0} {warning}");
            }
            print!(
                "{}",
                ui::render_success(&report.archive.file_name(), &report.target_path, &report.server)
            );
            Ok(())
        }
        Outcome::Cancelled => {
            println!("\nDeployment cancelled.");
            Ok(())
        }
        Outcome::Failed(report) => {
            eprintln!("\n\u{2717} Deployment failed: {}", report.error);
            if verbose {
                if let Some(detail) = report.error.verbose_detail() {
                    eprintln!("{detail}");
                }
                eprintln!("(last completed stage: {})", report.stage);
            }
            for warning in &report.warnings {
                eprintln!("\u{26a0} {warning}");
            }
            if let Some(manual) = &report.manual {
                print!(
                    "{}",
                    ui::render_manual_instructions(
                        &manual.archive_name,
                        &manual.share_path,
                        &manual.target_dir
                    )
                );
            }
            std::process::exit(1);
        }
    }
}

/// Derive the deployment target from CLI tokens, falling back to the
/// current directory name for the app and an interactive prompt for
/// the site.
fn resolve_target(args: &DeployArgs, prompt: &dyn Prompt) -> Result<DeploymentTarget> {
    let cwd_name = std::env::current_dir()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let target = match (&args.deployment_path, &args.app_name) {
        (Some(path), _) if path.contains('/') || path.contains('\\') => {
            DeploymentTarget::from_token(path)?
        }
        (Some(site), Some(app)) => DeploymentTarget::new(site, app)?,
        (Some(site), None) => DeploymentTarget::new(site, &cwd_name)?,
        (None, _) => {
            let site = prompt.input("Enter site name")?;
            DeploymentTarget::new(site.trim(), &cwd_name)?
        }
    };
    Ok(target)
}

fn render_event(
    event: &PipelineEvent,
    target: &DeploymentTarget,
    config: &DeploymentConfig,
    verbose: bool,
) {
    match event {
        PipelineEvent::ProjectValidated => {
            if verbose {
                println!("\u{2713} Angular project detected");
            }
        }
        PipelineEvent::BuildStarted => println!("Building Angular project..."),
        PipelineEvent::BuildSucceeded => println!("\u{2713} Build completed"),
        PipelineEvent::BuildSkipped => println!("Skipping build (using existing output)"),
        PipelineEvent::Packaged { archive, entries } => {
            println!("\u{2713} Packaged {entries} files into {archive}");
        }
        PipelineEvent::Probing { server } => {
            if verbose {
                println!("Testing connection to {server}...");
            }
        }
        PipelineEvent::Connected { drive, .. } => match drive {
            Some(letter) => println!("\u{2713} Connected to share via drive {letter}:"),
            None => println!("\u{2713} Share accessible without authentication"),
        },
        PipelineEvent::AwaitingConfirmation {
            target_path,
            backup_enabled,
            backup_dir,
        } => {
            println!();
            print!(
                "{}",
                ui::render_deployment_info(
                    target,
                    config,
                    target_path,
                    *backup_enabled,
                    backup_dir
                )
            );
        }
        PipelineEvent::BackupSkipped => println!("Skipping backup"),
        PipelineEvent::BackupEmpty => {
            if verbose {
                println!("Target directory is empty - nothing to back up");
            }
        }
        PipelineEvent::BackupCreated { archive, entries } => {
            println!("\u{2713} Backed up {entries} files into {archive}");
        }
        PipelineEvent::BackupFailed { message } => {
            println!("\u{26a0} {message} - continuing without a backup");
        }
        PipelineEvent::TargetCleared { warnings } => {
            for warning in warnings {
                println!("\u{26a0} {warning}");
            }
            if verbose {
                println!("\u{2713} Target directory cleared");
            }
        }
        PipelineEvent::Extracted { entries } => {
            println!("\u{2713} Extracted {entries} files to the target");
        }
    }
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let path = config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine the user config directory"))?;

    match action {
        ConfigAction::Show => {
            let (config, warnings) = config::load_or_default(Some(&path));
            for warning in &warnings {
                eprintln!("\u{26a0} Unknown config key '{}'", warning.key);
            }
            println!("Current configuration:");
            println!("  remote_server      = {}", config.remote_server);
            println!("  remote_share       = {}", config.remote_share);
            println!("  target_dir_pattern = {}", config.target_dir_pattern);
            println!(
                "  username           = {}",
                if config.username.is_empty() {
                    "(not set)"
                } else {
                    &config.username
                }
            );
            println!(
                "  password           = {}",
                if config.password.is_empty() {
                    "(not set)".to_string()
                } else {
                    "*".repeat(config.password.len())
                }
            );
            println!("  config file        = {}", path.display());
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            config::set_value_at(&path, &key, &value)?;
            let shown = if key == "password" {
                "*".repeat(value.len())
            } else {
                value
            };
            println!("Updated {key} = {shown}");
            Ok(())
        }
        ConfigAction::Reset => {
            let prompt = TerminalPrompt;
            if !prompt.confirm("Reset configuration to defaults?")? {
                println!("Configuration reset cancelled.");
                return Ok(());
            }
            if config::reset_at(&path)? {
                println!("Configuration reset to defaults.");
            } else {
                println!("No configuration file found. Already at defaults.");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_bare_combined_token() {
        let cli = Cli::try_parse_from(["netdeploy", "akbl/mobile"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.deploy.deployment_path.as_deref(), Some("akbl/mobile"));
    }

    #[test]
    fn test_cli_parse_bare_two_tokens() {
        let cli = Cli::try_parse_from(["netdeploy", "akbl", "mobile"]).unwrap();
        assert_eq!(cli.deploy.deployment_path.as_deref(), Some("akbl"));
        assert_eq!(cli.deploy.app_name.as_deref(), Some("mobile"));
    }

    #[test]
    fn test_cli_parse_deploy_subcommand() {
        let cli = Cli::try_parse_from(["netdeploy", "deploy", "akbl/mobile", "--no-backup"])
            .unwrap();
        match cli.command {
            Some(Commands::Deploy(args)) => {
                assert_eq!(args.deployment_path.as_deref(), Some("akbl/mobile"));
                assert!(args.no_backup);
            }
            other => panic!("expected deploy command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_deploy_flags() {
        let cli = Cli::try_parse_from([
            "netdeploy",
            "akbl/mobile",
            "--no-build",
            "--dry-run",
            "--yes",
            "-v",
            "--server",
            "10.0.0.5",
            "--build-folder",
            "out",
        ])
        .unwrap();

        let args = cli.deploy;
        assert!(args.no_build);
        assert!(args.dry_run);
        assert!(args.yes);
        assert!(args.verbose);
        assert_eq!(args.server.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.build_folder, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_cli_parse_config_show() {
        let cli = Cli::try_parse_from(["netdeploy", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_cli_parse_config_set() {
        let cli =
            Cli::try_parse_from(["netdeploy", "config", "set", "remote_server", "10.1.1.1"])
                .unwrap();
        match cli.command {
            Some(Commands::Config {
                action: ConfigAction::Set { key, value },
            }) => {
                assert_eq!(key, "remote_server");
                assert_eq!(value, "10.1.1.1");
            }
            other => panic!("expected config set, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_target_combined_and_split_forms_agree() {
        let combined = DeployArgs {
            deployment_path: Some("akbl\\mobile".to_string()),
            ..DeployArgs::default()
        };
        let split = DeployArgs {
            deployment_path: Some("akbl".to_string()),
            app_name: Some("mobile".to_string()),
            ..DeployArgs::default()
        };

        struct NoPrompt;
        impl Prompt for NoPrompt {
            fn confirm(&self, _: &str) -> netdeploy::DeployResult<bool> {
                panic!("confirm should not be called")
            }
            fn input(&self, _: &str) -> netdeploy::DeployResult<String> {
                panic!("input should not be called")
            }
            fn password(&self, _: &str) -> netdeploy::DeployResult<String> {
                panic!("password should not be called")
            }
        }

        assert_eq!(
            resolve_target(&combined, &NoPrompt).unwrap(),
            resolve_target(&split, &NoPrompt).unwrap()
        );
    }
}
