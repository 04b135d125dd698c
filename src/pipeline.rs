//! Deployment pipeline
//!
//! Sequences build validation -> packaging -> connection ->
//! confirmation -> backup -> clear -> extract, carrying a typed
//! `RunContext` through each transition. The pipeline owns the share
//! access handle for the whole run and releases it in one cleanup
//! block on every exit path, so a mapped drive can never leak or be
//! released twice.
//!
//! Pure orchestration: all real work lives in the leaf modules, and
//! the external collaborators (connector, command runner, prompt) are
//! ports so the state machine is testable end to end.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backup::backup;
use crate::config::DeploymentConfig;
use crate::deploy::{clear_target, deploy_archive};
use crate::error::{DeployError, DeployResult};
use crate::models::{ArtifactPackage, BackupRecord, DeploymentTarget};
use crate::package::{find_build_folder, Packager};
use crate::process::CommandRunner;
use crate::share::{Connector, ShareAccess};
use crate::ui::Prompt;

/// Backups live under `<share-root>/IISDeployments/<site>` regardless
/// of the target directory pattern.
pub const BACKUP_ROOT: &str = "IISDeployments";

/// Pipeline stages, in execution order. A failure report names the
/// last stage that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Validated,
    Packaged,
    Connected,
    Confirmed,
    BackedUp,
    Cleared,
    Deployed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Validated => "validated",
            Stage::Packaged => "packaged",
            Stage::Connected => "connected",
            Stage::Confirmed => "confirmed",
            Stage::BackedUp => "backed-up",
            Stage::Cleared => "cleared",
            Stage::Deployed => "deployed",
        };
        f.write_str(name)
    }
}

/// Options for one deployment run.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub target: DeploymentTarget,
    /// Skip the pre-overwrite backup
    pub no_backup: bool,
    /// Skip `ng build` and package the existing output
    pub no_build: bool,
    /// Explicit build folder instead of the www/dist probe
    pub build_folder: Option<PathBuf>,
    /// Plan only - zero side effects
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
    pub verbose: bool,
}

impl DeployOptions {
    pub fn new(target: DeploymentTarget) -> Self {
        Self {
            target,
            no_backup: false,
            no_build: false,
            build_folder: None,
            dry_run: false,
            assume_yes: false,
            verbose: false,
        }
    }

    pub fn with_no_backup(mut self, no_backup: bool) -> Self {
        self.no_backup = no_backup;
        self
    }

    pub fn with_no_build(mut self, no_build: bool) -> Self {
        self.no_build = no_build;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }
}

/// Progress notifications emitted as the pipeline advances.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    ProjectValidated,
    BuildStarted,
    BuildSucceeded,
    BuildSkipped,
    Packaged {
        archive: String,
        entries: usize,
    },
    Probing {
        server: String,
    },
    Connected {
        root: PathBuf,
        drive: Option<char>,
    },
    /// Emitted before the confirmation decision so callers can render
    /// the deployment summary.
    AwaitingConfirmation {
        target_path: PathBuf,
        backup_enabled: bool,
        backup_dir: PathBuf,
    },
    BackupSkipped,
    /// Target was absent or empty - nothing to preserve.
    BackupEmpty,
    BackupCreated {
        archive: String,
        entries: usize,
    },
    /// Non-fatal by design: the run continues without a backup.
    BackupFailed {
        message: String,
    },
    TargetCleared {
        warnings: Vec<String>,
    },
    Extracted {
        entries: usize,
    },
}

/// Accumulated context, threaded through every transition so the
/// terminal report never has to guess what already happened.
#[derive(Debug, Default)]
struct RunContext {
    stage: Option<Stage>,
    target_dir: String,
    archive: Option<ArtifactPackage>,
    target_path: Option<PathBuf>,
    backup: Option<BackupRecord>,
    warnings: Vec<String>,
}

impl RunContext {
    fn completed(&self) -> Stage {
        self.stage.unwrap_or(Stage::Init)
    }

    fn manual_fallback(&self, config: &DeploymentConfig) -> Option<ManualFallback> {
        self.archive.as_ref().map(|archive| ManualFallback {
            archive_name: archive.file_name(),
            share_path: config.unc_path(),
            target_dir: self.target_dir.clone(),
        })
    }
}

/// Everything the operator needs to finish a failed run by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualFallback {
    pub archive_name: String,
    pub share_path: String,
    pub target_dir: String,
}

/// Final report of a successful run.
#[derive(Debug)]
pub struct SuccessReport {
    pub archive: ArtifactPackage,
    pub target_path: PathBuf,
    pub server: String,
    pub backup: Option<BackupRecord>,
    pub warnings: Vec<String>,
}

/// Final report of a failed run.
#[derive(Debug)]
pub struct FailureReport {
    /// Last stage that completed before the error
    pub stage: Stage,
    pub error: DeployError,
    pub warnings: Vec<String>,
    /// Present once an archive exists to deploy by hand
    pub manual: Option<ManualFallback>,
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum Outcome {
    Succeeded(SuccessReport),
    /// Planned step list; nothing was executed.
    DryRun(Vec<String>),
    Cancelled,
    Failed(Box<FailureReport>),
}

/// The deployment state machine.
pub struct DeployPipeline<'a, C, R, P> {
    config: &'a DeploymentConfig,
    options: DeployOptions,
    /// Project root: validation marker, build output probe, and the
    /// archive all live here.
    project_root: PathBuf,
    connector: &'a C,
    runner: &'a R,
    prompt: &'a P,
    interrupted: Arc<AtomicBool>,
}

impl<'a, C, R, P> DeployPipeline<'a, C, R, P>
where
    C: Connector,
    R: CommandRunner,
    P: Prompt,
{
    pub fn new(
        config: &'a DeploymentConfig,
        options: DeployOptions,
        project_root: impl Into<PathBuf>,
        connector: &'a C,
        runner: &'a R,
        prompt: &'a P,
    ) -> Self {
        Self {
            config,
            options,
            project_root: project_root.into(),
            connector,
            runner,
            prompt,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an interrupt flag (set from a Ctrl-C handler). The flag
    /// is checked at stage boundaries; once set, the run unwinds
    /// through cleanup as a cancellation.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    fn resolved_target_dir(&self) -> String {
        self.options
            .target
            .resolve_pattern(&self.config.target_dir_pattern)
    }

    /// Ordered step list a real run would execute. Performs zero side
    /// effects: no filesystem access, no process spawns.
    pub fn plan(&self) -> Vec<String> {
        let target = &self.options.target;
        vec![
            if self.options.no_build {
                "Skip ng build (use existing output)".to_string()
            } else {
                "Run ng build".to_string()
            },
            format!(
                "Create archive {}_{}_build_<TIMESTAMP>.zip",
                target.site_name, target.app_name
            ),
            format!("Connect to {}", self.config.unc_path()),
            if self.options.no_backup {
                "Skip backup".to_string()
            } else {
                format!("Create backup under {BACKUP_ROOT}/{}", target.site_name)
            },
            format!("Deploy to {}", self.resolved_target_dir()),
        ]
    }

    /// Run the deployment to a terminal state.
    pub fn run(&self) -> Outcome {
        self.run_with_callback(|_| {})
    }

    /// Run with a progress callback for UI rendering.
    pub fn run_with_callback<F>(&self, mut emit: F) -> Outcome
    where
        F: FnMut(PipelineEvent),
    {
        if self.options.dry_run {
            return Outcome::DryRun(self.plan());
        }

        let mut ctx = RunContext {
            target_dir: self.resolved_target_dir(),
            ..RunContext::default()
        };
        let mut access: Option<ShareAccess> = None;

        let result = self.execute(&mut ctx, &mut access, &mut emit);

        // The one guaranteed release point. Runs on success, failure
        // and cancellation alike; failures inside are swallowed by the
        // connector so they cannot replace the run's outcome.
        if let Some(access) = access.take() {
            self.connector.disconnect(&access);
        }

        match result {
            Ok(()) => Outcome::Succeeded(SuccessReport {
                archive: ctx.archive.expect("deployed without an archive"),
                target_path: ctx.target_path.expect("deployed without a target path"),
                server: self.config.remote_server.clone(),
                backup: ctx.backup,
                warnings: ctx.warnings,
            }),
            Err(DeployError::Cancelled) => Outcome::Cancelled,
            Err(error) => Outcome::Failed(Box::new(FailureReport {
                stage: ctx.completed(),
                manual: ctx.manual_fallback(self.config),
                warnings: std::mem::take(&mut ctx.warnings),
                error,
            })),
        }
    }

    fn execute<F>(
        &self,
        ctx: &mut RunContext,
        access_slot: &mut Option<ShareAccess>,
        emit: &mut F,
    ) -> DeployResult<()>
    where
        F: FnMut(PipelineEvent),
    {
        self.check_interrupted()?;

        // Init -> Validated
        if !self.project_root.join("angular.json").exists() {
            return Err(DeployError::NotAProject);
        }
        ctx.stage = Some(Stage::Validated);
        emit(PipelineEvent::ProjectValidated);

        // Validated -> Packaged
        if self.options.no_build {
            emit(PipelineEvent::BuildSkipped);
        } else {
            emit(PipelineEvent::BuildStarted);
            self.run_build()?;
            emit(PipelineEvent::BuildSucceeded);
        }

        let build_folder =
            find_build_folder(&self.project_root, self.options.build_folder.as_deref())?;
        let package = Packager::new(&self.project_root).package(&build_folder, &self.options.target)?;
        emit(PipelineEvent::Packaged {
            archive: package.file_name(),
            entries: package.entry_count,
        });
        ctx.archive = Some(package);
        ctx.stage = Some(Stage::Packaged);

        self.check_interrupted()?;

        // Packaged -> Connected
        emit(PipelineEvent::Probing {
            server: self.config.remote_server.clone(),
        });
        self.connector.probe()?;
        let access = self.connector.connect()?;
        emit(PipelineEvent::Connected {
            root: access.root().to_path_buf(),
            drive: access.drive_letter(),
        });

        let target_path = access.root().join(&ctx.target_dir);
        let backup_dir = access
            .root()
            .join(BACKUP_ROOT)
            .join(&self.options.target.site_name);
        ctx.target_path = Some(target_path.clone());
        *access_slot = Some(access);
        ctx.stage = Some(Stage::Connected);

        // Connected -> Confirmed
        emit(PipelineEvent::AwaitingConfirmation {
            target_path: target_path.clone(),
            backup_enabled: !self.options.no_backup,
            backup_dir: backup_dir.clone(),
        });
        if !self.options.assume_yes {
            let confirmed = self.prompt.confirm("Continue with deployment?")?;
            if !confirmed {
                return Err(DeployError::Cancelled);
            }
        }
        ctx.stage = Some(Stage::Confirmed);

        self.check_interrupted()?;

        // Confirmed -> BackedUp. Backup failures degrade to warnings:
        // an unavailable backup must not block the deployment.
        if self.options.no_backup {
            emit(PipelineEvent::BackupSkipped);
        } else {
            match backup(&target_path, &backup_dir, &self.options.target) {
                Ok(Some(record)) => {
                    emit(PipelineEvent::BackupCreated {
                        archive: record
                            .archive_path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        entries: record.entry_count,
                    });
                    ctx.backup = Some(record);
                }
                Ok(None) => emit(PipelineEvent::BackupEmpty),
                Err(e) => {
                    let message = e.to_string();
                    ctx.warnings.push(message.clone());
                    emit(PipelineEvent::BackupFailed { message });
                }
            }
        }
        ctx.stage = Some(Stage::BackedUp);

        // BackedUp -> Cleared
        let clear_warnings = clear_target(&target_path)?;
        emit(PipelineEvent::TargetCleared {
            warnings: clear_warnings.clone(),
        });
        ctx.warnings.extend(clear_warnings);
        ctx.stage = Some(Stage::Cleared);

        // Cleared -> Deployed
        let archive_path = ctx
            .archive
            .as_ref()
            .expect("packaged stage sets the archive")
            .archive_path
            .clone();
        let entries = deploy_archive(&archive_path, &target_path)?;
        emit(PipelineEvent::Extracted { entries });
        ctx.stage = Some(Stage::Deployed);

        Ok(())
    }

    fn run_build(&self) -> DeployResult<()> {
        let output = self.runner.run("ng", &["build"]).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                DeployError::Build {
                    message: "Angular CLI (ng) not found - install @angular/cli".to_string(),
                    diagnostics: String::new(),
                }
            } else {
                DeployError::Build {
                    message: e.to_string(),
                    diagnostics: String::new(),
                }
            }
        })?;

        if !output.success {
            let diagnostics = if output.stderr.is_empty() {
                output.stdout
            } else {
                output.stderr
            };
            return Err(DeployError::Build {
                message: "build exited with an error".to_string(),
                diagnostics,
            });
        }
        Ok(())
    }

    fn check_interrupted(&self) -> DeployResult<()> {
        if self.interrupted.load(Ordering::SeqCst) {
            Err(DeployError::Cancelled)
        } else {
            Ok(())
        }
    }
}
