//! Remote share access
//!
//! Establishes access to `\\server\share`, preferring anonymous UNC
//! access and falling back to an authenticated drive mapping via
//! `net use`. The mapping is the only allocated resource in a run and
//! is released exactly once by the pipeline's cleanup path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};
use crate::process::CommandRunner;
use crate::ui::Prompt;

/// Deadline for the reachability probe. Everything else blocks until
/// the OS completes it.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// An active handle to the remote share.
///
/// `DirectPath` carries no allocated resource; `MappedDrive` owns a
/// drive letter that must be released on every exit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareAccess {
    DirectPath { root: PathBuf },
    MappedDrive { drive: char, root: PathBuf },
}

impl ShareAccess {
    /// Root under which remote paths are resolved.
    pub fn root(&self) -> &Path {
        match self {
            ShareAccess::DirectPath { root } => root,
            ShareAccess::MappedDrive { root, .. } => root,
        }
    }

    /// Allocated drive letter, if any.
    pub fn drive_letter(&self) -> Option<char> {
        match self {
            ShareAccess::DirectPath { .. } => None,
            ShareAccess::MappedDrive { drive, .. } => Some(*drive),
        }
    }
}

/// Filesystem probes used by the connector.
///
/// Separated out so connector tests run without a reachable share or
/// real drive letters.
pub trait ShareFs {
    /// Can the directory be listed without credentials?
    fn can_list(&self, path: &Path) -> bool;

    /// Is this drive letter already taken?
    fn drive_in_use(&self, letter: char) -> bool;
}

/// Production `ShareFs` backed by std::fs.
pub struct SystemShareFs;

impl ShareFs for SystemShareFs {
    fn can_list(&self, path: &Path) -> bool {
        std::fs::read_dir(path).is_ok()
    }

    fn drive_in_use(&self, letter: char) -> bool {
        Path::new(&format!("{letter}:\\")).exists()
    }
}

/// Share connection lifecycle, as the pipeline sees it.
pub trait Connector {
    /// One bounded reachability check against the server.
    fn probe(&self) -> DeployResult<()>;

    /// Establish access; called exactly once per run.
    fn connect(&self) -> DeployResult<ShareAccess>;

    /// Best-effort release. Runs inside cleanup, so failures are
    /// swallowed - they must never mask the run's primary result.
    fn disconnect(&self, access: &ShareAccess);
}

/// Production connector: ping probe, anonymous UNC listing, `net use`
/// fallback with reverse-alphabetical drive allocation.
pub struct NetworkConnector<'a, R, F, P> {
    config: &'a DeploymentConfig,
    runner: &'a R,
    share_fs: &'a F,
    prompt: &'a P,
    verbose: bool,
}

impl<'a, R, F, P> NetworkConnector<'a, R, F, P>
where
    R: CommandRunner,
    F: ShareFs,
    P: Prompt,
{
    pub fn new(
        config: &'a DeploymentConfig,
        runner: &'a R,
        share_fs: &'a F,
        prompt: &'a P,
        verbose: bool,
    ) -> Self {
        Self {
            config,
            runner,
            share_fs,
            prompt,
            verbose,
        }
    }

    fn resolve_credentials(&self) -> DeployResult<(String, String)> {
        let username = if self.config.username.is_empty() {
            self.prompt
                .input(&format!("Username for {}", self.config.remote_server))?
        } else {
            self.config.username.clone()
        };
        let password = if self.config.password.is_empty() {
            self.prompt.password("Password")?
        } else {
            self.config.password.clone()
        };
        Ok((username, password))
    }

    fn find_available_drive(&self) -> DeployResult<char> {
        ('A'..='Z')
            .rev()
            .find(|letter| !self.share_fs.drive_in_use(*letter))
            .ok_or_else(|| DeployError::Authentication("no available drive letters".to_string()))
    }

    fn map_drive(&self) -> DeployResult<ShareAccess> {
        let (username, password) = self.resolve_credentials()?;
        let drive = self.find_available_drive()?;
        let unc = self.config.unc_path();

        let drive_arg = format!("{drive}:");
        let user_arg = format!("/user:{username}");
        let output = self
            .runner
            .run("net", &["use", &drive_arg, &unc, &password, &user_arg])
            .map_err(|e| DeployError::Authentication(e.to_string()))?;

        if !output.success {
            return Err(DeployError::Authentication(
                "share mapping was refused - check credentials".to_string(),
            ));
        }

        Ok(ShareAccess::MappedDrive {
            drive,
            root: PathBuf::from(format!("{drive}:\\")),
        })
    }
}

impl<R, F, P> Connector for NetworkConnector<'_, R, F, P>
where
    R: CommandRunner,
    F: ShareFs,
    P: Prompt,
{
    fn probe(&self) -> DeployResult<()> {
        let server = &self.config.remote_server;
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };

        let unreachable = |reason: String| DeployError::Unreachable {
            server: server.clone(),
            reason,
        };

        let output = self
            .runner
            .run_with_deadline("ping", &[count_flag, "1", server], PROBE_TIMEOUT)
            .map_err(|e| unreachable(e.to_string()))?;

        if !output.success {
            return Err(unreachable("no echo reply".to_string()));
        }
        Ok(())
    }

    fn connect(&self) -> DeployResult<ShareAccess> {
        let unc = PathBuf::from(self.config.unc_path());
        if self.share_fs.can_list(&unc) {
            return Ok(ShareAccess::DirectPath { root: unc });
        }
        self.map_drive()
    }

    fn disconnect(&self, access: &ShareAccess) {
        let Some(drive) = access.drive_letter() else {
            return;
        };
        let drive_arg = format!("{drive}:");
        match self.runner.run("net", &["use", &drive_arg, "/delete"]) {
            Ok(output) if output.success => {}
            Ok(_) | Err(_) => {
                if self.verbose {
                    eprintln!("Warning: failed to release drive {drive}:");
                }
            }
        }
    }
}

#[cfg(test)]
pub struct MockShareFs {
    pub anonymous_listing: bool,
    pub drives_in_use: Vec<char>,
}

#[cfg(test)]
impl ShareFs for MockShareFs {
    fn can_list(&self, _path: &Path) -> bool {
        self.anonymous_listing
    }

    fn drive_in_use(&self, letter: char) -> bool {
        self.drives_in_use.contains(&letter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CmdOutput, MockRunner};
    use crate::ui::MockPrompt;
    use std::io;

    fn config() -> DeploymentConfig {
        DeploymentConfig::default()
    }

    fn config_with_credentials() -> DeploymentConfig {
        DeploymentConfig {
            username: "svc-deploy".to_string(),
            password: "s3cret".to_string(),
            ..DeploymentConfig::default()
        }
    }

    #[test]
    fn probe_succeeds_on_echo_reply() {
        let cfg = config();
        let runner = MockRunner::new().respond("ping", CmdOutput::ok("1 packets received"));
        let fs = MockShareFs {
            anonymous_listing: true,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        connector.probe().unwrap();
        assert_eq!(runner.invocations_of("ping").len(), 1);
    }

    #[test]
    fn probe_failure_is_unreachable() {
        let cfg = config();
        let runner = MockRunner::new().respond("ping", CmdOutput::failed("host unreachable"));
        let fs = MockShareFs {
            anonymous_listing: true,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        assert!(matches!(
            connector.probe(),
            Err(DeployError::Unreachable { .. })
        ));
    }

    #[test]
    fn probe_timeout_is_unreachable() {
        let cfg = config();
        let runner = MockRunner::new().fail_spawn("ping", io::ErrorKind::TimedOut);
        let fs = MockShareFs {
            anonymous_listing: true,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        match connector.probe() {
            Err(DeployError::Unreachable { reason, .. }) => {
                assert!(reason.contains("scripted failure"));
            }
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_listing_returns_unc_unchanged() {
        let cfg = config();
        let runner = MockRunner::new();
        let fs = MockShareFs {
            anonymous_listing: true,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        let access = connector.connect().unwrap();
        assert_eq!(
            access,
            ShareAccess::DirectPath {
                root: PathBuf::from("\\\\172.20.3.119\\e$"),
            }
        );
        assert_eq!(access.drive_letter(), None);

        // Disconnect of an unmapped access never shells out.
        connector.disconnect(&access);
        assert!(runner.invocations_of("net").is_empty());
    }

    #[test]
    fn authenticated_fallback_maps_highest_free_drive() {
        let cfg = config_with_credentials();
        let runner = MockRunner::new().respond("net", CmdOutput::ok(""));
        let fs = MockShareFs {
            anonymous_listing: false,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        let access = connector.connect().unwrap();
        assert_eq!(access.drive_letter(), Some('Z'));
        assert_eq!(access.root(), Path::new("Z:\\"));

        let mounts = runner.invocations_of("net");
        assert_eq!(mounts.len(), 1);
        assert_eq!(
            mounts[0],
            vec![
                "use",
                "Z:",
                "\\\\172.20.3.119\\e$",
                "s3cret",
                "/user:svc-deploy"
            ]
        );
        // Config carried credentials, so nothing was prompted.
        assert!(prompt.prompts_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn drive_scan_skips_letters_in_use() {
        let cfg = config_with_credentials();
        let runner = MockRunner::new().respond("net", CmdOutput::ok(""));
        let fs = MockShareFs {
            anonymous_listing: false,
            drives_in_use: vec!['Z', 'Y'],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        let access = connector.connect().unwrap();
        assert_eq!(access.drive_letter(), Some('X'));
    }

    #[test]
    fn exhausted_drive_letters_is_authentication_error() {
        let cfg = config_with_credentials();
        let runner = MockRunner::new();
        let fs = MockShareFs {
            anonymous_listing: false,
            drives_in_use: ('A'..='Z').collect(),
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        assert!(matches!(
            connector.connect(),
            Err(DeployError::Authentication(_))
        ));
        assert!(runner.invocations_of("net").is_empty());
    }

    #[test]
    fn refused_mount_is_authentication_error() {
        let cfg = config_with_credentials();
        let runner = MockRunner::new().respond("net", CmdOutput::failed("System error 86"));
        let fs = MockShareFs {
            anonymous_listing: false,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        assert!(matches!(
            connector.connect(),
            Err(DeployError::Authentication(_))
        ));
    }

    #[test]
    fn missing_credentials_are_prompted() {
        let cfg = config();
        let runner = MockRunner::new().respond("net", CmdOutput::ok(""));
        let fs = MockShareFs {
            anonymous_listing: false,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        connector.connect().unwrap();

        let seen = prompt.prompts_seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("Username"));
        assert!(seen[1].contains("Password"));
    }

    #[test]
    fn disconnect_unmaps_exactly_the_allocated_drive() {
        let cfg = config_with_credentials();
        let runner = MockRunner::new().respond("net", CmdOutput::ok(""));
        let fs = MockShareFs {
            anonymous_listing: false,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        let access = connector.connect().unwrap();
        connector.disconnect(&access);

        let net_calls = runner.invocations_of("net");
        assert_eq!(net_calls.len(), 2);
        assert_eq!(net_calls[1], vec!["use", "Z:", "/delete"]);
    }

    #[test]
    fn disconnect_failure_is_swallowed() {
        let cfg = config();
        let runner = MockRunner::new().respond("net", CmdOutput::failed("network gone"));
        let fs = MockShareFs {
            anonymous_listing: false,
            drives_in_use: vec![],
        };
        let prompt = MockPrompt::answering(true);
        let connector = NetworkConnector::new(&cfg, &runner, &fs, &prompt, false);

        let access = ShareAccess::MappedDrive {
            drive: 'Z',
            root: PathBuf::from("Z:\\"),
        };
        // Must not panic or propagate.
        connector.disconnect(&access);
    }
}
