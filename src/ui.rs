//! Terminal output and interactive prompts
//!
//! Rendering functions return `String`s so they can be snapshot-tested;
//! callers decide when to print. Prompts go through the `Prompt` port
//! so the pipeline can be driven without a terminal.

use std::io;
use std::path::Path;

use dialoguer::{Confirm, Input, Password};
use is_terminal::IsTerminal;

use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};
use crate::models::DeploymentTarget;

/// Interactive input port.
pub trait Prompt {
    /// Yes/no question; the default answer is "no".
    fn confirm(&self, message: &str) -> DeployResult<bool>;

    /// Free-text input (site name, username).
    fn input(&self, message: &str) -> DeployResult<String>;

    /// Hidden input (password).
    fn password(&self, message: &str) -> DeployResult<String>;
}

/// Production prompt backed by dialoguer.
///
/// Off a TTY, `confirm` answers "no" (a non-interactive run without
/// `--yes` cancels instead of hanging) and text prompts fail with a
/// clear error.
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn require_tty(&self, message: &str) -> DeployResult<()> {
        if io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(DeployError::Io(io::Error::other(format!(
                "cannot prompt for '{message}': stdin is not a terminal"
            ))))
        }
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> DeployResult<bool> {
        if !io::stdin().is_terminal() {
            return Ok(false);
        }
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|e| DeployError::Io(io::Error::other(e)))
    }

    fn input(&self, message: &str) -> DeployResult<String> {
        self.require_tty(message)?;
        Input::<String>::new()
            .with_prompt(message)
            .interact_text()
            .map_err(|e| DeployError::Io(io::Error::other(e)))
    }

    fn password(&self, message: &str) -> DeployResult<String> {
        self.require_tty(message)?;
        Password::new()
            .with_prompt(message)
            .interact()
            .map_err(|e| DeployError::Io(io::Error::other(e)))
    }
}

/// Scripted prompt for tests.
#[cfg(test)]
pub struct MockPrompt {
    pub confirm_answer: bool,
    pub input_answer: String,
    pub password_answer: String,
    pub prompts_seen: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockPrompt {
    pub fn answering(confirm: bool) -> Self {
        Self {
            confirm_answer: confirm,
            input_answer: "deployer".to_string(),
            password_answer: "hunter2".to_string(),
            prompts_seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn record(&self, message: &str) {
        self.prompts_seen.lock().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
impl Prompt for MockPrompt {
    fn confirm(&self, message: &str) -> DeployResult<bool> {
        self.record(message);
        Ok(self.confirm_answer)
    }

    fn input(&self, message: &str) -> DeployResult<String> {
        self.record(message);
        Ok(self.input_answer.clone())
    }

    fn password(&self, message: &str) -> DeployResult<String> {
        self.record(message);
        Ok(self.password_answer.clone())
    }
}

const BANNER: &str = "==========================================";

/// Startup header.
pub fn render_header() -> String {
    format!("{BANNER}\n    netdeploy - build and ship to IIS\n{BANNER}\n")
}

/// Deployment summary shown before the confirmation prompt.
pub fn render_deployment_info(
    target: &DeploymentTarget,
    config: &DeploymentConfig,
    target_path: &Path,
    backup_enabled: bool,
    backup_dir: &Path,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Site name:      {}\n", target.site_name));
    out.push_str(&format!("App name:       {}\n", target.app_name));
    out.push_str(&format!("Remote server:  {}\n", config.remote_server));
    out.push_str(&format!("Target path:    {}\n", target_path.display()));
    out.push_str(&format!(
        "Backup:         {}\n",
        if backup_enabled { "enabled" } else { "disabled" }
    ));
    if backup_enabled {
        out.push_str(&format!("Backup dir:     {}\n", backup_dir.display()));
    }
    out
}

/// Final report for a successful run.
pub fn render_success(archive_name: &str, target_path: &Path, server: &str) -> String {
    format!(
        "\n{BANNER}\n    DEPLOYMENT COMPLETED\n{BANNER}\n\
         \u{2713} Local build:     {archive_name}\n\
         \u{2713} Remote location: {}\n\
         \u{2713} Server:          {server}\n",
        target_path.display()
    )
}

/// Manual recovery block rendered on any failure after packaging.
///
/// The archive survives a failed run precisely so the operator can
/// finish the job by hand with these steps.
pub fn render_manual_instructions(archive_name: &str, share_path: &str, target_dir: &str) -> String {
    format!(
        "\n{BANNER}\n    MANUAL DEPLOYMENT REQUIRED\n{BANNER}\n\
         Automatic deployment failed. To finish by hand:\n\
         \n\
         1. Copy '{archive_name}' to {share_path}\n\
         2. Connect to the server via RDP or the network share\n\
         3. Extract the archive into the target directory\n\
         \n\
         Network path:     {share_path}\n\
         Target directory: {target_dir}\n"
    )
}

/// Ordered step list for `--dry-run`.
pub fn render_dry_run_plan(steps: &[String]) -> String {
    let mut out = String::from("[dry run] would perform the following steps:\n");
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("  {}. {step}\n", i + 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_the_tool() {
        assert!(render_header().contains("netdeploy"));
    }

    #[test]
    fn info_block_masks_nothing_but_password_is_never_shown() {
        let target = DeploymentTarget::new("akbl", "mobile").unwrap();
        let config = DeploymentConfig::default();
        let rendered = render_deployment_info(
            &target,
            &config,
            Path::new("Z:\\IISDeployments\\akbl\\mobile"),
            true,
            Path::new("Z:\\IISDeployments\\akbl"),
        );
        assert!(rendered.contains("akbl"));
        assert!(rendered.contains("Backup:         enabled"));
        assert!(!rendered.contains("password"));
    }

    #[test]
    fn manual_instructions_block() {
        let rendered = render_manual_instructions(
            "akbl_mobile_build_20260807_143005.zip",
            "\\\\172.20.3.119\\e$",
            "IISDeployments/akbl/mobile",
        );
        insta::assert_snapshot!(rendered.trim(), @r"
        ==========================================
            MANUAL DEPLOYMENT REQUIRED
        ==========================================
        Automatic deployment failed. To finish by hand:

        1. Copy 'akbl_mobile_build_20260807_143005.zip' to \\172.20.3.119\e$
        2. Connect to the server via RDP or the network share
        3. Extract the archive into the target directory

        Network path:     \\172.20.3.119\e$
        Target directory: IISDeployments/akbl/mobile");
    }

    #[test]
    fn dry_run_plan_is_numbered() {
        let steps = vec![
            "Run ng build".to_string(),
            "Create archive akbl_mobile_build_<TIMESTAMP>.zip".to_string(),
            "Connect to \\\\172.20.3.119\\e$".to_string(),
            "Create backup under IISDeployments/akbl".to_string(),
            "Deploy to IISDeployments/akbl/mobile".to_string(),
        ];
        insta::assert_snapshot!(render_dry_run_plan(&steps).trim_end(), @r"
        [dry run] would perform the following steps:
          1. Run ng build
          2. Create archive akbl_mobile_build_<TIMESTAMP>.zip
          3. Connect to \\172.20.3.119\e$
          4. Create backup under IISDeployments/akbl
          5. Deploy to IISDeployments/akbl/mobile");
    }
}
