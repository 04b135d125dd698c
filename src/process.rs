//! External command execution
//!
//! Every external tool (ng, ping, net) runs through the `CommandRunner`
//! port so the pipeline and connector can be tested without spawning
//! processes.

use std::io;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Captured result of an external command.
///
/// Deliberately not `std::process::Output`: test doubles need to build
/// these without an `ExitStatus` in hand.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Blocking command execution.
///
/// The production implementation shells out; test doubles return canned
/// results and record invocations.
pub trait CommandRunner {
    /// Run a command to completion with no deadline.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CmdOutput>;

    /// Run a command, killing it if it outlives `deadline`.
    ///
    /// Returns `ErrorKind::TimedOut` on expiry. Used only for the
    /// reachability probe - everything else blocks indefinitely.
    fn run_with_deadline(
        &self,
        program: &str,
        args: &[&str],
        deadline: Duration,
    ) -> io::Result<CmdOutput>;
}

/// Production `CommandRunner` backed by `std::process::Command`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CmdOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CmdOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_with_deadline(
        &self,
        program: &str,
        args: &[&str],
        deadline: Duration,
    ) -> io::Result<CmdOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Poll instead of wait() so the deadline can fire. The probe
        // output is far below the pipe buffer size, so the child never
        // blocks on a full pipe while we poll.
        let started = Instant::now();
        loop {
            if child.try_wait()?.is_some() {
                let output = child.wait_with_output()?;
                return Ok(CmdOutput {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
            if started.elapsed() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{program} timed out after {}s", deadline.as_secs()),
                ));
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

/// Scripted command runner for tests.
///
/// Responses are keyed by program name; unknown programs succeed with
/// empty output. Every invocation is recorded.
#[cfg(test)]
pub struct MockRunner {
    responses: std::sync::Mutex<std::collections::HashMap<String, CmdOutput>>,
    failures: std::sync::Mutex<std::collections::HashMap<String, io::ErrorKind>>,
    invocations: std::sync::Mutex<Vec<(String, Vec<String>)>>,
}

#[cfg(test)]
impl MockRunner {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::HashMap::new()),
            failures: std::sync::Mutex::new(std::collections::HashMap::new()),
            invocations: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Canned output for `program`.
    pub fn respond(self, program: &str, output: CmdOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(program.to_string(), output);
        self
    }

    /// Make `program` fail to spawn with `kind`.
    pub fn fail_spawn(self, program: &str, kind: io::ErrorKind) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(program.to_string(), kind);
        self
    }

    pub fn invocations(&self) -> Vec<(String, Vec<String>)> {
        self.invocations.lock().unwrap().clone()
    }

    /// Recorded invocations of `program` only.
    pub fn invocations_of(&self, program: &str) -> Vec<Vec<String>> {
        self.invocations()
            .into_iter()
            .filter(|(p, _)| p == program)
            .map(|(_, args)| args)
            .collect()
    }

    fn dispatch(&self, program: &str, args: &[&str]) -> io::Result<CmdOutput> {
        self.invocations.lock().unwrap().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        if let Some(kind) = self.failures.lock().unwrap().get(program) {
            return Err(io::Error::new(*kind, format!("{program}: scripted failure")));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(program)
            .cloned()
            .unwrap_or_else(|| CmdOutput::ok("")))
    }
}

#[cfg(test)]
impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CmdOutput> {
        self.dispatch(program, args)
    }

    fn run_with_deadline(
        &self,
        program: &str,
        args: &[&str],
        _deadline: Duration,
    ) -> io::Result<CmdOutput> {
        self.dispatch(program, args)
    }
}
