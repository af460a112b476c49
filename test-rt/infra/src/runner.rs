//! Re-running a test binary under another stage.
use std::ffi::OsString;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};

use crate::config::{ENABLE_DIFF, HarnessConfig, STAGE_NAME, TRY_RUN};
use crate::stage::Stage;

/// How much of a child stderr is kept when it is reported.
pub const STDERR_TAIL: usize = 65536;

/// Result of running a program under a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryRunOutcome {
    Success,
    Failure { code: i32, stderr: String },
    Crash { signal: i32, stderr: String },
}

impl TryRunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TryRunOutcome::Success)
    }

    pub fn from_status(status: ExitStatus, stderr: String) -> TryRunOutcome {
        match status.code() {
            Some(0) => TryRunOutcome::Success,
            Some(code) if code > 0 => TryRunOutcome::Failure { code, stderr },
            Some(code) => TryRunOutcome::Crash { signal: -code, stderr },
            None => TryRunOutcome::Crash { signal: exit_signal(&status).unwrap_or(0), stderr },
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Last `limit` characters of `s`.
pub fn stderr_tail(s: &str, limit: usize) -> &str {
    match s.char_indices().rev().nth(limit.saturating_sub(1)) {
        Some((ix, _)) if limit > 0 => &s[ix..],
        _ if limit == 0 => "",
        _ => s,
    }
}

/// Spawns a program with exactly the environment of a stage.
#[derive(Debug, Clone)]
pub struct StageRunner {
    program: OsString,
    args: Vec<OsString>,
    passthrough: Vec<(String, String)>,
}

impl StageRunner {
    pub fn new(
        program: impl Into<OsString>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> StageRunner {
        StageRunner {
            program: program.into(),
            args: args.into_iter().map(|a| a.into()).collect(),
            passthrough: vec![],
        }
    }

    /// Re-run the current executable with its own arguments.
    pub fn for_current_process(config: &HarnessConfig) -> Result<StageRunner> {
        let program = std::env::current_exe().context("Locating current executable")?;
        Ok(StageRunner::new(program, std::env::args_os().skip(1))
            .with_passthrough(config.passthrough.clone()))
    }

    pub fn with_passthrough(self, passthrough: Vec<(String, String)>) -> StageRunner {
        StageRunner { passthrough, ..self }
    }

    pub fn command(&self, stage: &Stage) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .env(STAGE_NAME, stage.name)
            .env(ENABLE_DIFF, "0")
            .env(TRY_RUN, "0")
            .envs(stage.env_vars.iter().copied())
            .envs(self.passthrough.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());
        cmd
    }

    /// Run to completion and classify the exit status. A crashing child is
    /// an outcome, not an error; failing to spawn is an error.
    pub fn run(&self, stage: &Stage) -> Result<TryRunOutcome> {
        let mut cmd = self.command(stage);
        log::info!("Try-running stage {} with {:?}", stage.name, cmd);
        let output = cmd.output().with_context(|| format!("Spawning {:?}", self.program))?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let outcome = TryRunOutcome::from_status(output.status, stderr);
        log::info!("Stage {} exited with {:?}", stage.name, output.status);
        Ok(outcome)
    }
}
