use std::process::ExitCode;

use infra::config::PASSTHROUGH;
use infra::runner::{STDERR_TAIL, stderr_tail};
use infra::{Stage, StageRegistry, StageRunner, TryRunOutcome};

use crate::errors::*;

pub fn passthrough_from_env() -> Vec<(String, String)> {
    PASSTHROUGH
        .iter()
        .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v)))
        .collect()
}

fn exit_code(outcome: &TryRunOutcome) -> u8 {
    match outcome {
        TryRunOutcome::Success => 0,
        TryRunOutcome::Failure { .. } => 1,
        TryRunOutcome::Crash { .. } => 2,
    }
}

fn describe(stage: &Stage, outcome: &TryRunOutcome) -> String {
    match outcome {
        TryRunOutcome::Success => format!("{}: ok", stage.name),
        TryRunOutcome::Failure { code, .. } => {
            format!("{}: failed with exit code {code}", stage.name)
        }
        TryRunOutcome::Crash { signal, .. } => {
            format!("{}: crashed with signal {signal}", stage.name)
        }
    }
}

fn print_stderr(outcome: &TryRunOutcome) {
    if let TryRunOutcome::Failure { stderr, .. } | TryRunOutcome::Crash { stderr, .. } = outcome {
        if !stderr.is_empty() {
            eprintln!("{}", stderr_tail(stderr, STDERR_TAIL));
        }
    }
}

/// Exit code 0 on success, 1 on failure, 2 on crash.
pub fn handle_run(runner: &StageRunner, stage: &Stage) -> CliResult<ExitCode> {
    let outcome = runner.run(stage)?;
    print_stderr(&outcome);
    println!("{}", describe(stage, &outcome));
    Ok(ExitCode::from(exit_code(&outcome)))
}

/// Stages in pipeline order until the first that does not pass.
pub fn bisect(
    runner: &StageRunner,
    registry: &StageRegistry,
) -> CliResult<Option<(&'static Stage, TryRunOutcome)>> {
    for stage in registry.stages() {
        let outcome = runner.run(stage)?;
        println!("{}", describe(stage, &outcome));
        if !outcome.is_success() {
            return Ok(Some((stage, outcome)));
        }
    }
    Ok(None)
}

pub fn handle_bisect(runner: &StageRunner, registry: &StageRegistry) -> CliResult<ExitCode> {
    match bisect(runner, registry)? {
        None => {
            println!("All stages pass");
            Ok(ExitCode::SUCCESS)
        }
        Some((stage, outcome)) => {
            print_stderr(&outcome);
            match registry.previous(stage) {
                Some(previous) => {
                    println!("First failing stage: {} (after {})", stage.name, previous.name)
                }
                None => println!("First failing stage: {}", stage.name),
            }
            Ok(ExitCode::from(exit_code(&outcome)))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    static STAGES: &[Stage] = &[
        Stage { name: "one", env_vars: &[("LEVEL", "1")] },
        Stage { name: "two", env_vars: &[("LEVEL", "2")] },
        Stage { name: "three", env_vars: &[("LEVEL", "3")] },
    ];

    #[test]
    fn bisect_finds_first_failure() -> CliResult<()> {
        let runner = StageRunner::new("/bin/sh", ["-c", r#"test "$LEVEL" -lt 2"#]);
        let (stage, outcome) = bisect(&runner, &StageRegistry::new(STAGES))?.context("no failure")?;
        assert_eq!(stage.name, "two");
        assert_eq!(outcome, TryRunOutcome::Failure { code: 1, stderr: String::new() });
        Ok(())
    }

    #[test]
    fn bisect_all_pass() -> CliResult<()> {
        let runner = StageRunner::new("/bin/sh", ["-c", "exit 0"]);
        assert!(bisect(&runner, &StageRegistry::new(STAGES))?.is_none());
        Ok(())
    }

    #[test]
    fn crash_exit_code() {
        let crash = TryRunOutcome::Crash { signal: 11, stderr: "boom".into() };
        assert_eq!(exit_code(&crash), 2);
        assert_eq!(describe(&STAGES[0], &crash), "one: crashed with signal 11");
    }
}
