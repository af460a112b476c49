#![cfg(unix)]
use std::process::{Command, Output};

use infra::config::{ENABLE_DIFF, PASSTHROUGH, STAGE_NAME, TRY_RUN};
use infra::harness::TRY_RUN_SENTINEL;

fn run(program: &str, vars: &[(&str, &str)]) -> Output {
    let mut command = Command::new(program);
    command.env_clear();
    for var in PASSTHROUGH {
        if let Ok(value) = std::env::var(var) {
            command.env(var, value);
        }
    }
    command.envs(vars.iter().copied());
    command.output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn aborting_case_is_reported_by_the_parent() {
    let vars = [(STAGE_NAME, "backend"), (TRY_RUN, "1")];
    let output = run(env!("CARGO_BIN_EXE_aborting-suite"), &vars);
    let out = stdout(&output);
    assert_eq!(output.status.code(), Some(101), "{:?}\n{out}", output.status);
    assert!(out.contains(&format!("test {TRY_RUN_SENTINEL} ... FAILED")), "{out}");
    assert!(out.contains("aborting from the case"), "{out}");
    assert!(out.contains("test abort ... skipped (try-run of stage `backend` crashed)"), "{out}");
    assert!(out.contains("test pass ... skipped"), "{out}");
}

#[test]
fn corpus_reruns_itself_once() {
    let vars = [(STAGE_NAME, "backend"), (ENABLE_DIFF, "1"), (TRY_RUN, "1")];
    let output = run(env!("CARGO_BIN_EXE_stages-corpus"), &vars);
    let out = stdout(&output);
    assert!(output.status.success(), "{:?}\n{out}", output.status);
    assert!(out.contains(&format!("test {TRY_RUN_SENTINEL} ... ok")), "{out}");
    assert_eq!(out.matches("running ").count(), 1, "{out}");
    assert!(out.contains("test activation::sigmoid_f32 ... ok"), "{out}");
    assert!(!out.contains("skipped"), "{out}");
}

#[test]
fn corpus_diff_mode_alone_has_no_sentinel() {
    let vars = [(STAGE_NAME, "frontend"), (ENABLE_DIFF, "1")];
    let output = run(env!("CARGO_BIN_EXE_stages-corpus"), &vars);
    let out = stdout(&output);
    assert!(output.status.success(), "{:?}\n{out}", output.status);
    assert!(!out.contains(TRY_RUN_SENTINEL), "{out}");
    assert_eq!(out.matches("running ").count(), 1, "{out}");
}
