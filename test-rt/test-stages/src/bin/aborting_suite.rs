//! A suite whose only real case takes the whole process down.
use std::process::ExitCode;

use infra::{HarnessConfig, Test, TestResult, TestSuite};

const ABORT_MARKER: &str = "aborting from the case";

#[derive(Clone)]
struct Abort;

impl Test for Abort {
    fn run(&self, _config: &HarnessConfig) -> TestResult {
        eprintln!("{ABORT_MARKER}");
        std::process::abort()
    }
}

#[derive(Clone)]
struct Pass;

impl Test for Pass {
    fn run(&self, _config: &HarnessConfig) -> TestResult {
        Ok(())
    }
}

fn suite() -> anyhow::Result<TestSuite> {
    let mut suite = TestSuite::default();
    suite.add("abort", Abort)?;
    suite.add("pass", Pass)?;
    Ok(suite)
}

fn main() -> ExitCode {
    match suite() {
        Ok(suite) => infra::main(suite),
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::from(101)
        }
    }
}
