//! Driver for test binaries built with `harness = false`.
use std::fmt;
use std::io::{Write, stdout};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::process::ExitCode;

use anyhow::Result;
use itertools::Itertools;

use crate::config::HarnessConfig;
use crate::runner::{STDERR_TAIL, StageRunner, TryRunOutcome, stderr_tail};
use crate::stage::StageRegistry;
use crate::{TestSuite, setup_test_logger};

/// Id of the test reporting the outcome of the try-run pre-flight.
pub const TRY_RUN_SENTINEL: &str = "try_run::panic";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
    Ignored,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "ok"),
            Outcome::Failed(_) => write!(f, "FAILED"),
            Outcome::Skipped(why) => write!(f, "skipped ({why})"),
            Outcome::Ignored => write!(f, "ignored"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub stage: String,
    pub outcomes: Vec<(String, Outcome)>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(|(_, o)| o.is_failure())
    }

    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|(t, _)| t == id).map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Appends an outcome and writes its line right away.
    fn record(&mut self, out: &mut dyn Write, id: String, outcome: Outcome) -> Result<()> {
        writeln!(out, "test {id} ... {outcome}")?;
        out.flush()?;
        self.outcomes.push((id, outcome));
        Ok(())
    }
}

/// Failures and totals. Per-test lines are written by `Harness::run_to`
/// as the tests complete.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let failures = self
            .outcomes
            .iter()
            .filter_map(|(id, o)| if let Outcome::Failed(m) = o { Some((id, m)) } else { None })
            .collect_vec();
        if !failures.is_empty() {
            writeln!(f, "\nfailures:\n")?;
            for (id, message) in &failures {
                writeln!(f, "---- {id} ----\n{message}\n")?;
            }
            writeln!(f, "failures:")?;
            for (id, _) in &failures {
                writeln!(f, "    {id}")?;
            }
        }
        writeln!(
            f,
            "\ntest result: {}. {} passed; {} failed; {} skipped; {} ignored\n",
            if self.is_success() { "ok" } else { "FAILED" },
            self.count(|o| *o == Outcome::Passed),
            self.count(Outcome::is_failure),
            self.count(|o| matches!(o, Outcome::Skipped(_))),
            self.count(|o| *o == Outcome::Ignored),
        )
    }
}

pub struct Harness {
    pub config: HarnessConfig,
    pub registry: StageRegistry,
    pub runner: StageRunner,
    pub filter: Option<String>,
}

impl Harness {
    pub fn new(config: HarnessConfig, registry: StageRegistry, runner: StageRunner) -> Harness {
        Harness { config, registry, runner, filter: None }
    }

    /// Configuration from the environment, filter from the command line.
    /// The arguments are forwarded untouched to try-run children.
    pub fn from_env() -> Result<Harness> {
        let registry = StageRegistry::builtin();
        let config = HarnessConfig::from_env(&registry)?;
        let runner = StageRunner::for_current_process(&config)?;
        let filter = std::env::args_os()
            .skip(1)
            .filter_map(|a| a.into_string().ok())
            .find(|a| !a.starts_with('-'));
        Ok(Harness::new(config, registry, runner).with_filter(filter))
    }

    pub fn with_filter(self, filter: Option<String>) -> Harness {
        Harness { filter, ..self }
    }

    fn selected(&self, id: &str) -> bool {
        self.filter.as_ref().is_none_or(|f| id.contains(f.as_str()))
    }

    /// Why every test should be skipped, if the previous stage fails.
    fn upstream_failure(&self) -> Result<Option<String>> {
        if !self.config.enable_diff {
            return Ok(None);
        }
        let Some(previous) = self.registry.previous(self.config.stage) else {
            return Ok(None);
        };
        let outcome = self.runner.run(previous)?;
        if outcome.is_success() {
            Ok(None)
        } else {
            log::warn!("Previous stage {} did not pass: {:?}", previous.name, outcome);
            Ok(Some(format!("previous stage `{}` failed", previous.name)))
        }
    }

    /// Runs the stage in a child first. When the child crashes, the
    /// sentinel fails with its stderr and nothing else runs in this process.
    fn try_run(&self) -> Result<Option<Outcome>> {
        Ok(match self.runner.run(self.config.stage)? {
            TryRunOutcome::Crash { signal, stderr } => Some(Outcome::Failed(format!(
                "stage `{}` crashed with signal {signal}\n{}",
                self.config.stage.name,
                stderr_tail(&stderr, STDERR_TAIL)
            ))),
            _ => None,
        })
    }

    pub fn run(&self, suite: &TestSuite) -> Result<Report> {
        self.run_to(suite, &mut std::io::sink())
    }

    /// Runs the selected tests, writing one line per test to `out` as soon
    /// as its outcome is known.
    pub fn run_to(&self, suite: &TestSuite, out: &mut dyn Write) -> Result<Report> {
        let name = self.config.stage.name;
        let mut report = Report { stage: name.to_string(), ..Report::default() };
        let tests = suite.tests().into_iter().filter(|(id, _, _)| self.selected(id)).collect_vec();
        let sentinel = self.config.try_run && self.selected(TRY_RUN_SENTINEL);
        writeln!(out, "\nrunning {} tests (stage {name})", tests.len() + sentinel as usize)?;

        let mut skip = self.upstream_failure()?;
        if self.config.try_run {
            let outcome = match &skip {
                Some(why) => Outcome::Skipped(why.clone()),
                None => match self.try_run()? {
                    Some(crash) => {
                        skip = Some(format!("try-run of stage `{name}` crashed"));
                        crash
                    }
                    None => Outcome::Passed,
                },
            };
            if sentinel {
                report.record(out, TRY_RUN_SENTINEL.to_string(), outcome)?;
            }
        }
        for (id, test, ignored) in tests {
            let outcome = if ignored {
                Outcome::Ignored
            } else if let Some(why) = &skip {
                Outcome::Skipped(why.clone())
            } else {
                log::debug!("Running {id}");
                match catch_unwind(AssertUnwindSafe(|| test.run(&self.config))) {
                    Ok(Ok(())) => Outcome::Passed,
                    Ok(Err(e)) => Outcome::Failed(format!("{e:?}")),
                    Err(payload) => Outcome::Failed(panic_message(payload.as_ref())),
                }
            };
            report.record(out, id, outcome)?;
        }
        Ok(report)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Entry point of a corpus test binary.
pub fn main(suite: TestSuite) -> ExitCode {
    setup_test_logger();
    let report = Harness::from_env().and_then(|harness| harness.run_to(&suite, &mut stdout()));
    match report {
        Ok(report) => {
            print!("{report}");
            if report.is_success() { ExitCode::SUCCESS } else { ExitCode::from(101) }
        }
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::from(101)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::{ENABLE_DIFF, STAGE_NAME, TRY_RUN};
    use crate::stage::Stage;
    use crate::{Test, TestResult};

    static ABC: &[Stage] = &[
        Stage { name: "a", env_vars: &[] },
        Stage { name: "b", env_vars: &[] },
        Stage { name: "c", env_vars: &[] },
    ];

    #[derive(Clone)]
    struct Case(Option<&'static str>);

    impl Test for Case {
        fn run(&self, _config: &HarnessConfig) -> TestResult {
            match self.0 {
                None => Ok(()),
                Some("panic") => panic!("boom"),
                Some(msg) => anyhow::bail!("{msg}"),
            }
        }
    }

    fn suite() -> Result<TestSuite> {
        let mut suite = TestSuite::default();
        suite.add("pass", Case(None))?;
        suite.add("fail", Case(Some("mismatch")))?;
        suite.add("panic", Case(Some("panic")))?;
        Ok(suite)
    }

    fn harness(vars: &[(&str, &str)], script: &str) -> Result<Harness> {
        let registry = StageRegistry::new(ABC);
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let config = HarnessConfig::from_vars(&vars, &registry)?;
        Ok(Harness::new(config, registry, StageRunner::new("/bin/sh", ["-c", script])))
    }

    #[test]
    fn failures_and_panics_are_reported() -> Result<()> {
        let report = harness(&[(STAGE_NAME, "a")], "exit 0")?.run(&suite()?)?;
        assert_eq!(report.outcome("pass"), Some(&Outcome::Passed));
        assert!(report.outcome("fail").is_some_and(Outcome::is_failure));
        assert!(matches!(report.outcome("panic"), Some(Outcome::Failed(m)) if m.contains("boom")));
        assert!(!report.is_success());
        Ok(())
    }

    #[test]
    fn upstream_failure_skips_everything() -> Result<()> {
        let script = r#"test "$STAGEDIFF_STAGE_NAME" != a"#;
        let report = harness(&[(STAGE_NAME, "b"), (ENABLE_DIFF, "1")], script)?.run(&suite()?)?;
        assert_eq!(report.outcomes.len(), 3);
        for (_, outcome) in &report.outcomes {
            assert_eq!(*outcome, Outcome::Skipped("previous stage `a` failed".into()));
        }
        assert!(report.is_success());

        let report = harness(&[(STAGE_NAME, "c"), (ENABLE_DIFF, "1")], script)?.run(&suite()?)?;
        assert_eq!(report.outcome("pass"), Some(&Outcome::Passed));
        Ok(())
    }

    #[test]
    fn first_stage_has_no_upstream() -> Result<()> {
        let report = harness(&[(STAGE_NAME, "a"), (ENABLE_DIFF, "1")], "exit 1")?.run(&suite()?)?;
        assert_eq!(report.outcome("pass"), Some(&Outcome::Passed));
        Ok(())
    }

    #[test]
    fn crash_fails_the_sentinel_and_skips_the_cases() -> Result<()> {
        let script = "echo boom >&2; kill -SEGV $$";
        let mut out = vec![];
        let report =
            harness(&[(STAGE_NAME, "b"), (TRY_RUN, "1")], script)?.run_to(&suite()?, &mut out)?;
        match report.outcome(TRY_RUN_SENTINEL) {
            Some(Outcome::Failed(message)) => {
                assert!(message.contains("signal 11"), "{message}");
                assert!(message.contains("boom"), "{message}");
            }
            other => panic!("unexpected sentinel outcome {other:?}"),
        }
        for id in ["fail", "pass", "panic"] {
            assert_eq!(
                report.outcome(id),
                Some(&Outcome::Skipped("try-run of stage `b` crashed".into()))
            );
        }
        assert!(!report.is_success());

        let out = String::from_utf8(out)?;
        let lines = out.lines().filter(|l| l.starts_with("test ")).collect_vec();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "test try_run::panic ... FAILED");
        assert!(out.contains("running 4 tests (stage b)"), "{out}");
        assert!(format!("{report}").contains("---- try_run::panic ----"));
        Ok(())
    }

    #[test]
    fn crash_skips_the_cases_outside_the_filter_too() -> Result<()> {
        let script = "kill -ABRT $$";
        let harness = harness(&[(STAGE_NAME, "b"), (TRY_RUN, "1")], script)?
            .with_filter(Some("pass".into()));
        let report = harness.run(&suite()?)?;
        assert_eq!(report.outcome(TRY_RUN_SENTINEL), None);
        assert_eq!(
            report.outcome("pass"),
            Some(&Outcome::Skipped("try-run of stage `b` crashed".into()))
        );
        Ok(())
    }

    #[test]
    fn ordinary_failure_passes_the_sentinel() -> Result<()> {
        let report = harness(&[(STAGE_NAME, "b"), (TRY_RUN, "1")], "exit 3")?.run(&suite()?)?;
        assert_eq!(report.outcome(TRY_RUN_SENTINEL), Some(&Outcome::Passed));
        Ok(())
    }

    #[test]
    fn filter_and_ignore() -> Result<()> {
        let mut suite = suite()?;
        suite.ignore(&|id| id == "fail");
        let harness = harness(&[(STAGE_NAME, "a")], "exit 0")?.with_filter(Some("a".into()));
        let report = harness.run(&suite)?;
        let ids = report.outcomes.iter().map(|(id, _)| id.as_str()).collect_vec();
        assert_eq!(ids, vec!["fail", "panic", "pass"]);
        assert_eq!(report.outcome("fail"), Some(&Outcome::Ignored));
        Ok(())
    }
}
