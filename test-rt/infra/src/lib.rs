use std::collections::HashMap;

use dyn_clone::DynClone;
use itertools::Itertools;

pub mod case;
pub mod compare;
pub mod config;
pub mod harness;
pub mod runner;
pub mod stage;

pub use case::{InputSpec, SubgraphCase};
pub use compare::{assert_all_close, assert_outputs_close};
pub use config::{HarnessConfig, Tolerances};
pub use harness::{Harness, Outcome, Report, main};
pub use runner::{StageRunner, TryRunOutcome};
pub use stage::{Stage, StageRegistry};

pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env(config::LOG).try_init();
}

pub type TestResult = anyhow::Result<()>;

pub trait Test: 'static + Send + Sync + DynClone {
    fn ignore(&self) -> bool {
        false
    }
    fn run(&self, config: &HarnessConfig) -> TestResult;
}

dyn_clone::clone_trait_object!(Test);

/// Tree of named tests. Leaves carry an extra ignore switch set from the
/// outside.
#[derive(Clone)]
pub enum TestSuite {
    Node(HashMap<String, TestSuite>),
    Leaf(Box<dyn Test>, bool),
}

impl Default for TestSuite {
    fn default() -> TestSuite {
        TestSuite::Node(HashMap::default())
    }
}

impl TestSuite {
    pub fn add(&mut self, id: impl ToString, test: impl Test) -> anyhow::Result<()> {
        self.add_suite(id, TestSuite::Leaf(Box::new(test), false))
    }

    /// Fails when `self` is a single test.
    pub fn add_suite(&mut self, id: impl ToString, suite: TestSuite) -> anyhow::Result<()> {
        match self {
            TestSuite::Node(children) => {
                children.insert(id.to_string(), suite);
                Ok(())
            }
            TestSuite::Leaf(..) => anyhow::bail!("Can not add {} to a leaf", id.to_string()),
        }
    }

    pub fn with(mut self, id: impl ToString, suite: TestSuite) -> anyhow::Result<TestSuite> {
        self.add_suite(id, suite)?;
        Ok(self)
    }

    /// Sub suite by `::`-separated path.
    pub fn get_sub_mut(&mut self, id: &str) -> Option<&mut TestSuite> {
        let mut current = self;
        for part in id.split("::") {
            current = match current {
                TestSuite::Node(children) => children.get_mut(part)?,
                TestSuite::Leaf(..) => return None,
            };
        }
        Some(current)
    }

    /// Mark as ignored every test whose full id matches `pred`.
    pub fn ignore(&mut self, pred: &dyn Fn(&str) -> bool) {
        self.ignore_rec(&mut vec![], pred)
    }

    fn ignore_rec(&mut self, prefix: &mut Vec<String>, pred: &dyn Fn(&str) -> bool) {
        match self {
            TestSuite::Node(children) => {
                for (id, child) in children.iter_mut() {
                    prefix.push(id.clone());
                    child.ignore_rec(prefix, pred);
                    prefix.pop();
                }
            }
            TestSuite::Leaf(_, ignored) => {
                if pred(&prefix.join("::")) {
                    *ignored = true;
                }
            }
        }
    }

    /// Every test with its full id and whether it is ignored, sorted by id.
    pub fn tests(&self) -> Vec<(String, &dyn Test, bool)> {
        let mut tests = vec![];
        self.tests_rec(&mut vec![], &mut tests);
        tests.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)).collect()
    }

    fn tests_rec<'a>(&'a self, prefix: &mut Vec<String>, tests: &mut Vec<(String, &'a dyn Test, bool)>) {
        match self {
            TestSuite::Node(children) => {
                for (id, child) in children {
                    prefix.push(id.clone());
                    child.tests_rec(prefix, tests);
                    prefix.pop();
                }
            }
            TestSuite::Leaf(test, ignored) => {
                tests.push((prefix.join("::"), &**test, *ignored || test.ignore()))
            }
        }
    }
}
