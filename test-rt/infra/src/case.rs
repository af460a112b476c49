//! Subgraph cases: a small graph, its inputs, and the baseline versus
//! compiled comparison.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, ensure};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use stagediff_core::ops::TValue;
use stagediff_core::prelude::*;

use crate::compare::assert_outputs_close;
use crate::config::HarnessConfig;
use crate::{Test, TestResult};

pub const DEFAULT_SEED: u64 = 2024;

/// Wires the case graph on top of the case sources, returns its outputs.
pub type NetBuilder =
    Arc<dyn Fn(&mut TypedModel, &[OutletId]) -> DiffResult<TVec<OutletId>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    /// Values drawn uniformly in `[low, high)` then cast to `dt`. Integer
    /// types truncate.
    Uniform { dt: DatumType, shape: TVec<usize>, low: f64, high: f64 },
    Values(Arc<Tensor>),
}

impl InputSpec {
    pub fn uniform(dt: DatumType, shape: &[usize], low: f64, high: f64) -> InputSpec {
        InputSpec::Uniform { dt, shape: shape.into(), low, high }
    }

    pub fn values(t: impl IntoArcTensor) -> InputSpec {
        InputSpec::Values(t.into_arc_tensor())
    }

    /// Fixed values, reshaped to `shape`.
    pub fn reshaped(t: Tensor, shape: &[usize]) -> Result<InputSpec> {
        Ok(InputSpec::values(t.into_shape(shape)?))
    }

    pub fn fact(&self) -> TypedFact {
        match self {
            InputSpec::Uniform { dt, shape, .. } => TypedFact::dt_shape(*dt, shape),
            InputSpec::Values(t) => TypedFact::shape_and_dt_of(t),
        }
    }

    fn generate(&self, rng: &mut SmallRng) -> Result<Arc<Tensor>> {
        match self {
            InputSpec::Values(t) => Ok(t.clone()),
            InputSpec::Uniform { dt, shape, low, high } => {
                ensure!(low <= high, "Empty input range [{low}, {high})");
                let len = shape.iter().product();
                let values: Vec<f64> = (0..len)
                    .map(|_| if low < high { rng.gen_range(*low..*high) } else { *low })
                    .collect();
                let t = Tensor::from_shape(shape, &values)?;
                Ok(t.cast_to_dt(*dt)?.into_owned().into_arc_tensor())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PlanKey {
    Eager,
    Compiled { flags: Flags, use_compiler: bool },
}

/// A subgraph regression case.
///
/// Clones share the memoized plans.
#[derive(Clone)]
pub struct SubgraphCase {
    pub name: String,
    pub inputs: Vec<InputSpec>,
    net: Option<NetBuilder>,
    pub seed: u64,
    pub ignored: bool,
    plans: Arc<Mutex<HashMap<PlanKey, Arc<SimplePlan>>>>,
}

impl fmt::Debug for SubgraphCase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SubgraphCase")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("seed", &self.seed)
            .finish()
    }
}

impl SubgraphCase {
    pub fn new(name: impl Into<String>) -> SubgraphCase {
        SubgraphCase {
            name: name.into(),
            inputs: vec![],
            net: None,
            seed: DEFAULT_SEED,
            ignored: false,
            plans: Arc::default(),
        }
    }

    pub fn with_input(mut self, input: InputSpec) -> SubgraphCase {
        self.inputs.push(input);
        self
    }

    pub fn with_net(
        mut self,
        net: impl Fn(&mut TypedModel, &[OutletId]) -> DiffResult<TVec<OutletId>> + Send + Sync + 'static,
    ) -> SubgraphCase {
        self.net = Some(Arc::new(net));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> SubgraphCase {
        self.seed = seed;
        self
    }

    pub fn with_ignore(mut self, ignored: bool) -> SubgraphCase {
        self.ignored = ignored;
        self
    }

    /// The raw graph of the case.
    pub fn model(&self) -> Result<TypedModel> {
        let net = self.net.as_ref().with_context(|| format!("Case {} has no net", self.name))?;
        let mut model = TypedModel::default();
        let sources = self
            .inputs
            .iter()
            .enumerate()
            .map(|(ix, spec)| model.add_source(format!("input_{ix}"), spec.fact()))
            .collect::<Result<TVec<_>>>()?;
        let outputs = net(&mut model, &sources)?;
        model.set_output_outlets(&outputs)?;
        Ok(model)
    }

    /// Inputs of the case. Uniform inputs are drawn in declaration order
    /// from a single generator seeded with the case seed.
    pub fn prepare_data(&self) -> Result<TVec<TValue>> {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        self.inputs.iter().map(|spec| spec.generate(&mut rng)).collect()
    }

    fn plan(&self, key: PlanKey) -> Result<Arc<SimplePlan>> {
        let mut plans = self.plans.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(plan) = plans.get(&key) {
            return Ok(plan.clone());
        }
        let model = self.model()?;
        let plan = match key {
            PlanKey::Eager => eager(&model)?,
            PlanKey::Compiled { flags, use_compiler } => compile(&model, &flags, use_compiler)?,
        };
        log::debug!("Built {:?} plan for {}", key, self.name);
        let plan = Arc::new(plan);
        plans.insert(key, plan.clone());
        Ok(plan)
    }

    /// Number of distinct plans built so far.
    pub fn plans_built(&self) -> usize {
        self.plans.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run the case, through the compiled pipeline when jit is on, through
    /// the eager plan otherwise.
    pub fn train(&self, config: &HarnessConfig, use_compiler: bool) -> Result<Vec<Value>> {
        let key = if config.enable_jit {
            PlanKey::Compiled { flags: config.flags, use_compiler }
        } else {
            PlanKey::Eager
        };
        let plan = self.plan(key)?;
        let outputs = plan
            .run(self.prepare_data()?)
            .with_context(|| format!("Running {} ({:?})", self.name, key))?;
        Ok(outputs.into_iter().map(Value::from).collect())
    }
}

impl Test for SubgraphCase {
    fn ignore(&self) -> bool {
        self.ignored
    }

    fn run(&self, config: &HarnessConfig) -> TestResult {
        let baseline = self.train(config, false).context("Baseline run")?;
        let compiled = self.train(config, config.enable_compiler).context("Compiled run")?;
        assert_outputs_close(&compiled, &baseline, &config.tolerances)
    }
}
