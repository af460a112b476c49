//! Harness configuration, resolved once from an environment snapshot.
use std::collections::HashMap;

use anyhow::{Context, Result};
use stagediff_core::flags::parse_bool;
use stagediff_core::prelude::*;

use crate::stage::{Stage, StageRegistry};

pub const STAGE_NAME: &str = "STAGEDIFF_STAGE_NAME";
pub const ENABLE_DIFF: &str = "STAGEDIFF_STAGE_ENABLE_DIFF";
pub const TRY_RUN: &str = "STAGEDIFF_TRY_RUN";
pub const ENABLE_JIT: &str = "STAGEDIFF_ENABLE_JIT";
pub const ENABLE_COMPILER: &str = "STAGEDIFF_ENABLE_COMPILER";
pub const FLOAT16_TOL: &str = "STAGEDIFF_FLOAT16_TOL";
pub const FLOAT32_TOL: &str = "STAGEDIFF_FLOAT32_TOL";
pub const LOG: &str = "STAGEDIFF_LOG";

/// Variables a child process inherits from its parent.
pub const PASSTHROUGH: &[&str] = &["LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH", LOG];

pub const DEFAULT_STAGE: &str = "backend";

/// Per datum type comparison bound, used both as absolute and relative
/// tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub float16: f64,
    pub float32: f64,
}

impl Default for Tolerances {
    fn default() -> Tolerances {
        Tolerances { float16: 1e-3, float32: 1e-6 }
    }
}

impl Tolerances {
    pub fn for_datum_type(&self, dt: DatumType) -> f64 {
        match dt {
            DatumType::F16 => self.float16,
            DatumType::F32 => self.float32,
            _ => 1e-6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub stage: &'static Stage,
    /// skip the stage when the previous one fails
    pub enable_diff: bool,
    /// pre-flight the stage in a child process
    pub try_run: bool,
    /// compiled pipeline instead of the eager plan
    pub enable_jit: bool,
    /// the compiled variant of a case runs the fusion compiler
    pub enable_compiler: bool,
    pub tolerances: Tolerances,
    pub flags: Flags,
    pub passthrough: Vec<(String, String)>,
}

impl HarnessConfig {
    pub fn from_env(registry: &StageRegistry) -> Result<HarnessConfig> {
        Self::from_vars(&std::env::vars().collect(), registry)
    }

    /// Resolve the configuration from `vars`. The current stage bundle is
    /// overlaid on the snapshot before anything else is read.
    pub fn from_vars(
        vars: &HashMap<String, String>,
        registry: &StageRegistry,
    ) -> Result<HarnessConfig> {
        let name = vars.get(STAGE_NAME).map(|s| s.as_str()).unwrap_or(DEFAULT_STAGE);
        let stage = registry.by_name(name).with_context(|| {
            format!("Unknown stage {name:?} in {STAGE_NAME}, expected one of {:?}", registry.names())
        })?;
        let mut vars = vars.clone();
        for (k, v) in stage.env_vars {
            vars.insert(k.to_string(), v.to_string());
        }
        let switch = |name: &str, default: bool| match vars.get(name) {
            None => default,
            Some(v) => parse_bool(v).unwrap_or_else(|| {
                log::warn!("Ignoring {name}={v:?}, keeping {default}");
                default
            }),
        };
        let tolerance = |name: &str, default: f64| {
            vars.get(name)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(default)
        };
        let defaults = Tolerances::default();
        let config = HarnessConfig {
            stage,
            enable_diff: switch(ENABLE_DIFF, false),
            try_run: switch(TRY_RUN, false),
            enable_jit: switch(ENABLE_JIT, true),
            enable_compiler: switch(ENABLE_COMPILER, true),
            tolerances: Tolerances {
                float16: tolerance(FLOAT16_TOL, defaults.float16),
                float32: tolerance(FLOAT32_TOL, defaults.float32),
            },
            flags: Flags::from_vars(|k| vars.get(k).cloned()),
            passthrough: PASSTHROUGH
                .iter()
                .filter_map(|k| vars.get(*k).map(|v| (k.to_string(), v.clone())))
                .collect(),
        };
        log::debug!("{config:?}");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_to_backend() -> Result<()> {
        let config = HarnessConfig::from_vars(&vars(&[]), &StageRegistry::builtin())?;
        assert_eq!(config.stage.name, "backend");
        assert!(!config.enable_diff);
        assert!(!config.try_run);
        assert!(config.enable_jit);
        assert!(config.enable_compiler);
        assert!(config.flags.prim_all);
        assert!(config.flags.use_compiler);
        assert!(!config.flags.enable_fusion_fallback);
        assert_eq!(config.tolerances, Tolerances::default());
        Ok(())
    }

    #[test]
    fn unknown_stage_is_fatal() {
        let err = HarnessConfig::from_vars(&vars(&[(STAGE_NAME, "middle")]), &StageRegistry::builtin())
            .unwrap_err();
        let msg = format!("{err:?}");
        assert!(msg.contains("middle"));
        assert!(msg.contains("infer_symbolic"));
    }

    #[test]
    fn stage_bundle_wins() -> Result<()> {
        let config = HarnessConfig::from_vars(
            &vars(&[(STAGE_NAME, "prim"), (ENABLE_COMPILER, "1"), ("FLAGS_prim_all", "0")]),
            &StageRegistry::builtin(),
        )?;
        assert!(!config.enable_compiler);
        assert!(config.flags.prim_all);
        assert!(!config.flags.use_compiler);
        Ok(())
    }

    #[test]
    fn tolerances() -> Result<()> {
        let registry = StageRegistry::builtin();
        let config = HarnessConfig::from_vars(
            &vars(&[(FLOAT16_TOL, "0.01"), (FLOAT32_TOL, "not-a-number")]),
            &registry,
        )?;
        assert_eq!(config.tolerances.float16, 0.01);
        assert_eq!(config.tolerances.float32, 1e-6);
        assert_eq!(config.tolerances.for_datum_type(DatumType::F16), 0.01);
        assert_eq!(config.tolerances.for_datum_type(DatumType::F64), 1e-6);
        assert_eq!(config.tolerances.for_datum_type(DatumType::I32), 1e-6);
        Ok(())
    }

    #[test]
    fn bad_switch_keeps_default() -> Result<()> {
        let config = HarnessConfig::from_vars(
            &vars(&[(ENABLE_DIFF, "1"), (ENABLE_JIT, "sometimes")]),
            &StageRegistry::builtin(),
        )?;
        assert!(config.enable_diff);
        assert!(config.enable_jit);
        Ok(())
    }

    #[test]
    fn passthrough() -> Result<()> {
        let config = HarnessConfig::from_vars(
            &vars(&[("LD_LIBRARY_PATH", "/opt/lib"), ("HOME", "/root")]),
            &StageRegistry::builtin(),
        )?;
        assert_eq!(config.passthrough, vec![("LD_LIBRARY_PATH".to_string(), "/opt/lib".to_string())]);
        Ok(())
    }
}
