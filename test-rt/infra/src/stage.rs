//! Compilation stages and their environment bundles.
use std::fmt;

/// A named preset of environment variables selecting how much of the
/// compilation pipeline runs.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Stage {
    pub name: &'static str,
    pub env_vars: &'static [(&'static str, &'static str)],
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub static STAGES: &[Stage] = &[
    Stage {
        name: "dynamic_to_static",
        env_vars: &[("STAGEDIFF_ENABLE_COMPILER", "0"), ("FLAGS_prim_all", "0")],
    },
    Stage { name: "prim", env_vars: &[("STAGEDIFF_ENABLE_COMPILER", "0"), ("FLAGS_prim_all", "1")] },
    Stage {
        name: "infer_symbolic",
        env_vars: &[
            ("STAGEDIFF_ENABLE_COMPILER", "0"),
            ("FLAGS_prim_all", "1"),
            ("FLAGS_use_compiler", "0"),
            ("FLAGS_check_infer_symbolic", "1"),
        ],
    },
    Stage {
        name: "frontend",
        env_vars: &[
            ("STAGEDIFF_ENABLE_COMPILER", "1"),
            ("FLAGS_prim_all", "1"),
            ("FLAGS_use_compiler", "1"),
            ("FLAGS_check_infer_symbolic", "0"),
            ("FLAGS_enable_fusion_fallback", "1"),
        ],
    },
    Stage {
        name: "backend",
        env_vars: &[
            ("STAGEDIFF_ENABLE_COMPILER", "1"),
            ("FLAGS_prim_all", "1"),
            ("FLAGS_use_compiler", "1"),
            ("FLAGS_check_infer_symbolic", "0"),
            ("FLAGS_enable_fusion_fallback", "0"),
        ],
    },
];

/// Ordered list of stages. Earlier stages run less of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct StageRegistry(&'static [Stage]);

impl Default for StageRegistry {
    fn default() -> StageRegistry {
        StageRegistry::builtin()
    }
}

impl StageRegistry {
    pub fn builtin() -> StageRegistry {
        StageRegistry(STAGES)
    }

    pub fn new(stages: &'static [Stage]) -> StageRegistry {
        StageRegistry(stages)
    }

    pub fn stages(&self) -> &'static [Stage] {
        self.0
    }

    pub fn by_name(&self, name: &str) -> Option<&'static Stage> {
        self.0.iter().find(|s| s.name == name)
    }

    /// The stage right before `stage`, None for the first one or for a
    /// stage this registry does not know.
    pub fn previous(&self, stage: &Stage) -> Option<&'static Stage> {
        let ix = self.0.iter().position(|s| s.name == stage.name)?;
        ix.checked_sub(1).map(|ix| &self.0[ix])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|s| s.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order() {
        assert_eq!(
            StageRegistry::builtin().names(),
            vec!["dynamic_to_static", "prim", "infer_symbolic", "frontend", "backend"]
        );
    }

    #[test]
    fn lookup_is_idempotent() {
        let registry = StageRegistry::builtin();
        for stage in registry.stages() {
            let found = registry.by_name(stage.name).unwrap();
            assert_eq!(found, stage);
            assert_eq!(registry.by_name(found.name).unwrap(), found);
        }
        assert!(registry.by_name("nope").is_none());
    }

    #[test]
    fn predecessor_chain() {
        let registry = StageRegistry::builtin();
        let mut stage = registry.by_name("backend").unwrap();
        let mut walked = vec![stage.name];
        while let Some(prev) = registry.previous(stage) {
            walked.push(prev.name);
            stage = prev;
        }
        walked.reverse();
        assert_eq!(walked, registry.names());
        let first = registry.by_name("dynamic_to_static").unwrap();
        assert!(registry.previous(first).is_none());
    }

    #[test]
    fn bundles() {
        let registry = StageRegistry::builtin();
        let frontend = registry.by_name("frontend").unwrap();
        let backend = registry.by_name("backend").unwrap();
        assert!(frontend.env_vars.contains(&("FLAGS_enable_fusion_fallback", "1")));
        assert!(backend.env_vars.contains(&("FLAGS_enable_fusion_fallback", "0")));
        let prim = registry.by_name("prim").unwrap();
        assert_eq!(prim.env_vars, &[("STAGEDIFF_ENABLE_COMPILER", "0"), ("FLAGS_prim_all", "1")]);
    }
}
