/// Backend flags, the `FLAGS_*` switches of the compilation pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Flags {
    /// Lower composite ops to primitives.
    pub prim_all: bool,
    /// Run the fusion compiler.
    pub use_compiler: bool,
    /// Check runtime values against inferred facts.
    pub check_infer_symbolic: bool,
    /// Evaluate fused groups op by op instead of with a generated kernel.
    pub enable_fusion_fallback: bool,
}

impl Default for Flags {
    fn default() -> Flags {
        Flags {
            prim_all: true,
            use_compiler: false,
            check_infer_symbolic: false,
            enable_fusion_fallback: false,
        }
    }
}

impl Flags {
    pub const NAMES: [&'static str; 4] = [
        "FLAGS_prim_all",
        "FLAGS_use_compiler",
        "FLAGS_check_infer_symbolic",
        "FLAGS_enable_fusion_fallback",
    ];

    /// Resolve the flags through `lookup`, keeping defaults for missing or
    /// unparsable values.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Flags {
        let default = Flags::default();
        let get = |name: &str, default: bool| match lookup(name) {
            None => default,
            Some(v) => parse_bool(&v).unwrap_or_else(|| {
                warn!("Ignoring {name}={v:?}, keeping {default}");
                default
            }),
        };
        Flags {
            prim_all: get(Self::NAMES[0], default.prim_all),
            use_compiler: get(Self::NAMES[1], default.use_compiler),
            check_infer_symbolic: get(Self::NAMES[2], default.check_infer_symbolic),
            enable_fusion_fallback: get(Self::NAMES[3], default.enable_fusion_fallback),
        }
    }
}

/// Parse a boolean switch as found in the environment.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "true" | "True" | "TRUE" | "on" | "ON" => Some(true),
        "0" | "false" | "False" | "FALSE" | "off" | "OFF" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        assert_eq!(Flags::from_vars(|_| None), Flags::default());
        assert!(Flags::default().prim_all);
    }

    #[test]
    fn overrides_and_garbage() {
        let vars: HashMap<&str, &str> =
            [("FLAGS_prim_all", "0"), ("FLAGS_use_compiler", "ON"), ("FLAGS_check_infer_symbolic", "maybe")]
                .into_iter()
                .collect();
        let flags = Flags::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert!(!flags.prim_all);
        assert!(flags.use_compiler);
        assert!(!flags.check_infer_symbolic);
    }

    #[test]
    fn booleans() {
        for t in ["1", "true", "True", "TRUE", "on", "ON"] {
            assert_eq!(parse_bool(t), Some(true));
        }
        for f in ["0", "false", "False", "FALSE", "off", "OFF"] {
            assert_eq!(parse_bool(f), Some(false));
        }
        assert_eq!(parse_bool("yes"), None);
    }
}
