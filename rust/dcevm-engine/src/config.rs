//! `RedefinitionConfig`: the four configuration flags consumed at the
//! `redefine_classes` entry point, plus [`PhaseTimings`], the nine
//! sub-phase timers a HotSpot-style redefinition pass keeps.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration flags consumed at entry, loadable from a `dcevm.toml` file
/// by `dcevm-cli` and overridable by CLI flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RedefinitionConfig {
    /// Compatibility mode (`false`) vs advanced mode (`true`).
    pub allow_advanced_class_redefinition: bool,
    /// Attempt interpreter frame forwarding for already-executing frames.
    /// Optional; not required for correctness.
    pub use_method_forward_points: bool,
    /// 0 (off) through 5 (per-class trace spans); maps onto `tracing`
    /// levels (see `lib.rs`).
    pub trace_redefine_classes: u8,
    /// When set, `redefine_classes` records per-phase durations in the
    /// returned `RedefinitionReport`.
    pub time_redefine_classes: bool,
}

impl Default for RedefinitionConfig {
    fn default() -> Self {
        Self {
            allow_advanced_class_redefinition: false,
            use_method_forward_points: false,
            trace_redefine_classes: 0,
            time_redefine_classes: false,
        }
    }
}

impl RedefinitionConfig {
    /// Parse a `dcevm.toml`-shaped document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// The `tracing` level `trace_redefine_classes` maps onto, or `None`
    /// when tracing is off (0).
    pub fn tracing_level(&self) -> Option<tracing::Level> {
        match self.trace_redefine_classes {
            0 => None,
            1 => Some(tracing::Level::WARN),
            2 => Some(tracing::Level::INFO),
            3 => Some(tracing::Level::DEBUG),
            _ => Some(tracing::Level::TRACE),
        }
    }
}

/// Durations for `total` plus each of the eight pipeline phases
/// `run_transaction` wraps in its own `tracing` span, populated only when
/// `time_redefine_classes` is set (all-zero otherwise).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub total: Duration,
    pub prologue: Duration,
    pub class_linking: Duration,
    pub class_loading: Duration,
    pub prepare_redefinition: Duration,
    pub wait_for_locks: Duration,
    pub heap_iteration: Duration,
    pub redefinition: Duration,
    pub vm_op_epilogue: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_compatibility_mode_with_tracing_off() {
        let config = RedefinitionConfig::default();
        assert!(!config.allow_advanced_class_redefinition);
        assert!(config.tracing_level().is_none());
    }

    #[test]
    fn trace_level_mapping() {
        let mut config = RedefinitionConfig { trace_redefine_classes: 1, ..Default::default() };
        assert_eq!(config.tracing_level(), Some(tracing::Level::WARN));
        config.trace_redefine_classes = 5;
        assert_eq!(config.tracing_level(), Some(tracing::Level::TRACE));
    }

    #[test]
    fn from_toml_str_parses_partial_document() {
        let config = RedefinitionConfig::from_toml_str(
            "allow_advanced_class_redefinition = true\ntrace_redefine_classes = 3\n",
        )
        .unwrap();
        assert!(config.allow_advanced_class_redefinition);
        assert_eq!(config.trace_redefine_classes, 3);
        assert!(!config.time_redefine_classes);
    }

    #[test]
    fn phase_timings_default_to_zero() {
        let timings = PhaseTimings::default();
        assert_eq!(timings.total, Duration::ZERO);
    }
}
