//! Run configuration (spec §3, §6).
//!
//! Grounded on `snow-pkg/src/manifest.rs`'s `Manifest::from_str`/`from_file`
//! pattern: parse with `serde`+`toml`, map parse errors to a readable
//! `String` rather than pulling in a dedicated error-handling crate for one
//! call site.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which per-tick arrival probability formula to use (spec §9 open
/// question). The reference implementation uses `PmfAtOne`; `run` must
/// default to it for comparability, but both are exposed so a caller can
/// compare against "true" Bernoulli thinning.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalModel {
    /// `poisson_pmf(arrival_rate / 1000, k = 1) = λ e^{-λ}`.
    PmfAtOne,
    /// `1 - e^{-λ}`, the probability of at least one Poisson arrival.
    BernoulliThinning,
}

impl Default for ArrivalModel {
    fn default() -> Self {
        ArrivalModel::PmfAtOne
    }
}

/// Immutable configuration for one simulation run (spec §3).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorOptions {
    /// Number of distinct resources in the database.
    pub db_size: u32,
    /// Lock replicas per resource.
    pub replicas: u32,
    /// Scheduler slots available per tick.
    pub cpu_count: u32,
    /// Target total completions (finished + missed) before `run` stops.
    pub sim_size: u64,

    pub access_time: u64,
    pub buffered_time: u64,
    pub write_time: u64,
    pub spawn_time: u64,

    pub buffered_chance: f64,
    pub write_chance: f64,

    /// Expected arrivals per 1000 ticks.
    pub arrival_rate: f64,
    /// Deadline slack multiplier D.
    pub deadline_slack: f64,
    /// Inclusive range of processes sampled per transaction.
    pub transaction_size: (u32, u32),

    pub arrival_model: ArrivalModel,
    /// RNG seed. `None` lets `run` draw entropy from the OS, sacrificing
    /// reproducibility (spec §6: "the core must expose a seed knob even
    /// though the reference relies on default RNG").
    pub seed: Option<u64>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        MirrorOptions {
            db_size: 50,
            replicas: 3,
            cpu_count: 4,
            sim_size: 1000,
            access_time: 5,
            buffered_time: 2,
            write_time: 8,
            spawn_time: 1,
            buffered_chance: 0.1,
            write_chance: 0.2,
            arrival_rate: 50.0,
            deadline_slack: 4.0,
            transaction_size: (1, 5),
            arrival_model: ArrivalModel::PmfAtOne,
            seed: None,
        }
    }
}

impl MirrorOptions {
    /// Parse options from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<MirrorOptions, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse options: {e}"))
    }

    /// Read and parse options from a TOML file on disk.
    pub fn from_file(path: &Path) -> Result<MirrorOptions, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let opts = MirrorOptions::default();
        assert_eq!(opts.arrival_model, ArrivalModel::PmfAtOne);
        assert!(opts.transaction_size.0 <= opts.transaction_size.1);
        assert!(opts.replicas >= 1);
    }

    #[test]
    fn parse_partial_toml_falls_back_to_defaults() {
        let toml = r#"
cpu_count = 8
arrival_rate = 120.0
"#;
        let opts = MirrorOptions::from_toml_str(toml).unwrap();
        assert_eq!(opts.cpu_count, 8);
        assert_eq!(opts.arrival_rate, 120.0);
        assert_eq!(opts.db_size, MirrorOptions::default().db_size);
    }

    #[test]
    fn parse_arrival_model_variant() {
        let toml = r#"arrival_model = "bernoulli_thinning""#;
        let opts = MirrorOptions::from_toml_str(toml).unwrap();
        assert_eq!(opts.arrival_model, ArrivalModel::BernoulliThinning);
    }

    #[test]
    fn reject_malformed_toml() {
        let result = MirrorOptions::from_toml_str("cpu_count = [1, 2");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("failed to parse options"));
    }

    #[test]
    fn seed_roundtrips_through_toml() {
        let toml = "seed = 42";
        let opts = MirrorOptions::from_toml_str(toml).unwrap();
        assert_eq!(opts.seed, Some(42));
    }
}
