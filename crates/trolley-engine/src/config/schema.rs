use crate::flow::CheckoutPlan;
use crate::runner::RunPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Retry budgets applied to every candidate during selector resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Presence checks per candidate before moving on.
    pub attempts_per_candidate: u32,
    /// Pause between presence checks, in milliseconds.
    pub retry_interval_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts_per_candidate: 3,
            retry_interval_ms: 2_000,
        }
    }
}

/// Top-level run configuration (`trolley.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrolleyConfig {
    /// Address book JSON (array of records).
    pub addresses_path: PathBuf,
    /// Checkpoint file; `TROLLEY_STATE_PATH` overrides it.
    pub state_path: PathBuf,
    /// Directory for best-effort failure snapshots. Unset disables capture.
    pub snapshot_dir: Option<PathBuf>,
    pub retry: RetrySettings,
    pub policy: RunPolicy,
    pub plan: CheckoutPlan,
}

impl Default for TrolleyConfig {
    fn default() -> Self {
        Self {
            addresses_path: PathBuf::from("./addresses.json"),
            state_path: PathBuf::from("./state/last_index.json"),
            snapshot_dir: None,
            retry: RetrySettings::default(),
            policy: RunPolicy::default(),
            plan: CheckoutPlan::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: TrolleyConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.addresses_path, PathBuf::from("./addresses.json"));
        assert_eq!(config.retry.attempts_per_candidate, 3);
        assert_eq!(config.policy.max_iterations, 40);
        assert!(!config.policy.stop_on_inconclusive);
    }

    #[test]
    fn overrides_apply_over_defaults() {
        let yaml = r#"
state_path: /tmp/run/cursor.json
policy:
  max_iterations: 5
  stop_on_inconclusive: true
retry:
  attempts_per_candidate: 1
"#;
        let config: TrolleyConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.state_path, PathBuf::from("/tmp/run/cursor.json"));
        assert_eq!(config.policy.max_iterations, 5);
        assert!(config.policy.stop_on_inconclusive);
        assert_eq!(config.retry.attempts_per_candidate, 1);
        assert_eq!(config.retry.retry_interval_ms, 2_000);
    }
}
