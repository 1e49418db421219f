use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Custom deserializer for postal codes: address books in the wild mix
/// numeric and string values for the same field.
fn deserialize_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s,
    })
}

/// One shipping/contact record consumed by the checkout flow.
///
/// Records are immutable and externally supplied; identity is positional
/// (the index within the address book).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    pub city: String,
    #[serde(deserialize_with = "deserialize_number_or_string")]
    pub postal_code: String,
    /// Region/state, matched against dropdown option labels.
    pub zone: String,
}

impl AddressRecord {
    /// Storefronts with a single name input get "first last" joined.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// How long a navigation waits before the page counts as settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessPolicy {
    /// Resolve as soon as the main-frame load completes.
    Load,
    /// Resolve once network activity has quieted down.
    #[default]
    NetworkIdle,
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// Inclusive bounds for the per-keystroke typing delay, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw one delay. Inverted bounds are tolerated.
    pub fn sample(&self) -> Duration {
        let lo = self.min_ms.min(self.max_ms);
        let hi = self.min_ms.max(self.max_ms);
        let ms = if lo == hi {
            lo
        } else {
            rand::thread_rng().gen_range(lo..=hi)
        };
        Duration::from_millis(ms)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_ms: 50,
            max_ms: 250,
        }
    }
}

/// What to do with a candidate once its presence is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CandidateAction {
    /// Detection only, no side effect.
    Observe,
    #[default]
    Click,
    Type {
        text: String,
    },
}

/// One way of locating a UI control: a selector, the action to perform on
/// the first hit, and a presence-detection budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorCandidate {
    pub selector: String,
    #[serde(default)]
    pub action: CandidateAction,
    #[serde(default = "default_candidate_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_candidate_timeout_ms() -> u64 {
    10_000
}

impl SelectorCandidate {
    pub fn click(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            action: CandidateAction::Click,
            timeout_ms: default_candidate_timeout_ms(),
        }
    }

    pub fn observe(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            action: CandidateAction::Observe,
            timeout_ms: default_candidate_timeout_ms(),
        }
    }

    pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            action: CandidateAction::Type { text: text.into() },
            timeout_ms: default_candidate_timeout_ms(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Result of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The structural candidates all missed; the heuristic text scan acted.
    CompletedViaFallback,
    Failed(String),
}

/// Terminal classification of one full checkout iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// The final location matched the configured confirmation pattern.
    Success,
    /// The pipeline ran to the end but the final location did not match.
    Inconclusive,
    /// The step sequence was interrupted.
    Error(String),
}

impl AttemptResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptResult::Success)
    }
}
