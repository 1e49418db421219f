use super::heuristic;
use crate::backend::{Backend, BackendError};
use crate::diagnostics;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use trolley_common::protocol::{CandidateAction, DelayRange, SelectorCandidate};

/// Budgets shared by every candidate in one resolve call.
#[derive(Debug, Clone)]
pub struct ResolvePolicy {
    /// Presence checks per candidate before moving to the next one.
    pub attempts_per_candidate: u32,
    /// Pause between presence checks of the same candidate.
    pub retry_interval: Duration,
    /// Keywords for the text-scan fallback. Empty disables the pass.
    pub keywords: Vec<String>,
    /// Per-keystroke delay for `CandidateAction::Type`.
    pub type_delay: DelayRange,
    /// Where to drop best-effort snapshots between failed attempts.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            attempts_per_candidate: 3,
            retry_interval: Duration::from_secs(2),
            keywords: Vec::new(),
            type_delay: DelayRange::default(),
            snapshot_dir: None,
        }
    }
}

impl ResolvePolicy {
    pub fn with_keywords(mut self, keywords: &[String]) -> Self {
        self.keywords = keywords.to_vec();
        self
    }
}

/// Where a resolution landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A candidate (or the text scan) matched and its action has run.
    /// For heuristic matches `selector` carries the matched text.
    Matched {
        selector: String,
        via_heuristic: bool,
    },
    /// Nothing usable on the page. A normal outcome for the caller to
    /// handle, not an error.
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Matched { .. })
    }
}

pub struct SelectorResolver;

impl SelectorResolver {
    /// Walk `candidates` strictly in priority order and act on the first
    /// one present. First match wins: later candidates are never touched.
    /// Exhaustion falls through to the keyword scan, then `NotFound`.
    ///
    /// Presence misses are silent; only session-level faults propagate.
    pub async fn resolve<B: Backend + ?Sized>(
        backend: &mut B,
        candidates: &[SelectorCandidate],
        policy: &ResolvePolicy,
    ) -> Result<Resolution, BackendError> {
        for candidate in candidates {
            if Self::await_presence(backend, candidate, policy).await? {
                Self::act(backend, candidate, policy).await?;
                debug!(selector = %candidate.selector, "Candidate matched");
                return Ok(Resolution::Matched {
                    selector: candidate.selector.clone(),
                    via_heuristic: false,
                });
            }
            debug!(selector = %candidate.selector, "Candidate exhausted, trying next");
        }

        if !policy.keywords.is_empty()
            && let Some(text) = heuristic::click_by_text(backend, &policy.keywords).await?
        {
            warn!(matched = %text, "Structural candidates all missed; resolved via text scan");
            return Ok(Resolution::Matched {
                selector: text,
                via_heuristic: true,
            });
        }

        Ok(Resolution::NotFound)
    }

    /// Read-only presence query. Never acts on the element.
    pub async fn exists<B: Backend + ?Sized>(
        backend: &mut B,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BackendError> {
        backend.wait_for(selector, timeout).await
    }

    async fn await_presence<B: Backend + ?Sized>(
        backend: &mut B,
        candidate: &SelectorCandidate,
        policy: &ResolvePolicy,
    ) -> Result<bool, BackendError> {
        let timeout = Duration::from_millis(candidate.timeout_ms);
        let attempts = policy.attempts_per_candidate.max(1);
        for attempt in 1..=attempts {
            if backend.wait_for(&candidate.selector, timeout).await? {
                return Ok(true);
            }
            if attempt < attempts {
                if let Some(dir) = &policy.snapshot_dir {
                    let tag = format!("miss-{}-attempt{attempt}", sanitize(&candidate.selector));
                    diagnostics::capture_snapshot(backend, dir, &tag).await;
                }
                tokio::time::sleep(policy.retry_interval).await;
            }
        }
        Ok(false)
    }

    async fn act<B: Backend + ?Sized>(
        backend: &mut B,
        candidate: &SelectorCandidate,
        policy: &ResolvePolicy,
    ) -> Result<(), BackendError> {
        match &candidate.action {
            CandidateAction::Observe => Ok(()),
            CandidateAction::Click => backend.click(&candidate.selector).await,
            CandidateAction::Type { text } => {
                backend
                    .type_text(&candidate.selector, text, policy.type_delay)
                    .await
            }
        }
    }
}

fn sanitize(selector: &str) -> String {
    selector
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
