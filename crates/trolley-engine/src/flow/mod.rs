//! The checkout step sequence.
//!
//! One [`CheckoutPipeline::run`] call is one iteration: a strictly ordered
//! walk from product page to result classification against a single fresh
//! session. Steps degrade gracefully where the flow can still reach
//! classification (a storefront may auto-add to cart, or skip the cart
//! page entirely); only a failed product navigation, cart navigation or a
//! missing checkout form abort the iteration.

pub mod form;
pub mod plan;

pub use plan::{CheckoutPlan, FormFields, StepControl};

use crate::backend::{Backend, BackendError};
use crate::config::schema::RetrySettings;
use crate::diagnostics;
use crate::resolution::{Resolution, ResolvePolicy, SelectorResolver};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use trolley_common::contact;
use trolley_common::protocol::{
    AddressRecord, AttemptResult, ReadinessPolicy, SelectorCandidate, StepOutcome,
};
use url::Url;

/// Identifies a pipeline step in logs and failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepId {
    NavigateProduct,
    TriggerAddToCart,
    NavigateCart,
    TriggerCheckout,
    AwaitForm,
    FillForm,
    SubmitPayment,
    ClassifyResult,
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepId::NavigateProduct => "navigate-product",
            StepId::TriggerAddToCart => "trigger-add-to-cart",
            StepId::NavigateCart => "navigate-cart",
            StepId::TriggerCheckout => "trigger-checkout",
            StepId::AwaitForm => "await-form",
            StepId::FillForm => "fill-form",
            StepId::SubmitPayment => "submit-payment",
            StepId::ClassifyResult => "classify-result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Step {step} failed: {reason}")]
    StepFatal { step: StepId, reason: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Executes the checkout step sequence for one address record.
pub struct CheckoutPipeline<'a> {
    plan: &'a CheckoutPlan,
    retry: RetrySettings,
    snapshot_dir: Option<PathBuf>,
}

impl<'a> CheckoutPipeline<'a> {
    pub fn new(plan: &'a CheckoutPlan, retry: RetrySettings, snapshot_dir: Option<PathBuf>) -> Self {
        Self {
            plan,
            retry,
            snapshot_dir,
        }
    }

    /// Run the full sequence against one fresh session. Every exit path
    /// yields a classification; nothing escapes the iteration boundary.
    pub async fn run<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        record: &AddressRecord,
    ) -> AttemptResult {
        match self.run_steps(backend, record).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Iteration aborted: {e}");
                AttemptResult::Error(e.to_string())
            }
        }
    }

    async fn run_steps<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        record: &AddressRecord,
    ) -> Result<AttemptResult, PipelineError> {
        self.navigate_product(backend).await?;
        self.trigger_control(backend, StepId::TriggerAddToCart, &self.plan.add_to_cart)
            .await?;
        self.navigate_cart(backend).await?;
        self.trigger_control(backend, StepId::TriggerCheckout, &self.plan.checkout)
            .await?;
        self.await_form(backend).await?;
        self.fill_form(backend, record).await?;
        self.trigger_control(backend, StepId::SubmitPayment, &self.plan.pay)
            .await?;
        Ok(self.classify(backend).await?)
    }

    async fn navigate_product<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<(), PipelineError> {
        let step = StepId::NavigateProduct;
        let url = self
            .plan
            .product_urls
            .first()
            .ok_or_else(|| PipelineError::StepFatal {
                step,
                reason: "no product URLs configured".into(),
            })?;
        self.navigate(backend, step, url).await?;
        self.settle(self.plan.settle_ms).await;
        Ok(())
    }

    async fn navigate_cart<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<(), PipelineError> {
        let Some(cart_url) = &self.plan.cart_url else {
            debug!("No cart page configured, going straight to checkout");
            return Ok(());
        };
        self.navigate(backend, StepId::NavigateCart, cart_url).await?;
        self.settle(self.plan.settle_ms).await;
        Ok(())
    }

    async fn navigate<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        step: StepId,
        url: &str,
    ) -> Result<(), PipelineError> {
        let timeout = Duration::from_millis(self.plan.navigation_timeout_ms);
        let nav = backend
            .navigate(url, ReadinessPolicy::NetworkIdle, timeout)
            .await
            .map_err(|e| match e {
                BackendError::NavigationTimeout { .. } => PipelineError::StepFatal {
                    step,
                    reason: e.to_string(),
                },
                other => PipelineError::Backend(other),
            })?;
        info!(%step, url = %nav.url, "Navigated");
        Ok(())
    }

    /// Resolve-and-activate for the tolerant button steps. `NotFound` is
    /// reported upward as a failed outcome but never aborts the iteration.
    async fn trigger_control<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        step: StepId,
        control: &StepControl,
    ) -> Result<StepOutcome, BackendError> {
        if control.is_disabled() {
            debug!(%step, "No control configured, skipping");
            return Ok(StepOutcome::Completed);
        }
        let policy = self.policy().with_keywords(&control.keywords);
        let outcome = match SelectorResolver::resolve(backend, &control.candidates, &policy).await? {
            Resolution::Matched {
                selector,
                via_heuristic: false,
            } => {
                info!(%step, %selector, "Control activated");
                StepOutcome::Completed
            }
            Resolution::Matched {
                selector,
                via_heuristic: true,
            } => {
                info!(%step, matched = %selector, "Control activated via text scan");
                StepOutcome::CompletedViaFallback
            }
            Resolution::NotFound => {
                warn!(%step, "Control not found, proceeding");
                StepOutcome::Failed("control not found".into())
            }
        };
        self.settle(self.plan.settle_ms).await;
        Ok(outcome)
    }

    /// Block until the structural anchor is up. Without it no later step
    /// can succeed, so exhaustion is fatal to the iteration.
    async fn await_form<B: Backend + ?Sized>(&self, backend: &mut B) -> Result<(), PipelineError> {
        let anchor = SelectorCandidate::observe(&self.plan.form_anchor)
            .with_timeout_ms(self.plan.form_anchor_timeout_ms);
        let resolved =
            SelectorResolver::resolve(backend, std::slice::from_ref(&anchor), &self.policy())
                .await?;
        if !resolved.is_found() {
            if let Some(dir) = &self.snapshot_dir {
                diagnostics::capture_snapshot(backend, dir, "form-not-found").await;
            }
            return Err(PipelineError::StepFatal {
                step: StepId::AwaitForm,
                reason: "checkout form not found".into(),
            });
        }
        info!(step = %StepId::AwaitForm, anchor = %self.plan.form_anchor, "Checkout form is up");
        Ok(())
    }

    async fn fill_form<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        record: &AddressRecord,
    ) -> Result<(), BackendError> {
        let step = StepId::FillForm;
        let fields = &self.plan.fields;
        let contact = contact::phone_like();

        let entries: [(&str, String); 6] = [
            (fields.phone.as_str(), contact),
            (fields.name.as_str(), record.full_name()),
            (fields.address1.as_str(), record.address1.clone()),
            (fields.address2.as_str(), record.address2.clone()),
            (fields.city.as_str(), record.city.clone()),
            (fields.postal_code.as_str(), record.postal_code.clone()),
        ];
        for (selector, text) in entries {
            if text.is_empty() {
                continue;
            }
            self.fill_field(backend, selector, text).await?;
        }

        match form::select_option_by_label(backend, &fields.region, &record.zone).await? {
            Some(chosen) if chosen.kind == "exact" => {
                debug!(%step, region = %chosen.text, "Region selected");
            }
            Some(chosen) => {
                info!(%step, wanted = %record.zone, region = %chosen.text, "Region matched by substring");
            }
            None => {
                warn!(%step, wanted = %record.zone, "Region not found in dropdown, leaving default");
            }
        }

        info!(%step, city = %record.city, "Form filled");
        Ok(())
    }

    async fn fill_field<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        selector: &str,
        text: String,
    ) -> Result<(), BackendError> {
        let candidate = SelectorCandidate::type_text(selector, text)
            .with_timeout_ms(self.plan.fields.field_timeout_ms);
        let resolved =
            SelectorResolver::resolve(backend, std::slice::from_ref(&candidate), &self.policy())
                .await?;
        if !resolved.is_found() {
            warn!(step = %StepId::FillForm, %selector, "Field not found, skipping");
        }
        Ok(())
    }

    async fn classify<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<AttemptResult, BackendError> {
        self.settle(self.plan.classify_settle_ms).await;
        let location = backend.current_url().await?;
        if location_matches(&location, &self.plan.success_pattern) {
            info!(step = %StepId::ClassifyResult, %location, "Confirmation page reached");
            Ok(AttemptResult::Success)
        } else {
            warn!(
                step = %StepId::ClassifyResult,
                %location,
                pattern = %self.plan.success_pattern,
                "Final location does not match the confirmation pattern"
            );
            Ok(AttemptResult::Inconclusive)
        }
    }

    fn policy(&self) -> ResolvePolicy {
        ResolvePolicy {
            attempts_per_candidate: self.retry.attempts_per_candidate,
            retry_interval: Duration::from_millis(self.retry.retry_interval_ms),
            keywords: Vec::new(),
            type_delay: self.plan.type_delay,
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }

    async fn settle(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// A location counts as success when it contains the pattern as a
/// substring, or its host equals the pattern or sits under it.
pub fn location_matches(location: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    if location.contains(pattern) {
        return true;
    }
    match Url::parse(location) {
        Ok(parsed) => parsed
            .host_str()
            .is_some_and(|host| host == pattern || host.ends_with(&format!(".{pattern}"))),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_matches_substring() {
        assert!(location_matches(
            "https://shop.example.com/checkouts/cn/thank_you",
            "thank_you"
        ));
        assert!(!location_matches(
            "https://shop.example.com/cart",
            "thank_you"
        ));
    }

    #[test]
    fn location_matches_host_suffix() {
        assert!(location_matches(
            "https://pay.example.com/session/abc",
            "example.com"
        ));
        assert!(!location_matches(
            "https://pay.example.org/session/abc",
            "example.com"
        ));
    }

    #[test]
    fn empty_pattern_never_matches() {
        assert!(!location_matches("https://shop.example.com/", ""));
    }
}
