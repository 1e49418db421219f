use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
pub use trolley_common::error::backend_error::BackendError;
use trolley_common::protocol::{DelayRange, NavigationResult, ReadinessPolicy};

/// Capability surface the engine needs from one isolated browser session.
///
/// The engine never drives a browser directly: trolley-h implements this
/// over CDP, tests implement it as scripted mocks. One instance is one
/// session; the runner creates a fresh one per iteration and closes it
/// unconditionally.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the session (start browser, open page, etc.).
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the session and release its resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Whether the session can accept commands.
    async fn is_ready(&self) -> bool;

    /// Navigate and wait for `readiness` within `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        readiness: ReadinessPolicy,
        timeout: Duration,
    ) -> Result<NavigationResult, BackendError>;

    /// Presence check. `Ok(false)` means the selector did not appear within
    /// `timeout`; only session-level faults are errors.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, BackendError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), BackendError>;

    /// Type into the element, pausing between keystrokes per `delay`.
    async fn type_text(
        &mut self,
        selector: &str,
        text: &str,
        delay: DelayRange,
    ) -> Result<(), BackendError>;

    /// Evaluate a script in page context. The script receives `args` as its
    /// single argument and its return value comes back as JSON.
    async fn evaluate(&mut self, script: &str, args: Value) -> Result<Value, BackendError>;

    /// Current page location.
    async fn current_url(&mut self) -> Result<String, BackendError>;

    /// Capture a viewport screenshot (PNG bytes).
    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError>;
}

/// Produces a fresh, unlaunched session per iteration.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> Box<dyn Backend>;
}
