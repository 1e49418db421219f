use crate::cdp::CdpClient;
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use trolley_engine::backend::{Backend, BackendError, SessionFactory};
use trolley_engine::protocol::{DelayRange, NavigationResult, ReadinessPolicy};

/// How often the presence poll re-queries the DOM.
const PRESENCE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless Chromium session over CDP.
pub struct HeadlessBackend {
    client: Option<CdpClient>,
    visible: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            client: None,
            visible: false,
        }
    }

    pub fn new_with_visibility(visible: bool) -> Self {
        Self {
            client: None,
            visible,
        }
    }

    pub fn get_client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    fn client(&self) -> Result<&CdpClient, BackendError> {
        self.client.as_ref().ok_or(BackendError::NotReady)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching headless backend (Chromium)...");
        let client = CdpClient::launch(self.visible)
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(
        &mut self,
        url: &str,
        readiness: ReadinessPolicy,
        timeout: Duration,
    ) -> Result<NavigationResult, BackendError> {
        let client = self.client()?;
        info!("Navigating to: {}", url);

        let page = &client.page;
        let load = async {
            page.goto(url)
                .await
                .map_err(|e| BackendError::Navigation(e.to_string()))?;
            if readiness == ReadinessPolicy::NetworkIdle {
                page.wait_for_navigation()
                    .await
                    .map_err(|e| BackendError::Navigation(e.to_string()))?;
            }
            Ok::<(), BackendError>(())
        };
        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BackendError::NavigationTimeout {
                    url: url.to_string(),
                    ms: timeout.as_millis() as u64,
                });
            }
        }

        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, BackendError> {
        let client = self.client()?;
        let deadline = Instant::now() + timeout;
        loop {
            // CDP reports absence as an error on find_element; real
            // transport faults resurface on the next navigate/evaluate.
            if client.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                debug!(selector, "Presence check timed out");
                return Ok(false);
            }
            tokio::time::sleep(PRESENCE_POLL_INTERVAL.min(timeout)).await;
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), BackendError> {
        let client = self.client()?;
        let element = client.page.find_element(selector).await.map_err(|_| {
            BackendError::ElementNotFound {
                selector: selector.to_string(),
            }
        })?;
        element
            .click()
            .await
            .map_err(|e| BackendError::Other(format!("Click failed: {}", e)))?;
        Ok(())
    }

    async fn type_text(
        &mut self,
        selector: &str,
        text: &str,
        delay: DelayRange,
    ) -> Result<(), BackendError> {
        let client = self.client()?;
        let element = client.page.find_element(selector).await.map_err(|_| {
            BackendError::ElementNotFound {
                selector: selector.to_string(),
            }
        })?;
        element
            .click()
            .await
            .map_err(|e| BackendError::Other(format!("Focus failed: {}", e)))?;
        for ch in text.chars() {
            element
                .type_str(ch.to_string())
                .await
                .map_err(|e| BackendError::Other(format!("Type failed: {}", e)))?;
            tokio::time::sleep(delay.sample()).await;
        }
        Ok(())
    }

    async fn evaluate(&mut self, script: &str, args: Value) -> Result<Value, BackendError> {
        let client = self.client()?;
        let expression = format!("({})({})", script, args);
        let result = client
            .page
            .evaluate(expression)
            .await
            .map_err(|e| BackendError::ScriptError(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        let client = self.client()?;
        let url = client
            .page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(url)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        let client = self.client()?;
        let bytes = client
            .page
            .screenshot(chromiumoxide::page::ScreenshotParams::builder().build())
            .await
            .map_err(|e| BackendError::Other(format!("Screenshot failed: {}", e)))?;
        Ok(bytes)
    }
}

/// Builds one fresh, unlaunched headless session per iteration.
pub struct HeadlessFactory {
    visible: bool,
}

impl HeadlessFactory {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }
}

impl SessionFactory for HeadlessFactory {
    fn create(&self) -> Box<dyn Backend> {
        Box::new(HeadlessBackend::new_with_visibility(self.visible))
    }
}
