//! Scripted in-memory session for engine tests: a fixed page model plus a
//! shared event log so tests can assert what was clicked, typed and
//! navigated across sessions.
#![allow(dead_code)] // not every test binary touches every helper

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trolley_engine::backend::{Backend, BackendError, SessionFactory};
use trolley_engine::flow::form;
use trolley_engine::protocol::{DelayRange, NavigationResult, ReadinessPolicy};
use trolley_engine::resolution::heuristic;

/// What a scripted session pretends the storefront looks like.
#[derive(Clone, Default)]
pub struct PageModel {
    /// Selectors present immediately.
    pub present: HashSet<String>,
    /// Selector -> number of failed presence checks before it appears.
    pub appear_after: HashMap<String, u32>,
    /// Visible button/link texts seen by the heuristic scan.
    pub button_texts: Vec<String>,
    /// Option labels of the region dropdown.
    pub region_options: Vec<String>,
    /// Location reported by `current_url`.
    pub final_url: String,
    /// Fail every navigation with a timeout.
    pub navigation_times_out: bool,
}

impl PageModel {
    pub fn with_present(mut self, selectors: &[&str]) -> Self {
        self.present.extend(selectors.iter().map(|s| s.to_string()));
        self
    }
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events_with_prefix(log: &EventLog, prefix: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}

pub struct MockBackend {
    model: PageModel,
    log: EventLog,
    wait_counts: HashMap<String, u32>,
    selected_region: Option<String>,
    ready: bool,
}

impl MockBackend {
    pub fn new(model: PageModel, log: EventLog) -> Self {
        Self {
            model,
            log,
            wait_counts: HashMap::new(),
            selected_region: None,
            ready: false,
        }
    }

    pub fn selected_region(&self) -> Option<&str> {
        self.selected_region.as_deref()
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }

    fn check_presence(&mut self, selector: &str) -> bool {
        if self.model.present.contains(selector) {
            return true;
        }
        if let Some(after) = self.model.appear_after.get(selector) {
            let count = self.wait_counts.entry(selector.to_string()).or_insert(0);
            *count += 1;
            return *count > *after;
        }
        false
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        self.ready = true;
        self.record("launch".into());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.ready = false;
        self.record("close".into());
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.ready
    }

    async fn navigate(
        &mut self,
        url: &str,
        _readiness: ReadinessPolicy,
        timeout: Duration,
    ) -> Result<NavigationResult, BackendError> {
        if self.model.navigation_times_out {
            return Err(BackendError::NavigationTimeout {
                url: url.to_string(),
                ms: timeout.as_millis() as u64,
            });
        }
        self.record(format!("nav:{url}"));
        Ok(NavigationResult {
            url: url.to_string(),
            title: "Mock Page".into(),
        })
    }

    async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<bool, BackendError> {
        Ok(self.check_presence(selector))
    }

    async fn click(&mut self, selector: &str) -> Result<(), BackendError> {
        self.record(format!("click:{selector}"));
        Ok(())
    }

    async fn type_text(
        &mut self,
        selector: &str,
        text: &str,
        _delay: DelayRange,
    ) -> Result<(), BackendError> {
        self.record(format!("type:{selector}:{text}"));
        Ok(())
    }

    async fn evaluate(&mut self, script: &str, args: Value) -> Result<Value, BackendError> {
        if script == heuristic::CLICK_BY_TEXT_JS {
            let keywords: Vec<String> = args["keywords"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|v| v.as_str())
                        .map(|s| s.to_lowercase())
                        .collect()
                })
                .unwrap_or_default();
            for text in &self.model.button_texts {
                let lower = text.trim().to_lowercase();
                if keywords.iter().any(|k| lower.contains(k.as_str())) {
                    self.record(format!("heuristic-click:{lower}"));
                    return Ok(json!(lower));
                }
            }
            return Ok(Value::Null);
        }

        if script == form::SELECT_OPTION_BY_LABEL_JS {
            let wanted = args["label"].as_str().unwrap_or_default().trim().to_string();
            if let Some(option) = self
                .model
                .region_options
                .iter()
                .find(|o| o.trim() == wanted)
                .cloned()
            {
                self.selected_region = Some(option.clone());
                self.record(format!("select:{option}"));
                return Ok(json!({ "kind": "exact", "text": option.trim() }));
            }
            let lower = wanted.to_lowercase();
            if let Some(option) = self
                .model
                .region_options
                .iter()
                .find(|o| {
                    let text = o.trim().to_lowercase();
                    !text.is_empty() && (text.contains(&lower) || lower.contains(&text))
                })
                .cloned()
            {
                self.selected_region = Some(option.clone());
                self.record(format!("select:{option}"));
                return Ok(json!({ "kind": "partial", "text": option.trim() }));
            }
            return Ok(Value::Null);
        }

        Ok(Value::Null)
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        Ok(self.model.final_url.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        self.record("screenshot".into());
        Ok(Vec::new())
    }
}

/// Hands every iteration a fresh session over the same page model, all
/// writing to one shared log.
pub struct MockFactory {
    pub model: PageModel,
    pub log: EventLog,
}

impl SessionFactory for MockFactory {
    fn create(&self) -> Box<dyn Backend> {
        Box::new(MockBackend::new(self.model.clone(), self.log.clone()))
    }
}
