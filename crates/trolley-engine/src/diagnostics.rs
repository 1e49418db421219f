//! Best-effort page diagnostics. Nothing in this module may fail a run:
//! every error is logged and swallowed.

use crate::backend::{Backend, BackendError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Collects every form, input/select/textarea and the iframe count on the
/// current page.
pub const PAGE_STRUCTURE_JS: &str = r#"
(args) => {
  const forms = Array.from(document.querySelectorAll("form")).map((form) => ({
    id: form.id || "no-id",
    action: form.action || "",
    method: form.method || "",
  }));
  const inputs = Array.from(
    document.querySelectorAll("input, select, textarea")
  ).map((input) => ({
    tag: input.tagName.toLowerCase(),
    type: input.type || "",
    name: input.name || "no-name",
    id: input.id || "no-id",
    placeholder: input.placeholder || "",
    visible: input.offsetParent !== null,
  }));
  const iframe_count = document.querySelectorAll("iframe").length;
  return { forms: forms, inputs: inputs, iframe_count: iframe_count };
}
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormInfo {
    pub id: String,
    pub action: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStructure {
    pub forms: Vec<FormInfo>,
    pub inputs: Vec<InputInfo>,
    pub iframe_count: usize,
}

/// Dump the structure of the current page.
pub async fn page_structure<B: Backend + ?Sized>(
    backend: &mut B,
) -> Result<PageStructure, BackendError> {
    let value = backend.evaluate(PAGE_STRUCTURE_JS, json!({})).await?;
    Ok(serde_json::from_value(value)?)
}

/// Check each selector for presence with a short budget. Faults count as
/// absent — this is a report, not a gate.
pub async fn field_availability<B: Backend + ?Sized>(
    backend: &mut B,
    selectors: &[String],
) -> Vec<(String, bool)> {
    let mut report = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let present = backend
            .wait_for(selector, Duration::from_millis(500))
            .await
            .unwrap_or(false);
        report.push((selector.clone(), present));
    }
    report
}

/// Write a screenshot to `dir/<tag>.png`. Best effort on every step:
/// capture, directory creation and write failures are all swallowed.
pub async fn capture_snapshot<B: Backend + ?Sized>(backend: &mut B, dir: &Path, tag: &str) {
    let bytes = match backend.screenshot().await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Snapshot capture failed (ignoring): {e}");
            return;
        }
    };
    if let Err(e) = std::fs::create_dir_all(dir) {
        debug!(dir = %dir.display(), "Snapshot dir creation failed (ignoring): {e}");
        return;
    }
    let path = dir.join(format!("{tag}.png"));
    match std::fs::write(&path, &bytes) {
        Ok(()) => debug!(path = %path.display(), bytes = bytes.len(), "Snapshot saved"),
        Err(e) => debug!(path = %path.display(), "Snapshot write failed (ignoring): {e}"),
    }
}
