//! Last-resort in-page scan: match interactive elements by visible text
//! instead of structure.

use crate::backend::{Backend, BackendError};
use serde_json::json;

/// Scans buttons, links and submit inputs in document order for visible
/// text containing any keyword (case-insensitive) and clicks the first
/// hit. Returns the matched text, or null.
pub const CLICK_BY_TEXT_JS: &str = r#"
(args) => {
  const keywords = args.keywords.map((k) => k.toLowerCase());
  const nodes = document.querySelectorAll("button, a, input[type='submit']");
  for (const node of nodes) {
    if (node.offsetParent === null) continue;
    const text = ((node.innerText || node.value || "") + "").trim().toLowerCase();
    if (!text) continue;
    for (const keyword of keywords) {
      if (text.includes(keyword)) {
        node.click();
        return text;
      }
    }
  }
  return null;
}
"#;

/// Run the scan-and-click pass. `Ok(None)` means no visible element
/// matched any keyword.
pub async fn click_by_text<B: Backend + ?Sized>(
    backend: &mut B,
    keywords: &[String],
) -> Result<Option<String>, BackendError> {
    let value = backend
        .evaluate(CLICK_BY_TEXT_JS, json!({ "keywords": keywords }))
        .await?;
    Ok(value.as_str().map(str::to_owned))
}
