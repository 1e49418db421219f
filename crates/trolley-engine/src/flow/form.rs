//! Checkout form population.

use crate::backend::{Backend, BackendError};
use serde::Deserialize;
use serde_json::json;

/// Selects a dropdown option by visible label: exact trimmed-text match
/// first, then a substring match in either direction. No match leaves the
/// dropdown untouched and returns null.
pub const SELECT_OPTION_BY_LABEL_JS: &str = r#"
(args) => {
  const select = document.querySelector(args.selector);
  if (!select) return null;
  const options = Array.from(select.options);
  const wanted = args.label.trim();
  let kind = "exact";
  let match = options.find((option) => option.text.trim() === wanted);
  if (!match) {
    kind = "partial";
    const lower = wanted.toLowerCase();
    match = options.find((option) => {
      const text = option.text.trim().toLowerCase();
      return text.length > 0 && (text.includes(lower) || lower.includes(text));
    });
  }
  if (!match) return null;
  match.selected = true;
  select.dispatchEvent(new Event("change", { bubbles: true }));
  return { kind: kind, text: match.text.trim() };
}
"#;

/// How a dropdown option was matched.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SelectedOption {
    /// "exact" or "partial".
    pub kind: String,
    /// The trimmed visible text of the chosen option.
    pub text: String,
}

/// Select the option whose visible label matches `label`. `Ok(None)`
/// means no relation was found and the dropdown keeps its default —
/// never an error.
pub async fn select_option_by_label<B: Backend + ?Sized>(
    backend: &mut B,
    selector: &str,
    label: &str,
) -> Result<Option<SelectedOption>, BackendError> {
    let value = backend
        .evaluate(
            SELECT_OPTION_BY_LABEL_JS,
            json!({ "selector": selector, "label": label }),
        )
        .await?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}
