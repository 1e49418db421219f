//! Declarative description of one storefront's checkout flow.
//!
//! Everything the pipeline needs to know about a storefront lives here:
//! URLs, per-step candidate lists, form selectors, delays and the
//! confirmation pattern. The defaults describe the common
//! Shopify-flavoured markup; real deployments override them from config.

use serde::{Deserialize, Serialize};
use trolley_common::protocol::{DelayRange, SelectorCandidate};

/// One interactive step: an ordered candidate list plus the keywords for
/// the text-scan fallback when every candidate misses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepControl {
    pub candidates: Vec<SelectorCandidate>,
    pub keywords: Vec<String>,
}

impl StepControl {
    pub fn is_disabled(&self) -> bool {
        self.candidates.is_empty() && self.keywords.is_empty()
    }
}

/// Selectors for the checkout form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormFields {
    pub phone: String,
    /// Single combined name input; receives "first last".
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub postal_code: String,
    /// Region/state dropdown, matched by visible option label.
    pub region: String,
    /// Presence budget per field during fill.
    pub field_timeout_ms: u64,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            phone: r#"input[name="phone"]"#.into(),
            name: r#"input[name="first_name"]"#.into(),
            address1: r#"input[name="address"]"#.into(),
            address2: r#"input[name="address2"]"#.into(),
            city: r#"input[name="city"]"#.into(),
            postal_code: r#"input[name="zip"]"#.into(),
            region: r#"select[name="province"]"#.into(),
            field_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutPlan {
    /// Product pages to start from; the first entry is used each
    /// iteration, the rest exist for manual rotation.
    pub product_urls: Vec<String>,
    /// Optional cart page visited between add-to-cart and checkout.
    pub cart_url: Option<String>,
    pub navigation_timeout_ms: u64,
    /// Add-to-cart (or popup confirm) control.
    pub add_to_cart: StepControl,
    /// Checkout-initiation control. Disabled when the storefront goes
    /// straight to an inline form.
    pub checkout: StepControl,
    /// Structural anchor proving the checkout form is up.
    pub form_anchor: String,
    pub form_anchor_timeout_ms: u64,
    pub fields: FormFields,
    /// Final pay/submit control.
    pub pay: StepControl,
    /// Substring (or host suffix) of the confirmation location.
    pub success_pattern: String,
    /// Pause after navigations and clicks, letting async page effects land.
    pub settle_ms: u64,
    /// Longer pause before reading the final location.
    pub classify_settle_ms: u64,
    pub type_delay: DelayRange,
}

impl Default for CheckoutPlan {
    fn default() -> Self {
        Self {
            product_urls: vec!["https://shop.example.com/products/sample-item".into()],
            cart_url: Some("https://shop.example.com/cart".into()),
            navigation_timeout_ms: 60_000,
            add_to_cart: StepControl {
                candidates: vec![
                    SelectorCandidate::click(".product-form__submit"),
                    SelectorCandidate::click(".es-popup-button-product"),
                ],
                keywords: vec!["add to cart".into(), "buy now".into()],
            },
            checkout: StepControl {
                candidates: vec![
                    SelectorCandidate::click(".cart__checkout-button"),
                    SelectorCandidate::click(".es-popup-button-cart"),
                ],
                keywords: vec!["checkout".into()],
            },
            form_anchor: r#"input[name="first_name"]"#.into(),
            form_anchor_timeout_ms: 30_000,
            fields: FormFields::default(),
            pay: StepControl {
                candidates: vec![SelectorCandidate::click("#es-form-button")],
                keywords: vec!["pay".into(), "submit".into(), "continue".into()],
            },
            success_pattern: "thank_you".into(),
            settle_ms: 5_000,
            classify_settle_ms: 20_000,
            type_delay: DelayRange::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_complete() {
        let plan = CheckoutPlan::default();
        assert!(!plan.product_urls.is_empty());
        assert!(!plan.add_to_cart.is_disabled());
        assert!(!plan.pay.is_disabled());
        assert!(!plan.form_anchor.is_empty());
    }

    #[test]
    fn plan_round_trips_through_yaml() {
        let plan = CheckoutPlan::default();
        let yaml = serde_yaml::to_string(&plan).unwrap();
        let back: CheckoutPlan = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.product_urls, plan.product_urls);
        assert_eq!(back.fields.phone, plan.fields.phone);
        assert_eq!(back.add_to_cart.candidates, plan.add_to_cart.candidates);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let plan: CheckoutPlan =
            serde_yaml::from_str("product_urls: [\"https://shop.example.com/p/x\"]").unwrap();
        assert_eq!(plan.product_urls, vec!["https://shop.example.com/p/x"]);
        assert_eq!(plan.form_anchor_timeout_ms, 30_000);
    }
}
