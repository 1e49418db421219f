//! Selector resolution: ordered candidate fallback plus a keyword text
//! scan as the last resort.
//!
//! Every interactive step funnels through [`SelectorResolver::resolve`] so
//! retry and timeout semantics exist exactly once instead of being
//! re-derived per call site.

pub mod heuristic;
pub mod resolver;

pub use resolver::{Resolution, ResolvePolicy, SelectorResolver};
