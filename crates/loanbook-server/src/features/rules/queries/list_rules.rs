//! Validation rule catalog query
//!
//! Exposes the rule names and descriptions that produce the error text on
//! invalid rows, so clients can show analysts what an upload is checked
//! against.

use serde::Serialize;

use crate::ingest::rules;

/// One business rule as presented to clients
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// The rule catalog in evaluation order.
pub fn handle() -> Vec<RuleInfo> {
    rules::catalog()
        .iter()
        .map(|rule| RuleInfo {
            name: rule.name,
            description: rule.description,
        })
        .collect()
}
