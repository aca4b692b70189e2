//! Validation rule routes

use axum::{routing::get, Router};

use super::queries::list_rules;
use crate::api::response::ApiResponse;
use crate::features::FeatureState;

/// Create rule routes
pub fn rules_routes() -> Router<FeatureState> {
    Router::new().route("/rules", get(list_rules_handler))
}

/// List the business rules applied during batch validation
///
/// GET /rules
async fn list_rules_handler() -> ApiResponse<Vec<list_rules::RuleInfo>> {
    ApiResponse::success(list_rules::handle())
}
