use chrono::Utc;

/// Correlation id handed to the recipe service, e.g. `generate-recipe-1718000000`.
pub fn make_request_id(action: &str) -> String {
    format!("{}-recipe-{}", action, Utc::now().timestamp())
}
