use crate::config::RatePolicy;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Daemon state between requests. Exam data is never kept here; every
/// request carries the snapshots it needs.
pub struct AppState {
    pub policy: RatePolicy,
}
