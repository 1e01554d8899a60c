use crate::calc::RetentionFraction;
use crate::ipc::error::{calc_err, err};
use crate::ipc::types::Request;
use serde::de::DeserializeOwned;

pub fn required<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get(key).filter(|v| !v.is_null()) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {}: {}", key, e), None))
}

pub fn optional<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(_) => required(req, key).map(Some),
    }
}

/// Retention fraction param; out-of-range values are contract violations,
/// not missing data.
pub fn retention(
    req: &Request,
    key: &str,
    default: Option<RetentionFraction>,
) -> Result<RetentionFraction, serde_json::Value> {
    let raw = match (optional::<f64>(req, key)?, default) {
        (Some(v), _) => v,
        (None, Some(d)) => return Ok(d),
        (None, None) => {
            return Err(err(&req.id, "bad_params", format!("missing {}", key), None))
        }
    };
    RetentionFraction::new(raw).map_err(|e| calc_err(&req.id, e))
}
