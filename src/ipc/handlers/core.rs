use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "policy": state.policy,
        }),
    )
}

fn handle_policy_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(state.policy))
}

fn handle_policy_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(patch) = req.params.get("policy") else {
        return err(&req.id, "bad_params", "missing policy", None);
    };
    match state.policy.merged(patch) {
        Ok(policy) => {
            state.policy = policy;
            info!(?policy, "rate policy updated");
            ok(&req.id, json!(state.policy))
        }
        Err(e) => calc_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "policy.get" => Some(handle_policy_get(state, req)),
        "policy.set" => Some(handle_policy_set(state, req)),
        _ => None,
    }
}
