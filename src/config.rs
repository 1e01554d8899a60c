use crate::calc::{CalcError, RetentionFraction, ThresholdPolicy};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

pub const POLICY_ENV: &str = "COHORTD_POLICY";

/// Trimming and threshold fractions used by the grade views.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePolicy {
    /// Grade standards and class reports.
    pub primary_retention: RetentionFraction,
    /// Grade overview subject rates.
    pub overview_retention: RetentionFraction,
    pub dispersion_retention: RetentionFraction,
    pub history_retention: RetentionFraction,
    pub excellent_fraction: f64,
    pub pass_fraction: f64,
}

impl Default for RatePolicy {
    fn default() -> Self {
        let thresholds = ThresholdPolicy::default();
        Self {
            primary_retention: RetentionFraction::NINETY,
            overview_retention: RetentionFraction::NINETY_FIVE,
            dispersion_retention: RetentionFraction::NINETY_FIVE,
            history_retention: RetentionFraction::NINETY_FIVE,
            excellent_fraction: thresholds.excellent_fraction,
            pass_fraction: thresholds.pass_fraction,
        }
    }
}

impl RatePolicy {
    pub fn thresholds(&self) -> ThresholdPolicy {
        ThresholdPolicy {
            excellent_fraction: self.excellent_fraction,
            pass_fraction: self.pass_fraction,
        }
    }

    /// Returns a copy with every field present in `patch` replaced. Unknown
    /// keys are rejected so a typo never silently keeps a default.
    pub fn merged(&self, patch: &serde_json::Value) -> Result<RatePolicy, CalcError> {
        let Some(obj) = patch.as_object() else {
            return Err(CalcError::new("bad_params", "policy must be an object"));
        };
        let mut out = *self;
        for (k, v) in obj {
            let Some(n) = v.as_f64() else {
                return Err(CalcError::new(
                    "bad_params",
                    format!("policy.{k} must be a number"),
                ));
            };
            match k.as_str() {
                "primaryRetention" => out.primary_retention = RetentionFraction::new(n)?,
                "overviewRetention" => out.overview_retention = RetentionFraction::new(n)?,
                "dispersionRetention" => out.dispersion_retention = RetentionFraction::new(n)?,
                "historyRetention" => out.history_retention = RetentionFraction::new(n)?,
                "excellentFraction" => out.excellent_fraction = unit_fraction(k, n)?,
                "passFraction" => out.pass_fraction = unit_fraction(k, n)?,
                _ => {
                    return Err(CalcError::new(
                        "bad_params",
                        format!("unknown policy field: {k}"),
                    ))
                }
            }
        }
        Ok(out)
    }
}

fn unit_fraction(field: &str, v: f64) -> Result<f64, CalcError> {
    if !v.is_finite() || v <= 0.0 || v > 1.0 {
        return Err(CalcError::new(
            "contract_violation",
            format!("policy.{field} must be in (0, 1], got {v}"),
        ));
    }
    Ok(v)
}

pub fn load_policy_file(path: &Path) -> anyhow::Result<RatePolicy> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read policy file {}", path.display()))?;
    let patch: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parse policy file {}", path.display()))?;
    let policy = RatePolicy::default()
        .merged(&patch)
        .with_context(|| format!("apply policy file {}", path.display()))?;
    Ok(policy)
}

/// Startup policy: defaults, overridden by the file named in
/// `COHORTD_POLICY` when it is set. A bad file must not keep the daemon from
/// starting.
pub fn policy_from_env() -> RatePolicy {
    let Some(path) = std::env::var_os(POLICY_ENV) else {
        return RatePolicy::default();
    };
    match load_policy_file(Path::new(&path)) {
        Ok(policy) => {
            info!(path = %Path::new(&path).display(), "loaded rate policy");
            policy
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "ignoring rate policy file, using defaults");
            RatePolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn defaults_match_grade_conventions() {
        let p = RatePolicy::default();
        assert_eq!(p.primary_retention.get(), 0.90);
        assert_eq!(p.overview_retention.get(), 0.95);
        assert_eq!(p.dispersion_retention.get(), 0.95);
        assert_eq!(p.history_retention.get(), 0.95);
        assert_eq!(p.thresholds(), ThresholdPolicy::default());
    }

    #[test]
    fn merged_replaces_only_given_fields() {
        let p = RatePolicy::default()
            .merged(&json!({ "primaryRetention": 0.8, "passFraction": 0.5 }))
            .expect("merge");
        assert_eq!(p.primary_retention.get(), 0.8);
        assert_eq!(p.pass_fraction, 0.5);
        assert_eq!(p.overview_retention.get(), 0.95);
    }

    #[test]
    fn merged_rejects_bad_values() {
        let base = RatePolicy::default();
        let e = base.merged(&json!({ "historyRetention": -0.5 })).unwrap_err();
        assert_eq!(e.code, "contract_violation");
        let e = base.merged(&json!({ "passFraction": 2.0 })).unwrap_err();
        assert_eq!(e.code, "contract_violation");
        let e = base.merged(&json!({ "passFraction": "high" })).unwrap_err();
        assert_eq!(e.code, "bad_params");
        let e = base.merged(&json!({ "retention": 0.9 })).unwrap_err();
        assert_eq!(e.code, "bad_params");
        let e = base.merged(&json!([0.9])).unwrap_err();
        assert_eq!(e.code, "bad_params");
    }

    #[test]
    fn policy_file_round_trip_and_errors() {
        let dir = std::env::temp_dir().join(format!(
            "cohortd-policy-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");

        let good = dir.join("policy.json");
        std::fs::write(&good, r#"{ "overviewRetention": 0.9 }"#).expect("write");
        let p = load_policy_file(&good).expect("load");
        assert_eq!(p.overview_retention.get(), 0.9);

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "{ not json").expect("write");
        let e = load_policy_file(&bad).unwrap_err();
        assert!(format!("{e:#}").contains("parse policy file"));

        assert!(load_policy_file(&dir.join("missing.json")).is_err());
    }
}
