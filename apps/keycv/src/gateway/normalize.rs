//! Normalization of gateway payloads into the always-complete `AnalysisReport`.
//!
//! Every field the gateway sends is optional and may be the wrong type. This is
//! the only place that looks at raw JSON; everything downstream sees a fully
//! shaped report.

use serde_json::Value;

use crate::models::analysis::AnalysisReport;

/// A successful gateway response after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayReply {
    pub message: Option<String>,
    pub report: AnalysisReport,
    pub resume_text: Option<String>,
    pub job_description: Option<String>,
    pub cv_name: Option<String>,
}

/// Parses a success body. A body that is not JSON is treated as `{}`.
pub fn normalize_reply(body: &[u8]) -> GatewayReply {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

    GatewayReply {
        message: text_field(&value, "message"),
        report: normalize_report(&value),
        resume_text: text_field(&value, "resumeText"),
        job_description: text_field(&value, "jobDescription"),
        cv_name: text_field(&value, "cvName"),
    }
}

/// Builds a report from any JSON value, defaulting whatever is missing or malformed.
pub fn normalize_report(value: &Value) -> AnalysisReport {
    AnalysisReport {
        match_score: coerce_score(value.get("matchScore")),
        present_keywords: string_list(value.get("presentKeywords")),
        missing_keywords: string_list(value.get("missingKeywords")),
        recommendations: string_list(value.get("recommendations")),
    }
}

/// Parses a report stored as a JSON string (the `gen_feedback` column).
pub fn normalize_stored_report(raw: Option<&str>) -> AnalysisReport {
    let value = raw
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .unwrap_or(Value::Null);
    normalize_report(&value)
}

/// Message for a non-success response: `error`, then `message`, then a generic one.
pub fn rejection_message(status: u16, body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    text_field(&value, "error")
        .or_else(|| text_field(&value, "message"))
        .unwrap_or_else(|| format!("Submission failed with status {status}"))
}

fn coerce_score(value: Option<&Value>) -> f64 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
}
