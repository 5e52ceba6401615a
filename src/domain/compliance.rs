use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{GuardError, Result};

/// Scores strictly above this value render as compliant.
pub const COMPLIANCE_THRESHOLD: f64 = 80.0;

/// Number of fields the presence check looks at (title, price, image).
const REQUIRED_FIELDS: usize = 3;

/// Graded compliance judgment for a single product.
///
/// This is the canonical result shape. Remote responses and listing
/// verdicts are normalized into it at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub compliance_score: f64,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Set when the report was produced without the scoring service
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_price: Option<String>,
}

/// An issue is either free text or a structured object from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Issue {
    Text(String),
    Detail(IssueDetail),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueDetail {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Issue {
    pub fn warning(field: &str, message: &str) -> Self {
        Issue::Detail(IssueDetail {
            kind: Some("warning".into()),
            message: Some(message.into()),
            field: Some(field.into()),
            ..Default::default()
        })
    }

    /// Human-readable text of the issue
    pub fn text(&self) -> &str {
        match self {
            Issue::Text(s) => s,
            Issue::Detail(d) => d
                .message
                .as_deref()
                .or(d.text.as_deref())
                .or(d.description.as_deref())
                .or(d.suggestion.as_deref())
                .or(d.field.as_deref())
                .unwrap_or("Unknown issue"),
        }
    }
}

/// Presence/absence verdict for one listing card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingVerdict {
    pub link: String,
    pub is_compliant: bool,
    pub reasons: Vec<String>,
}

impl ListingVerdict {
    /// Express the verdict as a graded report: the share of required
    /// fields present, scaled to 0..=100.
    pub fn into_report(self) -> ComplianceReport {
        let missing = self.reasons.len().min(REQUIRED_FIELDS);
        let present = (REQUIRED_FIELDS - missing) as f64;
        let score = (present * 100.0 / REQUIRED_FIELDS as f64 * 100.0).round() / 100.0;

        ComplianceReport {
            compliance_score: score,
            issues: self.reasons.into_iter().map(Issue::Text).collect(),
            recommendations: Vec::new(),
            fallback: false,
            product_title: None,
            product_price: None,
        }
    }
}

/// One rule outcome in the rule-list response form.
#[derive(Debug, Deserialize)]
struct RuleOutcome {
    rule: String,
    compliant: bool,
    #[serde(default)]
    evidence: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
}

impl ComplianceReport {
    pub fn is_compliant(&self) -> bool {
        self.compliance_score > COMPLIANCE_THRESHOLD
    }

    /// Score formatted for display: integral scores without decimals,
    /// others with at most two.
    pub fn display_score(&self) -> String {
        format_score(self.compliance_score)
    }

    /// Normalize a scoring-service response into a report.
    ///
    /// Accepts the graded form (`complianceScore`), the rule-list form
    /// (`overallScore` + `complianceResult`), a `{ data: ... }` wrapper,
    /// and a listing verdict (`isCompliant` + `reasons`).
    pub fn from_response(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| GuardError::MalformedResponse("expected a JSON object".into()))?;

        if let Some(inner) = obj.get("data").filter(|v| v.is_object()) {
            return Self::from_response(inner);
        }

        if let Some(raw_score) = obj.get("complianceScore").or_else(|| obj.get("overallScore")) {
            let score = parse_score(raw_score).ok_or_else(|| {
                GuardError::MalformedResponse(format!("unreadable score: {}", raw_score))
            })?;

            let mut issues: Vec<Issue> = match obj.get("issues") {
                Some(Value::Array(items)) => items.iter().filter_map(issue_from_value).collect(),
                _ => Vec::new(),
            };

            if let Some(Value::Array(rules)) = obj.get("complianceResult") {
                for rule in rules {
                    let outcome: RuleOutcome = serde_json::from_value(rule.clone())?;
                    if outcome.compliant {
                        continue;
                    }
                    let message = match outcome.evidence {
                        Some(evidence) => format!("{}: {}", outcome.rule, evidence),
                        None => outcome.rule,
                    };
                    issues.push(Issue::Detail(IssueDetail {
                        kind: Some("rule".into()),
                        message: Some(message),
                        suggestion: outcome.suggestion,
                        ..Default::default()
                    }));
                }
            }

            let recommendations = match obj.get("recommendations") {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(issue_from_value)
                    .map(|issue| issue.text().to_string())
                    .collect(),
                _ => Vec::new(),
            };

            return Ok(Self {
                compliance_score: score.clamp(0.0, 100.0),
                issues,
                recommendations,
                fallback: obj.get("fallback").and_then(Value::as_bool).unwrap_or(false),
                product_title: obj
                    .get("productTitle")
                    .and_then(Value::as_str)
                    .map(String::from),
                product_price: obj
                    .get("productPrice")
                    .and_then(Value::as_str)
                    .map(String::from),
            });
        }

        if obj.contains_key("isCompliant") {
            let verdict: ListingVerdict = serde_json::from_value(value.clone())?;
            return Ok(verdict.into_report());
        }

        if let Some(error) = obj.get("error") {
            return Err(GuardError::MalformedResponse(format!(
                "service reported an error: {}",
                error
            )));
        }

        Err(GuardError::MalformedResponse(
            "no compliance score in response".into(),
        ))
    }
}

fn issue_from_value(value: &Value) -> Option<Issue> {
    match value {
        Value::String(s) => Some(Issue::Text(s.clone())),
        Value::Object(_) => serde_json::from_value(value.clone()).ok().map(Issue::Detail),
        _ => None,
    }
}

/// Scores arrive as numbers or as strings such as `"42.86%"`.
fn parse_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}

pub fn format_score(score: f64) -> String {
    if score.fract().abs() < f64::EPSILON {
        format!("{:.0}", score)
    } else {
        let s = format!("{:.2}", score);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graded_response() {
        let value = json!({
            "complianceScore": 85,
            "issues": [
                { "type": "warning", "message": "Price display format needs improvement", "field": "price" }
            ],
            "recommendations": ["Ensure price is clearly visible"]
        });
        let report = ComplianceReport::from_response(&value).unwrap();
        assert_eq!(report.compliance_score, 85.0);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].text(), "Price display format needs improvement");
        assert_eq!(report.recommendations, vec!["Ensure price is clearly visible"]);
        assert!(!report.fallback);
        assert!(report.is_compliant());
    }

    #[test]
    fn test_rule_list_response() {
        let value = json!({
            "jobId": "job-1",
            "complianceResult": [
                { "rule": "MRP Presence", "compliant": true, "evidence": "Found in scraped price" },
                { "rule": "Manufacturer Details", "compliant": false, "evidence": "Not found", "suggestion": "Add manufacturer/packer details" },
                { "rule": "Country of Origin", "compliant": false, "evidence": "Not found" }
            ],
            "overallScore": "42.86%",
            "recommendations": ["Add manufacturer/packer details"]
        });
        let report = ComplianceReport::from_response(&value).unwrap();
        assert!((report.compliance_score - 42.86).abs() < 1e-9);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].text(), "Manufacturer Details: Not found");
        assert!(!report.is_compliant());
    }

    #[test]
    fn test_data_wrapper_is_unwrapped() {
        let value = json!({ "data": { "complianceScore": "90" } });
        let report = ComplianceReport::from_response(&value).unwrap();
        assert_eq!(report.compliance_score, 90.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let value = json!({ "complianceScore": 140 });
        let report = ComplianceReport::from_response(&value).unwrap();
        assert_eq!(report.compliance_score, 100.0);
    }

    #[test]
    fn test_verdict_response() {
        let value = json!({ "link": "http://a", "isCompliant": false, "reasons": ["Missing MRP."] });
        let report = ComplianceReport::from_response(&value).unwrap();
        assert!((report.compliance_score - 66.67).abs() < 1e-9);
        assert_eq!(report.issues, vec![Issue::Text("Missing MRP.".into())]);
    }

    #[test]
    fn test_error_and_garbage_responses_rejected() {
        assert!(ComplianceReport::from_response(&json!({ "error": "Detection failed" })).is_err());
        assert!(ComplianceReport::from_response(&json!({ "complianceScore": "n/a" })).is_err());
        assert!(ComplianceReport::from_response(&json!([1, 2])).is_err());
        assert!(ComplianceReport::from_response(&json!({ "ok": true })).is_err());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut report = ListingVerdict {
            link: String::new(),
            is_compliant: true,
            reasons: vec![],
        }
        .into_report();
        assert_eq!(report.compliance_score, 100.0);
        report.compliance_score = 80.0;
        assert!(!report.is_compliant());
        report.compliance_score = 80.5;
        assert!(report.is_compliant());
    }

    #[test]
    fn test_issue_text_fallbacks() {
        let issue = Issue::Detail(IssueDetail {
            suggestion: Some("Add origin".into()),
            ..Default::default()
        });
        assert_eq!(issue.text(), "Add origin");
        assert_eq!(Issue::Detail(IssueDetail::default()).text(), "Unknown issue");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(85.0), "85");
        assert_eq!(format_score(42.86), "42.86");
        assert_eq!(format_score(66.7), "66.7");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ComplianceReport {
            compliance_score: 85.0,
            issues: vec![Issue::Text("x".into())],
            recommendations: vec![],
            fallback: true,
            product_title: Some("Atta".into()),
            product_price: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["complianceScore"], json!(85.0));
        assert_eq!(value["fallback"], json!(true));
        assert_eq!(value["productTitle"], json!("Atta"));
        assert!(value.get("productPrice").is_none());
    }
}
