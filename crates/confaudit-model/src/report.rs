// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expected::ExpectedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Status {
    Matched,
    Partial,
    Mismatched,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Partial => "partial",
            Self::Mismatched => "mismatched",
        }
    }
}

/// Ordinal: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Which lookup produced the actual value; diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    KeyMap,
    Path,
    CaseInsensitive,
    Normalized,
    Alias,
    DeepSearch,
    Synthesized,
    Identity,
    Unresolved,
}

impl ResolvedVia {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyMap => "key_map",
            Self::Path => "path",
            Self::CaseInsensitive => "case_insensitive",
            Self::Normalized => "normalized",
            Self::Alias => "alias",
            Self::DeepSearch => "deep_search",
            Self::Synthesized => "synthesized",
            Self::Identity => "identity",
            Self::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub key: String,
    pub expected: ExpectedValue,
    pub actual: Option<Value>,
    pub status: Status,
    pub severity: Severity,
    pub explanation: String,
    pub resolved_via: ResolvedVia,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub key: String,
    pub suggestion: String,
    pub impact: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub summary: String,
    pub match_percentage: u32,
    pub matched_count: usize,
    pub partial_count: usize,
    pub mismatched_count: usize,
    pub total_checks: usize,
    pub mismatch_ratio: f64,
    pub likely_wrong_expectation: bool,
    /// sha256 of the canonical expected config, to tell expectation sets apart.
    pub expectation_digest: String,
    pub details: Vec<CheckResult>,
    pub recommendations: Vec<Recommendation>,
}

impl ValidationReport {
    pub fn check(&self, key: &str) -> Option<&CheckResult> {
        self.details.iter().find(|d| d.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckResult, ResolvedVia, Severity, Status};
    use crate::ExpectedValue;
    use serde_json::json;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(
            [Severity::Medium, Severity::High, Severity::Low].iter().max(),
            Some(&Severity::High)
        );
    }

    #[test]
    fn check_result_wire_shape_is_camel_case() {
        let check = CheckResult {
            key: "dpiScaling".to_string(),
            expected: ExpectedValue::text("125%"),
            actual: Some(json!(120)),
            status: Status::Matched,
            severity: Severity::Low,
            explanation: "DPI scaling matched (120 -> 125%)".to_string(),
            resolved_via: ResolvedVia::Alias,
            resolved_key: Some("ui.dpi".to_string()),
        };
        let value = serde_json::to_value(&check).expect("encode");
        assert_eq!(
            value,
            json!({
                "key": "dpiScaling",
                "expected": "125%",
                "actual": 120,
                "status": "matched",
                "severity": "low",
                "explanation": "DPI scaling matched (120 -> 125%)",
                "resolvedVia": "alias",
                "resolvedKey": "ui.dpi"
            })
        );
    }
}
