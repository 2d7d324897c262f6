// SPDX-License-Identifier: Apache-2.0
//! Expected-versus-actual comparison producing a status, severity and
//! explanation.
//!
//! Dispatch is on the [`ExpectedValue`] tag. Field heuristics registered for
//! the normalized key run first and may decline; an absent actual value is
//! always `mismatched/high`.

use std::fmt::{Display, Formatter};

use confaudit_core::normalize_key;
use confaudit_model::{ExpectedValue, Node, NodeRef, Scalar, Severity, Status};
use tracing::debug;

use crate::device::{compare_device_tokens, is_device_model_key};
use crate::heuristics::{display_number, heuristic_for, FieldContext};
use crate::resolver::KeyResolver;
use crate::similarity::similarity_ratio;
use crate::traverse::deep_value_contains;

const GIB: f64 = 1_073_741_824.0;
const DEFAULT_LOCATION_FIELDS: &[&str] = &["OsWindowsDirectory", "UserProfile"];
const ADMIN_EVIDENCE_FIELDS: &[&str] = &["OsRegisteredUser", "CsPrimaryOwnerName"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    pub severity: Severity,
    pub explanation: String,
}

impl Verdict {
    #[must_use]
    pub fn matched(explanation: impl Into<String>) -> Self {
        Self {
            status: Status::Matched,
            severity: Severity::Low,
            explanation: explanation.into(),
        }
    }

    #[must_use]
    pub fn partial(explanation: impl Into<String>) -> Self {
        Self {
            status: Status::Partial,
            severity: Severity::Medium,
            explanation: explanation.into(),
        }
    }

    #[must_use]
    pub fn mismatched(severity: Severity, explanation: impl Into<String>) -> Self {
        Self {
            status: Status::Mismatched,
            severity,
            explanation: explanation.into(),
        }
    }

    /// Lower is better: status first, then severity.
    pub(crate) fn rank(&self) -> (u8, Severity) {
        let status = match self.status {
            Status::Matched => 0,
            Status::Partial => 1,
            Status::Mismatched => 2,
            _ => 3,
        };
        (status, self.severity)
    }
}

/// Internal comparison fault. The report synthesizer records it as a
/// `partial/medium` check instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompareError {
    InvalidPercentage(String),
    NonFiniteExpectation(String),
    EmptySubKey { parent: String },
    NoChoices(String),
}

impl Display for CompareError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPercentage(raw) => write!(f, "invalid percentage `{raw}`"),
            Self::NonFiniteExpectation(key) => {
                write!(f, "expected number for `{key}` is not finite")
            }
            Self::EmptySubKey { parent } => write!(f, "empty nested key under `{parent}`"),
            Self::NoChoices(key) => write!(f, "no choices declared for `{key}`"),
        }
    }
}

impl std::error::Error for CompareError {}

#[derive(Debug, Clone, Copy)]
pub struct Comparator<'e> {
    resolver: KeyResolver<'e>,
    fuzzy_threshold: f64,
}

impl<'e> Comparator<'e> {
    #[must_use]
    pub fn new(resolver: KeyResolver<'e>, fuzzy_threshold: f64) -> Self {
        Self {
            resolver,
            fuzzy_threshold,
        }
    }

    /// `root` is the whole snapshot, used for corroborating lookups; `actual`
    /// is the resolved value for `key`, if any.
    pub fn compare<'a>(
        &self,
        root: NodeRef<'a>,
        key: &str,
        expected: &ExpectedValue,
        actual: Option<NodeRef<'a>>,
    ) -> Result<Verdict, CompareError>
    where
        'e: 'a,
    {
        if let ExpectedValue::Choices(choices) = expected {
            return self.compare_choices(root, key, choices, actual);
        }
        let actual = actual.filter(|a| !a.is_null());
        let normalized = normalize_key(key);

        if let (Some(text), Some(heuristic)) = (expected.as_text(), heuristic_for(&normalized)) {
            let ctx = FieldContext {
                resolver: self.resolver,
                root,
                actual,
            };
            if let Some(verdict) = heuristic(&ctx, text)? {
                debug!(
                    key,
                    heuristic = %normalized,
                    status = verdict.status.as_str(),
                    "field heuristic decided"
                );
                return Ok(verdict);
            }
        }

        let Some(actual) = actual else {
            return Ok(Verdict::mismatched(
                Severity::High,
                format!(
                    "Field missing in snapshot (expected: {})",
                    expected.display_text()
                ),
            ));
        };

        if is_device_model_key(&normalized) {
            if let (Some(text), Some(actual_text)) = (expected.as_text(), actual.as_str()) {
                return Ok(compare_device_tokens(text, actual_text));
            }
        }

        match expected {
            ExpectedValue::Scalar(Scalar::Number(n)) => compare_number(key, *n, actual),
            ExpectedValue::Scalar(Scalar::Text(text)) => Ok(self.compare_text(root, text, actual)),
            ExpectedValue::Scalar(scalar) => Ok(compare_exact(scalar, actual)),
            ExpectedValue::List(items) => Ok(compare_list(items, actual)),
            ExpectedValue::Mapping(entries) => self.compare_mapping(root, key, entries, actual),
            ExpectedValue::Choices(choices) => {
                self.compare_choices(root, key, choices, Some(actual))
            }
        }
    }

    /// Each choice is compared as text; the first match wins, otherwise the
    /// closest verdict (lowest status, then severity) is kept.
    fn compare_choices<'a>(
        &self,
        root: NodeRef<'a>,
        key: &str,
        choices: &[String],
        actual: Option<NodeRef<'a>>,
    ) -> Result<Verdict, CompareError>
    where
        'e: 'a,
    {
        let mut best: Option<(&str, Verdict)> = None;
        for choice in choices {
            let verdict = self.compare(root, key, &ExpectedValue::text(choice.as_str()), actual)?;
            if verdict.status == Status::Matched {
                return Ok(Verdict {
                    explanation: format!("Choice '{choice}': {}", verdict.explanation),
                    ..verdict
                });
            }
            if best
                .as_ref()
                .map_or(true, |(_, top)| verdict.rank() < top.rank())
            {
                best = Some((choice.as_str(), verdict));
            }
        }
        let Some((choice, verdict)) = best else {
            return Err(CompareError::NoChoices(key.to_string()));
        };
        Ok(Verdict {
            explanation: format!(
                "None of {} choices matched; closest '{choice}': {}",
                choices.len(),
                verdict.explanation
            ),
            ..verdict
        })
    }

    fn compare_mapping<'a>(
        &self,
        root: NodeRef<'a>,
        key: &str,
        entries: &[(String, ExpectedValue)],
        actual: NodeRef<'a>,
    ) -> Result<Verdict, CompareError>
    where
        'e: 'a,
    {
        if entries.is_empty() {
            return Ok(Verdict::matched("Nested checks: none"));
        }
        let mut worst = Severity::Low;
        let mut all_matched = true;
        let mut parts = Vec::with_capacity(entries.len());
        for (sub_key, sub_expected) in entries {
            if sub_key.is_empty() {
                return Err(CompareError::EmptySubKey {
                    parent: key.to_string(),
                });
            }
            let sub_actual = if actual.is_map() {
                self.resolver.resolve(actual, sub_key).value
            } else {
                None
            };
            let verdict = self.compare(root, sub_key, sub_expected, sub_actual)?;
            worst = worst.max(verdict.severity);
            all_matched &= verdict.status == Status::Matched;
            parts.push(format!("{sub_key}={}", verdict.status.as_str()));
        }
        let explanation = format!("Nested checks: {}", parts.join(", "));
        Ok(Verdict {
            status: if all_matched {
                Status::Matched
            } else {
                Status::Partial
            },
            severity: worst,
            explanation,
        })
    }

    fn deep_contains(&self, root: NodeRef<'_>, token: &str) -> bool {
        deep_value_contains(root, token, self.resolver.max_depth())
    }

    fn compare_text<'a>(&self, root: NodeRef<'a>, expected: &str, actual: NodeRef<'a>) -> Verdict {
        let expected_norm = normalize_key(expected);

        if actual.is_seq() {
            if is_english(expected)
                && actual
                    .items()
                    .any(|item| normalize_key(item.display_text()).starts_with("en"))
            {
                return Verdict::matched("Language shorthand matched (English ~ en)");
            }
            if !expected_norm.is_empty() && actual.match_text().contains(&expected_norm) {
                return Verdict::matched("Expected token contained in actual list");
            }
            return self.fallback_scan(root, &expected_norm, "a list");
        }
        if actual.is_map() {
            return self.fallback_scan(root, &expected_norm, "a mapping");
        }

        let actual_text = actual.display_text();
        let actual_norm = actual.match_text();

        if actual_text.trim().to_lowercase() == expected.trim().to_lowercase() {
            return Verdict::matched("Exact match (case-insensitive)");
        }
        if !expected_norm.is_empty() && expected_norm == actual_norm {
            return Verdict::matched("Normalized exact match");
        }
        if !expected_norm.is_empty() && actual_norm.contains(&expected_norm) {
            return Verdict::matched("Expected token contained in actual");
        }
        if !actual_norm.is_empty() && expected_norm.contains(&actual_norm) {
            return Verdict::matched("Actual token contained in expected");
        }
        if is_english(expected) && actual_norm.starts_with("en") {
            return Verdict::matched("Language shorthand matched (English ~ en)");
        }

        if expected.trim().eq_ignore_ascii_case("default") {
            let lowered = actual_text.to_lowercase();
            if lowered.contains("windows")
                || lowered.contains("users")
                || lowered.starts_with("c:\\")
            {
                return Verdict::matched(format!("Default location matched ({actual_text})"));
            }
            if let Some(field) = DEFAULT_LOCATION_FIELDS
                .iter()
                .find(|field| self.resolver.locate(root, field).is_some())
            {
                return Verdict::matched(format!("Default location inferred from {field}"));
            }
        }

        let lowered = expected.to_lowercase();
        if lowered.contains("clean") && lowered.contains("admin") {
            let owner = ADMIN_EVIDENCE_FIELDS.iter().find_map(|field| {
                self.resolver
                    .locate(root, field)
                    .map(|value| (*field, value.display_text()))
            });
            return match owner {
                Some((field, value)) if value.to_lowercase().contains("admin") => {
                    Verdict::partial(format!("Inferred admin install from {field} ({value})"))
                }
                _ => Verdict::partial("Install method not recorded; admin install not confirmed"),
            };
        }

        if !expected_norm.is_empty() && !actual_norm.is_empty() {
            let ratio = similarity_ratio(&expected_norm, &actual_norm);
            if ratio >= self.fuzzy_threshold {
                return Verdict::partial(format!("Fuzzy match (similarity {ratio:.2})"));
            }
        }
        if self.deep_contains(root, &expected_norm) {
            return Verdict::partial("Expected token found elsewhere in snapshot");
        }
        Verdict::mismatched(
            Severity::High,
            format!("Expected '{expected}', found '{actual_text}'"),
        )
    }

    fn fallback_scan(&self, root: NodeRef<'_>, expected_norm: &str, shape: &str) -> Verdict {
        if self.deep_contains(root, expected_norm) {
            Verdict::partial("Expected token found elsewhere in snapshot")
        } else {
            Verdict::partial(format!("Type mismatch: expected text, snapshot has {shape}"))
        }
    }
}

fn is_english(expected: &str) -> bool {
    normalize_key(expected).starts_with("english")
}

fn compare_number(key: &str, expected: f64, actual: NodeRef<'_>) -> Result<Verdict, CompareError> {
    if !expected.is_finite() {
        return Err(CompareError::NonFiniteExpectation(key.to_string()));
    }
    let Some(value) = actual.as_f64() else {
        return Ok(Verdict::partial(format!(
            "Could not interpret numeric comparison (actual: {})",
            actual.display_text()
        )));
    };
    let wanted = display_number(expected);
    if value > GIB {
        let gb = value / GIB;
        return Ok(if gb >= expected {
            Verdict::matched(format!("Actual {gb:.2} GB >= expected {wanted} GB"))
        } else {
            Verdict::mismatched(
                Severity::High,
                format!("Actual {gb:.2} GB < expected {wanted} GB"),
            )
        });
    }
    let got = display_number(value);
    Ok(if value >= expected {
        Verdict::matched(format!("Actual {got} >= expected {wanted}"))
    } else {
        Verdict::mismatched(Severity::Medium, format!("Actual {got} < expected {wanted}"))
    })
}

fn compare_list(items: &[ExpectedValue], actual: NodeRef<'_>) -> Verdict {
    if !actual.is_seq() {
        return Verdict::partial("Expected a list; snapshot value is not a list");
    }
    let missing: Vec<String> = items
        .iter()
        .filter(|item| !actual.items().any(|candidate| value_eq(item, candidate)))
        .map(ExpectedValue::display_text)
        .collect();
    if missing.is_empty() {
        Verdict::matched("All expected items present")
    } else {
        Verdict::partial(format!("Missing items: {}", missing.join(", ")))
    }
}

fn compare_exact(expected: &Scalar, actual: NodeRef<'_>) -> Verdict {
    let wanted = ExpectedValue::Scalar(expected.clone());
    if value_eq(&wanted, actual) {
        Verdict::matched("Exact match")
    } else {
        Verdict::mismatched(
            Severity::Medium,
            format!(
                "Expected {}, actual {}",
                wanted.to_json(),
                actual.display_text()
            ),
        )
    }
}

/// Structural equality; recursion follows the finite expected value, so
/// cyclic snapshots are safe.
fn value_eq(expected: &ExpectedValue, actual: NodeRef<'_>) -> bool {
    match (expected, actual.node()) {
        (ExpectedValue::Scalar(Scalar::Null), Node::Null) => true,
        (ExpectedValue::Scalar(Scalar::Bool(b)), Node::Bool(a)) => a == b,
        (ExpectedValue::Scalar(Scalar::Bool(b)), Node::String(s)) => {
            s.trim().eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        (ExpectedValue::Scalar(Scalar::Number(n)), Node::Number(a)) => a.as_f64() == Some(*n),
        (ExpectedValue::Scalar(Scalar::Text(t)), Node::String(s)) => s == t,
        (ExpectedValue::List(items), Node::Seq(ids)) => {
            items.len() == ids.len()
                && items
                    .iter()
                    .zip(actual.items())
                    .all(|(e, a)| value_eq(e, a))
        }
        (ExpectedValue::Mapping(entries), Node::Map(map)) => {
            entries.len() == map.len()
                && entries
                    .iter()
                    .all(|(k, e)| actual.get(k).is_some_and(|a| value_eq(e, a)))
        }
        _ => false,
    }
}
