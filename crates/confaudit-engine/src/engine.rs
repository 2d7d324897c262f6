// SPDX-License-Identifier: Apache-2.0
//! Report synthesis: one check per expected entry, then totals.

use std::borrow::Cow;

use confaudit_core::canonical::stable_json_hash_hex;
use confaudit_core::normalize_key;
use confaudit_model::{
    CheckResult, ExpectedConfig, ExpectedValue, NodeRef, Recommendation, ResolvedVia, Snapshot,
    Status, ValidationReport,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::aliases::AliasTable;
use crate::comparator::{Comparator, Verdict};
use crate::device::{compare_device_tokens, is_device_model_key, synthesize_device_model};
use crate::identity::{check_identity, is_identity_check};
use crate::options::EngineOptions;
use crate::resolver::{KeyMap, KeyResolver};
use crate::similarity::round4;

/// Validation entry point holding options, the alias table and an optional
/// key map. Cheap to share across threads; `validate` takes `&self`.
#[derive(Debug, Clone)]
pub struct Engine {
    options: EngineOptions,
    aliases: Cow<'static, AliasTable>,
    key_map: Option<KeyMap>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Engine {
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        let aliases = if options.aliases.is_empty() {
            Cow::Borrowed(AliasTable::builtin())
        } else {
            Cow::Owned(AliasTable::builtin().extended(&options.aliases))
        };
        Self {
            options,
            aliases,
            key_map: None,
        }
    }

    #[must_use]
    pub fn with_key_map(mut self, key_map: KeyMap) -> Self {
        self.key_map = Some(key_map);
        self
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub fn resolver(&self) -> KeyResolver<'_> {
        KeyResolver::new(
            &self.aliases,
            self.key_map.as_ref(),
            self.options.deep_search_max_depth,
        )
    }

    #[must_use]
    pub fn comparator(&self) -> Comparator<'_> {
        Comparator::new(self.resolver(), self.options.fuzzy_match_threshold)
    }

    /// Total over its inputs: every entry of `config` yields exactly one
    /// check, in config order.
    #[must_use]
    pub fn validate(&self, snapshot: &Snapshot, config: &ExpectedConfig) -> ValidationReport {
        let root = snapshot.root();
        let details: Vec<CheckResult> = config
            .iter()
            .map(|(key, expected)| self.check_entry(root, key, expected))
            .collect();

        let total = details.len();
        let count = |status: Status| details.iter().filter(|d| d.status == status).count();
        let matched = count(Status::Matched);
        let partial = count(Status::Partial);
        let mismatched = count(Status::Mismatched);

        let match_percentage = if total == 0 {
            0
        } else {
            ((matched as f64 / total as f64) * 100.0).round() as u32
        };
        let mismatch_ratio = if total == 0 {
            0.0
        } else {
            mismatched as f64 / total as f64
        };
        let likely_wrong_expectation =
            total > 0 && mismatch_ratio >= self.options.wrong_expectation_ratio;

        let recommendations = details
            .iter()
            .filter(|d| d.status != Status::Matched)
            .map(recommend)
            .collect();

        info!(
            total,
            matched,
            partial,
            mismatched,
            match_percentage,
            likely_wrong_expectation,
            "validation finished"
        );

        ValidationReport {
            summary: format!("Validation performed: {match_percentage}% checks matched"),
            match_percentage,
            matched_count: matched,
            partial_count: partial,
            mismatched_count: mismatched,
            total_checks: total,
            mismatch_ratio: round4(mismatch_ratio),
            likely_wrong_expectation,
            expectation_digest: stable_json_hash_hex(&config.to_json()).unwrap_or_default(),
            details,
            recommendations,
        }
    }

    fn check_entry(&self, root: NodeRef<'_>, key: &str, expected: &ExpectedValue) -> CheckResult {
        let resolver = self.resolver();

        if is_identity_check(key, expected.as_text()) {
            let text = expected.as_text().unwrap_or_default();
            let identity = check_identity(&resolver, root, text);
            debug!(key, status = identity.verdict.status.as_str(), "identity check");
            return build_check(
                key,
                expected,
                identity.observed.map(Value::String),
                identity.verdict,
                ResolvedVia::Identity,
                None,
            );
        }

        let resolution = resolver.resolve(root, key);
        if resolution.value.is_none() && is_device_model_key(&normalize_key(key)) {
            let candidates: Vec<&str> = match expected {
                ExpectedValue::Choices(choices) => choices.iter().map(String::as_str).collect(),
                other => other.as_text().into_iter().collect(),
            };
            let synthesized = if candidates.is_empty() {
                None
            } else {
                synthesize_device_model(&resolver, root)
            };
            if let Some(synthesized) = synthesized {
                let verdict = candidates
                    .iter()
                    .map(|text| compare_device_tokens(text, &synthesized))
                    .min_by_key(Verdict::rank)
                    .unwrap_or_else(|| Verdict::partial("No device description expected"));
                debug!(key, synthesized = %synthesized, "device model synthesized");
                return build_check(
                    key,
                    expected,
                    Some(Value::String(synthesized)),
                    verdict,
                    ResolvedVia::Synthesized,
                    None,
                );
            }
        }

        let verdict = self
            .comparator()
            .compare(root, key, expected, resolution.value)
            .unwrap_or_else(|err| {
                warn!(key, error = %err, "comparison fault downgraded to partial");
                Verdict::partial(format!("comparison fault: {err}"))
            });
        build_check(
            key,
            expected,
            resolution.value.map(NodeRef::to_json),
            verdict,
            resolution.via,
            resolution.matched_key.map(str::to_string),
        )
    }
}

/// Validates with default options and no key map.
#[must_use]
pub fn validate(snapshot: &Snapshot, config: &ExpectedConfig) -> ValidationReport {
    Engine::default().validate(snapshot, config)
}

fn build_check(
    key: &str,
    expected: &ExpectedValue,
    actual: Option<Value>,
    verdict: Verdict,
    resolved_via: ResolvedVia,
    resolved_key: Option<String>,
) -> CheckResult {
    CheckResult {
        key: key.to_string(),
        expected: expected.clone(),
        actual,
        status: verdict.status,
        severity: verdict.severity,
        explanation: verdict.explanation,
        resolved_via,
        resolved_key,
    }
}

fn recommend(check: &CheckResult) -> Recommendation {
    let actual = match &check.actual {
        None => "missing".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Recommendation {
        key: check.key.clone(),
        suggestion: format!(
            "Review expected {}; actual: {actual}",
            check.expected.display_text()
        ),
        impact: check.severity,
    }
}
