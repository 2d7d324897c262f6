// SPDX-License-Identifier: Apache-2.0
//! Per-key match report: where each allowed value shows up in a snapshot,
//! exactly or approximately. Used to author expected configs and key maps
//! from a known-good machine.

use std::io::{self, Write};

use confaudit_core::normalize_key;
use confaudit_model::{ExpectedConfig, ExpectedValue, Scalar, Snapshot};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::device::is_device_model_key;
use crate::similarity::{round4, similarity_ratio};
use crate::traverse::leaves;

pub const DEFAULT_MATCH_REPORT_MIN_SIMILARITY: f64 = 0.2;

pub const MATCH_TABLE_HEADER: &str =
    "config_key,best_allowed,similarity,source_path,source_value,exact_match";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactMatch {
    pub path: String,
    pub value: Value,
    pub allowed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyBest {
    pub allowed_value: String,
    pub similarity: f64,
    pub source_value: String,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafMatch {
    pub path: String,
    pub value: Value,
    pub best_allowed: String,
    pub similarity: f64,
}

/// A comma-separated device description split into labelled parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMatchReport {
    #[serde(skip)]
    pub key: String,
    pub allowed: Vec<String>,
    pub exact_matches: Vec<ExactMatch>,
    pub fuzzy_best: Option<FuzzyBest>,
    pub all_matches: Vec<LeafMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_details: Option<DeviceDetails>,
}

/// Entries in config order; serializes as an object keyed by config key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub entries: Vec<KeyMatchReport>,
}

impl MatchReport {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KeyMatchReport> {
        self.entries.iter().find(|entry| entry.key == key)
    }
}

impl Serialize for MatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, entry)?;
        }
        map.end()
    }
}

const OS_MARKERS: [&str; 3] = ["windows", "linux", "mac"];
const CPU_MARKERS: [&str; 4] = ["intel", "amd", "ryzen", "xeon"];
const GPU_MARKERS: [&str; 4] = ["nvidia", "radeon", "geforce", "rx"];
const MEMORY_MARKERS: [&str; 2] = ["ram", "gb"];
const STORAGE_MARKERS: [&str; 3] = ["ssd", "hdd", "disk"];

/// The first comma-separated part is the summary; later parts are labelled
/// by the first marker family they contain, and a later part overwrites an
/// earlier one with the same label. Unlabelled parts are joined into `misc`.
#[must_use]
pub fn parse_device_description(description: &str) -> DeviceDetails {
    let mut parts = description.split(',').map(str::trim).filter(|p| !p.is_empty());
    let mut details = DeviceDetails {
        summary: parts.next().map(str::to_string),
        ..DeviceDetails::default()
    };
    let mut misc = Vec::new();
    for part in parts {
        let lower = part.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
        let slot = if has(&OS_MARKERS) {
            &mut details.os
        } else if has(&CPU_MARKERS) {
            &mut details.cpu
        } else if has(&GPU_MARKERS) {
            &mut details.gpu
        } else if has(&MEMORY_MARKERS) {
            &mut details.memory
        } else if has(&STORAGE_MARKERS) {
            &mut details.storage
        } else {
            misc.push(part);
            continue;
        };
        *slot = Some(part.to_string());
    }
    if !misc.is_empty() {
        details.misc = Some(misc.join(", "));
    }
    details
}

/// Allowed values as text: choices and list items one by one, anything
/// else as its display text. `null` allows nothing.
fn allowed_values(expected: &ExpectedValue) -> Vec<String> {
    match expected {
        ExpectedValue::Choices(choices) => choices.clone(),
        ExpectedValue::List(items) => items
            .iter()
            .map(ExpectedValue::display_text)
            .filter(|text| !text.is_empty())
            .collect(),
        ExpectedValue::Scalar(Scalar::Null) => Vec::new(),
        other => vec![other.display_text()],
    }
}

struct Leaf {
    path: String,
    value: Value,
    text: String,
}

/// Scans every non-null leaf against each key's allowed values. Leaves whose
/// best score is below `min_similarity` are left out of `all_matches`.
#[must_use]
pub fn generate_match_report(
    snapshot: &Snapshot,
    config: &ExpectedConfig,
    min_similarity: f64,
) -> MatchReport {
    let leaves: Vec<Leaf> = leaves(snapshot)
        .into_iter()
        .filter(|(_, node)| !node.is_null())
        .map(|(path, node)| Leaf {
            path,
            value: node.to_json(),
            text: node.display_text().trim().to_lowercase(),
        })
        .collect();

    let entries = config
        .iter()
        .map(|(key, expected)| {
            key_report(key, allowed_values(expected), &leaves, min_similarity)
        })
        .collect();
    MatchReport { entries }
}

fn key_report(
    key: &str,
    allowed: Vec<String>,
    leaves: &[Leaf],
    min_similarity: f64,
) -> KeyMatchReport {
    let lowered: Vec<String> = allowed.iter().map(|a| a.trim().to_lowercase()).collect();

    let mut exact_matches = Vec::new();
    for leaf in leaves {
        for (original, wanted) in allowed.iter().zip(&lowered) {
            if leaf.text == *wanted {
                exact_matches.push(ExactMatch {
                    path: leaf.path.clone(),
                    value: leaf.value.clone(),
                    allowed: original.clone(),
                });
            }
        }
    }

    let mut fuzzy: Option<(usize, &Leaf, f64)> = None;
    let mut all_matches = Vec::new();
    for leaf in leaves {
        let mut best_for_leaf: Option<(usize, f64)> = None;
        for (index, wanted) in lowered.iter().enumerate() {
            let score = similarity_ratio(wanted, &leaf.text);
            if best_for_leaf.map_or(true, |(_, top)| score > top) {
                best_for_leaf = Some((index, score));
            }
            if score > 0.0 && fuzzy.map_or(true, |(_, _, top)| score > top) {
                fuzzy = Some((index, leaf, score));
            }
        }
        if let Some((index, score)) = best_for_leaf.filter(|(_, s)| *s >= min_similarity) {
            all_matches.push(LeafMatch {
                path: leaf.path.clone(),
                value: leaf.value.clone(),
                best_allowed: allowed[index].clone(),
                similarity: round4(score),
            });
        }
    }
    all_matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    let fuzzy_best = fuzzy.map(|(index, leaf, score)| FuzzyBest {
        allowed_value: allowed[index].clone(),
        similarity: round4(score),
        source_value: leaf.value.as_str().map_or_else(|| leaf.value.to_string(), str::to_string),
        source_path: leaf.path.clone(),
    });

    let device_details = if is_device_model_key(&normalize_key(key)) {
        let chosen = match exact_matches.first() {
            Some(hit) => hit.value.as_str().map(str::to_string),
            None => fuzzy_best.as_ref().map(|best| best.allowed_value.clone()),
        };
        chosen.map(|text| parse_device_description(&text))
    } else {
        None
    };

    debug!(
        key,
        exact = exact_matches.len(),
        candidates = all_matches.len(),
        "match report entry"
    );
    KeyMatchReport {
        key: key.to_string(),
        allowed,
        exact_matches,
        fuzzy_best,
        all_matches,
        device_details,
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// One row per key with its best fuzzy hit; columns follow
/// [`MATCH_TABLE_HEADER`] and are blank when nothing resembled the key.
pub fn write_match_table<W: Write>(report: &MatchReport, mut out: W) -> io::Result<()> {
    writeln!(out, "{MATCH_TABLE_HEADER}")?;
    for entry in &report.entries {
        let (allowed, similarity, path, value) = match &entry.fuzzy_best {
            Some(best) => (
                best.allowed_value.as_str(),
                best.similarity.to_string(),
                best.source_path.as_str(),
                best.source_value.as_str(),
            ),
            None => ("", String::new(), "", ""),
        };
        writeln!(
            out,
            "{},{},{},{},{},{}",
            csv_field(&entry.key),
            csv_field(allowed),
            similarity,
            csv_field(path),
            csv_field(value),
            !entry.exact_matches.is_empty()
        )?;
    }
    Ok(())
}
