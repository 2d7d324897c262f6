// SPDX-License-Identifier: Apache-2.0
//! Alias candidates for config keys whose snapshot names differ.
//!
//! Keys are normalized config keys; candidates are snapshot paths tried in
//! order with the ordinary path walk.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use confaudit_core::normalize_key;

/// Device/model keys only alias each other; when neither exists the engine
/// synthesizes a description from hardware fields instead.
const DEVICE_MODEL_NAMES: &[&str] = &["devicemodel", "deviceandmodel", "device_model"];

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "seriesno",
        &[
            "seriesno",
            "biosserialnumber",
            "csname",
            "osregistereduser",
            "osregisteredowner",
            "csprimaryownername",
            "csusername",
        ],
    ),
    ("devicemodel", DEVICE_MODEL_NAMES),
    ("deviceandmodel", DEVICE_MODEL_NAMES),
    (
        "oslanguage",
        &["oslanguage", "oslocale", "os_locale", "osmuilanguages"],
    ),
    ("applanguage", &["applanguage", "osmuilanguages", "oslanguage"]),
    (
        "keyboardinputlayout",
        &[
            "keyboardinputlayout",
            "keyboardlayout",
            "keyboardlayoutname",
            "ui.keyboard_layout",
        ],
    ),
    (
        "network",
        &[
            "network",
            "net_if_addrs",
            "ipaddresses",
            "csnetworkadapters",
            "connectionid",
        ],
    ),
    (
        "userlicense",
        &["userlicense", "osregistereduser", "csprimaryownername"],
    ),
    (
        "installmethod",
        &["installmethod", "installationtype", "windowsinstallationtype"],
    ),
    (
        "installlocation",
        &["installlocation", "oswindowsdirectory", "ossystemdirectory"],
    ),
    (
        "userdirectorylocation",
        &[
            "userdirectorylocation",
            "userprofile",
            "homedirectory",
            "userdirectory",
        ],
    ),
    ("ostheme", &["ostheme", "theme", "ui.theme"]),
    (
        "resolution",
        &[
            "resolution",
            "screenresolution",
            "displayresolution",
            "ui.displays",
        ],
    ),
    (
        "dpiscaling",
        &["dpiscaling", "dpiscale", "scaling", "ui.dpi", "ui.displays"],
    ),
    (
        "monitors",
        &[
            "monitors",
            "display",
            "screens",
            "video_controllers",
            "ui.displays",
        ],
    ),
    ("inputdevice", &["inputdevice", "ui.mouse", "mouse", "keyboard"]),
    ("branchbetastable", &["branchbetastable", "branch", "channel", "release"]),
];

/// Immutable table from normalized key to ordered snapshot paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    /// The built-in table, built once per process.
    pub fn builtin() -> &'static AliasTable {
        static TABLE: OnceLock<AliasTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            AliasTable::from_entries(BUILTIN.iter().map(|(key, candidates)| {
                (*key, candidates.iter().map(|c| (*c).to_string()).collect())
            }))
        })
    }

    /// Keys are normalized; duplicate candidates keep their first position.
    pub fn from_entries<'k, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'k str, Vec<String>)>,
    {
        let mut table = Self::default();
        for (key, candidates) in entries {
            table.append(key, candidates);
        }
        table
    }

    /// Copy of `self` with `extra` candidates appended after existing ones.
    #[must_use]
    pub fn extended(&self, extra: &BTreeMap<String, Vec<String>>) -> Self {
        let mut table = self.clone();
        for (key, candidates) in extra {
            table.append(key, candidates.clone());
        }
        table
    }

    fn append(&mut self, key: &str, candidates: Vec<String>) {
        let key = normalize_key(key);
        if key.is_empty() {
            return;
        }
        let slot = self.entries.entry(key).or_default();
        for candidate in candidates {
            let candidate = candidate.trim().to_string();
            if !candidate.is_empty() && !slot.contains(&candidate) {
                slot.push(candidate);
            }
        }
    }

    #[must_use]
    pub fn candidates(&self, normalized_key: &str) -> &[String] {
        self.entries
            .get(normalized_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
