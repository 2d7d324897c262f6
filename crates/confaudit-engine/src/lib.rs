// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]
//! Validation engine: resolves expected-config keys against a snapshot,
//! compares values, and synthesizes a [`ValidationReport`].
//!
//! ```
//! use confaudit_engine::{parse_expected_config, parse_snapshot, Engine};
//!
//! let snapshot = parse_snapshot(r#"{"ui": {"dpi": 120}}"#).expect("snapshot");
//! let config = parse_expected_config("dpiScaling: 125%\n").expect("config");
//! let report = Engine::default().validate(&snapshot, &config);
//! assert_eq!(report.match_percentage, 100);
//! ```
//!
//! [`ValidationReport`]: confaudit_model::ValidationReport

mod aliases;
mod comparator;
mod device;
mod engine;
mod explore;
mod heuristics;
mod identity;
mod loader;
mod match_report;
mod options;
mod resolver;
mod similarity;
mod traverse;

pub use aliases::AliasTable;
pub use comparator::{CompareError, Comparator, Verdict};
pub use engine::{validate, Engine};
pub use explore::{
    find_all_matches, flatten_snapshot_paths, suggest_mappings, MappingSuggestion, ValueMatch,
};
pub use loader::{
    load_expected_config, load_key_map, load_snapshot, parse_expected_config, parse_key_map,
    parse_snapshot, LoadError,
};
pub use match_report::{
    generate_match_report, parse_device_description, write_match_table, DeviceDetails,
    ExactMatch, FuzzyBest, KeyMatchReport, LeafMatch, MatchReport,
    DEFAULT_MATCH_REPORT_MIN_SIMILARITY, MATCH_TABLE_HEADER,
};
pub use options::{
    EngineOptions, OptionsError, ResolvedOptions, DEFAULT_DEEP_SEARCH_MAX_DEPTH,
    DEFAULT_FUZZY_MATCH_THRESHOLD, DEFAULT_SUGGESTION_THRESHOLD, DEFAULT_WRONG_EXPECTATION_RATIO,
    ENV_DEEP_SEARCH_DEPTH, ENV_FUZZY_THRESHOLD, ENV_SUGGESTION_THRESHOLD,
    ENV_WRONG_EXPECTATION_RATIO,
};
pub use resolver::{lookup_path, KeyMap, KeyResolver, Resolution};
pub use similarity::similarity_ratio;

pub const CRATE_NAME: &str = "confaudit-engine";
