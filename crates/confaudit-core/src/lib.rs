// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]
//! Leaf crate shared by every confaudit component.
//!
//! Holds the key/value normalizer, canonical JSON helpers, the machine error
//! envelope printed by the CLI, and config-path resolution.

pub mod canonical;
mod errors;
pub mod normalize;
mod paths;

pub use errors::{ExitCode, MachineError};
pub use normalize::{normalize_key, normalize_value_for_match};
pub use paths::{
    resolve_config_path, ConfigPathScope, ENV_CONFAUDIT_CONFIG, ENV_CONFAUDIT_LOG_JSON,
    ENV_CONFAUDIT_LOG_LEVEL,
};

pub const CRATE_NAME: &str = "confaudit-core";
