// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use confaudit_core::{resolve_config_path, ConfigPathScope};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FUZZY_MATCH_THRESHOLD: f64 = 0.85;
pub const DEFAULT_DEEP_SEARCH_MAX_DEPTH: usize = 8;
pub const DEFAULT_WRONG_EXPECTATION_RATIO: f64 = 0.5;
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.45;

pub const ENV_FUZZY_THRESHOLD: &str = "CONFAUDIT_FUZZY_THRESHOLD";
pub const ENV_DEEP_SEARCH_DEPTH: &str = "CONFAUDIT_DEEP_SEARCH_DEPTH";
pub const ENV_WRONG_EXPECTATION_RATIO: &str = "CONFAUDIT_WRONG_EXPECTATION_RATIO";
pub const ENV_SUGGESTION_THRESHOLD: &str = "CONFAUDIT_SUGGESTION_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineOptions {
    /// Similarity at or above which a string check is `partial` instead of
    /// `mismatched`.
    pub fuzzy_match_threshold: f64,
    pub deep_search_max_depth: usize,
    /// Share of `mismatched` checks that raises `likelyWrongExpectation`.
    pub wrong_expectation_ratio: f64,
    pub suggestion_threshold: f64,
    /// Extra alias candidates, appended after the built-in ones.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fuzzy_match_threshold: DEFAULT_FUZZY_MATCH_THRESHOLD,
            deep_search_max_depth: DEFAULT_DEEP_SEARCH_MAX_DEPTH,
            wrong_expectation_ratio: DEFAULT_WRONG_EXPECTATION_RATIO,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
            aliases: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub options: EngineOptions,
    /// Options file that was read, if any.
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionsError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    InvalidEnv { name: &'static str, value: String },
    OutOfRange { field: &'static str, value: String },
}

impl Display for OptionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "read options file {} failed: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "parse options file {} failed: {message}", path.display())
            }
            Self::InvalidEnv { name, value } => write!(f, "invalid value `{value}` for {name}"),
            Self::OutOfRange { field, value } => write!(f, "{field} out of range: {value}"),
        }
    }
}

impl std::error::Error for OptionsError {}

impl EngineOptions {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, OptionsError> {
        let options: Self = toml::from_str(text).map_err(|e| OptionsError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Explicit file, then workspace `.confaudit/config.toml`, then the user
    /// config file; defaults when none exists. Environment overrides apply
    /// last.
    pub fn load(explicit: Option<&Path>) -> Result<ResolvedOptions, OptionsError> {
        let candidates: Vec<PathBuf> = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => vec![
                resolve_config_path(ConfigPathScope::Workspace),
                resolve_config_path(ConfigPathScope::User),
            ],
        };

        let mut resolved = ResolvedOptions {
            options: Self::default(),
            source: None,
        };
        for path in candidates {
            if explicit.is_none() && !path.is_file() {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|e| OptionsError::Read {
                path: path.clone(),
                message: e.to_string(),
            })?;
            resolved.options = Self::from_toml_str(&text, &path)?;
            resolved.source = Some(path);
            break;
        }

        resolved.options = resolved
            .options
            .with_env_overrides(|name| std::env::var(name).ok())?;
        Ok(resolved)
    }

    pub fn with_env_overrides(
        mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, OptionsError> {
        if let Some(v) = env_value(&env, ENV_FUZZY_THRESHOLD) {
            self.fuzzy_match_threshold = parse_env(ENV_FUZZY_THRESHOLD, &v)?;
        }
        if let Some(v) = env_value(&env, ENV_DEEP_SEARCH_DEPTH) {
            self.deep_search_max_depth = parse_env(ENV_DEEP_SEARCH_DEPTH, &v)?;
        }
        if let Some(v) = env_value(&env, ENV_WRONG_EXPECTATION_RATIO) {
            self.wrong_expectation_ratio = parse_env(ENV_WRONG_EXPECTATION_RATIO, &v)?;
        }
        if let Some(v) = env_value(&env, ENV_SUGGESTION_THRESHOLD) {
            self.suggestion_threshold = parse_env(ENV_SUGGESTION_THRESHOLD, &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        for (field, value) in [
            ("fuzzy_match_threshold", self.fuzzy_match_threshold),
            ("wrong_expectation_ratio", self.wrong_expectation_ratio),
            ("suggestion_threshold", self.suggestion_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OptionsError::OutOfRange {
                    field,
                    value: value.to_string(),
                });
            }
        }
        if self.deep_search_max_depth == 0 {
            return Err(OptionsError::OutOfRange {
                field: "deep_search_max_depth",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_value(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, OptionsError> {
    raw.parse::<T>().map_err(|_| OptionsError::InvalidEnv {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{EngineOptions, OptionsError, ENV_DEEP_SEARCH_DEPTH, ENV_FUZZY_THRESHOLD};
    use std::path::Path;

    #[test]
    fn empty_file_yields_defaults() {
        let options = EngineOptions::from_toml_str("", Path::new("x.toml")).expect("parse");
        assert_eq!(options, EngineOptions::default());
        assert!((options.fuzzy_match_threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(options.deep_search_max_depth, 8);
    }

    #[test]
    fn aliases_and_thresholds_parse() {
        let text = r#"
fuzzy_match_threshold = 0.9

[aliases]
ostheme = ["ui.appearance"]
"#;
        let options = EngineOptions::from_toml_str(text, Path::new("x.toml")).expect("parse");
        assert!((options.fuzzy_match_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(options.aliases["ostheme"], vec!["ui.appearance".to_string()]);
    }

    #[test]
    fn unknown_fields_and_bad_ranges_are_rejected() {
        let err = EngineOptions::from_toml_str("colour = 1", Path::new("x.toml"))
            .expect_err("unknown field");
        assert!(matches!(err, OptionsError::Parse { .. }));
        let err = EngineOptions::from_toml_str("fuzzy_match_threshold = 1.5", Path::new("x.toml"))
            .expect_err("out of range");
        assert!(matches!(err, OptionsError::OutOfRange { field: "fuzzy_match_threshold", .. }));
    }

    #[test]
    fn env_overrides_apply_and_validate() {
        let options = EngineOptions::default()
            .with_env_overrides(|name| match name {
                ENV_FUZZY_THRESHOLD => Some(" 0.7 ".to_string()),
                ENV_DEEP_SEARCH_DEPTH => Some("3".to_string()),
                _ => None,
            })
            .expect("overrides");
        assert!((options.fuzzy_match_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(options.deep_search_max_depth, 3);

        let err = EngineOptions::default()
            .with_env_overrides(|name| (name == ENV_DEEP_SEARCH_DEPTH).then(|| "deep".to_string()))
            .expect_err("not a number");
        assert!(matches!(err, OptionsError::InvalidEnv { .. }));
    }
}
