// SPDX-License-Identifier: Apache-2.0
//! Input adapters: snapshot JSON, expected-config YAML (file or directory)
//! and key-map YAML.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use confaudit_model::{ExpectedConfig, ExpectedValue, ModelError, Scalar, Snapshot};
use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::resolver::KeyMap;

const CHOICES: &str = "choices";
const DEVICE_NAMES_KEY: &str = "deviceandmodel";

#[derive(Debug)]
#[non_exhaustive]
pub enum LoadError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { what: &'static str, message: String },
    Empty { what: &'static str },
    UnsupportedShape { what: &'static str, found: &'static str },
    UnsupportedListItem { index: usize, found: &'static str },
    InvalidKey { found: &'static str },
    UnsupportedCategory { index: usize, found: &'static str },
    UnnamedCategory { index: usize },
    InvalidChoice { found: &'static str },
    Model(ModelError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "read {} failed: {source}", path.display()),
            Self::Parse { what, message } => write!(f, "parse {what} failed: {message}"),
            Self::Empty { what } => write!(f, "{what} is empty"),
            Self::UnsupportedShape { what, found } => {
                write!(f, "{what} must be a mapping or a list, found {found}")
            }
            Self::UnsupportedListItem { index, found } => write!(
                f,
                "expected config list item {index} must be a single-entry mapping \
                 or a string, found {found}"
            ),
            Self::InvalidKey { found } => write!(f, "mapping keys must be scalars, found {found}"),
            Self::UnsupportedCategory { index, found } => {
                write!(f, "category {index} must be a mapping, found {found}")
            }
            Self::UnnamedCategory { index } => {
                write!(f, "category {index} has neither `category` nor `name`")
            }
            Self::InvalidChoice { found } => {
                write!(f, "choices must be scalars or non-empty lists, found {found}")
            }
            Self::Model(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for LoadError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "boolean",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "list",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(_) => "tagged value",
    }
}

fn yaml_key(value: &YamlValue) -> Result<String, LoadError> {
    match value {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        other => Err(LoadError::InvalidKey {
            found: yaml_kind(other),
        }),
    }
}

fn choice_text(value: &YamlValue) -> Result<String, LoadError> {
    match value {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Sequence(items) if !items.is_empty() => choice_text(&items[0]),
        YamlValue::Tagged(tagged) => choice_text(&tagged.value),
        other => Err(LoadError::InvalidChoice {
            found: yaml_kind(other),
        }),
    }
}

/// A list item that is itself a list contributes its first element, so
/// `[value, label]` pairs keep the value.
fn choices_from_yaml(items: &[YamlValue]) -> Result<ExpectedValue, LoadError> {
    Ok(ExpectedValue::Choices(
        items.iter().map(choice_text).collect::<Result<_, _>>()?,
    ))
}

fn expected_from_yaml(value: &YamlValue) -> Result<ExpectedValue, LoadError> {
    if let YamlValue::Mapping(map) = value {
        if let Some(YamlValue::Sequence(choices)) = map.get(CHOICES) {
            return choices_from_yaml(choices);
        }
    }
    Ok(match value {
        YamlValue::Null => ExpectedValue::Scalar(Scalar::Null),
        YamlValue::Bool(b) => ExpectedValue::Scalar(Scalar::Bool(*b)),
        YamlValue::Number(n) => ExpectedValue::number(n.as_f64().unwrap_or(f64::NAN)),
        YamlValue::String(s) => ExpectedValue::text(s.clone()),
        YamlValue::Sequence(items) => ExpectedValue::List(
            items
                .iter()
                .map(expected_from_yaml)
                .collect::<Result<_, _>>()?,
        ),
        YamlValue::Mapping(map) => ExpectedValue::Mapping(
            map.iter()
                .map(|(k, v)| Ok((yaml_key(k)?, expected_from_yaml(v)?)))
                .collect::<Result<_, LoadError>>()?,
        ),
        YamlValue::Tagged(tagged) => expected_from_yaml(&tagged.value)?,
    })
}

fn categories_config(items: &[YamlValue]) -> Result<ExpectedConfig, LoadError> {
    let mut config = ExpectedConfig::new();
    for (index, item) in items.iter().enumerate() {
        let YamlValue::Mapping(category) = item else {
            return Err(LoadError::UnsupportedCategory {
                index,
                found: yaml_kind(item),
            });
        };
        let name = category
            .get("category")
            .or_else(|| category.get("name"))
            .ok_or(LoadError::UnnamedCategory { index })?;
        let choices = match category.get(CHOICES) {
            Some(YamlValue::Sequence(choices)) => choices_from_yaml(choices)?,
            None | Some(YamlValue::Null) => ExpectedValue::Choices(Vec::new()),
            Some(other) => {
                return Err(LoadError::InvalidChoice {
                    found: yaml_kind(other),
                })
            }
        };
        config.insert(yaml_key(name)?, choices)?;
    }
    Ok(config)
}

/// Accepts:
/// - a top-level mapping; a value written as `{choices: [...]}` accepts any
///   one of the listed values,
/// - `categories: [{category | name, choices}]`, one key per category,
/// - `names: [...]`, the acceptable device descriptions (`deviceandmodel`),
/// - a list of single-entry mappings and bare strings (a bare string expects
///   nothing in particular and yields `null`).
pub fn parse_expected_config(text: &str) -> Result<ExpectedConfig, LoadError> {
    const WHAT: &str = "expected config";
    let doc: YamlValue = serde_yaml::from_str(text).map_err(|e| LoadError::Parse {
        what: WHAT,
        message: e.to_string(),
    })?;
    let mut config = ExpectedConfig::new();
    match &doc {
        YamlValue::Null => return Err(LoadError::Empty { what: WHAT }),
        YamlValue::Mapping(map) => {
            if let Some(YamlValue::Sequence(items)) = map.get("categories") {
                config = categories_config(items)?;
            } else if let Some(YamlValue::Sequence(names)) = map.get("names") {
                config.insert(DEVICE_NAMES_KEY, choices_from_yaml(names)?)?;
            } else {
                for (k, v) in map {
                    config.insert(yaml_key(k)?, expected_from_yaml(v)?)?;
                }
            }
        }
        YamlValue::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    YamlValue::Mapping(map) if map.len() == 1 => {
                        for (k, v) in map {
                            config.insert(yaml_key(k)?, expected_from_yaml(v)?)?;
                        }
                    }
                    YamlValue::String(key) => {
                        config.insert(key.clone(), ExpectedValue::Scalar(Scalar::Null))?;
                    }
                    other => {
                        return Err(LoadError::UnsupportedListItem {
                            index,
                            found: yaml_kind(other),
                        })
                    }
                }
            }
        }
        other => {
            return Err(LoadError::UnsupportedShape {
                what: WHAT,
                found: yaml_kind(other),
            })
        }
    }
    if config.is_empty() {
        return Err(LoadError::Empty { what: WHAT });
    }
    Ok(config)
}

fn is_yaml_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}

/// Loads one YAML file, or merges every `*.yml`/`*.yaml` in a directory in
/// file-name order; later files overwrite earlier keys in place and empty
/// files are skipped.
pub fn load_expected_config(path: &Path) -> Result<ExpectedConfig, LoadError> {
    if !path.is_dir() {
        return parse_expected_config(&read_text(path)?);
    }
    let entries = fs::read_dir(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = entry.path();
        if is_yaml_file(&file) {
            files.push(file);
        }
    }
    files.sort();

    let mut merged = ExpectedConfig::new();
    for file in &files {
        match parse_expected_config(&read_text(file)?) {
            Ok(config) => {
                debug!(file = %file.display(), "merging expected config");
                merged.merge_overwriting(config);
            }
            Err(LoadError::Empty { .. }) => {
                debug!(file = %file.display(), "skipping empty expected config");
            }
            Err(err) => return Err(err),
        }
    }
    if merged.is_empty() {
        return Err(LoadError::Empty {
            what: "expected config directory",
        });
    }
    Ok(merged)
}

pub fn parse_snapshot(text: &str) -> Result<Snapshot, LoadError> {
    if text.trim().is_empty() {
        return Err(LoadError::Empty { what: "snapshot" });
    }
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| LoadError::Parse {
        what: "snapshot",
        message: e.to_string(),
    })?;
    Ok(Snapshot::from_json(&value))
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, LoadError> {
    parse_snapshot(&read_text(path)?)
}

/// A YAML mapping of config key to snapshot path.
pub fn parse_key_map(text: &str) -> Result<KeyMap, LoadError> {
    const WHAT: &str = "key map";
    let doc: YamlValue = serde_yaml::from_str(text).map_err(|e| LoadError::Parse {
        what: WHAT,
        message: e.to_string(),
    })?;
    match doc {
        YamlValue::Null => Ok(KeyMap::new()),
        YamlValue::Mapping(map) => {
            let mut key_map = KeyMap::new();
            for (k, v) in &map {
                let path = match v {
                    YamlValue::String(s) => s.clone(),
                    other => {
                        return Err(LoadError::Parse {
                            what: WHAT,
                            message: format!(
                                "value for `{}` must be a string, found {}",
                                yaml_key(k)?,
                                yaml_kind(other)
                            ),
                        })
                    }
                };
                key_map.insert(yaml_key(k)?, path);
            }
            Ok(key_map)
        }
        other => Err(LoadError::UnsupportedShape {
            what: WHAT,
            found: yaml_kind(&other),
        }),
    }
}

pub fn load_key_map(path: &Path) -> Result<KeyMap, LoadError> {
    parse_key_map(&read_text(path)?)
}
