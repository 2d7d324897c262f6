// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

pub const ENV_CONFAUDIT_CONFIG: &str = "CONFAUDIT_CONFIG";
pub const ENV_CONFAUDIT_LOG_LEVEL: &str = "CONFAUDIT_LOG_LEVEL";
pub const ENV_CONFAUDIT_LOG_JSON: &str = "CONFAUDIT_LOG_JSON";

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigPathScope {
    User,
    Workspace,
}

#[must_use]
pub fn resolve_config_path(scope: ConfigPathScope) -> PathBuf {
    resolve_config_path_with(scope, |name| std::env::var(name).ok())
}

fn resolve_config_path_with(
    scope: ConfigPathScope,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    let non_empty = |name: &str| {
        env(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    match scope {
        ConfigPathScope::User => {
            if let Some(explicit) = non_empty(ENV_CONFAUDIT_CONFIG) {
                return PathBuf::from(explicit);
            }
            if let Some(xdg_config_home) = non_empty("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg_config_home)
                    .join("confaudit")
                    .join(CONFIG_FILE_NAME);
            }
            if let Some(home) = non_empty("HOME") {
                return PathBuf::from(home)
                    .join(".config")
                    .join("confaudit")
                    .join(CONFIG_FILE_NAME);
            }
            PathBuf::from(".confaudit").join(CONFIG_FILE_NAME)
        }
        ConfigPathScope::Workspace => PathBuf::from(".confaudit").join(CONFIG_FILE_NAME),
    }
}
