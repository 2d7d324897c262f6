// SPDX-License-Identifier: Apache-2.0

use confaudit_core::{ENV_CONFAUDIT_LOG_JSON, ENV_CONFAUDIT_LOG_LEVEL};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::LogFlags;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Command-line flags win over `RUST_LOG`, which wins over
/// `CONFAUDIT_LOG_LEVEL`. Logs go to stderr; stdout carries results only.
pub(crate) fn init_tracing(flags: LogFlags) {
    let filter = filter_for(flags, |name| std::env::var(name).ok());
    let log_json = env_bool(ENV_CONFAUDIT_LOG_JSON, false);
    let result = if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(err) = result {
        eprintln!("tracing already initialized: {err}");
    }
}

fn flag_level(flags: LogFlags) -> Option<&'static str> {
    if flags.trace || flags.verbose > 1 {
        Some("trace")
    } else if flags.verbose == 1 {
        Some("debug")
    } else if flags.quiet {
        Some("error")
    } else {
        None
    }
}

fn filter_for(flags: LogFlags, env: impl Fn(&str) -> Option<String>) -> EnvFilter {
    if let Some(level) = flag_level(flags) {
        return EnvFilter::new(level);
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    env(ENV_CONFAUDIT_LOG_LEVEL)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
