// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::OutputMode;

pub(crate) fn emit_ok<T: Serialize>(output_mode: OutputMode, payload: &T) -> Result<(), String> {
    println!("{}", render(output_mode.json, payload)?);
    Ok(())
}

fn render<T: Serialize>(compact: bool, payload: &T) -> Result<String, String> {
    if compact {
        serde_json::to_string(payload).map_err(|e| e.to_string())
    } else {
        serde_json::to_string_pretty(payload).map_err(|e| e.to_string())
    }
}

/// Writes pretty JSON with a trailing newline, creating parent directories.
pub(crate) fn write_json_file<T: Serialize>(path: &Path, payload: &T) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    let mut text = render(false, payload)?;
    text.push('\n');
    fs::write(path, text).map_err(|e| format!("failed to write {}: {e}", path.display()))
}

/// Streams `write` into `path` through a buffered file, creating parent
/// directories.
pub(crate) fn write_text_file<F>(path: &Path, write: F) -> Result<(), String>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> std::io::Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    let file =
        fs::File::create(path).map_err(|e| format!("failed to create {}: {e}", path.display()))?;
    let mut out = BufWriter::new(file);
    write(&mut out)
        .and_then(|()| out.flush())
        .map_err(|e| format!("failed to write {}: {e}", path.display()))
}

/// Human notices on stderr, suppressed by `--quiet`.
pub(crate) fn notice(output_mode: OutputMode, message: &str) {
    if !output_mode.quiet {
        eprintln!("{message}");
    }
}
