// SPDX-License-Identifier: Apache-2.0
//! Field-specific overrides, selected by normalized config key.
//!
//! Each heuristic returns `Ok(None)` when the snapshot holds no evidence for
//! it; the comparator then falls through to generic dispatch.

use std::net::{IpAddr, Ipv4Addr};

use confaudit_core::normalize_key;
use confaudit_model::{NodeRef, Severity};

use crate::comparator::{CompareError, Verdict};
use crate::resolver::KeyResolver;
use crate::traverse::Visited;

pub(crate) struct FieldContext<'r, 'a> {
    pub(crate) resolver: KeyResolver<'r>,
    pub(crate) root: NodeRef<'a>,
    pub(crate) actual: Option<NodeRef<'a>>,
}

pub(crate) type FieldHeuristic =
    fn(&FieldContext<'_, '_>, &str) -> Result<Option<Verdict>, CompareError>;

const FIELD_HEURISTICS: &[(&str, FieldHeuristic)] = &[
    ("network", network_state),
    ("installlocation", default_location),
    ("userdirectorylocation", default_location),
    ("ostheme", os_theme),
    ("resolution", resolution),
    ("dpiscaling", dpi_scaling),
    ("monitors", dynamic_range),
    ("inputdevice", input_device),
];

const DEFAULT_LOCATION_PREFIXES: &[&str] = &["c:\\users", "c:\\windows", "c:\\program files"];
const DEFAULT_LOCATION_FIELDS: &[&str] = &["OsWindowsDirectory", "UserProfile"];
const NAMED_RESOLUTIONS: &[(&str, u64, u64)] = &[("fhd", 1920, 1080)];
const BASE_DPI: f64 = 96.0;

pub(crate) fn heuristic_for(normalized_key: &str) -> Option<FieldHeuristic> {
    FIELD_HEURISTICS
        .iter()
        .find(|(key, _)| *key == normalized_key)
        .map(|(_, heuristic)| *heuristic)
}

/// Host part of an address, without any `/prefix` length.
fn address_host(text: &str) -> &str {
    let text = text.trim();
    text.split_once('/').map_or(text, |(host, _)| host.trim())
}

fn network_state(
    ctx: &FieldContext<'_, '_>,
    expected: &str,
) -> Result<Option<Verdict>, CompareError> {
    let Some(actual) = ctx.actual else {
        return Ok(None);
    };
    let addresses = if let Some(text) = actual.as_str() {
        match address_host(text).parse::<IpAddr>() {
            Ok(_) => vec![text.trim().to_string()],
            Err(_) => return Ok(None),
        }
    } else if actual.is_container() {
        let mut out = Vec::new();
        let mut visited = Visited::new(actual.snapshot());
        collect_addresses(actual, ctx.resolver.max_depth(), &mut visited, &mut out);
        out
    } else {
        return Ok(None);
    };

    let active: Vec<&str> = addresses
        .iter()
        .map(String::as_str)
        .filter(|a| {
            address_host(a)
                .parse::<Ipv4Addr>()
                .is_ok_and(|ip| !ip.is_loopback())
        })
        .collect();
    let wanted = expected.trim().to_lowercase();
    let verdict = if wanted == "offline" && active.is_empty() {
        Verdict::matched("No active IPv4 addresses; host is offline")
    } else if wanted == "online" && !active.is_empty() {
        Verdict::matched(format!("Active IPv4 addresses: {}", active.join(", ")))
    } else if active.is_empty() {
        Verdict::partial("No active IPv4 addresses found")
    } else {
        Verdict::mismatched(
            Severity::Medium,
            format!(
                "Expected network state '{}' but active IPv4 addresses exist: {}",
                expected.trim(),
                active.join(", ")
            ),
        )
    };
    Ok(Some(verdict))
}

fn collect_addresses(
    node: NodeRef<'_>,
    depth_left: usize,
    visited: &mut Visited,
    out: &mut Vec<String>,
) {
    if !visited.enter(node) {
        return;
    }
    for (key, value) in node.entries() {
        if let Some(text) = value.as_str() {
            if matches!(
                normalize_key(key).as_str(),
                "address" | "ip" | "ipaddress" | "ipv4address"
            ) {
                out.push(text.trim().to_string());
            }
        } else if value.is_container() && depth_left > 0 {
            collect_addresses(value, depth_left - 1, visited, out);
        }
    }
    for item in node.items() {
        if let Some(text) = item.as_str() {
            if address_host(text).parse::<IpAddr>().is_ok() {
                out.push(text.trim().to_string());
            }
        } else if item.is_container() && depth_left > 0 {
            collect_addresses(item, depth_left - 1, visited, out);
        }
    }
}

fn has_default_prefix(path: &str) -> bool {
    let lowered = path.trim().to_lowercase();
    DEFAULT_LOCATION_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

fn default_location(
    ctx: &FieldContext<'_, '_>,
    expected: &str,
) -> Result<Option<Verdict>, CompareError> {
    if !expected.trim().eq_ignore_ascii_case("default") {
        return Ok(None);
    }
    if let Some(text) = ctx.actual.and_then(NodeRef::as_str) {
        if has_default_prefix(text) {
            return Ok(Some(Verdict::matched(format!("Default location matched ({text})"))));
        }
    }
    for field in DEFAULT_LOCATION_FIELDS {
        if let Some(text) = ctx.resolver.locate(ctx.root, field).and_then(NodeRef::as_str) {
            if has_default_prefix(text) {
                return Ok(Some(Verdict::matched(format!(
                    "Default location inferred from {field} ({text})"
                ))));
            }
        }
    }
    Ok(Some(Verdict::partial("Default location not directly found in snapshot")))
}

/// Map entry whose key normalizes to `name`.
fn field<'a>(node: NodeRef<'a>, name: &str) -> Option<NodeRef<'a>> {
    let wanted = normalize_key(name);
    node.entries()
        .find(|(k, v)| !v.is_null() && normalize_key(k) == wanted)
        .map(|(_, v)| v)
}

fn os_theme(ctx: &FieldContext<'_, '_>, expected: &str) -> Result<Option<Verdict>, CompareError> {
    let wanted = expected.trim().to_lowercase();
    let wants_dark = wanted.starts_with("dark");
    if !wants_dark && !wanted.starts_with("light") {
        return Ok(None);
    }
    let apps = ctx
        .actual
        .and_then(|actual| field(actual, "Apps"))
        .or_else(|| {
            ctx.resolver
                .locate(ctx.root, "ui.theme")
                .and_then(|theme| field(theme, "Apps"))
        });
    let Some(apps) = apps else {
        return Ok(None);
    };
    let light = match apps.as_bool() {
        Some(flag) => flag,
        None => match apps.display_text().trim().to_lowercase().as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            _ => return Ok(None),
        },
    };
    let flag = apps.display_text();
    if light != wants_dark {
        Ok(Some(Verdict::matched(format!(
            "Theme matched (AppsUseLightTheme={flag})"
        ))))
    } else {
        Ok(Some(Verdict::mismatched(
            Severity::High,
            format!("Expected theme '{}' but AppsUseLightTheme={flag}", expected.trim()),
        )))
    }
}

fn screen_mode(screen: NodeRef<'_>) -> Option<(u64, u64)> {
    let width = field(screen, "Width")?.as_f64()?;
    let height = field(screen, "Height")?.as_f64()?;
    (width > 0.0 && height > 0.0).then_some((width as u64, height as u64))
}

fn screen_modes(node: NodeRef<'_>) -> Vec<(u64, u64)> {
    if let Some(single) = screen_mode(node) {
        return vec![single];
    }
    let list = ["Screens", "PerMonitorDPI"]
        .iter()
        .find_map(|name| field(node, name).filter(|n| n.is_seq()))
        .unwrap_or(node);
    list.items().filter_map(screen_mode).collect()
}

fn resolution(ctx: &FieldContext<'_, '_>, expected: &str) -> Result<Option<Verdict>, CompareError> {
    let mut screens = ctx.actual.map(screen_modes).unwrap_or_default();
    if screens.is_empty() {
        screens = ctx
            .resolver
            .locate(ctx.root, "ui.displays")
            .map(screen_modes)
            .unwrap_or_default();
    }
    if screens.is_empty() {
        return Ok(None);
    }

    let wanted = normalize_key(expected);
    let named = NAMED_RESOLUTIONS.iter().find(|(name, _, _)| *name == wanted);
    for (width, height) in &screens {
        let hit = match named {
            Some((_, w, h)) => w == width && h == height,
            None => {
                !wanted.is_empty()
                    && normalize_key(format!("{width}x{height}")).contains(&wanted)
            }
        };
        if hit {
            let label = if named.is_some() {
                format!("Found {width}x{height} ({})", expected.trim())
            } else {
                format!("Resolution matched ({width}x{height})")
            };
            return Ok(Some(Verdict::matched(label)));
        }
    }
    let seen: Vec<String> = screens.iter().map(|(w, h)| format!("{w}x{h}")).collect();
    Ok(Some(Verdict::mismatched(
        Severity::High,
        format!(
            "Expected resolution '{}' not found (screens: {})",
            expected.trim(),
            seen.join(", ")
        ),
    )))
}

fn dpi_readings(node: NodeRef<'_>) -> Vec<f64> {
    if node.is_map() {
        if let Some(per_monitor) = field(node, "PerMonitorDPI") {
            return per_monitor
                .items()
                .filter_map(|m| field(m, "DpiX").and_then(NodeRef::as_f64))
                .filter(|dpi| *dpi > 0.0)
                .collect();
        }
        return field(node, "dpi").map(dpi_readings).unwrap_or_default();
    }
    if node.is_seq() {
        return node
            .items()
            .filter_map(|m| field(m, "DpiX").and_then(NodeRef::as_f64))
            .filter(|dpi| *dpi > 0.0)
            .collect();
    }
    node.as_f64().filter(|dpi| *dpi > 0.0).into_iter().collect()
}

fn dpi_scaling(
    ctx: &FieldContext<'_, '_>,
    expected: &str,
) -> Result<Option<Verdict>, CompareError> {
    let trimmed = expected.trim();
    let Some(number) = trimmed.strip_suffix('%') else {
        return Ok(None);
    };
    let percent: f64 = number
        .trim()
        .parse()
        .ok()
        .filter(|p: &f64| p.is_finite())
        .ok_or_else(|| CompareError::InvalidPercentage(trimmed.to_string()))?;

    let mut readings = ctx
        .actual
        .filter(|a| a.as_str().map_or(true, |s| !s.contains('%')))
        .map(dpi_readings)
        .unwrap_or_default();
    for path in ["ui.dpi", "ui.displays"] {
        if readings.is_empty() {
            readings = ctx
                .resolver
                .locate(ctx.root, path)
                .map(dpi_readings)
                .unwrap_or_default();
        }
    }
    if readings.is_empty() {
        return Ok(None);
    }

    let wanted = percent.round() as i64;
    let scaled = |dpi: f64| (dpi / BASE_DPI * 100.0).round() as i64;
    if let Some(dpi) = readings.iter().find(|dpi| scaled(**dpi) == wanted) {
        return Ok(Some(Verdict::matched(format!(
            "DPI scaling matched ({} -> {trimmed})",
            display_number(*dpi)
        ))));
    }
    let observed: Vec<String> = readings.iter().map(|dpi| format!("{}%", scaled(*dpi))).collect();
    Ok(Some(Verdict::mismatched(
        Severity::High,
        format!(
            "Expected DPI scaling '{trimmed}' not found (observed {})",
            observed.join(", ")
        ),
    )))
}

pub(crate) fn display_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn descriptions(node: NodeRef<'_>) -> Vec<String> {
    if node.is_seq() {
        node.items().map(NodeRef::display_text).collect()
    } else {
        vec![node.display_text()]
    }
}

fn dynamic_range(
    ctx: &FieldContext<'_, '_>,
    expected: &str,
) -> Result<Option<Verdict>, CompareError> {
    let wanted = expected.trim().to_uppercase();
    if wanted != "SDR" && wanted != "HDR" {
        return Ok(None);
    }
    let mut texts: Vec<String> = ctx
        .resolver
        .locate(ctx.root, "video_controllers")
        .map(descriptions)
        .unwrap_or_default();
    if let Some(actual) = ctx.actual {
        texts.extend(descriptions(actual));
    }
    texts.retain(|t| !t.trim().is_empty());
    if texts.is_empty() {
        return Ok(None);
    }

    let wants_hdr = wanted == "HDR";
    if texts
        .iter()
        .any(|t| t.to_lowercase().contains("hdr") == wants_hdr)
    {
        return Ok(Some(Verdict::matched(format!("Monitor supports {wanted}"))));
    }
    Ok(Some(Verdict::partial(format!(
        "Monitor info does not confirm {wanted}: {}",
        texts.join("; ")
    ))))
}

fn describe_device(node: NodeRef<'_>) -> String {
    if node.is_seq() {
        return node.items().next().map(describe_device).unwrap_or_default();
    }
    field(node, "Name")
        .map(NodeRef::display_text)
        .unwrap_or_else(|| node.display_text())
}

fn input_device(
    ctx: &FieldContext<'_, '_>,
    _expected: &str,
) -> Result<Option<Verdict>, CompareError> {
    let mouse = ctx
        .resolver
        .locate(ctx.root, "ui.mouse")
        .filter(|m| !m.is_empty_value())
        .or_else(|| ctx.actual.filter(|a| !a.is_empty_value()));
    Ok(Some(match mouse {
        Some(device) => Verdict::matched(format!("Mouse detected: {}", describe_device(device))),
        None => Verdict::mismatched(Severity::High, "No mouse detected"),
    }))
}
