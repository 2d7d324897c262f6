// SPDX-License-Identifier: Apache-2.0
//! Device/model descriptions: token comparison and synthesis from hardware
//! fields when no single snapshot field carries one.

use confaudit_core::normalize_key;
use confaudit_model::{NodeRef, Severity};

use crate::comparator::Verdict;
use crate::heuristics::display_number;
use crate::resolver::KeyResolver;

const GIB: f64 = 1_073_741_824.0;
const MIB: f64 = 1_048_576.0;

const MANUFACTURER_FIELDS: &[&str] = &["CsManufacturer", "BiosManufacturer"];
const MODEL_FIELDS: &[&str] = &["CsModel", "BiosCaption"];
const OS_FIELDS: &[&str] = &["OsName", "WindowsProductName"];
const MEMORY_FIELDS: &[&str] = &[
    "CsTotalPhysicalMemory",
    "OsTotalVisibleMemorySize",
    "memory_total",
];
const DISK_FIELDS: &[&str] = &["disk_partitions", "DiskDrive", "PhysicalMedia"];
const DISK_SIZE_FIELDS: &[&str] = &["size", "capacity", "size_bytes", "total_bytes"];

pub(crate) fn is_device_model_key(normalized_key: &str) -> bool {
    normalized_key.contains("device") && normalized_key.contains("model")
}

/// Splits `expected` on `,`, `;` and newlines and looks for every token in
/// `actual` after normalization.
pub(crate) fn compare_device_tokens(expected: &str, actual: &str) -> Verdict {
    let haystack = normalize_key(actual);
    let tokens: Vec<&str> = expected
        .split([',', ';', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    let (found, missed): (Vec<&str>, Vec<&str>) = tokens.iter().partition(|token| {
        let needle = normalize_key(token);
        !needle.is_empty() && haystack.contains(&needle)
    });
    if missed.is_empty() {
        Verdict::matched(format!("All device tokens found: {}", found.join(", ")))
    } else if !found.is_empty() {
        Verdict::partial(format!(
            "Some device tokens found: {}; missing: {}",
            found.join(", "),
            missed.join(", ")
        ))
    } else {
        Verdict::mismatched(
            Severity::High,
            format!("No device tokens found; missing: {}", missed.join(", ")),
        )
    }
}

fn first_text(resolver: &KeyResolver<'_>, root: NodeRef<'_>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| resolver.locate(root, field))
        .find(|value| !value.is_empty_value() && !value.is_container())
        .map(|value| value.display_text().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn processor_name(resolver: &KeyResolver<'_>, root: NodeRef<'_>) -> Option<String> {
    if let Some(cpus) = resolver.locate(root, "CsProcessors") {
        let first = if cpus.is_seq() { cpus.index(0) } else { Some(cpus) };
        if let Some(cpu) = first {
            let name = cpu
                .entries()
                .find(|(k, _)| normalize_key(k) == "name")
                .map(|(_, v)| v)
                .unwrap_or(cpu);
            if !name.is_empty_value() && !name.is_container() {
                return Some(name.display_text());
            }
        }
    }
    first_text(resolver, root, &["processor"])
}

fn memory_label(resolver: &KeyResolver<'_>, root: NodeRef<'_>) -> Option<String> {
    let value = MEMORY_FIELDS
        .iter()
        .filter_map(|field| resolver.locate(root, field))
        .find(|value| !value.is_empty_value())?;
    Some(match value.as_f64() {
        Some(bytes) if bytes > GIB => format!("{} GB RAM", (bytes / GIB).round()),
        Some(bytes) if bytes > MIB => format!("{} MB RAM", (bytes / MIB).round()),
        Some(bytes) => format!("{} RAM", display_number(bytes)),
        None => value.display_text(),
    })
}

fn disk_bytes(disk: NodeRef<'_>) -> Option<f64> {
    let mut sizes = disk
        .entries()
        .filter(|(k, _)| DISK_SIZE_FIELDS.contains(&k.to_lowercase().as_str()))
        .filter_map(|(_, v)| v.as_f64());
    if let Some(size) = sizes.next() {
        return Some(size);
    }
    disk.entries()
        .find(|(k, _)| k.eq_ignore_ascii_case("usage"))
        .and_then(|(_, usage)| usage.get("total"))
        .and_then(NodeRef::as_f64)
}

fn disk_label(resolver: &KeyResolver<'_>, root: NodeRef<'_>) -> Option<String> {
    let disks = DISK_FIELDS
        .iter()
        .filter_map(|field| resolver.locate(root, field))
        .find(|value| value.is_seq())?;
    let sizes: Vec<f64> = disks.items().filter_map(disk_bytes).collect();
    if sizes.is_empty() {
        return None;
    }
    let total: f64 = sizes.iter().sum();
    Some(format!("{} GB disk", (total / GIB).round()))
}

/// Builds `manufacturer model, OS, CPU, memory, disk` from whatever hardware
/// fields exist; `None` when nothing is known.
pub(crate) fn synthesize_device_model(
    resolver: &KeyResolver<'_>,
    root: NodeRef<'_>,
) -> Option<String> {
    let mut parts = Vec::new();
    let maker = first_text(resolver, root, MANUFACTURER_FIELDS);
    let model = first_text(resolver, root, MODEL_FIELDS);
    match (maker, model) {
        (Some(maker), Some(model)) => parts.push(format!("{maker} {model}")),
        (Some(only), None) | (None, Some(only)) => parts.push(only),
        (None, None) => {}
    }
    parts.extend(first_text(resolver, root, OS_FIELDS));
    parts.extend(processor_name(resolver, root));
    parts.extend(memory_label(resolver, root));
    parts.extend(disk_label(resolver, root));
    (!parts.is_empty()).then(|| parts.join(", "))
}
