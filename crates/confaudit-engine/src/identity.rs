// SPDX-License-Identifier: Apache-2.0
//! `user@host` identity tokens, checked against identity-bearing fields.

use confaudit_core::normalize_key;
use confaudit_model::{NodeRef, Severity};

use crate::comparator::Verdict;
use crate::resolver::KeyResolver;

const USER_FIELDS: &[&str] = &[
    "CsUserName",
    "OsRegisteredUser",
    "CsPrimaryOwnerName",
    "OsRegisteredOwner",
];
const HOST_FIELDS: &[&str] = &[
    "CsName",
    "CsDNSHostName",
    "ComputerName",
    "DnsHostName",
    "Hostname",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IdentityCheck {
    pub(crate) verdict: Verdict,
    /// First user and host values seen, as `user@host`.
    pub(crate) observed: Option<String>,
}

/// Keys starting with `series` whose expected text carries an `@`.
pub(crate) fn is_identity_check(key: &str, expected: Option<&str>) -> bool {
    normalize_key(key).starts_with("series") && expected.is_some_and(|e| e.contains('@'))
}

/// `DOMAIN\user@host` splits into (`user`, `host`).
fn split_identity(token: &str) -> (&str, &str) {
    let (user, host) = token.split_once('@').unwrap_or((token, ""));
    let user = user.rsplit(['\\', '/']).next().unwrap_or(user);
    (user.trim(), host.trim())
}

fn candidates(resolver: &KeyResolver<'_>, root: NodeRef<'_>, fields: &[&str]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|field| resolver.locate(root, field))
        .filter_map(|value| value.as_str().map(str::trim).map(str::to_string))
        .filter(|text| !text.is_empty())
        .collect()
}

pub(crate) fn check_identity(
    resolver: &KeyResolver<'_>,
    root: NodeRef<'_>,
    expected: &str,
) -> IdentityCheck {
    let (user, host) = split_identity(expected);
    let user_norm = normalize_key(user);
    let host_norm = normalize_key(host);

    let users = candidates(resolver, root, USER_FIELDS);
    let hosts = candidates(resolver, root, HOST_FIELDS);
    let user_ok = !user_norm.is_empty()
        && users
            .iter()
            .any(|u| normalize_key(split_identity(u).0) == user_norm);
    let host_ok = !host_norm.is_empty() && hosts.iter().any(|h| normalize_key(h) == host_norm);

    let verdict = match (user_ok, host_ok) {
        (true, true) => Verdict::matched(format!("User '{user}' and host '{host}' found")),
        (true, false) => Verdict::partial(format!("User '{user}' found; host '{host}' not found")),
        (false, true) => Verdict::partial(format!("Host '{host}' found; user '{user}' not found")),
        (false, false) => Verdict::mismatched(
            Severity::High,
            format!("Neither user '{user}' nor host '{host}' found in snapshot"),
        ),
    };
    let observed = match (users.first(), hosts.first()) {
        (None, None) => None,
        (u, h) => Some(format!(
            "{}@{}",
            u.map_or("", String::as_str),
            h.map_or("", String::as_str)
        )),
    };
    IdentityCheck { verdict, observed }
}
