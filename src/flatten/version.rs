//! Pod version ordering.
//!
//! Requirements such as `~> 1.10` and `1.2.0` are compared by their numeric
//! components, so `1.10.0` ranks above `1.2.0`. Ties on the numeric part fall
//! back to semver precedence, which ranks pre-releases below the release.

use std::cmp::Ordering;

/// Strip a leading requirement operator such as `~>` or `>=`.
fn strip_operator(version: &str) -> &str {
    version
        .trim_start_matches(|ch: char| matches!(ch, '~' | '>' | '<' | '=' | '!') || ch.is_whitespace())
        .trim_end()
}

fn numeric_components(version: &str) -> Vec<u64> {
    let release = version.split(['-', '+']).next().unwrap_or(version);
    release
        .split('.')
        .map(|component| {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

/// Compare two pod versions.
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let (left_req, right_req) = (strip_operator(left), strip_operator(right));
    let (lhs, rhs) = (numeric_components(left_req), numeric_components(right_req));
    let width = lhs.len().max(rhs.len());
    for idx in 0..width {
        let a = lhs.get(idx).copied().unwrap_or(0);
        let b = rhs.get(idx).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
    }
    match (semver::Version::parse(left_req), semver::Version::parse(right_req)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

/// The higher of two versions, preferring `current` on ties.
#[must_use]
pub fn higher_version<'a>(current: &'a str, candidate: &'a str) -> &'a str {
    if compare_versions(candidate, current) == Ordering::Greater {
        candidate
    } else {
        current
    }
}
