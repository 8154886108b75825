//! GN label helpers and CMake identifier derivation.
//!
//! A GN label has the shape `//location[:name][(toolchain)]`. CMake target
//! names are restricted to `[A-Za-z0-9_.+-]`, so [`cmake_identifier`] derives
//! a deterministic, escaped name from a label.
//!
//! ```rust
//! use gnbridge::graph::label::cmake_identifier;
//!
//! assert_eq!(cmake_identifier("//base/files:files"), "b__files");
//! assert_eq!(cmake_identifier("//base/files:util"), "b__files_util");
//! ```

/// Components of a label after the leading `//` is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabelParts<'a> {
    location: &'a str,
    name: Option<&'a str>,
    toolchain: Option<&'a str>,
}

fn split_label(label: &str) -> LabelParts<'_> {
    let body = label.strip_prefix("//").unwrap_or(label);
    let Some(separator) = body.find([':', '(']) else {
        return LabelParts {
            location: body,
            name: None,
            toolchain: None,
        };
    };
    let (location, rest) = body.split_at(separator);
    if let Some(after_colon) = rest.strip_prefix(':') {
        return match after_colon.split_once('(') {
            Some((name, toolchain)) => LabelParts {
                location,
                name: Some(name),
                toolchain: Some(toolchain.strip_suffix(')').unwrap_or(toolchain)),
            },
            None => LabelParts {
                location,
                name: Some(after_colon),
                toolchain: None,
            },
        };
    }
    let toolchain = rest.strip_prefix('(').unwrap_or(rest);
    LabelParts {
        location,
        name: None,
        toolchain: Some(toolchain.strip_suffix(')').unwrap_or(toolchain)),
    }
}

/// Shorten every directory segment but the last to its first character.
fn compress_location(location: &str) -> String {
    let segments: Vec<&str> = location.split('/').collect();
    let last = segments.len().saturating_sub(1);
    segments
        .iter()
        .enumerate()
        .map(|(idx, segment)| {
            if idx == last {
                (*segment).to_owned()
            } else {
                segment.chars().next().map(String::from).unwrap_or_default()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

const fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '+' | '-')
}

/// Replace every character CMake rejects in target names with `__`.
#[must_use]
pub fn escape_identifier(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if is_identifier_char(ch) {
            escaped.push(ch);
        } else {
            escaped.push_str("__");
        }
    }
    escaped
}

/// Derive the CMake target name for a GN label.
///
/// The location is compressed to keep generated names short; a name equal to
/// the last location segment is folded into the location, and a toolchain
/// suffix is appended after `--`.
#[must_use]
pub fn cmake_identifier(label: &str) -> String {
    let parts = split_label(label);
    let location = compress_location(parts.location);
    let mut identifier = match parts.name {
        Some(name) if location.ends_with(&format!("/{name}")) => location,
        Some(name) if !location.is_empty() => format!("{location}_{name}"),
        Some(name) => name.to_owned(),
        None => location,
    };
    if let Some(toolchain) = parts.toolchain {
        identifier.push_str("--");
        identifier.push_str(toolchain);
    }
    escape_identifier(&identifier)
}

/// Directory part of a label, e.g. `//base/files` for `//base/files:util`.
#[must_use]
pub fn label_dir(label: &str) -> &str {
    label.split(':').next().unwrap_or(label)
}

/// Name part of a label, e.g. `util` for `//base/files:util(//tc:host)`.
#[must_use]
pub fn label_name(label: &str) -> Option<&str> {
    split_label(label).name
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("//a/b:c", "a__b_c")]
    #[case("//a/b:b", "a__b")]
    #[case("//core/runtime/jsi:jsi", "c__r__jsi")]
    #[case("//core/runtime/jsi:quickjs", "c__r__jsi_quickjs")]
    #[case("//:root", "root")]
    #[case("//third_party/zlib", "t__zlib")]
    #[case("//a/b:c(//toolchain:x)", "a__b_c--____toolchain__x")]
    #[case("//a/b:c+d.e-f", "a__b_c+d.e-f")]
    fn derives_escaped_identifiers(#[case] label: &str, #[case] expected: &str) {
        assert_eq!(cmake_identifier(label), expected);
    }

    #[rstest]
    fn identifier_is_deterministic_and_toolchain_sensitive() {
        let with_toolchain = cmake_identifier("//a/b:c(//toolchain:x)");
        assert_eq!(with_toolchain, cmake_identifier("//a/b:c(//toolchain:x)"));
        assert_ne!(with_toolchain, cmake_identifier("//a/b:c"));
    }

    #[rstest]
    fn split_label_reads_all_parts() {
        let parts = split_label("//base/files:util(//build/toolchain:host)");
        assert_eq!(parts.location, "base/files");
        assert_eq!(parts.name, Some("util"));
        assert_eq!(parts.toolchain, Some("//build/toolchain:host"));
    }

    #[rstest]
    fn split_label_without_name_keeps_toolchain() {
        let parts = split_label("//base(//tc:x)");
        assert_eq!(parts.location, "base");
        assert_eq!(parts.name, None);
        assert_eq!(parts.toolchain, Some("//tc:x"));
    }

    #[rstest]
    #[case("//base/files:util", "//base/files", Some("util"))]
    #[case("//:root", "//", Some("root"))]
    #[case("//base", "//base", None)]
    fn label_accessors(#[case] label: &str, #[case] dir: &str, #[case] name: Option<&str>) {
        assert_eq!(label_dir(label), dir);
        assert_eq!(label_name(label), name);
    }
}
