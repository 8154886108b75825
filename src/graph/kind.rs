//! Target kinds and their CMake behaviour.

use std::fmt;

use serde::Serialize;

/// The closed set of GN output types understood by the generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A linked program.
    Executable,
    /// A dynamically loaded plugin.
    LoadableModule,
    /// A shared library.
    SharedLibrary,
    /// A static archive.
    StaticLibrary,
    /// A collection of object files.
    SourceSet,
    /// A named collection of dependencies.
    Group,
    /// A file copy step.
    Copy,
    /// A script run once.
    Action,
    /// A script run once per source.
    ActionForeach,
    /// Resources packaged into an Apple bundle.
    BundleData,
    /// An Apple bundle.
    CreateBundle,
    /// GN's own `unknown` output type.
    Unknown,
}

/// CMake behaviour associated with a [`TargetKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindTraits {
    /// Command creating the target, e.g. `add_library`.
    pub command: &'static str,
    /// Second argument of the creating command, e.g. `SHARED`.
    pub modifier: Option<&'static str>,
    /// Output property family, e.g. `LIBRARY`.
    pub property_modifier: Option<&'static str>,
    /// Whether the output can be linked into another target.
    pub linkable: bool,
    /// Whether the output is a complete artefact whose dependencies are not
    /// expanded by a dependant.
    pub barrier: bool,
}

const CUSTOM: KindTraits = KindTraits {
    command: "add_custom_target",
    modifier: Some("SOURCES"),
    property_modifier: None,
    linkable: false,
    barrier: false,
};

const HEADER_SUFFIXES: [&str; 2] = [".h", ".hpp"];

impl TargetKind {
    /// Parse a GN output type. Returns `None` for types outside the closed set.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let kind = match raw {
            "executable" => Self::Executable,
            "loadable_module" => Self::LoadableModule,
            "shared_library" => Self::SharedLibrary,
            "static_library" => Self::StaticLibrary,
            "source_set" => Self::SourceSet,
            "group" => Self::Group,
            "copy" => Self::Copy,
            "action" => Self::Action,
            "action_foreach" => Self::ActionForeach,
            "bundle_data" => Self::BundleData,
            "create_bundle" => Self::CreateBundle,
            "unknown" => Self::Unknown,
            _ => return None,
        };
        Some(kind)
    }

    /// The GN spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executable => "executable",
            Self::LoadableModule => "loadable_module",
            Self::SharedLibrary => "shared_library",
            Self::StaticLibrary => "static_library",
            Self::SourceSet => "source_set",
            Self::Group => "group",
            Self::Copy => "copy",
            Self::Action => "action",
            Self::ActionForeach => "action_foreach",
            Self::BundleData => "bundle_data",
            Self::CreateBundle => "create_bundle",
            Self::Unknown => "unknown",
        }
    }

    /// Behaviour record for the kind.
    #[must_use]
    pub const fn traits(self) -> KindTraits {
        match self {
            Self::Executable => KindTraits {
                command: "add_executable",
                modifier: None,
                property_modifier: Some("RUNTIME"),
                linkable: true,
                barrier: true,
            },
            Self::LoadableModule => KindTraits {
                command: "add_library",
                modifier: Some("MODULE"),
                property_modifier: Some("LIBRARY"),
                linkable: true,
                barrier: true,
            },
            Self::SharedLibrary => KindTraits {
                command: "add_library",
                modifier: Some("SHARED"),
                property_modifier: Some("LIBRARY"),
                linkable: true,
                barrier: true,
            },
            Self::StaticLibrary => KindTraits {
                command: "add_library",
                modifier: Some("STATIC"),
                property_modifier: Some("ARCHIVE"),
                linkable: true,
                barrier: false,
            },
            Self::SourceSet => KindTraits {
                command: "add_library",
                modifier: Some("OBJECT"),
                property_modifier: None,
                linkable: false,
                barrier: false,
            },
            Self::Group
            | Self::Copy
            | Self::Action
            | Self::ActionForeach
            | Self::BundleData
            | Self::CreateBundle
            | Self::Unknown => CUSTOM,
        }
    }

    /// Script kinds produce files at build time and are tracked as ordering
    /// dependencies.
    #[must_use]
    pub const fn is_script(self) -> bool {
        matches!(self, Self::Copy | Self::Action | Self::ActionForeach)
    }

    /// Kinds whose usefulness depends on their sources.
    #[must_use]
    pub const fn checks_sources(self) -> bool {
        matches!(
            self,
            Self::Executable
                | Self::LoadableModule
                | Self::SharedLibrary
                | Self::StaticLibrary
                | Self::SourceSet
                | Self::Group
        )
    }

    /// CMake variable receiving the kind's linker flags.
    #[must_use]
    pub const fn linker_flags_variable(self) -> &'static str {
        match self {
            Self::Executable => "CMAKE_EXE_LINKER_FLAGS",
            Self::StaticLibrary => "CMAKE_STATIC_LINKER_FLAGS",
            _ => "CMAKE_SHARED_LINKER_FLAGS",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns `true` when `path` names a header the compiler never builds on its
/// own.
#[must_use]
pub fn is_header(path: &str) -> bool {
    HEADER_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("executable", TargetKind::Executable)]
    #[case("loadable_module", TargetKind::LoadableModule)]
    #[case("action_foreach", TargetKind::ActionForeach)]
    #[case("unknown", TargetKind::Unknown)]
    fn parse_round_trips_spelling(#[case] raw: &str, #[case] expected: TargetKind) {
        let kind = TargetKind::parse(raw).expect("known kind");
        assert_eq!(kind, expected);
        assert_eq!(kind.as_str(), raw);
    }

    #[rstest]
    fn parse_rejects_unrecognised_kinds() {
        assert!(TargetKind::parse("rust_library").is_none());
        assert!(TargetKind::parse("").is_none());
    }

    #[rstest]
    #[case(TargetKind::Executable, true)]
    #[case(TargetKind::SharedLibrary, true)]
    #[case(TargetKind::LoadableModule, true)]
    #[case(TargetKind::StaticLibrary, false)]
    #[case(TargetKind::SourceSet, false)]
    #[case(TargetKind::Action, false)]
    fn barrier_kinds_are_self_contained_outputs(#[case] kind: TargetKind, #[case] barrier: bool) {
        assert_eq!(kind.traits().barrier, barrier);
    }

    #[rstest]
    fn scripts_are_custom_targets() {
        for kind in [TargetKind::Copy, TargetKind::Action, TargetKind::ActionForeach] {
            assert!(kind.is_script());
            assert_eq!(kind.traits().command, "add_custom_target");
        }
        assert!(!TargetKind::BundleData.is_script());
    }

    #[rstest]
    #[case("a.h", true)]
    #[case("dir/a.hpp", true)]
    #[case("a.cc", false)]
    #[case("a.inc", false)]
    fn header_suffixes(#[case] path: &str, #[case] header: bool) {
        assert_eq!(is_header(path), header);
    }
}
