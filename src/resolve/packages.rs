//! External package requirements aggregated over a resolved subtree.
//!
//! Merging is a commutative monoid: the same package requested twice keeps
//! the union of search paths and modules, and requires `CONFIG` mode if
//! either request did.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::graph::metadata::PackageSpec;

/// Aggregated requirement for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageRequirement {
    /// Whether the package must be found in `CONFIG` mode.
    pub requires_config: bool,
    /// Directories searched for the package.
    pub search_paths: BTreeSet<String>,
    /// Modules linked from the package.
    pub linked_modules: BTreeSet<String>,
}

impl PackageRequirement {
    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        self.requires_config |= other.requires_config;
        self.search_paths.extend(other.search_paths.iter().cloned());
        self.linked_modules.extend(other.linked_modules.iter().cloned());
    }
}

impl From<&PackageSpec> for PackageRequirement {
    fn from(spec: &PackageSpec) -> Self {
        Self {
            requires_config: spec.requires_config,
            search_paths: spec.search_paths.iter().cloned().collect(),
            linked_modules: spec.modules.iter().cloned().collect(),
        }
    }
}

/// Package requirements keyed by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageRequirements(BTreeMap<String, PackageRequirement>);

impl PackageRequirements {
    /// Collect the requirements declared by a list of package entries.
    #[must_use]
    pub fn from_specs(specs: &[PackageSpec]) -> Self {
        let mut requirements = Self::default();
        for spec in specs {
            requirements.add(&spec.name, &PackageRequirement::from(spec));
        }
        requirements
    }

    /// Merge one requirement for `name`.
    pub fn add(&mut self, name: &str, requirement: &PackageRequirement) {
        self.0.entry(name.to_owned()).or_default().merge(requirement);
    }

    /// Merge every requirement of `other`.
    pub fn merge(&mut self, other: &Self) {
        for (name, requirement) in &other.0 {
            self.add(name, requirement);
        }
    }

    /// Requirement for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PackageRequirement> {
        self.0.get(name)
    }

    /// Requirements in package-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageRequirement)> {
        self.0.iter().map(|(name, requirement)| (name.as_str(), requirement))
    }

    /// Number of distinct packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no package is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every linked module across all packages.
    #[must_use]
    pub fn linked_modules(&self) -> BTreeSet<&str> {
        self.0
            .values()
            .flat_map(|requirement| requirement.linked_modules.iter().map(String::as_str))
            .collect()
    }
}
