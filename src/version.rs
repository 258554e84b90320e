//! Release tag grouping.
//!
//! Unity tags its source repository once per release (`2019.4.1f1`,
//! `2020.1.0b3`, ...). This module collapses those tags into version buckets
//! at two granularities:
//! - minor versions (`YYYY.X`), e.g. `2019.4`
//! - patch versions (`YYYY.X.Y`), e.g. `2019.4.1`
//!
//! Each bucket is represented by its most recent release, and one minor
//! version is elected as the latest stable default.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XrefError};

lazy_static::lazy_static! {
    /// Separates `YYYY.X` from the patch number and release type.
    static ref MINOR_SPLIT: Regex = Regex::new(r"\.\d+[abfp]").unwrap();
    /// Release type marker: alpha, beta, final or patch.
    static ref RELEASE_TYPE_SPLIT: Regex = Regex::new(r"[abfp]").unwrap();
}

/// Marker carried by final (non-prerelease) Unity releases.
pub const DEFAULT_STABLE_MARKER: char = 'f';

/// A tag of the source repository and the time of the commit it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    pub name: String,
    pub commit_time: DateTime<FixedOffset>,
}

impl ReleaseTag {
    pub fn new(name: impl Into<String>, commit_time: DateTime<FixedOffset>) -> Self {
        Self {
            name: name.into(),
            commit_time,
        }
    }
}

/// A version bucket and the release that represents it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Version label, e.g. `2019.4` or `2019.4.1`
    pub name: String,
    /// Most recent release tag mapping to `name`
    pub release: String,
}

impl Version {
    pub fn new(name: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release: release.into(),
        }
    }

    /// Whether the representative release is a final release.
    pub fn is_stable(&self, stable_marker: char) -> bool {
        self.release.contains(stable_marker)
    }
}

/// Granularity at which release tags are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// `YYYY.X`
    Minor,
    /// `YYYY.X.Y`
    Patch,
}

impl Granularity {
    /// Compute the version name of a release tag at this granularity.
    pub fn key(self, release: &str) -> Option<String> {
        match self {
            Granularity::Minor => minor_version_key(release),
            Granularity::Patch => patch_version_key(release),
        }
    }
}

/// `2019.4.1f1` -> `2019.4`
pub fn minor_version_key(release: &str) -> Option<String> {
    // Tags without a release type marker (e.g. `2017.1`) are not releases.
    if !MINOR_SPLIT.is_match(release) {
        return None;
    }
    split_head(&MINOR_SPLIT, release)
}

/// `2019.4.1f1` -> `2019.4.1`
pub fn patch_version_key(release: &str) -> Option<String> {
    if !RELEASE_TYPE_SPLIT.is_match(release) {
        return None;
    }
    split_head(&RELEASE_TYPE_SPLIT, release)
}

fn split_head(pattern: &Regex, release: &str) -> Option<String> {
    pattern
        .split(release)
        .next()
        .filter(|head| !head.is_empty())
        .map(|head| head.to_string())
}

/// Group release tags by the name computed with `key_fn` and keep the most
/// recent tag of each group.
///
/// Tags are ordered by descending commit time before grouping. The sort is
/// stable: when two tags of the same group share a commit time, the one that
/// comes first in `tags` represents the group. This tie-break depends on the
/// order the version control provider lists tags in and is accepted as is.
///
/// Tags for which `key_fn` returns `None` are ignored. Versions are returned
/// most recent first.
pub fn group_releases<F>(tags: &[ReleaseTag], key_fn: F) -> Vec<Version>
where
    F: Fn(&str) -> Option<String>,
{
    let mut sorted: Vec<&ReleaseTag> = tags.iter().collect();
    sorted.sort_by(|a, b| b.commit_time.cmp(&a.commit_time));

    let mut groups: IndexMap<String, Version> = IndexMap::new();
    for tag in sorted {
        if let Some(name) = key_fn(&tag.name) {
            groups
                .entry(name.clone())
                .or_insert_with(|| Version::new(name, tag.name.clone()));
        }
    }

    groups.into_values().collect()
}

/// Elect the version to publish at the root of the output: the stable version
/// with the greatest name.
///
/// Names are compared lexicographically, which orders `YYYY.X` labels
/// correctly as long as minor numbers stay single digit.
pub fn resolve_latest_stable(versions: &[Version], stable_marker: char) -> Result<Version> {
    versions
        .iter()
        .filter(|version| version.is_stable(stable_marker))
        .max_by(|a, b| a.name.cmp(&b.name))
        .cloned()
        .ok_or_else(|| {
            XrefError::NotFound(format!(
                "no stable release (marker '{}') among {} versions",
                stable_marker,
                versions.len()
            ))
        })
}

/// Versions to publish for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedVersions {
    /// Minor and patch versions, ordered by descending name
    pub versions: Vec<Version>,
    /// Minor version published at the root of the output
    pub latest_stable: Version,
}

impl ResolvedVersions {
    /// Distinct releases to generate, in the order they first appear in
    /// `versions`, each with the version names it represents.
    pub fn releases(&self) -> IndexMap<String, Vec<String>> {
        let mut releases: IndexMap<String, Vec<String>> = IndexMap::new();
        for version in &self.versions {
            releases
                .entry(version.release.clone())
                .or_default()
                .push(version.name.clone());
        }
        releases
    }
}

/// Group `tags` at both granularities and elect the latest stable minor
/// version.
///
/// # Errors
///
/// Returns [`XrefError::NotFound`] when no minor version is represented by a
/// stable release.
pub fn resolve_versions(tags: &[ReleaseTag], stable_marker: char) -> Result<ResolvedVersions> {
    let minor_versions = group_releases(tags, |release| Granularity::Minor.key(release));
    let patch_versions = group_releases(tags, |release| Granularity::Patch.key(release));

    let latest_stable = resolve_latest_stable(&minor_versions, stable_marker)?;

    let mut by_name: IndexMap<String, Version> = IndexMap::new();
    for version in minor_versions.into_iter().chain(patch_versions) {
        by_name.entry(version.name.clone()).or_insert(version);
    }

    let mut versions: Vec<Version> = by_name.into_values().collect();
    versions.sort_by(|a, b| b.name.cmp(&a.name));

    Ok(ResolvedVersions {
        versions,
        latest_stable,
    })
}
