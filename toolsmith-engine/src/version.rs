//! Version parsing, ordering and selection.
//!
//! Versions are compared by the integer values of their digit runs, so
//! `1.9 < 1.10` and `v1.2.0 == 1.2`. Anything that is not a digit only
//! separates runs. Prerelease detection is a case-insensitive substring
//! match on `rc`, `alpha`, `beta` and `-pre`.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

const PRERELEASE_MARKERS: [&str; 4] = ["rc", "alpha", "beta", "-pre"];

/// An immutable version string with its derived numeric key.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<u64>,
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = digit_runs(&raw);
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn is_prerelease(&self) -> bool {
        is_prerelease(&self.raw)
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Version {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_segments(&self.segments, &other.segments)
    }
}

fn digit_runs(s: &str) -> Vec<u64> {
    s.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse::<u64>().unwrap_or(u64::MAX))
        .collect()
}

fn compare_segments(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Compare two version strings by their zero-extended digit runs.
pub fn compare(a: &str, b: &str) -> Ordering {
    compare_segments(&digit_runs(a), &digit_runs(b))
}

/// Stable ascending sort by [`compare`].
pub fn sort<S: AsRef<str>>(versions: &mut [S]) {
    versions.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
}

/// Keep the versions matching `predicate`, preserving input order.
pub fn filter<S, F>(versions: &[S], mut predicate: F) -> Vec<String>
where
    S: AsRef<str>,
    F: FnMut(&str) -> bool,
{
    versions
        .iter()
        .map(AsRef::as_ref)
        .filter(|v| predicate(*v))
        .map(str::to_string)
        .collect()
}

pub fn is_prerelease(version: &str) -> bool {
    let lower = version.to_lowercase();
    PRERELEASE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Highest stable version, or the highest overall when every candidate is a
/// prerelease. `None` only for an empty working set.
fn pick_latest(working: Vec<String>) -> Option<String> {
    let stable = filter(&working, |v| !is_prerelease(v));
    let mut pool = if stable.is_empty() { working } else { stable };
    sort(&mut pool);
    pool.pop()
}

/// Lenient selection: a prefix query that matches nothing falls back to the
/// full list, and an empty list yields an empty string.
pub fn latest_version<S: AsRef<str>>(versions: &[S], query: &str) -> String {
    let mut working = if query.is_empty() {
        Vec::new()
    } else {
        filter(versions, |v| v.starts_with(query))
    };
    if working.is_empty() {
        working = filter(versions, |_| true);
    }
    pick_latest(working).unwrap_or_default()
}

/// Strict selection: an empty list is [`Error::NoVersions`] and a prefix
/// query that matches nothing is [`Error::NoMatch`].
pub fn latest_stable_with_query<S: AsRef<str>>(versions: &[S], query: &str) -> Result<String> {
    if versions.is_empty() {
        return Err(Error::NoVersions);
    }
    let working = filter(versions, |v| v.starts_with(query));
    if working.is_empty() {
        return Err(Error::NoMatch {
            query: query.to_string(),
        });
    }
    pick_latest(working).ok_or(Error::NoVersions)
}
