// src/matcher.rs

//! Candidate filtering and ranking
//!
//! Filters a repository's package list against a query and orders the
//! survivors best-first: epoch, then version, then the leading release
//! segment, then the LSE build-variant tie-break.

use crate::error::{Error, Result};
use crate::host::AARCH64;
use crate::repository::PackageRecord;
use crate::version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Marker substring distinguishing non-LSE aarch64 build variants
pub const LSE_MARKER: &str = "nonlse";

/// A package request. Unset (or empty) optional fields do not constrain
/// the match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageQuery {
    pub name: String,
    pub epoch: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
    pub flags: Option<String>,
}

impl PackageQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_epoch(mut self, epoch: impl Into<String>) -> Self {
        self.epoch = Some(epoch.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    /// Reject queries that cannot be resolved, before any network I/O.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("package name is empty".to_string()));
        }
        Ok(())
    }

    /// name-version-release label used in not-found errors
    pub fn label(&self) -> String {
        format!(
            "{}-{}-{}",
            self.name,
            self.version.as_deref().unwrap_or_default(),
            self.release.as_deref().unwrap_or_default()
        )
    }
}

fn constrained(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Filter records against the query and rank the survivors best-first.
///
/// An empty result is not an error at this layer; callers decide whether
/// "no match" is fatal.
pub fn filter_and_rank<'a>(
    records: &'a [PackageRecord],
    query: &PackageQuery,
    arch: &str,
    non_lse: bool,
) -> Vec<&'a PackageRecord> {
    let mut matches: Vec<&PackageRecord> = records
        .iter()
        .filter(|record| matches_query(record, query))
        .collect();

    // Stable sort: records the tie-break chain cannot separate keep their
    // original relative order.
    matches.sort_by(|a, b| rank_order(a, b, arch, non_lse));
    matches
}

fn matches_query(record: &PackageRecord, query: &PackageQuery) -> bool {
    if record.name != query.name {
        return false;
    }
    if let Some(flags) = constrained(&query.flags) {
        // Only the record's first declared provides entry is consulted.
        let first = record.provides.first();
        if first.and_then(|entry| entry.flags.as_deref()) != Some(flags) {
            return false;
        }
    }
    if let Some(epoch) = constrained(&query.epoch) {
        if record.epoch != epoch {
            return false;
        }
    }
    if let Some(version) = constrained(&query.version) {
        if record.version != version {
            return false;
        }
    }
    if let Some(release) = constrained(&query.release) {
        if record.release != release {
            return false;
        }
    }
    true
}

fn rank_order(a: &PackageRecord, b: &PackageRecord, arch: &str, non_lse: bool) -> Ordering {
    // Descending on each key: newest first.
    version::compare(&b.epoch, &a.epoch)
        .then_with(|| version::compare(&b.version, &a.version))
        .then_with(|| {
            version::compare(leading_segment(&b.release), leading_segment(&a.release))
        })
        .then_with(|| lse_order(a, b, arch, non_lse))
}

/// The numeric package-release number: everything before the first dot,
/// ignoring distribution/variant suffixes.
fn leading_segment(release: &str) -> &str {
    release.split('.').next().unwrap_or(release)
}

/// Position of the LSE marker within a release string. Absent maps to the
/// dedicated "no marker" end of the order, above every real position.
fn lse_marker_rank(release: &str) -> usize {
    release.find(LSE_MARKER).unwrap_or(usize::MAX)
}

fn lse_order(a: &PackageRecord, b: &PackageRecord, arch: &str, non_lse: bool) -> Ordering {
    let rank_a = lse_marker_rank(&a.release);
    let rank_b = lse_marker_rank(&b.release);

    if non_lse {
        // Records without the marker win, then the later marker.
        rank_b.cmp(&rank_a)
    } else if arch == AARCH64 {
        // Records carrying the marker earliest win.
        rank_a.cmp(&rank_b)
    } else {
        Ordering::Equal
    }
}
