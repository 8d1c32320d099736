// src/mirror.rs

//! Mirror endpoints and the prioritized fallback search
//!
//! A `BaseMirror` is a trusted name/URL template pair; `Mirror` binds it
//! to a concrete architecture and platform release at construction time.
//! `MirrorSet` tries each mirror in priority order and stops at the first
//! non-empty result. A hard error on any mirror aborts the whole
//! operation: fallback exists for disjoint package sets, not for broken
//! endpoints.

use crate::error::{Error, Result};
use crate::host::HostProfile;
use crate::matcher::{self, PackageQuery};
use crate::repository::{PackageRecord, RepositoryClient, RepositoryIndex, resolve_location};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Placeholder substituted with the platform release
const RELEASE_PLACEHOLDER: &str = "$releasever";
/// Placeholder substituted with the architecture token
const ARCH_PLACEHOLDER: &str = "$basearch";

/// A name/URL template pair for one configured repository channel.
/// Templates are trusted configuration; substitution does no escaping.
#[derive(Debug, Clone)]
pub struct BaseMirror {
    name: String,
    base_url: String,
}

impl BaseMirror {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }
}

/// The default repository channels, tried in order. The stable channel
/// and the development-kit channel host disjoint package sets.
pub fn default_base_mirrors() -> Vec<BaseMirror> {
    vec![
        BaseMirror::new(
            "OceanBase-community-stable-el$releasever",
            "https://mirrors.oceanbase.com/oceanbase/community/stable/el/$releasever/$basearch/",
        ),
        BaseMirror::new(
            "OceanBase-development-kit-el$releasever",
            "https://mirrors.oceanbase.com/oceanbase/development-kit/el/$releasever/$basearch/",
        ),
    ]
}

/// One repository endpoint bound to an architecture and platform release.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct Mirror {
    name: String,
    base_url: String,
    arch: String,
    release: String,
    non_lse: bool,
}

impl Mirror {
    /// Substitute the architecture and release placeholders into both
    /// templates. `lse_override` forces the build-variant preference;
    /// otherwise it defaults to the negation of the host's LSE support.
    pub fn from_base(base: &BaseMirror, host: &HostProfile, lse_override: Option<bool>) -> Self {
        let substitute = |template: &str| {
            template
                .replace(RELEASE_PLACEHOLDER, &host.release)
                .replace(ARCH_PLACEHOLDER, &host.arch)
        };

        Self {
            name: substitute(&base.name),
            base_url: substitute(&base.base_url),
            arch: host.arch.clone(),
            release: host.release.clone(),
            non_lse: lse_override.unwrap_or(!host.lse_supported),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    /// Filter-only search: fetch both metadata hops and rank the matches,
    /// leaving the empty case to the caller.
    fn search_inner(&self, query: &PackageQuery) -> Result<Vec<PackageRecord>> {
        query.validate()?;

        debug!("Searching {} for {}", self.name, query.label());
        let client = RepositoryClient::new()?;
        let mut index = RepositoryIndex::new(&self.base_url);
        index.fetch_descriptor(&client)?;
        let records = index.fetch_packages(&client)?;

        let ranked = matcher::filter_and_rank(records, query, &self.arch, self.non_lse);
        Ok(ranked.into_iter().cloned().collect())
    }

    /// Search this mirror; an empty ranked result becomes a not-found
    /// error at this layer.
    pub fn search(&self, query: &PackageQuery) -> Result<Vec<PackageRecord>> {
        let matches = self.search_inner(query)?;
        if matches.is_empty() {
            return Err(Error::NotFoundError(format!(
                "no such package: {}",
                query.label()
            )));
        }
        Ok(matches)
    }

    /// Download the best match for the query into `dest_dir`.
    ///
    /// The destination must be an absolute path; it is created (with
    /// parents) if absent and rejected if it exists as a non-directory.
    /// Validation happens before any network I/O.
    pub fn download(&self, query: &PackageQuery, dest_dir: &Path) -> Result<PathBuf> {
        query.validate()?;
        prepare_dest_dir(dest_dir)?;

        let matches = self.search(query)?;
        self.download_record(&matches[0], dest_dir)
    }

    /// Fetch one record's artifact into an already-validated destination.
    fn download_record(&self, record: &PackageRecord, dest_dir: &Path) -> Result<PathBuf> {
        let url = resolve_location(&self.base_url, &record.location);
        let file_name = record
            .location
            .href
            .rsplit('/')
            .next()
            .unwrap_or(&record.location.href);
        let dest_path = dest_dir.join(file_name);

        let client = RepositoryClient::new()?;
        client.download_file(&url, &dest_path)?;

        info!("Downloaded {} to {}", record.nvr(), dest_path.display());
        Ok(dest_path)
    }
}

/// Validate and materialize the destination directory.
fn prepare_dest_dir(dest_dir: &Path) -> Result<()> {
    if !dest_dir.is_absolute() {
        return Err(Error::InvalidArgument(format!(
            "destination is not an absolute path: {}",
            dest_dir.display()
        )));
    }

    match std::fs::metadata(dest_dir) {
        Ok(metadata) if !metadata.is_dir() => Err(Error::InvalidArgument(format!(
            "destination is not a directory: {}",
            dest_dir.display()
        ))),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(dest_dir)?;
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// An ordered list of mirrors; list order is fallback priority.
/// Constructed once at startup, not mutated thereafter.
pub struct MirrorSet {
    mirrors: Vec<Mirror>,
}

impl MirrorSet {
    pub fn new(mirrors: Vec<Mirror>) -> Self {
        Self { mirrors }
    }

    /// Build the set from base-mirror templates and a host profile.
    pub fn from_bases(bases: &[BaseMirror], host: &HostProfile) -> Self {
        Self::new(
            bases
                .iter()
                .map(|base| Mirror::from_base(base, host, None))
                .collect(),
        )
    }

    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    /// Search mirrors in priority order and return the first non-empty
    /// ranked result. A hard error on any mirror aborts the whole search;
    /// fallback applies only to legitimately-empty results.
    pub fn search_all(&self, query: &PackageQuery) -> Result<Vec<PackageRecord>> {
        query.validate()?;

        for mirror in &self.mirrors {
            let matches = mirror.search_inner(query)?;
            if !matches.is_empty() {
                info!(
                    "Found {} match(es) for {} in {}",
                    matches.len(),
                    query.label(),
                    mirror.name
                );
                return Ok(matches);
            }
            debug!("No match for {} in {}", query.label(), mirror.name);
        }

        Err(Error::NotFoundError(format!(
            "no such package: {}",
            query.label()
        )))
    }

    /// Download from the first mirror holding a match. Destination
    /// validation happens before any mirror is contacted.
    pub fn download_any(&self, query: &PackageQuery, dest_dir: &Path) -> Result<PathBuf> {
        query.validate()?;
        prepare_dest_dir(dest_dir)?;

        for mirror in &self.mirrors {
            let matches = mirror.search_inner(query)?;
            if let Some(best) = matches.first() {
                return mirror.download_record(best, dest_dir);
            }
            debug!("No match for {} in {}", query.label(), mirror.name);
        }

        Err(Error::NotFoundError(format!(
            "no such package: {}",
            query.label()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_host(arch: &str, lse_supported: bool) -> HostProfile {
        HostProfile {
            arch: arch.to_string(),
            release: "8".to_string(),
            lse_supported,
        }
    }

    #[test]
    fn test_mirror_template_substitution() {
        let base = BaseMirror::new(
            "channel-el$releasever",
            "https://mirrors.example.com/el/$releasever/$basearch/",
        );
        let mirror = Mirror::from_base(&base, &test_host("x86_64", true), None);

        assert_eq!(mirror.name(), "channel-el8");
        assert_eq!(
            mirror.base_url(),
            "https://mirrors.example.com/el/8/x86_64/"
        );
        assert_eq!(mirror.arch(), "x86_64");
        assert_eq!(mirror.release(), "8");
    }

    #[test]
    fn test_mirror_lse_preference_defaults_to_host_negation() {
        let base = BaseMirror::new("m", "https://mirrors.example.com/");

        let mirror = Mirror::from_base(&base, &test_host("aarch64", false), None);
        assert!(mirror.non_lse);

        let mirror = Mirror::from_base(&base, &test_host("aarch64", true), None);
        assert!(!mirror.non_lse);
    }

    #[test]
    fn test_mirror_lse_preference_override() {
        let base = BaseMirror::new("m", "https://mirrors.example.com/");
        let mirror = Mirror::from_base(&base, &test_host("aarch64", true), Some(true));
        assert!(mirror.non_lse);
    }

    #[test]
    fn test_default_base_mirrors_order() {
        let bases = default_base_mirrors();
        assert_eq!(bases.len(), 2);
        assert!(bases[0].base_url.contains("stable"));
        assert!(bases[1].base_url.contains("development-kit"));
    }

    #[test]
    fn test_prepare_dest_dir_rejects_relative_path() {
        let err = prepare_dest_dir(Path::new("relative/path")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("not an absolute path"));
    }

    #[test]
    fn test_empty_query_name_rejected_before_any_fetch() {
        // Unroutable base URL: reaching the network would fail loudly with
        // a download error, not an invalid-argument error.
        let base = BaseMirror::new("m", "http://127.0.0.1:1/repo/");
        let mirror = Mirror::from_base(&base, &test_host("x86_64", true), None);

        let err = mirror.search(&PackageQuery::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_mirror_set_is_not_found() {
        let set = MirrorSet::new(Vec::new());
        let err = set.search_all(&PackageQuery::new("obshell")).unwrap_err();
        assert!(matches!(err, Error::NotFoundError(_)));
        assert_eq!(err.to_string(), "no such package: obshell--");
    }
}
