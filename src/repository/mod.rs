// src/repository/mod.rs

//! Repository metadata acquisition
//!
//! Implements the two-hop repomd protocol: fetch the small repomd.xml
//! descriptor, locate the "primary" package index inside it, then fetch,
//! decompress, and parse that index. Nothing is cached across calls;
//! every search repeats both hops.

pub mod primary;
pub mod repomd;

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub use primary::{CapabilityEntry, PackageRecord};
pub use repomd::{Location, RepomdDescriptor, RepomdEntry};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the repository descriptor below every mirror base URL
pub const REPOMD_PATH: &str = "repodata/repomd.xml";

/// HTTP client wrapper
///
/// One blocking client with a fixed timeout. Fetch failures surface
/// immediately to the caller: the resolution contract has no retry
/// anywhere.
pub struct RepositoryClient {
    client: Client,
}

impl RepositoryClient {
    /// Create a new repository client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET a URL and return the response body as text.
    pub fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .map_err(|e| Error::DownloadError(format!("Failed to read response from {}: {}", url, e)))
    }

    /// GET a URL and return the raw response body.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| Error::DownloadError(format!("Failed to read response from {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }

    /// Download a URL to a file.
    ///
    /// Writes through a temporary file and renames, so the destination
    /// path never holds a partial download.
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest_path.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let temp_path = dest_path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        io::copy(&mut response, &mut file)?;
        fs::rename(&temp_path, dest_path)?;

        info!("Successfully downloaded to {}", dest_path.display());
        Ok(())
    }
}

/// Join a base URL and a relative path with exactly one separating slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Resolve a location to an absolute URL. The location's own base URL
/// takes precedence over the mirror's base URL when present.
pub fn resolve_location(base_url: &str, location: &Location) -> String {
    match location.base.as_deref() {
        Some(base) if !base.is_empty() => join_url(base, &location.href),
        _ => join_url(base_url, &location.href),
    }
}

/// One repository's metadata view for a single invocation.
///
/// Created empty, populated by the descriptor fetch and then the primary
/// index fetch, discarded when the operation completes. There is no
/// persistent cache across calls.
pub struct RepositoryIndex {
    base_url: String,
    descriptor: Option<RepomdDescriptor>,
    packages: Option<Vec<PackageRecord>>,
}

impl RepositoryIndex {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            descriptor: None,
            packages: None,
        }
    }

    /// Fetch and parse the top-level descriptor (first protocol hop).
    pub fn fetch_descriptor(&mut self, client: &RepositoryClient) -> Result<&RepomdDescriptor> {
        let url = join_url(&self.base_url, REPOMD_PATH);
        debug!("Downloading repomd.xml from: {}", url);

        let xml = client.get_text(&url)?;
        let descriptor = repomd::parse_repomd(&xml)?;
        Ok(self.descriptor.insert(descriptor))
    }

    /// Absolute URL of the primary package index (second hop), resolved
    /// from the fetched descriptor.
    pub fn resolve_primary_url(&self) -> Result<String> {
        let descriptor = self
            .descriptor
            .as_ref()
            .ok_or_else(|| Error::ParseError("repository descriptor not fetched".to_string()))?;
        let location = descriptor.primary_location()?;
        Ok(resolve_location(&self.base_url, location))
    }

    /// Fetch, decompress, and parse the primary package index.
    pub fn fetch_packages(&mut self, client: &RepositoryClient) -> Result<&[PackageRecord]> {
        let url = self.resolve_primary_url()?;
        debug!("Downloading primary index from: {}", url);

        let bytes = client.get_bytes(&url)?;
        let xml = decompress_index(&bytes, &url)?;
        debug!("Decompressed primary index: {} bytes", xml.len());

        let records = primary::parse_primary(&xml)?;
        info!("Parsed {} packages from {}", records.len(), self.base_url);
        Ok(self.packages.insert(records))
    }

    pub fn packages(&self) -> Option<&[PackageRecord]> {
        self.packages.as_deref()
    }
}

/// Decompress a fetched primary index. Gzip is the wire default; zstd is
/// selected by the location extension.
fn decompress_index(bytes: &[u8], url: &str) -> Result<String> {
    if url.ends_with(".zst") {
        debug!("Decompressing zstd-compressed primary index");
        let decompressed = zstd::decode_all(bytes)
            .map_err(|e| Error::ParseError(format!("Failed to decompress {}: {}", url, e)))?;
        String::from_utf8(decompressed)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in primary index: {}", e)))
    } else {
        debug!("Decompressing gzip-compressed primary index");
        let mut gz = GzDecoder::new(bytes);
        let mut decompressed = String::new();
        gz.read_to_string(&mut decompressed)
            .map_err(|e| Error::ParseError(format!("Failed to decompress {}: {}", url, e)))?;
        Ok(decompressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://example.com/repo/", "repodata/repomd.xml"),
            "https://example.com/repo/repodata/repomd.xml"
        );
        assert_eq!(
            join_url("https://example.com/repo", "/repodata/repomd.xml"),
            "https://example.com/repo/repodata/repomd.xml"
        );
    }

    #[test]
    fn test_resolve_location_mirror_base() {
        let location = Location {
            href: "x86_64/pkg.rpm".to_string(),
            base: None,
        };
        assert_eq!(
            resolve_location("https://example.com/repo/", &location),
            "https://example.com/repo/x86_64/pkg.rpm"
        );
    }

    #[test]
    fn test_resolve_location_base_override() {
        let location = Location {
            href: "x86_64/pkg.rpm".to_string(),
            base: Some("https://cdn.example.com/pool".to_string()),
        };
        assert_eq!(
            resolve_location("https://example.com/repo/", &location),
            "https://cdn.example.com/pool/x86_64/pkg.rpm"
        );
    }

    #[test]
    fn test_resolve_location_empty_base_falls_back() {
        let location = Location {
            href: "pkg.rpm".to_string(),
            base: Some(String::new()),
        };
        assert_eq!(
            resolve_location("https://example.com/repo", &location),
            "https://example.com/repo/pkg.rpm"
        );
    }

    #[test]
    fn test_decompress_index_gzip() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let xml = "<metadata></metadata>";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let decompressed =
            decompress_index(&compressed, "https://example.com/primary.xml.gz").unwrap();
        assert_eq!(decompressed, xml);
    }

    #[test]
    fn test_decompress_index_zstd() {
        let xml = "<metadata></metadata>";
        let compressed = zstd::encode_all(xml.as_bytes(), 0).unwrap();

        let decompressed =
            decompress_index(&compressed, "https://example.com/primary.xml.zst").unwrap();
        assert_eq!(decompressed, xml);
    }

    #[test]
    fn test_decompress_index_garbage_is_parse_error() {
        let result = decompress_index(b"not gzip at all", "https://example.com/primary.xml.gz");
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_resolve_primary_url_requires_descriptor() {
        let index = RepositoryIndex::new("https://example.com/repo");
        assert!(matches!(
            index.resolve_primary_url(),
            Err(Error::ParseError(_))
        ));
    }
}
