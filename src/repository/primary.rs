// src/repository/primary.rs

//! primary.xml package-list parsing
//!
//! The primary index is the large second hop of the repository protocol:
//! a `<metadata>` document listing every package the repository offers,
//! with versions, locations, and declared capabilities.

use super::repomd::{Location, parse_location};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One declared "provides"/"requires" capability, with an optional
/// comparison flag and version. Doubles as the query surface's
/// package-entry shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityEntry {
    pub name: String,
    pub flags: Option<String>,
    pub epoch: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
}

/// One package entry parsed from a repository's primary index.
/// Immutable once parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub arch: String,
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub packager: Option<String>,
    pub url: Option<String>,
    pub file_time: Option<u64>,
    pub build_time: Option<u64>,
    pub package_size: Option<u64>,
    pub installed_size: Option<u64>,
    pub archive_size: Option<u64>,
    pub location: Location,
    pub license: Option<String>,
    pub vendor: Option<String>,
    pub group: Option<String>,
    pub build_host: Option<String>,
    pub source_rpm: Option<String>,
    pub header_start: Option<u64>,
    pub header_end: Option<u64>,
    pub provides: Vec<CapabilityEntry>,
    pub requires: Vec<CapabilityEntry>,
    pub files: Vec<String>,
}

impl PackageRecord {
    /// name-version-release label used in log and CLI output
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }
}

/// Which capability list an `<rpm:entry>` belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapabilityList {
    None,
    Provides,
    Requires,
}

/// Builder for constructing a PackageRecord from XML events
#[derive(Default)]
struct RecordBuilder {
    name: Option<String>,
    arch: Option<String>,
    epoch: Option<String>,
    ver: Option<String>,
    rel: Option<String>,
    packager: Option<String>,
    url: Option<String>,
    file_time: Option<u64>,
    build_time: Option<u64>,
    package_size: Option<u64>,
    installed_size: Option<u64>,
    archive_size: Option<u64>,
    location: Location,
    license: Option<String>,
    vendor: Option<String>,
    group: Option<String>,
    build_host: Option<String>,
    source_rpm: Option<String>,
    header_start: Option<u64>,
    header_end: Option<u64>,
    provides: Vec<CapabilityEntry>,
    requires: Vec<CapabilityEntry>,
    files: Vec<String>,
}

impl RecordBuilder {
    fn build(self) -> Result<PackageRecord> {
        let name = self
            .name
            .ok_or_else(|| Error::ParseError("Missing package name".to_string()))?;
        let version = self
            .ver
            .ok_or_else(|| Error::ParseError("Missing version".to_string()))?;
        let release = self
            .rel
            .ok_or_else(|| Error::ParseError("Missing release".to_string()))?;

        Ok(PackageRecord {
            name,
            arch: self.arch.unwrap_or_default(),
            epoch: self.epoch.unwrap_or_default(),
            version,
            release,
            packager: self.packager,
            url: self.url,
            file_time: self.file_time,
            build_time: self.build_time,
            package_size: self.package_size,
            installed_size: self.installed_size,
            archive_size: self.archive_size,
            location: self.location,
            license: self.license,
            vendor: self.vendor,
            group: self.group,
            build_host: self.build_host,
            source_rpm: self.source_rpm,
            header_start: self.header_start,
            header_end: self.header_end,
            provides: self.provides,
            requires: self.requires,
            files: self.files,
        })
    }
}

/// Parse a decompressed primary.xml document into package records.
///
/// Document-level XML errors surface as ParseError; individual entries
/// missing their name or version are skipped.
pub fn parse_primary(xml: &str) -> Result<Vec<PackageRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut packages = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<RecordBuilder> = None;
    let mut current_tag = String::new();
    let mut in_format = false;
    let mut cap_list = CapabilityList::None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag.as_str() {
                    "package" => current = Some(RecordBuilder::default()),
                    "format" => in_format = true,
                    "rpm:provides" => cap_list = CapabilityList::Provides,
                    "rpm:requires" => cap_list = CapabilityList::Requires,
                    "location" => {
                        if let Some(ref mut pkg) = current {
                            pkg.location = parse_location(&e);
                        }
                    }
                    _ => {}
                }
                current_tag = tag;
            }
            Ok(Event::Empty(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let Some(ref mut pkg) = current else {
                    buf.clear();
                    continue;
                };

                match tag.as_str() {
                    "version" => {
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match attr.key.as_ref() {
                                b"epoch" => pkg.epoch = Some(value),
                                b"ver" => pkg.ver = Some(value),
                                b"rel" => pkg.rel = Some(value),
                                _ => {}
                            }
                        }
                    }
                    "time" => {
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = String::from_utf8_lossy(&attr.value);
                            match attr.key.as_ref() {
                                b"file" => pkg.file_time = value.parse().ok(),
                                b"build" => pkg.build_time = value.parse().ok(),
                                _ => {}
                            }
                        }
                    }
                    "size" => {
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = String::from_utf8_lossy(&attr.value);
                            match attr.key.as_ref() {
                                b"package" => pkg.package_size = value.parse().ok(),
                                b"installed" => pkg.installed_size = value.parse().ok(),
                                b"archive" => pkg.archive_size = value.parse().ok(),
                                _ => {}
                            }
                        }
                    }
                    "location" => pkg.location = parse_location(&e),
                    "rpm:header-range" => {
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = String::from_utf8_lossy(&attr.value);
                            match attr.key.as_ref() {
                                b"start" => pkg.header_start = value.parse().ok(),
                                b"end" => pkg.header_end = value.parse().ok(),
                                _ => {}
                            }
                        }
                    }
                    "rpm:entry" if in_format => {
                        let mut entry = CapabilityEntry::default();
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match attr.key.as_ref() {
                                b"name" => entry.name = value,
                                b"flags" => entry.flags = Some(value),
                                b"epoch" => entry.epoch = Some(value),
                                b"ver" => entry.version = Some(value),
                                b"rel" => entry.release = Some(value),
                                _ => {}
                            }
                        }
                        match cap_list {
                            CapabilityList::Provides => pkg.provides.push(entry),
                            CapabilityList::Requires => pkg.requires.push(entry),
                            CapabilityList::None => {}
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut pkg) = current {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_tag.as_str() {
                        "name" => pkg.name = Some(text),
                        "arch" => pkg.arch = Some(text),
                        "packager" => pkg.packager = Some(text),
                        "url" => pkg.url = Some(text),
                        "rpm:license" => pkg.license = Some(text),
                        "rpm:vendor" => pkg.vendor = Some(text),
                        "rpm:group" => pkg.group = Some(text),
                        "rpm:buildhost" => pkg.build_host = Some(text),
                        "rpm:sourcerpm" => pkg.source_rpm = Some(text),
                        "file" => pkg.files.push(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"package" => {
                    if let Some(builder) = current.take() {
                        match builder.build() {
                            Ok(pkg) => packages.push(pkg),
                            Err(e) => debug!("Skipping incomplete package entry: {}", e),
                        }
                    }
                }
                b"format" => in_format = false,
                b"rpm:provides" | b"rpm:requires" => cap_list = CapabilityList::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Failed to parse primary.xml: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="2">
  <package type="rpm">
    <name>obshell</name>
    <arch>x86_64</arch>
    <version epoch="0" ver="4.2.1" rel="101.el8"/>
    <packager>Example Packager</packager>
    <url>https://example.com/obshell</url>
    <time file="1700000000" build="1699990000"/>
    <size package="1048576" installed="4194304" archive="4195000"/>
    <location href="x86_64/obshell-4.2.1-101.el8.x86_64.rpm"/>
    <format>
      <rpm:license>MulanPubL-2.0</rpm:license>
      <rpm:vendor>Example Vendor</rpm:vendor>
      <rpm:group>Applications/Databases</rpm:group>
      <rpm:buildhost>builder01</rpm:buildhost>
      <rpm:sourcerpm>obshell-4.2.1-101.el8.src.rpm</rpm:sourcerpm>
      <rpm:header-range start="4504" end="374988"/>
      <rpm:provides>
        <rpm:entry name="obshell" flags="EQ" epoch="0" ver="4.2.1" rel="101.el8"/>
      </rpm:provides>
      <rpm:requires>
        <rpm:entry name="libc.so.6()(64bit)"/>
        <rpm:entry name="bash" flags="GE" epoch="0" ver="4.0"/>
      </rpm:requires>
      <file>/usr/bin/obshell</file>
      <file>/etc/obshell/config.yaml</file>
    </format>
  </package>
  <package type="rpm">
    <name>obclient</name>
    <arch>x86_64</arch>
    <version epoch="1" ver="2.2.0" rel="3.el8"/>
    <location href="x86_64/obclient-2.2.0-3.el8.x86_64.rpm" base="https://cdn.example.com/pool/"/>
    <format>
      <rpm:provides>
        <rpm:entry name="obclient" flags="EQ" epoch="1" ver="2.2.0" rel="3.el8"/>
      </rpm:provides>
    </format>
  </package>
</metadata>"#;

    #[test]
    fn test_parse_primary_records() {
        let records = parse_primary(PRIMARY_XML).unwrap();
        assert_eq!(records.len(), 2);

        let pkg = &records[0];
        assert_eq!(pkg.name, "obshell");
        assert_eq!(pkg.arch, "x86_64");
        assert_eq!(pkg.epoch, "0");
        assert_eq!(pkg.version, "4.2.1");
        assert_eq!(pkg.release, "101.el8");
        assert_eq!(pkg.packager.as_deref(), Some("Example Packager"));
        assert_eq!(pkg.url.as_deref(), Some("https://example.com/obshell"));
        assert_eq!(pkg.file_time, Some(1700000000));
        assert_eq!(pkg.build_time, Some(1699990000));
        assert_eq!(pkg.package_size, Some(1048576));
        assert_eq!(pkg.installed_size, Some(4194304));
        assert_eq!(pkg.archive_size, Some(4195000));
        assert_eq!(pkg.location.href, "x86_64/obshell-4.2.1-101.el8.x86_64.rpm");
        assert_eq!(pkg.location.base, None);
    }

    #[test]
    fn test_parse_primary_format_block() {
        let records = parse_primary(PRIMARY_XML).unwrap();
        let pkg = &records[0];

        assert_eq!(pkg.license.as_deref(), Some("MulanPubL-2.0"));
        assert_eq!(pkg.vendor.as_deref(), Some("Example Vendor"));
        assert_eq!(pkg.group.as_deref(), Some("Applications/Databases"));
        assert_eq!(pkg.build_host.as_deref(), Some("builder01"));
        assert_eq!(
            pkg.source_rpm.as_deref(),
            Some("obshell-4.2.1-101.el8.src.rpm")
        );
        assert_eq!(pkg.header_start, Some(4504));
        assert_eq!(pkg.header_end, Some(374988));
    }

    #[test]
    fn test_parse_primary_capabilities() {
        let records = parse_primary(PRIMARY_XML).unwrap();
        let pkg = &records[0];

        assert_eq!(pkg.provides.len(), 1);
        assert_eq!(pkg.provides[0].name, "obshell");
        assert_eq!(pkg.provides[0].flags.as_deref(), Some("EQ"));
        assert_eq!(pkg.provides[0].version.as_deref(), Some("4.2.1"));

        assert_eq!(pkg.requires.len(), 2);
        assert_eq!(pkg.requires[0].name, "libc.so.6()(64bit)");
        assert_eq!(pkg.requires[0].flags, None);
        assert_eq!(pkg.requires[1].flags.as_deref(), Some("GE"));
    }

    #[test]
    fn test_parse_primary_files() {
        let records = parse_primary(PRIMARY_XML).unwrap();
        let pkg = &records[0];
        assert_eq!(
            pkg.files,
            vec!["/usr/bin/obshell", "/etc/obshell/config.yaml"]
        );
    }

    #[test]
    fn test_parse_primary_location_base_override() {
        let records = parse_primary(PRIMARY_XML).unwrap();
        let pkg = &records[1];
        assert_eq!(pkg.epoch, "1");
        assert_eq!(
            pkg.location.base.as_deref(),
            Some("https://cdn.example.com/pool/")
        );
    }

    #[test]
    fn test_parse_primary_skips_nameless_entry() {
        let xml = r#"<metadata>
  <package type="rpm">
    <arch>x86_64</arch>
    <version epoch="0" ver="1.0" rel="1"/>
  </package>
  <package type="rpm">
    <name>good</name>
    <version epoch="0" ver="1.0" rel="1"/>
  </package>
</metadata>"#;
        let records = parse_primary(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "good");
    }

    #[test]
    fn test_parse_primary_malformed() {
        let result = parse_primary("<metadata><package></x></package></metadata>");
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_nvr_label() {
        let records = parse_primary(PRIMARY_XML).unwrap();
        assert_eq!(records[0].nvr(), "obshell-4.2.1-101.el8");
    }
}
