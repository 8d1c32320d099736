// src/repository/repomd.rs

//! repomd.xml descriptor parsing
//!
//! The descriptor is the small first hop of the repository protocol: a
//! list of typed data entries, one of which ("primary") points at the
//! compressed package index.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

/// Type tag of the entry holding the package index location
pub const PRIMARY_TYPE: &str = "primary";

/// An href with an optional per-location base URL override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub href: String,
    pub base: Option<String>,
}

/// One typed data entry in the descriptor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepomdEntry {
    pub data_type: String,
    pub location: Location,
    pub timestamp: Option<u64>,
    pub size: Option<u64>,
    pub open_size: Option<u64>,
}

/// The parsed top-level metadata document of one repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepomdDescriptor {
    pub revision: Option<String>,
    pub entries: Vec<RepomdEntry>,
}

impl RepomdDescriptor {
    /// Location of the primary package index. The descriptor must carry
    /// exactly this entry type for the repository to be usable.
    pub fn primary_location(&self) -> Result<&Location> {
        self.entries
            .iter()
            .find(|entry| entry.data_type == PRIMARY_TYPE)
            .map(|entry| &entry.location)
            .ok_or_else(|| Error::ParseError("primary repomd not found".to_string()))
    }
}

/// Extract href/base attributes from a `<location>` element.
pub(crate) fn parse_location(e: &BytesStart) -> Location {
    let mut location = Location::default();
    for attr in e.attributes().filter_map(|a| a.ok()) {
        match attr.key.as_ref() {
            b"href" => location.href = String::from_utf8_lossy(&attr.value).to_string(),
            b"base" => location.base = Some(String::from_utf8_lossy(&attr.value).to_string()),
            _ => {}
        }
    }
    location
}

/// Parse a repomd.xml document into its typed entry list.
pub fn parse_repomd(xml: &str) -> Result<RepomdDescriptor> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut descriptor = RepomdDescriptor::default();
    let mut current: Option<RepomdEntry> = None;
    let mut current_tag = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag.as_str() {
                    "data" => {
                        let mut entry = RepomdEntry::default();
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            if attr.key.as_ref() == b"type" {
                                entry.data_type = String::from_utf8_lossy(&attr.value).to_string();
                            }
                        }
                        current = Some(entry);
                    }
                    "location" => {
                        if let Some(ref mut entry) = current {
                            entry.location = parse_location(&e);
                        }
                    }
                    _ => {}
                }
                current_tag = tag;
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"location" {
                    if let Some(ref mut entry) = current {
                        entry.location = parse_location(&e);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(ref mut entry) = current {
                    match current_tag.as_str() {
                        "timestamp" => entry.timestamp = text.parse().ok(),
                        "size" => entry.size = text.parse().ok(),
                        "open-size" => entry.open_size = text.parse().ok(),
                        _ => {}
                    }
                } else if current_tag == "revision" {
                    descriptor.revision = Some(text);
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"data" {
                    if let Some(entry) = current.take() {
                        descriptor.entries.push(entry);
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Failed to parse repomd.xml: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPOMD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <revision>1700000000</revision>
  <data type="primary">
    <location href="repodata/primary.xml.gz"/>
    <timestamp>1700000000</timestamp>
    <size>123456</size>
    <open-size>654321</open-size>
  </data>
  <data type="filelists">
    <location href="repodata/filelists.xml.gz"/>
    <timestamp>1700000001</timestamp>
    <size>999</size>
  </data>
</repomd>"#;

    #[test]
    fn test_parse_repomd_entries() {
        let descriptor = parse_repomd(REPOMD_XML).unwrap();
        assert_eq!(descriptor.revision.as_deref(), Some("1700000000"));
        assert_eq!(descriptor.entries.len(), 2);

        let primary = &descriptor.entries[0];
        assert_eq!(primary.data_type, "primary");
        assert_eq!(primary.location.href, "repodata/primary.xml.gz");
        assert_eq!(primary.timestamp, Some(1700000000));
        assert_eq!(primary.size, Some(123456));
        assert_eq!(primary.open_size, Some(654321));
    }

    #[test]
    fn test_primary_location_found() {
        let descriptor = parse_repomd(REPOMD_XML).unwrap();
        let location = descriptor.primary_location().unwrap();
        assert_eq!(location.href, "repodata/primary.xml.gz");
        assert_eq!(location.base, None);
    }

    #[test]
    fn test_primary_location_missing() {
        let xml = r#"<repomd><data type="filelists"><location href="x.gz"/></data></repomd>"#;
        let descriptor = parse_repomd(xml).unwrap();
        let err = descriptor.primary_location().unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
        assert!(err.to_string().contains("primary repomd not found"));
    }

    #[test]
    fn test_parse_location_base_attribute() {
        let xml = r#"<repomd>
  <data type="primary">
    <location href="repodata/primary.xml.gz" base="https://cdn.example.com/repo/"/>
  </data>
</repomd>"#;
        let descriptor = parse_repomd(xml).unwrap();
        let location = descriptor.primary_location().unwrap();
        assert_eq!(
            location.base.as_deref(),
            Some("https://cdn.example.com/repo/")
        );
    }

    #[test]
    fn test_parse_repomd_malformed() {
        // Mismatched end tag
        let result = parse_repomd("<repomd><data type=\"primary\"></x></data></repomd>");
        assert!(matches!(result, Err(Error::ParseError(_))));
    }
}
