// src/lib.rs

//! rpmfetch
//!
//! Resolves and downloads RPM packages from a prioritized list of
//! repomd/primary repositories.
//!
//! # Architecture
//!
//! - Two-hop metadata protocol: the small repomd.xml descriptor, then the
//!   compressed primary package index it points at
//! - Candidate filtering and multi-key version ranking with an
//!   architecture-specific build-variant tie-break
//! - Ordered multi-mirror fallback: the first mirror with a match wins;
//!   hard errors abort instead of falling through
//! - Stateless per request: every search re-fetches both hops

pub mod host;
pub mod matcher;
pub mod mirror;
pub mod repository;
pub mod version;

mod error;

pub use error::{Error, Result};
