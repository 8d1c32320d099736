// src/host.rs

//! Host environment probes
//!
//! Resolves the architecture token, platform release, and LSE atomics
//! support that mirror construction consumes. Probed once at startup and
//! passed around explicitly, never read lazily from globals.

use regex::Regex;
use std::cmp::Ordering;
use std::process::Command;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const X86_64: &str = "x86_64";
pub const AARCH64: &str = "aarch64";

/// Platform release tokens (Enterprise Linux major versions)
pub const EL7: &str = "7";
pub const EL8: &str = "8";

/// glibc version at which a host counts as an EL8-generation platform
const EL8_GLIBC_VERSION: &str = "2.28";

/// Host properties consumed by mirror construction
#[derive(Debug, Clone)]
pub struct HostProfile {
    /// Normalized architecture token (e.g. "x86_64", "aarch64")
    pub arch: String,
    /// Platform release identifier substituted into mirror templates
    pub release: String,
    /// Whether the CPU supports the LSE atomic instruction extension.
    /// Assumed true on everything except aarch64.
    pub lse_supported: bool,
}

impl HostProfile {
    /// Probe the local host once.
    pub fn detect() -> Self {
        let arch = normalize_arch(std::env::consts::ARCH);
        let lse_supported = if arch == AARCH64 {
            probe_lse_support()
        } else {
            true
        };
        let release = probe_platform_release();

        debug!(
            "Detected host: arch={} release=el{} lse={}",
            arch, release, lse_supported
        );
        Self {
            arch,
            release,
            lse_supported,
        }
    }
}

/// Normalize alternate architecture spellings to the repository tokens.
/// Unknown architectures pass through verbatim.
pub fn normalize_arch(arch: &str) -> String {
    match arch {
        "amd64" => X86_64.to_string(),
        "arm64" => AARCH64.to_string(),
        other => other.to_string(),
    }
}

/// LSE atomics show up as the "atomics" CPU feature on aarch64.
fn probe_lse_support() -> bool {
    match std::fs::read_to_string("/proc/cpuinfo") {
        Ok(cpuinfo) => cpuinfo.contains("atomics"),
        Err(e) => {
            warn!("Failed to read /proc/cpuinfo: {}", e);
            false
        }
    }
}

/// Derive the platform release from the glibc version reported by
/// `ldd --version` (stdout on glibc, stderr on some alternatives).
fn probe_platform_release() -> String {
    let output = match Command::new("ldd").arg("--version").output() {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to run ldd --version: {}", e);
            return EL7.to_string();
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if !stdout.is_empty() { stdout } else { stderr };

    release_from_ldd(&text)
}

static LDD_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ldd\s+\(.*\)\s+(\d+\.\d+)|ldd\s+(\d+\.\d+)").unwrap());

fn release_from_ldd(text: &str) -> String {
    let glibc = LDD_VERSION
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str());

    match glibc {
        Some(glibc) if crate::version::compare(glibc, EL8_GLIBC_VERSION) != Ordering::Less => {
            EL8.to_string()
        }
        _ => EL7.to_string(),
    }
}
