// src/main.rs

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rpmfetch::host::HostProfile;
use rpmfetch::matcher::PackageQuery;
use rpmfetch::mirror::{self, BaseMirror, MirrorSet};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "rpmfetch")]
#[command(author, version, about = "Resolve and download RPM packages from prioritized repository mirrors", long_about = None)]
struct Cli {
    /// Base mirror URL template (repeatable, replaces the default channels)
    #[arg(long = "mirror", value_name = "URL", global = true)]
    mirrors: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// Package name
    name: String,
    /// Exact epoch to match
    #[arg(long)]
    epoch: Option<String>,
    /// Exact version to match
    #[arg(long = "pkg-version")]
    pkg_version: Option<String>,
    /// Exact release to match
    #[arg(long)]
    release: Option<String>,
    /// Comparison flag of the package's first provides entry (EQ, GE, ...)
    #[arg(long)]
    flags: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all matching packages across the configured mirrors
    Search {
        #[command(flatten)]
        query: QueryArgs,
        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download the best-matching package
    Download {
        #[command(flatten)]
        query: QueryArgs,
        /// Destination directory (must be an absolute path)
        #[arg(short, long)]
        dest: PathBuf,
    },
}

fn build_query(args: QueryArgs) -> PackageQuery {
    PackageQuery {
        name: args.name,
        epoch: args.epoch,
        version: args.pkg_version,
        release: args.release,
        flags: args.flags,
    }
}

fn build_mirror_set(urls: &[String]) -> MirrorSet {
    let host = HostProfile::detect();
    let bases = if urls.is_empty() {
        mirror::default_base_mirrors()
    } else {
        // A raw URL doubles as the mirror's display name
        urls.iter()
            .map(|url| BaseMirror::new(url.clone(), url.clone()))
            .collect()
    };
    MirrorSet::from_bases(&bases, &host)
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mirrors = build_mirror_set(&cli.mirrors);

    match cli.command {
        Commands::Search { query, json } => {
            let query = build_query(query);
            let matches = mirrors.search_all(&query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else {
                println!("Matching packages:");
                for record in &matches {
                    print!("  {} [{}]", record.nvr(), record.arch);
                    if let Some(size) = record.package_size {
                        print!(" ({} bytes)", size);
                    }
                    println!();
                }
                println!("\nTotal: {} package(s)", matches.len());
            }

            Ok(())
        }
        Commands::Download { query, dest } => {
            let query = build_query(query);
            info!("Downloading best match for {}", query.label());

            let path = mirrors.download_any(&query, &dest)?;
            println!("Downloaded package to: {}", path.display());

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_maps_all_fields() {
        let args = QueryArgs {
            name: "obshell".to_string(),
            epoch: Some("0".to_string()),
            pkg_version: Some("4.2.1".to_string()),
            release: Some("101.el8".to_string()),
            flags: Some("EQ".to_string()),
        };
        let query = build_query(args);

        assert_eq!(query.name, "obshell");
        assert_eq!(query.epoch.as_deref(), Some("0"));
        assert_eq!(query.version.as_deref(), Some("4.2.1"));
        assert_eq!(query.release.as_deref(), Some("101.el8"));
        assert_eq!(query.flags.as_deref(), Some("EQ"));
    }

    #[test]
    fn test_build_mirror_set_defaults_to_two_channels() {
        let set = build_mirror_set(&[]);
        assert_eq!(set.mirrors().len(), 2);
    }

    #[test]
    fn test_build_mirror_set_custom_urls_replace_defaults() {
        let set = build_mirror_set(&["https://mirrors.example.com/el/8/x86_64/".to_string()]);
        assert_eq!(set.mirrors().len(), 1);
        assert_eq!(
            set.mirrors()[0].base_url(),
            "https://mirrors.example.com/el/8/x86_64/"
        );
    }
}
