// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn query_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("name").required(true).help("Package name"))
        .arg(
            Arg::new("epoch")
                .long("epoch")
                .value_name("EPOCH")
                .help("Exact epoch to match"),
        )
        .arg(
            Arg::new("pkg_version")
                .long("pkg-version")
                .value_name("VERSION")
                .help("Exact version to match"),
        )
        .arg(
            Arg::new("release")
                .long("release")
                .value_name("RELEASE")
                .help("Exact release to match"),
        )
        .arg(
            Arg::new("flags")
                .long("flags")
                .value_name("FLAGS")
                .help("Comparison flag of the package's first provides entry"),
        )
}

fn build_cli() -> Command {
    Command::new("rpmfetch")
        .version(env!("CARGO_PKG_VERSION"))
        .author("rpmfetch Contributors")
        .about("Resolve and download RPM packages from prioritized repository mirrors")
        .subcommand_required(true)
        .arg(
            Arg::new("mirror")
                .long("mirror")
                .value_name("URL")
                .action(clap::ArgAction::Append)
                .global(true)
                .help("Base mirror URL template (repeatable, replaces the default channels)"),
        )
        .subcommand(
            query_args(
                Command::new("search")
                    .about("List all matching packages across the configured mirrors"),
            )
            .arg(
                Arg::new("json")
                    .long("json")
                    .action(clap::ArgAction::SetTrue)
                    .help("Print matches as JSON"),
            ),
        )
        .subcommand(
            query_args(Command::new("download").about("Download the best-matching package")).arg(
                Arg::new("dest")
                    .short('d')
                    .long("dest")
                    .value_name("DIR")
                    .required(true)
                    .help("Destination directory (must be an absolute path)"),
            ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)
        .expect("Failed to render man page");

    let man_path = man_dir.join("rpmfetch.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
