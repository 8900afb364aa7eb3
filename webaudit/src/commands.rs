use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("webaudit")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("webaudit")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Log debug output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("audit")
                .about(
                    "Crawl a site from URL and audit every page on its host. Writes audit \
                records to the database and a rapport folder of CSV sheets.",
                )
                .arg(
                    arg!(<URL>)
                        .required(true)
                        .help("The seed URL; only its host is crawled"),
                )
                .arg(
                    arg!(--"continue")
                        .required(false)
                        .help("Resume from the checkpoint of a previous run and stop after --max-updates pages")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"dry-run")
                        .required(false)
                        .help("Log records instead of saving them")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"max-updates" <N>)
                        .required(false)
                        .help("Pages audited per invocation when resuming with --continue")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("500"),
                )
                .arg(
                    arg!(--"cache-folder" <PATH>)
                        .required(false)
                        .help("Folder holding checkpoints, the default database and the Tika jar")
                        .default_value("./cache"),
                )
                .arg(
                    arg!(--"rapports-folder" <PATH>)
                        .required(false)
                        .help("Folder in which the Audit-Rapport-<timestamp> folder is written")
                        .default_value("."),
                )
                .arg(
                    arg!(--"database" <PATH>)
                        .required(false)
                        .help("SQLite database for audit records (default: <cache-folder>/audit.db)"),
                )
                .arg(
                    arg!(--"content-type" <TYPE>)
                        .required(false)
                        .help("Category under which records are stored")
                        .default_value("audit"),
                )
                .arg(
                    arg!(--"pa11y")
                        .required(false)
                        .help("Run the pa11y accessibility analyzer on HTML pages")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"lighthouse")
                        .required(false)
                        .help("Run the lighthouse performance analyzer")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"tika")
                        .required(false)
                        .help("Run the Tika text and locale extractor")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"all")
                        .required(false)
                        .help("Run every analyzer")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with_all(["pa11y", "lighthouse", "tika"]),
                )
                .arg(
                    arg!(--"ignore-regex" <REGEX>)
                        .required(false)
                        .help("Skip URLs whose path matches this pattern"),
                )
                .arg(
                    arg!(--"analyzers-config" <PATH>)
                        .required(false)
                        .help("JSON file overriding program paths and timeouts of enabled analyzers"),
                )
                .arg(
                    arg!(--"no-progress")
                        .required(false)
                        .help("Disable the progress spinner")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
