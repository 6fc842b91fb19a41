use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitedown")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitedown")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .action(clap::ArgAction::Count)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("mirror")
                .about(
                    "Mirror a site (or a list of sites) into a browsable local copy. Re-running \
                resumes an interrupted mirror without refetching stored files.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The seed URL to mirror")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Mirror root directory")
                        .default_value("downloads"),
                )
                .arg(
                    arg!(--"domain" <HOST>)
                        .required(false)
                        .help("Domain whose pages are traversed (default: the seed's host)"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"retries" <NUM>)
                        .required(false)
                        .help("Retries for transient fetch failures (connect, timeout, 5xx, 429)")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"delay" <MS>)
                        .required(false)
                        .help("Delay in milliseconds between network fetches")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("0"),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Stop following links after this many HTML pages")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-bytes" <NUM>)
                        .required(false)
                        .help("Stop fetching after this many bytes have been downloaded")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"max-depth" <NUM>)
                        .required(false)
                        .help("Maximum link depth from the seed (0 mirrors the seed page only)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"proxy" <URL>)
                        .required(false)
                        .help("HTTP(S) proxy for all requests"),
                )
                .arg(
                    arg!(--"user-agent" <UA>)
                        .required(false)
                        .help("User-Agent header (default: a desktop browser)"),
                )
                .arg(
                    arg!(--"root-index")
                        .required(false)
                        .help("Write an index.html at the mirror root that redirects to the seed page")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"follow-stylesheets")
                        .required(false)
                        .help("Fetch and rewrite url(...) and @import references inside stylesheets")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"report-format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-r --"report-out" <PATH>)
                        .required(false)
                        .help("Save the report to a file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
