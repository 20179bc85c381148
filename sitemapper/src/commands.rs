use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitemapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemapper")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("build")
                .about(
                    "Crawl a site from a seed URL and build the graph of which page links \
                to which.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The seed URL to start crawling from"),
                )
                .arg(
                    arg!(-d --"decay" <DEPTH>)
                        .required(false)
                        .help(
                            "Depth budget attached to the seed; it shrinks by one per hop and \
                        exploration stops when it runs out.",
                        )
                        .value_parser(clap::value_parser!(u32))
                        .default_value("3"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async worker 'threads' in the worker pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("5"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: dot, json, text")
                        .value_parser(["dot", "json", "text"])
                        .default_value("dot"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the rendered sitemap to a file (default: print to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
