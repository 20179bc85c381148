use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitemapper_core::build::{BuildOptions, build_sitemap};
use sitemapper_core::render::{OutputFormat, render_sitemap};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Parse a seed argument as a URL, trying to add http:// if needed
pub fn parse_seed(raw: &str) -> Option<String> {
    if Url::parse(raw).is_ok() {
        return Some(raw.to_string());
    }

    let with_scheme = format!("http://{}", raw);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    None
}

/// Write rendered output to the given path (with ~ expansion), or to
/// stdout when no path is provided.
pub fn write_output(rendered: &str, output: Option<&PathBuf>) -> Result<(), String> {
    match output {
        Some(path) => {
            let raw = path.to_string_lossy();
            let expanded = shellexpand::tilde(raw.as_ref());
            fs::write(expanded.as_ref(), rendered)
                .map_err(|e| format!("Failed to write {}: {}", expanded, e))
        }
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}

pub async fn handle_build(args: &ArgMatches) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let raw_seed = args.get_one::<String>("url").unwrap();
    let Some(seed) = parse_seed(raw_seed) else {
        eprintln!("{} Invalid seed URL '{}'", "✗".red().bold(), raw_seed);
        std::process::exit(1);
    };
    let decay = *args.get_one::<u32>("decay").unwrap();
    let threads = *args.get_one::<usize>("threads").unwrap();
    let timeout = *args.get_one::<u64>("timeout").unwrap();
    let format = OutputFormat::from_str(args.get_one::<String>("format").unwrap())
        .unwrap_or(OutputFormat::Dot);
    let output = args.get_one::<PathBuf>("output");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!(
        "Crawling {} (decay {}, {} workers)",
        seed, decay, threads
    ));

    let options = BuildOptions {
        seed,
        decay,
        workers: threads,
        timeout_secs: timeout,
        ..BuildOptions::default()
    };

    let sitemap = match build_sitemap(&options).await {
        Ok(sitemap) => {
            spinner.finish_and_clear();
            println!(
                "{} Crawl complete: {} pages mapped",
                "✓".green().bold(),
                sitemap.len()
            );
            sitemap
        }
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let rendered = match render_sitemap(&sitemap, format) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("{} Failed to render sitemap: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = write_output(&rendered, output) {
        eprintln!("{} {}", "✗".red().bold(), e);
        std::process::exit(1);
    }
    if let Some(path) = output {
        println!(
            "{} Sitemap written to {}",
            "✓".green().bold(),
            path.display()
        );
    }
}
