use colored::Colorize;

pub mod build;
pub mod render;

pub use build::{BuildOptions, build_sitemap};
pub use render::{OutputFormat, render_sitemap};

pub fn print_banner() {
    println!();
    println!("  {}", "sitemapper".bright_cyan().bold());
    println!(
        "  {}",
        format!("site link graph builder v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!();
}
