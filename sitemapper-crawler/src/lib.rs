pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod scope;

pub use crawler::{Crawler, Sitemap};
pub use error::CrawlError;
pub use extract::extract_links;
pub use fetch::{ContentNegotiator, Fetcher, HttpFetcher};
pub use scope::HostScope;
