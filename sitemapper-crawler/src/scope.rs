use std::collections::HashSet;
use url::{Host, Url};

/// The set of hostnames considered part of the target site.
///
/// Derived once from the seed URL. A literal IP address is scoped to
/// itself only. A `www.`-prefixed host and a bare two-label domain are
/// each treated as equivalent to their counterpart. Subdomains are never
/// folded into the bare domain; `sub.example.com` is out of scope for a
/// crawl seeded at `example.com`.
#[derive(Debug, Clone)]
pub struct HostScope {
    hostnames: HashSet<String>,
}

impl HostScope {
    pub fn from_seed(seed: &Url) -> Self {
        let mut hostnames = HashSet::new();
        match seed.host() {
            Some(Host::Domain(domain)) => {
                if let Some(bare) = domain.strip_prefix("www.") {
                    hostnames.insert(bare.to_string());
                } else if domain.split('.').count() == 2 {
                    hostnames.insert(format!("www.{}", domain));
                }
                hostnames.insert(domain.to_string());
            }
            // Literal IPv4/IPv6: no www. equivalence
            Some(host) => {
                hostnames.insert(host.to_string());
            }
            None => {}
        }
        Self { hostnames }
    }

    /// True iff the URL's hostname belongs to the scope.
    pub fn allows(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.hostnames.contains(host))
            .unwrap_or(false)
    }
}
