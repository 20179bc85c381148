use petgraph::Graph;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use sitemapper_crawler::Sitemap;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dot,
    Json,
    Text,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dot" | "graphviz" => Some(OutputFormat::Dot),
            "json" => Some(OutputFormat::Json),
            "text" | "txt" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

/// Render the adjacency map in the requested format. Output is sorted by
/// URL so repeated renders of the same sitemap are byte-identical.
pub fn render_sitemap(sitemap: &Sitemap, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Dot => Ok(render_dot(sitemap)),
        OutputFormat::Json => render_json(sitemap),
        OutputFormat::Text => Ok(render_text(sitemap)),
    }
}

fn sorted(sitemap: &Sitemap) -> BTreeMap<&str, BTreeSet<&str>> {
    sitemap
        .iter()
        .map(|(page, links)| {
            (
                page.as_str(),
                links.iter().map(String::as_str).collect::<BTreeSet<_>>(),
            )
        })
        .collect()
}

/// Graphviz digraph with one node per URL and one edge per
/// page-links-to-page relation.
pub fn render_dot(sitemap: &Sitemap) -> String {
    let mut graph: Graph<&str, &str> = Graph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for (page, links) in sorted(sitemap) {
        let from = *nodes.entry(page).or_insert_with(|| graph.add_node(page));
        for link in links {
            let to = *nodes.entry(link).or_insert_with(|| graph.add_node(link));
            graph.add_edge(from, to, "");
        }
    }

    format!(
        "digraph G {{\n    ratio=\"compress\"\n    rankdir=LR\n{}}}\n",
        Dot::with_config(&graph, &[Config::GraphContentOnly, Config::EdgeNoLabel])
    )
}

fn render_json(sitemap: &Sitemap) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(&sorted(sitemap))?;
    out.push('\n');
    Ok(out)
}

/// Human-readable listing: each page followed by its outgoing links.
pub fn render_text(sitemap: &Sitemap) -> String {
    let total_links: usize = sitemap.values().map(|links| links.len()).sum();

    let mut report = String::new();
    report.push_str(&format!(
        "Pages mapped: {}\nLinks recorded: {}\n\n",
        sitemap.len(),
        total_links
    ));
    for (page, links) in sorted(sitemap) {
        report.push_str(page);
        report.push('\n');
        for link in links {
            report.push_str(&format!("  -> {}\n", link));
        }
        report.push('\n');
    }
    report
}
