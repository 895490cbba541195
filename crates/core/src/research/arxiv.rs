use super::{ResearchTool, decode_entities, normalize_whitespace};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";
const MAX_RESULTS: usize = 3;
const MAX_AUTHORS: usize = 3;
const ABSTRACT_CHARS: usize = 500;

static ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").expect("Entry pattern must compile"));
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("Title pattern must compile")
});
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("Summary pattern must compile")
});
static AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").expect("Author pattern must compile")
});

/// Academic papers from the arXiv export API (Atom feed).
pub struct ArxivTool {
    http: reqwest::Client,
    api_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
}

impl ArxivTool {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_api_url(http, DEFAULT_API_URL)
    }

    pub fn with_api_url(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        let search_query = format!("all:{}", query);
        let max_results = MAX_RESULTS.to_string();
        let body = self
            .http
            .get(&self.api_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let mut papers = parse_feed(&body);
        papers.truncate(MAX_RESULTS);
        Ok(papers)
    }
}

/// Extracts papers from an Atom feed body, in feed order.
pub fn parse_feed(body: &str) -> Vec<Paper> {
    ENTRY
        .captures_iter(body)
        .filter_map(|entry| {
            let entry = entry.get(1)?.as_str();
            let title = TITLE.captures(entry)?.get(1)?.as_str();
            let summary = SUMMARY
                .captures(entry)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let authors = AUTHOR
                .captures_iter(entry)
                .filter_map(|c| c.get(1))
                .map(|m| decode_entities(&normalize_whitespace(m.as_str())))
                .collect();
            Some(Paper {
                title: decode_entities(&normalize_whitespace(title)),
                authors,
                summary: decode_entities(&normalize_whitespace(summary)),
            })
        })
        .collect()
}

fn format_paper(paper: &Paper) -> String {
    let authors: Vec<&str> = paper
        .authors
        .iter()
        .take(MAX_AUTHORS)
        .map(String::as_str)
        .collect();
    let abstract_text: String = paper.summary.chars().take(ABSTRACT_CHARS).collect();
    format!(
        "Title: {}\nAuthors: {}\nAbstract: {}",
        paper.title,
        authors.join(", "),
        abstract_text
    )
}

#[async_trait]
impl ResearchTool for ArxivTool {
    fn name(&self) -> &str {
        "arxiv_tool"
    }

    fn description(&self) -> &str {
        "Search arXiv for academic papers and research. Use it when the lesson is about deep \
         learning architectures, quantum physics, math theorems, or bleeding-edge research."
    }

    async fn invoke(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(papers) if papers.is_empty() => format!("No ArXiv papers found for: {}", query),
            Ok(papers) => {
                let summaries: Vec<String> = papers.iter().map(format_paper).collect();
                format!("[ArXiv: {}]\n\n{}", query, summaries.join("\n\n---\n\n"))
            }
            Err(e) => format!("ArXiv search failed: {}", e),
        }
    }
}
