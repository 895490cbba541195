use super::{ResearchTool, decode_entities, normalize_whitespace};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS: usize = 4;

static RESULT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a\s[^>]*class="[^"]*\bresult__a\b[^"]*"[^>]*>(.*?)</a>"#)
        .expect("Result link pattern must compile")
});
static RESULT_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(a|div|td)\s[^>]*class="[^"]*\bresult__snippet\b[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("Result snippet pattern must compile")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Tag pattern must compile"));

/// General web search through DuckDuckGo's HTML results page.
pub struct WebSearchTool {
    http: reqwest::Client,
    search_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
}

impl WebSearchTool {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_search_url(http, DEFAULT_SEARCH_URL)
    }

    pub fn with_search_url(http: reqwest::Client, search_url: impl Into<String>) -> Self {
        Self {
            http,
            search_url: search_url.into(),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<WebResult>> {
        let body = self
            .http
            .get(&self.search_url)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_results(&body))
    }
}

/// Pairs each organic result title with the snippet that follows it, in page
/// order. Sponsored links (served through `y.js`) are skipped.
pub fn parse_results(html: &str) -> Vec<WebResult> {
    let links: Vec<_> = RESULT_LINK.captures_iter(html).collect();
    let mut results = Vec::new();
    for (i, link) in links.iter().enumerate() {
        if results.len() >= MAX_RESULTS {
            break;
        }
        let (Some(anchor), Some(inner)) = (link.get(0), link.get(1)) else {
            continue;
        };
        if anchor.as_str().contains("y.js") {
            continue;
        }
        let title = html_text(inner.as_str());
        if title.is_empty() {
            continue;
        }
        let block_end = links
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |next| next.start());
        let snippet = RESULT_SNIPPET
            .captures(&html[anchor.end()..block_end])
            .and_then(|c| c.get(2))
            .map(|m| html_text(m.as_str()))
            .unwrap_or_default();
        results.push(WebResult { title, snippet });
    }
    results
}

fn html_text(fragment: &str) -> String {
    decode_entities(&normalize_whitespace(&TAG.replace_all(fragment, "")))
}

#[async_trait]
impl ResearchTool for WebSearchTool {
    fn name(&self) -> &str {
        "search_tool"
    }

    fn description(&self) -> &str {
        "Search the web via DuckDuckGo for general information. Use it for everything else: \
         how-to topics, best practices, current events, code examples, business concepts, pop \
         culture, and anything too recent or niche for Wikipedia or arXiv."
    }

    async fn invoke(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(results) if results.is_empty() => format!("No web results found for: {}", query),
            Ok(results) => {
                let snippets: Vec<String> = results
                    .iter()
                    .map(|r| format!("{}: {}", r.title, r.snippet))
                    .collect();
                format!("[DuckDuckGo: {}]\n\n{}", query, snippets.join("\n\n"))
            }
            Err(e) => format!("DuckDuckGo search failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result(href: &str, title: &str, snippet: &str) -> String {
        format!(
            r#"<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="{href}">{title}</a>
    </h2>
    <div class="result__extras"><a class="result__url" href="{href}">example.com</a></div>
    <a class="result__snippet" href="{href}">{snippet}</a>
  </div>
</div>"#
        )
    }

    fn page(results: &[String]) -> String {
        format!(
            "<html><body><div id=\"links\" class=\"results\">{}</div></body></html>",
            results.concat()
        )
    }

    #[test]
    fn test_parse_results_skips_ads_strips_markup_and_caps_at_four() {
        let html = page(&[
            result(
                "https://duckduckgo.com/y.js?ad_provider=x",
                "Buy Thermostats",
                "Sponsored",
            ),
            result(
                "//duckduckgo.com/l/?uddg=heat",
                "<b>Heat</b> transfer &amp; you",
                "Heat moves from <b>hot</b>\n   to cold.",
            ),
            result("//duckduckgo.com/l/?uddg=e", "Entropy", "Disorder&#39;s measure."),
            result("//duckduckgo.com/l/?uddg=w", "Work", "Force times distance."),
            result("//duckduckgo.com/l/?uddg=c", "Carnot", "An ideal engine."),
            result("//duckduckgo.com/l/?uddg=f", "Fifth", "Dropped."),
        ]);

        let results = parse_results(&html);
        assert_eq!(results.len(), MAX_RESULTS);
        assert_eq!(
            results[0],
            WebResult {
                title: "Heat transfer & you".to_string(),
                snippet: "Heat moves from hot to cold.".to_string(),
            }
        );
        assert_eq!(results[1].snippet, "Disorder's measure.");
        assert_eq!(results[3].title, "Carnot");
    }

    #[test]
    fn test_parse_results_does_not_borrow_the_next_snippet() {
        let html = format!(
            "{}{}",
            r#"<a rel="nofollow" class="result__a" href="/a">No snippet here</a>"#,
            result("/b", "Second", "Belongs to second."),
        );
        let results = parse_results(&html);
        assert_eq!(results[0].snippet, "");
        assert_eq!(results[1].snippet, "Belongs to second.");
    }

    #[tokio::test]
    async fn test_invoke_formats_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Heat Thermodynamics"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&[
                result("/l/?uddg=1", "Heat", "Energy in transfer."),
                result("/l/?uddg=2", "Tokio", "An async runtime."),
            ])))
            .mount(&server)
            .await;

        let tool =
            WebSearchTool::with_search_url(reqwest::Client::new(), format!("{}/html/", server.uri()));
        assert_eq!(
            tool.invoke("Heat Thermodynamics").await,
            "[DuckDuckGo: Heat Thermodynamics]\n\nHeat: Energy in transfer.\n\nTokio: An async runtime."
        );
    }

    #[tokio::test]
    async fn test_invoke_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><div class=\"no-results\">No results.</div></body></html>",
            ))
            .mount(&server)
            .await;

        let tool = WebSearchTool::with_search_url(reqwest::Client::new(), server.uri());
        assert_eq!(tool.invoke("zzzz").await, "No web results found for: zzzz");
    }

    #[tokio::test]
    async fn test_invoke_reports_failure_as_text() {
        let tool = WebSearchTool::with_search_url(reqwest::Client::new(), "http://127.0.0.1:1/");
        assert!(tool.invoke("x").await.starts_with("DuckDuckGo search failed:"));
    }
}
