use super::ResearchTool;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const SUMMARY_SENTENCES: usize = 8;

/// Target of a wiki link, up to the first `|` or `#`.
static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|#]+)").expect("Wiki link pattern must compile"));

/// Encyclopedic background from the MediaWiki API.
pub struct WikipediaTool {
    http: reqwest::Client,
    api_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct PagesResponse {
    query: Option<PagesQuery>,
}

#[derive(Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    pageprops: Option<PageProps>,
}

#[derive(Deserialize)]
struct PageProps {
    disambiguation: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
}

#[derive(Deserialize)]
struct ParsedPage {
    #[serde(default)]
    wikitext: String,
}

enum Lookup {
    Found { extract: String },
    Disambiguation { title: String },
    Missing,
}

impl WikipediaTool {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_api_url(http, DEFAULT_API_URL)
    }

    pub fn with_api_url(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> Result<T> {
        Ok(self
            .http
            .get(&self.api_url)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?)
    }

    /// Resolves a free-text query to the best-matching article title.
    async fn suggest(&self, query: &str) -> Result<Option<String>> {
        let response: SearchResponse = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
            ])
            .await?;
        Ok(response
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title))
    }

    async fn page(&self, title: &str) -> Result<Lookup> {
        let response: PagesResponse = self
            .get(&[
                ("action", "query"),
                ("prop", "extracts|pageprops"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;
        let Some(page) = response.query.and_then(|q| q.pages.into_iter().next()) else {
            return Ok(Lookup::Missing);
        };
        if page.missing {
            return Ok(Lookup::Missing);
        }
        if page.pageprops.is_some_and(|p| p.disambiguation.is_some()) {
            return Ok(Lookup::Disambiguation { title: page.title });
        }
        match page.extract {
            Some(extract) if !extract.trim().is_empty() => Ok(Lookup::Found { extract }),
            _ => Ok(Lookup::Missing),
        }
    }

    /// The article titles a disambiguation page lists, in page order.
    async fn candidates(&self, title: &str) -> Result<Vec<String>> {
        let response: ParseResponse = self
            .get(&[
                ("action", "parse"),
                ("prop", "wikitext"),
                ("redirects", "1"),
                ("page", title),
            ])
            .await?;
        Ok(response
            .parse
            .map(|p| list_links(&p.wikitext))
            .unwrap_or_default())
    }

    async fn lookup(&self, query: &str) -> Result<String> {
        let Some(title) = self.suggest(query).await? else {
            return Ok(format!("No Wikipedia page found for: {}", query));
        };
        debug!(query = %query, title = %title, "Wikipedia suggestion");

        match self.page(&title).await? {
            Lookup::Found { extract } => Ok(format!(
                "[Wikipedia: {}]\n{}",
                query,
                first_sentences(&extract, SUMMARY_SENTENCES)
            )),
            Lookup::Missing => Ok(format!("No Wikipedia page found for: {}", query)),
            Lookup::Disambiguation { title } => {
                // One retry against the first candidate, taken literally.
                let retry = match self.candidates(&title).await {
                    Ok(candidates) => match candidates.into_iter().next() {
                        Some(candidate) => match self.page(&candidate).await {
                            Ok(Lookup::Found { extract }) => Some(format!(
                                "[Wikipedia: {}]\n{}",
                                candidate,
                                first_sentences(&extract, SUMMARY_SENTENCES)
                            )),
                            _ => None,
                        },
                        None => None,
                    },
                    Err(_) => None,
                };
                Ok(retry.unwrap_or_else(|| {
                    format!("Could not retrieve Wikipedia content for: {}", query)
                }))
            }
        }
    }
}

#[async_trait]
impl ResearchTool for WikipediaTool {
    fn name(&self) -> &str {
        "wiki_tool"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for encyclopedic background on a topic. Use it when the lesson is about \
         history, definitions, standard concepts, or famous people."
    }

    async fn invoke(&self, query: &str) -> String {
        match self.lookup(query).await {
            Ok(text) => text,
            Err(e) => format!("Wikipedia search failed: {}", e),
        }
    }
}

/// Link targets of `*` list lines, in the order they appear.
fn list_links(wikitext: &str) -> Vec<String> {
    wikitext
        .lines()
        .filter(|line| line.trim_start().starts_with('*'))
        .filter_map(|line| WIKI_LINK.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .filter(|target| !target.is_empty() && !target.contains(':'))
        .collect()
}

/// Returns the first `n` sentences of `text`, with whitespace normalized.
pub(crate) fn first_sentences(text: &str, n: usize) -> String {
    let text = super::normalize_whitespace(text);
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match chars.peek() {
                None => true,
                Some((_, next)) => next.is_whitespace(),
            };
            if at_boundary {
                count += 1;
                if count == n {
                    return text[..idx + c.len_utf8()].to_string();
                }
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn tool(server: &MockServer) -> WikipediaTool {
        WikipediaTool::with_api_url(reqwest::Client::new(), format!("{}/w/api.php", server.uri()))
    }

    async fn mount_search(server: &MockServer, query: &str, titles: &[&str]) {
        let hits: Vec<_> = titles.iter().map(|t| json!({ "title": t })).collect();
        Mock::given(method("GET"))
            .and(query_param("list", "search"))
            .and(query_param("srsearch", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "search": hits }
            })))
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, title: &str, page: serde_json::Value) {
        Mock::given(method("GET"))
            .and(query_param("prop", "extracts|pageprops"))
            .and(query_param("titles", title))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "query": { "pages": [page] } })),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_first_sentences() {
        let text = "One. Two! Three? Version 3.5 is four. Five.";
        assert_eq!(first_sentences(text, 2), "One. Two!");
        assert_eq!(first_sentences(text, 4), "One. Two! Three? Version 3.5 is four.");
        assert_eq!(first_sentences("Short text", 8), "Short text");
    }

    #[tokio::test]
    async fn test_summary_found() {
        let server = MockServer::start().await;
        mount_search(&server, "entropy", &["Entropy"]).await;
        mount_page(
            &server,
            "Entropy",
            json!({ "title": "Entropy", "extract": "Entropy is a measure. It grows." }),
        )
        .await;

        let text = tool(&server).await.invoke("entropy").await;
        assert_eq!(text, "[Wikipedia: entropy]\nEntropy is a measure. It grows.");
    }

    #[tokio::test]
    async fn test_no_search_hits_is_not_found() {
        let server = MockServer::start().await;
        mount_search(&server, "qwxzv", &[]).await;

        let text = tool(&server).await.invoke("qwxzv").await;
        assert_eq!(text, "No Wikipedia page found for: qwxzv");
    }

    #[tokio::test]
    async fn test_disambiguation_retries_first_candidate() {
        let server = MockServer::start().await;
        mount_search(&server, "heat", &["Heat (disambiguation)"]).await;
        mount_page(
            &server,
            "Heat (disambiguation)",
            json!({ "title": "Heat (disambiguation)", "pageprops": { "disambiguation": "" } }),
        )
        .await;
        Mock::given(method("GET"))
            .and(query_param("action", "parse"))
            .and(query_param("page", "Heat (disambiguation)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "parse": {
                    "title": "Heat (disambiguation)",
                    "wikitext": "'''Heat''' is energy in transfer.\n\n== Science ==\n* [[Heat|Heat (physics)]], energy transferred between systems\n* [[Atmospheric heat]]\n\n== Film ==\n* [[Heat (1995 film)]]"
                }
            })))
            .mount(&server)
            .await;
        mount_page(
            &server,
            "Heat",
            json!({ "title": "Heat", "extract": "Heat is energy in transfer." }),
        )
        .await;

        let text = tool(&server).await.invoke("heat").await;
        assert_eq!(text, "[Wikipedia: Heat]\nHeat is energy in transfer.");
    }

    #[test]
    fn test_list_links_keeps_page_order() {
        let wikitext = "'''Mercury''' may refer to:\n\
                        See [[Hermes]] for the god.\n\
                        * [[Mercury (planet)|Mercury]], the closest planet\n\
                        * [[Category:Planets]]\n\
                        * [[Mercury (element)#Isotopes|Mercury]], a chemical element\n\
                        * [[Freddie Mercury]]";
        assert_eq!(
            list_links(wikitext),
            vec!["Mercury (planet)", "Mercury (element)", "Freddie Mercury"]
        );
    }

    #[tokio::test]
    async fn test_disambiguation_follows_listing_order_not_alphabetical() {
        let server = MockServer::start().await;
        mount_search(&server, "mercury", &["Mercury"]).await;
        mount_page(
            &server,
            "Mercury",
            json!({ "title": "Mercury", "pageprops": { "disambiguation": "" } }),
        )
        .await;
        Mock::given(method("GET"))
            .and(query_param("action", "parse"))
            .and(query_param("page", "Mercury"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "parse": {
                    "title": "Mercury",
                    "wikitext": "* [[Mercury (planet)]]\n* [[Freddie Mercury]]"
                }
            })))
            .mount(&server)
            .await;
        mount_page(
            &server,
            "Mercury (planet)",
            json!({ "title": "Mercury (planet)", "extract": "Mercury is the first planet." }),
        )
        .await;
        mount_page(
            &server,
            "Freddie Mercury",
            json!({ "title": "Freddie Mercury", "extract": "Freddie Mercury was a singer." }),
        )
        .await;

        let text = tool(&server).await.invoke("mercury").await;
        assert_eq!(text, "[Wikipedia: Mercury (planet)]\nMercury is the first planet.");
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let text = tool(&server).await.invoke("anything").await;
        assert!(text.starts_with("Wikipedia search failed:"));
    }
}
