//! Research Tool Set
//!
//! Three independent lookups (encyclopedia, academic papers, general web)
//! sharing one contract: a free-text query in, free text out, never an error.
//! The model picks a tool by name from the advertised descriptions; when it
//! declines, or names something we cannot resolve, the set falls back to the
//! general web search with a query built from the lesson and course titles.

pub mod arxiv;
pub mod web;
pub mod wikipedia;

use crate::llm_client::{LLMAction, LLMClient, ToolSpec};
use async_trait::async_trait;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use regex::{Captures, Regex};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{info, warn};

pub use arxiv::ArxivTool;
pub use web::WebSearchTool;
pub use wikipedia::WikipediaTool;

const USER_AGENT: &str = concat!("course-architect/", env!("CARGO_PKG_VERSION"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("Entity pattern must compile")
});

/// Arguments every research tool accepts.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResearchQuery {
    /// The topic to look up, phrased as a short search query.
    pub query: String,
}

/// A lookup capability the model can select.
#[async_trait]
pub trait ResearchTool: Send + Sync {
    /// Name advertised to the model and recorded as the lesson's `source`.
    fn name(&self) -> &str;

    /// Tells the model when this tool is the right choice.
    fn description(&self) -> &str;

    /// Runs the lookup. Failures are reported in the returned text.
    async fn invoke(&self, query: &str) -> String;
}

/// Raw research text plus the name of the tool that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchOutcome {
    pub text: String,
    pub source: String,
}

/// Builds the shared HTTP client used by the network-backed tools.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
}

pub struct ResearchToolSet {
    tools: Vec<Arc<dyn ResearchTool>>,
    fallback: Arc<dyn ResearchTool>,
    matcher: SkimMatcherV2,
}

impl ResearchToolSet {
    /// Creates a tool set. `fallback` is invoked whenever the model does not
    /// make a usable selection; it is advertised alongside `tools`.
    pub fn new(mut tools: Vec<Arc<dyn ResearchTool>>, fallback: Arc<dyn ResearchTool>) -> Self {
        if !tools.iter().any(|t| t.name() == fallback.name()) {
            tools.push(fallback.clone());
        }
        Self {
            tools,
            fallback,
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Wikipedia, arXiv and DuckDuckGo against their public endpoints, with
    /// DuckDuckGo as the fallback.
    pub fn standard(http: reqwest::Client) -> Self {
        let web: Arc<dyn ResearchTool> = Arc::new(WebSearchTool::new(http.clone()));
        Self::new(
            vec![
                Arc::new(WikipediaTool::new(http.clone())),
                Arc::new(ArxivTool::new(http)),
                web.clone(),
            ],
            web,
        )
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn fallback_name(&self) -> &str {
        self.fallback.name()
    }

    /// Tool descriptions in the shape the model client advertises.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let parameters = serde_json::to_value(schemars::schema_for!(ResearchQuery))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        self.tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: parameters.clone(),
            })
            .collect()
    }

    /// Finds the tool the model asked for: exact name first, then the best
    /// fuzzy match in either direction (handles `functions.wiki_tool`, `wiki`).
    fn resolve(&self, requested: &str) -> Option<&Arc<dyn ResearchTool>> {
        if let Some(tool) = self.tools.iter().find(|t| t.name() == requested) {
            return Some(tool);
        }
        let requested = requested.to_lowercase();
        self.tools
            .iter()
            .filter_map(|t| {
                let name = t.name().to_lowercase();
                let forward = self.matcher.fuzzy_match(&requested, &name);
                let backward = self.matcher.fuzzy_match(&name, &requested);
                forward.max(backward).map(|score| (score, t))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, t)| t)
    }

    /// Lets the model pick a tool for `prompt` and runs it.
    ///
    /// Falls back to the default tool with `fallback_query` when the model
    /// answers in text, names an unknown tool, or the call itself fails.
    pub async fn research(
        &self,
        llm: &dyn LLMClient,
        prompt: &str,
        fallback_query: &str,
    ) -> ResearchOutcome {
        match llm.decide_action(prompt, &self.specs()).await {
            Ok(LLMAction::ToolCall(calls)) => {
                if let Some(call) = calls.first() {
                    if let Some(tool) = self.resolve(&call.name) {
                        let query = match serde_json::from_str::<ResearchQuery>(&call.arguments) {
                            Ok(args) if !args.query.trim().is_empty() => args.query,
                            _ => {
                                warn!(tool = %tool.name(), arguments = %call.arguments, "Unreadable tool arguments, using fallback query");
                                fallback_query.to_string()
                            }
                        };
                        info!(tool = %tool.name(), query = %query, "Model selected research tool");
                        return ResearchOutcome {
                            text: tool.invoke(&query).await,
                            source: tool.name().to_string(),
                        };
                    }
                    warn!(requested = %call.name, "Model selected an unknown tool");
                }
            }
            Ok(LLMAction::TextResponse(_)) => {}
            Err(e) => warn!(error = ?e, "Tool selection call failed"),
        }

        info!(tool = %self.fallback.name(), query = %fallback_query, "No tool selected, falling back to general search");
        ResearchOutcome {
            text: self.fallback.invoke(fallback_query).await,
            source: self.fallback.name().to_string(),
        }
    }
}

/// Collapses runs of whitespace (including newlines) to single spaces.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes named and numeric XML/HTML character references in one pass.
/// Unknown or invalid references are left as written.
pub(crate) fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| name.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
