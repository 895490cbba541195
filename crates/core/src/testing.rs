//! Test doubles shared by the unit tests: fixed-reply research tools and a
//! mocked model that answers each pipeline prompt with well-formed output.

use crate::llm_client::{LLMAction, MockLLMClient, ToolInvocation};
use crate::research::{ResearchTool, ResearchToolSet};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

pub const DRAFT_TEXT: &str = "# Lesson\n\nEnergy is conserved.";

/// A research tool that echoes its query after a fixed reply.
pub struct StubTool {
    name: String,
    reply: String,
    queries: Mutex<Vec<String>>,
}

impl StubTool {
    pub fn new(name: &str, reply: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: reply.to_string(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResearchTool for StubTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A stub research tool."
    }

    async fn invoke(&self, query: &str) -> String {
        self.queries.lock().unwrap().push(query.to_string());
        format!("{}: {}", self.reply, query)
    }
}

/// `wiki_tool`, `arxiv_tool` and `search_tool` stubs, with `search_tool` as
/// the fallback.
pub fn stub_tool_set() -> ResearchToolSet {
    let web: Arc<dyn ResearchTool> = Arc::new(StubTool::new("search_tool", "web facts"));
    ResearchToolSet::new(
        vec![
            Arc::new(StubTool::new("wiki_tool", "wiki facts")),
            Arc::new(StubTool::new("arxiv_tool", "arxiv facts")),
        ],
        web,
    )
}

/// A valid 3 x 3 outline whose titles start with `prefix`.
pub fn outline_json(prefix: &str) -> String {
    let modules: Vec<serde_json::Value> = (1..=3)
        .map(|m| {
            let lessons: Vec<serde_json::Value> = (1..=3)
                .map(|l| json!({ "title": format!("{} {}.{}", prefix, m, l) }))
                .collect();
            json!({
                "title": format!("{} Module {}", prefix, m),
                "requires": if m > 1 { json!(m - 1) } else { json!(null) },
                "lessons": lessons,
            })
        })
        .collect();
    format!("```json\n{}\n```", json!({ "modules": modules }))
}

/// A fenced, well-formed lesson draft with a constant text.
pub fn draft_json() -> String {
    let draft = json!({
        "text": DRAFT_TEXT,
        "script": "[Scene: a steam engine] Narrator: energy changes form.",
        "quiz": [
            {
                "question": "What does the first law conserve?",
                "options": ["Energy", "Entropy", "Mass", "Charge"],
                "answer": "Energy"
            }
        ]
    });
    format!("```json\n{}\n```", draft)
}

/// A model that answers each stage prompt by recognising its template: the
/// outline prompt gets `outline_json(prefix)`, tool selection picks `tool`,
/// research summaries echo a fixed note and drafts get `draft_json()`.
pub fn course_llm(prefix: &str, tool: &'static str) -> MockLLMClient {
    let outline = outline_json(prefix);
    let mut llm = MockLLMClient::new();
    llm.expect_invoke().returning(move |prompt| {
        if prompt.contains("curriculum architect") {
            Ok(outline.clone())
        } else if prompt.contains("RAW DATA:") {
            Ok("Concise notes for the professor.".to_string())
        } else if prompt.contains("Lesson Title:") {
            Ok(draft_json())
        } else {
            Err(anyhow::anyhow!("unexpected prompt"))
        }
    });
    llm.expect_decide_action().returning(move |_, _| {
        Ok(LLMAction::ToolCall(vec![ToolInvocation {
            name: tool.to_string(),
            arguments: r#"{"query": "thermodynamics"}"#.to_string(),
        }]))
    });
    llm
}
