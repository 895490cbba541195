//! Prompt Templates
//!
//! Every prompt the pipeline sends is a markdown template with `{name}`
//! placeholders. The built-in set is compiled into the binary; a directory of
//! `*.md` files can override individual templates by file stem.

use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const ARCHITECT_OUTLINE: &str = "architect_outline";
pub const ARCHITECT_CYPHER: &str = "architect_cypher";
pub const RESEARCH_REQUEST: &str = "research_request";
pub const RESEARCH_SUMMARY: &str = "research_summary";
pub const LESSON_DRAFT: &str = "lesson_draft";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Missing prompt template: '{0}'")]
    Missing(String),
}

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<String, String>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptLibrary {
    /// The templates shipped with the crate.
    pub fn builtin() -> Self {
        let templates = [
            (ARCHITECT_OUTLINE, include_str!("../prompts/architect_outline.md")),
            (ARCHITECT_CYPHER, include_str!("../prompts/architect_cypher.md")),
            (RESEARCH_REQUEST, include_str!("../prompts/research_request.md")),
            (RESEARCH_SUMMARY, include_str!("../prompts/research_summary.md")),
            (LESSON_DRAFT, include_str!("../prompts/lesson_draft.md")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { templates }
    }

    /// Replaces built-in templates with any `*.md` file found in `dir`.
    pub fn with_overrides(mut self, dir: &Path) -> anyhow::Result<Self> {
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Could not read prompts directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
                let key = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .context("Could not get file stem")?
                    .to_string();
                let content = fs::read_to_string(&path)?;
                self.templates.insert(key, content);
            }
        }
        Ok(self)
    }

    /// Renders a template, substituting each `{name}` with its value in a
    /// single pass. Substituted values are never scanned again, and braces
    /// that do not name a variable are kept as written.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| PromptError::Missing(key.to_string()))?;

        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let substitution = after.find('}').and_then(|close| {
                let name = &after[..close];
                vars.iter()
                    .find(|(var, _)| *var == name)
                    .map(|(_, value)| (close, *value))
            });
            match substitution {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}
