use super::{LibrarianInput, LibrarianOutput, ResearchLogEntry};
use crate::llm_client::LLMClient;
use crate::prompts::{PromptLibrary, RESEARCH_REQUEST, RESEARCH_SUMMARY};
use crate::research::ResearchToolSet;
use crate::store::{CourseStore, PendingLesson};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Researches every lesson of a course that has no notes yet.
pub struct Librarian {
    store: Arc<dyn CourseStore>,
    llm: Arc<dyn LLMClient>,
    tools: Arc<ResearchToolSet>,
    prompts: Arc<PromptLibrary>,
}

impl Librarian {
    pub fn new(
        store: Arc<dyn CourseStore>,
        llm: Arc<dyn LLMClient>,
        tools: Arc<ResearchToolSet>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            store,
            llm,
            tools,
            prompts,
        }
    }

    #[instrument(name = "librarian", skip_all, fields(course = %input.course_title))]
    pub async fn run(&self, input: LibrarianInput) -> LibrarianOutput {
        let mut output = LibrarianOutput::default();
        let Some(lessons) = self
            .store
            .lessons_pending_research(&input.course_title)
            .await
        else {
            error!("Could not load lessons awaiting research");
            return output;
        };
        info!(count = lessons.len(), "Lessons awaiting research");

        for lesson in lessons {
            match self.research_lesson(&lesson).await {
                Ok(entry) => {
                    info!("{}", entry);
                    output.researched.push(entry);
                }
                Err(e) => {
                    warn!(lesson = %lesson.title, error = ?e, "Research failed, lesson left for a later run");
                    output.failed.push(lesson.title);
                }
            }
        }
        output
    }

    async fn research_lesson(&self, lesson: &PendingLesson) -> Result<ResearchLogEntry> {
        let request = self.prompts.render(
            RESEARCH_REQUEST,
            &[
                ("lesson_title", lesson.title.as_str()),
                ("course_title", lesson.course_title.as_str()),
            ],
        )?;
        let fallback_query = format!("{} {}", lesson.title, lesson.course_title);
        let outcome = self
            .tools
            .research(self.llm.as_ref(), &request, &fallback_query)
            .await;

        let prompt = self
            .prompts
            .render(RESEARCH_SUMMARY, &[("data", outcome.text.as_str())])?;
        let notes = self
            .llm
            .invoke(&prompt)
            .await
            .context("Summarising research failed")?;
        let notes = notes.trim();
        if notes.is_empty() {
            bail!("Model returned empty notes");
        }

        match self
            .store
            .save_research(&lesson.title, notes, &outcome.source)
            .await
        {
            None => bail!("Store rejected the research notes"),
            Some(0) => bail!("No lesson titled '{}' to update", lesson.title),
            Some(n) if n > 1 => {
                warn!(lesson = %lesson.title, updated = n, "Lesson title is shared by several lessons; all were updated")
            }
            Some(_) => {}
        }

        Ok(ResearchLogEntry {
            lesson_title: lesson.title.clone(),
            source: outcome.source,
        })
    }
}
