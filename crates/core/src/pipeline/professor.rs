use super::{ProfessorInput, ProfessorOutput};
use crate::course::LessonDraft;
use crate::llm_client::LLMClient;
use crate::prompts::{LESSON_DRAFT, PromptLibrary};
use crate::store::{CourseStore, ResearchedLesson};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Drafts text, video script and quiz for every researched lesson.
pub struct Professor {
    store: Arc<dyn CourseStore>,
    llm: Arc<dyn LLMClient>,
    prompts: Arc<PromptLibrary>,
}

impl Professor {
    pub fn new(
        store: Arc<dyn CourseStore>,
        llm: Arc<dyn LLMClient>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            store,
            llm,
            prompts,
        }
    }

    #[instrument(name = "professor", skip_all, fields(course = %input.course_title))]
    pub async fn run(&self, input: ProfessorInput) -> ProfessorOutput {
        let mut output = ProfessorOutput::default();
        let Some(lessons) = self.store.lessons_pending_content(&input.course_title).await else {
            error!("Could not load lessons awaiting content");
            return output;
        };
        info!(count = lessons.len(), "Lessons awaiting content");

        for lesson in lessons {
            match self.draft_lesson(&lesson).await {
                Ok(()) => {
                    info!(lesson = %lesson.title, "Lesson drafted");
                    output.drafted.push(lesson.title);
                }
                Err(e) => {
                    warn!(lesson = %lesson.title, error = ?e, "Drafting failed, lesson left pending");
                    output.failed.push(lesson.title);
                }
            }
        }
        output
    }

    async fn draft_lesson(&self, lesson: &ResearchedLesson) -> Result<()> {
        let prompt = self.prompts.render(
            LESSON_DRAFT,
            &[("title", lesson.title.as_str()), ("notes", lesson.notes.as_str())],
        )?;
        let raw = self
            .llm
            .invoke(&prompt)
            .await
            .context("Lesson generation failed")?;
        let draft = LessonDraft::parse(&raw).context("Model returned an unusable lesson")?;

        match self.store.save_content(&lesson.title, &draft).await {
            None => bail!("Store rejected the lesson content"),
            Some(0) => bail!("No lesson titled '{}' to update", lesson.title),
            Some(n) if n > 1 => {
                warn!(lesson = %lesson.title, updated = n, "Lesson title is shared by several lessons; all were updated")
            }
            Some(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{CourseOutline, LessonStatus, quiz_from_json};
    use crate::llm_client::MockLLMClient;
    use crate::store::InMemoryCourseStore;
    use crate::testing::{DRAFT_TEXT, draft_json, outline_json};

    async fn researched_store() -> Arc<InMemoryCourseStore> {
        let store = Arc::new(InMemoryCourseStore::new());
        let outline = CourseOutline::parse(&outline_json("Thermo")).unwrap();
        store.upsert_outline("Thermodynamics", &outline).await.unwrap();
        for lesson in outline.modules.iter().flat_map(|m| m.lessons.iter()) {
            store
                .save_research(&lesson.title, "notes", "wiki_tool")
                .await
                .unwrap();
        }
        store
    }

    fn professor(store: Arc<InMemoryCourseStore>, llm: MockLLMClient) -> Professor {
        Professor::new(store, Arc::new(llm), Arc::new(PromptLibrary::builtin()))
    }

    fn input() -> ProfessorInput {
        ProfessorInput {
            course_title: "Thermodynamics".to_string(),
        }
    }

    #[tokio::test]
    async fn test_drafts_and_completes_every_researched_lesson() {
        let store = researched_store().await;
        let mut llm = MockLLMClient::new();
        llm.expect_invoke().times(9).returning(|_| Ok(draft_json()));

        let output = professor(store.clone(), llm).run(input()).await;
        assert_eq!(output.drafted.len(), 9);
        assert!(output.failed.is_empty());

        let course = store.course("Thermodynamics").await.unwrap();
        for lesson in course.modules.iter().flat_map(|m| m.lessons.iter()) {
            assert_eq!(lesson.status, LessonStatus::Complete);
            assert_eq!(lesson.content_text.as_deref(), Some(DRAFT_TEXT));
            assert!(!lesson.video_script.as_deref().unwrap_or_default().is_empty());
            let quiz = quiz_from_json(lesson.quiz_json.as_deref().unwrap()).unwrap();
            assert!(quiz.iter().all(|q| q.options.contains(&q.answer)));
        }
    }

    #[tokio::test]
    async fn test_skips_lessons_without_notes() {
        let store = Arc::new(InMemoryCourseStore::new());
        let outline = CourseOutline::parse(&outline_json("Thermo")).unwrap();
        store.upsert_outline("Thermodynamics", &outline).await.unwrap();
        store
            .save_research("Thermo 3.3", "notes", "arxiv_tool")
            .await
            .unwrap();

        let mut llm = MockLLMClient::new();
        llm.expect_invoke()
            .times(1)
            .withf(|p: &str| p.contains("Lesson Title: Thermo 3.3"))
            .returning(|_| Ok(draft_json()));

        let output = professor(store, llm).run(input()).await;
        assert_eq!(output.drafted, vec!["Thermo 3.3".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_json_leaves_lesson_pending() {
        let store = researched_store().await;
        let mut llm = MockLLMClient::new();
        llm.expect_invoke().returning(|prompt| {
            if prompt.contains("Lesson Title: Thermo 1.2") {
                Ok("```json\n{\"text\": \"half a lesson\", \"quiz\": [\n```".to_string())
            } else if prompt.contains("Lesson Title: Thermo 2.3") {
                Ok(r#"{"text": "t", "script": "s", "quiz": [{"question": "Q", "options": ["A", "B"], "answer": "A"}]}"#.to_string())
            } else {
                Ok(draft_json())
            }
        });

        let output = professor(store.clone(), llm).run(input()).await;
        assert_eq!(output.drafted.len(), 7);
        assert_eq!(
            output.failed,
            vec!["Thermo 1.2".to_string(), "Thermo 2.3".to_string()]
        );

        let remaining = store.lessons_pending_content("Thermodynamics").await.unwrap();
        let titles: Vec<&str> = remaining.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Thermo 1.2", "Thermo 2.3"]);

        let course = store.course("Thermodynamics").await.unwrap();
        let broken = &course.modules[0].lessons[1];
        assert_eq!(broken.status, LessonStatus::Pending);
        assert!(broken.content_text.is_none());
        assert!(broken.quiz_json.is_none());
    }

    #[tokio::test]
    async fn test_rerun_picks_up_only_unfinished_lessons() {
        let store = researched_store().await;
        let mut first = MockLLMClient::new();
        first.expect_invoke().returning(|prompt| {
            if prompt.contains("Lesson Title: Thermo 1.1") {
                Err(anyhow::anyhow!("connection reset"))
            } else {
                Ok(draft_json())
            }
        });
        professor(store.clone(), first).run(input()).await;

        let mut second = MockLLMClient::new();
        second
            .expect_invoke()
            .times(1)
            .withf(|p: &str| p.contains("Lesson Title: Thermo 1.1"))
            .returning(|_| Ok(draft_json()));
        let output = professor(store.clone(), second).run(input()).await;

        assert_eq!(output.drafted, vec!["Thermo 1.1".to_string()]);
        assert!(store.lessons_pending_content("Thermodynamics").await.unwrap().is_empty());
    }
}
