use super::{ArchitectInput, ArchitectOutput, ArchitectStrategy};
use crate::course::{CourseOutline, LESSONS_PER_MODULE, MODULES_PER_COURSE, strip_code_fences};
use crate::llm_client::LLMClient;
use crate::prompts::{ARCHITECT_CYPHER, ARCHITECT_OUTLINE, PromptLibrary};
use crate::store::CourseStore;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Designs a fixed-shape curriculum for a topic and writes its skeleton.
pub struct Architect {
    store: Arc<dyn CourseStore>,
    llm: Arc<dyn LLMClient>,
    prompts: Arc<PromptLibrary>,
    strategy: ArchitectStrategy,
}

impl Architect {
    /// `llm` should be a deterministic (temperature 0) client.
    pub fn new(
        store: Arc<dyn CourseStore>,
        llm: Arc<dyn LLMClient>,
        prompts: Arc<PromptLibrary>,
        strategy: ArchitectStrategy,
    ) -> Self {
        Self {
            store,
            llm,
            prompts,
            strategy,
        }
    }

    #[instrument(name = "architect", skip_all, fields(topic = %input.topic))]
    pub async fn run(&self, input: ArchitectInput) -> ArchitectOutput {
        let course_title = input.topic.trim().to_string();
        let written = match self.strategy {
            ArchitectStrategy::Structured => self.write_outline(&course_title).await,
            ArchitectStrategy::ModelAuthoredScript => self.write_script(&course_title).await,
        };

        match &written {
            Ok(()) => info!(course = %course_title, strategy = ?self.strategy, "Course skeleton written"),
            Err(e) => error!(course = %course_title, error = ?e, "Could not write course skeleton"),
        }

        ArchitectOutput {
            course_title,
            skeleton_written: written.is_ok(),
        }
    }

    fn render(&self, key: &str, topic: &str) -> Result<String> {
        let module_count = MODULES_PER_COURSE.to_string();
        let lesson_count = LESSONS_PER_MODULE.to_string();
        Ok(self.prompts.render(
            key,
            &[
                ("topic", topic),
                ("module_count", module_count.as_str()),
                ("lesson_count", lesson_count.as_str()),
            ],
        )?)
    }

    async fn write_outline(&self, topic: &str) -> Result<()> {
        if topic.is_empty() {
            bail!("Topic is empty");
        }
        let prompt = self.render(ARCHITECT_OUTLINE, topic)?;
        let raw = self
            .llm
            .invoke(&prompt)
            .await
            .context("Outline generation failed")?;
        let outline = CourseOutline::parse(&raw).context("Model returned an unusable outline")?;
        self.store
            .upsert_outline(topic, &outline)
            .await
            .context("Store rejected the course skeleton")?;
        Ok(())
    }

    async fn write_script(&self, topic: &str) -> Result<()> {
        if topic.is_empty() {
            bail!("Topic is empty");
        }
        let prompt = self.render(ARCHITECT_CYPHER, topic)?;
        let raw = self
            .llm
            .invoke(&prompt)
            .await
            .context("Script generation failed")?;
        let script = strip_code_fences(&raw);
        self.store
            .run_script(&script)
            .await
            .context("Store rejected the model-authored script")?;
        Ok(())
    }
}
