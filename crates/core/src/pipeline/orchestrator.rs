//! Pipeline Orchestrator
//!
//! Runs Architect, Librarian and Professor in a fixed linear order and
//! reports progress after each one.

use super::{
    Architect, ArchitectInput, ArchitectOutput, ArchitectStrategy, Librarian, LibrarianInput,
    LibrarianOutput, Professor, ProfessorInput, ProfessorOutput, Stage,
};
use crate::course::LessonStatus;
use crate::llm_client::LLMClient;
use crate::prompts::PromptLibrary;
use crate::research::ResearchToolSet;
use crate::store::CourseStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Where a pipeline run ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// No lessons exist for the course, so there is nothing to resume.
    #[default]
    Pending,
    /// Every lesson of the course is complete.
    Complete,
    /// The run finished with lessons still pending; re-run a stage to resume.
    Incomplete,
}

/// What a single stage returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum StageOutcome {
    Architect(ArchitectOutput),
    Librarian(LibrarianOutput),
    Professor(ProfessorOutput),
}

impl StageOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            StageOutcome::Architect(_) => Stage::Architect,
            StageOutcome::Librarian(_) => Stage::Librarian,
            StageOutcome::Professor(_) => Stage::Professor,
        }
    }

    /// Lessons this stage finished.
    pub fn lessons_processed(&self) -> usize {
        match self {
            StageOutcome::Architect(_) => 0,
            StageOutcome::Librarian(out) => out.researched.len(),
            StageOutcome::Professor(out) => out.drafted.len(),
        }
    }
}

/// Progress notifications sent while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
    Completed { outcome: StageOutcome },
    Finished { report: PipelineReport },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub topic: String,
    pub course_title: String,
    /// Lessons researched plus lessons drafted during this run.
    pub lessons_processed: usize,
    pub current_status: PipelineStatus,
    pub architect: Option<ArchitectOutput>,
    pub librarian: Option<LibrarianOutput>,
    pub professor: Option<ProfessorOutput>,
}

impl PipelineReport {
    fn record(&mut self, outcome: &StageOutcome) {
        self.lessons_processed += outcome.lessons_processed();
        match outcome {
            StageOutcome::Architect(out) => {
                self.course_title = out.course_title.clone();
                self.architect = Some(out.clone());
            }
            StageOutcome::Librarian(out) => self.librarian = Some(out.clone()),
            StageOutcome::Professor(out) => self.professor = Some(out.clone()),
        }
    }
}

/// The three stages wired to one store, prompt set and tool set.
pub struct CoursePipeline {
    store: Arc<dyn CourseStore>,
    architect: Architect,
    librarian: Librarian,
    professor: Professor,
}

impl CoursePipeline {
    /// `structural` drives the Architect and should run at temperature 0;
    /// `prose` is shared by the Librarian and the Professor.
    pub fn new(
        store: Arc<dyn CourseStore>,
        structural: Arc<dyn LLMClient>,
        prose: Arc<dyn LLMClient>,
        tools: Arc<ResearchToolSet>,
        prompts: Arc<PromptLibrary>,
        strategy: ArchitectStrategy,
    ) -> Self {
        Self {
            architect: Architect::new(store.clone(), structural, prompts.clone(), strategy),
            librarian: Librarian::new(store.clone(), prose.clone(), tools, prompts.clone()),
            professor: Professor::new(store.clone(), prose, prompts),
            store,
        }
    }

    pub async fn run(&self, topic: &str) -> PipelineReport {
        self.execute(topic, None).await
    }

    /// Like `run`, sending a `Completed` event after each stage and a
    /// `Finished` event with the report. A closed receiver does not stop the
    /// run.
    pub async fn run_streaming(
        &self,
        topic: &str,
        events: mpsc::Sender<StageEvent>,
    ) -> PipelineReport {
        self.execute(topic, Some(&events)).await
    }

    /// Runs one stage against an existing course. For the Architect,
    /// `course_title` is used as the topic.
    pub async fn run_stage(&self, stage: Stage, course_title: &str) -> StageOutcome {
        let course_title = course_title.to_string();
        match stage {
            Stage::Architect => StageOutcome::Architect(
                self.architect
                    .run(ArchitectInput {
                        topic: course_title,
                    })
                    .await,
            ),
            Stage::Librarian => {
                StageOutcome::Librarian(self.librarian.run(LibrarianInput { course_title }).await)
            }
            Stage::Professor => {
                StageOutcome::Professor(self.professor.run(ProfessorInput { course_title }).await)
            }
        }
    }

    #[instrument(name = "pipeline", skip(self, events))]
    async fn execute(&self, topic: &str, events: Option<&mpsc::Sender<StageEvent>>) -> PipelineReport {
        let mut report = PipelineReport {
            topic: topic.to_string(),
            course_title: topic.trim().to_string(),
            ..Default::default()
        };

        for stage in Stage::ALL {
            let outcome = self.run_stage(stage, &report.course_title).await;
            report.record(&outcome);
            info!(stage = %stage, lessons = outcome.lessons_processed(), "Stage completed");
            notify(events, StageEvent::Completed { outcome }).await;
        }

        report.current_status = self.course_status(&report.course_title).await;
        info!(
            course = %report.course_title,
            status = ?report.current_status,
            lessons_processed = report.lessons_processed,
            "Pipeline finished"
        );
        notify(
            events,
            StageEvent::Finished {
                report: report.clone(),
            },
        )
        .await;
        report
    }

    async fn course_status(&self, course_title: &str) -> PipelineStatus {
        match self.store.fetch_course_rows(course_title).await {
            Some(rows) if rows.is_empty() => PipelineStatus::Pending,
            Some(rows)
                if rows.iter().all(|r| {
                    LessonStatus::from_stored(r.status.as_deref()) == LessonStatus::Complete
                }) =>
            {
                PipelineStatus::Complete
            }
            _ => PipelineStatus::Incomplete,
        }
    }
}

async fn notify(events: Option<&mpsc::Sender<StageEvent>>, event: StageEvent) {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            warn!("Failed to send pipeline progress: receiver dropped.");
        }
    }
}
