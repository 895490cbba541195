//! API Models
//!
//! Request and response bodies for the HTTP API, documented with `utoipa`.
//! Course trees mirror the core `CourseView` so the OpenAPI schema stays
//! owned by this crate.

use course_architect_core::course::{CourseView, LessonStatus, LessonView, ModuleView, QuizItem};
use course_architect_core::pipeline::StageOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LessonState {
    Pending,
    Complete,
}

impl From<LessonStatus> for LessonState {
    fn from(status: LessonStatus) -> Self {
        match status {
            LessonStatus::Pending => LessonState::Pending,
            LessonStatus::Complete => LessonState::Complete,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    #[schema(example = "Which law states that energy is conserved?")]
    pub question: String,
    pub options: Vec<String>,
    #[schema(example = "The first law")]
    pub answer: String,
}

impl From<QuizItem> for QuizQuestion {
    fn from(item: QuizItem) -> Self {
        Self {
            question: item.question,
            options: item.options,
            answer: item.answer,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct LessonContentBody {
    /// Markdown lesson text, or a placeholder while it is generated.
    pub text: String,
    pub video_script: String,
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct LessonNode {
    pub title: String,
    pub order_index: i64,
    pub content: LessonContentBody,
    pub completed: bool,
    #[schema(example = "pending")]
    pub status: LessonState,
}

impl From<LessonView> for LessonNode {
    fn from(lesson: LessonView) -> Self {
        Self {
            title: lesson.title,
            order_index: lesson.order_index,
            content: LessonContentBody {
                text: lesson.content.text,
                video_script: lesson.content.video_script,
                quiz: lesson.content.quiz.into_iter().map(Into::into).collect(),
            },
            completed: lesson.completed,
            status: lesson.status.into(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ModuleNode {
    pub title: String,
    pub order_index: i64,
    pub lessons: Vec<LessonNode>,
}

impl From<ModuleView> for ModuleNode {
    fn from(module: ModuleView) -> Self {
        Self {
            title: module.title,
            order_index: module.order_index,
            lessons: module.lessons.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CourseTree {
    #[schema(example = "Thermodynamics")]
    pub course_title: String,
    #[schema(example = "AI-Generated Professional Curriculum")]
    pub description: String,
    pub modules: Vec<ModuleNode>,
}

impl From<CourseView> for CourseTree {
    fn from(view: CourseView) -> Self {
        Self {
            course_title: view.course_title,
            description: view.description,
            modules: view.modules.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CourseList {
    pub titles: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CourseTreeQuery {
    /// Any part of the course title.
    #[schema(example = "Thermo")]
    pub title: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteLessonPayload {
    #[schema(example = "The First Law of Thermodynamics")]
    pub title: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CompleteLessonResponse {
    pub title: String,
    /// Number of lessons carrying this title that were marked completed.
    pub updated: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateCoursePayload {
    #[schema(example = "Thermodynamics")]
    pub topic: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResumeStagePayload {
    #[schema(example = "Thermodynamics")]
    pub course_title: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct StageRunResponse {
    #[schema(example = "librarian")]
    pub stage: String,
    pub lessons_processed: usize,
    /// The stage's full output record.
    #[schema(value_type = Object)]
    pub outcome: serde_json::Value,
}

impl TryFrom<StageOutcome> for StageRunResponse {
    type Error = serde_json::Error;

    fn try_from(outcome: StageOutcome) -> Result<Self, Self::Error> {
        Ok(Self {
            stage: outcome.stage().to_string(),
            lessons_processed: outcome.lessons_processed(),
            outcome: serde_json::to_value(&outcome)?,
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
