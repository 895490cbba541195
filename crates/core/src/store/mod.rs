//! Course Repository
//!
//! The typed read/write contract the pipeline stages and the presentation
//! layer use against the persisted course graph. Every operation returns
//! `None` when the store failed (already logged by the backend) and `Some`
//! otherwise, so "failed" and "nothing to do" stay distinguishable.
//!
//! Lesson writes match on lesson title alone, across all courses. Two courses
//! sharing a lesson title will have both lessons updated together; writes
//! report how many lessons they touched so callers can flag it.

pub mod memory;
pub mod neo4j;

use crate::course::{CourseOutline, LessonDraft, LessonRow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryCourseStore;
pub use neo4j::Neo4jCourseStore;

/// A lesson still waiting for research notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLesson {
    pub title: String,
    pub course_title: String,
}

/// A lesson with research notes but no drafted content yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchedLesson {
    pub title: String,
    pub notes: String,
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Creates the course skeleton if absent. Existing nodes keep their
    /// titles and progress.
    async fn upsert_outline(&self, course_title: &str, outline: &CourseOutline) -> Option<()>;

    /// Executes a model-authored script verbatim.
    async fn run_script(&self, script: &str) -> Option<()>;

    /// Lessons under any course whose title contains `course_title` that have
    /// null or empty research notes.
    async fn lessons_pending_research(&self, course_title: &str) -> Option<Vec<PendingLesson>>;

    /// Sets `research_notes` and `source` on every lesson titled `lesson_title`.
    async fn save_research(&self, lesson_title: &str, notes: &str, source: &str) -> Option<usize>;

    /// Lessons under any course whose title contains `course_title` with
    /// research notes present and null or empty content.
    async fn lessons_pending_content(&self, course_title: &str)
    -> Option<Vec<ResearchedLesson>>;

    /// Writes the drafted content and marks the lesson complete.
    async fn save_content(&self, lesson_title: &str, draft: &LessonDraft) -> Option<usize>;

    async fn list_course_titles(&self) -> Option<Vec<String>>;

    /// One row per lesson under any course whose title contains `title_substring`.
    async fn fetch_course_rows(&self, title_substring: &str) -> Option<Vec<LessonRow>>;

    /// Sets `completed = true` on every lesson titled `lesson_title`.
    async fn mark_lesson_completed(&self, lesson_title: &str) -> Option<usize>;
}
