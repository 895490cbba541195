use super::{CourseStore, PendingLesson, ResearchedLesson};
use crate::course::{CourseOutline, LessonDraft, LessonRow, LessonStatus};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{error, warn};

/// A stored lesson with every property the graph backend keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonRecord {
    pub title: String,
    pub order_index: i64,
    pub status: LessonStatus,
    pub completed: bool,
    pub research_notes: Option<String>,
    pub source: Option<String>,
    pub content_text: Option<String>,
    pub video_script: Option<String>,
    pub quiz_json: Option<String>,
}

impl LessonRecord {
    fn new(title: &str, order_index: i64) -> Self {
        Self {
            title: title.to_string(),
            order_index,
            status: LessonStatus::Pending,
            completed: false,
            research_notes: None,
            source: None,
            content_text: None,
            video_script: None,
            quiz_json: None,
        }
    }

    fn needs_research(&self) -> bool {
        is_blank(&self.research_notes)
    }

    fn needs_content(&self) -> bool {
        !is_blank(&self.research_notes) && is_blank(&self.content_text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    pub title: String,
    pub order_index: i64,
    pub requires: Option<u32>,
    pub lessons: Vec<LessonRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseRecord {
    pub title: String,
    pub modules: Vec<ModuleRecord>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::is_empty).unwrap_or(true)
}

/// `CourseStore` held in process memory.
///
/// Modules and lessons are kept in `order_index` order, so the
/// `NEXT_MODULE` / `NEXT_LESSON` chains are implied by position. Used by the
/// tests and by the API's `memory` backend. `set_unavailable` simulates a
/// store outage: every call then fails the way a lost connection would.
#[derive(Default)]
pub struct InMemoryCourseStore {
    courses: Mutex<Vec<CourseRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryCourseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Option<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            error!("Cypher execution error: store unavailable");
            return None;
        }
        Some(())
    }

    /// A copy of every stored course.
    pub async fn snapshot(&self) -> Vec<CourseRecord> {
        self.courses.lock().await.clone()
    }

    /// A copy of the first course whose title matches exactly.
    pub async fn course(&self, title: &str) -> Option<CourseRecord> {
        self.courses
            .lock()
            .await
            .iter()
            .find(|c| c.title == title)
            .cloned()
    }

    /// Applies `update` to every lesson titled `lesson_title`, in any course.
    async fn update_lessons<F>(&self, lesson_title: &str, mut update: F) -> Option<usize>
    where
        F: FnMut(&mut LessonRecord),
    {
        self.check()?;
        let mut courses = self.courses.lock().await;
        let mut updated = 0;
        for lesson in courses
            .iter_mut()
            .flat_map(|c| c.modules.iter_mut())
            .flat_map(|m| m.lessons.iter_mut())
            .filter(|l| l.title == lesson_title)
        {
            update(lesson);
            updated += 1;
        }
        Some(updated)
    }
}

#[async_trait]
impl CourseStore for InMemoryCourseStore {
    async fn upsert_outline(&self, course_title: &str, outline: &CourseOutline) -> Option<()> {
        self.check()?;
        let mut courses = self.courses.lock().await;
        let index = match courses.iter().position(|c| c.title == course_title) {
            Some(index) => index,
            None => {
                courses.push(CourseRecord {
                    title: course_title.to_string(),
                    modules: Vec::new(),
                });
                courses.len() - 1
            }
        };
        let course = &mut courses[index];

        for (m_idx, module) in outline.modules.iter().enumerate() {
            if course.modules.len() <= m_idx {
                course.modules.push(ModuleRecord {
                    title: module.title.trim().to_string(),
                    order_index: m_idx as i64 + 1,
                    requires: module.requires,
                    lessons: Vec::new(),
                });
            }
            let stored = &mut course.modules[m_idx];
            for (l_idx, lesson) in module.lessons.iter().enumerate() {
                if stored.lessons.len() <= l_idx {
                    stored
                        .lessons
                        .push(LessonRecord::new(lesson.title.trim(), l_idx as i64 + 1));
                }
            }
        }
        Some(())
    }

    async fn run_script(&self, _script: &str) -> Option<()> {
        self.check()?;
        warn!("The in-memory store cannot execute Cypher scripts");
        None
    }

    async fn lessons_pending_research(&self, course_title: &str) -> Option<Vec<PendingLesson>> {
        self.check()?;
        let courses = self.courses.lock().await;
        Some(
            courses
                .iter()
                .filter(|c| c.title.contains(course_title))
                .flat_map(|c| {
                    c.modules
                        .iter()
                        .flat_map(|m| m.lessons.iter())
                        .filter(|l| l.needs_research())
                        .map(move |l| PendingLesson {
                            title: l.title.clone(),
                            course_title: c.title.clone(),
                        })
                })
                .collect(),
        )
    }

    async fn save_research(&self, lesson_title: &str, notes: &str, source: &str) -> Option<usize> {
        self.update_lessons(lesson_title, |l| {
            l.research_notes = Some(notes.to_string());
            l.source = Some(source.to_string());
        })
        .await
    }

    async fn lessons_pending_content(
        &self,
        course_title: &str,
    ) -> Option<Vec<ResearchedLesson>> {
        self.check()?;
        let courses = self.courses.lock().await;
        Some(
            courses
                .iter()
                .filter(|c| c.title.contains(course_title))
                .flat_map(|c| c.modules.iter().flat_map(|m| m.lessons.iter()))
                .filter(|l| l.needs_content())
                .map(|l| ResearchedLesson {
                    title: l.title.clone(),
                    notes: l.research_notes.clone().unwrap_or_default(),
                })
                .collect(),
        )
    }

    async fn save_content(&self, lesson_title: &str, draft: &LessonDraft) -> Option<usize> {
        let quiz_json = draft.quiz_json();
        self.update_lessons(lesson_title, |l| {
            l.content_text = Some(draft.text.clone());
            l.video_script = Some(draft.script.clone());
            l.quiz_json = Some(quiz_json.clone());
            l.status = LessonStatus::Complete;
        })
        .await
    }

    async fn list_course_titles(&self) -> Option<Vec<String>> {
        self.check()?;
        let mut titles: Vec<String> = self
            .courses
            .lock()
            .await
            .iter()
            .map(|c| c.title.clone())
            .collect();
        titles.sort();
        Some(titles)
    }

    async fn fetch_course_rows(&self, title_substring: &str) -> Option<Vec<LessonRow>> {
        self.check()?;
        let courses = self.courses.lock().await;
        Some(
            courses
                .iter()
                .filter(|c| c.title.contains(title_substring))
                .flat_map(|c| c.modules.iter())
                .flat_map(|m| {
                    m.lessons.iter().map(move |l| LessonRow {
                        module_title: m.title.clone(),
                        module_index: m.order_index,
                        lesson_title: l.title.clone(),
                        lesson_index: l.order_index,
                        text: l.content_text.clone(),
                        script: l.video_script.clone(),
                        quiz_json: l.quiz_json.clone(),
                        completed: Some(l.completed),
                        status: Some(l.status.as_str().to_string()),
                    })
                })
                .collect(),
        )
    }

    async fn mark_lesson_completed(&self, lesson_title: &str) -> Option<usize> {
        self.update_lessons(lesson_title, |l| l.completed = true)
            .await
    }
}
