//! Course Domain Model
//!
//! Types shared by every pipeline stage and by the presentation layer: the
//! outline the Architect asks the model for, the drafted lesson the Professor
//! parses, the quiz items embedded in a lesson, and the nested course view
//! assembled from flat graph rows for display.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Number of modules every generated course must contain.
pub const MODULES_PER_COURSE: usize = 3;
/// Number of lessons every generated module must contain.
pub const LESSONS_PER_MODULE: usize = 3;
/// Number of choices a quiz question must offer.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Description attached to every course view.
pub const COURSE_DESCRIPTION: &str = "AI-Generated Professional Curriculum";
const TEXT_PLACEHOLDER: &str = "Content is being generated...";
const SCRIPT_PLACEHOLDER: &str = "Script is being generated...";

/// Generation status of a lesson as stored on the `Lesson` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    #[default]
    Pending,
    Complete,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Pending => "pending",
            LessonStatus::Complete => "complete",
        }
    }

    /// Parses the stored property, treating anything unknown as pending.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("complete") => LessonStatus::Complete,
            _ => LessonStatus::Pending,
        }
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Removes the code fence models wrap around structured output: a leading
/// "```" with an optional language tag such as `json` or `cypher`, and the
/// matching closing "```". Fences inside the payload are kept.
pub fn strip_code_fences(raw: &str) -> String {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text.to_string();
    };
    let tag_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let body = &rest[tag_len..];
    let body = body.trim_end().strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

// --- Outline (Architect output) ---

#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    #[error("outline is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected {expected} modules, found {found}")]
    ModuleCount { expected: usize, found: usize },
    #[error("module {module} must have {expected} lessons, found {found}")]
    LessonCount {
        module: usize,
        expected: usize,
        found: usize,
    },
    #[error("empty title at {0}")]
    EmptyTitle(String),
    #[error("lesson title '{0}' appears more than once in the course")]
    DuplicateLesson(String),
    #[error("module {module} cannot require module {requires}")]
    InvalidPrerequisite { module: usize, requires: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonOutline {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleOutline {
    pub title: String,
    /// 1-based index of an earlier module this one builds on. Advisory only.
    #[serde(default)]
    pub requires: Option<u32>,
    pub lessons: Vec<LessonOutline>,
}

/// The curriculum skeleton the Architect asks the model to design.
///
/// Order indices are positional: the first module is `order_index = 1`, and
/// so on. Storing them from position rather than from model output keeps the
/// indices contiguous by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseOutline {
    pub modules: Vec<ModuleOutline>,
}

impl CourseOutline {
    /// Parses raw model output (fences allowed) and validates its shape.
    pub fn parse(raw: &str) -> Result<Self, OutlineError> {
        let outline: CourseOutline = serde_json::from_str(&strip_code_fences(raw))?;
        outline.validate()?;
        Ok(outline)
    }

    pub fn validate(&self) -> Result<(), OutlineError> {
        if self.modules.len() != MODULES_PER_COURSE {
            return Err(OutlineError::ModuleCount {
                expected: MODULES_PER_COURSE,
                found: self.modules.len(),
            });
        }

        let mut seen = HashSet::new();
        for (m_idx, module) in self.modules.iter().enumerate() {
            let module_no = m_idx + 1;
            if module.title.trim().is_empty() {
                return Err(OutlineError::EmptyTitle(format!("module {}", module_no)));
            }
            if module.lessons.len() != LESSONS_PER_MODULE {
                return Err(OutlineError::LessonCount {
                    module: module_no,
                    expected: LESSONS_PER_MODULE,
                    found: module.lessons.len(),
                });
            }
            if let Some(requires) = module.requires {
                if requires == 0 || requires as usize >= module_no {
                    return Err(OutlineError::InvalidPrerequisite {
                        module: module_no,
                        requires,
                    });
                }
            }
            for (l_idx, lesson) in module.lessons.iter().enumerate() {
                let title = lesson.title.trim();
                if title.is_empty() {
                    return Err(OutlineError::EmptyTitle(format!(
                        "module {} lesson {}",
                        module_no,
                        l_idx + 1
                    )));
                }
                // Lessons are updated by title, so a repeat inside one course
                // would merge two lessons' content.
                if !seen.insert(title.to_string()) {
                    return Err(OutlineError::DuplicateLesson(title.to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

// --- Drafted lesson (Professor output) ---

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("draft is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("draft field '{0}' is empty")]
    EmptyField(&'static str),
    #[error("quiz item {index} is invalid: {reason}")]
    InvalidQuiz { index: usize, reason: String },
}

/// A single multiple-choice question embedded in a lesson.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl QuizItem {
    /// Checks the item has exactly four options and that the answer is one of
    /// them verbatim.
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question is empty".to_string());
        }
        if self.options.len() != QUIZ_OPTION_COUNT {
            return Err(format!(
                "expected {} options, found {}",
                QUIZ_OPTION_COUNT,
                self.options.len()
            ));
        }
        if !self.options.iter().any(|o| o == &self.answer) {
            return Err(format!("answer '{}' is not one of the options", self.answer));
        }
        Ok(())
    }
}

/// Serializes a quiz for the `quiz_json` lesson property.
pub fn quiz_to_json(quiz: &[QuizItem]) -> String {
    // A Vec of plain string structs cannot fail to serialize.
    serde_json::to_string(quiz).unwrap_or_else(|_| "[]".to_string())
}

/// Deserializes the `quiz_json` lesson property.
pub fn quiz_from_json(raw: &str) -> Result<Vec<QuizItem>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Lesson content drafted by the model: reading text, video script and quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonDraft {
    pub text: String,
    pub script: String,
    pub quiz: Vec<QuizItem>,
}

impl LessonDraft {
    /// Parses raw model output (fences allowed) and validates every field.
    pub fn parse(raw: &str) -> Result<Self, DraftError> {
        let draft: LessonDraft = serde_json::from_str(&strip_code_fences(raw))?;
        draft.validate()?;
        Ok(draft)
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.text.trim().is_empty() {
            return Err(DraftError::EmptyField("text"));
        }
        if self.script.trim().is_empty() {
            return Err(DraftError::EmptyField("script"));
        }
        for (index, item) in self.quiz.iter().enumerate() {
            item.validate()
                .map_err(|reason| DraftError::InvalidQuiz { index, reason })?;
        }
        Ok(())
    }

    pub fn quiz_json(&self) -> String {
        quiz_to_json(&self.quiz)
    }
}

// --- Course view (presentation) ---

/// One flat row of the course-tree query: a lesson with its module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonRow {
    pub module_title: String,
    pub module_index: i64,
    pub lesson_title: String,
    pub lesson_index: i64,
    pub text: Option<String>,
    pub script: Option<String>,
    pub quiz_json: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonContent {
    pub text: String,
    pub video_script: String,
    pub quiz: Vec<QuizItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonView {
    pub title: String,
    pub order_index: i64,
    pub content: LessonContent,
    pub completed: bool,
    pub status: LessonStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleView {
    pub title: String,
    pub order_index: i64,
    pub lessons: Vec<LessonView>,
}

/// The nested course tree consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseView {
    pub course_title: String,
    pub description: String,
    pub modules: Vec<ModuleView>,
}

impl CourseView {
    /// Rebuilds the nested tree from flat rows, ordered by module and lesson
    /// index. Returns `None` when there are no rows.
    pub fn from_rows(course_title: &str, mut rows: Vec<LessonRow>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        rows.sort_by_key(|r| (r.module_index, r.lesson_index));

        let mut modules: Vec<ModuleView> = Vec::new();
        for row in rows {
            let quiz = match row.quiz_json.as_deref() {
                Some(raw) if !raw.is_empty() => quiz_from_json(raw).unwrap_or_else(|e| {
                    warn!(lesson = %row.lesson_title, error = %e, "Stored quiz is unreadable");
                    Vec::new()
                }),
                _ => Vec::new(),
            };
            let lesson = LessonView {
                title: row.lesson_title,
                order_index: row.lesson_index,
                content: LessonContent {
                    text: non_empty_or(row.text, TEXT_PLACEHOLDER),
                    video_script: non_empty_or(row.script, SCRIPT_PLACEHOLDER),
                    quiz,
                },
                completed: row.completed.unwrap_or(false),
                status: LessonStatus::from_stored(row.status.as_deref()),
            };

            match modules.last_mut() {
                Some(last) if last.order_index == row.module_index && last.title == row.module_title => {
                    last.lessons.push(lesson)
                }
                _ => modules.push(ModuleView {
                    title: row.module_title,
                    order_index: row.module_index,
                    lessons: vec![lesson],
                }),
            }
        }

        Some(Self {
            course_title: course_title.to_string(),
            description: COURSE_DESCRIPTION.to_string(),
            modules,
        })
    }
}

fn non_empty_or(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => placeholder.to_string(),
    }
}
