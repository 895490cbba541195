//! Course Generation Pipeline
//!
//! Three stages run strictly in order: the Architect writes the course
//! skeleton, the Librarian researches every lesson, the Professor drafts
//! every researched lesson. Each stage takes an input record and returns an
//! output record; the only thing threaded between them is the course title.
//!
//! No stage returns an error. Failures are logged at the smallest scope (one
//! lesson, one query) and leave that item unfinished. The Librarian and
//! Professor select exactly the unfinished items, so re-running a stage is
//! how work resumes.

pub mod architect;
pub mod librarian;
pub mod orchestrator;
pub mod professor;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use architect::Architect;
pub use librarian::Librarian;
pub use orchestrator::{CoursePipeline, PipelineReport, PipelineStatus, StageEvent, StageOutcome};
pub use professor::Professor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Architect,
    Librarian,
    Professor,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 3] = [Stage::Architect, Stage::Librarian, Stage::Professor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Architect => "architect",
            Stage::Librarian => "librarian",
            Stage::Professor => "professor",
        }
    }

    /// Whether the stage selects its own unfinished work and can be re-run
    /// against an existing course.
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Stage::Architect)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "architect" => Ok(Stage::Architect),
            "librarian" => Ok(Stage::Librarian),
            "professor" => Ok(Stage::Professor),
            other => Err(format!("Unknown stage '{}'", other)),
        }
    }
}

/// How the Architect turns a topic into a stored course skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectStrategy {
    /// The model returns a JSON outline; the skeleton is validated and
    /// written by a generated upsert.
    #[default]
    Structured,
    /// The model writes the Cypher upsert itself, executed unvalidated.
    ModelAuthoredScript,
}

impl FromStr for ArchitectStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" => Ok(ArchitectStrategy::Structured),
            "script" => Ok(ArchitectStrategy::ModelAuthoredScript),
            other => Err(format!(
                "Unknown architect strategy '{}' (expected structured or script)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectInput {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectOutput {
    pub course_title: String,
    pub skeleton_written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarianInput {
    pub course_title: String,
}

/// One lesson the Librarian researched and the tool it used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchLogEntry {
    pub lesson_title: String,
    pub source: String,
}

impl fmt::Display for ResearchLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Researched '{}' using {}", self.lesson_title, self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibrarianOutput {
    pub researched: Vec<ResearchLogEntry>,
    /// Titles of lessons left without notes.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessorInput {
    pub course_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfessorOutput {
    pub drafted: Vec<String>,
    /// Titles of lessons left pending.
    pub failed: Vec<String>,
}
