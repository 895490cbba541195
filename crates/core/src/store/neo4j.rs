use super::{CourseStore, PendingLesson, ResearchedLesson};
use crate::course::{CourseOutline, LessonDraft, LessonRow};
use crate::graph_store::Neo4jGraph;
use async_trait::async_trait;
use neo4rs::query;
use serde::Deserialize;
use std::fmt::Write;

const PENDING_RESEARCH: &str = r#"
MATCH (c:Course)-[:HAS_MODULE]->(m:Module)-[:HAS_LESSON]->(l:Lesson)
WHERE c.title CONTAINS $course_title
  AND (l.research_notes IS NULL OR l.research_notes = "")
RETURN l.title AS title, c.title AS course_title
ORDER BY m.order_index, l.order_index
"#;

const SAVE_RESEARCH: &str = r#"
MATCH (l:Lesson {title: $title})
SET l.research_notes = $notes, l.source = $source
RETURN count(l) AS updated
"#;

const PENDING_CONTENT: &str = r#"
MATCH (c:Course)-[:HAS_MODULE]->(m:Module)-[:HAS_LESSON]->(l:Lesson)
WHERE c.title CONTAINS $course_title
  AND l.research_notes IS NOT NULL AND l.research_notes <> ""
  AND (l.content_text IS NULL OR l.content_text = "")
RETURN l.title AS title, l.research_notes AS notes
ORDER BY m.order_index, l.order_index
"#;

const SAVE_CONTENT: &str = r#"
MATCH (l:Lesson {title: $title})
SET l.content_text = $text,
    l.video_script = $script,
    l.quiz_json = $quiz,
    l.status = 'complete'
RETURN count(l) AS updated
"#;

const LIST_COURSES: &str = "MATCH (c:Course) RETURN c.title AS title ORDER BY title";

const COURSE_ROWS: &str = r#"
MATCH (c:Course)-[:HAS_MODULE]->(m:Module)-[:HAS_LESSON]->(l:Lesson)
WHERE c.title CONTAINS $title
RETURN m.title AS module_title,
       m.order_index AS module_index,
       l.title AS lesson_title,
       l.order_index AS lesson_index,
       l.content_text AS text,
       l.video_script AS script,
       l.quiz_json AS quiz_json,
       l.completed AS completed,
       l.status AS status
ORDER BY module_index, lesson_index
"#;

const MARK_COMPLETED: &str = r#"
MATCH (l:Lesson {title: $title})
SET l.completed = true
RETURN count(l) AS updated
"#;

#[derive(Deserialize)]
struct Updated {
    updated: i64,
}

#[derive(Deserialize)]
struct TitleRow {
    title: String,
}

/// A deterministic, parameterised upsert script for one course outline.
///
/// Titles travel as parameters; only validated positional indices are
/// written into the script text.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertScript {
    pub cypher: String,
    pub params: Vec<(String, String)>,
}

impl UpsertScript {
    /// Builds the script. Modules are merged under the course by position and
    /// lessons under their module by position; titles and the initial
    /// `pending` status are only set when a node is first created.
    pub fn for_outline(course_title: &str, outline: &CourseOutline) -> Self {
        let mut cypher = String::from("MERGE (c:Course {title: $course_title})\n");
        let mut params = vec![("course_title".to_string(), course_title.to_string())];

        for (m_idx, module) in outline.modules.iter().enumerate() {
            let m = m_idx + 1;
            let _ = writeln!(
                cypher,
                "MERGE (c)-[:HAS_MODULE]->(m{m}:Module {{order_index: {m}}})\n\
                 ON CREATE SET m{m}.title = $m{m}_title"
            );
            params.push((format!("m{m}_title"), module.title.trim().to_string()));
        }

        for m in 2..=outline.modules.len() {
            let _ = writeln!(cypher, "MERGE (m{})-[:NEXT_MODULE]->(m{})", m - 1, m);
        }

        for (m_idx, module) in outline.modules.iter().enumerate() {
            let m = m_idx + 1;
            if let Some(r) = module.requires {
                let _ = writeln!(cypher, "MERGE (m{m})-[:REQUIRES]->(m{r})");
            }
            for (l_idx, lesson) in module.lessons.iter().enumerate() {
                let l = l_idx + 1;
                let var = format!("m{m}l{l}");
                let _ = writeln!(
                    cypher,
                    "MERGE (m{m})-[:HAS_LESSON]->({var}:Lesson {{order_index: {l}}})\n\
                     ON CREATE SET {var}.title = ${var}_title, {var}.status = 'pending', {var}.completed = false"
                );
                params.push((format!("{var}_title"), lesson.title.trim().to_string()));
                if l > 1 {
                    let _ = writeln!(cypher, "MERGE (m{m}l{})-[:NEXT_LESSON]->({var})", l - 1);
                }
            }
        }

        Self { cypher, params }
    }

    fn into_query(self) -> neo4rs::Query {
        self.params
            .into_iter()
            .fold(query(&self.cypher), |q, (key, value)| q.param(&key, value))
    }
}

/// `CourseStore` backed by Neo4j.
#[derive(Clone)]
pub struct Neo4jCourseStore {
    graph: Neo4jGraph,
}

impl Neo4jCourseStore {
    pub fn new(graph: Neo4jGraph) -> Self {
        Self { graph }
    }

    async fn updated(&self, q: neo4rs::Query) -> Option<usize> {
        let rows: Vec<Updated> = self.graph.execute(q).await?;
        Some(rows.first().map(|r| r.updated.max(0) as usize).unwrap_or(0))
    }
}

#[async_trait]
impl CourseStore for Neo4jCourseStore {
    async fn upsert_outline(&self, course_title: &str, outline: &CourseOutline) -> Option<()> {
        self.graph
            .run(UpsertScript::for_outline(course_title, outline).into_query())
            .await
    }

    async fn run_script(&self, script: &str) -> Option<()> {
        self.graph.run_script(script).await
    }

    async fn lessons_pending_research(&self, course_title: &str) -> Option<Vec<PendingLesson>> {
        self.graph
            .execute(query(PENDING_RESEARCH).param("course_title", course_title))
            .await
    }

    async fn save_research(&self, lesson_title: &str, notes: &str, source: &str) -> Option<usize> {
        self.updated(
            query(SAVE_RESEARCH)
                .param("title", lesson_title)
                .param("notes", notes)
                .param("source", source),
        )
        .await
    }

    async fn lessons_pending_content(
        &self,
        course_title: &str,
    ) -> Option<Vec<ResearchedLesson>> {
        self.graph
            .execute(query(PENDING_CONTENT).param("course_title", course_title))
            .await
    }

    async fn save_content(&self, lesson_title: &str, draft: &LessonDraft) -> Option<usize> {
        self.updated(
            query(SAVE_CONTENT)
                .param("title", lesson_title)
                .param("text", draft.text.as_str())
                .param("script", draft.script.as_str())
                .param("quiz", draft.quiz_json()),
        )
        .await
    }

    async fn list_course_titles(&self) -> Option<Vec<String>> {
        let rows: Vec<TitleRow> = self.graph.execute(query(LIST_COURSES)).await?;
        Some(rows.into_iter().map(|r| r.title).collect())
    }

    async fn fetch_course_rows(&self, title_substring: &str) -> Option<Vec<LessonRow>> {
        self.graph
            .execute(query(COURSE_ROWS).param("title", title_substring))
            .await
    }

    async fn mark_lesson_completed(&self, lesson_title: &str) -> Option<usize> {
        self.updated(query(MARK_COMPLETED).param("title", lesson_title))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{LessonOutline, ModuleOutline};

    fn outline() -> CourseOutline {
        CourseOutline {
            modules: (1..=3)
                .map(|m| ModuleOutline {
                    title: format!("Module {}", m),
                    requires: if m == 3 { Some(1) } else { None },
                    lessons: (1..=3)
                        .map(|l| LessonOutline {
                            title: format!("Lesson {}.{}", m, l),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_script_merges_course_modules_and_lessons_by_position() {
        let script = UpsertScript::for_outline("Thermodynamics", &outline());

        assert!(script.cypher.starts_with("MERGE (c:Course {title: $course_title})"));
        assert!(script
            .cypher
            .contains("MERGE (c)-[:HAS_MODULE]->(m2:Module {order_index: 2})"));
        assert!(script
            .cypher
            .contains("MERGE (m3)-[:HAS_LESSON]->(m3l3:Lesson {order_index: 3})"));
        assert!(script.cypher.contains("m1l1.status = 'pending', m1l1.completed = false"));
        assert_eq!(script.cypher.matches(":Lesson {order_index").count(), 9);
        assert_eq!(script.cypher.matches(":Module {order_index").count(), 3);
    }

    #[test]
    fn test_script_chains_are_linear() {
        let script = UpsertScript::for_outline("Thermodynamics", &outline());

        assert!(script.cypher.contains("MERGE (m1)-[:NEXT_MODULE]->(m2)"));
        assert!(script.cypher.contains("MERGE (m2)-[:NEXT_MODULE]->(m3)"));
        assert_eq!(script.cypher.matches("NEXT_MODULE").count(), 2);
        assert!(script.cypher.contains("MERGE (m2l1)-[:NEXT_LESSON]->(m2l2)"));
        assert_eq!(script.cypher.matches("NEXT_LESSON").count(), 6);
        assert!(script.cypher.contains("MERGE (m3)-[:REQUIRES]->(m1)"));
    }

    #[test]
    fn test_script_passes_titles_as_parameters() {
        let mut outline = outline();
        outline.modules[0].lessons[0].title = "Heat\"}) DETACH DELETE (x".to_string();
        let script = UpsertScript::for_outline("Thermo", &outline);

        assert!(!script.cypher.contains("DETACH DELETE"));
        assert_eq!(script.params.len(), 1 + 3 + 9);
        assert!(script
            .params
            .contains(&("m1l1_title".to_string(), "Heat\"}) DETACH DELETE (x".to_string())));
        assert!(script
            .params
            .contains(&("course_title".to_string(), "Thermo".to_string())));
    }
}
