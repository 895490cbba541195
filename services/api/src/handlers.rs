//! Axum Handlers for the REST API
//!
//! This module contains the logic for browsing generated courses, recording
//! learner progress and driving the generation pipeline. It uses `utoipa`
//! doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use course_architect_core::{
    course::CourseView,
    pipeline::{Stage, StageEvent},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tracing::{error, info, warn};

use crate::{
    models::{
        CompleteLessonPayload, CompleteLessonResponse, CourseList, CourseTree, CourseTreeQuery,
        ErrorResponse, GenerateCoursePayload, ResumeStagePayload, StageRunResponse,
    },
    state::AppState,
};

/// Buffered progress events per generation request.
const EVENT_BUFFER: usize = 8;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn store_unavailable() -> ApiError {
    ApiError::InternalServerError(anyhow::anyhow!("Course store query failed"))
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

/// List the titles of every stored course.
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "Course titles", body = CourseList),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_courses(State(state): State<Arc<AppState>>) -> Result<Json<CourseList>, ApiError> {
    let titles = state
        .store
        .list_course_titles()
        .await
        .ok_or_else(store_unavailable)?;
    Ok(Json(CourseList { titles }))
}

/// Fetch the nested module and lesson tree of a course.
#[utoipa::path(
    get,
    path = "/courses/tree",
    params(
        ("title" = String, Query, description = "Any part of the course title")
    ),
    responses(
        (status = 200, description = "Course tree", body = CourseTree),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "No course matches the title", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_course_tree(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CourseTreeQuery>,
) -> Result<Json<CourseTree>, ApiError> {
    let title = required(&query.title, "title")?;
    let rows = state
        .store
        .fetch_course_rows(&title)
        .await
        .ok_or_else(store_unavailable)?;
    let view = CourseView::from_rows(&title, rows)
        .ok_or_else(|| ApiError::NotFound(format!("No course matching '{}'", title)))?;
    Ok(Json(view.into()))
}

/// Mark a lesson as completed by the learner.
#[utoipa::path(
    post,
    path = "/lessons/complete",
    request_body = CompleteLessonPayload,
    responses(
        (status = 200, description = "Lesson marked completed", body = CompleteLessonResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn complete_lesson(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompleteLessonPayload>,
) -> Result<Json<CompleteLessonResponse>, ApiError> {
    let title = required(&payload.title, "title")?;
    let updated = state
        .store
        .mark_lesson_completed(&title)
        .await
        .ok_or_else(store_unavailable)?;
    match updated {
        0 => return Err(ApiError::NotFound(format!("Lesson '{}' not found", title))),
        1 => {}
        n => warn!(lesson = %title, updated = n, "Several lessons share this title; all were marked completed"),
    }
    info!(lesson = %title, "Lesson marked completed");
    Ok(Json(CompleteLessonResponse { title, updated }))
}

/// Generate a course for a topic, streaming progress as Server-Sent Events.
///
/// Emits one `stage` event per completed stage and a final `report` event.
/// Generation continues in the background if the client disconnects.
#[utoipa::path(
    post,
    path = "/courses/generate",
    request_body = GenerateCoursePayload,
    responses(
        (status = 200, description = "Stream of `stage` events followed by a `report` event", content_type = "text/event-stream", body = String),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn generate_course(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateCoursePayload>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let topic = required(&payload.topic, "topic")?;
    info!(topic = %topic, "Starting course generation");

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.run_streaming(&topic, tx).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let name = match &event {
            StageEvent::Completed { .. } => "stage",
            StageEvent::Finished { .. } => "report",
        };
        Event::default().event(name).json_data(event)
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Re-run the Librarian or the Professor for an existing course.
///
/// Only unfinished lessons are processed, so this is how a partial run is
/// resumed.
#[utoipa::path(
    post,
    path = "/courses/{stage}/resume",
    request_body = ResumeStagePayload,
    params(
        ("stage" = String, Path, description = "`librarian` or `professor`")
    ),
    responses(
        (status = 200, description = "Stage finished", body = StageRunResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn resume_stage(
    State(state): State<Arc<AppState>>,
    Path(stage): Path<String>,
    Json(payload): Json<ResumeStagePayload>,
) -> Result<Json<StageRunResponse>, ApiError> {
    let stage: Stage = stage.parse().map_err(ApiError::BadRequest)?;
    if !stage.is_resumable() {
        return Err(ApiError::BadRequest(format!(
            "Stage '{}' cannot be resumed; generate the course instead",
            stage
        )));
    }
    let course_title = required(&payload.course_title, "course_title")?;

    let outcome = state.pipeline.run_stage(stage, &course_title).await;
    Ok(Json(StageRunResponse::try_from(outcome)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GraphBackend};
    use anyhow::Result;
    use async_trait::async_trait;
    use course_architect_core::{
        course::CourseOutline,
        llm_client::{LLMAction, LLMClient, ToolSpec},
        pipeline::{ArchitectStrategy, CoursePipeline},
        prompts::PromptLibrary,
        provider::{ProviderCredentials, ProviderMode},
        research::{ResearchTool, ResearchToolSet},
        store::{CourseStore, InMemoryCourseStore},
    };
    use serde_json::json;

    /// Answers outline prompts with a fixed 3 x 3 outline, everything else
    /// with a fixed lesson draft, and never selects a tool.
    struct CannedModel;

    fn outline() -> String {
        let modules: Vec<_> = (1..=3)
            .map(|m| {
                json!({
                    "title": format!("Module {}", m),
                    "lessons": (1..=3).map(|l| json!({"title": format!("Lesson {}.{}", m, l)})).collect::<Vec<_>>()
                })
            })
            .collect();
        json!({ "modules": modules }).to_string()
    }

    #[async_trait]
    impl LLMClient for CannedModel {
        async fn invoke(&self, prompt: &str) -> Result<String> {
            if prompt.contains("curriculum architect") {
                Ok(outline())
            } else if prompt.contains("Lesson Title:") {
                Ok(json!({
                    "text": "Lesson body",
                    "script": "Narrator: hello",
                    "quiz": [{"question": "Q?", "options": ["A", "B", "C", "D"], "answer": "A"}]
                })
                .to_string())
            } else {
                Ok("Research notes".to_string())
            }
        }

        async fn decide_action(&self, _prompt: &str, _tools: &[ToolSpec]) -> Result<LLMAction> {
            Ok(LLMAction::TextResponse(String::new()))
        }
    }

    struct CannedSearch;

    #[async_trait]
    impl ResearchTool for CannedSearch {
        fn name(&self) -> &str {
            "search_tool"
        }

        fn description(&self) -> &str {
            "Canned web search."
        }

        async fn invoke(&self, query: &str) -> String {
            format!("[DuckDuckGo: {}]\n\nFact: heat flows", query)
        }
    }

    fn config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            graph_backend: GraphBackend::Memory,
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_username: "neo4j".to_string(),
            neo4j_password: "password".to_string(),
            llm_mode: ProviderMode::Local,
            llm_credentials: ProviderCredentials {
                api_key: "test".to_string(),
                base_url: "http://localhost:4000".to_string(),
                model: "test-model".to_string(),
            },
            llm_temperature: 0.5,
            architect_strategy: ArchitectStrategy::Structured,
            log_level: tracing::Level::INFO,
            prompts_path: None,
        }
    }

    fn app_state(store: Arc<InMemoryCourseStore>) -> Arc<AppState> {
        let model: Arc<dyn LLMClient> = Arc::new(CannedModel);
        let tools = ResearchToolSet::new(vec![], Arc::new(CannedSearch));
        let pipeline = CoursePipeline::new(
            store.clone(),
            model.clone(),
            model,
            Arc::new(tools),
            Arc::new(PromptLibrary::builtin()),
            ArchitectStrategy::Structured,
        );
        Arc::new(AppState {
            store,
            pipeline: Arc::new(pipeline),
            config: Arc::new(config()),
        })
    }

    async fn seeded() -> Arc<InMemoryCourseStore> {
        let store = Arc::new(InMemoryCourseStore::new());
        let outline = CourseOutline::parse(&outline()).unwrap();
        store.upsert_outline("Thermodynamics", &outline).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_list_courses() {
        let state = app_state(seeded().await);
        let Json(list) = list_courses(State(state)).await.unwrap();
        assert_eq!(list.titles, vec!["Thermodynamics".to_string()]);
    }

    #[tokio::test]
    async fn test_list_courses_store_failure_is_internal_error() {
        let store = seeded().await;
        store.set_unavailable(true);
        let err = list_courses(State(app_state(store))).await.unwrap_err();
        assert!(matches!(err, ApiError::InternalServerError(_)));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_course_tree_by_substring() {
        let state = app_state(seeded().await);
        let Json(tree) = get_course_tree(
            State(state),
            Query(CourseTreeQuery {
                title: "Thermo".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(tree.modules.len(), 3);
        assert_eq!(tree.modules[0].lessons[0].title, "Lesson 1.1");
        assert_eq!(
            tree.modules[0].lessons[0].content.text,
            "Content is being generated..."
        );
    }

    #[tokio::test]
    async fn test_course_tree_unknown_and_empty_titles() {
        let state = app_state(seeded().await);
        let err = get_course_tree(
            State(state.clone()),
            Query(CourseTreeQuery {
                title: "Cooking".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = get_course_tree(
            State(state),
            Query(CourseTreeQuery {
                title: "  ".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_complete_lesson() {
        let store = seeded().await;
        let state = app_state(store.clone());

        let Json(response) = complete_lesson(
            State(state.clone()),
            Json(CompleteLessonPayload {
                title: "Lesson 2.2".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.updated, 1);

        let rows = store.fetch_course_rows("Thermodynamics").await.unwrap();
        assert_eq!(rows.iter().filter(|r| r.completed == Some(true)).count(), 1);

        let err = complete_lesson(
            State(state),
            Json(CompleteLessonPayload {
                title: "Lesson 9.9".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resume_stage_validation() {
        let state = app_state(seeded().await);
        for stage in ["architect", "dean"] {
            let err = resume_stage(
                State(state.clone()),
                Path(stage.to_string()),
                Json(ResumeStagePayload {
                    course_title: "Thermodynamics".to_string(),
                }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
    }

    #[tokio::test]
    async fn test_resume_librarian_then_professor() {
        let store = seeded().await;
        let state = app_state(store.clone());
        let payload = || {
            Json(ResumeStagePayload {
                course_title: "Thermodynamics".to_string(),
            })
        };

        let Json(response) = resume_stage(State(state.clone()), Path("librarian".to_string()), payload())
            .await
            .unwrap();
        assert_eq!(response.stage, "librarian");
        assert_eq!(response.lessons_processed, 9);
        assert_eq!(response.outcome["researched"][0]["source"], "search_tool");

        let Json(response) = resume_stage(State(state), Path("professor".to_string()), payload())
            .await
            .unwrap();
        assert_eq!(response.lessons_processed, 9);
        assert!(store.lessons_pending_content("Thermodynamics").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_course_streams_stage_events() {
        let store = Arc::new(InMemoryCourseStore::new());
        let sse = generate_course(
            State(app_state(store.clone())),
            Json(GenerateCoursePayload {
                topic: "Thermodynamics".to_string(),
            }),
        )
        .await
        .unwrap();

        let body = axum::body::to_bytes(sse.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(body.matches("event: stage").count(), 3);
        assert_eq!(body.matches("event: report").count(), 1);
        assert!(body.contains("\"current_status\":\"complete\""));
        assert_eq!(store.fetch_course_rows("Thermodynamics").await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_generate_course_rejects_empty_topic() {
        let store = Arc::new(InMemoryCourseStore::new());
        let result = generate_course(
            State(app_state(store)),
            Json(GenerateCoursePayload {
                topic: String::new(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
