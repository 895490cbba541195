//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CompleteLessonPayload, CompleteLessonResponse, CourseList, CourseTree, ErrorResponse,
        GenerateCoursePayload, LessonContentBody, LessonNode, LessonState, ModuleNode,
        QuizQuestion, ResumeStagePayload, StageRunResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_courses,
        handlers::get_course_tree,
        handlers::complete_lesson,
        handlers::generate_course,
        handlers::resume_stage,
    ),
    components(
        schemas(
            CourseList, CourseTree, ModuleNode, LessonNode, LessonContentBody, QuizQuestion,
            LessonState, CompleteLessonPayload, CompleteLessonResponse, GenerateCoursePayload,
            ResumeStagePayload, StageRunResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Course Architect API", description = "Course generation and course browsing")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/courses", get(handlers::list_courses))
        .route("/courses/tree", get(handlers::get_course_tree))
        .route("/courses/generate", post(handlers::generate_course))
        .route("/courses/{stage}/resume", post(handlers::resume_stage))
        .route("/lessons/complete", post(handlers::complete_lesson))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
