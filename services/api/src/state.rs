//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the course store,
//! the generation pipeline and the configuration, and builds them from a
//! `Config` at startup.

use crate::config::{Config, GraphBackend};
use anyhow::Context;
use course_architect_core::{
    graph_store::Neo4jGraph,
    llm_client::{LLMClient, OpenAICompatibleClient},
    pipeline::CoursePipeline,
    prompts::PromptLibrary,
    research::{ResearchToolSet, http_client},
    store::{CourseStore, InMemoryCourseStore, Neo4jCourseStore},
};
use std::sync::Arc;
use tracing::info;

/// Temperature for outline and script generation.
const STRUCTURAL_TEMPERATURE: f32 = 0.0;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CourseStore>,
    pub pipeline: Arc<CoursePipeline>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Connects the configured store and wires the pipeline to it.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let store = connect_store(&config).await?;

        let prompts = match &config.prompts_path {
            Some(dir) => PromptLibrary::builtin().with_overrides(dir)?,
            None => PromptLibrary::builtin(),
        };

        let structural: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::from_credentials(
            &config.llm_credentials,
            STRUCTURAL_TEMPERATURE,
        ));
        let prose: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::from_credentials(
            &config.llm_credentials,
            config.llm_temperature,
        ));
        let tools = ResearchToolSet::standard(
            http_client().context("Failed to build the research HTTP client")?,
        );

        let pipeline = CoursePipeline::new(
            store.clone(),
            structural,
            prose,
            Arc::new(tools),
            Arc::new(prompts),
            config.architect_strategy,
        );

        Ok(Self {
            store,
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        })
    }
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn CourseStore>> {
    match config.graph_backend {
        GraphBackend::Neo4j => {
            let graph = Neo4jGraph::connect(
                &config.neo4j_uri,
                &config.neo4j_username,
                &config.neo4j_password,
            )
            .await?;
            graph.ensure_schema().await;
            info!(uri = %config.neo4j_uri, "Connected to Neo4j.");
            Ok(Arc::new(Neo4jCourseStore::new(graph)))
        }
        GraphBackend::Memory => {
            info!("Using the in-memory course store; courses will not persist.");
            Ok(Arc::new(InMemoryCourseStore::new()))
        }
    }
}
