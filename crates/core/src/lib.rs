//! Course Architect core: the course domain model, the graph-backed course
//! repository, model and research-tool clients, and the three-stage
//! generation pipeline built on them.

pub mod course;
pub mod graph_store;
pub mod llm_client;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod research;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
