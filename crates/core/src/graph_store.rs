//! Graph Store Adapter
//!
//! Thin wrapper around a pooled `neo4rs` connection. Every call checks a
//! connection out of the pool for its own duration and returns it whatever
//! the outcome. Failures are logged here and surface as `None`, which callers
//! must keep distinct from `Some(vec![])` (the query ran and matched nothing).

use anyhow::{Context, Result};
use neo4rs::{Graph, Query, query};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, warn};

const SCHEMA: &[&str] = &[
    "CREATE CONSTRAINT course_title IF NOT EXISTS FOR (c:Course) REQUIRE c.title IS UNIQUE",
    "CREATE INDEX lesson_title IF NOT EXISTS FOR (l:Lesson) ON (l.title)",
    "CREATE INDEX module_order IF NOT EXISTS FOR (m:Module) ON (m.order_index)",
];

#[derive(Clone)]
pub struct Neo4jGraph {
    graph: Arc<Graph>,
}

impl Neo4jGraph {
    /// Opens the connection pool.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;
        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Creates the uniqueness constraint and lookup indexes. Failures are
    /// logged and skipped; an older server may reject some of them.
    pub async fn ensure_schema(&self) {
        for statement in SCHEMA {
            if let Err(e) = self.graph.run(query(statement)).await {
                warn!(statement = %statement, error = %e, "Schema statement skipped");
            }
        }
    }

    /// Runs a parameterised query and deserializes each returned row into `T`,
    /// whose fields mirror the query's `RETURN` aliases.
    pub async fn execute<T: DeserializeOwned>(&self, q: Query) -> Option<Vec<T>> {
        let mut stream = match self.graph.execute(q).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Cypher execution error");
                return None;
            }
        };

        let mut rows = Vec::new();
        loop {
            match stream.next().await {
                Ok(Some(row)) => match row.to::<T>() {
                    Ok(value) => rows.push(value),
                    Err(e) => {
                        error!(error = %e, "Could not read Cypher result row");
                        return None;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Cypher execution error");
                    return None;
                }
            }
        }
        Some(rows)
    }

    /// Runs a script that returns nothing, such as an upsert.
    pub async fn run_script(&self, script: &str) -> Option<()> {
        self.run(query(script)).await
    }

    pub async fn run(&self, q: Query) -> Option<()> {
        match self.graph.run(q).await {
            Ok(()) => Some(()),
            Err(e) => {
                error!(error = %e, "Cypher execution error");
                None
            }
        }
    }
}
