//! Graph collaborator boundary.
//!
//! The graph database is a black box: a read query returns an opaque
//! structure snapshot, a mutation statement executes with success/error as
//! the only outcomes. The statement text itself is produced by a language
//! model and is never interpreted here.

mod neo4j;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use neo4j::Neo4jGraphStore;

/// One topic node of a session's mindmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapNode {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Sentence id the node was derived from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence_ref: Option<String>,
}

/// One directed relationship between mindmap nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

/// Read model for a session's full mindmap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MindmapGraph {
    pub nodes: Vec<MindmapNode>,
    pub relationships: Vec<MindmapRelationship>,
}

/// Capability boundary to the graph collaborator.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Read the structure snapshot scoped to one session, as an opaque value
    /// handed to the mutation-generation prompt.
    async fn fetch_structure(&self, account_id: &str, session_id: &str) -> Result<Value>;

    /// Execute one mutation statement in a single transaction-scoped call.
    async fn execute(&self, statement: &str) -> Result<()>;

    /// Read a session's mindmap for display.
    async fn fetch_map(&self, session_id: &str) -> Result<MindmapGraph>;
}
