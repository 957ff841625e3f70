//! Neo4j-backed graph store over the transactional HTTP endpoint.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::GraphConfig;

use super::{GraphStore, MindmapGraph, MindmapNode, MindmapRelationship};

const STRUCTURE_QUERY: &str = r#"
MATCH (n:Topic)-[r]->(m:Topic)
WHERE n.session_id = $session_id AND m.session_id = $session_id
RETURN collect({
    source: { id: elementId(n), title: n.title, content: n.content },
    relationship: type(r),
    target: { id: elementId(m), title: m.title, content: m.content }
}) AS structure
"#;

const MAP_QUERY: &str = r#"
MATCH (n:Topic)
WHERE n.session_id = $session_id
OPTIONAL MATCH (n)-[r]->(m:Topic)
RETURN collect(distinct {
    id: elementId(n),
    title: n.title,
    content: n.content,
    sentence_ref: n.sentence_ref
}) AS nodes,
collect(distinct CASE WHEN r IS NOT NULL
    THEN { source: elementId(n), target: elementId(m), type: type(r) }
    ELSE null
END) AS rels
"#;

pub struct Neo4jGraphStore {
    client: Client,
    base_url: String,
    database: String,
    username: String,
    password: String,
}

impl Neo4jGraphStore {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    async fn run_statement(&self, statement: &str, parameters: Value) -> Result<TxResponse> {
        let url = format!("{}/db/{}/tx/commit", self.base_url, self.database);
        let body = json!({
            "statements": [{
                "statement": statement,
                "parameters": parameters,
            }]
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Graph endpoint returned {}: {}", status, text));
        }

        let parsed: TxResponse = response.json().await?;
        if let Some(error) = parsed.errors.first() {
            return Err(anyhow!(
                "Graph statement failed ({}): {}",
                error.code,
                error.message
            ));
        }

        Ok(parsed)
    }

    /// First column of the first row of the first result, if present.
    fn first_cell(response: &TxResponse) -> Option<&Value> {
        response
            .results
            .first()
            .and_then(|result| result.data.first())
            .and_then(|row| row.row.first())
    }
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn fetch_structure(&self, _account_id: &str, session_id: &str) -> Result<Value> {
        let response = self
            .run_statement(STRUCTURE_QUERY, json!({ "session_id": session_id }))
            .await?;

        Ok(Self::first_cell(&response).cloned().unwrap_or(Value::Null))
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        self.run_statement(statement, json!({})).await?;
        Ok(())
    }

    async fn fetch_map(&self, session_id: &str) -> Result<MindmapGraph> {
        let response = self
            .run_statement(MAP_QUERY, json!({ "session_id": session_id }))
            .await?;

        let Some(row) = response
            .results
            .first()
            .and_then(|result| result.data.first())
        else {
            return Ok(MindmapGraph::default());
        };

        let nodes = row
            .row
            .first()
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter(|value| !value.is_null())
                    .filter_map(|value| {
                        Some(MindmapNode {
                            id: value.get("id")?.as_str()?.to_string(),
                            title: value
                                .get("title")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            content: value
                                .get("content")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            sentence_ref: value
                                .get("sentence_ref")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let relationships = row
            .row
            .get(1)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter(|value| !value.is_null())
                    .filter_map(|value| {
                        Some(MindmapRelationship {
                            source: value.get("source")?.as_str()?.to_string(),
                            target: value.get("target")?.as_str()?.to_string(),
                            rel_type: value.get("type")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(MindmapGraph {
            nodes,
            relationships,
        })
    }
}
