//! Mindloom core - conversational backend with streaming fan-out, durable
//! background jobs and bounded session memory.
//!
//! The request path streams provider output live and returns as soon as the
//! answer is assembled; everything slow (graph construction, memory
//! compaction) runs on the job queue, outside the request's lifetime.

pub mod chat;
pub mod config;
pub mod exchanges;
pub mod graph;
pub mod http;
pub mod jobs;
pub mod memory;
pub mod models;
pub mod providers;
pub mod queue;
pub mod relay;

pub use models::*;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use config::Config;
use exchanges::ExchangeLog;
use graph::{GraphStore, Neo4jGraphStore};
use memory::{CacheConfig, MemoryService};
use mindloom_storage::Storage;
use providers::ProviderRegistry;
use queue::JobScheduler;
use relay::StreamRelay;

/// Core application state shared by the HTTP server and the job workers.
pub struct AppCore {
    pub config: Config,
    pub storage: Arc<Storage>,
    pub memory: MemoryService,
    pub exchanges: ExchangeLog,
    pub relay: Arc<StreamRelay>,
    pub providers: Arc<ProviderRegistry>,
    pub graph: Arc<dyn GraphStore>,
    pub scheduler: Arc<JobScheduler>,
}

impl AppCore {
    pub fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::new(&config.db_path)?);
        let providers = Arc::new(ProviderRegistry::from_config(&config));
        let graph: Arc<dyn GraphStore> = Arc::new(Neo4jGraphStore::new(&config.graph));

        info!(db_path = %config.db_path, providers = providers.entries().len(), "Initializing Mindloom");

        Self::with_components(config, storage, providers, graph)
    }

    /// Assemble the core from explicit components; tests swap in mock
    /// providers and graph stores here.
    pub fn with_components(
        config: Config,
        storage: Arc<Storage>,
        providers: Arc<ProviderRegistry>,
        graph: Arc<dyn GraphStore>,
    ) -> Result<Self> {
        let memory = MemoryService::new(storage.memories.clone(), CacheConfig::default());
        let exchanges = ExchangeLog::new(storage.exchanges.clone());
        let scheduler = Arc::new(JobScheduler::new(
            storage.jobs.clone(),
            config.stall_timeout,
        ));

        Ok(Self {
            config,
            storage,
            memory,
            exchanges,
            relay: Arc::new(StreamRelay::new()),
            providers,
            graph,
            scheduler,
        })
    }
}
