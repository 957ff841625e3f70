//! Shared fixtures for integration tests.
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use mindloom_core::AppCore;
use mindloom_core::config::Config;
use mindloom_core::graph::{GraphStore, MindmapGraph};
use mindloom_core::providers::ProviderRegistry;
use mindloom_core::relay::Fragment;
use mindloom_storage::Storage;
use serde_json::Value;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Graph collaborator double that records executed statements.
#[derive(Default)]
pub struct RecordingGraph {
    pub structure: Mutex<Value>,
    pub executed: Mutex<Vec<String>>,
    pub fail_execute: AtomicBool,
}

impl RecordingGraph {
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn set_fail_execute(&self, fail: bool) {
        self.fail_execute.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for RecordingGraph {
    async fn fetch_structure(&self, _account_id: &str, _session_id: &str) -> Result<Value> {
        Ok(self.structure.lock().unwrap().clone())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(anyhow!("graph collaborator unavailable"));
        }
        self.executed.lock().unwrap().push(statement.to_string());
        Ok(())
    }

    async fn fetch_map(&self, _session_id: &str) -> Result<MindmapGraph> {
        Ok(MindmapGraph::default())
    }
}

pub struct TestCore {
    pub core: Arc<AppCore>,
    pub graph: Arc<RecordingGraph>,
    _tmp: TempDir,
}

pub fn test_config(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.db_path = tmp
        .path()
        .join("test.db")
        .to_string_lossy()
        .into_owned();
    config.stream_pacing = Duration::from_millis(1);
    config.compaction_probability = 0.0;
    config.compaction_threshold = 50;
    config.num_workers = 1;
    config
}

/// Build an app core over a temp database with the given providers and a
/// recording graph store.
pub fn build_core(providers: ProviderRegistry) -> TestCore {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    build_core_with(tmp, config, providers)
}

pub fn build_core_with(tmp: TempDir, config: Config, providers: ProviderRegistry) -> TestCore {
    let storage = Arc::new(Storage::new(&config.db_path).unwrap());
    build_core_on(tmp, config, storage, providers)
}

/// Variant for tests that need a handle on the storage before the core owns
/// it (e.g. collaborator doubles that mutate memory mid-call).
pub fn build_core_on(
    tmp: TempDir,
    config: Config,
    storage: Arc<Storage>,
    providers: ProviderRegistry,
) -> TestCore {
    let graph = Arc::new(RecordingGraph::default());

    let core = AppCore::with_components(
        config,
        storage,
        Arc::new(providers),
        graph.clone() as Arc<dyn GraphStore>,
    )
    .unwrap();

    TestCore {
        core: Arc::new(core),
        graph,
        _tmp: tmp,
    }
}

/// Drain every fragment already broadcast on a subscription.
pub fn drain_fragments(rx: &mut broadcast::Receiver<Fragment>) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    while let Ok(fragment) = rx.try_recv() {
        fragments.push(fragment);
    }
    fragments
}
