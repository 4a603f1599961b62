use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{EngineFactory, ExecutionEngine};
use crate::bridge::CapabilityBridge;
use crate::error::{CapsuleError, CapsuleResult};
use crate::loader::AppDocument;
use crate::process::ProcessId;

/// Snapshots of torn-down contexts kept for inspection; older ones are dropped.
pub const DEFAULT_RETAINED_UNLOADED: usize = 64;

/// Snapshot table shared by a factory and its engines.
#[derive(Debug)]
struct Snapshots {
    live: DashMap<ProcessId, HeadlessSnapshot>,
    /// Unloaded ids, oldest first.
    unloaded: Mutex<VecDeque<ProcessId>>,
    retained: usize,
}

impl Snapshots {
    fn new(retained: usize) -> Self {
        Self {
            live: DashMap::new(),
            unloaded: Mutex::new(VecDeque::new()),
            retained,
        }
    }

    /// Mark `id` unloaded and evict the oldest unloaded snapshots past the cap.
    fn retire(&self, id: ProcessId) {
        let mut unloaded = self.unloaded.lock().unwrap_or_else(PoisonError::into_inner);
        unloaded.push_back(id);
        while unloaded.len() > self.retained {
            if let Some(evicted) = unloaded.pop_front() {
                self.live.remove(&evicted);
            }
        }
    }
}

/// What a headless context was given, for hosts and tests to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessSnapshot {
    /// Loaded document.
    pub document: AppDocument,
    /// Host references severed so far, in order.
    pub severed: Vec<String>,
    /// Whether a bridge has been bound.
    pub bound: bool,
    /// Whether the context has been torn down.
    pub unloaded: bool,
}

/// An engine that executes nothing and records everything.
///
/// Used by the command-line host and tests, where there is no browser
/// context to run application code in.
pub struct HeadlessEngine {
    id: ProcessId,
    bridge: Option<Arc<CapabilityBridge>>,
    snapshots: Arc<Snapshots>,
}

impl HeadlessEngine {
    fn with_snapshot(&self, f: impl FnOnce(&mut HeadlessSnapshot)) -> CapsuleResult<()> {
        let mut snapshot = self
            .snapshots
            .live
            .get_mut(&self.id)
            .ok_or_else(|| CapsuleError::Engine(format!("process {} is not loaded", self.id)))?;
        f(&mut snapshot);
        Ok(())
    }
}

#[async_trait]
impl ExecutionEngine for HeadlessEngine {
    async fn load(&mut self, document: &AppDocument) -> CapsuleResult<()> {
        debug!(process_id = %self.id, title = %document.title, "Headless context loaded");
        self.snapshots.live.insert(
            self.id,
            HeadlessSnapshot {
                document: document.clone(),
                severed: Vec::new(),
                bound: false,
                unloaded: false,
            },
        );
        Ok(())
    }

    fn sever(&mut self, reference: &str) -> CapsuleResult<()> {
        self.with_snapshot(|s| s.severed.push(reference.to_owned()))
    }

    fn bind(&mut self, bridge: Arc<CapabilityBridge>) -> CapsuleResult<()> {
        self.with_snapshot(|s| s.bound = true)?;
        self.bridge = Some(bridge);
        Ok(())
    }

    async fn unload(&mut self) -> CapsuleResult<()> {
        if self.bridge.take().is_some() {
            debug!(process_id = %self.id, "Headless context released its bridge");
        }
        self.with_snapshot(|s| s.unloaded = true)?;
        self.snapshots.retire(self.id);
        Ok(())
    }
}

/// Builds [`HeadlessEngine`]s that share one snapshot table.
///
/// Snapshots of running contexts are always kept. Only the most recent
/// unloaded ones are, so a long-lived host does not grow without bound.
#[derive(Debug, Clone)]
pub struct HeadlessEngineFactory {
    snapshots: Arc<Snapshots>,
}

impl Default for HeadlessEngineFactory {
    fn default() -> Self {
        Self::with_retained(DEFAULT_RETAINED_UNLOADED)
    }
}

impl HeadlessEngineFactory {
    /// A factory with an empty snapshot table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory keeping at most `retained` unloaded snapshots.
    #[must_use]
    pub fn with_retained(retained: usize) -> Self {
        Self {
            snapshots: Arc::new(Snapshots::new(retained)),
        }
    }

    /// What the engine for `id` has recorded.
    #[must_use]
    pub fn snapshot(&self, id: &ProcessId) -> Option<HeadlessSnapshot> {
        self.snapshots.live.get(id).map(|s| s.value().clone())
    }

    /// Number of snapshots held, live and unloaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.live.len()
    }

    /// Whether no snapshot is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.live.is_empty()
    }
}

impl EngineFactory for HeadlessEngineFactory {
    fn create(&self, id: ProcessId) -> Box<dyn ExecutionEngine> {
        Box::new(HeadlessEngine {
            id,
            bridge: None,
            snapshots: Arc::clone(&self.snapshots),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(title: &str) -> AppDocument {
        AppDocument {
            title: title.to_owned(),
            stylesheet: String::new(),
            markup: String::new(),
            bootstrap: String::new(),
            main_script: String::new(),
        }
    }

    async fn run_and_unload(factory: &HeadlessEngineFactory) -> ProcessId {
        let id = ProcessId::new();
        let mut engine = factory.create(id);
        engine.load(&document("app")).await.unwrap();
        engine.unload().await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_unload_marks_snapshot() {
        let factory = HeadlessEngineFactory::new();
        let id = run_and_unload(&factory).await;
        assert!(factory.snapshot(&id).unwrap().unloaded);
    }

    #[tokio::test]
    async fn test_oldest_unloaded_snapshots_are_evicted() {
        let factory = HeadlessEngineFactory::with_retained(2);

        let live = ProcessId::new();
        let mut running = factory.create(live);
        running.load(&document("running")).await.unwrap();

        let first = run_and_unload(&factory).await;
        let second = run_and_unload(&factory).await;
        let third = run_and_unload(&factory).await;

        assert!(factory.snapshot(&first).is_none());
        assert!(factory.snapshot(&second).is_some());
        assert!(factory.snapshot(&third).is_some());
        assert!(!factory.snapshot(&live).unwrap().unloaded);
        assert_eq!(factory.len(), 3);
    }

    #[tokio::test]
    async fn test_sever_before_load_is_an_error() {
        let factory = HeadlessEngineFactory::new();
        let mut engine = factory.create(ProcessId::new());
        assert!(engine.sever("parent").is_err());
    }
}
