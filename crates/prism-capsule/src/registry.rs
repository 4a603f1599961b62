//! Process table.
//!
//! Live mapping from [`ProcessId`] to running application. Owned by the
//! runtime; nothing here is persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::bridge::CapabilityBridge;
use crate::engine::ExecutionEngine;
use crate::process::{ProcessId, ProcessInfo};

/// One running application.
pub(crate) struct ProcessRecord {
    pub(crate) path: String,
    pub(crate) global_id: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) bridge: Arc<CapabilityBridge>,
    pub(crate) engine: Mutex<Box<dyn ExecutionEngine>>,
}

impl ProcessRecord {
    fn info(&self, id: ProcessId) -> ProcessInfo {
        ProcessInfo {
            id,
            path: self.path.clone(),
            global_id: self.global_id.clone(),
            started_at: self.started_at,
        }
    }
}

/// Registry of running processes.
#[derive(Default)]
pub(crate) struct ProcessTable {
    processes: DashMap<ProcessId, Arc<ProcessRecord>>,
}

impl ProcessTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, id: ProcessId, record: ProcessRecord) {
        self.processes.insert(id, Arc::new(record));
    }

    pub(crate) fn remove(&self, id: &ProcessId) -> Option<Arc<ProcessRecord>> {
        self.processes.remove(id).map(|(_, record)| record)
    }

    pub(crate) fn get(&self, id: &ProcessId) -> Option<Arc<ProcessRecord>> {
        self.processes.get(id).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn ids(&self) -> Vec<ProcessId> {
        self.processes.iter().map(|r| *r.key()).collect()
    }

    /// Running processes, oldest first.
    pub(crate) fn list(&self) -> Vec<ProcessInfo> {
        let mut infos: Vec<ProcessInfo> = self
            .processes
            .iter()
            .map(|r| r.value().info(*r.key()))
            .collect();
        infos.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    pub(crate) fn len(&self) -> usize {
        self.processes.len()
    }
}
