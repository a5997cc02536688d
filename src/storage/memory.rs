use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::Task;
use crate::error::{GateError, Result};

use super::{AuditSink, AuditedDecision, Backend};

/// In-memory audit sink.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditedDecision>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn add_gate_decision(&self, record: AuditedDecision) -> Result<()> {
        self.records.write().push(record);
        Ok(())
    }

    async fn decisions_grouped_by_task(&self) -> Result<HashMap<String, Vec<AuditedDecision>>> {
        let mut grouped: HashMap<String, Vec<AuditedDecision>> = HashMap::new();
        for record in self.records.read().iter() {
            grouped
                .entry(record.task_id.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(grouped)
    }
}

/// In-memory task backend for tests and single-process setups.
#[derive(Default)]
pub struct MemoryBackend {
    tasks: DashMap<String, Task>,
    audit: Option<Arc<MemoryAuditSink>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backend that also records an audit trail.
    pub fn with_audit() -> Self {
        Self {
            tasks: DashMap::new(),
            audit: Some(Arc::new(MemoryAuditSink::new())),
            closed: AtomicBool::new(false),
        }
    }

    pub fn put_task(&self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn load_task(&self, id: &str) -> Result<Task> {
        self.tasks
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GateError::TaskNotFound(id.to_string()))
    }

    async fn save_task(&self, task: &Task) -> Result<()> {
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn task_exists(&self, id: &str) -> Result<bool> {
        Ok(self.tasks.contains_key(id))
    }

    fn audit(&self) -> Option<&dyn AuditSink> {
        self.audit.as_deref().map(|sink| sink as &dyn AuditSink)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
