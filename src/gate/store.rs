use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{GateError, Result};

use super::PendingDecision;

/// In-memory registry of decisions currently blocking tasks.
///
/// Process lifetime, explicitly constructed and passed by `Arc` to every
/// consumer. Contents do not survive a restart; the durable record of an
/// adjudicated gate lives in the backend's audit sink.
///
/// All operations are safe under concurrent access. Values are inserted fully
/// built under the write lock, so readers never observe a partially
/// constructed decision.
#[derive(Debug, Default)]
pub struct PendingDecisionStore {
    decisions: RwLock<HashMap<String, PendingDecision>>,
}

impl PendingDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pending decisions, in unspecified order.
    pub fn list(&self) -> Vec<PendingDecision> {
        self.decisions.read().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<PendingDecision> {
        self.decisions.read().get(id).cloned()
    }

    /// Register a decision.
    ///
    /// At most one live decision may exist per (task, phase) pair - one gate,
    /// one decision. A duplicate for the same blocking event is rejected with
    /// [`GateError::DuplicateDecision`] even if the trigger layer failed to
    /// coalesce it upstream.
    pub fn insert(&self, decision: PendingDecision) -> Result<()> {
        let mut decisions = self.decisions.write();
        if decisions.contains_key(&decision.decision_id) {
            return Err(GateError::DuplicateDecision {
                task_id: decision.task_id.clone(),
                phase: decision.phase.clone(),
            });
        }
        if decisions
            .values()
            .any(|d| d.task_id == decision.task_id && d.phase == decision.phase)
        {
            return Err(GateError::DuplicateDecision {
                task_id: decision.task_id.clone(),
                phase: decision.phase.clone(),
            });
        }
        decisions.insert(decision.decision_id.clone(), decision);
        Ok(())
    }

    /// Remove a decision, returning it if it was present.
    pub fn remove(&self, id: &str) -> Option<PendingDecision> {
        self.decisions.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.decisions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GateType;

    fn decision(task_id: &str, phase: &str) -> PendingDecision {
        PendingDecision::new(task_id, "Some task", phase, GateType::Approval, "Proceed?")
    }

    #[test]
    fn insert_get_remove_round_trip() {
        let store = PendingDecisionStore::new();
        let d = decision("T001", "implement");
        let id = d.decision_id.clone();

        store.insert(d).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().task_id, "T001");

        let removed = store.remove(&id).unwrap();
        assert_eq!(removed.decision_id, id);
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_id_is_none_not_panic() {
        let store = PendingDecisionStore::new();
        assert!(store.get("nope").is_none());
        assert!(store.remove("nope").is_none());
    }

    #[test]
    fn rejects_second_decision_for_same_gate() {
        let store = PendingDecisionStore::new();
        store.insert(decision("T001", "implement")).unwrap();

        let err = store.insert(decision("T001", "implement")).unwrap_err();
        assert!(matches!(err, GateError::DuplicateDecision { .. }));

        // Different phase of the same task is a different blocking event.
        store.insert(decision("T001", "review")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn list_is_safe_for_concurrent_readers() {
        use std::sync::Arc;

        let store = Arc::new(PendingDecisionStore::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store
                    .insert(decision(&format!("T{i:03}"), "implement"))
                    .unwrap();
                store.list().len()
            }));
        }
        for h in handles {
            assert!(h.join().unwrap() >= 1);
        }
        assert_eq!(store.len(), 8);
    }
}
