use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use admission::workflows::admission::{
    ApprovalWrite, CandidateId, CandidateRecord, CandidateRepository, CandidateStatus,
    CounterError, CounterKey, Nim, NimCounterStore, RepositoryError,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Candidate store backed by a process-local map. The NIM write refuses to
/// overwrite an existing identifier, which is the lost-update detection the
/// coordinator relies on.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateRepository {
    records: Arc<Mutex<HashMap<CandidateId, CandidateRecord>>>,
}

impl CandidateRepository for InMemoryCandidateRepository {
    fn insert(&self, record: CandidateRecord) -> Result<CandidateRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let duplicate = guard.values().any(|existing| {
            existing.id == record.id || existing.email.eq_ignore_ascii_case(&record.email)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<CandidateRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn approve_once(
        &self,
        id: &CandidateId,
        nim: &Nim,
        approved_at: DateTime<Utc>,
    ) -> Result<ApprovalWrite, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;

        if let Some(existing) = &record.nim {
            return Ok(ApprovalWrite::AlreadyAssigned(existing.clone()));
        }
        if record.status == CandidateStatus::Rejected {
            return Ok(ApprovalWrite::StateMismatch(record.status));
        }

        record.status = CandidateStatus::Approved;
        record.nim = Some(nim.clone());
        record.approved_at = Some(approved_at);
        Ok(ApprovalWrite::Applied)
    }

    fn pending(&self, limit: usize) -> Result<Vec<CandidateRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.status == CandidateStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// One counter row per (year, program code) partition, created lazily and
/// incremented under the map lock.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNimCounterStore {
    counters: Arc<Mutex<HashMap<CounterKey, u32>>>,
}

impl InMemoryNimCounterStore {
    pub(crate) fn last_sequence(&self, key: &CounterKey) -> u32 {
        let guard = self.counters.lock().expect("counter mutex poisoned");
        guard.get(key).copied().unwrap_or(0)
    }
}

impl NimCounterStore for InMemoryNimCounterStore {
    fn next_sequence(&self, key: &CounterKey) -> Result<u32, CounterError> {
        let mut guard = self.counters.lock().expect("counter mutex poisoned");
        let entry = guard.entry(key.clone()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}
