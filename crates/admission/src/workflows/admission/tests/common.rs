use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::admission::catalog::ProgramCatalog;
use crate::workflows::admission::counter::{CounterError, CounterKey, NimCounterStore};
use crate::workflows::admission::domain::{
    AdmissionTrack, CandidateId, CandidateStatus, ProgramCode, RegistrationSubmission,
};
use crate::workflows::admission::nim::Nim;
use crate::workflows::admission::repository::{
    ApprovalWrite, CandidateRecord, CandidateRepository, RepositoryError,
};
use crate::workflows::admission::service::AdmissionService;

pub(super) fn key(year: i32, code: &str) -> CounterKey {
    CounterKey::new(year, ProgramCode(code.to_string())).expect("valid partition key")
}

pub(super) fn submission(email: &str, program_code: &str) -> RegistrationSubmission {
    RegistrationSubmission {
        full_name: "Budi Santoso".to_string(),
        email: email.to_string(),
        phone: "+628123456789".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2004, 1, 1).expect("valid date"),
        address: Some("Jl. Contoh 1".to_string()),
        program_code: program_code.to_string(),
        track: AdmissionTrack::Snbp,
    }
}

/// A candidate inserted directly into the repository, bypassing registration,
/// so approval tests can pin the admission year.
pub(super) fn candidate(
    suffix: &str,
    program_code: &str,
    year: i32,
    status: CandidateStatus,
) -> CandidateRecord {
    CandidateRecord {
        id: CandidateId(format!("cmhs-test-{suffix}")),
        full_name: format!("Candidate {suffix}"),
        email: format!("{suffix}@example.com"),
        phone: "081234567890".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2004, 1, 1).expect("valid date"),
        address: None,
        program_code: ProgramCode(program_code.to_string()),
        track: AdmissionTrack::Snbt,
        admission_year: year,
        status,
        registered_at: Utc::now(),
        approved_at: None,
        nim: None,
    }
}

pub(super) fn build_service() -> (
    AdmissionService<MemoryRepository, MemoryCounters>,
    Arc<MemoryRepository>,
    Arc<MemoryCounters>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let counters = Arc::new(MemoryCounters::default());
    let service = AdmissionService::new(
        repository.clone(),
        counters.clone(),
        ProgramCatalog::seeded(),
    );
    (service, repository, counters)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<CandidateId, CandidateRecord>>>,
}

impl CandidateRepository for MemoryRepository {
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

#[derive(Default, Clone)]
pub(super) struct MemoryCounters {
    counters: Arc<Mutex<HashMap<CounterKey, u32>>>,
}

impl MemoryCounters {
    pub(super) fn last(&self, key: &CounterKey) -> u32 {
        let guard = self.counters.lock().expect("counter mutex poisoned");
        guard.get(key).copied().unwrap_or(0)
    }

    pub(super) fn set(&self, key: &CounterKey, last_sequence: u32) {
        let mut guard = self.counters.lock().expect("counter mutex poisoned");
        guard.insert(key.clone(), last_sequence);
    }
}

impl NimCounterStore for MemoryCounters {
    fn next_sequence(&self, key: &CounterKey) -> Result<u32, CounterError> {
        let mut guard = self.counters.lock().expect("counter mutex poisoned");
        let entry = guard.entry(key.clone()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}

/// Counter store that is permanently down, for retryability tests.
pub(super) struct UnavailableCounters;

impl NimCounterStore for UnavailableCounters {
    fn next_sequence(&self, _key: &CounterKey) -> Result<u32, CounterError> {
        Err(CounterError::Unavailable("database offline".to_string()))
    }
}

/// Repository whose approval write always reports that a concurrent attempt
/// already assigned `winner`, exercising the lost-update path.
pub(super) struct StolenApprovalRepository {
    pub(super) inner: MemoryRepository,
    pub(super) winner: Nim,
}

impl CandidateRepository for StolenApprovalRepository {
    fn insert(&self, record: CandidateRecord) -> Result<CandidateRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<CandidateRecord>, RepositoryError> {
        self.inner.find_by_email(email)
    }

    fn approve_once(
        &self,
        _id: &CandidateId,
        _nim: &Nim,
        _approved_at: DateTime<Utc>,
    ) -> Result<ApprovalWrite, RepositoryError> {
        Ok(ApprovalWrite::AlreadyAssigned(self.winner.clone()))
    }

    fn pending(&self, limit: usize) -> Result<Vec<CandidateRecord>, RepositoryError> {
        self.inner.pending(limit)
    }
}

/// Repository whose approval write reports the record was rejected between
/// the eligibility check and the write, exercising the refusal path.
pub(super) struct RejectedMidWriteRepository {
    pub(super) inner: MemoryRepository,
}

impl CandidateRepository for RejectedMidWriteRepository {
    fn insert(&self, record: CandidateRecord) -> Result<CandidateRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<CandidateRecord>, RepositoryError> {
        self.inner.find_by_email(email)
    }

    fn approve_once(
        &self,
        _id: &CandidateId,
        _nim: &Nim,
        _approved_at: DateTime<Utc>,
    ) -> Result<ApprovalWrite, RepositoryError> {
        Ok(ApprovalWrite::StateMismatch(CandidateStatus::Rejected))
    }

    fn pending(&self, limit: usize) -> Result<Vec<CandidateRecord>, RepositoryError> {
        self.inner.pending(limit)
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
