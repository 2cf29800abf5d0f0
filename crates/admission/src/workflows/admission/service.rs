use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tracing::{info, warn};

use super::catalog::ProgramCatalog;
use super::counter::{CounterError, NimCounterStore};
use super::domain::{CandidateId, CandidateStatus, RegistrationSubmission};
use super::lock::PartitionLocks;
use super::nim::{self, Nim, SequenceOverflow};
use super::repository::{ApprovalWrite, CandidateRecord, CandidateRepository, RepositoryError};

/// How long an approval waits on a contended partition before giving up.
const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Service composing the candidate repository, the NIM counter store, and the
/// partition locking discipline.
///
/// Approval is idempotent: once a candidate carries a NIM, every further call
/// returns that NIM without touching the counter. Under a lost race the
/// freshly drawn sequence is discarded (a permanent, documented gap) and the
/// winner's NIM is returned.
pub struct AdmissionService<R, C> {
    repository: Arc<R>,
    counters: Arc<C>,
    catalog: Arc<ProgramCatalog>,
    locks: PartitionLocks,
}

static CANDIDATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_candidate_id() -> CandidateId {
    let id = CANDIDATE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CandidateId(format!("cmhs-{id:06}"))
}

impl<R, C> AdmissionService<R, C>
where
    R: CandidateRepository + 'static,
    C: NimCounterStore + 'static,
{
    pub fn new(repository: Arc<R>, counters: Arc<C>, catalog: ProgramCatalog) -> Self {
        Self::with_lock_wait(repository, counters, catalog, DEFAULT_LOCK_WAIT)
    }

    pub fn with_lock_wait(
        repository: Arc<R>,
        counters: Arc<C>,
        catalog: ProgramCatalog,
        lock_wait: Duration,
    ) -> Self {
        Self {
            repository,
            counters,
            catalog: Arc::new(catalog),
            locks: PartitionLocks::new(lock_wait),
        }
    }

    pub fn catalog(&self) -> &ProgramCatalog {
        &self.catalog
    }

    /// Register a new candidate in `Pending` state. The admission year is
    /// stamped from the registration timestamp and is never recomputed.
    pub fn register(
        &self,
        submission: RegistrationSubmission,
    ) -> Result<CandidateRecord, AdmissionError> {
        let program = self
            .catalog
            .find(&submission.program_code)
            .ok_or_else(|| AdmissionError::UnknownProgram(submission.program_code.clone()))?;

        let email = submission.email.trim().to_string();
        if self.repository.find_by_email(&email)?.is_some() {
            return Err(AdmissionError::EmailTaken);
        }

        let registered_at = Utc::now();
        let record = CandidateRecord {
            id: next_candidate_id(),
            full_name: submission.full_name,
            email,
            phone: submission.phone.trim().to_string(),
            birth_date: submission.birth_date,
            address: submission.address,
            program_code: program.code.clone(),
            track: submission.track,
            admission_year: registered_at.year(),
            status: CandidateStatus::Pending,
            registered_at,
            approved_at: None,
            nim: None,
        };

        let stored = self.repository.insert(record)?;
        info!(candidate = %stored.id, program = %stored.program_code, "candidate registered");
        Ok(stored)
    }

    /// Approve a candidate, allocating a NIM on the first successful call.
    pub fn approve(&self, id: &CandidateId) -> Result<Nim, AdmissionError> {
        let record = self.repository.fetch(id)?.ok_or(AdmissionError::NotFound)?;
        if let Some(nim) = eligibility(&record)? {
            return Ok(nim);
        }

        let key = record.partition()?;
        let _guard = self
            .locks
            .lock(&key)
            .map_err(|timeout| AdmissionError::Unavailable(timeout.to_string()))?;

        // Re-check under the guard: a retry queued behind the winning call
        // must return the winner's NIM without burning a sequence.
        let record = self.repository.fetch(id)?.ok_or(AdmissionError::NotFound)?;
        if let Some(nim) = eligibility(&record)? {
            return Ok(nim);
        }

        let sequence = self.counters.next_sequence(&key)?;
        let nim = nim::format(key.year, key.program_code.as_str(), sequence)?;

        match self.repository.approve_once(&record.id, &nim, Utc::now())? {
            ApprovalWrite::Applied => {
                info!(candidate = %record.id, %nim, "candidate approved");
                Ok(nim)
            }
            ApprovalWrite::AlreadyAssigned(existing) => {
                // Lost-update race: the drawn sequence is abandoned, never
                // reused.
                warn!(
                    candidate = %record.id,
                    discarded = sequence,
                    %existing,
                    "concurrent approval won; sequence becomes a gap"
                );
                Ok(existing)
            }
            ApprovalWrite::StateMismatch(status) => {
                Err(AdmissionError::InvalidStateTransition { status })
            }
        }
    }

    /// Fetch a candidate for status views.
    pub fn get(&self, id: &CandidateId) -> Result<CandidateRecord, AdmissionError> {
        self.repository.fetch(id)?.ok_or(AdmissionError::NotFound)
    }

    /// List candidates still awaiting approval.
    pub fn pending(&self, limit: usize) -> Result<Vec<CandidateRecord>, AdmissionError> {
        Ok(self.repository.pending(limit)?)
    }
}

/// Decide what an approval attempt may do with the candidate as loaded:
/// return the existing NIM untouched (idempotent short-circuit), proceed to
/// allocation, or refuse the transition.
fn eligibility(record: &CandidateRecord) -> Result<Option<Nim>, AdmissionError> {
    match (record.status, &record.nim) {
        (CandidateStatus::Approved, Some(nim)) => Ok(Some(nim.clone())),
        (CandidateStatus::Pending, _) => Ok(None),
        // Approved without a NIM is the transient crash state; heal it by
        // re-running allocation.
        (CandidateStatus::Approved, None) => Ok(None),
        (status, _) => Err(AdmissionError::InvalidStateTransition { status }),
    }
}

/// Error raised by the admission service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("candidate not found")]
    NotFound,
    #[error("cannot approve candidate with status {status}")]
    InvalidStateTransition { status: CandidateStatus },
    #[error(transparent)]
    Overflow(#[from] SequenceOverflow),
    #[error("invalid counter partition: {0}")]
    InvalidPartition(String),
    #[error("admission storage unavailable: {0}")]
    Unavailable(String),
    #[error("unknown program code '{0}'")]
    UnknownProgram(String),
    #[error("email already registered")]
    EmailTaken,
}

impl From<RepositoryError> for AdmissionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => AdmissionError::NotFound,
            RepositoryError::Conflict => AdmissionError::EmailTaken,
            RepositoryError::Unavailable(message) => AdmissionError::Unavailable(message),
        }
    }
}

impl From<CounterError> for AdmissionError {
    fn from(value: CounterError) -> Self {
        match value {
            // A malformed partition key is a data problem, not an outage;
            // retrying cannot fix it.
            CounterError::InvalidKey(message) => AdmissionError::InvalidPartition(message),
            CounterError::Unavailable(message) => AdmissionError::Unavailable(message),
        }
    }
}
