use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::counter::CounterKey;
use super::domain::{AdmissionTrack, CandidateId, CandidateStatus, ProgramCode};
use super::nim::Nim;

/// Repository record for one admission candidate.
///
/// `admission_year` is fixed when the record is created and never recomputed,
/// so retried approvals always land in the same counter partition. `nim` is
/// set exactly once; a record with `nim` present is terminally approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub address: Option<String>,
    pub program_code: ProgramCode,
    pub track: AdmissionTrack,
    pub admission_year: i32,
    pub status: CandidateStatus,
    pub registered_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub nim: Option<Nim>,
}

impl CandidateRecord {
    /// Counter partition this candidate allocates from.
    pub fn partition(&self) -> Result<CounterKey, super::counter::CounterError> {
        CounterKey::new(self.admission_year, self.program_code.clone())
    }

    pub fn status_view(&self) -> CandidateStatusView {
        CandidateStatusView {
            candidate_id: self.id.clone(),
            full_name: self.full_name.clone(),
            status: self.status.label(),
            program_code: self.program_code.clone(),
            track: self.track.label(),
            admission_year: self.admission_year,
            nim: self.nim.clone(),
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// `approve_once` is the atomic approve-and-assign write with lost-update
/// detection: in one step it must observe the current record, refuse to
/// overwrite an existing NIM, and otherwise set status and NIM together.
pub trait CandidateRepository: Send + Sync {
    fn insert(&self, record: CandidateRecord) -> Result<CandidateRecord, RepositoryError>;
    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateRecord>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<CandidateRecord>, RepositoryError>;
    fn approve_once(
        &self,
        id: &CandidateId,
        nim: &Nim,
        approved_at: DateTime<Utc>,
    ) -> Result<ApprovalWrite, RepositoryError>;
    fn pending(&self, limit: usize) -> Result<Vec<CandidateRecord>, RepositoryError>;
}

/// Outcome of the atomic approval write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalWrite {
    /// Status and NIM were written by this call.
    Applied,
    /// A concurrent attempt already assigned a NIM to this candidate; the
    /// caller's freshly allocated sequence becomes a permanent gap.
    AlreadyAssigned(Nim),
    /// The record is in a state that cannot be approved (e.g. rejected while
    /// the caller was allocating).
    StateMismatch(CandidateStatus),
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of a candidate's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateStatusView {
    pub candidate_id: CandidateId,
    pub full_name: String,
    pub status: &'static str,
    pub program_code: ProgramCode,
    pub track: &'static str,
    pub admission_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nim: Option<Nim>,
}
