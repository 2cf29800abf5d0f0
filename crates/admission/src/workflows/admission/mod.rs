//! Candidate registration and NIM allocation for the admission pipeline.
//!
//! The dense part of this module is approval: issuing a unique, sequential
//! admission number per (year, program code) partition while staying correct
//! under concurrent approval requests and idempotent under retries. Intake
//! and status lookup around it are ordinary plumbing.

pub mod catalog;
pub mod counter;
pub mod domain;
pub mod lock;
pub mod nim;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{Program, ProgramCatalog};
pub use counter::{CounterError, CounterKey, NimCounterStore};
pub use domain::{
    AdmissionTrack, CandidateId, CandidateStatus, ProgramCode, RegistrationSubmission,
};
pub use lock::{LockTimeout, PartitionGuard, PartitionLocks};
pub use nim::{Nim, SequenceOverflow, MAX_SEQUENCE, SEQUENCE_WIDTH};
pub use repository::{
    ApprovalWrite, CandidateRecord, CandidateRepository, CandidateStatusView, RepositoryError,
};
pub use router::admission_router;
pub use service::{AdmissionError, AdmissionService};
