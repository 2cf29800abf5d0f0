use crate::infra::{InMemoryCandidateRepository, InMemoryNimCounterStore};
use admission::error::AppError;
use admission::workflows::admission::{
    AdmissionError, AdmissionService, AdmissionTrack, CandidateId, ProgramCatalog,
    RegistrationSubmission,
};
use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// How many candidates to register per program
    #[arg(long, default_value_t = 2)]
    pub(crate) per_program: u32,
}

/// Walk the register → approve → retry flow against the in-memory stack and
/// print what an operator would see.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryCandidateRepository::default());
    let counters = Arc::new(InMemoryNimCounterStore::default());
    let service = AdmissionService::new(
        repository,
        counters.clone(),
        ProgramCatalog::seeded(),
    );

    println!("=== Program catalog ===");
    for program in service.catalog().programs() {
        println!(
            "  {:<6} {} ({})",
            program.code, program.name, program.faculty
        );
    }

    println!("\n=== Registration ===");
    let mut registered = Vec::new();
    for program in service.catalog().programs().to_vec() {
        for index in 0..args.per_program {
            let email = format!(
                "candidate{index}.{}@example.com",
                program.code.as_str().to_ascii_lowercase()
            );
            let record = service.register(RegistrationSubmission {
                full_name: format!("Calon {} {}", program.code, index + 1),
                email,
                phone: "+628123456789".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2004, 1, 1).expect("valid date"),
                address: None,
                program_code: program.code.as_str().to_string(),
                track: AdmissionTrack::Snbt,
            })?;
            println!(
                "  {} registered for {} ({})",
                record.id,
                program.code,
                record.status.label()
            );
            registered.push(record);
        }
    }

    println!("\n=== Pending queue ===");
    let waiting = service.pending(usize::MAX)?;
    println!("  {} candidates awaiting approval", waiting.len());
    for record in &waiting {
        println!("  {} ({}, {})", record.id, record.program_code, record.track.label());
    }

    println!("\n=== Approval ===");
    for record in &registered {
        let nim = service.approve(&record.id)?;
        println!("  {} -> NIM {nim}", record.id);
    }

    if let Some(first) = registered.first() {
        println!("\n=== Idempotent retry ===");
        let partition = first.partition().map_err(AdmissionError::from)?;
        let before = counters.last_sequence(&partition);
        let nim = service.approve(&first.id)?;
        let after = counters.last_sequence(&partition);
        println!(
            "  {} re-approved -> NIM {nim} (counter {before} -> {after})",
            first.id
        );
    }

    println!("\n=== Error handling ===");
    let missing = CandidateId("cmhs-999999".to_string());
    match service.approve(&missing) {
        Err(error) => println!("  approve({missing}) -> {error}"),
        Ok(nim) => println!("  unexpected NIM {nim} for missing candidate"),
    }

    Ok(())
}
