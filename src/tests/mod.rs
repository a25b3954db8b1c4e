
use crate::{
    objects::{
        Ceremony,
        CeremonyState,
        CeremonyTimeoutType,
        Circuit,
        ContributionStep,
        Participant,
        ParticipantStatus,
        Timeout,
        TimeoutType,
    },
    storage::{Locator, Object},
    testing::prelude::*,
    Coordinator,
    CoordinatorError,
};

use std::sync::Arc;

const CEREMONY: &str = "test-ceremony-1";
const CIRCUIT: &str = "test-circuit-1";
const NOW: i64 = 1_000_000_000;

fn test_setup(timeout_type: CeremonyTimeoutType, penalty: i64) -> anyhow::Result<(Coordinator, Arc<TestClock>)> {
    test_logger();

    let clock = Arc::new(TestClock::new(NOW));
    let coordinator = test_coordinator(&TEST_ENVIRONMENT, clock.clone())?;

    let ceremony = Ceremony::new(
        CEREMONY.to_string(),
        CeremonyState::Opened,
        0,
        i64::MAX,
        timeout_type,
        penalty,
        NOW,
    );
    seed_object(
        &coordinator,
        Locator::Ceremony(CEREMONY.to_string()),
        Object::Ceremony(ceremony),
    )?;

    Ok((coordinator, clock))
}

fn seed_circuit(
    coordinator: &Coordinator,
    circuit_id: &str,
    contributors: Vec<&str>,
    avg_full_contribution: i64,
    dynamic_threshold: i64,
    fixed_time_window: i64,
) -> anyhow::Result<()> {
    let circuit = Circuit::new(
        circuit_id.to_string(),
        CEREMONY.to_string(),
        contributors.into_iter().map(String::from).collect(),
        avg_full_contribution,
        dynamic_threshold,
        fixed_time_window,
        NOW,
    );
    seed_object(
        coordinator,
        Locator::Circuit(CEREMONY.to_string(), circuit_id.to_string()),
        Object::Circuit(circuit),
    )
}

fn seed_participant(coordinator: &Coordinator, participant: Participant) -> anyhow::Result<()> {
    seed_object(
        coordinator,
        Locator::Participant(CEREMONY.to_string(), participant.id().to_string()),
        Object::Participant(participant),
    )
}

fn seed_timeout(coordinator: &Coordinator, participant_id: &str, timeout: Timeout) -> anyhow::Result<()> {
    seed_object(
        coordinator,
        Locator::Timeout(CEREMONY.to_string(), participant_id.to_string(), timeout.id().to_string()),
        Object::Timeout(timeout),
    )
}

/// Builds a contributing participant advanced to the given step, with
/// every transition stamped at `started_at`.
fn contributing_participant(id: &str, step: ContributionStep, started_at: i64) -> anyhow::Result<Participant> {
    let mut participant = Participant::new(id.to_string(), started_at);
    participant.mark_ready(started_at)?;
    participant.start_contributing(started_at)?;
    while participant.contribution_step() != step {
        participant.advance_contribution_step(started_at)?;
    }
    Ok(participant)
}

fn new_participant_registers_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec![], 0, 0, 5)?;

    let caller = test_participant_caller("u1");
    assert!(coordinator.check_participant_for_ceremony(&caller, CEREMONY)?);

    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert_eq!(ParticipantStatus::Waiting, participant.status());
    assert_eq!(0, participant.contribution_progress());
    assert_eq!(ContributionStep::Downloading, participant.contribution_step());
    assert!(participant.contributions().is_empty());
    assert_eq!(NOW, participant.last_updated());

    // A repeated check is a read-only no-op for a waiting participant.
    let before = snapshot_ceremony(&coordinator, CEREMONY)?;
    assert!(coordinator.check_participant_for_ceremony(&caller, CEREMONY)?);
    assert_eq!(before, snapshot_ceremony(&coordinator, CEREMONY)?);

    Ok(())
}

fn timed_out_retry_before_penalty_expires_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec![], 0, 0, 5)?;

    let mut participant = Participant::new("u1".to_string(), NOW - 1_000);
    participant.mark_timed_out(NOW - 1_000);
    seed_participant(&coordinator, participant)?;
    seed_timeout(
        &coordinator,
        "u1",
        Timeout::new("t1".to_string(), TimeoutType::BlockingContribution, NOW - 1_000, NOW + 10_000),
    )?;

    let caller = test_participant_caller("u1");
    let before = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert!(!coordinator.check_participant_for_ceremony(&caller, CEREMONY)?);

    // The rejected retry leaves the participant untouched, field by field.
    let after = fetch_participant(&coordinator, CEREMONY, "u1")?;
    let diff = serde_json::to_string(&Diff::serializable(&before, &after))?;
    let empty = serde_json::to_string(&Diff::serializable(&after, &after))?;
    assert_eq!(empty, diff);

    Ok(())
}

fn timed_out_retry_after_penalty_expires_test() -> anyhow::Result<()> {
    let (coordinator, clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec![], 0, 0, 5)?;

    let mut participant = Participant::new("u1".to_string(), NOW - 1_000);
    participant.mark_timed_out(NOW - 1_000);
    seed_participant(&coordinator, participant)?;
    seed_timeout(
        &coordinator,
        "u1",
        Timeout::new("t1".to_string(), TimeoutType::BlockingContribution, NOW - 1_000, NOW + 10_000),
    )?;

    // Move past the penalty window.
    clock.set(NOW + 10_001);

    let caller = test_participant_caller("u1");
    assert!(coordinator.check_participant_for_ceremony(&caller, CEREMONY)?);

    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert_eq!(ParticipantStatus::Exhumed, participant.status());
    assert_eq!(ContributionStep::Downloading, participant.contribution_step());
    assert_eq!(NOW + 10_001, participant.last_updated());

    // The rehabilitation happens once; the next check is a read-only no-op.
    let before = snapshot_ceremony(&coordinator, CEREMONY)?;
    assert!(coordinator.check_participant_for_ceremony(&caller, CEREMONY)?);
    assert_eq!(before, snapshot_ceremony(&coordinator, CEREMONY)?);

    Ok(())
}

fn finished_participant_check_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec![], 0, 0, 5)?;

    let mut participant = contributing_participant("u1", ContributionStep::Completed, NOW - 1_000)?;
    participant.finish(1, NOW - 1_000)?;
    seed_participant(&coordinator, participant)?;

    let caller = test_participant_caller("u1");
    let before = snapshot_ceremony(&coordinator, CEREMONY)?;
    assert!(!coordinator.check_participant_for_ceremony(&caller, CEREMONY)?);
    assert!(!coordinator.check_participant_for_ceremony(&caller, CEREMONY)?);
    assert_eq!(before, snapshot_ceremony(&coordinator, CEREMONY)?);

    Ok(())
}

fn fixed_window_eviction_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["P", "Q"], 0, 0, 5)?;

    // P has been computing for six minutes against a five minute window.
    let stuck = contributing_participant("P", ContributionStep::Computing, NOW - 6 * 60_000)?;
    seed_participant(&coordinator, stuck)?;
    seed_participant(&coordinator, Participant::new("Q".to_string(), NOW - 6 * 60_000))?;

    coordinator.check_and_remove_blocking_contributor()?;

    let circuit = fetch_circuit(&coordinator, CEREMONY, CIRCUIT)?;
    assert_eq!(vec!["Q".to_string()], circuit.waiting_queue().contributors());
    assert_eq!(Some("Q"), circuit.waiting_queue().current_contributor());
    assert_eq!(1, circuit.waiting_queue().failed_contributions());
    assert_eq!(NOW, circuit.last_updated());

    let evicted = fetch_participant(&coordinator, CEREMONY, "P")?;
    assert_eq!(ParticipantStatus::Timedout, evicted.status());
    assert_eq!(NOW, evicted.last_updated());

    let promoted = fetch_participant(&coordinator, CEREMONY, "Q")?;
    assert_eq!(ParticipantStatus::Waiting, promoted.status());
    assert_eq!(NOW, promoted.last_updated());

    let timeouts = fetch_timeouts(&coordinator, CEREMONY, "P")?;
    assert_eq!(1, timeouts.len());
    assert_eq!(TimeoutType::BlockingContribution, timeouts[0].kind());
    assert_eq!(NOW, timeouts[0].start_date());
    assert_eq!(NOW + 600_000, timeouts[0].end_date());

    // The next tick finds Q waiting with no deadline and changes nothing.
    let before = snapshot_ceremony(&coordinator, CEREMONY)?;
    coordinator.check_and_remove_blocking_contributor()?;
    assert_eq!(before, snapshot_ceremony(&coordinator, CEREMONY)?);

    Ok(())
}

fn dynamic_first_contributor_immunity_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Dynamic, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["P"], 0, 20, 5)?;

    // P has been stuck for an hour, but there is no timing baseline yet.
    let stuck = contributing_participant("P", ContributionStep::Computing, NOW - 3_600_000)?;
    seed_participant(&coordinator, stuck)?;

    let before = snapshot_ceremony(&coordinator, CEREMONY)?;
    coordinator.check_and_remove_blocking_contributor()?;
    assert_eq!(before, snapshot_ceremony(&coordinator, CEREMONY)?);

    Ok(())
}

fn dynamic_immunity_ends_with_the_first_completion_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Dynamic, 10)?;

    // The average is still zero, but a contribution has completed, so the
    // baseline exists and the zero-width deadline applies.
    let mut circuit = Circuit::new(
        CIRCUIT.to_string(),
        CEREMONY.to_string(),
        vec!["P".to_string()],
        0,
        20,
        5,
        NOW,
    );
    circuit.record_completed_contribution(NOW);
    seed_object(
        &coordinator,
        Locator::Circuit(CEREMONY.to_string(), CIRCUIT.to_string()),
        Object::Circuit(circuit),
    )?;

    let stuck = contributing_participant("P", ContributionStep::Computing, NOW - 1_000)?;
    seed_participant(&coordinator, stuck)?;

    coordinator.check_and_remove_blocking_contributor()?;

    let evicted = fetch_participant(&coordinator, CEREMONY, "P")?;
    assert_eq!(ParticipantStatus::Timedout, evicted.status());

    Ok(())
}

fn dynamic_eviction_honors_threshold_test() -> anyhow::Result<()> {
    let (coordinator, clock) = test_setup(CeremonyTimeoutType::Dynamic, 10)?;
    // A 100 second average widened by 20 percent allows 120 seconds.
    seed_circuit(&coordinator, CIRCUIT, vec!["P"], 100_000, 20, 5)?;

    let stuck = contributing_participant("P", ContributionStep::Uploading, NOW - 120_000)?;
    seed_participant(&coordinator, stuck)?;

    // At exactly the deadline nothing expires.
    let before = snapshot_ceremony(&coordinator, CEREMONY)?;
    coordinator.check_and_remove_blocking_contributor()?;
    assert_eq!(before, snapshot_ceremony(&coordinator, CEREMONY)?);

    // One millisecond past the deadline the participant is evicted.
    clock.set(NOW + 1);
    coordinator.check_and_remove_blocking_contributor()?;

    let evicted = fetch_participant(&coordinator, CEREMONY, "P")?;
    assert_eq!(ParticipantStatus::Timedout, evicted.status());

    let circuit = fetch_circuit(&coordinator, CEREMONY, CIRCUIT)?;
    assert!(circuit.waiting_queue().contributors().is_empty());
    assert_eq!(None, circuit.waiting_queue().current_contributor());

    Ok(())
}

fn verification_stall_eviction_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["P"], 0, 0, 5)?;

    // P entered verification an hour ago against a 59 minute deadline.
    let stuck = contributing_participant("P", ContributionStep::Verifying, NOW - 3_600_000)?;
    assert_eq!(Some(NOW - 3_600_000), stuck.verification_started_at());
    seed_participant(&coordinator, stuck)?;

    coordinator.check_and_remove_blocking_contributor()?;

    let evicted = fetch_participant(&coordinator, CEREMONY, "P")?;
    assert_eq!(ParticipantStatus::Timedout, evicted.status());

    let timeouts = fetch_timeouts(&coordinator, CEREMONY, "P")?;
    assert_eq!(1, timeouts.len());
    assert_eq!(TimeoutType::BlockingCloudFunction, timeouts[0].kind());

    Ok(())
}

fn ended_ceremony_is_not_scanned_test() -> anyhow::Result<()> {
    let (coordinator, clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["P"], 0, 0, 5)?;

    let stuck = contributing_participant("P", ContributionStep::Computing, NOW - 6 * 60_000)?;
    seed_participant(&coordinator, stuck)?;

    // Close the ceremony window and move the clock past it.
    store_object(
        &coordinator,
        &Locator::Ceremony(CEREMONY.to_string()),
        Object::Ceremony(Ceremony::new(
            CEREMONY.to_string(),
            CeremonyState::Opened,
            0,
            NOW + 1_000,
            CeremonyTimeoutType::Fixed,
            10,
            NOW,
        )),
    )?;
    clock.set(NOW + 1_001);

    let before = snapshot_ceremony(&coordinator, CEREMONY)?;
    coordinator.check_and_remove_blocking_contributor()?;
    assert_eq!(before, snapshot_ceremony(&coordinator, CEREMONY)?);

    Ok(())
}

fn eviction_only_touches_expired_circuits_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, "test-circuit-1", vec!["P", "Q"], 0, 0, 5)?;
    seed_circuit(&coordinator, "test-circuit-2", vec!["R"], 0, 0, 5)?;

    // P overran its window on circuit 1; R on circuit 2 is fresh.
    let stuck = contributing_participant("P", ContributionStep::Computing, NOW - 6 * 60_000)?;
    seed_participant(&coordinator, stuck)?;
    seed_participant(&coordinator, Participant::new("Q".to_string(), NOW - 6 * 60_000))?;
    let fresh = contributing_participant("R", ContributionStep::Computing, NOW - 1_000)?;
    seed_participant(&coordinator, fresh)?;

    coordinator.check_and_remove_blocking_contributor()?;

    // Circuit 1 rotated to Q; the mirror still tracks the queue head.
    let first = fetch_circuit(&coordinator, CEREMONY, "test-circuit-1")?;
    assert_eq!(vec!["Q".to_string()], first.waiting_queue().contributors());
    assert_eq!(Some("Q"), first.waiting_queue().current_contributor());

    // Circuit 2 is untouched.
    let second = fetch_circuit(&coordinator, CEREMONY, "test-circuit-2")?;
    assert_eq!(vec!["R".to_string()], second.waiting_queue().contributors());
    assert_eq!(Some("R"), second.waiting_queue().current_contributor());
    assert_eq!(0, second.waiting_queue().failed_contributions());
    assert_eq!(
        ParticipantStatus::Contributing,
        fetch_participant(&coordinator, CEREMONY, "R")?.status()
    );

    Ok(())
}

fn contribution_step_progression_test() -> anyhow::Result<()> {
    let (coordinator, clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["u1"], 0, 0, 5)?;

    let participant = contributing_participant("u1", ContributionStep::Downloading, NOW - 1_000)?;
    seed_participant(&coordinator, participant)?;

    let caller = test_participant_caller("u1");
    assert_eq!(
        ContributionStep::Computing,
        coordinator.progress_to_next_contribution_step(&caller, CEREMONY)?
    );
    assert_eq!(
        ContributionStep::Uploading,
        coordinator.progress_to_next_contribution_step(&caller, CEREMONY)?
    );

    // Entering the verification step records its start time.
    clock.set(NOW + 5_000);
    assert_eq!(
        ContributionStep::Verifying,
        coordinator.progress_to_next_contribution_step(&caller, CEREMONY)?
    );
    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert_eq!(Some(NOW + 5_000), participant.verification_started_at());

    assert_eq!(
        ContributionStep::Completed,
        coordinator.progress_to_next_contribution_step(&caller, CEREMONY)?
    );
    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert_eq!(1, participant.contribution_progress());

    // The chain stops at COMPLETED.
    assert!(matches!(
        coordinator.progress_to_next_contribution_step(&caller, CEREMONY),
        Err(CoordinatorError::ContributionStepAlreadyComplete)
    ));

    Ok(())
}

fn chunk_append_preserves_prior_chunks_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["u1"], 0, 0, 5)?;

    let participant = contributing_participant("u1", ContributionStep::Uploading, NOW - 1_000)?;
    seed_participant(&coordinator, participant)?;

    let caller = test_participant_caller("u1");
    coordinator.temporary_store_current_contribution_multi_part_upload_id(&caller, CEREMONY, "upload-1")?;
    coordinator.temporary_store_current_contribution_uploaded_chunk_data(&caller, CEREMONY, "a", 1)?;
    coordinator.temporary_store_current_contribution_uploaded_chunk_data(&caller, CEREMONY, "b", 2)?;

    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    let data = participant.temp_contribution_data().unwrap();
    assert_eq!(Some("upload-1"), data.upload_id());
    assert_eq!(2, data.chunks().len());
    assert_eq!("a", data.chunks()[0].e_tag());
    assert_eq!(1, data.chunks()[0].part_number());
    assert_eq!("b", data.chunks()[1].e_tag());
    assert_eq!(2, data.chunks()[1].part_number());

    Ok(())
}

fn computation_time_storage_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["u1"], 0, 0, 5)?;

    let participant = contributing_participant("u1", ContributionStep::Computing, NOW - 1_000)?;
    seed_participant(&coordinator, participant)?;

    let caller = test_participant_caller("u1");

    // A non-positive measurement is rejected outright.
    assert!(matches!(
        coordinator.temporary_store_current_contribution_computation_time(&caller, CEREMONY, 0),
        Err(CoordinatorError::ComputationTimeInvalid)
    ));

    coordinator.temporary_store_current_contribution_computation_time(&caller, CEREMONY, 42_000)?;
    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert_eq!(
        Some(42_000),
        participant.temp_contribution_data().unwrap().contribution_computation_time()
    );

    Ok(())
}

fn permanent_contribution_storage_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["u1"], 0, 0, 5)?;

    let participant = contributing_participant("u1", ContributionStep::Computing, NOW - 1_000)?;
    seed_participant(&coordinator, participant)?;

    let caller = test_participant_caller("u1");
    coordinator.permanently_store_current_contribution_time_and_hash(&caller, CEREMONY, 42_000, "0xdeadbeef")?;

    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert_eq!(1, participant.contributions().len());
    assert_eq!("0xdeadbeef", participant.contributions()[0].hash());
    assert_eq!(42_000, participant.contributions()[0].computation_time());

    Ok(())
}

fn finalizing_contribution_requires_coordinator_claim_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec![], 0, 0, 5)?;

    let mut participant = Participant::new("u1".to_string(), NOW - 1_000);
    participant.begin_finalizing(NOW - 1_000);
    seed_participant(&coordinator, participant)?;

    // A participant claim cannot record a finalizing contribution.
    let caller = test_participant_caller("u1");
    assert!(matches!(
        coordinator.permanently_store_current_contribution_time_and_hash(&caller, CEREMONY, 42_000, "0xdeadbeef"),
        Err(CoordinatorError::ContributionStepMismatch)
    ));

    // The coordinator claim can.
    let caller = test_coordinator_caller("u1");
    coordinator.permanently_store_current_contribution_time_and_hash(&caller, CEREMONY, 42_000, "0xdeadbeef")?;

    let participant = fetch_participant(&coordinator, CEREMONY, "u1")?;
    assert_eq!(1, participant.contributions().len());

    Ok(())
}

fn handler_preamble_rejections_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec![], 0, 0, 5)?;

    // A caller with no recognized claim is rejected.
    let unauthorized = test_unauthorized_caller("u1");
    assert!(matches!(
        coordinator.check_participant_for_ceremony(&unauthorized, CEREMONY),
        Err(CoordinatorError::UnauthenticatedCaller)
    ));

    let caller = test_participant_caller("u1");

    // A missing ceremony ID is rejected before any read.
    assert!(matches!(
        coordinator.check_participant_for_ceremony(&caller, ""),
        Err(CoordinatorError::CeremonyIdMissing)
    ));

    // An unknown ceremony is rejected.
    assert!(matches!(
        coordinator.check_participant_for_ceremony(&caller, "no-such-ceremony"),
        Err(CoordinatorError::CeremonyMissing)
    ));

    // A ceremony that is not OPENED is rejected.
    seed_object(
        &coordinator,
        Locator::Ceremony("scheduled".to_string()),
        Object::Ceremony(Ceremony::new(
            "scheduled".to_string(),
            CeremonyState::Scheduled,
            0,
            i64::MAX,
            CeremonyTimeoutType::Fixed,
            10,
            NOW,
        )),
    )?;
    assert!(matches!(
        coordinator.check_participant_for_ceremony(&caller, "scheduled"),
        Err(CoordinatorError::CeremonyNotOpen)
    ));

    // Step handlers require an existing participant document.
    assert!(matches!(
        coordinator.progress_to_next_contribution_step(&caller, CEREMONY),
        Err(CoordinatorError::ParticipantMissing)
    ));

    Ok(())
}

fn wrong_step_rejections_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["u1"], 0, 0, 5)?;

    // The participant is downloading, so every step-guarded handler rejects.
    let participant = contributing_participant("u1", ContributionStep::Downloading, NOW - 1_000)?;
    seed_participant(&coordinator, participant)?;

    let caller = test_participant_caller("u1");
    assert!(matches!(
        coordinator.temporary_store_current_contribution_computation_time(&caller, CEREMONY, 42_000),
        Err(CoordinatorError::ContributionStepMismatch)
    ));
    assert!(matches!(
        coordinator.permanently_store_current_contribution_time_and_hash(&caller, CEREMONY, 42_000, "0xdeadbeef"),
        Err(CoordinatorError::ContributionStepMismatch)
    ));
    assert!(matches!(
        coordinator.temporary_store_current_contribution_multi_part_upload_id(&caller, CEREMONY, "upload-1"),
        Err(CoordinatorError::ContributionStepMismatch)
    ));
    assert!(matches!(
        coordinator.temporary_store_current_contribution_uploaded_chunk_data(&caller, CEREMONY, "a", 1),
        Err(CoordinatorError::ContributionStepMismatch)
    ));

    Ok(())
}

fn status_report_test() -> anyhow::Result<()> {
    let (coordinator, _clock) = test_setup(CeremonyTimeoutType::Fixed, 10)?;
    seed_circuit(&coordinator, CIRCUIT, vec!["P", "Q"], 0, 0, 5)?;

    let report = coordinator.status_report()?;
    assert!(report.contains(CEREMONY));
    assert!(report.contains(CIRCUIT));
    assert!(report.contains("2 queued"));
    assert!(report.contains("current P"));

    Ok(())
}

#[test]
#[named]
#[serial]
fn test_new_participant_registers() {
    new_participant_registers_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_timed_out_retry_before_penalty_expires() {
    timed_out_retry_before_penalty_expires_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_timed_out_retry_after_penalty_expires() {
    timed_out_retry_after_penalty_expires_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_finished_participant_check() {
    finished_participant_check_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_fixed_window_eviction() {
    fixed_window_eviction_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_dynamic_first_contributor_immunity() {
    dynamic_first_contributor_immunity_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_dynamic_immunity_ends_with_the_first_completion() {
    dynamic_immunity_ends_with_the_first_completion_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_dynamic_eviction_honors_threshold() {
    dynamic_eviction_honors_threshold_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_verification_stall_eviction() {
    verification_stall_eviction_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_ended_ceremony_is_not_scanned() {
    ended_ceremony_is_not_scanned_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_eviction_only_touches_expired_circuits() {
    eviction_only_touches_expired_circuits_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_contribution_step_progression() {
    contribution_step_progression_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_chunk_append_preserves_prior_chunks() {
    chunk_append_preserves_prior_chunks_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_computation_time_storage() {
    computation_time_storage_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_permanent_contribution_storage() {
    permanent_contribution_storage_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_finalizing_contribution_requires_coordinator_claim() {
    finalizing_contribution_requires_coordinator_claim_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_handler_preamble_rejections() {
    handler_preamble_rejections_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_wrong_step_rejections() {
    wrong_step_rejections_test().unwrap();
}

#[test]
#[named]
#[serial]
fn test_status_report() {
    status_report_test().unwrap();
}
