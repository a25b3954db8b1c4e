use crate::{
    environment::Environment,
    objects::{Ceremony, CeremonyState, CeremonyTimeoutType, Circuit, ContributionStep, Participant, Timeout, TimeoutType},
    storage::{Batch, Collection, Locator, Object, QueryFilter, Storage},
    Coordinator,
    CoordinatorError,
};

use tracing::{info, trace, warn};

///
/// Returns the deadline of the contribution in flight, covering the
/// DOWNLOADING, COMPUTING, and UPLOADING steps, or `None` if the
/// contribution has not started.
///
/// A dynamic ceremony widens the moving average of past full contributions
/// by the circuit tolerance percentage; a fixed ceremony grants a
/// wall-clock window from contribution start.
///
pub(crate) fn contribution_deadline(ceremony: &Ceremony, circuit: &Circuit, participant: &Participant) -> Option<i64> {
    let started_at = participant.contribution_started_at()?;
    let deadline = match ceremony.timeout_type() {
        CeremonyTimeoutType::Dynamic => {
            let avg = circuit.avg_timings().full_contribution();
            started_at + avg + avg * circuit.dynamic_threshold() / 100
        }
        CeremonyTimeoutType::Fixed => started_at + circuit.fixed_time_window() * 60_000,
    };
    Some(deadline)
}

///
/// Returns the deadline of the verification in flight, covering the
/// VERIFYING step, or `0` if verification has not started.
///
pub(crate) fn verification_deadline(environment: &Environment, participant: &Participant) -> i64 {
    match participant.verification_started_at() {
        Some(started_at) => started_at + environment.verification_timeout(),
        None => 0,
    }
}

///
/// Classifies whether the participant is blocking its circuit at the given
/// time, and with which timeout type.
///
/// Deadlines expire strictly: a deadline equal to the current time has not
/// expired yet.
///
pub(crate) fn classify_blocking(
    now: i64,
    step: ContributionStep,
    contribution_deadline: Option<i64>,
    verification_deadline: i64,
) -> Option<TimeoutType> {
    match step {
        ContributionStep::Downloading | ContributionStep::Computing | ContributionStep::Uploading => {
            match contribution_deadline {
                Some(deadline) if deadline < now => Some(TimeoutType::BlockingContribution),
                _ => None,
            }
        }
        ContributionStep::Verifying if verification_deadline > 0 && verification_deadline < now => {
            Some(TimeoutType::BlockingCloudFunction)
        }
        _ => None,
    }
}

impl Coordinator {
    ///
    /// Runs one tick of the eviction scheduler.
    ///
    /// Scans every opened ceremony that has not ended and evicts each
    /// current contributor that overran its deadline, rotating the waiting
    /// queue and creating the penalty record in one storage batch.
    ///
    /// A failure on one circuit is logged and does not abort the scan; the
    /// deadline predicate is stable, so the next tick retries the same
    /// decision.
    ///
    pub fn check_and_remove_blocking_contributor(&self) -> Result<(), CoordinatorError> {
        let now = self.clock().now_millis();

        // Acquire the storage write lock for the whole tick.
        let storage = self.storage();
        let mut storage = storage.write().unwrap();

        let ceremonies = storage.query(
            &Collection::Ceremonies,
            Some(&QueryFilter::StateEquals(CeremonyState::Opened)),
        )?;

        for (locator, object) in ceremonies {
            let ceremony = match object.into_ceremony() {
                Ok(ceremony) => ceremony,
                Err(error) => {
                    warn!("Unable to read the ceremony at {}: {}", locator, error);
                    continue;
                }
            };

            // Skip ceremonies that have already ended.
            if ceremony.end_date() < now {
                trace!("Ceremony {} has ended", ceremony);
                continue;
            }

            let circuits = match Self::load_circuits(&**storage, ceremony.id()) {
                Ok(circuits) => circuits,
                Err(error) => {
                    warn!("Unable to load the circuits of ceremony {}: {}", ceremony, error);
                    continue;
                }
            };

            for (circuit_locator, circuit) in circuits {
                if let Err(error) =
                    self.try_evict_blocking_contributor(&mut **storage, now, &ceremony, circuit_locator, circuit)
                {
                    warn!("Unable to process a circuit of ceremony {}: {}", ceremony, error);
                }
            }
        }

        Ok(())
    }

    ///
    /// Evicts the current contributor of the given circuit if it overran
    /// its deadline, committing the queue rotation, the status flips, and
    /// the penalty record as one batch.
    ///
    fn try_evict_blocking_contributor(
        &self,
        storage: &mut dyn Storage,
        now: i64,
        ceremony: &Ceremony,
        circuit_locator: Locator,
        mut circuit: Circuit,
    ) -> Result<(), CoordinatorError> {
        // Skip circuits with nobody holding the turn.
        let current = match circuit.waiting_queue().current_contributor() {
            Some(current) => current.to_string(),
            None => {
                trace!("Circuit {} has no current contributor", circuit);
                return Ok(());
            }
        };

        // The first contributor of a dynamic ceremony has no timing
        // baseline yet and is never evicted.
        if ceremony.timeout_type() == CeremonyTimeoutType::Dynamic
            && circuit.avg_timings().full_contribution() == 0
            && circuit.waiting_queue().completed_contributions() == 0
        {
            trace!("Circuit {} has no timing baseline yet", circuit);
            return Ok(());
        }

        let participant_locator = Locator::Participant(ceremony.id().to_string(), current.clone());
        let participant = Self::load_participant(storage, &participant_locator)?;

        let contribution_deadline = contribution_deadline(ceremony, &circuit, &participant);
        let verification_deadline = verification_deadline(self.environment(), &participant);

        if contribution_deadline.is_none() && verification_deadline == 0 {
            warn!(
                "Participant {} on circuit {} carries no contribution or verification deadline",
                participant, circuit
            );
            return Ok(());
        }

        let kind = match classify_blocking(
            now,
            participant.contribution_step(),
            contribution_deadline,
            verification_deadline,
        ) {
            Some(kind) => kind,
            None => {
                trace!("Participant {} on circuit {} is within its deadline", participant, circuit);
                return Ok(());
            }
        };

        info!(
            "Evicting participant {} from circuit {} of ceremony {} ({})",
            participant, circuit, ceremony, kind
        );

        let mut batch = Batch::new();

        // Pop the head of the queue and signal the promoted participant.
        let (evicted_id, promoted_id) = circuit.evict_current_contributor(now)?;
        if let Some(promoted_id) = promoted_id {
            let promoted_locator = Locator::Participant(ceremony.id().to_string(), promoted_id);
            let mut promoted = Self::load_participant(storage, &promoted_locator)?;
            promoted.mark_waiting(now);
            batch.update(promoted_locator, Object::Participant(promoted));
        }
        batch.update(circuit_locator, Object::Circuit(circuit));

        // Flip the evicted participant and open its penalty window.
        let mut evicted = participant;
        evicted.mark_timed_out(now);
        batch.update(participant_locator, Object::Participant(evicted));

        let timeout_id = storage.generate_id();
        let timeout = Timeout::new(timeout_id.clone(), kind, now, now + ceremony.penalty_millis());
        batch.insert(
            Locator::Timeout(ceremony.id().to_string(), evicted_id, timeout_id),
            Object::Timeout(timeout),
        );

        storage.commit(batch)?;

        Ok(())
    }
}
