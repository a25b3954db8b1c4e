use crate::{
    authentication::{AuthenticatedCaller, Claims, Dummy},
    environment::Environment,
    objects::{Circuit, Participant, Timeout},
    storage::{Collection, Locator, Object},
    testing::clock::TestClock,
    Coordinator,
};

use std::sync::Arc;
use tracing::info;

pub fn test_logger() {
    #[cfg(not(feature = "silent"))]
    {
        use once_cell::sync::OnceCell;
        use tracing::Level;

        static INSTANCE: OnceCell<()> = OnceCell::new();
        INSTANCE.get_or_init(|| {
            let subscriber = tracing_subscriber::fmt().with_max_level(Level::TRACE).finish();
            tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
        });
    }
}

/// Initializes a test coordinator over the given environment and clock.
pub fn test_coordinator(environment: &Environment, clock: Arc<TestClock>) -> anyhow::Result<Coordinator> {
    info!("Starting coordinator");
    let coordinator = Coordinator::new(environment.clone(), Box::new(Dummy), clock)?;
    info!("Coordinator is ready");
    Ok(coordinator)
}

/// Returns a caller holding the participant claim.
pub fn test_participant_caller(uid: &str) -> AuthenticatedCaller {
    AuthenticatedCaller::new(
        uid.to_string(),
        Claims {
            participant: true,
            coordinator: false,
        },
    )
}

/// Returns a caller holding the coordinator claim.
pub fn test_coordinator_caller(uid: &str) -> AuthenticatedCaller {
    AuthenticatedCaller::new(
        uid.to_string(),
        Claims {
            participant: false,
            coordinator: true,
        },
    )
}

/// Returns a caller holding no recognized claim.
pub fn test_unauthorized_caller(uid: &str) -> AuthenticatedCaller {
    AuthenticatedCaller::new(uid.to_string(), Claims::default())
}

/// Seeds a document into the storage of the coordinator.
pub fn seed_object(coordinator: &Coordinator, locator: Locator, object: Object) -> anyhow::Result<()> {
    let storage = coordinator.storage();
    let mut storage = storage.write().unwrap();
    storage.insert(locator, object)?;
    Ok(())
}

/// Overwrites a seeded document in the storage of the coordinator.
pub fn store_object(coordinator: &Coordinator, locator: &Locator, object: Object) -> anyhow::Result<()> {
    let storage = coordinator.storage();
    let mut storage = storage.write().unwrap();
    storage.update(locator, object)?;
    Ok(())
}

/// Fetches the participant document of the given caller.
pub fn fetch_participant(coordinator: &Coordinator, ceremony_id: &str, participant_id: &str) -> anyhow::Result<Participant> {
    let storage = coordinator.storage();
    let storage = storage.read().unwrap();
    let locator = Locator::Participant(ceremony_id.to_string(), participant_id.to_string());
    Ok(storage.get(&locator)?.into_participant()?)
}

/// Fetches a circuit document.
pub fn fetch_circuit(coordinator: &Coordinator, ceremony_id: &str, circuit_id: &str) -> anyhow::Result<Circuit> {
    let storage = coordinator.storage();
    let storage = storage.read().unwrap();
    let locator = Locator::Circuit(ceremony_id.to_string(), circuit_id.to_string());
    Ok(storage.get(&locator)?.into_circuit()?)
}

/// Fetches every timeout document of the given participant, oldest first.
pub fn fetch_timeouts(coordinator: &Coordinator, ceremony_id: &str, participant_id: &str) -> anyhow::Result<Vec<Timeout>> {
    let storage = coordinator.storage();
    let storage = storage.read().unwrap();
    let collection = Collection::Timeouts(ceremony_id.to_string(), participant_id.to_string());
    storage
        .query(&collection, None)?
        .into_iter()
        .map(|(_, object)| Ok(object.into_timeout()?))
        .collect()
}

///
/// Snapshots every document of the given ceremony: the ceremony itself,
/// its circuits, its participants, and their timeouts.
///
pub fn snapshot_ceremony(coordinator: &Coordinator, ceremony_id: &str) -> anyhow::Result<Vec<(Locator, Object)>> {
    let storage = coordinator.storage();
    let storage = storage.read().unwrap();

    let ceremony_locator = Locator::Ceremony(ceremony_id.to_string());
    let mut documents = vec![(ceremony_locator.clone(), storage.get(&ceremony_locator)?)];

    documents.extend(storage.query(&Collection::Circuits(ceremony_id.to_string()), None)?);

    let participants = storage.query(&Collection::Participants(ceremony_id.to_string()), None)?;
    for (locator, object) in &participants {
        if let Locator::Participant(_, participant_id) = locator {
            documents.extend(storage.query(
                &Collection::Timeouts(ceremony_id.to_string(), participant_id.clone()),
                None,
            )?);
        }
        documents.push((locator.clone(), object.clone()));
    }

    Ok(documents)
}
