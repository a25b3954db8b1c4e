use ceremony_coordinator::{
    apis,
    authentication::{Authentication, Dummy},
    clock::SystemClock,
    environment::{Environment, Parameters},
    logger::initialize_logger,
    Coordinator,
};

use rocket::config::{Config, Environment as RocketEnvironment};
use std::sync::Arc;
use tokio::{task, time::sleep};
use tracing::*;

#[inline]
async fn coordinator(environment: &Environment, authentication: Box<dyn Authentication>) -> anyhow::Result<Coordinator> {
    Ok(Coordinator::new(environment.clone(), authentication, Arc::new(SystemClock))?)
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    // Set the environment.
    let environment: Environment = Environment::Development(Parameters::Quick);
    // let environment: Environment = Environment::Production(Parameters::Default);

    initialize_logger(&environment);

    // Instantiate the coordinator.
    let coordinator = coordinator(&environment, Box::new(Dummy)).await?;

    // Initialize the eviction scheduler loop.
    let operator = coordinator.clone();
    let scheduler = task::spawn(async move {
        loop {
            match operator.status_report() {
                Ok(report) if !report.is_empty() => info!("Status Report\n\t{}", report),
                Ok(_) => trace!("No opened ceremonies"),
                Err(error) => error!("{}", error),
            }

            // Run the eviction operation.
            if let Err(error) = operator.check_and_remove_blocking_contributor() {
                error!("{}", error);
            }

            // Sleep in between iterations.
            sleep(operator.environment().eviction_interval()).await;
        }
    });

    // Initialize the API server.
    let server = coordinator.clone();
    let cors = environment.cors();
    let config = Config::build(RocketEnvironment::Staging)
        .address(environment.address())
        .port(environment.port())
        .finalize()?;
    info!("API server listening at {}", environment.base_url());
    std::thread::spawn(move || {
        rocket::custom(config)
            .manage(server)
            .mount("/", apis::routes())
            .attach(cors)
            .launch();
    });

    scheduler.await.expect("The scheduler handle has panicked");

    Ok(())
}
