use crate::{apis::error_status, authentication::AuthenticatedCaller, Coordinator};

use rocket::{http::Status, State};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationTimePayload {
    contribution_computation_time: i64,
}

json_payload!(ComputationTimePayload);

#[post(
    "/ceremonies/<ceremony_id>/contributions/computation-time",
    format = "json",
    data = "<payload>"
)]
pub fn computation_time_post(
    coordinator: State<Coordinator>,
    caller: AuthenticatedCaller,
    ceremony_id: String,
    payload: ComputationTimePayload,
) -> Result<String, Status> {
    match coordinator.temporary_store_current_contribution_computation_time(
        &caller,
        &ceremony_id,
        payload.contribution_computation_time,
    ) {
        Ok(()) => Ok(json!({ "status": "ok" }).to_string()),
        Err(error) => {
            error!("Unable to store the computation time of {}: {}", caller, error);
            Err(error_status(&error))
        }
    }
}
