use crate::{apis::error_status, authentication::AuthenticatedCaller, Coordinator};

use rocket::{http::Status, State};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionPayload {
    contribution_computation_time: i64,
    contribution_hash: String,
}

json_payload!(ContributionPayload);

#[post("/ceremonies/<ceremony_id>/contributions", format = "json", data = "<payload>")]
pub fn contribution_post(
    coordinator: State<Coordinator>,
    caller: AuthenticatedCaller,
    ceremony_id: String,
    payload: ContributionPayload,
) -> Result<String, Status> {
    match coordinator.permanently_store_current_contribution_time_and_hash(
        &caller,
        &ceremony_id,
        payload.contribution_computation_time,
        &payload.contribution_hash,
    ) {
        Ok(()) => Ok(json!({ "status": "ok" }).to_string()),
        Err(error) => {
            error!("Unable to record the contribution of {}: {}", caller, error);
            Err(error_status(&error))
        }
    }
}
