use crate::{apis::error_status, authentication::AuthenticatedCaller, Coordinator};

use rocket::{http::Status, State};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    e_tag: String,
    part_number: u64,
}

json_payload!(ChunkPayload);

#[post("/ceremonies/<ceremony_id>/contributions/chunks", format = "json", data = "<payload>")]
pub fn chunk_post(
    coordinator: State<Coordinator>,
    caller: AuthenticatedCaller,
    ceremony_id: String,
    payload: ChunkPayload,
) -> Result<String, Status> {
    match coordinator.temporary_store_current_contribution_uploaded_chunk_data(&caller, &ceremony_id, &payload.e_tag, payload.part_number)
    {
        Ok(()) => Ok(json!({ "status": "ok" }).to_string()),
        Err(error) => {
            error!("Unable to store an uploaded chunk of {}: {}", caller, error);
            Err(error_status(&error))
        }
    }
}
