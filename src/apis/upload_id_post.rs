use crate::{apis::error_status, authentication::AuthenticatedCaller, Coordinator};

use rocket::{http::Status, State};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadIdPayload {
    upload_id: String,
}

json_payload!(UploadIdPayload);

#[post("/ceremonies/<ceremony_id>/contributions/upload-id", format = "json", data = "<payload>")]
pub fn upload_id_post(
    coordinator: State<Coordinator>,
    caller: AuthenticatedCaller,
    ceremony_id: String,
    payload: UploadIdPayload,
) -> Result<String, Status> {
    match coordinator.temporary_store_current_contribution_multi_part_upload_id(&caller, &ceremony_id, &payload.upload_id) {
        Ok(()) => Ok(json!({ "status": "ok" }).to_string()),
        Err(error) => {
            error!("Unable to store the upload ID of {}: {}", caller, error);
            Err(error_status(&error))
        }
    }
}
