use crate::{apis::error_status, authentication::AuthenticatedCaller, Coordinator};

use rocket::{http::Status, State};
use tracing::error;

#[post("/ceremonies/<ceremony_id>/contributions/step")]
pub fn step_post(
    coordinator: State<Coordinator>,
    caller: AuthenticatedCaller,
    ceremony_id: String,
) -> Result<String, Status> {
    match coordinator.progress_to_next_contribution_step(&caller, &ceremony_id) {
        Ok(step) => Ok(json!({
            "status": "ok",
            "result": {
                "contributionStep": step
            }
        })
        .to_string()),
        Err(error) => {
            error!("Unable to progress participant {} in ceremony {}: {}", caller, ceremony_id, error);
            Err(error_status(&error))
        }
    }
}
