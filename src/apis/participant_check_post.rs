use crate::{apis::error_status, authentication::AuthenticatedCaller, Coordinator};

use rocket::{http::Status, State};
use tracing::error;

#[post("/ceremonies/<ceremony_id>/participants/check")]
pub fn participant_check_post(
    coordinator: State<Coordinator>,
    caller: AuthenticatedCaller,
    ceremony_id: String,
) -> Result<String, Status> {
    match coordinator.check_participant_for_ceremony(&caller, &ceremony_id) {
        Ok(can_contribute) => Ok(json!({
            "status": "ok",
            "result": {
                "canContribute": can_contribute
            }
        })
        .to_string()),
        Err(error) => {
            error!("Unable to check participant {} for ceremony {}: {}", caller, ceremony_id, error);
            Err(error_status(&error))
        }
    }
}
