pub mod chunk_post;
pub use chunk_post::*;

pub mod computation_time_post;
pub use computation_time_post::*;

pub mod contribution_post;
pub use contribution_post::*;

pub mod participant_check_post;
pub use participant_check_post::*;

pub mod step_post;
pub use step_post::*;

pub mod upload_id_post;
pub use upload_id_post::*;

use crate::{CoordinatorError, ErrorCategory};

use rocket::http::Status;
use tracing::debug;

// Always use a limit to prevent DoS attacks.
pub(crate) const DATA_LIMIT: u64 = 1024;

/// Maps a coordinator failure onto the HTTP status of its error category.
pub(crate) fn error_status(error: &CoordinatorError) -> Status {
    debug!("Surfacing {} to the caller", error.category());
    match error.category() {
        ErrorCategory::Unauthenticated => Status::Unauthorized,
        ErrorCategory::InvalidArgument => Status::BadRequest,
        ErrorCategory::FailedPrecondition => Status::PreconditionFailed,
        ErrorCategory::NotFound => Status::NotFound,
        ErrorCategory::Internal => Status::InternalServerError,
    }
}

/// Returns every API route of the coordinator.
pub fn routes() -> Vec<rocket::Route> {
    routes![
        chunk_post,
        computation_time_post,
        contribution_post,
        participant_check_post,
        step_post,
        upload_id_post,
    ]
}
