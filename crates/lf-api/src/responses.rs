//! Translation of domain errors into HTTP responses.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;

use lf_core::AppError;

/// Newtype so `AppError` can carry an actix `ResponseError` impl without the
/// core crate knowing about HTTP.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    error: String,
}

fn error_code(err: &AppError) -> &'static str {
    match err {
        AppError::NotFound(..) => "not_found",
        AppError::AlreadyApplied => "already_applied",
        AppError::NoTicketsOwned => "no_tickets_owned",
        AppError::InvalidRaffleState(_) => "invalid_raffle_state",
        AppError::RaffleFull(_) => "raffle_full",
        AppError::DrawDateInvalid(_) => "draw_date_invalid",
        AppError::DrawNotRecorded(_) => "draw_not_recorded",
        AppError::AnnouncePending(_) => "announce_pending",
        AppError::SamplingInvariant(..) => "sampling_invariant",
        AppError::Validation(_) => "validation",
        AppError::Internal(_) => "internal",
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::AlreadyApplied
            | AppError::AnnouncePending(_)
            | AppError::DrawNotRecorded(_) => StatusCode::CONFLICT,
            AppError::NoTicketsOwned
            | AppError::InvalidRaffleState(_)
            | AppError::RaffleFull(_)
            | AppError::DrawDateInvalid(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::SamplingInvariant(..) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("request failed: {}", self.0);
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: error_code(&self.0),
            error: self.0.to_string(),
        })
    }
}
