use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use auth::{Claims, issue_token};
pub use server::{ServerConfig, router, run, run_with_listener, spawn_with_listener};

mod attachments;
mod auth;
mod campaigns;
mod dashboard;
mod donations;
mod params;
mod server;

pub mod types {
    pub mod donation {
        pub use api_types::donation::{
            DonationEnvelope, DonationList, DonationListQuery, DonationNew, DonationType,
            DonationUpdate, DonationView,
        };
    }

    pub mod campaign {
        pub use api_types::campaign::{
            AttachmentView, CampaignEnvelope, CampaignList, CampaignListQuery, CampaignNew,
            CampaignStatus, CampaignUpdate, CampaignView,
        };
    }

    pub mod reconcile {
        pub use api_types::reconcile::{FundingCorrectionView, ReconcileResponse};
    }

    pub mod dashboard {
        pub use api_types::dashboard::{
            CampaignStats, DashboardOverview, DonationStats, DonationSummary, MonthlyData,
        };
    }

    pub use api_types::Message;
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Unauthorized(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Validation { .. } | EngineError::InvalidId(_) => StatusCode::BAD_REQUEST,
        EngineError::FundingDrift(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn body_for_engine_error(err: EngineError) -> Error {
    match err {
        EngineError::Validation { field, message } => Error {
            error: message,
            field: Some(field),
        },
        EngineError::FundingDrift(msg) => {
            tracing::error!("funding drift: {msg}");
            Error {
                error: "campaign funding could not be updated".to_string(),
                field: None,
            }
        }
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            Error {
                error: "internal server error".to_string(),
                field: None,
            }
        }
        other => Error {
            error: other.to_string(),
            field: None,
        },
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), body_for_engine_error(err)),
            ServerError::Unauthorized(error) => {
                (StatusCode::UNAUTHORIZED, Error { error, field: None })
            }
            ServerError::Generic(error) => (StatusCode::BAD_REQUEST, Error { error, field: None }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
