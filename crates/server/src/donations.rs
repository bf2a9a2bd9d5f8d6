//! Donations API endpoints

use api_types::{
    Message,
    donation::{
        DonationEnvelope, DonationList, DonationListQuery, DonationNew, DonationType as ApiType,
        DonationUpdate, DonationView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, Donation, DonationListFilter, NewDonationCmd, UpdateDonationCmd};

use crate::{ServerError, params, server::ServerState};

fn map_type(donation_type: engine::DonationType) -> ApiType {
    match donation_type {
        engine::DonationType::Cash => ApiType::Cash,
        engine::DonationType::Goods => ApiType::Goods,
    }
}

pub(crate) fn donation_view(donation: &Donation) -> DonationView {
    DonationView {
        id: donation.id,
        donor_name: donation.donor_name.clone(),
        donation_type: map_type(donation.donation_type),
        amount: donation.amount.to_decimal(),
        description: donation.description.clone(),
        received_by: donation.received_by.clone(),
        received_by_username: donation.received_by_name.clone(),
        date_received: donation.date_received,
        campaign_id: donation.campaign_id,
        campaign_title: donation.campaign_title.clone(),
        created_at: params::timestamp(donation.created_at),
        updated_at: params::timestamp(donation.updated_at),
    }
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<DonationNew>,
) -> Result<(StatusCode, Json<DonationEnvelope>), ServerError> {
    let cmd = NewDonationCmd {
        donor_name: payload.donor_name,
        donation_type: params::donation_type(payload.donation_type.as_deref())?,
        amount: params::money(payload.amount, "amount")?,
        description: payload.description,
        date_received: params::date(payload.date_received.as_deref(), "date_received")?,
        campaign_id: payload.campaign_id,
        idempotency_key: payload.idempotency_key,
    };

    let donation = state.engine.create_donation(cmd, &actor).await?;

    Ok((
        StatusCode::CREATED,
        Json(DonationEnvelope {
            message: Some("Donation created successfully".to_string()),
            donation: donation_view(&donation),
        }),
    ))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<DonationListQuery>,
) -> Result<Json<DonationList>, ServerError> {
    let filter = DonationListFilter {
        donor_name: query.donor_name,
        donation_type: params::donation_type(query.donation_type.as_deref())?,
        campaign_id: query.campaign_id,
        date_from: params::date(query.date_from.as_deref(), "date_from")?,
        date_to: params::date(query.date_to.as_deref(), "date_to")?,
        min_amount: params::money(query.min_amount, "min_amount")?,
        max_amount: params::money(query.max_amount, "max_amount")?,
        limit: None,
    };

    let donations = state.engine.list_donations(&filter).await?;

    Ok(Json(DonationList {
        donations: donations.iter().map(donation_view).collect(),
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<DonationEnvelope>, ServerError> {
    let donation = state.engine.donation(&id).await?;

    Ok(Json(DonationEnvelope {
        message: None,
        donation: donation_view(&donation),
    }))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<DonationUpdate>,
) -> Result<Json<DonationEnvelope>, ServerError> {
    let cmd = UpdateDonationCmd {
        donor_name: payload.donor_name,
        donation_type: params::donation_type(payload.donation_type.as_deref())?,
        amount: params::money(payload.amount, "amount")?,
        description: payload.description,
        date_received: params::date(payload.date_received.as_deref(), "date_received")?,
        campaign_id: payload.campaign_id,
    };

    let donation = state.engine.update_donation(&id, cmd).await?;

    Ok(Json(DonationEnvelope {
        message: Some("Donation updated successfully".to_string()),
        donation: donation_view(&donation),
    }))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ServerError> {
    state.engine.delete_donation(&id).await?;

    Ok(Json(Message {
        message: "Donation deleted successfully".to_string(),
    }))
}
