//! Campaigns API endpoints

use api_types::{
    Message,
    campaign::{
        AttachmentView, CampaignEnvelope, CampaignList, CampaignListQuery, CampaignNew,
        CampaignStatus as ApiStatus, CampaignUpdate, CampaignView,
    },
    reconcile::{FundingCorrectionView, ReconcileResponse},
};
use axum::{
    Extension, Json,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
};
use engine::{
    Actor, Attachment, AttachmentUpload, Campaign, CampaignDetail, CampaignListFilter,
    CampaignSummary, EngineError, FundingCorrection, NewCampaignCmd, UpdateCampaignCmd,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::{ServerError, donations::donation_view, params, server::ServerState};

/// Multipart field carrying uploaded files.
const ATTACHMENTS_FIELD: &str = "attachments";

/// Campaign payload sent either as JSON or as `multipart/form-data`.
///
/// In the multipart form every non-file field is text: `goal_amount` must
/// parse as a number and `remove_attachments` as a JSON array of ids. Empty
/// text fields count as absent.
pub struct CampaignForm<T> {
    pub fields: T,
    pub uploads: Vec<AttachmentUpload>,
}

impl<S, T> FromRequest<S> for CampaignForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(fields) = Json::<T>::from_request(req, state)
                .await
                .map_err(|err| ServerError::Generic(err.body_text()))?;
            return Ok(Self {
                fields,
                uploads: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|err| ServerError::Generic(err.body_text()))?;

        let mut values = Map::new();
        let mut uploads = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ServerError::Generic(format!("malformed multipart body: {err}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == ATTACHMENTS_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|err| {
                    ServerError::Generic(format!("failed to read {file_name}: {err}"))
                })?;
                uploads.push(AttachmentUpload::new(file_name, content_type, data.to_vec()));
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|err| ServerError::Generic(format!("malformed field {name}: {err}")))?;
            if text.trim().is_empty() {
                continue;
            }
            let value = form_value(&name, text)?;
            values.insert(name, value);
        }

        let fields = serde_json::from_value(Value::Object(values))
            .map_err(|err| ServerError::Generic(format!("invalid form: {err}")))?;
        Ok(Self { fields, uploads })
    }
}

fn form_value(name: &str, text: String) -> Result<Value, ServerError> {
    match name {
        "goal_amount" => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                ServerError::from(EngineError::validation(
                    "goal_amount",
                    "goal amount must be a number",
                ))
            }),
        "remove_attachments" => match serde_json::from_str::<Value>(&text) {
            Ok(value @ Value::Array(_)) => Ok(value),
            _ => Err(ServerError::from(EngineError::validation(
                "remove_attachments",
                "expected a JSON array of attachment ids",
            ))),
        },
        _ => Ok(Value::String(text)),
    }
}

fn map_status(status: engine::CampaignStatus) -> ApiStatus {
    match status {
        engine::CampaignStatus::Active => ApiStatus::Active,
        engine::CampaignStatus::Completed => ApiStatus::Completed,
    }
}

fn attachment_view(attachment: &Attachment) -> AttachmentView {
    AttachmentView {
        id: attachment.id,
        file_name: attachment.file_name.clone(),
        content_type: attachment.content_type.clone(),
        size: attachment.size,
        url: format!("/attachments/{}", attachment.id),
    }
}

fn campaign_view(
    campaign: &Campaign,
    attachments: &[Attachment],
    donation_count: u64,
) -> CampaignView {
    CampaignView {
        id: campaign.id,
        title: campaign.title.clone(),
        description: campaign.description.clone(),
        start_date: campaign.start_date,
        end_date: campaign.end_date,
        goal_amount: campaign.goal_amount.to_decimal(),
        current_amount: campaign.current_amount.to_decimal(),
        status: map_status(campaign.status),
        progress_percentage: campaign.progress_percentage(),
        created_by: campaign.created_by.clone(),
        created_at: params::timestamp(campaign.created_at),
        updated_at: params::timestamp(campaign.updated_at),
        attachments: attachments.iter().map(attachment_view).collect(),
        donation_count,
        donations: None,
    }
}

pub(crate) fn summary_view(summary: &CampaignSummary) -> CampaignView {
    campaign_view(
        &summary.campaign,
        &summary.attachments,
        summary.donation_count,
    )
}

fn detail_view(detail: &CampaignDetail) -> CampaignView {
    CampaignView {
        donations: Some(detail.donations.iter().map(donation_view).collect()),
        ..campaign_view(&detail.campaign, &detail.attachments, detail.donation_count)
    }
}

fn correction_view(correction: &FundingCorrection) -> FundingCorrectionView {
    FundingCorrectionView {
        campaign_id: correction.campaign_id,
        stored: correction.stored.to_decimal(),
        recomputed: correction.recomputed.to_decimal(),
    }
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    form: CampaignForm<CampaignNew>,
) -> Result<(StatusCode, Json<CampaignEnvelope>), ServerError> {
    let CampaignForm { fields, uploads } = form;
    let cmd = NewCampaignCmd {
        title: fields.title,
        description: fields.description,
        start_date: params::date(fields.start_date.as_deref(), "start_date")?,
        end_date: params::date(fields.end_date.as_deref(), "end_date")?,
        goal_amount: params::money(fields.goal_amount, "goal_amount")?,
        status: params::campaign_status(fields.status.as_deref())?,
        attachments: uploads,
    };

    let summary = state.engine.create_campaign(cmd, &actor).await?;

    Ok((
        StatusCode::CREATED,
        Json(CampaignEnvelope {
            message: Some("Campaign created successfully".to_string()),
            campaign: summary_view(&summary),
        }),
    ))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<CampaignListQuery>,
) -> Result<Json<CampaignList>, ServerError> {
    let filter = CampaignListFilter {
        title: query.title,
        status: params::campaign_status(query.status.as_deref())?,
        start_date_from: params::date(query.start_date_from.as_deref(), "start_date_from")?,
        end_date_to: params::date(query.end_date_to.as_deref(), "end_date_to")?,
        created_by: query.created_by,
    };

    let campaigns = state.engine.list_campaigns(&filter).await?;

    Ok(Json(CampaignList {
        campaigns: campaigns.iter().map(summary_view).collect(),
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<CampaignEnvelope>, ServerError> {
    let detail = state.engine.campaign(&id).await?;

    Ok(Json(CampaignEnvelope {
        message: None,
        campaign: detail_view(&detail),
    }))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    form: CampaignForm<CampaignUpdate>,
) -> Result<Json<CampaignEnvelope>, ServerError> {
    let CampaignForm { fields, uploads } = form;
    let cmd = UpdateCampaignCmd {
        title: fields.title,
        description: fields.description,
        start_date: params::date(fields.start_date.as_deref(), "start_date")?,
        end_date: params::date(fields.end_date.as_deref(), "end_date")?,
        goal_amount: params::money(fields.goal_amount, "goal_amount")?,
        status: params::campaign_status(fields.status.as_deref())?,
        remove_attachments: fields.remove_attachments,
        attachments: uploads,
    };

    let summary = state.engine.update_campaign(&id, cmd, &actor).await?;

    Ok(Json(CampaignEnvelope {
        message: Some("Campaign updated successfully".to_string()),
        campaign: summary_view(&summary),
    }))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ServerError> {
    state.engine.delete_campaign(&id, &actor).await?;

    Ok(Json(Message {
        message: "Campaign deleted successfully".to_string(),
    }))
}

pub async fn reconcile(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    let corrections = state
        .engine
        .reconcile_campaign_funding(Some(&id), &actor)
        .await?;
    Ok(Json(reconcile_response(&corrections)))
}

pub async fn reconcile_all(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    let corrections = state.engine.reconcile_campaign_funding(None, &actor).await?;
    Ok(Json(reconcile_response(&corrections)))
}

fn reconcile_response(corrections: &[FundingCorrection]) -> ReconcileResponse {
    ReconcileResponse {
        message: format!("{} campaign(s) corrected", corrections.len()),
        corrections: corrections.iter().map(correction_view).collect(),
    }
}
