use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, Statement,
    prelude::*,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    Attachment, AttachmentContent, AttachmentUpload, EngineError, ResultEngine,
    attachments::{self, MetadataRow, validate_uploads},
};

use super::{Engine, access::parse_request_id};

impl Engine {
    /// Fetch an attachment together with its bytes.
    pub async fn attachment_content(&self, attachment_id: &str) -> ResultEngine<AttachmentContent> {
        let id = parse_request_id(attachment_id, "attachment")?;
        let model = attachments::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("attachment not exists".to_string()))?;
        AttachmentContent::try_from(model)
    }

    /// Validate and persist `uploads`, appended after the campaign's existing
    /// attachments.
    pub(super) async fn store_attachments(
        &self,
        db_tx: &DatabaseTransaction,
        campaign_id: Uuid,
        uploads: Vec<AttachmentUpload>,
    ) -> ResultEngine<()> {
        if uploads.is_empty() {
            return Ok(());
        }
        validate_uploads(&uploads)?;

        let next_position: i32 = {
            let stmt = Statement::from_sql_and_values(
                db_tx.get_database_backend(),
                "SELECT COALESCE(MAX(position), -1) + 1 AS next FROM attachments WHERE campaign_id = ?;",
                vec![campaign_id.to_string().into()],
            );
            let row = db_tx.query_one(stmt).await?;
            row.and_then(|r| r.try_get("", "next").ok()).unwrap_or(0)
        };

        let now = Utc::now();
        for (offset, upload) in uploads.into_iter().enumerate() {
            debug!(
                campaign_id = %campaign_id,
                file_name = %upload.file_name,
                size = upload.data.len(),
                "storing attachment"
            );
            attachments::ActiveModel::from_upload(
                campaign_id,
                next_position + offset as i32,
                upload,
                now,
            )
            .insert(db_tx)
            .await?;
        }
        Ok(())
    }

    /// Delete the listed attachments of `campaign_id`. Ids that are malformed
    /// or belong to another campaign are ignored.
    pub(super) async fn remove_attachments(
        &self,
        db_tx: &DatabaseTransaction,
        campaign_id: Uuid,
        attachment_ids: &[String],
    ) -> ResultEngine<u64> {
        let ids: Vec<String> = attachment_ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id.trim()).ok())
            .map(|id| id.to_string())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let result = attachments::Entity::delete_many()
            .filter(attachments::Column::CampaignId.eq(campaign_id.to_string()))
            .filter(attachments::Column::Id.is_in(ids))
            .exec(db_tx)
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete every attachment owned by `campaign_id`.
    pub(super) async fn delete_campaign_attachments(
        &self,
        db_tx: &DatabaseTransaction,
        campaign_id: Uuid,
    ) -> ResultEngine<u64> {
        let result = attachments::Entity::delete_many()
            .filter(attachments::Column::CampaignId.eq(campaign_id.to_string()))
            .exec(db_tx)
            .await?;
        Ok(result.rows_affected)
    }

    /// Attachment metadata (no bytes) grouped by campaign id, in position
    /// order.
    pub(super) async fn attachments_by_campaign<C: ConnectionTrait>(
        &self,
        db: &C,
        campaign_ids: Vec<String>,
    ) -> ResultEngine<HashMap<Uuid, Vec<Attachment>>> {
        if campaign_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<MetadataRow> = attachments::Entity::find()
            .select_only()
            .columns(MetadataRow::COLUMNS)
            .filter(attachments::Column::CampaignId.is_in(campaign_ids))
            .order_by_asc(attachments::Column::Position)
            .into_model::<MetadataRow>()
            .all(db)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for row in rows {
            let attachment = Attachment::try_from(row)?;
            grouped
                .entry(attachment.campaign_id)
                .or_default()
                .push(attachment);
        }
        Ok(grouped)
    }
}
