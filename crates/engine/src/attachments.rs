//! Attachment store.
//!
//! Files belong to exactly one campaign and are stored inline with their
//! metadata. Listings never load the bytes; use
//! [`Engine::attachment_content`](crate::Engine::attachment_content) to fetch
//! them.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, FromQueryResult, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

/// Max number of files accepted by a single create/update request.
pub const MAX_FILES_PER_REQUEST: usize = 5;
/// Max size of a single file, in bytes.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
/// Accepted file extensions (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "pdf", "doc", "docx", "xls", "xlsx",
];

/// A file received from a client, not yet persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Check count, size and extension limits for a batch of uploads.
pub fn validate_uploads(uploads: &[AttachmentUpload]) -> ResultEngine<()> {
    if uploads.len() > MAX_FILES_PER_REQUEST {
        return Err(EngineError::validation(
            "attachments",
            format!("at most {MAX_FILES_PER_REQUEST} files per request"),
        ));
    }
    for upload in uploads {
        if upload.file_name.trim().is_empty() {
            return Err(EngineError::validation(
                "attachments",
                "file name must not be empty",
            ));
        }
        if upload.data.len() > MAX_FILE_SIZE {
            return Err(EngineError::validation(
                "attachments",
                format!("{} exceeds the 5MB limit", upload.file_name),
            ));
        }
        let allowed = upload
            .extension()
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
        if !allowed {
            return Err(EngineError::validation(
                "attachments",
                format!(
                    "{}: only images, PDFs, and Office documents are allowed",
                    upload.file_name
                ),
            ));
        }
    }
    Ok(())
}

/// Attachment metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Attachment metadata plus the stored bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentContent {
    pub attachment: Attachment,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub campaign_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
    pub position: i32,
    pub file_data: Vec<u8>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaigns::Entity",
        from = "Column::CampaignId",
        to = "super::campaigns::Column::Id"
    )]
    Campaigns,
}

impl Related<super::campaigns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaigns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Build a new row for `upload`, owned by `campaign_id` at `position`.
    pub(crate) fn from_upload(
        campaign_id: Uuid,
        position: i32,
        upload: AttachmentUpload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            campaign_id: ActiveValue::Set(campaign_id.to_string()),
            file_name: ActiveValue::Set(upload.file_name),
            content_type: ActiveValue::Set(upload.content_type),
            size: ActiveValue::Set(upload.data.len() as i64),
            position: ActiveValue::Set(position),
            file_data: ActiveValue::Set(upload.data),
            created_at: ActiveValue::Set(now),
        }
    }
}

/// Metadata-only projection of an attachment row.
#[derive(Clone, Debug, FromQueryResult)]
pub(crate) struct MetadataRow {
    pub id: String,
    pub campaign_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
    pub position: i32,
    pub created_at: DateTimeUtc,
}

impl MetadataRow {
    pub(crate) const COLUMNS: [Column; 7] = [
        Column::Id,
        Column::CampaignId,
        Column::FileName,
        Column::ContentType,
        Column::Size,
        Column::Position,
        Column::CreatedAt,
    ];
}

impl TryFrom<MetadataRow> for Attachment {
    type Error = EngineError;

    fn try_from(row: MetadataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&row.id, "attachment")?,
            campaign_id: parse_uuid(&row.campaign_id, "campaign")?,
            file_name: row.file_name,
            content_type: row.content_type,
            size: row.size,
            position: row.position,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<Model> for AttachmentContent {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            attachment: Attachment {
                id: parse_uuid(&model.id, "attachment")?,
                campaign_id: parse_uuid(&model.campaign_id, "campaign")?,
                file_name: model.file_name,
                content_type: model.content_type,
                size: model.size,
                position: model.position,
                created_at: model.created_at,
            },
            data: model.file_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, size: usize) -> AttachmentUpload {
        AttachmentUpload::new(name, "application/octet-stream", vec![0; size])
    }

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        let batch = vec![upload("receipt.PDF", 10), upload("photo.jpeg", 10)];
        assert!(validate_uploads(&batch).is_ok());
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = validate_uploads(&[upload("script.exe", 10)]).unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "attachments"));
        assert!(validate_uploads(&[upload("no_extension", 10)]).is_err());
    }

    #[test]
    fn rejects_oversized_file_and_too_many_files() {
        assert!(validate_uploads(&[upload("big.png", MAX_FILE_SIZE + 1)]).is_err());
        assert!(validate_uploads(&[upload("ok.png", MAX_FILE_SIZE)]).is_ok());

        let batch: Vec<_> = (0..=MAX_FILES_PER_REQUEST)
            .map(|i| upload(&format!("f{i}.png"), 1))
            .collect();
        assert!(validate_uploads(&batch).is_err());
    }
}
