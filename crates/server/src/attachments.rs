//! Attachment download endpoint

use axum::{
    extract::{Path, State},
    http::{
        HeaderMap, HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
};

use crate::{ServerError, server::ServerState};

/// Keep the file name usable inside a quoted header parameter.
fn header_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim().is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

pub async fn download(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(HeaderMap, Vec<u8>), ServerError> {
    let content = state.engine.attachment_content(&id).await?;
    let attachment = content.attachment;

    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&attachment.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(CONTENT_TYPE, content_type);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_file_name(&attachment.file_name)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|err| ServerError::Generic(format!("invalid file name: {err}")))?;
    headers.insert(CONTENT_DISPOSITION, disposition);

    tracing::debug!(attachment_id = %attachment.id, size = attachment.size, "serving attachment");
    Ok((headers, content.data))
}
