//! Multipart form reading shared by the attachment and document uploads.

use std::collections::HashMap;

use axum::extract::Multipart;
use taskforge_core::types::DbId;

use crate::error::{AppError, AppResult};

const DEFAULT_MIMETYPE: &str = "application/octet-stream";

/// The `file` part of a multipart form.
pub struct UploadedFile {
    pub filename: String,
    pub mimetype: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Reject empty files and files above `max_bytes`.
    pub fn validate(&self, max_bytes: usize) -> AppResult<()> {
        if self.data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }
        if self.data.len() > max_bytes {
            return Err(AppError::BadRequest(format!("File exceeds the {max_bytes} byte limit")));
        }
        Ok(())
    }

    pub fn size_bytes(&self) -> i64 {
        self.data.len() as i64
    }
}

/// A parsed form: the optional `file` part plus every text field.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mimetype = field.content_type().unwrap_or(DEFAULT_MIMETYPE).to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some(UploadedFile {
                    filename,
                    mimetype,
                    data: data.to_vec(),
                });
            } else if !name.is_empty() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// The `file` part, or a 400 when it was not sent.
    pub fn require_file(&mut self) -> AppResult<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))
    }

    /// A trimmed, non-blank text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    /// A text field parsed as an id. Blank counts as absent.
    pub fn id(&self, name: &str) -> AppResult<Option<DbId>> {
        self.text(name)
            .map(|v| {
                v.parse::<DbId>()
                    .map_err(|_| AppError::BadRequest(format!("'{name}' must be an integer id")))
            })
            .transpose()
    }
}
