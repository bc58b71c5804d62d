//! Deal documents: metadata, upload validation and content decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::serde::deserialize_optional_string;

pub const MAX_FILE_NAME_LENGTH: usize = 255;
pub const MAX_CONTENT_TYPE_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    PitchDeck,
    Financials,
    TermSheet,
    Legal,
    Memo,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::PitchDeck => "pitch_deck",
            DocumentType::Financials => "financials",
            DocumentType::TermSheet => "term_sheet",
            DocumentType::Legal => "legal",
            DocumentType::Memo => "memo",
            DocumentType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pitch_deck" => Some(DocumentType::PitchDeck),
            "financials" => Some(DocumentType::Financials),
            "term_sheet" => Some(DocumentType::TermSheet),
            "legal" => Some(DocumentType::Legal),
            "memo" => Some(DocumentType::Memo),
            "other" => Some(DocumentType::Other),
            _ => None,
        }
    }
}

/// Metadata of an uploaded file. The bytes live in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub document_type: DocumentType,
    pub description: Option<String>,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("File name cannot be empty")]
    EmptyFileName,
    #[error("File name must not contain path separators")]
    PathInFileName,
    #[error("File name exceeds {MAX_FILE_NAME_LENGTH} characters")]
    FileNameTooLong,
    #[error("Document content is not valid base64: {0}")]
    InvalidEncoding(String),
    #[error("Document content is empty")]
    EmptyContent,
    #[error("Document is {size} bytes, the limit is {max}")]
    TooLarge { size: usize, max: usize },
    #[error("Invalid content type: {0:?}")]
    InvalidContentType(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDocumentRequest {
    pub deal_id: Uuid,
    pub file_name: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub content_type: Option<String>,
    #[serde(default = "default_document_type")]
    pub document_type: DocumentType,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
    pub content_base64: String,
}

fn default_document_type() -> DocumentType {
    DocumentType::Other
}

impl UploadDocumentRequest {
    /// Validate the request and decode its content.
    ///
    /// Returns the document metadata together with the decoded bytes.
    pub fn into_document(
        self,
        uploaded_by: Uuid,
        max_bytes: usize,
    ) -> Result<(Document, Vec<u8>), DocumentError> {
        let file_name = self.file_name.trim().to_string();
        validate_file_name(&file_name)?;
        let content = decode_content(&self.content_base64, max_bytes)?;
        let content_type = match self.content_type {
            Some(value) => {
                let value = value.trim();
                validate_content_type(value)?;
                value.to_string()
            }
            None => guess_content_type(&file_name).to_string(),
        };

        let document = Document {
            id: Uuid::new_v4(),
            deal_id: self.deal_id,
            file_name,
            content_type,
            size_bytes: content.len() as u64,
            document_type: self.document_type,
            description: self.description,
            uploaded_by,
            uploaded_at: Utc::now(),
        };
        Ok((document, content))
    }
}

pub fn validate_file_name(name: &str) -> Result<(), DocumentError> {
    if name.is_empty() {
        return Err(DocumentError::EmptyFileName);
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(DocumentError::PathInFileName);
    }
    if name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(DocumentError::FileNameTooLong);
    }
    Ok(())
}

/// Accept `type/subtype` media types with optional `; key=value` parameters.
///
/// Everything must be printable ASCII, since the value is echoed back as a
/// response header on download.
pub fn validate_content_type(value: &str) -> Result<(), DocumentError> {
    let invalid = || DocumentError::InvalidContentType(value.to_string());
    if value.len() > MAX_CONTENT_TYPE_LENGTH
        || !value.bytes().all(|b| b == b' ' || b.is_ascii_graphic())
    {
        return Err(invalid());
    }

    let (essence, _parameters) = value.split_once(';').unwrap_or((value, ""));
    let (kind, subtype) = essence.trim().split_once('/').ok_or_else(invalid)?;
    if !is_media_token(kind) || !is_media_token(subtype) {
        return Err(invalid());
    }
    Ok(())
}

fn is_media_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b))
}

/// Decode base64 content and enforce the size limit.
pub fn decode_content(encoded: &str, max_bytes: usize) -> Result<Vec<u8>, DocumentError> {
    // Upper bound of the decoded size, checked before allocating.
    let estimated = encoded.len() / 4 * 3;
    if estimated > max_bytes + 2 {
        return Err(DocumentError::TooLarge {
            size: estimated,
            max: max_bytes,
        });
    }
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| DocumentError::InvalidEncoding(e.to_string()))?;
    if bytes.is_empty() {
        return Err(DocumentError::EmptyContent);
    }
    if bytes.len() > max_bytes {
        return Err(DocumentError::TooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }
    Ok(bytes)
}

/// Content type from a file extension, `application/octet-stream` otherwise.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// `content-disposition` value for a download.
pub fn content_disposition(file_name: &str) -> String {
    let escaped: String = file_name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' { '\'' } else { c })
        .collect();
    format!("attachment; filename=\"{escaped}\"")
}
