//! Catalog item model and related types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::ItemStatus;
use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};

/// Item owner as embedded in item payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOwner {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

/// Catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    pub owner: ItemOwner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Item {
    /// Only available items accept new borrow requests
    pub fn is_borrowable(&self) -> bool {
        self.status == ItemStatus::Available
    }
}

/// Create item payload
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Partial item update
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

impl UpdateItem {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.image_url.is_none()
            && self.status.is_none()
    }
}

/// Catalog query parameters
#[derive(Debug, Clone, Serialize)]
pub struct ItemQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub page: u32,
    pub size: u32,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            status: None,
            category: None,
            search: None,
            page: 0,
            size: 10,
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub page_size: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.current_page + 1 < self.total_pages
    }
}

/// Paginated list of items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Image to upload through the backend image proxy
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload from a file path, guessing the type from its extension
    pub fn from_path(path: &std::path::Path) -> AppResult<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
        .to_string();

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Type is checked before size
    pub fn validate(&self, limits: &UploadConfig) -> AppResult<()> {
        if !limits.allowed_types.iter().any(|t| t == &self.content_type) {
            return Err(AppError::field(
                "file",
                format!(
                    "Invalid file type. Only images (JPEG, PNG, GIF, WebP) are allowed. You uploaded: {}.",
                    if self.content_type.is_empty() { "unknown type" } else { &self.content_type }
                ),
            ));
        }
        let size = self.bytes.len() as u64;
        if size > limits.max_bytes {
            return Err(AppError::field(
                "file",
                format!(
                    "File size exceeds {}MB limit. Your file is {:.2}MB.",
                    limits.max_bytes / 1024 / 1024,
                    size as f64 / 1024.0 / 1024.0
                ),
            ));
        }
        Ok(())
    }
}

/// Result of an image upload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub image_url: String,
}

/// Input for AI title/description generation
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AiGenerationRequest {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub item_name: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specifications: Option<String>,
}

/// Generated content and remaining quota
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiGeneration {
    pub content: String,
    pub token_count: u32,
    pub response_time_ms: u64,
    pub remaining_requests: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AiAvailability {
    pub available: bool,
}

/// Which field to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Title,
    Description,
}

impl GenerationKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            GenerationKind::Title => "items/generate-title",
            GenerationKind::Description => "items/generate-description",
        }
    }
}
