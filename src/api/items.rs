//! Catalog endpoints

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use validator::Validate;

use super::HttpClient;
use crate::{
    config::UploadConfig,
    error::AppResult,
    models::item::{
        AiAvailability, AiGeneration, AiGenerationRequest, CreateItem, GenerationKind, ImageUpload,
        Item, ItemQuery, Page, UpdateItem, UploadedImage,
    },
};

/// Catalog calls: listing, ownership, image upload and content generation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemsApi: Send + Sync {
    /// `GET /items`
    async fn list(&self, query: &ItemQuery) -> AppResult<Page<Item>>;

    /// `GET /items/{id}`
    async fn get(&self, id: i64) -> AppResult<Item>;

    /// `GET /items/my-items`
    async fn my_items(&self, page: u32, size: u32) -> AppResult<Page<Item>>;

    /// `POST /items`
    async fn create(&self, item: &CreateItem) -> AppResult<Item>;

    /// `PUT /items/{id}`
    async fn update(&self, id: i64, item: &UpdateItem) -> AppResult<Item>;

    /// `DELETE /items/{id}`
    async fn delete(&self, id: i64) -> AppResult<()>;

    /// `POST /items/upload-image` (multipart, proxied to the image host)
    async fn upload_image(&self, upload: ImageUpload) -> AppResult<String>;

    /// `POST /items/generate-title` or `/items/generate-description`
    async fn generate(&self, kind: GenerationKind, request: &AiGenerationRequest) -> AppResult<AiGeneration>;

    /// `GET /items/ai-available`
    async fn ai_available(&self) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct ItemsClient {
    http: HttpClient,
    uploads: UploadConfig,
}

impl ItemsClient {
    pub fn new(http: HttpClient, uploads: UploadConfig) -> Self {
        Self { http, uploads }
    }
}

#[async_trait]
impl ItemsApi for ItemsClient {
    async fn list(&self, query: &ItemQuery) -> AppResult<Page<Item>> {
        self.http.get_with("items", query).await
    }

    async fn get(&self, id: i64) -> AppResult<Item> {
        self.http.get(&format!("items/{}", id)).await
    }

    async fn my_items(&self, page: u32, size: u32) -> AppResult<Page<Item>> {
        self.http
            .get_with("items/my-items", &[("page", page), ("size", size)])
            .await
    }

    async fn create(&self, item: &CreateItem) -> AppResult<Item> {
        item.validate()?;
        self.http.post("items", item).await
    }

    async fn update(&self, id: i64, item: &UpdateItem) -> AppResult<Item> {
        item.validate()?;
        self.http.put(&format!("items/{}", id), item).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.http.delete(&format!("items/{}", id)).await
    }

    async fn upload_image(&self, upload: ImageUpload) -> AppResult<String> {
        upload.validate(&self.uploads)?;

        tracing::debug!(
            "Uploading {} ({} bytes, {})",
            upload.file_name,
            upload.bytes.len(),
            upload.content_type
        );

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = Form::new().part("file", part);

        let uploaded: UploadedImage = self.http.post_multipart("items/upload-image", form).await?;
        Ok(uploaded.image_url)
    }

    async fn generate(&self, kind: GenerationKind, request: &AiGenerationRequest) -> AppResult<AiGeneration> {
        request.validate()?;
        self.http.post(kind.endpoint(), request).await
    }

    async fn ai_available(&self) -> AppResult<bool> {
        let availability: AiAvailability = self.http.get("items/ai-available").await?;
        Ok(availability.available)
    }
}
