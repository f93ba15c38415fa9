//! Borrow request endpoints

use async_trait::async_trait;
use validator::Validate;

use super::HttpClient;
use crate::{
    error::AppResult,
    models::{
        borrow_request::{BorrowRequest, CreateBorrowRequest, ResponsePayload},
        enums::RequestStatus,
        statistics::RequestStatistics,
    },
};

/// Borrow request workflow calls
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestsApi: Send + Sync {
    /// `POST /requests?itemId={item_id}`
    async fn create(&self, item_id: i64, request: &CreateBorrowRequest) -> AppResult<BorrowRequest>;

    /// `GET /requests/sent?status=`
    async fn list_sent(&self, status: Option<RequestStatus>) -> AppResult<Vec<BorrowRequest>>;

    /// `GET /requests/received?status=`
    async fn list_received(&self, status: Option<RequestStatus>) -> AppResult<Vec<BorrowRequest>>;

    /// `GET /requests/{id}`
    async fn get(&self, id: i64) -> AppResult<BorrowRequest>;

    /// `POST /requests/{id}/approve`
    async fn approve(&self, id: i64, payload: &ResponsePayload) -> AppResult<BorrowRequest>;

    /// `POST /requests/{id}/reject`
    async fn reject(&self, id: i64, payload: &ResponsePayload) -> AppResult<BorrowRequest>;

    /// `POST /requests/{id}/return`
    async fn mark_returned(&self, id: i64) -> AppResult<BorrowRequest>;

    /// `POST /requests/{id}/confirm`
    async fn confirm_return(&self, id: i64) -> AppResult<BorrowRequest>;

    /// `DELETE /requests/{id}`
    async fn cancel(&self, id: i64) -> AppResult<()>;

    /// `GET /requests/statistics`
    async fn statistics(&self) -> AppResult<RequestStatistics>;
}

#[derive(Clone)]
pub struct RequestsClient {
    http: HttpClient,
}

impl RequestsClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn list(&self, path: &str, status: Option<RequestStatus>) -> AppResult<Vec<BorrowRequest>> {
        match status {
            Some(status) => self.http.get_with(path, &[("status", status.as_str())]).await,
            None => self.http.get(path).await,
        }
    }
}

#[async_trait]
impl RequestsApi for RequestsClient {
    async fn create(&self, item_id: i64, request: &CreateBorrowRequest) -> AppResult<BorrowRequest> {
        request.validate()?;
        self.http
            .post(&format!("requests?itemId={}", item_id), request)
            .await
    }

    async fn list_sent(&self, status: Option<RequestStatus>) -> AppResult<Vec<BorrowRequest>> {
        self.list("requests/sent", status).await
    }

    async fn list_received(&self, status: Option<RequestStatus>) -> AppResult<Vec<BorrowRequest>> {
        self.list("requests/received", status).await
    }

    async fn get(&self, id: i64) -> AppResult<BorrowRequest> {
        self.http.get(&format!("requests/{}", id)).await
    }

    async fn approve(&self, id: i64, payload: &ResponsePayload) -> AppResult<BorrowRequest> {
        payload.validate()?;
        self.http.post(&format!("requests/{}/approve", id), payload).await
    }

    async fn reject(&self, id: i64, payload: &ResponsePayload) -> AppResult<BorrowRequest> {
        payload.validate()?;
        self.http.post(&format!("requests/{}/reject", id), payload).await
    }

    async fn mark_returned(&self, id: i64) -> AppResult<BorrowRequest> {
        self.http.post_empty(&format!("requests/{}/return", id)).await
    }

    async fn confirm_return(&self, id: i64) -> AppResult<BorrowRequest> {
        self.http.post_empty(&format!("requests/{}/confirm", id)).await
    }

    async fn cancel(&self, id: i64) -> AppResult<()> {
        self.http.delete(&format!("requests/{}", id)).await
    }

    async fn statistics(&self) -> AppResult<RequestStatistics> {
        self.http.get("requests/statistics").await
    }
}
