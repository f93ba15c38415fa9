//! REST client for the RentKar backend
//!
//! `HttpClient` is the shared transport: it joins paths onto the configured
//! base URL, injects the bearer token held by the session store, unwraps the
//! backend's `{ success, message, data }` envelope and classifies failures.
//! A 401 from any endpoint clears the session.

pub mod auth;
pub mod items;
pub mod requests;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header::RETRY_AFTER, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::ApiConfig,
    error::{AppError, AppResult},
    services::session::SessionStore,
};

pub use auth::{AuthApi, AuthClient};
pub use items::{ItemsApi, ItemsClient};
pub use requests::{RequestsApi, RequestsClient};

/// Shared HTTP transport
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl HttpClient {
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.send(self.client.get(self.url(path))).await
    }

    pub async fn get_with<Q, T>(&self, path: &str, query: &Q) -> AppResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.client.get(self.url(path)).query(query)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.send(self.client.post(self.url(path))).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> AppResult<T> {
        self.send(self.client.post(self.url(path)).multipart(form)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.client.put(self.url(path)).json(body)).await
    }

    /// DELETE expecting an empty (204) or ignorable body
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        let response = self.authorize(self.client.delete(self.url(path))).send().await?;
        self.read_body(response).await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.authorize(request).send().await?;
        let body = self.read_body(response).await?;
        let value: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)?
        };
        unwrap_envelope(value)
    }

    /// Read a response body, turning non-2xx statuses into classified errors
    async fn read_body(&self, response: Response) -> AppResult<String> {
        let status = response.status();
        let url = response.url().path().to_string();
        let retry_after = parse_retry_after(&response);
        let body = response.text().await?;

        tracing::debug!("{} -> {}", url, status);

        if status.is_success() {
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Received 401 from {}, clearing session", url);
            self.session.clear();
        }

        Err(AppError::from_response(status, &body, retry_after))
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Accept both `{ success, message, data }` envelopes and bare payloads
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    let mut object = match value {
        Value::Object(object)
            if object.contains_key("data")
                || object.get("success").map(Value::is_boolean).unwrap_or(false) =>
        {
            object
        }
        other => return Ok(serde_json::from_value(other)?),
    };

    if object.get("success").and_then(Value::as_bool) == Some(false) {
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| crate::error::GENERIC_MESSAGE.to_string());
        return Err(AppError::Internal(message));
    }

    let data = object.remove("data").unwrap_or(Value::Null);
    Ok(serde_json::from_value(data)?)
}
