//! Authentication endpoints

use async_trait::async_trait;

use super::HttpClient;
use crate::{
    error::AppResult,
    models::user::{LoginRequest, LoginResponse, RegisterRequest, User},
};

/// Authentication calls used by the session service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, credentials: &LoginRequest) -> AppResult<LoginResponse>;

    /// `POST /auth/register`
    async fn register(&self, data: &RegisterRequest) -> AppResult<User>;

    /// `GET /auth/me`, resolves the user behind the current bearer token
    async fn current_user(&self) -> AppResult<User>;
}

#[derive(Clone)]
pub struct AuthClient {
    http: HttpClient,
}

impl AuthClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn login(&self, credentials: &LoginRequest) -> AppResult<LoginResponse> {
        self.http.post("auth/login", credentials).await
    }

    async fn register(&self, data: &RegisterRequest) -> AppResult<User> {
        self.http.post("auth/register", data).await
    }

    async fn current_user(&self) -> AppResult<User> {
        self.http.get("auth/me").await
    }
}
