pub mod auth;
pub mod comments;
pub mod config;
pub mod db;
pub mod session;

use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}, Router};
use oauth2::reqwest;
use serde_json::Value;
use sqlx::SqlitePool;

use auth::{AdminEmail, Clients, Policy};
use comments::{CommentRules, CommentService, CommentStore, ViewCache};
use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub comments: CommentService,
    pub clients: Clients,
    pub policy: Policy,
}

impl AppState {
    pub fn new(config: &Config, db_pool: SqlitePool, clients: Clients) -> Self {
        Self {
            comments: CommentService::new(
                CommentStore::new(db_pool),
                ViewCache::default(),
                CommentRules::from_config(config),
            ),
            clients,
            policy: Arc::new(AdminEmail::new(config.admin_email.clone())),
        }
    }
}

/// Every route the service exposes. Session and tracing layers are applied by the caller.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(comments::router())
        .with_state(app_state)
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
    fn get_obj_field(&self, field: &str) -> AppResult<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> AppResult<&Value> {
        self.get(field)
        .ok_or(format!("expected {field} in {self}").into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}", self.0),
        )
            .into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(std::io::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(reqwest::Error);
apperr_impl!(oauth2::url::ParseError);

impl<E: core::error::Error + Send + Sync + 'static, R: oauth2::ErrorResponse + Send + Sync + 'static> From<oauth2::RequestTokenError<E, R>> for AppError {
    fn from(err: oauth2::RequestTokenError<E, R>) -> Self {
        Self(anyhow::Error::from(err))
    }
}
