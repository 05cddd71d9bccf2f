mod admin;
mod cache;
mod delete;
mod error;
mod list;
mod model;
mod origin;
mod service;
mod store;
mod submit;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use cache::{PageKey, ViewCache};
pub use error::{CommentError, ErrorKind};
pub use model::*;
pub use origin::RequestOrigin;
pub use service::{CommentRules, CommentService, ListQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use store::CommentStore;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list::list).post(submit::submit))
        .route("/comments/{id}/delete", post(delete::delete))
        .route("/admin/comments", get(admin::all_comments))
}

#[cfg(test)]
mod tests;
