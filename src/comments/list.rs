use axum::{debug_handler, extract::{Query, State}, Json};

use crate::AppState;

use super::{CommentError, CommentPage, CommentService, ListQuery};

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(comments): State<CommentService>,
    Query(query): Query<ListQuery>,
) -> Result<Json<CommentPage>, CommentError> {
    Ok(Json(comments.list(&query).await?))
}
