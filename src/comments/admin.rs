use axum::{debug_handler, extract::State, Json};

use crate::{auth::Actor, AppState};

use super::{AdminComment, CommentError, CommentService};

/// Everything, newest first, with request metadata.
#[debug_handler(state = AppState)]
pub(crate) async fn all_comments(
    State(comments): State<CommentService>,
    actor: Actor,
) -> Result<Json<Vec<AdminComment>>, CommentError> {
    Ok(Json(comments.list_all(&actor).await?))
}
