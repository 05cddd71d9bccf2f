use axum::{debug_handler, extract::State, Form, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{auth::Actor, AppState};

use super::{CommentDraft, CommentError, CommentService, RequestOrigin};

#[derive(Serialize)]
pub(crate) struct Submitted {
    success: bool,
    id: Uuid,
}

#[debug_handler(state = AppState)]
pub(crate) async fn submit(
    State(comments): State<CommentService>,
    actor: Actor,
    origin: RequestOrigin,

    Form(draft): Form<CommentDraft>,
) -> Result<Json<Submitted>, CommentError> {
    let id = comments.submit(&actor, &origin, draft).await?;
    Ok(Json(Submitted { success: true, id }))
}
