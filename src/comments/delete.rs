use axum::{debug_handler, extract::{Path, State}, Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::Actor, AppState};

use super::{CommentError, CommentService};

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteForm {
    #[serde(default)]
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(id): Path<String>,
    State(comments): State<CommentService>,
    actor: Actor,

    Form(DeleteForm { password }): Form<DeleteForm>,
) -> Result<Json<Value>, CommentError> {
    comments.delete(&actor, &id, &password).await?;
    Ok(Json(json!({ "success": true })))
}
