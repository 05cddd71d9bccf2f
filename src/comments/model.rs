use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_NICKNAME_CHARS: usize = 10;
pub const MAX_CONTENT_CHARS: usize = 300;

/// Nickname written over every deleted comment.
pub const DELETED_NICKNAME: &str = "Unknown";
pub const DELETED_BY_AUTHOR: &str = "Deleted comment.";
pub const DELETED_BY_ADMIN: &str = "This comment was removed by the administrator.";

/// Stored in place of the password on administrator comments.
pub const ADMIN_PASSWORD: &str = "admin-pass";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentState {
    Active,
    /// Terminal.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    pub nickname: String,
    pub password: Option<String>,
    pub content: String,
    pub project_slug: String,
    pub parent_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub state: CommentState,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.state == CommentState::Deleted
    }

    /// `Active -> Deleted`. Identity and timestamp survive, everything identifying is scrubbed.
    pub fn into_deleted(self, tombstone: &Tombstone) -> Comment {
        Comment {
            nickname: tombstone.nickname.to_owned(),
            password: None,
            content: tombstone.content.to_owned(),
            ip_address: None,
            os: None,
            browser: None,
            state: CommentState::Deleted,
            ..self
        }
    }
}

/// Values a soft delete writes over a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tombstone {
    pub nickname: &'static str,
    pub content: &'static str,
}

impl Tombstone {
    pub fn for_actor(privileged: bool) -> Self {
        Self {
            nickname: DELETED_NICKNAME,
            content: if privileged { DELETED_BY_ADMIN } else { DELETED_BY_AUTHOR },
        }
    }
}

/// A fully validated comment, ready to insert.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    pub nickname: String,
    pub password: String,
    pub content: String,
    pub project_slug: String,
    pub parent_id: Option<Uuid>,
    pub ip_address: String,
    pub os: String,
    pub browser: String,
}

/// What a visitor submits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentDraft {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub project_slug: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Comment as shown to visitors: no password, no address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicComment {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub nickname: String,
    pub content: String,
    pub project_slug: String,
    pub parent_id: Option<Uuid>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub is_deleted: bool,
}

impl From<Comment> for PublicComment {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            created_at: comment.created_at,
            is_deleted: comment.is_deleted(),
            nickname: comment.nickname,
            content: comment.content,
            project_slug: comment.project_slug,
            parent_id: comment.parent_id,
            os: comment.os,
            browser: comment.browser,
        }
    }
}

/// Dashboard row. Carries request metadata but never the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminComment {
    #[serde(flatten)]
    pub comment: PublicComment,
    pub ip_address: Option<String>,
}

impl From<Comment> for AdminComment {
    fn from(mut comment: Comment) -> Self {
        let ip_address = comment.ip_address.take();
        Self {
            comment: comment.into(),
            ip_address,
        }
    }
}

/// One page of a thread. Replies are flat; callers group them by `parent_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentPage {
    pub roots: Vec<PublicComment>,
    pub replies: Vec<PublicComment>,
    pub has_more: bool,
}
