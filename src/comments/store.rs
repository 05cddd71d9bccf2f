use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{to_millis, CommentRow, COMMENT_COLUMNS};

use super::model::{Comment, NewComment, SortOrder, Tombstone};

/// The comments table. Every call takes its own connection from the pool; nothing spans calls.
#[derive(Clone)]
pub struct CommentStore {
    db_pool: SqlitePool,
}

impl CommentStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub async fn insert(&self, comment: &NewComment) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO comments (id,created_at,nickname,password,content,project_slug,parent_id,ip_address,os,browser,is_deleted) VALUES (?,?,?,?,?,?,?,?,?,?,0)")
            .bind(comment.id.to_string())
            .bind(to_millis(comment.created_at))
            .bind(&comment.nickname)
            .bind(&comment.password)
            .bind(&comment.content)
            .bind(&comment.project_slug)
            .bind(comment.parent_id.as_ref().map(Uuid::to_string))
            .bind(&comment.ip_address)
            .bind(&comment.os)
            .bind(&comment.browser)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    pub async fn fetch(&self, id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, CommentRow>(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(&self.db_pool)
            .await?
            .map(Comment::try_from)
            .transpose()
    }

    /// Pinned to the origin index; fails rather than scanning the table without it.
    pub async fn count_from_ip_since(&self, ip: &str, since: OffsetDateTime) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments INDEXED BY comments_origin WHERE ip_address=? AND created_at>=?")
            .bind(ip)
            .bind(to_millis(since))
            .fetch_one(&self.db_pool)
            .await?;
        Ok(count)
    }

    pub async fn nickname_in_use(&self, nickname: &str) -> Result<bool, sqlx::Error> {
        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM comments WHERE nickname=? AND is_deleted=0 LIMIT 1")
            .bind(nickname)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(found.is_some())
    }

    /// Returns whether a row was changed.
    pub async fn soft_delete(&self, id: Uuid, tombstone: &Tombstone) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE comments SET is_deleted=1,content=?,nickname=?,password=NULL,ip_address=NULL,os=NULL,browser=NULL WHERE id=?")
            .bind(tombstone.content)
            .bind(tombstone.nickname)
            .bind(id.to_string())
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Root comments of a thread, `limit` rows starting at `offset`.
    pub async fn roots(&self, project_slug: &str, order: SortOrder, limit: i64, offset: i64) -> Result<Vec<Comment>, sqlx::Error> {
        let direction = order.sql();
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE project_slug=? AND parent_id IS NULL \
             ORDER BY created_at {direction}, id {direction} LIMIT ? OFFSET ?"
        );
        sqlx::query_as::<_, CommentRow>(&sql)
            .bind(project_slug)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await?
            .into_iter()
            .map(Comment::try_from)
            .collect()
    }

    /// Replies to any of `parents`, oldest first.
    pub async fn replies_to(&self, parents: &[Uuid]) -> Result<Vec<Comment>, sqlx::Error> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE parent_id IN ("));
        let mut ids = query.separated(",");
        for parent in parents {
            ids.push_bind(parent.to_string());
        }
        query.push(") ORDER BY created_at ASC, id ASC");

        query
            .build_query_as::<CommentRow>()
            .fetch_all(&self.db_pool)
            .await?
            .into_iter()
            .map(Comment::try_from)
            .collect()
    }

    /// Every comment of every thread, newest first.
    pub async fn all(&self) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, CommentRow>(&format!("SELECT {COMMENT_COLUMNS} FROM comments ORDER BY created_at DESC, id DESC"))
            .fetch_all(&self.db_pool)
            .await?
            .into_iter()
            .map(Comment::try_from)
            .collect()
    }
}
