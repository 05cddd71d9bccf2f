use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::comments::{Comment, CommentState};

const SCHEMA: [&str; 5] = [
    r#"CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY NOT NULL,
        created_at INTEGER NOT NULL,
        nickname TEXT NOT NULL,
        password TEXT,
        content TEXT NOT NULL,
        project_slug TEXT NOT NULL,
        parent_id TEXT REFERENCES comments(id),
        ip_address TEXT,
        os TEXT,
        browser TEXT,
        is_deleted BOOLEAN NOT NULL DEFAULT 0
    )"#,
    "CREATE INDEX IF NOT EXISTS comments_thread ON comments (project_slug, parent_id, created_at)",
    "CREATE INDEX IF NOT EXISTS comments_parent ON comments (parent_id, created_at)",
    "CREATE INDEX IF NOT EXISTS comments_origin ON comments (ip_address, created_at)",
    "CREATE INDEX IF NOT EXISTS comments_nickname ON comments (nickname)",
];

pub(crate) const COMMENT_COLUMNS: &str =
    "id,created_at,nickname,password,content,project_slug,parent_id,ip_address,os,browser,is_deleted";

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db_pool).await?;
    }
    info!("comments schema ready");
    Ok(())
}

/// Single connection in-memory database; every pooled connection would otherwise get its own.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    migrate(&db_pool).await.unwrap();
    db_pool
}

pub(crate) fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_millis(millis: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
}

#[derive(Debug, FromRow)]
pub(crate) struct CommentRow {
    id: String,
    created_at: i64,
    nickname: String,
    password: Option<String>,
    content: String,
    project_slug: String,
    parent_id: Option<String>,
    ip_address: Option<String>,
    os: Option<String>,
    browser: Option<String>,
    is_deleted: bool,
}

impl TryFrom<CommentRow> for Comment {
    type Error = sqlx::Error;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let decode = |e: Box<dyn std::error::Error + Send + Sync>| sqlx::Error::Decode(e);

        Ok(Comment {
            id: Uuid::parse_str(&row.id).map_err(|e| decode(e.into()))?,
            created_at: from_millis(row.created_at).map_err(|e| decode(e.into()))?,
            nickname: row.nickname,
            password: row.password,
            content: row.content,
            project_slug: row.project_slug,
            parent_id: row
                .parent_id
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()
                .map_err(|e| decode(e.into()))?,
            ip_address: row.ip_address,
            os: row.os,
            browser: row.browser,
            state: if row.is_deleted { CommentState::Deleted } else { CommentState::Active },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_keep_ordering_precision() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap() + time::Duration::milliseconds(123);
        let millis = to_millis(at);
        assert_eq!(millis, 1_700_000_000_123);
        assert_eq!(from_millis(millis).unwrap(), at);
    }

    #[tokio::test]
    async fn test_migrate_is_repeatable() {
        let db_pool = memory_pool().await;
        migrate(&db_pool).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
            .fetch_one(&db_pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
