use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{auth::Actor, config::Config};

use super::{
    cache::{PageKey, ViewCache},
    error::CommentError,
    model::{
        AdminComment, CommentDraft, CommentPage, NewComment, PublicComment, SortOrder, Tombstone, ADMIN_PASSWORD,
        DELETED_NICKNAME, MAX_CONTENT_CHARS, MAX_NICKNAME_CHARS,
    },
    origin::RequestOrigin,
    store::CommentStore,
};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const MAX_FLOOD_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// Moderation knobs.
#[derive(Debug, Clone)]
pub struct CommentRules {
    pub admin_nickname: String,
    pub reserved_nicknames: Vec<String>,
    pub flood_limit: i64,
    pub flood_window: Duration,
}

impl CommentRules {
    pub fn from_config(config: &Config) -> Self {
        let mut reserved_nicknames = config.reserved_nicknames.clone();
        // Live comments must not pass for deleted ones.
        for always in [config.admin_nickname.as_str(), DELETED_NICKNAME] {
            if !reserved_nicknames.iter().any(|reserved| reserved == always) {
                reserved_nicknames.push(always.to_owned());
            }
        }

        Self {
            admin_nickname: config.admin_nickname.clone(),
            reserved_nicknames,
            flood_limit: config.flood_limit,
            flood_window: Duration::seconds(config.flood_window_secs.clamp(0, MAX_FLOOD_WINDOW_SECS)),
        }
    }

    fn is_reserved(&self, nickname: &str) -> bool {
        self.reserved_nicknames.iter().any(|reserved| reserved == nickname)
    }
}

impl Default for CommentRules {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ListQuery {
    pub project_slug: String,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort: SortOrder,
}

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl ListQuery {
    pub fn new(project_slug: impl Into<String>, page: u32, page_size: u32, sort: SortOrder) -> Self {
        Self { project_slug: project_slug.into(), page, page_size, sort }
    }

    fn key(&self) -> PageKey {
        PageKey {
            project_slug: self.project_slug.clone(),
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
            order: self.sort,
        }
    }
}

#[derive(Clone)]
pub struct CommentService {
    store: CommentStore,
    cache: ViewCache,
    rules: CommentRules,
}

impl CommentService {
    pub fn new(store: CommentStore, cache: ViewCache, rules: CommentRules) -> Self {
        Self { store, cache, rules }
    }

    pub fn store(&self) -> &CommentStore {
        &self.store
    }

    /// Validates a draft and stores it. The flood and nickname checks read before the insert
    /// writes, so concurrent submissions can both pass them.
    pub async fn submit(&self, actor: &Actor, origin: &RequestOrigin, draft: CommentDraft) -> Result<Uuid, CommentError> {
        let CommentDraft { nickname, password, content, project_slug, parent_id } = draft;

        if nickname.chars().count() > MAX_NICKNAME_CHARS {
            return Err(CommentError::NicknameTooLong);
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(CommentError::ContentTooLong);
        }

        if !actor.privileged && self.rules.is_reserved(&nickname) {
            return Err(CommentError::Blacklisted);
        }

        let (nickname, password) = if actor.privileged {
            (self.rules.admin_nickname.clone(), ADMIN_PASSWORD.to_owned())
        } else {
            (nickname, password)
        };

        if nickname.is_empty() || password.is_empty() || content.is_empty() || project_slug.is_empty() {
            return Err(CommentError::MissingFields);
        }

        let parent_id = match parent_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| CommentError::InvalidParent)?),
        };

        let now = OffsetDateTime::now_utc();

        if !actor.privileged {
            let since = now.checked_sub(self.rules.flood_window).unwrap_or(OffsetDateTime::UNIX_EPOCH);
            match self.store.count_from_ip_since(&origin.ip, since).await {
                Ok(count) if count >= self.rules.flood_limit => {
                    info!(ip = %origin.ip, count, "flood control rejected comment");
                    return Err(CommentError::FloodControl);
                }
                Ok(_) => {}
                Err(e) => warn!(ip = %origin.ip, error = %e, "rate limit check failed, letting comment through"),
            }

            if self.store.nickname_in_use(&nickname).await? {
                return Err(CommentError::DuplicateNickname);
            }
        }

        let comment = NewComment {
            id: Uuid::now_v7(),
            created_at: now,
            nickname,
            password,
            content,
            project_slug,
            parent_id,
            ip_address: origin.ip.clone(),
            os: origin.os(),
            browser: origin.browser(),
        };

        self.store.insert(&comment).await?;
        info!(id = %comment.id, project = %comment.project_slug, reply = comment.parent_id.is_some(), "comment posted");

        self.cache.invalidate().await;
        Ok(comment.id)
    }

    pub async fn delete(&self, actor: &Actor, comment_id: &str, password_attempt: &str) -> Result<(), CommentError> {
        let id = Uuid::parse_str(comment_id.trim()).map_err(|_| CommentError::NotFound)?;
        let comment = self.store.fetch(id).await?.ok_or(CommentError::NotFound)?;

        info!(id = %id, email = ?actor.email, admin = actor.privileged, "delete requested");

        if !actor.privileged && comment.password.as_deref() != Some(password_attempt) {
            return Err(CommentError::PasswordMismatch);
        }

        if !self.store.soft_delete(id, &Tombstone::for_actor(actor.privileged)).await? {
            return Err(CommentError::NotFound);
        }

        self.cache.invalidate().await;
        Ok(())
    }

    /// One page of root comments plus every reply to them.
    pub async fn list(&self, query: &ListQuery) -> Result<CommentPage, CommentError> {
        let key = query.key();
        if let Some(page) = self.cache.get(&key).await {
            return Ok(page);
        }
        let generation = self.cache.generation().await;

        let page_size = i64::from(key.page_size);
        let offset = i64::from(key.page - 1) * page_size;

        // One extra row tells us whether another page exists.
        let mut roots = self.store.roots(&key.project_slug, key.order, page_size + 1, offset).await?;
        if roots.is_empty() {
            return Ok(CommentPage::default());
        }

        let has_more = roots.len() as i64 > page_size;
        roots.truncate(key.page_size as usize);

        let root_ids: Vec<Uuid> = roots.iter().map(|root| root.id).collect();
        let replies = self.store.replies_to(&root_ids).await?;

        let page = CommentPage {
            roots: roots.into_iter().map(PublicComment::from).collect(),
            replies: replies.into_iter().map(PublicComment::from).collect(),
            has_more,
        };

        self.cache.put_if_current(generation, key, page.clone()).await;
        Ok(page)
    }

    /// Dashboard listing across all threads.
    pub async fn list_all(&self, actor: &Actor) -> Result<Vec<AdminComment>, CommentError> {
        if !actor.privileged {
            return Err(CommentError::AdminOnly);
        }

        Ok(self.store.all().await?.into_iter().map(AdminComment::from).collect())
    }
}
