use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use super::model::{CommentPage, SortOrder};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub project_slug: String,
    pub page: u32,
    pub page_size: u32,
    pub order: SortOrder,
}

#[derive(Default)]
struct Pages {
    /// Bumped by every invalidation.
    generation: u64,
    pages: HashMap<PageKey, CommentPage>,
}

/// Rendered thread pages. Purely derived from the store, so dropping it is always safe.
#[derive(Clone, Default)]
pub struct ViewCache {
    inner: Arc<RwLock<Pages>>,
}

impl ViewCache {
    pub async fn get(&self, key: &PageKey) -> Option<CommentPage> {
        self.inner.read().await.pages.get(key).cloned()
    }

    /// Read before querying the store, hand back to `put_if_current`.
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// Stores `page` unless a write invalidated the cache since `generation` was read.
    pub async fn put_if_current(&self, generation: u64, key: PageKey, page: CommentPage) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            debug!(read = generation, current = inner.generation, "dropping page read before a write");
            return false;
        }
        inner.pages.insert(key, page);
        true
    }

    /// Any write can shift every page of every thread, so everything goes.
    pub async fn invalidate(&self) {
        let mut inner = self.inner.write().await;
        debug!(cached = inner.pages.len(), "invalidating comment views");
        inner.generation += 1;
        inner.pages.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.pages.len()
    }
}
