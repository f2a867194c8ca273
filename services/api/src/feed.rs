//! Time-windowed, keyset-paginated post feed
//!
//! Posts are ordered by `(created_at, id)` descending. A page is the first
//! `limit` posts strictly after the cursor in that order, restricted to the
//! freshness window and, in `following` mode, to authors the viewer follows.
//! Every post on a page is enriched with its like count, comment count and
//! the viewer's like status; all of those lookups run concurrently.

use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::FeedSettings;

/// Which posts a feed page draws from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    #[default]
    All,
    Following,
}

/// Position of the last post seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub post_id: Uuid,
}

impl FeedCursor {
    /// Whether a post sorts strictly after this cursor in feed order
    pub fn admits(&self, created_at: DateTime<Utc>, post_id: Uuid) -> bool {
        (created_at, post_id) < (self.created_at, self.post_id)
    }
}

/// Display fields of a post's author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub username: String,
    pub avatar_url: Option<String>,
    pub avatar_filename: Option<String>,
}

/// Post as read from storage, before enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub image_urls: Vec<String>,
    pub author: AuthorSummary,
}

/// Enriched post returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub image_urls: Vec<String>,
    pub author: AuthorSummary,
    pub like_count: i64,
    pub comment_count: i64,
    pub has_liked: bool,
}

impl FeedItem {
    fn new(post: FeedPost, like_count: i64, comment_count: i64, has_liked: bool) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            caption: post.caption,
            created_at: post.created_at,
            image_urls: post.image_urls,
            author: post.author,
            like_count,
            comment_count,
            has_liked,
        }
    }

    pub fn cursor(&self) -> FeedCursor {
        FeedCursor {
            created_at: self.created_at,
            post_id: self.id,
        }
    }
}

/// One page of the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Key of the last item; `None` once the feed is exhausted
    pub next_cursor: Option<FeedCursor>,
}

impl FeedPage {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

/// Feed query string as sent by clients
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(default, rename = "type")]
    pub mode: FeedMode,
    pub cursor_created_at: Option<DateTime<Utc>>,
    pub cursor_post_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Validated feed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub mode: FeedMode,
    pub cursor: Option<FeedCursor>,
    pub limit: i64,
}

impl FeedQuery {
    pub fn into_request(self, settings: &FeedSettings) -> Result<FeedRequest, String> {
        let cursor = match (self.cursor_created_at, self.cursor_post_id) {
            (Some(created_at), Some(post_id)) => Some(FeedCursor {
                created_at,
                post_id,
            }),
            (None, None) => None,
            _ => {
                return Err(
                    "cursor_created_at and cursor_post_id must be provided together".to_string(),
                );
            }
        };

        let limit = self.limit.unwrap_or(settings.default_limit);
        if limit < 1 {
            return Err("limit must be at least 1".to_string());
        }

        Ok(FeedRequest {
            mode: self.mode,
            cursor,
            limit: limit.min(settings.max_limit),
        })
    }
}

/// Post selection handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Oldest `created_at` admitted
    pub since: DateTime<Utc>,
    /// Restrict to these authors; every author when `None`
    pub authors: Option<Vec<Uuid>>,
    pub cursor: Option<FeedCursor>,
    pub limit: i64,
}

/// Storage operations the feed is built from
pub trait FeedStore: Send + Sync {
    /// Ids of the users `viewer` follows
    fn following_ids(&self, viewer: Uuid) -> impl Future<Output = Result<Vec<Uuid>>> + Send;

    /// Posts matching `query`, ordered by `(created_at, id)` descending
    fn fetch_page(&self, query: &PageQuery) -> impl Future<Output = Result<Vec<FeedPost>>> + Send;

    fn fetch_post(&self, post_id: Uuid) -> impl Future<Output = Result<Option<FeedPost>>> + Send;

    fn like_count(&self, post_id: Uuid) -> impl Future<Output = Result<i64>> + Send;

    fn comment_count(&self, post_id: Uuid) -> impl Future<Output = Result<i64>> + Send;

    fn has_liked(&self, post_id: Uuid, viewer: Uuid) -> impl Future<Output = Result<bool>> + Send;
}

/// Builds feed pages on top of a [`FeedStore`]
#[derive(Debug, Clone)]
pub struct FeedService<S> {
    store: S,
    window: TimeDelta,
}

impl<S: FeedStore> FeedService<S> {
    pub fn new(store: S, settings: &FeedSettings) -> Self {
        Self {
            store,
            window: TimeDelta::days(settings.window_days),
        }
    }

    /// Fetch the page following `request.cursor` as seen by `viewer` at `now`
    pub async fn page(
        &self,
        viewer: Uuid,
        request: &FeedRequest,
        now: DateTime<Utc>,
    ) -> Result<FeedPage> {
        let authors = match request.mode {
            FeedMode::All => None,
            FeedMode::Following => {
                let followed = self.store.following_ids(viewer).await?;
                if followed.is_empty() {
                    debug!("Viewer {} follows nobody, returning an empty feed", viewer);
                    return Ok(FeedPage::empty());
                }
                Some(followed)
            }
        };

        let query = PageQuery {
            since: now - self.window,
            authors,
            cursor: request.cursor,
            limit: request.limit,
        };

        let posts = self.store.fetch_page(&query).await?;
        let items = self.enrich(viewer, posts).await?;
        let next_cursor = items.last().map(FeedItem::cursor);

        Ok(FeedPage { items, next_cursor })
    }

    /// Fetch a single enriched post regardless of its age
    pub async fn post(&self, viewer: Uuid, post_id: Uuid) -> Result<Option<FeedItem>> {
        let Some(post) = self.store.fetch_post(post_id).await? else {
            return Ok(None);
        };

        let mut items = self.enrich(viewer, vec![post]).await?;
        Ok(items.pop())
    }

    async fn enrich(&self, viewer: Uuid, posts: Vec<FeedPost>) -> Result<Vec<FeedItem>> {
        let store = &self.store;

        try_join_all(posts.into_iter().map(|post| async move {
            let (like_count, comment_count, has_liked) = tokio::try_join!(
                store.like_count(post.id),
                store.comment_count(post.id),
                store.has_liked(post.id, viewer),
            )?;

            Ok::<_, anyhow::Error>(FeedItem::new(post, like_count, comment_count, has_liked))
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that applies the same predicate and ordering as the SQL one
    #[derive(Default)]
    struct MemoryStore {
        posts: Mutex<Vec<FeedPost>>,
        follows: HashSet<(Uuid, Uuid)>,
        likes: HashSet<(Uuid, Uuid)>,
        comments: HashMap<Uuid, i64>,
        page_queries: AtomicUsize,
    }

    impl MemoryStore {
        fn insert(&self, post: FeedPost) {
            self.posts.lock().unwrap().push(post);
        }
    }

    impl FeedStore for MemoryStore {
        async fn following_ids(&self, viewer: Uuid) -> Result<Vec<Uuid>> {
            Ok(self
                .follows
                .iter()
                .filter(|(follower, _)| *follower == viewer)
                .map(|(_, followee)| *followee)
                .collect())
        }

        async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<FeedPost>> {
            self.page_queries.fetch_add(1, Ordering::SeqCst);

            let mut posts: Vec<FeedPost> = self
                .posts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.created_at >= query.since)
                .filter(|p| {
                    query
                        .authors
                        .as_ref()
                        .is_none_or(|authors| authors.contains(&p.user_id))
                })
                .filter(|p| query.cursor.is_none_or(|c| c.admits(p.created_at, p.id)))
                .cloned()
                .collect();

            posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            posts.truncate(query.limit as usize);
            Ok(posts)
        }

        async fn fetch_post(&self, post_id: Uuid) -> Result<Option<FeedPost>> {
            Ok(self
                .posts
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == post_id)
                .cloned())
        }

        async fn like_count(&self, post_id: Uuid) -> Result<i64> {
            Ok(self.likes.iter().filter(|(p, _)| *p == post_id).count() as i64)
        }

        async fn comment_count(&self, post_id: Uuid) -> Result<i64> {
            Ok(self.comments.get(&post_id).copied().unwrap_or(0))
        }

        async fn has_liked(&self, post_id: Uuid, viewer: Uuid) -> Result<bool> {
            Ok(self.likes.contains(&(post_id, viewer)))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn post(author: Uuid, created_at: DateTime<Utc>) -> FeedPost {
        FeedPost {
            id: Uuid::new_v4(),
            user_id: author,
            caption: String::new(),
            created_at,
            image_urls: Vec::new(),
            author: AuthorSummary {
                username: "driver".to_string(),
                avatar_url: None,
                avatar_filename: None,
            },
        }
    }

    fn service(store: MemoryStore) -> FeedService<MemoryStore> {
        FeedService::new(store, &FeedSettings::default())
    }

    fn request(mode: FeedMode, cursor: Option<FeedCursor>, limit: i64) -> FeedRequest {
        FeedRequest {
            mode,
            cursor,
            limit,
        }
    }

    async fn drain(
        feed: &FeedService<MemoryStore>,
        viewer: Uuid,
        mode: FeedMode,
        limit: i64,
    ) -> Vec<Vec<Uuid>> {
        let mut pages = Vec::new();
        let mut cursor = None;
        loop {
            let page = feed
                .page(viewer, &request(mode, cursor, limit), now())
                .await
                .unwrap();
            if page.items.is_empty() {
                assert_eq!(page.next_cursor, None);
                return pages;
            }
            cursor = page.next_cursor;
            pages.push(page.items.iter().map(|i| i.id).collect());
        }
    }

    #[tokio::test]
    async fn paging_returns_every_post_exactly_once_in_order() {
        let store = MemoryStore::default();
        let author = Uuid::new_v4();
        let mut expected = Vec::new();
        for i in 0..12 {
            // Pairs of posts share a timestamp so the id tiebreak is exercised
            let p = post(author, now() - TimeDelta::minutes(i / 2));
            expected.push((p.created_at, p.id));
            store.insert(p);
        }
        expected.sort_by(|a, b| b.cmp(a));

        let feed = service(store);
        let pages = drain(&feed, Uuid::new_v4(), FeedMode::All, 5).await;

        assert_eq!(
            pages.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![5, 5, 2]
        );
        let seen: Vec<Uuid> = pages.into_iter().flatten().collect();
        let expected: Vec<Uuid> = expected.into_iter().map(|(_, id)| id).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn paging_is_stable_when_newer_posts_arrive() {
        let store = MemoryStore::default();
        let author = Uuid::new_v4();
        for i in 0..6 {
            store.insert(post(author, now() - TimeDelta::hours(i)));
        }
        let feed = service(store);
        let viewer = Uuid::new_v4();

        let first = feed
            .page(viewer, &request(FeedMode::All, None, 3), now())
            .await
            .unwrap();

        let newer = post(author, now() - TimeDelta::seconds(1));
        let newer_id = newer.id;
        feed.store.insert(newer);

        let second = feed
            .page(viewer, &request(FeedMode::All, first.next_cursor, 3), now())
            .await
            .unwrap();
        let third = feed
            .page(viewer, &request(FeedMode::All, second.next_cursor, 3), now())
            .await
            .unwrap();

        let first_ids: HashSet<Uuid> = first.items.iter().map(|i| i.id).collect();
        assert_eq!(second.items.len(), 3);
        assert!(second.items.iter().all(|i| !first_ids.contains(&i.id)));
        assert!(second.items.iter().all(|i| i.id != newer_id));
        assert!(third.items.is_empty());
    }

    #[tokio::test]
    async fn following_mode_only_shows_followed_authors() {
        let viewer = Uuid::new_v4();
        let followed = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let mut store = MemoryStore::default();
        store.follows.insert((viewer, followed));

        let mut followed_posts = Vec::new();
        for i in 0..3 {
            let p = post(followed, now() - TimeDelta::hours(i));
            followed_posts.push(p.id);
            store.insert(p);
        }
        for i in 0..5 {
            store.insert(post(stranger, now() - TimeDelta::minutes(30 + i)));
        }

        let feed = service(store);
        let pages = drain(&feed, viewer, FeedMode::Following, 2).await;

        assert_eq!(
            pages,
            vec![
                vec![followed_posts[0], followed_posts[1]],
                vec![followed_posts[2]]
            ]
        );
    }

    #[tokio::test]
    async fn following_nobody_skips_the_post_query() {
        let store = MemoryStore::default();
        store.insert(post(Uuid::new_v4(), now()));
        let feed = service(store);

        let page = feed
            .page(Uuid::new_v4(), &request(FeedMode::Following, None, 5), now())
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.next_cursor, None);
        assert_eq!(feed.store.page_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn posts_outside_the_window_are_hidden() {
        let store = MemoryStore::default();
        let author = Uuid::new_v4();
        let fresh = post(author, now() - TimeDelta::days(13));
        let fresh_id = fresh.id;
        store.insert(fresh);
        store.insert(post(author, now() - TimeDelta::days(15)));

        let feed = service(store);
        let page = feed
            .page(Uuid::new_v4(), &request(FeedMode::All, None, 5), now())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, fresh_id);
    }

    #[tokio::test]
    async fn items_carry_counts_and_like_status() {
        let viewer = Uuid::new_v4();
        let other = Uuid::new_v4();
        let p = post(Uuid::new_v4(), now());
        let post_id = p.id;

        let mut store = MemoryStore::default();
        store.likes.insert((post_id, viewer));
        store.likes.insert((post_id, other));
        store.comments.insert(post_id, 4);
        store.insert(p);

        let feed = service(store);
        let item = feed.post(viewer, post_id).await.unwrap().unwrap();
        assert_eq!(item.like_count, 2);
        assert_eq!(item.comment_count, 4);
        assert!(item.has_liked);

        let item = feed.post(Uuid::new_v4(), post_id).await.unwrap().unwrap();
        assert!(!item.has_liked);

        assert!(feed.post(viewer, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[test]
    fn query_defaults_and_clamps_limit() {
        let settings = FeedSettings::default();

        let request = FeedQuery::default().into_request(&settings).unwrap();
        assert_eq!(request, self::request(FeedMode::All, None, 5));

        let request = FeedQuery {
            limit: Some(500),
            ..Default::default()
        }
        .into_request(&settings)
        .unwrap();
        assert_eq!(request.limit, 50);

        let err = FeedQuery {
            limit: Some(0),
            ..Default::default()
        }
        .into_request(&settings)
        .unwrap_err();
        assert_eq!(err, "limit must be at least 1");
    }

    #[test]
    fn query_requires_both_cursor_halves() {
        let half = FeedQuery {
            cursor_post_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(half.into_request(&FeedSettings::default()).is_err());

        let full = FeedQuery {
            cursor_created_at: Some(now()),
            cursor_post_id: Some(Uuid::nil()),
            ..Default::default()
        };
        let request = full.into_request(&FeedSettings::default()).unwrap();
        assert_eq!(
            request.cursor,
            Some(FeedCursor {
                created_at: now(),
                post_id: Uuid::nil()
            })
        );
    }

    #[test]
    fn mode_parses_lowercase_names_only() {
        let mode: FeedMode = serde_json::from_str(r#""following""#).unwrap();
        assert_eq!(mode, FeedMode::Following);
        assert!(serde_json::from_str::<FeedMode>(r#""friends""#).is_err());
    }

    #[test]
    fn cursor_admits_strictly_older_keys() {
        let cursor = FeedCursor {
            created_at: now(),
            post_id: Uuid::from_u128(10),
        };
        assert!(cursor.admits(now() - TimeDelta::seconds(1), Uuid::from_u128(99)));
        assert!(cursor.admits(now(), Uuid::from_u128(9)));
        assert!(!cursor.admits(now(), Uuid::from_u128(10)));
        assert!(!cursor.admits(now() + TimeDelta::seconds(1), Uuid::from_u128(1)));
    }
}
