//! URL query descriptors
//!
//! Every endpoint's extra parameters are expressed through [`Query`], so the
//! request builder never special-cases endpoints. The order of the returned
//! items is the order they appear in the URL; percent-encoding happens later,
//! when the URL is assembled.

use serde::{Deserialize, Serialize};

/// One `name=value` pair of a query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    pub name: String,
    pub value: String,
}

impl QueryItem {
    /// Create a new query item
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// Produces the ordered query items for a request
pub trait Query {
    /// Items in URL order, or `None` when there is nothing to add
    fn query_items(&self) -> Option<Vec<QueryItem>>;
}

impl Query for () {
    fn query_items(&self) -> Option<Vec<QueryItem>> {
        None
    }
}

impl<Q: Query + ?Sized> Query for &Q {
    fn query_items(&self) -> Option<Vec<QueryItem>> {
        (**self).query_items()
    }
}

impl<Q: Query> Query for Option<Q> {
    fn query_items(&self) -> Option<Vec<QueryItem>> {
        self.as_ref().and_then(Query::query_items)
    }
}

impl Query for Vec<QueryItem> {
    fn query_items(&self) -> Option<Vec<QueryItem>> {
        non_empty(self.clone())
    }
}

fn push<T: ToString>(items: &mut Vec<QueryItem>, name: &str, value: &Option<T>) {
    if let Some(value) = value {
        items.push(QueryItem::new(name, value.to_string()));
    }
}

fn non_empty(items: Vec<QueryItem>) -> Option<Vec<QueryItem>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Paging parameters shared by timeline endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineQuery {
    pub limit: Option<u32>,
    pub max_id: Option<String>,
    pub since_id: Option<String>,
    pub min_id: Option<String>,
    pub local: Option<bool>,
    pub only_media: Option<bool>,
}

impl TimelineQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn max_id(mut self, id: impl Into<String>) -> Self {
        self.max_id = Some(id.into());
        self
    }

    pub fn since_id(mut self, id: impl Into<String>) -> Self {
        self.since_id = Some(id.into());
        self
    }

    pub fn min_id(mut self, id: impl Into<String>) -> Self {
        self.min_id = Some(id.into());
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn only_media(mut self, only_media: bool) -> Self {
        self.only_media = Some(only_media);
        self
    }
}

impl Query for TimelineQuery {
    fn query_items(&self) -> Option<Vec<QueryItem>> {
        let mut items = Vec::new();
        push(&mut items, "limit", &self.limit);
        push(&mut items, "max_id", &self.max_id);
        push(&mut items, "since_id", &self.since_id);
        push(&mut items, "min_id", &self.min_id);
        push(&mut items, "local", &self.local);
        push(&mut items, "only_media", &self.only_media);
        non_empty(items)
    }
}

/// Notification kinds as named by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Mention,
    Status,
    Reblog,
    Follow,
    FollowRequest,
    Favourite,
    Poll,
    Update,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Mention => "mention",
            NotificationType::Status => "status",
            NotificationType::Reblog => "reblog",
            NotificationType::Follow => "follow",
            NotificationType::FollowRequest => "follow_request",
            NotificationType::Favourite => "favourite",
            NotificationType::Poll => "poll",
            NotificationType::Update => "update",
        }
    }
}

/// Parameters for `GET /api/v1/notifications`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationsQuery {
    pub limit: Option<u32>,
    pub max_id: Option<String>,
    pub since_id: Option<String>,
    pub min_id: Option<String>,
    pub exclude_types: Vec<NotificationType>,
    pub account_id: Option<String>,
}

impl NotificationsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn max_id(mut self, id: impl Into<String>) -> Self {
        self.max_id = Some(id.into());
        self
    }

    pub fn exclude(mut self, kind: NotificationType) -> Self {
        self.exclude_types.push(kind);
        self
    }

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = Some(id.into());
        self
    }
}

impl Query for NotificationsQuery {
    fn query_items(&self) -> Option<Vec<QueryItem>> {
        let mut items = Vec::new();
        push(&mut items, "limit", &self.limit);
        push(&mut items, "max_id", &self.max_id);
        push(&mut items, "since_id", &self.since_id);
        push(&mut items, "min_id", &self.min_id);
        for kind in &self.exclude_types {
            items.push(QueryItem::new("exclude_types[]", kind.as_str()));
        }
        push(&mut items, "account_id", &self.account_id);
        non_empty(items)
    }
}

/// Result kinds accepted by `GET /api/v2/search`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Accounts,
    Hashtags,
    Statuses,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Accounts => "accounts",
            SearchType::Hashtags => "hashtags",
            SearchType::Statuses => "statuses",
        }
    }
}

/// Parameters for `GET /api/v2/search`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub kind: Option<SearchType>,
    pub resolve: Option<bool>,
    pub following: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            kind: None,
            resolve: None,
            following: None,
            limit: None,
            offset: None,
        }
    }

    pub fn kind(mut self, kind: SearchType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn resolve(mut self, resolve: bool) -> Self {
        self.resolve = Some(resolve);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl Query for SearchQuery {
    fn query_items(&self) -> Option<Vec<QueryItem>> {
        let mut items = vec![QueryItem::new("q", &self.q)];
        push(&mut items, "type", &self.kind.map(|k| k.as_str()));
        push(&mut items, "resolve", &self.resolve);
        push(&mut items, "following", &self.following);
        push(&mut items, "limit", &self.limit);
        push(&mut items, "offset", &self.offset);
        Some(items)
    }
}
