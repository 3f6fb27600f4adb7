//! mastokit - typed REST layer for Mastodon-protocol servers
//!
//! mastokit models the request/response side of a Mastodon client without
//! tying it to a UI or a particular HTTP stack.
//!
//! ## Features
//!
//! - **Request model**: method, path, ordered query items and encoded body
//! - **Query descriptors** for timelines, notifications and search
//! - **Byte-exact multipart encoding** with streamed file parts
//! - **Response envelopes** carrying `Link` pagination cursors and rate limits
//! - **Pluggable transport**, with a reqwest implementation included
//! - **Per-account preferences** keyed by a hash of the access token
//!
//! ## Quick Start
//!
//! ```no_run
//! use mastokit::{Client, ClientConfig, PublishStatus, Visibility};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("mastodon.social")?.access_token("token");
//!     let client = Client::new(config)?;
//!
//!     let status = PublishStatus::new("Hello from Rust").visibility(Visibility::Unlisted);
//!     let posted = client.publish_status(&status).await?;
//!     println!("Posted {}", posted.value().id);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod body;
pub mod client;
pub mod config;
pub mod entities;
pub mod error;
pub mod multipart;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

// Re-export main types for convenience
pub use auth::Authorization;
pub use body::{
    EncodedBody, Form, Json, MediaAttachment, PollOptions, PublishStatus, RequestBody,
    UpdateCredentials, UploadMedia,
};
pub use client::Client;
pub use config::{account_key, ClientConfig, Preferences};
pub use entities::{Account, Attachment, Notification, SearchResults, Status, Visibility};
pub use error::{Error, Result};
pub use multipart::{encode_part, encode_terminator, MultipartForm, Part, PartBody, StreamHandle};
pub use query::{NotificationType, NotificationsQuery, Query, QueryItem, SearchQuery, SearchType, TimelineQuery};
pub use request::Request;
pub use response::{PageLink, Pagination, RateLimit, Response};
pub use transport::{HttpTransport, PreparedRequest, RawResponse, Transport};

// Re-export common HTTP types
pub use http::{HeaderMap, Method, StatusCode};

// Re-export URL types
pub use url::Url;
