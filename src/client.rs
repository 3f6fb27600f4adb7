use std::sync::Arc;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::body::{PublishStatus, UpdateCredentials, UploadMedia};
use crate::config::ClientConfig;
use crate::entities::{Account, Attachment, Notification, SearchResults, Status};
use crate::error::Result;
use crate::query::{NotificationsQuery, SearchQuery, TimelineQuery};
use crate::request::Request;
use crate::response::{PageLink, Response};
use crate::transport::{HttpTransport, PreparedRequest, Transport};

/// API client for one instance
///
/// Turns [`Request`]s into HTTP exchanges through a [`Transport`] and wraps
/// the decoded payloads in [`Response`] envelopes. Cloning is cheap.
///
/// # Examples
///
/// ```no_run
/// use mastokit::{Client, ClientConfig, TimelineQuery};
///
/// #[tokio::main]
/// async fn main() -> mastokit::Result<()> {
///     let config = ClientConfig::new("mastodon.social")?.access_token("token");
///     let client = Client::new(config)?;
///     let page = client.home_timeline(&TimelineQuery::new().limit(20)).await?;
///     for status in page.value() {
///         println!("{}: {}", status.account.acct, status.content);
///     }
///     if let Some(older) = client.next_page(&page).await? {
///         println!("{} older statuses", older.value().len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client using the reqwest transport
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client with a custom transport
    pub fn with_transport<T>(config: ClientConfig, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the transport name
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Resolve a request into its wire form
    pub fn prepare(&self, request: Request) -> Result<PreparedRequest> {
        let url = request.url(self.config.instance())?;
        let method = request.method().clone();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        // Cursor URLs come from server headers; credentials stay on the instance origin.
        if url.origin() == self.config.instance().origin() {
            if let Some(value) = self.config.get_authorization().header_value()? {
                headers.insert(AUTHORIZATION, value);
            }
        } else if self.config.get_authorization().is_authenticated() {
            tracing::warn!(%url, "not sending credentials to a foreign origin");
        }
        let body = request.into_body();
        if let Some(body) = &body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(&body.content_type())?);
        }

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send a request and decode the response
    pub async fn send<T>(&self, request: Request) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let prepared = self.prepare(request)?;
        let method = prepared.method.clone();
        let url = prepared.url.clone();
        tracing::debug!(%method, %url, "sending request");

        let raw = self.transport.send(prepared).await?;
        tracing::debug!(%method, %url, status = %raw.status, bytes = raw.body.len(), "received response");

        let response = Response::decode(raw.status, &raw.headers, &raw.body);
        if let Err(e) = &response {
            tracing::debug!(%method, %url, error = %e, "request failed");
        }
        response
    }

    /// Fetch the page a cursor points at
    pub async fn fetch_page<T>(&self, link: &PageLink) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.send(Request::get(link.url().as_str())).await
    }

    /// Fetch the page after `response`, if there is one
    pub async fn next_page<T>(&self, response: &Response<T>) -> Result<Option<Response<T>>>
    where
        T: DeserializeOwned,
    {
        match response.next() {
            Some(link) => self.fetch_page(link).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the page before `response`, if there is one
    pub async fn prev_page<T>(&self, response: &Response<T>) -> Result<Option<Response<T>>>
    where
        T: DeserializeOwned,
    {
        match response.prev() {
            Some(link) => self.fetch_page(link).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Endpoint helpers
impl Client {
    /// `GET /api/v1/accounts/verify_credentials`
    pub async fn verify_credentials(&self) -> Result<Response<Account>> {
        self.send(Request::get("/api/v1/accounts/verify_credentials"))
            .await
    }

    /// `GET /api/v1/timelines/home`
    pub async fn home_timeline(&self, query: &TimelineQuery) -> Result<Response<Vec<Status>>> {
        self.send(Request::get("/api/v1/timelines/home").query(query))
            .await
    }

    /// `GET /api/v1/timelines/public`
    pub async fn public_timeline(&self, query: &TimelineQuery) -> Result<Response<Vec<Status>>> {
        self.send(Request::get("/api/v1/timelines/public").query(query))
            .await
    }

    /// `GET /api/v1/notifications`
    pub async fn notifications(
        &self,
        query: &NotificationsQuery,
    ) -> Result<Response<Vec<Notification>>> {
        self.send(Request::get("/api/v1/notifications").query(query))
            .await
    }

    /// `GET /api/v2/search`
    pub async fn search(&self, query: &SearchQuery) -> Result<Response<SearchResults>> {
        self.send(Request::get("/api/v2/search").query(query)).await
    }

    /// `POST /api/v1/statuses`
    pub async fn publish_status(&self, status: &PublishStatus) -> Result<Response<Status>> {
        self.send(Request::post("/api/v1/statuses").body(status)?)
            .await
    }

    /// `POST /api/v2/media`
    pub async fn upload_media(&self, upload: &UploadMedia) -> Result<Response<Attachment>> {
        self.send(Request::post("/api/v2/media").body(upload)?)
            .await
    }

    /// `PATCH /api/v1/accounts/update_credentials`
    pub async fn update_credentials(
        &self,
        update: &UpdateCredentials,
    ) -> Result<Response<Account>> {
        self.send(Request::patch("/api/v1/accounts/update_credentials").body(update)?)
            .await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("transport", &self.transport.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{MediaAttachment, RequestBody};
    use crate::error::Error;
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use std::sync::Mutex;

    /// Transport that records requests and replays a canned response
    struct Canned {
        status: StatusCode,
        headers: HeaderMap,
        body: &'static str,
        seen: Mutex<Vec<PreparedRequest>>,
    }

    impl Canned {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                headers: HeaderMap::new(),
                body,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Arc<Canned> {
        async fn send(&self, request: PreparedRequest) -> Result<RawResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(RawResponse {
                status: self.status,
                headers: self.headers.clone(),
                body: self.body.as_bytes().to_vec(),
            })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("https://mastodon.example").unwrap().access_token("tok")
    }

    #[test]
    fn test_prepare_headers() {
        let client = Client::new(config()).unwrap();
        let prepared = client
            .prepare(Request::post("/api/v1/statuses").body(&PublishStatus::new("hi")).unwrap())
            .unwrap();
        assert_eq!(prepared.method, Method::POST);
        assert_eq!(prepared.url.as_str(), "https://mastodon.example/api/v1/statuses");
        assert_eq!(prepared.headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(prepared.headers[CONTENT_TYPE], "application/json");
        assert_eq!(prepared.headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_prepare_multipart_content_type() {
        let client = Client::new(config()).unwrap();
        let upload = UploadMedia::new(MediaAttachment::Png(vec![1]));
        let request = Request::post("/api/v2/media").body(&upload).unwrap();
        let boundary = match request.encoded_body() {
            Some(crate::body::EncodedBody::Multipart(form)) => form.boundary().to_string(),
            other => panic!("expected multipart body, got {:?}", other),
        };
        let prepared = client.prepare(request).unwrap();
        assert_eq!(
            prepared.headers[CONTENT_TYPE].to_str().unwrap(),
            format!("multipart/form-data; boundary={}", boundary)
        );
    }

    #[test]
    fn test_prepare_anonymous() {
        let client = Client::new(ClientConfig::new("mastodon.example").unwrap()).unwrap();
        let prepared = client.prepare(Request::get("/api/v1/timelines/public")).unwrap();
        assert!(prepared.headers.get(AUTHORIZATION).is_none());
        assert!(prepared.body.is_none());
        assert!(().encode().unwrap().is_none());
    }

    #[test]
    fn test_prepare_foreign_origin_has_no_credentials() {
        let client = Client::new(config()).unwrap();
        let prepared = client
            .prepare(Request::get("https://elsewhere.example/api/v1/timelines/home?max_id=1"))
            .unwrap();
        assert_eq!(prepared.url.host_str(), Some("elsewhere.example"));
        assert!(prepared.headers.get(AUTHORIZATION).is_none());

        let prepared = client
            .prepare(Request::get("https://mastodon.example/api/v1/timelines/home?max_id=1"))
            .unwrap();
        assert_eq!(prepared.headers[AUTHORIZATION], "Bearer tok");
    }

    #[tokio::test]
    async fn test_send_with_custom_transport() {
        let canned = Arc::new(Canned::new(
            StatusCode::OK,
            r#"{"id": "1", "username": "alice", "acct": "alice"}"#,
        ));
        let client = Client::with_transport(config(), canned.clone());
        assert_eq!(client.transport_name(), "canned");

        let account = client.verify_credentials().await.unwrap();
        assert_eq!(account.value().username, "alice");
        assert!(account.next().is_none());

        let seen = canned.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url.path(), "/api/v1/accounts/verify_credentials");
    }

    #[tokio::test]
    async fn test_send_surfaces_api_error() {
        let canned = Arc::new(Canned::new(
            StatusCode::UNAUTHORIZED,
            r#"{"error": "The access token is invalid"}"#,
        ));
        let client = Client::with_transport(config(), canned);
        let err = client.verify_credentials().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(matches!(err, Error::Api { .. }));
    }

    #[tokio::test]
    async fn test_next_page_without_cursor() {
        let canned = Arc::new(Canned::new(StatusCode::OK, "[]"));
        let client = Client::with_transport(config(), canned.clone());
        let page = client.home_timeline(&TimelineQuery::new()).await.unwrap();
        assert!(client.next_page(&page).await.unwrap().is_none());
        assert!(client.prev_page(&page).await.unwrap().is_none());
        assert_eq!(canned.seen.lock().unwrap().len(), 1);
    }
}
