use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::SinkExt;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Method, StatusCode};
use reqwest::{Body, Client as ReqwestClient};
use tokio::io::AsyncReadExt;
use url::Url;

use crate::body::EncodedBody;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::multipart::{MultipartForm, Segment};

/// Chunk size used when streaming attachment files
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A request ready to go on the wire
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<EncodedBody>,
}

/// A fully buffered response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Transport trait for HTTP operations
///
/// This trait abstracts the component that actually performs the HTTP
/// exchange, so the client can be driven by something other than reqwest.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse>;

    /// Get the transport name/type
    fn name(&self) -> &str;
}

/// Default HTTP transport implementation using reqwest
pub struct HttpTransport {
    client: ReqwestClient,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a new HTTP transport from a client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder().user_agent(config.get_user_agent());
        if let Some(timeout) = config.get_connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(Error::Network)?;

        Ok(Self {
            client,
            timeout: config.get_timeout(),
        })
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &ReqwestClient {
        &self.client
    }

    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        builder = match request.body {
            None => builder,
            Some(EncodedBody::Bytes { bytes, .. }) => builder.body(bytes),
            Some(EncodedBody::Multipart(form)) => {
                let (body, length) = multipart_body(form).await?;
                match length {
                    Some(length) => builder.header(CONTENT_LENGTH, length).body(body),
                    None => builder.body(body),
                }
            }
        };

        let response = builder.send().await.map_err(Error::Network)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Error::Network)?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse> {
        if let Some(timeout) = self.timeout {
            tokio::time::timeout(timeout, self.execute(request))
                .await
                .map_err(|_| Error::timeout(timeout))?
        } else {
            self.execute(request).await
        }
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

/// Turn a multipart form into a request body
///
/// Forms without streamed parts are sent as one buffer. Otherwise the encoder
/// output and each streamed file are fed through a channel in order, so a
/// file's bytes land right after its part header. Streamed files are stat'ed
/// first so the body length is known and a missing file fails before
/// anything is sent.
async fn multipart_body(mut form: MultipartForm) -> Result<(Body, Option<u64>)> {
    if !form.has_streamed_parts() {
        return Ok((Body::from(form.encode()), None));
    }

    for handle in form.stream_handles_mut() {
        if handle.length.is_none() {
            let metadata = tokio::fs::metadata(&handle.path).await.map_err(|e| {
                tracing::warn!(path = %handle.path.display(), error = %e, "cannot read streamed part");
                e
            })?;
            handle.length = Some(metadata.len());
        }
    }

    let length = form.content_length();
    Ok((Body::wrap_stream(segment_stream(form.segments())), length))
}

/// Feed segments through a channel, reading streamed files from disk
fn segment_stream(segments: Vec<Segment>) -> mpsc::Receiver<std::io::Result<Vec<u8>>> {
    let (mut tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        for segment in segments {
            let result = match segment {
                Segment::Bytes(bytes) => tx.send(Ok(bytes)).await.map_err(|_| ()),
                Segment::Stream(handle) => stream_file(handle.path, &mut tx).await,
            };
            if result.is_err() {
                return;
            }
        }
    });
    rx
}

/// Forward a file's bytes into the body channel
///
/// Read errors are forwarded as the stream's error, which aborts the request.
async fn stream_file(
    path: PathBuf,
    tx: &mut mpsc::Sender<std::io::Result<Vec<u8>>>,
) -> std::result::Result<(), ()> {
    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot open streamed part");
            let _ = tx.send(Err(e)).await;
            return Err(());
        }
    };
    loop {
        let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
        match file.read(&mut chunk).await {
            Ok(0) => return Ok(()),
            Ok(n) => {
                chunk.truncate(n);
                tx.send(Ok(chunk)).await.map_err(|_| ())?;
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return Err(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::{Part, StreamHandle};
    use futures::StreamExt;

    #[tokio::test]
    async fn test_streamed_body_splices_file() {
        let path = std::env::temp_dir().join("mastokit_transport_test.bin");
        std::fs::write(&path, b"FILEBYTES").unwrap();

        let form = MultipartForm::with_boundary("XYZ")
            .text("description", "clip")
            .part(Part::stream("file", StreamHandle::new(path.clone())).filename("clip.bin"));
        let head = match &form.segments()[0] {
            Segment::Bytes(bytes) => bytes.clone(),
            Segment::Stream(_) => unreachable!(),
        };

        let chunks: Vec<Vec<u8>> = segment_stream(form.segments())
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        let body = chunks.concat();

        assert!(body.starts_with(&head));
        assert_eq!(&body[head.len()..head.len() + 9], b"FILEBYTES");
        assert!(body.ends_with(b"\r\n--XYZ--\r\n"));

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_streamed_body_length_from_disk() {
        let path = std::env::temp_dir().join("mastokit_transport_length.bin");
        std::fs::write(&path, b"FILEBYTES").unwrap();

        let form = MultipartForm::with_boundary("XYZ")
            .part(Part::stream("file", StreamHandle::new(path.clone())).filename("clip.bin"));
        let expected = form.encode().len() as u64 + 9;
        let (_, length) = multipart_body(form).await.unwrap();
        assert_eq!(length, Some(expected));

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_sending() {
        let path = std::env::temp_dir().join("mastokit_definitely_missing.bin");
        let form = MultipartForm::with_boundary("XYZ").part(Part::stream("file", StreamHandle::new(path)));
        let err = multipart_body(form).await.err().unwrap();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_missing_file_reports_error() {
        let (mut tx, mut rx) = mpsc::channel::<std::io::Result<Vec<u8>>>(1);
        let path = std::env::temp_dir().join("mastokit_definitely_missing.bin");
        let result = stream_file(path, &mut tx).await;
        assert!(result.is_err());
        assert!(rx.next().await.unwrap().is_err());
    }

    #[test]
    fn test_transport_creation() {
        let config = ClientConfig::new("mastodon.social").unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.name(), "reqwest");
    }
}
