//! `multipart/form-data` encoding
//!
//! Parts are serialized byte-exactly in the order they were added. Each part
//! record is a leading line break, the `--boundary` delimiter, the part
//! headers and then its bytes; the body is closed by a single
//! `\r\n--boundary--\r\n` terminator.
//!
//! A part can either carry its bytes inline ([`PartBody::Buffered`]) or point
//! at a [`StreamHandle`]. For streamed parts the encoder writes the header
//! block only; whoever sends the body must append the stream's bytes right
//! after it. [`MultipartForm::segments`] exposes exactly where those bytes go.

use std::path::{Path, PathBuf};

const CRLF: &[u8] = b"\r\n";

/// Source of a streamed part's bytes
///
/// The encoder never reads from the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    /// File the bytes are read from
    pub path: PathBuf,
    /// Length in bytes, if known up front
    pub length: Option<u64>,
}

impl StreamHandle {
    /// Create a handle for a file on disk
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            length: None,
        }
    }

    /// Set the known length
    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Content of a single part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// Bytes held in memory and written by the encoder
    Buffered(Vec<u8>),
    /// Bytes appended by the sender after the part's header block
    Streamed(StreamHandle),
}

/// One named field of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Field name
    pub name: String,
    /// Field content
    pub body: PartBody,
    /// File name, emitted as `filename="..."`
    pub filename: Option<String>,
    /// Declared content type
    pub content_type: Option<String>,
}

impl Part {
    /// Create a plain text field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::bytes(name, value.into().into_bytes())
    }

    /// Create a field from raw bytes
    pub fn bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            body: PartBody::Buffered(data),
            filename: None,
            content_type: None,
        }
    }

    /// Create a field whose bytes are streamed from `handle`
    pub fn stream(name: impl Into<String>, handle: StreamHandle) -> Self {
        Self {
            name: name.into(),
            body: PartBody::Streamed(handle),
            filename: None,
            content_type: None,
        }
    }

    /// Set the file name
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Check if the part's bytes come from a stream
    pub fn is_streamed(&self) -> bool {
        matches!(self.body, PartBody::Streamed(_))
    }
}

/// Encode one part record
///
/// Streamed parts produce the header block only.
pub fn encode_part(boundary: &str, part: &Part) -> Vec<u8> {
    let mut out = encode_part_header(boundary, part);
    if let PartBody::Buffered(data) = &part.body {
        out.extend_from_slice(data);
    }
    out
}

/// Encode the closing delimiter
pub fn encode_terminator(boundary: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(boundary.len() + 8);
    out.extend_from_slice(CRLF);
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"--");
    out.extend_from_slice(CRLF);
    out
}

fn encode_part_header(boundary: &str, part: &Part) -> Vec<u8> {
    let mut out = Vec::with_capacity(boundary.len() + part.name.len() + 64);
    out.extend_from_slice(CRLF);
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(CRLF);
    out.extend_from_slice(b"Content-Disposition: form-data; name=\"");
    out.extend_from_slice(part.name.as_bytes());
    out.push(b'"');
    if let Some(filename) = &part.filename {
        out.extend_from_slice(b"; filename=\"");
        out.extend_from_slice(filename.as_bytes());
        out.push(b'"');
    }
    out.extend_from_slice(CRLF);
    if let Some(content_type) = &part.content_type {
        out.extend_from_slice(b"Content-Type: ");
        out.extend_from_slice(content_type.as_bytes());
        out.extend_from_slice(CRLF);
    }
    out.extend_from_slice(CRLF);
    out
}

/// A contiguous piece of an encoded body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Bytes produced by the encoder
    Bytes(Vec<u8>),
    /// Bytes the sender must read from the handle
    Stream(StreamHandle),
}

/// Ordered multipart body with its boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<Part>,
    boundary: String,
}

impl MultipartForm {
    /// Create an empty form with a generated boundary
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create an empty form with a fixed boundary
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Append a part
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a text field
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Append a part in place
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Get the parts in encoding order
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get the boundary
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the form has no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Check if any part is streamed
    pub fn has_streamed_parts(&self) -> bool {
        self.parts.iter().any(Part::is_streamed)
    }

    /// Handles of the streamed parts, in encoding order
    pub fn stream_handles_mut(&mut self) -> impl Iterator<Item = &mut StreamHandle> {
        self.parts.iter_mut().filter_map(|part| match &mut part.body {
            PartBody::Streamed(handle) => Some(handle),
            PartBody::Buffered(_) => None,
        })
    }

    /// Total body size, or `None` if a streamed part has no known length
    pub fn content_length(&self) -> Option<u64> {
        self.segments()
            .iter()
            .map(|segment| match segment {
                Segment::Bytes(bytes) => Some(bytes.len() as u64),
                Segment::Stream(handle) => handle.length,
            })
            .sum()
    }

    /// Value for the request's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode every part followed by the terminator
    ///
    /// Streamed parts contribute their header block only; use
    /// [`MultipartForm::segments`] when the form has any.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(&encode_part(&self.boundary, part));
        }
        out.extend_from_slice(&encode_terminator(&self.boundary));
        out
    }

    /// Split the encoded body around streamed parts
    ///
    /// Adjacent encoder output is merged, so a form without streamed parts
    /// yields a single [`Segment::Bytes`].
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut pending = Vec::new();
        for part in &self.parts {
            pending.extend_from_slice(&encode_part(&self.boundary, part));
            if let PartBody::Streamed(handle) = &part.body {
                segments.push(Segment::Bytes(std::mem::take(&mut pending)));
                segments.push(Segment::Stream(handle.clone()));
            }
        }
        pending.extend_from_slice(&encode_terminator(&self.boundary));
        segments.push(Segment::Bytes(pending));
        segments
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a random boundary for multipart forms
fn generate_boundary() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    format!("----MastokitFormBoundary{}", hex::encode(bytes))
}

/// Multipart utilities
pub mod utils {
    use super::*;

    /// Get the content type for a file based on its extension
    pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "jpg" | "jpeg" => Some("image/jpeg"),
                "png" => Some("image/png"),
                "gif" => Some("image/gif"),
                "webp" => Some("image/webp"),
                "heic" => Some("image/heic"),
                "mp4" => Some("video/mp4"),
                "m4v" => Some("video/x-m4v"),
                "mov" => Some("video/quicktime"),
                "webm" => Some("video/webm"),
                "mp3" => Some("audio/mpeg"),
                "ogg" => Some("audio/ogg"),
                "wav" => Some("audio/wav"),
                "m4a" => Some("audio/mp4"),
                _ => None,
            })
    }

    /// File name component of a path, falling back to `"file"`
    pub fn file_name_for_path(path: &Path) -> String {
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parsed view of one buffered part
    #[derive(Debug, PartialEq)]
    struct Parsed {
        name: String,
        filename: Option<String>,
        content_type: Option<String>,
        data: Vec<u8>,
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn parse_part(boundary: &str, encoded: &[u8]) -> Parsed {
        let opening = format!("\r\n--{}\r\n", boundary);
        assert!(encoded.starts_with(opening.as_bytes()));
        let rest = &encoded[opening.len()..];
        let header_end = find(rest, b"\r\n\r\n").expect("header block");
        let headers = std::str::from_utf8(&rest[..header_end]).unwrap();
        let data = rest[header_end + 4..].to_vec();

        let mut lines = headers.split("\r\n");
        let disposition = lines.next().unwrap();
        let disposition = disposition
            .strip_prefix("Content-Disposition: form-data; name=\"")
            .unwrap();
        let (name, tail) = disposition.split_once('"').unwrap();
        let filename = tail
            .strip_prefix("; filename=\"")
            .map(|f| f.trim_end_matches('"').to_string());
        let content_type = lines
            .next()
            .map(|l| l.strip_prefix("Content-Type: ").unwrap().to_string());

        Parsed {
            name: name.to_string(),
            filename,
            content_type,
            data,
        }
    }

    #[test]
    fn test_status_scenario() {
        let part = Part::text("status", "hello");
        let encoded = encode_part("XYZ", &part);
        assert_eq!(
            encoded,
            b"\r\n--XYZ\r\nContent-Disposition: form-data; name=\"status\"\r\n\r\nhello".to_vec()
        );

        let form = MultipartForm::with_boundary("XYZ").part(part);
        let mut expected = encoded.clone();
        expected.extend_from_slice(b"\r\n--XYZ--\r\n");
        assert_eq!(form.encode(), expected);
    }

    #[test]
    fn test_filename_and_content_type_with_empty_body() {
        let part = Part::bytes("file", Vec::new())
            .filename("photo.jpg")
            .content_type("image/jpeg");
        let encoded = encode_part("XYZ", &part);
        let expected = b"\r\n--XYZ\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"photo.jpg\"\r\n\
Content-Type: image/jpeg\r\n\r\n";
        assert_eq!(encoded, expected.to_vec());
    }

    #[test]
    fn test_round_trip() {
        let parts = vec![
            Part::text("status", "hello, world"),
            Part::bytes("file", vec![0xff, 0xd8, 0x00, 0x0d, 0x0a])
                .filename("photo.jpg")
                .content_type("image/jpeg"),
            Part::text("description", "").content_type("text/plain"),
            Part::text("emoji", "caf\u{e9} \u{1f418}"),
        ];
        for part in &parts {
            let parsed = parse_part("b0undary", &encode_part("b0undary", part));
            let data = match &part.body {
                PartBody::Buffered(data) => data.clone(),
                PartBody::Streamed(_) => unreachable!(),
            };
            assert_eq!(
                parsed,
                Parsed {
                    name: part.name.clone(),
                    filename: part.filename.clone(),
                    content_type: part.content_type.clone(),
                    data,
                }
            );
        }
    }

    #[test]
    fn test_single_closing_delimiter() {
        let form = MultipartForm::with_boundary("XYZ")
            .text("a", "1")
            .text("b", "2")
            .part(Part::bytes("c", b"--XYZ".to_vec()));
        let body = form.encode();
        let closing = b"--XYZ--";
        let count = body.windows(closing.len()).filter(|w| w == closing).count();
        assert_eq!(count, 1);
        assert!(body.ends_with(b"\r\n--XYZ--\r\n"));
    }

    #[test]
    fn test_order_only_reorders_blocks() {
        let a = Part::text("a", "first");
        let b = Part::bytes("b", vec![1, 2, 3]).filename("b.bin");
        let forward = MultipartForm::with_boundary("XYZ").part(a.clone()).part(b.clone());
        let reverse = MultipartForm::with_boundary("XYZ").part(b.clone()).part(a.clone());

        let block_a = encode_part("XYZ", &a);
        let block_b = encode_part("XYZ", &b);
        let terminator = encode_terminator("XYZ");
        assert_eq!(forward.encode(), [block_a.clone(), block_b.clone(), terminator.clone()].concat());
        assert_eq!(reverse.encode(), [block_b, block_a, terminator].concat());
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let form = MultipartForm::with_boundary("XYZ")
            .text("media_ids[]", "1")
            .text("media_ids[]", "2");
        assert_eq!(form.len(), 2);
        let body = String::from_utf8(form.encode()).unwrap();
        assert_eq!(body.matches("name=\"media_ids[]\"").count(), 2);
    }

    #[test]
    fn test_empty_form() {
        let form = MultipartForm::with_boundary("XYZ");
        assert!(form.is_empty());
        assert_eq!(form.encode(), b"\r\n--XYZ--\r\n".to_vec());
    }

    #[test]
    fn test_streamed_part_emits_header_only() {
        let part = Part::stream("file", StreamHandle::new("/tmp/video.mp4"))
            .filename("video.mp4")
            .content_type("video/mp4");
        let encoded = encode_part("XYZ", &part);
        assert!(encoded.ends_with(b"Content-Type: video/mp4\r\n\r\n"));
        assert!(part.is_streamed());
    }

    #[test]
    fn test_segments() {
        let handle = StreamHandle::new("/tmp/video.mp4").length(42);
        let form = MultipartForm::with_boundary("XYZ")
            .text("description", "clip")
            .part(Part::stream("file", handle.clone()).filename("video.mp4"))
            .text("focus", "0.0,0.0");
        assert!(form.has_streamed_parts());

        let segments = form.segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], Segment::Stream(handle));

        let mut joined = Vec::new();
        for segment in &segments {
            if let Segment::Bytes(bytes) = segment {
                joined.extend_from_slice(bytes);
            }
        }
        assert_eq!(joined, form.encode());
    }

    #[test]
    fn test_content_length() {
        let mut form = MultipartForm::with_boundary("XYZ")
            .text("description", "clip")
            .part(Part::stream("file", StreamHandle::new("/tmp/video.mp4")).filename("video.mp4"));
        assert_eq!(form.content_length(), None);

        for handle in form.stream_handles_mut() {
            handle.length = Some(42);
        }
        assert_eq!(form.content_length(), Some(form.encode().len() as u64 + 42));

        let buffered = MultipartForm::with_boundary("XYZ").text("status", "hello");
        assert_eq!(buffered.content_length(), Some(buffered.encode().len() as u64));
    }

    #[test]
    fn test_segments_without_streams() {
        let form = MultipartForm::with_boundary("XYZ").text("status", "hello");
        assert_eq!(form.segments(), vec![Segment::Bytes(form.encode())]);
    }

    #[test]
    fn test_content_type_header() {
        let form = MultipartForm::with_boundary("XYZ");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XYZ");
    }

    #[test]
    fn test_boundary_generation() {
        let boundary1 = generate_boundary();
        let boundary2 = generate_boundary();

        assert!(boundary1.starts_with("----MastokitFormBoundary"));
        assert_ne!(boundary1, boundary2);
        assert_ne!(MultipartForm::new().boundary(), MultipartForm::new().boundary());
    }

    #[test]
    fn test_utils() {
        assert_eq!(utils::content_type_for_path(Path::new("a/b/photo.JPG")), Some("image/jpeg"));
        assert_eq!(utils::content_type_for_path(Path::new("clip.mp4")), Some("video/mp4"));
        assert_eq!(utils::content_type_for_path(Path::new("notes")), None);
        assert_eq!(utils::file_name_for_path(Path::new("/tmp/clip.mp4")), "clip.mp4");
        assert_eq!(utils::file_name_for_path(Path::new("/")), "file");
    }
}
