//! Request body descriptors
//!
//! A [`RequestBody`] turns typed endpoint parameters into wire bytes. JSON and
//! url-encoded bodies are fully serialized here; multipart bodies stay as a
//! [`MultipartForm`] until sending, so streamed parts can be spliced in.

use std::path::PathBuf;

use serde::Serialize;

use crate::entities::Visibility;
use crate::error::Result;
use crate::multipart::{utils, MultipartForm, Part, StreamHandle};

/// An encoded request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedBody {
    /// Fully serialized bytes with their content type
    Bytes { content_type: String, bytes: Vec<u8> },
    /// Multipart form, serialized when sent
    Multipart(MultipartForm),
}

impl EncodedBody {
    /// Value for the `Content-Type` header
    pub fn content_type(&self) -> String {
        match self {
            EncodedBody::Bytes { content_type, .. } => content_type.clone(),
            EncodedBody::Multipart(form) => form.content_type(),
        }
    }
}

/// Produces the body of a request
pub trait RequestBody {
    /// Encoded body, or `None` for bodiless requests
    fn encode(&self) -> Result<Option<EncodedBody>>;
}

impl RequestBody for () {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        Ok(None)
    }
}

impl<B: RequestBody + ?Sized> RequestBody for &B {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        (**self).encode()
    }
}

impl RequestBody for MultipartForm {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        Ok(Some(EncodedBody::Multipart(self.clone())))
    }
}

/// JSON-encoded body
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> RequestBody for Json<T> {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        Ok(Some(EncodedBody::Bytes {
            content_type: "application/json".to_string(),
            bytes: serde_json::to_vec(&self.0)?,
        }))
    }
}

/// `application/x-www-form-urlencoded` body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair
    pub fn pair(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }
}

impl RequestBody for Form {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish();
        Ok(Some(EncodedBody::Bytes {
            content_type: "application/x-www-form-urlencoded".to_string(),
            bytes: encoded.into_bytes(),
        }))
    }
}

/// Media to attach to an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAttachment {
    Jpeg(Vec<u8>),
    Png(Vec<u8>),
    Gif(Vec<u8>),
    /// Any other format, named by extension and MIME type
    Other {
        data: Vec<u8>,
        extension: String,
        mime: String,
    },
    /// A file on disk, streamed when sent
    File(PathBuf),
}

impl MediaAttachment {
    /// Build the multipart part for this attachment
    pub fn to_part(&self, name: &str) -> Part {
        match self {
            MediaAttachment::Jpeg(data) => Part::bytes(name, data.clone())
                .filename("file.jpg")
                .content_type("image/jpeg"),
            MediaAttachment::Png(data) => Part::bytes(name, data.clone())
                .filename("file.png")
                .content_type("image/png"),
            MediaAttachment::Gif(data) => Part::bytes(name, data.clone())
                .filename("file.gif")
                .content_type("image/gif"),
            MediaAttachment::Other {
                data,
                extension,
                mime,
            } => Part::bytes(name, data.clone())
                .filename(format!("file.{}", extension))
                .content_type(mime.clone()),
            MediaAttachment::File(path) => Part::stream(name, StreamHandle::new(path.clone()))
                .filename(utils::file_name_for_path(path))
                .content_type(
                    utils::content_type_for_path(path).unwrap_or("application/octet-stream"),
                ),
        }
    }
}

/// Poll attached to a new status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOptions {
    pub options: Vec<String>,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_totals: Option<bool>,
}

/// Body for `POST /api/v1/statuses`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoiler_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl PublishStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn media_id(mut self, id: impl Into<String>) -> Self {
        self.media_ids.push(id.into());
        self
    }

    pub fn in_reply_to(mut self, id: impl Into<String>) -> Self {
        self.in_reply_to_id = Some(id.into());
        self
    }

    pub fn spoiler(mut self, text: impl Into<String>) -> Self {
        self.spoiler_text = Some(text.into());
        self.sensitive = Some(true);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn poll(mut self, poll: PollOptions) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl RequestBody for PublishStatus {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        Json(self).encode()
    }
}

/// Body for `POST /api/v2/media`
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMedia {
    pub file: MediaAttachment,
    pub thumbnail: Option<MediaAttachment>,
    pub description: Option<String>,
    /// Focal point, each coordinate in `-1.0..=1.0`
    pub focus: Option<(f64, f64)>,
}

impl UploadMedia {
    pub fn new(file: MediaAttachment) -> Self {
        Self {
            file,
            thumbnail: None,
            description: None,
            focus: None,
        }
    }

    pub fn thumbnail(mut self, thumbnail: MediaAttachment) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn focus(mut self, x: f64, y: f64) -> Self {
        self.focus = Some((x, y));
        self
    }

    /// Append this upload's fields to `form`
    pub fn to_form(&self, form: MultipartForm) -> MultipartForm {
        let mut form = form.part(self.file.to_part("file"));
        if let Some(thumbnail) = &self.thumbnail {
            form.push(thumbnail.to_part("thumbnail"));
        }
        if let Some(description) = &self.description {
            form.push(Part::text("description", description.clone()));
        }
        if let Some((x, y)) = self.focus {
            form.push(Part::text("focus", format!("{},{}", x, y)));
        }
        form
    }
}

impl RequestBody for UploadMedia {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        Ok(Some(EncodedBody::Multipart(self.to_form(MultipartForm::new()))))
    }
}

/// Body for `PATCH /api/v1/accounts/update_credentials`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCredentials {
    pub display_name: Option<String>,
    pub note: Option<String>,
    pub avatar: Option<MediaAttachment>,
    pub header: Option<MediaAttachment>,
    pub locked: Option<bool>,
    pub bot: Option<bool>,
    pub discoverable: Option<bool>,
    /// Profile metadata as `(name, value)` pairs
    pub fields: Vec<(String, String)>,
}

impl UpdateCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn avatar(mut self, avatar: MediaAttachment) -> Self {
        self.avatar = Some(avatar);
        self
    }

    pub fn header(mut self, header: MediaAttachment) -> Self {
        self.header = Some(header);
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn bot(mut self, bot: bool) -> Self {
        self.bot = Some(bot);
        self
    }

    pub fn discoverable(mut self, discoverable: bool) -> Self {
        self.discoverable = Some(discoverable);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Append the changed fields to `form`
    pub fn to_form(&self, mut form: MultipartForm) -> MultipartForm {
        if let Some(display_name) = &self.display_name {
            form.push(Part::text("display_name", display_name.clone()));
        }
        if let Some(note) = &self.note {
            form.push(Part::text("note", note.clone()));
        }
        if let Some(avatar) = &self.avatar {
            form.push(avatar.to_part("avatar"));
        }
        if let Some(header) = &self.header {
            form.push(header.to_part("header"));
        }
        for (name, value) in [
            ("locked", self.locked),
            ("bot", self.bot),
            ("discoverable", self.discoverable),
        ] {
            if let Some(value) = value {
                form.push(Part::text(name, value.to_string()));
            }
        }
        for (index, (name, value)) in self.fields.iter().enumerate() {
            form.push(Part::text(format!("fields_attributes[{}][name]", index), name.clone()));
            form.push(Part::text(format!("fields_attributes[{}][value]", index), value.clone()));
        }
        form
    }
}

impl RequestBody for UpdateCredentials {
    fn encode(&self) -> Result<Option<EncodedBody>> {
        Ok(Some(EncodedBody::Multipart(self.to_form(MultipartForm::new()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::PartBody;
    use std::path::Path;

    fn bytes_of(body: Option<EncodedBody>) -> (String, Vec<u8>) {
        match body {
            Some(EncodedBody::Bytes {
                content_type,
                bytes,
            }) => (content_type, bytes),
            other => panic!("expected byte body, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_body_is_none() {
        assert_eq!(().encode().unwrap(), None);
    }

    #[test]
    fn test_json_body() {
        let (content_type, bytes) = bytes_of(
            PublishStatus::new("hello")
                .visibility(Visibility::Unlisted)
                .media_id("1")
                .media_id("2")
                .encode()
                .unwrap(),
        );
        assert_eq!(content_type, "application/json");
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "status": "hello",
                "media_ids": ["1", "2"],
                "visibility": "unlisted"
            })
        );
    }

    #[test]
    fn test_spoiler_marks_sensitive() {
        let status = PublishStatus::new("plot twist").spoiler("spoilers");
        assert_eq!(status.sensitive, Some(true));
        assert_eq!(status.spoiler_text.as_deref(), Some("spoilers"));
    }

    #[test]
    fn test_form_body() {
        let form = Form::new().pair("grant_type", "password").pair("scope", "read write");
        let (content_type, bytes) = bytes_of(form.encode().unwrap());
        assert_eq!(content_type, "application/x-www-form-urlencoded");
        assert_eq!(bytes, b"grant_type=password&scope=read+write".to_vec());
    }

    #[test]
    fn test_upload_media_form() {
        let upload = UploadMedia::new(MediaAttachment::Jpeg(vec![1, 2, 3]))
            .description("a cat")
            .focus(0.5, -0.25);
        let form = upload.to_form(MultipartForm::with_boundary("XYZ"));
        let names: Vec<&str> = form.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["file", "description", "focus"]);

        let file = &form.parts()[0];
        assert_eq!(file.filename.as_deref(), Some("file.jpg"));
        assert_eq!(file.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(form.parts()[2].body, PartBody::Buffered(b"0.5,-0.25".to_vec()));

        match upload.encode().unwrap() {
            Some(EncodedBody::Multipart(form)) => assert_eq!(form.len(), 3),
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[test]
    fn test_file_attachment_is_streamed() {
        let part = MediaAttachment::File(PathBuf::from("/photos/cat.png")).to_part("file");
        assert!(part.is_streamed());
        assert_eq!(part.filename.as_deref(), Some("cat.png"));
        assert_eq!(part.content_type.as_deref(), Some("image/png"));
        match &part.body {
            PartBody::Streamed(handle) => assert_eq!(handle.path(), Path::new("/photos/cat.png")),
            PartBody::Buffered(_) => panic!("expected a streamed part"),
        }

        let unknown = MediaAttachment::File(PathBuf::from("notes.xyz")).to_part("file");
        assert_eq!(unknown.content_type.as_deref(), Some("application/octet-stream"));
    }

    #[test]
    fn test_other_attachment() {
        let part = MediaAttachment::Other {
            data: vec![0],
            extension: "webp".to_string(),
            mime: "image/webp".to_string(),
        }
        .to_part("avatar");
        assert_eq!(part.filename.as_deref(), Some("file.webp"));
        assert_eq!(part.content_type.as_deref(), Some("image/webp"));
    }

    #[test]
    fn test_update_credentials_form() {
        let update = UpdateCredentials::new()
            .display_name("Rustacean")
            .bot(false)
            .field("Pronouns", "they/them")
            .field("Site", "https://example.org");
        let form = update.to_form(MultipartForm::with_boundary("XYZ"));
        let names: Vec<&str> = form.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "display_name",
                "bot",
                "fields_attributes[0][name]",
                "fields_attributes[0][value]",
                "fields_attributes[1][name]",
                "fields_attributes[1][value]",
            ]
        );
        let body = String::from_utf8(form.encode()).unwrap();
        assert!(body.contains("name=\"bot\"\r\n\r\nfalse"));
    }
}
