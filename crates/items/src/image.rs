use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::ItemError;

/// Default cap on the base64 payload of an embedded photo.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 768 * 1024;

/// MIME type assumed when a client does not send one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

pub const ACCEPTED_IMAGE_MIME: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A photo stored inline in the item record as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    mime: String,
    data: String,
}

impl EmbeddedImage {
    /// Accepts either raw base64 or a full `data:<mime>;base64,<data>` URL.
    /// A MIME type inside the data URL wins over `mime`.
    pub fn from_base64(
        mime: Option<&str>,
        data: &str,
        max_bytes: usize,
    ) -> Result<Self, ItemError> {
        let (url_mime, payload) = split_data_url(data.trim());
        let mime = url_mime
            .or(mime)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_ascii_lowercase();

        if !ACCEPTED_IMAGE_MIME.contains(&mime.as_str()) {
            return Err(ItemError::UnsupportedImageType(mime));
        }
        if payload.is_empty() {
            return Err(ItemError::MissingField("image"));
        }
        if payload.len() > max_bytes {
            return Err(ItemError::ImageTooLarge {
                size: payload.len(),
                limit: max_bytes,
            });
        }
        STANDARD
            .decode(payload)
            .map_err(|_| ItemError::InvalidImageEncoding)?;

        Ok(Self {
            mime,
            data: payload.to_string(),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Base64 payload without the data URL prefix.
    pub fn base64(&self) -> &str {
        &self.data
    }

    pub fn encoded_len(&self) -> usize {
        self.data.len()
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

fn split_data_url(raw: &str) -> (Option<&str>, &str) {
    let Some(rest) = raw.strip_prefix("data:") else {
        return (None, raw);
    };
    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header.strip_suffix(";base64").unwrap_or(header);
            (Some(mime), payload)
        }
        None => (None, raw),
    }
}
