use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ModelError;

/// Encoded raster image captured from the signature pad.
///
/// Kept in its encoded form (PNG from the pad, or whatever the data URL
/// carried); decoding is left to the writer that embeds it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignatureImage {
    mime: String,
    bytes: Vec<u8>,
}

impl SignatureImage {
    pub fn from_png_bytes(bytes: Vec<u8>) -> Result<Self, ModelError> {
        if bytes.is_empty() {
            return Err(ModelError::EmptyImage);
        }

        Ok(Self { mime: "image/png".to_owned(), bytes })
    }

    /// Parse a `data:image/...;base64,...` URL.
    pub fn from_data_url(url: &str) -> Result<Self, ModelError> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| ModelError::InvalidDataUrl("missing `data:` scheme".to_owned()))?;

        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ModelError::InvalidDataUrl("missing payload separator".to_owned()))?;

        let mime = meta
            .strip_suffix(";base64")
            .ok_or_else(|| ModelError::InvalidDataUrl("payload is not base64".to_owned()))?;

        if !mime.starts_with("image/") {
            return Err(ModelError::InvalidDataUrl(format!("unsupported media type `{mime}`")));
        }

        let bytes = B64.decode(payload.as_bytes())?;
        if bytes.is_empty() {
            return Err(ModelError::EmptyImage);
        }

        Ok(Self { mime: mime.to_owned(), bytes })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, B64.encode(&self.bytes))
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SignatureImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl TryFrom<String> for SignatureImage {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(&value)
    }
}

impl From<SignatureImage> for String {
    fn from(value: SignatureImage) -> Self {
        value.to_data_url()
    }
}
