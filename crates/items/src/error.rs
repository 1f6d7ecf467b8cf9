use thiserror::Error;

/// Errors raised while validating item reports and principals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// A required field was absent or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// A field exceeded its maximum length.
    #[error("{field} exceeds {limit} characters")]
    FieldTooLong { field: &'static str, limit: usize },
    /// Category string is not one of the fixed categories.
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    /// Item type string is neither `lost` nor `found`.
    #[error("unknown item type: {0}")]
    UnknownItemType(String),
    /// Image MIME type is not accepted.
    #[error("unsupported image type: {0}")]
    UnsupportedImageType(String),
    /// Encoded image exceeds the configured limit.
    #[error("image is {size} bytes encoded, limit is {limit} bytes")]
    ImageTooLarge { size: usize, limit: usize },
    /// Image payload is not valid base64.
    #[error("image data is not valid base64")]
    InvalidImageEncoding,
    /// Email does not belong to the campus domain.
    #[error("{0}")]
    DomainRejected(String),
}

impl ItemError {
    /// User-facing hint describing how to recover from the error.
    pub fn next_step(&self) -> &'static str {
        match self {
            ItemError::MissingField(_) | ItemError::FieldTooLong { .. } => {
                "Fill in the highlighted field and submit again."
            }
            ItemError::UnknownCategory(_) | ItemError::UnknownItemType(_) => {
                "Pick one of the listed options and submit again."
            }
            ItemError::UnsupportedImageType(_)
            | ItemError::ImageTooLarge { .. }
            | ItemError::InvalidImageEncoding => {
                "Upload a smaller JPEG, PNG, WebP or GIF photo."
            }
            ItemError::DomainRejected(_) => "Sign in again with your campus email account.",
        }
    }
}
