//! Item reports for the campus lost & found service.
//!
//! This crate owns the shared vocabulary: item records and their public
//! projection, report drafts with validation, embedded photos, and the
//! campus identity policy.

pub mod error;
pub mod identity;
pub mod image;
pub mod types;

pub use error::ItemError;
pub use identity::{EmailDomainPolicy, Principal, CAMPUS_EMAIL_DOMAIN};
pub use image::{EmbeddedImage, ACCEPTED_IMAGE_MIME, DEFAULT_IMAGE_MIME, DEFAULT_MAX_IMAGE_BYTES};
pub use types::{
    normalize_tags, Category, FoundReport, ItemDraft, ItemRecord, ItemStatus, ItemType,
    LostReport, OwnerRef, PublicItem, MAX_LONG_FIELD_CHARS, MAX_SHORT_FIELD_CHARS, MAX_TAGS,
};
