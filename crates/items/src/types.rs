use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ItemError;
use crate::identity::Principal;
use crate::image::EmbeddedImage;

/// Upper bound on short free-text fields (title, color, brand, location).
pub const MAX_SHORT_FIELD_CHARS: usize = 120;
/// Upper bound on long free-text fields (description, hidden details).
pub const MAX_LONG_FIELD_CHARS: usize = 2000;
/// Maximum number of tags kept on a report.
pub const MAX_TAGS: usize = 12;

/// Whether a report describes something lost or something found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Lost,
    Found,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Lost => "lost",
            ItemType::Found => "found",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ItemType::Lost),
            "found" => Ok(ItemType::Found),
            other => Err(ItemError::UnknownItemType(other.to_string())),
        }
    }
}

/// Lifecycle status. Transitions only `Open -> Returned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Open,
    Returned,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Open => "open",
            ItemStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed item categories, serialized exactly as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    Electronics,
    Books,
    #[serde(rename = "ID-Cards")]
    IdCards,
    Clothing,
    #[default]
    Others,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Books,
        Category::IdCards,
        Category::Clothing,
        Category::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Books => "Books",
            Category::IdCards => "ID-Cards",
            Category::Clothing => "Clothing",
            Category::Others => "Others",
        }
    }

    /// Forgiving parse for model output: exact match first, then
    /// case-insensitive, then `Others`.
    pub fn parse_lenient(raw: &str) -> Category {
        let raw = raw.trim();
        if let Ok(category) = raw.parse() {
            return category;
        }
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(Category::Others)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive parse.
impl FromStr for Category {
    type Err = ItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ItemError::UnknownCategory(s.to_string()))
    }
}

/// The account that created a report: the reporter of a lost item or the
/// finder of a found one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub uid: String,
    pub email: String,
}

impl From<&Principal> for OwnerRef {
    fn from(principal: &Principal) -> Self {
        Self {
            uid: principal.uid.clone(),
            email: principal.email.clone(),
        }
    }
}

/// A lost-item submission before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostReport {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub date_lost: Option<NaiveDate>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LostReport {
    pub fn validate(&self) -> Result<(), ItemError> {
        require("title", &self.title, MAX_SHORT_FIELD_CHARS)?;
        require("location", &self.location, MAX_SHORT_FIELD_CHARS)?;
        require("description", &self.description, MAX_LONG_FIELD_CHARS)?;
        limit("color", &self.color, MAX_SHORT_FIELD_CHARS)?;
        if let Some(brand) = &self.brand {
            limit("brand", brand, MAX_SHORT_FIELD_CHARS)?;
        }
        Ok(())
    }
}

/// A found-item submission before it is stored. The photo is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundReport {
    pub title: String,
    pub category: Category,
    pub color: String,
    pub brand: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub location: String,
    pub hidden_details: String,
    pub image: EmbeddedImage,
}

impl FoundReport {
    pub fn validate(&self) -> Result<(), ItemError> {
        require("location", &self.location, MAX_SHORT_FIELD_CHARS)?;
        require("title", &self.title, MAX_SHORT_FIELD_CHARS)?;
        limit("color", &self.color, MAX_SHORT_FIELD_CHARS)?;
        if let Some(brand) = &self.brand {
            limit("brand", brand, MAX_SHORT_FIELD_CHARS)?;
        }
        limit("description", &self.description, MAX_LONG_FIELD_CHARS)?;
        limit("hidden_details", &self.hidden_details, MAX_LONG_FIELD_CHARS)?;
        Ok(())
    }
}

/// Either kind of submission, as handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDraft {
    Lost(LostReport),
    Found(FoundReport),
}

impl ItemDraft {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemDraft::Lost(_) => ItemType::Lost,
            ItemDraft::Found(_) => ItemType::Found,
        }
    }

    pub fn validate(&self) -> Result<(), ItemError> {
        match self {
            ItemDraft::Lost(report) => report.validate(),
            ItemDraft::Found(report) => report.validate(),
        }
    }
}

/// A stored item report.
///
/// `hidden_details` is private: it is set once when a found report is
/// stored and can only be read through [`ItemRecord::hidden_details`].
/// Client-facing paths use [`PublicItem`], which has no such field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub title: String,
    pub category: Category,
    pub color: String,
    pub brand: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub location: String,
    pub date_lost: Option<NaiveDate>,
    pub image_url: Option<String>,
    hidden_details: Option<String>,
    pub owner: OwnerRef,
    pub timestamp: DateTime<Utc>,
}

impl ItemRecord {
    /// Build a record from a validated draft. Only the store calls this,
    /// with its own id and timestamp.
    pub fn from_draft(
        id: String,
        draft: ItemDraft,
        owner: OwnerRef,
        timestamp: DateTime<Utc>,
    ) -> Self {
        match draft {
            ItemDraft::Lost(report) => Self {
                id,
                item_type: ItemType::Lost,
                status: ItemStatus::Open,
                title: report.title.trim().to_string(),
                category: report.category,
                color: report.color.trim().to_string(),
                brand: clean_optional(report.brand),
                description: report.description.trim().to_string(),
                tags: normalize_tags(report.tags),
                location: report.location.trim().to_string(),
                date_lost: report.date_lost,
                image_url: None,
                hidden_details: None,
                owner,
                timestamp,
            },
            ItemDraft::Found(report) => Self {
                id,
                item_type: ItemType::Found,
                status: ItemStatus::Open,
                title: report.title.trim().to_string(),
                category: report.category,
                color: report.color.trim().to_string(),
                brand: clean_optional(report.brand),
                description: report.description.trim().to_string(),
                tags: normalize_tags(report.tags),
                location: report.location.trim().to_string(),
                date_lost: None,
                image_url: Some(report.image.data_url()),
                hidden_details: clean_optional(Some(report.hidden_details)),
                owner,
                timestamp,
            },
        }
    }

    /// Ground truth for claim verification. Never hand this to a client.
    pub fn hidden_details(&self) -> Option<&str> {
        self.hidden_details.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.status == ItemStatus::Open
    }

    /// Reporter of a lost item.
    pub fn reporter(&self) -> Option<&OwnerRef> {
        (self.item_type == ItemType::Lost).then_some(&self.owner)
    }

    /// Finder of a found item.
    pub fn finder(&self) -> Option<&OwnerRef> {
        (self.item_type == ItemType::Found).then_some(&self.owner)
    }

    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        self.owner.uid == principal.uid
    }
}

/// Client-facing projection of an [`ItemRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub title: String,
    pub category: Category,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_lost: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub owner_uid: String,
    pub owner_email: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ItemRecord> for PublicItem {
    fn from(record: &ItemRecord) -> Self {
        Self {
            id: record.id.clone(),
            item_type: record.item_type,
            status: record.status,
            title: record.title.clone(),
            category: record.category,
            color: record.color.clone(),
            brand: record.brand.clone(),
            description: record.description.clone(),
            tags: record.tags.clone(),
            location: record.location.clone(),
            date_lost: record.date_lost,
            image_url: record.image_url.clone(),
            owner_uid: record.owner.uid.clone(),
            owner_email: record.owner.email.clone(),
            timestamp: record.timestamp,
        }
    }
}

impl From<ItemRecord> for PublicItem {
    fn from(record: ItemRecord) -> Self {
        PublicItem::from(&record)
    }
}

fn require(field: &'static str, value: &str, max_chars: usize) -> Result<(), ItemError> {
    if value.trim().is_empty() {
        return Err(ItemError::MissingField(field));
    }
    limit(field, value, max_chars)
}

fn limit(field: &'static str, value: &str, max_chars: usize) -> Result<(), ItemError> {
    if value.trim().chars().count() > max_chars {
        return Err(ItemError::FieldTooLong {
            field,
            limit: max_chars,
        });
    }
    Ok(())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim tags, drop blanks, keep order, cap the count.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .collect()
}
