use items::{Category, ItemRecord, ItemStatus, ItemType};

/// Sort direction on the server timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Equality filters over item records. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub item_type: Option<ItemType>,
    pub status: Option<ItemStatus>,
    pub category: Option<Category>,
    pub order: SortOrder,
}

impl ItemQuery {
    /// Every record, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    /// Open found items in one category: the candidate pool for matching.
    pub fn open_found_in(category: Category) -> Self {
        Self {
            item_type: Some(ItemType::Found),
            status: Some(ItemStatus::Open),
            category: Some(category),
            order: SortOrder::NewestFirst,
        }
    }

    pub fn with_type(mut self, item_type: Option<ItemType>) -> Self {
        self.item_type = item_type;
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn matches(&self, record: &ItemRecord) -> bool {
        self.item_type.is_none_or(|t| record.item_type == t)
            && self.status.is_none_or(|s| record.status == s)
            && self.category.is_none_or(|c| record.category == c)
    }

    pub(crate) fn sort(&self, records: &mut [ItemRecord]) {
        // Timestamps are unique per store, the id only breaks ties between
        // records imported from elsewhere.
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        if self.order == SortOrder::NewestFirst {
            records.reverse();
        }
    }
}
