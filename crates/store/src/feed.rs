use std::sync::Arc;

use items::PublicItem;
use tokio::sync::watch;

use crate::{ItemQuery, ItemStore, StoreError};

/// A live view over a query.
///
/// The first call to [`FeedSubscription::next`] yields the current result set;
/// each later call waits for the next store change and yields the full,
/// re-ordered result set again. Dropping the handle cancels it.
pub struct FeedSubscription {
    store: Arc<ItemStore>,
    query: ItemQuery,
    revisions: watch::Receiver<u64>,
    primed: bool,
}

impl FeedSubscription {
    pub(crate) fn new(store: Arc<ItemStore>, query: ItemQuery) -> Self {
        let revisions = store.revisions.subscribe();
        Self {
            store,
            query,
            revisions,
            primed: false,
        }
    }

    pub fn query(&self) -> &ItemQuery {
        &self.query
    }

    /// Next snapshot. Several changes that land between two calls are
    /// coalesced into one snapshot.
    pub async fn next(&mut self) -> Result<Vec<PublicItem>, StoreError> {
        if self.primed {
            self.revisions
                .changed()
                .await
                .map_err(|_| StoreError::backend("store closed"))?;
        } else {
            self.primed = true;
        }
        self.revisions.borrow_and_update();
        let records = self.store.query(&self.query)?;
        Ok(records.iter().map(PublicItem::from).collect())
    }

    /// Explicit cancellation; equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        tracing::debug!(target: "lostfound::store", "feed unsubscribed");
    }
}
