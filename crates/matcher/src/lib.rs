//! # Matching engine (`matcher`)
//!
//! Given a lost report's title and category, find the open found items that
//! might be the same object. Matching is a cheap keyword screen, re-run when
//! the user leaves the title or category field of the lost-item form rather
//! than continuously:
//!
//! 1. Titles shorter than [`MatchConfig::min_title_chars`] (3) return nothing
//!    without touching the store.
//! 2. The store is asked for found, open items in the same category.
//! 3. The lost title is split into lowercase words.
//! 4. A found item is kept when any of those words occurs anywhere in its
//!    lowercased title or tags.
//!
//! Results keep the store order (newest first). Overlapping queries from the
//! same user are reconciled with a [`QueryGuard`]: only the outcome of the
//! most recently issued query is delivered.
//!
//! ```
//! use std::sync::Arc;
//! use items::Category;
//! use matcher::{LostQuery, Matcher};
//! use store::ItemStore;
//!
//! let matcher = Matcher::new(Arc::new(ItemStore::in_memory()));
//! let outcome = matcher.find_candidates(&LostQuery::new("ke", Category::Others));
//! assert!(outcome.skipped);
//! assert!(outcome.candidates.is_empty());
//! ```

pub mod engine;
pub mod guard;
pub mod types;

pub use crate::engine::{tokenize, Matcher};
pub use crate::guard::{QueryGuard, QueryTicket, MAX_CLIENT_SEQ};
pub use crate::types::{LostQuery, MatchConfig, MatchError, MatchOutcome};
