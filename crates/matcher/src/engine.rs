use std::sync::Arc;
use std::time::Instant;

use items::{ItemRecord, PublicItem};
use store::{ItemQuery, ItemStore};

use crate::types::{LostQuery, MatchConfig, MatchError, MatchOutcome};

#[cfg(test)]
mod tests;

/// Keyword matcher over the item store. Holds no per-query state.
pub struct Matcher {
    store: Arc<ItemStore>,
    cfg: MatchConfig,
}

impl Matcher {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self {
            store,
            cfg: MatchConfig::default(),
        }
    }

    pub fn with_config(store: Arc<ItemStore>, cfg: MatchConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { store, cfg })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Open found items in the lost item's category whose title or tags
    /// contain any word of the lost title.
    ///
    /// Never panics: a store failure is reported in
    /// [`MatchOutcome::failure`] with no candidates.
    pub fn find_candidates(&self, query: &LostQuery) -> MatchOutcome {
        let title = query.title.trim();
        if title.chars().count() < self.cfg.min_title_chars {
            return MatchOutcome::skipped();
        }

        let started = Instant::now();
        let pool = match self.store.query(&ItemQuery::open_found_in(query.category)) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    target: "lostfound::matcher",
                    category = %query.category,
                    error = %err,
                    "candidate query failed"
                );
                return MatchOutcome::failed(MatchError::Store(err));
            }
        };

        let words = tokenize(title);
        let candidates: Vec<PublicItem> = pool
            .iter()
            .filter(|record| is_candidate(&words, record))
            .map(PublicItem::from)
            .collect();

        tracing::debug!(
            target: "lostfound::matcher",
            category = %query.category,
            pool = pool.len(),
            candidates = candidates.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "match completed"
        );

        MatchOutcome {
            candidates,
            failure: None,
            skipped: false,
        }
    }
}

/// Lowercase whitespace-separated words. Runs of whitespace never yield
/// empty words, so a double space cannot match every candidate.
pub fn tokenize(title: &str) -> Vec<String> {
    title.split_whitespace().map(str::to_lowercase).collect()
}

fn haystack(record: &ItemRecord) -> String {
    let mut text = record.title.to_lowercase();
    text.push(' ');
    text.push_str(&record.tags.join(" ").to_lowercase());
    text
}

fn is_candidate(words: &[String], record: &ItemRecord) -> bool {
    let text = haystack(record);
    words.iter().any(|word| text.contains(word.as_str()))
}
