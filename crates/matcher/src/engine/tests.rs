use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use items::{
    Category, EmbeddedImage, FoundReport, ItemDraft, ItemStatus, ItemType, LostReport, Principal,
};
use store::{InMemoryBackend, StoreBackend, StoreConfig, StoreError};

fn finder() -> Principal {
    Principal::new("uid-finder", "finder@iare.ac.in")
}

fn found(title: &str, category: Category, tags: &[&str]) -> ItemDraft {
    ItemDraft::Found(FoundReport {
        title: title.into(),
        category,
        color: String::new(),
        brand: None,
        description: String::new(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        location: "Main Library".into(),
        hidden_details: "Initials on the inside".into(),
        image: EmbeddedImage::from_base64(None, "aGVsbG8=", 1024).unwrap(),
    })
}

fn lost(title: &str, category: Category) -> ItemDraft {
    ItemDraft::Lost(LostReport {
        title: title.into(),
        category,
        description: "lost in class".into(),
        location: "Room 204".into(),
        date_lost: None,
        color: String::new(),
        brand: None,
        tags: vec![],
    })
}

fn matcher_with(drafts: Vec<ItemDraft>) -> (Matcher, Arc<ItemStore>) {
    let store = Arc::new(ItemStore::in_memory());
    for draft in drafts {
        store.insert(draft, &finder()).unwrap();
    }
    (Matcher::new(Arc::clone(&store)), store)
}

/// Counts scans so tests can prove whether the store was queried.
#[derive(Default)]
struct CountingBackend {
    inner: InMemoryBackend,
    scans: Arc<AtomicUsize>,
}

impl StoreBackend for CountingBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.scan(visitor)
    }
}

/// Opens cleanly, then fails every scan.
#[derive(Default)]
struct FailingBackend {
    armed: std::sync::atomic::AtomicBool,
}

impl StoreBackend for FailingBackend {
    fn put(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::backend("disk unavailable"))
    }

    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    fn scan(
        &self,
        _visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if self.armed.swap(true, Ordering::SeqCst) {
            Err(StoreError::backend("disk unavailable"))
        } else {
            Ok(())
        }
    }
}

#[test]
fn short_title_returns_nothing_without_querying() {
    let scans = Arc::new(AtomicUsize::new(0));
    let backend = CountingBackend {
        inner: InMemoryBackend::new(),
        scans: Arc::clone(&scans),
    };
    let store = Arc::new(ItemStore::with_backend(StoreConfig::new(), Box::new(backend)).unwrap());
    store
        .insert(found("Ke", Category::Others, &["ke"]), &finder())
        .unwrap();
    let opened_scans = scans.load(Ordering::SeqCst);

    let matcher = Matcher::new(Arc::clone(&store));
    for title in ["", "k", "ke", "  ke  "] {
        let outcome = matcher.find_candidates(&LostQuery::new(title, Category::Others));
        assert!(outcome.skipped, "title {title:?} should be skipped");
        assert!(outcome.candidates.is_empty());
        assert!(outcome.failure.is_none());
    }
    assert_eq!(scans.load(Ordering::SeqCst), opened_scans);

    let outcome = matcher.find_candidates(&LostQuery::new("Key", Category::Others));
    assert!(!outcome.skipped);
    assert_eq!(scans.load(Ordering::SeqCst), opened_scans + 1);
}

#[test]
fn category_mismatch_never_matches() {
    let (matcher, _) = matcher_with(vec![found("Water Bottle", Category::Others, &[])]);
    let outcome =
        matcher.find_candidates(&LostQuery::new("Blue Water Bottle", Category::Electronics));
    assert!(outcome.candidates.is_empty());
    assert!(outcome.failure.is_none());
    assert!(!outcome.skipped);
}

#[test]
fn tag_overlap_matches() {
    let (matcher, _) = matcher_with(vec![found(
        "Sony Headset",
        Category::Electronics,
        &["black", "over-ear"],
    )]);
    let outcome =
        matcher.find_candidates(&LostQuery::new("Black Headphones", Category::Electronics));
    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.candidates[0].title, "Sony Headset");
}

#[test]
fn substring_of_title_matches_case_insensitively() {
    let (matcher, _) = matcher_with(vec![found("BLUE water-bottle", Category::Others, &[])]);
    let outcome = matcher.find_candidates(&LostQuery::new("Bottle", Category::Others));
    assert_eq!(outcome.candidates.len(), 1);
}

#[test]
fn every_candidate_satisfies_the_predicate() {
    let (matcher, store) = matcher_with(vec![
        found("Casio Calculator", Category::Electronics, &["scientific"]),
        found("Phone Charger", Category::Electronics, &["usb-c"]),
        found("Calculus Textbook", Category::Books, &["math"]),
        found("Laptop Sleeve", Category::Electronics, &["grey"]),
        lost("Casio Calculator", Category::Electronics),
    ]);
    let returned = store
        .insert(found("Casio Watch", Category::Electronics, &[]), &finder())
        .unwrap();
    store.mark_returned(&returned.id, &finder()).unwrap();

    let outcome =
        matcher.find_candidates(&LostQuery::new("casio  usb-c", Category::Electronics));
    let titles: Vec<_> = outcome.candidates.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Phone Charger", "Casio Calculator"]);

    let words = tokenize("casio  usb-c");
    for candidate in &outcome.candidates {
        assert_eq!(candidate.item_type, ItemType::Found);
        assert_eq!(candidate.status, ItemStatus::Open);
        assert_eq!(candidate.category, Category::Electronics);
        let text = format!("{} {}", candidate.title, candidate.tags.join(" ")).to_lowercase();
        assert!(words.iter().any(|w| text.contains(w.as_str())));
    }
}

#[test]
fn repeated_spaces_do_not_match_everything() {
    let (matcher, _) = matcher_with(vec![found("Umbrella", Category::Others, &[])]);
    let outcome = matcher.find_candidates(&LostQuery::new("red  scarf", Category::Others));
    assert!(outcome.candidates.is_empty());
}

#[test]
fn candidates_come_back_newest_first() {
    let (matcher, _) = matcher_with(vec![
        found("Black Wallet", Category::Others, &[]),
        found("Brown Wallet", Category::Others, &[]),
        found("Wallet Chain", Category::Others, &[]),
    ]);
    let outcome = matcher.find_candidates(&LostQuery::new("wallet", Category::Others));
    let titles: Vec<_> = outcome.candidates.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Wallet Chain", "Brown Wallet", "Black Wallet"]);
}

#[test]
fn matching_has_no_side_effects() {
    let (matcher, store) = matcher_with(vec![found("Sony Headset", Category::Electronics, &[])]);
    let before = store.revision();
    matcher.find_candidates(&LostQuery::new("Sony", Category::Electronics));
    matcher.find_candidates(&LostQuery::new("Sony", Category::Electronics));
    assert_eq!(store.revision(), before);
}

#[test]
fn candidates_never_carry_hidden_details() {
    let (matcher, _) = matcher_with(vec![found("Sony Headset", Category::Electronics, &[])]);
    let outcome = matcher.find_candidates(&LostQuery::new("Sony", Category::Electronics));
    let json = serde_json::to_string(&outcome.candidates).unwrap();
    assert!(!json.contains("Initials on the inside"));
}

#[test]
fn store_failure_is_surfaced_not_swallowed() {
    let store = Arc::new(
        ItemStore::with_backend(StoreConfig::new(), Box::new(FailingBackend::default())).unwrap(),
    );
    let matcher = Matcher::new(store);
    let outcome = matcher.find_candidates(&LostQuery::new("Sony Headset", Category::Electronics));
    assert!(outcome.candidates.is_empty());
    assert!(!outcome.skipped);
    assert!(matches!(
        outcome.failure,
        Some(MatchError::Store(StoreError::Backend(_)))
    ));
}

#[test]
fn custom_min_title_chars_is_honoured() {
    let store = Arc::new(ItemStore::in_memory());
    store
        .insert(found("Pen", Category::Others, &[]), &finder())
        .unwrap();
    let matcher = Matcher::with_config(store, MatchConfig { min_title_chars: 5 }).unwrap();
    assert!(matcher
        .find_candidates(&LostQuery::new("Pen", Category::Others))
        .skipped);
}
