use super::*;
use items::{Category, EmbeddedImage, FoundReport, ItemType, LostReport};
use std::time::Duration as StdDuration;

fn alice() -> Principal {
    Principal::new("uid-alice", "alice@iare.ac.in")
}

fn bob() -> Principal {
    Principal::new("uid-bob", "bob@iare.ac.in")
}

fn found(title: &str, category: Category, tags: &[&str]) -> ItemDraft {
    ItemDraft::Found(FoundReport {
        title: title.into(),
        category,
        color: "black".into(),
        brand: None,
        description: "found near the stairs".into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        location: "Block A".into(),
        hidden_details: "Sticker on the back".into(),
        image: EmbeddedImage::from_base64(None, "aGVsbG8=", 1024).unwrap(),
    })
}

fn lost(title: &str, category: Category) -> ItemDraft {
    ItemDraft::Lost(LostReport {
        title: title.into(),
        category,
        description: "lost it yesterday".into(),
        location: "Canteen".into(),
        date_lost: None,
        color: String::new(),
        brand: None,
        tags: vec![],
    })
}

#[test]
fn insert_assigns_id_owner_and_open_status() {
    let store = ItemStore::in_memory();
    let record = store
        .insert(found("Sony Headset", Category::Electronics, &["black"]), &alice())
        .unwrap();
    assert!(!record.id.is_empty());
    assert_eq!(record.status, ItemStatus::Open);
    assert_eq!(record.owner.uid, "uid-alice");
    assert_eq!(record.owner.email, "alice@iare.ac.in");

    let fetched = store.get(&record.id).unwrap().unwrap();
    assert_eq!(fetched, record);
    assert_eq!(fetched.hidden_details(), Some("Sticker on the back"));
}

#[test]
fn insert_rejects_invalid_draft() {
    let store = ItemStore::in_memory();
    let err = store.insert(lost("  ", Category::Books), &alice()).unwrap_err();
    assert_eq!(err, StoreError::Invalid(ItemError::MissingField("title")));
    assert_eq!(store.revision(), 0);
}

#[test]
fn timestamps_are_strictly_increasing() {
    let store = ItemStore::in_memory();
    let mut previous = None;
    for i in 0..50 {
        let record = store
            .insert(lost(&format!("Bottle {i}"), Category::Others), &alice())
            .unwrap();
        if let Some(prev) = previous {
            assert!(record.timestamp > prev);
        }
        previous = Some(record.timestamp);
    }
}

#[test]
fn query_filters_and_orders_newest_first() {
    let store = ItemStore::in_memory();
    let first = store
        .insert(found("Charger", Category::Electronics, &[]), &alice())
        .unwrap();
    store.insert(found("Novel", Category::Books, &[]), &alice()).unwrap();
    store.insert(lost("Laptop", Category::Electronics), &bob()).unwrap();
    let last = store
        .insert(found("Earbuds", Category::Electronics, &[]), &bob())
        .unwrap();

    let results = store.query(&ItemQuery::open_found_in(Category::Electronics)).unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![last.id.as_str(), first.id.as_str()]);

    let oldest_first = store
        .query(&ItemQuery::all().with_order(SortOrder::OldestFirst))
        .unwrap();
    assert_eq!(oldest_first.first().unwrap().id, first.id);
    assert_eq!(oldest_first.len(), 4);

    let lost_only = store
        .query(&ItemQuery::all().with_type(Some(ItemType::Lost)))
        .unwrap();
    assert_eq!(lost_only.len(), 1);
}

#[test]
fn public_query_never_exposes_hidden_details() {
    let store = ItemStore::in_memory();
    store
        .insert(found("Sony Headset", Category::Electronics, &[]), &alice())
        .unwrap();
    let public = store.query_public(&ItemQuery::all()).unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].owner_uid, "uid-alice");
}

#[test]
fn mark_returned_is_owner_only_and_one_way() {
    let store = ItemStore::in_memory();
    let record = store
        .insert(found("Sony Headset", Category::Electronics, &[]), &alice())
        .unwrap();

    assert_eq!(
        store.mark_returned(&record.id, &bob()).unwrap_err(),
        StoreError::NotOwner(record.id.clone())
    );

    let updated = store.mark_returned(&record.id, &alice()).unwrap();
    assert_eq!(updated.status, ItemStatus::Returned);
    assert_eq!(
        store.mark_returned(&record.id, &alice()).unwrap_err(),
        StoreError::AlreadyReturned(record.id.clone())
    );
    assert!(store
        .query(&ItemQuery::open_found_in(Category::Electronics))
        .unwrap()
        .is_empty());
}

#[test]
fn mark_returned_on_unknown_item() {
    let store = ItemStore::in_memory();
    assert_eq!(
        store.mark_returned("nope", &alice()).unwrap_err(),
        StoreError::NotFound("nope".into())
    );
}

#[test]
fn concurrent_mark_returned_has_one_winner() {
    let store = Arc::new(ItemStore::in_memory());
    let record = store
        .insert(found("Umbrella", Category::Others, &[]), &alice())
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let id = record.id.clone();
            std::thread::spawn(move || store.mark_returned(&id, &alice()))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, StoreError::AlreadyReturned(_))));
}

#[test]
fn uncompressed_store_round_trips() {
    let cfg = StoreConfig::new().with_compression(CompressionConfig::none());
    let store = ItemStore::with_backend(cfg, Box::new(InMemoryBackend::new())).unwrap();
    let record = store.insert(lost("Wallet", Category::Others), &bob()).unwrap();
    assert_eq!(store.get(&record.id).unwrap().unwrap().title, "Wallet");
}

#[cfg(feature = "backend-redb")]
#[test]
fn redb_store_keeps_ordering_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.redb");
    let cfg = StoreConfig::new().with_backend(BackendConfig::redb(path.to_string_lossy()));

    let first = {
        let store = ItemStore::open(cfg.clone()).unwrap();
        store.insert(lost("Calculator", Category::Electronics), &alice()).unwrap()
    };
    let store = ItemStore::open(cfg).unwrap();
    let second = store.insert(lost("Scarf", Category::Clothing), &alice()).unwrap();
    assert!(second.timestamp > first.timestamp);

    let all = store.query(&ItemQuery::all()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);
}

#[tokio::test]
async fn feed_emits_snapshot_then_updates() {
    let store = Arc::new(ItemStore::in_memory());
    store.insert(lost("Keys", Category::Others), &alice()).unwrap();

    let mut feed = store.subscribe(ItemQuery::all());
    assert_eq!(store.subscriber_count(), 1);
    let initial = feed.next().await.unwrap();
    assert_eq!(initial.len(), 1);

    let writer = Arc::clone(&store);
    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        writer.insert(found("Keys", Category::Others, &[]), &bob()).unwrap();
    });

    let next = tokio::time::timeout(StdDuration::from_secs(2), feed.next())
        .await
        .expect("feed update")
        .unwrap();
    assert_eq!(next.len(), 2);
    assert_eq!(next[0].item_type, ItemType::Found);

    feed.unsubscribe();
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn feed_reflects_status_changes() {
    let store = Arc::new(ItemStore::in_memory());
    let record = store
        .insert(found("Jacket", Category::Clothing, &[]), &alice())
        .unwrap();
    let mut feed = store.subscribe(ItemQuery::all().with_status(ItemStatus::Open));
    assert_eq!(feed.next().await.unwrap().len(), 1);

    store.mark_returned(&record.id, &alice()).unwrap();
    let after = tokio::time::timeout(StdDuration::from_secs(2), feed.next())
        .await
        .expect("feed update")
        .unwrap();
    assert!(after.is_empty());
}
