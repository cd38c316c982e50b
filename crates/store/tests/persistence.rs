//! Cross-module persistence behaviour on the in-memory card.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use platform::mocks::{MemStorage, StorageOp};
use proptest::prelude::*;
use store::urls::{History, HISTORY_MAX};
use store::{notes, StoreError};

proptest! {
    #[test]
    fn history_bounded_and_mru(urls in proptest::collection::vec("[a-e]{1,2}", 0..80)) {
        let mut h = History::new();
        for u in &urls {
            h.push(u);
            prop_assert!(h.len() <= HISTORY_MAX);
            prop_assert_eq!(h.get(0), Some(u.as_str()));
            prop_assert_eq!(h.iter().filter(|x| *x == u.as_str()).count(), 1);
        }
    }
}

#[tokio::test]
async fn test_rename_round_trip_preserves_bytes() {
    let fs = MemStorage::new();
    let mut sd = fs.clone();
    let body = b"first line\nsecond \xc3\xa9 line\n";
    notes::save(&mut sd, "foo.txt", body).await.unwrap();
    let bar = notes::rename(&mut sd, "foo.txt", "bar").await.unwrap();
    assert_eq!(bar.as_str(), "bar.txt");
    let foo = notes::rename(&mut sd, &bar, "foo").await.unwrap();
    assert_eq!(foo.as_str(), "foo.txt");
    assert_eq!(fs.get("/notes/foo.txt").unwrap(), body);
}

#[tokio::test]
async fn test_rename_collision_leaves_card_untouched() {
    let fs = MemStorage::new();
    fs.insert("/notes/a.txt", b"one");
    fs.insert("/notes/b.txt", b"two");
    let mut sd = fs.clone();
    let before = fs.paths();
    fs.reset_counts();
    assert_eq!(notes::rename(&mut sd, "b.txt", "a").await, Err(StoreError::Exists));
    assert_eq!(notes::rename(&mut sd, "b.txt", "A").await, Err(StoreError::Exists));
    assert_eq!(fs.paths(), before);
    assert_eq!(fs.count(StorageOp::Rename), 0);
}

#[tokio::test]
async fn test_note_write_close_reopen_identical() {
    let fs = MemStorage::new();
    let mut sd = fs.clone();
    let name = notes::create(&mut sd, "journal").await.unwrap();
    let text = "day one\n".repeat(500);
    notes::save(&mut sd, &name, text.as_bytes()).await.unwrap();
    let mut buf = vec![0u8; 16 * 1024];
    let n = notes::load(&mut sd, &name, &mut buf).await.unwrap();
    assert_eq!(n, text.len());
    assert_eq!(&buf[..n], text.as_bytes());
}
