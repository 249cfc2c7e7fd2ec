//! Behavior when the blob store or metadata store fails mid-operation.

mod common;

use std::sync::Arc;

use blockvault_core::config::AppConfig;
use blockvault_core::error::ErrorKind;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::ContentAddress;
use blockvault_database::MetadataStore;
use blockvault_service::{FileLifecycle, RequestContext, UploadRequest};
use blockvault_storage::MemoryBlobStore;

use common::{BrokenCommits, Harness};

#[tokio::test]
async fn test_blob_store_outage_is_a_clean_no_op() {
    let h = Harness::new();
    let alice = h.principal("alice", 1000).await;
    h.blobs.fail_puts(true);

    let err = h
        .lifecycle
        .upload(&alice, UploadRequest::new("a.txt", b"payload".to_vec()))
        .await
        .expect_err("daemon down");
    assert_eq!(err.kind, ErrorKind::StorageUnavailable);
    assert!(err.is_retryable());
    assert_eq!(h.used(&alice).await, 0);
    assert!(h.lifecycle.list_files(&alice).await.expect("list").is_empty());
    assert!(!h.lifecycle.blob_store_healthy().await.expect("health"));

    h.blobs.fail_puts(false);
    h.lifecycle
        .upload(&alice, UploadRequest::new("a.txt", b"payload".to_vec()))
        .await
        .expect("retry succeeds");
    assert_eq!(h.used(&alice).await, 7);
}

#[tokio::test]
async fn test_pin_failure_does_not_fail_upload() {
    let h = Harness::new();
    let alice = h.principal("alice", 1000).await;
    h.blobs.fail_pins(true);

    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("a.txt", b"unpinned".to_vec()))
        .await
        .expect("upload");
    assert!(!outcome.record.pinned);
    assert_eq!(h.used(&alice).await, 8);
}

#[tokio::test]
async fn test_unpin_failure_does_not_block_delete() {
    let h = Harness::new();
    let alice = h.principal("alice", 1000).await;
    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("a.txt", b"sticky".to_vec()))
        .await
        .expect("upload");

    h.blobs.fail_pins(true);
    let released = h
        .lifecycle
        .delete(&alice, outcome.record.id)
        .await
        .expect("delete despite unpin failure");
    assert_eq!(released, 6);
    assert_eq!(h.used(&alice).await, 0);
    // Still pinned in the backend; harmless.
    assert!(h.blobs.inner.is_pinned(&outcome.record.cid).await);
}

#[tokio::test]
async fn test_commit_failure_unpins_orphan_blob_and_charges_nothing() {
    let store = Arc::new(BrokenCommits::default());
    let blobs = Arc::new(MemoryBlobStore::new());
    let lifecycle = FileLifecycle::new(store.clone(), blobs.clone(), &AppConfig::default());

    let user = lifecycle
        .users()
        .register("alice", None, Some(1000))
        .await
        .expect("register");
    let alice = RequestContext::for_user(&user);

    let err = lifecycle
        .upload(&alice, UploadRequest::new("a.txt", b"orphan".to_vec()))
        .await
        .expect_err("commit fails");
    assert_eq!(err.kind, ErrorKind::PersistenceError);
    assert!(!err.is_retryable());

    // The orphan stays stored but unpinned, and no quota was taken.
    let orphan = ContentAddress::for_bytes(b"orphan");
    assert_eq!(blobs.len().await, 1);
    assert!(blobs.contains(&orphan).await);
    assert!(!blobs.is_pinned(&orphan).await);
    assert!(store.list_files(user.id, None).await.expect("list").is_empty());
    let user = store.find_user(user.id).await.expect("find").expect("exists");
    assert_eq!(user.used_storage, 0);
}

#[tokio::test]
async fn test_shared_content_stays_pinned_after_delete() {
    let h = Harness::new();
    let alice = h.principal("alice", 1000).await;

    let doc = h
        .lifecycle
        .upload(&alice, UploadRequest::new("a.txt", b"shared bytes".to_vec()))
        .await
        .expect("a");
    let shared_cid = doc.record.cid.clone();
    h.lifecycle
        .upload(
            &alice,
            UploadRequest::new("", b"a newer body".to_vec()).new_version_of(doc.record.id, None),
        )
        .await
        .expect("a v2");

    // The old content of `a` becomes the current content of `b`.
    let other = h
        .lifecycle
        .upload(&alice, UploadRequest::new("b.txt", b"shared bytes".to_vec()))
        .await
        .expect("b");
    assert_eq!(other.record.cid, shared_cid);

    h.lifecycle
        .delete(&alice, doc.record.id)
        .await
        .expect("delete a");
    assert!(h.blobs.inner.is_pinned(&shared_cid).await);
    assert!(h.blobs.get(&shared_cid).await.is_ok());
}
