//! Upload, download, version, delete and share behavior of the orchestrator.

mod common;

use base64::Engine as _;
use blockvault_core::error::ErrorKind;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::ContentAddress;
use blockvault_database::MetadataStore;
use blockvault_entity::file::FileCategory;
use blockvault_service::{FileLocator, UploadRequest};

use common::Harness;

#[tokio::test]
async fn test_quota_scenario_600_then_500() {
    let h = Harness::new();
    let alice = h.principal("alice", 1000).await;

    let first = h
        .lifecycle
        .upload(&alice, UploadRequest::new("report.pdf", vec![1u8; 600]))
        .await
        .expect("first upload");
    assert_eq!(first.record.current_version, 1);
    assert_eq!(first.version.version_number, 1);
    assert_eq!(first.record.file_type, FileCategory::Pdf);
    assert!(!first.record.encrypted);
    assert!(first.record.key_fingerprint.is_none());
    assert!(first.generated_key.is_none());
    assert_eq!(h.used(&alice).await, 600);

    let blobs_before = h.blobs.inner.len().await;
    let err = h
        .lifecycle
        .upload(&alice, UploadRequest::new("more.bin", vec![2u8; 500]))
        .await
        .expect_err("over quota");
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    assert_eq!(h.used(&alice).await, 600);
    // Rejected before the blob store was touched.
    assert_eq!(h.blobs.inner.len().await, blobs_before);
}

#[tokio::test]
async fn test_exact_fill_is_accepted() {
    let h = Harness::new();
    let alice = h.principal("alice", 1000).await;
    h.lifecycle
        .upload(&alice, UploadRequest::new("a.bin", vec![1u8; 600]))
        .await
        .expect("first");
    h.lifecycle
        .upload(&alice, UploadRequest::new("b.bin", vec![2u8; 400]))
        .await
        .expect("fills quota exactly");
    assert_eq!(h.used(&alice).await, 1000);
}

#[tokio::test]
async fn test_empty_payload_is_rejected() {
    let h = Harness::new();
    let alice = h.principal("alice", 1000).await;
    let err = h
        .lifecycle
        .upload(&alice, UploadRequest::new("empty.txt", Vec::new()))
        .await
        .expect_err("empty");
    assert_eq!(err.kind, ErrorKind::EmptyPayload);
    assert_eq!(h.used(&alice).await, 0);
}

#[tokio::test]
async fn test_encryption_scenario() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let plaintext = vec![7u8; 100];

    let outcome = h
        .lifecycle
        .upload(
            &alice,
            UploadRequest::new("secret.txt", plaintext.clone())
                .content_type("text/plain")
                .encrypted(None),
        )
        .await
        .expect("encrypted upload");
    let key = outcome.generated_key.expect("key disclosed once");
    assert!(outcome.record.encrypted);
    assert!(outcome.record.key_fingerprint.is_some());
    // Metered at the declared, pre-encryption size.
    assert_eq!(outcome.record.size_bytes, 100);
    assert_eq!(h.used(&alice).await, 100);

    // The stored blob is ciphertext.
    let stored = h.blobs.inner.get(&outcome.record.cid).await.expect("blob");
    assert_ne!(stored.as_ref(), plaintext.as_slice());

    let err = h
        .lifecycle
        .download(&alice, outcome.record.id, None)
        .await
        .expect_err("no key");
    assert_eq!(err.kind, ErrorKind::KeyRequired);

    let file = h
        .lifecycle
        .download(&alice, outcome.record.id, Some(&key.to_base64()))
        .await
        .expect("correct key");
    assert_eq!(file.data.as_ref(), plaintext.as_slice());
    assert_eq!(file.filename, "secret.txt");
    assert_eq!(file.content_type, "text/plain");

    let wrong = base64::engine::general_purpose::STANDARD.encode([0u8; 32]);
    let err = h
        .lifecycle
        .download(&alice, outcome.record.id, Some(&wrong))
        .await
        .expect_err("wrong key");
    assert_eq!(err.kind, ErrorKind::IntegrityError);

    let err = h
        .lifecycle
        .download(&alice, outcome.record.id, Some("not-a-key"))
        .await
        .expect_err("malformed key");
    assert_eq!(err.kind, ErrorKind::IntegrityError);
}

#[tokio::test]
async fn test_supplied_key_is_not_returned() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let key = base64::engine::general_purpose::STANDARD.encode([9u8; 32]);

    let outcome = h
        .lifecycle
        .upload(
            &alice,
            UploadRequest::new("diary.md", b"dear diary".to_vec()).encrypted(Some(key.clone())),
        )
        .await
        .expect("upload");
    assert!(outcome.generated_key.is_none());

    let file = h
        .lifecycle
        .download(&alice, outcome.record.id, Some(&key))
        .await
        .expect("download");
    assert_eq!(file.data.as_ref(), b"dear diary");
}

#[tokio::test]
async fn test_malformed_supplied_key_is_validation() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let err = h
        .lifecycle
        .upload(
            &alice,
            UploadRequest::new("x.txt", b"x".to_vec()).encrypted(Some("c2hvcnQ=".to_string())),
        )
        .await
        .expect_err("16-byte key");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(h.used(&alice).await, 0);
}

#[tokio::test]
async fn test_tampered_ciphertext_is_integrity_error() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("ledger.csv", vec![3u8; 64]).encrypted(None))
        .await
        .expect("upload");
    let key = outcome.generated_key.expect("key");

    let mut stored = h
        .blobs
        .inner
        .get(&outcome.record.cid)
        .await
        .expect("blob")
        .to_vec();
    stored[20] ^= 0xFF;
    h.blobs
        .inner
        .overwrite(&outcome.record.cid, stored.into())
        .await;

    let err = h
        .lifecycle
        .download(&alice, outcome.record.id, Some(&key.to_base64()))
        .await
        .expect_err("tampered");
    assert_eq!(err.kind, ErrorKind::IntegrityError);
}

#[tokio::test]
async fn test_same_bytes_same_address() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let bob = h.principal("bob", 10_000).await;

    let first = h
        .lifecycle
        .upload(&alice, UploadRequest::new("a.txt", b"identical".to_vec()))
        .await
        .expect("first");
    assert_eq!(first.record.cid, ContentAddress::for_bytes(b"identical"));

    // A second record for the same current content is refused, and nothing is charged.
    let err = h
        .lifecycle
        .upload(&bob, UploadRequest::new("b.txt", b"identical".to_vec()))
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind, ErrorKind::DuplicateContent);
    assert_eq!(h.used(&bob).await, 0);
    assert_eq!(h.blobs.inner.len().await, 1);
}

#[tokio::test]
async fn test_new_version_advances_record_atomically() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;

    let v1 = h
        .lifecycle
        .upload(&alice, UploadRequest::new("plan.docx", b"draft one".to_vec()))
        .await
        .expect("v1");
    let v2 = h
        .lifecycle
        .upload(
            &alice,
            UploadRequest::new("ignored.txt", b"draft two, longer".to_vec())
                .new_version_of(v1.record.id, Some("second pass".to_string())),
        )
        .await
        .expect("v2");

    assert_eq!(v2.version.version_number, 2);
    assert_eq!(v2.record.id, v1.record.id);
    assert_eq!(v2.record.current_version, 2);
    assert_eq!(v2.record.cid, v2.version.cid);
    assert_ne!(v2.record.cid, v1.record.cid);
    assert_eq!(v2.record.filename, "plan.docx");
    assert_eq!(v2.version.description.as_deref(), Some("second pass"));
    assert_eq!(h.used(&alice).await, 9 + 17);

    let versions = h
        .lifecycle
        .list_versions(&alice, v1.record.id)
        .await
        .expect("versions");
    let numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![2, 1]);
    assert_eq!(versions[1].description.as_deref(), Some("Initial upload"));

    let current = h
        .lifecycle
        .download(&alice, v1.record.id, None)
        .await
        .expect("current");
    assert_eq!(current.data.as_ref(), b"draft two, longer");
    assert_eq!(current.version_number, 2);

    let old = h
        .lifecycle
        .download_version(&alice, v1.record.id, 1, None)
        .await
        .expect("historic");
    assert_eq!(old.data.as_ref(), b"draft one");

    let err = h
        .lifecycle
        .download_version(&alice, v1.record.id, 3, None)
        .await
        .expect_err("no v3");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_historic_version_keeps_its_encryption_state() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;

    let v1 = h
        .lifecycle
        .upload(&alice, UploadRequest::new("keys.txt", b"sealed first".to_vec()).encrypted(None))
        .await
        .expect("v1");
    let key = v1.generated_key.expect("key").to_base64();
    h.lifecycle
        .upload(
            &alice,
            UploadRequest::new("", b"plain second".to_vec()).new_version_of(v1.record.id, None),
        )
        .await
        .expect("v2");

    let current = h
        .lifecycle
        .download(&alice, v1.record.id, None)
        .await
        .expect("v2 is plaintext");
    assert_eq!(current.data.as_ref(), b"plain second");

    let err = h
        .lifecycle
        .download_version(&alice, v1.record.id, 1, None)
        .await
        .expect_err("v1 still sealed");
    assert_eq!(err.kind, ErrorKind::KeyRequired);
    let old = h
        .lifecycle
        .download_version(&alice, v1.record.id, 1, Some(&key))
        .await
        .expect("v1 with key");
    assert_eq!(old.data.as_ref(), b"sealed first");
}

#[tokio::test]
async fn test_other_principals_are_denied() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let mallory = h.principal("mallory", 10_000).await;

    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("private.txt", b"mine".to_vec()))
        .await
        .expect("upload");
    let id = outcome.record.id;

    for err in [
        h.lifecycle.download(&mallory, id, None).await.expect_err("download"),
        h.lifecycle
            .download(&mallory, FileLocator::Cid(outcome.record.cid.clone()), None)
            .await
            .expect_err("download by cid"),
        h.lifecycle.share_link(&mallory, id).await.expect_err("share"),
        h.lifecycle.get_file(&mallory, id).await.map(|_| ()).expect_err("get"),
        h.lifecycle.delete(&mallory, id).await.map(|_| ()).expect_err("delete"),
        h.lifecycle
            .upload(
                &mallory,
                UploadRequest::new("x", b"overwrite".to_vec()).new_version_of(id, None),
            )
            .await
            .map(|_| ())
            .expect_err("append"),
    ] {
        assert_eq!(err.kind, ErrorKind::AccessDenied);
    }
    assert_eq!(h.used(&mallory).await, 0);
    assert_eq!(h.used(&alice).await, 4);
}

#[tokio::test]
async fn test_download_by_content_address() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("song.mp3", b"la la la".to_vec()))
        .await
        .expect("upload");

    let file = h
        .lifecycle
        .download(&alice, outcome.record.cid.clone(), None)
        .await
        .expect("by cid");
    assert_eq!(file.data.as_ref(), b"la la la");
    assert_eq!(file.content_type, "application/octet-stream");

    let err = h
        .lifecycle
        .download(&alice, ContentAddress::for_bytes(b"unknown"), None)
        .await
        .expect_err("unknown cid");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_releases_size_and_unpins() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("video.mkv", vec![5u8; 300]))
        .await
        .expect("upload");
    assert!(outcome.record.pinned);
    assert!(h.blobs.inner.is_pinned(&outcome.record.cid).await);

    let released = h
        .lifecycle
        .delete(&alice, outcome.record.id)
        .await
        .expect("delete");
    assert_eq!(released, 300);
    assert_eq!(h.used(&alice).await, 0);
    assert!(!h.blobs.inner.is_pinned(&outcome.record.cid).await);

    let err = h
        .lifecycle
        .get_file(&alice, outcome.record.id)
        .await
        .expect_err("gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(
        h.store
            .list_versions(outcome.record.id)
            .await
            .expect("versions")
            .is_empty()
    );
}

#[tokio::test]
async fn test_delete_clamps_inconsistent_usage() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("a.zip", vec![1u8; 500]))
        .await
        .expect("upload");

    // Simulate drift: the counter lost 400 bytes somewhere.
    h.lifecycle
        .ledger()
        .release(alice.user_id, 400)
        .await
        .expect("drift");
    assert_eq!(h.used(&alice).await, 100);

    h.lifecycle
        .delete(&alice, outcome.record.id)
        .await
        .expect("delete");
    assert_eq!(h.used(&alice).await, 0);
}

#[tokio::test]
async fn test_share_link_is_deterministic() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("pic.png", b"pixels".to_vec()))
        .await
        .expect("upload");

    let link = h
        .lifecycle
        .share_link(&alice, outcome.record.id)
        .await
        .expect("link");
    assert_eq!(link, format!("https://ipfs.io/ipfs/{}", outcome.record.cid));
    assert_eq!(
        h.lifecycle
            .share_link(&alice, outcome.record.id)
            .await
            .expect("again"),
        link
    );
}

#[tokio::test]
async fn test_listing_and_recent_files() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let bob = h.principal("bob", 10_000).await;

    for i in 0..6u8 {
        h.lifecycle
            .upload(&alice, UploadRequest::new(format!("f{i}.txt"), vec![i + 1; 10]))
            .await
            .expect("upload");
    }
    h.lifecycle
        .upload(&bob, UploadRequest::new("bob.txt", b"bob".to_vec()))
        .await
        .expect("bob upload");

    let all = h.lifecycle.list_files(&alice).await.expect("list");
    assert_eq!(all.len(), 6);
    assert_eq!(all[0].filename, "f5.txt");

    let recent = h.lifecycle.recent_files(&alice).await.expect("recent");
    let names: Vec<&str> = recent.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["f5.txt", "f4.txt", "f3.txt", "f2.txt"]);
}

#[tokio::test]
async fn test_attestation_and_reconcile() {
    let h = Harness::new();
    let alice = h.principal("alice", 10_000).await;
    let outcome = h
        .lifecycle
        .upload(&alice, UploadRequest::new("deed.pdf", vec![4u8; 250]))
        .await
        .expect("upload");

    let record = h
        .lifecycle
        .attach_attestation(&alice, outcome.record.id, "0xabc123")
        .await
        .expect("attest");
    assert_eq!(record.attestation_ref.as_deref(), Some("0xabc123"));

    let err = h
        .lifecycle
        .attach_attestation(&alice, outcome.record.id, "  ")
        .await
        .expect_err("blank");
    assert_eq!(err.kind, ErrorKind::Validation);

    h.lifecycle
        .ledger()
        .reserve(alice.user_id, 1000)
        .await
        .expect("drift");
    let repaired = h.lifecycle.reconcile(alice.user_id).await.expect("reconcile");
    assert_eq!(repaired.used_storage, 250);
}
