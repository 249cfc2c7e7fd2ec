//! Concurrent uploads against one principal and one file.

mod common;

use std::sync::Arc;

use futures::future::join_all;

use blockvault_core::error::ErrorKind;
use blockvault_service::UploadRequest;

use common::Harness;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_get_gap_free_versions() {
    let h = Arc::new(Harness::new());
    let alice = h.principal("alice", 1_000_000).await;
    let base = h
        .lifecycle
        .upload(&alice, UploadRequest::new("log.txt", b"v1".to_vec()))
        .await
        .expect("v1");
    let file_id = base.record.id;

    let tasks = (0..20u32).map(|i| {
        let h = h.clone();
        let ctx = alice.clone();
        tokio::spawn(async move {
            h.lifecycle
                .upload(
                    &ctx,
                    UploadRequest::new("", format!("revision {i}").into_bytes())
                        .new_version_of(file_id, None),
                )
                .await
        })
    });
    for result in join_all(tasks).await {
        result.expect("task").expect("append");
    }

    let mut numbers: Vec<i32> = h
        .lifecycle
        .list_versions(&alice, file_id)
        .await
        .expect("versions")
        .into_iter()
        .map(|v| v.version_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=21).collect::<Vec<i32>>());

    let record = h.lifecycle.get_file(&alice, file_id).await.expect("record");
    assert_eq!(record.current_version, 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_never_exceed_quota() {
    let h = Arc::new(Harness::new());
    let alice = h.principal("alice", 1000).await;

    let tasks = (0..10u8).map(|i| {
        let h = h.clone();
        let ctx = alice.clone();
        tokio::spawn(async move {
            h.lifecycle
                .upload(&ctx, UploadRequest::new(format!("f{i}.bin"), vec![i; 150]))
                .await
        })
    });

    let mut accepted = 0;
    for result in join_all(tasks).await {
        match result.expect("task") {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.kind, ErrorKind::QuotaExceeded),
        }
    }

    assert_eq!(accepted, 6);
    assert_eq!(h.used(&alice).await, 900);
    assert_eq!(h.lifecycle.list_files(&alice).await.expect("list").len(), 6);
}
