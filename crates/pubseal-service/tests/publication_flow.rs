//! End-to-end publish/access behaviour over the in-memory operator.

mod common;

use common::*;
use pubseal_core::{ErrorKind, PublicationStatus, SearchQuery};
use pubseal_registry::PublicationRegistry;
use pubseal_service::PublicationService;
use pubseal_storage::ObjectContentStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn alter_one_char(secret: &str) -> String {
    let mut chars: Vec<char> = secret.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

#[tokio::test]
async fn publish_then_access_paper() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();

    assert!(receipt.secret.expose().len() >= 32);
    assert!(!receipt.content_address.as_str().is_empty());
    assert_eq!(receipt.title, "T");

    let grant = h
        .service
        .access(receipt.publication_id.as_str(), receipt.secret.expose())
        .await
        .unwrap();
    assert_eq!(grant.bytes, b"ABCDEFGHIJ");
    assert_eq!(grant.file_name, "paper.pdf");
    assert_eq!(grant.file_type, "application/pdf");

    let record = h
        .registry
        .get(&receipt.publication_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.access_count, 1);
    assert_eq!(record.file_size, 10);
    assert_eq!(record.owner_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn wrong_secret_and_unknown_id_are_indistinguishable() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();

    let wrong_secret = h
        .service
        .access(
            receipt.publication_id.as_str(),
            &alter_one_char(receipt.secret.expose()),
        )
        .await
        .unwrap_err();

    let unknown_id = h
        .service
        .access(
            "00000000-0000-4000-8000-000000000000",
            receipt.secret.expose(),
        )
        .await
        .unwrap_err();

    assert_eq!(wrong_secret.kind(), ErrorKind::AccessDenied);
    assert_eq!(unknown_id.kind(), ErrorKind::AccessDenied);
    assert_eq!(wrong_secret.to_string(), unknown_id.to_string());

    // Denied accesses never touch the store
    assert_eq!(h.store.gets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_accesses_are_counted() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();
    let id = receipt.publication_id.as_str();

    for _ in 0..3 {
        h.service.access(id, "definitely-wrong").await.unwrap_err();
    }

    let record = wait_for_failed_count(&h.registry, &receipt.publication_id, 3).await;
    assert_eq!(record.failed_access_count, 3);
    assert_eq!(record.access_count, 0);
}

#[tokio::test]
async fn record_never_holds_the_secret() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();
    let record = h
        .registry
        .get(&receipt.publication_id)
        .await
        .unwrap()
        .unwrap();

    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains(receipt.secret.expose()));
    assert_ne!(record.key_fingerprint, receipt.secret.expose());
    assert_eq!(record.salt.len(), 16);
}

#[tokio::test]
async fn same_file_twice_gets_distinct_addresses_and_secrets() {
    let h = harness();
    let a = h.service.publish(paper_request()).await.unwrap();
    let b = h.service.publish(paper_request()).await.unwrap();

    assert_ne!(a.publication_id, b.publication_id);
    assert_ne!(a.content_address, b.content_address);
    assert_ne!(a.secret.expose(), b.secret.expose());

    // Each secret opens only its own publication
    assert_eq!(
        h.service
            .access(a.publication_id.as_str(), b.secret.expose())
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::AccessDenied
    );
}

#[tokio::test]
async fn registry_failure_leaves_no_record_and_discards_ciphertext() {
    let store = Arc::new(FaultyStore::new(ObjectContentStore::new(
        memory_operator(),
        PREFIX,
    )));
    let registry = Arc::new(FailingRegistry::default());
    let service = PublicationService::new(store.clone(), registry.clone())
        .with_kdf(fast_kdf())
        .with_retry(fast_retry(2));

    let err = service.publish(paper_request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    assert!(service
        .search(&SearchQuery::default())
        .await
        .unwrap()
        .is_empty());
    assert!(service.list_owned("owner-1").await.unwrap().is_empty());

    let deleted = store.deleted.lock().unwrap().clone();
    assert_eq!(deleted.len(), 1);
    assert!(!store.operator().exists(&blob_path(&deleted[0])).await.unwrap());
}

#[tokio::test]
async fn upload_failure_records_nothing() {
    let h = harness_with_retry(fast_retry(2));
    h.store.put_failures.store(10, Ordering::SeqCst);

    let err = h.service.publish(paper_request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    assert_eq!(h.store.puts.load(Ordering::SeqCst), 2);
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn transient_store_failures_are_retried() {
    let h = harness_with_retry(fast_retry(4));
    h.store.put_failures.store(2, Ordering::SeqCst);
    let receipt = h.service.publish(paper_request()).await.unwrap();
    assert_eq!(h.store.puts.load(Ordering::SeqCst), 3);

    h.store.get_failures.store(3, Ordering::SeqCst);
    let grant = h
        .service
        .access(receipt.publication_id.as_str(), receipt.secret.expose())
        .await
        .unwrap();
    assert_eq!(grant.bytes, b"ABCDEFGHIJ");
    assert_eq!(h.store.gets.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn persistent_get_failure_surfaces_store_unavailable() {
    let h = harness_with_retry(fast_retry(3));
    let receipt = h.service.publish(paper_request()).await.unwrap();
    h.store.get_failures.store(100, Ordering::SeqCst);

    let err = h
        .service
        .access(receipt.publication_id.as_str(), receipt.secret.expose())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    // No successful access, no count
    let record = h
        .registry
        .get(&receipt.publication_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.access_count, 0);
}

#[tokio::test]
async fn missing_blob_is_store_divergence_not_access_denied() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();
    h.store
        .operator()
        .delete(&blob_path(&receipt.content_address))
        .await
        .unwrap();

    let err = h
        .service
        .access(receipt.publication_id.as_str(), receipt.secret.expose())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreDivergence);
    // Divergence is permanent: fetched once, never retried
    assert_eq!(h.store.gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tampered_blob_is_integrity_error() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();
    let path = blob_path(&receipt.content_address);

    let mut sealed = h.store.operator().read(&path).await.unwrap().to_vec();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;
    h.store.operator().write(&path, sealed).await.unwrap();

    let err = h
        .service
        .access(receipt.publication_id.as_str(), receipt.secret.expose())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[tokio::test]
async fn key_mismatch_after_clean_fetch_is_integrity_error() {
    let registry = Arc::new(InterposedRegistry::default());
    let service = service_over(registry.clone());
    let receipt = service.publish(paper_request()).await.unwrap();

    // Fingerprint still matches and the blob still hashes to its address,
    // but the salt handed back no longer derives the sealing key.
    registry.flip_salt.store(true, Ordering::SeqCst);
    let err = service
        .access(receipt.publication_id.as_str(), receipt.secret.expose())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);

    let record = registry
        .inner
        .get(&receipt.publication_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.access_count, 0);
    assert_eq!(record.failed_access_count, 0);

    registry.flip_salt.store(false, Ordering::SeqCst);
    let grant = service
        .access(receipt.publication_id.as_str(), receipt.secret.expose())
        .await
        .unwrap();
    assert_eq!(grant.bytes, b"ABCDEFGHIJ");
}

#[tokio::test]
async fn denial_does_not_wait_for_failed_access_write() {
    let registry = Arc::new(InterposedRegistry {
        failed_count_delay: Duration::from_secs(2),
        ..Default::default()
    });
    let service = service_over(registry.clone());
    let receipt = service.publish(paper_request()).await.unwrap();

    let wrong_secret = tokio::time::timeout(
        Duration::from_millis(500),
        service.access(receipt.publication_id.as_str(), "definitely-wrong"),
    )
    .await
    .expect("denial returned before the counter write finished");
    assert_eq!(wrong_secret.unwrap_err().kind(), ErrorKind::AccessDenied);

    let record = wait_for_failed_count(&registry.inner, &receipt.publication_id, 1).await;
    assert_eq!(record.failed_access_count, 1);
}

#[tokio::test]
async fn revoked_publication_refuses_access() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();
    let id = receipt.publication_id.as_str();

    let err = h.service.revoke(id, "someone-else").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotOwner);

    let summary = h.service.revoke(id, "owner-1").await.unwrap();
    assert_eq!(summary.status, PublicationStatus::Revoked);

    let err = h
        .service
        .access(id, receipt.secret.expose())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Revoked);

    // Still visible through details, hidden from search
    assert_eq!(
        h.service.details(id).await.unwrap().status,
        PublicationStatus::Revoked
    );
    assert!(h
        .service
        .search(&SearchQuery::text("T"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn revoke_unknown_is_not_found() {
    let h = harness();
    let err = h.service.revoke("missing", "owner-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h.service.details("missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accesses_are_all_counted() {
    let h = harness();
    let receipt = h.service.publish(paper_request()).await.unwrap();
    let id = receipt.publication_id.to_string();
    let secret = receipt.secret.expose().to_string();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = h.service.clone();
            let id = id.clone();
            let secret = secret.clone();
            tokio::spawn(async move { service.access(&id, &secret).await })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;
    let ok = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(ok, 16);

    let record = h
        .registry
        .get(&receipt.publication_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.access_count, 16);
}

#[tokio::test]
async fn health_check_reports_store() {
    let h = harness();
    h.service.check_health().await.unwrap();
}
