use hiibox_engine::{EngineError, reward_records};
use hiibox_testing::TestFixture;

/// Test burning an opened box and attaching the burn transaction
///
/// **Test flow:**
/// 1. Open box #11
/// 2. Burn it through the bridge and attach the hash
/// 3. Verify burning again returns the same hash without a second burn
/// 4. Verify a different hash cannot replace the attached one
#[tokio::test]
async fn test_tx_hash_attaches_once() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;
    let tina = test.funded_user("tina", 1, [11]).await;

    // 1. Open
    let opened = test.engine.open_box(&tina, Some(11)).await.unwrap();

    // 2. Burn
    let tx_hash = test.engine.burn_and_attach(opened.record.id).await.unwrap();
    assert_eq!(tx_hash.len(), 66);
    assert_eq!(test.ledger().burned(), vec![(tina.to_string(), 11)]);

    let record = reward_records::get_record(test.db(), opened.record.id)
        .await
        .unwrap();
    assert_eq!(record.tx_hash.as_deref(), Some(tx_hash.as_str()));

    println!("✅ Burned box #11 in {}", tx_hash);

    // 3. Idempotent
    let again = test.engine.burn_and_attach(opened.record.id).await.unwrap();
    assert_eq!(again, tx_hash);
    assert_eq!(test.ledger().burned().len(), 1);

    // 4. Immutable
    let other = format!("0x{}", "f".repeat(64));
    let err = test
        .engine
        .attach_tx_hash(opened.record.id, &other)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyAttached { .. }));
    assert_eq!(err.status_code(), 409);

    test.engine
        .attach_tx_hash(opened.record.id, &tx_hash)
        .await
        .expect("Re-attaching the same hash is a no-op");

    println!("✅ Attached hash cannot be replaced");
}

/// Test the background burn path
#[tokio::test]
async fn test_spawned_burn() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;
    let uma = test.funded_user("uma", 1, [12]).await;

    let opened = test.engine.open_box(&uma, None).await.unwrap();
    test.engine.spawn_burn(opened.record.id).await.unwrap();

    let record = reward_records::get_record(test.db(), opened.record.id)
        .await
        .unwrap();
    assert!(record.tx_hash.is_some());

    // Once burned, the token leaves the chain but the record stays opened
    let sync = test.engine.reconcile_boxes(&uma).await.unwrap();
    assert_eq!(sync.boxes_owned, 0);
    assert!(sync.released.is_empty());

    println!("✅ Background burn attached {}", record.tx_hash.unwrap());
}
