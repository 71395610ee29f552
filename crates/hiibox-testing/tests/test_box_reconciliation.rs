use hiibox_engine::{EngineError, PageRequest, api::OwnedBoxView};
use hiibox_testing::TestFixture;

/// Test mirroring on-chain box ownership into the ledger
///
/// **Test flow:**
/// 1. Mint boxes #1-#3 to one wallet and reconcile
/// 2. Transfer #2 to a second wallet on-chain
/// 3. Reconcile the buyer: #2 moves over and the seller's count drops
/// 4. Reconcile the seller: nothing left to release
/// 5. Verify the seller can no longer open #2 but the buyer can
#[tokio::test]
async fn test_box_reconciliation_follows_transfers() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;

    // 1. Mint
    let victor = test.funded_user("victor", 2, [1, 2, 3]).await;
    let wendy = test.funded_user("wendy", 1, []).await;
    assert_eq!(test.account(&victor).await.boxes_owned, 3);

    // 2. Sell #2
    test.ledger()
        .transfer_box(victor.as_str(), wendy.as_str(), 2)
        .unwrap();

    // 3. Buyer reconciles first
    let sync = test.engine.reconcile_boxes(&wendy).await.unwrap();
    assert_eq!(sync.added, vec![2]);
    assert_eq!(sync.boxes_owned, 1);
    assert_eq!(test.account(&victor).await.boxes_owned, 2);

    println!("✅ Box #2 moved to the buyer");

    // 4. Seller reconciles
    let sync = test.engine.reconcile_boxes(&victor).await.unwrap();
    assert!(sync.added.is_empty());
    assert!(sync.released.is_empty());
    assert_eq!(sync.boxes_owned, 2);

    let owned: Vec<u64> = test
        .engine
        .owned_boxes(&victor, PageRequest::default())
        .await
        .unwrap()
        .map(OwnedBoxView::from)
        .items
        .into_iter()
        .map(|view| view.token_id)
        .collect();
    assert_eq!(owned, vec![1, 3]);

    // 5. Only the new holder can open it
    let err = test.engine.open_box(&victor, Some(2)).await.unwrap_err();
    assert_eq!(err, EngineError::NotOwner { token_id: 2 });
    test.engine.open_box(&wendy, Some(2)).await.unwrap();

    println!("✅ Seller refused, buyer opened box #2");
}

/// Test that boxes which leave the wallet are released
#[tokio::test]
async fn test_box_reconciliation_releases_vanished_boxes() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;

    let xena = test.funded_user("xena", 0, [40, 41]).await;
    let yuri = test.sign_in("yuri").await;

    test.ledger()
        .transfer_box(xena.as_str(), yuri.as_str(), 41)
        .unwrap();

    let sync = test.engine.reconcile_boxes(&xena).await.unwrap();
    assert_eq!(sync.released, vec![41]);
    assert_eq!(sync.boxes_owned, 1);

    let sync = test.engine.reconcile_boxes(&yuri).await.unwrap();
    assert_eq!(sync.added, vec![41]);

    println!("✅ Box #41 released by the seller and picked up by the buyer");
}
