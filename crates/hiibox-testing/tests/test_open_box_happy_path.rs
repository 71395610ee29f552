use hiibox_engine::{
    DEFAULT_BOX_TIER, OpenedBoxExt as _, PageRequest,
    api::{MeResponse, OpenBoxResponse},
};
use hiibox_testing::{CampaignSnapshot, StateChange, TestFixture};

/// Test a single open from a funded account
///
/// Validates the basic open path end to end:
/// - One key and one box are spent
/// - Exactly one reward record is written and counted
/// - The campaign supply drops by one and the reward is tallied
///
/// **Test flow:**
/// 1. Set up a campaign with 10 boxes of supply
/// 2. Fund a user with 1 key and box token #1
/// 3. Open a box without naming one
/// 4. Verify counters, supply, the record and the response body
#[tokio::test]
async fn test_open_box_happy_path() {
    let test = TestFixture::new().await;

    // 1. Campaign with 10 boxes
    test.setup_campaign(10).await;

    // 2. One key, one box
    let alice = test.funded_user("alice", 1, [1]).await;
    let before = CampaignSnapshot::capture_with_accounts(&test, &[&alice]).await;
    assert_eq!(before.account(&alice).key_count, 1);
    assert_eq!(before.account(&alice).boxes_owned, 1);

    println!("✅ Funded alice with 1 key and box #1");

    // 3. Open
    let opened = test
        .engine
        .open_box(&alice, None)
        .await
        .expect("Open should succeed");

    assert_eq!(opened.record.box_token_id(), Some(1));
    assert_eq!(opened.record.reward_name, opened.reward.name);
    assert_eq!(opened.record.payload(), Some(opened.reward.payload.clone()));
    assert_eq!(opened.record.box_tier, DEFAULT_BOX_TIER);
    assert_eq!(opened.record.keys_spent, 1);
    assert!(opened.record.tx_hash.is_none());

    println!(
        "✅ Opened box #1: {} ({})",
        opened.reward.name, opened.reward.rarity
    );

    // 4. Exactly one unit of everything moved
    let after = CampaignSnapshot::capture_with_accounts(&test, &[&alice]).await;
    before.assert_changes(
        &after,
        &[
            StateChange::Keys {
                wallet: alice.clone(),
                delta: -1,
            },
            StateChange::BoxesOwned {
                wallet: alice.clone(),
                delta: -1,
            },
            StateChange::Opened {
                wallet: alice.clone(),
                delta: 1,
            },
            StateChange::AvailableSupply { delta: -1 },
            StateChange::Distributed { delta: 1 },
        ],
    );
    assert_eq!(after.inventory.opened_boxes, 1);
    assert_eq!(after.inventory.next_box_position, 2);
    assert_eq!(
        after.inventory.reward_distribution.get(opened.reward.kind().as_str()),
        Some(&1)
    );

    let me = MeResponse::from(&opened.account);
    assert_eq!(me.key_count, 0);
    assert_eq!(me.boxes_owned, 0);
    assert_eq!(me.boxes_opened, 1);

    let response = OpenBoxResponse::from(&opened);
    assert!(response.message.contains(&opened.reward.name));
    assert_eq!(response.reward.kind, opened.reward.kind());
    assert_eq!(response.keys_remaining, 0);

    // Opened boxes leave the owned listing and show up in history
    let owned = test
        .engine
        .owned_boxes(&alice, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(owned.total_items, 0);

    let history = test
        .engine
        .opened_boxes(&alice, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total_items, 1);
    assert_eq!(history.items[0].id, opened.record.id);

    let audit = test.engine.audit_account(&alice).await.unwrap();
    assert!(audit.opens_consistent());

    println!("🎉 Happy path verified: 1 key, 1 box, 1 record, 1 unit of supply");
}

/// Test opening a specific box the wallet holds on-chain
///
/// **Test flow:**
/// 1. Fund a user with 2 keys and boxes #7 and #8
/// 2. Open box #8 by id
/// 3. Verify #8 was consumed and #7 is still owned
/// 4. Verify a box held by someone else is refused with `NotOwner`
#[tokio::test]
async fn test_open_named_box() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;

    let bob = test.funded_user("bob", 2, [7, 8]).await;
    let carol = test.funded_user("carol", 1, [9]).await;

    let opened = test.engine.open_box(&bob, Some(8)).await.unwrap();
    assert_eq!(opened.record.box_token_id(), Some(8));

    let owned = test
        .engine
        .owned_boxes(&bob, PageRequest::default())
        .await
        .unwrap();
    let token_ids: Vec<i64> = owned.items.iter().map(|row| row.token_id).collect();
    assert_eq!(token_ids, vec![7]);

    println!("✅ Opened box #8 by id; #7 untouched");

    let before = CampaignSnapshot::capture_with_accounts(&test, &[&bob, &carol]).await;
    let err = test.engine.open_box(&bob, Some(9)).await.unwrap_err();
    assert_eq!(err, hiibox_engine::EngineError::NotOwner { token_id: 9 });
    assert_eq!(err.status_code(), 403);

    let after = CampaignSnapshot::capture_with_accounts(&test, &[&bob, &carol]).await;
    assert_eq!(before, after, "A refused open must not change any state");

    println!("✅ Box held by another wallet refused with NotOwner");
}
