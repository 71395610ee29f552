use futures::future::join_all;
use hiibox_engine::EngineError;
use hiibox_testing::TestFixture;

/// Test that racing opens can never double-spend
///
/// Twenty opens race against an account holding 5 keys and 8 boxes. Each
/// reservation is a single conditional update inside its own transaction, so
/// exactly 5 may succeed regardless of interleaving.
///
/// **Test flow:**
/// 1. Fund a user with 5 keys and 8 boxes
/// 2. Fire 20 opens concurrently on a multi-threaded runtime
/// 3. Verify exactly 5 succeeded and every failure is `InsufficientKeys`
/// 4. Verify counters, records, supply and distribution all agree
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_never_double_spend() {
    const KEYS: u64 = 5;
    const BOXES: u64 = 8;
    const ATTEMPTS: usize = 20;

    let test = TestFixture::new().await;
    test.setup_campaign(100).await;

    // 1. Fund
    let frank = test.funded_user("frank", KEYS, 1..=BOXES).await;

    // 2. Race
    let opens = (0..ATTEMPTS).map(|_| {
        let engine = test.engine.clone();
        let wallet = frank.clone();
        tokio::spawn(async move { engine.open_box(&wallet, None).await })
    });
    let results: Vec<_> = join_all(opens)
        .await
        .into_iter()
        .map(|joined| joined.expect("open task panicked"))
        .collect();

    // 3. Exactly min(K, B) successes
    let successes = results.iter().filter(|result| result.is_ok()).count() as u64;
    assert_eq!(successes, KEYS.min(BOXES));

    for result in &results {
        if let Err(e) = result {
            assert!(
                matches!(e, EngineError::InsufficientKeys { .. }),
                "Unexpected failure under contention: {e:?}"
            );
        }
    }

    println!("✅ {} of {} racing opens succeeded", successes, ATTEMPTS);

    // Every success consumed a distinct box
    let mut consumed: Vec<u64> = results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .filter_map(|opened| opened.record.box_token_id)
        .map(|token_id| token_id as u64)
        .collect();
    consumed.sort_unstable();
    consumed.dedup();
    assert_eq!(consumed.len() as u64, successes);

    // 4. Counters agree with each other
    let account = test.account(&frank).await;
    assert_eq!(account.key_count as u64, KEYS - successes);
    assert_eq!(account.boxes_owned as u64, BOXES - successes);
    assert_eq!(account.boxes_opened as u64, successes);

    let audit = test.engine.audit_account(&frank).await.unwrap();
    assert!(audit.opens_consistent());
    assert_eq!(audit.opened_records, successes);

    let stats = test.stats().await;
    assert_eq!(stats.opened_boxes, successes);
    assert_eq!(stats.available_boxes + stats.opened_boxes, stats.total_boxes);

    let distribution = test.engine.audit_distribution().await.unwrap();
    assert!(distribution.is_consistent());
    assert_eq!(distribution.recorded_total, successes);

    println!("✅ Account, records, supply and distribution all agree");
}

/// Test that many users racing for scarce supply never oversell it
///
/// **Test flow:**
/// 1. Set up a campaign with 3 boxes of supply
/// 2. Fund 8 users with 1 key and 1 box each
/// 3. Open for all of them concurrently
/// 4. Verify exactly 3 opens succeeded and losers were not charged
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_respect_supply() {
    const SUPPLY: u64 = 3;
    const USERS: u64 = 8;

    let test = TestFixture::new().await;
    test.setup_campaign(SUPPLY).await;

    let mut wallets = Vec::new();
    for i in 0..USERS {
        wallets.push(test.funded_user(&format!("user-{i}"), 1, [100 + i]).await);
    }

    let opens = wallets.iter().map(|wallet| {
        let engine = test.engine.clone();
        let wallet = wallet.clone();
        tokio::spawn(async move { engine.open_box(&wallet, None).await })
    });
    let results: Vec<_> = join_all(opens)
        .await
        .into_iter()
        .map(|joined| joined.expect("open task panicked"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count() as u64;
    assert_eq!(successes, SUPPLY);
    assert!(
        results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .all(|e| *e == EngineError::SupplyExhausted)
    );

    for (wallet, result) in wallets.iter().zip(&results) {
        let account = test.account(wallet).await;
        let (keys, opened) = if result.is_ok() { (0, 1) } else { (1, 0) };
        assert_eq!(account.key_count, keys, "{wallet} charged incorrectly");
        assert_eq!(account.boxes_opened, opened);
    }

    let stats = test.stats().await;
    assert_eq!(stats.available_boxes, 0);
    assert_eq!(stats.opened_boxes, SUPPLY);

    println!("✅ {} users raced for {} boxes; supply never oversold", USERS, SUPPLY);
}
