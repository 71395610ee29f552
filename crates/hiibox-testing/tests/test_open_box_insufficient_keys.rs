use hiibox_engine::{EngineError, api::ApiError};
use hiibox_testing::{CampaignSnapshot, TestFixture};

/// Test opening without keys
///
/// A user with boxes but no keys must be refused before anything is reserved.
///
/// **Test flow:**
/// 1. Set up a campaign and a user with 0 keys and 1 box
/// 2. Attempt an open
/// 3. Verify `InsufficientKeys` (400) and that nothing changed
#[tokio::test]
async fn test_open_box_insufficient_keys() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;

    let dave = test.funded_user("dave", 0, [3]).await;
    let before = CampaignSnapshot::capture_with_accounts(&test, &[&dave]).await;

    let err = test.engine.open_box(&dave, None).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientKeys {
            required: 1,
            available: 0
        }
    );

    let api_error = ApiError::from(&err);
    assert_eq!(api_error.status, 400);
    assert!(api_error.detail.contains("Insufficient keys"));

    println!("✅ Open refused: {}", err);

    let after = CampaignSnapshot::capture_with_accounts(&test, &[&dave]).await;
    assert_eq!(before, after, "No state should change on a refused open");

    println!("✅ Verified no state changes");
}

/// Test opening with keys but no boxes while box gating is on
///
/// **Test flow:**
/// 1. Fund a user with 3 keys and no boxes
/// 2. Verify the open fails with `InsufficientBoxes` and nothing changed
#[tokio::test]
async fn test_open_box_insufficient_boxes() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;

    let erin = test.funded_user("erin", 3, []).await;
    let before = CampaignSnapshot::capture_with_accounts(&test, &[&erin]).await;

    let err = test.engine.open_box(&erin, None).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientBoxes {
            required: 1,
            available: 0
        }
    );
    assert!(err.is_client_actionable());

    let after = CampaignSnapshot::capture_with_accounts(&test, &[&erin]).await;
    assert_eq!(before, after);

    println!("✅ Open without boxes refused: {}", err);
}

/// Test opening from a wallet that never signed in
#[tokio::test]
async fn test_open_box_unknown_account() {
    let test = TestFixture::new().await;
    test.setup_campaign(10).await;

    let stranger = hiibox_testing::deterministic_wallet("stranger");
    let err = test.engine.open_box(&stranger, None).await.unwrap_err();

    assert!(matches!(err, EngineError::AccountNotFound(_)));
    assert_eq!(err.status_code(), 404);

    println!("✅ Unknown wallet refused with 404");
}
