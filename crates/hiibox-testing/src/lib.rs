/*!
# HiiBox Testing

Shared fixtures for the engine's integration tests: a file-backed campaign
database, an in-memory chain behind a retrying bridge, a seeded draw source,
and snapshot helpers for asserting exactly what an operation changed.
*/

mod campaign_snapshot;
mod fixtures;
mod test_fixture;

pub use campaign_snapshot::{AccountState, CampaignSnapshot, StateChange};
pub use fixtures::*;
pub use test_fixture::{TEST_BRIDGE_RETRIES, TEST_DRAW_SEED, TestFixture, test_engine_config};
