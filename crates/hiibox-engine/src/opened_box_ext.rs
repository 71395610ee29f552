use hiibox_entities::opened_boxes;
use tracing::warn;

use crate::accounts::from_db;
use crate::{Rarity, RewardPayload};

/// Typed views of a stored reward record
///
/// A row that no longer decodes yields `None` (and a warning) so one bad
/// record cannot take down a whole history listing.
pub trait OpenedBoxExt {
    fn payload(&self) -> Option<RewardPayload>;
    fn rarity(&self) -> Option<Rarity>;
    fn box_token_id(&self) -> Option<u64>;
}

impl OpenedBoxExt for opened_boxes::Model {
    fn payload(&self) -> Option<RewardPayload> {
        serde_json::from_str::<RewardPayload>(&self.reward_data)
            .inspect_err(|e| {
                warn!(
                    "Opened box #{} has unreadable reward data {}: {}",
                    self.id, self.reward_data, e
                )
            })
            .ok()
    }

    fn rarity(&self) -> Option<Rarity> {
        self.reward_tier
            .parse::<Rarity>()
            .inspect_err(|e| warn!("Opened box #{}: {}", self.id, e))
            .ok()
    }

    fn box_token_id(&self) -> Option<u64> {
        self.box_token_id.map(from_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(reward_data: &str, reward_tier: &str) -> opened_boxes::Model {
        opened_boxes::Model {
            id: 7,
            user_id: 1,
            box_token_id: Some(12),
            box_tier: "gold".to_string(),
            keys_spent: 5,
            reward_type: "ticket".to_string(),
            reward_name: "ApeFest Ticket".to_string(),
            reward_data: reward_data.to_string(),
            reward_tier: reward_tier.to_string(),
            opened_at: Utc::now(),
            tx_hash: None,
        }
    }

    #[test]
    fn test_decodes_stored_record() {
        let model = record(r#"{"type":"ticket","event":"ApeFest"}"#, "legendary");
        assert_eq!(
            model.payload(),
            Some(RewardPayload::Ticket {
                event: "ApeFest".to_string()
            })
        );
        assert_eq!(model.rarity(), Some(Rarity::Legendary));
        assert_eq!(model.box_token_id(), Some(12));
    }

    #[test]
    fn test_corrupt_record_degrades_to_none() {
        let model = record("{not json", "mythic");
        assert_eq!(model.payload(), None);
        assert_eq!(model.rarity(), None);
    }
}
