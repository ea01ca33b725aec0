use crate::error::ExtractionError;
use crate::events::types::{truncate_address, DomainEvent, WhaleTransferEvent};
use crate::events::{LAMPORTS_PER_SOL, SOL_USD_REFERENCE};
use crate::stream::decoder::{BalanceDelta, Block};

use super::extract::EventExtractor;

/// Flags balance changes at or above a lamport threshold. A single
/// transaction can move several accounts past the threshold, so the dedup key
/// carries an account suffix on top of the block/transaction coordinates.
pub struct WhaleExtractor {
    threshold_lamports: u64,
}

impl WhaleExtractor {
    pub fn new(threshold_lamports: u64) -> Self {
        Self { threshold_lamports }
    }

    fn build_event(&self, block: &Block, tx_index: u32, delta: &BalanceDelta) -> WhaleTransferEvent {
        let change_lamports = delta.post.abs_diff(delta.pre);
        let amount_sol = change_lamports as f64 / LAMPORTS_PER_SOL;
        let direction = if delta.post >= delta.pre { "increase" } else { "decrease" };

        WhaleTransferEvent {
            transaction_id: format!(
                "{}-{}-{}",
                block.number(),
                tx_index,
                account_suffix(&delta.account)
            ),
            account: truncate_address(&delta.account),
            pre_balance: delta.pre,
            post_balance: delta.post,
            change: direction.to_string(),
            amount_sol,
            value_usd: amount_sol * SOL_USD_REFERENCE,
            timestamp: block.timestamp(),
        }
    }
}

impl EventExtractor for WhaleExtractor {
    fn name(&self) -> &'static str {
        "whale"
    }

    fn extract(&self, block: &Block) -> Result<Vec<DomainEvent>, ExtractionError> {
        let mut events = Vec::new();
        for delta in &block.balances {
            // No transaction identifier, no dedup key: drop it.
            let Some(tx_index) = delta.transaction_index else {
                continue;
            };
            if delta.post.abs_diff(delta.pre) >= self.threshold_lamports {
                events.push(DomainEvent::WhaleTransfer(self.build_event(block, tx_index, delta)));
            }
        }
        Ok(events)
    }
}

// Char-counted, not a byte slice: wire data can carry non-ASCII accounts and
// a byte offset could land mid-codepoint.
fn account_suffix(account: &str) -> String {
    let skip = account.chars().count().saturating_sub(8);
    account.chars().skip(skip).collect()
}
