use serde::Serialize;

/// Named channel a subscriber joins to receive one kind of event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    DexSwaps,
    WhaleAlerts,
    NetworkHealth,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::DexSwaps => "dex-swaps",
            Topic::WhaleAlerts => "whale-alerts",
            Topic::NetworkHealth => "network-health",
        }
    }
}

/// Outcome of the heuristic amount decode. Extractors must handle all three:
/// a strict fixed-offset decode that landed in a plausible range, a fallback
/// estimate, or nothing usable at all.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecodedAmount {
    Decoded(f64),
    Estimated(f64),
    Unavailable,
}

impl DecodedAmount {
    pub fn is_estimate(&self) -> bool {
        !matches!(self, DecodedAmount::Decoded(_))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SwapEvent {
    pub transaction_id: String,
    pub dex: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub price: f64,
    pub volume_usd: f64,
    pub trader: String,
    pub is_estimate: bool,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct WhaleTransferEvent {
    pub transaction_id: String,
    pub account: String,
    pub pre_balance: u64,
    pub post_balance: u64,
    pub change: String, // "increase" | "decrease"
    pub amount_sol: f64,
    pub value_usd: f64,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct NetworkHealthEvent {
    pub slot: u64,
    pub status: String,
    pub timestamp: i64,
}

/// One extracted, typed, deduplicatable event.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Swap(SwapEvent),
    WhaleTransfer(WhaleTransferEvent),
    NetworkHealth(NetworkHealthEvent),
}

impl DomainEvent {
    /// Deterministic identifier used to suppress duplicate emission. Derived
    /// from block/transaction coordinates plus a variant discriminator, never
    /// from wall-clock time.
    pub fn dedup_key(&self) -> String {
        match self {
            DomainEvent::Swap(e) => format!("swap-{}", e.transaction_id),
            DomainEvent::WhaleTransfer(e) => format!("whale-{}", e.transaction_id),
            DomainEvent::NetworkHealth(e) => format!("health-{}", e.slot),
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            DomainEvent::Swap(_) => Topic::DexSwaps,
            DomainEvent::WhaleTransfer(_) => Topic::WhaleAlerts,
            DomainEvent::NetworkHealth(_) => Topic::NetworkHealth,
        }
    }

    /// Store table / kind discriminator, matching the persisted row families.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::Swap(_) => "dex_swaps",
            DomainEvent::WhaleTransfer(_) => "whale_transactions",
            DomainEvent::NetworkHealth(_) => "network_health",
        }
    }
}

/// Periodic liveness signal, distinct from domain events. Consumers use it to
/// tell "no new events" apart from "ingestion is down".
#[derive(Clone, Debug, Serialize)]
pub struct Heartbeat {
    pub timestamp: i64,
    pub connected: bool,
    pub cursor: u64,
}

/// Human-readable short form of an address: first 5 chars + "..." + last 5.
/// Full addresses never leave the pipeline in display fields. Counted in
/// chars, not bytes: account strings come off the wire and aren't guaranteed
/// to be base58 ASCII.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}
