use chrono::Utc;
use serde::Deserialize;

use crate::error::DecodeError;

/// One block record as streamed by the portal. Field names follow the portal's
/// JSON; everything beyond what the extractors read is ignored.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    header: Option<BlockHeader>,
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    slot: Option<u64>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub balances: Vec<BalanceDelta>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader {
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    #[serde(default)]
    pub transaction_index: Option<u32>,
    #[serde(default)]
    pub program_id: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Opaque base64-ish payload. Decoded heuristically, never trusted.
    #[serde(default)]
    pub data: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDelta {
    #[serde(default)]
    pub transaction_index: Option<u32>,
    #[serde(default)]
    pub account: String,
    #[serde(default, alias = "preBalance")]
    pub pre: u64,
    #[serde(default, alias = "postBalance")]
    pub post: u64,
}

impl Block {
    /// Block height. Dataset versions have carried this in `header.number`,
    /// `number`, or `slot`; a block with none of them decodes as 0 and is
    /// still usable by the extractors.
    pub fn number(&self) -> u64 {
        self.header
            .as_ref()
            .and_then(|h| h.number)
            .or(self.number)
            .or(self.slot)
            .unwrap_or(0)
    }

    /// Unix seconds. Falls back to wall-clock time when the record carries no
    /// timestamp at all.
    pub fn timestamp(&self) -> i64 {
        self.header
            .as_ref()
            .and_then(|h| h.timestamp)
            .or(self.timestamp)
            .unwrap_or_else(|| Utc::now().timestamp())
    }
}

/// Parse one complete line into a Block. A corrupt line is a recoverable
/// error: the caller logs it and moves on to the next line.
pub fn decode_line(line: &str) -> Result<Block, DecodeError> {
    let block = serde_json::from_str(line)?;
    Ok(block)
}
