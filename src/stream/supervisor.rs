use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use crate::config::IngestConfig;
use crate::error::ConnectError;
use crate::events::extract::{run_extractors, EventExtractor};
use crate::events::{HealthExtractor, SwapExtractor, WhaleExtractor};
use crate::publish::broadcaster::{Broadcaster, PipelineStatus};
use crate::publish::store::EventStore;
use crate::publish::Publisher;

use super::backoff::Backoff;
use super::decoder::{decode_line, Block};
use super::framing::FrameReader;

/// Next block-range lower bound. Owned exclusively by the supervisor; moves
/// forward as blocks are observed and never backward except by explicit
/// reset.
#[derive(Debug)]
pub struct Cursor {
    current: u64,
}

impl Cursor {
    pub fn new(start: u64) -> Self {
        Self { current: start }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// Monotonic: lower block numbers are ignored.
    pub fn advance_to(&mut self, block: u64) {
        if block > self.current {
            self.current = block;
        }
    }

    /// Step past the last-seen block before requesting a fresh range.
    pub fn bump(&mut self) {
        self.current = self.current.saturating_add(1);
    }

    pub fn reset(&mut self, block: u64) {
        self.current = block;
    }
}

enum ConnectionState {
    Disconnected,
    Connecting,
    Streaming(reqwest::Response),
}

/// Owns the upstream connection lifecycle: ranged stream requests, the
/// cursor, reconnect backoff, and the per-chunk processing path. One
/// supervisor per upstream stream; block ranges are never ingested in
/// parallel.
pub struct StreamSupervisor {
    config: IngestConfig,
    client: reqwest::Client,
    cursor: Cursor,
    backoff: Backoff,
    extractors: Vec<Box<dyn EventExtractor>>,
    publisher: Publisher,
    status: Arc<PipelineStatus>,
}

impl StreamSupervisor {
    pub fn new(
        config: IngestConfig,
        store: Arc<dyn EventStore>,
        broadcaster: Arc<Broadcaster>,
        status: Arc<PipelineStatus>,
    ) -> Result<Self, ConnectError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let extractors: Vec<Box<dyn EventExtractor>> = vec![
            Box::new(SwapExtractor::new(config.dex_programs.clone())),
            Box::new(WhaleExtractor::new(config.whale_threshold_lamports)),
            Box::new(HealthExtractor),
        ];

        let publisher = Publisher::new(store, broadcaster, config.dedup_capacity);
        let cursor = Cursor::new(config.start_block);
        let backoff = Backoff::new(config.backoff_base, config.backoff_max, config.backoff_factor);

        Ok(Self {
            config,
            client,
            cursor,
            backoff,
            extractors,
            publisher,
            status,
        })
    }

    /// Run until the shutdown signal flips. No error terminates the loop;
    /// every failure path funnels back through backoff and reconnect.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut state = ConnectionState::Disconnected;

        loop {
            if *shutdown.borrow() {
                break;
            }

            state = match state {
                ConnectionState::Disconnected => ConnectionState::Connecting,

                ConnectionState::Connecting => match self.connect().await {
                    Ok(response) => {
                        log::info!(
                            "streaming blocks [{}, {}]",
                            self.cursor.current(),
                            self.cursor.current() + self.config.batch_size
                        );
                        self.backoff.reset();
                        self.status.set_connected(true);
                        ConnectionState::Streaming(response)
                    }
                    Err(e) => {
                        log::warn!("connect failed: {e}");
                        self.status.set_connected(false);
                        if !self.wait_before_retry(&mut shutdown).await {
                            break;
                        }
                        ConnectionState::Disconnected
                    }
                },

                ConnectionState::Streaming(response) => {
                    let outcome = self.consume(response, &mut shutdown).await;
                    self.status.set_connected(false);
                    if *shutdown.borrow() {
                        break;
                    }
                    if let Err(e) = outcome {
                        if e.is_timeout() {
                            log::warn!("stream stalled at block {}: {e}", self.cursor.current());
                        } else {
                            log::warn!("stream interrupted at block {}: {e}", self.cursor.current());
                        }
                    }
                    // Resume past the last-seen block. Overlap-rescan for
                    // reorgs is a known gap.
                    self.cursor.bump();
                    self.status.set_cursor(self.cursor.current());
                    if !self.wait_before_retry(&mut shutdown).await {
                        break;
                    }
                    ConnectionState::Disconnected
                }
            };
        }

        log::info!("ingestion stopped at cursor {}", self.cursor.current());
    }

    /// One bounded-range stream request: [cursor, cursor + batch_size].
    async fn connect(&self) -> Result<reqwest::Response, ConnectError> {
        let from = self.cursor.current();
        let to = from.saturating_add(self.config.batch_size);

        let body = serde_json::json!({
            "type": "solana",
            "fromBlock": from,
            "toBlock": to,
            "fields": {
                "block": { "number": true, "timestamp": true },
                "instruction": {
                    "transactionIndex": true,
                    "programId": true,
                    "accounts": true,
                    "data": true
                },
                "balance": {
                    "transactionIndex": true,
                    "account": true,
                    "pre": true,
                    "post": true
                }
            },
            "instructions": [{}],
            "balances": [{}]
        });

        let mut request = self
            .client
            .post(format!("{}/stream", self.config.api_url))
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ConnectError::BadStatus(response.status().as_u16()));
        }
        Ok(response)
    }

    /// Pump the chunked body through framing, decode, extraction and publish.
    /// Returns Ok only when shutdown was observed; everything else is a
    /// stream error, including a clean end-of-range and a stalled read.
    async fn consume(
        &mut self,
        response: reqwest::Response,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), ConnectError> {
        let mut body = response.bytes_stream();
        let mut frames = FrameReader::new();

        loop {
            let next = tokio::select! {
                next = tokio::time::timeout(self.config.read_timeout, body.next()) => next,
                changed = shutdown.changed() => {
                    // A dropped shutdown sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                    continue;
                }
            };

            let chunk: bytes::Bytes = match next {
                Err(_) => return Err(ConnectError::ReadTimeout(self.config.read_timeout)),
                Ok(None) => return Err(ConnectError::StreamEnded),
                Ok(Some(Err(e))) => return Err(ConnectError::Http(e)),
                Ok(Some(Ok(chunk))) => chunk,
            };

            for line in frames.push(&chunk) {
                match decode_line(&line) {
                    Ok(block) => self.process_block(&block).await,
                    Err(e) => log::warn!("skipping corrupt line: {e}"),
                }
            }
        }
    }

    async fn process_block(&mut self, block: &Block) {
        for event in run_extractors(&self.extractors, block) {
            self.publisher.publish(event).await;
        }
        self.cursor.advance_to(block.number());
        self.status.set_cursor(self.cursor.current());
    }

    async fn wait_before_retry(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let delay = self.backoff.next_delay();
        log::info!("reconnecting in {:?}", delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::store::MemoryStore;

    #[test]
    fn cursor_is_monotonic() {
        let mut cursor = Cursor::new(100);
        cursor.advance_to(150);
        assert_eq!(cursor.current(), 150);
        cursor.advance_to(120); // out-of-order block never rewinds it
        assert_eq!(cursor.current(), 150);
        cursor.bump();
        assert_eq!(cursor.current(), 151);
        cursor.reset(0);
        assert_eq!(cursor.current(), 0);
    }

    #[tokio::test]
    async fn shutdown_before_first_connect_exits_cleanly() {
        let config = IngestConfig::default();
        let status = PipelineStatus::new(config.start_block);
        let supervisor = StreamSupervisor::new(
            config,
            MemoryStore::new(),
            Broadcaster::new(),
            Arc::clone(&status),
        )
        .unwrap();

        let (tx, rx) = watch::channel(true);
        supervisor.run(rx).await;
        drop(tx);

        let (connected, _) = status.snapshot();
        assert!(!connected);
    }

    #[tokio::test]
    async fn processed_blocks_advance_cursor_and_feed_publisher() {
        let config = IngestConfig {
            start_block: 0,
            ..IngestConfig::default()
        };
        let store = MemoryStore::new();
        let status = PipelineStatus::new(0);
        let mut supervisor = StreamSupervisor::new(
            config,
            Arc::clone(&store) as Arc<dyn EventStore>,
            Broadcaster::new(),
            Arc::clone(&status),
        )
        .unwrap();

        let block = decode_line(
            r#"{"number": 42, "balances": [
                {"transactionIndex": 0, "account": "BigAccount11111111", "pre": 0, "post": 500000000000}
            ]}"#,
        )
        .unwrap();
        supervisor.process_block(&block).await;

        assert_eq!(supervisor.cursor.current(), 42);
        let (_, cursor) = status.snapshot();
        assert_eq!(cursor, 42);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        // whale + health rows
        assert_eq!(store.len().await, 2);
    }
}
